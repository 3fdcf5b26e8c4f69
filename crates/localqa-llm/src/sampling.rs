use candle_transformers::generation::{LogitsProcessor, Sampling};

use localqa_core::config::LlmSettings;

/// Greedy at temperature 0, otherwise top-k then top-p.
pub fn sampling_for(settings: &LlmSettings) -> Sampling {
    if settings.temperature <= 0.0 {
        Sampling::ArgMax
    } else {
        Sampling::TopKThenTopP { k: settings.top_k, p: settings.top_p, temperature: settings.temperature }
    }
}

/// Fresh processor per completion so identical prompts replay identically.
pub fn logits_processor(settings: &LlmSettings) -> LogitsProcessor {
    LogitsProcessor::from_sampling(settings.seed, sampling_for(settings))
}
