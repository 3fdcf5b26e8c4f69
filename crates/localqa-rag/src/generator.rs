use tracing::debug;

use localqa_core::config::DEFAULT_STOP;
use localqa_core::error::{Error, Result};
use localqa_core::traits::LanguageModel;

fn failure(e: anyhow::Error) -> Error {
    Error::GenerationFailure(format!("{:#}", e))
}

/// Bounded completion that ends at the stop marker.
pub struct AnswerGenerator {
    model: Box<dyn LanguageModel>,
    stop: String,
}

impl AnswerGenerator {
    pub fn new(model: Box<dyn LanguageModel>) -> Self {
        Self::with_stop(model, DEFAULT_STOP)
    }

    pub fn with_stop(model: Box<dyn LanguageModel>, stop: impl Into<String>) -> Self {
        Self { model, stop: stop.into() }
    }

    pub fn stop(&self) -> &str { &self.stop }

    /// Generates at most `max_new_tokens` tokens and returns the trimmed text
    /// before the first stop marker. A prompt that fills the context window is
    /// rejected rather than truncated.
    pub fn generate(&self, prompt: &str, max_new_tokens: usize) -> Result<String> {
        let prompt_tokens = self.model.token_count(prompt).map_err(failure)?;
        let window = self.model.context_window();
        if prompt_tokens >= window {
            return Err(Error::PromptTooLong { tokens: prompt_tokens, window });
        }
        let budget = max_new_tokens.min(window - prompt_tokens);

        let mut session = self.model.start(prompt).map_err(failure)?;
        let mut out = String::new();
        let mut produced = 0usize;
        let mut stopped = false;
        while produced < budget {
            let Some(piece) = session.next_token().map_err(failure)? else { break };
            produced += 1;
            out.push_str(&piece);
            if let Some(pos) = out.find(&self.stop) {
                out.truncate(pos);
                stopped = true;
                break;
            }
        }
        debug!(prompt_tokens, produced, budget, stopped, "generated");
        Ok(out.trim().to_string())
    }
}
