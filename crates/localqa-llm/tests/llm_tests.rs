use std::path::Path;
use std::str::FromStr;

use candle_transformers::generation::Sampling;
use tokenizers::Tokenizer;

use localqa_core::config::LlmSettings;
use localqa_core::error::Error;
use localqa_llm::sampling::sampling_for;
use localqa_llm::{load_language_model, TokenDecoder};

const WORD_TOKENIZER: &str = r#"{
  "version": "1.0",
  "truncation": null,
  "padding": null,
  "added_tokens": [],
  "normalizer": null,
  "pre_tokenizer": { "type": "Whitespace" },
  "post_processor": null,
  "decoder": null,
  "model": { "type": "WordLevel", "vocab": { "[UNK]": 0, "tap": 1, "the": 2, "battery": 3, "icon": 4 }, "unk_token": "[UNK]" }
}"#;

#[test]
fn decoder_emits_only_the_new_suffix() {
    let tokenizer = Tokenizer::from_str(WORD_TOKENIZER).expect("tokenizer");
    let mut decoder = TokenDecoder::new(&tokenizer);
    let pieces: Vec<String> = [1u32, 2, 3, 4].iter().map(|&t| decoder.push(t).unwrap()).collect();
    assert_eq!(pieces.concat(), "tap the battery icon");
    assert_eq!(pieces[0], "tap");
    assert_eq!(pieces[3], " icon");
}

#[test]
fn zero_temperature_is_greedy() {
    let settings = LlmSettings { temperature: 0.0, ..Default::default() };
    assert!(matches!(sampling_for(&settings), Sampling::ArgMax));

    let settings = LlmSettings::default();
    assert!(matches!(sampling_for(&settings), Sampling::TopKThenTopP { k: 40, .. }));
}

#[test]
fn missing_model_file_is_not_found() {
    let err = match load_language_model(&LlmSettings::default(), Path::new("/nope/model.gguf"), Path::new("/nope/tokenizer.json")) {
        Ok(_) => panic!("expected NotFound"),
        Err(e) => e,
    };
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::NotFound(_))), "{err:#}");
}

/// Runs the real model. Needs `APP_LLM_MODEL` (GGUF) and `APP_LLM_TOKENIZER` (tokenizer.json):
/// `cargo test -p localqa-llm -- --ignored`
#[ignore]
#[test]
fn quantized_model_streams_tokens() {
    let model = std::env::var("APP_LLM_MODEL").expect("APP_LLM_MODEL");
    let tokenizer = std::env::var("APP_LLM_TOKENIZER").expect("APP_LLM_TOKENIZER");
    let settings = LlmSettings { temperature: 0.0, ..Default::default() };
    let lm = load_language_model(&settings, Path::new(&model), Path::new(&tokenizer)).expect("load");
    assert!(lm.context_window() <= settings.context_window);
    let mut session = lm.start("### Question\nWhat is 2 + 2?\n\n### Answer:").expect("start");
    let mut produced = 0;
    while produced < 8 {
        match session.next_token().expect("token") {
            Some(_) => produced += 1,
            None => break,
        }
    }
    assert!(produced > 0);
}
