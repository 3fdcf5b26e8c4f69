/// Sentence encoder. Returns one raw (not normalized) vector per input text.
pub trait Embedder: Send + Sync {
    /// Stable model identifier, compared against the index manifest.
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Local text-completion capability.
pub trait LanguageModel: Send + Sync {
    /// Maximum number of tokens (prompt + generated) in one call.
    fn context_window(&self) -> usize;
    fn token_count(&self, text: &str) -> anyhow::Result<usize>;
    /// Begins a completion of `prompt`. Implementations that cannot serve
    /// concurrent sessions block here until the previous session is dropped.
    fn start<'a>(&'a self, prompt: &str) -> anyhow::Result<Box<dyn TokenSource + 'a>>;
}

/// A running completion. Each call yields the text of exactly one token;
/// `None` marks end of sequence.
pub trait TokenSource {
    fn next_token(&mut self) -> anyhow::Result<Option<String>>;
}
