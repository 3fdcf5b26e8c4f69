use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Corpus is empty: no chunks to retrieve from")]
    EmptyCorpus,

    #[error("Invalid k={k}: at least one chunk must be requested")]
    InvalidK { k: usize },

    #[error("Embedding dimension mismatch: index expects {expected}, query vector has {actual}")]
    EmbeddingDimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding model mismatch: index was built with '{index}', query encoder is '{query}'")]
    EmbeddingModelMismatch { index: String, query: String },

    #[error("Prompt too long: {tokens} tokens leaves no room in a context window of {window}")]
    PromptTooLong { tokens: usize, window: usize },

    #[error("Generation failed: {0}")]
    GenerationFailure(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Vector search failed: {0}")]
    VectorSearch(String),

    #[error("Misaligned artifacts: {0}")]
    MisalignedArtifacts(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;
