//! localqa-rag
//!
//! Retrieval-augmented question answering over a precomputed corpus:
//! retrieve the nearest chunks, render them into a prompt, and complete it
//! with a local language model.
pub mod generator;
pub mod pipeline;
pub mod prompt;
pub mod retriever;

pub use generator::AnswerGenerator;
pub use pipeline::RagPipeline;
pub use prompt::{compose, PromptTemplate};
pub use retriever::Retriever;
