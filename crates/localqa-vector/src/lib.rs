//! localqa-vector
//!
//! Precomputed corpus + vector index. Vectors live in a LanceDB table and are
//! searched there; chunk texts come from `chunks.json` and build-time facts
//! from `manifest.json`.
pub mod corpus;
pub mod index;
pub mod manifest;
pub mod schema;
pub mod store;
pub mod table;

pub use corpus::AlignedCorpus;
pub use index::LanceIndex;
pub use manifest::IndexManifest;
pub use store::{load_artifacts, save_artifacts, ArtifactPaths};
