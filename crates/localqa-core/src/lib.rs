//! localqa-core
//!
//! Shared vocabulary of the workspace: chunk and hit types, the encoder and
//! language-model traits, the error enum, layered configuration, compute
//! device selection and small vector helpers.
#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod config;
pub mod device;
pub mod error;
pub mod traits;
pub mod types;
pub mod vector;
