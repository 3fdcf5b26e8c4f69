//! Terminal front end for the localqa pipeline.
pub mod args;
pub mod commands;
pub mod logging;
