//! Schema module - Configuration and genome data types.

mod config;
mod genome;

pub use config::*;
pub use genome::*;
