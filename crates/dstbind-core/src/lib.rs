//! dstbind Core
//!
//! Core types shared by the dstbind header pipeline: the error type,
//! run configuration, and the declaration model produced by parsing.

pub mod config;
pub mod error;
pub mod location;
pub mod types;

pub use config::{Config, PreprocessorConfig};
pub use error::{Error, Result};
pub use location::Location;
pub use types::*;
