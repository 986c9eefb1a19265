//! Error types for dstbind

use thiserror::Error;

/// dstbind error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Header not found: {0}")]
    HeaderNotFound(String),

    #[error("Preprocessor failed: {0}")]
    Preprocess(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dependency cycle: {}", .0.join(" -> "))]
    DependencyCycle(Vec<String>),

    #[error("Declaration split mismatch in {header}: {detail}")]
    SplitMismatch { header: String, detail: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for dstbind
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_shows_path() {
        let err = Error::DependencyCycle(vec!["a.h".into(), "b.h".into(), "a.h".into()]);
        assert_eq!(err.to_string(), "Dependency cycle: a.h -> b.h -> a.h");
    }
}
