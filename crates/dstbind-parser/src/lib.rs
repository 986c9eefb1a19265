//! dstbind Parser
//!
//! Everything between a header name and its parsed declarations.
//!
//! ## Modules
//!
//! - `preprocessor` - header lookup, include scanning and `gcc -E` expansion
//! - `treesitter` - top-level declaration extraction using tree-sitter

pub mod preprocessor;
pub mod treesitter;

use dstbind_core::Declaration;

pub use preprocessor::{
    build_translation_unit, scan_includes, GccPreprocessor, HeaderLocator, PreprocessError,
    PreprocessOptions, PreprocessResult, Preprocessor,
};
pub use treesitter::TreeSitterParser;

/// Parse result containing extracted declarations
#[derive(Debug, Default, Clone)]
pub struct ParseResult {
    /// Top-level declarations in source order
    pub declarations: Vec<Declaration>,
    /// Top-level items that declare nothing (non-fatal)
    pub skipped: Vec<String>,
}
