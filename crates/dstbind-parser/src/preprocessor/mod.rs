//! C Preprocessor Integration
//!
//! Locates headers, scans their include directives, and expands
//! synthesized translation units through an external preprocessor.

pub mod gcc;
pub mod headers;
pub mod markers;

pub use gcc::{GccPreprocessor, MacroDefinition, PreprocessError, PreprocessOptions};
pub use headers::{list_files_with_extension, scan_includes, HeaderLocator};
pub use markers::SourceMap;

use std::path::{Path, PathBuf};

/// Result of preprocessing
#[derive(Debug, Clone)]
pub struct PreprocessResult {
    /// Preprocessed source code
    pub code: String,
    /// Files included during preprocessing (from line markers)
    pub included_files: Vec<PathBuf>,
}

/// Macro preprocessor backend
pub trait Preprocessor {
    /// Preprocess source text as if it were a C file
    fn preprocess_string(
        &self,
        source: &str,
        options: &PreprocessOptions,
    ) -> Result<PreprocessResult, PreprocessError>;

    /// Preprocess a file on disk
    fn preprocess_file(
        &self,
        path: &Path,
        options: &PreprocessOptions,
    ) -> Result<PreprocessResult, PreprocessError>;
}

/// Build the translation unit for one header: its implied includes, one
/// include directive per dependency in `include_order`, then its own text.
///
/// Everything before the header's own text must expand to exactly the
/// declarations of `include_order`; the deduplicator relies on it.
pub fn build_translation_unit(implied: &[String], include_order: &[String], text: &str) -> String {
    let mut unit = String::new();
    for name in implied.iter().chain(include_order) {
        unit.push_str(&format!("#include \"{}\"\n", name));
    }
    unit.push_str(text);
    if !text.ends_with('\n') {
        unit.push('\n');
    }
    unit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_translation_unit() {
        let unit = build_translation_unit(
            &["stdlib.h".to_string()],
            &["b_dst.h".to_string(), "a_dst.h".to_string()],
            "int c;",
        );
        assert_eq!(
            unit,
            "#include \"stdlib.h\"\n#include \"b_dst.h\"\n#include \"a_dst.h\"\nint c;\n"
        );
    }
}
