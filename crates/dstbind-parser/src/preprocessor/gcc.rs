//! GCC Preprocessor Integration
//!
//! Wraps `gcc -E` to expand the legacy headers. Expansion must be exact,
//! so anything the preprocessor writes to stderr is treated as a failure.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::{debug, warn};

use super::markers::SourceMap;
use super::{PreprocessResult, Preprocessor};

/// Errors that can occur during preprocessing
#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("No C preprocessor found. Please install gcc.")]
    PreprocessorNotFound,

    #[error("Preprocessor reported diagnostics:\n{0}")]
    Diagnostics(String),

    #[error("Preprocessor exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid source file: {0}")]
    InvalidSource(String),
}

impl From<PreprocessError> for dstbind_core::Error {
    fn from(err: PreprocessError) -> Self {
        match err {
            PreprocessError::IoError(e) => dstbind_core::Error::Io(e),
            other => dstbind_core::Error::Preprocess(other.to_string()),
        }
    }
}

/// A macro definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDefinition {
    pub name: String,
    pub value: Option<String>,
}

impl MacroDefinition {
    /// Create a macro that is simply defined
    pub fn defined(name: &str) -> Self {
        Self {
            name: name.to_string(),
            value: None,
        }
    }

    /// Create a macro with a specific value
    pub fn with_value(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: Some(value.to_string()),
        }
    }

    /// Parse `NAME` or `NAME=VALUE`
    pub fn parse(spec: &str) -> Self {
        match spec.split_once('=') {
            Some((name, value)) => Self::with_value(name, value),
            None => Self::defined(spec),
        }
    }

    /// Convert to a `-D` argument
    pub fn to_arg(&self) -> String {
        match &self.value {
            Some(v) => format!("-D{}={}", self.name, v),
            None => format!("-D{}", self.name),
        }
    }
}

/// Options for preprocessing
#[derive(Debug, Clone)]
pub struct PreprocessOptions {
    /// Macro definitions (-D flags)
    pub defines: Vec<MacroDefinition>,
    /// Include search paths (-I flags), searched in order
    pub includes: Vec<PathBuf>,
    /// Additional arguments
    pub extra_args: Vec<String>,
    /// Keep comments in output
    pub keep_comments: bool,
    /// Generate line markers
    pub line_markers: bool,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            defines: Vec::new(),
            includes: Vec::new(),
            extra_args: Vec::new(),
            keep_comments: false,
            line_markers: true,
        }
    }
}

impl PreprocessOptions {
    /// Options searching the given include paths
    pub fn with_includes(includes: Vec<PathBuf>) -> Self {
        Self {
            includes,
            ..Self::default()
        }
    }
}

/// `gcc -E` wrapper
pub struct GccPreprocessor {
    /// Path to the preprocessor executable
    program: PathBuf,
}

impl GccPreprocessor {
    /// Create a new preprocessor, auto-detecting gcc
    pub fn new() -> Result<Self, PreprocessError> {
        let program = Self::find_program()?;
        debug!("Found preprocessor at: {:?}", program);
        Ok(Self { program })
    }

    /// Create a preprocessor with a specific executable
    pub fn with_path(program: PathBuf) -> Self {
        Self { program }
    }

    fn find_program() -> Result<PathBuf, PreprocessError> {
        let candidates = ["gcc", "cc", "/usr/bin/gcc", "/usr/local/bin/gcc", "clang"];

        for candidate in candidates {
            if let Ok(output) = Command::new(candidate).arg("--version").output() {
                if output.status.success() {
                    return Ok(PathBuf::from(candidate));
                }
            }
        }

        Err(PreprocessError::PreprocessorNotFound)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Check if the preprocessor can be run
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn build_args(&self, options: &PreprocessOptions) -> Vec<String> {
        let mut args = vec!["-E".to_string()];

        for macro_def in &options.defines {
            args.push(macro_def.to_arg());
        }

        for include in &options.includes {
            args.push(format!("-I{}", include.display()));
        }

        args.extend(options.extra_args.iter().cloned());

        if options.keep_comments {
            args.push("-C".to_string());
        }
        if !options.line_markers {
            args.push("-P".to_string());
        }

        args
    }

    fn finish(&self, output: std::process::Output) -> Result<PreprocessResult, PreprocessError> {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            return Err(PreprocessError::Failed {
                status: output.status.to_string(),
                stderr,
            });
        }
        if !stderr.trim().is_empty() {
            warn!("Preprocessor diagnostics: {}", stderr.trim());
            return Err(PreprocessError::Diagnostics(stderr));
        }

        let code = String::from_utf8_lossy(&output.stdout).to_string();
        let (_, map) = SourceMap::strip(&code);

        Ok(PreprocessResult {
            included_files: map.included_files(),
            code,
        })
    }
}

impl Preprocessor for GccPreprocessor {
    fn preprocess_string(
        &self,
        source: &str,
        options: &PreprocessOptions,
    ) -> Result<PreprocessResult, PreprocessError> {
        let args = self.build_args(options);
        debug!("Preprocessing {} bytes with args: {:?}", source.len(), args);

        let mut child = Command::new(&self.program)
            .args(&args)
            .arg("-x")
            .arg("c")
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(source.as_bytes())?;
        }

        let output = child.wait_with_output()?;
        self.finish(output)
    }

    fn preprocess_file(
        &self,
        source_path: &Path,
        options: &PreprocessOptions,
    ) -> Result<PreprocessResult, PreprocessError> {
        if !source_path.is_file() {
            return Err(PreprocessError::InvalidSource(format!(
                "File not found: {:?}",
                source_path
            )));
        }

        let args = self.build_args(options);
        debug!("Preprocessing {:?} with args: {:?}", source_path, args);

        let output = Command::new(&self.program)
            .args(&args)
            .arg(source_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;

        self.finish(output)
    }
}
