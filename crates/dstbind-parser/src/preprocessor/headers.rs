//! Header File Locator
//!
//! Finds DST2k headers in the project include directory, falling back to
//! the stand-in standard library headers, and scans include directives.

use dstbind_core::{Error, HeaderOrigin, HeaderSource, Result};
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;
use walkdir::WalkDir;

/// Header locator for the project and fallback search roots
#[derive(Debug, Clone)]
pub struct HeaderLocator {
    /// Project header directory
    project_dir: PathBuf,
    /// Stand-in standard library headers
    fallback_dir: PathBuf,
    /// Headers every project header is assumed to need
    implied_includes: Vec<String>,
    /// Headers refused by every lookup
    invalid_headers: HashSet<String>,
}

impl HeaderLocator {
    /// Create a new header locator
    pub fn new(project_dir: PathBuf, fallback_dir: PathBuf) -> Self {
        Self {
            project_dir,
            fallback_dir,
            implied_includes: Vec::new(),
            invalid_headers: HashSet::new(),
        }
    }

    /// Set the implied includes added to every project header
    pub fn with_implied_includes(mut self, implied: Vec<String>) -> Self {
        self.implied_includes = implied;
        self
    }

    /// Set the headers that are never located
    pub fn with_invalid_headers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.invalid_headers = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_invalid(&self, name: &str) -> bool {
        self.invalid_headers.contains(name)
    }

    /// Preprocessor search paths: stand-in headers first
    pub fn search_paths(&self) -> Vec<PathBuf> {
        vec![self.fallback_dir.clone(), self.project_dir.clone()]
    }

    /// Read a header by name.
    ///
    /// The project directory wins over the fallback directory. Only project
    /// headers get implied includes, minus the header itself.
    pub fn locate(&self, name: &str) -> Result<HeaderSource> {
        if self.is_invalid(name) {
            debug!("Refusing invalid header {}", name);
            return Err(Error::HeaderNotFound(name.to_string()));
        }

        let project_path = self.project_dir.join(name);
        if project_path.is_file() {
            debug!("Resolved {} in {:?}", name, self.project_dir);
            let implied_includes = self
                .implied_includes
                .iter()
                .filter(|h| h.as_str() != name)
                .cloned()
                .collect();
            return Ok(HeaderSource {
                name: name.to_string(),
                text: std::fs::read_to_string(&project_path)?,
                path: project_path,
                implied_includes,
                origin: HeaderOrigin::Project,
            });
        }

        let fallback_path = self.fallback_dir.join(name);
        if fallback_path.is_file() {
            debug!("Resolved {} in {:?}", name, self.fallback_dir);
            return Ok(HeaderSource {
                name: name.to_string(),
                text: std::fs::read_to_string(&fallback_path)?,
                path: fallback_path,
                implied_includes: Vec::new(),
                origin: HeaderOrigin::Fallback,
            });
        }

        debug!("Failed to locate header: {}", name);
        Err(Error::HeaderNotFound(name.to_string()))
    }

    /// All `*.h` files directly in the project directory, sorted, minus
    /// invalid headers
    pub fn project_headers(&self) -> Result<Vec<String>> {
        let mut names = list_files_with_extension(&self.project_dir, "h")?;
        names.retain(|n| !self.is_invalid(n));
        Ok(names)
    }
}

/// Basenames of files with the given extension directly inside `dir`, sorted
pub fn list_files_with_extension(dir: &Path, extension: &str) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

fn include_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?m)^[ \t]*#[ \t]*include[ \t]*["<]([^">\n]+)[">]"#)
            .expect("include pattern is valid")
    })
}

/// Headers named by `#include "X"` / `#include <X>` lines in `text`.
///
/// Returns basenames in first-seen order without duplicates. `self_name`
/// is dropped: some DST2k headers include themselves.
pub fn scan_includes(text: &str, self_name: Option<&str>) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();

    for captures in include_pattern().captures_iter(text) {
        let raw = captures[1].trim();
        let name = Path::new(raw)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(raw)
            .to_string();

        if Some(name.as_str()) == self_name {
            continue;
        }
        if !headers.contains(&name) {
            headers.push(name);
        }
    }

    headers
}
