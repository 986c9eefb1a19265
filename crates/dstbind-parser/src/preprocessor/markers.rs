//! Line markers
//!
//! `gcc -E` interleaves its output with `# <line> "<file>" <flags>` markers.
//! The structural parser cannot read them, so they are blanked out and kept
//! in a [`SourceMap`] that maps output lines back to the header they came from.

use std::path::PathBuf;

/// One `# <line> "<file>"` marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMarker {
    /// 0-based line of the marker in the preprocessed output
    pub output_line: usize,
    /// File named by the marker
    pub file: String,
    /// Line number the following output line has in `file`
    pub line: u32,
}

/// Output-line to original-file mapping
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    markers: Vec<LineMarker>,
}

impl SourceMap {
    /// Blank every directive line in `code`, keeping line numbering intact,
    /// and record the line markers among them.
    pub fn strip(code: &str) -> (String, SourceMap) {
        let mut stripped = String::with_capacity(code.len());
        let mut markers = Vec::new();

        for (index, line) in code.lines().enumerate() {
            if line.trim_start().starts_with('#') {
                if let Some((number, file)) = parse_marker(line) {
                    markers.push(LineMarker {
                        output_line: index,
                        file,
                        line: number,
                    });
                }
            } else {
                stripped.push_str(line);
            }
            stripped.push('\n');
        }

        (stripped, SourceMap { markers })
    }

    /// Original file and 1-based line for a 0-based output line
    pub fn locate(&self, output_line: usize) -> Option<(&str, u32)> {
        let idx = self.markers.partition_point(|m| m.output_line < output_line);
        let marker = self.markers.get(idx.checked_sub(1)?)?;
        let offset = (output_line - marker.output_line - 1) as u32;
        Some((marker.file.as_str(), marker.line + offset))
    }

    pub fn markers(&self) -> &[LineMarker] {
        &self.markers
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Real files named by markers, first-seen order
    pub fn included_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = Vec::new();
        for marker in &self.markers {
            if marker.file.starts_with('<') || marker.file.is_empty() {
                continue;
            }
            let path = PathBuf::from(&marker.file);
            if !files.contains(&path) {
                files.push(path);
            }
        }
        files
    }
}

/// Parse `# 12 "file.h" 1 3` or `#line 12 "file.h"`
fn parse_marker(line: &str) -> Option<(u32, String)> {
    let rest = line.trim_start().strip_prefix('#')?.trim_start();
    let rest = rest.strip_prefix("line").unwrap_or(rest).trim_start();

    let digits_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    if digits_end == 0 {
        return None;
    }
    let number: u32 = rest[..digits_end].parse().ok()?;

    let rest = rest[digits_end..].trim_start();
    let start = rest.find('"')?;
    let end = rest[start + 1..].find('"')?;
    let file = rest[start + 1..start + 1 + end].to_string();

    Some((number, file))
}
