//! Pipeline orchestration
//!
//! Resolves every header exactly once, dependencies before dependents:
//!
//! ```text
//! locate -> scan -> correct -> include order
//!        -> preprocess(implied + deps + text) -> parse -> split -> memo
//! ```

use dstbind_core::{Config, Declaration, Error, HeaderOrigin, Result};
use dstbind_parser::preprocessor::{list_files_with_extension, MacroDefinition};
use dstbind_parser::{
    build_translation_unit, HeaderLocator, PreprocessOptions, PreprocessResult, Preprocessor,
    TreeSitterParser,
};
use dstbind_tables::HeaderTables;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::corrector::DependencyCorrector;
use crate::dedup::{split_own_declarations, DeclarationMemo};
use crate::render::{glue_source, render_block, BindingOutput, DeclarationFilter};
use crate::resolver::DependencyResolver;

/// Progress callback type
pub type ProgressCallback = Box<dyn FnMut(ProgressEvent)>;

/// Emitted after each project header is resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Project headers resolved so far
    pub current: usize,
    /// Eligible project headers
    pub total: usize,
    /// Header whose resolution produced this event
    pub header: String,
}

/// Header resolution pipeline
pub struct Pipeline<P: Preprocessor> {
    resolver: DependencyResolver,
    preprocessor: P,
    parser: TreeSitterParser,
    tables: HeaderTables,
    options: PreprocessOptions,
    memo: DeclarationMemo,
    verify_split: bool,
    include_dir: PathBuf,
    lib_dir: PathBuf,
    resolved_projects: usize,
    progress_callback: Option<ProgressCallback>,
}

impl<P: Preprocessor> Pipeline<P> {
    /// Create a pipeline for the header set described by `config`
    pub fn new(config: &Config, tables: HeaderTables, preprocessor: P) -> Self {
        let locator = header_locator(config, &tables);

        let mut options = PreprocessOptions::with_includes(locator.search_paths());
        options.defines = config
            .preprocessor
            .defines
            .iter()
            .map(|d| MacroDefinition::parse(d))
            .collect();
        options.extra_args = config.preprocessor.extra_args.clone();

        let corrector = DependencyCorrector::new(tables.corrections.clone());

        Self {
            resolver: DependencyResolver::new(locator, corrector),
            preprocessor,
            parser: TreeSitterParser::new(),
            tables,
            options,
            memo: DeclarationMemo::new(),
            verify_split: config.verify_split,
            include_dir: config.include_dir.clone(),
            lib_dir: config.lib_dir.clone(),
            resolved_projects: 0,
            progress_callback: None,
        }
    }

    /// Set progress callback
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: FnMut(ProgressEvent) + 'static,
    {
        self.progress_callback = Some(Box::new(callback));
        self
    }

    pub fn memo(&self) -> &DeclarationMemo {
        &self.memo
    }

    pub fn resolver_mut(&mut self) -> &mut DependencyResolver {
        &mut self.resolver
    }

    /// Declarations `name` itself introduces.
    ///
    /// Dependencies are resolved first, depth-first in declaration order.
    /// A header already in the memo is returned unchanged.
    pub fn resolve_header(&mut self, name: &str) -> Result<Vec<Declaration>> {
        if let Some(decls) = self.memo.get(name) {
            return Ok(decls.to_vec());
        }

        let mut path: Vec<String> = vec![name.to_string()];
        let mut stack: Vec<(String, Vec<String>, usize)> =
            vec![(name.to_string(), self.resolver.direct_dependencies(name)?, 0)];

        while let Some(frame) = stack.last_mut() {
            if frame.2 < frame.1.len() {
                let child = frame.1[frame.2].clone();
                frame.2 += 1;

                if self.memo.contains(&child) {
                    continue;
                }
                if let Some(start) = path.iter().position(|p| *p == child) {
                    let mut cycle = path[start..].to_vec();
                    cycle.push(child);
                    return Err(Error::DependencyCycle(cycle));
                }

                debug!("{}resolving {}", "  ".repeat(path.len()), child);
                let deps = self.resolver.direct_dependencies(&child)?;
                path.push(child.clone());
                stack.push((child, deps, 0));
            } else if let Some((header, _, _)) = stack.pop() {
                path.pop();
                self.process_header(&header, path.len())?;
            }
        }

        Ok(self.memo.get(name).map(|d| d.to_vec()).unwrap_or_default())
    }

    /// Preprocess, parse and split one header whose dependencies are all
    /// in the memo
    fn process_header(&mut self, name: &str, depth: usize) -> Result<()> {
        let source = self.resolver.source(name)?.clone();
        let order = self.resolver.include_order(name)?;
        let dependencies = self.resolver.flatten(name)?;

        let unit = build_translation_unit(&source.implied_includes, &order, &source.text);
        let expanded = self.preprocessor.preprocess_string(&unit, &self.options)?;
        let parsed = self.parser.parse_source(&expanded.code, name)?;

        let total = parsed.declarations.len();
        let own = split_own_declarations(
            name,
            parsed.declarations,
            &dependencies,
            &self.memo,
            self.verify_split,
        )?;

        debug!(
            "{}{}: {} declarations, {} own",
            "  ".repeat(depth),
            name,
            total,
            own.len()
        );

        self.memo.insert(name, own);
        if source.origin == HeaderOrigin::Project {
            self.resolved_projects += 1;
        }
        Ok(())
    }

    /// Preprocessed text of a header as the pipeline feeds it to the parser
    pub fn expand_header(&mut self, name: &str) -> Result<PreprocessResult> {
        let source = self.resolver.source(name)?.clone();
        let order = self.resolver.include_order(name)?;
        let unit = build_translation_unit(&source.implied_includes, &order, &source.text);
        Ok(self.preprocessor.preprocess_string(&unit, &self.options)?)
    }

    /// Preprocess a file as-is with the pipeline's search paths
    pub fn expand_file(&self, path: &Path) -> Result<PreprocessResult> {
        Ok(self.preprocessor.preprocess_file(path, &self.options)?)
    }

    /// Resolve every eligible project header and render the output blocks.
    ///
    /// Bank headers are those with a `<stem>.c` in `bank_source_dir`.
    pub fn run(&mut self, bank_source_dir: &Path) -> Result<BindingOutput> {
        let headers = self.resolver.locator().project_headers()?;
        let total = headers.len();
        info!("Resolving {} headers", total);

        for header in &headers {
            self.resolve_header(header)?;
            self.emit_progress(total, header);
        }

        let output = self.render(&headers, bank_source_dir)?;
        info!(
            "Resolved {} headers ({} bank, {} other)",
            self.memo.len(),
            output.bank_headers.len(),
            output.other_headers.len()
        );
        Ok(output)
    }

    fn emit_progress(&mut self, total: usize, header: &str) {
        let current = self.resolved_projects;
        if let Some(callback) = self.progress_callback.as_mut() {
            callback(ProgressEvent {
                current,
                total,
                header: header.to_string(),
            });
        }
    }

    fn render(&mut self, headers: &[String], bank_source_dir: &Path) -> Result<BindingOutput> {
        let bank_names = bank_header_names(bank_source_dir)?;
        let eligible: HashSet<&String> = headers.iter().collect();

        let mut standard_set: HashSet<String> = HashSet::new();
        for implied in self.tables.implied_includes.clone() {
            standard_set.extend(self.resolver.flatten(&implied)?);
            standard_set.insert(implied);
        }

        let mut bank_headers = Vec::new();
        let mut other_headers = Vec::new();
        for header in self.memo.headers() {
            if !eligible.contains(header) {
                continue;
            }
            if bank_names.contains(header) {
                bank_headers.push(header.clone());
            } else if *header == self.tables.standard_types_header {
                other_headers.insert(0, header.clone());
            } else {
                other_headers.push(header.clone());
            }
        }

        let filter = DeclarationFilter::new(&self.tables);
        let memo = &self.memo;

        let standard_types = render_block(
            declarations_of(memo, memo.headers().iter().filter(|h| standard_set.contains(*h))),
            &filter,
        );
        let bank_declarations = render_block(declarations_of(memo, &bank_headers), &filter);
        let other_declarations = render_block(
            declarations_of(memo, other_headers.iter().filter(|h| !standard_set.contains(*h))),
            &filter,
        );

        Ok(BindingOutput {
            standard_types,
            bank_declarations,
            other_declarations,
            glue_source: glue_source(&self.include_dir, &other_headers),
            bank_headers,
            other_headers,
            include_dirs: vec![self.include_dir.clone()],
            library_dirs: vec![self.lib_dir.clone()],
            libraries: self.tables.libraries.clone(),
        })
    }
}

/// Locator over the configured directories with the tables' implied and
/// invalid headers
pub fn header_locator(config: &Config, tables: &HeaderTables) -> HeaderLocator {
    HeaderLocator::new(config.include_dir.clone(), config.fallback_dir.clone())
        .with_implied_includes(tables.implied_includes.clone())
        .with_invalid_headers(tables.invalid_header_names())
}

/// Headers with a bank implementation: `<stem>.h` for each `<stem>.c`
pub fn bank_header_names(bank_source_dir: &Path) -> Result<HashSet<String>> {
    let names = list_files_with_extension(bank_source_dir, "c")?
        .into_iter()
        .map(|c| format!("{}.h", c.trim_end_matches(".c")))
        .collect();
    Ok(names)
}

/// Memo entries of `headers`, concatenated
fn declarations_of<'m, 'h>(
    memo: &'m DeclarationMemo,
    headers: impl IntoIterator<Item = &'h String>,
) -> Vec<&'m Declaration> {
    headers
        .into_iter()
        .filter_map(|h| memo.get(h))
        .flat_map(|d| d.iter())
        .collect()
}
