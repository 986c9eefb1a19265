//! dstbind Resolve
//!
//! Turns the DST2k header set into deduplicated declarations:
//! - Missing-include correction
//! - Transitive dependency resolution with cycle detection
//! - Positional declaration deduplication against a memo
//! - Whole-run orchestration and output rendering

pub mod corrector;
pub mod dedup;
pub mod pipeline;
pub mod render;
pub mod resolver;

use dstbind_core::{Config, Result};
use dstbind_parser::GccPreprocessor;
use dstbind_tables::HeaderTables;
use tracing::info;

pub use corrector::DependencyCorrector;
pub use dedup::{split_own_declarations, DeclarationMemo};
pub use pipeline::{bank_header_names, header_locator, Pipeline, ProgressCallback, ProgressEvent};
pub use render::{BindingOutput, DeclarationFilter};
pub use resolver::{Dependencies, DependencyResolver, DependencyTree};

/// Tables named by the configuration, or the built-in ones
pub fn load_tables(config: &Config) -> Result<HeaderTables> {
    match &config.tables {
        Some(path) => {
            info!("Using tables from {:?}", path);
            HeaderTables::load(path)
        }
        None => HeaderTables::builtin(),
    }
}

/// Pipeline running the configured (or auto-detected) gcc
pub fn gcc_pipeline(config: &Config) -> Result<Pipeline<GccPreprocessor>> {
    let tables = load_tables(config)?;
    let preprocessor = match &config.preprocessor.program {
        Some(program) => GccPreprocessor::with_path(program.clone()),
        None => GccPreprocessor::new()?,
    };
    info!("Preprocessing with {:?}", preprocessor.program());
    Ok(Pipeline::new(config, tables, preprocessor))
}
