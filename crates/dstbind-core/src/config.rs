//! Configuration types

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable naming the DST2k installation root
pub const DST_ROOT_ENV: &str = "DST2KTA_PATH";

/// Default directory holding the stand-in standard library headers
pub const DEFAULT_FALLBACK_DIR: &str = "fake_libc_include";

/// dstbind run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// DST2k installation root
    pub dst_root: PathBuf,

    /// Project headers (`<root>/inc`)
    pub include_dir: PathBuf,

    /// Prebuilt libraries (`<root>/lib`)
    pub lib_dir: PathBuf,

    /// Bank implementation sources (`<root>/src/bank/lib`)
    pub bank_source_dir: PathBuf,

    /// Stand-in standard library headers
    pub fallback_dir: PathBuf,

    /// External preprocessor settings
    pub preprocessor: PreprocessorConfig,

    /// Cross-check each positional split against declaration names
    pub verify_split: bool,

    /// Table overrides (YAML or JSON); built-in tables when absent
    pub tables: Option<PathBuf>,
}

impl Config {
    /// Build a configuration from a DST2k root, checking that every
    /// directory the pipeline reads from exists.
    pub fn from_root(dst_root: impl Into<PathBuf>, fallback_dir: impl Into<PathBuf>) -> Result<Self> {
        let dst_root = dst_root.into();
        let fallback_dir = fallback_dir.into();

        require_dir(&dst_root, "DST2k root")?;
        let include_dir = dst_root.join("inc");
        require_dir(&include_dir, "include directory")?;
        let lib_dir = dst_root.join("lib");
        require_dir(&lib_dir, "library directory")?;
        let bank_source_dir = dst_root.join("src").join("bank").join("lib");
        require_dir(&bank_source_dir, "bank source directory")?;
        require_dir(&fallback_dir, "fallback header directory")?;

        Ok(Self {
            dst_root,
            include_dir,
            lib_dir,
            bank_source_dir,
            fallback_dir,
            preprocessor: PreprocessorConfig::default(),
            verify_split: true,
            tables: None,
        })
    }

    /// Build a configuration from the `DST2KTA_PATH` environment variable
    pub fn from_env(fallback_dir: impl Into<PathBuf>) -> Result<Self> {
        let root = std::env::var_os(DST_ROOT_ENV).ok_or_else(|| {
            Error::Config(format!("environment variable '{}' is not defined", DST_ROOT_ENV))
        })?;
        Self::from_root(PathBuf::from(root), fallback_dir)
    }
}

/// External preprocessor configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreprocessorConfig {
    /// Preprocessor executable; auto-detected when absent
    pub program: Option<PathBuf>,

    /// Extra macro definitions (`NAME` or `NAME=VALUE`)
    pub defines: Vec<String>,

    /// Additional arguments passed through verbatim
    pub extra_args: Vec<String>,
}

fn require_dir(path: &Path, what: &str) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(Error::Config(format!("{} not found: {}", what, path.display())))
    }
}
