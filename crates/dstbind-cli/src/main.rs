//! dstbind CLI
//!
//! Command-line interface for resolving the DST2k headers.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dstbind_core::config::DEFAULT_FALLBACK_DIR;
use dstbind_core::Config;
use dstbind_resolve::{
    bank_header_names, gcc_pipeline, header_locator, load_tables, BindingOutput, Dependencies,
};
use dstbind_tables::HeaderTables;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dstbind")]
#[command(author, version, about = "DST2k header resolver", long_about = None)]
struct Cli {
    /// DST2k installation root (default: $DST2KTA_PATH)
    #[arg(long, global = true, value_name = "DIR")]
    dst_root: Option<PathBuf>,

    /// Stand-in standard library headers
    #[arg(long, global = true, value_name = "DIR", default_value = DEFAULT_FALLBACK_DIR)]
    fallback_dir: PathBuf,

    /// Header tables (YAML or JSON) replacing the built-in ones
    #[arg(long, global = true, value_name = "FILE")]
    tables: Option<PathBuf>,

    /// Preprocessor executable (default: detect gcc)
    #[arg(long, global = true, value_name = "PROGRAM")]
    preprocessor: Option<PathBuf>,

    /// Extra macro definition, NAME or NAME=VALUE
    #[arg(short = 'D', long = "define", global = true, value_name = "MACRO")]
    defines: Vec<String>,

    /// Skip the declaration check on each dependency split
    #[arg(long, global = true)]
    no_verify: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve every header and write the declaration blocks
    Build {
        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        out_dir: PathBuf,
    },

    /// Show the dependencies of a header
    Deps {
        /// Header name
        #[arg(value_name = "HEADER")]
        header: String,

        /// Show the dependency tree instead of the flattened list
        #[arg(long)]
        tree: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show the declarations a header introduces
    Decls {
        /// Header name
        #[arg(value_name = "HEADER")]
        header: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print the preprocessed text of a file or header
    Expand {
        /// Path to a file, or a header name
        #[arg(value_name = "FILE")]
        file: String,
    },

    /// List the project headers
    Headers,

    /// Print the header tables in effect
    Tables {
        /// Output format (yaml, json)
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Build { out_dir } => cmd_build(&cli, out_dir)?,
        Commands::Deps {
            header,
            tree,
            format,
        } => cmd_deps(&cli, header, *tree, format)?,
        Commands::Decls { header, format } => cmd_decls(&cli, header, format)?,
        Commands::Expand { file } => cmd_expand(&cli, file)?,
        Commands::Headers => cmd_headers(&cli)?,
        Commands::Tables { format } => cmd_tables(&cli, format)?,
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.dst_root {
        Some(root) => Config::from_root(root, &cli.fallback_dir)?,
        None => Config::from_env(&cli.fallback_dir)?,
    };
    config.tables = cli.tables.clone();
    config.preprocessor.program = cli.preprocessor.clone();
    config.preprocessor.defines = cli.defines.clone();
    config.verify_split = !cli.no_verify;
    Ok(config)
}

fn cmd_build(cli: &Cli, out_dir: &Path) -> Result<()> {
    let config = load_config(cli)?;
    let mut pipeline = gcc_pipeline(&config)?.with_progress(|event| {
        let mut stderr = std::io::stderr();
        let _ = write!(stderr, "read headers {:>3} / {}\r", event.current, event.total);
        let _ = stderr.flush();
    });

    let output = pipeline.run(&config.bank_source_dir);
    eprintln!();
    let output = output?;

    write_outputs(out_dir, &output)?;
    info!("Output written to {}", out_dir.display());
    println!(
        "{} bank headers, {} other headers -> {}",
        output.bank_headers.len(),
        output.other_headers.len(),
        out_dir.display()
    );
    Ok(())
}

/// Write the declaration blocks, glue source and manifest into `out_dir`.
///
/// Files are staged in a temporary directory inside `out_dir` and only
/// renamed into place once every one of them was written and every
/// target can be replaced.
fn write_outputs(out_dir: &Path, output: &BindingOutput) -> Result<()> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;
    let staging = tempfile::Builder::new()
        .prefix(".dstbind-")
        .tempdir_in(out_dir)
        .with_context(|| format!("creating staging directory in {}", out_dir.display()))?;

    let manifest = serde_json::to_string_pretty(output)?;
    let mut files = output.files();
    files.push(("manifest.json", manifest.as_str()));

    for (name, content) in &files {
        let path = staging.path().join(name);
        std::fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
    }
    for (name, _) in &files {
        let target = out_dir.join(name);
        if target.is_dir() {
            bail!("{} is a directory", target.display());
        }
    }
    for (name, _) in &files {
        let target = out_dir.join(name);
        std::fs::rename(staging.path().join(name), &target)
            .with_context(|| format!("moving {} into place", target.display()))?;
    }

    Ok(())
}

fn cmd_deps(cli: &Cli, header: &str, tree: bool, format: &str) -> Result<()> {
    let config = load_config(cli)?;
    let mut pipeline = gcc_pipeline(&config)?;
    let deps = pipeline.resolver_mut().resolve(header, !tree)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&deps)?),
        "text" => match deps {
            Dependencies::Flat(list) => {
                for dep in list {
                    println!("{}", dep);
                }
            }
            Dependencies::Tree(tree) => print!("{}", tree.render_text()),
        },
        other => bail!("unknown format '{}' (expected text or json)", other),
    }

    Ok(())
}

fn cmd_decls(cli: &Cli, header: &str, format: &str) -> Result<()> {
    let config = load_config(cli)?;
    let mut pipeline = gcc_pipeline(&config)?;
    let decls = pipeline.resolve_header(header)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&decls)?),
        "text" => {
            for decl in &decls {
                println!("{}", decl.render());
            }
        }
        other => bail!("unknown format '{}' (expected text or json)", other),
    }

    Ok(())
}

fn cmd_expand(cli: &Cli, file: &str) -> Result<()> {
    let config = load_config(cli)?;
    let mut pipeline = gcc_pipeline(&config)?;

    let path = Path::new(file);
    let result = if path.is_file() {
        pipeline.expand_file(path)?
    } else {
        pipeline.expand_header(file)?
    };

    print!("{}", result.code);
    Ok(())
}

fn cmd_headers(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let tables = load_tables(&config)?;
    let locator = header_locator(&config, &tables);
    let bank = bank_header_names(&config.bank_source_dir)?;

    for header in locator.project_headers()? {
        let kind = if bank.contains(&header) { "bank" } else { "other" };
        println!("{:<6} {}", kind, header);
    }

    Ok(())
}

fn cmd_tables(cli: &Cli, format: &str) -> Result<()> {
    let tables = match &cli.tables {
        Some(path) => HeaderTables::load(path)?,
        None => load_tables_default()?,
    };

    match format {
        "yaml" => print!("{}", tables.to_yaml()?),
        "json" => println!("{}", serde_json::to_string_pretty(&tables)?),
        other => bail!("unknown format '{}' (expected yaml or json)", other),
    }

    Ok(())
}

/// Tables for commands that run without a DST2k root
fn load_tables_default() -> Result<HeaderTables> {
    match Config::from_env(DEFAULT_FALLBACK_DIR) {
        Ok(config) => Ok(load_tables(&config)?),
        Err(_) => Ok(HeaderTables::builtin()?),
    }
}
