//! `vgen` command-line entry point.
//!
//! ```text
//! vgen [OPTIONS] <PATH>...
//! ```
//!
//! A directory compiles every template under it; a file compiles just that
//! template.

mod logging;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info};

use vgen::discovery::{compile_dir, FileOutcome, PackageReport};
use vgen::{Compiler, PackageConfig, PassthroughFormatter, RustFormatter, SourceFormatter};

#[derive(Parser, Debug)]
#[command(name = "vgen")]
#[command(author, version, about = "Compile vg-directive HTML templates into Rust build functions", long_about = None)]
struct Cli {
    /// Template files or directories of templates.
    #[arg(required = true, value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// JSON package config (extension, outputSuffix, packageName, optimizeStatic, runtimePath).
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output directory (single file only; defaults to the template's directory).
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Output file name (single file only).
    #[arg(long, value_name = "NAME")]
    out_file: Option<String>,

    /// Module name written into the generated header.
    #[arg(long)]
    package: Option<String>,

    /// Type the build method is implemented on (single file only).
    #[arg(long)]
    struct_type: Option<String>,

    /// Do not collapse static subtrees.
    #[arg(long)]
    no_optimize: bool,

    /// Write generated code without formatting.
    #[arg(long)]
    no_fmt: bool,

    /// Print the report and logs as JSON.
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.json);

    let package = load_package_config(&cli)?;
    let formatter: Arc<dyn SourceFormatter> = if cli.no_fmt {
        Arc::new(PassthroughFormatter)
    } else {
        Arc::new(RustFormatter)
    };

    let mut reports = Vec::new();
    for path in &cli.paths {
        let report = if path.is_dir() {
            compile_dir(path, &package, formatter.clone())
                .with_context(|| format!("failed to compile package {}", path.display()))?
        } else {
            compile_single(&cli, &package, formatter.clone(), path)
        };
        reports.push(report);
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }

    let failed: usize = reports.iter().map(|r| r.failed).sum();
    let compiled: usize = reports.iter().map(|r| r.compiled).sum();
    info!(compiled, failed, "done");
    if failed > 0 {
        bail!("{} of {} template(s) failed", failed, failed + compiled);
    }
    Ok(())
}

fn load_package_config(cli: &Cli) -> Result<PackageConfig> {
    let mut package = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => PackageConfig::default(),
    };

    if let Some(name) = &cli.package {
        package.package_name = Some(name.clone());
    }
    if cli.no_optimize {
        package.optimize_static = false;
    }
    Ok(package)
}

fn compile_single(
    cli: &Cli,
    package: &PackageConfig,
    formatter: Arc<dyn SourceFormatter>,
    path: &Path,
) -> PackageReport {
    let root = path.parent().unwrap_or_else(|| Path::new("."));
    let mut config = package.config_for(root, path);
    if let Some(dir) = &cli.out_dir {
        config.out_dir = dir.clone();
    }
    if let Some(file) = &cli.out_file {
        config.out_file = file.clone();
    }
    if let Some(ty) = &cli.struct_type {
        config.struct_type = ty.clone();
    }

    let result = Compiler::new(config).with_formatter(formatter).compile_file(path);
    match &result {
        Ok(out) => info!(path = %path.display(), out = %out.out_path.display(), "compiled"),
        Err(err) => error!(code = err.code(), "{}", err),
    }
    let outcome = FileOutcome::from_result(path, &result);

    PackageReport {
        root: root.to_path_buf(),
        compiled: usize::from(outcome.ok),
        failed: usize::from(!outcome.ok),
        files: vec![outcome],
    }
}
