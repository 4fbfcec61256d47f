//! Finalize Module for vgen
//!
//! Joins the generated regions, formats the result and writes it out. A
//! formatter failure still writes the unformatted text so the broken output
//! can be inspected, then reports the failure.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::codegen::CompileState;
use crate::config::CompileConfig;
use crate::error::CompileError;
use crate::parse::TemplateMode;

/// Outcome of a successful compile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileResult {
    pub out_path: PathBuf,
    pub mode: TemplateMode,
    /// False when the output went through an identity formatter.
    pub formatted: bool,
    pub bytes_written: usize,
}

// ═══════════════════════════════════════════════════════════════════════════════
// FORMATTERS
// ═══════════════════════════════════════════════════════════════════════════════

pub trait SourceFormatter: Send + Sync {
    fn format(&self, source: &str) -> Result<String, CompileError>;

    /// True for formatters that return their input unchanged.
    fn is_identity(&self) -> bool {
        false
    }
}

/// Parses the output with `syn` and prints it back with `prettyplease`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustFormatter;

impl SourceFormatter for RustFormatter {
    fn format(&self, source: &str) -> Result<String, CompileError> {
        let file = syn::parse_file(source).map_err(|e| {
            let start = e.span().start();
            CompileError::Format {
                message: format!("{}:{}: {}", start.line, start.column + 1, e),
            }
        })?;
        Ok(prettyplease::unparse(&file))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughFormatter;

impl SourceFormatter for PassthroughFormatter {
    fn format(&self, source: &str) -> Result<String, CompileError> {
        Ok(source.to_string())
    }

    fn is_identity(&self) -> bool {
        true
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// WRITE
// ═══════════════════════════════════════════════════════════════════════════════

/// Assemble, format and write the generated file to `config.out_path()`.
pub fn write_generated(
    state: &CompileState,
    config: &CompileConfig,
    mode: TemplateMode,
    formatter: &dyn SourceFormatter,
) -> Result<CompileResult, CompileError> {
    let source = state.assemble();
    let out_path = config.out_path();

    match formatter.format(&source) {
        Ok(formatted) => {
            write_output(&out_path, &formatted)?;
            debug!(path = %out_path.display(), bytes = formatted.len(), "wrote generated file");
            Ok(CompileResult {
                out_path,
                mode,
                formatted: !formatter.is_identity(),
                bytes_written: formatted.len(),
            })
        }
        Err(err) => {
            warn!(
                path = %out_path.display(),
                error = %err,
                "formatting failed, writing unformatted output"
            );
            write_output(&out_path, &source)?;
            Err(err)
        }
    }
}

fn write_output(path: &Path, contents: &str) -> Result<(), CompileError> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir).map_err(|source| CompileError::Write {
                path: dir.to_path_buf(),
                source,
            })?;
        }
    }
    fs::write(path, contents).map_err(|source| CompileError::Write {
        path: path.to_path_buf(),
        source,
    })
}
