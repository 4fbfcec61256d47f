//! Discovery Module for vgen
//!
//! Finds every template under a directory and compiles each one next to its
//! source. Files compile in parallel and independently: one failure is
//! recorded in the report and the rest carry on.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::PackageConfig;
use crate::error::CompileError;
use crate::finalize::{CompileResult, SourceFormatter};
use crate::Compiler;

// ═══════════════════════════════════════════════════════════════════════════════
// REPORT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOutcome {
    pub path: PathBuf,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageReport {
    pub root: PathBuf,
    pub compiled: usize,
    pub failed: usize,
    pub files: Vec<FileOutcome>,
}

impl FileOutcome {
    pub fn from_result(path: &Path, result: &Result<CompileResult, CompileError>) -> Self {
        match result {
            Ok(result) => Self {
                path: path.to_path_buf(),
                ok: true,
                out_path: Some(result.out_path.clone()),
                code: None,
                message: None,
            },
            Err(err) => Self {
                path: path.to_path_buf(),
                ok: false,
                out_path: None,
                code: Some(err.code().to_string()),
                message: Some(err.to_string()),
            },
        }
    }
}

impl PackageReport {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DISCOVERY
// ═══════════════════════════════════════════════════════════════════════════════

/// Templates under `root` with the given extension, in sorted path order.
/// Hidden directories are not entered.
pub fn find_templates(root: &Path, extension: &str) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == extension) {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    files
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

// ═══════════════════════════════════════════════════════════════════════════════
// PACKAGE COMPILATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Compile every template under `root`.
pub fn compile_dir(
    root: &Path,
    package: &PackageConfig,
    formatter: Arc<dyn SourceFormatter>,
) -> Result<PackageReport, CompileError> {
    if !root.is_dir() {
        return Err(CompileError::Read {
            path: root.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        });
    }

    let templates = find_templates(root, &package.extension);
    info!(root = %root.display(), templates = templates.len(), "compiling package");

    let files: Vec<FileOutcome> = templates
        .par_iter()
        .map(|path| {
            let compiler =
                Compiler::new(package.config_for(root, path)).with_formatter(formatter.clone());
            let result = compiler.compile_file(path);
            match &result {
                Ok(out) => info!(path = %path.display(), out = %out.out_path.display(), "compiled"),
                Err(err) => warn!(path = %path.display(), code = err.code(), error = %err, "failed"),
            }
            FileOutcome::from_result(path, &result)
        })
        .collect();

    let failed = files.iter().filter(|f| !f.ok).count();
    Ok(PackageReport {
        root: root.to_path_buf(),
        compiled: files.len() - failed,
        failed,
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ERR_MOUNT;
    use crate::finalize::RustFormatter;
    use std::fs;

    #[test]
    fn test_find_templates_sorted_and_skips_hidden() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();
        fs::create_dir_all(dir.path().join(".cache")).unwrap();
        fs::write(dir.path().join("b/z.vugu"), "<div></div>").unwrap();
        fs::write(dir.path().join("a.vugu"), "<div></div>").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        fs::write(dir.path().join(".cache/c.vugu"), "<div></div>").unwrap();

        let found = find_templates(dir.path(), "vugu");
        assert_eq!(
            found,
            vec![dir.path().join("a.vugu"), dir.path().join("b/z.vugu")]
        );
    }

    #[test]
    fn test_compile_dir_reports_each_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("good-page.vugu"), "<div><p>hi</p></div>").unwrap();
        fs::write(dir.path().join("two-roots.vugu"), "<div></div><span></span>").unwrap();

        let report =
            compile_dir(dir.path(), &PackageConfig::default(), Arc::new(RustFormatter)).unwrap();
        assert_eq!(report.compiled, 1);
        assert_eq!(report.failed, 1);
        assert!(!report.is_success());

        let good = &report.files[0];
        assert!(good.ok);
        let generated = fs::read_to_string(dir.path().join("good-page_vgen.rs")).unwrap();
        assert!(generated.contains("impl GoodPage"));

        let bad = &report.files[1];
        assert!(!bad.ok);
        assert_eq!(bad.code.as_deref(), Some(ERR_MOUNT));
        assert!(!dir.path().join("two-roots_vgen.rs").exists());
    }

    #[test]
    fn test_compile_dir_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let err = compile_dir(
            &dir.path().join("missing"),
            &PackageConfig::default(),
            Arc::new(RustFormatter),
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::Read { .. }));
    }
}
