//! Compile configuration.
//!
//! `CompileConfig` is fixed for the duration of one compile. `PackageConfig`
//! describes how a directory of templates maps onto per-file configs.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_RUNTIME_PATH: &str = "vgen::runtime";
pub const DEFAULT_TEMPLATE_EXTENSION: &str = "vugu";
pub const DEFAULT_OUTPUT_SUFFIX: &str = "_vgen.rs";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileConfig {
    /// Directory the generated file is written to.
    pub out_dir: PathBuf,
    /// Generated file name inside `out_dir`.
    pub out_file: String,
    /// Module name recorded in the generated header.
    pub package_name: String,
    /// Type the generated `build` method is implemented on.
    pub struct_type: String,
    /// Collapse fully static subtrees into a single `vg-html` node.
    pub optimize_static: bool,
    /// Path generated code imports the runtime types from.
    pub runtime_path: String,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("."),
            out_file: "root_vgen.rs".to_string(),
            package_name: "main".to_string(),
            struct_type: "Root".to_string(),
            optimize_static: true,
            runtime_path: DEFAULT_RUNTIME_PATH.to_string(),
        }
    }
}

impl CompileConfig {
    pub fn out_path(&self) -> PathBuf {
        self.out_dir.join(&self.out_file)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PackageConfig {
    /// Template file extension, without the dot.
    pub extension: String,
    /// Appended to the template stem to name the generated file.
    pub output_suffix: String,
    /// Module name for every file; the directory name when unset.
    pub package_name: Option<String>,
    pub optimize_static: bool,
    pub runtime_path: String,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            extension: DEFAULT_TEMPLATE_EXTENSION.to_string(),
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
            package_name: None,
            optimize_static: true,
            runtime_path: DEFAULT_RUNTIME_PATH.to_string(),
        }
    }
}

impl PackageConfig {
    /// Config for one template: output beside the template, struct type from
    /// the file stem.
    pub fn config_for(&self, root: &Path, template: &Path) -> CompileConfig {
        let stem = template
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let package_name = self.package_name.clone().unwrap_or_else(|| {
            root.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "main".to_string())
        });

        CompileConfig {
            out_dir: template
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
            out_file: format!("{}{}", stem, self.output_suffix),
            package_name,
            struct_type: struct_type_from_stem(&stem),
            optimize_static: self.optimize_static,
            runtime_path: self.runtime_path.clone(),
        }
    }
}

/// `my-widget` → `MyWidget`, `root` → `Root`, `nav_bar` → `NavBar`.
pub fn struct_type_from_stem(stem: &str) -> String {
    let mut out = String::with_capacity(stem.len());
    for part in stem.split(|c: char| !c.is_ascii_alphanumeric()) {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, 'C');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_struct_type_from_stem() {
        assert_eq!(struct_type_from_stem("root"), "Root");
        assert_eq!(struct_type_from_stem("my-widget"), "MyWidget");
        assert_eq!(struct_type_from_stem("nav_bar"), "NavBar");
        assert_eq!(struct_type_from_stem("404"), "C404");
    }

    #[test]
    fn test_config_for_template() {
        let pkg = PackageConfig::default();
        let cfg = pkg.config_for(Path::new("/app/ui"), Path::new("/app/ui/forms/login-form.vugu"));
        assert_eq!(cfg.out_dir, PathBuf::from("/app/ui/forms"));
        assert_eq!(cfg.out_file, "login-form_vgen.rs");
        assert_eq!(cfg.struct_type, "LoginForm");
        assert_eq!(cfg.package_name, "ui");
    }

    #[test]
    fn test_config_json_defaults() {
        let cfg: CompileConfig =
            serde_json::from_str(r#"{"structType": "Page", "optimizeStatic": false}"#).unwrap();
        assert_eq!(cfg.struct_type, "Page");
        assert!(!cfg.optimize_static);
        assert_eq!(cfg.runtime_path, DEFAULT_RUNTIME_PATH);
    }
}
