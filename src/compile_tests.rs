use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::config::CompileConfig;
use crate::error::{CompileError, ErrorCategory, ERR_FORMAT};
use crate::finalize::PassthroughFormatter;
use crate::parse::TemplateMode;
use crate::{compile, Compiler};

fn config_in(dir: &Path) -> CompileConfig {
    CompileConfig {
        out_dir: dir.to_path_buf(),
        out_file: "page_vgen.rs".to_string(),
        struct_type: "Page".to_string(),
        ..Default::default()
    }
}

#[test]
fn test_compile_writes_formatted_file() {
    let dir = tempfile::tempdir().unwrap();
    let src = br#"<script type="application/x-rust">pub struct Page { pub title: String }</script>
<div class="page">
    <h1 :title="c.title">Hello</h1>
    <button @click="c.title.push('!')">more</button>
</div>"#;

    let result = compile(src, "page.vugu", config_in(dir.path())).unwrap();
    assert_eq!(result.mode, TemplateMode::Fragment);
    assert!(result.formatted);
    assert_eq!(result.out_path, dir.path().join("page_vgen.rs"));

    let written = fs::read_to_string(&result.out_path).unwrap();
    assert_eq!(written.len(), result.bytes_written);
    assert!(written.contains("DO NOT EDIT"));
    assert!(written.contains("pub struct Page"));
    assert!(written.contains("impl Page {"));
    assert!(written.contains("pub fn build(&mut self, vgin: &BuildIn) -> BuildResult {"));
    assert!(written.contains("use vgen::runtime::{"));
    syn::parse_file(&written).unwrap();
}

#[test]
fn test_written_output_is_deterministic() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    let src = br#"<html><head><style>a{}</style></head><body><ul><li vg-for="x in c.items.iter()" :id="x">t</li></ul></body></html>"#;

    let a = compile(src, "page.vugu", config_in(first.path())).unwrap();
    let b = compile(src, "page.vugu", config_in(second.path())).unwrap();
    assert_eq!(a.mode, TemplateMode::Document);
    assert_eq!(
        fs::read(&a.out_path).unwrap(),
        fs::read(&b.out_path).unwrap()
    );
}

#[test]
fn test_format_failure_still_writes_output() {
    let dir = tempfile::tempdir().unwrap();
    let err = compile(
        br#"<div vg-if="(c.open"></div>"#,
        "broken.vugu",
        config_in(dir.path()),
    )
    .unwrap_err();

    assert_eq!(err.code(), ERR_FORMAT);
    assert_eq!(err.category(), ErrorCategory::Format);
    assert!(err.to_string().starts_with("broken.vugu: "));

    let written = fs::read_to_string(dir.path().join("page_vgen.rs")).unwrap();
    assert!(written.contains("if (c.open {"));
    assert!(written.contains("// 'fix' unused imports"));
}

#[test]
fn test_compaction_toggle() {
    let src = b"<div><p>static <b>text</b></p></div>";

    let dir = tempfile::tempdir().unwrap();
    let on = compile(src, "a.vugu", config_in(dir.path())).unwrap();
    let optimized = fs::read_to_string(&on.out_path).unwrap();
    assert!(optimized.contains("set_inner_html"));
    assert!(!optimized.contains(r#"VgNode::element("b""#));

    let dir = tempfile::tempdir().unwrap();
    let config = CompileConfig {
        optimize_static: false,
        ..config_in(dir.path())
    };
    let off = compile(src, "a.vugu", config).unwrap();
    let plain = fs::read_to_string(&off.out_path).unwrap();
    assert!(!plain.contains("set_inner_html"));
    assert!(plain.contains(r#"VgNode::element("b", vec![])"#));
}

#[test]
fn test_passthrough_formatter_writes_raw_regions() {
    let dir = tempfile::tempdir().unwrap();
    let compiler =
        Compiler::new(config_in(dir.path())).with_formatter(Arc::new(PassthroughFormatter));

    let generated = compiler.generate(b"<div></div>", "p.vugu").unwrap();
    let result = compiler.compile(b"<div></div>", "p.vugu").unwrap();
    assert!(!result.formatted);
    assert_eq!(
        fs::read_to_string(&result.out_path).unwrap(),
        generated.state.assemble()
    );
}

#[test]
fn test_compile_file_labels_errors_with_path() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("two.vugu");
    fs::write(&template, "<div></div><span></span>").unwrap();

    let err = Compiler::new(config_in(dir.path()))
        .compile_file(&template)
        .unwrap_err();
    assert!(err.to_string().starts_with(&template.display().to_string()));
    assert!(matches!(err.innermost(), CompileError::SecondMountElement { .. }));
    assert!(!dir.path().join("page_vgen.rs").exists());

    let missing = dir.path().join("missing.vugu");
    let err = Compiler::new(config_in(dir.path()))
        .compile_file(&missing)
        .unwrap_err();
    assert!(matches!(err.innermost(), CompileError::Read { .. }));
    assert_eq!(err.category(), ErrorCategory::Io);
}

#[test]
fn test_write_failure_reported() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "not a directory").unwrap();

    let config = CompileConfig {
        out_dir: blocker.join("out"),
        ..config_in(dir.path())
    };
    let err = compile(b"<div></div>", "w.vugu", config).unwrap_err();
    assert!(matches!(err.innermost(), CompileError::Write { .. }));
}
