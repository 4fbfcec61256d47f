//! # vgen
//!
//! Compiles HTML templates carrying `vg-` directives into Rust source that
//! builds a virtual node tree at runtime.
//!
//! ## Pipeline
//!
//! 1. **Mode detection**: the first start tag decides between a full
//!    document (`<html>`) and a fragment rooted at one mount element.
//! 2. **Parsing**: html5ever parses the bytes in that mode; the DOM is
//!    converted once into an owned [`TemplateNode`] tree.
//! 3. **Static compaction** (optional): fully static subtrees collapse into a
//!    single `vg-html` node.
//! 4. **Code generation**: one pass over the tree emits the preamble (native
//!    `application/x-rust` script blocks) and the `build` method body.
//! 5. **Finalize**: the regions are joined, formatted and written.
//!
//! ## Directives
//!
//! | Attribute      | Effect                                             |
//! |----------------|----------------------------------------------------|
//! | `vg-for="…"`   | wraps the element in `for … { }`                   |
//! | `vg-if="…"`    | wraps the element in `if … { }` (inside any loop)  |
//! | `vg-html="…"`  | sets inner HTML from an expression, skips children |
//! | `:name="…"`    | attribute value computed at runtime                |
//! | `@event="…"`   | event handler, `c` bound to the component          |
//!
//! Any other `vg-` attribute is rejected.
//!
//! Event handlers are `move` closures and must be `'static`. Variables bound
//! by an enclosing `vg-for` that a handler mentions are cloned into it, so
//! they have to implement `Clone`. For a reference such as the `x` in
//! `x in c.items.iter()`, the handler gets an owned copy when the item type
//! is `Clone`.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, instrument};

pub mod codegen;
pub mod compact;
pub mod config;
pub mod discovery;
pub mod error;
pub mod finalize;
pub mod ir;
pub mod parse;
pub mod runtime;
pub mod visitor;

#[cfg(test)]
mod compile_tests;

pub use codegen::{CompileState, Generator};
pub use compact::compact_static;
pub use config::{CompileConfig, PackageConfig};
pub use discovery::{compile_dir, FileOutcome, PackageReport};
pub use error::{CompileError, ErrorCategory};
pub use finalize::{CompileResult, PassthroughFormatter, RustFormatter, SourceFormatter};
pub use ir::{AttributeIR, AttributeKind, ElementKind, ElementNode, TemplateNode};
pub use parse::{detect_mode, parse_template, ParsedTemplate, TemplateMode};

/// Generated regions for one template, before they are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub mode: TemplateMode,
    pub state: CompileState,
}

/// Compiles templates with one fixed configuration.
#[derive(Clone)]
pub struct Compiler {
    config: CompileConfig,
    formatter: Arc<dyn SourceFormatter>,
}

impl Compiler {
    pub fn new(config: CompileConfig) -> Self {
        Self {
            config,
            formatter: Arc::new(RustFormatter),
        }
    }

    pub fn with_formatter(mut self, formatter: Arc<dyn SourceFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn config(&self) -> &CompileConfig {
        &self.config
    }

    /// Parse, compact and generate without touching the filesystem.
    pub fn generate(&self, source: &[u8], source_name: &str) -> Result<Generated, CompileError> {
        self.generate_inner(source)
            .map_err(|e| e.in_source(source_name))
    }

    /// Full compile: generate, format and write to `config.out_path()`.
    #[instrument(skip(self, source), fields(out = %self.config.out_path().display()))]
    pub fn compile(&self, source: &[u8], source_name: &str) -> Result<CompileResult, CompileError> {
        let generated = self.generate(source, source_name)?;
        finalize::write_generated(
            &generated.state,
            &self.config,
            generated.mode,
            self.formatter.as_ref(),
        )
        .map_err(|e| e.in_source(source_name))
    }

    /// Read `path` and compile it, labeling errors with the path.
    pub fn compile_file(&self, path: &Path) -> Result<CompileResult, CompileError> {
        let source_name = path.display().to_string();
        let source = std::fs::read(path).map_err(|source| {
            CompileError::Read {
                path: path.to_path_buf(),
                source,
            }
            .in_source(&source_name)
        })?;
        self.compile(&source, &source_name)
    }

    fn generate_inner(&self, source: &[u8]) -> Result<Generated, CompileError> {
        let mut template = parse::parse_template(source)?;

        if self.config.optimize_static {
            template.nodes = template.nodes.into_iter().map(compact_static).collect();
            debug!("compacted static subtrees");
        }

        let state = Generator::new(&self.config).generate(&template)?;
        Ok(Generated {
            mode: template.mode,
            state,
        })
    }
}

/// Compile `source` with `config` and the default formatter.
pub fn compile(
    source: &[u8],
    source_name: &str,
    config: CompileConfig,
) -> Result<CompileResult, CompileError> {
    Compiler::new(config).compile(source, source_name)
}
