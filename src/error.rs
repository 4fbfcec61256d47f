//! Error Module for vgen
//!
//! Every failure is terminal for the template being compiled. Each variant
//! carries the offending tag, attribute or value so the caller can point at it.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_PARSE: &str = "VG-ERR-PARSE";
pub const ERR_STRUCTURE: &str = "VG-ERR-STRUCTURE";
pub const ERR_MOUNT: &str = "VG-ERR-MOUNT";
pub const ERR_SCRIPT: &str = "VG-ERR-SCRIPT";
pub const ERR_DIRECTIVE: &str = "VG-ERR-DIRECTIVE";
pub const ERR_COMPONENT: &str = "VG-ERR-COMPONENT";
pub const ERR_FORMAT: &str = "VG-ERR-FORMAT";
pub const ERR_IO: &str = "VG-ERR-IO";

/// Broad class of a [`CompileError`], used by callers deciding whether to
/// abort a larger build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCategory {
    Parse,
    Structural,
    Unimplemented,
    Format,
    Io,
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("{source_name}: {error}")]
    InSource {
        source_name: String,
        #[source]
        error: Box<CompileError>,
    },

    #[error("failed to parse template: {0}")]
    Parse(String),

    #[error("no start tag found in template")]
    NoStartTag,

    #[error("full HTML mode but not exactly 1 node found (found {found})")]
    DocumentNodeCount { found: usize },

    #[error("unknown tag inside html {tag:?}")]
    UnknownHtmlChild { tag: String },

    #[error("component cannot use {tag:?} as top level tag")]
    ForbiddenTopLevelTag { tag: String },

    #[error("element {tag:?} found after we already have a mount element")]
    SecondMountElement { tag: String },

    #[error("unexpected text outside any element: {text:?}")]
    UnexpectedText { text: String },

    #[error("invalid component tag name {tag:?} must contain exactly one colon")]
    InvalidComponentTag { tag: String },

    #[error("component tag not yet supported ({tag:?})")]
    ComponentUnsupported { tag: String },

    #[error("found script tag with invalid mime type {mime:?}")]
    InvalidScriptType { mime: String },

    #[error("attribute {attr:?} not allowed on script tag that contains JS code")]
    ScriptAttributeNotAllowed { attr: String },

    #[error("script type {value:?} invalid (must be application/javascript)")]
    ScriptTypeNotAllowed { value: String },

    #[error("{tag} tag contains non-text child {child:?}")]
    NonTextChild { tag: String, child: String },

    #[error("link tag should not have children")]
    LinkHasChildren,

    #[error("unknown directive attribute {attr:?} on {tag:?}")]
    UnknownDirective { tag: String, attr: String },

    #[error("attribute {attr:?} is not allowed on {tag:?}")]
    DirectiveNotAllowed { tag: String, attr: String },

    #[error("formatting generated code failed: {message}")]
    Format { message: String },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CompileError {
    /// Label this error with the logical name of the template it came from.
    pub fn in_source(self, source_name: &str) -> Self {
        match self {
            labeled @ CompileError::InSource { .. } => labeled,
            error => CompileError::InSource {
                source_name: source_name.to_string(),
                error: Box::new(error),
            },
        }
    }

    /// The error with any source labels stripped.
    pub fn innermost(&self) -> &CompileError {
        match self {
            CompileError::InSource { error, .. } => error.innermost(),
            other => other,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self.innermost() {
            CompileError::Parse(_) | CompileError::NoStartTag => ErrorCategory::Parse,
            CompileError::ComponentUnsupported { .. } => ErrorCategory::Unimplemented,
            CompileError::Format { .. } => ErrorCategory::Format,
            CompileError::Read { .. } | CompileError::Write { .. } => ErrorCategory::Io,
            _ => ErrorCategory::Structural,
        }
    }

    /// Stable diagnostic code for reports.
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::InSource { error, .. } => error.code(),
            CompileError::Parse(_) | CompileError::NoStartTag => ERR_PARSE,
            CompileError::DocumentNodeCount { .. }
            | CompileError::UnknownHtmlChild { .. }
            | CompileError::UnexpectedText { .. } => ERR_STRUCTURE,
            CompileError::ForbiddenTopLevelTag { .. } | CompileError::SecondMountElement { .. } => {
                ERR_MOUNT
            }
            CompileError::InvalidScriptType { .. }
            | CompileError::ScriptAttributeNotAllowed { .. }
            | CompileError::ScriptTypeNotAllowed { .. }
            | CompileError::NonTextChild { .. }
            | CompileError::LinkHasChildren => ERR_SCRIPT,
            CompileError::UnknownDirective { .. } | CompileError::DirectiveNotAllowed { .. } => {
                ERR_DIRECTIVE
            }
            CompileError::InvalidComponentTag { .. } | CompileError::ComponentUnsupported { .. } => {
                ERR_COMPONENT
            }
            CompileError::Format { .. } => ERR_FORMAT,
            CompileError::Read { .. } | CompileError::Write { .. } => ERR_IO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_do_not_stack() {
        let err = CompileError::NoStartTag.in_source("a.vugu").in_source("b.vugu");
        assert_eq!(err.to_string(), "a.vugu: no start tag found in template");
        assert!(matches!(err.innermost(), CompileError::NoStartTag));
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            CompileError::ComponentUnsupported { tag: "a:b".into() }.category(),
            ErrorCategory::Unimplemented
        );
        assert_eq!(
            CompileError::LinkHasChildren.in_source("x").category(),
            ErrorCategory::Structural
        );
        assert_eq!(CompileError::NoStartTag.code(), ERR_PARSE);
    }
}
