//! Parse Module for vgen
//!
//! Detects whether a template is a full HTML document or a fragment, parses it
//! with html5ever in the matching mode, and converts the resulting DOM into
//! owned `TemplateNode` values.

use html5ever::tokenizer::{
    BufferQueue, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
    TokenizerResult,
};
use html5ever::{parse_document, parse_fragment, LocalName, Namespace, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use serde::{Deserialize, Serialize};
use tendril::{StrTendril, TendrilSink};
use tracing::debug;

use crate::error::CompileError;
use crate::ir::{AttributeIR, ElementNode, TemplateNode};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Tag a fragment is parsed inside of.
const FRAGMENT_CONTEXT_TAG: &str = "div";

/// Tag whose presence as the first start tag selects document mode.
const DOCUMENT_ROOT_TAG: &str = "html";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TemplateMode {
    /// First tag is `<html>`: the template is a whole page.
    Document,
    /// Anything else: a component rooted at one mount element.
    Fragment,
}

/// Parsed template, ready for compaction and code generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTemplate {
    pub mode: TemplateMode,
    /// Lower-cased name of the first start tag. Fragment parsing discards
    /// `head` and `body` tags, so this is the only trace of them.
    pub first_tag: String,
    pub nodes: Vec<TemplateNode>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// MODE DETECTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Token sink that remembers the name of the first start tag it sees.
#[derive(Default)]
struct FirstStartTag {
    name: Option<String>,
}

impl TokenSink for FirstStartTag {
    type Handle = ();

    fn process_token(&mut self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        if self.name.is_none() {
            if let Token::TagToken(tag) = token {
                if tag.kind == TagKind::StartTag {
                    self.name = Some(tag.name.to_string());
                }
            }
        }
        TokenSinkResult::Continue
    }
}

/// Look at the first start tag to choose the parse mode. This only tokenizes;
/// the caller parses the same input again from the start.
pub fn detect_mode(input: &[u8]) -> Result<TemplateMode, CompileError> {
    first_start_tag(input).map(|tag| mode_for_tag(&tag))
}

fn first_start_tag(input: &[u8]) -> Result<String, CompileError> {
    let text = std::str::from_utf8(input)
        .map_err(|e| CompileError::Parse(format!("template is not valid UTF-8: {}", e)))?;

    let mut queue = BufferQueue::default();
    queue.push_back(StrTendril::from_slice(text));

    let mut tokenizer = Tokenizer::new(FirstStartTag::default(), TokenizerOpts::default());
    // The sink never asks to run scripts; resume anyway until the queue drains.
    while let TokenizerResult::Script(()) = tokenizer.feed(&mut queue) {}
    tokenizer.end();

    let first = tokenizer.sink.name.take().ok_or(CompileError::NoStartTag)?;
    Ok(first.to_ascii_lowercase())
}

fn mode_for_tag(tag: &str) -> TemplateMode {
    if tag == DOCUMENT_ROOT_TAG {
        TemplateMode::Document
    } else {
        TemplateMode::Fragment
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARSING
// ═══════════════════════════════════════════════════════════════════════════════

/// Detect the mode, parse, and return the top-level node list. A lone
/// document node is unwrapped to its first element child. Input that is not
/// valid UTF-8 is rejected before parsing.
pub fn parse_template(input: &[u8]) -> Result<ParsedTemplate, CompileError> {
    let first_tag = first_start_tag(input)?;
    let mode = mode_for_tag(&first_tag);
    debug!(first_tag = %first_tag, ?mode, "detected template mode");

    let mut nodes = match mode {
        TemplateMode::Document => parse_document_nodes(input)?,
        TemplateMode::Fragment => parse_fragment_nodes(input)?,
    };

    if let [TemplateNode::Document { children }] = nodes.as_mut_slice() {
        let children = std::mem::take(children);
        nodes = children
            .into_iter()
            .filter(|n| matches!(n, TemplateNode::Element(_)))
            .take(1)
            .collect();
    }

    Ok(ParsedTemplate {
        mode,
        first_tag,
        nodes,
    })
}

fn parse_document_nodes(input: &[u8]) -> Result<Vec<TemplateNode>, CompileError> {
    let mut reader = input;
    let dom = parse_document(RcDom::default(), ParseOpts::default())
        .from_utf8()
        .read_from(&mut reader)
        .map_err(|e| CompileError::Parse(format!("Failed to parse HTML: {}", e)))?;

    Ok(convert_node(&dom.document)?.into_iter().collect())
}

fn parse_fragment_nodes(input: &[u8]) -> Result<Vec<TemplateNode>, CompileError> {
    let context = QualName::new(
        None,
        Namespace::from(HTML_NAMESPACE),
        LocalName::from(FRAGMENT_CONTEXT_TAG),
    );

    let mut reader = input;
    let dom = parse_fragment(RcDom::default(), ParseOpts::default(), context, Vec::new())
        .from_utf8()
        .read_from(&mut reader)
        .map_err(|e| CompileError::Parse(format!("Failed to parse HTML fragment: {}", e)))?;

    // html5ever roots a fragment under a synthetic <html> element.
    let document_children = dom.document.children.borrow();
    let Some(root) = document_children.first() else {
        return Ok(Vec::new());
    };

    let mut nodes = Vec::new();
    for child in root.children.borrow().iter() {
        if let Some(node @ TemplateNode::Element(_)) = convert_node(child)? {
            nodes.push(node);
        }
    }
    Ok(nodes)
}

// ═══════════════════════════════════════════════════════════════════════════════
// DOM CONVERSION
// ═══════════════════════════════════════════════════════════════════════════════

/// Convert a DOM node into a `TemplateNode`. Doctypes and processing
/// instructions have no counterpart and are dropped.
fn convert_node(handle: &Handle) -> Result<Option<TemplateNode>, CompileError> {
    let node = match &handle.data {
        NodeData::Document => TemplateNode::Document {
            children: convert_children(handle)?,
        },

        NodeData::Text { contents } => TemplateNode::text(&contents.borrow()),

        NodeData::Comment { contents } => TemplateNode::comment(contents),

        NodeData::Element {
            name,
            attrs,
            template_contents,
            ..
        } => {
            let tag = name.local.to_string();

            let mut attributes = Vec::new();
            for attr in attrs.borrow().iter() {
                let key = match &attr.name.prefix {
                    Some(prefix) => format!("{}:{}", prefix, attr.name.local),
                    None => attr.name.local.to_string(),
                };
                attributes.push(AttributeIR::new(&tag, &key, &attr.value)?);
            }

            // <template> content lives in its own fragment, not in the children.
            let children = match template_contents.borrow().as_ref() {
                Some(contents) => convert_children(contents)?,
                None => convert_children(handle)?,
            };

            TemplateNode::Element(ElementNode::new(&tag, attributes, children))
        }

        NodeData::Doctype { .. } | NodeData::ProcessingInstruction { .. } => return Ok(None),
    };

    Ok(Some(node))
}

fn convert_children(handle: &Handle) -> Result<Vec<TemplateNode>, CompileError> {
    let mut children = Vec::new();
    for child in handle.children.borrow().iter() {
        if let Some(node) = convert_node(child)? {
            children.push(node);
        }
    }
    Ok(children)
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ElementKind;

    #[test]
    fn test_detect_document_mode() {
        let mode = detect_mode(b"<!doctype html><html><body><div></div></body></html>").unwrap();
        assert_eq!(mode, TemplateMode::Document);
    }

    #[test]
    fn test_detect_fragment_mode_skips_comments_and_text() {
        let mode = detect_mode(b"<!-- c --> hello <div></div>").unwrap();
        assert_eq!(mode, TemplateMode::Fragment);
    }

    #[test]
    fn test_detect_mode_without_tags() {
        let err = detect_mode(b"just text").unwrap_err();
        assert!(matches!(err, CompileError::NoStartTag));
        assert!(matches!(detect_mode(b"").unwrap_err(), CompileError::NoStartTag));
    }

    #[test]
    fn test_detect_mode_resumes_past_scripts() {
        let mode = detect_mode(b"<script>let a = 1 < 2;</script><html></html>").unwrap();
        assert_eq!(mode, TemplateMode::Fragment);
        assert_eq!(first_start_tag(b"<script></script><html>").unwrap(), "script");
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let err = detect_mode(b"<div>\xff\xfe</div>").unwrap_err();
        assert!(matches!(err, CompileError::Parse(ref msg) if msg.contains("UTF-8")));

        let err = parse_template(b"<div>\xff\xfe</div>").unwrap_err();
        assert!(matches!(err, CompileError::Parse(_)));
    }

    #[test]
    fn test_template_contents_become_children() {
        let parsed = parse_template(b"<div><template><p>x</p></template></div>").unwrap();
        let div = parsed.nodes[0].as_element().unwrap();
        let template = div.children[0].as_element().unwrap();
        assert_eq!(template.tag, "template");
        assert_eq!(template.children.len(), 1);
        let p = template.children[0].as_element().unwrap();
        assert_eq!(p.tag, "p");
        assert_eq!(p.children, vec![TemplateNode::text("x")]);
    }

    #[test]
    fn test_fragment_keeps_only_elements() {
        let parsed = parse_template(b"  <!-- lead -->\n<div class=\"a\">hi</div>\ntext").unwrap();
        assert_eq!(parsed.mode, TemplateMode::Fragment);
        assert_eq!(parsed.nodes.len(), 1);
        let el = parsed.nodes[0].as_element().unwrap();
        assert_eq!(el.tag, "div");
        assert_eq!(el.attribute("class").unwrap().value, "a");
        assert_eq!(el.children, vec![TemplateNode::text("hi")]);
    }

    #[test]
    fn test_first_tag_recorded_for_dropped_sections() {
        let parsed = parse_template(b"<BODY></BODY>").unwrap();
        assert_eq!(parsed.mode, TemplateMode::Fragment);
        assert_eq!(parsed.first_tag, "body");
        assert!(parsed.nodes.is_empty());
    }

    #[test]
    fn test_document_unwrapped_to_html_element() {
        let parsed =
            parse_template(b"<!DOCTYPE html><html><head></head><body><p>x</p></body></html>")
                .unwrap();
        assert_eq!(parsed.mode, TemplateMode::Document);
        assert_eq!(parsed.nodes.len(), 1);
        let html = parsed.nodes[0].as_element().unwrap();
        assert_eq!(html.kind, ElementKind::Html);
        let sections: Vec<_> = html
            .children
            .iter()
            .filter_map(|n| n.as_element())
            .map(|e| e.tag.as_str())
            .collect();
        assert_eq!(sections, vec!["head", "body"]);
    }

    #[test]
    fn test_directive_attributes_survive_parsing() {
        let parsed =
            parse_template(br#"<ul><li vg-for="x in c.items.iter()" :title="x" @click="c.go()"></li></ul>"#)
                .unwrap();
        let ul = parsed.nodes[0].as_element().unwrap();
        let li = ul.children[0].as_element().unwrap();
        assert_eq!(
            li.control(crate::ir::ControlDirective::For),
            Some("x in c.items.iter()")
        );
        assert_eq!(li.dynamic_attributes(), vec![("title", "x")]);
        assert_eq!(li.event_bindings(), vec![("click", "c.go()")]);
    }

    #[test]
    fn test_script_text_is_kept_raw() {
        let parsed = parse_template(
            b"<script type=\"application/x-rust\">fn f() -> bool { 1 < 2 }</script><div></div>",
        )
        .unwrap();
        let script = parsed.nodes[0].as_element().unwrap();
        assert_eq!(script.kind, ElementKind::Script);
        assert_eq!(
            script.children,
            vec![TemplateNode::text("fn f() -> bool { 1 < 2 }")]
        );
    }
}
