//! Static Compactor for vgen
//!
//! Rewrites a template tree so that every fully static subtree is replaced by
//! one element carrying a `vg-html` directive with the serialized markup of
//! its children. The generated build function then creates one node with
//! inner HTML instead of one node per static descendant.
//!
//! The pass is pure (tree in, new tree out) and idempotent: a collapsed
//! element carries a directive, so it is never collapsed again.

use tracing::trace;

use crate::ir::{AttributeIR, AttributeKind, ElementKind, ElementNode, TemplateNode, DIRECTIVE_HTML};
use crate::visitor::{walk_element, TemplateVisitor};

/// Elements serialized without an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "meta",
    "param", "source", "track", "wbr",
];

/// Elements whose text content is written without escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "iframe", "noembed", "noframes", "noscript", "plaintext", "xmp",
];

/// Elements where a leading newline in the content is swallowed by the parser.
const NEWLINE_SENSITIVE: &[&str] = &["pre", "textarea", "listing"];

// ═══════════════════════════════════════════════════════════════════════════════
// STATIC DETECTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Walks a subtree and notes anything that must stay visible to codegen.
#[derive(Default)]
struct StaticScan {
    dynamic: bool,
    elements: usize,
}

impl TemplateVisitor for StaticScan {
    fn visit_element(&mut self, element: &ElementNode) {
        if self.dynamic {
            return;
        }
        if !is_static_element(element) {
            self.dynamic = true;
            return;
        }
        self.elements += 1;
        walk_element(self, element);
    }
}

/// An element that needs no codegen of its own: no directives, no dynamic
/// attributes, and not a script/style/link, component or document section.
fn is_static_element(element: &ElementNode) -> bool {
    element.kind == ElementKind::Plain && element.first_directive().is_none()
}

/// Whether `element` can be collapsed: static itself, static all the way
/// down, and with at least one element below it (text-only content gains
/// nothing from collapsing).
fn is_collapsible(element: &ElementNode) -> bool {
    if !is_static_element(element) {
        return false;
    }
    let mut scan = StaticScan::default();
    scan.visit_children(&element.children);
    !scan.dynamic && scan.elements > 0
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPACTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Collapse every maximal static subtree under `node`.
pub fn compact_static(node: TemplateNode) -> TemplateNode {
    match node {
        TemplateNode::Element(element) => TemplateNode::Element(compact_element(element)),
        TemplateNode::Document { children } => TemplateNode::Document {
            children: children.into_iter().map(compact_static).collect(),
        },
        leaf => leaf,
    }
}

fn compact_element(element: ElementNode) -> ElementNode {
    if is_collapsible(&element) {
        let mut markup = String::new();
        serialize_children(&element.tag, &element.children, &mut markup);
        trace!(tag = %element.tag, bytes = markup.len(), "collapsed static subtree");

        let mut attributes = element.attributes;
        attributes.push(AttributeIR {
            key: DIRECTIVE_HTML.to_string(),
            value: format!("{:?}", markup),
            kind: AttributeKind::RawContent,
        });
        return ElementNode {
            tag: element.tag,
            kind: element.kind,
            attributes,
            children: Vec::new(),
        };
    }

    ElementNode {
        children: element.children.into_iter().map(compact_static).collect(),
        ..element
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SERIALIZATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Serialize the children of a `parent` element as HTML markup.
pub fn serialize_children(parent: &str, children: &[TemplateNode], out: &mut String) {
    let parent = parent.to_ascii_lowercase();
    let raw_text = RAW_TEXT_ELEMENTS.contains(&parent.as_str());

    if NEWLINE_SENSITIVE.contains(&parent.as_str()) {
        if let Some(TemplateNode::Text { value }) = children.first() {
            if value.starts_with('\n') {
                out.push('\n');
            }
        }
    }

    for child in children {
        match child {
            TemplateNode::Element(el) => serialize_element(el, out),
            TemplateNode::Text { value } if raw_text => out.push_str(value),
            TemplateNode::Text { value } => escape_text(value, out),
            TemplateNode::Comment { value } => {
                out.push_str("<!--");
                out.push_str(value);
                out.push_str("-->");
            }
            TemplateNode::Document { children } => serialize_children("", children, out),
        }
    }
}

fn serialize_element(element: &ElementNode, out: &mut String) {
    out.push('<');
    out.push_str(&element.tag);
    for attr in &element.attributes {
        out.push(' ');
        out.push_str(&attr.key);
        out.push_str("=\"");
        escape_attribute(&attr.value, out);
        out.push('"');
    }
    out.push('>');

    if VOID_ELEMENTS.contains(&element.tag.to_ascii_lowercase().as_str()) {
        return;
    }

    serialize_children(&element.tag, &element.children, out);
    out.push_str("</");
    out.push_str(&element.tag);
    out.push('>');
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_template;

    fn parse_one(src: &str) -> TemplateNode {
        parse_template(src.as_bytes()).unwrap().nodes.remove(0)
    }

    #[test]
    fn test_static_subtree_collapses() {
        let node = compact_static(parse_one(
            r#"<div class="card"><h1>Title &amp; more</h1><p>Body<br></p></div>"#,
        ));
        let div = node.as_element().unwrap();
        assert!(div.children.is_empty());
        assert_eq!(div.attribute("class").unwrap().value, "card");
        assert_eq!(
            div.raw_content(),
            Some(r#""<h1>Title &amp; more</h1><p>Body<br></p>""#)
        );
    }

    #[test]
    fn test_dynamic_content_is_untouched() {
        let original = parse_one(r#"<div><span :title="c.t">x</span></div>"#);
        assert_eq!(compact_static(original.clone()), original);
    }

    #[test]
    fn test_static_sibling_of_dynamic_collapses() {
        let node = compact_static(parse_one(
            r#"<div><section><b>a</b></section><p vg-if="c.show">b</p></div>"#,
        ));
        let div = node.as_element().unwrap();
        assert!(div.raw_content().is_none());
        let section = div.children[0].as_element().unwrap();
        assert_eq!(section.raw_content(), Some(r#""<b>a</b>""#));
        let p = div.children[1].as_element().unwrap();
        assert_eq!(p.children, vec![TemplateNode::text("b")]);
    }

    #[test]
    fn test_scripts_and_components_block_collapse() {
        let with_style = parse_one("<div><p>a</p><style>p{}</style></div>");
        assert_eq!(compact_static(with_style.clone()), with_style);

        let with_component = parse_one("<div><p>a</p><ui:button></ui:button></div>");
        assert_eq!(compact_static(with_component.clone()), with_component);
    }

    #[test]
    fn test_text_only_element_is_left_alone() {
        let original = parse_one("<p>just text</p>");
        assert_eq!(compact_static(original.clone()), original);
    }

    #[test]
    fn test_compaction_is_idempotent() {
        let original = parse_one(
            r#"<main><nav><a href="/">home</a></nav><ul><li vg-for="x in c.items.iter()">i</li></ul></main>"#,
        );
        let once = compact_static(original);
        let twice = compact_static(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_document_sections_are_never_collapsed() {
        let parsed = parse_template(
            b"<html><head><title>t</title></head><body><div><p>x</p></div></body></html>",
        )
        .unwrap();
        let html = compact_static(parsed.nodes[0].clone());
        let html = html.as_element().unwrap();
        let body = html.children[1].as_element().unwrap();
        assert_eq!(body.kind, ElementKind::Body);
        assert!(body.raw_content().is_none());
        let div = body.children[0].as_element().unwrap();
        assert_eq!(div.raw_content(), Some(r#""<p>x</p>""#));
    }
}
