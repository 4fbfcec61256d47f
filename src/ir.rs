//! Template IR for vgen
//!
//! The parsed template as an owned, immutable value tree. Attribute keys and
//! element tag names are classified once, when the node is built, and the
//! classification is stored on the node.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CompileError;

// ═══════════════════════════════════════════════════════════════════════════════
// DIRECTIVE SYNTAX
// ═══════════════════════════════════════════════════════════════════════════════

pub const DIRECTIVE_FOR: &str = "vg-for";
pub const DIRECTIVE_IF: &str = "vg-if";
pub const DIRECTIVE_HTML: &str = "vg-html";
pub const DIRECTIVE_PREFIX: &str = "vg-";

lazy_static! {
    /// `:name` - attribute whose value is evaluated at runtime
    static ref DYNAMIC_ATTR_RE: Regex = Regex::new(r"^:([^:@\s][^\s]*)$").unwrap();

    /// `@event` - DOM event binding
    static ref EVENT_ATTR_RE: Regex = Regex::new(r"^@([A-Za-z][\w.:-]*)$").unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// ATTRIBUTES
// ═══════════════════════════════════════════════════════════════════════════════

/// Which control directive an attribute is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ControlDirective {
    For,
    If,
}

/// The five disjoint attribute kinds, decided from the key alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AttributeKind {
    Static,
    Dynamic { name: String },
    RawContent,
    Event { event: String },
    Control { directive: ControlDirective },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeIR {
    pub key: String,
    pub value: String,
    pub kind: AttributeKind,
}

impl AttributeIR {
    /// Build an attribute, classifying its key. Unknown `vg-` keys are
    /// rejected so a misspelled directive never turns into a literal attribute.
    pub fn new(tag: &str, key: &str, value: &str) -> Result<Self, CompileError> {
        let kind = classify_attribute(key).ok_or_else(|| CompileError::UnknownDirective {
            tag: tag.to_string(),
            attr: key.to_string(),
        })?;
        Ok(Self {
            key: key.to_string(),
            value: value.to_string(),
            kind,
        })
    }

    pub fn is_static(&self) -> bool {
        self.kind == AttributeKind::Static
    }
}

/// Classify an attribute key. Returns `None` for an unknown `vg-` directive.
pub fn classify_attribute(key: &str) -> Option<AttributeKind> {
    match key {
        DIRECTIVE_FOR => return Some(AttributeKind::Control { directive: ControlDirective::For }),
        DIRECTIVE_IF => return Some(AttributeKind::Control { directive: ControlDirective::If }),
        DIRECTIVE_HTML => return Some(AttributeKind::RawContent),
        _ => {}
    }

    if key.starts_with(DIRECTIVE_PREFIX) {
        return None;
    }

    if let Some(caps) = DYNAMIC_ATTR_RE.captures(key) {
        return Some(AttributeKind::Dynamic {
            name: caps[1].to_string(),
        });
    }

    if let Some(caps) = EVENT_ATTR_RE.captures(key) {
        return Some(AttributeKind::Event {
            event: caps[1].to_string(),
        });
    }

    Some(AttributeKind::Static)
}

// ═══════════════════════════════════════════════════════════════════════════════
// ELEMENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Secondary classification of an element, resolved from its tag name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementKind {
    Plain,
    Script,
    Style,
    Link,
    Component,
    Html,
    Head,
    Body,
}

impl ElementKind {
    pub fn from_tag(tag: &str) -> Self {
        if tag.contains(':') {
            return ElementKind::Component;
        }
        match tag.to_ascii_lowercase().as_str() {
            "script" => ElementKind::Script,
            "style" => ElementKind::Style,
            "link" => ElementKind::Link,
            "html" => ElementKind::Html,
            "head" => ElementKind::Head,
            "body" => ElementKind::Body,
            _ => ElementKind::Plain,
        }
    }

    /// script, style and link elements are routed to the resource channels.
    pub fn is_resource(self) -> bool {
        matches!(
            self,
            ElementKind::Script | ElementKind::Style | ElementKind::Link
        )
    }

    /// html, head and body give a full document its shape.
    pub fn is_document_section(self) -> bool {
        matches!(
            self,
            ElementKind::Html | ElementKind::Head | ElementKind::Body
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementNode {
    pub tag: String,
    pub kind: ElementKind,
    pub attributes: Vec<AttributeIR>,
    pub children: Vec<TemplateNode>,
}

impl ElementNode {
    pub fn new(tag: &str, attributes: Vec<AttributeIR>, children: Vec<TemplateNode>) -> Self {
        Self {
            tag: tag.to_string(),
            kind: ElementKind::from_tag(tag),
            attributes,
            children,
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeIR> {
        self.attributes.iter().find(|a| a.key == key)
    }

    pub fn control(&self, directive: ControlDirective) -> Option<&str> {
        self.attributes.iter().find_map(|a| match a.kind {
            AttributeKind::Control { directive: d } if d == directive => Some(a.value.as_str()),
            _ => None,
        })
    }

    pub fn raw_content(&self) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.kind == AttributeKind::RawContent)
            .map(|a| a.value.as_str())
    }

    pub fn static_attributes(&self) -> impl Iterator<Item = &AttributeIR> {
        self.attributes.iter().filter(|a| a.is_static())
    }

    /// Dynamic attributes sorted by attribute name, so emission never depends
    /// on source order.
    pub fn dynamic_attributes(&self) -> Vec<(&str, &str)> {
        let mut dynamic: Vec<(&str, &str)> = self
            .attributes
            .iter()
            .filter_map(|a| match &a.kind {
                AttributeKind::Dynamic { name } => Some((name.as_str(), a.value.as_str())),
                _ => None,
            })
            .collect();
        dynamic.sort();
        dynamic
    }

    /// Event bindings in declaration order.
    pub fn event_bindings(&self) -> Vec<(&str, &str)> {
        self.attributes
            .iter()
            .filter_map(|a| match &a.kind {
                AttributeKind::Event { event } => Some((event.as_str(), a.value.as_str())),
                _ => None,
            })
            .collect()
    }

    /// First attribute that is not static, if any.
    pub fn first_directive(&self) -> Option<&AttributeIR> {
        self.attributes.iter().find(|a| !a.is_static())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NODES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TemplateNode {
    Document { children: Vec<TemplateNode> },
    Element(ElementNode),
    Text { value: String },
    Comment { value: String },
}

impl TemplateNode {
    pub fn text(value: &str) -> Self {
        TemplateNode::Text {
            value: value.to_string(),
        }
    }

    pub fn comment(value: &str) -> Self {
        TemplateNode::Comment {
            value: value.to_string(),
        }
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            TemplateNode::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Short description used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            TemplateNode::Document { .. } => "document".to_string(),
            TemplateNode::Element(el) => format!("<{}>", el.tag),
            TemplateNode::Text { .. } => "text".to_string(),
            TemplateNode::Comment { .. } => "comment".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_classification() {
        assert_eq!(classify_attribute("class"), Some(AttributeKind::Static));
        assert_eq!(classify_attribute("data-id"), Some(AttributeKind::Static));
        assert_eq!(
            classify_attribute(":href"),
            Some(AttributeKind::Dynamic {
                name: "href".to_string()
            })
        );
        assert_eq!(
            classify_attribute("@click"),
            Some(AttributeKind::Event {
                event: "click".to_string()
            })
        );
        assert_eq!(classify_attribute("vg-html"), Some(AttributeKind::RawContent));
        assert_eq!(
            classify_attribute("vg-for"),
            Some(AttributeKind::Control {
                directive: ControlDirective::For
            })
        );
        assert_eq!(classify_attribute("vg-fro"), None);
    }

    #[test]
    fn test_element_kind() {
        assert_eq!(ElementKind::from_tag("SCRIPT"), ElementKind::Script);
        assert_eq!(ElementKind::from_tag("my:widget"), ElementKind::Component);
        assert_eq!(ElementKind::from_tag("div"), ElementKind::Plain);
        assert!(ElementKind::Link.is_resource());
        assert!(ElementKind::Body.is_document_section());
    }

    #[test]
    fn test_dynamic_attributes_sorted() {
        let attrs = vec![
            AttributeIR::new("a", ":title", "c.title").unwrap(),
            AttributeIR::new("a", "class", "x").unwrap(),
            AttributeIR::new("a", ":href", "c.url").unwrap(),
        ];
        let el = ElementNode::new("a", attrs, vec![]);
        assert_eq!(
            el.dynamic_attributes(),
            vec![("href", "c.url"), ("title", "c.title")]
        );
        assert_eq!(el.static_attributes().count(), 1);
    }

    #[test]
    fn test_unknown_directive_rejected() {
        let err = AttributeIR::new("div", "vg-iff", "x").unwrap_err();
        assert!(matches!(err, CompileError::UnknownDirective { .. }));
    }
}
