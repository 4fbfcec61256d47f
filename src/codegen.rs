//! Codegen module for vgen
//!
//! Walks a parsed template once and emits Rust source for a `build` method
//! that constructs the virtual node tree at runtime. Native code blocks land
//! in the preamble, everything else in the build function body.
//!
//! Emission is plain text; the finalize step formats it.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::config::CompileConfig;
use crate::error::CompileError;
use crate::ir::{AttributeKind, ControlDirective, ElementKind, ElementNode, TemplateNode};
use crate::parse::{ParsedTemplate, TemplateMode};

/// Runtime names every generated file imports.
pub const RUNTIME_IMPORTS: &[&str] = &[
    "BuildIn",
    "BuildOut",
    "BuildResult",
    "DomEvent",
    "DomEventHandlerSpec",
    "VgAttribute",
    "VgNode",
    "VgNodeRef",
];

/// Script body is Rust, copied into the generated module.
pub const NATIVE_SCRIPT_TYPE: &str = "application/x-rust";

/// Script body is shipped to the client untouched.
pub const CLIENT_SCRIPT_TYPE: &str = "application/javascript";

const INDENT: &str = "    ";

lazy_static! {
    static ref IDENT_RE: Regex = Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILE STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Output of one compile, split into the three regions of the generated file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileState {
    /// Header, imports and native code blocks.
    pub preamble: String,
    /// The `impl` block holding the build function.
    pub body: String,
    /// Items that reference every import.
    pub epilogue: String,
    /// Set once the first main-tree node has been pushed to `vgout.out`.
    pub root_established: bool,
}

impl CompileState {
    /// Preamble, body and epilogue joined in file order.
    pub fn assemble(&self) -> String {
        let mut out =
            String::with_capacity(self.preamble.len() + self.body.len() + self.epilogue.len() + 2);
        out.push_str(&self.preamble);
        out.push('\n');
        out.push_str(&self.body);
        out.push('\n');
        out.push_str(&self.epilogue);
        out
    }
}

/// Where a constructed node is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    /// Root of the output tree, or a child of the current parent.
    Tree,
    /// `vgout.js`
    Script,
    /// `vgout.css`
    Style,
}

// ═══════════════════════════════════════════════════════════════════════════════
// GENERATOR
// ═══════════════════════════════════════════════════════════════════════════════

pub struct Generator<'a> {
    config: &'a CompileConfig,
    state: CompileState,
    depth: usize,
    /// Names bound by the enclosing `vg-for` patterns, outermost first.
    loop_bindings: Vec<String>,
}

impl<'a> Generator<'a> {
    pub fn new(config: &'a CompileConfig) -> Self {
        Self {
            config,
            state: CompileState::default(),
            depth: 0,
            loop_bindings: Vec::new(),
        }
    }

    /// Generate all three regions for `template`.
    pub fn generate(mut self, template: &ParsedTemplate) -> Result<CompileState, CompileError> {
        self.write_header();
        self.open_build();

        match template.mode {
            TemplateMode::Document => self.visit_document(&template.nodes)?,
            TemplateMode::Fragment => self.visit_fragment(&template.first_tag, &template.nodes)?,
        }

        self.close_build();
        self.write_epilogue();

        debug!(
            struct_type = %self.config.struct_type,
            preamble_bytes = self.state.preamble.len(),
            body_bytes = self.state.body.len(),
            "generated build function"
        );
        Ok(self.state)
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Fixed regions
    // ───────────────────────────────────────────────────────────────────────────

    fn write_header(&mut self) {
        let preamble = &mut self.state.preamble;
        preamble.push_str(&format!("//! Module `{}`.\n", self.config.package_name));
        preamble.push_str("//!\n");
        preamble.push_str("//! Code generated by vgen. DO NOT EDIT.\n\n");
        preamble.push_str(&format!(
            "use {}::{{{}}};\n\n",
            self.config.runtime_path,
            RUNTIME_IMPORTS.join(", ")
        ));
    }

    fn open_build(&mut self) {
        self.line(&format!("impl {} {{", self.config.struct_type));
        self.depth += 1;
        self.line("#[allow(unused_mut, unused_variables, unused_assignments, unused_braces)]");
        self.line("pub fn build(&mut self, vgin: &BuildIn) -> BuildResult {");
        self.depth += 1;
        self.line("let c = self;");
        self.line("let mut vgout = BuildOut::default();");
        self.line("let mut vgn: VgNodeRef;");
    }

    fn close_build(&mut self) {
        self.line("Ok(vgout)");
        self.depth -= 1;
        self.line("}");
        self.depth -= 1;
        self.line("}");
    }

    fn write_epilogue(&mut self) {
        let epilogue = &mut self.state.epilogue;
        epilogue.push_str("// 'fix' unused imports\n");
        for name in RUNTIME_IMPORTS {
            epilogue.push_str(&format!("const _: Option<&{}> = None;\n", name));
        }
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Top-level dispatch
    // ───────────────────────────────────────────────────────────────────────────

    fn visit_document(&mut self, nodes: &[TemplateNode]) -> Result<(), CompileError> {
        let [node] = nodes else {
            return Err(CompileError::DocumentNodeCount { found: nodes.len() });
        };
        match node {
            TemplateNode::Element(el) if el.kind == ElementKind::Html => self.visit_html(el),
            other => Err(CompileError::UnknownHtmlChild {
                tag: other.describe(),
            }),
        }
    }

    fn visit_html(&mut self, html: &ElementNode) -> Result<(), CompileError> {
        check_section_attributes(html)?;
        self.emit_construct(html, Channel::Tree);
        self.emit_dynamic_attributes(html);

        self.open_scope();
        for child in &html.children {
            match child {
                TemplateNode::Element(el) if el.kind == ElementKind::Head => self.visit_head(el)?,
                TemplateNode::Element(el) if el.kind == ElementKind::Body => self.visit_body(el)?,
                TemplateNode::Element(el) => {
                    return Err(CompileError::UnknownHtmlChild {
                        tag: el.tag.clone(),
                    })
                }
                _ => {}
            }
        }
        self.close_scope();
        Ok(())
    }

    fn visit_head(&mut self, head: &ElementNode) -> Result<(), CompileError> {
        check_section_attributes(head)?;
        self.emit_construct(head, Channel::Tree);
        self.emit_dynamic_attributes(head);

        if head.children.is_empty() {
            return Ok(());
        }
        self.open_scope();
        for child in &head.children {
            match child {
                TemplateNode::Element(el) if el.kind.is_resource() => self.visit_resource(el)?,
                other => self.visit_child(other)?,
            }
        }
        self.close_scope();
        Ok(())
    }

    fn visit_body(&mut self, body: &ElementNode) -> Result<(), CompileError> {
        check_section_attributes(body)?;
        self.emit_construct(body, Channel::Tree);
        self.emit_dynamic_attributes(body);

        if body.children.is_empty() {
            return Ok(());
        }
        self.open_scope();
        let mut mounted = false;
        for child in &body.children {
            match child {
                TemplateNode::Element(el) if el.kind.is_resource() => self.visit_resource(el)?,
                TemplateNode::Element(el) => {
                    if mounted {
                        return Err(CompileError::SecondMountElement {
                            tag: el.tag.clone(),
                        });
                    }
                    self.visit_element(el)?;
                    mounted = true;
                }
                TemplateNode::Text { value } if !value.trim().is_empty() => {
                    return Err(CompileError::UnexpectedText {
                        text: value.clone(),
                    })
                }
                _ => {}
            }
        }
        self.close_scope();
        Ok(())
    }

    fn visit_fragment(&mut self, first_tag: &str, nodes: &[TemplateNode]) -> Result<(), CompileError> {
        // Fragment parsing drops head/body tags, so the first tag is checked too.
        if matches!(first_tag, "head" | "body") {
            return Err(CompileError::ForbiddenTopLevelTag {
                tag: first_tag.to_string(),
            });
        }

        let mut mounted = false;
        for node in nodes {
            match node {
                TemplateNode::Comment { .. } => {}
                TemplateNode::Text { value } if value.trim().is_empty() => {}
                TemplateNode::Text { value } => {
                    return Err(CompileError::UnexpectedText {
                        text: value.clone(),
                    })
                }
                TemplateNode::Document { children } => self.visit_fragment(first_tag, children)?,
                TemplateNode::Element(el) if el.kind.is_resource() => self.visit_resource(el)?,
                TemplateNode::Element(el) if el.kind.is_document_section() => {
                    return Err(CompileError::ForbiddenTopLevelTag {
                        tag: el.tag.clone(),
                    })
                }
                TemplateNode::Element(el) => {
                    if mounted {
                        return Err(CompileError::SecondMountElement {
                            tag: el.tag.clone(),
                        });
                    }
                    self.visit_element(el)?;
                    mounted = true;
                }
            }
        }
        Ok(())
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Elements
    // ───────────────────────────────────────────────────────────────────────────

    fn visit_element(&mut self, el: &ElementNode) -> Result<(), CompileError> {
        if el.kind == ElementKind::Component {
            return Err(component_error(&el.tag));
        }

        let bound = self.loop_bindings.len();
        let opened = self.open_directives(el);
        self.emit_construct(el, Channel::Tree);
        self.emit_dynamic_attributes(el);

        let raw_content = el.raw_content();
        if let Some(expr) = raw_content {
            self.line(&format!("vgn.set_inner_html(format!(\"{{}}\", {}));", expr));
        }

        for (event, expr) in el.event_bindings() {
            self.emit_event_handler(event, expr);
        }

        if raw_content.is_none() && !el.children.is_empty() {
            self.open_scope();
            for child in &el.children {
                self.visit_child(child)?;
            }
            self.close_scope();
        }

        self.close_directives(opened);
        self.loop_bindings.truncate(bound);
        Ok(())
    }

    /// Handlers are `move` closures. Loop variables they mention are cloned
    /// into the closure so the loop body can keep using the originals.
    fn emit_event_handler(&mut self, event: &str, expr: &str) {
        let captured = self.captured_loop_bindings(expr);
        let spec = format!(
            "DomEventHandlerSpec::new({:?}, move |vgc, event| {{",
            event
        );

        if captured.is_empty() {
            self.line(&format!("vgn.push_event_handler({}", spec));
        } else {
            self.line("vgn.push_event_handler({");
            self.depth += 1;
            for name in &captured {
                self.line(&format!("let {} = {}.clone();", name, name));
            }
            self.line(&spec);
        }

        self.depth += 1;
        self.line("if let Some(c) = vgc.downcast_mut::<Self>() {");
        self.depth += 1;
        self.line(&format!("let _ = {{ {} }};", expr));
        self.depth -= 1;
        self.line("}");
        self.depth -= 1;

        if captured.is_empty() {
            self.line("}));");
        } else {
            self.line("})");
            self.depth -= 1;
            self.line("});");
        }
    }

    fn captured_loop_bindings(&self, expr: &str) -> Vec<String> {
        let used: Vec<&str> = IDENT_RE.find_iter(expr).map(|m| m.as_str()).collect();
        let mut captured: Vec<String> = Vec::new();
        for name in self.loop_bindings.iter().rev() {
            if used.contains(&name.as_str()) && !captured.contains(name) {
                captured.push(name.clone());
            }
        }
        captured.reverse();
        captured
    }

    fn visit_child(&mut self, node: &TemplateNode) -> Result<(), CompileError> {
        match node {
            TemplateNode::Text { value } => {
                self.line(&format!("vgn = VgNode::text({:?});", value));
                self.line("vgparent.append_child(&vgn);");
            }
            TemplateNode::Comment { value } => {
                self.line(&format!("vgn = VgNode::comment({:?});", value));
                self.line("vgparent.append_child(&vgn);");
            }
            TemplateNode::Element(el) => self.visit_element(el)?,
            TemplateNode::Document { children } => {
                for child in children {
                    self.visit_child(child)?;
                }
            }
        }
        Ok(())
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Script / style routing
    // ───────────────────────────────────────────────────────────────────────────

    fn visit_resource(&mut self, el: &ElementNode) -> Result<(), CompileError> {
        match el.kind {
            ElementKind::Script => self.visit_script(el),
            ElementKind::Style => {
                require_text_children(el)?;
                self.emit_routed(el, Channel::Style);
                Ok(())
            }
            ElementKind::Link => {
                if !el.children.is_empty() {
                    return Err(CompileError::LinkHasChildren);
                }
                self.emit_routed(el, Channel::Style);
                Ok(())
            }
            _ => self.visit_element(el),
        }
    }

    fn visit_script(&mut self, el: &ElementNode) -> Result<(), CompileError> {
        let mime = el
            .attribute("type")
            .map(|a| media_type(&a.value))
            .unwrap_or_default();

        match mime.as_str() {
            NATIVE_SCRIPT_TYPE => {
                require_text_children(el)?;
                for child in &el.children {
                    if let TemplateNode::Text { value } = child {
                        self.state.preamble.push_str(value);
                        self.state.preamble.push('\n');
                    }
                }
                Ok(())
            }
            "" | CLIENT_SCRIPT_TYPE => {
                if !el.children.is_empty() {
                    for attr in &el.attributes {
                        if attr.key != "type" {
                            return Err(CompileError::ScriptAttributeNotAllowed {
                                attr: attr.key.clone(),
                            });
                        }
                        if attr.value != CLIENT_SCRIPT_TYPE {
                            return Err(CompileError::ScriptTypeNotAllowed {
                                value: attr.value.clone(),
                            });
                        }
                    }
                    require_text_children(el)?;
                }
                self.emit_routed(el, Channel::Script);
                Ok(())
            }
            other => Err(CompileError::InvalidScriptType {
                mime: other.to_string(),
            }),
        }
    }

    /// Build a script/style/link node for `vgout.js` or `vgout.css`, with
    /// its text content as children.
    fn emit_routed(&mut self, el: &ElementNode, channel: Channel) {
        let opened = self.open_directives(el);
        self.emit_construct(el, channel);
        self.emit_dynamic_attributes(el);

        if !el.children.is_empty() {
            self.open_scope();
            for child in &el.children {
                if let TemplateNode::Text { value } = child {
                    self.line(&format!("vgn = VgNode::text({:?});", value));
                    self.line("vgparent.append_child(&vgn);");
                }
            }
            self.close_scope();
        }

        self.close_directives(opened);
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Statement emission
    // ───────────────────────────────────────────────────────────────────────────

    /// Open `for` then `if`; returns how many blocks need closing.
    fn open_directives(&mut self, el: &ElementNode) -> usize {
        let mut opened = 0;
        if let Some(clause) = el.control(ControlDirective::For) {
            self.loop_bindings.extend(loop_pattern_bindings(clause));
            self.line(&format!("for {} {{", clause));
            self.depth += 1;
            opened += 1;
        }
        if let Some(cond) = el.control(ControlDirective::If) {
            self.line(&format!("if {} {{", cond));
            self.depth += 1;
            opened += 1;
        }
        opened
    }

    fn close_directives(&mut self, opened: usize) {
        for _ in 0..opened {
            self.depth -= 1;
            self.line("}");
        }
    }

    fn emit_construct(&mut self, el: &ElementNode, channel: Channel) {
        let attrs: Vec<String> = el
            .static_attributes()
            .map(|a| format!("VgAttribute::new({:?}, {:?})", a.key, a.value))
            .collect();
        self.line(&format!(
            "vgn = VgNode::element({:?}, vec![{}]);",
            el.tag,
            attrs.join(", ")
        ));

        match channel {
            Channel::Tree if !self.state.root_established => {
                self.line("vgout.out.push(vgn.clone());");
                self.state.root_established = true;
            }
            Channel::Tree => self.line("vgparent.append_child(&vgn);"),
            Channel::Script => self.line("vgout.js.push(vgn.clone());"),
            Channel::Style => self.line("vgout.css.push(vgn.clone());"),
        }
    }

    fn emit_dynamic_attributes(&mut self, el: &ElementNode) {
        for (key, expr) in el.dynamic_attributes() {
            self.line(&format!(
                "vgn.push_attr(VgAttribute::new({:?}, format!(\"{{}}\", {})));",
                key, expr
            ));
        }
    }

    fn open_scope(&mut self) {
        self.line("{");
        self.depth += 1;
        self.line("let vgparent = vgn.clone();");
    }

    fn close_scope(&mut self) {
        self.depth -= 1;
        self.line("}");
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.state.body.push_str(INDENT);
        }
        self.state.body.push_str(text);
        self.state.body.push('\n');
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Media type of a `type` attribute value: parameters dropped, lower-cased.
pub fn media_type(value: &str) -> String {
    value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn component_error(tag: &str) -> CompileError {
    if tag.split(':').count() != 2 {
        CompileError::InvalidComponentTag {
            tag: tag.to_string(),
        }
    } else {
        CompileError::ComponentUnsupported {
            tag: tag.to_string(),
        }
    }
}

/// html, head and body only take static and dynamic attributes.
fn check_section_attributes(el: &ElementNode) -> Result<(), CompileError> {
    for attr in &el.attributes {
        if matches!(
            attr.kind,
            AttributeKind::Control { .. } | AttributeKind::RawContent | AttributeKind::Event { .. }
        ) {
            return Err(CompileError::DirectiveNotAllowed {
                tag: el.tag.clone(),
                attr: attr.key.clone(),
            });
        }
    }
    Ok(())
}

/// Variable names bound by the pattern of a `vg-for` clause such as
/// `(i, item) in c.items.iter().enumerate()`.
fn loop_pattern_bindings(clause: &str) -> Vec<String> {
    let pattern = clause.split(" in ").next().unwrap_or_default();
    IDENT_RE
        .find_iter(pattern)
        .map(|m| m.as_str())
        .filter(|name| !matches!(*name, "mut" | "ref" | "_" | "c"))
        .filter(|name| !name.starts_with(|ch: char| ch.is_ascii_uppercase()))
        .map(str::to_string)
        .collect()
}

fn require_text_children(el: &ElementNode) -> Result<(), CompileError> {
    match el.children.iter().find(|c| !matches!(c, TemplateNode::Text { .. })) {
        Some(child) => Err(CompileError::NonTextChild {
            tag: el.tag.clone(),
            child: child.describe(),
        }),
        None => Ok(()),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_pattern_bindings() {
        assert_eq!(loop_pattern_bindings("x in c.items.iter()"), vec!["x"]);
        assert_eq!(
            loop_pattern_bindings("(i, mut item) in c.items.iter().enumerate()"),
            vec!["i", "item"]
        );
        assert_eq!(loop_pattern_bindings("&(_, ref name) in c.pairs.iter()"), vec!["name"]);
        assert!(loop_pattern_bindings("_ in 0..3").is_empty());
    }

    #[test]
    fn test_media_type() {
        assert_eq!(media_type("application/javascript"), "application/javascript");
        assert_eq!(media_type(" Application/X-Rust ; charset=utf-8"), "application/x-rust");
        assert_eq!(media_type(""), "");
    }

    #[test]
    fn test_component_error_kind() {
        assert!(matches!(
            component_error("ui:button"),
            CompileError::ComponentUnsupported { .. }
        ));
        assert!(matches!(
            component_error("a:b:c"),
            CompileError::InvalidComponentTag { .. }
        ));
    }

    #[test]
    fn test_assemble_order() {
        let state = CompileState {
            preamble: "P".to_string(),
            body: "B".to_string(),
            epilogue: "E".to_string(),
            root_established: true,
        };
        assert_eq!(state.assemble(), "P\nB\nE");
    }

    #[test]
    fn test_section_attributes() {
        let body = ElementNode::new(
            "body",
            vec![crate::ir::AttributeIR::new("body", "@click", "c.go()").unwrap()],
            vec![],
        );
        assert!(matches!(
            check_section_attributes(&body),
            Err(CompileError::DirectiveNotAllowed { .. })
        ));
    }
}
