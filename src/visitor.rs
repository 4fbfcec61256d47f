use crate::ir::{ElementNode, TemplateNode};

/// Read-only traversal over a template tree.
///
/// Rules:
/// 1. Traversal order is document order.
/// 2. Implementers override `visit_*` methods to add behavior.
/// 3. Implementers call the matching `walk_*` function to continue into
///    children, or skip it to prune.
pub trait TemplateVisitor {
    fn visit_node(&mut self, node: &TemplateNode) {
        walk_node(self, node);
    }

    fn visit_element(&mut self, element: &ElementNode) {
        walk_element(self, element);
    }

    fn visit_text(&mut self, _text: &str) {
        // Leaf node, nothing to walk by default
    }

    fn visit_comment(&mut self, _comment: &str) {
        // Leaf node, nothing to walk by default
    }

    fn visit_children(&mut self, children: &[TemplateNode]) {
        walk_children(self, children);
    }
}

pub fn walk_children<V: TemplateVisitor + ?Sized>(visitor: &mut V, children: &[TemplateNode]) {
    for node in children {
        visitor.visit_node(node);
    }
}

pub fn walk_node<V: TemplateVisitor + ?Sized>(visitor: &mut V, node: &TemplateNode) {
    match node {
        TemplateNode::Document { children } => visitor.visit_children(children),
        TemplateNode::Element(el) => visitor.visit_element(el),
        TemplateNode::Text { value } => visitor.visit_text(value),
        TemplateNode::Comment { value } => visitor.visit_comment(value),
    }
}

pub fn walk_element<V: TemplateVisitor + ?Sized>(visitor: &mut V, element: &ElementNode) {
    visitor.visit_children(&element.children);
}
