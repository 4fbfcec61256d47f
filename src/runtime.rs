//! Runtime contract for generated build functions.
//!
//! Generated code constructs `VgNode` trees through these types and hands
//! them back in a `BuildOut`. Rendering and reconciling the trees belongs to
//! whatever host consumes the `BuildOut`.

use std::any::Any;
use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VgNodeType {
    Text,
    Document,
    Element,
    Comment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VgAttribute {
    pub key: String,
    pub val: String,
}

impl VgAttribute {
    pub fn new(key: impl Into<String>, val: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            val: val.into(),
        }
    }
}

/// Event passed to handlers registered with `@event` bindings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomEvent {
    pub event_type: String,
    #[serde(default)]
    pub detail: serde_json::Value,
}

/// Handler receives the component the tree was built from, type-erased.
pub type DomEventHandler = Rc<dyn Fn(&mut dyn Any, &DomEvent)>;

#[derive(Clone)]
pub struct DomEventHandlerSpec {
    pub event_type: String,
    pub func: DomEventHandler,
}

impl DomEventHandlerSpec {
    pub fn new<F>(event_type: &str, func: F) -> Self
    where
        F: Fn(&mut dyn Any, &DomEvent) + 'static,
    {
        Self {
            event_type: event_type.to_string(),
            func: Rc::new(func),
        }
    }

    pub fn call(&self, component: &mut dyn Any, event: &DomEvent) {
        (self.func)(component, event)
    }
}

impl fmt::Debug for DomEventHandlerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomEventHandlerSpec")
            .field("event_type", &self.event_type)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct VgNode {
    pub node_type: VgNodeType,
    pub data: String,
    pub attr: Vec<VgAttribute>,
    pub inner_html: Option<String>,
    pub dom_event_handler_spec_list: Vec<DomEventHandlerSpec>,
    pub children: Vec<VgNodeRef>,
}

impl VgNode {
    fn new(node_type: VgNodeType, data: &str, attr: Vec<VgAttribute>) -> VgNodeRef {
        VgNodeRef(Rc::new(RefCell::new(VgNode {
            node_type,
            data: data.to_string(),
            attr,
            inner_html: None,
            dom_event_handler_spec_list: Vec::new(),
            children: Vec::new(),
        })))
    }

    pub fn element(tag: &str, attr: Vec<VgAttribute>) -> VgNodeRef {
        Self::new(VgNodeType::Element, tag, attr)
    }

    pub fn text(data: &str) -> VgNodeRef {
        Self::new(VgNodeType::Text, data, Vec::new())
    }

    pub fn comment(data: &str) -> VgNodeRef {
        Self::new(VgNodeType::Comment, data, Vec::new())
    }
}

/// Shared handle to a node under construction.
#[derive(Debug, Clone)]
pub struct VgNodeRef(Rc<RefCell<VgNode>>);

impl VgNodeRef {
    pub fn borrow(&self) -> Ref<'_, VgNode> {
        self.0.borrow()
    }

    pub fn append_child(&self, child: &VgNodeRef) {
        self.0.borrow_mut().children.push(child.clone());
    }

    pub fn push_attr(&self, attr: VgAttribute) {
        self.0.borrow_mut().attr.push(attr);
    }

    pub fn set_inner_html(&self, html: String) {
        self.0.borrow_mut().inner_html = Some(html);
    }

    pub fn push_event_handler(&self, spec: DomEventHandlerSpec) {
        self.0.borrow_mut().dom_event_handler_spec_list.push(spec);
    }

    pub fn ptr_eq(&self, other: &VgNodeRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Input to a build call. Carries nothing yet; kept as a type so the build
/// signature is stable.
#[derive(Debug, Clone, Default)]
pub struct BuildIn {}

/// What a build call produces: the tree root(s) plus script and style nodes.
#[derive(Debug, Default)]
pub struct BuildOut {
    pub out: Vec<VgNodeRef>,
    pub js: Vec<VgNodeRef>,
    pub css: Vec<VgNodeRef>,
}

pub type BuildResult = Result<BuildOut, Box<dyn std::error::Error>>;
