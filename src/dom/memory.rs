//! In-memory host tree: the default renderer adapter.
//!
//! Nodes live in an arena addressed by `NodeId` and are never freed, so a
//! handle stays valid after its node is detached. Every mutating call is
//! appended to a journal that tests can compare against expected call
//! sequences.
use super::DomApi;
use crate::errors::DomError;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// One recorded adapter call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DomOp {
    CreateElement {
        node: NodeId,
        tag: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        namespace: Option<String>,
    },
    CreateText {
        node: NodeId,
        text: String,
    },
    CreateComment {
        node: NodeId,
        text: String,
    },
    InsertBefore {
        parent: NodeId,
        node: NodeId,
        reference: Option<NodeId>,
    },
    AppendChild {
        parent: NodeId,
        node: NodeId,
    },
    RemoveChild {
        parent: NodeId,
        node: NodeId,
    },
    SetTextContent {
        node: NodeId,
        text: String,
    },
    SetAttribute {
        node: NodeId,
        name: String,
        value: String,
    },
}

#[derive(Debug, Clone)]
pub(crate) enum HostKind {
    Element {
        tag: String,
        namespace: Option<String>,
        attributes: IndexMap<String, String>,
    },
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
pub(crate) struct HostNode {
    pub(crate) kind: HostKind,
    parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

#[derive(Debug, Default, Clone)]
pub struct MemoryDom {
    nodes: Vec<HostNode>,
    journal: Vec<DomOp>,
}

/// Tag and attribute names: a letter followed by ASCII alphanumerics, `-`, `_` or `:`.
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':'))
        }
        _ => false,
    }
}

impl MemoryDom {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn journal(&self) -> &[DomOp] {
        &self.journal
    }

    pub fn take_journal(&mut self) -> Vec<DomOp> {
        std::mem::take(&mut self.journal)
    }

    pub fn child_nodes(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node.0)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_attached(&self, node: NodeId) -> bool {
        self.parent_of(node).is_some()
    }

    pub fn namespace(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(node.0)?.kind {
            HostKind::Element { namespace, .. } => namespace.as_deref(),
            _ => None,
        }
    }

    /// Data of a text or comment node.
    pub fn node_value(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(node.0)?.kind {
            HostKind::Text(text) | HostKind::Comment(text) => Some(text),
            HostKind::Element { .. } => None,
        }
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        let Some(host) = self.nodes.get(node.0) else {
            return;
        };
        match &host.kind {
            HostKind::Text(text) => out.push_str(text),
            HostKind::Comment(_) => {}
            HostKind::Element { .. } => {
                for child in &host.children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    pub(crate) fn get(&self, node: NodeId) -> Result<&HostNode, DomError> {
        self.nodes.get(node.0).ok_or_else(|| DomError::UnknownNode {
            node: node.to_string(),
        })
    }

    fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0).and_then(|n| n.parent)
    }

    fn alloc(&mut self, kind: HostKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(HostNode {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn container(&self, node: NodeId) -> Result<&HostNode, DomError> {
        let host = self.get(node)?;
        match host.kind {
            HostKind::Element { .. } => Ok(host),
            _ => Err(DomError::NotAContainer {
                node: node.to_string(),
            }),
        }
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.parent_of(node) {
            if let Some(host) = self.nodes.get_mut(parent.0) {
                host.children.retain(|c| *c != node);
            }
            if let Some(host) = self.nodes.get_mut(node.0) {
                host.parent = None;
            }
        }
    }

    /// True when `ancestor` is `node` or one of its ancestors.
    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent_of(id);
        }
        false
    }

    fn insert(
        &mut self,
        parent: NodeId,
        node: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        self.container(parent)?;
        self.get(node)?;
        if self.is_inclusive_ancestor(node, parent) {
            return Err(DomError::Cycle {
                parent: parent.to_string(),
                node: node.to_string(),
            });
        }
        if let Some(reference) = reference {
            if self.parent_of(reference) != Some(parent) {
                return Err(DomError::NotAChild {
                    parent: parent.to_string(),
                    child: reference.to_string(),
                });
            }
            if reference == node {
                // already in place
                return Ok(());
            }
        }

        self.detach(node);
        let host = &mut self.nodes[parent.0];
        let at = reference
            .and_then(|r| host.children.iter().position(|c| *c == r))
            .unwrap_or(host.children.len());
        host.children.insert(at, node);
        self.nodes[node.0].parent = Some(parent);
        Ok(())
    }
}

impl DomApi for MemoryDom {
    type Node = NodeId;

    fn create_element(&mut self, tag: &str) -> Result<NodeId, DomError> {
        if !is_valid_name(tag) {
            return Err(DomError::InvalidTagName {
                tag: tag.to_string(),
            });
        }
        let node = self.alloc(HostKind::Element {
            tag: tag.to_string(),
            namespace: None,
            attributes: IndexMap::new(),
        });
        self.journal.push(DomOp::CreateElement {
            node,
            tag: tag.to_string(),
            namespace: None,
        });
        Ok(node)
    }

    fn create_element_ns(&mut self, namespace: &str, tag: &str) -> Result<NodeId, DomError> {
        if !is_valid_name(tag) {
            return Err(DomError::InvalidTagName {
                tag: tag.to_string(),
            });
        }
        let node = self.alloc(HostKind::Element {
            tag: tag.to_string(),
            namespace: Some(namespace.to_string()),
            attributes: IndexMap::new(),
        });
        self.journal.push(DomOp::CreateElement {
            node,
            tag: tag.to_string(),
            namespace: Some(namespace.to_string()),
        });
        Ok(node)
    }

    fn create_text_node(&mut self, text: &str) -> NodeId {
        let node = self.alloc(HostKind::Text(text.to_string()));
        self.journal.push(DomOp::CreateText {
            node,
            text: text.to_string(),
        });
        node
    }

    fn create_comment(&mut self, text: &str) -> NodeId {
        let node = self.alloc(HostKind::Comment(text.to_string()));
        self.journal.push(DomOp::CreateComment {
            node,
            text: text.to_string(),
        });
        node
    }

    fn insert_before(
        &mut self,
        parent: &NodeId,
        node: &NodeId,
        reference: Option<&NodeId>,
    ) -> Result<(), DomError> {
        self.insert(*parent, *node, reference.copied())?;
        self.journal.push(DomOp::InsertBefore {
            parent: *parent,
            node: *node,
            reference: reference.copied(),
        });
        Ok(())
    }

    fn remove_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), DomError> {
        if self.parent_of(*child) != Some(*parent) {
            return Err(DomError::NotAChild {
                parent: parent.to_string(),
                child: child.to_string(),
            });
        }
        self.detach(*child);
        self.journal.push(DomOp::RemoveChild {
            parent: *parent,
            node: *child,
        });
        Ok(())
    }

    fn append_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), DomError> {
        self.insert(*parent, *child, None)?;
        self.journal.push(DomOp::AppendChild {
            parent: *parent,
            node: *child,
        });
        Ok(())
    }

    fn parent_node(&self, node: &NodeId) -> Option<NodeId> {
        self.parent_of(*node)
    }

    fn next_sibling(&self, node: &NodeId) -> Option<NodeId> {
        let parent = self.parent_of(*node)?;
        let siblings = &self.nodes.get(parent.0)?.children;
        let at = siblings.iter().position(|c| c == node)?;
        siblings.get(at + 1).copied()
    }

    fn tag_name(&self, element: &NodeId) -> String {
        match self.nodes.get(element.0).map(|n| &n.kind) {
            Some(HostKind::Element { tag, .. }) => tag.clone(),
            _ => String::new(),
        }
    }

    fn set_text_content(&mut self, node: &NodeId, text: &str) {
        let Some(host) = self.nodes.get_mut(node.0) else {
            return;
        };
        match &mut host.kind {
            HostKind::Text(data) | HostKind::Comment(data) => *data = text.to_string(),
            HostKind::Element { .. } => {
                for child in std::mem::take(&mut host.children) {
                    self.nodes[child.0].parent = None;
                }
                if !text.is_empty() {
                    let child = self.alloc(HostKind::Text(text.to_string()));
                    self.nodes[node.0].children.push(child);
                    self.nodes[child.0].parent = Some(*node);
                }
            }
        }
        self.journal.push(DomOp::SetTextContent {
            node: *node,
            text: text.to_string(),
        });
    }

    fn set_attribute(&mut self, element: &NodeId, name: &str, value: &str) -> Result<(), DomError> {
        if !is_valid_name(name) {
            return Err(DomError::InvalidAttributeName {
                name: name.to_string(),
            });
        }
        match self.nodes.get_mut(element.0).map(|n| &mut n.kind) {
            Some(HostKind::Element { attributes, .. }) => {
                attributes.insert(name.to_string(), value.to_string());
            }
            Some(_) => {
                return Err(DomError::NotAnElement {
                    node: element.to_string(),
                })
            }
            None => {
                return Err(DomError::UnknownNode {
                    node: element.to_string(),
                })
            }
        }
        self.journal.push(DomOp::SetAttribute {
            node: *element,
            name: name.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    fn attribute(&self, element: &NodeId, name: &str) -> Option<String> {
        match &self.nodes.get(element.0)?.kind {
            HostKind::Element { attributes, .. } => attributes.get(name).cloned(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn container(dom: &mut MemoryDom) -> NodeId {
        dom.create_element("div").unwrap()
    }

    #[test]
    fn insert_before_moves_attached_nodes() {
        let mut dom = MemoryDom::new();
        let parent = container(&mut dom);
        let a = dom.create_text_node("a");
        let b = dom.create_text_node("b");
        let c = dom.create_text_node("c");
        for n in [a, b, c] {
            dom.append_child(&parent, &n).unwrap();
        }

        dom.insert_before(&parent, &c, Some(&a)).unwrap();
        assert_eq!(dom.child_nodes(parent), &[c, a, b]);
        assert_eq!(dom.next_sibling(&a), Some(b));
        assert_eq!(dom.next_sibling(&b), None);

        dom.insert_before(&parent, &c, None).unwrap();
        assert_eq!(dom.child_nodes(parent), &[a, b, c]);
        assert_eq!(dom.text_content(parent), "abc");
    }

    #[test]
    fn insert_before_itself_is_a_no_op() {
        let mut dom = MemoryDom::new();
        let parent = container(&mut dom);
        let a = dom.create_text_node("a");
        let b = dom.create_text_node("b");
        dom.append_child(&parent, &a).unwrap();
        dom.append_child(&parent, &b).unwrap();
        dom.insert_before(&parent, &a, Some(&a)).unwrap();
        assert_eq!(dom.child_nodes(parent), &[a, b]);
    }

    #[test]
    fn rejects_bad_names_and_foreign_references() {
        let mut dom = MemoryDom::new();
        assert_eq!(
            dom.create_element("div.a"),
            Err(DomError::InvalidTagName {
                tag: "div.a".into()
            })
        );
        assert!(dom.create_element("").is_err());

        let parent = container(&mut dom);
        let other = container(&mut dom);
        let stray = dom.create_text_node("x");
        dom.append_child(&other, &stray).unwrap();
        let node = dom.create_text_node("y");
        assert!(matches!(
            dom.insert_before(&parent, &node, Some(&stray)),
            Err(DomError::NotAChild { .. })
        ));
        assert!(matches!(
            dom.remove_child(&parent, &stray),
            Err(DomError::NotAChild { .. })
        ));
        assert!(matches!(
            dom.append_child(&node, &parent),
            Err(DomError::NotAContainer { .. })
        ));
        dom.append_child(&parent, &other).unwrap();
        assert!(matches!(
            dom.append_child(&other, &parent),
            Err(DomError::Cycle { .. })
        ));
    }

    #[test]
    fn set_text_content_replaces_element_children() {
        let mut dom = MemoryDom::new();
        let parent = container(&mut dom);
        let child = container(&mut dom);
        dom.append_child(&parent, &child).unwrap();

        dom.set_text_content(&parent, "hello");
        assert!(!dom.is_attached(child));
        assert_eq!(dom.child_nodes(parent).len(), 1);
        assert_eq!(dom.text_content(parent), "hello");

        dom.set_text_content(&parent, "");
        assert!(dom.child_nodes(parent).is_empty());

        let comment = dom.create_comment("old");
        dom.set_text_content(&comment, "new");
        assert_eq!(dom.node_value(comment), Some("new"));
    }

    #[test]
    fn attributes_and_tag_queries() {
        let mut dom = MemoryDom::new();
        let el = dom.create_element_ns("http://www.w3.org/2000/svg", "svg").unwrap();
        dom.set_attribute(&el, "id", "logo").unwrap();
        assert_eq!(dom.attribute(&el, "id").as_deref(), Some("logo"));
        assert_eq!(dom.attribute(&el, "class"), None);
        assert_eq!(dom.tag_name(&el), "svg");
        assert_eq!(dom.namespace(el), Some("http://www.w3.org/2000/svg"));

        let text = dom.create_text_node("t");
        assert!(matches!(
            dom.set_attribute(&text, "id", "x"),
            Err(DomError::NotAnElement { .. })
        ));
    }

    #[test]
    fn journal_serializes_calls_in_order() {
        let mut dom = MemoryDom::new();
        let parent = container(&mut dom);
        let text = dom.create_text_node("hi");
        dom.append_child(&parent, &text).unwrap();
        dom.remove_child(&parent, &text).unwrap();

        let journal = serde_json::to_value(dom.take_journal()).unwrap();
        assert_eq!(
            journal,
            json!([
                { "op": "create_element", "node": 0, "tag": "div" },
                { "op": "create_text", "node": 1, "text": "hi" },
                { "op": "append_child", "parent": 0, "node": 1 },
                { "op": "remove_child", "parent": 0, "node": 1 },
            ])
        );
        assert!(dom.journal().is_empty());
    }
}
