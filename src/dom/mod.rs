//! Renderer adapter: the only way the reconciler touches the host tree.
mod html;
mod memory;

pub use html::to_html;
pub use memory::{DomOp, MemoryDom, NodeId};

use crate::errors::DomError;
use std::fmt;

/// Primitive host-tree operations.
///
/// All calls are synchronous. The reconciler never inspects host state beyond
/// the query methods (`parent_node`, `next_sibling`, `tag_name`, `attribute`).
pub trait DomApi {
    /// Live handle into the host tree.
    type Node: Clone + PartialEq + fmt::Debug;

    fn create_element(&mut self, tag: &str) -> Result<Self::Node, DomError>;
    fn create_element_ns(&mut self, namespace: &str, tag: &str) -> Result<Self::Node, DomError>;
    fn create_text_node(&mut self, text: &str) -> Self::Node;
    fn create_comment(&mut self, text: &str) -> Self::Node;

    /// Insert `node` before `reference`, or at the end when `reference` is `None`.
    /// An already attached `node` is moved.
    fn insert_before(
        &mut self,
        parent: &Self::Node,
        node: &Self::Node,
        reference: Option<&Self::Node>,
    ) -> Result<(), DomError>;
    fn remove_child(&mut self, parent: &Self::Node, child: &Self::Node) -> Result<(), DomError>;
    fn append_child(&mut self, parent: &Self::Node, child: &Self::Node) -> Result<(), DomError>;

    fn parent_node(&self, node: &Self::Node) -> Option<Self::Node>;
    fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;
    fn tag_name(&self, element: &Self::Node) -> String;

    fn set_text_content(&mut self, node: &Self::Node, text: &str);
    fn set_attribute(&mut self, element: &Self::Node, name: &str, value: &str) -> Result<(), DomError>;
    fn attribute(&self, element: &Self::Node, name: &str) -> Option<String>;
}
