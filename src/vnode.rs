//! Abstract node model: the description of one tree position before and after
//! it has been realized against the host tree.
use crate::errors::{HookResult, ReconcilerError};
use crate::types::{Key, RemovalProgress, RemovalToken, COMMENT_SELECTOR};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::rc::Rc;

pub type InitHook<N> = Rc<dyn Fn(&mut VNode<N>) -> HookResult>;
pub type CreateHook<N> = Rc<dyn Fn(&VNode<N>, &VNode<N>) -> HookResult>;
pub type InsertHook<N> = Rc<dyn Fn(&VNode<N>) -> HookResult>;
pub type PatchHook<N> = Rc<dyn Fn(&VNode<N>, &VNode<N>) -> HookResult>;
pub type DestroyHook<N> = Rc<dyn Fn(&VNode<N>) -> HookResult>;
pub type RemoveHook<N> = Rc<dyn Fn(&VNode<N>, RemovalToken) -> HookResult<RemovalProgress>>;

/// Hooks declared on a single node.
pub struct NodeHooks<N> {
    pub init: Option<InitHook<N>>,
    pub create: Option<CreateHook<N>>,
    pub insert: Option<InsertHook<N>>,
    pub prepatch: Option<PatchHook<N>>,
    pub update: Option<PatchHook<N>>,
    pub postpatch: Option<PatchHook<N>>,
    pub destroy: Option<DestroyHook<N>>,
    pub remove: Option<RemoveHook<N>>,
}

impl<N> Default for NodeHooks<N> {
    fn default() -> Self {
        NodeHooks {
            init: None,
            create: None,
            insert: None,
            prepatch: None,
            update: None,
            postpatch: None,
            destroy: None,
            remove: None,
        }
    }
}

impl<N> Clone for NodeHooks<N> {
    fn clone(&self) -> Self {
        NodeHooks {
            init: self.init.clone(),
            create: self.create.clone(),
            insert: self.insert.clone(),
            prepatch: self.prepatch.clone(),
            update: self.update.clone(),
            postpatch: self.postpatch.clone(),
            destroy: self.destroy.clone(),
            remove: self.remove.clone(),
        }
    }
}

impl<N> fmt::Debug for NodeHooks<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let declared: Vec<&str> = [
            ("init", self.init.is_some()),
            ("create", self.create.is_some()),
            ("insert", self.insert.is_some()),
            ("prepatch", self.prepatch.is_some()),
            ("update", self.update.is_some()),
            ("postpatch", self.postpatch.is_some()),
            ("destroy", self.destroy.is_some()),
            ("remove", self.remove.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect();
        f.debug_tuple("NodeHooks").field(&declared).finish()
    }
}

impl<N> NodeHooks<N> {
    pub fn on_init(mut self, f: impl Fn(&mut VNode<N>) -> HookResult + 'static) -> Self {
        self.init = Some(Rc::new(f));
        self
    }

    pub fn on_create(mut self, f: impl Fn(&VNode<N>, &VNode<N>) -> HookResult + 'static) -> Self {
        self.create = Some(Rc::new(f));
        self
    }

    pub fn on_insert(mut self, f: impl Fn(&VNode<N>) -> HookResult + 'static) -> Self {
        self.insert = Some(Rc::new(f));
        self
    }

    pub fn on_prepatch(mut self, f: impl Fn(&VNode<N>, &VNode<N>) -> HookResult + 'static) -> Self {
        self.prepatch = Some(Rc::new(f));
        self
    }

    pub fn on_update(mut self, f: impl Fn(&VNode<N>, &VNode<N>) -> HookResult + 'static) -> Self {
        self.update = Some(Rc::new(f));
        self
    }

    pub fn on_postpatch(
        mut self,
        f: impl Fn(&VNode<N>, &VNode<N>) -> HookResult + 'static,
    ) -> Self {
        self.postpatch = Some(Rc::new(f));
        self
    }

    pub fn on_destroy(mut self, f: impl Fn(&VNode<N>) -> HookResult + 'static) -> Self {
        self.destroy = Some(Rc::new(f));
        self
    }

    pub fn on_remove(
        mut self,
        f: impl Fn(&VNode<N>, RemovalToken) -> HookResult<RemovalProgress> + 'static,
    ) -> Self {
        self.remove = Some(Rc::new(f));
        self
    }
}

/// Typed payload a side-effect module reads from the node's property bag.
pub trait Extension: Serialize + DeserializeOwned {
    const NAME: &'static str;
}

/// Property bag: a fixed core plus per-module extension payloads.
#[derive(Debug)]
pub struct VNodeData<N> {
    pub key: Option<Key>,
    pub ns: Option<String>,
    pub hooks: NodeHooks<N>,
    extensions: IndexMap<String, serde_json::Value>,
}

impl<N> Default for VNodeData<N> {
    fn default() -> Self {
        VNodeData {
            key: None,
            ns: None,
            hooks: NodeHooks::default(),
            extensions: IndexMap::new(),
        }
    }
}

impl<N> Clone for VNodeData<N> {
    fn clone(&self) -> Self {
        VNodeData {
            key: self.key.clone(),
            ns: self.ns.clone(),
            hooks: self.hooks.clone(),
            extensions: self.extensions.clone(),
        }
    }
}

impl<N> From<()> for VNodeData<N> {
    fn from(_: ()) -> Self {
        VNodeData::default()
    }
}

impl<N> VNodeData<N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keyed(key: impl Into<Key>) -> Self {
        Self::default().key(key)
    }

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn ns(mut self, ns: impl Into<String>) -> Self {
        self.ns = Some(ns.into());
        self
    }

    pub fn hooks(mut self, hooks: NodeHooks<N>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_extension<E: Extension>(mut self, value: &E) -> Result<Self, ReconcilerError> {
        self.insert_extension(value)?;
        Ok(self)
    }

    pub fn insert_extension<E: Extension>(&mut self, value: &E) -> Result<(), ReconcilerError> {
        self.extensions
            .insert(E::NAME.to_string(), serde_json::to_value(value)?);
        Ok(())
    }

    /// Decode the payload stored under `E::NAME`, if any.
    pub fn extension<E: Extension>(&self) -> Result<Option<E>, ReconcilerError> {
        match self.extensions.get(E::NAME) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    pub fn extension_names(&self) -> impl Iterator<Item = &str> {
        self.extensions.keys().map(String::as_str)
    }
}

/// Content of an element. Children and text can never coexist.
#[derive(Debug)]
pub enum Content<N> {
    Empty,
    Children(Vec<VNode<N>>),
    Text(String),
}

impl<N> Default for Content<N> {
    fn default() -> Self {
        Content::Empty
    }
}

impl<N: Clone> Clone for Content<N> {
    fn clone(&self) -> Self {
        match self {
            Content::Empty => Content::Empty,
            Content::Children(children) => Content::Children(children.clone()),
            Content::Text(text) => Content::Text(text.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Element<N> {
    pub sel: String,
    pub data: VNodeData<N>,
    pub content: Content<N>,
    pub(crate) key: Option<Key>,
    pub(crate) elm: Option<N>,
}

/// Plain text leaf. Carries no property bag and no key.
#[derive(Debug, Clone)]
pub struct Text<N> {
    pub text: String,
    pub(crate) elm: Option<N>,
}

#[derive(Debug, Clone)]
pub struct Comment<N> {
    pub text: String,
    pub data: VNodeData<N>,
    pub(crate) key: Option<Key>,
    pub(crate) elm: Option<N>,
}

#[derive(Debug, Clone)]
pub enum VNode<N> {
    Element(Element<N>),
    Text(Text<N>),
    Comment(Comment<N>),
}

impl<N> VNode<N> {
    pub fn element(sel: impl Into<String>, data: VNodeData<N>, content: Content<N>) -> Self {
        let key = data.key.clone();
        VNode::Element(Element {
            sel: sel.into(),
            data,
            content,
            key,
            elm: None,
        })
    }

    pub fn text(text: impl Into<String>) -> Self {
        VNode::Text(Text {
            text: text.into(),
            elm: None,
        })
    }

    pub fn comment(text: impl Into<String>, data: VNodeData<N>) -> Self {
        let key = data.key.clone();
        VNode::Comment(Comment {
            text: text.into(),
            data,
            key,
            elm: None,
        })
    }

    /// Placeholder passed as the "old" node to `create` hooks.
    pub(crate) fn empty() -> Self {
        VNode::element("", VNodeData::default(), Content::Children(Vec::new()))
    }

    /// Element wrapping a live host node that has no abstract counterpart yet.
    pub(crate) fn anchored(sel: String, elm: N) -> Self {
        let mut node = VNode::element(sel, VNodeData::default(), Content::Children(Vec::new()));
        node.set_host_ref(elm);
        node
    }

    /// `None` for text leaves.
    pub fn selector(&self) -> Option<&str> {
        match self {
            VNode::Element(el) => Some(&el.sel),
            VNode::Comment(_) => Some(COMMENT_SELECTOR),
            VNode::Text(_) => None,
        }
    }

    pub fn key(&self) -> Option<&Key> {
        match self {
            VNode::Element(el) => el.key.as_ref(),
            VNode::Comment(c) => c.key.as_ref(),
            VNode::Text(_) => None,
        }
    }

    pub fn host_ref(&self) -> Option<&N> {
        match self {
            VNode::Element(el) => el.elm.as_ref(),
            VNode::Text(t) => t.elm.as_ref(),
            VNode::Comment(c) => c.elm.as_ref(),
        }
    }

    pub(crate) fn set_host_ref(&mut self, elm: N) {
        match self {
            VNode::Element(el) => el.elm = Some(elm),
            VNode::Text(t) => t.elm = Some(elm),
            VNode::Comment(c) => c.elm = Some(elm),
        }
    }

    pub fn data(&self) -> Option<&VNodeData<N>> {
        match self {
            VNode::Element(el) => Some(&el.data),
            VNode::Comment(c) => Some(&c.data),
            VNode::Text(_) => None,
        }
    }

    pub fn data_mut(&mut self) -> Option<&mut VNodeData<N>> {
        match self {
            VNode::Element(el) => Some(&mut el.data),
            VNode::Comment(c) => Some(&mut c.data),
            VNode::Text(_) => None,
        }
    }

    pub fn hooks(&self) -> Option<&NodeHooks<N>> {
        self.data().map(|data| &data.hooks)
    }

    pub fn children(&self) -> Option<&[VNode<N>]> {
        match self {
            VNode::Element(Element {
                content: Content::Children(children),
                ..
            }) => Some(children),
            _ => None,
        }
    }

    /// Text content: the leaf text, the comment text, or an element's text.
    pub fn text_content(&self) -> Option<&str> {
        match self {
            VNode::Element(Element {
                content: Content::Text(text),
                ..
            }) => Some(text),
            VNode::Element(_) => None,
            VNode::Text(t) => Some(&t.text),
            VNode::Comment(c) => Some(&c.text),
        }
    }

    /// Same-node predicate: equal keys and equal selectors.
    pub fn same_as(&self, other: &VNode<N>) -> bool {
        self.key() == other.key() && self.selector() == other.selector()
    }

    /// Follow a path of child indices down from this node.
    pub fn descendant(&self, path: &[usize]) -> Option<&VNode<N>> {
        path.iter()
            .try_fold(self, |node, &idx| node.children().and_then(|ch| ch.get(idx)))
    }

    pub(crate) fn describe(&self) -> String {
        match (self.selector(), self.key()) {
            (Some(sel), Some(key)) => format!("{sel} (key {key})"),
            (Some(sel), None) => sel.to_string(),
            (None, _) => "#text".to_string(),
        }
    }
}
