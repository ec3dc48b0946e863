//! Core diffing engine: materialization, in-place patching and the four-cursor keyed children diff
use crate::config::{DuplicateKeys, ReconcilerConfig};
use crate::dom::DomApi;
use crate::errors::{ReconcilerError, Result};
use crate::hooks::HookRegistry;
use crate::removal::Removals;
use crate::types::{Key, Phase, RemovalProgress, RemovalToken, SelectorParts};
use crate::vnode::{Content, RemoveHook, VNode};
use indexmap::map::Entry;
use indexmap::{IndexMap, IndexSet};
use log::{debug, trace, warn};
use once_cell::unsync::OnceCell;
use std::ops::Range;

/// One reconciliation pass. Borrows the reconciler's state for the duration of
/// a single `patch` call and owns the pass-scoped insertion queue.
pub struct DiffEngine<'a, A: DomApi> {
    api: &'a mut A,
    hooks: &'a mut HookRegistry<A>,
    config: &'a ReconcilerConfig,
    removals: &'a mut Removals<A::Node>,
    empty: &'a VNode<A::Node>,
    unknown_extensions: &'a mut IndexSet<String>,
    /// Child-index paths (from the new root) of created nodes with an `insert` hook.
    inserted: Vec<Vec<usize>>,
    /// Path of the node currently being visited.
    path: Vec<usize>,
}

/// Which of the keyed-diff heuristics applies at the current cursors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Heads,
    Tails,
    MovedRight,
    MovedLeft,
    Lookup,
}

fn host_of<N>(node: &VNode<N>) -> Result<&N> {
    node.host_ref()
        .ok_or_else(|| ReconcilerError::MissingHostRef {
            selector: node.describe(),
        })
}

impl<'a, A: DomApi> DiffEngine<'a, A> {
    pub(crate) fn new(
        api: &'a mut A,
        hooks: &'a mut HookRegistry<A>,
        config: &'a ReconcilerConfig,
        removals: &'a mut Removals<A::Node>,
        empty: &'a VNode<A::Node>,
        unknown_extensions: &'a mut IndexSet<String>,
    ) -> Self {
        DiffEngine {
            api,
            hooks,
            config,
            removals,
            empty,
            unknown_extensions,
            inserted: Vec::new(),
            path: Vec::new(),
        }
    }

    /// Reconcile the root pair: patch in place when they are the same node,
    /// otherwise insert the new tree after the old one and then remove the old one.
    pub(crate) fn reconcile(&mut self, old: VNode<A::Node>, new: &mut VNode<A::Node>) -> Result<()> {
        if old.same_as(new) {
            debug!("patching root {} in place", new.describe());
            return self.patch_vnode(old, new, None);
        }

        debug!("replacing root {} with {}", old.describe(), new.describe());
        let elm = host_of(&old)?.clone();
        let parent = self.api.parent_node(&elm);
        let created = self.create_elm(new, None)?;
        if let Some(parent) = parent {
            let next = self.api.next_sibling(&elm);
            self.api.insert_before(&parent, &created, next.as_ref())?;
            self.remove_vnodes(&parent, vec![old])?;
        }
        Ok(())
    }

    /// Run the `insert` hook of every node created during the pass, in creation order.
    pub(crate) fn flush_inserted(&mut self, root: &VNode<A::Node>) -> Result<()> {
        for path in std::mem::take(&mut self.inserted) {
            let node = root
                .descendant(&path)
                .ok_or_else(|| ReconcilerError::InvalidPath { path: path.clone() })?;
            if let Some(insert) = node.hooks().and_then(|h| h.insert.as_ref()) {
                insert(node).map_err(|e| ReconcilerError::node_hook(Phase::Insert, e))?;
            }
        }
        Ok(())
    }

    fn create_elm(&mut self, node: &mut VNode<A::Node>, ns: Option<&str>) -> Result<A::Node> {
        if let Some(init) = node.hooks().and_then(|h| h.init.clone()) {
            init(&mut *node).map_err(|e| ReconcilerError::node_hook(Phase::Init, e))?;
        }

        let elm = match &*node {
            VNode::Element(_) => return self.create_element(node, ns),
            VNode::Comment(comment) => self.api.create_comment(&comment.text),
            VNode::Text(text) => self.api.create_text_node(&text.text),
        };
        node.set_host_ref(elm.clone());
        Ok(elm)
    }

    fn create_element(&mut self, node: &mut VNode<A::Node>, inherited_ns: Option<&str>) -> Result<A::Node> {
        let (parts, ns) = match &*node {
            VNode::Element(el) => (
                SelectorParts::parse(&el.sel),
                el.data.ns.clone().or_else(|| inherited_ns.map(str::to_owned)),
            ),
            other => {
                return Err(ReconcilerError::ShapeMismatch {
                    old: "element".to_string(),
                    new: other.describe(),
                })
            }
        };

        let elm = match ns.as_deref() {
            Some(ns) => self.api.create_element_ns(ns, &parts.tag)?,
            None => self.api.create_element(&parts.tag)?,
        };
        if let Some(id) = &parts.id {
            self.api.set_attribute(&elm, "id", id)?;
        }
        if let Some(class) = &parts.class {
            self.api.set_attribute(&elm, "class", class)?;
        }
        node.set_host_ref(elm.clone());
        self.warn_unknown_extensions(node);

        let hooks = node.hooks().cloned().unwrap_or_default();
        self.hooks.run_create(self.api, self.empty, node)?;
        if let Some(create) = &hooks.create {
            create(self.empty, &*node).map_err(|e| ReconcilerError::node_hook(Phase::Create, e))?;
        }

        let child_ns = self.child_namespace(&parts.tag, ns);
        if let VNode::Element(el) = node {
            match &mut el.content {
                Content::Children(children) => {
                    self.check_unique_keys(children)?;
                    for idx in 0..children.len() {
                        let child = self.create_child(children, idx, child_ns.as_deref())?;
                        self.api.append_child(&elm, &child)?;
                    }
                }
                Content::Text(text) => {
                    let text = self.api.create_text_node(text);
                    self.api.append_child(&elm, &text)?;
                }
                Content::Empty => {}
            }
        }

        if hooks.insert.is_some() {
            self.inserted.push(self.path.clone());
        }
        Ok(elm)
    }

    fn create_child(
        &mut self,
        vnodes: &mut [VNode<A::Node>],
        idx: usize,
        ns: Option<&str>,
    ) -> Result<A::Node> {
        let Some(vnode) = vnodes.get_mut(idx) else {
            return Err(self.invalid_path(idx));
        };
        self.path.push(idx);
        let created = self.create_elm(vnode, ns);
        self.path.pop();
        created
    }

    fn add_vnodes(
        &mut self,
        parent: &A::Node,
        before: Option<&A::Node>,
        vnodes: &mut [VNode<A::Node>],
        range: Range<usize>,
        ns: Option<&str>,
    ) -> Result<()> {
        for idx in range {
            let elm = self.create_child(vnodes, idx, ns)?;
            self.api.insert_before(parent, &elm, before)?;
        }
        Ok(())
    }

    fn invoke_destroy_hook(&mut self, node: &VNode<A::Node>) -> Result<()> {
        let Some(data) = node.data() else {
            return Ok(());
        };
        if let Some(destroy) = &data.hooks.destroy {
            destroy(node).map_err(|e| ReconcilerError::node_hook(Phase::Destroy, e))?;
        }
        self.hooks.run_destroy(self.api, node)?;
        if let Some(children) = node.children() {
            for child in children {
                self.invoke_destroy_hook(child)?;
            }
        }
        Ok(())
    }

    fn remove_vnodes(&mut self, parent: &A::Node, vnodes: Vec<VNode<A::Node>>) -> Result<()> {
        for vnode in vnodes {
            if let VNode::Text(_) = vnode {
                trace!("removing text node");
                self.api.remove_child(parent, host_of(&vnode)?)?;
                continue;
            }
            self.invoke_destroy_hook(&vnode)?;
            self.remove_with_hooks(vnode)?;
        }
        Ok(())
    }

    /// Hand the node to every `remove` participant; the host node is detached
    /// once all of them have completed.
    fn remove_with_hooks(&mut self, vnode: VNode<A::Node>) -> Result<()> {
        let host = host_of(&vnode)?.clone();
        let own = vnode.hooks().and_then(|h| h.remove.clone());
        let participants = self.hooks.len(Phase::Remove) + usize::from(own.is_some());
        let token = self.removals.begin(host, participants);
        trace!("removing {} ({token}, {participants} participants)", vnode.describe());

        let completed = match self.run_remove_participants(&vnode, own, token) {
            Ok(completed) => completed,
            Err(err) => {
                self.removals.cancel(token);
                return Err(err);
            }
        };
        self.removals.settle(&mut *self.api, token, completed)?;
        Ok(())
    }

    /// Number of participants that completed synchronously.
    fn run_remove_participants(
        &mut self,
        vnode: &VNode<A::Node>,
        own: Option<RemoveHook<A::Node>>,
        token: RemovalToken,
    ) -> Result<usize> {
        let mut completed = self.hooks.run_remove(self.api, vnode, token)?;
        if let Some(remove) = own {
            let progress =
                remove(vnode, token).map_err(|e| ReconcilerError::node_hook(Phase::Remove, e))?;
            if progress == RemovalProgress::Complete {
                completed += 1;
            }
        }
        Ok(completed)
    }

    fn patch_vnode(&mut self, mut old: VNode<A::Node>, new: &mut VNode<A::Node>, ns: Option<&str>) -> Result<()> {
        let hooks = new.hooks().cloned().unwrap_or_default();
        if let Some(prepatch) = &hooks.prepatch {
            prepatch(&old, &*new).map_err(|e| ReconcilerError::node_hook(Phase::Prepatch, e))?;
        }

        let elm = host_of(&old)?.clone();
        new.set_host_ref(elm.clone());

        if new.data().is_some() {
            self.hooks.run_update(self.api, &old, new)?;
            if let Some(update) = &hooks.update {
                update(&old, &*new).map_err(|e| ReconcilerError::node_hook(Phase::Update, e))?;
            }
        }

        match (&mut old, &mut *new) {
            (VNode::Element(old_el), VNode::Element(new_el)) => {
                let own_ns = new_el.data.ns.clone().or_else(|| ns.map(str::to_owned));
                let child_ns = match own_ns {
                    Some(ns) => self.child_namespace(&SelectorParts::parse(&new_el.sel).tag, Some(ns)),
                    None => None,
                };
                let old_content = std::mem::take(&mut old_el.content);
                self.patch_content(&elm, old_content, &mut new_el.content, child_ns.as_deref())?;
            }
            (VNode::Text(old_text), VNode::Text(new_text)) => {
                if old_text.text != new_text.text {
                    self.api.set_text_content(&elm, &new_text.text);
                }
            }
            (VNode::Comment(old_comment), VNode::Comment(new_comment)) => {
                if old_comment.text != new_comment.text {
                    self.api.set_text_content(&elm, &new_comment.text);
                }
            }
            (old, new) => {
                return Err(ReconcilerError::ShapeMismatch {
                    old: old.describe(),
                    new: new.describe(),
                })
            }
        }

        if let Some(postpatch) = &hooks.postpatch {
            postpatch(&old, &*new).map_err(|e| ReconcilerError::node_hook(Phase::Postpatch, e))?;
        }
        Ok(())
    }

    fn patch_content(
        &mut self,
        elm: &A::Node,
        old: Content<A::Node>,
        new: &mut Content<A::Node>,
        ns: Option<&str>,
    ) -> Result<()> {
        match (old, new) {
            (old, Content::Empty) => match old {
                Content::Text(_) => self.api.set_text_content(elm, ""),
                Content::Children(children) => self.remove_vnodes(elm, children)?,
                Content::Empty => {}
            },
            (Content::Children(old_ch), Content::Children(new_ch)) => {
                self.update_children(elm, old_ch, new_ch, ns)?;
            }
            (old, Content::Children(new_ch)) => {
                if let Content::Text(_) = old {
                    self.api.set_text_content(elm, "");
                }
                self.check_unique_keys(new_ch)?;
                let len = new_ch.len();
                self.add_vnodes(elm, None, new_ch, 0..len, ns)?;
            }
            (old, Content::Text(text)) => match old {
                Content::Text(previous) if previous == *text => {}
                Content::Children(children) => {
                    self.remove_vnodes(elm, children)?;
                    self.api.set_text_content(elm, text);
                }
                _ => self.api.set_text_content(elm, text),
            },
        }
        Ok(())
    }

    fn update_children(
        &mut self,
        parent: &A::Node,
        old_ch: Vec<VNode<A::Node>>,
        new_ch: &mut [VNode<A::Node>],
        ns: Option<&str>,
    ) -> Result<()> {
        self.check_unique_keys(new_ch)?;

        // Matched or moved old children leave an empty slot behind.
        let mut old: Vec<Option<VNode<A::Node>>> = old_ch.into_iter().map(Some).collect();
        // Both windows are half-open: [start, end).
        let (mut old_start, mut old_end) = (0, old.len());
        let (mut new_start, mut new_end) = (0, new_ch.len());
        let key_to_old: OnceCell<IndexMap<Key, usize>> = OnceCell::new();

        while old_start < old_end && new_start < new_end {
            let step = {
                let Some(first) = &old[old_start] else {
                    old_start += 1;
                    continue;
                };
                let Some(last) = &old[old_end - 1] else {
                    old_end -= 1;
                    continue;
                };
                if first.same_as(&new_ch[new_start]) {
                    Step::Heads
                } else if last.same_as(&new_ch[new_end - 1]) {
                    Step::Tails
                } else if first.same_as(&new_ch[new_end - 1]) {
                    Step::MovedRight
                } else if last.same_as(&new_ch[new_start]) {
                    Step::MovedLeft
                } else {
                    Step::Lookup
                }
            };
            trace!("children diff {step:?} at old {old_start}..{old_end} new {new_start}..{new_end}");

            match step {
                Step::Heads => {
                    let matched = self.take_slot(&mut old, old_start)?;
                    self.patch_child(matched, new_ch, new_start, ns)?;
                    old_start += 1;
                    new_start += 1;
                }
                Step::Tails => {
                    let matched = self.take_slot(&mut old, old_end - 1)?;
                    self.patch_child(matched, new_ch, new_end - 1, ns)?;
                    old_end -= 1;
                    new_end -= 1;
                }
                Step::MovedRight => {
                    let anchor = self.slot_host(&old, old_end - 1)?;
                    let matched = self.take_slot(&mut old, old_start)?;
                    self.patch_child(matched, new_ch, new_end - 1, ns)?;
                    let moved = host_of(&new_ch[new_end - 1])?.clone();
                    let after = self.api.next_sibling(&anchor);
                    self.api.insert_before(parent, &moved, after.as_ref())?;
                    old_start += 1;
                    new_end -= 1;
                }
                Step::MovedLeft => {
                    let anchor = self.slot_host(&old, old_start)?;
                    let matched = self.take_slot(&mut old, old_end - 1)?;
                    self.patch_child(matched, new_ch, new_start, ns)?;
                    let moved = host_of(&new_ch[new_start])?.clone();
                    self.api.insert_before(parent, &moved, Some(&anchor))?;
                    old_end -= 1;
                    new_start += 1;
                }
                Step::Lookup => {
                    let index =
                        key_to_old.get_or_try_init(|| self.key_index(&old, old_start..old_end))?;
                    let anchor = self.slot_host(&old, old_start)?;
                    let candidate = new_ch[new_start]
                        .key()
                        .and_then(|key| index.get(key))
                        .copied()
                        .filter(|&i| old.get(i).is_some_and(Option::is_some));

                    let reusable = candidate.filter(|&i| {
                        old[i].as_ref().map(VNode::selector) == Some(new_ch[new_start].selector())
                    });
                    match reusable {
                        Some(i) => {
                            trace!("moving keyed child from old slot {i}");
                            let matched = self.take_slot(&mut old, i)?;
                            self.patch_child(matched, new_ch, new_start, ns)?;
                            let moved = host_of(&new_ch[new_start])?.clone();
                            self.api.insert_before(parent, &moved, Some(&anchor))?;
                        }
                        None => {
                            trace!("creating {}", new_ch[new_start].describe());
                            let created = self.create_child(new_ch, new_start, ns)?;
                            self.api.insert_before(parent, &created, Some(&anchor))?;
                        }
                    }
                    new_start += 1;
                }
            }
        }

        if old_start >= old_end {
            let before = new_ch.get(new_end).and_then(VNode::host_ref).cloned();
            self.add_vnodes(parent, before.as_ref(), new_ch, new_start..new_end, ns)?;
        } else if new_start >= new_end {
            let rest: Vec<_> = old.drain(old_start..old_end).flatten().collect();
            self.remove_vnodes(parent, rest)?;
        }
        Ok(())
    }

    fn patch_child(
        &mut self,
        old: VNode<A::Node>,
        new_ch: &mut [VNode<A::Node>],
        idx: usize,
        ns: Option<&str>,
    ) -> Result<()> {
        let Some(new) = new_ch.get_mut(idx) else {
            return Err(self.invalid_path(idx));
        };
        self.path.push(idx);
        let patched = self.patch_vnode(old, new, ns);
        self.path.pop();
        patched
    }

    fn take_slot(&self, old: &mut [Option<VNode<A::Node>>], idx: usize) -> Result<VNode<A::Node>> {
        old.get_mut(idx)
            .and_then(Option::take)
            .ok_or_else(|| self.invalid_path(idx))
    }

    fn slot_host(&self, old: &[Option<VNode<A::Node>>], idx: usize) -> Result<A::Node> {
        match old.get(idx).and_then(Option::as_ref) {
            Some(node) => Ok(host_of(node)?.clone()),
            None => Err(self.invalid_path(idx)),
        }
    }

    fn invalid_path(&self, idx: usize) -> ReconcilerError {
        let mut path = self.path.clone();
        path.push(idx);
        ReconcilerError::InvalidPath { path }
    }

    /// Key -> slot index over the remaining old window.
    fn key_index(
        &self,
        old: &[Option<VNode<A::Node>>],
        window: Range<usize>,
    ) -> Result<IndexMap<Key, usize>> {
        let mut index = IndexMap::new();
        for (i, slot) in old.iter().enumerate().take(window.end).skip(window.start) {
            let Some(key) = slot.as_ref().and_then(VNode::key) else {
                continue;
            };
            match index.entry(key.clone()) {
                Entry::Vacant(entry) => {
                    entry.insert(i);
                }
                Entry::Occupied(_) => match self.config.duplicate_keys {
                    DuplicateKeys::FirstWins => {
                        warn!("duplicate sibling key {key}; later occurrences are treated as new")
                    }
                    DuplicateKeys::Reject => {
                        return Err(ReconcilerError::DuplicateKey { key: key.clone() })
                    }
                },
            }
        }
        Ok(index)
    }

    fn check_unique_keys(&self, children: &[VNode<A::Node>]) -> Result<()> {
        if self.config.duplicate_keys != DuplicateKeys::Reject {
            return Ok(());
        }
        let mut seen = IndexSet::new();
        for key in children.iter().filter_map(VNode::key) {
            if !seen.insert(key) {
                return Err(ReconcilerError::DuplicateKey { key: key.clone() });
            }
        }
        Ok(())
    }

    /// Namespace inherited by the children of an element with `tag`.
    fn child_namespace(&self, tag: &str, ns: Option<String>) -> Option<String> {
        ns.filter(|_| tag != self.config.foreign_object_tag)
    }

    fn warn_unknown_extensions(&mut self, node: &VNode<A::Node>) {
        let Some(data) = node.data() else {
            return;
        };
        for name in data.extension_names() {
            if !self.hooks.consumes(name) && self.unknown_extensions.insert(name.to_string()) {
                warn!("no registered module consumes the '{name}' extension");
            }
        }
    }
}
