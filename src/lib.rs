//! Virtual tree reconciler: patches a live host tree so it matches a new
//! abstract tree with a minimal set of adapter operations.
mod builder;
mod config;
mod diff_engine;
pub mod dom;
mod errors;
mod hooks;
mod removal;
mod types;
mod vnode;

pub use builder::{comment, h, text, Child, Children, SVG_NAMESPACE};
pub use config::{DuplicateKeys, ReconcilerConfig};
pub use errors::{DomError, HookError, HookResult, ReconcilerError, Result};
pub use hooks::{HookRegistry, Module};
pub use types::{
    Key, Phase, RemovalProgress, RemovalState, RemovalToken, SelectorParts, COMMENT_SELECTOR,
};
pub use vnode::{Comment, Content, Element, Extension, NodeHooks, Text, VNode, VNodeData};

use diff_engine::DiffEngine;
use dom::{DomApi, MemoryDom};
use indexmap::IndexSet;
use log::debug;
use removal::Removals;

/// What the first argument of `patch` refers to.
#[derive(Debug, Clone)]
pub enum PatchTarget<N> {
    /// The tree returned by the previous `patch`.
    Tree(VNode<N>),
    /// A live host element that has never been patched.
    Anchor(N),
}

impl<N> From<VNode<N>> for PatchTarget<N> {
    fn from(node: VNode<N>) -> Self {
        PatchTarget::Tree(node)
    }
}

#[derive(Debug)]
pub struct Reconciler<A: DomApi> {
    api: A,
    hooks: HookRegistry<A>,
    config: ReconcilerConfig,
    removals: Removals<A::Node>,
    empty: VNode<A::Node>,
    unknown_extensions: IndexSet<String>,
}

/// Build a reconciler from side-effect modules and an optional adapter.
pub fn init<A: DomApi + Default>(modules: Vec<Module<A>>, api: Option<A>) -> Reconciler<A> {
    Reconciler::with_api(modules, api.unwrap_or_default())
}

impl<A: DomApi + Default> Reconciler<A> {
    pub fn new(modules: Vec<Module<A>>) -> Self {
        Self::with_api(modules, A::default())
    }
}

impl Reconciler<MemoryDom> {
    /// Render a host subtree of the in-memory adapter as markup.
    pub fn to_html(&self, node: dom::NodeId) -> Result<String> {
        Ok(dom::to_html(&self.api, node)?)
    }
}

impl<A: DomApi> Reconciler<A> {
    pub fn with_api(modules: Vec<Module<A>>, api: A) -> Self {
        Self::with_config(modules, api, ReconcilerConfig::default())
    }

    pub fn with_config(modules: Vec<Module<A>>, api: A, config: ReconcilerConfig) -> Self {
        let hooks = HookRegistry::new(modules);
        debug!("reconciler initialized: {hooks:?}");
        Reconciler {
            api,
            hooks,
            config,
            removals: Removals::default(),
            empty: VNode::empty(),
            unknown_extensions: IndexSet::new(),
        }
    }

    /// Make the host tree match `new` and return it with host references filled in.
    ///
    /// The returned tree is the `old` argument of the next call. Any error
    /// aborts the pass and leaves the host tree partially updated.
    pub fn patch(
        &mut self,
        old: impl Into<PatchTarget<A::Node>>,
        mut new: VNode<A::Node>,
    ) -> Result<VNode<A::Node>> {
        debug!("reconciliation pass started for {}", new.describe());
        self.hooks.run_pre(&mut self.api)?;

        let old = match old.into() {
            PatchTarget::Tree(tree) => tree,
            PatchTarget::Anchor(elm) => self.wrap_anchor(elm),
        };

        let mut engine = DiffEngine::new(
            &mut self.api,
            &mut self.hooks,
            &self.config,
            &mut self.removals,
            &self.empty,
            &mut self.unknown_extensions,
        );
        engine.reconcile(old, &mut new)?;
        engine.flush_inserted(&new)?;

        self.hooks.run_post(&mut self.api)?;
        debug!(
            "reconciliation pass finished, {} removal(s) pending",
            self.removals.len()
        );
        Ok(new)
    }

    /// Report that a participant which returned `Pending` from its remove
    /// hook is done. The host node is detached once every participant is.
    pub fn finish_removal(&mut self, token: RemovalToken) -> Result<RemovalState> {
        self.removals.settle(&mut self.api, token, 1)
    }

    pub fn is_removal_pending(&self, token: RemovalToken) -> bool {
        self.removals.is_pending(token)
    }

    pub fn pending_removals(&self) -> usize {
        self.removals.len()
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn api_mut(&mut self) -> &mut A {
        &mut self.api
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn hooks(&self) -> &HookRegistry<A> {
        &self.hooks
    }

    fn wrap_anchor(&self, elm: A::Node) -> VNode<A::Node> {
        let sel = SelectorParts::from_host(
            &self.api.tag_name(&elm),
            self.api.attribute(&elm, "id").as_deref(),
            self.api.attribute(&elm, "class").as_deref(),
        );
        debug!("wrapping host element as '{sel}'");
        VNode::anchored(sel, elm)
    }
}
