//! Side-effect modules and the per-phase hook registry built from them.
//!
//! A module is a partial record: it contributes any subset of the six module
//! phases. The registry keeps, per phase, the contributed callbacks in module
//! registration order and runs them in that order. No error isolation is done;
//! the first failing callback aborts the pass.
use crate::dom::DomApi;
use crate::errors::{HookResult, ReconcilerError, Result};
use crate::types::{Phase, RemovalProgress, RemovalToken};
use crate::vnode::{Extension, VNode};
use indexmap::IndexSet;
use log::trace;
use std::fmt;
use std::rc::Rc;

type HostNode<A> = <A as DomApi>::Node;

pub type PreHook<A> = Box<dyn FnMut(&mut A) -> HookResult>;
pub type PostHook<A> = Box<dyn FnMut(&mut A) -> HookResult>;
/// Args: adapter, empty placeholder, freshly created node.
pub type CreateHook<A> = Box<dyn FnMut(&mut A, &VNode<HostNode<A>>, &VNode<HostNode<A>>) -> HookResult>;
/// Args: adapter, old node, new node.
pub type UpdateHook<A> = Box<dyn FnMut(&mut A, &VNode<HostNode<A>>, &VNode<HostNode<A>>) -> HookResult>;
pub type DestroyHook<A> = Box<dyn FnMut(&mut A, &VNode<HostNode<A>>) -> HookResult>;
/// Returning `Pending` defers the detach until `Reconciler::finish_removal` is called with the token.
pub type RemoveHook<A> =
    Box<dyn FnMut(&mut A, &VNode<HostNode<A>>, RemovalToken) -> HookResult<RemovalProgress>>;

pub struct Module<A: DomApi> {
    name: String,
    consumes: Vec<&'static str>,
    pre: Option<PreHook<A>>,
    create: Option<CreateHook<A>>,
    update: Option<UpdateHook<A>>,
    remove: Option<RemoveHook<A>>,
    destroy: Option<DestroyHook<A>>,
    post: Option<PostHook<A>>,
}

impl<A: DomApi> fmt::Debug for Module<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("consumes", &self.consumes)
            .field("phases", &self.phases())
            .finish()
    }
}

impl<A: DomApi> Module<A> {
    pub fn new(name: impl Into<String>) -> Self {
        Module {
            name: name.into(),
            consumes: Vec::new(),
            pre: None,
            create: None,
            update: None,
            remove: None,
            destroy: None,
            post: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declare that this module reads the `E` payload of node property bags.
    pub fn consumes<E: Extension>(mut self) -> Self {
        self.consumes.push(E::NAME);
        self
    }

    /// Phases this module contributes to.
    pub fn phases(&self) -> Vec<Phase> {
        Phase::MODULE_PHASES
            .into_iter()
            .filter(|phase| match phase {
                Phase::Pre => self.pre.is_some(),
                Phase::Create => self.create.is_some(),
                Phase::Update => self.update.is_some(),
                Phase::Remove => self.remove.is_some(),
                Phase::Destroy => self.destroy.is_some(),
                Phase::Post => self.post.is_some(),
                _ => false,
            })
            .collect()
    }

    pub fn on_pre(mut self, f: impl FnMut(&mut A) -> HookResult + 'static) -> Self {
        self.pre = Some(Box::new(f));
        self
    }

    pub fn on_create(
        mut self,
        f: impl FnMut(&mut A, &VNode<HostNode<A>>, &VNode<HostNode<A>>) -> HookResult + 'static,
    ) -> Self {
        self.create = Some(Box::new(f));
        self
    }

    pub fn on_update(
        mut self,
        f: impl FnMut(&mut A, &VNode<HostNode<A>>, &VNode<HostNode<A>>) -> HookResult + 'static,
    ) -> Self {
        self.update = Some(Box::new(f));
        self
    }

    pub fn on_remove(
        mut self,
        f: impl FnMut(&mut A, &VNode<HostNode<A>>, RemovalToken) -> HookResult<RemovalProgress>
            + 'static,
    ) -> Self {
        self.remove = Some(Box::new(f));
        self
    }

    pub fn on_destroy(
        mut self,
        f: impl FnMut(&mut A, &VNode<HostNode<A>>) -> HookResult + 'static,
    ) -> Self {
        self.destroy = Some(Box::new(f));
        self
    }

    pub fn on_post(mut self, f: impl FnMut(&mut A) -> HookResult + 'static) -> Self {
        self.post = Some(Box::new(f));
        self
    }
}

struct Registered<H> {
    module: Rc<str>,
    hook: H,
}

pub struct HookRegistry<A: DomApi> {
    pre: Vec<Registered<PreHook<A>>>,
    create: Vec<Registered<CreateHook<A>>>,
    update: Vec<Registered<UpdateHook<A>>>,
    remove: Vec<Registered<RemoveHook<A>>>,
    destroy: Vec<Registered<DestroyHook<A>>>,
    post: Vec<Registered<PostHook<A>>>,
    capabilities: IndexSet<String>,
}

impl<A: DomApi> fmt::Debug for HookRegistry<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("pre", &self.len(Phase::Pre))
            .field("create", &self.len(Phase::Create))
            .field("update", &self.len(Phase::Update))
            .field("remove", &self.len(Phase::Remove))
            .field("destroy", &self.len(Phase::Destroy))
            .field("post", &self.len(Phase::Post))
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

impl<A: DomApi> HookRegistry<A> {
    pub fn new(modules: Vec<Module<A>>) -> Self {
        let mut registry = HookRegistry {
            pre: Vec::new(),
            create: Vec::new(),
            update: Vec::new(),
            remove: Vec::new(),
            destroy: Vec::new(),
            post: Vec::new(),
            capabilities: IndexSet::new(),
        };

        for module in modules {
            let name: Rc<str> = Rc::from(module.name.as_str());
            registry
                .capabilities
                .extend(module.consumes.iter().map(|c| c.to_string()));
            if let Some(hook) = module.pre {
                registry.pre.push(Registered { module: name.clone(), hook });
            }
            if let Some(hook) = module.create {
                registry.create.push(Registered { module: name.clone(), hook });
            }
            if let Some(hook) = module.update {
                registry.update.push(Registered { module: name.clone(), hook });
            }
            if let Some(hook) = module.remove {
                registry.remove.push(Registered { module: name.clone(), hook });
            }
            if let Some(hook) = module.destroy {
                registry.destroy.push(Registered { module: name.clone(), hook });
            }
            if let Some(hook) = module.post {
                registry.post.push(Registered { module: name, hook });
            }
        }
        registry
    }

    /// Number of callbacks registered for a module phase.
    pub fn len(&self, phase: Phase) -> usize {
        match phase {
            Phase::Pre => self.pre.len(),
            Phase::Create => self.create.len(),
            Phase::Update => self.update.len(),
            Phase::Remove => self.remove.len(),
            Phase::Destroy => self.destroy.len(),
            Phase::Post => self.post.len(),
            _ => 0,
        }
    }

    /// Whether some registered module consumes the named extension.
    pub fn consumes(&self, extension: &str) -> bool {
        self.capabilities.contains(extension)
    }

    pub(crate) fn run_pre(&mut self, api: &mut A) -> Result<()> {
        for entry in &mut self.pre {
            trace!("pre hook of '{}'", entry.module);
            (entry.hook)(&mut *api)
                .map_err(|e| ReconcilerError::module_hook(Phase::Pre, &entry.module, e))?;
        }
        Ok(())
    }

    pub(crate) fn run_create(
        &mut self,
        api: &mut A,
        empty: &VNode<HostNode<A>>,
        node: &VNode<HostNode<A>>,
    ) -> Result<()> {
        for entry in &mut self.create {
            (entry.hook)(&mut *api, empty, node)
                .map_err(|e| ReconcilerError::module_hook(Phase::Create, &entry.module, e))?;
        }
        Ok(())
    }

    pub(crate) fn run_update(
        &mut self,
        api: &mut A,
        old: &VNode<HostNode<A>>,
        new: &VNode<HostNode<A>>,
    ) -> Result<()> {
        for entry in &mut self.update {
            (entry.hook)(&mut *api, old, new)
                .map_err(|e| ReconcilerError::module_hook(Phase::Update, &entry.module, e))?;
        }
        Ok(())
    }

    pub(crate) fn run_destroy(&mut self, api: &mut A, node: &VNode<HostNode<A>>) -> Result<()> {
        for entry in &mut self.destroy {
            (entry.hook)(&mut *api, node)
                .map_err(|e| ReconcilerError::module_hook(Phase::Destroy, &entry.module, e))?;
        }
        Ok(())
    }

    /// Returns how many participants completed on the spot.
    pub(crate) fn run_remove(
        &mut self,
        api: &mut A,
        node: &VNode<HostNode<A>>,
        token: RemovalToken,
    ) -> Result<usize> {
        let mut completed = 0;
        for entry in &mut self.remove {
            let progress = (entry.hook)(&mut *api, node, token)
                .map_err(|e| ReconcilerError::module_hook(Phase::Remove, &entry.module, e))?;
            if progress == RemovalProgress::Complete {
                completed += 1;
            } else {
                trace!("'{}' deferred {}", entry.module, token);
            }
        }
        Ok(completed)
    }

    pub(crate) fn run_post(&mut self, api: &mut A) -> Result<()> {
        for entry in &mut self.post {
            trace!("post hook of '{}'", entry.module);
            (entry.hook)(&mut *api)
                .map_err(|e| ReconcilerError::module_hook(Phase::Post, &entry.module, e))?;
        }
        Ok(())
    }
}
