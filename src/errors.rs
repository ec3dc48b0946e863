// /src/errors.rs
//! Error types for a reconciliation pass. Nothing in the core panics; every
//! failure surfaces as a `ReconcilerError` returned from `patch`.
use crate::types::{Key, Phase, RemovalToken};
use thiserror::Error;

/// Error returned by a lifecycle hook. Any error aborts the pass.
pub type HookError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result of a lifecycle hook.
pub type HookResult<T = ()> = Result<T, HookError>;

pub type Result<T, E = ReconcilerError> = std::result::Result<T, E>;

/// Failures reported by a renderer adapter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("invalid tag name '{tag}'")]
    InvalidTagName { tag: String },

    #[error("invalid attribute name '{name}'")]
    InvalidAttributeName { name: String },

    #[error("unknown host node {node}")]
    UnknownNode { node: String },

    #[error("host node {child} is not a child of {parent}")]
    NotAChild { parent: String, child: String },

    #[error("host node {node} cannot have children")]
    NotAContainer { node: String },

    #[error("host node {node} is not an element")]
    NotAnElement { node: String },

    #[error("inserting {node} into {parent} would create a cycle")]
    Cycle { parent: String, node: String },
}

#[derive(Error, Debug)]
pub enum ReconcilerError {
    #[error("renderer adapter error: {0}")]
    Dom(#[from] DomError),

    #[error("{phase} hook of module '{module}' failed: {source}")]
    ModuleHook {
        phase: Phase,
        module: String,
        #[source]
        source: HookError,
    },

    #[error("node-level {phase} hook failed: {source}")]
    NodeHook {
        phase: Phase,
        #[source]
        source: HookError,
    },

    #[error("node '{selector}' has no host reference")]
    MissingHostRef { selector: String },

    #[error("cannot patch '{old}' in place with '{new}'")]
    ShapeMismatch { old: String, new: String },

    #[error("duplicate sibling key {key}")]
    DuplicateKey { key: Key },

    #[error("no pending removal for {token}")]
    UnknownRemoval { token: RemovalToken },

    #[error("path {path:?} does not resolve to a node")]
    InvalidPath { path: Vec<usize> },

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl ReconcilerError {
    pub(crate) fn module_hook(phase: Phase, module: &str, source: HookError) -> Self {
        ReconcilerError::ModuleHook {
            phase,
            module: module.to_string(),
            source,
        }
    }

    pub(crate) fn node_hook(phase: Phase, source: HookError) -> Self {
        ReconcilerError::NodeHook { phase, source }
    }
}
