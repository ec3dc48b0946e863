//! Reconciler configuration, loadable from JSON
use crate::errors::ReconcilerError;
use serde::{Deserialize, Serialize};

/// What to do when sibling keys collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKeys {
    /// The first old sibling carrying a key is matched; later duplicates are treated as new.
    #[default]
    FirstWins,
    /// Any children list with a repeated key fails the pass.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    pub duplicate_keys: DuplicateKeys,
    /// Children of this tag do not inherit their parent's namespace.
    pub foreign_object_tag: String,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        ReconcilerConfig {
            duplicate_keys: DuplicateKeys::FirstWins,
            foreign_object_tag: "foreignObject".to_string(),
        }
    }
}

impl ReconcilerConfig {
    pub fn from_json(json: &str) -> Result<Self, ReconcilerError> {
        Ok(serde_json::from_str(json)?)
    }
}
