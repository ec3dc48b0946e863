//! Small value types shared by the node model, the hook registry and the diff engine
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Sibling identity used by the keyed children diff.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    Int(i64),
    Str(String),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(n) => write!(f, "{n}"),
            Key::Str(s) => write!(f, "'{s}'"),
        }
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Str(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Str(value)
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Int(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Int(i64::from(value))
    }
}

impl From<u32> for Key {
    fn from(value: u32) -> Self {
        Key::Int(i64::from(value))
    }
}

/// Selector of a comment node.
pub const COMMENT_SELECTOR: &str = "!";

/// A selector split into the pieces the host element is built from.
///
/// Parsing is deliberately lenient: the id is only recognised after the tag,
/// classes only after the id. Anything that does not fit ends up in `tag` and
/// is rejected by the adapter when the element is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorParts {
    pub tag: String,
    pub id: Option<String>,
    /// Space separated class list.
    pub class: Option<String>,
}

impl SelectorParts {
    pub fn parse(sel: &str) -> Self {
        let hash_idx = sel.find('#');
        let dot_from = hash_idx.unwrap_or(0);
        let dot_idx = sel[dot_from..].find('.').map(|i| i + dot_from);

        let hash = hash_idx.filter(|&i| i > 0).unwrap_or(sel.len());
        let dot = dot_idx.filter(|&i| i > 0).unwrap_or(sel.len());

        let tag = if hash_idx.is_some() || dot_idx.is_some() {
            &sel[..hash.min(dot)]
        } else {
            sel
        };
        let id = (hash < dot).then(|| sel[hash + 1..dot].to_string());
        let class = dot_idx
            .filter(|&i| i > 0)
            .map(|_| sel[dot + 1..].replace('.', " "));

        SelectorParts {
            tag: tag.to_string(),
            id,
            class,
        }
    }

    /// Rebuild a selector from what a live host element reports.
    pub fn from_host(tag: &str, id: Option<&str>, class: Option<&str>) -> String {
        let mut sel = tag.to_lowercase();
        if let Some(id) = id.filter(|id| !id.is_empty()) {
            sel.push('#');
            sel.push_str(id);
        }
        if let Some(class) = class.filter(|c| !c.is_empty()) {
            sel.push('.');
            sel.push_str(&class.split_whitespace().collect::<Vec<_>>().join("."));
        }
        sel
    }
}

/// Lifecycle phases. The first six are contributed by modules, the rest only
/// exist as node-level hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Pre,
    Create,
    Update,
    Remove,
    Destroy,
    Post,
    Init,
    Insert,
    Prepatch,
    Postpatch,
}

impl Phase {
    pub const MODULE_PHASES: [Phase; 6] = [
        Phase::Create,
        Phase::Update,
        Phase::Remove,
        Phase::Destroy,
        Phase::Pre,
        Phase::Post,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Pre => "pre",
            Phase::Create => "create",
            Phase::Update => "update",
            Phase::Remove => "remove",
            Phase::Destroy => "destroy",
            Phase::Post => "post",
            Phase::Init => "init",
            Phase::Insert => "insert",
            Phase::Prepatch => "prepatch",
            Phase::Postpatch => "postpatch",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle for one deferred removal. Unique across all reconcilers in the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RemovalToken(u64);

impl RemovalToken {
    pub fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RemovalToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "removal #{}", self.0)
    }
}

/// Global removal token generator (lock-free, atomic)
static REMOVAL_COUNTER: Lazy<AtomicU64> = Lazy::new(|| AtomicU64::new(1));

pub(crate) fn next_removal_token() -> RemovalToken {
    RemovalToken(REMOVAL_COUNTER.fetch_add(1, Ordering::SeqCst))
}

/// What a `remove` participant reports back when it is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalProgress {
    /// Done; the participant will not call back.
    Complete,
    /// The participant keeps the token and calls `Reconciler::finish_removal` later.
    Pending,
}

/// State of one removal after a participant reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalState {
    AwaitingParticipants(usize),
    Detached,
}
