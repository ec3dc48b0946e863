//! Deferred removal bookkeeping.
//!
//! Every removal is a small state machine held in an arena: it waits for a
//! fixed number of participants to report completion, then detaches the host
//! node exactly once and leaves the arena.
use crate::dom::DomApi;
use crate::errors::{ReconcilerError, Result};
use crate::types::{next_removal_token, RemovalState, RemovalToken};
use indexmap::IndexMap;
use log::debug;

#[derive(Debug)]
struct PendingRemoval<N> {
    host: N,
    remaining: usize,
}

#[derive(Debug)]
pub(crate) struct Removals<N> {
    pending: IndexMap<RemovalToken, PendingRemoval<N>>,
}

impl<N> Default for Removals<N> {
    fn default() -> Self {
        Removals {
            pending: IndexMap::new(),
        }
    }
}

impl<N> Removals<N> {
    pub(crate) fn begin(&mut self, host: N, participants: usize) -> RemovalToken {
        let token = next_removal_token();
        self.pending.insert(
            token,
            PendingRemoval {
                host,
                remaining: participants,
            },
        );
        token
    }

    /// Drop a removal whose participants failed; the host node stays attached.
    pub(crate) fn cancel(&mut self, token: RemovalToken) {
        if self.pending.shift_remove(&token).is_some() {
            debug!("{token}: removal abandoned");
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn is_pending(&self, token: RemovalToken) -> bool {
        self.pending.contains_key(&token)
    }

    /// Count `completed` participants as done and detach once none remain.
    pub(crate) fn settle<A>(
        &mut self,
        api: &mut A,
        token: RemovalToken,
        completed: usize,
    ) -> Result<RemovalState>
    where
        A: DomApi<Node = N>,
    {
        let entry = self
            .pending
            .get_mut(&token)
            .ok_or(ReconcilerError::UnknownRemoval { token })?;
        entry.remaining = entry.remaining.saturating_sub(completed);
        if entry.remaining > 0 {
            return Ok(RemovalState::AwaitingParticipants(entry.remaining));
        }

        if let Some(done) = self.pending.shift_remove(&token) {
            match api.parent_node(&done.host) {
                Some(parent) => api.remove_child(&parent, &done.host)?,
                None => debug!("{token}: host node already detached"),
            }
        }
        Ok(RemovalState::Detached)
    }
}
