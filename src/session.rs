//! Session state and its persistence under fixed storage keys.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::storage::{KeyValueStore, Result};

/// Storage key for the JSON array of studied ticket indices.
pub const STUDIED_KEY: &str = "studiedTickets";
/// Storage key for the current position, stored as a decimal string.
pub const INDEX_KEY: &str = "currentIndex";

/// Where the user is and what they have already looked at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub current_index: usize,
    /// Indices flipped at least once. Only grows during a run.
    pub studied: BTreeSet<usize>,
}

/// Reads and writes [`SessionState`] through a [`KeyValueStore`].
#[derive(Debug)]
pub struct SessionStore<S> {
    store: S,
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Restores the state saved for a deck of `ticket_count` tickets.
    ///
    /// Never fails: unreadable values fall back to defaults. An index outside
    /// `0..ticket_count` becomes 0 and studied indices past the end are dropped.
    pub fn load(&self, ticket_count: usize) -> SessionState {
        let studied = match self.store.get(STUDIED_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<usize>>(&raw) {
                Ok(list) => list.into_iter().filter(|&i| i < ticket_count).collect(),
                Err(e) => {
                    warn!(error = %e, "ignoring unreadable {STUDIED_KEY}");
                    BTreeSet::new()
                }
            },
            Ok(None) => BTreeSet::new(),
            Err(e) => {
                warn!(error = %e, "failed to read {STUDIED_KEY}");
                BTreeSet::new()
            }
        };

        let current_index = match self.store.get(INDEX_KEY) {
            Ok(Some(raw)) => match raw.trim().parse::<usize>() {
                Ok(i) if i < ticket_count => i,
                Ok(i) => {
                    debug!(stored = i, ticket_count, "stored index out of range, resetting");
                    0
                }
                Err(_) => {
                    warn!(value = %raw, "ignoring unreadable {INDEX_KEY}");
                    0
                }
            },
            Ok(None) => 0,
            Err(e) => {
                warn!(error = %e, "failed to read {INDEX_KEY}");
                0
            }
        };

        SessionState {
            current_index,
            studied,
        }
    }

    pub fn save_index(&mut self, index: usize) -> Result<()> {
        self.store.set(INDEX_KEY, &index.to_string())
    }

    pub fn save_studied(&mut self, studied: &BTreeSet<usize>) -> Result<()> {
        let list: Vec<usize> = studied.iter().copied().collect();
        self.store.set(STUDIED_KEY, &serde_json::to_string(&list)?)
    }

    /// Forgets all saved progress.
    pub fn clear(&mut self) -> Result<()> {
        self.store.remove(STUDIED_KEY)?;
        self.store.remove(INDEX_KEY)
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
