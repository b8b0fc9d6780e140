use anyhow::anyhow;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::utils::clock::Clock;

use super::{
    entities::{Entry, EntryDraft, EntryPatch},
    storage::KeyValueStorage,
};

/// Key the whole store is persisted under.
pub const STORE_KEY: &str = "mindtrack-store";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Entries haven't been loaded from storage yet")]
    NotReady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStatus {
    /// Nothing has been loaded. An empty store in this state says nothing about saved history.
    Unready,
    Ready,
}

/// How loading the persisted state went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rehydration {
    /// Nothing was stored before.
    Fresh,
    Loaded { entries: usize },
    /// Stored data couldn't be read and the store started empty.
    Recovered { reason: String },
    /// The store was already loaded, nothing happened.
    AlreadyReady,
}

/// Source of entry identifiers.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Layout of the persisted record.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedState {
    /// Newest first.
    #[serde(default)]
    entries: Vec<Entry>,
    #[serde(default, deserialize_with = "draft_or_default")]
    current_entry: EntryDraft,
}

/// An unreadable draft is dropped on its own so it can't take saved entries down with it.
fn draft_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<EntryDraft, D::Error> {
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(raw).unwrap_or_else(|e| {
        warn!("Stored current entry is corrupted, discarding it: {e}");
        EntryDraft::default()
    }))
}

/// Owns saved entries and the draft that is being filled in. Every change is written to
/// [KeyValueStorage], but the in-memory state stays authoritative when writing fails.
///
/// The store starts [StoreStatus::Unready] and refuses any access until
/// [EntryStore::rehydrate] is called. This way an empty default can never overwrite history that
/// simply hasn't been loaded yet.
pub struct EntryStore<S: KeyValueStorage> {
    storage: S,
    ids: Box<dyn IdGenerator>,
    clock: Box<dyn Clock>,
    state: Option<PersistedState>,
    persistence_error: Option<anyhow::Error>,
}

impl<S: KeyValueStorage> EntryStore<S> {
    pub fn new(storage: S, ids: Box<dyn IdGenerator>, clock: Box<dyn Clock>) -> Self {
        Self {
            storage,
            ids,
            clock,
            state: None,
            persistence_error: None,
        }
    }

    pub fn status(&self) -> StoreStatus {
        if self.state.is_some() {
            StoreStatus::Ready
        } else {
            StoreStatus::Unready
        }
    }

    /// Loads persisted state. Never fails: unreadable data is logged and replaced with an empty
    /// store, which is ready afterwards either way.
    pub async fn rehydrate(&mut self) -> Rehydration {
        if self.state.is_some() {
            debug!("Store is already loaded");
            return Rehydration::AlreadyReady;
        }

        let (state, rehydration) = match self.storage.get(STORE_KEY).await {
            Ok(None) => (PersistedState::default(), Rehydration::Fresh),
            Ok(Some(raw)) => match serde_json::from_str::<PersistedState>(&raw) {
                Ok(state) => {
                    let entries = state.entries.len();
                    (state, Rehydration::Loaded { entries })
                }
                Err(e) => {
                    warn!("Stored entries are corrupted, starting empty: {e}");
                    (
                        PersistedState::default(),
                        Rehydration::Recovered {
                            reason: format!("stored entries are corrupted: {e}"),
                        },
                    )
                }
            },
            Err(e) => {
                error!("Failed to read stored entries, starting empty: {e:?}");
                (
                    PersistedState::default(),
                    Rehydration::Recovered {
                        reason: format!("stored entries couldn't be read: {e}"),
                    },
                )
            }
        };

        info!("Store is ready {rehydration:?}");
        self.state = Some(state);
        rehydration
    }

    /// Saved entries, newest first.
    pub fn entries(&self) -> Result<&[Entry], StoreError> {
        Ok(&self.ready()?.entries)
    }

    pub fn current_entry(&self) -> Result<&EntryDraft, StoreError> {
        Ok(&self.ready()?.current_entry)
    }

    /// Shallow merges the patch into the draft. See [EntryDraft::merge].
    pub async fn update_current_entry(&mut self, patch: EntryPatch) -> Result<(), StoreError> {
        debug!("Updating current entry {patch:?}");
        self.ready_mut()?.current_entry.merge(patch);
        self.persist().await;
        Ok(())
    }

    /// Finalizes the given fields into a new entry at the head of the history and clears the
    /// draft. Checking that there is anything worth saving is up to the caller.
    pub async fn add_entry(&mut self, fields: EntryDraft) -> Result<Entry, StoreError> {
        let now = self.clock.time();
        let state = self.state.as_mut().ok_or(StoreError::NotReady)?;

        let mut id = self.ids.generate();
        while state.entries.iter().any(|entry| entry.id == id) {
            warn!("Generated duplicate entry id {id}, retrying");
            id = self.ids.generate();
        }
        // Saving order is preserved even if the wall clock moves backwards
        let timestamp = state
            .entries
            .first()
            .map_or(now, |newest| newest.timestamp.max(now));

        let entry = Entry {
            id,
            timestamp,
            fields,
        };
        state.entries.insert(0, entry.clone());
        state.current_entry = EntryDraft::default();
        info!("Added entry {}", entry.id);

        self.persist().await;
        Ok(entry)
    }

    /// Discards unsaved changes of the draft.
    pub async fn reset_current_entry(&mut self) -> Result<(), StoreError> {
        self.ready_mut()?.current_entry = EntryDraft::default();
        self.persist().await;
        Ok(())
    }

    /// Removes every saved entry. There is no way back.
    pub async fn clear_entries(&mut self) -> Result<usize, StoreError> {
        let removed = std::mem::take(&mut self.ready_mut()?.entries).len();
        info!("Cleared {removed} entries");
        self.persist().await;
        Ok(removed)
    }

    /// Returns the last error that happened while writing to storage, if any.
    pub fn take_persistence_error(&mut self) -> Option<anyhow::Error> {
        self.persistence_error.take()
    }

    fn ready(&self) -> Result<&PersistedState, StoreError> {
        self.state.as_ref().ok_or(StoreError::NotReady)
    }

    fn ready_mut(&mut self) -> Result<&mut PersistedState, StoreError> {
        self.state.as_mut().ok_or(StoreError::NotReady)
    }

    async fn persist(&mut self) {
        let Some(state) = self.state.as_ref() else {
            return;
        };
        let result = match serde_json::to_string(state) {
            Ok(raw) => self.storage.set(STORE_KEY, raw).await,
            Err(e) => Err(anyhow!(e)),
        };
        if let Err(e) = result {
            error!("Failed to persist entries, keeping them in memory only {e:?}");
            self.persistence_error = Some(e);
        }
    }
}
