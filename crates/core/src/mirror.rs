//! Write-through persistence of in-memory state to a key-value store.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::{error::SnapshotError, store::KeyValueStore};

/// State that can be written to and restored from a fixed set of store keys.
pub trait Persisted: Sized {
    /// Keys making up one snapshot. Every write replaces all of them.
    const KEYS: &'static [&'static str];

    /// Serialize the full state, one JSON document per key.
    fn encode(&self) -> Result<Vec<(&'static str, String)>, SnapshotError>;

    /// Rebuild state from stored values, validating their shape.
    fn decode(values: &StoredValues) -> Result<Self, SnapshotError>;
}

/// Raw values read from the store for one snapshot.
#[derive(Debug, Default)]
pub struct StoredValues {
    values: HashMap<&'static str, String>,
}

impl StoredValues {
    /// Parse the value under `key`, returning `None` when it was not stored.
    pub fn parse<T: DeserializeOwned>(&self, key: &'static str) -> Result<Option<T>, SnapshotError> {
        self.values
            .get(key)
            .map(|raw| serde_json::from_str(raw))
            .transpose()
            .map_err(|source| SnapshotError::Malformed { key, source })
    }

    /// Whether no key of the snapshot was present.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn insert(&mut self, key: &'static str, value: String) {
        self.values.insert(key, value);
    }
}

/// How the mirror obtained its initial state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Nothing was stored; the fallback state is in use.
    Fresh,
    /// State was rebuilt from the stored snapshot.
    Restored,
    /// The stored snapshot was rejected; the fallback state is in use.
    Recovered {
        /// Why the snapshot was rejected.
        reason: String,
    },
}

/// Value returned by a mutation together with whether the snapshot was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applied<R> {
    /// What the mutation returned.
    pub value: R,
    /// Whether the store received a fresh snapshot.
    pub written: bool,
}

/// Owns a piece of state and keeps its snapshot in the store current.
pub struct Mirror<T, S> {
    state: T,
    store: S,
    outcome: RestoreOutcome,
}

impl<T, S> Mirror<T, S>
where
    T: Persisted,
    S: KeyValueStore,
{
    /// Load state from `store`, using `fallback` when nothing usable is stored.
    ///
    /// Unreadable or inconsistent snapshots are logged and replaced by the
    /// fallback; only store I/O failures are returned as errors.
    pub fn restore(store: S, fallback: T) -> Result<Self> {
        let mut values = StoredValues::default();
        for &key in T::KEYS {
            if let Some(raw) = store
                .get(key)
                .with_context(|| format!("failed to read '{key}' from store"))?
            {
                values.insert(key, raw);
            }
        }

        let (state, outcome) = if values.is_empty() {
            info!(keys = ?T::KEYS, "No stored snapshot; starting fresh");
            (fallback, RestoreOutcome::Fresh)
        } else {
            match T::decode(&values) {
                Ok(state) => {
                    info!(keys = ?T::KEYS, "Snapshot restored");
                    (state, RestoreOutcome::Restored)
                }
                Err(err) => {
                    warn!(keys = ?T::KEYS, error = %err, "Discarding stored snapshot");
                    (
                        fallback,
                        RestoreOutcome::Recovered {
                            reason: err.to_string(),
                        },
                    )
                }
            }
        };

        Ok(Self {
            state,
            store,
            outcome,
        })
    }

    /// Current state.
    pub fn state(&self) -> &T {
        &self.state
    }

    /// Backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// How the initial state was obtained.
    pub fn outcome(&self) -> &RestoreOutcome {
        &self.outcome
    }

    /// Apply a mutation and write the snapshot if it reports a change.
    ///
    /// The closure returns whether it changed the state. On a write failure
    /// the in-memory change is kept and the error is returned.
    pub fn update<F>(&mut self, mutate: F) -> Result<bool>
    where
        F: FnOnce(&mut T) -> bool,
    {
        if !mutate(&mut self.state) {
            return Ok(false);
        }
        self.flush()?;
        Ok(true)
    }

    /// Like [`Mirror::update`] for mutations returning richer outcomes.
    ///
    /// `changed` decides from the outcome whether the state must be written.
    pub fn update_with<F, R>(
        &mut self,
        mutate: F,
        changed: impl Fn(&R) -> bool,
    ) -> Result<Applied<R>>
    where
        F: FnOnce(&mut T) -> R,
    {
        let value = mutate(&mut self.state);
        let written = changed(&value);
        if written {
            self.flush()?;
        }
        Ok(Applied { value, written })
    }

    /// Write every key of the snapshot, replacing prior values.
    pub fn flush(&self) -> Result<()> {
        let entries = self.state.encode().context("failed to encode snapshot")?;
        for (key, value) in entries {
            self.store
                .set(key, &value)
                .with_context(|| format!("failed to write '{key}' to store"))?;
        }
        debug!(keys = ?T::KEYS, "Snapshot written");
        Ok(())
    }
}
