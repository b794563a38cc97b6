//! Named descriptor store that outlives a single plugin invocation.
//!
//! Plugins use the descriptor registry to remember settings. Each entry is a
//! value copy of a descriptor's contents, stored under a string key and
//! tagged as either:
//! - **persistent**: written to disk by the host and reloaded in later runs
//! - **session**: kept only for the lifetime of the host process
//!
//! At the start of a plugin invocation the host loads a [`RegistrySnapshot`]
//! holding both buckets; when the invocation ends it reads the snapshot back
//! and saves only the persistent bucket (see [`crate::persistence`]).

use crate::descriptor::DescriptorSuite;
use crate::error::{Result, SuiteError};
use crate::handle::Handle;
use crate::value::ScriptingParameters;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Stored contents of one registry key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Copy of the descriptor's values at registration time.
    pub values: ScriptingParameters,
    /// Whether the entry should survive a host restart.
    pub persistent: bool,
}

/// The registry split into its two buckets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    /// Entries saved across host sessions.
    #[serde(default)]
    pub persisted: BTreeMap<String, ScriptingParameters>,
    /// Entries valid for this host process only.
    #[serde(default)]
    pub session: BTreeMap<String, ScriptingParameters>,
}

impl RegistrySnapshot {
    /// Whether both buckets are empty.
    pub fn is_empty(&self) -> bool {
        self.persisted.is_empty() && self.session.is_empty()
    }
}

/// Live descriptor registry for one plugin invocation.
#[derive(Debug, Default)]
pub struct DescriptorRegistry {
    entries: HashMap<String, RegistryEntry>,
    /// Set when persisted data changed since load.
    dirty: bool,
}

impl DescriptorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge both buckets of `snapshot` into a fresh registry.
    ///
    /// A key defined in both buckets means the snapshot is corrupt: it is
    /// rejected with `BadParameter` rather than letting one bucket win.
    pub fn load(snapshot: RegistrySnapshot) -> Result<Self> {
        if let Some(key) = snapshot
            .session
            .keys()
            .find(|key| snapshot.persisted.contains_key(*key))
        {
            tracing::warn!(%key, "registry key defined in both persisted and session buckets");
            return Err(SuiteError::BadParameter("registry key defined twice"));
        }

        let persisted = snapshot.persisted.into_iter().map(|(key, values)| {
            (key, RegistryEntry { values, persistent: true })
        });
        let session = snapshot.session.into_iter().map(|(key, values)| {
            (key, RegistryEntry { values, persistent: false })
        });
        let entries: HashMap<_, _> = persisted.chain(session).collect();
        tracing::debug!(entries = entries.len(), "descriptor registry loaded");

        Ok(Self {
            entries,
            dirty: false,
        })
    }

    /// Store a copy of the descriptor's contents under `key`.
    ///
    /// Re-registering a key replaces the entry and its scope.
    pub fn register(
        &mut self,
        key: &str,
        descriptor: Handle,
        persistent: bool,
        descriptors: &DescriptorSuite,
    ) -> Result<()> {
        if key.is_empty() {
            return Err(SuiteError::BadParameter("empty registry key"));
        }
        let values = descriptors.parameters(descriptor)?.clone();
        let previous = self
            .entries
            .insert(key.to_owned(), RegistryEntry { values, persistent });
        if persistent || previous.is_some_and(|entry| entry.persistent) {
            self.dirty = true;
        }
        tracing::debug!(key, persistent, "descriptor registered");
        Ok(())
    }

    /// Remove `key` from whichever bucket holds it.
    pub fn erase(&mut self, key: &str) -> Result<()> {
        match self.entries.remove(key) {
            Some(entry) => {
                if entry.persistent {
                    self.dirty = true;
                }
                Ok(())
            }
            None => Err(SuiteError::MissingParameter),
        }
    }

    /// New descriptor holding the values stored under `key`, or the null
    /// handle when the key is absent.
    pub fn get(&self, key: &str, descriptors: &mut DescriptorSuite) -> Result<Handle> {
        match self.entries.get(key) {
            Some(entry) => descriptors.make_from(entry.values.clone()),
            None => Ok(Handle::NULL),
        }
    }

    /// The entry stored under `key`.
    pub fn entry(&self, key: &str) -> Option<&RegistryEntry> {
        self.entries.get(key)
    }

    /// Whether persisted data changed since load.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Mark the persisted data as saved.
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Number of entries across both buckets.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of the persistent bucket, for saving.
    pub fn persisted_snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            persisted: self
                .entries
                .iter()
                .filter(|(_, entry)| entry.persistent)
                .map(|(key, entry)| (key.clone(), entry.values.clone()))
                .collect(),
            session: BTreeMap::new(),
        }
    }

    /// Split the registry back into its two buckets.
    pub fn into_snapshot(self) -> RegistrySnapshot {
        let mut snapshot = RegistrySnapshot::default();
        for (key, entry) in self.entries {
            let bucket = if entry.persistent {
                &mut snapshot.persisted
            } else {
                &mut snapshot.session
            };
            bucket.insert(key, entry.values);
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::fourcc;

    const OPACITY: u32 = fourcc(b"Opct");

    fn descriptor_with(descriptors: &mut DescriptorSuite, value: i32) -> Handle {
        let d = descriptors.make().unwrap();
        descriptors.put_integer(d, OPACITY, value).unwrap();
        d
    }

    #[test]
    fn test_get_returns_value_copy() {
        let mut descriptors = DescriptorSuite::default();
        let mut registry = DescriptorRegistry::new();
        let d = descriptor_with(&mut descriptors, 50);

        registry.register("opacity", d, true, &descriptors).unwrap();
        descriptors.put_integer(d, OPACITY, 75).unwrap();
        descriptors.free(d).unwrap();

        let fetched = registry.get("opacity", &mut descriptors).unwrap();
        assert_eq!(descriptors.get_integer(fetched, OPACITY).unwrap(), 50);
        assert_eq!(descriptors.get_count(fetched).unwrap(), 1);
    }

    #[test]
    fn test_absent_key_is_null() {
        let mut descriptors = DescriptorSuite::default();
        let registry = DescriptorRegistry::new();
        assert!(registry.get("missing", &mut descriptors).unwrap().is_null());
    }

    #[test]
    fn test_dirty_tracks_persistent_changes() {
        let mut descriptors = DescriptorSuite::default();
        let mut registry = DescriptorRegistry::new();
        let d = descriptor_with(&mut descriptors, 1);

        registry.register("session-only", d, false, &descriptors).unwrap();
        assert!(!registry.is_dirty());
        registry.register("kept", d, true, &descriptors).unwrap();
        assert!(registry.is_dirty());

        registry.clear_dirty();
        registry.erase("session-only").unwrap();
        assert!(!registry.is_dirty());
        registry.erase("kept").unwrap();
        assert!(registry.is_dirty());
        assert_eq!(registry.erase("kept"), Err(SuiteError::MissingParameter));
    }

    #[test]
    fn test_snapshot_splits_buckets() {
        let mut descriptors = DescriptorSuite::default();
        let mut registry = DescriptorRegistry::new();
        let d = descriptor_with(&mut descriptors, 1);
        registry.register("a", d, true, &descriptors).unwrap();
        registry.register("b", d, false, &descriptors).unwrap();

        let persisted = registry.persisted_snapshot();
        assert_eq!(persisted.persisted.len(), 1);
        assert!(persisted.session.is_empty());

        let snapshot = registry.into_snapshot();
        assert!(snapshot.persisted.contains_key("a"));
        assert!(snapshot.session.contains_key("b"));

        let reloaded = DescriptorRegistry::load(snapshot).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.entry("a").unwrap().persistent);
        assert!(!reloaded.entry("b").unwrap().persistent);
        assert!(!reloaded.is_dirty());
    }

    #[test]
    fn test_load_rejects_duplicate_key() {
        let mut snapshot = RegistrySnapshot::default();
        snapshot.persisted.insert("dup".into(), ScriptingParameters::new());
        snapshot.session.insert("dup".into(), ScriptingParameters::new());
        assert!(matches!(
            DescriptorRegistry::load(snapshot),
            Err(SuiteError::BadParameter(_))
        ));
    }

    #[test]
    fn test_register_rejects_unknown_descriptor() {
        let descriptors = DescriptorSuite::default();
        let mut registry = DescriptorRegistry::new();
        assert!(registry
            .register("x", Handle::from_raw(3), true, &descriptors)
            .is_err());
        assert!(registry.is_empty());
        assert!(!registry.is_dirty());
    }

    #[test]
    fn test_reregister_moves_scope() {
        let mut descriptors = DescriptorSuite::default();
        let mut registry = DescriptorRegistry::new();
        let d = descriptor_with(&mut descriptors, 1);
        registry.register("k", d, true, &descriptors).unwrap();
        registry.clear_dirty();
        registry.register("k", d, false, &descriptors).unwrap();
        assert!(registry.is_dirty());
        assert!(registry.persisted_snapshot().persisted.is_empty());
    }
}
