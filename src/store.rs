//! Bookmark trust store
//!
//! Persistent registry of paired devices, keyed by a stable integer index
//! and by the device fingerprint. Every mutation is written through to the
//! snapshot on disk before it becomes visible in memory, so a crash right
//! after a successful pairing never loses the bookmark and a failed write
//! never leaves memory and disk disagreeing.
//!
//! ## Index assignment
//!
//! Indices grow monotonically and are never reused, even after deletion.
//! A reused index could silently point an old bookmark handle at a
//! different device.
//!
//! ## Concurrency
//!
//! The store is the only shared-mutation point between concurrent
//! sessions. Mutations are serialized behind a write lock for the whole
//! read-modify-flush cycle; lookups take a read lock and always see a
//! consistent snapshot.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{PersistError, StoreError};
use crate::identity::{DeviceIdentity, Fingerprint};

/// Durable snapshot layout
#[derive(Debug, Default, Serialize, Deserialize)]
struct StateDoc {
    #[serde(rename = "nextIndex", default)]
    next_index: u32,
    #[serde(default)]
    devices: Vec<DeviceIdentity>,
}

#[derive(Debug, Default)]
struct Inner {
    next_index: u32,
    devices: BTreeMap<u32, DeviceIdentity>,
}

/// Persistent registry of paired devices
pub struct TrustStore {
    state_path: PathBuf,
    inner: RwLock<Inner>,
}

impl TrustStore {
    /// Load the store from its snapshot file.
    ///
    /// A missing file starts an empty store. A corrupt or unreadable file
    /// also starts an empty store, with a warning: a broken snapshot must
    /// never prevent re-pairing.
    pub fn load(state_path: impl Into<PathBuf>) -> Self {
        let state_path = state_path.into();

        let inner = match fs::read_to_string(&state_path) {
            Ok(contents) => match serde_json::from_str::<StateDoc>(&contents) {
                Ok(doc) => {
                    let inner = Inner::from_doc(doc);
                    info!(
                        "loaded {} bookmarked devices from {:?}",
                        inner.devices.len(),
                        state_path
                    );
                    inner
                }
                Err(e) => {
                    warn!(
                        "state file {:?} is not valid, no paired devices were loaded from it: {}",
                        state_path, e
                    );
                    Inner::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no state file at {:?} yet", state_path);
                Inner::default()
            }
            Err(e) => {
                warn!("could not read state file {:?}: {}", state_path, e);
                Inner::default()
            }
        };

        Self {
            state_path,
            inner: RwLock::new(inner),
        }
    }

    /// Add a new bookmark and return its assigned index.
    ///
    /// Fails with [`StoreError::DuplicateFingerprint`] when the fingerprint
    /// is already bookmarked; the same device must never occupy two
    /// indices. A duplicate `(product_id, device_id)` pair is allowed
    /// (names are not the identity key) but logged.
    pub fn add(&self, mut identity: DeviceIdentity) -> Result<u32, StoreError> {
        let mut inner = self.write();

        if let Some(existing) = inner
            .devices
            .values()
            .find(|d| d.fingerprint == identity.fingerprint)
        {
            return Err(StoreError::DuplicateFingerprint {
                index: existing.index,
            });
        }
        if inner
            .devices
            .values()
            .any(|d| d.product_id == identity.product_id && d.device_id == identity.device_id)
        {
            warn!(
                "a bookmark for {}.{} already exists with a different fingerprint",
                identity.product_id, identity.device_id
            );
        }

        let index = inner.next_index;
        identity.index = index;

        let mut devices = inner.devices.clone();
        devices.insert(index, identity);
        Self::persist(&self.state_path, index + 1, &devices)?;

        inner.devices = devices;
        inner.next_index = index + 1;
        info!(index, "added device bookmark");
        Ok(index)
    }

    /// Overwrite the bookmark at `index`, keeping the index stable.
    /// Used when re-pairing with an already-bookmarked device.
    pub fn update(&self, index: u32, mut identity: DeviceIdentity) -> Result<(), StoreError> {
        let mut inner = self.write();

        if !inner.devices.contains_key(&index) {
            return Err(StoreError::NotFound(index));
        }
        if let Some(existing) = inner
            .devices
            .values()
            .find(|d| d.fingerprint == identity.fingerprint && d.index != index)
        {
            return Err(StoreError::DuplicateFingerprint {
                index: existing.index,
            });
        }

        identity.index = index;
        let mut devices = inner.devices.clone();
        devices.insert(index, identity);
        Self::persist(&self.state_path, inner.next_index, &devices)?;

        inner.devices = devices;
        debug!(index, "updated device bookmark");
        Ok(())
    }

    /// Set the friendly name of the bookmark at `index`.
    pub fn rename(&self, index: u32, friendly_name: impl Into<String>) -> Result<(), StoreError> {
        let mut inner = self.write();

        let mut devices = inner.devices.clone();
        let device = devices
            .get_mut(&index)
            .ok_or(StoreError::NotFound(index))?;
        device.friendly_name = Some(friendly_name.into());
        Self::persist(&self.state_path, inner.next_index, &devices)?;

        inner.devices = devices;
        Ok(())
    }

    /// Remove the bookmark at `index`.
    pub fn delete(&self, index: u32) -> Result<(), StoreError> {
        let mut inner = self.write();

        if !inner.devices.contains_key(&index) {
            return Err(StoreError::NotFound(index));
        }

        let mut devices = inner.devices.clone();
        devices.remove(&index);
        Self::persist(&self.state_path, inner.next_index, &devices)?;

        inner.devices = devices;
        info!(index, "deleted device bookmark");
        Ok(())
    }

    /// Look up a bookmark by its index.
    pub fn get_by_index(&self, index: u32) -> Option<DeviceIdentity> {
        self.read().devices.get(&index).cloned()
    }

    /// Look up a bookmark by device fingerprint. This is the authoritative
    /// "have we met this key before" check after a fresh connection.
    pub fn get_by_fingerprint(&self, fingerprint: &Fingerprint) -> Option<DeviceIdentity> {
        self.read()
            .devices
            .values()
            .find(|d| &d.fingerprint == fingerprint)
            .cloned()
    }

    /// All bookmarks, ordered by index ascending.
    pub fn list_all(&self) -> Vec<DeviceIdentity> {
        self.read().devices.values().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.read().devices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.read().devices.len()
    }

    /// Write the current snapshot to disk. Every mutating operation flushes
    /// on its own; this is for callers that want an explicit commit point.
    pub fn flush(&self) -> Result<(), PersistError> {
        let inner = self.read();
        Self::persist(&self.state_path, inner.next_index, &inner.devices)
    }

    /// Whole-document durable write: serialize everything, write a
    /// temporary file, rename it into place.
    fn persist(
        path: &Path,
        next_index: u32,
        devices: &BTreeMap<u32, DeviceIdentity>,
    ) -> Result<(), PersistError> {
        let doc = StateDoc {
            next_index,
            devices: devices.values().cloned().collect(),
        };
        let json = serde_json::to_string_pretty(&doc)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        debug!("wrote trust store snapshot to {:?}", path);
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Inner {
    fn from_doc(doc: StateDoc) -> Self {
        let mut devices = BTreeMap::new();
        for mut device in doc.devices {
            // Older snapshots carried no per-record index; reassign
            // positionally past the highest index seen so far.
            if devices.contains_key(&device.index) {
                device.index = devices
                    .keys()
                    .next_back()
                    .map(|highest| highest + 1)
                    .unwrap_or(0);
            }
            devices.insert(device.index, device);
        }
        let past_end = devices
            .keys()
            .next_back()
            .map(|highest| highest + 1)
            .unwrap_or(0);
        Self {
            next_index: doc.next_index.max(past_end),
            devices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn identity(tag: &str, fingerprint: &str) -> DeviceIdentity {
        DeviceIdentity::new(
            format!("pr-{tag}"),
            format!("de-{tag}"),
            Fingerprint::parse(fingerprint).unwrap(),
            format!("sct-{tag}"),
        )
    }

    fn store_in(temp: &TempDir) -> TrustStore {
        TrustStore::load(temp.path().join("state").join("bookmarks.json"))
    }

    #[test]
    fn test_add_assigns_sequential_indices() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        assert_eq!(store.add(identity("a", "aa")).unwrap(), 0);
        assert_eq!(store.add(identity("b", "bb")).unwrap(), 1);
        assert_eq!(store.add(identity("c", "cc")).unwrap(), 2);
    }

    #[test]
    fn test_indices_are_never_reused() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        store.add(identity("a", "aa")).unwrap();
        let second = store.add(identity("b", "bb")).unwrap();
        let third = store.add(identity("c", "cc")).unwrap();

        store.delete(second).unwrap();
        let fourth = store.add(identity("d", "dd")).unwrap();
        assert!(fourth > third);
        assert_eq!(fourth, 3);
    }

    #[test]
    fn test_delete_does_not_perturb_others() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        let a = store.add(identity("a", "aa")).unwrap();
        let b = store.add(identity("b", "bb")).unwrap();
        let c = store.add(identity("c", "cc")).unwrap();

        let original_a = store.get_by_index(a).unwrap();
        let original_c = store.get_by_index(c).unwrap();

        store.delete(b).unwrap();

        assert_eq!(store.get_by_index(a).unwrap(), original_a);
        assert_eq!(store.get_by_index(c).unwrap(), original_c);
        assert!(store.get_by_index(b).is_none());
    }

    #[test]
    fn test_get_by_fingerprint() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        store.add(identity("a", "aa")).unwrap();

        let found = store
            .get_by_fingerprint(&Fingerprint::parse("aa").unwrap())
            .unwrap();
        assert_eq!(found.product_id, "pr-a");
        assert!(store
            .get_by_fingerprint(&Fingerprint::parse("bb").unwrap())
            .is_none());
    }

    #[test]
    fn test_duplicate_fingerprint_rejected() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        let first = store.add(identity("a", "aa")).unwrap();
        let result = store.add(identity("b", "aa"));
        assert!(matches!(
            result,
            Err(StoreError::DuplicateFingerprint { index }) if index == first
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_update_keeps_index() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        let index = store.add(identity("a", "aa")).unwrap();
        store.update(index, identity("a2", "a2a2")).unwrap();

        let updated = store.get_by_index(index).unwrap();
        assert_eq!(updated.index, index);
        assert_eq!(updated.product_id, "pr-a2");

        assert!(matches!(
            store.update(99, identity("x", "ee")),
            Err(StoreError::NotFound(99))
        ));
    }

    #[test]
    fn test_rename() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        let index = store.add(identity("a", "aa")).unwrap();
        store.rename(index, "Living Room Camera").unwrap();
        assert_eq!(
            store.get_by_index(index).unwrap().friendly_name.as_deref(),
            Some("Living Room Camera")
        );
    }

    #[test]
    fn test_lifecycle_end_to_end() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        store.add(identity("a", "f1")).unwrap();
        let all = store.list_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].index, 0);

        store.delete(0).unwrap();
        assert!(store.list_all().is_empty());
        assert!(store.get_by_index(0).is_none());
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bookmarks.json");

        let original = {
            let store = TrustStore::load(&path);
            store.add(identity("a", "aa")).unwrap();
            store.add(identity("b", "bb")).unwrap();
            store.delete(0).unwrap();
            store.add(identity("c", "cc")).unwrap();
            store.list_all()
        };

        let reloaded = TrustStore::load(&path);
        assert_eq!(reloaded.list_all(), original);
        // index monotonicity survives the reload
        assert_eq!(reloaded.add(identity("d", "dd")).unwrap(), 3);
    }

    #[test]
    fn test_corrupt_snapshot_starts_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bookmarks.json");
        fs::write(&path, "{ not json").unwrap();

        let store = TrustStore::load(&path);
        assert!(store.is_empty());
        // re-pairing is still possible
        assert_eq!(store.add(identity("a", "aa")).unwrap(), 0);
    }

    #[test]
    fn test_legacy_snapshot_without_indices() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bookmarks.json");
        fs::write(
            &path,
            r#"{"devices":[
                {"ProductId":"pr-a","DeviceId":"de-a","DeviceFingerprint":"aa","Sct":"s1"},
                {"ProductId":"pr-b","DeviceId":"de-b","DeviceFingerprint":"bb","Sct":"s2"}
            ]}"#,
        )
        .unwrap();

        let store = TrustStore::load(&path);
        let all = store.list_all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].index, 0);
        assert_eq!(all[1].index, 1);
        assert_eq!(store.add(identity("c", "cc")).unwrap(), 2);
    }

    #[test]
    fn test_failed_flush_rolls_back() {
        let temp = TempDir::new().unwrap();
        // the state path is an existing directory, so the final rename
        // cannot succeed
        let path = temp.path().join("bookmarks.json");
        fs::create_dir_all(&path).unwrap();

        let store = TrustStore::load(&path);
        let result = store.add(identity("a", "aa"));
        assert!(matches!(result, Err(StoreError::Persist(_))));

        // the in-memory state was not mutated
        assert!(store.is_empty());
        assert!(store.get_by_index(0).is_none());
    }
}
