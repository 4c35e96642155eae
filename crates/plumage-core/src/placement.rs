//! Placement persistence over a string key-value store
//!
//! Records are written as versioned JSON:
//!
//! ```json
//! {"version":1,"position":{"x":0,"y":0.2,"z":-0.05},
//!  "rotation":{"x":0,"y":3.14159,"z":0},"scale":{"x":1,"y":1,"z":1},
//!  "savedAt":"2025-01-01T00:00:00Z"}
//! ```
//!
//! Reading also accepts two older unversioned shapes: vectors as objects with
//! a scalar scale allowed, and the immersive room's
//! `{"position":[x,y,z],"rotationY":r,"scale":s}`.

use chrono::{DateTime, Utc};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::transform::Placement;

/// Current on-disk record version
pub const RECORD_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum PlacementError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Malformed placement under {key}: {reason}")]
    Malformed { key: String, reason: String },
}

/// Synchronous string-keyed, string-valued store (browser `localStorage`,
/// a JSON file, or memory)
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// Volatile store, used in tests and when no persistent backend exists
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Store persisted as a single JSON object in a file.
///
/// Every write rewrites the whole file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    entries: HashMap<String, String>,
}

impl FileStore {
    /// Open the store at `path`, starting empty if the file doesn't exist
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            HashMap::new()
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Undo an in-memory change whose write failed, so memory matches disk
    fn restore(&mut self, key: &str, previous: Option<String>) {
        match previous {
            Some(value) => self.entries.insert(key.to_string(), value),
            None => self.entries.remove(key),
        };
    }

    fn flush(&self) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(&self.entries)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let previous = self.entries.insert(key.to_string(), value.to_string());
        if let Err(e) = self.flush() {
            self.restore(key, previous);
            return Err(e);
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if let Some(previous) = self.entries.remove(key) {
            if let Err(e) = self.flush() {
                self.restore(key, Some(previous));
                return Err(e);
            }
        }
        Ok(())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

/// Storage key for a model's placement: `prefix + model id`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlacementKey(String);

impl PlacementKey {
    /// Key for `model_id`; an absent or blank id uses `fallback_id`
    /// (rigs loaded by direct path have no manifest id).
    pub fn for_model(prefix: &str, model_id: Option<&str>, fallback_id: &str) -> Self {
        let id = model_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(fallback_id);
        Self(format!("{prefix}{id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PlacementKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Named vector components as stored
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Xyz {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<Vec3> for Xyz {
    fn from(v: Vec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

impl From<Xyz> for Vec3 {
    fn from(v: Xyz) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

/// A stored placement, normalised to the current version
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementRecord {
    pub version: u32,
    pub position: Xyz,
    pub rotation: Xyz,
    pub scale: Xyz,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl PlacementRecord {
    pub fn new(placement: &Placement, saved_at: Option<DateTime<Utc>>) -> Self {
        Self {
            version: RECORD_VERSION,
            position: placement.position.into(),
            rotation: placement.rotation.into(),
            scale: placement.scale.into(),
            saved_at,
        }
    }

    pub fn placement(&self) -> Placement {
        Placement::new(
            self.position.into(),
            self.rotation.into(),
            self.scale.into(),
        )
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse any supported record shape
    pub fn from_json_str(content: &str) -> Result<Self, String> {
        let raw: RawRecord = serde_json::from_str(content).map_err(|e| e.to_string())?;
        raw.normalize()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VecField {
    Named(Xyz),
    Array([f32; 3]),
    Scalar(f32),
}

impl VecField {
    fn vector(self) -> Option<Vec3> {
        match self {
            VecField::Named(v) => Some(v.into()),
            VecField::Array(a) => Some(Vec3::from_array(a)),
            VecField::Scalar(_) => None,
        }
    }

    /// Scale accepts a scalar as uniform scale
    fn scale(self) -> Vec3 {
        match self {
            VecField::Scalar(s) => Vec3::splat(s),
            other => other.vector().unwrap_or(Vec3::ONE),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRecord {
    #[serde(default)]
    version: Option<u32>,
    position: VecField,
    #[serde(default)]
    rotation: Option<VecField>,
    #[serde(default)]
    rotation_y: Option<f32>,
    #[serde(default)]
    scale: Option<VecField>,
    #[serde(default)]
    saved_at: Option<DateTime<Utc>>,
}

impl RawRecord {
    fn normalize(self) -> Result<PlacementRecord, String> {
        if let Some(version) = self.version {
            if version > RECORD_VERSION {
                return Err(format!("unsupported record version {version}"));
            }
        }

        let position = self
            .position
            .vector()
            .ok_or_else(|| "position must be a vector".to_string())?;

        let rotation = match (self.rotation, self.rotation_y) {
            (Some(field), _) => field
                .vector()
                .ok_or_else(|| "rotation must be a vector".to_string())?,
            (None, Some(yaw)) => Vec3::new(0.0, yaw, 0.0),
            (None, None) => Vec3::ZERO,
        };

        let scale = self.scale.map(VecField::scale).unwrap_or(Vec3::ONE);

        Ok(PlacementRecord {
            version: RECORD_VERSION,
            position: position.into(),
            rotation: rotation.into(),
            scale: scale.into(),
            saved_at: self.saved_at,
        })
    }
}

/// Saves and restores placements through a [`KeyValueStore`]
#[derive(Debug, Clone, Default)]
pub struct PlacementStore<S> {
    store: S,
}

impl<S: KeyValueStore> PlacementStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Serialize `placement` under `key`, overwriting any previous record
    pub fn save(
        &mut self,
        key: &PlacementKey,
        placement: &Placement,
    ) -> Result<PlacementRecord, PlacementError> {
        let record = PlacementRecord::new(placement, Some(Utc::now()));
        let json = record.to_json().map_err(StoreError::from)?;
        self.store.set(key.as_str(), &json)?;
        tracing::info!(key = %key, "Placement saved");
        Ok(record)
    }

    /// Read the record under `key`. `Ok(None)` when nothing was saved.
    pub fn load(&self, key: &PlacementKey) -> Result<Option<PlacementRecord>, PlacementError> {
        let Some(json) = self.store.get(key.as_str())? else {
            tracing::debug!(key = %key, "No stored placement");
            return Ok(None);
        };
        let record =
            PlacementRecord::from_json_str(&json).map_err(|reason| PlacementError::Malformed {
                key: key.to_string(),
                reason,
            })?;
        Ok(Some(record))
    }

    pub fn clear(&mut self, key: &PlacementKey) -> Result<(), PlacementError> {
        self.store.remove(key.as_str())?;
        Ok(())
    }

    /// Direct access for entries that are not placements (manifest overrides)
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn abbey() -> Placement {
        Placement::from_arrays([0.0, 0.2, -0.05], [0.0, 3.14159, 0.0], [1.0; 3])
    }

    fn key(id: &str) -> PlacementKey {
        PlacementKey::for_model("wingPlacement:", Some(id), "avatar")
    }

    #[test]
    fn test_key_derivation() {
        assert_eq!(key("abbey").as_str(), "wingPlacement:abbey");
        assert_eq!(
            PlacementKey::for_model("wingPlacement:", None, "avatar").as_str(),
            "wingPlacement:avatar"
        );
        assert_eq!(
            PlacementKey::for_model("wingPlacement:", Some("  "), "avatar").as_str(),
            "wingPlacement:avatar"
        );
    }

    #[test]
    fn test_save_writes_named_vectors() {
        let mut store = PlacementStore::new(MemoryStore::new());
        store.save(&key("abbey"), &abbey()).unwrap();

        let raw = store.store().get("wingPlacement:abbey").unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["position"]["x"], 0.0);
        assert_eq!(value["position"]["y"], 0.2);
        assert_eq!(value["position"]["z"], -0.05);
        assert_eq!(value["rotation"]["y"], 3.14159);
        assert_eq!(value["scale"]["x"], 1.0);
        assert_eq!(value["scale"]["z"], 1.0);
        assert!(value["savedAt"].is_string());
    }

    #[test]
    fn test_save_then_load_reproduces_vectors() {
        let mut store = PlacementStore::new(MemoryStore::new());
        store.save(&key("abbey"), &abbey()).unwrap();

        let record = store.load(&key("abbey")).unwrap().unwrap();
        let loaded = record.placement();
        assert_eq!(loaded.position, Vec3::new(0.0, 0.2, -0.05));
        assert_eq!(loaded.rotation, Vec3::new(0.0, 3.14159, 0.0));
        assert_eq!(loaded.scale, Vec3::ONE);
    }

    #[test]
    fn test_load_is_idempotent() {
        let mut store = PlacementStore::new(MemoryStore::new());
        store.save(&key("abbey"), &abbey()).unwrap();
        let first = store.load(&key("abbey")).unwrap().unwrap().placement();
        let second = store.load(&key("abbey")).unwrap().unwrap().placement();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_key_is_none() {
        let store = PlacementStore::new(MemoryStore::new());
        assert!(store.load(&key("nobody")).unwrap().is_none());
    }

    #[test]
    fn test_keys_are_per_model() {
        let mut store = PlacementStore::new(MemoryStore::new());
        store.save(&key("abbey"), &abbey()).unwrap();
        store
            .save(&key("bo"), &Placement::IDENTITY.with_uniform_scale(2.0))
            .unwrap();
        let abbey_rec = store.load(&key("abbey")).unwrap().unwrap();
        let bo_rec = store.load(&key("bo")).unwrap().unwrap();
        assert_eq!(abbey_rec.scale.x, 1.0);
        assert_eq!(bo_rec.scale.x, 2.0);
    }

    #[test]
    fn test_unversioned_scalar_scale() {
        let json = r#"{"position":{"x":1,"y":2,"z":3},"rotation":{"x":0,"y":1.5,"z":0},"scale":0.5}"#;
        let record = PlacementRecord::from_json_str(json).unwrap();
        assert_eq!(record.version, RECORD_VERSION);
        assert_eq!(record.placement().scale, Vec3::splat(0.5));
        assert_eq!(record.placement().position, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_legacy_immersive_record() {
        let json = r#"{"position":[0,0.15,-0.05],"rotationY":0.25,"scale":1.2}"#;
        let placement = PlacementRecord::from_json_str(json).unwrap().placement();
        assert_eq!(placement.position, Vec3::new(0.0, 0.15, -0.05));
        assert_eq!(placement.rotation, Vec3::new(0.0, 0.25, 0.0));
        assert_eq!(placement.scale, Vec3::splat(1.2));
    }

    #[test]
    fn test_malformed_records_rejected() {
        assert!(PlacementRecord::from_json_str("not json").is_err());
        assert!(PlacementRecord::from_json_str(r#"{"position":3}"#).is_err());
        assert!(PlacementRecord::from_json_str(
            r#"{"version":9,"position":[0,0,0]}"#
        )
        .is_err());

        let mut store = PlacementStore::new(MemoryStore::new());
        store.store_mut().set("wingPlacement:abbey", "{}").unwrap();
        assert!(matches!(
            store.load(&key("abbey")),
            Err(PlacementError::Malformed { .. })
        ));
    }

    #[test]
    fn test_file_store_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("placements.json");

        let mut store = PlacementStore::new(FileStore::open(&path).unwrap());
        store.save(&key("abbey"), &abbey()).unwrap();
        drop(store);

        let reopened = PlacementStore::new(FileStore::open(&path).unwrap());
        let record = reopened.load(&key("abbey")).unwrap().unwrap();
        assert_eq!(record.placement().position, Vec3::new(0.0, 0.2, -0.05));
    }

    #[test]
    fn test_file_store_failed_write_keeps_memory_in_sync() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("placements.json");

        let mut store = FileStore::open(&path).unwrap();
        store.set("wingPlacement:abbey", "1").unwrap();

        // A directory where the file should be makes every write fail
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        assert!(store.set("wingPlacement:abbey", "2").is_err());
        assert!(store.set("wingPlacement:other", "3").is_err());
        assert!(store.remove("wingPlacement:abbey").is_err());

        assert_eq!(store.get("wingPlacement:abbey").unwrap().as_deref(), Some("1"));
        assert_eq!(store.get("wingPlacement:other").unwrap(), None);
    }

    #[test]
    fn test_clear_removes_record() {
        let mut store = PlacementStore::new(MemoryStore::new());
        store.save(&key("abbey"), &abbey()).unwrap();
        store.clear(&key("abbey")).unwrap();
        assert!(store.load(&key("abbey")).unwrap().is_none());
    }
}
