//! Viewer session - what is loaded, what is in flight, and what the user may
//! do next
//!
//! Loads are asynchronous and may finish out of order. Each request takes a
//! [`LoadTicket`] from a [`LoadTracker`]; only the most recent ticket is
//! accepted on completion, so the last request always wins.

use std::fmt;

use thiserror::Error;

use crate::anchor::BoneHint;
use crate::config::ViewerConfig;
use crate::manifest::{upsert_character, AccessoryEntry, AccessoryPreset, Manifest, ModelEntry};
use crate::placement::{KeyValueStore, PlacementError, PlacementKey, PlacementStore};
use crate::transform::Placement;

/// Which listing an id was looked up in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Model,
    Accessory,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Model => f.write_str("Model"),
            EntryKind::Accessory => f.write_str("Wing"),
        }
    }
}

/// User-facing failures
#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("Failed to load {what}: {reason}")]
    MissingResource { what: String, reason: String },
    #[error("{0}")]
    Precondition(String),
    #[error("{kind} not found: {id}")]
    UnknownEntry { kind: EntryKind, id: String },
    #[error("No saved placement")]
    NoSavedPlacement(PlacementKey),
    #[error("Storage error: {0}")]
    Storage(#[from] PlacementError),
}

/// How an error reaches the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Non-blocking status line
    Status(String),
    /// Blocking modal
    Alert(String),
}

impl ViewerError {
    pub fn notice(&self) -> Notice {
        match self {
            ViewerError::MissingResource { .. } | ViewerError::Storage(_) => {
                Notice::Status(self.to_string())
            }
            ViewerError::Precondition(_)
            | ViewerError::UnknownEntry { .. }
            | ViewerError::NoSavedPlacement(_) => Notice::Alert(self.to_string()),
        }
    }
}

const NEED_RIG: &str = "Load a VRM first";
const NEED_RIG_AND_ACCESSORY: &str = "Load VRM and Wing first";
const NEED_LISTED_MODEL: &str = "Pick a model from the list to save a preset";

/// Generation counter for one kind of load
#[derive(Debug, Clone, Default)]
pub struct LoadTracker {
    generation: u64,
}

/// Proof of a specific load request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadTicket {
    generation: u64,
}

impl LoadTracker {
    /// Start a request, superseding every earlier ticket
    pub fn begin(&mut self) -> LoadTicket {
        self.generation += 1;
        LoadTicket {
            generation: self.generation,
        }
    }

    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Supersede outstanding tickets without issuing a new one
    pub fn invalidate(&mut self) {
        self.generation += 1;
    }
}

/// A rig that is requested or live
#[derive(Debug, Clone, PartialEq)]
pub struct RigTarget {
    /// Manifest id; `None` for rigs loaded by direct path
    pub model_id: Option<String>,
    pub path: String,
    pub preset: Option<AccessoryPreset>,
}

/// An accessory that is requested or live
#[derive(Debug, Clone, PartialEq)]
pub struct AccessoryTarget {
    pub accessory_id: Option<String>,
    pub path: String,
    pub textures: Vec<String>,
    pub hint: BoneHint,
    pub offset: Placement,
}

#[derive(Debug, Clone)]
pub struct LoadRequest<T> {
    pub ticket: LoadTicket,
    pub target: T,
}

/// Session state shared by the scene and the UI
#[derive(Debug, Clone)]
pub struct ViewerSession {
    manifest: Manifest,
    default_hint: BoneHint,
    default_offset: Placement,
    key_prefix: String,
    fallback_id: String,
    manifest_override_key: String,
    rig_loads: LoadTracker,
    accessory_loads: LoadTracker,
    pending_rig: Option<(LoadTicket, RigTarget)>,
    pending_accessory: Option<(LoadTicket, AccessoryTarget)>,
    rig: Option<RigTarget>,
    accessory: Option<AccessoryTarget>,
}

impl ViewerSession {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            manifest: Manifest::default(),
            default_hint: config.attachment.hint(),
            default_offset: config.attachment.offset(),
            key_prefix: config.storage.key_prefix.clone(),
            fallback_id: config.storage.fallback_id.clone(),
            manifest_override_key: config.storage.manifest_override_key.clone(),
            rig_loads: LoadTracker::default(),
            accessory_loads: LoadTracker::default(),
            pending_rig: None,
            pending_accessory: None,
            rig: None,
            accessory: None,
        }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn set_models(&mut self, models: Vec<ModelEntry>) {
        tracing::info!(count = models.len(), "Model manifest loaded");
        self.manifest.models = models;
    }

    pub fn set_accessories(&mut self, accessories: Vec<AccessoryEntry>) {
        tracing::info!(count = accessories.len(), "Accessory manifest loaded");
        self.manifest.accessories = accessories;
    }

    pub fn rig(&self) -> Option<&RigTarget> {
        self.rig.as_ref()
    }

    pub fn accessory(&self) -> Option<&AccessoryTarget> {
        self.accessory.as_ref()
    }

    pub fn rig_pending(&self) -> bool {
        self.pending_rig.is_some()
    }

    pub fn accessory_pending(&self) -> bool {
        self.pending_accessory.is_some()
    }

    /// Request the model with manifest id `id`
    pub fn request_model(&mut self, id: &str) -> Result<LoadRequest<RigTarget>, ViewerError> {
        let entry = self
            .manifest
            .model(id)
            .ok_or_else(|| ViewerError::UnknownEntry {
                kind: EntryKind::Model,
                id: id.to_string(),
            })?;
        let target = RigTarget {
            model_id: Some(entry.id.clone()),
            path: entry.path.clone(),
            preset: entry.accessory.clone(),
        };
        Ok(self.begin_rig(target))
    }

    /// Request a rig by path. A manifest entry with the same path lends its id.
    pub fn request_model_path(&mut self, path: &str) -> LoadRequest<RigTarget> {
        let entry = self.manifest.models.iter().find(|m| m.path == path);
        let target = RigTarget {
            model_id: entry.map(|m| m.id.clone()),
            path: path.to_string(),
            preset: entry.and_then(|m| m.accessory.clone()),
        };
        self.begin_rig(target)
    }

    fn begin_rig(&mut self, target: RigTarget) -> LoadRequest<RigTarget> {
        let ticket = self.rig_loads.begin();
        tracing::debug!(path = %target.path, "Rig requested");
        self.pending_rig = Some((ticket, target.clone()));
        LoadRequest { ticket, target }
    }

    /// A rig finished loading. Returns false for superseded requests, whose
    /// result the caller must discard.
    pub fn rig_loaded(&mut self, ticket: LoadTicket) -> bool {
        if !self.rig_loads.is_current(&ticket) {
            tracing::warn!("Discarding stale rig load");
            return false;
        }
        let Some((_, target)) = self.pending_rig.take() else {
            return false;
        };
        tracing::info!(path = %target.path, "Rig loaded");
        self.rig = Some(target);
        // The old accessory went away with the old rig
        self.accessory = None;
        self.pending_accessory = None;
        self.accessory_loads.invalidate();
        true
    }

    /// A rig failed to load. Stale failures are ignored.
    pub fn rig_failed(&mut self, ticket: LoadTicket, reason: impl Into<String>) -> Option<ViewerError> {
        if !self.rig_loads.is_current(&ticket) {
            return None;
        }
        let (_, target) = self.pending_rig.take()?;
        let reason = reason.into();
        tracing::error!(path = %target.path, %reason, "Rig load failed");
        Some(ViewerError::MissingResource {
            what: target.path,
            reason,
        })
    }

    /// Request the accessory with manifest id `id`; a rig must be live
    pub fn request_accessory(
        &mut self,
        id: &str,
    ) -> Result<LoadRequest<AccessoryTarget>, ViewerError> {
        self.require_rig()?;
        let entry = self
            .manifest
            .accessory(id)
            .ok_or_else(|| ViewerError::UnknownEntry {
                kind: EntryKind::Accessory,
                id: id.to_string(),
            })?;
        let (hint, offset) = self.attachment_defaults();
        let target = AccessoryTarget {
            accessory_id: Some(entry.id.clone()),
            path: entry.path.clone(),
            textures: entry.textures.clone(),
            hint,
            offset,
        };
        Ok(self.begin_accessory(target))
    }

    /// Request an accessory by path; a rig must be live
    pub fn request_accessory_path(
        &mut self,
        path: &str,
    ) -> Result<LoadRequest<AccessoryTarget>, ViewerError> {
        self.require_rig()?;
        let entry = self.manifest.accessories.iter().find(|a| a.path == path);
        let (hint, offset) = self.attachment_defaults();
        let target = AccessoryTarget {
            accessory_id: entry.map(|a| a.id.clone()),
            path: path.to_string(),
            textures: entry.map(|a| a.textures.clone()).unwrap_or_default(),
            hint,
            offset,
        };
        Ok(self.begin_accessory(target))
    }

    /// Accessory preset of the live rig, if it names an enabled asset
    pub fn preset_accessory_path(&self) -> Option<&str> {
        self.rig
            .as_ref()
            .and_then(|r| r.preset.as_ref())
            .filter(|p| p.enabled)
            .and_then(|p| p.asset.as_deref())
    }

    fn begin_accessory(&mut self, target: AccessoryTarget) -> LoadRequest<AccessoryTarget> {
        let ticket = self.accessory_loads.begin();
        tracing::debug!(path = %target.path, hint = %target.hint, "Accessory requested");
        self.pending_accessory = Some((ticket, target.clone()));
        LoadRequest { ticket, target }
    }

    /// Whether an accessory result for `ticket` would still be accepted
    pub fn accessory_is_current(&self, ticket: &LoadTicket) -> bool {
        self.accessory_loads.is_current(ticket) && self.pending_accessory.is_some()
    }

    pub fn accessory_loaded(&mut self, ticket: LoadTicket) -> bool {
        if !self.accessory_loads.is_current(&ticket) {
            tracing::warn!("Discarding stale accessory load");
            return false;
        }
        let Some((_, target)) = self.pending_accessory.take() else {
            return false;
        };
        tracing::info!(path = %target.path, "Accessory loaded");
        self.accessory = Some(target);
        true
    }

    pub fn accessory_failed(
        &mut self,
        ticket: LoadTicket,
        reason: impl Into<String>,
    ) -> Option<ViewerError> {
        if !self.accessory_loads.is_current(&ticket) {
            return None;
        }
        let (_, target) = self.pending_accessory.take()?;
        let reason = reason.into();
        tracing::error!(path = %target.path, %reason, "Accessory load failed");
        Some(ViewerError::MissingResource {
            what: target.path,
            reason,
        })
    }

    /// Storage key for the live rig/accessory pair
    pub fn placement_key(&self) -> Result<PlacementKey, ViewerError> {
        let rig = match (&self.rig, &self.accessory) {
            (Some(rig), Some(_)) => rig,
            _ => return Err(ViewerError::Precondition(NEED_RIG_AND_ACCESSORY.to_string())),
        };
        Ok(PlacementKey::for_model(
            &self.key_prefix,
            rig.model_id.as_deref(),
            &self.fallback_id,
        ))
    }

    /// Persist `placement` for the live pair
    pub fn save_placement<S: KeyValueStore>(
        &self,
        store: &mut PlacementStore<S>,
        placement: &Placement,
    ) -> Result<PlacementKey, ViewerError> {
        let key = self.placement_key()?;
        store.save(&key, placement)?;
        Ok(key)
    }

    /// Fetch the stored placement for the live pair. Nothing is applied here;
    /// the caller writes the result into the attachment node.
    pub fn load_placement<S: KeyValueStore>(
        &self,
        store: &PlacementStore<S>,
    ) -> Result<Placement, ViewerError> {
        let key = self.placement_key()?;
        match store.load(&key)? {
            Some(record) => Ok(record.placement()),
            None => Err(ViewerError::NoSavedPlacement(key)),
        }
    }

    /// Record the live placement as the current model's accessory preset.
    ///
    /// The preset lands in the stored model listing (picked up on the next
    /// start) and in the in-memory manifest, so reloading the model uses it
    /// right away. Returns the model id.
    pub fn save_preset<S: KeyValueStore>(
        &mut self,
        store: &mut S,
        placement: &Placement,
    ) -> Result<String, ViewerError> {
        let (rig, accessory) = match (&self.rig, &self.accessory) {
            (Some(rig), Some(accessory)) => (rig, accessory),
            _ => return Err(ViewerError::Precondition(NEED_RIG_AND_ACCESSORY.to_string())),
        };
        let Some(model_id) = rig.model_id.clone() else {
            return Err(ViewerError::Precondition(NEED_LISTED_MODEL.to_string()));
        };
        let mut entry = self
            .manifest
            .model(&model_id)
            .cloned()
            .ok_or_else(|| ViewerError::UnknownEntry {
                kind: EntryKind::Model,
                id: model_id.clone(),
            })?;
        let preset = AccessoryPreset::from_placement(&accessory.path, accessory.hint, placement);
        entry.accessory = Some(preset.clone());

        let key = &self.manifest_override_key;
        let stored = store.get(key).map_err(PlacementError::from)?;
        let listing = upsert_character(stored.as_deref(), &self.manifest.models, &entry);
        store.set(key, &listing).map_err(PlacementError::from)?;
        tracing::info!(model = %model_id, key = %key, "Accessory preset saved");

        if let Some(model) = self.manifest.models.iter_mut().find(|m| m.id == model_id) {
            *model = entry;
        }
        if let Some(rig) = self.rig.as_mut() {
            rig.preset = Some(preset);
        }
        Ok(model_id)
    }

    fn require_rig(&self) -> Result<(), ViewerError> {
        if self.rig.is_none() {
            return Err(ViewerError::Precondition(NEED_RIG.to_string()));
        }
        Ok(())
    }

    /// Anchor hint and offset: the live model's preset wins over config
    fn attachment_defaults(&self) -> (BoneHint, Placement) {
        match self.rig.as_ref().and_then(|r| r.preset.as_ref()) {
            Some(preset) if preset.enabled => {
                (preset.bone_hint.hint(), preset.placement.to_placement())
            }
            _ => (self.default_hint, self.default_offset),
        }
    }
}
