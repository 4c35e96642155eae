//! Plumage Core - accessory attachment and placement, independent of rendering
//!
//! This crate provides everything the viewer needs that doesn't touch a
//! scene graph:
//! - Manifest normalization for model and accessory listings
//! - A read-only rig view and anchor-bone resolution
//! - The attachment registry (one live accessory per rig)
//! - Placement records and key-value stores
//! - Gizmo drag and controller rate integration
//! - Load sequencing and user-facing errors

pub mod adjust;
pub mod anchor;
pub mod attachment;
pub mod config;
pub mod gizmo;
pub mod manifest;
pub mod placement;
pub mod rig;
pub mod session;
pub mod transform;

pub use adjust::{flap_angle, integrate, AdjustRates, ControllerAdjust, ControllerInput, ScaleLimits};
pub use anchor::{find_anchor, resolve_anchor, Anchor, AnchorMatch, BoneHint};
pub use attachment::{Attached, Attachment, AttachmentRegistry};
pub use config::{ConfigError, ViewerConfig};
pub use gizmo::{apply_drag, DragDelta, DragSensitivity, GizmoMode, GizmoState};
pub use manifest::{AccessoryEntry, AccessoryPreset, Manifest, ManifestError, ModelEntry};
pub use placement::{
    FileStore, KeyValueStore, MemoryStore, PlacementError, PlacementKey, PlacementRecord,
    PlacementStore, StoreError,
};
pub use rig::{NodeId, RigTree};
pub use session::{
    AccessoryTarget, LoadRequest, LoadTicket, LoadTracker, Notice, RigTarget, ViewerError,
    ViewerSession,
};
pub use transform::{width_scale, Placement};
pub use glam;
