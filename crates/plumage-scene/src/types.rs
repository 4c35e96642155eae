//! Shared resources and components for the viewer scene

use std::collections::VecDeque;

use bevy::prelude::*;
use plumage_core::{
    AttachmentRegistry, ControllerAdjust, GizmoState, Notice, ViewerConfig, ViewerError,
    ViewerSession,
};

/// Loaded configuration
#[derive(Debug, Clone, Resource, Default, Deref)]
pub struct ViewerSettings(pub ViewerConfig);

/// What is loaded and in flight, shared with the UI
#[derive(Debug, Clone, Resource, Deref, DerefMut)]
pub struct Session(pub ViewerSession);

impl FromWorld for Session {
    fn from_world(world: &mut World) -> Self {
        let config = world
            .get_resource::<ViewerSettings>()
            .map(|s| s.0.clone())
            .unwrap_or_default();
        Self(ViewerSession::new(&config))
    }
}

/// Live attachments, keyed by rig root entity. The value is the attachment
/// node entity parented under the anchor bone.
#[derive(Debug, Resource, Default, Deref, DerefMut)]
pub struct Attachments(pub AttachmentRegistry<Entity, Entity>);

/// Root entity of the rig currently on screen
#[derive(Debug, Clone, Copy, Resource, Default)]
pub struct ActiveRig(pub Option<Entity>);

/// Drag manipulator state
#[derive(Debug, Clone, Resource, Default, Deref, DerefMut)]
pub struct Gizmo(pub GizmoState);

/// Gamepad adjust latch, one toggle state per gamepad entity
#[derive(Debug, Clone, Resource, Deref, DerefMut)]
pub struct GamepadAdjust(pub ControllerAdjust<Entity>);

impl FromWorld for GamepadAdjust {
    fn from_world(world: &mut World) -> Self {
        let adjust = world
            .get_resource::<ViewerSettings>()
            .map(|s| s.adjust.clone())
            .unwrap_or_default();
        Self(ControllerAdjust::new(adjust.rates(), adjust.start_enabled))
    }
}

/// Accessory to load as soon as a rig is live (direct-path startup)
#[derive(Debug, Clone, Resource, Default)]
pub struct AutoAccessory(pub Option<String>);

/// Status line and queued alerts for the UI
#[derive(Debug, Clone, Resource, Default)]
pub struct Notices {
    pub status: String,
    pub alerts: VecDeque<String>,
}

impl Notices {
    pub fn push(&mut self, notice: Notice) {
        match notice {
            Notice::Status(text) => self.status = text,
            Notice::Alert(text) => self.alerts.push_back(text),
        }
    }

    pub fn error(&mut self, error: &ViewerError) {
        tracing::warn!(%error, "Viewer error");
        self.push(error.notice());
    }

    pub fn status(&mut self, text: impl Into<String>) {
        self.status = text.into();
    }
}

/// Root of a spawned rig scene
#[derive(Component, Debug, Clone)]
pub struct RigRoot {
    pub path: String,
}

/// Transform node carrying the accessory placement
#[derive(Component, Debug, Clone, Copy)]
pub struct AccessoryNode {
    pub rig: Entity,
}

/// Scene root of the accessory mesh, child of an [`AccessoryNode`]
#[derive(Component, Debug, Clone)]
pub struct AccessoryMesh {
    /// Base-color texture to apply to the first mesh surface
    pub texture: Option<String>,
    pub texture_applied: bool,
    /// Set once the width normalization has been applied (or skipped)
    pub width_normalized: bool,
}

/// Runtime flap toggle, seeded from `scene.flap`
#[derive(Debug, Clone, Copy, Resource, Deref, DerefMut)]
pub struct Flap(pub bool);

impl FromWorld for Flap {
    fn from_world(world: &mut World) -> Self {
        Self(
            world
                .get_resource::<ViewerSettings>()
                .is_some_and(|s| s.scene.flap),
        )
    }
}

/// Marker component for the main camera
#[derive(Component)]
pub struct MainCamera;
