//! Plumage Scene - Bevy plugins for rig loading and accessory editing
//!
//! This crate binds `plumage-core` to a live Bevy world: rigs and accessories
//! are spawned from glTF scenes, the accessory is parented under the anchor
//! bone, and its placement is edited by gizmo drag or gamepad.

pub mod attachment;
pub mod bounds;
pub mod camera;
pub mod controller;
pub mod gizmo;
pub mod loading;
pub mod rig;
pub mod scene;
pub mod types;
pub mod ui;

use bevy::prelude::*;
use plumage_core::ViewerConfig;

/// Plugin that sets up the viewer scene.
///
/// Carries the configuration so resources built from it see the right values.
pub struct PlumageScenePlugin {
    pub config: ViewerConfig,
}

impl Plugin for PlumageScenePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ViewerSettings(self.config.clone()))
            .init_resource::<Session>()
            .init_resource::<Attachments>()
            .init_resource::<ActiveRig>()
            .init_resource::<AutoAccessory>()
            .init_resource::<Flap>()
            .init_resource::<Notices>()
            .init_resource::<loading::PendingLoads>()
            .add_plugins(gizmo::GizmoPlugin)
            .add_plugins(camera::CameraPlugin)
            .add_plugins(scene::SceneSetupPlugin)
            .add_plugins(controller::ControllerPlugin)
            .add_systems(
                Update,
                (
                    loading::poll_rig_loads,
                    loading::poll_accessory_loads,
                    attachment::attach_ready_accessories,
                    attachment::sync_placements,
                    attachment::apply_texture_override,
                    attachment::normalize_accessory_width,
                    attachment::flap_accessories,
                )
                    .chain(),
            );
    }
}

// Re-export commonly used types
pub use camera::CameraSettings;
pub use loading::PendingLoads;
pub use types::*;
// Named explicitly so it wins over the bevy prelude `Gizmo` component
pub use types::Gizmo;
