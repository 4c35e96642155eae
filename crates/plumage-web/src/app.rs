//! Bevy application assembly

use bevy::prelude::*;
use bevy_egui::EguiPlugin;
use bevy_picking::{prelude::MeshPickingPlugin, DefaultPickingPlugins};
use plumage_core::ViewerConfig;
use plumage_scene::PlumageScenePlugin;

use crate::config::StartupOptions;
use crate::network::ManifestPlugin;
use crate::storage::Placements;
use crate::ui::UiPlugin;

/// Run the Bevy application
pub fn run(config: ViewerConfig, startup: StartupOptions) {
    App::new()
        .insert_resource(ClearColor(Color::srgb(0.08, 0.08, 0.11)))
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "Plumage - Accessory Viewer".to_string(),
                        canvas: Some("#plumage-canvas".to_string()),
                        fit_canvas_to_parent: true,
                        prevent_default_event_handling: false,
                        ..default()
                    }),
                    ..default()
                })
                .set(AssetPlugin {
                    // Manifest paths are relative to the page root
                    file_path: "".to_string(),
                    // Static hosting has no .meta files
                    meta_check: bevy::asset::AssetMetaCheck::Never,
                    ..default()
                }),
        )
        // Picking must be registered before EguiPlugin so it can detect PickingPlugin
        .add_plugins(DefaultPickingPlugins)
        .add_plugins(MeshPickingPlugin)
        .add_plugins(EguiPlugin::default())
        .add_plugins(PlumageScenePlugin { config })
        .insert_resource(startup)
        .init_resource::<Placements>()
        .add_plugins(ManifestPlugin)
        .add_plugins(UiPlugin)
        .run();
}
