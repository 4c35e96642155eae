//! Side panel: model/accessory pickers, placement save/load, gizmo controls

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use plumage_scene::ui::{
    render_adjust_state, render_anchor, render_gizmo_controls, render_placement_editor,
};
use plumage_scene::{
    ActiveRig, Attachments, Flap, Gizmo, GamepadAdjust, Notices, PendingLoads, Session,
    ViewerSettings,
};

use crate::storage::Placements;

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Selection>()
            // UI runs in EguiPrimaryContextPass for proper input handling (bevy_egui 0.38+)
            .add_systems(EguiPrimaryContextPass, (ui_system, alert_system).chain());
    }
}

/// Combo box selections
#[derive(Resource, Default)]
pub struct Selection {
    pub model: Option<String>,
    pub accessory: Option<String>,
}

/// Button presses collected while drawing, applied afterwards
enum UiAction {
    LoadModel(String),
    LoadAccessory(String),
    SavePlacement,
    LoadPlacement,
    ClearPlacement,
    ResetPlacement,
    SavePreset,
}

fn ui_system(
    mut contexts: EguiContexts,
    mut session: ResMut<Session>,
    mut loads: ResMut<PendingLoads>,
    mut attachments: ResMut<Attachments>,
    mut placements: ResMut<Placements>,
    mut gizmo: ResMut<Gizmo>,
    mut notices: ResMut<Notices>,
    mut selection: ResMut<Selection>,
    active: Res<ActiveRig>,
    mut flap: ResMut<Flap>,
    adjust: Res<GamepadAdjust>,
    settings: Res<ViewerSettings>,
    asset_server: Res<AssetServer>,
) {
    let Ok(ctx) = contexts.ctx_mut() else { return };

    let mut actions = Vec::new();

    egui::SidePanel::left("accessory_panel")
        .default_width(280.0)
        .show(ctx, |ui| {
            ui.heading("Plumage");
            ui.separator();

            // Models
            ui.label(egui::RichText::new("Model").strong());
            let models = &session.manifest().models;
            if selection.model.is_none() {
                selection.model = session
                    .rig()
                    .and_then(|r| r.model_id.clone())
                    .or_else(|| models.first().map(|m| m.id.clone()));
            }
            ui.horizontal(|ui| {
                let selected_text = selection
                    .model
                    .as_deref()
                    .and_then(|id| models.iter().find(|m| m.id == id))
                    .map(|m| m.name.clone())
                    .unwrap_or_else(|| "(none)".to_string());
                egui::ComboBox::from_id_salt("model_select")
                    .selected_text(selected_text)
                    .show_ui(ui, |ui| {
                        for model in models {
                            ui.selectable_value(
                                &mut selection.model,
                                Some(model.id.clone()),
                                model.name.as_str(),
                            );
                        }
                    });
                let load = ui.add_enabled(!models.is_empty(), egui::Button::new("Load"));
                if load.clicked() {
                    if let Some(id) = selection.model.clone() {
                        actions.push(UiAction::LoadModel(id));
                    }
                }
            });
            if session.rig_pending() {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Loading model...");
                });
            }

            ui.add_space(8.0);

            // Accessories
            ui.label(egui::RichText::new("Wing").strong());
            let accessories = &session.manifest().accessories;
            if selection.accessory.is_none() {
                selection.accessory = accessories.first().map(|a| a.id.clone());
            }
            ui.horizontal(|ui| {
                let selected_text = selection
                    .accessory
                    .as_deref()
                    .and_then(|id| accessories.iter().find(|a| a.id == id))
                    .map(|a| a.name.clone())
                    .unwrap_or_else(|| "(none)".to_string());
                egui::ComboBox::from_id_salt("accessory_select")
                    .selected_text(selected_text)
                    .show_ui(ui, |ui| {
                        for accessory in accessories {
                            ui.selectable_value(
                                &mut selection.accessory,
                                Some(accessory.id.clone()),
                                accessory.name.as_str(),
                            );
                        }
                    });
                let load = ui.add_enabled(!accessories.is_empty(), egui::Button::new("Load"));
                if load.clicked() {
                    if let Some(id) = selection.accessory.clone() {
                        actions.push(UiAction::LoadAccessory(id));
                    }
                }
            });
            if session.accessory_pending() {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Loading wing...");
                });
            }

            ui.separator();

            // Placement
            ui.label(egui::RichText::new("Placement").strong());
            let limits = settings.adjust.scale_limits();
            match active.0.filter(|rig| attachments.get(rig).is_some()) {
                Some(rig) => {
                    if let Some(attachment) = attachments.get(&rig) {
                        render_anchor(ui, attachment);
                    }
                    if let Some(placement) = attachments.placement_mut(&rig) {
                        render_placement_editor(ui, placement, &limits);
                    }
                }
                None => {
                    ui.label(egui::RichText::new("No wing attached").color(egui::Color32::GRAY));
                }
            }
            ui.checkbox(&mut flap.0, "Flap");
            ui.horizontal(|ui| {
                if ui.button("Save").clicked() {
                    actions.push(UiAction::SavePlacement);
                }
                if ui.button("Load").clicked() {
                    actions.push(UiAction::LoadPlacement);
                }
                if ui.button("Reset").clicked() {
                    actions.push(UiAction::ResetPlacement);
                }
                if ui.small_button("Forget").clicked() {
                    actions.push(UiAction::ClearPlacement);
                }
            });
            if ui.button("Save as preset").clicked() {
                actions.push(UiAction::SavePreset);
            }

            ui.separator();

            let mut mode = gizmo.mode();
            render_gizmo_controls(ui, &mut mode);
            if mode != gizmo.mode() {
                gizmo.set_mode(mode);
            }
            render_adjust_state(ui, adjust.enabled());

            ui.separator();
            if !notices.status.is_empty() {
                ui.label(egui::RichText::new(&notices.status).small());
            }
        });

    for action in actions {
        match action {
            UiAction::LoadModel(id) => match session.request_model(&id) {
                Ok(request) => loads.load_rig(&asset_server, request),
                Err(err) => notices.error(&err),
            },
            UiAction::LoadAccessory(id) => match session.request_accessory(&id) {
                Ok(request) => loads.load_accessory(&asset_server, request),
                Err(err) => notices.error(&err),
            },
            UiAction::SavePlacement => {
                let Some(placement) = active.0.and_then(|rig| attachments.placement(&rig).copied())
                else {
                    if let Err(err) = session.placement_key() {
                        notices.error(&err);
                    }
                    continue;
                };
                match session.save_placement(&mut placements, &placement) {
                    Ok(key) => notices.status(format!("Saved placement to {}", key)),
                    Err(err) => notices.error(&err),
                }
            }
            UiAction::LoadPlacement => match session.load_placement(&placements) {
                Ok(placement) => {
                    if let Some(live) = active.0.and_then(|rig| attachments.placement_mut(&rig)) {
                        *live = placement;
                        notices.status("Placement loaded");
                    }
                }
                Err(err) => notices.error(&err),
            },
            UiAction::ClearPlacement => {
                let result = session
                    .placement_key()
                    .and_then(|key| Ok(placements.clear(&key)?));
                match result {
                    Ok(()) => notices.status("Saved placement removed"),
                    Err(err) => notices.error(&err),
                }
            }
            UiAction::SavePreset => {
                let Some(placement) = active.0.and_then(|rig| attachments.placement(&rig).copied())
                else {
                    if let Err(err) = session.placement_key() {
                        notices.error(&err);
                    }
                    continue;
                };
                match session.save_preset(placements.store_mut(), &placement) {
                    Ok(id) => notices.status(format!("Saved preset for {}", id)),
                    Err(err) => notices.error(&err),
                }
            }
            UiAction::ResetPlacement => {
                let offset = session.accessory().map(|a| a.offset);
                let live = active.0.and_then(|rig| attachments.placement_mut(&rig));
                if let (Some(offset), Some(live)) = (offset, live) {
                    *live = offset;
                    notices.status("Placement reset");
                }
            }
        }
    }
}

/// Show queued alerts through the browser's native `alert()`
#[cfg(target_arch = "wasm32")]
fn alert_system(mut notices: ResMut<Notices>) {
    let Some(window) = web_sys::window() else {
        return;
    };
    while let Some(message) = notices.alerts.pop_front() {
        let _ = window.alert_with_message(&message);
    }
}

/// Show queued alerts one at a time as an egui modal
#[cfg(not(target_arch = "wasm32"))]
fn alert_system(mut contexts: EguiContexts, mut notices: ResMut<Notices>) {
    let Some(message) = notices.alerts.front().cloned() else {
        return;
    };
    let Ok(ctx) = contexts.ctx_mut() else { return };
    let mut dismissed = false;
    egui::Window::new("Notice")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
        .show(ctx, |ui| {
            ui.label(message.as_str());
            if ui.button("OK").clicked() {
                dismissed = true;
            }
        });
    if dismissed {
        notices.alerts.pop_front();
    }
}
