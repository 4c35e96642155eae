//! Shared UI components for the accessory panel

use bevy_egui::egui;
use plumage_core::glam::Vec3;
use plumage_core::{Attachment, GizmoMode, Placement, ScaleLimits};

/// Editable position, rotation (degrees) and uniform scale.
///
/// Values are only written back when a widget changed, so placements outside
/// the widget ranges (controller yaw past 180°, presets beyond the scale
/// limits) are shown as they are. Returns true when the placement changed.
pub fn render_placement_editor(
    ui: &mut egui::Ui,
    placement: &mut Placement,
    limits: &ScaleLimits,
) -> bool {
    let mut position = placement.position.to_array();
    let mut degrees = placement.rotation.to_array().map(f32::to_degrees);
    let mut scale = placement.scale.x;
    let mut position_changed = false;
    let mut rotation_changed = false;

    egui::Grid::new("placement_editor")
        .num_columns(4)
        .spacing([6.0, 4.0])
        .show(ui, |ui| {
            ui.label("Position");
            for (value, axis) in position.iter_mut().zip(["x ", "y ", "z "]) {
                let field = egui::DragValue::new(value)
                    .speed(0.001)
                    .prefix(axis)
                    .max_decimals(3);
                position_changed |= ui.add(field).changed();
            }
            ui.end_row();

            ui.label("Rotation");
            for (value, axis) in degrees.iter_mut().zip(["x ", "y ", "z "]) {
                let field = egui::DragValue::new(value)
                    .speed(0.5)
                    .prefix(axis)
                    .suffix("°")
                    .max_decimals(1);
                rotation_changed |= ui.add(field).changed();
            }
            ui.end_row();
        });

    let scale_changed = ui
        .horizontal(|ui| {
            ui.label("Scale");
            ui.add(egui::DragValue::new(&mut scale).speed(0.005).max_decimals(3))
                .changed()
        })
        .inner;

    if position_changed {
        placement.position = Vec3::from_array(position);
    }
    if rotation_changed {
        placement.rotation = Vec3::from_array(degrees.map(f32::to_radians));
    }
    if scale_changed {
        *placement = placement.with_uniform_scale(limits.clamp(scale));
    }
    position_changed || rotation_changed || scale_changed
}

/// Anchor bone and how it was matched
pub fn render_anchor(ui: &mut egui::Ui, attachment: &Attachment<bevy::prelude::Entity>) {
    ui.horizontal(|ui| {
        ui.label(format!("Anchor: {}", attachment.anchor_name));
        ui.label(
            egui::RichText::new(format!("{:?} / {}", attachment.matched, attachment.hint))
                .small()
                .color(egui::Color32::GRAY),
        );
    });
}

/// Gizmo mode selector plus key hints
pub fn render_gizmo_controls(ui: &mut egui::Ui, mode: &mut GizmoMode) {
    ui.horizontal(|ui| {
        for (candidate, label) in [
            (GizmoMode::Translate, "1 Move"),
            (GizmoMode::Rotate, "2 Rotate"),
            (GizmoMode::Scale, "3 Scale"),
        ] {
            ui.selectable_value(mode, candidate, label);
        }
    });
    ui.label(
        egui::RichText::new("Shift + drag to edit, Ctrl for depth")
            .small()
            .color(egui::Color32::GRAY),
    );
}

/// Controller adjust indicator
pub fn render_adjust_state(ui: &mut egui::Ui, enabled: bool) {
    let (text, color) = if enabled {
        ("Controller adjust: on", egui::Color32::from_rgb(50, 200, 50))
    } else {
        ("Controller adjust: off", egui::Color32::GRAY)
    };
    ui.label(egui::RichText::new(text).color(color));
}
