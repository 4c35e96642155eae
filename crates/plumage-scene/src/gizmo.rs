//! Desktop drag manipulator
//!
//! Keys 1/2/3 pick translate, rotate or scale. Shift + left drag edits the
//! active accessory; holding Ctrl or Alt routes vertical motion to depth.
//! Handles for the current mode are drawn at the accessory node.

use bevy::input::mouse::MouseMotion;
use bevy::prelude::*;
use bevy_egui::EguiContexts;
use plumage_core::{apply_drag, DragDelta, GizmoMode};

use crate::types::{AccessoryNode, ActiveRig, Attachments, Gizmo, ViewerSettings};

const HANDLE_LENGTH: f32 = 0.25;
const RING_SEGMENTS: usize = 32;

pub struct GizmoPlugin;

impl Plugin for GizmoPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Gizmo>()
            .add_systems(
                Update,
                (select_gizmo_mode, drag_accessory, draw_accessory_handles).chain(),
            );
    }
}

fn select_gizmo_mode(keys: Res<ButtonInput<KeyCode>>, mut gizmo: ResMut<Gizmo>) {
    for (key, digit) in [
        (KeyCode::Digit1, 1),
        (KeyCode::Digit2, 2),
        (KeyCode::Digit3, 3),
    ] {
        if keys.just_pressed(key) {
            gizmo.key(digit);
        }
    }
}

fn drag_accessory(
    mut gizmo: ResMut<Gizmo>,
    mut attachments: ResMut<Attachments>,
    mut mouse_motion: MessageReader<MouseMotion>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    keys: Res<ButtonInput<KeyCode>>,
    active: Res<ActiveRig>,
    settings: Res<ViewerSettings>,
    mut contexts: EguiContexts,
) {
    let motion: Vec2 = mouse_motion.read().map(|m| m.delta).sum();

    if !mouse_button.pressed(MouseButton::Left) {
        if gizmo.dragging() {
            gizmo.end_drag();
            tracing::debug!("Gizmo drag ended");
        }
        return;
    }

    let Some(rig) = active.0 else {
        return;
    };

    if !gizmo.dragging() {
        let egui_wants_pointer = contexts
            .ctx_mut()
            .map(|ctx| ctx.wants_pointer_input())
            .unwrap_or(false);
        let shift = keys.any_pressed([KeyCode::ShiftLeft, KeyCode::ShiftRight]);
        if !mouse_button.just_pressed(MouseButton::Left)
            || !shift
            || egui_wants_pointer
            || attachments.get(&rig).is_none()
        {
            return;
        }
        gizmo.begin_drag();
        tracing::debug!(mode = gizmo.mode().label(), "Gizmo drag started");
    }

    if motion == Vec2::ZERO {
        return;
    }

    let delta = DragDelta {
        pixels: plumage_core::glam::Vec2::new(motion.x, motion.y),
        depth: keys.any_pressed([
            KeyCode::ControlLeft,
            KeyCode::ControlRight,
            KeyCode::AltLeft,
            KeyCode::AltRight,
        ]),
    };
    let mode = gizmo.mode();
    let limits = settings.adjust.scale_limits();
    if let Some(placement) = attachments.placement_mut(&rig) {
        *placement = apply_drag(*placement, mode, delta, &settings.adjust.drag, &limits);
    }
}

/// Line segments for the handles of `mode`, in world space. Axes follow the
/// node rotation but not its scale so handles stay readable on tiny meshes.
pub fn handle_segments(mode: GizmoMode, origin: Vec3, rotation: Quat) -> Vec<(Vec3, Vec3, Color)> {
    let axes = [
        (rotation * Vec3::X, Color::srgb(0.9, 0.2, 0.2)),
        (rotation * Vec3::Y, Color::srgb(0.2, 0.85, 0.2)),
        (rotation * Vec3::Z, Color::srgb(0.25, 0.4, 0.95)),
    ];
    let mut segments: Vec<(Vec3, Vec3, Color)> = axes
        .iter()
        .map(|&(axis, color)| (origin, origin + axis * HANDLE_LENGTH, color))
        .collect();

    match mode {
        GizmoMode::Translate => {}
        GizmoMode::Rotate => {
            // One ring per axis, in the plane the axis is normal to
            for (i, &(_, color)) in axes.iter().enumerate() {
                let u = axes[(i + 1) % 3].0 * HANDLE_LENGTH;
                let v = axes[(i + 2) % 3].0 * HANDLE_LENGTH;
                let point = |k: usize| {
                    let t = k as f32 / RING_SEGMENTS as f32 * std::f32::consts::TAU;
                    origin + u * t.cos() + v * t.sin()
                };
                segments.extend((0..RING_SEGMENTS).map(|k| (point(k), point(k + 1), color)));
            }
        }
        GizmoMode::Scale => {
            // Small cross at each axis tip
            let tick = HANDLE_LENGTH * 0.12;
            for (i, &(axis, color)) in axes.iter().enumerate() {
                let tip = origin + axis * HANDLE_LENGTH;
                let across = axes[(i + 1) % 3].0 * tick;
                let other = axes[(i + 2) % 3].0 * tick;
                segments.push((tip - across, tip + across, color));
                segments.push((tip - other, tip + other, color));
            }
        }
    }
    segments
}

fn draw_accessory_handles(
    mut gizmos: Gizmos,
    gizmo: Res<Gizmo>,
    active: Res<ActiveRig>,
    attachments: Res<Attachments>,
    nodes: Query<&GlobalTransform, With<AccessoryNode>>,
) {
    let Some(attachment) = active.0.and_then(|rig| attachments.get(&rig)) else {
        return;
    };
    let Ok(global) = nodes.get(attachment.node) else {
        return;
    };
    let (_, rotation, origin) = global.to_scale_rotation_translation();
    for (start, end, color) in handle_segments(gizmo.mode(), origin, rotation) {
        let color = if gizmo.dragging() {
            color
        } else {
            color.with_alpha(0.6)
        };
        gizmos.line(start, end, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_handles_are_axes() {
        let origin = Vec3::new(0.0, 1.3, -0.1);
        let segments = handle_segments(GizmoMode::Translate, origin, Quat::IDENTITY);
        assert_eq!(segments.len(), 3);
        assert!(segments.iter().all(|(start, _, _)| *start == origin));
        assert!((segments[1].1 - (origin + Vec3::Y * HANDLE_LENGTH)).length() < 1e-6);
    }

    #[test]
    fn test_handles_follow_rotation() {
        let rotation = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let segments = handle_segments(GizmoMode::Translate, Vec3::ZERO, rotation);
        // Local X points along world -Z after a quarter turn about Y
        assert!((segments[0].1 - Vec3::NEG_Z * HANDLE_LENGTH).length() < 1e-5);
    }

    #[test]
    fn test_rotate_rings_are_closed() {
        let segments = handle_segments(GizmoMode::Rotate, Vec3::ZERO, Quat::IDENTITY);
        assert_eq!(segments.len(), 3 + 3 * RING_SEGMENTS);
        let ring = &segments[3..3 + RING_SEGMENTS];
        assert!((ring[0].0 - ring[RING_SEGMENTS - 1].1).length() < 1e-5);
        assert!(ring
            .iter()
            .all(|(start, _, _)| (start.length() - HANDLE_LENGTH).abs() < 1e-5));
    }

    #[test]
    fn test_scale_handles_mark_tips() {
        let segments = handle_segments(GizmoMode::Scale, Vec3::ZERO, Quat::IDENTITY);
        assert_eq!(segments.len(), 9);
        let (a, b, _) = segments[3];
        assert!((((a + b) * 0.5) - Vec3::X * HANDLE_LENGTH).length() < 1e-6);
    }
}
