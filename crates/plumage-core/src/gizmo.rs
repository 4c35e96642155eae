//! Pointer-drag manipulator for the attached accessory
//!
//! Keys 1/2/3 select translate, rotate or scale. A drag updates the local
//! placement live, and the orbit camera is held off for the length of the
//! drag so the two don't fight over the pointer.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::adjust::ScaleLimits;
use crate::transform::Placement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GizmoMode {
    #[default]
    Translate,
    Rotate,
    Scale,
}

impl GizmoMode {
    /// Mode bound to a digit key, if any
    pub fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            1 => Some(GizmoMode::Translate),
            2 => Some(GizmoMode::Rotate),
            3 => Some(GizmoMode::Scale),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GizmoMode::Translate => "translate",
            GizmoMode::Rotate => "rotate",
            GizmoMode::Scale => "scale",
        }
    }
}

/// Pointer movement for one frame of a drag
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DragDelta {
    /// Screen-space motion in logical pixels, +y down
    pub pixels: Vec2,
    /// Route vertical motion to the depth axis (Z) instead of Y
    pub depth: bool,
}

/// How far one pixel of drag moves the accessory in each mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DragSensitivity {
    pub translate: f32,
    pub rotate: f32,
    pub scale: f32,
}

impl Default for DragSensitivity {
    fn default() -> Self {
        Self {
            translate: 0.002,
            rotate: 0.01,
            scale: 0.005,
        }
    }
}

/// Manipulator mode and drag state
#[derive(Debug, Clone, Default)]
pub struct GizmoState {
    mode: GizmoMode,
    dragging: bool,
}

impl GizmoState {
    pub fn mode(&self) -> GizmoMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: GizmoMode) {
        if self.mode != mode {
            tracing::debug!(mode = mode.label(), "Gizmo mode changed");
        }
        self.mode = mode;
    }

    /// Apply a digit key press. Returns true if it selected a mode.
    pub fn key(&mut self, digit: u8) -> bool {
        match GizmoMode::from_digit(digit) {
            Some(mode) => {
                self.set_mode(mode);
                true
            }
            None => false,
        }
    }

    pub fn dragging(&self) -> bool {
        self.dragging
    }

    pub fn begin_drag(&mut self) {
        self.dragging = true;
    }

    pub fn end_drag(&mut self) {
        self.dragging = false;
    }

    /// Whether the orbit camera may consume pointer input
    pub fn orbit_enabled(&self) -> bool {
        !self.dragging
    }
}

/// Apply one frame of drag in `mode` to `placement`
pub fn apply_drag(
    placement: Placement,
    mode: GizmoMode,
    delta: DragDelta,
    sensitivity: &DragSensitivity,
    limits: &ScaleLimits,
) -> Placement {
    let mut next = placement;
    // Screen y grows downward; dragging up should be positive
    let up = -delta.pixels.y;
    let right = delta.pixels.x;

    match mode {
        GizmoMode::Translate => {
            let step = sensitivity.translate;
            next.position.x += right * step;
            if delta.depth {
                next.position.z += up * step;
            } else {
                next.position.y += up * step;
            }
        }
        GizmoMode::Rotate => {
            let step = sensitivity.rotate;
            next.rotation.y += right * step;
            if delta.depth {
                next.rotation.z += up * step;
            } else {
                next.rotation.x += up * step;
            }
        }
        GizmoMode::Scale => {
            let factor = 1.0 + up * sensitivity.scale;
            let scaled = placement.scale * factor.max(0.0);
            next.scale = Vec3::new(
                limits.clamp(scaled.x),
                limits.clamp(scaled.y),
                limits.clamp(scaled.z),
            );
        }
    }

    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drag(x: f32, y: f32) -> DragDelta {
        DragDelta {
            pixels: Vec2::new(x, y),
            depth: false,
        }
    }

    #[test]
    fn test_digit_keys_select_mode() {
        let mut gizmo = GizmoState::default();
        assert_eq!(gizmo.mode(), GizmoMode::Translate);
        assert!(gizmo.key(2));
        assert_eq!(gizmo.mode(), GizmoMode::Rotate);
        assert!(gizmo.key(3));
        assert_eq!(gizmo.mode(), GizmoMode::Scale);
        assert!(!gizmo.key(4));
        assert_eq!(gizmo.mode(), GizmoMode::Scale);
    }

    #[test]
    fn test_drag_disables_orbit() {
        let mut gizmo = GizmoState::default();
        assert!(gizmo.orbit_enabled());
        gizmo.begin_drag();
        assert!(!gizmo.orbit_enabled());
        gizmo.end_drag();
        assert!(gizmo.orbit_enabled());
    }

    #[test]
    fn test_translate_drag() {
        let s = DragSensitivity::default();
        let limits = ScaleLimits::default();
        let p = apply_drag(Placement::IDENTITY, GizmoMode::Translate, drag(100.0, -50.0), &s, &limits);
        assert!((p.position.x - 0.2).abs() < 1e-6);
        assert!((p.position.y - 0.1).abs() < 1e-6);
        assert_eq!(p.position.z, 0.0);

        let depth = DragDelta {
            pixels: Vec2::new(0.0, -50.0),
            depth: true,
        };
        let p = apply_drag(Placement::IDENTITY, GizmoMode::Translate, depth, &s, &limits);
        assert_eq!(p.position.y, 0.0);
        assert!((p.position.z - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_rotate_drag() {
        let p = apply_drag(
            Placement::IDENTITY,
            GizmoMode::Rotate,
            drag(10.0, 0.0),
            &DragSensitivity::default(),
            &ScaleLimits::default(),
        );
        assert!((p.rotation.y - 0.1).abs() < 1e-6);
        assert_eq!(p.position, Vec3::ZERO);
    }

    #[test]
    fn test_scale_drag_clamped() {
        let s = DragSensitivity::default();
        let limits = ScaleLimits::default();
        let mut p = Placement::IDENTITY;
        for _ in 0..100 {
            p = apply_drag(p, GizmoMode::Scale, drag(0.0, 100.0), &s, &limits);
        }
        assert_eq!(p.scale, Vec3::splat(0.05));

        for _ in 0..100 {
            p = apply_drag(p, GizmoMode::Scale, drag(0.0, -100.0), &s, &limits);
        }
        assert_eq!(p.scale, Vec3::splat(3.0));
    }
}
