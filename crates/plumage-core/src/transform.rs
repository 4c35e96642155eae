//! Local transform of an attached accessory relative to its anchor bone

use glam::Vec3;

/// Position, Euler rotation (radians, XYZ order) and per-axis scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: Vec3,
    /// Euler angles in radians, applied in XYZ order
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Placement {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Placement {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Vec3::ZERO,
        scale: Vec3::ONE,
    };

    pub fn new(position: Vec3, rotation: Vec3, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Build from plain arrays (config and manifest values)
    pub fn from_arrays(position: [f32; 3], rotation: [f32; 3], scale: [f32; 3]) -> Self {
        Self::new(
            Vec3::from_array(position),
            Vec3::from_array(rotation),
            Vec3::from_array(scale),
        )
    }

    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    /// Component-wise comparison within `epsilon`
    pub fn approx_eq(&self, other: &Placement, epsilon: f32) -> bool {
        self.position.abs_diff_eq(other.position, epsilon)
            && self.rotation.abs_diff_eq(other.rotation, epsilon)
            && self.scale.abs_diff_eq(other.scale, epsilon)
    }
}

/// Uniform scale that brings a mesh of `width` meters to `target` meters.
/// Unmeasurable widths (zero, negative, NaN) leave the mesh as is.
pub fn width_scale(width: f32, target: f32) -> f32 {
    if !width.is_finite() || width <= 1e-6 || !target.is_finite() || target <= 0.0 {
        return 1.0;
    }
    target / width
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_scale() {
        assert!((width_scale(2.4, 1.2) - 0.5).abs() < 1e-6);
        assert!((width_scale(0.6, 1.2) - 2.0).abs() < 1e-6);
        assert_eq!(width_scale(0.0, 1.2), 1.0);
        assert_eq!(width_scale(f32::NAN, 1.2), 1.0);
        assert_eq!(width_scale(1.0, -1.0), 1.0);
    }

    #[test]
    fn test_identity_default() {
        let p = Placement::default();
        assert_eq!(p.position, Vec3::ZERO);
        assert_eq!(p.rotation, Vec3::ZERO);
        assert_eq!(p.scale, Vec3::ONE);
    }

    #[test]
    fn test_approx_eq() {
        let a = Placement::from_arrays([0.0, 0.2, -0.05], [0.0, 3.14159, 0.0], [1.0; 3]);
        let mut b = a;
        b.position.y += 1e-7;
        assert!(a.approx_eq(&b, 1e-5));
        b.scale.x = 2.0;
        assert!(!a.approx_eq(&b, 1e-5));
    }
}
