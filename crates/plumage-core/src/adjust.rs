//! Continuous-rate controller adjustment
//!
//! Controllers don't position the accessory directly; stick deflection is
//! integrated over frame time into the placement. [`integrate`] is the pure
//! update step and [`ControllerAdjust`] adds the per-source toggle latch.

use std::collections::HashMap;
use std::hash::Hash;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::transform::Placement;

/// One frame of input from a single controller
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControllerInput {
    /// Left stick, +y pointing towards the user
    pub left: Vec2,
    /// Right stick; controllers with a single stick reuse `left`
    pub right: Option<Vec2>,
    /// Trigger held: right stick Y lifts the accessory
    pub trigger: bool,
    /// Grip held: right stick Y scales the accessory
    pub grip: bool,
    /// Adjust toggle button
    pub toggle: bool,
}

impl ControllerInput {
    fn right_or_left(&self) -> Vec2 {
        self.right.unwrap_or(self.left)
    }
}

/// Allowed uniform scale range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleLimits {
    pub min: f32,
    pub max: f32,
}

impl Default for ScaleLimits {
    fn default() -> Self {
        Self {
            min: 0.05,
            max: 3.0,
        }
    }
}

impl ScaleLimits {
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }
}

/// Per-second rates applied to full stick deflection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustRates {
    pub move_per_sec: f32,
    pub yaw_per_sec: f32,
    pub lift_per_sec: f32,
    pub scale_per_sec: f32,
    pub scale_limits: ScaleLimits,
    /// Longer frames are truncated so a stall can't fling the accessory
    pub max_dt: f32,
}

impl Default for AdjustRates {
    fn default() -> Self {
        Self {
            move_per_sec: 0.5,
            yaw_per_sec: 2.0,
            lift_per_sec: 0.6,
            scale_per_sec: 1.0,
            scale_limits: ScaleLimits::default(),
            max_dt: 0.05,
        }
    }
}

/// Integrate one frame of controller input into `prev`.
///
/// - left stick moves in the horizontal plane
/// - right stick X yaws
/// - trigger + right stick Y lifts
/// - grip + right stick Y scales uniformly, clamped to the limits
pub fn integrate(prev: Placement, input: &ControllerInput, dt: f32, rates: &AdjustRates) -> Placement {
    // NaN or negative limits fall through to zero instead of panicking in clamp
    let dt = dt.max(0.0).min(rates.max_dt.max(0.0));
    let right = input.right_or_left();
    let mut next = prev;

    next.position.x += input.left.x * dt * rates.move_per_sec;
    next.position.z += input.left.y * dt * rates.move_per_sec;
    next.rotation.y += right.x * dt * rates.yaw_per_sec;

    if input.trigger {
        next.position.y += -right.y * dt * rates.lift_per_sec;
    }

    if input.grip {
        let s = rates
            .scale_limits
            .clamp(next.scale.x + -right.y * dt * rates.scale_per_sec);
        next.scale = Vec3::splat(s);
    }

    next
}

/// Toggle latch plus integration across any number of input sources
#[derive(Debug, Clone)]
pub struct ControllerAdjust<S> {
    enabled: bool,
    pressed: HashMap<S, bool>,
    rates: AdjustRates,
}

impl<S: Eq + Hash + Clone> ControllerAdjust<S> {
    pub fn new(rates: AdjustRates, start_enabled: bool) -> Self {
        Self {
            enabled: start_enabled,
            pressed: HashMap::new(),
            rates,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn rates(&self) -> &AdjustRates {
        &self.rates
    }

    /// Feed one frame of input from `source`.
    ///
    /// A rising edge on the toggle button flips the adjust flag; while the
    /// flag is set the input is integrated into `placement`. Returns true
    /// when `placement` changed.
    pub fn poll(
        &mut self,
        source: S,
        input: &ControllerInput,
        dt: f32,
        placement: &mut Placement,
    ) -> bool {
        let was_pressed = self.pressed.insert(source, input.toggle).unwrap_or(false);
        if input.toggle && !was_pressed {
            self.enabled = !self.enabled;
            tracing::info!(enabled = self.enabled, "Accessory adjust toggled");
        }

        if !self.enabled {
            return false;
        }

        let next = integrate(*placement, input, dt, &self.rates);
        let changed = next != *placement;
        *placement = next;
        changed
    }

    /// Forget latch state for a controller that disconnected
    pub fn forget(&mut self, source: &S) {
        self.pressed.remove(source);
    }
}

/// Idle wing-flap angle in radians at time `t` seconds
pub fn flap_angle(t: f32) -> f32 {
    (t * 3.0).sin() * 0.3
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stick(x: f32, y: f32) -> Option<Vec2> {
        Some(Vec2::new(x, y))
    }

    #[test]
    fn test_move_and_yaw_scale_with_dt() {
        let input = ControllerInput {
            left: Vec2::new(1.0, -1.0),
            right: stick(0.5, 0.0),
            ..Default::default()
        };
        let next = integrate(Placement::IDENTITY, &input, 0.02, &AdjustRates::default());
        assert!((next.position.x - 0.01).abs() < 1e-6);
        assert!((next.position.z + 0.01).abs() < 1e-6);
        assert!((next.rotation.y - 0.02).abs() < 1e-6);
        assert_eq!(next.position.y, 0.0);
        assert_eq!(next.scale, Vec3::ONE);
    }

    #[test]
    fn test_negative_or_nan_max_dt_does_not_move() {
        let input = ControllerInput {
            left: Vec2::new(1.0, 0.0),
            ..Default::default()
        };
        for max_dt in [-0.1, f32::NAN] {
            let rates = AdjustRates {
                max_dt,
                ..AdjustRates::default()
            };
            let next = integrate(Placement::IDENTITY, &input, 0.016, &rates);
            assert_eq!(next, Placement::IDENTITY);
        }
    }

    #[test]
    fn test_dt_is_capped() {
        let input = ControllerInput {
            left: Vec2::new(1.0, 0.0),
            ..Default::default()
        };
        let rates = AdjustRates::default();
        let long = integrate(Placement::IDENTITY, &input, 2.0, &rates);
        let capped = integrate(Placement::IDENTITY, &input, 0.05, &rates);
        assert_eq!(long, capped);
    }

    #[test]
    fn test_trigger_lifts_with_inverted_stick() {
        let input = ControllerInput {
            right: stick(0.0, -1.0),
            trigger: true,
            ..Default::default()
        };
        let next = integrate(Placement::IDENTITY, &input, 0.05, &AdjustRates::default());
        assert!((next.position.y - 0.03).abs() < 1e-6);
    }

    #[test]
    fn test_single_stick_falls_back_to_left() {
        let input = ControllerInput {
            left: Vec2::new(1.0, 0.0),
            right: None,
            ..Default::default()
        };
        let next = integrate(Placement::IDENTITY, &input, 0.05, &AdjustRates::default());
        assert!((next.rotation.y - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_scale_clamped_low() {
        let rates = AdjustRates::default();
        let shrink = ControllerInput {
            right: stick(0.0, 1.0),
            grip: true,
            ..Default::default()
        };
        let mut p = Placement::IDENTITY;
        for _ in 0..1000 {
            p = integrate(p, &shrink, 0.05, &rates);
            assert!(p.scale.x >= 0.05);
        }
        assert_eq!(p.scale, Vec3::splat(0.05));
    }

    #[test]
    fn test_scale_clamped_high() {
        let rates = AdjustRates::default();
        let grow = ControllerInput {
            right: stick(0.0, -1.0),
            grip: true,
            ..Default::default()
        };
        let mut p = Placement::IDENTITY;
        for _ in 0..1000 {
            p = integrate(p, &grow, 0.05, &rates);
            assert!(p.scale.x <= 3.0);
        }
        assert_eq!(p.scale, Vec3::splat(3.0));
    }

    #[test]
    fn test_toggle_on_rising_edge_only() {
        let mut adjust: ControllerAdjust<u8> = ControllerAdjust::new(AdjustRates::default(), true);
        let mut p = Placement::IDENTITY;
        let held = ControllerInput {
            toggle: true,
            ..Default::default()
        };

        adjust.poll(0, &held, 0.016, &mut p);
        assert!(!adjust.enabled());
        // Holding the button does not toggle again
        adjust.poll(0, &held, 0.016, &mut p);
        assert!(!adjust.enabled());

        adjust.poll(0, &ControllerInput::default(), 0.016, &mut p);
        adjust.poll(0, &held, 0.016, &mut p);
        assert!(adjust.enabled());
    }

    #[test]
    fn test_disabled_adjust_leaves_placement() {
        let mut adjust: ControllerAdjust<u8> = ControllerAdjust::new(AdjustRates::default(), false);
        let mut p = Placement::IDENTITY;
        let input = ControllerInput {
            left: Vec2::new(1.0, 1.0),
            ..Default::default()
        };
        assert!(!adjust.poll(0, &input, 0.05, &mut p));
        assert_eq!(p, Placement::IDENTITY);

        adjust.set_enabled(true);
        assert!(adjust.poll(0, &input, 0.05, &mut p));
        assert_ne!(p, Placement::IDENTITY);
    }

    #[test]
    fn test_flap_angle_bounds() {
        assert_eq!(flap_angle(0.0), 0.0);
        for i in 0..100 {
            assert!(flap_angle(i as f32 * 0.1).abs() <= 0.3 + 1e-6);
        }
    }
}
