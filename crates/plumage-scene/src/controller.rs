//! Gamepad polling for continuous-rate accessory adjustment
//!
//! Button layout: South toggles adjust mode, the right trigger lifts, either
//! grip (left trigger or right bumper) scales. Stick Y is flipped so pushing
//! forward is negative, matching XR controller axes.

use bevy::prelude::*;
use plumage_core::glam;
use plumage_core::ControllerInput;

use crate::types::{ActiveRig, Attachments, GamepadAdjust};

pub struct ControllerPlugin;

impl Plugin for ControllerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<GamepadAdjust>()
            .add_systems(Update, (poll_gamepads, forget_disconnected));
    }
}

/// Read one frame of input from a gamepad
pub fn gamepad_input(gamepad: &Gamepad) -> ControllerInput {
    let flip = |v: Vec2| glam::Vec2::new(v.x, -v.y);
    ControllerInput {
        left: flip(gamepad.left_stick()),
        right: Some(flip(gamepad.right_stick())),
        trigger: gamepad.pressed(GamepadButton::RightTrigger2),
        grip: gamepad.pressed(GamepadButton::LeftTrigger2)
            || gamepad.pressed(GamepadButton::RightTrigger),
        toggle: gamepad.pressed(GamepadButton::South),
    }
}

fn poll_gamepads(
    gamepads: Query<(Entity, &Gamepad)>,
    mut adjust: ResMut<GamepadAdjust>,
    mut attachments: ResMut<Attachments>,
    active: Res<ActiveRig>,
    time: Res<Time>,
) {
    let Some(rig) = active.0 else {
        return;
    };
    let Some(placement) = attachments.placement_mut(&rig) else {
        return;
    };

    let dt = time.delta_secs();
    for (entity, gamepad) in gamepads.iter() {
        let input = gamepad_input(gamepad);
        adjust.poll(entity, &input, dt, placement);
    }
}

fn forget_disconnected(
    mut removed: RemovedComponents<Gamepad>,
    mut adjust: ResMut<GamepadAdjust>,
) {
    for entity in removed.read() {
        adjust.forget(&entity);
    }
}
