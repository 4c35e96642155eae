//! Camera controls and orbit navigation

use bevy::input::mouse::{MouseMotion, MouseWheel};
use bevy::math::Affine3A;
use bevy::prelude::*;
use bevy_egui::EguiContexts;

use crate::bounds::mesh_bounds;
use crate::types::{Gizmo, MainCamera, RigRoot};

/// Marks a rig whose bounds the orbit has already been fitted to
#[derive(Component)]
pub struct CameraFitted;

/// Camera controller settings
#[derive(Debug, Clone, Resource)]
pub struct CameraSettings {
    pub distance: f32,
    pub target_distance: f32,
    pub azimuth: f32,
    pub elevation: f32,
    pub target: Vec3,
    pub target_focus: Vec3,
    pub sensitivity: f32,
    pub zoom_speed: f32,
    pub smooth_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            distance: 2.5,
            target_distance: 2.5,
            azimuth: 0.0,
            elevation: 0.15,
            // Roughly chest height on an adult avatar
            target: Vec3::new(0.0, 1.2, 0.0),
            target_focus: Vec3::new(0.0, 1.2, 0.0),
            sensitivity: 0.005,
            zoom_speed: 0.1,
            smooth_factor: 0.15,
            min_distance: 0.3,
            max_distance: 10.0,
        }
    }
}

impl CameraSettings {
    /// Camera position for the current orbit (Y up)
    pub fn eye(&self) -> Vec3 {
        let x = self.distance * self.elevation.cos() * self.azimuth.sin();
        let y = self.distance * self.elevation.sin();
        let z = self.distance * self.elevation.cos() * self.azimuth.cos();
        self.target + Vec3::new(x, y, z)
    }

    /// Re-aim the orbit at a model's world bounds
    ///
    /// The focus moves to the box center and the zoom-out limit grows to twice the box
    /// diagonal (never below 3 m). The current distance is kept unless it exceeds the new
    /// limit.
    pub fn fit_to_bounds(&mut self, min: Vec3, max: Vec3) {
        let size = (max - min).length();
        let size = if size.is_finite() && size > 0.0 { size } else { 1.0 };
        self.target_focus = (min + max) * 0.5;
        self.max_distance = (size * 2.0).max(3.0);
        self.target_distance = self.target_distance.min(self.max_distance);
    }
}

/// Plugin for camera controls
pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CameraSettings>()
            .add_systems(Startup, spawn_camera)
            .add_systems(Update, (fit_camera_to_rig, update_camera).chain());
    }
}

fn spawn_camera(mut commands: Commands, settings: Res<CameraSettings>) {
    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            near: 0.01,
            far: 100.0,
            ..default()
        }),
        Transform::from_translation(settings.eye()).looking_at(settings.target, Vec3::Y),
        MainCamera,
    ));
}

/// Fit the orbit once per rig, as soon as all of its meshes are loaded
fn fit_camera_to_rig(
    mut commands: Commands,
    rigs: Query<Entity, (With<RigRoot>, Without<CameraFitted>)>,
    children: Query<&Children>,
    mesh_query: Query<(&Mesh3d, &GlobalTransform)>,
    meshes: Res<Assets<Mesh>>,
    mut settings: ResMut<CameraSettings>,
) {
    for rig in &rigs {
        let Some((min, max)) = mesh_bounds(rig, Affine3A::IDENTITY, &children, &mesh_query, &meshes)
        else {
            continue;
        };
        settings.fit_to_bounds(min, max);
        commands.entity(rig).insert(CameraFitted);
        tracing::debug!("Orbit fitted to rig bounds {:?}..{:?}", min, max);
    }
}

fn update_camera(
    mut camera_query: Query<&mut Transform, With<MainCamera>>,
    mut settings: ResMut<CameraSettings>,
    mut mouse_motion: MessageReader<MouseMotion>,
    mut mouse_wheel: MessageReader<MouseWheel>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    keys: Res<ButtonInput<KeyCode>>,
    gizmo: Res<Gizmo>,
    time: Res<Time>,
    mut contexts: EguiContexts,
) {
    let egui_wants_pointer = contexts
        .ctx_mut()
        .map(|ctx| ctx.wants_pointer_input())
        .unwrap_or(false);
    // Shift-drag belongs to the accessory gizmo
    let shift = keys.any_pressed([KeyCode::ShiftLeft, KeyCode::ShiftRight]);
    let pointer_free = !egui_wants_pointer && gizmo.orbit_enabled() && !shift;

    let mut total_motion = Vec2::ZERO;
    for motion in mouse_motion.read() {
        total_motion += motion.delta;
    }

    // Orbit with left mouse drag
    if mouse_button.pressed(MouseButton::Left) && pointer_free {
        settings.azimuth -= total_motion.x * settings.sensitivity;
        settings.elevation =
            (settings.elevation + total_motion.y * settings.sensitivity).clamp(-1.5, 1.5);
    }

    // Pan with right mouse drag in the camera's vertical plane
    if mouse_button.pressed(MouseButton::Right) && pointer_free {
        let right = Vec3::new(settings.azimuth.cos(), 0.0, -settings.azimuth.sin());
        let pan_speed = settings.distance * 0.002;
        settings.target_focus -= right * total_motion.x * pan_speed;
        settings.target_focus += Vec3::Y * total_motion.y * pan_speed;
    }

    if !egui_wants_pointer {
        for scroll in mouse_wheel.read() {
            let zoom_factor = 1.0 - scroll.y * settings.zoom_speed * 0.3;
            settings.target_distance = (settings.target_distance * zoom_factor)
                .clamp(settings.min_distance, settings.max_distance);
        }
    } else {
        // Drain the scroll events even if we're not using them
        for _ in mouse_wheel.read() {}
    }

    // Smooth interpolation for zoom and target
    let dt = time.delta_secs();
    let lerp_factor = 1.0 - (-settings.smooth_factor * 60.0 * dt).exp();
    settings.distance += (settings.target_distance - settings.distance) * lerp_factor;
    let focus = settings.target_focus;
    let target = settings.target;
    settings.target += (focus - target) * lerp_factor;

    if let Ok(mut transform) = camera_query.single_mut() {
        transform.translation = settings.eye();
        transform.look_at(settings.target, Vec3::Y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_eye_in_front_of_avatar() {
        let settings = CameraSettings::default();
        let eye = settings.eye();
        // Rigs are yawed to face +Z, so the camera sits on +Z
        assert!(eye.z > 0.0);
        assert!((eye.distance(settings.target) - settings.distance).abs() < 1e-4);
    }

    #[test]
    fn test_fit_to_bounds_centers_and_limits_zoom() {
        let mut settings = CameraSettings::default();
        settings.fit_to_bounds(Vec3::new(-0.5, 0.0, -0.2), Vec3::new(0.5, 1.7, 0.2));
        assert!((settings.target_focus - Vec3::new(0.0, 0.85, 0.0)).length() < 1e-5);
        // Diagonal is under 1.5 m, so the 3 m floor applies
        assert!((settings.max_distance - 3.0).abs() < 1e-5);
        assert!(settings.target_distance <= settings.max_distance);
    }

    #[test]
    fn test_fit_to_large_bounds_extends_zoom() {
        let mut settings = CameraSettings::default();
        settings.target_distance = 8.0;
        settings.fit_to_bounds(Vec3::splat(-2.0), Vec3::splat(2.0));
        let diagonal = Vec3::splat(4.0).length();
        assert!((settings.max_distance - diagonal * 2.0).abs() < 1e-4);
        assert!((settings.target_distance - 8.0).abs() < 1e-5);
        assert!(settings.target_focus.length() < 1e-6);
    }

    #[test]
    fn test_fit_to_degenerate_bounds_keeps_floor() {
        let mut settings = CameraSettings::default();
        settings.target_distance = 9.0;
        settings.fit_to_bounds(Vec3::ONE, Vec3::ONE);
        assert!((settings.max_distance - 3.0).abs() < 1e-5);
        assert!((settings.target_distance - 3.0).abs() < 1e-5);
    }
}
