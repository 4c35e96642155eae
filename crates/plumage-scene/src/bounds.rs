//! Mesh bounds over a spawned scene hierarchy

use bevy::math::Affine3A;
use bevy::prelude::*;
use bevy::camera::primitives::MeshAabb;

/// Axis-aligned bounds of every mesh under `root`, expressed in the frame
/// `to_frame` maps world space into.
///
/// Returns `None` until the hierarchy has at least one mesh and every mesh
/// asset under it is loaded, so callers can retry on a later frame.
pub fn mesh_bounds(
    root: Entity,
    to_frame: Affine3A,
    children: &Query<&Children>,
    mesh_query: &Query<(&Mesh3d, &GlobalTransform)>,
    meshes: &Assets<Mesh>,
) -> Option<(Vec3, Vec3)> {
    let mut min = Vec3::splat(f32::INFINITY);
    let mut max = Vec3::splat(f32::NEG_INFINITY);
    let mut found = false;

    let mut stack = vec![root];
    while let Some(entity) = stack.pop() {
        if let Ok((mesh_handle, global)) = mesh_query.get(entity) {
            // Not loaded yet
            let mesh = meshes.get(&mesh_handle.0)?;
            if let Some(aabb) = mesh.compute_aabb() {
                let to_local = to_frame * global.affine();
                let center = Vec3::from(aabb.center);
                let half = Vec3::from(aabb.half_extents);
                for corner in box_corners(center, half) {
                    let p = to_local.transform_point3(corner);
                    min = min.min(p);
                    max = max.max(p);
                }
                found = true;
            }
        }
        if let Ok(kids) = children.get(entity) {
            stack.extend(kids.iter());
        }
    }

    found.then_some((min, max))
}

fn box_corners(center: Vec3, half: Vec3) -> [Vec3; 8] {
    let mut corners = [Vec3::ZERO; 8];
    for (i, corner) in corners.iter_mut().enumerate() {
        let sign = Vec3::new(
            if i & 1 == 0 { -1.0 } else { 1.0 },
            if i & 2 == 0 { -1.0 } else { 1.0 },
            if i & 4 == 0 { -1.0 } else { 1.0 },
        );
        *corner = center + half * sign;
    }
    corners
}
