//! Accessory attachment on the live scene graph
//!
//! The registry in [`Attachments`] is the single owner of each accessory's
//! placement; node transforms are written from it every frame.

use bevy::mesh::skinning::SkinnedMesh;
use bevy::prelude::*;
use bevy::scene::SceneInstance;
use plumage_core::{flap_angle, width_scale, Placement};

use crate::bounds::mesh_bounds;

use crate::loading::PendingLoads;
use crate::rig::{rig_ready, rig_tree_from_queries};
use crate::types::{
    AccessoryMesh, AccessoryNode, ActiveRig, Attachments, Flap, Notices, Session, ViewerSettings,
};

pub fn placement_to_transform(placement: &Placement) -> Transform {
    Transform {
        translation: Vec3::from_array(placement.position.to_array()),
        rotation: Quat::from_euler(
            EulerRot::XYZ,
            placement.rotation.x,
            placement.rotation.y,
            placement.rotation.z,
        ),
        scale: Vec3::from_array(placement.scale.to_array()),
    }
}

/// Attach accessories whose scene resolved, once the active rig's scene has
/// finished spawning
pub fn attach_ready_accessories(
    mut commands: Commands,
    mut pending: ResMut<PendingLoads>,
    mut session: ResMut<Session>,
    mut attachments: ResMut<Attachments>,
    mut notices: ResMut<Notices>,
    active: Res<ActiveRig>,
    scene_spawner: Res<SceneSpawner>,
    instances: Query<&SceneInstance>,
    names: Query<&Name>,
    children: Query<&Children>,
    skins: Query<&SkinnedMesh>,
    accessory_nodes: Query<(), With<AccessoryNode>>,
) {
    if pending.accessories.is_empty() {
        return;
    }

    // Superseded requests never attach
    pending
        .accessories
        .retain(|a| session.accessory_is_current(&a.ticket));

    let Some(rig) = active.0 else {
        return;
    };
    if !rig_ready(rig, &instances, &scene_spawner) {
        return;
    }

    let Some(index) = pending.accessories.iter().position(|a| a.scene.is_some()) else {
        return;
    };
    let ready = pending.accessories.remove(index);
    let Some(scene) = ready.scene else {
        return;
    };
    if !session.accessory_loaded(ready.ticket) {
        return;
    }

    let target = ready.target;
    let tree = rig_tree_from_queries(rig, &names, &children, &skins, &accessory_nodes);

    let node = commands
        .spawn((
            placement_to_transform(&target.offset),
            Visibility::default(),
            AccessoryNode { rig },
            Name::new("accessory"),
        ))
        .id();
    commands.spawn((
        SceneRoot(scene),
        Transform::default(),
        AccessoryMesh {
            texture: target.textures.first().cloned(),
            texture_applied: false,
            width_normalized: false,
        },
        ChildOf(node),
    ));

    let attached = attachments.attach(rig, &tree, node, target.hint, target.offset);
    commands.entity(attached.anchor_key).add_child(node);
    if let Some(old) = attached.replaced {
        commands.entity(old.node).despawn();
    }

    let anchor = attachments
        .get(&rig)
        .map(|a| a.anchor_name.clone())
        .unwrap_or_default();
    notices.status(format!("Attached {} to {}", target.path, anchor));
}

/// Write each registry placement into its node's transform
pub fn sync_placements(
    attachments: Res<Attachments>,
    mut nodes: Query<&mut Transform, With<AccessoryNode>>,
) {
    for (_, attachment) in attachments.iter() {
        if let Ok(mut transform) = nodes.get_mut(attachment.node) {
            let wanted = placement_to_transform(&attachment.placement);
            if *transform != wanted {
                *transform = wanted;
            }
        }
    }
}

/// Replace the base-color texture of the first mesh surface under each
/// accessory that names one
pub fn apply_texture_override(
    mut accessories: Query<(Entity, &mut AccessoryMesh)>,
    children: Query<&Children>,
    mesh_materials: Query<&MeshMaterial3d<StandardMaterial>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    asset_server: Res<AssetServer>,
) {
    for (entity, mut accessory) in accessories.iter_mut() {
        if accessory.texture_applied {
            continue;
        }
        let Some(texture) = accessory.texture.clone() else {
            accessory.texture_applied = true;
            continue;
        };
        // Scene not spawned yet; retry next frame
        let Some(surface) = find_first_material(entity, &children, &mesh_materials) else {
            continue;
        };

        if let Some(material) = materials.get_mut(&surface.0) {
            let path = crate::loading::asset_path(&texture);
            tracing::debug!("Applying accessory texture: {}", path);
            material.base_color_texture = Some(asset_server.load(path));
        }
        accessory.texture_applied = true;
    }
}

fn find_first_material<'a>(
    parent: Entity,
    children: &Query<&Children>,
    mesh_materials: &'a Query<&MeshMaterial3d<StandardMaterial>>,
) -> Option<&'a MeshMaterial3d<StandardMaterial>> {
    let kids = children.get(parent).ok()?;
    for child in kids.iter() {
        if let Ok(material) = mesh_materials.get(child) {
            return Some(material);
        }
        if let Some(material) = find_first_material(child, children, mesh_materials) {
            return Some(material);
        }
    }
    None
}

/// Scale each new accessory mesh so its width (local X extent) matches
/// `scene.accessory_width`
pub fn normalize_accessory_width(
    settings: Res<ViewerSettings>,
    mut accessories: Query<(Entity, &GlobalTransform, &mut Transform, &mut AccessoryMesh)>,
    children: Query<&Children>,
    mesh_query: Query<(&Mesh3d, &GlobalTransform)>,
    meshes: Res<Assets<Mesh>>,
) {
    for (entity, global, mut transform, mut accessory) in accessories.iter_mut() {
        if accessory.width_normalized {
            continue;
        }
        let Some(target) = settings.scene.accessory_width else {
            accessory.width_normalized = true;
            continue;
        };
        let to_local = global.affine().inverse();
        let Some((min, max)) = mesh_bounds(entity, to_local, &children, &mesh_query, &meshes)
        else {
            continue;
        };
        // Measured in the mesh root's own frame, so its current scale is excluded
        let width = max.x - min.x;
        let scale = width_scale(width, target);
        transform.scale = Vec3::splat(scale);
        accessory.width_normalized = true;
        tracing::debug!("Accessory width {:.3} m scaled by {:.3}", width, scale);
    }
}

/// Idle flap on the accessory mesh; the placement node is untouched so saved
/// placements don't pick it up
pub fn flap_accessories(
    flap: Res<Flap>,
    time: Res<Time>,
    mut meshes: Query<&mut Transform, With<AccessoryMesh>>,
) {
    if !flap.0 {
        // Settle the wings once when switched off
        if flap.is_changed() {
            for mut transform in meshes.iter_mut() {
                transform.rotation = Quat::IDENTITY;
            }
        }
        return;
    }
    let angle = flap_angle(time.elapsed_secs());
    for mut transform in meshes.iter_mut() {
        transform.rotation = Quat::from_rotation_z(angle);
    }
}
