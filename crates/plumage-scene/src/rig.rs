//! Rig view over the ECS hierarchy

use std::collections::HashSet;

use bevy::mesh::skinning::SkinnedMesh;
use bevy::prelude::*;
use bevy::scene::SceneInstance;
use plumage_core::RigTree;

use crate::types::AccessoryNode;

/// Snapshot `root` and its descendants as a [`RigTree`] keyed by entity.
///
/// `children_of` returns children in hierarchy order; `is_joint` marks skin
/// joints. Subtrees for which `skip` is true are left out entirely.
pub fn build_rig_tree(
    root: Entity,
    name_of: impl Fn(Entity) -> Option<String>,
    children_of: impl Fn(Entity) -> Vec<Entity>,
    is_joint: impl Fn(Entity) -> bool,
    skip: impl Fn(Entity) -> bool,
) -> RigTree<Entity> {
    let root_name = name_of(root).unwrap_or_else(|| "rig".to_string());
    let mut tree = RigTree::new(root_name, root);

    let mut stack = vec![(tree.root(), root)];
    while let Some((parent_id, entity)) = stack.pop() {
        for child in children_of(entity) {
            if skip(child) {
                continue;
            }
            let name = name_of(child).unwrap_or_default();
            let id = tree.add_child(parent_id, name, is_joint(child), child);
            stack.push((id, child));
        }
    }
    tree
}

/// Query-backed rig snapshot used by the attach system
pub fn rig_tree_from_queries(
    root: Entity,
    names: &Query<&Name>,
    children: &Query<&Children>,
    skins: &Query<&SkinnedMesh>,
    accessories: &Query<(), With<AccessoryNode>>,
) -> RigTree<Entity> {
    let joints: HashSet<Entity> = skins
        .iter()
        .flat_map(|skin| skin.joints.iter().copied())
        .collect();

    build_rig_tree(
        root,
        |e| names.get(e).ok().map(|n| n.as_str().to_string()),
        |e| {
            children
                .get(e)
                .map(|c| c.iter().collect())
                .unwrap_or_default()
        },
        |e| joints.contains(&e),
        |e| accessories.contains(e),
    )
}

/// True once the scene spawned under `root` has all its entities
pub fn rig_ready(
    root: Entity,
    instances: &Query<&SceneInstance>,
    scene_spawner: &SceneSpawner,
) -> bool {
    instances
        .get(root)
        .map(|instance| scene_spawner.instance_is_ready(**instance))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use plumage_core::{find_anchor, BoneHint};

    fn named(world: &mut World, name: &str) -> Entity {
        world.spawn(Name::new(name.to_string())).id()
    }

    fn snapshot(world: &World, root: Entity, joints: &HashSet<Entity>) -> RigTree<Entity> {
        build_rig_tree(
            root,
            |e| world.get::<Name>(e).map(|n| n.as_str().to_string()),
            |e| {
                world
                    .get::<Children>(e)
                    .map(|c| c.iter().collect())
                    .unwrap_or_default()
            },
            |e| joints.contains(&e),
            |e| world.get::<AccessoryNode>(e).is_some(),
        )
    }

    #[test]
    fn test_hierarchy_snapshot_order() {
        let mut world = World::new();
        let root = named(&mut world, "VRM");
        let hips = named(&mut world, "J_Bip_C_Hips");
        let spine = named(&mut world, "J_Bip_C_Spine");
        let chest = named(&mut world, "J_Bip_C_Chest");
        let body = named(&mut world, "Body");
        world.entity_mut(root).add_children(&[hips, body]);
        world.entity_mut(hips).add_child(spine);
        world.entity_mut(spine).add_child(chest);

        let joints: HashSet<Entity> = [hips, spine, chest].into_iter().collect();
        let tree = snapshot(&world, root, &joints);

        let names: Vec<&str> = tree.depth_first().filter_map(|id| tree.name(id)).collect();
        assert_eq!(
            names,
            vec!["VRM", "J_Bip_C_Hips", "J_Bip_C_Spine", "J_Bip_C_Chest", "Body"]
        );

        let anchor = find_anchor(&tree, BoneHint::Chest);
        assert_eq!(tree.key(anchor), Some(&chest));
    }

    #[test]
    fn test_accessory_subtree_skipped() {
        let mut world = World::new();
        let root = named(&mut world, "VRM");
        let chest = named(&mut world, "Chest");
        world.entity_mut(root).add_child(chest);

        let node = world
            .spawn((Name::new("Wings"), AccessoryNode { rig: root }))
            .id();
        let wing_bone = named(&mut world, "Chest");
        world.entity_mut(chest).add_child(node);
        world.entity_mut(node).add_child(wing_bone);

        let joints: HashSet<Entity> = [chest, wing_bone].into_iter().collect();
        let tree = snapshot(&world, root, &joints);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.key(find_anchor(&tree, BoneHint::Chest)), Some(&chest));
    }

    #[test]
    fn test_unnamed_root_without_bones() {
        let mut world = World::new();
        let root = world.spawn_empty().id();
        let tree = snapshot(&world, root, &HashSet::new());
        assert_eq!(tree.name(tree.root()), Some("rig"));
        assert_eq!(find_anchor(&tree, BoneHint::Spine), tree.root());
    }
}
