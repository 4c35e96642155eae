//! Attachment registry - at most one live accessory per rig
//!
//! The registry owns the bookkeeping for attachment nodes: which anchor bone
//! they hang from and the placement applied to them. The scene layer creates
//! and destroys the actual nodes; `attach` hands back whatever it replaced so
//! the caller can remove it from the scene graph.

use std::collections::HashMap;
use std::hash::Hash;

use crate::anchor::{resolve_anchor, AnchorMatch, BoneHint};
use crate::rig::{NodeId, RigTree};
use crate::transform::Placement;

/// A live accessory attachment
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment<N> {
    /// Scene handle of the attachment transform node
    pub node: N,
    /// Anchor bone within the rig view
    pub anchor: NodeId,
    pub anchor_name: String,
    pub matched: AnchorMatch,
    pub hint: BoneHint,
    /// Local transform of `node` relative to the anchor
    pub placement: Placement,
}

/// Outcome of [`AttachmentRegistry::attach`]
#[derive(Debug)]
pub struct Attached<N, K> {
    /// Scene key of the anchor the new node must be parented under
    pub anchor_key: K,
    /// The attachment that was live before, already detached
    pub replaced: Option<Attachment<N>>,
}

/// Owning registry keyed by rig identity
#[derive(Debug, Clone)]
pub struct AttachmentRegistry<R, N> {
    live: HashMap<R, Attachment<N>>,
}

impl<R, N> Default for AttachmentRegistry<R, N> {
    fn default() -> Self {
        Self {
            live: HashMap::new(),
        }
    }
}

impl<R, N> AttachmentRegistry<R, N>
where
    R: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `node` to `rig`, detaching any previous attachment first.
    ///
    /// The anchor is resolved from `hint`; `offset` becomes the node's
    /// initial placement.
    pub fn attach<K: Clone>(
        &mut self,
        rig_id: R,
        rig: &RigTree<K>,
        node: N,
        hint: BoneHint,
        offset: Placement,
    ) -> Attached<N, K> {
        let replaced = self.detach(&rig_id);

        let anchor = resolve_anchor(rig, hint);
        let anchor_name = rig.name(anchor.node).unwrap_or_default().to_string();
        let anchor_key = rig
            .key(anchor.node)
            .unwrap_or_else(|| rig.root_key())
            .clone();

        tracing::info!(
            anchor = %anchor_name,
            matched = ?anchor.matched,
            hint = %hint,
            "Accessory attached"
        );

        self.live.insert(
            rig_id,
            Attachment {
                node,
                anchor: anchor.node,
                anchor_name,
                matched: anchor.matched,
                hint,
                placement: offset,
            },
        );

        Attached {
            anchor_key,
            replaced,
        }
    }

    /// Remove the attachment for `rig_id`, returning it for disposal
    pub fn detach(&mut self, rig_id: &R) -> Option<Attachment<N>> {
        let removed = self.live.remove(rig_id);
        if removed.is_some() {
            tracing::debug!("Previous accessory detached");
        }
        removed
    }

    /// Drop every attachment belonging to a rig that is going away
    pub fn detach_all(&mut self) -> Vec<Attachment<N>> {
        self.live.drain().map(|(_, a)| a).collect()
    }

    pub fn get(&self, rig_id: &R) -> Option<&Attachment<N>> {
        self.live.get(rig_id)
    }

    pub fn placement(&self, rig_id: &R) -> Option<&Placement> {
        self.live.get(rig_id).map(|a| &a.placement)
    }

    pub fn placement_mut(&mut self, rig_id: &R) -> Option<&mut Placement> {
        self.live.get_mut(rig_id).map(|a| &mut a.placement)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&R, &Attachment<N>)> {
        self.live.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn rig() -> RigTree<&'static str> {
        let mut rig = RigTree::new("scene", "scene-key");
        let hips = rig.add_child(rig.root(), "Hips", true, "hips-key");
        let spine = rig.add_child(hips, "Spine", true, "spine-key");
        rig.add_child(spine, "Chest", true, "chest-key");
        rig
    }

    fn offset() -> Placement {
        Placement::new(Vec3::new(0.0, 0.2, -0.05), Vec3::new(0.0, 3.14159, 0.0), Vec3::ONE)
    }

    #[test]
    fn test_attach_resolves_anchor_and_offset() {
        let rig = rig();
        let mut registry: AttachmentRegistry<u32, &str> = AttachmentRegistry::new();

        let attached = registry.attach(1, &rig, "wings-a", BoneHint::Chest, offset());
        assert_eq!(attached.anchor_key, "chest-key");
        assert!(attached.replaced.is_none());

        let live = registry.get(&1).unwrap();
        assert_eq!(live.anchor_name, "Chest");
        assert_eq!(live.matched, AnchorMatch::Exact);
        assert_eq!(live.placement, offset());
    }

    #[test]
    fn test_second_attach_replaces_first() {
        let rig = rig();
        let mut registry: AttachmentRegistry<u32, &str> = AttachmentRegistry::new();

        registry.attach(1, &rig, "wings-a", BoneHint::Chest, offset());
        let second = registry.attach(1, &rig, "wings-b", BoneHint::Spine, Placement::IDENTITY);

        assert_eq!(second.anchor_key, "spine-key");
        assert_eq!(second.replaced.map(|a| a.node), Some("wings-a"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&1).map(|a| a.node), Some("wings-b"));
    }

    #[test]
    fn test_rigs_are_independent() {
        let rig = rig();
        let mut registry: AttachmentRegistry<u32, &str> = AttachmentRegistry::new();
        registry.attach(1, &rig, "a", BoneHint::Chest, offset());
        let other = registry.attach(2, &rig, "b", BoneHint::Chest, offset());
        assert!(other.replaced.is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_detach_and_mutate() {
        let rig = rig();
        let mut registry: AttachmentRegistry<u32, &str> = AttachmentRegistry::new();
        registry.attach(1, &rig, "a", BoneHint::Chest, offset());

        registry.placement_mut(&1).unwrap().position.x = 0.5;
        assert_eq!(registry.placement(&1).unwrap().position.x, 0.5);

        let removed = registry.detach(&1).unwrap();
        assert_eq!(removed.node, "a");
        assert!(registry.detach(&1).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_root_anchor_when_no_torso() {
        let rig: RigTree<&str> = RigTree::new("prop", "prop-key");
        let mut registry: AttachmentRegistry<u32, &str> = AttachmentRegistry::new();
        let attached = registry.attach(9, &rig, "a", BoneHint::UpperChest, offset());
        assert_eq!(attached.anchor_key, "prop-key");
        assert_eq!(registry.get(&9).unwrap().matched, AnchorMatch::Root);
    }
}
