//! Anchor resolution - picks the bone an accessory is parented under
//!
//! Resolution never fails:
//! 1. exact name match against the hint's alias list (first hit in depth-first order)
//! 2. any bone whose name contains "chest" or "spine" (case-insensitive)
//! 3. the rig root

use std::fmt;
use std::str::FromStr;

use crate::rig::{NodeId, RigTree};

/// Semantic attachment point on a humanoid rig
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BoneHint {
    UpperChest,
    #[default]
    Chest,
    Spine,
}

impl BoneHint {
    /// Literal bone names accepted for this hint, across VRM, VRoid and
    /// generic Mixamo-style rigs
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            BoneHint::UpperChest => &[
                "UpperChest",
                "upperchest",
                "Upper Chest",
                "upperChest",
                "J_Bip_C_UpperChest",
                "Chest2",
            ],
            BoneHint::Chest => &["Chest", "chest", "J_Bip_C_Chest", "Spine2"],
            BoneHint::Spine => &["Spine", "spine", "J_Bip_C_Spine", "HipsSpine"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BoneHint::UpperChest => "UpperChest",
            BoneHint::Chest => "Chest",
            BoneHint::Spine => "Spine",
        }
    }

    /// Parse a label, falling back to `Chest` for anything unrecognised
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or_default()
    }
}

impl fmt::Display for BoneHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoneHint {
    type Err = UnknownBoneHint;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "upperchest" => Ok(BoneHint::UpperChest),
            "chest" => Ok(BoneHint::Chest),
            "spine" => Ok(BoneHint::Spine),
            _ => Err(UnknownBoneHint(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown bone hint: {0}")]
pub struct UnknownBoneHint(pub String);

/// How an anchor was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorMatch {
    Exact,
    Substring,
    Root,
}

/// Result of anchor resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub node: NodeId,
    pub matched: AnchorMatch,
}

/// Find the anchor node for `hint`. Always returns a node of `rig`.
pub fn find_anchor<K>(rig: &RigTree<K>, hint: BoneHint) -> NodeId {
    resolve_anchor(rig, hint).node
}

/// Like [`find_anchor`] but reports which rule produced the match
pub fn resolve_anchor<K>(rig: &RigTree<K>, hint: BoneHint) -> Anchor {
    let wanted = hint.aliases();

    if let Some(node) = rig.find_first(|n| n.is_bone && wanted.contains(&n.name.as_str())) {
        return Anchor {
            node,
            matched: AnchorMatch::Exact,
        };
    }

    if let Some(node) = rig.find_first(|n| n.is_bone && is_torso_name(&n.name)) {
        tracing::debug!(hint = %hint, "No exact bone match, using substring fallback");
        return Anchor {
            node,
            matched: AnchorMatch::Substring,
        };
    }

    tracing::debug!(hint = %hint, "No torso bone found, anchoring to rig root");
    Anchor {
        node: rig.root(),
        matched: AnchorMatch::Root,
    }
}

fn is_torso_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("chest") || lower.contains("spine")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vroid_rig() -> RigTree {
        let mut rig = RigTree::new("VRM_Scene", ());
        let root = rig.add_child(rig.root(), "Root", true, ());
        let hips = rig.add_child(root, "J_Bip_C_Hips", true, ());
        let spine = rig.add_child(hips, "J_Bip_C_Spine", true, ());
        let chest = rig.add_child(spine, "J_Bip_C_Chest", true, ());
        rig.add_child(chest, "J_Bip_C_UpperChest", true, ());
        rig
    }

    #[test]
    fn test_exact_alias_beats_substring() {
        let rig = vroid_rig();
        let anchor = resolve_anchor(&rig, BoneHint::Chest);
        assert_eq!(anchor.matched, AnchorMatch::Exact);
        assert_eq!(rig.name(anchor.node), Some("J_Bip_C_Chest"));
    }

    #[test]
    fn test_each_hint_resolves() {
        let rig = vroid_rig();
        assert_eq!(
            rig.name(find_anchor(&rig, BoneHint::UpperChest)),
            Some("J_Bip_C_UpperChest")
        );
        assert_eq!(
            rig.name(find_anchor(&rig, BoneHint::Spine)),
            Some("J_Bip_C_Spine")
        );
    }

    #[test]
    fn test_substring_fallback() {
        let mut rig = RigTree::new("scene", ());
        let hips = rig.add_child(rig.root(), "mixamorig:Hips", true, ());
        rig.add_child(hips, "mixamorig:Spine1", true, ());
        let anchor = resolve_anchor(&rig, BoneHint::Chest);
        assert_eq!(anchor.matched, AnchorMatch::Substring);
        assert_eq!(rig.name(anchor.node), Some("mixamorig:Spine1"));
    }

    #[test]
    fn test_non_bone_nodes_ignored() {
        let mut rig = RigTree::new("scene", ());
        // A mesh node named like a bone must not capture the anchor
        rig.add_child(rig.root(), "Chest", false, ());
        let bone = rig.add_child(rig.root(), "UpperSpine", true, ());
        assert_eq!(find_anchor(&rig, BoneHint::Chest), bone);
    }

    #[test]
    fn test_root_fallback_is_total() {
        let rig = RigTree::new("scene", ());
        for hint in [BoneHint::UpperChest, BoneHint::Chest, BoneHint::Spine] {
            let anchor = resolve_anchor(&rig, hint);
            assert_eq!(anchor.node, rig.root());
            assert_eq!(anchor.matched, AnchorMatch::Root);
        }
    }

    #[test]
    fn test_first_match_in_traversal_order() {
        let mut rig = RigTree::new("scene", ());
        let a = rig.add_child(rig.root(), "A", true, ());
        let first = rig.add_child(a, "chest", true, ());
        rig.add_child(rig.root(), "Chest", true, ());
        assert_eq!(find_anchor(&rig, BoneHint::Chest), first);
    }

    #[test]
    fn test_hint_parsing() {
        assert_eq!("Chest".parse::<BoneHint>(), Ok(BoneHint::Chest));
        assert_eq!("upper chest".parse::<BoneHint>(), Ok(BoneHint::UpperChest));
        assert_eq!("UPPER_CHEST".parse::<BoneHint>(), Ok(BoneHint::UpperChest));
        assert_eq!("spine".parse::<BoneHint>(), Ok(BoneHint::Spine));
        assert!("tail".parse::<BoneHint>().is_err());
        assert_eq!(BoneHint::from_label("tail"), BoneHint::Chest);
    }
}
