//! Manifest normalization - turns loosely-shaped JSON listings into entries
//!
//! Accepted shapes:
//! - a bare array of path strings: `["a/x.glb", "b/y.glb"]`
//! - a wrapper object: `{"models": [...]}` / `{"characters": [...]}` for models,
//!   `{"wings": [...]}` / `{"accessories": [...]}` for accessories
//! - a bare array of objects whose keys vary (`id`/`name`/`title`,
//!   `path`/`url`/`src`/`file`/...)
//!
//! Entries without a resolvable path are dropped. An empty result is valid.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::anchor::BoneHint;
use crate::transform::Placement;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to parse manifest: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// A selectable base model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub id: String,
    pub name: String,
    pub path: String,
    /// Per-character accessory preset, when the manifest provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessory: Option<AccessoryPreset>,
}

/// A selectable accessory mesh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessoryEntry {
    pub id: String,
    pub name: String,
    pub path: String,
    /// Texture paths; the first one is applied to the first mesh surface
    #[serde(default)]
    pub textures: Vec<String>,
}

/// Accessory defaults attached to a model entry (`"wings": {...}`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessoryPreset {
    pub enabled: bool,
    /// Accessory mesh path
    pub asset: Option<String>,
    pub bone_hint: BoneHintLabel,
    pub placement: PlacementPreset,
}

impl AccessoryPreset {
    /// Enabled preset capturing a live placement
    pub fn from_placement(asset: &str, hint: BoneHint, placement: &Placement) -> Self {
        Self {
            enabled: true,
            asset: Some(asset.to_string()),
            bone_hint: BoneHintLabel(hint.to_string()),
            placement: PlacementPreset {
                position: placement.position.to_array(),
                rotation_degrees: placement.rotation.to_array().map(f32::to_degrees),
                scale: placement.scale.to_array(),
            },
        }
    }

    /// The `"wings"` object as it appears in a models manifest
    pub fn to_json(&self) -> Value {
        json!({
            "enabled": self.enabled,
            "asset": self.asset,
            "boneHint": self.bone_hint.0,
            "position": self.placement.position,
            "rotation": self.placement.rotation_degrees,
            "scale": self.placement.scale,
        })
    }
}

impl ModelEntry {
    /// Manifest object for this entry, readable by [`normalize_models`]
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("id".into(), Value::String(self.id.clone()));
        obj.insert("name".into(), Value::String(self.name.clone()));
        obj.insert("path".into(), Value::String(self.path.clone()));
        if let Some(preset) = &self.accessory {
            obj.insert("wings".into(), preset.to_json());
        }
        Value::Object(obj)
    }
}

/// Insert or replace `entry` in a stored `{"characters": [...]}` listing,
/// matching on id.
///
/// Unknown fields on stored objects survive the update. When nothing usable
/// is stored the listing starts from `seed`, so saving one preset does not
/// hide the other models.
pub fn upsert_character(stored: Option<&str>, seed: &[ModelEntry], entry: &ModelEntry) -> String {
    let raw = stored.and_then(|s| serde_json::from_str::<Value>(s).ok());
    let mut characters: Vec<Value> = match raw.as_ref().and_then(|r| unwrap_list(r, ManifestKind::Models)) {
        Some(list) if !list.is_empty() && list.iter().all(Value::is_object) => list.clone(),
        _ => {
            let normalized = raw.as_ref().map(normalize_models).unwrap_or_default();
            let base = if normalized.is_empty() { seed } else { &normalized[..] };
            base.iter().map(ModelEntry::to_json).collect()
        }
    };

    let position = characters.iter().position(|item| {
        item.as_object()
            .and_then(|obj| first_present(obj, &["id", "name", "title"]))
            .is_some_and(|id| id == entry.id)
    });
    let replacement = entry.to_json();
    match position {
        Some(i) => {
            if let (Some(Value::Object(obj)), Value::Object(fields)) =
                (characters.get_mut(i), replacement)
            {
                obj.extend(fields);
            }
        }
        None => characters.push(replacement),
    }

    json!({ "characters": characters }).to_string()
}

/// Bone hint as written in the manifest, kept as text for round-tripping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoneHintLabel(pub String);

impl BoneHintLabel {
    pub fn hint(&self) -> BoneHint {
        BoneHint::from_label(&self.0)
    }
}

/// Preset transform; rotation is stored in degrees like the manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementPreset {
    pub position: [f32; 3],
    pub rotation_degrees: [f32; 3],
    pub scale: [f32; 3],
}

impl PlacementPreset {
    pub fn to_placement(&self) -> Placement {
        let r = self.rotation_degrees;
        Placement::from_arrays(
            self.position,
            [r[0].to_radians(), r[1].to_radians(), r[2].to_radians()],
            self.scale,
        )
    }
}

/// Which kind of listing is being normalized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    Models,
    Accessories,
}

impl ManifestKind {
    fn wrapper_keys(&self) -> &'static [&'static str] {
        match self {
            ManifestKind::Models => &["models", "characters"],
            ManifestKind::Accessories => &["wings", "accessories"],
        }
    }

    fn id_prefix(&self) -> &'static str {
        match self {
            ManifestKind::Models => "m",
            ManifestKind::Accessories => "w",
        }
    }

    fn path_keys(&self) -> &'static [&'static str] {
        match self {
            ManifestKind::Models => &["path", "url", "src", "file", "model", "vrm"],
            ManifestKind::Accessories => &["path", "url", "src", "file"],
        }
    }

    fn display_fallback(&self, index: usize) -> String {
        match self {
            ManifestKind::Models => format!("Model {}", index + 1),
            ManifestKind::Accessories => format!("Wing {}", index + 1),
        }
    }
}

/// Fields shared by both entry kinds after normalization
#[derive(Debug, Clone)]
struct RawEntry {
    id: String,
    name: String,
    path: String,
}

/// Both normalized listings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    pub models: Vec<ModelEntry>,
    pub accessories: Vec<AccessoryEntry>,
}

impl Manifest {
    /// Parse and normalize a models listing from JSON text
    pub fn models_from_json_str(content: &str) -> Result<Vec<ModelEntry>, ManifestError> {
        let raw: Value = serde_json::from_str(content)?;
        Ok(normalize_models(&raw))
    }

    /// Parse and normalize an accessories listing from JSON text
    pub fn accessories_from_json_str(
        content: &str,
    ) -> Result<Vec<AccessoryEntry>, ManifestError> {
        let raw: Value = serde_json::from_str(content)?;
        Ok(normalize_accessories(&raw))
    }

    pub fn model(&self, id: &str) -> Option<&ModelEntry> {
        self.models.iter().find(|m| m.id == id)
    }

    pub fn accessory(&self, id: &str) -> Option<&AccessoryEntry> {
        self.accessories.iter().find(|a| a.id == id)
    }
}

/// Normalize a models listing of any supported shape
pub fn normalize_models(raw: &Value) -> Vec<ModelEntry> {
    collect(raw, ManifestKind::Models)
        .into_iter()
        .map(|(base, obj)| ModelEntry {
            id: base.id,
            name: base.name,
            path: base.path,
            accessory: obj.and_then(|o| o.get("wings")).and_then(parse_preset),
        })
        .collect()
}

/// Normalize an accessories listing of any supported shape
pub fn normalize_accessories(raw: &Value) -> Vec<AccessoryEntry> {
    collect(raw, ManifestKind::Accessories)
        .into_iter()
        .map(|(base, obj)| AccessoryEntry {
            id: base.id,
            name: base.name,
            path: base.path,
            textures: obj
                .and_then(|o| o.get("textures"))
                .map(string_list)
                .unwrap_or_default(),
        })
        .collect()
}

/// Unwrap the list and resolve the shared fields of every usable element.
/// Bare path strings carry no source object.
fn collect(raw: &Value, kind: ManifestKind) -> Vec<(RawEntry, Option<&Map<String, Value>>)> {
    let Some(items) = unwrap_list(raw, kind) else {
        return Vec::new();
    };

    if matches!(items.first(), Some(Value::String(_))) {
        return items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| {
                let path = non_empty_str(item)?;
                let name = match basename(path) {
                    "" => kind.display_fallback(index),
                    base => base.to_string(),
                };
                let entry = RawEntry {
                    id: format!("{}{}", kind.id_prefix(), index),
                    name,
                    path: path.to_string(),
                };
                Some((entry, None))
            })
            .collect();
    }

    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match item {
            Value::Object(obj) => resolve_object(index, obj, kind).map(|e| (e, Some(obj))),
            _ => {
                tracing::debug!(index, "Dropping non-object manifest entry");
                None
            }
        })
        .collect()
}

fn unwrap_list(raw: &Value, kind: ManifestKind) -> Option<&Vec<Value>> {
    if let Value::Object(obj) = raw {
        for key in kind.wrapper_keys() {
            if let Some(Value::Array(list)) = obj.get(*key) {
                return Some(list);
            }
        }
        return None;
    }
    raw.as_array()
}

fn resolve_object(index: usize, obj: &Map<String, Value>, kind: ManifestKind) -> Option<RawEntry> {
    let Some(path) = first_present(obj, kind.path_keys()) else {
        tracing::debug!(index, "Dropping manifest entry without a path");
        return None;
    };

    let id = first_present(obj, &["id", "name", "title"])
        .unwrap_or_else(|| format!("{}{}", kind.id_prefix(), index));

    let name = first_present(obj, &["name", "title", "id"])
        .or_else(|| {
            let base = basename(&path);
            (!base.is_empty()).then(|| base.to_string())
        })
        .unwrap_or_else(|| kind.display_fallback(index));

    Some(RawEntry { id, name, path })
}

/// First key holding a non-empty string or a number (stringified)
fn first_present(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.is_empty())
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(non_empty_str)
            .map(str::to_string)
            .collect(),
        Value::String(s) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// Last '/'-separated segment of a path
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn parse_preset(value: &Value) -> Option<AccessoryPreset> {
    let obj = value.as_object()?;
    Some(AccessoryPreset {
        enabled: obj.get("enabled").and_then(Value::as_bool).unwrap_or(false),
        asset: obj
            .get("asset")
            .and_then(non_empty_str)
            .map(str::to_string),
        bone_hint: BoneHintLabel(
            obj.get("boneHint")
                .and_then(non_empty_str)
                .unwrap_or("Chest")
                .to_string(),
        ),
        placement: PlacementPreset {
            position: vec3_field(obj, "position").unwrap_or([0.0, 0.1, -0.05]),
            rotation_degrees: vec3_field(obj, "rotation").unwrap_or([0.0; 3]),
            scale: vec3_field(obj, "scale").unwrap_or([1.0; 3]),
        },
    })
}

fn vec3_field(obj: &Map<String, Value>, key: &str) -> Option<[f32; 3]> {
    match obj.get(key)? {
        Value::Array(items) if items.len() >= 3 => {
            let mut out = [0.0f32; 3];
            for (slot, item) in out.iter_mut().zip(items) {
                *slot = item.as_f64()? as f32;
            }
            Some(out)
        }
        Value::Number(n) => n.as_f64().map(|v| [v as f32; 3]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_string_array() {
        let entries = normalize_models(&json!(["a/x.glb", "b/y.glb"]));
        assert_eq!(
            entries,
            vec![
                ModelEntry {
                    id: "m0".to_string(),
                    name: "x.glb".to_string(),
                    path: "a/x.glb".to_string(),
                    accessory: None,
                },
                ModelEntry {
                    id: "m1".to_string(),
                    name: "y.glb".to_string(),
                    path: "b/y.glb".to_string(),
                    accessory: None,
                },
            ]
        );
    }

    #[test]
    fn test_wrapped_models() {
        let raw = json!({
            "models": [
                {"id": "abbey", "name": "Abbey", "path": "asset/models/abbey.vrm"},
                {"title": "Stella", "url": "asset/models/stella.vrm"},
                {"vrm": "asset/models/jem.vrm"}
            ]
        });
        let entries = normalize_models(&raw);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].id, "abbey");
        assert_eq!(entries[0].name, "Abbey");
        assert_eq!(entries[1].id, "Stella");
        assert_eq!(entries[1].name, "Stella");
        assert_eq!(entries[1].path, "asset/models/stella.vrm");
        assert_eq!(entries[2].id, "m2");
        assert_eq!(entries[2].name, "jem.vrm");
    }

    #[test]
    fn test_entries_without_path_dropped() {
        let raw = json!([
            {"id": "a", "path": "a.glb"},
            {"id": "b"},
            {"id": "c", "path": ""},
            42,
            {"name": "d", "src": "d.glb"}
        ]);
        let entries = normalize_models(&raw);
        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "d"]);
        for entry in &entries {
            assert!(!entry.id.is_empty());
            assert!(!entry.name.is_empty());
            assert!(!entry.path.is_empty());
        }
    }

    #[test]
    fn test_index_preserved_after_drop() {
        let raw = json!([{"title": ""}, {"file": "z/q.glb"}]);
        let entries = normalize_models(&raw);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "m1");
        assert_eq!(entries[0].name, "q.glb");
    }

    #[test]
    fn test_numeric_id() {
        let entries = normalize_models(&json!([{"id": 7, "path": "seven.glb"}]));
        assert_eq!(entries[0].id, "7");
        assert_eq!(entries[0].name, "7");
    }

    #[test]
    fn test_accessories_with_textures() {
        let raw = json!({
            "wings": [
                {"id": "w-angel", "name": "Angel", "path": "wings/angel.glb",
                 "textures": ["wings/angel.png", 3]},
                {"file": "wings/bat.glb", "textures": "wings/bat.png"},
                {"model": "wings/ignored.glb"}
            ]
        });
        let entries = normalize_accessories(&raw);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].textures, vec!["wings/angel.png".to_string()]);
        assert_eq!(entries[1].id, "w1");
        assert_eq!(entries[1].name, "bat.glb");
        assert_eq!(entries[1].textures, vec!["wings/bat.png".to_string()]);
    }

    #[test]
    fn test_empty_and_unsupported_shapes() {
        assert!(normalize_models(&json!([])).is_empty());
        assert!(normalize_models(&json!({"other": []})).is_empty());
        assert!(normalize_models(&json!(null)).is_empty());
        assert!(normalize_accessories(&json!("wings.glb")).is_empty());
    }

    #[test]
    fn test_character_preset() {
        let raw = json!({
            "characters": [{
                "id": "abbey",
                "vrm": "asset/models/abbey.vrm",
                "wings": {
                    "enabled": true,
                    "asset": "asset/wings/angel.glb",
                    "boneHint": "UpperChest",
                    "position": [0, 0.12, -0.04],
                    "rotation": [0, 180, 0],
                    "scale": 1.5
                }
            }]
        });
        let entries = normalize_models(&raw);
        let preset = entries[0].accessory.as_ref().unwrap();
        assert!(preset.enabled);
        assert_eq!(preset.asset.as_deref(), Some("asset/wings/angel.glb"));
        assert_eq!(preset.bone_hint.hint(), BoneHint::UpperChest);
        let placement = preset.placement.to_placement();
        assert!((placement.rotation.y - std::f32::consts::PI).abs() < 1e-6);
        assert_eq!(placement.scale.to_array(), [1.5, 1.5, 1.5]);
    }

    #[test]
    fn test_preset_saved_into_empty_storage_keeps_other_models() {
        let seed = normalize_models(&json!(["vrm/a.vrm", "vrm/b.vrm"]));
        let placement = Placement::from_arrays([0.0, 0.2, -0.1], [0.0, std::f32::consts::PI, 0.0], [1.5; 3]);
        let mut entry = seed[1].clone();
        entry.accessory = Some(AccessoryPreset::from_placement(
            "wings/angel.glb",
            BoneHint::UpperChest,
            &placement,
        ));

        let saved = upsert_character(None, &seed, &entry);
        let models = Manifest::models_from_json_str(&saved).unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].path, "vrm/a.vrm");
        assert!(models[0].accessory.is_none());

        let preset = models[1].accessory.as_ref().unwrap();
        assert!(preset.enabled);
        assert_eq!(preset.asset.as_deref(), Some("wings/angel.glb"));
        assert_eq!(preset.bone_hint.hint(), BoneHint::UpperChest);
        assert!((preset.placement.rotation_degrees[1] - 180.0).abs() < 1e-3);
        assert!(preset.placement.to_placement().approx_eq(&placement, 1e-5));
    }

    #[test]
    fn test_preset_upserts_by_id_and_keeps_unknown_fields() {
        let stored = json!({
            "characters": [
                {"id": "abbey", "vrm": "vrm/abbey.vrm", "voice": "alto"},
                {"id": "bo", "path": "vrm/bo.vrm"}
            ]
        })
        .to_string();
        let entry = ModelEntry {
            id: "abbey".into(),
            name: "Abbey".into(),
            path: "vrm/abbey.vrm".into(),
            accessory: Some(AccessoryPreset::from_placement(
                "wings/w.glb",
                BoneHint::Chest,
                &Placement::IDENTITY,
            )),
        };
        let newcomer = ModelEntry {
            id: "cy".into(),
            name: "Cy".into(),
            path: "vrm/cy.vrm".into(),
            accessory: None,
        };

        let saved = upsert_character(Some(&stored), &[], &entry);
        let saved = upsert_character(Some(&saved), &[], &newcomer);
        let raw: Value = serde_json::from_str(&saved).unwrap();
        let characters = raw["characters"].as_array().unwrap();
        assert_eq!(characters.len(), 3);
        assert_eq!(characters[0]["voice"], "alto");
        assert_eq!(characters[0]["wings"]["boneHint"], "Chest");
        assert_eq!(characters[2]["id"], "cy");

        let models = normalize_models(&raw);
        assert_eq!(models[0].accessory.as_ref().map(|p| p.enabled), Some(true));
    }

    #[test]
    fn test_malformed_storage_starts_from_seed() {
        let seed = normalize_models(&json!(["vrm/a.vrm"]));
        let saved = upsert_character(Some("{not json"), &seed, &seed[0]);
        let models = Manifest::models_from_json_str(&saved).unwrap();
        assert_eq!(models, seed);
    }

    #[test]
    fn test_from_json_str() {
        let models = Manifest::models_from_json_str(r#"["m/a.vrm"]"#).unwrap();
        assert_eq!(models[0].name, "a.vrm");
        assert!(Manifest::models_from_json_str("{not json").is_err());
    }

    #[test]
    fn test_lookup_by_id() {
        let manifest = Manifest {
            models: normalize_models(&json!(["a.glb", "b.glb"])),
            accessories: normalize_accessories(&json!(["w.glb"])),
        };
        assert_eq!(manifest.model("m1").map(|m| m.path.as_str()), Some("b.glb"));
        assert_eq!(manifest.accessory("w0").map(|a| a.path.as_str()), Some("w.glb"));
        assert!(manifest.model("missing").is_none());
    }
}
