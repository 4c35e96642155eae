//! Viewer configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::adjust::{AdjustRates, ScaleLimits};
use crate::anchor::BoneHint;
use crate::gizmo::DragSensitivity;
use crate::transform::Placement;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub manifests: ManifestsConfig,
    #[serde(default)]
    pub attachment: AttachmentConfig,
    #[serde(default)]
    pub adjust: AdjustConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub scene: SceneConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestsConfig {
    /// Model manifest URLs, tried in order until one parses
    #[serde(default = "default_model_manifests")]
    pub models: Vec<String>,
    /// Accessory manifest URLs, tried in order
    #[serde(default = "default_accessory_manifests")]
    pub accessories: Vec<String>,
}

impl Default for ManifestsConfig {
    fn default() -> Self {
        Self {
            models: default_model_manifests(),
            accessories: default_accessory_manifests(),
        }
    }
}

fn default_model_manifests() -> Vec<String> {
    vec![
        "../../data/models.json".to_string(),
        "../data/models.json".to_string(),
        "./data/models.json".to_string(),
    ]
}

fn default_accessory_manifests() -> Vec<String> {
    vec![
        "../../data/wings.json".to_string(),
        "../data/wings.json".to_string(),
        "./data/wings.json".to_string(),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentConfig {
    /// Anchor hint when the model carries no preset
    #[serde(default = "default_bone_hint")]
    pub bone_hint: String,
    #[serde(default = "default_position")]
    pub position: [f32; 3],
    /// Euler XYZ, radians
    #[serde(default = "default_rotation")]
    pub rotation: [f32; 3],
    #[serde(default = "default_scale")]
    pub scale: [f32; 3],
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            bone_hint: default_bone_hint(),
            position: default_position(),
            rotation: default_rotation(),
            scale: default_scale(),
        }
    }
}

impl AttachmentConfig {
    pub fn hint(&self) -> BoneHint {
        BoneHint::from_label(&self.bone_hint)
    }

    pub fn offset(&self) -> Placement {
        Placement::from_arrays(self.position, self.rotation, self.scale)
    }
}

fn default_bone_hint() -> String {
    "Chest".to_string()
}

fn default_position() -> [f32; 3] {
    [0.0, 0.2, -0.05]
}

fn default_rotation() -> [f32; 3] {
    [0.0, std::f32::consts::PI, 0.0]
}

fn default_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustConfig {
    /// Metres per second at full stick
    #[serde(default = "default_move_rate")]
    pub move_rate: f32,
    /// Radians per second at full stick
    #[serde(default = "default_yaw_rate")]
    pub yaw_rate: f32,
    #[serde(default = "default_lift_rate")]
    pub lift_rate: f32,
    #[serde(default = "default_scale_rate")]
    pub scale_rate: f32,
    #[serde(default = "default_scale_min")]
    pub scale_min: f32,
    #[serde(default = "default_scale_max")]
    pub scale_max: f32,
    /// Frame deltas above this are truncated (seconds)
    #[serde(default = "default_max_dt")]
    pub max_dt: f32,
    #[serde(default)]
    pub drag: DragSensitivity,
    /// Controller adjust mode active before the first toggle
    #[serde(default = "default_true")]
    pub start_enabled: bool,
}

impl Default for AdjustConfig {
    fn default() -> Self {
        Self {
            move_rate: default_move_rate(),
            yaw_rate: default_yaw_rate(),
            lift_rate: default_lift_rate(),
            scale_rate: default_scale_rate(),
            scale_min: default_scale_min(),
            scale_max: default_scale_max(),
            max_dt: default_max_dt(),
            drag: DragSensitivity::default(),
            start_enabled: true,
        }
    }
}

impl AdjustConfig {
    pub fn scale_limits(&self) -> ScaleLimits {
        ScaleLimits {
            min: self.scale_min.min(self.scale_max),
            max: self.scale_max.max(self.scale_min),
        }
    }

    pub fn rates(&self) -> AdjustRates {
        AdjustRates {
            move_per_sec: self.move_rate,
            yaw_per_sec: self.yaw_rate,
            lift_per_sec: self.lift_rate,
            scale_per_sec: self.scale_rate,
            scale_limits: self.scale_limits(),
            max_dt: if self.max_dt.is_finite() && self.max_dt >= 0.0 {
                self.max_dt
            } else {
                default_max_dt()
            },
        }
    }
}

fn default_move_rate() -> f32 {
    0.5
}

fn default_yaw_rate() -> f32 {
    2.0
}

fn default_lift_rate() -> f32 {
    0.6
}

fn default_scale_rate() -> f32 {
    1.0
}

fn default_scale_min() -> f32 {
    0.05
}

fn default_scale_max() -> f32 {
    3.0
}

fn default_max_dt() -> f32 {
    0.05
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Id used for rigs loaded without a manifest entry
    #[serde(default = "default_fallback_id")]
    pub fallback_id: String,
    /// Key holding a manifest JSON that replaces the fetched one
    #[serde(default = "default_manifest_override_key")]
    pub manifest_override_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
            fallback_id: default_fallback_id(),
            manifest_override_key: default_manifest_override_key(),
        }
    }
}

fn default_key_prefix() -> String {
    "wingPlacement:".to_string()
}

fn default_fallback_id() -> String {
    "avatar".to_string()
}

fn default_manifest_override_key() -> String {
    "plumage.models.json".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Idle wing flap on the accessory mesh
    #[serde(default)]
    pub flap: bool,
    /// Yaw applied to loaded rigs so they face the default camera
    #[serde(default = "default_rig_yaw")]
    pub rig_yaw: f32,
    /// Rescale each accessory mesh so its bounding-box width matches this
    /// many meters. Unset keeps the asset's own size.
    #[serde(default)]
    pub accessory_width: Option<f32>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            flap: false,
            rig_yaw: default_rig_yaw(),
            accessory_width: None,
        }
    }
}

fn default_rig_yaw() -> f32 {
    std::f32::consts::PI
}

impl ViewerConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from file, or defaults if it doesn't exist
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config = Self::from_toml(&content)?;
            tracing::info!(path = %path.display(), "Loaded configuration");
            Ok(config)
        } else {
            tracing::info!(
                path = %path.display(),
                "Configuration file not found, using defaults"
            );
            Ok(Self::default())
        }
    }
}
