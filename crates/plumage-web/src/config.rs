//! Startup configuration: the embedded TOML plus URL query overrides
//!
//! Recognized query parameters:
//! - `vrm` - rig path to load instead of the first manifest model
//! - `wings` - accessory path to attach once that rig is live
//! - `models` / `accessories` - manifest URL tried before the configured ones
//! - `debug=1` - verbose logging

use bevy::prelude::*;
use plumage_core::ViewerConfig;

const EMBEDDED_CONFIG: &str = include_str!("../plumage.toml");

/// Parse the configuration bundled into the build, falling back to defaults
pub fn load_config() -> ViewerConfig {
    match ViewerConfig::from_toml(EMBEDDED_CONFIG) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Embedded configuration is invalid, using defaults: {}", e);
            ViewerConfig::default()
        }
    }
}

/// Options read from the page URL
#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct StartupOptions {
    pub model_path: Option<String>,
    pub accessory_path: Option<String>,
    pub models_manifest: Option<String>,
    pub accessories_manifest: Option<String>,
    pub debug: bool,
}

impl StartupOptions {
    #[cfg(target_arch = "wasm32")]
    pub fn from_browser() -> Self {
        let Some(window) = web_sys::window() else {
            return Self::default();
        };
        match window.location().search() {
            Ok(search) => Self::from_search(&search),
            Err(_) => Self::default(),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_browser() -> Self {
        Self::default()
    }

    /// Read options from a `?key=value&...` string
    pub fn from_search(search: &str) -> Self {
        let non_empty = |param: &str| Self::parse_query_param(search, param).filter(|v| !v.is_empty());
        Self {
            model_path: non_empty("vrm"),
            accessory_path: non_empty("wings"),
            models_manifest: non_empty("models"),
            accessories_manifest: non_empty("accessories"),
            debug: matches!(
                Self::parse_query_param(search, "debug").as_deref(),
                Some("1") | Some("true")
            ),
        }
    }

    /// Put URL-supplied manifests ahead of the configured candidates
    pub fn apply(&self, config: &mut ViewerConfig) {
        if let Some(url) = &self.models_manifest {
            config.manifests.models.retain(|m| m != url);
            config.manifests.models.insert(0, url.clone());
        }
        if let Some(url) = &self.accessories_manifest {
            config.manifests.accessories.retain(|m| m != url);
            config.manifests.accessories.insert(0, url.clone());
        }
    }

    /// Parse a query parameter from a search string, percent- and
    /// plus-decoded the same way the browser's `URLSearchParams` does
    fn parse_query_param(search: &str, param: &str) -> Option<String> {
        let search = search.trim_start_matches('?');
        url::form_urlencoded::parse(search.as_bytes())
            .find(|(key, _)| key == param)
            .map(|(_, value)| value.into_owned())
    }
}
