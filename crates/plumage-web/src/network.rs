//! Manifest fetching and startup auto-load
//!
//! Each manifest kind has an ordered candidate list; the first URL that
//! fetches and parses wins. A model listing stored under the override key in
//! `localStorage` replaces the fetched one.

use bevy::prelude::*;
use plumage_core::{AccessoryEntry, Manifest, ModelEntry, ViewerSession};
use plumage_scene::{AutoAccessory, Notices, PendingLoads, Session, ViewerSettings};
use std::sync::{Arc, Mutex};

use crate::config::StartupOptions;
use crate::storage::Placements;

pub struct ManifestPlugin;

/// A finished manifest fetch; the error names why every candidate failed
#[derive(Debug, Clone)]
pub enum FetchedManifest {
    Models(Result<Vec<ModelEntry>, String>),
    Accessories(Result<Vec<AccessoryEntry>, String>),
}

/// Resource for pending manifest results from async fetch
#[derive(Resource, Default)]
pub struct PendingManifests(pub Arc<Mutex<Vec<FetchedManifest>>>);

/// Whether the first rig has been requested
#[derive(Resource, Default)]
pub struct StartupLoad {
    pub done: bool,
}

impl Plugin for ManifestPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PendingManifests>()
            .init_resource::<StartupLoad>()
            .add_systems(Startup, fetch_manifests)
            .add_systems(Update, process_manifests);
    }
}

/// Model listing saved under the override key, if any parses
fn stored_models(placements: &Placements, key: &str) -> Option<Vec<ModelEntry>> {
    let content = match placements.store().get(key) {
        Ok(content) => content?,
        Err(e) => {
            tracing::warn!("Failed to read manifest override: {}", e);
            return None;
        }
    };
    match Manifest::models_from_json_str(&content) {
        Ok(models) => {
            tracing::info!("Using model manifest from storage key {}", key);
            Some(models)
        }
        Err(e) => {
            tracing::warn!("Ignoring malformed manifest override: {}", e);
            None
        }
    }
}

fn fetch_manifests(
    pending: Res<PendingManifests>,
    settings: Res<ViewerSettings>,
    placements: Res<Placements>,
) {
    let overridden = stored_models(&placements, &settings.storage.manifest_override_key);
    let fetch_models = overridden.is_none();
    if let Some(models) = overridden {
        if let Ok(mut queue) = pending.0.lock() {
            queue.push(FetchedManifest::Models(Ok(models)));
        }
    }

    #[cfg(target_arch = "wasm32")]
    {
        use wasm_bindgen_futures::spawn_local;

        if fetch_models {
            let pending_clone = pending.0.clone();
            let candidates = settings.manifests.models.clone();
            spawn_local(async move {
                let models = fetch_first(candidates, Manifest::models_from_json_str).await;
                if let Ok(mut queue) = pending_clone.lock() {
                    queue.push(FetchedManifest::Models(models));
                }
            });
        }

        let pending_clone = pending.0.clone();
        let candidates = settings.manifests.accessories.clone();
        spawn_local(async move {
            let accessories = fetch_first(candidates, Manifest::accessories_from_json_str).await;
            if let Ok(mut queue) = pending_clone.lock() {
                queue.push(FetchedManifest::Accessories(accessories));
            }
        });
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        tracing::info!("Manifest fetch not available in native mode");
        let reason = || "manifest fetch is not available in native builds".to_string();
        if let Ok(mut queue) = pending.0.lock() {
            if fetch_models {
                queue.push(FetchedManifest::Models(Err(reason())));
            }
            queue.push(FetchedManifest::Accessories(Err(reason())));
        }
    }
}

/// Try each URL in turn, returning the first listing that parses or the
/// last failure
#[cfg(target_arch = "wasm32")]
async fn fetch_first<T, E: std::fmt::Display>(
    candidates: Vec<String>,
    parse: fn(&str) -> Result<T, E>,
) -> Result<T, String> {
    let mut last_error = String::from("no manifest URLs configured");
    for url in &candidates {
        tracing::info!("Fetching manifest from: {}", url);
        let response = match gloo_net::http::Request::get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Failed to fetch {}: {:?}", url, e);
                last_error = format!("{}: {}", url, e);
                continue;
            }
        };
        if !response.ok() {
            tracing::debug!("{} returned {}", url, response.status());
            last_error = format!("{}: HTTP {}", url, response.status());
            continue;
        }
        match response.text().await {
            Ok(text) => match parse(&text) {
                Ok(listing) => return Ok(listing),
                Err(e) => {
                    tracing::warn!("Unparseable manifest at {}: {}", url, e);
                    last_error = format!("{}: {}", url, e);
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {:?}", url, e);
                last_error = format!("{}: {}", url, e);
            }
        }
    }
    Err(format!("{} (tried {})", last_error, candidates.join(", ")))
}

/// Hand one fetched listing to the session. Failures become status text
/// and leave an empty listing. Returns true for the model listing.
pub fn apply_manifest(
    manifest: FetchedManifest,
    session: &mut ViewerSession,
    notices: &mut Notices,
) -> bool {
    match manifest {
        FetchedManifest::Models(models) => {
            let models = models.unwrap_or_else(|reason| {
                tracing::error!("Model manifest unavailable: {}", reason);
                notices.status(format!("Manifest error: {}", reason));
                Vec::new()
            });
            session.set_models(models);
            true
        }
        FetchedManifest::Accessories(accessories) => {
            let accessories = accessories.unwrap_or_else(|reason| {
                tracing::error!("Accessory manifest unavailable: {}", reason);
                notices.status(format!("Manifest error: {}", reason));
                Vec::new()
            });
            session.set_accessories(accessories);
            false
        }
    }
}

/// Drain fetched manifests into the session and kick off the first load
fn process_manifests(
    pending: Res<PendingManifests>,
    mut loads: ResMut<PendingLoads>,
    mut session: ResMut<Session>,
    mut notices: ResMut<Notices>,
    mut auto: ResMut<AutoAccessory>,
    mut startup_load: ResMut<StartupLoad>,
    startup: Res<StartupOptions>,
    asset_server: Res<AssetServer>,
) {
    let fetched = {
        if let Ok(mut queue) = pending.0.lock() {
            std::mem::take(&mut *queue)
        } else {
            Vec::new()
        }
    };

    for manifest in fetched {
        let is_models = apply_manifest(manifest, &mut session, &mut notices);
        if is_models && !startup_load.done {
            startup_load.done = true;
            auto_load(
                &startup,
                &mut session,
                &mut loads,
                &mut notices,
                &mut auto,
                &asset_server,
            );
        }
    }
}

/// A `?vrm=` path wins over the first manifest model; `?wings=` follows
/// whichever rig that is
fn auto_load(
    startup: &StartupOptions,
    session: &mut Session,
    loads: &mut PendingLoads,
    notices: &mut Notices,
    auto: &mut AutoAccessory,
    asset_server: &AssetServer,
) {
    auto.0 = startup.accessory_path.clone();
    if let Some(path) = &startup.model_path {
        let request = session.request_model_path(path);
        loads.load_rig(asset_server, request);
        return;
    }

    let Some(first) = session.manifest().models.first().map(|m| m.id.clone()) else {
        return;
    };
    match session.request_model(&first) {
        Ok(request) => loads.load_rig(asset_server, request),
        Err(err) => notices.error(&err),
    }
}
