//! Placement persistence for the browser build

use bevy::prelude::*;
use plumage_core::{KeyValueStore, MemoryStore, PlacementStore};
#[cfg(target_arch = "wasm32")]
use plumage_core::StoreError;

pub type DynStore = Box<dyn KeyValueStore + Send + Sync>;

/// Saved placements, backed by `localStorage` when the page has it
#[derive(Resource, Deref, DerefMut)]
pub struct Placements(pub PlacementStore<DynStore>);

impl Default for Placements {
    fn default() -> Self {
        Self(PlacementStore::new(default_store()))
    }
}

#[cfg(target_arch = "wasm32")]
fn default_store() -> DynStore {
    match LocalStorageStore::storage() {
        Ok(_) => Box::new(LocalStorageStore),
        Err(e) => {
            tracing::warn!("{}; placements will not survive a reload", e);
            Box::new(MemoryStore::new())
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn default_store() -> DynStore {
    match plumage_core::FileStore::open("plumage-placements.json") {
        Ok(store) => Box::new(store),
        Err(e) => {
            tracing::warn!("Placement file unavailable ({}), keeping placements in memory", e);
            Box::new(MemoryStore::new())
        }
    }
}

/// `window.localStorage`. The handle is looked up per call since JS values
/// cannot live in a resource.
#[cfg(target_arch = "wasm32")]
pub struct LocalStorageStore;

#[cfg(target_arch = "wasm32")]
impl LocalStorageStore {
    fn storage() -> Result<web_sys::Storage, StoreError> {
        let window =
            web_sys::window().ok_or_else(|| StoreError::Unavailable("no window".to_string()))?;
        window
            .local_storage()
            .map_err(|e| StoreError::Unavailable(format!("{:?}", e)))?
            .ok_or_else(|| StoreError::Unavailable("localStorage is disabled".to_string()))
    }
}

#[cfg(target_arch = "wasm32")]
fn js_error(e: wasm_bindgen::JsValue) -> StoreError {
    StoreError::Unavailable(format!("{:?}", e))
}

#[cfg(target_arch = "wasm32")]
impl KeyValueStore for LocalStorageStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Self::storage()?.get_item(key).map_err(js_error)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        // Quota errors surface here
        Self::storage()?.set_item(key, value).map_err(js_error)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        Self::storage()?.remove_item(key).map_err(js_error)
    }
}
