//! Plumage Web - browser frontend for the accessory viewer
//!
//! Fetches the model and accessory manifests, runs the Bevy scene and keeps
//! saved placements in `localStorage`.

mod app;
mod config;
mod network;
mod storage;
mod ui;

use wasm_bindgen::prelude::*;

/// Entry point for WASM module
#[wasm_bindgen(start)]
pub fn main() {
    // Set panic hook for better error messages
    console_error_panic_hook::set_once();

    let startup = config::StartupOptions::from_browser();

    // ?debug=1 opens up the log, otherwise keep wgpu noise down
    let level = if startup.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(level)
            .build(),
    );

    let mut viewer_config = config::load_config();
    startup.apply(&mut viewer_config);

    app::run(viewer_config, startup);
}
