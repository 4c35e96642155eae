//! Rig and accessory loading
//!
//! Load requests come from the session as tickets. Each pending glTF is
//! polled until it resolves; the session decides whether the result is still
//! wanted, so an older request finishing late is dropped.

use bevy::asset::LoadState;
use bevy::gltf::Gltf;
use bevy::prelude::*;
use plumage_core::{AccessoryTarget, LoadRequest, LoadTicket, RigTarget};

use crate::types::{ActiveRig, Attachments, AutoAccessory, Notices, RigRoot, Session, ViewerSettings};

/// glTF handles still resolving
#[derive(Resource, Default)]
pub struct PendingLoads {
    pub rigs: Vec<PendingRig>,
    pub accessories: Vec<PendingAccessory>,
}

pub struct PendingRig {
    pub ticket: LoadTicket,
    pub target: RigTarget,
    pub handle: Handle<Gltf>,
}

pub struct PendingAccessory {
    pub ticket: LoadTicket,
    pub target: AccessoryTarget,
    pub handle: Handle<Gltf>,
    /// Scene extracted once the glTF resolved
    pub scene: Option<Handle<Scene>>,
}

impl PendingLoads {
    pub fn load_rig(&mut self, asset_server: &AssetServer, request: LoadRequest<RigTarget>) {
        let path = asset_path(&request.target.path);
        tracing::info!("Starting to load rig: {}", path);
        self.rigs.push(PendingRig {
            ticket: request.ticket,
            handle: asset_server.load(path),
            target: request.target,
        });
    }

    pub fn load_accessory(
        &mut self,
        asset_server: &AssetServer,
        request: LoadRequest<AccessoryTarget>,
    ) {
        let path = asset_path(&request.target.path);
        tracing::info!("Starting to load accessory: {}", path);
        self.accessories.push(PendingAccessory {
            ticket: request.ticket,
            handle: asset_server.load(path),
            target: request.target,
            scene: None,
        });
    }
}

/// Map a manifest path onto the asset server root.
///
/// URLs pass through untouched. Relative paths are resolved against the page
/// root, so leading `./`, `../` and `/` segments are dropped.
pub fn asset_path(path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let mut rest = path.trim();
    loop {
        if let Some(stripped) = rest.strip_prefix("./") {
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix("../") {
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix('/') {
            rest = stripped;
        } else {
            break;
        }
    }
    rest.to_string()
}

enum Resolved {
    Pending,
    Scene(Handle<Scene>),
    Failed(String),
}

fn resolve(handle: &Handle<Gltf>, asset_server: &AssetServer, gltfs: &Assets<Gltf>) -> Resolved {
    match asset_server.get_load_state(handle.id()) {
        Some(LoadState::Loaded) => match gltfs.get(handle) {
            Some(gltf) => match gltf.default_scene.clone().or_else(|| gltf.scenes.first().cloned()) {
                Some(scene) => Resolved::Scene(scene),
                None => Resolved::Failed("model has no scene".to_string()),
            },
            None => Resolved::Pending,
        },
        Some(LoadState::Failed(err)) => Resolved::Failed(err.to_string()),
        _ => Resolved::Pending,
    }
}

/// Spawn rigs whose glTF resolved, replacing the previous one
pub fn poll_rig_loads(
    mut commands: Commands,
    mut pending: ResMut<PendingLoads>,
    mut session: ResMut<Session>,
    mut attachments: ResMut<Attachments>,
    mut active: ResMut<ActiveRig>,
    mut notices: ResMut<Notices>,
    mut auto: ResMut<AutoAccessory>,
    settings: Res<ViewerSettings>,
    asset_server: Res<AssetServer>,
    gltfs: Res<Assets<Gltf>>,
) {
    let mut still_pending = Vec::new();
    for rig in std::mem::take(&mut pending.rigs) {
        match resolve(&rig.handle, &asset_server, &gltfs) {
            Resolved::Pending => still_pending.push(rig),
            Resolved::Failed(reason) => {
                if let Some(err) = session.rig_failed(rig.ticket, reason) {
                    notices.error(&err);
                }
            }
            Resolved::Scene(scene) => {
                if !session.rig_loaded(rig.ticket) {
                    continue;
                }

                if let Some(old) = active.0.take() {
                    attachments.detach(&old);
                    commands.entity(old).despawn();
                }

                let entity = commands
                    .spawn((
                        SceneRoot(scene),
                        Transform::from_rotation(Quat::from_rotation_y(settings.scene.rig_yaw)),
                        RigRoot {
                            path: rig.target.path.clone(),
                        },
                        Name::new("rig"),
                    ))
                    .id();
                active.0 = Some(entity);
                notices.status(format!("Loaded {}", rig.target.path));

                // A model preset or a startup path names the accessory to follow
                let follow = auto
                    .0
                    .take()
                    .or_else(|| session.preset_accessory_path().map(str::to_string));
                if let Some(path) = follow {
                    match session.request_accessory_path(&path) {
                        Ok(request) => pending.load_accessory(&asset_server, request),
                        Err(err) => notices.error(&err),
                    }
                }
            }
        }
    }
    pending.rigs.extend(still_pending);
}

/// Resolve accessory glTFs. Attaching happens in
/// [`crate::attachment::attach_ready_accessories`] once the rig is ready.
pub fn poll_accessory_loads(
    mut pending: ResMut<PendingLoads>,
    mut session: ResMut<Session>,
    mut notices: ResMut<Notices>,
    asset_server: Res<AssetServer>,
    gltfs: Res<Assets<Gltf>>,
) {
    let mut still_pending = Vec::new();
    for mut accessory in std::mem::take(&mut pending.accessories) {
        if accessory.scene.is_some() {
            still_pending.push(accessory);
            continue;
        }
        match resolve(&accessory.handle, &asset_server, &gltfs) {
            Resolved::Pending => still_pending.push(accessory),
            Resolved::Failed(reason) => {
                if let Some(err) = session.accessory_failed(accessory.ticket, reason) {
                    notices.error(&err);
                }
            }
            Resolved::Scene(scene) => {
                accessory.scene = Some(scene);
                still_pending.push(accessory);
            }
        }
    }
    pending.accessories = still_pending;
}
