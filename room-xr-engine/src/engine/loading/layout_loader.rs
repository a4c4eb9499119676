use bevy::asset::LoadState;
use bevy::prelude::*;

use crate::engine::assets::room_layout::RoomLayout;
use crate::engine::scene::room::{RoomAnchor, RoomReloadEvent, build_room, teardown_room};
use crate::tools::placement::state::PlacementSession;

/// Room layout shipped with the viewer, relative to the asset root.
pub const ROOM_LAYOUT_PATH: &str = "room/apartment.room.json";

/// Tracks the layout asset and the content built from it.
#[derive(Resource, Default)]
pub struct LayoutLoader {
    handle: Option<Handle<RoomLayout>>,
    content: Option<Entity>,
    failed: bool,
}

impl LayoutLoader {
    pub fn is_built(&self) -> bool {
        self.content.is_some()
    }

    pub fn content(&self) -> Option<Entity> {
        self.content
    }
}

pub fn start_loading(mut loader: ResMut<LayoutLoader>, server: Res<AssetServer>) {
    info!("Loading room layout from: {}", ROOM_LAYOUT_PATH);
    loader.handle = Some(server.load(ROOM_LAYOUT_PATH));
}

/// Build the room once its layout is available, and again after a reload.
pub fn build_room_when_ready(
    mut commands: Commands,
    mut loader: ResMut<LayoutLoader>,
    server: Res<AssetServer>,
    layouts: Res<Assets<RoomLayout>>,
    session: Res<PlacementSession>,
    anchors: Query<Entity, With<RoomAnchor>>,
) {
    if loader.is_built() || loader.failed {
        return;
    }
    let Some(handle) = loader.handle.clone() else {
        return;
    };
    let Some(layout) = layouts.get(&handle) else {
        if let LoadState::Failed(err) = server.load_state(&handle) {
            error!("Room layout failed to load: {err}");
            loader.failed = true;
        }
        return;
    };
    let Ok(anchor) = anchors.single() else {
        return;
    };

    // Reloads during exploration keep the room on screen.
    let content = build_room(&mut commands, &server, anchor, layout, session.is_locked());
    commands.insert_resource(layout.clone());
    loader.content = Some(content);
}

/// Tear the room down so `build_room_when_ready` rebuilds it from the
/// current layout asset.
pub fn handle_room_reload(
    mut commands: Commands,
    mut events: EventReader<RoomReloadEvent>,
    mut loader: ResMut<LayoutLoader>,
) {
    if events.read().last().is_none() {
        return;
    }
    if let Some(content) = loader.content.take() {
        info!("Reloading room layout");
        teardown_room(&mut commands, content);
    }
    loader.failed = false;
}
