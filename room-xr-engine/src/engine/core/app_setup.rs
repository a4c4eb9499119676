use bevy::asset::AssetMetaCheck;
use bevy::prelude::*;
use bevy_common_assets::json::JsonAssetPlugin;

use crate::engine::assets::room_layout::RoomLayout;
use crate::engine::core::app_state::{
    AppState, FrameSet, configure_frame_sets, log_state_changes, transition_to_start_screen,
};
use crate::engine::core::window_config::create_window_config;
use crate::engine::loading::layout_loader::{
    LayoutLoader, build_room_when_ready, handle_room_reload, start_loading,
};
use crate::engine::scene::room::{propagate_splat_layers, spawn_room_anchor, spawn_viewer_camera};
use crate::engine::scene::ui::{set_start_hint_visibility, show_unavailable_view, spawn_prompt_panels};
use crate::rpc::web_rpc::HostBridgePlugin;
use crate::tools::locomotion::LocomotionPlugin;
use crate::tools::placement::PlacementPlugin;
use crate::tools::triggers::TriggerPlugin;
use crate::tools::triggers::volumes::flush_layer_ops;
use crate::xr::XrPlugin;

#[cfg(not(target_arch = "wasm32"))]
use crate::engine::scene::ui::start_with_keyboard;

pub fn create_app() -> App {
    let mut app = App::new();

    app.add_plugins(create_default_plugins())
        .init_state::<AppState>()
        // Registers RoomLayout as a loadable asset type from *.room.json files.
        .add_plugins(JsonAssetPlugin::<RoomLayout>::new(&["room.json"]))
        .add_plugins(HostBridgePlugin)
        .add_plugins(XrPlugin)
        .add_plugins(PlacementPlugin)
        .add_plugins(LocomotionPlugin)
        .add_plugins(TriggerPlugin);

    configure_frame_sets(&mut app);

    app.init_resource::<LayoutLoader>();

    app.add_systems(
        Startup,
        (
            spawn_viewer_camera,
            spawn_room_anchor,
            spawn_prompt_panels,
            start_loading,
        )
            .chain(),
    )
    .add_systems(
        Update,
        (handle_room_reload, build_room_when_ready)
            .chain()
            .in_set(FrameSet::Session),
    )
    .add_systems(
        Update,
        transition_to_start_screen.run_if(in_state(AppState::Loading)),
    )
    .add_systems(Update, log_state_changes)
    .add_systems(PostUpdate, propagate_splat_layers.after(flush_layer_ops))
    .add_systems(
        OnEnter(AppState::StartScreen),
        set_start_hint_visibility::<true>,
    )
    .add_systems(
        OnExit(AppState::StartScreen),
        set_start_hint_visibility::<false>,
    )
    .add_systems(OnEnter(AppState::Unavailable), show_unavailable_view);

    #[cfg(not(target_arch = "wasm32"))]
    {
        app.add_systems(
            Update,
            start_with_keyboard
                .in_set(FrameSet::Receive)
                .run_if(in_state(AppState::StartScreen)),
        );
    }

    app
}

fn create_default_plugins() -> impl PluginGroup {
    let window_config = WindowPlugin {
        primary_window: Some(create_window_config()),
        ..default()
    };

    let asset_config = AssetPlugin {
        meta_check: AssetMetaCheck::Never,
        ..default()
    };

    DefaultPlugins.set(window_config).set(asset_config)
}
