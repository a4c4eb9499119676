//! JSON-RPC 2.0 bridge to the host page running the WebXR session.
//!
//! The engine never touches `navigator.xr` itself. The host page owns the
//! session and forwards what happens as notifications; the engine answers
//! with requests for sessions and hit-test streams plus UI notifications.
//!
//! ## Message Flow
//!
//! ```text
//! Host page (WebXR)      <──postMessage──>  Bevy (iframe)
//!        │                                        │
//!        ├─ xr_capabilities / xr_start ─────────> │
//!        │ <──────────────── xr_request_session ──┤
//!        ├─ xr_session_started ─────────────────> │
//!        ├─ input_source_added / _pose / select ─> │
//!        │ <──────────────────── hit_test_start ──┤
//!        ├─ hit_test_started / hit_test_result ──> │
//!        │ <─────────────────── placement_prompt ─┤
//!        │ <──────────────── placement_completed ─┤
//! ```
//!
//! ## Incoming Methods
//!
//! ### Session
//! - `xr_capabilities`: what the device supports
//! - `xr_start`: user gesture picked AR or VR
//! - `xr_session_started`, `xr_session_failed`, `xr_session_ended`
//! - `hit_test_available`: hit-test sources can be requested
//!
//! ### Input
//! - `input_source_added`, `input_source_removed`, `input_source_pose`
//! - `select`: start / select / end for one source
//! - `gamepads`: platform gamepad axes
//! - `camera_pose`: viewer position and forward vector
//!
//! ### Hit Testing
//! - `hit_test_started`: stream creation result, `error` set on failure
//! - `hit_test_result`: one hit for a stream
//!
//! ### Queries
//! - `get_placement_state`, `get_session_state`
//!
//! ### Scene
//! - `room_reload`: rebuild the room from its layout
//!
//! ## Error Handling
//!
//! - `-32601`: Method not found
//! - `-32602`: Invalid params
//!
//! Notifications never get a response; decode failures on them are logged.

/// JSON-RPC 2.0 transport, decoding and dispatch into typed events.
pub mod web_rpc;
