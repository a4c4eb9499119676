use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::engine::core::app_state::FrameSet;
use crate::engine::scene::room::RoomReloadEvent;
use crate::tools::locomotion::gamepads::{GamepadSnapshot, HostGamepadsEvent};
use crate::tools::placement::state::PlacementSession;
use crate::xr::camera::CameraPoseEvent;
use crate::xr::error::XrError;
use crate::xr::hit_test::HitTestEvent;
use crate::xr::input_source::{
    InputPose, InputSourceDescriptor, InputSourceEvent, InputSourceId, SelectEvent, SelectPhase,
};
use crate::xr::session::{XrCapabilities, XrMode, XrSession, XrSessionEvent};
use crate::xr::subscription::HitTestRequestId;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::JsValue;

#[cfg(target_arch = "wasm32")]
use web_sys::{MessageEvent, window};

/// JSON-RPC 2.0 request structure. Notifications carry no `id`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub result: Option<serde_json::Value>,
    pub error: Option<RpcError>,
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 notification structure for one-way communication.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcNotification {
    pub jsonrpc: String,
    pub method: String,
    pub params: serde_json::Value,
}

/// JSON-RPC error structure following specification.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

/// Resource managing traffic between the engine and the host page.
///
/// On the web, inbound messages arrive through the window `message` listener;
/// native builds and tests push them with [`HostBridge::receive`].
#[derive(Resource, Default)]
pub struct HostBridge {
    inbound: Vec<String>,
    outgoing_notifications: Vec<RpcNotification>,
    outgoing_responses: Vec<RpcResponse>,
}

impl HostBridge {
    /// Send notification to the host without expecting a response.
    pub fn send_notification(&mut self, method: &str, params: serde_json::Value) {
        self.outgoing_notifications.push(RpcNotification {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
        });
    }

    /// Queue a raw JSON-RPC message as if the host had posted it.
    pub fn receive(&mut self, message: impl Into<String>) {
        self.inbound.push(message.into());
    }

    /// Notifications queued since the last flush.
    pub fn pending_notifications(&self) -> &[RpcNotification] {
        &self.outgoing_notifications
    }

    pub fn pending_responses(&self) -> &[RpcResponse] {
        &self.outgoing_responses
    }

    fn queue_response(&mut self, response: RpcResponse) {
        self.outgoing_responses.push(response);
    }
}

/// Plugin establishing the host bridge for iframe-based deployment.
pub struct HostBridgePlugin;

impl Plugin for HostBridgePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<HostBridge>()
            .add_event::<IncomingRpcMessage>()
            .add_event::<XrSessionEvent>()
            .add_event::<InputSourceEvent>()
            .add_event::<SelectEvent>()
            .add_event::<HitTestEvent>()
            .add_event::<HostGamepadsEvent>()
            .add_event::<CameraPoseEvent>()
            .add_event::<RoomReloadEvent>()
            .add_systems(
                Update,
                (process_incoming_messages, handle_rpc_messages)
                    .chain()
                    .in_set(FrameSet::Receive),
            )
            .add_systems(Update, send_outgoing_messages.in_set(FrameSet::Send));

        #[cfg(target_arch = "wasm32")]
        app.add_systems(Startup, setup_message_listener);
    }
}

#[cfg(target_arch = "wasm32")]
fn setup_message_listener(mut commands: Commands) {
    use std::sync::Arc;
    use std::sync::Mutex;

    let message_queue: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let queue_clone = message_queue.clone();

    let closure = Closure::wrap(Box::new(move |event: MessageEvent| {
        if let Ok(data) = event.data().dyn_into::<js_sys::JsString>() {
            let message_str: String = data.into();

            if message_str.contains("jsonrpc") {
                if let Ok(mut queue) = queue_clone.lock() {
                    queue.push(message_str);
                }
            }
        }
    }) as Box<dyn FnMut(MessageEvent)>);

    let Some(window) = window() else {
        error!("Window object not available, host bridge disabled");
        return;
    };
    if let Err(e) =
        window.add_event_listener_with_callback("message", closure.as_ref().unchecked_ref())
    {
        error!("Failed to register message listener: {:?}", e);
        return;
    }

    // Ownership moves to JS for the lifetime of the page.
    closure.forget();
    commands.insert_resource(MessageQueue(message_queue));
}

/// Thread-safe queue filled by the wasm message listener.
#[derive(Resource)]
struct MessageQueue(std::sync::Arc<std::sync::Mutex<Vec<String>>>);

/// Raw JSON-RPC text received from the host.
#[derive(Event)]
struct IncomingRpcMessage {
    content: String,
}

fn process_incoming_messages(
    message_queue: Option<Res<MessageQueue>>,
    mut bridge: ResMut<HostBridge>,
    mut message_events: EventWriter<IncomingRpcMessage>,
) {
    let mut messages = std::mem::take(&mut bridge.inbound);

    if let Some(queue_res) = message_queue {
        if let Ok(mut queue) = queue_res.0.lock() {
            messages.extend(std::mem::take(&mut *queue));
        }
    }

    for message_str in messages {
        message_events.write(IncomingRpcMessage {
            content: message_str,
        });
    }
}

/// Decoded host traffic, one variant per incoming method.
#[derive(Debug, Clone, PartialEq)]
pub enum HostMessage {
    Session(XrSessionEvent),
    InputSource(InputSourceEvent),
    Select(SelectEvent),
    HitTest(HitTestEvent),
    Gamepads(Vec<GamepadSnapshot>),
    CameraPose(CameraPoseEvent),
    RoomReload,
    /// Read-only query answered from engine state.
    PlacementStateQuery,
    SessionStateQuery,
}

/// Typed writers for every event the bridge can raise.
#[derive(SystemParam)]
pub struct HostEventWriters<'w> {
    session: EventWriter<'w, XrSessionEvent>,
    sources: EventWriter<'w, InputSourceEvent>,
    selects: EventWriter<'w, SelectEvent>,
    hit_tests: EventWriter<'w, HitTestEvent>,
    gamepads: EventWriter<'w, HostGamepadsEvent>,
    camera: EventWriter<'w, CameraPoseEvent>,
    reload: EventWriter<'w, RoomReloadEvent>,
}

impl HostEventWriters<'_> {
    fn dispatch(&mut self, message: HostMessage) {
        match message {
            HostMessage::Session(event) => {
                self.session.write(event);
            }
            HostMessage::InputSource(event) => {
                self.sources.write(event);
            }
            HostMessage::Select(event) => {
                self.selects.write(event);
            }
            HostMessage::HitTest(event) => {
                self.hit_tests.write(event);
            }
            HostMessage::Gamepads(pads) => {
                self.gamepads.write(HostGamepadsEvent(pads));
            }
            HostMessage::CameraPose(event) => {
                self.camera.write(event);
            }
            HostMessage::RoomReload => {
                self.reload.write(RoomReloadEvent);
            }
            HostMessage::PlacementStateQuery | HostMessage::SessionStateQuery => {}
        }
    }
}

fn handle_rpc_messages(
    mut events: EventReader<IncomingRpcMessage>,
    mut bridge: ResMut<HostBridge>,
    mut writers: HostEventWriters,
    placement: Res<PlacementSession>,
    session: Res<XrSession>,
) {
    for event in events.read() {
        let request = match serde_json::from_str::<RpcRequest>(&event.content) {
            Ok(request) => request,
            Err(parse_error) => {
                warn!("Dropping malformed host message: {}", parse_error);
                continue;
            }
        };
        debug!("Host message: {}", request.method);

        let decoded = decode_host_message(&request.method, &request.params);
        let result = match &decoded {
            Ok(HostMessage::PlacementStateQuery) => Ok(placement_state(&placement)),
            Ok(HostMessage::SessionStateQuery) => Ok(session_state(&session)),
            Ok(_) => Ok(serde_json::json!({ "success": true })),
            Err(error) => Err(error.clone()),
        };

        match decoded {
            Ok(message) => writers.dispatch(message),
            Err(ref error) if request.id.is_none() => {
                warn!("Host notification '{}' rejected: {}", request.method, error.message);
            }
            Err(_) => {}
        }

        // Only requests (with an id) get a response.
        if let Some(id) = request.id {
            bridge.queue_response(create_response(id, result));
        }
    }
}

fn placement_state(placement: &PlacementSession) -> serde_json::Value {
    serde_json::json!({
        "stage": placement.stage().as_str(),
        "center": placement.center().map(|c| c.to_array()),
        "locked": placement.is_locked(),
    })
}

fn session_state(session: &XrSession) -> serde_json::Value {
    serde_json::json!({
        "mode": session.mode,
        "active": session.is_active(),
        "hit_test_available": session.hit_test_available,
        "unavailable": session.unavailable.as_ref().map(|e| e.to_string()),
    })
}

#[derive(Deserialize)]
struct ModeParams {
    mode: String,
}

#[derive(Deserialize)]
struct MessageParams {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct SourceParams {
    id: InputSourceId,
}

#[derive(Deserialize)]
struct PoseParams {
    id: InputSourceId,
    origin: [f32; 3],
    direction: [f32; 3],
    #[serde(default = "identity_rotation")]
    rotation: [f32; 4],
    axes: Option<Vec<f32>>,
}

#[derive(Deserialize)]
struct SelectParams {
    id: InputSourceId,
    phase: SelectPhase,
}

#[derive(Deserialize)]
struct HitTestStartedParams {
    request: u64,
    error: Option<String>,
}

#[derive(Deserialize)]
struct HitTestResultParams {
    request: u64,
    position: [f32; 3],
    #[serde(default = "identity_rotation")]
    rotation: [f32; 4],
}

#[derive(Deserialize)]
struct CameraPoseParams {
    position: [f32; 3],
    forward: [f32; 3],
}

fn identity_rotation() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

fn quat_from_array(values: [f32; 4]) -> Quat {
    let q = Quat::from_array(values);
    if q.length_squared() > 0.0 {
        q.normalize()
    } else {
        Quat::IDENTITY
    }
}

fn parse<T: for<'de> Deserialize<'de>>(method: &str, params: &serde_json::Value) -> Result<T, RpcError> {
    serde_json::from_value::<T>(params.clone()).map_err(|e| {
        RpcError::from(XrError::Bridge(format!("invalid params for '{}': {}", method, e)))
    })
}

fn parse_mode(method: &str, params: &serde_json::Value) -> Result<XrMode, RpcError> {
    let parsed: ModeParams = parse(method, params)?;
    XrMode::from_string(&parsed.mode)
        .ok_or_else(|| RpcError::invalid_params(&format!("Unknown mode: {}", parsed.mode)))
}

/// Map a host method and its params onto a typed message.
pub fn decode_host_message(method: &str, params: &serde_json::Value) -> Result<HostMessage, RpcError> {
    let message = match method {
        "xr_capabilities" => {
            HostMessage::Session(XrSessionEvent::Capabilities(parse::<XrCapabilities>(method, params)?))
        }
        "xr_start" => HostMessage::Session(XrSessionEvent::StartRequested(parse_mode(method, params)?)),
        "xr_session_started" => HostMessage::Session(XrSessionEvent::Started(parse_mode(method, params)?)),
        "xr_session_failed" => {
            let parsed: MessageParams = parse(method, params)?;
            HostMessage::Session(XrSessionEvent::StartFailed(parsed.message))
        }
        "xr_session_ended" => HostMessage::Session(XrSessionEvent::Ended),
        "hit_test_available" => HostMessage::Session(XrSessionEvent::HitTestAvailable),
        "input_source_added" => {
            HostMessage::InputSource(InputSourceEvent::Added(parse::<InputSourceDescriptor>(method, params)?))
        }
        "input_source_removed" => {
            let parsed: SourceParams = parse(method, params)?;
            HostMessage::InputSource(InputSourceEvent::Removed(parsed.id))
        }
        "input_source_pose" => {
            let parsed: PoseParams = parse(method, params)?;
            HostMessage::InputSource(InputSourceEvent::Pose {
                id: parsed.id,
                pose: InputPose {
                    origin: Vec3::from_array(parsed.origin),
                    direction: Vec3::from_array(parsed.direction),
                    rotation: quat_from_array(parsed.rotation),
                },
                axes: parsed.axes,
            })
        }
        "select" => {
            let parsed: SelectParams = parse(method, params)?;
            HostMessage::Select(SelectEvent {
                source: parsed.id,
                phase: parsed.phase,
            })
        }
        "hit_test_started" => {
            let parsed: HitTestStartedParams = parse(method, params)?;
            HostMessage::HitTest(HitTestEvent::Started {
                request: HitTestRequestId(parsed.request),
                error: parsed.error,
            })
        }
        "hit_test_result" => {
            let parsed: HitTestResultParams = parse(method, params)?;
            HostMessage::HitTest(HitTestEvent::Result {
                request: HitTestRequestId(parsed.request),
                position: Vec3::from_array(parsed.position),
                rotation: quat_from_array(parsed.rotation),
            })
        }
        "gamepads" => HostMessage::Gamepads(parse::<Vec<GamepadSnapshot>>(method, params)?),
        "camera_pose" => {
            let parsed: CameraPoseParams = parse(method, params)?;
            HostMessage::CameraPose(CameraPoseEvent {
                position: Vec3::from_array(parsed.position),
                forward: Vec3::from_array(parsed.forward),
            })
        }
        "room_reload" => HostMessage::RoomReload,
        "get_placement_state" => HostMessage::PlacementStateQuery,
        "get_session_state" => HostMessage::SessionStateQuery,
        _ => {
            return Err(RpcError {
                code: -32601,
                message: "Method not found".to_string(),
                data: Some(serde_json::json!({ "method": method })),
            });
        }
    };
    Ok(message)
}

fn create_response(id: serde_json::Value, result: Result<serde_json::Value, RpcError>) -> RpcResponse {
    match result {
        Ok(result_value) => RpcResponse {
            jsonrpc: "2.0".to_string(),
            result: Some(result_value),
            error: None,
            id: Some(id),
        },
        Err(error) => RpcResponse {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(error),
            id: Some(id),
        },
    }
}

/// Send queued notifications and responses to the host page.
fn send_outgoing_messages(mut bridge: ResMut<HostBridge>) {
    for notification in bridge.outgoing_notifications.drain(..) {
        send_message_to_parent(&notification);
    }

    for response in bridge.outgoing_responses.drain(..) {
        send_message_to_parent(&response);
    }
}

/// Send serialized message to the parent window.
fn send_message_to_parent<T: Serialize>(message: &T) {
    #[cfg(target_arch = "wasm32")]
    {
        match serde_json::to_string(message) {
            Ok(json) => {
                if let Some(window) = window() {
                    if let Some(parent) = window.parent().ok().flatten() {
                        if let Err(e) = parent.post_message(&JsValue::from_str(&json), "*") {
                            error!("Failed to send message to parent: {:?}", e);
                        }
                    } else {
                        warn!("No parent window available for message transmission");
                    }
                } else {
                    error!("Window object not available");
                }
            }
            Err(e) => {
                error!("Failed to serialize message: {}", e);
            }
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Ok(json) = serde_json::to_string(message) {
            trace!("host <- {}", json);
        }
    }
}

impl RpcError {
    pub fn invalid_params(message: &str) -> Self {
        Self {
            code: -32602,
            message: message.to_string(),
            data: None,
        }
    }
}

impl From<XrError> for RpcError {
    fn from(error: XrError) -> Self {
        Self::invalid_params(&error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xr::input_source::Handedness;
    use bevy::ecs::system::RunSystemOnce;

    #[test]
    fn decodes_pose_with_axes() {
        let message = decode_host_message(
            "input_source_pose",
            &serde_json::json!({
                "id": 3,
                "origin": [0.0, 1.5, 0.0],
                "direction": [0.0, -1.0, -1.0],
                "axes": [0.0, 0.0, 0.4, -0.9]
            }),
        )
        .unwrap();
        let HostMessage::InputSource(InputSourceEvent::Pose { id, pose, axes }) = message else {
            panic!("expected pose, got {:?}", message);
        };
        assert_eq!(id, InputSourceId(3));
        assert_eq!(pose.origin, Vec3::new(0.0, 1.5, 0.0));
        assert_eq!(pose.rotation, Quat::IDENTITY);
        assert_eq!(axes, Some(vec![0.0, 0.0, 0.4, -0.9]));
    }

    #[test]
    fn decodes_controller_add() {
        let message = decode_host_message(
            "input_source_added",
            &serde_json::json!({ "id": 1, "handedness": "left", "target_ray_mode": "tracked-pointer" }),
        )
        .unwrap();
        let HostMessage::InputSource(InputSourceEvent::Added(desc)) = message else {
            panic!("expected add");
        };
        assert_eq!(desc.handedness, Handedness::Left);
    }

    #[test]
    fn unknown_method_and_bad_params_use_rpc_codes() {
        let err = decode_host_message("teleport", &serde_json::Value::Null).unwrap_err();
        assert_eq!(err.code, -32601);

        let err = decode_host_message("xr_start", &serde_json::json!({ "mode": "inline" })).unwrap_err();
        assert_eq!(err.code, -32602);

        let err = decode_host_message("select", &serde_json::json!({ "id": 1 })).unwrap_err();
        assert_eq!(err.code, -32602);
    }

    #[test]
    fn gamepads_params_are_a_list() {
        let message = decode_host_message(
            "gamepads",
            &serde_json::json!([{ "id": "pad", "axes": [0.1, 0.2] }]),
        )
        .unwrap();
        assert_eq!(
            message,
            HostMessage::Gamepads(vec![GamepadSnapshot {
                id: "pad".to_string(),
                axes: vec![0.1, 0.2]
            }])
        );
    }

    fn bridge_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .init_resource::<PlacementSession>()
            .init_resource::<XrSession>()
            .add_plugins(HostBridgePlugin);
        app
    }

    #[test]
    fn notifications_become_events_and_requests_get_responses() {
        let mut app = bridge_app();
        {
            let mut bridge = app.world_mut().resource_mut::<HostBridge>();
            bridge.receive(r#"{"jsonrpc":"2.0","method":"xr_start","params":{"mode":"vr"}}"#);
            bridge.receive(r#"{"jsonrpc":"2.0","method":"get_placement_state","params":null,"id":7}"#);
            bridge.receive(r#"{"jsonrpc":"2.0","method":"nope","params":{},"id":8}"#);
        }
        app.world_mut()
            .run_system_once(process_incoming_messages)
            .unwrap();
        app.world_mut().run_system_once(handle_rpc_messages).unwrap();

        let events = app.world().resource::<Events<XrSessionEvent>>();
        let mut cursor = events.get_cursor();
        let received: Vec<_> = cursor.read(events).cloned().collect();
        assert_eq!(received, vec![XrSessionEvent::StartRequested(XrMode::Vr)]);

        let bridge = app.world().resource::<HostBridge>();
        let responses = bridge.pending_responses();
        assert_eq!(responses.len(), 2);
        let state = responses[0].result.as_ref().unwrap();
        assert_eq!(state["stage"], "awaiting_center");
        assert_eq!(state["locked"], false);
        assert_eq!(responses[1].error.as_ref().unwrap().code, -32601);
    }
}
