use bevy::prelude::*;
use constants::placement::{PROMPT_AR_UNAVAILABLE, PROMPT_VR_UNAVAILABLE, PROMPT_XR_UNSUPPORTED};
use constants::render_settings::{
    FALLBACK_CAMERA_POSITION, FALLBACK_CLEAR_COLOUR, PROMPT_TEXT_COLOUR, UNAVAILABLE_TEXT_COLOUR,
};

use crate::tools::placement::prompt::{PromptCommand, PromptPanel, PromptText};
use crate::xr::camera::XrCamera;
use crate::xr::error::XrError;
use crate::xr::session::{XrMode, XrSession};
#[cfg(not(target_arch = "wasm32"))]
use crate::xr::session::XrSessionEvent;

/// Start screen hint, shown on native builds where there is no host page.
#[derive(Component)]
pub struct StartHint;

pub fn spawn_prompt_panels(mut commands: Commands) {
    commands
        .spawn(Node {
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            ..default()
        })
        .with_children(|parent| {
            parent.spawn((
                Text::new(""),
                TextFont {
                    font_size: 22.0,
                    ..default()
                },
                TextColor(PROMPT_TEXT_COLOUR),
                TextLayout::new_with_justify(JustifyText::Center),
                Node {
                    position_type: PositionType::Absolute,
                    bottom: Val::Px(48.0),
                    width: Val::Percent(100.0),
                    ..default()
                },
                Visibility::Hidden,
                PromptText(PromptPanel::Screen2d),
            ));
            parent.spawn((
                Text::new(""),
                TextFont {
                    font_size: 26.0,
                    ..default()
                },
                TextColor(PROMPT_TEXT_COLOUR),
                TextLayout::new_with_justify(JustifyText::Center),
                Node {
                    position_type: PositionType::Absolute,
                    top: Val::Percent(30.0),
                    width: Val::Percent(100.0),
                    ..default()
                },
                Visibility::Hidden,
                PromptText(PromptPanel::Screen3d),
            ));
            parent.spawn((
                Text::new(""),
                TextFont {
                    font_size: 24.0,
                    ..default()
                },
                TextColor(UNAVAILABLE_TEXT_COLOUR),
                TextLayout::new_with_justify(JustifyText::Center),
                Node {
                    position_type: PositionType::Absolute,
                    top: Val::Percent(45.0),
                    width: Val::Percent(100.0),
                    ..default()
                },
                Visibility::Hidden,
                PromptText(PromptPanel::Unavailable),
            ));

            #[cfg(not(target_arch = "wasm32"))]
            parent.spawn((
                Text::new("Press A to start AR or V to start VR"),
                TextFont {
                    font_size: 18.0,
                    ..default()
                },
                TextColor(PROMPT_TEXT_COLOUR),
                Node {
                    position_type: PositionType::Absolute,
                    top: Val::Px(12.0),
                    left: Val::Px(12.0),
                    ..default()
                },
                Visibility::Hidden,
                StartHint,
            ));
        });
}

/// Copy for the unavailable indicator.
pub fn unavailable_text(reason: Option<&XrError>, mode: Option<XrMode>) -> &'static str {
    match (reason, mode) {
        (Some(XrError::Unsupported), _) | (_, None) => PROMPT_XR_UNSUPPORTED,
        (_, Some(XrMode::Ar)) => PROMPT_AR_UNAVAILABLE,
        (_, Some(XrMode::Vr)) => PROMPT_VR_UNAVAILABLE,
    }
}

/// Degraded view: indicator on, fixed camera looking at the origin.
pub fn show_unavailable_view(
    session: Res<XrSession>,
    mut prompts: EventWriter<PromptCommand>,
    mut cameras: Query<(&mut Transform, Option<&mut Camera>), With<XrCamera>>,
) {
    let text = unavailable_text(session.unavailable.as_ref(), session.mode);
    prompts.write(PromptCommand::show(PromptPanel::Unavailable, text));
    prompts.write(PromptCommand::Hide(PromptPanel::Screen2d));
    prompts.write(PromptCommand::Hide(PromptPanel::Screen3d));

    let Ok((mut transform, camera)) = cameras.single_mut() else {
        return;
    };
    *transform = Transform::from_translation(Vec3::from_array(FALLBACK_CAMERA_POSITION))
        .looking_at(Vec3::ZERO, Vec3::Y);
    if let Some(mut camera) = camera {
        camera.clear_color = ClearColorConfig::Custom(FALLBACK_CLEAR_COLOUR);
    }
}

pub fn set_start_hint_visibility<const VISIBLE: bool>(
    mut hints: Query<&mut Visibility, With<StartHint>>,
) {
    for mut visibility in &mut hints {
        *visibility = if VISIBLE {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        };
    }
}

/// Native stand-in for the host page's start buttons.
#[cfg(not(target_arch = "wasm32"))]
pub fn start_with_keyboard(
    keys: Res<ButtonInput<KeyCode>>,
    mut events: EventWriter<XrSessionEvent>,
) {
    if keys.just_pressed(KeyCode::KeyA) {
        events.write(XrSessionEvent::StartRequested(XrMode::Ar));
    } else if keys.just_pressed(KeyCode::KeyV) {
        events.write(XrSessionEvent::StartRequested(XrMode::Vr));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::system::RunSystemOnce;

    #[test]
    fn indicator_copy_follows_reason_and_mode() {
        assert_eq!(
            unavailable_text(Some(&XrError::Unsupported), Some(XrMode::Vr)),
            PROMPT_XR_UNSUPPORTED
        );
        assert_eq!(
            unavailable_text(Some(&XrError::HitTestUnsupported), Some(XrMode::Ar)),
            PROMPT_AR_UNAVAILABLE
        );
        assert_eq!(
            unavailable_text(
                Some(&XrError::SessionRejected("denied".into())),
                Some(XrMode::Vr)
            ),
            PROMPT_VR_UNAVAILABLE
        );
        assert_eq!(unavailable_text(None, None), PROMPT_XR_UNSUPPORTED);
    }

    #[test]
    fn unavailable_view_moves_camera_to_fallback() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .add_event::<PromptCommand>()
            .insert_resource(XrSession {
                mode: Some(XrMode::Ar),
                unavailable: Some(XrError::HitTestUnsupported),
                ..default()
            });
        let camera = app
            .world_mut()
            .spawn((XrCamera, Transform::default()))
            .id();

        app.world_mut().run_system_once(show_unavailable_view).unwrap();

        let transform = app.world().get::<Transform>(camera).unwrap();
        assert!(transform.translation.abs_diff_eq(Vec3::new(0.0, 2.0, 4.0), 1e-5));
        assert!(transform.forward().dot(-transform.translation.normalize()) > 0.999);

        let commands: Vec<PromptCommand> = app
            .world_mut()
            .resource_mut::<Events<PromptCommand>>()
            .drain()
            .collect();
        assert_eq!(
            commands[0],
            PromptCommand::show(PromptPanel::Unavailable, PROMPT_AR_UNAVAILABLE)
        );
    }
}
