use bevy::prelude::*;
use serde::Serialize;

use super::state::PlacementStage;
use crate::rpc::web_rpc::HostBridge;
use constants::placement::{
    PROMPT_CENTER_CONTROLLER, PROMPT_CENTER_TOUCH, PROMPT_DIRECTION_CONTROLLER,
    PROMPT_DIRECTION_TOUCH,
};

/// Fixed prompt surfaces the viewer can toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptPanel {
    /// Screen overlay used with touch AR.
    Screen2d,
    /// Panel used while a controller is driving placement.
    Screen3d,
    /// "AR/VR unavailable" indicator.
    Unavailable,
}

/// Marks the text entity backing a prompt panel.
#[derive(Component, Debug, Clone, Copy)]
pub struct PromptText(pub PromptPanel);

#[derive(Event, Debug, Clone, PartialEq)]
pub enum PromptCommand {
    Show { panel: PromptPanel, text: String },
    Hide(PromptPanel),
}

impl PromptCommand {
    pub fn show(panel: PromptPanel, text: &str) -> Self {
        Self::Show {
            panel,
            text: text.to_string(),
        }
    }
}

/// Copy for the current stage, worded for touch or controller input.
pub fn prompt_text(stage: PlacementStage, controller: bool) -> &'static str {
    match (stage, controller) {
        (PlacementStage::AwaitingDirection, true) => PROMPT_DIRECTION_CONTROLLER,
        (PlacementStage::AwaitingDirection, false) => PROMPT_DIRECTION_TOUCH,
        (_, true) => PROMPT_CENTER_CONTROLLER,
        (_, false) => PROMPT_CENTER_TOUCH,
    }
}

/// Apply prompt commands to the UI and mirror them to the host page.
pub fn apply_prompt_commands(
    mut commands: EventReader<PromptCommand>,
    mut panels: Query<(&PromptText, &mut Text, &mut Visibility)>,
    mut bridge: ResMut<HostBridge>,
) {
    for command in commands.read() {
        let (panel, text, visible) = match command {
            PromptCommand::Show { panel, text } => (*panel, Some(text.as_str()), true),
            PromptCommand::Hide(panel) => (*panel, None, false),
        };

        for (prompt, mut content, mut visibility) in &mut panels {
            if prompt.0 != panel {
                continue;
            }
            if let Some(text) = text {
                content.0 = text.to_string();
            }
            *visibility = if visible {
                Visibility::Inherited
            } else {
                Visibility::Hidden
            };
        }

        bridge.send_notification(
            "placement_prompt",
            serde_json::json!({
                "prompt": panel,
                "text": text,
                "visible": visible,
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_addressed_panel_changes() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .init_resource::<HostBridge>()
            .add_event::<PromptCommand>()
            .add_systems(Update, apply_prompt_commands);
        let screen = app
            .world_mut()
            .spawn((PromptText(PromptPanel::Screen2d), Text::new(""), Visibility::Hidden))
            .id();
        let panel = app
            .world_mut()
            .spawn((PromptText(PromptPanel::Screen3d), Text::new("old"), Visibility::Hidden))
            .id();

        app.world_mut().send_event(PromptCommand::show(
            PromptPanel::Screen2d,
            prompt_text(PlacementStage::AwaitingCenter, false),
        ));
        app.update();

        assert_eq!(app.world().get::<Text>(screen).unwrap().0, PROMPT_CENTER_TOUCH);
        assert_eq!(app.world().get::<Visibility>(screen), Some(&Visibility::Inherited));
        assert_eq!(app.world().get::<Text>(panel).unwrap().0, "old");
        assert_eq!(app.world().get::<Visibility>(panel), Some(&Visibility::Hidden));

        let sent = app.world().resource::<HostBridge>().pending_notifications();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].params["prompt"], "screen2d");
        assert_eq!(sent[0].params["visible"], true);
    }

    #[test]
    fn controller_copy_differs_per_stage() {
        assert_eq!(prompt_text(PlacementStage::AwaitingCenter, true), PROMPT_CENTER_CONTROLLER);
        assert_eq!(
            prompt_text(PlacementStage::AwaitingDirection, true),
            PROMPT_DIRECTION_CONTROLLER
        );
    }
}
