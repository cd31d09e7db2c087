use crate::input::Action;
use gilrs::{Axis, Button, Event, EventType, Gamepad, GamepadId, Gilrs, MappingSource};
use iced::futures::sink::SinkExt;
use iced::Subscription;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{error, info};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const REPEAT_DELAY: Duration = Duration::from_millis(400);
const REPEAT_INTERVAL: Duration = Duration::from_millis(100);
const DEADZONE: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq)]
enum GamepadInput {
    Press(Action),
    Release(Action),
}

/// Device capabilities extracted from Gilrs for pure logic classification
struct GamepadCapabilities {
    is_sdl_mapped: bool,
    has_left_stick: bool,
    has_dpad: bool,
    has_face_buttons: bool,
    name: String,
}

impl GamepadCapabilities {
    fn from_gamepad(gp: &Gamepad) -> Self {
        let has_left_stick =
            gp.axis_code(Axis::LeftStickX).is_some() && gp.axis_code(Axis::LeftStickY).is_some();
        let has_dpad =
            gp.button_code(Button::DPadUp).is_some() && gp.button_code(Button::DPadDown).is_some();

        Self {
            is_sdl_mapped: gp.mapping_source() == MappingSource::SdlMappings,
            has_left_stick,
            has_dpad,
            has_face_buttons: gp.button_code(Button::South).is_some(),
            name: gp.name().to_string(),
        }
    }
}

#[derive(Default)]
struct AxisState {
    dir_x: i8,
    dir_y: i8,
}

pub fn gamepad_subscription() -> Subscription<Action> {
    Subscription::run(|| {
        iced::stream::channel(
            100,
            |mut output: iced::futures::channel::mpsc::Sender<Action>| async move {
                let mut gilrs = match Gilrs::new() {
                    Ok(g) => g,
                    Err(e) => {
                        error!("Failed to initialize Gilrs: {}", e);
                        return;
                    }
                };

                let mut axis_states: HashMap<GamepadId, AxisState> = HashMap::new();
                let mut current_repeater: Option<(Action, Instant, Instant)> = None;

                loop {
                    while let Some(Event { id, event, .. }) = gilrs.next_event() {
                        match event {
                            EventType::Connected => {
                                info!("Gamepad connected: {}", gilrs.gamepad(id).name());
                            }
                            EventType::Disconnected => {
                                axis_states.remove(&id);
                                continue;
                            }
                            _ => {}
                        }

                        // Keyboards show up as evdev devices too; their keys
                        // already arrive through the window.
                        if is_likely_keyboard(&gilrs.gamepad(id)) {
                            continue;
                        }

                        let state = axis_states.entry(id).or_default();
                        match process_event(event, state) {
                            Some(GamepadInput::Press(action)) => {
                                let _ = output.send(action).await;
                                if is_nav_action(action) {
                                    current_repeater =
                                        Some((action, Instant::now(), Instant::now()));
                                }
                            }
                            Some(GamepadInput::Release(action)) => {
                                if matches!(current_repeater, Some((held, _, _)) if held == action)
                                {
                                    current_repeater = None;
                                }
                            }
                            None => {}
                        }
                    }

                    if let Some((action, start_time, last_emit)) = &mut current_repeater {
                        let now = Instant::now();
                        if now.duration_since(*start_time) >= REPEAT_DELAY
                            && now.duration_since(*last_emit) >= REPEAT_INTERVAL
                        {
                            let _ = output.send(*action).await;
                            *last_emit = now;
                        }
                    }

                    tokio::time::sleep(POLL_INTERVAL).await;
                }
            },
        )
    })
}

fn is_likely_keyboard(gp: &Gamepad) -> bool {
    classify_as_keyboard(&GamepadCapabilities::from_gamepad(gp))
}

fn classify_as_keyboard(caps: &GamepadCapabilities) -> bool {
    if caps.is_sdl_mapped {
        return false;
    }

    // Usable for the launcher: a way to navigate plus a confirm button.
    let has_navigation = caps.has_left_stick || caps.has_dpad;
    if !(has_navigation && caps.has_face_buttons) {
        return true;
    }

    let lower_name = caps.name.to_lowercase();
    lower_name.contains("keyboard")
        || lower_name.contains("system control")
        || lower_name.contains("consumer control")
}

fn map_axis_value(value: f32) -> i8 {
    if value <= -DEADZONE {
        -1
    } else if value >= DEADZONE {
        1
    } else {
        0
    }
}

fn button_action(button: Button) -> Option<Action> {
    match button {
        Button::South => Some(Action::Select),
        Button::East => Some(Action::Back),
        Button::West => Some(Action::ContextMenu),
        Button::North => Some(Action::AddGame),
        Button::Start => Some(Action::OpenSettings),
        Button::Select => Some(Action::ToggleView),
        Button::DPadUp => Some(Action::Up),
        Button::DPadDown => Some(Action::Down),
        Button::DPadLeft => Some(Action::Left),
        Button::DPadRight => Some(Action::Right),
        Button::LeftTrigger | Button::LeftTrigger2 => Some(Action::PrevCategory),
        Button::RightTrigger | Button::RightTrigger2 => Some(Action::NextCategory),
        _ => None,
    }
}

/// Turns a stick movement across the deadzone into a press or release.
fn axis_input(value: f32, dir: &mut i8, negative: Action, positive: Action) -> Option<GamepadInput> {
    let new_dir = map_axis_value(value);
    if new_dir == *dir {
        return None;
    }
    let old_dir = std::mem::replace(dir, new_dir);
    match (old_dir, new_dir) {
        (_, -1) => Some(GamepadInput::Press(negative)),
        (_, 1) => Some(GamepadInput::Press(positive)),
        (-1, 0) => Some(GamepadInput::Release(negative)),
        (1, 0) => Some(GamepadInput::Release(positive)),
        _ => None,
    }
}

fn process_event(event: EventType, state: &mut AxisState) -> Option<GamepadInput> {
    match event {
        EventType::ButtonPressed(button, _) => button_action(button).map(GamepadInput::Press),
        EventType::ButtonReleased(button, _) => button_action(button)
            .filter(|action| is_nav_action(*action))
            .map(GamepadInput::Release),
        EventType::AxisChanged(Axis::LeftStickX, value, _) => {
            axis_input(value, &mut state.dir_x, Action::Left, Action::Right)
        }
        EventType::AxisChanged(Axis::LeftStickY, value, _) => {
            axis_input(value, &mut state.dir_y, Action::Up, Action::Down)
        }
        _ => None,
    }
}

fn is_nav_action(action: Action) -> bool {
    matches!(
        action,
        Action::Up
            | Action::Down
            | Action::Left
            | Action::Right
            | Action::PrevCategory
            | Action::NextCategory
    )
}
