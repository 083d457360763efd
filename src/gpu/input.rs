use winit::{
    event::{ElementState, KeyEvent, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::input::{Buttons, InputFrame, InputSource, StickInput};

const FULL_TILT: f32 = 127.0;

/// Drives the stick from WASD or the arrow keys.
///
/// Feed it window events as they arrive and poll it once per frame.
/// Opposite keys held together cancel out.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeyboardStick {
    up: bool,
    down: bool,
    left: bool,
    right: bool,
    pressed: Buttons,
}

impl KeyboardStick {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the event changed the stick or button state.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        ..
                    },
                ..
            } => self.handle_key(*code, *state),
            WindowEvent::Focused(false) => {
                *self = Self::default();
                true
            }
            _ => false,
        }
    }

    pub fn handle_key(&mut self, code: KeyCode, state: ElementState) -> bool {
        let down = state.is_pressed();
        match code {
            KeyCode::KeyW | KeyCode::ArrowUp => self.up = down,
            KeyCode::KeyS | KeyCode::ArrowDown => self.down = down,
            KeyCode::KeyA | KeyCode::ArrowLeft => self.left = down,
            KeyCode::KeyD | KeyCode::ArrowRight => self.right = down,
            KeyCode::Space => self.set_button(Buttons::A, down),
            KeyCode::Enter => self.set_button(Buttons::START, down),
            _ => return false,
        }
        true
    }

    fn set_button(&mut self, button: Buttons, down: bool) {
        if down {
            self.pressed.insert(button);
        } else {
            self.pressed.remove(button);
        }
    }

    fn axis(positive: bool, negative: bool) -> f32 {
        match (positive, negative) {
            (true, false) => FULL_TILT,
            (false, true) => -FULL_TILT,
            _ => 0.0,
        }
    }
}

impl InputSource for KeyboardStick {
    fn poll(&mut self) -> InputFrame {
        InputFrame {
            stick: StickInput::new(
                Self::axis(self.right, self.left),
                Self::axis(self.up, self.down),
            ),
            pressed: self.pressed,
        }
    }
}
