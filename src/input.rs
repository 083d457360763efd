//! Raw controller input as the rest of the crate sees it.
//!
//! Values here are unfiltered; deadzone handling happens during motion
//! integration.

/// Analog stick reading, nominally in the signed 8-bit range.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StickInput {
    pub x: f32,
    pub y: f32,
}

impl StickInput {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<(i8, i8)> for StickInput {
    fn from((x, y): (i8, i8)) -> Self {
        Self::new(x as f32, y as f32)
    }
}

/// Digital buttons as a bit set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Buttons(u16);

impl Buttons {
    pub const A: Buttons = Buttons(1 << 0);
    pub const B: Buttons = Buttons(1 << 1);
    pub const Z: Buttons = Buttons(1 << 2);
    pub const START: Buttons = Buttons(1 << 3);
    pub const L: Buttons = Buttons(1 << 4);
    pub const R: Buttons = Buttons(1 << 5);

    pub const fn empty() -> Self {
        Buttons(0)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn contains(self, other: Buttons) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Buttons) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Buttons) {
        self.0 &= !other.0;
    }
}

impl std::ops::BitOr for Buttons {
    type Output = Buttons;

    fn bitor(self, rhs: Buttons) -> Buttons {
        Buttons(self.0 | rhs.0)
    }
}

/// Everything read from the controller for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InputFrame {
    pub stick: StickInput,
    pub pressed: Buttons,
}

impl InputFrame {
    pub fn stick(x: f32, y: f32) -> Self {
        Self {
            stick: StickInput::new(x, y),
            pressed: Buttons::empty(),
        }
    }
}

/// Something that can be polled once per frame for controller state.
pub trait InputSource {
    fn poll(&mut self) -> InputFrame;
}

/// Replays a fixed list of frames, then reports a centred stick.
#[derive(Clone, Debug, Default)]
pub struct ScriptedInput {
    frames: std::collections::VecDeque<InputFrame>,
}

impl ScriptedInput {
    pub fn new(frames: impl IntoIterator<Item = InputFrame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self) -> InputFrame {
        self.frames.pop_front().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_set_operations() {
        let mut pressed = Buttons::A | Buttons::START;
        assert!(pressed.contains(Buttons::A));
        assert!(!pressed.contains(Buttons::B));
        pressed.remove(Buttons::A);
        assert!(!pressed.contains(Buttons::A));
        pressed.insert(Buttons::Z);
        assert_eq!(pressed, Buttons::Z | Buttons::START);
    }

    #[test]
    fn scripted_input_runs_dry_to_neutral() {
        let mut input = ScriptedInput::new([InputFrame::stick(127.0, 0.0)]);
        assert_eq!(input.poll().stick, StickInput::new(127.0, 0.0));
        assert_eq!(input.remaining(), 0);
        assert_eq!(input.poll(), InputFrame::default());
    }

    #[test]
    fn converts_from_raw_bytes() {
        assert_eq!(StickInput::from((-128, 5)), StickInput::new(-128.0, 5.0));
    }
}
