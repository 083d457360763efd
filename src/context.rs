use std::time::Duration;

use instant::Instant;

use crate::{
    camera::{self, Camera, Projection},
    data_structures::colour::Colour,
    light::LightState,
};

/// Nominal frame length used before the first real measurement.
pub const NOMINAL_FRAME: Duration = Duration::from_micros(16_667);

/// Screen area the scene is drawn into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// Measures time between frames.
#[derive(Debug)]
pub struct FrameTimer {
    last_time: Option<Instant>,
}

impl FrameTimer {
    pub fn new() -> Self {
        Self { last_time: None }
    }

    /// Seconds since the previous tick. The first tick reports one nominal frame.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let dt = match self.last_time {
            Some(last) => now.duration_since(last),
            None => NOMINAL_FRAME,
        };
        self.last_time = Some(now);
        log::trace!("dt: {:?}", dt);
        dt.as_secs_f32()
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// State shared by every stage of a frame.
///
/// Owns everything a frame reads or writes besides the scene itself:
/// viewport and projection, the last camera pushed to the executor,
/// lights and fog, the clear colour and frame timing.
#[derive(Debug)]
pub struct FrameContext {
    pub viewport: Viewport,
    pub projection: Projection,
    pub camera: Option<Camera>,
    pub light: LightState,
    pub clear_colour: Colour,
    pub timer: FrameTimer,
    pub frame: u64,
}

impl FrameContext {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            viewport: Viewport::full(width, height),
            projection: Projection::new(width, height, camera::FOVY, camera::ZNEAR, camera::ZFAR),
            camera: None,
            light: LightState::default(),
            clear_colour: Colour::rgb(160, 110, 200),
            timer: FrameTimer::new(),
            frame: 0,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::warn!("ignoring resize to {}x{}", width, height);
            return;
        }
        self.viewport = Viewport::full(width, height);
        self.projection.resize(width, height);
    }
}

impl Default for FrameContext {
    fn default() -> Self {
        Self::new(320, 240)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_is_nominal() {
        let mut timer = FrameTimer::new();
        assert_eq!(timer.tick(), NOMINAL_FRAME.as_secs_f32());
        assert!(timer.tick() >= 0.0);
    }

    #[test]
    fn resize_updates_viewport_and_projection() {
        let mut ctx = FrameContext::default();
        ctx.resize(640, 320);
        assert_eq!(ctx.viewport, Viewport::full(640, 320));
        assert_eq!(ctx.projection.aspect(), 2.0);
        ctx.resize(0, 100);
        assert_eq!(ctx.viewport.width, 640);
    }
}
