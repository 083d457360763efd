//! Stick input to character motion.
//!
//! Horizontal stick turns the character, vertical stick walks it along its
//! facing direction. There is no strafing and no momentum: the delta produced
//! here depends only on this frame's input.

use cgmath::{Vector3, Zero};

use crate::{data_structures::transform::forward, input::StickInput};

/// Stick readings below this magnitude count as centred.
pub const DEADZONE: f32 = 10.0;
/// Yaw change per nominal frame per unit of horizontal stick.
pub const ROT_GAIN: f32 = 0.0007;
/// Distance per nominal frame per unit of vertical stick.
pub const MOVE_GAIN: f32 = 0.006;
/// Largest magnitude a signed 8-bit axis can report.
pub const AXIS_LIMIT: f32 = 128.0;

/// How gains relate to elapsed time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TimeScaling {
    /// Gains apply once per frame regardless of `dt`.
    PerFrame,
    /// Gains are tuned for one frame at `nominal_hz` and scaled by `dt`.
    PerSecond { nominal_hz: f32 },
}

impl Default for TimeScaling {
    fn default() -> Self {
        Self::PerFrame
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MotionConfig {
    pub deadzone: f32,
    pub rot_gain: f32,
    pub move_gain: f32,
    pub time_scaling: TimeScaling,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            deadzone: DEADZONE,
            rot_gain: ROT_GAIN,
            move_gain: MOVE_GAIN,
            time_scaling: TimeScaling::PerFrame,
        }
    }
}

/// Result of one integration step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionStep {
    /// Desired change of position, before collision.
    pub delta: Vector3<f32>,
    /// New yaw.
    pub rotation: f32,
    /// `delta / dt`, zero when `dt` isn't positive.
    pub velocity: Vector3<f32>,
}

/// Zero out malformed or centred axis readings.
pub fn filter_axis(raw: f32, deadzone: f32) -> f32 {
    if !raw.is_finite() || raw.abs() > AXIS_LIMIT || raw.abs() < deadzone {
        0.0
    } else {
        raw
    }
}

impl MotionConfig {
    pub fn filter(&self, stick: StickInput) -> StickInput {
        StickInput::new(
            filter_axis(stick.x, self.deadzone),
            filter_axis(stick.y, self.deadzone),
        )
    }

    /// Multiplier applied to the gains for a frame of `dt` seconds.
    fn step(&self, dt: f32) -> f32 {
        match self.time_scaling {
            TimeScaling::PerFrame => 1.0,
            TimeScaling::PerSecond { nominal_hz } => {
                let nominal_hz = if nominal_hz.is_finite() && nominal_hz > 0.0 {
                    nominal_hz
                } else {
                    60.0
                };
                if dt.is_finite() && dt >= 0.0 {
                    dt * nominal_hz
                } else {
                    log::warn!("invalid frame time {}, using one nominal frame", dt);
                    1.0
                }
            }
        }
    }

    /// Integrate one frame of stick input.
    ///
    /// The new yaw is computed first; the walk direction uses it.
    pub fn integrate(&self, stick: StickInput, rotation: f32, dt: f32) -> MotionStep {
        let stick = self.filter(stick);
        let step = self.step(dt);
        let rotation = rotation + stick.x * self.rot_gain * step;
        let delta = forward(rotation) * (stick.y * self.move_gain * step);
        let velocity = if dt.is_finite() && dt > 0.0 {
            delta / dt
        } else {
            Vector3::zero()
        };
        MotionStep {
            delta,
            rotation,
            velocity,
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn deadzone_is_idempotent() {
        let config = MotionConfig::default();
        for x in [-9.9_f32, -5.0, 0.0, 3.0, 9.0] {
            for y in [-9.0_f32, 0.0, 9.99] {
                let step = config.integrate(StickInput::new(x, y), 0.8, DT);
                assert_eq!(step.delta, Vector3::zero());
                assert_eq!(step.rotation, 0.8);
            }
        }
    }

    #[test]
    fn deadzone_edge_passes() {
        assert_eq!(filter_axis(10.0, DEADZONE), 10.0);
        assert_eq!(filter_axis(-10.0, DEADZONE), -10.0);
        assert_eq!(filter_axis(9.999, DEADZONE), 0.0);
    }

    #[test]
    fn malformed_axes_are_zeroed() {
        assert_eq!(filter_axis(f32::NAN, DEADZONE), 0.0);
        assert_eq!(filter_axis(f32::INFINITY, DEADZONE), 0.0);
        assert_eq!(filter_axis(300.0, DEADZONE), 0.0);
        assert_eq!(filter_axis(-128.0, DEADZONE), -128.0);
    }

    #[test]
    fn full_right_turns_only() {
        let step = MotionConfig::default().integrate(StickInput::new(127.0, 0.0), 0.0, DT);
        assert_eq!(step.rotation, 127.0 * ROT_GAIN);
        assert_eq!(step.delta, Vector3::zero());
    }

    #[test]
    fn full_forward_walks_along_x() {
        let step = MotionConfig::default().integrate(StickInput::new(0.0, 127.0), 0.0, DT);
        assert_eq!(step.rotation, 0.0);
        assert_eq!(step.delta, Vector3::new(127.0 * MOVE_GAIN, 0.0, 0.0));
        assert_relative_eq!(step.velocity, step.delta / DT);
    }

    #[test]
    fn walks_along_facing() {
        let rotation = std::f32::consts::FRAC_PI_2;
        let step = MotionConfig::default().integrate(StickInput::new(0.0, -50.0), rotation, DT);
        assert_relative_eq!(
            step.delta,
            forward(rotation) * (-50.0 * MOVE_GAIN),
            epsilon = 1e-7
        );
        assert_relative_eq!(step.delta.z, -50.0 * MOVE_GAIN, epsilon = 1e-7);
    }

    #[test]
    fn per_frame_ignores_dt() {
        let config = MotionConfig::default();
        let slow = config.integrate(StickInput::new(50.0, 50.0), 0.0, 0.1);
        let fast = config.integrate(StickInput::new(50.0, 50.0), 0.0, 0.001);
        assert_eq!(slow.delta, fast.delta);
        assert_eq!(slow.rotation, fast.rotation);
    }

    #[test]
    fn per_second_is_frame_rate_independent() {
        let config = MotionConfig {
            time_scaling: TimeScaling::PerSecond { nominal_hz: 60.0 },
            ..Default::default()
        };
        let stick = StickInput::new(0.0, 100.0);
        let one = config.integrate(stick, 0.0, 1.0 / 60.0);
        let half = config.integrate(stick, 0.0, 1.0 / 120.0);
        assert_relative_eq!(one.delta, half.delta * 2.0, epsilon = 1e-6);
        assert_relative_eq!(one.delta.x, 100.0 * MOVE_GAIN, epsilon = 1e-6);
    }

    #[test]
    fn per_second_substitutes_invalid_dt() {
        let config = MotionConfig {
            time_scaling: TimeScaling::PerSecond { nominal_hz: 60.0 },
            ..Default::default()
        };
        let step = config.integrate(StickInput::new(127.0, 0.0), 0.0, f32::NAN);
        assert_relative_eq!(step.rotation, 127.0 * ROT_GAIN);
        assert_eq!(step.velocity, Vector3::zero());
    }
}
