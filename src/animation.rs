//! Keyframe animation clips and the players that drive them.
//!
//! A clip is shared, immutable data; an [`AnimationPlayer`] holds the runtime
//! state (clock, speed, playing flag) and writes the sampled joint values into
//! a [`Pose`]. A paused player is a time-frozen pose source: it keeps emitting
//! the pose at its current time.

use std::sync::Arc;

use cgmath::{Quaternion, Vector3, VectorSpace};

use crate::data_structures::skeleton::Pose;

#[derive(Clone, Debug)]
pub enum Keyframes {
    Translation(Vec<Vector3<f32>>),
    Rotation(Vec<Quaternion<f32>>),
    Scale(Vec<Vector3<f32>>),
    Other,
}

/// One animated property of one joint.
#[derive(Clone, Debug)]
pub struct Channel {
    pub joint: usize,
    pub timestamps: Vec<f32>,
    pub keyframes: Keyframes,
}

#[derive(Clone, Debug)]
pub struct AnimationClip {
    pub name: String,
    pub channels: Vec<Channel>,
    /// Time of the last keyframe across all channels, in seconds.
    pub duration: f32,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, channels: Vec<Channel>) -> Self {
        let duration = channels
            .iter()
            .filter_map(|c| c.timestamps.last().copied())
            .fold(0.0_f32, f32::max);
        Self {
            name: name.into(),
            channels,
            duration,
        }
    }

    /// Write every channel's value at `time` into `pose`. Joints the clip
    /// doesn't animate are left untouched.
    pub fn sample_into(&self, time: f32, pose: &mut Pose) {
        for channel in &self.channels {
            let Some(joint) = pose.joints.get_mut(channel.joint) else {
                continue;
            };
            match &channel.keyframes {
                Keyframes::Translation(values) => {
                    if let Some(v) = sample_vec3(&channel.timestamps, values, time) {
                        joint.translation = v;
                    }
                }
                Keyframes::Rotation(values) => {
                    if let Some(q) = sample_quat(&channel.timestamps, values, time) {
                        joint.rotation = q;
                    }
                }
                Keyframes::Scale(values) => {
                    if let Some(v) = sample_vec3(&channel.timestamps, values, time) {
                        joint.scale = v;
                    }
                }
                Keyframes::Other => {}
            }
        }
    }
}

/// Keyframe pair around `time` and the interpolation factor between them.
/// Times outside the track clamp to the first or last keyframe.
fn segment(timestamps: &[f32], keys: usize, time: f32) -> Option<(usize, usize, f32)> {
    let len = timestamps.len().min(keys);
    if len == 0 {
        return None;
    }
    let times = &timestamps[..len];
    if len == 1 || !(time > times[0]) {
        return Some((0, 0, 0.0));
    }
    if time >= times[len - 1] {
        return Some((len - 1, len - 1, 0.0));
    }
    let next = times.partition_point(|&t| t <= time);
    let prev = next - 1;
    let span = times[next] - times[prev];
    let factor = if span > 0.0 {
        (time - times[prev]) / span
    } else {
        0.0
    };
    Some((prev, next, factor))
}

fn sample_vec3(timestamps: &[f32], values: &[Vector3<f32>], time: f32) -> Option<Vector3<f32>> {
    let (a, b, t) = segment(timestamps, values.len(), time)?;
    Some(values[a].lerp(values[b], t))
}

fn sample_quat(
    timestamps: &[f32],
    values: &[Quaternion<f32>],
    time: f32,
) -> Option<Quaternion<f32>> {
    let (a, b, t) = segment(timestamps, values.len(), time)?;
    if a == b {
        return Some(values[a]);
    }
    Some(values[a].slerp(values[b], t))
}

/// Runtime state of one clip applied to one pose.
#[derive(Clone, Debug)]
pub struct AnimationPlayer {
    clip: Arc<AnimationClip>,
    time: f32,
    speed: f32,
    playing: bool,
    looping: bool,
}

impl AnimationPlayer {
    /// A paused, looping player at time zero.
    pub fn new(clip: Arc<AnimationClip>) -> Self {
        Self {
            clip,
            time: 0.0,
            speed: 1.0,
            playing: false,
            looping: true,
        }
    }

    pub fn clip(&self) -> &AnimationClip {
        &self.clip
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    pub fn set_speed(&mut self, speed: f32) {
        if speed.is_finite() {
            self.speed = speed;
        } else {
            log::warn!("ignoring non-finite playback speed for '{}'", self.clip.name);
        }
    }

    /// Jump to `time` seconds, clamped to the clip.
    pub fn set_time(&mut self, time: f32) {
        self.time = if time.is_finite() {
            time.clamp(0.0, self.clip.duration)
        } else {
            0.0
        };
    }

    /// Move the clock by `dt` seconds. Paused players don't move.
    pub fn advance(&mut self, dt: f32) {
        if !self.playing || !dt.is_finite() || dt < 0.0 {
            return;
        }
        let duration = self.clip.duration;
        let time = self.time + dt * self.speed;
        if duration <= 0.0 {
            self.time = 0.0;
        } else if self.looping {
            self.time = time.rem_euclid(duration);
        } else {
            self.time = time.clamp(0.0, duration);
            if self.time >= duration || self.time <= 0.0 {
                self.playing = false;
            }
        }
    }

    pub fn sample_into(&self, pose: &mut Pose) {
        self.clip.sample_into(self.time, pose);
    }
}
