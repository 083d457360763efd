//! Ambient, directional lights and fog.
//!
//! [`LightState`] is the CPU-side description kept in the frame context;
//! [`LightUniform`] is its GPU layout.

use cgmath::{InnerSpace, Vector3};

use crate::data_structures::colour::Colour;

/// Number of directional light slots.
pub const MAX_LIGHTS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirLight {
    pub colour: Colour,
    /// Direction the light points towards. Normalized on every light update.
    pub direction: Vector3<f32>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fog {
    pub enabled: bool,
    pub colour: Colour,
    pub near: f32,
    pub far: f32,
}

impl Default for Fog {
    fn default() -> Self {
        Self {
            enabled: true,
            colour: Colour::rgb(160, 110, 200),
            near: 12.0,
            far: 85.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LightState {
    pub ambient: Colour,
    pub directional: [DirLight; MAX_LIGHTS],
    /// How many of `directional` are lit, from the front.
    pub active: usize,
    pub fog: Fog,
}

impl Default for LightState {
    fn default() -> Self {
        Self {
            ambient: Colour::rgb(0xAA, 0xAA, 0xAA),
            directional: [
                DirLight {
                    colour: Colour::rgb(0xFF, 0xAA, 0xAA),
                    direction: Vector3::new(1.0, 1.0, 1.0),
                },
                DirLight {
                    colour: Colour::rgb(0x00, 0x00, 0x00),
                    direction: Vector3::new(-1.0, -1.0, 0.0),
                },
                DirLight {
                    colour: Colour::rgb(0xFF, 0xFF, 0xFF),
                    direction: Vector3::new(1.0, 1.0, 0.0),
                },
                DirLight {
                    colour: Colour::rgb(0x00, 0x00, 0x00),
                    direction: Vector3::new(-1.0, -1.0, 1.0),
                },
            ],
            active: 1,
            fog: Fog::default(),
        }
    }
}

impl LightState {
    /// Per-frame light update: clamp the active count and normalize the
    /// directions of the active lights. Zero or non-finite directions become +Y.
    pub fn update(&mut self, active: usize) {
        if active > MAX_LIGHTS {
            log::warn!("{} directional lights requested, only {} slots", active, MAX_LIGHTS);
        }
        self.active = active.min(MAX_LIGHTS);
        for (slot, light) in self.directional[..self.active].iter_mut().enumerate() {
            let len2 = light.direction.magnitude2();
            if len2.is_finite() && len2 > f32::EPSILON {
                light.direction = light.direction.normalize();
            } else {
                log::warn!(
                    "directional light {} has a degenerate direction {:?}, pointing it up",
                    slot,
                    light.direction
                );
                light.direction = Vector3::unit_y();
            }
        }
    }

    pub fn lit(&self) -> &[DirLight] {
        &self.directional[..self.active.min(MAX_LIGHTS)]
    }

    pub fn to_uniform(&self) -> LightUniform {
        let mut uniform = LightUniform {
            ambient: self.ambient.to_f32(),
            directions: [[0.0; 4]; MAX_LIGHTS],
            colours: [[0.0; 4]; MAX_LIGHTS],
            fog_colour: self.fog.colour.to_f32(),
            fog_range: [
                self.fog.near,
                self.fog.far,
                if self.fog.enabled { 1.0 } else { 0.0 },
                0.0,
            ],
            count: self.lit().len() as u32,
            _padding: [0; 3],
        };
        for (i, light) in self.lit().iter().enumerate() {
            uniform.directions[i] = light.direction.extend(0.0).into();
            uniform.colours[i] = light.colour.to_f32();
        }
        uniform
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    ambient: [f32; 4],
    directions: [[f32; 4]; MAX_LIGHTS],
    colours: [[f32; 4]; MAX_LIGHTS],
    fog_colour: [f32; 4],
    /// near, far, enabled flag, unused
    fog_range: [f32; 4],
    count: u32,
    // Due to uniforms requiring 16 byte (4 float) spacing, we need to use a padding field here
    _padding: [u32; 3],
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use cgmath::Zero;

    use super::*;

    #[test]
    fn update_normalizes_active_lights_only() {
        let mut light = LightState::default();
        light.update(1);
        assert_relative_eq!(light.directional[0].direction.magnitude(), 1.0, epsilon = 1e-6);
        assert_eq!(light.directional[1].direction, Vector3::new(-1.0, -1.0, 0.0));
        assert_eq!(light.lit().len(), 1);
    }

    #[test]
    fn degenerate_direction_points_up() {
        let mut light = LightState::default();
        light.directional[0].direction = Vector3::zero();
        light.directional[1].direction = Vector3::new(f32::NAN, 1.0, 0.0);
        light.update(2);
        assert_eq!(light.directional[0].direction, Vector3::unit_y());
        assert_eq!(light.directional[1].direction, Vector3::unit_y());
        let uniform = light.to_uniform();
        assert!(uniform.directions.iter().flatten().all(|v| v.is_finite()));
    }

    #[test]
    fn active_count_is_clamped() {
        let mut light = LightState::default();
        light.update(9);
        assert_eq!(light.active, MAX_LIGHTS);
        assert_eq!(light.to_uniform().count, MAX_LIGHTS as u32);
    }
}
