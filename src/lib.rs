//! pawn-ngin
//!
//! A small third-person character core. Stick input becomes motion, motion is
//! corrected against static level geometry, skeletal poses are blended, a
//! trailing camera follows the character and every object is drawn by
//! replaying a command block that was recorded once at setup.
//!
//! High-level modules
//! - `animation`: keyframe clips and the players that sample them into poses
//! - `camera`: trailing camera solver, projection and view uniforms
//! - `collision`: surface queries against level geometry and move correction
//! - `context`: explicit per-frame state (viewport, projection, lights, timing)
//! - `data_structures`: transforms, drawables, skeletons and the player character
//! - `input`: raw controller state and input sources
//! - `light`: ambient, directional lights and fog
//! - `motion`: stick input to yaw and position deltas
//! - `render`: command recording/execution seams and a headless executor
//! - `resources`: loading meshes, skeletons and clips from OBJ and glTF files
//! - `scene`: setup and the ordered per-frame loop
//! - `gpu` (feature `gpu`): wgpu draw lists as command blocks, winit keyboard stick
//!

pub mod animation;
pub mod camera;
pub mod collision;
pub mod context;
pub mod data_structures;
#[cfg(feature = "gpu")]
pub mod gpu;
pub mod input;
pub mod light;
pub mod motion;
pub mod render;
pub mod resources;
pub mod scene;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;

/// Install `env_logger`, configured through `RUST_LOG`.
///
/// Safe to call more than once; later calls only print a warning.
pub fn init_logging() {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    }
}
