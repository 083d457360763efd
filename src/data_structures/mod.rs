//! Engine data structures: transforms, drawables, skeletons and characters.
//!
//! This module contains the core data types for scene representation:
//!
//! - `transform` holds position/yaw/scale and the GPU-ready material matrix
//! - `drawable` pairs a transform with a shared, prerecorded command block
//! - `skeleton` contains joints, poses, pose blending and joint matrices
//! - `character` is the player pawn: drawable, camera rig, skeleton and animation sources
//! - `colour` is the RGBA8 colour used for tints and lights

pub mod character;
pub mod colour;
pub mod drawable;
pub mod skeleton;
pub mod transform;
