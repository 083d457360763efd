//! Command recording and execution.
//!
//! Every model is recorded once, at setup, into an opaque command block. Per
//! frame the scene only hands each block its current material, tint and
//! joint matrices; the block itself is never rebuilt.
//!
//! # Key types
//!
//! - [`CommandRecorder`] turns a loaded model into a replayable block
//! - [`CommandExecutor`] receives the per-frame view, lights and block submissions
//! - [`headless::HeadlessExecutor`] records everything it receives, for tests and tooling
//!

use cgmath::Matrix4;

use crate::{
    camera::ViewSetup,
    context::Viewport,
    data_structures::{colour::Colour, transform::MaterialRaw},
    light::{Fog, LightState},
    resources::ModelAsset,
};

/// Whether a block deforms its vertices with joint matrices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawMode {
    Static,
    Skinned,
}

pub trait CommandRecorder {
    type Block;

    /// Record the draw commands for `model`. Called once per model at setup.
    fn record(&mut self, model: &ModelAsset, mode: DrawMode) -> anyhow::Result<Self::Block>;
}

pub trait CommandExecutor: CommandRecorder {
    fn begin_frame(&mut self, clear_colour: Colour, fog: &Fog);

    /// Push projection and view for the frame.
    fn set_view(&mut self, view: &ViewSetup, viewport: &Viewport);

    fn set_lights(&mut self, light: &LightState);

    /// Replay `block` with the given per-object state. `joints` is `Some`
    /// exactly for skinned blocks and holds matrices computed this frame.
    fn run_block(
        &mut self,
        block: &Self::Block,
        material: &MaterialRaw,
        tint: Colour,
        joints: Option<&[Matrix4<f32>]>,
    );

    fn end_frame(&mut self);
}

pub mod headless {
    //! An executor that draws nothing and remembers every call.

    use super::*;

    /// Block recorded by the [`HeadlessExecutor`].
    #[derive(Debug, PartialEq, Eq)]
    pub struct HeadlessBlock {
        pub id: usize,
        pub model: String,
        pub mode: DrawMode,
        pub triangles: usize,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub enum Command {
        BeginFrame { clear_colour: Colour },
        SetView { eye: [f32; 3], target: [f32; 3] },
        SetLights { active: usize },
        RunBlock {
            block: usize,
            material: MaterialRaw,
            tint: Colour,
            joints: Option<Vec<[[f32; 4]; 4]>>,
        },
        EndFrame,
    }

    #[derive(Debug, Default)]
    pub struct HeadlessExecutor {
        pub recorded: Vec<String>,
        pub commands: Vec<Command>,
    }

    impl HeadlessExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        /// Commands since the last `BeginFrame`.
        pub fn last_frame(&self) -> &[Command] {
            let start = self
                .commands
                .iter()
                .rposition(|c| matches!(c, Command::BeginFrame { .. }))
                .unwrap_or(0);
            &self.commands[start..]
        }

        pub fn clear(&mut self) {
            self.commands.clear();
        }
    }

    impl CommandRecorder for HeadlessExecutor {
        type Block = HeadlessBlock;

        fn record(&mut self, model: &ModelAsset, mode: DrawMode) -> anyhow::Result<HeadlessBlock> {
            model.ensure_meshes()?;
            if mode == DrawMode::Skinned && !model.is_skinned() {
                anyhow::bail!("cannot record '{}' as skinned, it has no skeleton", model.name);
            }
            let block = HeadlessBlock {
                id: self.recorded.len(),
                model: model.name.clone(),
                mode,
                triangles: model.meshes.iter().map(|m| m.indices.len() / 3).sum(),
            };
            self.recorded.push(model.name.clone());
            Ok(block)
        }
    }

    impl CommandExecutor for HeadlessExecutor {
        fn begin_frame(&mut self, clear_colour: Colour, _fog: &Fog) {
            self.commands.push(Command::BeginFrame { clear_colour });
        }

        fn set_view(&mut self, view: &ViewSetup, _viewport: &Viewport) {
            self.commands.push(Command::SetView {
                eye: view.camera.eye.into(),
                target: view.camera.target.into(),
            });
        }

        fn set_lights(&mut self, light: &LightState) {
            self.commands.push(Command::SetLights {
                active: light.lit().len(),
            });
        }

        fn run_block(
            &mut self,
            block: &HeadlessBlock,
            material: &MaterialRaw,
            tint: Colour,
            joints: Option<&[Matrix4<f32>]>,
        ) {
            self.commands.push(Command::RunBlock {
                block: block.id,
                material: *material,
                tint,
                joints: joints.map(|j| j.iter().map(|&m| m.into()).collect()),
            });
        }

        fn end_frame(&mut self) {
            self.commands.push(Command::EndFrame);
        }
    }
}
