use std::sync::Arc;

use cgmath::Matrix4;

use crate::{
    data_structures::{
        colour::Colour,
        transform::{MaterialRaw, Transform, TransformOverride},
    },
    render::CommandExecutor,
};

/// Something on screen: a transform, the material matrix derived from it,
/// a tint and a command block shared with every other drawable of the same model.
///
/// The material is allocated once and rewritten by [`Drawable::commit`].
#[derive(Debug)]
pub struct Drawable<B> {
    pub transform: Transform,
    pub tint: Colour,
    material: MaterialRaw,
    block: Arc<B>,
}

impl<B> Drawable<B> {
    pub fn new(block: Arc<B>, transform: Transform, tint: Colour) -> Self {
        let material = transform.to_raw();
        Self {
            transform,
            tint,
            material,
            block,
        }
    }

    pub fn block(&self) -> &Arc<B> {
        &self.block
    }

    pub fn material(&self) -> &MaterialRaw {
        &self.material
    }

    /// Rewrite the material from the current transform.
    pub fn commit(&mut self) {
        self.transform.write_raw(&mut self.material);
    }

    /// Apply the present fields of `update` and commit.
    pub fn set_model_transform(&mut self, update: &TransformOverride) {
        if update.is_empty() {
            return;
        }
        update.apply(&mut self.transform);
        self.commit();
    }

    pub fn submit<E>(&self, executor: &mut E, joints: Option<&[Matrix4<f32>]>)
    where
        E: CommandExecutor<Block = B>,
    {
        executor.run_block(&self.block, &self.material, self.tint, joints);
    }
}
