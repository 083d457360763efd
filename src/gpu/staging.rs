//! CPU side of a frame's draw data.
//!
//! Every [`run_block`](crate::render::CommandExecutor::run_block) call gets its
//! own uniform slot, addressed by a dynamic offset, so two drawables sharing a
//! model keep their own material and tint. Joint palettes are packed into one
//! contiguous array and each slot records where its palette starts.

use cgmath::{Matrix4, SquareMatrix};

use crate::{
    context::Viewport,
    data_structures::{colour::Colour, transform::MaterialRaw},
};

/**
 * Per-submission uniform: material matrices, tint and the first joint of the
 * palette the vertices index into. Matches `Draw` in `pawn.wgsl`.
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniform {
    pub material: MaterialRaw,
    pub tint: [f32; 4],
    pub joint_base: u32,
    _padding: [u32; 3],
}

pub const DRAW_UNIFORM_SIZE: u64 = std::mem::size_of::<DrawUniform>() as u64;

fn align_to(size: u64, alignment: u64) -> u64 {
    let alignment = alignment.max(1);
    size.div_ceil(alignment) * alignment
}

#[derive(Debug)]
pub struct DrawStaging {
    stride: u64,
    uniforms: Vec<u8>,
    joints: Vec<[[f32; 4]; 4]>,
}

impl DrawStaging {
    /// `alignment` is the device's `min_uniform_buffer_offset_alignment`.
    pub fn new(alignment: u32) -> Self {
        let mut staging = Self {
            stride: align_to(DRAW_UNIFORM_SIZE, alignment as u64),
            uniforms: Vec::new(),
            joints: Vec::new(),
        };
        staging.clear();
        staging
    }

    /// Drop every slot. Joint 0 stays the identity that rigid blocks skin with.
    pub fn clear(&mut self) {
        self.uniforms.clear();
        self.joints.clear();
        self.joints.push(Matrix4::<f32>::identity().into());
    }

    /// Stage one submission and return the dynamic offset of its uniform slot.
    pub fn push(&mut self, material: &MaterialRaw, tint: Colour, joints: Option<&[Matrix4<f32>]>) -> u32 {
        let joint_base = match joints {
            Some(joints) if !joints.is_empty() => {
                let base = self.joints.len() as u32;
                self.joints.extend(joints.iter().map(|&m| -> [[f32; 4]; 4] { m.into() }));
                base
            }
            _ => 0,
        };
        let uniform = DrawUniform {
            material: *material,
            tint: tint.to_f32(),
            joint_base,
            _padding: [0; 3],
        };
        let offset = self.uniforms.len() as u64;
        self.uniforms.extend_from_slice(bytemuck::bytes_of(&uniform));
        self.uniforms.resize((offset + self.stride) as usize, 0);
        offset as u32
    }

    pub fn len(&self) -> usize {
        self.uniforms.len() / self.stride as usize
    }

    pub fn is_empty(&self) -> bool {
        self.uniforms.is_empty()
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }

    /// The uniform staged at a dynamic offset returned by [`DrawStaging::push`].
    pub fn uniform_at(&self, offset: u32) -> Option<DrawUniform> {
        let start = offset as usize;
        let bytes = self.uniforms.get(start..start + DRAW_UNIFORM_SIZE as usize)?;
        Some(bytemuck::pod_read_unaligned(bytes))
    }

    pub fn uniform_bytes(&self) -> &[u8] {
        &self.uniforms
    }

    pub fn joints(&self) -> &[[[f32; 4]; 4]] {
        &self.joints
    }
}

/// `(x, y, width, height)` for `RenderPass::set_viewport`, clipped to the
/// target. `None` when nothing of the viewport is left to draw into.
pub fn viewport_rect(viewport: &Viewport, target_width: u32, target_height: u32) -> Option<[f32; 4]> {
    let x = viewport.x.min(target_width);
    let y = viewport.y.min(target_height);
    let width = viewport.width.min(target_width - x);
    let height = viewport.height.min(target_height - y);
    if width == 0 || height == 0 {
        return None;
    }
    Some([x as f32, y as f32, width as f32, height as f32])
}

#[cfg(test)]
mod tests {
    use cgmath::Vector3;

    use super::*;
    use crate::data_structures::transform::Transform;

    #[test]
    fn uniform_matches_the_shader_layout() {
        assert_eq!(DRAW_UNIFORM_SIZE, 144);
        assert_eq!(DrawStaging::new(256).stride(), 256);
        assert_eq!(DrawStaging::new(16).stride(), 144);
        assert_eq!(DrawStaging::new(0).stride(), 144);
    }

    #[test]
    fn shared_block_keeps_each_material() {
        let mut staging = DrawStaging::new(256);
        let near = Transform::from(Vector3::new(0.0, 0.0, 0.0)).to_raw();
        let far = Transform::from(Vector3::new(0.0, -5.0, 0.0)).to_raw();

        let first = staging.push(&near, Colour::WHITE, None);
        let second = staging.push(&far, Colour::rgb(10, 20, 30), None);
        assert_ne!(first, second);
        assert_eq!(second as u64 % staging.stride(), 0);
        assert_eq!(staging.len(), 2);

        let a = staging.uniform_at(first).unwrap();
        let b = staging.uniform_at(second).unwrap();
        assert_eq!(a.material, near);
        assert_eq!(a.tint, Colour::WHITE.to_f32());
        assert_eq!(b.material, far);
        assert_eq!(b.tint, Colour::rgb(10, 20, 30).to_f32());
        assert_eq!(a.joint_base, 0);
        assert_eq!(b.joint_base, 0);
    }

    #[test]
    fn palettes_are_packed_after_the_identity() {
        let mut staging = DrawStaging::new(256);
        let raw = MaterialRaw::identity();
        let lifted = Matrix4::from_translation(Vector3::new(0.0, 1.0, 0.0));

        let rigid = staging.push(&raw, Colour::WHITE, None);
        let first = staging.push(&raw, Colour::WHITE, Some(&[lifted, lifted]));
        let second = staging.push(&raw, Colour::WHITE, Some(&[Matrix4::identity()]));
        let empty = staging.push(&raw, Colour::WHITE, Some(&[]));

        assert_eq!(staging.uniform_at(rigid).unwrap().joint_base, 0);
        assert_eq!(staging.uniform_at(first).unwrap().joint_base, 1);
        assert_eq!(staging.uniform_at(second).unwrap().joint_base, 3);
        assert_eq!(staging.uniform_at(empty).unwrap().joint_base, 0);
        let identity: [[f32; 4]; 4] = Matrix4::<f32>::identity().into();
        let lifted: [[f32; 4]; 4] = lifted.into();
        assert_eq!(staging.joints(), &[identity, lifted, lifted, identity]);

        staging.clear();
        assert!(staging.is_empty());
        assert_eq!(staging.joints(), &[identity]);
        assert!(staging.uniform_at(0).is_none());
    }

    #[test]
    fn viewport_is_clipped_to_the_target() {
        assert_eq!(
            viewport_rect(&Viewport::full(320, 240), 320, 240),
            Some([0.0, 0.0, 320.0, 240.0])
        );
        let half = Viewport {
            x: 160,
            y: 0,
            width: 160,
            height: 240,
        };
        assert_eq!(viewport_rect(&half, 320, 240), Some([160.0, 0.0, 160.0, 240.0]));
        assert_eq!(viewport_rect(&Viewport::full(800, 600), 320, 240), Some([0.0, 0.0, 320.0, 240.0]));
        let outside = Viewport { x: 400, ..half };
        assert_eq!(viewport_rect(&outside, 320, 240), None);
        assert_eq!(viewport_rect(&Viewport::full(0, 240), 320, 240), None);
    }
}
