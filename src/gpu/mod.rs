//! wgpu backend.
//!
//! Each model is recorded once into a [`GpuBlock`]: its vertex and index
//! buffers plus the draw calls that replay them. Per frame,
//! [`run_block`](crate::render::CommandExecutor::run_block) stages the
//! drawable's material, tint and joint palette into a slot of its own and
//! queues the block. [`GpuExecutor::render`] uploads the staged slots once and
//! replays the queue, binding each submission at its slot's dynamic offset.

pub mod input;
pub mod pipeline;
pub mod staging;

use std::sync::Arc;

use cgmath::{Matrix4, SquareMatrix};
use wgpu::util::DeviceExt;

use crate::{
    camera::{CameraUniform, ViewSetup},
    context::Viewport,
    data_structures::{colour::Colour, transform::MaterialRaw},
    light::{Fog, LightState},
    render::{CommandExecutor, CommandRecorder, DrawMode},
    resources::ModelAsset,
};
use staging::{DRAW_UNIFORM_SIZE, DrawStaging};

#[derive(Debug)]
struct GpuMesh {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    count: u32,
}

/// A recorded model: geometry on the device and one indexed draw per mesh.
#[derive(Debug)]
pub struct GpuBlock {
    meshes: Arc<[GpuMesh]>,
    joint_capacity: usize,
    mode: DrawMode,
}

/// A queued block and the dynamic offset of its uniform slot.
struct Submission {
    meshes: Arc<[GpuMesh]>,
    offset: u32,
}

const INITIAL_SLOTS: u64 = 16;
const INITIAL_JOINTS: u64 = 64;
const JOINT_SIZE: u64 = std::mem::size_of::<[[f32; 4]; 4]>() as u64;

fn mk_draw_buffer(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Draw Buffer"),
        size,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn mk_joint_buffer(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Joint Buffer"),
        size,
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn mk_draw_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    draw_buffer: &wgpu::Buffer,
    joint_buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: draw_buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(DRAW_UNIFORM_SIZE),
                }),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: joint_buffer.as_entire_binding(),
            },
        ],
        label: Some("draw_bind_group"),
    })
}

pub struct GpuExecutor {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::RenderPipeline,
    draw_layout: wgpu::BindGroupLayout,
    camera_uniform: CameraUniform,
    camera_buffer: wgpu::Buffer,
    light_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    draw_buffer: wgpu::Buffer,
    joint_buffer: wgpu::Buffer,
    draw_bind_group: wgpu::BindGroup,
    staging: DrawStaging,
    viewport: Option<Viewport>,
    clear_colour: wgpu::Color,
    queued: Vec<Submission>,
}

impl GpuExecutor {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, color_format: wgpu::TextureFormat) -> Self {
        let frame_layout = pipeline::mk_frame_layout(&device);
        let draw_layout = pipeline::mk_draw_layout(&device);
        let pipeline = pipeline::mk_pawn_pipeline(&device, color_format, &frame_layout, &draw_layout);

        let camera_uniform = CameraUniform::new();
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let light_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Buffer"),
            contents: bytemuck::cast_slice(&[LightState::default().to_uniform()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &frame_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: light_buffer.as_entire_binding(),
                },
            ],
            label: Some("frame_bind_group"),
        });

        let staging = DrawStaging::new(device.limits().min_uniform_buffer_offset_alignment);
        let draw_buffer = mk_draw_buffer(&device, staging.stride() * INITIAL_SLOTS);
        let joint_buffer = mk_joint_buffer(&device, JOINT_SIZE * INITIAL_JOINTS);
        let draw_bind_group = mk_draw_bind_group(&device, &draw_layout, &draw_buffer, &joint_buffer);

        Self {
            device,
            queue,
            pipeline,
            draw_layout,
            camera_uniform,
            camera_buffer,
            light_buffer,
            frame_bind_group,
            draw_buffer,
            joint_buffer,
            draw_bind_group,
            staging,
            viewport: None,
            clear_colour: wgpu::Color::BLACK,
            queued: Vec::new(),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Create a depth texture matching a target of the given size.
    pub fn create_depth_view(&self, width: u32, height: u32) -> wgpu::TextureView {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: pipeline::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[pipeline::DEPTH_FORMAT],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    /// Grow the draw and joint buffers to fit this frame's slots, then upload them.
    fn upload(&mut self) {
        let uniforms = self.staging.uniform_bytes();
        let joints: &[u8] = bytemuck::cast_slice(self.staging.joints());
        let mut rebind = false;
        if uniforms.len() as u64 > self.draw_buffer.size() {
            self.draw_buffer = mk_draw_buffer(&self.device, (uniforms.len() as u64).next_power_of_two());
            rebind = true;
        }
        if joints.len() as u64 > self.joint_buffer.size() {
            self.joint_buffer = mk_joint_buffer(&self.device, (joints.len() as u64).next_power_of_two());
            rebind = true;
        }
        if rebind {
            log::debug!(
                "draw buffers grown to {} and {} bytes",
                self.draw_buffer.size(),
                self.joint_buffer.size()
            );
            self.draw_bind_group =
                mk_draw_bind_group(&self.device, &self.draw_layout, &self.draw_buffer, &self.joint_buffer);
        }
        if !uniforms.is_empty() {
            self.queue.write_buffer(&self.draw_buffer, 0, uniforms);
        }
        self.queue.write_buffer(&self.joint_buffer, 0, joints);
    }

    /// Replay every block queued since the last call into `target`, a texture
    /// of `target_size` pixels.
    pub fn render(&mut self, target: &wgpu::TextureView, depth: &wgpu::TextureView, target_size: (u32, u32)) {
        self.upload();
        let (width, height) = target_size;
        let viewport = self.viewport.unwrap_or(Viewport::full(width, height));
        let rect = staging::viewport_rect(&viewport, width, height);
        if rect.is_none() {
            log::debug!("viewport {:?} lies outside a {}x{} target", viewport, width, height);
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });
            if let Some([x, y, w, h]) = rect {
                pass.set_viewport(x, y, w, h, 0.0, 1.0);
                pass.set_pipeline(&self.pipeline);
                pass.set_bind_group(0, &self.frame_bind_group, &[]);
                for submission in &self.queued {
                    pass.set_bind_group(1, &self.draw_bind_group, &[submission.offset]);
                    for mesh in submission.meshes.iter() {
                        pass.set_vertex_buffer(0, mesh.vertices.slice(..));
                        pass.set_index_buffer(mesh.indices.slice(..), wgpu::IndexFormat::Uint32);
                        pass.draw_indexed(0..mesh.count, 0, 0..1);
                    }
                }
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        self.queued.clear();
        self.staging.clear();
    }
}

impl CommandRecorder for GpuExecutor {
    type Block = GpuBlock;

    fn record(&mut self, model: &ModelAsset, mode: DrawMode) -> anyhow::Result<GpuBlock> {
        model.ensure_meshes()?;
        let joint_capacity = match mode {
            DrawMode::Static => 1,
            DrawMode::Skinned => model
                .skeleton
                .as_ref()
                .map(|s| s.joint_count().max(1))
                .ok_or_else(|| anyhow::anyhow!("cannot record '{}' as skinned, it has no skeleton", model.name))?,
        };

        let meshes: Arc<[GpuMesh]> = model
            .meshes
            .iter()
            .map(|mesh| GpuMesh {
                vertices: self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{:?} Vertex Buffer", mesh.name)),
                    contents: bytemuck::cast_slice(&mesh.vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                }),
                indices: self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{:?} Index Buffer", mesh.name)),
                    contents: bytemuck::cast_slice(&mesh.indices),
                    usage: wgpu::BufferUsages::INDEX,
                }),
                count: mesh.indices.len() as u32,
            })
            .collect();
        log::info!("Model recorded with {} draw calls: {}", meshes.len(), model.name);

        Ok(GpuBlock {
            meshes,
            joint_capacity,
            mode,
        })
    }
}

impl CommandExecutor for GpuExecutor {
    fn begin_frame(&mut self, clear_colour: Colour, _fog: &Fog) {
        let [r, g, b, a] = clear_colour.to_f32();
        self.clear_colour = wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: a as f64,
        };
        self.queued.clear();
        self.staging.clear();
    }

    fn set_view(&mut self, view: &ViewSetup, viewport: &Viewport) {
        self.viewport = Some(*viewport);
        self.camera_uniform.update_view_proj(view);
        self.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[self.camera_uniform]),
        );
    }

    fn set_lights(&mut self, light: &LightState) {
        self.queue
            .write_buffer(&self.light_buffer, 0, bytemuck::cast_slice(&[light.to_uniform()]));
    }

    fn run_block(
        &mut self,
        block: &GpuBlock,
        material: &MaterialRaw,
        tint: Colour,
        joints: Option<&[Matrix4<f32>]>,
    ) {
        let palette = match (block.mode, joints) {
            (DrawMode::Skinned, Some(joints)) => {
                if joints.len() != block.joint_capacity {
                    log::warn!(
                        "{} joint matrices for a block recorded with {}",
                        joints.len(),
                        block.joint_capacity
                    );
                }
                let mut palette: Vec<Matrix4<f32>> =
                    joints.iter().take(block.joint_capacity).copied().collect();
                palette.resize(block.joint_capacity, Matrix4::identity());
                Some(palette)
            }
            (DrawMode::Skinned, None) => {
                log::warn!("skinned block submitted without joint matrices, drawing the bind pose");
                Some(vec![Matrix4::identity(); block.joint_capacity])
            }
            (DrawMode::Static, _) => None,
        };
        let offset = self.staging.push(material, tint, palette.as_deref());
        self.queued.push(Submission {
            meshes: Arc::clone(&block.meshes),
            offset,
        });
    }

    fn end_frame(&mut self) {}
}
