// SPDX-License-Identifier: GPL-3.0-only

//! Pixelation effect pipeline and its shared parameter state
//!
//! One render pipeline covers both pass-through and mosaic rendering; the
//! fragment stage mixes the quantization term by a uniform flag, so the UI
//! toggle never recompiles or relinks anything. Shader or pipeline
//! creation failures are caught in a validation error scope and fail
//! construction; an invalid program never reaches a draw call.

use crate::constants::{DEFAULT_BLOCK_SIZE, clamp_block_size};
use crate::errors::GpuError;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Effect parameters as read once per render tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectState {
    pub enabled: bool,
    /// Mosaic tile side in source-texture pixels, >= 1.0
    pub block_size: f32,
}

impl Default for EffectState {
    fn default() -> Self {
        Self {
            enabled: false,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

/// Process-wide effect parameters, written by UI callers and read by the
/// render context once per tick.
///
/// Writes become visible on the next tick that loads them; no
/// frame-accurate synchronization is needed or provided.
#[derive(Debug)]
pub struct EffectControls {
    enabled: AtomicBool,
    block_size_bits: AtomicU32,
    redraw_requested: AtomicBool,
}

impl EffectControls {
    pub fn new(initial: EffectState) -> Self {
        Self {
            enabled: AtomicBool::new(initial.enabled),
            block_size_bits: AtomicU32::new(clamp_block_size(initial.block_size).to_bits()),
            redraw_requested: AtomicBool::new(false),
        }
    }

    /// Fire-and-forget toggle from the UI layer
    pub fn set_effect_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    /// Fire-and-forget block size update; invalid values clamp to 1.0
    pub fn set_block_size(&self, size: f32) {
        self.block_size_bits
            .store(clamp_block_size(size).to_bits(), Ordering::Release);
    }

    /// Redraw hint from the UI layer; ticks coalesce these freely
    pub fn request_redraw(&self) {
        self.redraw_requested.store(true, Ordering::Release);
    }

    /// Consume a pending redraw hint
    pub fn take_redraw_request(&self) -> bool {
        self.redraw_requested.swap(false, Ordering::AcqRel)
    }

    /// Read a consistent-enough copy for one render tick
    pub fn snapshot(&self) -> EffectState {
        EffectState {
            enabled: self.enabled.load(Ordering::Acquire),
            block_size: f32::from_bits(self.block_size_bits.load(Ordering::Acquire)),
        }
    }
}

impl Default for EffectControls {
    fn default() -> Self {
        Self::new(EffectState::default())
    }
}

/// Uniform buffer layout, must match `EffectParams` in pixelate.wgsl
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct EffectUniform {
    texture_size: [f32; 2],
    block_size: f32,
    enabled: u32,
}

/// Render pipeline drawing the frame texture through the mosaic shader
pub struct EffectPipeline {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    uniform_buffer: wgpu::Buffer,
}

impl EffectPipeline {
    /// Compile the shader and build the pipeline against the given target
    /// format. Compile or link failures are fatal here, before any
    /// rendering is attempted.
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Result<Self, GpuError> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("pixelize effect shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("pixelate.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("pixelize effect bind group layout"),
            entries: &[
                // Frame texture
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                // Sampler
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                // Effect uniform
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pixelize effect pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("pixelize effect pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            multiview: None,
            cache: None,
        });

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(GpuError::ShaderCompile(err.to_string()));
        }

        // Nearest sampling keeps pass-through output bit-identical to the
        // uploaded frame and makes each mosaic tile a single texel's color.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("pixelize frame sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("pixelize effect uniform buffer"),
            size: std::mem::size_of::<EffectUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            pipeline,
            bind_group_layout,
            sampler,
            uniform_buffer,
        })
    }

    /// Build the bind group for a (re)allocated frame texture
    pub fn bind_frame(&self, device: &wgpu::Device, view: &wgpu::TextureView) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("pixelize effect bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
            ],
        })
    }

    /// Push this tick's effect parameters to the GPU
    pub fn update_uniforms(
        &self,
        queue: &wgpu::Queue,
        texture_width: u32,
        texture_height: u32,
        state: EffectState,
    ) {
        let uniform = EffectUniform {
            texture_size: [texture_width as f32, texture_height as f32],
            block_size: clamp_block_size(state.block_size),
            enabled: u32::from(state.enabled),
        };
        queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniform));
    }

    /// Draw the bound frame texture into `target`
    pub fn draw(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        bind_group: &wgpu::BindGroup,
    ) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("pixelize effect pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, Some(bind_group), &[]);
        render_pass.draw(0..6, 0..1);
    }
}
