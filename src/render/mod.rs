// SPDX-License-Identifier: GPL-3.0-only

//! Render context: per-tick frame driver and display target ownership
//!
//! The [`RenderLoop`] owns every GPU object in the pipeline and is driven
//! by the host's display-refresh ticks and surface lifecycle events. Each
//! tick pulls the newest frame from the channel, uploads it through the
//! [`TextureCache`], draws it with the [`EffectPipeline`] into a
//! persistent offscreen display target, and services pending snapshot
//! requests. Presenting the target to an actual window is the host's blit
//! and stays outside this crate.

pub mod effect;
pub mod snapshot;
pub mod texture_cache;

use crate::constants::{READBACK_ROW_ALIGN, READBACK_TIMEOUT};
use crate::errors::{GpuError, PipelineResult, SnapshotError};
use crate::frame::FrameBuffer;
use crate::frame::channel::FrameChannel;
use effect::{EffectControls, EffectPipeline};
use snapshot::{SnapshotHandle, SnapshotQueue};
use std::sync::Arc;
use std::time::Duration;
use texture_cache::TextureCache;
use tracing::{debug, info, trace, warn};

/// Color format of the display target and the snapshot readback
pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Render loop lifecycle, driven by surface events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    /// No valid output surface; ticks are no-ops
    Idle,
    /// Surface exists but no frame has been shown yet
    Ready,
    /// Steady state: at least one frame presented
    Rendering,
}

/// Offscreen texture standing in for the display surface
struct RenderTarget {
    view: wgpu::TextureView,
    texture: wgpu::Texture,
    width: u32,
    height: u32,
}

/// Owns the GPU side of the pipeline and advances it one display tick at
/// a time. All methods must be called from the thread owning the GPU
/// context.
pub struct RenderLoop {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    channel: Arc<FrameChannel>,
    controls: Arc<EffectControls>,
    effect: EffectPipeline,
    cache: TextureCache,
    /// Bind group for the current frame texture, keyed by the cache
    /// allocation generation it was built against
    frame_binding: Option<(u64, wgpu::BindGroup)>,
    target: Option<RenderTarget>,
    state: SurfaceState,
    frames_presented: u64,
    snapshots: Arc<SnapshotQueue>,
}

impl RenderLoop {
    /// Build the render context. Shader compilation failures surface here,
    /// before any tick runs.
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        channel: Arc<FrameChannel>,
        controls: Arc<EffectControls>,
    ) -> Result<Self, GpuError> {
        let effect = EffectPipeline::new(&device, TARGET_FORMAT)?;
        info!("render pipeline constructed");
        Ok(Self {
            device,
            queue,
            channel,
            controls,
            effect,
            cache: TextureCache::new(),
            frame_binding: None,
            target: None,
            state: SurfaceState::Idle,
            frames_presented: 0,
            snapshots: Arc::new(SnapshotQueue::default()),
        })
    }

    /// Handle for requesting snapshots from any thread
    pub fn snapshot_handle(&self) -> SnapshotHandle {
        SnapshotHandle::new(self.snapshots.clone())
    }

    pub fn state(&self) -> SurfaceState {
        self.state
    }

    /// Frames drawn into the display target so far
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// The display target the host blits to its swapchain, if a surface
    /// exists
    pub fn target_view(&self) -> Option<&wgpu::TextureView> {
        self.target.as_ref().map(|t| &t.view)
    }

    /// Host surface appeared at the given size
    pub fn surface_created(&mut self, width: u32, height: u32) -> PipelineResult<()> {
        self.allocate_target(width, height)?;
        self.state = SurfaceState::Ready;
        info!(width, height, "surface created");
        Ok(())
    }

    /// Host surface changed size. Reallocates the display target only;
    /// the uploaded frame texture is untouched.
    pub fn surface_resized(&mut self, width: u32, height: u32) -> PipelineResult<()> {
        if self.state == SurfaceState::Idle {
            return self.surface_created(width, height);
        }
        self.allocate_target(width, height)?;
        debug!(width, height, "surface resized");
        Ok(())
    }

    /// Host surface went away. Transient: GPU resources are retained for
    /// the next `surface_created`.
    pub fn surface_destroyed(&mut self) {
        self.target = None;
        self.state = SurfaceState::Idle;
        info!("surface destroyed");
    }

    /// One display-refresh tick.
    ///
    /// With no surface this is a no-op (pending snapshot callers are
    /// answered rather than left to time out). Otherwise: take the newest
    /// frame if any, upload it, and draw. A tick without a new frame
    /// re-draws the previously uploaded texture, so capture running slower
    /// than the display never flickers. Per-frame upload failures are
    /// logged and skipped; the previous image stays on screen.
    pub fn tick(&mut self) -> PipelineResult<()> {
        if self.state == SurfaceState::Idle {
            self.answer_snapshots(Err(SnapshotError::NoFrameAvailable));
            return Ok(());
        }

        // Redraw hints are satisfied by the tick itself
        let _ = self.controls.take_redraw_request();
        let effect_state = self.controls.snapshot();

        if let Some(frame) = self.channel.try_take() {
            trace!(
                latency_ms = frame.captured_at().elapsed().as_millis() as u64,
                "uploading captured frame"
            );
            if let Err(err) = self.cache.upload(&self.device, &self.queue, &frame) {
                warn!(%err, "frame upload failed, keeping previous image");
            }
        }

        self.refresh_frame_binding();

        if let (Some((tex_w, tex_h)), Some((_, bind_group)), Some(target)) = (
            self.cache.dimensions(),
            self.frame_binding.as_ref(),
            self.target.as_ref(),
        ) {
            self.effect
                .update_uniforms(&self.queue, tex_w, tex_h, effect_state);

            let mut encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("pixelize render encoder"),
                });
            self.effect.draw(&mut encoder, &target.view, bind_group);
            self.queue.submit(std::iter::once(encoder.finish()));

            self.frames_presented += 1;
            self.state = SurfaceState::Rendering;
        }

        self.service_snapshots();
        Ok(())
    }

    /// Release GPU resources. Must run on the render context, after the
    /// capture side has been quiesced.
    pub fn teardown(&mut self) {
        self.answer_snapshots(Err(SnapshotError::NoFrameAvailable));
        self.frame_binding = None;
        self.cache.release();
        self.target = None;
        self.state = SurfaceState::Idle;
        info!("render context torn down");
    }

    fn allocate_target(&mut self, width: u32, height: u32) -> PipelineResult<()> {
        self.device
            .push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("pixelize display target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(GpuError::ResourceAllocation(err.to_string()).into());
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        if let Some(old) = self.target.take() {
            old.texture.destroy();
        }
        self.target = Some(RenderTarget {
            view,
            texture,
            width,
            height,
        });
        Ok(())
    }

    /// Rebuild the frame bind group when the cache reallocated its texture
    fn refresh_frame_binding(&mut self) {
        let generation = self.cache.generation();
        let stale = match self.frame_binding {
            Some((bound_generation, _)) => bound_generation != generation,
            None => true,
        };
        if stale {
            if let Some(view) = self.cache.view() {
                let bind_group = self.effect.bind_frame(&self.device, view);
                self.frame_binding = Some((generation, bind_group));
            } else {
                self.frame_binding = None;
            }
        }
    }

    fn service_snapshots(&mut self) {
        if self.snapshots.is_empty() {
            return;
        }
        let reply = if self.frames_presented == 0 {
            Err(SnapshotError::NoFrameAvailable)
        } else {
            self.read_target()
        };
        self.answer_snapshots(reply);
    }

    fn answer_snapshots(&self, reply: Result<FrameBuffer, SnapshotError>) {
        for waiter in self.snapshots.drain() {
            let _ = waiter.send(reply.clone());
        }
    }

    /// Read the post-effect display target back to CPU memory
    fn read_target(&self) -> Result<FrameBuffer, SnapshotError> {
        let target = self
            .target
            .as_ref()
            .ok_or(SnapshotError::NoFrameAvailable)?;
        let (width, height) = (target.width, target.height);

        let padded_bytes_per_row = (width * 4).next_multiple_of(READBACK_ROW_ALIGN);

        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("pixelize snapshot staging"),
            size: (padded_bytes_per_row * height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("pixelize snapshot encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = staging_buffer.slice(..);
        let (sender, mut receiver) = futures::channel::oneshot::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });

        // Bounded wait: a wedged device fails the request instead of
        // pinning the render thread inside a tick
        let deadline = std::time::Instant::now() + READBACK_TIMEOUT;
        let mapped = loop {
            let _ = self.device.poll(wgpu::PollType::Poll);
            match receiver.try_recv() {
                Ok(Some(result)) => break result,
                Ok(None) => {
                    if std::time::Instant::now() >= deadline {
                        return Err(SnapshotError::ReadbackFailed(
                            "device did not complete readback within the bounded wait".into(),
                        ));
                    }
                    std::thread::sleep(Duration::from_millis(1));
                }
                Err(_) => {
                    return Err(SnapshotError::ReadbackFailed(
                        "mapping callback dropped".into(),
                    ));
                }
            }
        };
        mapped.map_err(|e| SnapshotError::ReadbackFailed(format!("{:?}", e)))?;

        let data = buffer_slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        if padded_bytes_per_row == width * 4 {
            pixels.extend_from_slice(&data[..(width * height * 4) as usize]);
        } else {
            for row in 0..height {
                let start = (row * padded_bytes_per_row) as usize;
                pixels.extend_from_slice(&data[start..start + (width * 4) as usize]);
            }
        }
        drop(data);
        staging_buffer.unmap();

        FrameBuffer::rgba8(width, height, width * 4, pixels)
            .map_err(|e| SnapshotError::ReadbackFailed(e.to_string()))
    }
}
