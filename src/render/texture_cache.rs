// SPDX-License-Identifier: GPL-3.0-only

//! GPU texture ownership and recycling
//!
//! One persistent frame texture, re-uploaded in place while frame
//! dimensions match and reallocated only when they change. This replaces
//! per-frame texture creation, which churns GPU memory for no benefit.

use crate::errors::{CaptureError, GpuError, PipelineError};
use crate::frame::{FrameBuffer, FrameFormat};
use tracing::debug;

/// Owns the RGBA frame texture sampled by the effect pipeline
pub struct TextureCache {
    texture: Option<wgpu::Texture>,
    view: Option<wgpu::TextureView>,
    width: u32,
    height: u32,
    /// Bumped on every (re)allocation; lets callers rebuild bind groups
    /// only when the underlying texture object changed
    generation: u64,
}

impl TextureCache {
    pub fn new() -> Self {
        Self {
            texture: None,
            view: None,
            width: 0,
            height: 0,
            generation: 0,
        }
    }

    /// Upload an RGBA8 frame, reusing the existing texture storage when the
    /// dimensions match and reallocating otherwise.
    ///
    /// Allocation failures (out of GPU memory, lost context) surface as
    /// [`GpuError::ResourceAllocation`]; the caller skips drawing that
    /// frame and keeps the previous image on screen.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        frame: &FrameBuffer,
    ) -> Result<&wgpu::TextureView, PipelineError> {
        if frame.format() != FrameFormat::Rgba8 {
            return Err(CaptureError::MalformedFrame(format!(
                "texture upload expects RGBA8, got {:?}",
                frame.format()
            ))
            .into());
        }

        if self.texture.is_none() || self.width != frame.width() || self.height != frame.height() {
            self.allocate(device, frame.width(), frame.height())?;
        }

        let texture = self
            .texture
            .as_ref()
            .ok_or_else(|| GpuError::ResourceAllocation("frame texture missing".into()))?;

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            frame.data(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(frame.stride()),
                rows_per_image: Some(frame.height()),
            },
            wgpu::Extent3d {
                width: frame.width(),
                height: frame.height(),
                depth_or_array_layers: 1,
            },
        );

        self.view
            .as_ref()
            .ok_or_else(|| GpuError::ResourceAllocation("frame texture view missing".into()).into())
    }

    fn allocate(&mut self, device: &wgpu::Device, width: u32, height: u32) -> Result<(), GpuError> {
        // Release the previous texture before the new allocation so peak
        // GPU memory stays at one frame texture.
        if let Some(old) = self.texture.take() {
            old.destroy();
        }
        self.view = None;

        debug!(width, height, "allocating frame texture");

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("pixelize frame texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(GpuError::ResourceAllocation(err.to_string()));
        }

        self.view = Some(texture.create_view(&wgpu::TextureViewDescriptor::default()));
        self.texture = Some(texture);
        self.width = width;
        self.height = height;
        self.generation += 1;
        Ok(())
    }

    /// Texture view for binding, if a frame has been uploaded
    pub fn view(&self) -> Option<&wgpu::TextureView> {
        self.view.as_ref()
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.texture.as_ref().map(|_| (self.width, self.height))
    }

    /// Allocation count since construction. Stays flat across same-size
    /// uploads; that is the no-leak property the tests check.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Explicit GPU release, called from the render context on teardown
    pub fn release(&mut self) {
        if let Some(texture) = self.texture.take() {
            texture.destroy();
        }
        self.view = None;
        self.width = 0;
        self.height = 0;
    }
}

impl Default for TextureCache {
    fn default() -> Self {
        Self::new()
    }
}
