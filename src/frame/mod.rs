// SPDX-License-Identifier: GPL-3.0-only

//! Frame buffer types shared between the capture and render contexts
//!
//! A [`FrameBuffer`] is a plain value type wrapping raw pixel data with
//! its format, dimensions and row stride. Ownership is exclusive: the
//! capture context fills it, hands it to the [`channel::FrameChannel`],
//! and the render tick that takes it consumes it.

pub mod channel;
pub mod convert;

use crate::errors::CaptureError;
use std::time::Instant;

/// Pixel layout of a captured or converted frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    /// Planar 4:2:0: full-resolution Y plane followed by quarter-resolution
    /// U and V planes, each with half the luma row stride
    Yuv420Planar,
    /// Interleaved 8-bit RGBA
    Rgba8,
}

/// An owned frame with validated plane geometry
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    /// Row stride of the primary plane in bytes (luma plane for YUV420,
    /// full pixel row for RGBA)
    stride: u32,
    format: FrameFormat,
    data: Vec<u8>,
    captured_at: Instant,
}

impl FrameBuffer {
    /// Wrap a planar YUV420 buffer: Y plane (`stride * height`), then U and
    /// V planes (`stride/2 * height/2` each).
    ///
    /// Fails with [`CaptureError::MalformedFrame`] if the byte length or
    /// the declared geometry is inconsistent with 4:2:0 subsampling.
    pub fn yuv420(width: u32, height: u32, stride: u32, data: Vec<u8>) -> Result<Self, CaptureError> {
        if width == 0 || height == 0 {
            return Err(CaptureError::MalformedFrame(format!(
                "zero dimension: {}x{}",
                width, height
            )));
        }
        if width % 2 != 0 || height % 2 != 0 {
            return Err(CaptureError::MalformedFrame(format!(
                "4:2:0 frames need even dimensions, got {}x{}",
                width, height
            )));
        }
        if stride < width {
            return Err(CaptureError::MalformedFrame(format!(
                "stride {} smaller than width {}",
                stride, width
            )));
        }
        let required = Self::yuv420_len(height, stride);
        if data.len() < required {
            return Err(CaptureError::MalformedFrame(format!(
                "buffer holds {} bytes, {}x{} stride {} needs {}",
                data.len(),
                width,
                height,
                stride,
                required
            )));
        }
        Ok(Self {
            width,
            height,
            stride,
            format: FrameFormat::Yuv420Planar,
            data,
            captured_at: Instant::now(),
        })
    }

    /// Wrap an interleaved RGBA8 buffer with the given row stride.
    pub fn rgba8(width: u32, height: u32, stride: u32, data: Vec<u8>) -> Result<Self, CaptureError> {
        if width == 0 || height == 0 {
            return Err(CaptureError::MalformedFrame(format!(
                "zero dimension: {}x{}",
                width, height
            )));
        }
        if stride < width * 4 {
            return Err(CaptureError::MalformedFrame(format!(
                "stride {} smaller than row width {}",
                stride,
                width * 4
            )));
        }
        let required = stride as usize * height as usize;
        if data.len() < required {
            return Err(CaptureError::MalformedFrame(format!(
                "buffer holds {} bytes, {}x{} stride {} needs {}",
                data.len(),
                width,
                height,
                stride,
                required
            )));
        }
        Ok(Self {
            width,
            height,
            stride,
            format: FrameFormat::Rgba8,
            data,
            captured_at: Instant::now(),
        })
    }

    /// Total byte length of a YUV420 buffer with the given geometry
    fn yuv420_len(height: u32, stride: u32) -> usize {
        let y = stride as usize * height as usize;
        let chroma = (stride as usize / 2) * (height as usize / 2);
        y + 2 * chroma
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn format(&self) -> FrameFormat {
        self.format
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    /// Replace the capture timestamp, for frames whose delivery time is
    /// known upstream of construction
    pub fn with_captured_at(mut self, at: Instant) -> Self {
        self.captured_at = at;
        self
    }

    /// Consume the frame, returning its pixel storage
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Luma plane (YUV420 only)
    pub fn y_plane(&self) -> &[u8] {
        debug_assert_eq!(self.format, FrameFormat::Yuv420Planar);
        &self.data[..self.stride as usize * self.height as usize]
    }

    /// U chroma plane (YUV420 only)
    pub fn u_plane(&self) -> &[u8] {
        debug_assert_eq!(self.format, FrameFormat::Yuv420Planar);
        let y_len = self.stride as usize * self.height as usize;
        let c_len = self.chroma_plane_len();
        &self.data[y_len..y_len + c_len]
    }

    /// V chroma plane (YUV420 only)
    pub fn v_plane(&self) -> &[u8] {
        debug_assert_eq!(self.format, FrameFormat::Yuv420Planar);
        let y_len = self.stride as usize * self.height as usize;
        let c_len = self.chroma_plane_len();
        &self.data[y_len + c_len..y_len + 2 * c_len]
    }

    /// Row stride of the chroma planes in bytes
    pub fn chroma_stride(&self) -> usize {
        self.stride as usize / 2
    }

    fn chroma_plane_len(&self) -> usize {
        self.chroma_stride() * (self.height as usize / 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yuv_data(height: u32, stride: u32) -> Vec<u8> {
        vec![0u8; FrameBuffer::yuv420_len(height, stride)]
    }

    #[test]
    fn test_yuv420_plane_geometry() {
        let frame = FrameBuffer::yuv420(4, 4, 4, yuv_data(4, 4)).unwrap();
        assert_eq!(frame.y_plane().len(), 16);
        assert_eq!(frame.u_plane().len(), 4);
        assert_eq!(frame.v_plane().len(), 4);
        assert_eq!(frame.chroma_stride(), 2);
    }

    #[test]
    fn test_yuv420_rejects_short_buffer() {
        let mut data = yuv_data(4, 4);
        data.pop();
        assert!(matches!(
            FrameBuffer::yuv420(4, 4, 4, data),
            Err(CaptureError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_yuv420_rejects_odd_dimensions() {
        assert!(FrameBuffer::yuv420(5, 4, 5, vec![0u8; 64]).is_err());
        assert!(FrameBuffer::yuv420(4, 3, 4, vec![0u8; 64]).is_err());
    }

    #[test]
    fn test_yuv420_accepts_padded_stride() {
        let frame = FrameBuffer::yuv420(4, 4, 8, yuv_data(4, 8)).unwrap();
        assert_eq!(frame.stride(), 8);
        assert_eq!(frame.chroma_stride(), 4);
    }

    #[test]
    fn test_rgba8_rejects_undersized_stride() {
        assert!(FrameBuffer::rgba8(4, 4, 8, vec![0u8; 64]).is_err());
    }

    #[test]
    fn test_rgba8_valid() {
        let frame = FrameBuffer::rgba8(2, 2, 8, vec![0u8; 32]).unwrap();
        assert_eq!(frame.format(), FrameFormat::Rgba8);
        assert_eq!(frame.data().len(), 32);
    }
}
