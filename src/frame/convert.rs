// SPDX-License-Identifier: GPL-3.0-only

//! CPU YUV420 to RGBA conversion
//!
//! Direct buffer-to-buffer BT.601 full-range conversion with
//! nearest-neighbor chroma upsampling: each 2x2 luma block shares one
//! chroma pair. Fixed-point arithmetic (7-bit shift) keeps every channel
//! within a couple of code values of the floating-point reference.

use crate::errors::CaptureError;
use crate::frame::{FrameBuffer, FrameFormat};

// BT.601 full-range coefficients scaled by 128:
//   R = Y + 1.402 (V-128)
//   G = Y - 0.344 (U-128) - 0.714 (V-128)
//   B = Y + 1.772 (U-128)
const R_V: i32 = 179; // 1.402 * 128
const G_U: i32 = 44; //  0.344 * 128
const G_V: i32 = 91; //  0.714 * 128
const B_U: i32 = 227; // 1.772 * 128

/// Convert a planar YUV420 frame into an interleaved RGBA8 frame.
///
/// Pure function of its input: a new tightly-packed buffer
/// (`stride == width * 4`) is returned with alpha set to 255 for every
/// pixel. Fails with [`CaptureError::MalformedFrame`] when handed a frame
/// that is not YUV420.
pub fn yuv420_to_rgba(frame: &FrameBuffer) -> Result<FrameBuffer, CaptureError> {
    if frame.format() != FrameFormat::Yuv420Planar {
        return Err(CaptureError::MalformedFrame(format!(
            "expected YUV420 input, got {:?}",
            frame.format()
        )));
    }

    let width = frame.width() as usize;
    let height = frame.height() as usize;
    let y_stride = frame.stride() as usize;
    let c_stride = frame.chroma_stride();

    let y_plane = frame.y_plane();
    let u_plane = frame.u_plane();
    let v_plane = frame.v_plane();

    let mut rgba = vec![0u8; width * height * 4];

    // Two luma rows per chroma row
    for row in (0..height).step_by(2) {
        let c_row = row / 2;
        convert_row(
            y_plane, u_plane, v_plane, &mut rgba, row, c_row, width, y_stride, c_stride,
        );
        if row + 1 < height {
            convert_row(
                y_plane, u_plane, v_plane, &mut rgba, row + 1, c_row, width, y_stride, c_stride,
            );
        }
    }

    FrameBuffer::rgba8(frame.width(), frame.height(), frame.width() * 4, rgba)
}

#[inline]
#[allow(clippy::too_many_arguments)]
fn convert_row(
    y_plane: &[u8],
    u_plane: &[u8],
    v_plane: &[u8],
    rgba: &mut [u8],
    row: usize,
    c_row: usize,
    width: usize,
    y_stride: usize,
    c_stride: usize,
) {
    let y_row = row * y_stride;
    let c_row_start = c_row * c_stride;
    let out_row = row * width * 4;

    // Pixel pairs share one chroma sample
    for x in (0..width).step_by(2) {
        let c_offset = c_row_start + x / 2;
        let u = u_plane[c_offset] as i32 - 128;
        let v = v_plane[c_offset] as i32 - 128;

        let r_term = (R_V * v + 64) >> 7;
        let g_term = (G_U * u + G_V * v + 64) >> 7;
        let b_term = (B_U * u + 64) >> 7;

        let y0 = y_plane[y_row + x] as i32;
        let out = out_row + x * 4;
        rgba[out] = (y0 + r_term).clamp(0, 255) as u8;
        rgba[out + 1] = (y0 - g_term).clamp(0, 255) as u8;
        rgba[out + 2] = (y0 + b_term).clamp(0, 255) as u8;
        rgba[out + 3] = 255;

        if x + 1 < width {
            let y1 = y_plane[y_row + x + 1] as i32;
            let out = out_row + (x + 1) * 4;
            rgba[out] = (y1 + r_term).clamp(0, 255) as u8;
            rgba[out + 1] = (y1 - g_term).clamp(0, 255) as u8;
            rgba[out + 2] = (y1 + b_term).clamp(0, 255) as u8;
            rgba[out + 3] = 255;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_yuv(width: u32, height: u32, y: u8, u: u8, v: u8) -> FrameBuffer {
        let y_len = (width * height) as usize;
        let c_len = (width / 2 * height / 2) as usize;
        let mut data = vec![y; y_len];
        data.extend(std::iter::repeat_n(u, c_len));
        data.extend(std::iter::repeat_n(v, c_len));
        FrameBuffer::yuv420(width, height, width, data).unwrap()
    }

    /// Floating-point BT.601 full-range reference
    fn reference_rgb(y: u8, u: u8, v: u8) -> [f32; 3] {
        let y = y as f32;
        let u = u as f32 - 128.0;
        let v = v as f32 - 128.0;
        [
            y + 1.402 * v,
            y - 0.344136 * u - 0.714136 * v,
            y + 1.772 * u,
        ]
    }

    #[test]
    fn test_neutral_gray_is_gray() {
        let rgba = yuv420_to_rgba(&make_yuv(4, 4, 128, 128, 128)).unwrap();
        for px in rgba.data().chunks_exact(4) {
            assert_eq!(px, &[128, 128, 128, 255]);
        }
    }

    #[test]
    fn test_alpha_always_opaque() {
        let rgba = yuv420_to_rgba(&make_yuv(8, 8, 40, 200, 90)).unwrap();
        for px in rgba.data().chunks_exact(4) {
            assert_eq!(px[3], 255);
        }
    }

    #[test]
    fn test_matches_float_reference_within_tolerance() {
        for &(y, u, v) in &[
            (0u8, 128u8, 128u8),
            (255, 128, 128),
            (81, 90, 240),  // red-ish
            (145, 54, 34),  // green-ish
            (41, 240, 110), // blue-ish
            (200, 100, 160),
        ] {
            let rgba = yuv420_to_rgba(&make_yuv(4, 4, y, u, v)).unwrap();
            let expected = reference_rgb(y, u, v);
            let px = &rgba.data()[..4];
            for ch in 0..3 {
                let want = expected[ch].clamp(0.0, 255.0);
                let got = px[ch] as f32;
                assert!(
                    (got - want).abs() <= 2.0,
                    "YUV ({y},{u},{v}) channel {ch}: got {got}, reference {want}"
                );
            }
        }
    }

    #[test]
    fn test_output_geometry() {
        let rgba = yuv420_to_rgba(&make_yuv(6, 4, 128, 128, 128)).unwrap();
        assert_eq!(rgba.width(), 6);
        assert_eq!(rgba.height(), 4);
        assert_eq!(rgba.stride(), 24);
        assert_eq!(rgba.format(), FrameFormat::Rgba8);
        assert_eq!(rgba.data().len(), 6 * 4 * 4);
    }

    #[test]
    fn test_rejects_rgba_input() {
        let frame = FrameBuffer::rgba8(2, 2, 8, vec![0u8; 32]).unwrap();
        assert!(matches!(
            yuv420_to_rgba(&frame),
            Err(CaptureError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_padded_stride_input() {
        // 4x4 frame with luma stride 8: padding bytes must not leak into output
        let y_len = 8 * 4;
        let c_len = 4 * 2;
        let mut data = vec![0u8; y_len + 2 * c_len];
        for row in 0..4 {
            for col in 0..4 {
                data[row * 8 + col] = 128;
            }
        }
        for c in data.iter_mut().skip(y_len) {
            *c = 128;
        }
        let frame = FrameBuffer::yuv420(4, 4, 8, data).unwrap();
        let rgba = yuv420_to_rgba(&frame).unwrap();
        for px in rgba.data().chunks_exact(4) {
            assert_eq!(px, &[128, 128, 128, 255]);
        }
    }
}
