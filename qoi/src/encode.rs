use crate::{
    consts::*,
    header::{Channels, DescriptorError, ImageDescriptor},
    utils::{diff, Pixel},
};
#[cfg(feature = "alloc")]
use alloc::vec::Vec;
use itertools::Itertools;
use log::debug;
use snafu::{ensure, OptionExt, ResultExt, Snafu};

#[cfg(feature = "std")]
mod std_api;
#[cfg(feature = "std")]
pub use std_api::*;

#[derive(Debug, Snafu)]
pub enum EncodeError {
    #[snafu(display("Invalid image descriptor: {source}"))]
    InvalidDescriptor { source: DescriptorError },
    #[snafu(display(
        "Pixel buffer holds {actual} bytes, but the image descriptor requires {expected} bytes"
    ))]
    BufferLengthMismatch { expected: usize, actual: usize },
    #[snafu(display(
        "Output buffer holds {available} bytes, but encoding may need up to {required} bytes"
    ))]
    OutputTooSmall { required: usize, available: usize },
}

/// Destination for encoded bytes.
pub trait EncodeOutput {
    type Error;

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;
}

#[cfg(feature = "alloc")]
impl EncodeOutput for Vec<u8> {
    type Error = core::convert::Infallible;

    #[inline]
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

/// Writes into a caller-provided slice, failing once it is full.
pub struct SliceEncodeOutput<'a> {
    output: &'a mut [u8],
    output_idx: usize,
}

impl<'a> SliceEncodeOutput<'a> {
    #[inline]
    pub fn new(output: &'a mut [u8]) -> Self {
        Self {
            output,
            output_idx: 0,
        }
    }

    /// Number of bytes written so far.
    #[inline]
    pub fn current_output_position(&self) -> usize {
        self.output_idx
    }
}

impl EncodeOutput for SliceEncodeOutput<'_> {
    type Error = EncodeError;

    #[inline]
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        let end = self.output_idx + bytes.len();
        let available = self.output.len();
        self.output
            .get_mut(self.output_idx..end)
            .context(OutputTooSmallSnafu {
                required: end,
                available,
            })?
            .copy_from_slice(bytes);
        self.output_idx = end;
        Ok(())
    }
}

/// Running state of a single encode call.
#[derive(Debug, Clone, Copy)]
pub(crate) struct QoiEncodeContext {
    prev: Pixel,
    arr: [Pixel; 64],
}

impl QoiEncodeContext {
    pub(crate) const fn new() -> Self {
        Self {
            prev: Pixel::START,
            arr: [Pixel::ZERO; 64],
        }
    }

    /// Writes header, pixels and end marker. Input has to be checked with [`check_input`] first.
    pub(crate) fn encode_with_state<O: EncodeOutput>(
        &mut self,
        descriptor: &ImageDescriptor,
        pixels: &[u8],
        w: &mut O,
    ) -> Result<(), O::Error> {
        w.write_bytes(&descriptor.to_header_bytes())?;
        self.encode_pixels(pixels, descriptor.channels, w)?;
        w.write_bytes(&QOI_END_MARKER)
    }

    fn encode_pixels<O: EncodeOutput>(
        &mut self,
        pixels: &[u8],
        channels: Channels,
        w: &mut O,
    ) -> Result<(), O::Error> {
        let groups = pixels
            .chunks_exact(channels.count())
            .map(Pixel::read)
            .dedup_with_count();

        for (count, pixel) in groups {
            // only the very first group can continue the initial previous pixel
            let repeats = if pixel == self.prev {
                count
            } else {
                self.encode_pixel(pixel, w)?;
                count - 1
            };

            Self::encode_run(repeats, w)?;
        }

        Ok(())
    }

    fn encode_run<O: EncodeOutput>(count: usize, w: &mut O) -> Result<(), O::Error> {
        for _ in 0..count / QOI_MAX_RUN {
            w.write_bytes(&[QOI_OP_RUN | (QOI_MAX_RUN - 1) as u8])?;
        }

        let rest_count = count % QOI_MAX_RUN;
        if rest_count > 0 {
            w.write_bytes(&[QOI_OP_RUN | (rest_count - 1) as u8])?;
        }

        Ok(())
    }

    /// Encodes a pixel that differs from the previous one.
    fn encode_pixel<O: EncodeOutput>(&mut self, pixel: Pixel, w: &mut O) -> Result<(), O::Error> {
        let prev = core::mem::replace(&mut self.prev, pixel);

        let hash = pixel.hash();
        let slot = &mut self.arr[usize::from(hash)];
        if *slot == pixel {
            // already in arr
            return w.write_bytes(&[QOI_OP_INDEX | hash]);
        }
        *slot = pixel;

        let [r, g, b, a] = pixel.0;
        if a != prev.alpha() {
            return w.write_bytes(&[QOI_OP_RGBA, r, g, b, a]);
        }

        let [r_prev, g_prev, b_prev, _] = prev.0;
        let (r_diff, g_diff, b_diff) = (diff(r, r_prev), diff(g, g_prev), diff(b, b_prev));

        if matches!((r_diff, g_diff, b_diff), (-2..=1, -2..=1, -2..=1)) {
            let mut b = QOI_OP_DIFF;
            b |= ((r_diff + 2) as u8) << 4;
            b |= ((g_diff + 2) as u8) << 2;
            b |= (b_diff + 2) as u8;
            return w.write_bytes(&[b]);
        }

        let rg_diff = r_diff.wrapping_sub(g_diff);
        let bg_diff = b_diff.wrapping_sub(g_diff);

        if matches!((rg_diff, g_diff, bg_diff), (-8..=7, -32..=31, -8..=7)) {
            let bytes = [
                QOI_OP_LUMA | (g_diff + 32) as u8,
                ((rg_diff + 8) as u8) << 4 | (bg_diff + 8) as u8,
            ];
            w.write_bytes(&bytes)
        } else {
            w.write_bytes(&[QOI_OP_RGB, r, g, b])
        }
    }
}

fn check_input(pixels: &[u8], descriptor: &ImageDescriptor) -> Result<(), EncodeError> {
    descriptor.validate().context(InvalidDescriptorSnafu)?;

    let expected = descriptor.buffer_len();
    ensure!(
        pixels.len() == expected,
        BufferLengthMismatchSnafu {
            expected,
            actual: pixels.len()
        }
    );

    Ok(())
}

/// Worst-case size of the stream produced for an image with this descriptor.
pub const fn encoded_size_limit(descriptor: &ImageDescriptor) -> usize {
    descriptor.max_encoded_len()
}

/// Encodes `pixels` into a new QOI stream.
///
/// `pixels` is read row by row, top to bottom, with 3 or 4 bytes per pixel as specified by the
/// descriptor.
#[cfg(feature = "alloc")]
pub fn encode_to_vec(pixels: &[u8], descriptor: &ImageDescriptor) -> Result<Vec<u8>, EncodeError> {
    check_input(pixels, descriptor)?;

    let mut w = Vec::with_capacity(encoded_size_limit(descriptor));
    QoiEncodeContext::new()
        .encode_with_state(descriptor, pixels, &mut w)
        .unwrap_or_else(|never| match never {});

    debug!(
        "Encoded {}x{} {:?} image into {} bytes",
        descriptor.width,
        descriptor.height,
        descriptor.channels,
        w.len()
    );

    Ok(w)
}

/// Encodes `pixels` into `output`, returning the number of bytes written.
///
/// `output` has to hold at least [`encoded_size_limit`] bytes, regardless of how well the image
/// compresses.
pub fn encode_to_slice(
    output: &mut [u8],
    pixels: &[u8],
    descriptor: &ImageDescriptor,
) -> Result<usize, EncodeError> {
    check_input(pixels, descriptor)?;

    let required = encoded_size_limit(descriptor);
    ensure!(
        output.len() >= required,
        OutputTooSmallSnafu {
            required,
            available: output.len()
        }
    );

    let mut w = SliceEncodeOutput::new(output);
    QoiEncodeContext::new().encode_with_state(descriptor, pixels, &mut w)?;

    debug!(
        "Encoded {}x{} {:?} image into {} bytes",
        descriptor.width,
        descriptor.height,
        descriptor.channels,
        w.current_output_position()
    );

    Ok(w.current_output_position())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{header::Colorspace, utils::OpKind};

    fn rgba(width: u32, height: u32) -> ImageDescriptor {
        ImageDescriptor::new(width, height, Channels::Rgba, Colorspace::Srgb)
    }

    fn rgb(width: u32, height: u32) -> ImageDescriptor {
        ImageDescriptor::new(width, height, Channels::Rgb, Colorspace::Srgb)
    }

    /// Splits the operation part of a stream into operations.
    fn ops(encoded: &[u8]) -> Vec<(OpKind, &[u8])> {
        let mut data = &encoded[QOI_HEADER_SIZE..encoded.len() - QOI_END_MARKER.len()];
        let mut ops = Vec::new();
        while let Some(&byte) = data.first() {
            let kind = OpKind::from_tag(byte);
            let (op, rest) = data.split_at(1 + kind.payload_len());
            ops.push((kind, op));
            data = rest;
        }
        ops
    }

    fn encode_single(pixels: &[[u8; 4]]) -> Vec<u8> {
        let flat = pixels.concat();
        let encoded = encode_to_vec(&flat, &rgba(pixels.len() as u32, 1)).unwrap();
        encoded[QOI_HEADER_SIZE..encoded.len() - QOI_END_MARKER.len()].to_vec()
    }

    #[test]
    fn literal_rgb_pixel() {
        let encoded = encode_to_vec(&[10, 20, 30, 255], &rgba(1, 1)).unwrap();

        assert_eq!(
            encoded,
            [
                b'q', b'o', b'i', b'f', 0, 0, 0, 1, 0, 0, 0, 1, 4, 0, // header
                0b1111_1110, 10, 20, 30, // QOI_OP_RGB
                0, 0, 0, 0, 0, 0, 0, 1, // end marker
            ]
        );
    }

    #[test]
    fn rgba_op() {
        assert_eq!(encode_single(&[[101, 102, 103, 104]]), [0xff, 101, 102, 103, 104]);
    }

    #[test]
    fn diff_op() {
        // (1 - 0) + 2 = 3 for every channel
        assert_eq!(encode_single(&[[1, 1, 1, 255]]), [0x40 | 3 << 4 | 3 << 2 | 3]);
        // -1 on every channel, wrapping below zero
        assert_eq!(encode_single(&[[255, 255, 255, 255]]), [0x40 | 1 << 4 | 1 << 2 | 1]);
    }

    #[test]
    fn luma_op() {
        // dg = 8, dr - dg = -8, db - dg = -8
        assert_eq!(encode_single(&[[0, 8, 0, 255]]), [0x80 | 40, 0]);
        // dg = -32, dr - dg = 7, db - dg = 7
        assert_eq!(
            encode_single(&[[0, 0, 0, 255], [231, 224, 231, 255]]),
            [0xc0, 0x80, 15 << 4 | 15]
        );
    }

    #[test]
    fn alpha_change_prevents_diffs() {
        assert_eq!(
            encode_single(&[[1, 1, 1, 254]]),
            [0xff, 1, 1, 1, 254]
        );
    }

    #[test]
    fn runs_are_split_at_62() {
        let pixels = [0, 0, 0, 255].repeat(70);
        let encoded = encode_to_vec(&pixels, &rgba(70, 1)).unwrap();

        assert_eq!(encoded.len(), QOI_HEADER_SIZE + 2 + QOI_END_MARKER.len());
        assert_eq!(
            ops(&encoded),
            [
                (OpKind::Run, &[0xc0 | 61][..]),
                (OpKind::Run, &[0xc0 | 7][..]),
            ]
        );
    }

    #[test]
    fn trailing_run() {
        let encoded = encode_to_vec(&[101, 102, 103, 101, 102, 103], &rgb(2, 1)).unwrap();

        assert_eq!(
            ops(&encoded),
            [
                (OpKind::Rgb, &[0xfe, 101, 102, 103][..]),
                (OpKind::Run, &[0xc0][..]),
            ]
        );
    }

    #[test]
    fn index_reuses_most_recent_slot_content() {
        // both hash to 56
        let a = [1, 0, 0, 255];
        let b = [65, 0, 0, 255];
        let x = [200, 200, 200, 255];
        assert_eq!(Pixel(a).hash(), Pixel(b).hash());

        assert_eq!(
            encode_single(&[a, b, x, b, a]),
            [
                0x40 | 3 << 4 | 2 << 2 | 2, // a
                0xfe, 65, 0, 0, // b, overwrites a
                0xfe, 200, 200, 200, // x
                0x38, // b from the array
                0xfe, 1, 0, 0, // a is gone from the array
            ]
        );
    }

    #[test]
    fn rgb_images_never_use_rgba() {
        let pixels = (0..300u32)
            .flat_map(|i| [(i * 7) as u8, (i * 13) as u8, (i * i) as u8])
            .collect::<Vec<_>>();
        let encoded = encode_to_vec(&pixels, &rgb(20, 15)).unwrap();

        assert_eq!(encoded[12], 3);
        assert!(ops(&encoded).iter().all(|(kind, _)| *kind != OpKind::Rgba));
    }

    #[test]
    fn deterministic() {
        let pixels = (0..=255u8).flat_map(|i| [i, i / 2, 255 - i, i | 1]).collect::<Vec<_>>();

        assert_eq!(
            encode_to_vec(&pixels, &rgba(16, 16)).unwrap(),
            encode_to_vec(&pixels, &rgba(16, 16)).unwrap()
        );
    }

    #[test]
    fn slice_output_matches_vec_output() {
        let pixels = (0..=255u8).flat_map(|i| [i / 3, i / 5, i / 7]).collect::<Vec<_>>();
        let descriptor = rgb(32, 8);
        let expected = encode_to_vec(&pixels, &descriptor).unwrap();

        let mut output = vec![0; encoded_size_limit(&descriptor)];
        let len = encode_to_slice(&mut output, &pixels, &descriptor).unwrap();
        assert_eq!(&output[..len], expected);

        let mut output = vec![0; expected.len()];
        assert!(matches!(
            encode_to_slice(&mut output, &pixels, &descriptor),
            Err(EncodeError::OutputTooSmall { .. })
        ));
    }

    #[test]
    fn rejects_invalid_input() {
        assert!(matches!(
            encode_to_vec(&[], &rgba(0, 1)),
            Err(EncodeError::InvalidDescriptor {
                source: DescriptorError::ZeroDimensions { .. }
            })
        ));
        assert!(matches!(
            encode_to_vec(&[0; 7], &rgba(2, 1)),
            Err(EncodeError::BufferLengthMismatch {
                expected: 8,
                actual: 7
            })
        ));
        assert!(matches!(
            encode_to_vec(&[0; 8], &rgb(2, 1)),
            Err(EncodeError::BufferLengthMismatch {
                expected: 6,
                actual: 8
            })
        ));
    }
}
