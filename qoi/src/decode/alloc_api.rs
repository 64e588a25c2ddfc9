use crate::{
    decode::{decode_with_output, DecodeError, DecodeOutput},
    header::{Channels, ImageDescriptor},
    options::DecodeOptions,
    utils::Pixel,
};
use alloc::vec::Vec;

/// Appends decoded pixels to a `Vec`.
pub struct VecDecodeOutput<'a> {
    output: &'a mut Vec<u8>,
    channels: usize,
}

impl<'a> VecDecodeOutput<'a> {
    #[inline]
    pub fn new(output: &'a mut Vec<u8>) -> Self {
        Self {
            output,
            channels: Channels::Rgba.count(),
        }
    }
}

impl DecodeOutput for VecDecodeOutput<'_> {
    fn start(
        &mut self,
        _pixel_count: usize,
        available: usize,
        channels: Channels,
    ) -> Result<(), DecodeError> {
        self.channels = channels.count();
        // headers can claim far more pixels than the stream holds
        self.output.reserve(available * self.channels);
        Ok(())
    }

    #[inline]
    fn write_pixel(&mut self, pixel: Pixel) {
        self.output.extend_from_slice(&pixel.0[..self.channels]);
    }

    #[inline]
    fn write_many_pixels(&mut self, pixel: Pixel, count: usize) {
        for _ in 0..count {
            self.output.extend_from_slice(&pixel.0[..self.channels]);
        }
    }

    #[inline]
    fn current_output_position(&self) -> usize {
        self.output.len()
    }
}

/// Decodes a stream into a new pixel buffer with the channel count declared in its header.
pub fn decode_to_vec(data: &[u8]) -> Result<(Vec<u8>, ImageDescriptor), DecodeError> {
    decode_to_vec_with_options(data, &DecodeOptions::default())
}

/// Decodes a stream into a new pixel buffer.
///
/// The returned descriptor is the one found in the header, even if `options` requested a
/// different output channel count.
pub fn decode_to_vec_with_options(
    data: &[u8],
    options: &DecodeOptions,
) -> Result<(Vec<u8>, ImageDescriptor), DecodeError> {
    let mut pixels = Vec::new();
    let descriptor = decode_with_output(data, &mut VecDecodeOutput::new(&mut pixels), options)?;
    Ok((pixels, descriptor))
}
