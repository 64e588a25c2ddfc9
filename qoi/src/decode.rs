use crate::{
    consts::*,
    header::{Channels, DescriptorError, ImageDescriptor},
    options::DecodeOptions,
    utils::{OpKind, Pixel},
};
use core::fmt;
use log::{debug, trace, warn};
use snafu::{ensure, OptionExt, ResultExt, Snafu};

mod ops;

#[cfg(feature = "alloc")]
mod alloc_api;
#[cfg(feature = "alloc")]
pub use alloc_api::*;

/// Ways in which a stream can violate the format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Malformation {
    /// The stream doesn't start with `qoif`.
    InvalidMagic,
    /// The stream ends inside the header or inside an operation.
    UnexpectedEof,
    /// The last pixel isn't followed by the end marker.
    MissingEndMarker,
}

impl fmt::Display for Malformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Malformation::InvalidMagic => "invalid magic bytes",
            Malformation::UnexpectedEof => "unexpected end of stream",
            Malformation::MissingEndMarker => "missing end marker",
        })
    }
}

#[derive(Debug, Snafu)]
#[snafu(module)]
pub enum DecodeError {
    #[snafu(display("Malformed QOI stream: {reason}"))]
    MalformedStream { reason: Malformation },
    #[snafu(display("Invalid image descriptor in header: {source}"))]
    InvalidDescriptor { source: DescriptorError },
    #[snafu(display("Stream ended after {decoded} of {expected} pixels"))]
    TruncatedOutput { expected: usize, decoded: usize },
    #[snafu(display(
        "Output buffer holds {available} bytes, but the image needs {required} bytes"
    ))]
    OutputTooSmall { required: usize, available: usize },
    #[snafu(display("Image has {pixels} pixels, more than the configured limit of {limit}"))]
    TooManyPixels { pixels: usize, limit: usize },
}

/// Receives decoded pixels.
pub trait DecodeOutput {
    /// Prepares the output for `pixel_count` pixels of `channels` bytes each.
    ///
    /// Called once after the header has been parsed, before any pixel is written. The decoder
    /// never writes more than `pixel_count` pixels afterwards.
    ///
    /// `pixel_count` comes from the header and isn't backed by any data yet. `available` is an
    /// upper bound on the pixels the rest of the stream can produce, so outputs that allocate
    /// should size themselves by it.
    fn start(
        &mut self,
        pixel_count: usize,
        available: usize,
        channels: Channels,
    ) -> Result<(), DecodeError>;
    fn write_pixel(&mut self, pixel: Pixel);
    fn write_many_pixels(&mut self, pixel: Pixel, count: usize);

    /// Returns the number of bytes written so far.
    fn current_output_position(&self) -> usize;
}

/// Writes decoded pixels into a caller-provided slice.
pub struct SliceDecodeOutput<'a> {
    output: &'a mut [u8],
    output_idx: usize,
    channels: usize,
}

impl<'a> SliceDecodeOutput<'a> {
    #[inline]
    pub fn new(output: &'a mut [u8]) -> Self {
        Self {
            output,
            output_idx: 0,
            channels: Channels::Rgba.count(),
        }
    }
}

impl DecodeOutput for SliceDecodeOutput<'_> {
    fn start(
        &mut self,
        pixel_count: usize,
        _available: usize,
        channels: Channels,
    ) -> Result<(), DecodeError> {
        let required = pixel_count * channels.count();
        ensure!(
            self.output.len() >= required,
            decode_error::OutputTooSmallSnafu {
                required,
                available: self.output.len()
            }
        );
        self.channels = channels.count();
        Ok(())
    }

    #[inline]
    fn write_pixel(&mut self, pixel: Pixel) {
        let end = self.output_idx + self.channels;
        self.output[self.output_idx..end].copy_from_slice(&pixel.0[..self.channels]);
        self.output_idx = end;
    }

    #[inline]
    fn write_many_pixels(&mut self, pixel: Pixel, count: usize) {
        let end = self.output_idx + count * self.channels;
        for chunk in self.output[self.output_idx..end].chunks_exact_mut(self.channels) {
            chunk.copy_from_slice(&pixel.0[..self.channels]);
        }
        self.output_idx = end;
    }

    #[inline]
    fn current_output_position(&self) -> usize {
        self.output_idx
    }
}

/// Running state of a single decode call.
#[derive(Debug, Clone, Copy)]
pub(crate) struct QoiDecodeContext {
    prev: Pixel,
    arr: [Pixel; 64],
}

impl QoiDecodeContext {
    pub(crate) const fn new() -> Self {
        Self {
            prev: Pixel::START,
            arr: [Pixel::ZERO; 64],
        }
    }

    pub(crate) fn decode_with_state(
        &mut self,
        data: &[u8],
        output: &mut impl DecodeOutput,
        options: &DecodeOptions,
    ) -> Result<ImageDescriptor, DecodeError> {
        let descriptor = decode_header(data)?;

        let pixel_count = descriptor.pixel_count();
        let limit = options.get_max_pixels();
        // the limit itself is allowed
        ensure!(
            pixel_count <= limit,
            decode_error::TooManyPixelsSnafu {
                pixels: pixel_count,
                limit
            }
        );

        let channels = options.get_channels().unwrap_or(descriptor.channels);
        let data = &data[QOI_HEADER_SIZE..];
        // every operation byte yields at most one full run
        let available = data.len().saturating_mul(QOI_MAX_RUN).min(pixel_count);
        output.start(pixel_count, available, channels)?;

        let consumed = self.decode_pixels(data, pixel_count, output)?;
        check_end_marker(&data[consumed..], options)?;

        debug!(
            "Decoded {}x{} {:?} image from {} bytes, output holds {} bytes of {:?} pixels",
            descriptor.width,
            descriptor.height,
            descriptor.channels,
            QOI_HEADER_SIZE + data.len(),
            output.current_output_position(),
            channels
        );

        Ok(descriptor)
    }

    /// Decodes `pixel_count` pixels, returning the number of bytes consumed.
    fn decode_pixels(
        &mut self,
        data: &[u8],
        pixel_count: usize,
        output: &mut impl DecodeOutput,
    ) -> Result<usize, DecodeError> {
        let mut remaining = pixel_count;
        let mut pos = 0;

        while remaining > 0 {
            let &byte = data
                .get(pos)
                .context(decode_error::TruncatedOutputSnafu {
                    expected: pixel_count,
                    decoded: pixel_count - remaining,
                })?;
            let kind = OpKind::from_tag(byte);
            let payload = data
                .get(pos + 1..pos + 1 + kind.payload_len())
                .context(decode_error::MalformedStreamSnafu {
                    reason: Malformation::UnexpectedEof,
                })?;
            pos += 1 + kind.payload_len();

            let pixel = match kind {
                OpKind::Index => self.arr[usize::from(byte)],
                OpKind::Diff => ops::small_diff(self.prev, byte),
                OpKind::Luma => ops::luma_diff(self.prev, byte, payload[0]),
                OpKind::Rgb => Pixel::rgba(payload[0], payload[1], payload[2], self.prev.alpha()),
                OpKind::Rgba => Pixel::rgba(payload[0], payload[1], payload[2], payload[3]),
                OpKind::Run => {
                    // runs past the last pixel are cut off
                    let count = (usize::from(byte & !QOI_MASK_2) + 1).min(remaining);
                    output.write_many_pixels(self.prev, count);
                    remaining -= count;
                    // color array stays untouched
                    continue;
                }
            };

            self.arr[usize::from(pixel.hash())] = pixel;
            self.prev = pixel;
            output.write_pixel(pixel);
            remaining -= 1;
        }

        Ok(pos)
    }
}

fn check_end_marker(rest: &[u8], options: &DecodeOptions) -> Result<(), DecodeError> {
    if rest.starts_with(&QOI_END_MARKER) {
        if rest.len() > QOI_END_MARKER.len() {
            warn!(
                "Ignoring {} trailing bytes after the end marker",
                rest.len() - QOI_END_MARKER.len()
            );
        }
        return Ok(());
    }

    ensure!(
        !options.get_strict_end_marker(),
        decode_error::MalformedStreamSnafu {
            reason: Malformation::MissingEndMarker
        }
    );
    warn!("End marker missing, accepting stream anyway");

    Ok(())
}

/// Parses and validates the 14-byte header at the start of `data`.
pub fn decode_header(data: &[u8]) -> Result<ImageDescriptor, DecodeError> {
    let header = data
        .get(..QOI_HEADER_SIZE)
        .context(decode_error::MalformedStreamSnafu {
            reason: Malformation::UnexpectedEof,
        })?;

    let (magic, fields) = header.split_at(QOI_MAGIC.len());
    ensure!(
        magic == &QOI_MAGIC[..],
        decode_error::MalformedStreamSnafu {
            reason: Malformation::InvalidMagic
        }
    );

    let descriptor =
        ImageDescriptor::from_header_fields(fields).context(decode_error::InvalidDescriptorSnafu)?;
    trace!("Parsed QOI header: {descriptor:?}");

    Ok(descriptor)
}

/// Decodes a stream into a custom [`DecodeOutput`].
pub fn decode_with_output(
    data: &[u8],
    output: &mut impl DecodeOutput,
    options: &DecodeOptions,
) -> Result<ImageDescriptor, DecodeError> {
    QoiDecodeContext::new().decode_with_state(data, output, options)
}

/// Decodes a stream into `output`.
///
/// `output` has to hold `width * height * channels` bytes, where `channels` is the channel count
/// requested in `options` or, if none was requested, the one in the header. Returns the
/// descriptor found in the header.
pub fn decode_to_slice(
    data: &[u8],
    output: &mut [u8],
    options: &DecodeOptions,
) -> Result<ImageDescriptor, DecodeError> {
    decode_with_output(data, &mut SliceDecodeOutput::new(output), options)
}
