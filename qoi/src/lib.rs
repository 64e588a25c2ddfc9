//! Encoder and decoder for the [QOI Image format](https://qoiformat.org/).
//!
//! QOI losslessly compresses 8-bit RGB and RGBA images into a byte stream made of a 14-byte
//! header, a sequence of variable-length operations and an 8-byte end marker. Every operation
//! describes one or more pixels relative to the previous pixel or to a 64-entry color array of
//! recently seen pixels.
//!
//! # Header
//!
//! - 4-byte magic: `qoif`
//! - u32be width (non-zero)
//! - u32be height (non-zero)
//! - u8 channels: 3 = RGB, 4 = RGBA
//! - u8 colorspace: 0 = sRGB with linear alpha, 1 = all channels linear
//!
//! The colorspace byte is informative only and never changes how pixels are encoded.
//!
//! ## Color array
//!
//! Every pixel produced by a non-run operation is stored in the color array at
//! `(r * 3 + g * 5 + b * 7 + a * 11) % 64`. Both encoder and decoder start out with a zeroed
//! array and `(0, 0, 0, 255)` as the previous pixel.
//!
//! # Stream format
//!
//! See [consts] for the different operation types.
//!
//! # Example
//!
//! ```
//! use qoi::{Channels, Colorspace, ImageDescriptor};
//!
//! let descriptor = ImageDescriptor::new(1, 1, Channels::Rgba, Colorspace::Srgb);
//! let encoded = qoi::encode_to_vec(&[10, 20, 30, 255], &descriptor).unwrap();
//!
//! let (pixels, decoded) = qoi::decode_to_vec(&encoded).unwrap();
//! assert_eq!(pixels, [10, 20, 30, 255]);
//! assert_eq!(decoded, descriptor);
//! ```
#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod decode;
pub mod encode;
pub mod header;
pub mod options;
pub mod utils;

#[cfg(feature = "alloc")]
pub use decode::{decode_to_vec, decode_to_vec_with_options, VecDecodeOutput};
pub use decode::{
    decode_header, decode_to_slice, decode_with_output, DecodeError, DecodeOutput, Malformation,
    SliceDecodeOutput,
};
#[cfg(feature = "std")]
pub use encode::{encode, WriteEncodedError};
#[cfg(feature = "alloc")]
pub use encode::encode_to_vec;
pub use encode::{
    encode_to_slice, encoded_size_limit, EncodeError, EncodeOutput, SliceEncodeOutput,
};
pub use header::{Channels, Colorspace, DescriptorError, ImageDescriptor};
pub use options::DecodeOptions;
pub use utils::Pixel;

pub mod consts {
    /// Magic bytes every QOI stream starts with.
    pub const QOI_MAGIC: [u8; 4] = *b"qoif";

    /// Size of the header: magic, width, height, channels, colorspace.
    pub const QOI_HEADER_SIZE: usize = 14;

    /// Marks the end of the stream: seven `0x00` bytes followed by `0x01`.
    ///
    /// A valid encoder never produces this pattern: it would take consecutive [`QOI_OP_INDEX`]
    /// references to the same index, which are always written as a [`QOI_OP_RUN`] instead.
    pub const QOI_END_MARKER: [u8; 8] = [0, 0, 0, 0, 0, 0, 0, 1];

    /// Longest run a single [`QOI_OP_RUN`] can describe.
    pub const QOI_MAX_RUN: usize = 62;

    /// Upper bound for `width * height`. Images at or above this size are rejected, which keeps
    /// the worst-case encoded size below 2 GB.
    pub const QOI_PIXELS_MAX: usize = 400_000_000;

    /// Mask selecting the 2-bit tag of the short operations.
    pub const QOI_MASK_2: u8 = 0b1100_0000;

    /// Re-emit a pixel from the color array.
    ///
    /// ```plain
    /// .- QOI_OP_INDEX ----------.
    /// |         Byte[0]         |
    /// |  7  6  5  4  3  2  1  0 |
    /// |-------+-----------------|
    /// |  0  0 |     index       |
    /// `-------------------------`
    /// ```
    ///
    /// - 2-bit tag b00
    /// - 6-bit index into the color array: 0..63
    /// - A valid encoder must not issue 2 or more consecutive QOI_OP_INDEX chunks to the same
    ///   index. QOI_OP_RUN should be used instead.
    pub const QOI_OP_INDEX: u8 = 0b0000_0000;

    /// Calculate a pixel based on a 2-bit difference from the previous pixel.
    ///
    /// ```plain
    /// .- QOI_OP_DIFF -----------.
    /// |         Byte[0]         |
    /// |  7  6  5  4  3  2  1  0 |
    /// |-------+-----+-----+-----|
    /// |  0  1 |  dr |  dg |  db |
    /// `-------------------------`
    /// ```
    ///
    /// - 2-bit tag b01
    /// - 2-bit red channel difference from the previous pixel between -2..1, stored with a bias
    ///   of 2
    /// - 2-bit green channel difference from the previous pixel between -2..1, stored with a bias
    ///   of 2
    /// - 2-bit blue channel difference from the previous pixel between -2..1, stored with a bias
    ///   of 2
    ///
    /// Differences wrap around, so `1 - 2` is 255 and `255 + 1` is 0. Alpha stays unchanged.
    pub const QOI_OP_DIFF: u8 = 0b0100_0000;

    /// Calculate a pixel based on a 6-bit green-channel difference from the previous pixel, and
    /// differences to the green-channel difference for red and blue.
    ///
    ///  ```plain
    /// .- QOI_OP_LUMA -------------------------------------.
    /// |         Byte[0]         |         Byte[1]         |
    /// |  7  6  5  4  3  2  1  0 |  7  6  5  4  3  2  1  0 |
    /// |-------+-----------------+-------------+-----------|
    /// |  1  0 |   green diff    |   dr - dg   |  db - dg  |
    /// `---------------------------------------------------`
    /// ```
    ///
    /// - 2-bit tag b10
    /// - 6-bit green channel difference from the previous pixel (`-32..31`), stored with a bias of
    ///   32
    /// - 4-bit red channel difference minus green channel difference (`-8..7`), stored with a bias
    ///   of 8
    /// - 4-bit blue channel difference minus green channel difference (`-8..7`), stored with a bias
    ///   of 8
    ///
    /// Alpha stays unchanged.
    pub const QOI_OP_LUMA: u8 = 0b1000_0000;

    /// Repeats the last pixel.
    ///
    /// ```plain
    /// .- QOI_OP_RUN ------------.
    /// |         Byte[0]         |
    /// |  7  6  5  4  3  2  1  0 |
    /// |-------+-----------------|
    /// |  1  1 |       run       |
    /// `-------------------------`
    /// ```
    ///
    /// - 2-bit tag b11
    /// - 6-bit run-length repeating the previous pixel: 1..62
    /// - The run-length is stored with a bias of -1. Note that the run-lengths 63 and 64 (`b111110`
    ///   and `b111111`) are illegal as they are occupied by the QOI_OP_RGB and QOI_OP_RGBA tag.
    pub const QOI_OP_RUN: u8 = 0b1100_0000;

    /// Emits a full pixel, keeping the alpha of the previous pixel.
    ///
    /// ```plain
    /// .- QOI_OP_RGB ------------------------------------------.
    /// |         Byte[0]         | Byte[1] | Byte[2] | Byte[3] |
    /// |  7  6  5  4  3  2  1  0 | 7 .. 0  | 7 .. 0  | 7 .. 0  |
    /// |-------------------------+---------+---------+---------|
    /// |  1  1  1  1  1  1  1  0 |   red   |  green  |  blue   |
    /// `-------------------------------------------------------`
    /// ```
    ///
    /// - 8-bit tag b11111110
    pub const QOI_OP_RGB: u8 = 0b1111_1110;

    /// Emits a full pixel including alpha.
    ///
    /// ```plain
    /// .- QOI_OP_RGBA ---------------------------------------------------.
    /// |         Byte[0]         | Byte[1] | Byte[2] | Byte[3] | Byte[4] |
    /// |  7  6  5  4  3  2  1  0 | 7 .. 0  | 7 .. 0  | 7 .. 0  | 7 .. 0  |
    /// |-------------------------+---------+---------+---------+---------|
    /// |  1  1  1  1  1  1  1  1 |   red   |  green  |  blue   |  alpha  |
    /// `-----------------------------------------------------------------`
    /// ```
    ///
    /// - 8-bit tag b11111111
    pub const QOI_OP_RGBA: u8 = 0b1111_1111;
}
