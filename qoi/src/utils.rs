use crate::consts::*;

/// An RGBA pixel. Pixels read from 3-channel buffers carry an alpha of 255.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Pixel(pub [u8; 4]);

impl Pixel {
    /// The previous pixel both encoder and decoder start out with.
    pub const START: Pixel = Pixel([0, 0, 0, 255]);

    /// Content of every color array slot before the first pixel.
    pub const ZERO: Pixel = Pixel([0; 4]);

    #[inline]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Pixel([r, g, b, a])
    }

    /// Reads a pixel from a 3- or 4-byte chunk of a pixel buffer.
    #[inline]
    pub fn read(chunk: &[u8]) -> Self {
        match *chunk {
            [r, g, b, a] => Pixel([r, g, b, a]),
            [r, g, b] => Pixel([r, g, b, 255]),
            _ => unreachable!("pixel chunks are 3 or 4 bytes"),
        }
    }

    #[inline]
    pub const fn alpha(self) -> u8 {
        self.0[3]
    }

    /// Position of this pixel in the color array.
    #[inline]
    pub const fn hash(self) -> u8 {
        let [r, g, b, a] = self.0;
        // 64 divides 256, so wrapping at 8 bits doesn't change the result
        r.wrapping_mul(3)
            .wrapping_add(g.wrapping_mul(5))
            .wrapping_add(b.wrapping_mul(7))
            .wrapping_add(a.wrapping_mul(11))
            & 0b11_1111 // % 64
    }
}

/// Computes the signed difference between two channel values, wrapping at 8 bits.
#[inline]
pub const fn diff(a: u8, b: u8) -> i8 {
    a.wrapping_sub(b) as i8
}

/// Applies a signed difference to a channel value, wrapping at 8 bits.
#[inline]
pub const fn sum(a: u8, d: i8) -> u8 {
    a.wrapping_add(d as u8)
}

/// The operation selected by the leading bits of an operation byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Index,
    Diff,
    Luma,
    Run,
    Rgb,
    Rgba,
}

impl OpKind {
    #[inline]
    pub const fn from_tag(byte: u8) -> Self {
        match byte {
            QOI_OP_RGB => OpKind::Rgb,
            QOI_OP_RGBA => OpKind::Rgba,
            _ => match byte & QOI_MASK_2 {
                QOI_OP_INDEX => OpKind::Index,
                QOI_OP_DIFF => OpKind::Diff,
                QOI_OP_LUMA => OpKind::Luma,
                _ => OpKind::Run,
            },
        }
    }

    /// Number of bytes following the tag byte.
    #[inline]
    pub const fn payload_len(self) -> usize {
        match self {
            OpKind::Index | OpKind::Diff | OpKind::Run => 0,
            OpKind::Luma => 1,
            OpKind::Rgb => 3,
            OpKind::Rgba => 4,
        }
    }
}
