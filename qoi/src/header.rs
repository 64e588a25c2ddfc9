use crate::consts::{QOI_END_MARKER, QOI_HEADER_SIZE, QOI_MAGIC, QOI_PIXELS_MAX};
use byteorder::{BigEndian, ByteOrder};
use snafu::{ensure, Snafu};

/// Number of channels stored per pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channels {
    Rgb = 3,
    Rgba = 4,
}

impl Channels {
    #[inline]
    pub const fn count(self) -> usize {
        self as usize
    }
}

impl TryFrom<u8> for Channels {
    type Error = DescriptorError;

    fn try_from(channels: u8) -> Result<Self, Self::Error> {
        match channels {
            3 => Ok(Channels::Rgb),
            4 => Ok(Channels::Rgba),
            _ => InvalidChannelsSnafu { channels }.fail(),
        }
    }
}

/// Colorspace flag carried in the header. Stored and returned as-is, never interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Colorspace {
    /// sRGB color channels with linear alpha.
    #[default]
    Srgb = 0,
    /// All channels linear.
    Linear = 1,
}

impl TryFrom<u8> for Colorspace {
    type Error = DescriptorError;

    fn try_from(colorspace: u8) -> Result<Self, Self::Error> {
        match colorspace {
            0 => Ok(Colorspace::Srgb),
            1 => Ok(Colorspace::Linear),
            _ => InvalidColorspaceSnafu { colorspace }.fail(),
        }
    }
}

#[derive(Debug, Snafu)]
pub enum DescriptorError {
    #[snafu(display("Image dimensions must be non-zero, got {width}x{height}"))]
    ZeroDimensions { width: u32, height: u32 },
    #[snafu(display("Channel count must be 3 or 4, got {channels}"))]
    InvalidChannels { channels: u8 },
    #[snafu(display("Colorspace must be 0 or 1, got {colorspace}"))]
    InvalidColorspace { colorspace: u8 },
    #[snafu(display(
        "Image of {width}x{height} pixels exceeds the limit of {QOI_PIXELS_MAX} pixels"
    ))]
    TooManyPixels { width: u32, height: u32 },
}

/// Width, height, channel count and colorspace of an image.
///
/// Accompanies the pixels handed to the encoder and is returned by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageDescriptor {
    pub width: u32,
    pub height: u32,
    pub channels: Channels,
    pub colorspace: Colorspace,
}

impl ImageDescriptor {
    pub const fn new(width: u32, height: u32, channels: Channels, colorspace: Colorspace) -> Self {
        Self {
            width,
            height,
            channels,
            colorspace,
        }
    }

    /// Checks that both dimensions are non-zero and that the image stays below
    /// [`QOI_PIXELS_MAX`].
    pub fn validate(&self) -> Result<(), DescriptorError> {
        let Self { width, height, .. } = *self;

        ensure!(
            width != 0 && height != 0,
            ZeroDimensionsSnafu { width, height }
        );
        ensure!(
            u64::from(width) * u64::from(height) < QOI_PIXELS_MAX as u64,
            TooManyPixelsSnafu { width, height }
        );

        Ok(())
    }

    /// Number of pixels in the image. Only meaningful for a validated descriptor.
    #[inline]
    pub const fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Length in bytes of a pixel buffer matching this descriptor.
    #[inline]
    pub const fn buffer_len(&self) -> usize {
        self.pixel_count() * self.channels.count()
    }

    /// Largest stream the encoder can produce for this descriptor: every pixel written as a
    /// literal, plus header and end marker.
    pub const fn max_encoded_len(&self) -> usize {
        self.pixel_count() * (self.channels.count() + 1) + QOI_HEADER_SIZE + QOI_END_MARKER.len()
    }

    /// Serializes the 14-byte header.
    pub fn to_header_bytes(&self) -> [u8; QOI_HEADER_SIZE] {
        let mut header = [0u8; QOI_HEADER_SIZE];
        header[0..4].copy_from_slice(&QOI_MAGIC);
        BigEndian::write_u32(&mut header[4..8], self.width);
        BigEndian::write_u32(&mut header[8..12], self.height);
        header[12] = self.channels as u8;
        header[13] = self.colorspace as u8;
        header
    }

    /// Parses the 10 header bytes following the magic and validates the result.
    ///
    /// The magic itself is checked by the decoder, which reports it as a malformed stream rather
    /// than an invalid descriptor.
    pub(crate) fn from_header_fields(fields: &[u8]) -> Result<Self, DescriptorError> {
        let descriptor = Self {
            width: BigEndian::read_u32(&fields[0..4]),
            height: BigEndian::read_u32(&fields[4..8]),
            channels: Channels::try_from(fields[8])?,
            colorspace: Colorspace::try_from(fields[9])?,
        };
        descriptor.validate()?;

        Ok(descriptor)
    }
}
