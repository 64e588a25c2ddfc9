//! Decoder options
use crate::consts::QOI_PIXELS_MAX;
use crate::header::Channels;

/// Options that influence how a stream is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Channel count of the decoded pixels.
    ///
    /// `None` keeps the channel count declared in the header. Requesting
    /// [`Channels::Rgba`] for an RGB stream yields opaque pixels, requesting [`Channels::Rgb`]
    /// for an RGBA stream drops the alpha channel.
    ///
    /// - Default value: `None`
    channels:          Option<Channels>,
    /// Images with more pixels than this are rejected before anything is decoded. An image of
    /// exactly `max_pixels` pixels is accepted.
    ///
    /// Independently of this option, headers of [`QOI_PIXELS_MAX`] pixels or more are always
    /// rejected as invalid.
    ///
    /// - Default value: [`QOI_PIXELS_MAX`]
    max_pixels:        usize,
    /// Whether the end marker has to follow the last pixel.
    ///
    /// - Default value: `true`
    strict_end_marker: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl DecodeOptions {
    pub const fn new() -> Self {
        Self {
            channels:          None,
            max_pixels:        QOI_PIXELS_MAX,
            strict_end_marker: true,
        }
    }

    pub const fn get_channels(&self) -> Option<Channels> {
        self.channels
    }

    pub const fn get_max_pixels(&self) -> usize {
        self.max_pixels
    }

    pub const fn get_strict_end_marker(&self) -> bool {
        self.strict_end_marker
    }

    /// Sets the output channel count, `None` to use the one from the header.
    #[must_use]
    pub const fn set_channels(mut self, channels: Option<Channels>) -> Self {
        self.channels = channels;
        self
    }

    #[must_use]
    pub const fn set_max_pixels(mut self, max_pixels: usize) -> Self {
        self.max_pixels = max_pixels;
        self
    }

    /// When disabled, a stream whose pixels are complete is accepted even if the end marker
    /// is missing or damaged.
    #[must_use]
    pub const fn set_strict_end_marker(mut self, yes: bool) -> Self {
        self.strict_end_marker = yes;
        self
    }
}
