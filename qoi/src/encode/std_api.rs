use crate::{
    encode::{check_input, EncodeError, EncodeOutput, QoiEncodeContext},
    header::ImageDescriptor,
};
use log::debug;
use snafu::{ResultExt, Snafu};
use std::io::Write;

#[derive(Debug, Snafu)]
pub enum WriteEncodedError {
    #[snafu(context(false), display("{source}"))]
    Encode { source: EncodeError },
    #[snafu(display("Failed to write encoded image: {source}"))]
    WriteIo { source: std::io::Error },
}

struct IoEncodeOutput<W> {
    w: W,
    written: usize,
}

impl<W: Write> EncodeOutput for IoEncodeOutput<W> {
    type Error = std::io::Error;

    #[inline]
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.w.write_all(bytes)?;
        self.written += bytes.len();
        Ok(())
    }
}

/// Encodes `pixels` into `w`, returning the number of bytes written.
///
/// Operations are written one at a time, so unbuffered writers should be wrapped in a
/// [`std::io::BufWriter`].
pub fn encode<W: Write>(
    pixels: &[u8],
    descriptor: &ImageDescriptor,
    w: W,
) -> Result<usize, WriteEncodedError> {
    check_input(pixels, descriptor)?;

    let mut output = IoEncodeOutput { w, written: 0 };
    QoiEncodeContext::new()
        .encode_with_state(descriptor, pixels, &mut output)
        .context(WriteIoSnafu)?;
    output.w.flush().context(WriteIoSnafu)?;

    debug!(
        "Encoded {}x{} {:?} image into {} bytes",
        descriptor.width, descriptor.height, descriptor.channels, output.written
    );

    Ok(output.written)
}
