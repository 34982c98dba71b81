//! Request line framing.
//!
//! Wraps [`LinesCodec`] so that a bad line (too long, or not UTF-8) comes
//! out as a [`Frame::Invalid`] item instead of a stream error. The
//! connection keeps reading after an invalid frame.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};

/// One decoded request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A complete line, without its terminator.
    Line(String),
    /// A line that could not be decoded, with the reason.
    Invalid(String),
}

/// Newline-delimited frames with a length limit.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    lines: LinesCodec,
    max_length: usize,
}

impl FrameCodec {
    pub fn new(max_length: usize) -> Self {
        Self {
            lines: LinesCodec::new_with_max_length(max_length),
            max_length,
        }
    }

    fn recover(
        &self,
        decoded: Result<Option<String>, LinesCodecError>,
    ) -> Result<Option<Frame>, LinesCodecError> {
        match decoded {
            Ok(line) => Ok(line.map(Frame::Line)),
            // The inner codec discards the rest of the line on its own.
            Err(LinesCodecError::MaxLineLengthExceeded) => Ok(Some(Frame::Invalid(format!(
                "frame exceeds {} bytes",
                self.max_length
            )))),
            Err(LinesCodecError::Io(e)) if e.kind() == std::io::ErrorKind::InvalidData => {
                Ok(Some(Frame::Invalid("frame is not valid UTF-8".to_string())))
            }
            Err(e) => Err(e),
        }
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = LinesCodecError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>, LinesCodecError> {
        let decoded = self.lines.decode(buf);
        self.recover(decoded)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>, LinesCodecError> {
        let decoded = self.lines.decode_eof(buf);
        self.recover(decoded)
    }
}

impl Encoder<String> for FrameCodec {
    type Error = LinesCodecError;

    fn encode(&mut self, line: String, buf: &mut BytesMut) -> Result<(), LinesCodecError> {
        self.lines.encode(line, buf)
    }
}
