//! Error types for the audio packetization library.

use std::fmt;

/// Errors that can occur while turning audio into RTP packets and back.
///
/// Variants map to specific failure modes across the stack:
///
/// - **Resources**: [`PoolExhausted`](Self::PoolExhausted): a buffer or
///   packet pool has no free slot.
/// - **Caller contract**: [`FrameSize`](Self::FrameSize): a frame is not a
///   whole number of per-channel samples.
/// - **Sink**: [`SinkFull`](Self::SinkFull), [`SinkClosed`](Self::SinkClosed).
/// - **Packet layout**: [`BufferTooSmall`](Self::BufferTooSmall),
///   [`EncoderStalled`](Self::EncoderStalled), [`Parse`](Self::Parse).
/// - **Construction**: [`InvalidConfig`](Self::InvalidConfig).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A [`Pool`](crate::packet::pool::Pool) has `capacity` live handles and
    /// cannot hand out another one.
    #[error("{pool} pool exhausted (capacity {capacity})")]
    PoolExhausted { pool: &'static str, capacity: usize },

    /// Frame length is not a multiple of the active channel count.
    #[error("frame of {len} samples is not a multiple of {channels} channels")]
    FrameSize { len: usize, channels: usize },

    /// Bounded [`PacketQueue`](crate::packet::PacketQueue) is at capacity.
    #[error("packet sink full (capacity {capacity})")]
    SinkFull { capacity: usize },

    /// Packet sink no longer accepts packets.
    #[error("packet sink closed")]
    SinkClosed,

    /// Buffer cannot hold the RTP header plus the requested payload.
    #[error("buffer too small: need {needed} bytes, have {capacity}")]
    BufferTooSmall { needed: usize, capacity: usize },

    /// Encoder made no progress on a packet that still had room.
    #[error("encoder wrote no samples at offset {offset}")]
    EncoderStalled { offset: usize },

    /// Construction parameters were rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to parse a received RTP packet (RFC 3550 §5.1).
    #[error("RTP parse error: {kind}")]
    Parse { kind: ParseErrorKind },
}

/// Specific kind of RTP parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Fewer bytes than the fixed header, CSRC list or extension require.
    TooShort,
    /// Version field is not 2.
    BadVersion,
    /// Padding count is zero or exceeds the payload.
    BadPadding,
    /// Extension header length runs past the end of the packet.
    BadExtension,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort => write!(f, "packet too short"),
            Self::BadVersion => write!(f, "unsupported RTP version"),
            Self::BadPadding => write!(f, "invalid padding"),
            Self::BadExtension => write!(f, "invalid header extension"),
        }
    }
}

/// Convenience alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
