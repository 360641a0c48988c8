//! Audio frames and the stages that move them in and out of packets.
//!
//! ```text
//! producer ──Frame──► Packetizer ──PacketPtr──► PacketWriter (queue, sender)
//!
//! PacketReader ──PacketPtr──► Depacketizer ──Frame──► Mixer ──► consumer
//! ```
//!
//! Samples are normalized `f32` scalars, interleaved by channel. Stages
//! talk to each other only through [`FrameWriter`], [`FrameReader`] and the
//! packet traits, and get their wire encoding from the
//! [`codec`] traits.

pub mod channels;
pub mod codec;
pub mod depacketizer;
pub mod frame;
pub mod mixer;
pub mod packetizer;

pub use channels::ChannelMask;
pub use codec::{SampleDecoder, SampleEncoder};
pub use depacketizer::Depacketizer;
pub use frame::{Frame, FrameFlags};
pub use mixer::Mixer;
pub use packetizer::{Packetizer, PacketizerConfig};

use crate::error::Result;

/// Normalized audio sample in `[-1.0, 1.0]`.
pub type Sample = f32;

/// Push-style frame consumer.
///
/// `write` must consume or buffer every sample of `frame` before returning.
/// Fails with [`Error::FrameSize`](crate::Error::FrameSize) if the frame is
/// not a whole number of per-channel samples.
pub trait FrameWriter {
    fn write(&mut self, frame: &Frame<'_>) -> Result<()>;
}

/// Pull-style frame producer.
///
/// The caller sizes the frame; `read` fills all of it and sets its flags.
pub trait FrameReader {
    fn read(&mut self, frame: &mut Frame<'_>) -> Result<()>;
}
