//! Sample codec capabilities.
//!
//! The packetizer and depacketizer never touch payload bytes directly; they
//! go through these traits so the wire encoding (L16, L24, ...) can be
//! swapped at construction time. [`crate::rtp::pcm`] provides the L16
//! implementation.

use super::{ChannelMask, Sample};
use crate::packet::Packet;

/// Writes interleaved samples into a packet payload.
pub trait SampleEncoder: Send {
    /// Whether every channel in `channels` has a slot in the wire layout.
    fn supports(&self, channels: ChannelMask) -> bool;

    /// Payload bytes needed to carry `num_samples` per-channel samples.
    fn payload_size(&self, num_samples: usize) -> usize;

    /// Encode per-channel samples into `packet`'s payload starting at
    /// per-channel sample `offset`.
    ///
    /// `samples` is interleaved with stride `channels.num_channels()`.
    /// Writes `min(samples.len() / stride, capacity - offset)` samples and
    /// returns that count. Wire slots outside `channels` are left untouched.
    fn write_samples(
        &self,
        packet: &mut Packet,
        offset: usize,
        samples: &[Sample],
        channels: ChannelMask,
    ) -> usize;
}

/// Reads interleaved samples back out of a packet payload.
pub trait SampleDecoder: Send {
    /// Per-channel samples carried by `packet`.
    fn duration(&self, packet: &Packet) -> usize;

    /// Decode per-channel samples starting at `offset` into `samples`
    /// (interleaved with stride `channels.num_channels()`).
    ///
    /// Returns `min(samples.len() / stride, duration - offset)`.
    fn read_samples(
        &self,
        packet: &Packet,
        offset: usize,
        samples: &mut [Sample],
        channels: ChannelMask,
    ) -> usize;
}
