//! Network packets and their plumbing.
//!
//! A [`Packet`] owns one pooled byte buffer and describes which part of it
//! is the RTP header and which part is the payload. Header *fields* live in
//! [`RtpFields`] until a [`PacketComposer`] serializes them into the header
//! bytes.
//!
//! Packets travel as [`PacketPtr`] handles: pushing one into a
//! [`PacketWriter`] hands ownership over, and dropping the last handle
//! recycles both the packet and its buffer.

pub mod pool;
pub mod queue;

use std::ops::Range;

use crate::error::Result;
pub use pool::{BufferPool, PacketPool, PoolStats, PooledBuffer};
pub use queue::{PacketQueue, PacketReader, PacketWriter};

/// RTP synchronization source identifier (RFC 3550 §8).
pub type Source = u32;
/// 16-bit wrapping RTP sequence number.
pub type Seqnum = u16;
/// 32-bit wrapping RTP timestamp, in per-channel samples.
pub type Timestamp = u32;

/// Pooled handle to a [`Packet`].
pub type PacketPtr = pool::Pooled<Packet>;

bitflags::bitflags! {
    /// What a packet carries.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct PacketFlags: u32 {
        /// Packet has an RTP header.
        const RTP = 1 << 0;
        /// Payload is audio samples.
        const AUDIO = 1 << 1;
    }
}

/// RTP header fields plus the byte ranges they delimit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RtpFields {
    pub source: Source,
    pub seqnum: Seqnum,
    pub timestamp: Timestamp,
    /// Per-channel samples carried by the payload.
    pub duration: u32,
    pub payload_type: u8,
    pub marker: bool,
    /// Header bytes within the buffer.
    pub header: Range<usize>,
    /// Payload bytes within the buffer.
    pub payload: Range<usize>,
}

/// A network transport unit: flags, RTP fields and the buffer they describe.
#[derive(Debug, Default)]
pub struct Packet {
    flags: PacketFlags,
    rtp: Option<RtpFields>,
    buffer: Option<PooledBuffer>,
}

impl Packet {
    pub fn flags(&self) -> PacketFlags {
        self.flags
    }

    pub fn add_flags(&mut self, flags: PacketFlags) {
        self.flags.insert(flags);
    }

    pub fn rtp(&self) -> Option<&RtpFields> {
        self.rtp.as_ref()
    }

    pub fn rtp_mut(&mut self) -> Option<&mut RtpFields> {
        self.rtp.as_mut()
    }

    pub fn set_rtp(&mut self, rtp: RtpFields) {
        self.rtp = Some(rtp);
    }

    /// Attach the buffer that header and payload ranges point into.
    pub fn set_buffer(&mut self, buffer: PooledBuffer) {
        self.buffer = Some(buffer);
    }

    /// Whole underlying buffer, including bytes past the payload.
    pub fn buffer(&self) -> &[u8] {
        self.buffer.as_deref().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn header(&self) -> &[u8] {
        self.region(|rtp| rtp.header.clone())
    }

    pub fn payload(&self) -> &[u8] {
        self.region(|rtp| rtp.payload.clone())
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        match (&self.rtp, self.buffer.as_deref_mut()) {
            (Some(rtp), Some(buf)) => buf.get_mut(rtp.payload.clone()).unwrap_or_default(),
            _ => &mut [],
        }
    }

    /// Wire bytes: header followed by payload.
    pub fn data(&self) -> &[u8] {
        self.region(|rtp| rtp.header.start..rtp.payload.end)
    }

    /// RTP fields together with mutable header bytes, for serialization.
    pub fn rtp_and_header_mut(&mut self) -> Option<(&RtpFields, &mut [u8])> {
        let rtp = self.rtp.as_ref()?;
        let header = self.buffer.as_deref_mut()?.get_mut(rtp.header.clone())?;
        Some((rtp, header))
    }

    fn region(&self, range: impl FnOnce(&RtpFields) -> Range<usize>) -> &[u8] {
        match (&self.rtp, self.buffer.as_deref()) {
            (Some(rtp), Some(buf)) => buf.get(range(rtp)).unwrap_or_default(),
            _ => &[],
        }
    }
}

impl pool::Recycle for Packet {
    fn recycle(&mut self) {
        *self = Packet::default();
    }
}

/// Builds RTP packets around pooled buffers.
///
/// Composition is two-phase: [`prepare`](Self::prepare) lays out header and
/// payload regions when a packet is started, and [`compose`](Self::compose)
/// writes the stamped header fields once the payload is complete.
pub trait PacketComposer: Send {
    /// Attach `buffer` to `packet`, delimit a header and a payload of
    /// `payload_size` bytes, and set the packet flags.
    fn prepare(&self, packet: &mut Packet, buffer: PooledBuffer, payload_size: usize)
    -> Result<()>;

    /// Serialize the packet's [`RtpFields`] into its header bytes.
    fn compose(&self, packet: &mut Packet) -> Result<()>;
}
