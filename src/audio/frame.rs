use super::Sample;

bitflags::bitflags! {
    /// Status bits a [`FrameReader`](super::FrameReader) reports on a frame.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct FrameFlags: u32 {
        /// Every sample in the frame was decoded from a packet.
        const FULL = 1 << 0;
        /// No sample in the frame came from a packet.
        const EMPTY = 1 << 1;
        /// At least one late packet was dropped while filling the frame.
        const PACKET_DROPS = 1 << 2;
    }
}

/// View over a caller-owned buffer of interleaved samples.
///
/// `len()` counts scalars, i.e. per-channel samples times channel count.
/// A frame never owns its samples and lives for one read or write call.
#[derive(Debug)]
pub struct Frame<'a> {
    samples: &'a mut [Sample],
    flags: FrameFlags,
}

impl<'a> Frame<'a> {
    pub fn new(samples: &'a mut [Sample]) -> Self {
        Self {
            samples,
            flags: FrameFlags::empty(),
        }
    }

    pub fn samples(&self) -> &[Sample] {
        &*self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [Sample] {
        &mut *self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn flags(&self) -> FrameFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: FrameFlags) {
        self.flags = flags;
    }
}
