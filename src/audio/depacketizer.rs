use super::codec::SampleDecoder;
use super::{ChannelMask, Frame, FrameFlags, FrameReader, Sample};
use crate::error::{Error, Result};
use crate::packet::{PacketPtr, PacketReader, Timestamp};
use crate::rtp::timestamp_diff;

enum Step {
    /// Samples produced (decoded or silence) and whether they were decoded.
    Advance { samples: usize, decoded: bool },
    /// Current packet had nothing left at the stream position.
    Exhausted,
}

/// Turns a stream of RTP audio packets back into continuous frames.
///
/// The depacketizer keeps a stream position in timestamp units. It starts
/// at the timestamp of the first packet received; until then, frames are
/// silence and the position is not advanced. After that, every read fills
/// the frame from whatever packets cover `[position, position + len)`:
///
/// - gaps before the next packet are filled with zeros,
/// - packets that end at or before the position are late and dropped,
/// - overlapping packets are decoded from the position onward.
///
/// Timestamps compare as wrapping 32-bit serial numbers, so a stream may
/// cross `u32::MAX`.
pub struct Depacketizer<R> {
    reader: R,
    decoder: Box<dyn SampleDecoder>,
    channels: ChannelMask,

    packet: Option<PacketPtr>,
    started: bool,
    timestamp: Timestamp,
    dropped: u64,
}

impl<R: PacketReader> Depacketizer<R> {
    pub fn new(reader: R, decoder: Box<dyn SampleDecoder>, channels: ChannelMask) -> Self {
        tracing::debug!(channels = channels.num_channels(), "depacketizer created");
        Self {
            reader,
            decoder,
            channels,
            packet: None,
            started: false,
            timestamp: 0,
            dropped: 0,
        }
    }

    /// Whether the first packet has arrived.
    pub fn started(&self) -> bool {
        self.started
    }

    /// Stream position: timestamp of the next sample to be read.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Late packets dropped since creation.
    pub fn dropped_packets(&self) -> u64 {
        self.dropped
    }

    pub fn reader_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    fn packet_end(&self, packet: &PacketPtr) -> Option<(Timestamp, Timestamp)> {
        let begin = packet.rtp()?.timestamp;
        let end = begin.wrapping_add(self.decoder.duration(packet) as u32);
        Some((begin, end))
    }

    /// Make sure `self.packet` still has samples at or after the position,
    /// pulling (and dropping late) packets from the reader as needed.
    fn fetch_packet(&mut self, drops: &mut bool) {
        if let Some(packet) = &self.packet
            && let Some((_, end)) = self.packet_end(packet)
            && timestamp_diff(end, self.timestamp) > 0
        {
            return;
        }
        self.packet = None;

        while let Some(packet) = self.reader.read() {
            let Some((begin, end)) = self.packet_end(&packet) else {
                tracing::warn!("ignoring packet without RTP header");
                continue;
            };

            if !self.started {
                self.started = true;
                self.timestamp = begin;
                tracing::debug!(ts = begin, "depacketizer started");
            }

            if timestamp_diff(end, self.timestamp) > 0 {
                self.packet = Some(packet);
                return;
            }

            self.dropped += 1;
            *drops = true;
            tracing::warn!(
                ts = begin,
                position = self.timestamp,
                "dropping late packet"
            );
        }
    }

    fn step(&self, out: &mut [Sample]) -> Step {
        let stride = self.channels.num_channels();
        let wanted = out.len() / stride;

        let Some(packet) = &self.packet else {
            out.fill(0.0);
            return Step::Advance {
                samples: wanted,
                decoded: false,
            };
        };
        let Some(rtp) = packet.rtp() else {
            return Step::Exhausted;
        };

        let lead = timestamp_diff(rtp.timestamp, self.timestamp);
        if lead > 0 {
            let gap = (lead as usize).min(wanted);
            out[..gap * stride].fill(0.0);
            return Step::Advance {
                samples: gap,
                decoded: false,
            };
        }

        let offset = self.timestamp.wrapping_sub(rtp.timestamp) as usize;
        match self.decoder.read_samples(packet, offset, out, self.channels) {
            0 => Step::Exhausted,
            n => Step::Advance {
                samples: n,
                decoded: true,
            },
        }
    }
}

impl<R: PacketReader> FrameReader for Depacketizer<R> {
    fn read(&mut self, frame: &mut Frame<'_>) -> Result<()> {
        let stride = self.channels.num_channels();
        if stride == 0 || frame.len() % stride != 0 {
            return Err(Error::FrameSize {
                len: frame.len(),
                channels: stride,
            });
        }

        let total = frame.len() / stride;
        let mut pos = 0;
        let mut decoded = 0;
        let mut drops = false;

        while pos < total {
            self.fetch_packet(&mut drops);

            let out = &mut frame.samples_mut()[pos * stride..];
            match self.step(out) {
                Step::Advance { samples, decoded: from_packet } => {
                    if from_packet {
                        decoded += samples;
                    }
                    if self.started {
                        self.timestamp = self.timestamp.wrapping_add(samples as u32);
                    }
                    pos += samples;
                }
                Step::Exhausted => self.packet = None,
            }
        }

        let mut flags = FrameFlags::empty();
        if total > 0 && decoded == total {
            flags.insert(FrameFlags::FULL);
        }
        if total > 0 && decoded == 0 {
            flags.insert(FrameFlags::EMPTY);
        }
        if drops {
            flags.insert(FrameFlags::PACKET_DROPS);
        }
        frame.set_flags(flags);

        tracing::trace!(
            samples = total,
            decoded,
            ts = self.timestamp,
            "frame depacketized"
        );

        Ok(())
    }
}
