//! L16 payload codec (RFC 3551 §4.5.11).
//!
//! Samples are signed 16-bit big-endian integers, interleaved by channel.
//! The codec is configured with the number of channel *slots* on the wire;
//! a [`ChannelMask`] selects which of those slots the caller's interleaved
//! samples map to. The packetizer refuses masks with slots beyond the wire
//! layout; on decode such channels read as silence.

use crate::audio::codec::{SampleDecoder, SampleEncoder};
use crate::audio::{ChannelMask, Sample};
use crate::packet::Packet;

const BYTES_PER_SAMPLE: usize = 2;
const SCALE: f32 = 32768.0;

fn encode(sample: Sample) -> [u8; BYTES_PER_SAMPLE] {
    // Float-to-int `as` saturates, so +1.0 maps to i16::MAX and NaN to 0.
    ((sample * SCALE) as i16).to_be_bytes()
}

fn decode(bytes: [u8; BYTES_PER_SAMPLE]) -> Sample {
    i16::from_be_bytes(bytes) as Sample / SCALE
}

/// Encodes samples as L16 into packet payloads.
#[derive(Debug, Clone, Copy)]
pub struct PcmEncoder {
    num_channels: usize,
}

impl PcmEncoder {
    /// Encoder for a wire layout of `num_channels` slots per sample.
    pub fn new(num_channels: usize) -> Self {
        Self { num_channels }
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }
}

impl SampleEncoder for PcmEncoder {
    fn supports(&self, channels: ChannelMask) -> bool {
        channels.iter().all(|slot| slot < self.num_channels)
    }

    fn payload_size(&self, num_samples: usize) -> usize {
        num_samples * self.num_channels * BYTES_PER_SAMPLE
    }

    fn write_samples(
        &self,
        packet: &mut Packet,
        offset: usize,
        samples: &[Sample],
        channels: ChannelMask,
    ) -> usize {
        let stride = channels.num_channels();
        let frame_bytes = self.num_channels * BYTES_PER_SAMPLE;
        if stride == 0 || frame_bytes == 0 {
            return 0;
        }

        let payload = packet.payload_mut();
        let capacity = payload.len() / frame_bytes;
        let count = (samples.len() / stride).min(capacity.saturating_sub(offset));

        for n in 0..count {
            let input = &samples[n * stride..(n + 1) * stride];
            let frame = &mut payload[(offset + n) * frame_bytes..(offset + n + 1) * frame_bytes];
            for (&sample, slot) in input.iter().zip(channels.iter()) {
                if slot < self.num_channels {
                    let pos = slot * BYTES_PER_SAMPLE;
                    frame[pos..pos + BYTES_PER_SAMPLE].copy_from_slice(&encode(sample));
                }
            }
        }

        count
    }
}

/// Decodes L16 packet payloads back into samples.
#[derive(Debug, Clone, Copy)]
pub struct PcmDecoder {
    num_channels: usize,
}

impl PcmDecoder {
    /// Decoder for a wire layout of `num_channels` slots per sample.
    pub fn new(num_channels: usize) -> Self {
        Self { num_channels }
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }
}

impl SampleDecoder for PcmDecoder {
    fn duration(&self, packet: &Packet) -> usize {
        match self.num_channels * BYTES_PER_SAMPLE {
            0 => 0,
            frame_bytes => packet.payload().len() / frame_bytes,
        }
    }

    fn read_samples(
        &self,
        packet: &Packet,
        offset: usize,
        samples: &mut [Sample],
        channels: ChannelMask,
    ) -> usize {
        let stride = channels.num_channels();
        let frame_bytes = self.num_channels * BYTES_PER_SAMPLE;
        if stride == 0 || frame_bytes == 0 {
            return 0;
        }

        let payload = packet.payload();
        let available = (payload.len() / frame_bytes).saturating_sub(offset);
        let count = (samples.len() / stride).min(available);

        for n in 0..count {
            let frame = &payload[(offset + n) * frame_bytes..(offset + n + 1) * frame_bytes];
            let output = &mut samples[n * stride..(n + 1) * stride];
            for (out, slot) in output.iter_mut().zip(channels.iter()) {
                *out = if slot < self.num_channels {
                    let pos = slot * BYTES_PER_SAMPLE;
                    decode([frame[pos], frame[pos + 1]])
                } else {
                    0.0
                };
            }
        }

        count
    }
}
