use super::codec::SampleEncoder;
use super::{ChannelMask, Frame, FrameWriter, Sample};
use crate::error::{Error, Result};
use crate::packet::{
    BufferPool, PacketComposer, PacketPool, PacketPtr, PacketWriter, Seqnum, Source, Timestamp,
};

/// Packetizer construction parameters.
#[derive(Debug, Clone)]
pub struct PacketizerConfig {
    /// Channels present in incoming frames.
    pub channels: ChannelMask,
    /// Per-channel samples carried by every packet.
    pub samples_per_packet: usize,
    /// RTP payload type (7-bit, RFC 3551).
    pub payload_type: u8,
    /// SSRC; random when `None` (RFC 3550 §8.1).
    pub source: Option<Source>,
    /// First sequence number; random when `None` (RFC 3550 §5.1).
    pub initial_seqnum: Option<Seqnum>,
    /// First timestamp; random when `None` (RFC 3550 §5.1).
    pub initial_timestamp: Option<Timestamp>,
}

impl Default for PacketizerConfig {
    /// Stereo L16 at 44.1 kHz (static payload type 10), 10 ms per packet.
    fn default() -> Self {
        Self {
            channels: ChannelMask::STEREO,
            samples_per_packet: 441,
            payload_type: 10,
            source: None,
            initial_seqnum: None,
            initial_timestamp: None,
        }
    }
}

enum State {
    Empty,
    Accumulating { packet: PacketPtr, filled: usize },
}

/// Cuts a stream of audio frames into fixed-size RTP packets.
///
/// Frames may have any length (as long as it is a whole number of
/// per-channel samples); they are accumulated into an in-flight packet that
/// is pushed to the [`PacketWriter`] as soon as it holds
/// `samples_per_packet` samples. One [`write`](FrameWriter::write) can
/// therefore emit zero, one or many packets, and a remainder carries over
/// into the next call.
///
/// ```text
/// frames:   |--- 150 ---|---- 200 ----|-- 100 --|
/// packets:  |------ 200 ------|------ 200 ------|50 pending
/// ```
///
/// Each packet is stamped with the next sequence number and the running
/// timestamp; both advance when the packet leaves, by 1 and by
/// `samples_per_packet`. [`flush`](Self::flush) emits a partial packet
/// zero-padded to full size, so the timestamp step stays constant.
///
/// Single-threaded: one producer calls `write` and `flush`.
pub struct Packetizer<W> {
    writer: W,
    composer: Box<dyn PacketComposer>,
    encoder: Box<dyn SampleEncoder>,
    packet_pool: PacketPool,
    buffer_pool: BufferPool,

    channels: ChannelMask,
    samples_per_packet: usize,
    payload_size: usize,
    payload_type: u8,

    source: Source,
    seqnum: Seqnum,
    timestamp: Timestamp,

    state: State,
}

impl<W: PacketWriter> Packetizer<W> {
    /// Create a packetizer pushing packets into `writer`.
    ///
    /// Returns [`Error::InvalidConfig`] if `samples_per_packet` is zero or
    /// does not fit a 32-bit timestamp step, the channel mask is empty or
    /// has slots `encoder` cannot carry, or the payload type exceeds 7 bits.
    pub fn new(
        writer: W,
        composer: Box<dyn PacketComposer>,
        encoder: Box<dyn SampleEncoder>,
        packet_pool: PacketPool,
        buffer_pool: BufferPool,
        config: PacketizerConfig,
    ) -> Result<Self> {
        if config.samples_per_packet == 0 || u32::try_from(config.samples_per_packet).is_err() {
            return Err(Error::InvalidConfig(format!(
                "samples_per_packet must be in 1..=u32::MAX, got {}",
                config.samples_per_packet
            )));
        }
        if config.channels.is_empty() {
            return Err(Error::InvalidConfig("channel mask is empty".into()));
        }
        if !encoder.supports(config.channels) {
            return Err(Error::InvalidConfig(format!(
                "channel mask {:#x} has slots the encoder cannot carry",
                config.channels.bits()
            )));
        }
        if config.payload_type > 0x7f {
            return Err(Error::InvalidConfig(format!(
                "payload type {} exceeds 7 bits",
                config.payload_type
            )));
        }

        let source = config.source.unwrap_or_else(rand::random);
        let seqnum = config.initial_seqnum.unwrap_or_else(rand::random);
        let timestamp = config.initial_timestamp.unwrap_or_else(rand::random);
        let payload_size = encoder.payload_size(config.samples_per_packet);

        tracing::debug!(
            pt = config.payload_type,
            ssrc = format_args!("{:#010X}", source),
            channels = config.channels.num_channels(),
            samples_per_packet = config.samples_per_packet,
            payload_size,
            "packetizer created"
        );

        Ok(Self {
            writer,
            composer,
            encoder,
            packet_pool,
            buffer_pool,
            channels: config.channels,
            samples_per_packet: config.samples_per_packet,
            payload_size,
            payload_type: config.payload_type,
            source,
            seqnum,
            timestamp,
            state: State::Empty,
        })
    }

    /// Encode interleaved `samples` into packets.
    ///
    /// Fails with [`Error::FrameSize`] before touching any state if
    /// `samples` is not a whole number of per-channel samples. On pool,
    /// composer or sink errors, packets already emitted by this call stay
    /// emitted and the packetizer is left either empty or holding its
    /// untouched in-flight packet.
    pub fn write_samples(&mut self, samples: &[Sample]) -> Result<()> {
        let stride = self.channels.num_channels();
        if samples.len() % stride != 0 {
            return Err(Error::FrameSize {
                len: samples.len(),
                channels: stride,
            });
        }

        let mut remaining = samples;
        while !remaining.is_empty() {
            let (mut packet, filled) = match std::mem::replace(&mut self.state, State::Empty) {
                State::Accumulating { packet, filled } => (packet, filled),
                State::Empty => (self.begin_packet()?, 0),
            };

            let wanted = (self.samples_per_packet - filled).min(remaining.len() / stride);
            let written = self
                .encoder
                .write_samples(&mut packet, filled, &remaining[..wanted * stride], self.channels)
                .min(wanted);

            if written == 0 {
                // A fresh packet goes back to the pools; a partial one stays pending.
                if filled > 0 {
                    self.state = State::Accumulating { packet, filled };
                }
                return Err(Error::EncoderStalled { offset: filled });
            }

            let filled = filled + written;
            remaining = &remaining[written * stride..];

            if filled == self.samples_per_packet {
                self.end_packet(packet)?;
            } else {
                self.state = State::Accumulating { packet, filled };
            }
        }

        Ok(())
    }

    /// Emit the in-flight packet, zero-padding its unwritten samples.
    ///
    /// No-op when nothing is pending. Sequence number and timestamp keep
    /// counting across a flush.
    pub fn flush(&mut self) -> Result<()> {
        let State::Accumulating { mut packet, filled } =
            std::mem::replace(&mut self.state, State::Empty)
        else {
            return Ok(());
        };

        let written = self.encoder.payload_size(filled);
        let payload = packet.payload_mut();
        let start = written.min(payload.len());
        payload[start..].fill(0);

        tracing::debug!(
            filled,
            padding = self.samples_per_packet - filled,
            seq = self.seqnum,
            "flushing partial packet"
        );

        self.end_packet(packet)
    }

    fn begin_packet(&mut self) -> Result<PacketPtr> {
        let mut packet = self.packet_pool.acquire()?;
        let buffer = self.buffer_pool.acquire()?;
        self.composer
            .prepare(&mut packet, buffer, self.payload_size)?;

        if let Some(rtp) = packet.rtp_mut() {
            rtp.source = self.source;
            rtp.seqnum = self.seqnum;
            rtp.timestamp = self.timestamp;
            rtp.duration = self.samples_per_packet as u32;
            rtp.payload_type = self.payload_type;
        }

        Ok(packet)
    }

    fn end_packet(&mut self, mut packet: PacketPtr) -> Result<()> {
        let seq = self.seqnum;
        let ts = self.timestamp;

        // Counters advance even if the sink rejects the packet.
        self.seqnum = self.seqnum.wrapping_add(1);
        self.timestamp = self.timestamp.wrapping_add(self.samples_per_packet as u32);

        self.composer.compose(&mut packet)?;

        tracing::trace!(
            seq,
            ts,
            samples = self.samples_per_packet,
            "audio packet emitted"
        );

        self.writer.write(packet).inspect_err(|err| {
            tracing::warn!(seq, ts, %err, "packet sink rejected packet");
        })
    }

    /// Per-channel samples waiting in the in-flight packet.
    pub fn pending(&self) -> usize {
        match &self.state {
            State::Empty => 0,
            State::Accumulating { filled, .. } => *filled,
        }
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn payload_type(&self) -> u8 {
        self.payload_type
    }

    /// Sequence number the next packet will carry.
    pub fn next_seqnum(&self) -> Seqnum {
        self.seqnum
    }

    /// Timestamp the next packet will carry.
    pub fn next_timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn samples_per_packet(&self) -> usize {
        self.samples_per_packet
    }

    pub fn channels(&self) -> ChannelMask {
        self.channels
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }
}

impl<W: PacketWriter> FrameWriter for Packetizer<W> {
    fn write(&mut self, frame: &Frame<'_>) -> Result<()> {
        self.write_samples(frame.samples())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{PacketQueue, PacketReader};
    use crate::rtp::{Composer, PcmEncoder};

    const SAMPLES_PER_PACKET: usize = 4;

    fn config() -> PacketizerConfig {
        PacketizerConfig {
            channels: ChannelMask::STEREO,
            samples_per_packet: SAMPLES_PER_PACKET,
            payload_type: 96,
            source: Some(0x1234),
            initial_seqnum: Some(100),
            initial_timestamp: Some(5000),
        }
    }

    fn make_packetizer(
        queue: &PacketQueue,
        packets: usize,
        buffers: usize,
    ) -> Packetizer<PacketQueue> {
        Packetizer::new(
            queue.clone(),
            Box::new(Composer),
            Box::new(PcmEncoder::new(2)),
            PacketPool::new(packets),
            BufferPool::new(64, buffers),
            config(),
        )
        .unwrap()
    }

    #[test]
    fn rejects_invalid_config() {
        let build = |config| {
            Packetizer::new(
                PacketQueue::new(),
                Box::new(Composer),
                Box::new(PcmEncoder::new(2)),
                PacketPool::new(1),
                BufferPool::new(64, 1),
                config,
            )
        };

        let zero = PacketizerConfig {
            samples_per_packet: 0,
            ..config()
        };
        assert!(matches!(build(zero), Err(Error::InvalidConfig(_))));

        let no_channels = PacketizerConfig {
            channels: ChannelMask::new(0),
            ..config()
        };
        assert!(matches!(build(no_channels), Err(Error::InvalidConfig(_))));

        let beyond_wire = PacketizerConfig {
            channels: ChannelMask::new(0b100),
            ..config()
        };
        assert!(matches!(build(beyond_wire), Err(Error::InvalidConfig(_))));

        let wide_pt = PacketizerConfig {
            payload_type: 128,
            ..config()
        };
        assert!(matches!(build(wide_pt), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn default_config_is_stereo_l16() {
        let p = Packetizer::new(
            PacketQueue::new(),
            Box::new(Composer),
            Box::new(PcmEncoder::new(2)),
            PacketPool::new(1),
            BufferPool::new(64, 1),
            PacketizerConfig::default(),
        )
        .unwrap();
        assert_eq!(p.samples_per_packet(), 441);
        assert_eq!(p.payload_type(), 10);
        assert_eq!(p.pending(), 0);
    }

    #[test]
    fn odd_frame_is_rejected_without_side_effects() {
        let queue = PacketQueue::new();
        let mut p = make_packetizer(&queue, 4, 4);

        p.write_samples(&[0.1; 6]).unwrap();
        let err = p.write_samples(&[0.1; 9]).unwrap_err();
        assert!(matches!(err, Error::FrameSize { len: 9, channels: 2 }));
        assert_eq!(p.pending(), 3);
        assert!(queue.is_empty());
    }

    #[test]
    fn remainder_carries_into_next_packet() {
        let mut queue = PacketQueue::new();
        let mut p = make_packetizer(&queue, 4, 4);

        // 3 + 3 per-channel samples against a 4-sample packet.
        p.write_samples(&[0.1; 6]).unwrap();
        assert!(queue.is_empty());
        p.write_samples(&[0.1; 6]).unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(p.pending(), 2);

        let packet = queue.read().unwrap();
        let rtp = packet.rtp().unwrap();
        assert_eq!(rtp.seqnum, 100);
        assert_eq!(rtp.timestamp, 5000);
        assert_eq!(rtp.duration, 4);
        assert_eq!(p.next_seqnum(), 101);
        assert_eq!(p.next_timestamp(), 5004);
    }

    #[test]
    fn empty_frame_emits_nothing() {
        let queue = PacketQueue::new();
        let mut p = make_packetizer(&queue, 1, 1);
        p.write_samples(&[]).unwrap();
        assert!(queue.is_empty());
        assert_eq!(p.pending(), 0);
    }

    #[test]
    fn flush_on_empty_is_noop() {
        let queue = PacketQueue::new();
        let mut p = make_packetizer(&queue, 1, 1);
        p.flush().unwrap();
        p.flush().unwrap();
        assert!(queue.is_empty());
        assert_eq!(p.next_seqnum(), 100);
    }

    #[test]
    fn flush_is_idempotent() {
        let queue = PacketQueue::new();
        let mut p = make_packetizer(&queue, 4, 4);
        p.write_samples(&[0.5; 2]).unwrap();
        p.flush().unwrap();
        p.flush().unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(p.next_seqnum(), 101);
        assert_eq!(p.next_timestamp(), 5004);
    }

    #[test]
    fn flush_zero_pads_tail() {
        let mut queue = PacketQueue::new();
        let mut p = make_packetizer(&queue, 1, 1);

        p.write_samples(&[0.5; 8]).unwrap();
        drop(queue.read().unwrap());

        p.write_samples(&[0.5; 2]).unwrap();
        p.flush().unwrap();

        let packet = queue.read().unwrap();
        let payload = packet.payload();
        assert_eq!(payload.len(), 16);
        assert_eq!(&payload[..4], &[0x40, 0x00, 0x40, 0x00]);
        assert!(payload[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn packet_pool_exhaustion_leaves_state_empty() {
        let mut queue = PacketQueue::new();
        let mut p = make_packetizer(&queue, 1, 4);

        p.write_samples(&[0.1; 8]).unwrap();
        let err = p.write_samples(&[0.1; 2]).unwrap_err();
        assert!(matches!(err, Error::PoolExhausted { pool: "packet", .. }));
        assert_eq!(p.pending(), 0);
        assert_eq!(p.next_seqnum(), 101);

        // Releasing the emitted packet lets the stream continue.
        drop(queue.read().unwrap());
        p.write_samples(&[0.1; 8]).unwrap();
        assert_eq!(queue.read().unwrap().rtp().unwrap().seqnum, 101);
    }

    #[test]
    fn buffer_pool_exhaustion_returns_packet() {
        let queue = PacketQueue::new();
        let packets = PacketPool::new(4);
        let mut p = Packetizer::new(
            queue.clone(),
            Box::new(Composer),
            Box::new(PcmEncoder::new(2)),
            packets.clone(),
            BufferPool::new(64, 0),
            config(),
        )
        .unwrap();

        let err = p.write_samples(&[0.1; 2]).unwrap_err();
        assert!(matches!(err, Error::PoolExhausted { pool: "buffer", .. }));
        assert_eq!(packets.stats().in_use, 0);
        assert_eq!(p.pending(), 0);
    }

    #[test]
    fn small_buffer_is_reported() {
        let queue = PacketQueue::new();
        let mut p = Packetizer::new(
            queue.clone(),
            Box::new(Composer),
            Box::new(PcmEncoder::new(2)),
            PacketPool::new(1),
            BufferPool::new(16, 1),
            config(),
        )
        .unwrap();

        let err = p.write_samples(&[0.1; 2]).unwrap_err();
        assert!(matches!(
            err,
            Error::BufferTooSmall {
                needed: 28,
                capacity: 16
            }
        ));
    }

    #[test]
    fn sink_failure_is_propagated() {
        let queue = PacketQueue::bounded(1);
        let mut p = make_packetizer(&queue, 4, 4);

        p.write_samples(&[0.1; 8]).unwrap();
        let err = p.write_samples(&[0.1; 8]).unwrap_err();
        assert!(matches!(err, Error::SinkFull { capacity: 1 }));
        assert_eq!(queue.len(), 1);
        assert_eq!(p.next_seqnum(), 102);
        assert_eq!(p.pending(), 0);
    }

    #[test]
    fn seqnum_and_timestamp_wrap() {
        let mut queue = PacketQueue::new();
        let mut p = Packetizer::new(
            queue.clone(),
            Box::new(Composer),
            Box::new(PcmEncoder::new(2)),
            PacketPool::new(4),
            BufferPool::new(64, 4),
            PacketizerConfig {
                initial_seqnum: Some(u16::MAX),
                initial_timestamp: Some(u32::MAX - 1),
                ..config()
            },
        )
        .unwrap();

        p.write_samples(&[0.0; 16]).unwrap();

        let first = queue.read().unwrap();
        let second = queue.read().unwrap();
        assert_eq!(first.rtp().unwrap().seqnum, u16::MAX);
        assert_eq!(second.rtp().unwrap().seqnum, 0);
        assert_eq!(first.rtp().unwrap().timestamp, u32::MAX - 1);
        assert_eq!(second.rtp().unwrap().timestamp, 2);
    }

    struct Stalling;

    impl SampleEncoder for Stalling {
        fn supports(&self, _channels: ChannelMask) -> bool {
            true
        }

        fn payload_size(&self, num_samples: usize) -> usize {
            num_samples * 4
        }

        fn write_samples(
            &self,
            _packet: &mut crate::packet::Packet,
            _offset: usize,
            _samples: &[Sample],
            _channels: ChannelMask,
        ) -> usize {
            0
        }
    }

    #[test]
    fn stalled_encoder_releases_fresh_packet() {
        let queue = PacketQueue::new();
        let packets = PacketPool::new(2);
        let buffers = BufferPool::new(64, 2);
        let mut p = Packetizer::new(
            queue.clone(),
            Box::new(Composer),
            Box::new(Stalling),
            packets.clone(),
            buffers.clone(),
            config(),
        )
        .unwrap();

        let err = p.write_samples(&[0.5; 8]).unwrap_err();
        assert!(matches!(err, Error::EncoderStalled { offset: 0 }));
        assert_eq!(p.pending(), 0);
        assert_eq!(packets.stats().in_use, 0);
        assert_eq!(buffers.stats().in_use, 0);

        p.flush().unwrap();
        assert!(queue.is_empty());
        assert_eq!(p.next_seqnum(), 100);
    }

    #[test]
    fn accessors_reflect_config() {
        let queue = PacketQueue::new();
        let mut p = make_packetizer(&queue, 4, 4);
        assert_eq!(p.source(), 0x1234);
        assert_eq!(p.channels(), ChannelMask::STEREO);

        p.writer_mut().close();
        assert!(p.writer().is_closed());
        let err = p.write_samples(&[0.1; 8]).unwrap_err();
        assert!(matches!(err, Error::SinkClosed));
    }

    #[test]
    fn usable_through_frame_writer() {
        let queue = PacketQueue::new();
        let mut p = make_packetizer(&queue, 4, 4);
        let mut samples = [0.25; 8];
        let frame = Frame::new(&mut samples);
        FrameWriter::write(&mut p, &frame).unwrap();
        assert_eq!(queue.len(), 1);
    }
}
