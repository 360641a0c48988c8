use super::{HEADER_SIZE, VERSION};
use crate::error::{Error, ParseErrorKind, Result};
use crate::packet::{Packet, PacketFlags, PooledBuffer, RtpFields};

/// Turns received RTP datagrams into [`Packet`]s (RFC 3550 §5.1).
///
/// The header may be followed by a CSRC list (`CC` × 4 bytes) and a header
/// extension (`X` bit; 4-byte preamble plus `length` × 4 bytes); both are
/// treated as part of the header region. When the `P` bit is set, the last
/// byte holds the padding length and the padding is excluded from the
/// payload region.
///
/// `duration` is left at 0: only the payload decoder knows how many samples
/// a payload holds.
#[derive(Debug, Default, Clone, Copy)]
pub struct Parser;

impl Parser {
    pub fn new() -> Self {
        Self
    }

    /// Parse the first `len` bytes of `buffer` and attach it to `packet`.
    ///
    /// Returns [`Error::Parse`] on malformed input; `packet` is left
    /// untouched in that case.
    pub fn parse(&self, packet: &mut Packet, buffer: PooledBuffer, len: usize) -> Result<()> {
        let data = buffer.get(..len).ok_or(parse_error(ParseErrorKind::TooShort))?;
        if data.len() < HEADER_SIZE {
            return Err(parse_error(ParseErrorKind::TooShort));
        }

        if data[0] >> 6 != VERSION {
            return Err(parse_error(ParseErrorKind::BadVersion));
        }

        let has_padding = data[0] & 0x20 != 0;
        let has_extension = data[0] & 0x10 != 0;
        let csrc_count = (data[0] & 0x0f) as usize;

        let mut header_len = HEADER_SIZE + csrc_count * 4;
        if data.len() < header_len {
            return Err(parse_error(ParseErrorKind::TooShort));
        }

        if has_extension {
            let preamble = data
                .get(header_len..header_len + 4)
                .ok_or(parse_error(ParseErrorKind::BadExtension))?;
            let words = u16::from_be_bytes([preamble[2], preamble[3]]) as usize;
            header_len += 4 + words * 4;
            if data.len() < header_len {
                return Err(parse_error(ParseErrorKind::BadExtension));
            }
        }

        let mut payload_end = data.len();
        if has_padding {
            let padding = data[data.len() - 1] as usize;
            if padding == 0 || header_len + padding > data.len() {
                return Err(parse_error(ParseErrorKind::BadPadding));
            }
            payload_end -= padding;
        }

        let rtp = RtpFields {
            marker: data[1] & 0x80 != 0,
            payload_type: data[1] & 0x7f,
            seqnum: u16::from_be_bytes([data[2], data[3]]),
            timestamp: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
            source: u32::from_be_bytes([data[8], data[9], data[10], data[11]]),
            duration: 0,
            header: 0..header_len,
            payload: header_len..payload_end,
        };

        tracing::trace!(
            seqnum = rtp.seqnum,
            ts = rtp.timestamp,
            pt = rtp.payload_type,
            payload_len = payload_end - header_len,
            "RTP packet parsed"
        );

        packet.set_rtp(rtp);
        packet.set_buffer(buffer);
        // Every payload type this crate carries is audio.
        packet.add_flags(PacketFlags::RTP | PacketFlags::AUDIO);
        Ok(())
    }
}

fn parse_error(kind: ParseErrorKind) -> Error {
    Error::Parse { kind }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::BufferPool;

    fn buffer_with(bytes: &[u8]) -> (PooledBuffer, BufferPool) {
        let pool = BufferPool::new(128, 1);
        let mut buf = pool.try_acquire().unwrap();
        buf[..bytes.len()].copy_from_slice(bytes);
        (buf, pool)
    }

    fn parse(bytes: &[u8]) -> Result<Packet> {
        let (buf, _pool) = buffer_with(bytes);
        let mut packet = Packet::default();
        Parser.parse(&mut packet, buf, bytes.len())?;
        Ok(packet)
    }

    fn kind_of(result: Result<Packet>) -> ParseErrorKind {
        match result {
            Err(Error::Parse { kind }) => kind,
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    const BASIC: [u8; 16] = [
        0x80, 0x8A, 0x00, 0x05, 0x00, 0x00, 0x03, 0xE8, 0xAA, 0xBB, 0xCC, 0xDD, 1, 2, 3, 4,
    ];

    #[test]
    fn parses_fixed_header() {
        let packet = parse(&BASIC).unwrap();
        let rtp = packet.rtp().unwrap();
        assert!(rtp.marker);
        assert_eq!(rtp.payload_type, 10);
        assert_eq!(rtp.seqnum, 5);
        assert_eq!(rtp.timestamp, 1000);
        assert_eq!(rtp.source, 0xAABBCCDD);
        assert_eq!(packet.payload(), &[1, 2, 3, 4]);
        assert_eq!(packet.flags(), PacketFlags::RTP | PacketFlags::AUDIO);
    }

    #[test]
    fn skips_csrc_and_extension() {
        let mut bytes = vec![0x91, 0x0A, 0, 1, 0, 0, 0, 2, 0, 0, 0, 3];
        bytes.extend_from_slice(&[9, 9, 9, 9]); // one CSRC
        bytes.extend_from_slice(&[0xBE, 0xDE, 0x00, 0x01]); // extension, 1 word
        bytes.extend_from_slice(&[7, 7, 7, 7]);
        bytes.extend_from_slice(&[0x55, 0x66]);

        let packet = parse(&bytes).unwrap();
        assert_eq!(packet.header().len(), 24);
        assert_eq!(packet.payload(), &[0x55, 0x66]);
    }

    #[test]
    fn strips_padding() {
        let mut bytes = BASIC.to_vec();
        bytes[0] |= 0x20;
        bytes.extend_from_slice(&[0, 0, 3]);

        let packet = parse(&bytes).unwrap();
        assert_eq!(packet.payload(), &[1, 2, 3, 4]);
    }

    #[test]
    fn rejects_short_packet() {
        assert_eq!(kind_of(parse(&BASIC[..11])), ParseErrorKind::TooShort);
    }

    #[test]
    fn rejects_wrong_version() {
        let mut bytes = BASIC;
        bytes[0] = 0x40;
        assert_eq!(kind_of(parse(&bytes)), ParseErrorKind::BadVersion);
    }

    #[test]
    fn rejects_truncated_csrc_list() {
        let mut bytes = BASIC;
        bytes[0] |= 0x02; // 2 CSRCs = 8 bytes, only 4 present
        assert_eq!(kind_of(parse(&bytes)), ParseErrorKind::TooShort);
    }

    #[test]
    fn rejects_bad_extension_length() {
        let mut bytes = BASIC.to_vec();
        bytes[0] |= 0x10;
        bytes[12..16].copy_from_slice(&[0xBE, 0xDE, 0x00, 0x08]);
        assert_eq!(kind_of(parse(&bytes)), ParseErrorKind::BadExtension);
    }

    #[test]
    fn rejects_bad_padding() {
        let mut bytes = BASIC;
        bytes[0] |= 0x20;
        bytes[15] = 0;
        assert_eq!(kind_of(parse(&bytes)), ParseErrorKind::BadPadding);

        bytes[15] = 200;
        assert_eq!(kind_of(parse(&bytes)), ParseErrorKind::BadPadding);
    }

    #[test]
    fn len_past_buffer_is_too_short() {
        let (buf, _pool) = buffer_with(&BASIC);
        let mut packet = Packet::default();
        let err = Parser.parse(&mut packet, buf, 4096).unwrap_err();
        assert!(matches!(
            err,
            Error::Parse {
                kind: ParseErrorKind::TooShort
            }
        ));
        assert!(packet.rtp().is_none());
    }
}
