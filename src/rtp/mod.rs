//! RTP wire format (RFC 3550) and the L16 audio payload (RFC 3551).
//!
//! Every packet produced by this crate starts with the 12-byte fixed header:
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |V=2|P|X|  CC   |M|     PT      |       Sequence Number         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                           Timestamp                           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                             SSRC                              |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! - **Sequence number** (16-bit, wrapping): reordering and loss detection.
//! - **Timestamp** (32-bit, wrapping): sampling instant of the first
//!   per-channel sample in the payload.
//! - **SSRC** (32-bit): chosen randomly per stream (RFC 3550 §8.1).
//! - **Marker bit**: unused for continuous audio, always written as-is.
//!
//! Outgoing packets carry no padding, extension or CSRC list. The
//! [`Parser`] accepts all three on incoming packets.

pub mod composer;
pub mod parser;
pub mod pcm;

pub use composer::Composer;
pub use parser::Parser;
pub use pcm::{PcmDecoder, PcmEncoder};

use crate::packet::RtpFields;

/// Size of the fixed RTP header in bytes.
pub const HEADER_SIZE: usize = 12;

/// RTP protocol version.
pub const VERSION: u8 = 2;

/// Serialize the fixed header for `rtp` into `out`.
///
/// Version is always 2. Padding, extension, and CSRC count are always 0.
pub fn write_header(rtp: &RtpFields, out: &mut [u8; HEADER_SIZE]) {
    out[0] = VERSION << 6;
    out[1] = ((rtp.marker as u8) << 7) | (rtp.payload_type & 0x7f);
    out[2..4].copy_from_slice(&rtp.seqnum.to_be_bytes());
    out[4..8].copy_from_slice(&rtp.timestamp.to_be_bytes());
    out[8..12].copy_from_slice(&rtp.source.to_be_bytes());
}

/// Signed distance from `b` to `a` in wrapping timestamp space (RFC 1982).
pub(crate) fn timestamp_diff(a: u32, b: u32) -> i32 {
    a.wrapping_sub(b) as i32
}
