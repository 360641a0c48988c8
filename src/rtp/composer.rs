use super::{HEADER_SIZE, write_header};
use crate::error::{Error, Result};
use crate::packet::{Packet, PacketComposer, PacketFlags, PooledBuffer, RtpFields};

/// Lays out RTP audio packets: a fixed 12-byte header followed directly by
/// the payload.
///
/// Header fields are left zeroed by [`prepare`](PacketComposer::prepare);
/// the packetizer stamps them and [`compose`](PacketComposer::compose)
/// writes them out.
#[derive(Debug, Default, Clone, Copy)]
pub struct Composer;

impl Composer {
    pub fn new() -> Self {
        Self
    }
}

impl PacketComposer for Composer {
    fn prepare(
        &self,
        packet: &mut Packet,
        buffer: PooledBuffer,
        payload_size: usize,
    ) -> Result<()> {
        let needed = HEADER_SIZE + payload_size;
        if buffer.len() < needed {
            return Err(Error::BufferTooSmall {
                needed,
                capacity: buffer.len(),
            });
        }

        packet.set_buffer(buffer);
        packet.set_rtp(RtpFields {
            header: 0..HEADER_SIZE,
            payload: HEADER_SIZE..needed,
            ..Default::default()
        });
        packet.add_flags(PacketFlags::RTP | PacketFlags::AUDIO);
        Ok(())
    }

    fn compose(&self, packet: &mut Packet) -> Result<()> {
        let capacity = packet.buffer().len();
        let (rtp, header) = packet
            .rtp_and_header_mut()
            .ok_or(Error::BufferTooSmall {
                needed: HEADER_SIZE,
                capacity,
            })?;
        let header: &mut [u8; HEADER_SIZE] =
            header.try_into().map_err(|_| Error::BufferTooSmall {
                needed: HEADER_SIZE,
                capacity,
            })?;

        write_header(rtp, header);
        Ok(())
    }
}
