pub mod audio;
pub mod error;
pub mod packet;
pub mod rtp;

pub use audio::{
    ChannelMask, Depacketizer, Frame, FrameFlags, FrameReader, FrameWriter, Mixer, Packetizer,
    PacketizerConfig, Sample,
};
pub use error::{Error, Result};
pub use packet::{
    BufferPool, Packet, PacketFlags, PacketPool, PacketPtr, PacketQueue, PacketReader,
    PacketWriter,
};
