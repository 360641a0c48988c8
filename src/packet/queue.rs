use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use super::PacketPtr;
use crate::error::{Error, Result};

/// Push side of a packet stream.
///
/// `write` takes ownership of the packet. A failure is reported to the
/// caller; the writer decides whether the rejected packet is kept.
pub trait PacketWriter {
    fn write(&mut self, packet: PacketPtr) -> Result<()>;
}

/// Pull side of a packet stream. `None` means nothing is available now.
pub trait PacketReader {
    fn read(&mut self) -> Option<PacketPtr>;
}

impl<W: PacketWriter + ?Sized> PacketWriter for &mut W {
    fn write(&mut self, packet: PacketPtr) -> Result<()> {
        (**self).write(packet)
    }
}

impl<R: PacketReader + ?Sized> PacketReader for &mut R {
    fn read(&mut self) -> Option<PacketPtr> {
        (**self).read()
    }
}

struct QueueState {
    packets: VecDeque<PacketPtr>,
    capacity: Option<usize>,
    closed: bool,
}

/// FIFO packet queue usable as both [`PacketWriter`] and [`PacketReader`].
///
/// Clones share the same queue, so a producer and a consumer can each hold
/// one. A bounded queue rejects writes with [`Error::SinkFull`] and a closed
/// one with [`Error::SinkClosed`]; rejected packets are dropped and go back
/// to their pool. Reads keep draining after [`close`](Self::close).
#[derive(Clone)]
pub struct PacketQueue {
    inner: Arc<Mutex<QueueState>>,
}

impl PacketQueue {
    /// Unbounded queue.
    pub fn new() -> Self {
        Self::with_capacity(None)
    }

    /// Queue holding at most `capacity` packets.
    pub fn bounded(capacity: usize) -> Self {
        Self::with_capacity(Some(capacity))
    }

    fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(QueueState {
                packets: VecDeque::new(),
                capacity,
                closed: false,
            })),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().packets.is_empty()
    }

    /// Stop accepting packets.
    pub fn close(&self) {
        self.inner.lock().closed = true;
        tracing::debug!("packet queue closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

impl Default for PacketQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketWriter for PacketQueue {
    fn write(&mut self, packet: PacketPtr) -> Result<()> {
        let mut state = self.inner.lock();
        if state.closed {
            return Err(Error::SinkClosed);
        }
        if let Some(capacity) = state.capacity
            && state.packets.len() >= capacity
        {
            return Err(Error::SinkFull { capacity });
        }
        state.packets.push_back(packet);
        Ok(())
    }
}

impl PacketReader for PacketQueue {
    fn read(&mut self) -> Option<PacketPtr> {
        self.inner.lock().packets.pop_front()
    }
}
