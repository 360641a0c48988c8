//! Fixed-capacity object pools.
//!
//! A [`Pool`] bounds how many objects of one kind may be alive at once. It
//! hands out [`Pooled`] handles that return their object to the pool when
//! dropped, so a packet travelling through a queue is recycled by whoever
//! drops it last, not by the packetizer that produced it.
//!
//! ```text
//! try_acquire() ──► Pooled<T> ──► ... hand-off ... ──► drop
//!       ▲                                              │
//!       └──────────── recycle() + free list ◄──────────┘
//! ```
//!
//! Acquisition never blocks: when `capacity` handles are live it fails
//! immediately with `None` (or [`Error::PoolExhausted`] via
//! [`acquire`](Pool::acquire)).

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::Mutex;

use super::Packet;
use crate::error::{Error, Result};

/// Resets an object before it goes back on a pool's free list.
pub trait Recycle: Default {
    fn recycle(&mut self);
}

impl Recycle for Vec<u8> {
    /// Buffers come back zeroed so codecs may skip untouched channel slots.
    fn recycle(&mut self) {
        self.fill(0);
    }
}

/// Statistics about pool usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Maximum number of live handles.
    pub capacity: usize,
    /// Handles currently alive.
    pub in_use: usize,
    /// Handles that can still be acquired.
    pub available: usize,
    /// Successful acquisitions since creation.
    pub acquisitions: u64,
    /// Acquisitions refused because the pool was exhausted.
    pub failures: u64,
}

struct PoolState<T> {
    free: Vec<T>,
    in_use: usize,
    acquisitions: u64,
    failures: u64,
}

struct PoolInner<T> {
    name: &'static str,
    capacity: usize,
    factory: Box<dyn Fn() -> T + Send + Sync>,
    state: Mutex<PoolState<T>>,
}

/// Bounded pool of reusable `T`.
///
/// Cloning yields another handle to the same pool.
pub struct Pool<T> {
    inner: Arc<PoolInner<T>>,
}

impl<T> Clone for Pool<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Recycle> Pool<T> {
    /// Create a pool of at most `capacity` objects built on demand by `factory`.
    pub fn with_factory(
        name: &'static str,
        capacity: usize,
        factory: impl Fn() -> T + Send + Sync + 'static,
    ) -> Self {
        tracing::debug!(pool = name, capacity, "pool created");
        Self {
            inner: Arc::new(PoolInner {
                name,
                capacity,
                factory: Box::new(factory),
                state: Mutex::new(PoolState {
                    free: Vec::new(),
                    in_use: 0,
                    acquisitions: 0,
                    failures: 0,
                }),
            }),
        }
    }

    /// Take an object without blocking; `None` when the pool is exhausted.
    pub fn try_acquire(&self) -> Option<Pooled<T>> {
        let recycled = {
            let mut state = self.inner.state.lock();
            if state.in_use >= self.inner.capacity {
                state.failures += 1;
                tracing::warn!(
                    pool = self.inner.name,
                    capacity = self.inner.capacity,
                    "pool exhausted"
                );
                return None;
            }
            state.in_use += 1;
            state.acquisitions += 1;
            state.free.pop()
        };

        let item = recycled.unwrap_or_else(|| (self.inner.factory)());
        Some(Pooled {
            item,
            pool: self.inner.clone(),
        })
    }

    /// Like [`try_acquire`](Self::try_acquire), mapping exhaustion to
    /// [`Error::PoolExhausted`].
    pub fn acquire(&self) -> Result<Pooled<T>> {
        self.try_acquire().ok_or(Error::PoolExhausted {
            pool: self.inner.name,
            capacity: self.inner.capacity,
        })
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.inner.state.lock();
        PoolStats {
            capacity: self.inner.capacity,
            in_use: state.in_use,
            available: self.inner.capacity - state.in_use,
            acquisitions: state.acquisitions,
            failures: state.failures,
        }
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("name", &self.inner.name)
            .field("capacity", &self.inner.capacity)
            .finish_non_exhaustive()
    }
}

/// Owned handle to a pooled object; derefs to `T`.
pub struct Pooled<T: Recycle> {
    item: T,
    pool: Arc<PoolInner<T>>,
}

impl<T: Recycle> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.item
    }
}

impl<T: Recycle> DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.item
    }
}

impl<T: Recycle> Drop for Pooled<T> {
    fn drop(&mut self) {
        let mut item = std::mem::take(&mut self.item);
        item.recycle();

        let mut state = self.pool.state.lock();
        state.in_use -= 1;
        state.free.push(item);
    }
}

impl<T: Recycle + fmt::Debug> fmt::Debug for Pooled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.item.fmt(f)
    }
}

/// Pool of fixed-size, zero-filled byte buffers.
pub type BufferPool = Pool<Vec<u8>>;

/// Byte buffer borrowed from a [`BufferPool`].
pub type PooledBuffer = Pooled<Vec<u8>>;

impl Pool<Vec<u8>> {
    /// Create a pool of at most `capacity` buffers of `buffer_size` bytes.
    pub fn new(buffer_size: usize, capacity: usize) -> Self {
        Self::with_factory("buffer", capacity, move || vec![0; buffer_size])
    }
}

/// Pool of blank [`Packet`]s.
pub type PacketPool = Pool<Packet>;

impl Pool<Packet> {
    /// Create a pool of at most `capacity` packets.
    pub fn new(capacity: usize) -> Self {
        Self::with_factory("packet", capacity, Packet::default)
    }
}
