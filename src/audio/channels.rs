/// Bitset of active channel slots (up to 32).
///
/// Bit `n` set means channel `n` is present in interleaved frames. The number
/// of set bits is the interleaving stride: a stereo frame (`0b11`) carries
/// `L R L R ...`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelMask(u32);

impl ChannelMask {
    pub const MONO: Self = Self(0x1);
    pub const STEREO: Self = Self(0x3);

    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Number of active channels (population count).
    pub const fn num_channels(self) -> usize {
        self.0.count_ones() as usize
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether channel slot `ch` is active.
    pub const fn contains(self, ch: usize) -> bool {
        ch < u32::BITS as usize && self.0 & (1 << ch) != 0
    }

    /// Active channel slots in ascending order, i.e. interleaving order.
    pub fn iter(self) -> impl Iterator<Item = usize> {
        (0..u32::BITS as usize).filter(move |&ch| self.contains(ch))
    }
}

impl Default for ChannelMask {
    fn default() -> Self {
        Self::STEREO
    }
}

impl From<u32> for ChannelMask {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}
