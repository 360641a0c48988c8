use super::{Frame, FrameFlags, FrameReader, Sample};
use crate::error::Result;

/// Sums several readers into one frame.
///
/// Inputs are read in the order they were added; each is asked for a frame
/// of the same size as the output. The sum is clamped to `[-1.0, 1.0]`.
#[derive(Default)]
pub struct Mixer {
    inputs: Vec<Box<dyn FrameReader>>,
    scratch: Vec<Sample>,
}

impl Mixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a reader to the mix.
    pub fn add(&mut self, reader: Box<dyn FrameReader>) {
        self.inputs.push(reader);
        tracing::debug!(inputs = self.inputs.len(), "mixer input added");
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

impl FrameReader for Mixer {
    /// Output flags: `EMPTY` when every input was empty (or there are none),
    /// `FULL` when every input was full, `PACKET_DROPS` when any input
    /// dropped packets.
    fn read(&mut self, frame: &mut Frame<'_>) -> Result<()> {
        let out = frame.samples_mut();
        out.fill(0.0);
        self.scratch.resize(out.len(), 0.0);

        let mut all_empty = true;
        let mut all_full = !self.inputs.is_empty();
        let mut drops = false;

        for input in self.inputs.iter_mut() {
            let mut sub = Frame::new(&mut self.scratch);
            input.read(&mut sub)?;

            let flags = sub.flags();
            all_empty &= flags.contains(FrameFlags::EMPTY);
            all_full &= flags.contains(FrameFlags::FULL);
            drops |= flags.contains(FrameFlags::PACKET_DROPS);

            for (acc, &s) in out.iter_mut().zip(sub.samples()) {
                *acc += s;
            }
        }

        for s in out.iter_mut() {
            *s = s.clamp(-1.0, 1.0);
        }

        let mut flags = FrameFlags::empty();
        if all_empty {
            flags.insert(FrameFlags::EMPTY);
        }
        if all_full {
            flags.insert(FrameFlags::FULL);
        }
        if drops {
            flags.insert(FrameFlags::PACKET_DROPS);
        }
        frame.set_flags(flags);

        Ok(())
    }
}
