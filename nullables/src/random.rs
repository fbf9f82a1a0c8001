//! Nullable random: scripted randomness for validator selection.

use rand::RngCore;

/// Returns pre-configured `u64` values in order, cycling when exhausted.
///
/// A float draw in `[0, 1)` is built from the upper bits of the next value,
/// so `NullRandom::new(vec![0])` always draws the lowest value in any range
/// and `vec![u64::MAX]` draws as close to the top as the range allows.
#[derive(Clone, Debug)]
pub struct NullRandom {
    outputs: Vec<u64>,
    index: usize,
}

impl NullRandom {
    pub fn new(outputs: Vec<u64>) -> Self {
        Self { outputs, index: 0 }
    }

    /// A single value returned for every call.
    pub fn constant(value: u64) -> Self {
        Self::new(vec![value])
    }
}

impl RngCore for NullRandom {
    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        if self.outputs.is_empty() {
            return 0;
        }
        let value = self.outputs[self.index % self.outputs.len()];
        self.index += 1;
        value
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
