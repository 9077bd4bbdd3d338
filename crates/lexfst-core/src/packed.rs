// Bit-packed unsigned integer arrays.
//
// `PackedInts` stores `len` values of a fixed bit width back to back in
// 64-bit blocks. `GrowableWriter` wraps it and re-packs into a wider array
// whenever a value that does not fit is stored.

/// Acceptable memory overhead ratios, trading space for faster access.
///
/// A ratio `r` allows a `b`-bit array to use up to `b * (1 + r)` bits per
/// value, which lets widths snap to byte-aligned sizes.
pub mod overhead {
    /// No overhead: use exactly the required bit width.
    pub const COMPACT: f32 = 0.0;
    /// Up to 25% overhead.
    pub const DEFAULT: f32 = 0.25;
    /// Up to 50% overhead.
    pub const FAST: f32 = 0.5;
    /// Any overhead: always pick the fastest width.
    pub const FASTEST: f32 = 7.0;
}

/// Number of bits needed to represent `max_value` (at least 1).
#[inline]
pub fn bits_required(max_value: u64) -> u32 {
    (64 - max_value.leading_zeros()).max(1)
}

/// Picks the width to actually use for `bits`-bit values under `ratio`.
pub fn fastest_bits(bits: u32, ratio: f32) -> u32 {
    debug_assert!((1..=64).contains(&bits));
    let ratio = ratio.clamp(overhead::COMPACT, overhead::FASTEST);
    let max_bits = bits + (bits as f32 * ratio) as u32;
    for aligned in [8, 16, 32] {
        if bits <= aligned && max_bits >= aligned {
            return aligned;
        }
    }
    if max_bits >= 64 { 64 } else { bits }
}

#[inline]
fn mask_for(bits: u32) -> u64 {
    if bits == 64 { u64::MAX } else { (1u64 << bits) - 1 }
}

/// Fixed-width mutable packed array.
#[derive(Clone)]
pub struct PackedInts {
    blocks: Vec<u64>,
    len: usize,
    bits_per_value: u32,
    mask: u64,
}

impl PackedInts {
    /// Creates a zero-filled array of `len` values, `bits_per_value` wide.
    pub fn new(len: usize, bits_per_value: u32) -> Self {
        assert!((1..=64).contains(&bits_per_value));
        let total_bits = len as u64 * u64::from(bits_per_value);
        let blocks = vec![0u64; total_bits.div_ceil(64) as usize];
        Self {
            blocks,
            len,
            bits_per_value,
            mask: mask_for(bits_per_value),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn bits_per_value(&self) -> u32 {
        self.bits_per_value
    }

    /// Largest value this array can hold.
    #[inline]
    pub fn max_value(&self) -> u64 {
        self.mask
    }

    #[inline]
    pub fn get(&self, index: usize) -> u64 {
        debug_assert!(index < self.len);
        let bit = index as u64 * u64::from(self.bits_per_value);
        let block = (bit >> 6) as usize;
        let shift = (bit & 63) as u32;
        let low = self.blocks[block] >> shift;
        if shift + self.bits_per_value <= 64 {
            low & self.mask
        } else {
            let high = self.blocks[block + 1] << (64 - shift);
            (low | high) & self.mask
        }
    }

    /// Stores `value`, which must fit in `bits_per_value` bits.
    #[inline]
    pub fn set(&mut self, index: usize, value: u64) {
        debug_assert!(index < self.len);
        debug_assert!(value <= self.mask, "value {value} exceeds {} bits", self.bits_per_value);
        let value = value & self.mask;
        let bit = index as u64 * u64::from(self.bits_per_value);
        let block = (bit >> 6) as usize;
        let shift = (bit & 63) as u32;
        self.blocks[block] = (self.blocks[block] & !(self.mask << shift)) | (value << shift);
        if shift + self.bits_per_value > 64 {
            let spill = 64 - shift;
            let high_mask = self.mask >> spill;
            self.blocks[block + 1] = (self.blocks[block + 1] & !high_mask) | (value >> spill);
        }
    }

    /// Approximate heap usage in bytes.
    pub fn ram_bytes_used(&self) -> usize {
        self.blocks.len() * std::mem::size_of::<u64>() + std::mem::size_of::<Self>()
    }

    fn copy_to(&self, dst: &mut PackedInts, count: usize) {
        for i in 0..count {
            dst.set(i, self.get(i));
        }
    }
}

impl std::fmt::Debug for PackedInts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackedInts")
            .field("len", &self.len)
            .field("bits_per_value", &self.bits_per_value)
            .finish()
    }
}

/// Packed array that widens itself when a larger value is stored.
#[derive(Debug, Clone)]
pub struct GrowableWriter {
    current: PackedInts,
    acceptable_overhead_ratio: f32,
}

impl GrowableWriter {
    pub fn new(start_bits: u32, len: usize, acceptable_overhead_ratio: f32) -> Self {
        let bits = fastest_bits(start_bits.clamp(1, 64), acceptable_overhead_ratio);
        Self {
            current: PackedInts::new(len, bits),
            acceptable_overhead_ratio,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.current.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    #[inline]
    pub fn bits_per_value(&self) -> u32 {
        self.current.bits_per_value()
    }

    #[inline]
    pub fn get(&self, index: usize) -> u64 {
        self.current.get(index)
    }

    pub fn set(&mut self, index: usize, value: u64) {
        if value > self.current.max_value() {
            self.ensure_capacity(value);
        }
        self.current.set(index, value);
    }

    fn ensure_capacity(&mut self, value: u64) {
        let bits = fastest_bits(bits_required(value), self.acceptable_overhead_ratio);
        let mut wider = PackedInts::new(self.current.len(), bits);
        self.current.copy_to(&mut wider, self.current.len());
        self.current = wider;
    }

    /// Changes the length, keeping existing values. New slots read as 0.
    pub fn resize(&mut self, new_len: usize) {
        let mut next = PackedInts::new(new_len, self.current.bits_per_value());
        self.current.copy_to(&mut next, self.current.len().min(new_len));
        self.current = next;
    }

    /// Snapshot of the current contents as a fixed-width array.
    pub fn to_packed(&self) -> PackedInts {
        self.current.clone()
    }

    pub fn ram_bytes_used(&self) -> usize {
        self.current.ram_bytes_used() + std::mem::size_of::<f32>()
    }
}

/// Growth policy for arrays that are resized one element past their end.
pub fn oversize(min_len: usize) -> usize {
    min_len + (min_len >> 3).max(3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_required_edges() {
        assert_eq!(bits_required(0), 1);
        assert_eq!(bits_required(1), 1);
        assert_eq!(bits_required(2), 2);
        assert_eq!(bits_required(255), 8);
        assert_eq!(bits_required(256), 9);
        assert_eq!(bits_required(u64::MAX), 64);
    }

    #[test]
    fn fastest_bits_snaps_to_aligned_width() {
        assert_eq!(fastest_bits(7, overhead::COMPACT), 7);
        assert_eq!(fastest_bits(7, overhead::DEFAULT), 8);
        assert_eq!(fastest_bits(13, overhead::DEFAULT), 16);
        assert_eq!(fastest_bits(20, overhead::DEFAULT), 20);
        assert_eq!(fastest_bits(20, overhead::FAST), 20);
        assert_eq!(fastest_bits(3, overhead::FASTEST), 8);
        assert_eq!(fastest_bits(33, overhead::FASTEST), 64);
    }

    #[test]
    fn packed_values_straddle_blocks() {
        let mut ints = PackedInts::new(100, 13);
        for i in 0..100 {
            ints.set(i, (i as u64 * 97) & 0x1FFF);
        }
        for i in 0..100 {
            assert_eq!(ints.get(i), (i as u64 * 97) & 0x1FFF, "index {i}");
        }
    }

    #[test]
    fn overwrite_does_not_disturb_neighbours() {
        let mut ints = PackedInts::new(10, 7);
        for i in 0..10 {
            ints.set(i, 0x7F);
        }
        ints.set(4, 0);
        assert_eq!(ints.get(3), 0x7F);
        assert_eq!(ints.get(4), 0);
        assert_eq!(ints.get(5), 0x7F);
    }

    #[test]
    fn full_width_values() {
        let mut ints = PackedInts::new(3, 64);
        ints.set(1, u64::MAX);
        assert_eq!(ints.get(0), 0);
        assert_eq!(ints.get(1), u64::MAX);
    }

    #[test]
    fn growable_writer_widens() {
        let mut writer = GrowableWriter::new(1, 8, overhead::COMPACT);
        writer.set(0, 1);
        assert_eq!(writer.bits_per_value(), 1);
        writer.set(3, 1000);
        assert_eq!(writer.bits_per_value(), 10);
        assert_eq!(writer.get(0), 1);
        assert_eq!(writer.get(3), 1000);
    }

    #[test]
    fn growable_writer_resize_keeps_values() {
        let mut writer = GrowableWriter::new(8, 4, overhead::DEFAULT);
        writer.set(2, 200);
        writer.resize(oversize(5));
        assert!(writer.len() >= 5);
        assert_eq!(writer.get(2), 200);
        assert_eq!(writer.get(4), 0);
    }
}
