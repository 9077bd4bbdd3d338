// Non-negative integer outputs: common = min, add = sum

use lexfst_core::CodecError;
use lexfst_core::data_io::{DataInput, DataOutput};

use super::Outputs;

/// Outputs that are non-negative integers, typically term ordinals or file
/// offsets. `0` is the identity and is never written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PositiveIntOutputs;

impl Outputs for PositiveIntOutputs {
    type Value = u64;

    #[inline]
    fn common(&self, a: &u64, b: &u64) -> u64 {
        (*a).min(*b)
    }

    #[inline]
    fn subtract(&self, output: &u64, inc: &u64) -> u64 {
        debug_assert!(inc <= output, "cannot subtract {inc} from {output}");
        output - inc
    }

    #[inline]
    fn add(&self, prefix: &u64, output: &u64) -> u64 {
        prefix + output
    }

    fn write<W: DataOutput + ?Sized>(&self, output: &u64, out: &mut W) {
        out.write_vlong(*output);
    }

    fn read<R: DataInput + ?Sized>(&self, input: &mut R) -> Result<u64, CodecError> {
        input.read_vlong()
    }

    #[inline]
    fn no_output(&self) -> u64 {
        0
    }

    #[inline]
    fn is_no_output(&self, output: &u64) -> bool {
        *output == 0
    }

    fn output_to_string(&self, output: &u64) -> String {
        output.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outputs::assert_algebra_laws;

    #[test]
    fn min_and_sum() {
        let o = PositiveIntOutputs;
        assert_eq!(o.common(&5, &3), 3);
        assert_eq!(o.subtract(&5, &3), 2);
        assert_eq!(o.add(&3, &2), 5);
        assert_algebra_laws(&o, &17, &4);
    }

    #[test]
    #[should_panic]
    #[cfg(debug_assertions)]
    fn subtracting_larger_value_is_caught() {
        PositiveIntOutputs.subtract(&1, &2);
    }
}
