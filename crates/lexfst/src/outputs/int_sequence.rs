// Integer-sequence outputs

use lexfst_core::CodecError;
use lexfst_core::data_io::{DataInput, DataOutput};

use super::Outputs;

/// Outputs that are sequences of `i32`, combined like
/// [`ByteSequenceOutputs`](super::ByteSequenceOutputs).
///
/// Encoded as a vint count followed by one vint per element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntSequenceOutputs;

impl Outputs for IntSequenceOutputs {
    type Value = Vec<i32>;

    fn common(&self, a: &Vec<i32>, b: &Vec<i32>) -> Vec<i32> {
        let shared = a.iter().zip(b).take_while(|(x, y)| x == y).count();
        a[..shared].to_vec()
    }

    fn subtract(&self, output: &Vec<i32>, inc: &Vec<i32>) -> Vec<i32> {
        debug_assert!(output.starts_with(inc));
        output[inc.len()..].to_vec()
    }

    fn add(&self, prefix: &Vec<i32>, output: &Vec<i32>) -> Vec<i32> {
        let mut sum = Vec::with_capacity(prefix.len() + output.len());
        sum.extend_from_slice(prefix);
        sum.extend_from_slice(output);
        sum
    }

    fn write<W: DataOutput + ?Sized>(&self, output: &Vec<i32>, out: &mut W) {
        out.write_vint(output.len() as u32);
        for &v in output {
            out.write_vint(v as u32);
        }
    }

    fn read<R: DataInput + ?Sized>(&self, input: &mut R) -> Result<Vec<i32>, CodecError> {
        let len = input.read_vint()? as usize;
        (0..len).map(|_| input.read_vint().map(|v| v as i32)).collect()
    }

    fn no_output(&self) -> Vec<i32> {
        Vec::new()
    }

    fn is_no_output(&self, output: &Vec<i32>) -> bool {
        output.is_empty()
    }
}
