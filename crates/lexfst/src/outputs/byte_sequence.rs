// Byte-sequence outputs: concatenation, longest common byte prefix

use lexfst_core::CodecError;
use lexfst_core::data_io::{DataInput, DataOutput};

use super::Outputs;

/// Outputs that are arbitrary byte strings.
///
/// The empty string is the identity. Encoded as a vint length followed by
/// the bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByteSequenceOutputs;

impl Outputs for ByteSequenceOutputs {
    type Value = Vec<u8>;

    fn common(&self, a: &Vec<u8>, b: &Vec<u8>) -> Vec<u8> {
        let shared = a.iter().zip(b).take_while(|(x, y)| x == y).count();
        if shared == a.len() {
            a.clone()
        } else if shared == b.len() {
            b.clone()
        } else {
            a[..shared].to_vec()
        }
    }

    fn subtract(&self, output: &Vec<u8>, inc: &Vec<u8>) -> Vec<u8> {
        debug_assert!(output.starts_with(inc), "{inc:?} is not a prefix of {output:?}");
        output[inc.len()..].to_vec()
    }

    fn add(&self, prefix: &Vec<u8>, output: &Vec<u8>) -> Vec<u8> {
        if prefix.is_empty() {
            output.clone()
        } else if output.is_empty() {
            prefix.clone()
        } else {
            let mut sum = Vec::with_capacity(prefix.len() + output.len());
            sum.extend_from_slice(prefix);
            sum.extend_from_slice(output);
            sum
        }
    }

    fn write<W: DataOutput + ?Sized>(&self, output: &Vec<u8>, out: &mut W) {
        out.write_vint(output.len() as u32);
        out.write_bytes(output);
    }

    fn read<R: DataInput + ?Sized>(&self, input: &mut R) -> Result<Vec<u8>, CodecError> {
        let len = input.read_vint()? as usize;
        input.read_byte_vec(len)
    }

    fn no_output(&self) -> Vec<u8> {
        Vec::new()
    }

    fn is_no_output(&self, output: &Vec<u8>) -> bool {
        output.is_empty()
    }

    fn output_to_string(&self, output: &Vec<u8>) -> String {
        let hex: Vec<String> = output.iter().map(|b| format!("{b:02x}")).collect();
        format!("[{}]", hex.join(" "))
    }
}
