// Null outputs for plain acceptors

use std::hash::{Hash, Hasher};

use lexfst_core::CodecError;
use lexfst_core::data_io::{DataInput, DataOutput};

use super::Outputs;

/// The single value of [`NoOutputs`].
///
/// Its hash is a fixed constant so node hashes do not depend on anything
/// but the automaton's structure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoOutput;

impl Hash for NoOutput {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(42);
    }
}

/// Algebra with no outputs: the automaton only accepts or rejects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoOutputs;

impl Outputs for NoOutputs {
    type Value = NoOutput;

    fn common(&self, _a: &NoOutput, _b: &NoOutput) -> NoOutput {
        NoOutput
    }

    fn subtract(&self, _output: &NoOutput, _inc: &NoOutput) -> NoOutput {
        NoOutput
    }

    fn add(&self, _prefix: &NoOutput, _output: &NoOutput) -> NoOutput {
        NoOutput
    }

    fn write<W: DataOutput + ?Sized>(&self, _output: &NoOutput, _out: &mut W) {}

    fn read<R: DataInput + ?Sized>(&self, _input: &mut R) -> Result<NoOutput, CodecError> {
        Ok(NoOutput)
    }

    fn no_output(&self) -> NoOutput {
        NoOutput
    }

    fn is_no_output(&self, _output: &NoOutput) -> bool {
        true
    }

    fn output_to_string(&self, _output: &NoOutput) -> String {
        String::new()
    }
}
