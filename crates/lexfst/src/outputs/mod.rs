// Output algebras: how arc outputs combine along a path and factor across
// shared prefixes.

use std::fmt;
use std::hash::Hash;

use lexfst_core::CodecError;
use lexfst_core::data_io::{DataInput, DataOutput};

mod byte_sequence;
mod int_sequence;
mod no_output;
mod pair;
mod positive_int;

pub use byte_sequence::ByteSequenceOutputs;
pub use int_sequence::IntSequenceOutputs;
pub use no_output::{NoOutput, NoOutputs};
pub use pair::PairOutputs;
pub use positive_int::PositiveIntOutputs;

/// An output algebra.
///
/// Implementations must satisfy, for all `a`, `b` and `x`:
///
/// - `add(common(a, b), subtract(a, common(a, b))) == a`
/// - `add(no_output(), x) == x == add(x, no_output())`
///
/// The builder relies on the first law to hoist shared output prefixes
/// toward the root. Violations are caught by debug assertions only.
///
/// `no_output()` is the identity element. The encoder tests outputs with
/// [`is_no_output`](Outputs::is_no_output) and omits them from the byte
/// stream entirely, so every algebra must produce exactly one value that
/// answers `true` there.
pub trait Outputs: Clone {
    type Value: Clone + fmt::Debug + PartialEq + Hash;

    /// Longest shared prefix of `a` and `b`, or `no_output()`.
    fn common(&self, a: &Self::Value, b: &Self::Value) -> Self::Value;

    /// Removes `inc`, a prefix of `output`.
    fn subtract(&self, output: &Self::Value, inc: &Self::Value) -> Self::Value;

    /// Appends `output` to `prefix`.
    fn add(&self, prefix: &Self::Value, output: &Self::Value) -> Self::Value;

    fn write<W: DataOutput + ?Sized>(&self, output: &Self::Value, out: &mut W);

    fn read<R: DataInput + ?Sized>(&self, input: &mut R) -> Result<Self::Value, CodecError>;

    /// Advances past one encoded output without materializing it.
    fn skip_output<R: DataInput + ?Sized>(&self, input: &mut R) -> Result<(), CodecError> {
        self.read(input).map(drop)
    }

    /// Encoding for final outputs. Defaults to [`write`](Outputs::write).
    fn write_final_output<W: DataOutput + ?Sized>(&self, output: &Self::Value, out: &mut W) {
        self.write(output, out);
    }

    fn read_final_output<R: DataInput + ?Sized>(
        &self,
        input: &mut R,
    ) -> Result<Self::Value, CodecError> {
        self.read(input)
    }

    fn skip_final_output<R: DataInput + ?Sized>(&self, input: &mut R) -> Result<(), CodecError> {
        self.skip_output(input)
    }

    fn no_output(&self) -> Self::Value;

    fn is_no_output(&self, output: &Self::Value) -> bool {
        *output == self.no_output()
    }

    fn output_to_string(&self, output: &Self::Value) -> String {
        format!("{output:?}")
    }
}

/// Checks both algebra laws for one pair of values. Test helper.
#[cfg(test)]
pub(crate) fn assert_algebra_laws<O: Outputs>(outputs: &O, a: &O::Value, b: &O::Value) {
    let common = outputs.common(a, b);
    assert_eq!(&outputs.add(&common, &outputs.subtract(a, &common)), a);
    assert_eq!(&outputs.add(&common, &outputs.subtract(b, &common)), b);
    let none = outputs.no_output();
    assert_eq!(&outputs.add(&none, a), a);
    assert_eq!(&outputs.add(a, &none), a);
}
