// Pair outputs: two independent algebras combined element-wise

use lexfst_core::CodecError;
use lexfst_core::data_io::{DataInput, DataOutput};

use super::Outputs;

/// Outputs carrying one value from each of two algebras.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairOutputs<A, B> {
    first: A,
    second: B,
}

impl<A: Outputs, B: Outputs> PairOutputs<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }

    pub fn first(&self) -> &A {
        &self.first
    }

    pub fn second(&self) -> &B {
        &self.second
    }
}

impl<A: Outputs, B: Outputs> Outputs for PairOutputs<A, B> {
    type Value = (A::Value, B::Value);

    fn common(&self, a: &Self::Value, b: &Self::Value) -> Self::Value {
        (self.first.common(&a.0, &b.0), self.second.common(&a.1, &b.1))
    }

    fn subtract(&self, output: &Self::Value, inc: &Self::Value) -> Self::Value {
        (
            self.first.subtract(&output.0, &inc.0),
            self.second.subtract(&output.1, &inc.1),
        )
    }

    fn add(&self, prefix: &Self::Value, output: &Self::Value) -> Self::Value {
        (
            self.first.add(&prefix.0, &output.0),
            self.second.add(&prefix.1, &output.1),
        )
    }

    fn write<W: DataOutput + ?Sized>(&self, output: &Self::Value, out: &mut W) {
        self.first.write(&output.0, out);
        self.second.write(&output.1, out);
    }

    fn read<R: DataInput + ?Sized>(&self, input: &mut R) -> Result<Self::Value, CodecError> {
        let a = self.first.read(input)?;
        let b = self.second.read(input)?;
        Ok((a, b))
    }

    fn no_output(&self) -> Self::Value {
        (self.first.no_output(), self.second.no_output())
    }

    fn is_no_output(&self, output: &Self::Value) -> bool {
        self.first.is_no_output(&output.0) && self.second.is_no_output(&output.1)
    }

    fn output_to_string(&self, output: &Self::Value) -> String {
        format!(
            "<{},{}>",
            self.first.output_to_string(&output.0),
            self.second.output_to_string(&output.1)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outputs::{ByteSequenceOutputs, PositiveIntOutputs, assert_algebra_laws};
    use lexfst_core::data_io::ByteArrayDataInput;

    #[test]
    fn combines_element_wise() {
        let o = PairOutputs::new(PositiveIntOutputs, ByteSequenceOutputs);
        let a = (7, b"abc".to_vec());
        let b = (3, b"abd".to_vec());
        assert_eq!(o.common(&a, &b), (3, b"ab".to_vec()));
        assert_algebra_laws(&o, &a, &b);
        assert!(o.is_no_output(&o.no_output()));
        assert!(!o.is_no_output(&(0, b"x".to_vec())));
    }

    #[test]
    fn encodes_both_halves() {
        let o = PairOutputs::new(PositiveIntOutputs, ByteSequenceOutputs);
        let mut buf = Vec::new();
        o.write(&(300, b"q".to_vec()), &mut buf);
        let decoded = o.read(&mut ByteArrayDataInput::new(&buf)).unwrap();
        assert_eq!(decoded, (300, b"q".to_vec()));
        assert_eq!(o.output_to_string(&decoded), "<300,[71]>");
    }
}
