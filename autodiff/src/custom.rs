//! Operations that bring their own backward rule.

use crate::{
    error::{AutodiffErr, Result},
    tape::Var,
    tensor::Tensor,
};

/// An operation whose derivative is given explicitly instead of composed from primitives.
///
/// Used when the composed derivative is numerically unstable even though the function itself
/// is well behaved.
pub trait CustomOp {
    /// The name of this operation, used in logs and errors.
    fn name(&self) -> &str;

    /// Computes the output of this operation.
    ///
    /// # Arguments
    /// * `inputs` - The values of the operation's inputs.
    ///
    /// # Returns
    /// The output or an error if the inputs are incompatible.
    fn forward(&self, inputs: &[&Tensor]) -> Result<Tensor>;

    /// Computes the adjoint of every input given the adjoint of the output.
    ///
    /// # Arguments
    /// * `inputs` - The values of the operation's inputs.
    /// * `output` - The value `forward` produced.
    /// * `upstream` - The adjoint of `output`.
    ///
    /// # Returns
    /// Exactly one adjoint per input. Adjoints with a broadcast shape are summed back down.
    fn backward(&self, inputs: &[&Tensor], output: &Tensor, upstream: &Tensor)
    -> Result<Vec<Tensor>>;
}

/// `log(1 + exp(x))`, computed without overflowing for large inputs.
///
/// The forward pass uses `log(1 + exp(-|x|)) + max(x, 0)` and the backward pass uses
/// `1 - 1 / (1 + exp(x))`, both finite for every finite input.
#[derive(Debug, Default, Clone, Copy)]
pub struct StableSoftplus;

impl CustomOp for StableSoftplus {
    fn name(&self) -> &str {
        "softplus"
    }

    fn forward(&self, inputs: &[&Tensor]) -> Result<Tensor> {
        let x = single_input(self, inputs)?;
        Ok(x.map(|x| (-x.abs()).exp().ln_1p() + x.max(0.0)))
    }

    fn backward(
        &self,
        inputs: &[&Tensor],
        _output: &Tensor,
        upstream: &Tensor,
    ) -> Result<Vec<Tensor>> {
        let x = single_input(self, inputs)?;
        let grad = upstream.zip_with(x, "softplus", |g, x| g * (1.0 - 1.0 / (1.0 + x.exp())))?;
        Ok(vec![grad])
    }
}

fn single_input<'a>(op: &dyn CustomOp, inputs: &[&'a Tensor]) -> Result<&'a Tensor> {
    match inputs {
        [x] => Ok(x),
        _ => Err(AutodiffErr::CustomArity {
            op: op.name().to_string(),
            got: inputs.len(),
            expected: 1,
        }),
    }
}

/// `log(1 + exp(x))` composed from primitives.
///
/// Overflows for large inputs, its gradient becomes `NaN` there. Use [`Var::softplus`] instead.
pub fn softplus_naive(x: &Var) -> Result<Var> {
    x.exp()?.shift(1.0)?.log()
}
