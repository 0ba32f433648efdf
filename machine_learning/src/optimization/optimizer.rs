use std::collections::HashMap;

use autodiff::{ParamId, Parameter, Tensor};

use crate::error::{MlErr, Result};

/// Defines the strategy for updating model parameters based on their gradients.
pub trait Optimizer {
    fn name(&self) -> &str;

    /// Updates a single parameter in place.
    ///
    /// # Arguments
    /// * `param` - The parameter to update.
    /// * `grad` - The gradient of the loss with respect to `param`.
    ///
    /// # Returns
    /// An error if the gradient doesn't match the parameter's shape or type.
    fn apply(&mut self, param: &mut Parameter, grad: &Tensor) -> Result<()>;

    /// Marks the end of a training step, advancing the learning rate schedule and the bias
    /// corrections.
    fn step_done(&mut self);

    /// Returns the amount of completed steps.
    fn iterations(&self) -> u64;
}

/// Returns the slot of `param` in `slots`, creating it filled with zeros on first use.
pub(super) fn slot<'a>(slots: &'a mut HashMap<ParamId, Tensor>, param: &Parameter) -> &'a mut Tensor {
    slots
        .entry(param.id())
        .or_insert_with(|| param.value().zeros_like())
}

/// Checks that `grad` fits `param`, broadcasting a gradient over a parameter is never intended.
pub(super) fn check_grad(param: &Parameter, grad: &Tensor) -> Result<()> {
    if grad.shape() != param.shape() {
        return Err(MlErr::SizeMismatch {
            a: "gradient",
            b: "parameter",
            got: grad.len(),
            expected: param.len(),
        });
    }

    Ok(())
}
