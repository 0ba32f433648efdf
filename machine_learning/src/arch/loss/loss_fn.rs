use autodiff::Var;

use crate::error::Result;

/// A loss function measures how far a model's predictions are from the expected outputs.
pub trait LossFn {
    fn name(&self) -> &str;

    /// Computes the loss of every example of a batch.
    ///
    /// # Arguments
    /// * `y_true` - The expected outputs, one row per example.
    /// * `y_pred` - The predictions, one row per example.
    ///
    /// # Returns
    /// A value of shape `[batch]`, reduced to a scalar by the trainer.
    fn per_instance(&self, y_true: &Var, y_pred: &Var) -> Result<Var>;
}
