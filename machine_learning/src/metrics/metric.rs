use autodiff::Tensor;

use crate::error::Result;

/// A streaming metric, aggregated over every batch it observes until it's reset.
pub trait Metric {
    fn name(&self) -> &str;

    /// Observes a batch of expected outputs and predictions.
    ///
    /// # Arguments
    /// * `y_true` - The expected outputs, one row per example.
    /// * `y_pred` - The predictions, one row per example.
    ///
    /// # Returns
    /// An error if the batches are incompatible.
    fn update(&mut self, y_true: &Tensor, y_pred: &Tensor) -> Result<()>;

    fn result(&self) -> f64;

    fn reset(&mut self);
}
