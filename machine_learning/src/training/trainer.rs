use super::{EvalReport, History, Reporter};
use crate::{dataset::Dataset, error::Result};

/// A `Trainer` runs the training loop of a model it owns.
pub trait Trainer {
    /// Trains the model for the configured amount of epochs.
    ///
    /// # Arguments
    /// * `reporter` - Receives the progress of every step and epoch.
    ///
    /// # Returns
    /// The history of this run or the fault that halted it.
    fn fit(&mut self, reporter: &mut dyn Reporter) -> Result<History>;

    /// Computes the loss and metrics of the model on `dataset` without updating it.
    fn evaluate(&mut self, dataset: &Dataset) -> Result<EvalReport>;

    /// Returns every epoch report so far.
    fn history(&self) -> &History;
}
