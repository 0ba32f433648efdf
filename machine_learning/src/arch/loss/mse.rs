use autodiff::Var;

use super::LossFn;
use crate::error::Result;

/// Mean squared error loss function.
#[derive(Debug, Default, Clone, Copy)]
pub struct Mse;

impl Mse {
    /// Returns a new `Mse`.
    pub fn new() -> Self {
        Self
    }
}

impl LossFn for Mse {
    fn name(&self) -> &str {
        "mse"
    }

    fn per_instance(&self, y_true: &Var, y_pred: &Var) -> Result<Var> {
        Ok(y_pred.sub(y_true)?.square()?.mean_axis(1)?)
    }
}
