use autodiff::Var;

use super::LossFn;
use crate::error::Result;

/// Mean absolute error loss function.
#[derive(Debug, Default, Clone, Copy)]
pub struct Mae;

impl Mae {
    pub fn new() -> Self {
        Self
    }
}

impl LossFn for Mae {
    fn name(&self) -> &str {
        "mae"
    }

    fn per_instance(&self, y_true: &Var, y_pred: &Var) -> Result<Var> {
        Ok(y_pred.sub(y_true)?.abs()?.mean_axis(1)?)
    }
}
