use autodiff::{Parameter, Tensor};

use super::{LearningRate, Optimizer, optimizer::check_grad};
use crate::error::Result;

/// Gradient descent optimization algorithm.
#[derive(Debug, Clone)]
pub struct GradientDescent {
    learning_rate: LearningRate,
    iterations: u64,
}

impl GradientDescent {
    /// Returns a new `GradientDescent`.
    ///
    /// # Arguments
    /// * `learning_rate` - The *length* of the steps taken on `apply`.
    pub fn new(learning_rate: impl Into<LearningRate>) -> Self {
        Self {
            learning_rate: learning_rate.into(),
            iterations: 0,
        }
    }
}

impl Optimizer for GradientDescent {
    fn name(&self) -> &str {
        "gradient_descent"
    }

    /// Makes a step in the opposite direction of the gradient, with a length of the current
    /// learning rate.
    fn apply(&mut self, param: &mut Parameter, grad: &Tensor) -> Result<()> {
        check_grad(param, grad)?;

        let lr = self.learning_rate.at(self.iterations);
        param.assign_sub(&grad.map(|g| lr * g))?;
        Ok(())
    }

    fn step_done(&mut self) {
        self.iterations += 1;
    }

    fn iterations(&self) -> u64 {
        self.iterations
    }
}
