use autodiff::{Tensor, Var};

use super::LossFn;
use crate::error::Result;

/// Huber loss function, quadratic for small errors and linear for large ones.
///
/// For an error `e` and a threshold `t` the loss is `e² / 2` when `|e| < t` and
/// `t * |e| - t² / 2` otherwise.
#[derive(Debug, Clone, Copy)]
pub struct Huber {
    threshold: f64,
}

impl Huber {
    /// Creates a new `Huber` loss.
    ///
    /// # Arguments
    /// * `threshold` - The error size where the loss goes from quadratic to linear.
    ///
    /// # Returns
    /// A new `Huber` instance.
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Computes the loss of every element of `error`, outside of any tape.
    pub fn elementwise(&self, error: &Tensor) -> Tensor {
        let t = self.threshold;
        error.map(|e| {
            if e.abs() < t {
                0.5 * e * e
            } else {
                t * e.abs() - 0.5 * t * t
            }
        })
    }
}

impl Default for Huber {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl LossFn for Huber {
    fn name(&self) -> &str {
        "huber"
    }

    fn per_instance(&self, y_true: &Var, y_pred: &Var) -> Result<Var> {
        let t = self.threshold;
        let error = y_pred.sub(y_true)?;
        let abs_error = error.abs()?;

        let small = error.square()?.scale(0.5)?;
        let large = abs_error.scale(t)?.shift(-0.5 * t * t)?;
        let is_small = abs_error.value().data().mapv(|e| e < t);

        Ok(small.select(is_small, &large)?.mean_axis(1)?)
    }
}
