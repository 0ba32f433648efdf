use std::collections::HashMap;

use autodiff::{ParamId, Parameter, Tensor};

use super::{
    LearningRate, Optimizer,
    optimizer::{check_grad, slot},
};
use crate::error::Result;

/// Gradient descent with an exponentially averaged momentum.
///
/// Each parameter keeps a momentum `m`, updated as `m = β·m - (1 - β)·g` before moving the
/// parameter by `lr·m`.
#[derive(Debug, Clone)]
pub struct GradientDescentWithMomentum {
    learning_rate: LearningRate,
    momentum: f64,
    velocity: HashMap<ParamId, Tensor>,
    iterations: u64,
}

impl GradientDescentWithMomentum {
    /// Creates a new `GradientDescentWithMomentum` optimizer.
    ///
    /// # Arguments
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `momentum` - The decay of the momentum, in `[0, 1)`.
    ///
    /// # Returns
    /// A new `GradientDescentWithMomentum` instance.
    pub fn new(learning_rate: impl Into<LearningRate>, momentum: f64) -> Self {
        Self {
            learning_rate: learning_rate.into(),
            momentum,
            velocity: HashMap::new(),
            iterations: 0,
        }
    }
}

impl Optimizer for GradientDescentWithMomentum {
    fn name(&self) -> &str {
        "gradient_descent_with_momentum"
    }

    fn apply(&mut self, param: &mut Parameter, grad: &Tensor) -> Result<()> {
        check_grad(param, grad)?;

        let lr = self.learning_rate.at(self.iterations);
        let mu = self.momentum;

        let v = slot(&mut self.velocity, param);
        *v = v.zip_with(grad, "momentum", |v, g| mu * v - (1. - mu) * g)?;
        param.assign_add(&v.map(|v| lr * v))?;

        Ok(())
    }

    fn step_done(&mut self) {
        self.iterations += 1;
    }

    fn iterations(&self) -> u64 {
        self.iterations
    }
}

#[cfg(test)]
mod tests {
    use autodiff::DType;

    use super::*;

    #[test]
    fn momentum_accumulates() {
        let mut p = Parameter::new("p", Tensor::scalar_of(0.0, DType::F64));
        let grad = Tensor::scalar_of(1.0, DType::F64);
        let mut optimizer = GradientDescentWithMomentum::new(1.0, 0.5);

        // m = -0.5
        optimizer.apply(&mut p, &grad).unwrap();
        optimizer.step_done();
        assert_eq!(p.value().to_scalar().unwrap(), -0.5);

        // m = -0.25 - 0.5
        optimizer.apply(&mut p, &grad).unwrap();
        optimizer.step_done();
        assert_eq!(p.value().to_scalar().unwrap(), -1.25);
    }

    #[test]
    fn each_parameter_has_its_own_velocity() {
        let mut a = Parameter::new("a", Tensor::scalar_of(0.0, DType::F64));
        let mut b = Parameter::new("b", Tensor::scalar_of(0.0, DType::F64));
        let mut optimizer = GradientDescentWithMomentum::new(1.0, 0.5);

        optimizer.apply(&mut a, &Tensor::scalar_of(1.0, DType::F64)).unwrap();
        optimizer.apply(&mut b, &Tensor::scalar_of(-1.0, DType::F64)).unwrap();

        assert_eq!(a.value().to_scalar().unwrap(), -0.5);
        assert_eq!(b.value().to_scalar().unwrap(), 0.5);
    }
}
