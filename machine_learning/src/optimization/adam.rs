use std::collections::HashMap;

use autodiff::{ParamId, Parameter, Tensor};

use super::{
    LearningRate, Optimizer,
    optimizer::{check_grad, slot},
};
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: LearningRate,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    m: HashMap<ParamId, Tensor>,
    v: HashMap<ParamId, Tensor>,
    iterations: u64,
}

impl Adam {
    /// Creates a new `Adam` optimizer.
    ///
    /// # Arguments
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `beta1`, `beta2`, `epsilon` - Hyperparameters to the optimization algorithm.
    ///
    /// # Returns
    /// A new `Adam` instance.
    pub fn new(learning_rate: impl Into<LearningRate>, beta1: f64, beta2: f64, epsilon: f64) -> Self {
        Self {
            learning_rate: learning_rate.into(),
            beta1,
            beta2,
            epsilon,
            m: HashMap::new(),
            v: HashMap::new(),
            iterations: 0,
        }
    }
}

impl Optimizer for Adam {
    fn name(&self) -> &str {
        "adam"
    }

    fn apply(&mut self, param: &mut Parameter, grad: &Tensor) -> Result<()> {
        check_grad(param, grad)?;

        let Self {
            beta1: b1,
            beta2: b2,
            epsilon: eps,
            ..
        } = *self;

        let t = (self.iterations + 1) as i32;
        let bc1 = 1. - b1.powi(t);
        let bc2 = 1. - b2.powi(t);
        let step_size = self.learning_rate.at(self.iterations) * (bc2.sqrt() / bc1);

        let m = slot(&mut self.m, param);
        *m = m.zip_with(grad, "adam", |m, g| b1 * m + (1. - b1) * g)?;
        let m = m.clone();

        let s = slot(&mut self.v, param);
        *s = s.zip_with(grad, "adam", |s, g| b2 * s + (1. - b2) * g * g)?;

        let delta = m.zip_with(s, "adam", |m, s| step_size * m / (s.sqrt() + eps))?;
        param.assign_sub(&delta)?;

        Ok(())
    }

    fn step_done(&mut self) {
        self.iterations += 1;
    }

    fn iterations(&self) -> u64 {
        self.iterations
    }
}
