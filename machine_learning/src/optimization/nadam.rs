use std::collections::HashMap;

use autodiff::{ParamId, Parameter, Tensor};

use super::{
    LearningRate, Optimizer,
    optimizer::{check_grad, slot},
};
use crate::error::Result;

/// Adam with Nesterov momentum: the update looks one step ahead along the first moment.
#[derive(Debug, Clone)]
pub struct Nadam {
    learning_rate: LearningRate,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    m: HashMap<ParamId, Tensor>,
    v: HashMap<ParamId, Tensor>,
    iterations: u64,
}

impl Nadam {
    /// Creates a new `Nadam` optimizer.
    ///
    /// # Arguments
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `beta1`, `beta2`, `epsilon` - Hyperparameters to the optimization algorithm.
    ///
    /// # Returns
    /// A new `Nadam` instance.
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

impl Optimizer for Nadam {
    fn name(&self) -> &str {
        "nadam"
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
        let lr = self.learning_rate.at(self.iterations);
        let bc1 = 1. - b1.powi(t);
        let bc1_next = 1. - b1.powi(t + 1);
        let bc2 = 1. - b2.powi(t);

        let m = slot(&mut self.m, param);
        *m = m.zip_with(grad, "nadam", |m, g| b1 * m + (1. - b1) * g)?;
        let m_hat = m
            .zip_with(grad, "nadam", |m, g| b1 * m / bc1_next + (1. - b1) * g / bc1)?;

        let s = slot(&mut self.v, param);
        *s = s.zip_with(grad, "nadam", |s, g| b2 * s + (1. - b2) * g * g)?;

        let delta = m_hat.zip_with(s, "nadam", |m, s| lr * m / ((s / bc2).sqrt() + eps))?;
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
