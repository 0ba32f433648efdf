/// A learning rate schedule, evaluated at the amount of steps taken so far.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LearningRate {
    Constant(f64),
    /// `initial * decay_rate ^ (step / decay_steps)`
    ExponentialDecay {
        initial: f64,
        decay_steps: u64,
        decay_rate: f64,
    },
}

impl LearningRate {
    pub fn at(&self, step: u64) -> f64 {
        match *self {
            LearningRate::Constant(lr) => lr,
            LearningRate::ExponentialDecay {
                initial,
                decay_steps,
                decay_rate,
            } => {
                let exponent = step as f64 / decay_steps.max(1) as f64;
                initial * decay_rate.powf(exponent)
            }
        }
    }
}

impl From<f64> for LearningRate {
    fn from(value: f64) -> Self {
        Self::Constant(value)
    }
}
