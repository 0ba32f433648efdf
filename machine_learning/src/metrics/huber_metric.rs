use autodiff::Tensor;

use super::{Mean, Metric};
use crate::{arch::loss::Huber, error::Result};

/// The mean Huber loss over every observed element.
#[derive(Debug, Clone)]
pub struct HuberMetric {
    huber: Huber,
    mean: Mean,
}

impl HuberMetric {
    pub fn new(threshold: f64) -> Self {
        Self {
            huber: Huber::new(threshold),
            mean: Mean::new(),
        }
    }
}

impl Metric for HuberMetric {
    fn name(&self) -> &str {
        "huber"
    }

    fn update(&mut self, y_true: &Tensor, y_pred: &Tensor) -> Result<()> {
        let error = y_pred.sub(y_true)?;
        self.mean.update_many(self.huber.elementwise(&error).to_vec());
        Ok(())
    }

    fn result(&self) -> f64 {
        self.mean.result()
    }

    fn reset(&mut self) {
        self.mean.reset();
    }
}
