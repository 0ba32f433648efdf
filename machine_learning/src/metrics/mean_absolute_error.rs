use autodiff::Tensor;

use super::{Mean, Metric};
use crate::error::Result;

/// The mean of `|y_pred - y_true|` over every observed element.
#[derive(Debug, Default, Clone)]
pub struct MeanAbsoluteError {
    mean: Mean,
}

impl MeanAbsoluteError {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Metric for MeanAbsoluteError {
    fn name(&self) -> &str {
        "mae"
    }

    fn update(&mut self, y_true: &Tensor, y_pred: &Tensor) -> Result<()> {
        let errors = y_pred.zip_with(y_true, "mae", |p, t| (p - t).abs())?;
        self.mean.update_many(errors.to_vec());
        Ok(())
    }

    fn result(&self) -> f64 {
        self.mean.result()
    }

    fn reset(&mut self) {
        self.mean.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_over_elements() {
        let mut mae = MeanAbsoluteError::new();
        let y_true = Tensor::from_vec(&[2, 1], vec![1.0, 2.0]).unwrap();
        let y_pred = Tensor::from_vec(&[2, 1], vec![2.0, 4.0]).unwrap();

        mae.update(&y_true, &y_pred).unwrap();
        assert_eq!(mae.result(), 1.5);

        mae.reset();
        assert_eq!(mae.result(), 0.0);
    }
}
