use autodiff::Tensor;
use ndarray::Ix2;

use super::{Mean, Metric};
use crate::{
    arch::loss::labels,
    error::{MlErr, Result},
};

/// The fraction of examples whose highest scoring class is the expected label.
#[derive(Debug, Default, Clone)]
pub struct SparseCategoricalAccuracy {
    mean: Mean,
}

impl SparseCategoricalAccuracy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Metric for SparseCategoricalAccuracy {
    fn name(&self) -> &str {
        "accuracy"
    }

    fn update(&mut self, y_true: &Tensor, y_pred: &Tensor) -> Result<()> {
        let scores = y_pred
            .data()
            .view()
            .into_dimensionality::<Ix2>()
            .map_err(|_| MlErr::SizeMismatch {
                a: "predictions",
                b: "a batch of class scores",
                got: y_pred.ndim(),
                expected: 2,
            })?;

        let labels = labels(&y_true.to_vec(), scores.ncols())?;
        if labels.len() != scores.nrows() {
            return Err(MlErr::SizeMismatch {
                a: "labels",
                b: "predictions",
                got: labels.len(),
                expected: scores.nrows(),
            });
        }

        let hits = scores.rows().into_iter().zip(&labels).map(|(row, &label)| {
            let best = row
                .iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |best, (i, &v)| {
                    if v > best.1 { (i, v) } else { best }
                })
                .0;

            (best == label) as u8 as f64
        });

        self.mean.update_many(hits);
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
    fn counts_hits() {
        let mut accuracy = SparseCategoricalAccuracy::new();
        let y_true = Tensor::from_vec(&[3, 1], vec![0.0, 2.0, 1.0]).unwrap();
        let y_pred = Tensor::from_vec(
            &[3, 3],
            vec![
                0.8, 0.1, 0.1, // hit
                0.2, 0.5, 0.3, // miss
                0.1, 0.7, 0.2, // hit
            ],
        )
        .unwrap();

        accuracy.update(&y_true, &y_pred).unwrap();
        assert!((accuracy.result() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn labels_must_match_rows() {
        let mut accuracy = SparseCategoricalAccuracy::new();
        let y_true = Tensor::from_vec(&[1, 1], vec![0.0]).unwrap();
        let y_pred = Tensor::zeros(&[2, 2], autodiff::DType::F32);

        assert!(accuracy.update(&y_true, &y_pred).is_err());
    }
}
