use autodiff::Var;

use super::LossFn;
use crate::error::{MlErr, Result};

const EPSILON: f64 = 1e-7;

/// Cross entropy for integer class labels.
///
/// `y_true` holds one class index per row, `y_pred` holds one probability, or one logit when
/// `from_logits` is set, per class.
#[derive(Debug, Default, Clone, Copy)]
pub struct SparseCategoricalCrossentropy {
    from_logits: bool,
}

impl SparseCategoricalCrossentropy {
    pub fn new(from_logits: bool) -> Self {
        Self { from_logits }
    }
}

impl LossFn for SparseCategoricalCrossentropy {
    fn name(&self) -> &str {
        "sparse_categorical_crossentropy"
    }

    fn per_instance(&self, y_true: &Var, y_pred: &Var) -> Result<Var> {
        let classes = y_pred.shape().last().copied().unwrap_or(0);
        let labels = labels(&y_true.value().to_vec(), classes)?;

        let log_probs = if self.from_logits {
            y_pred.log_softmax()?
        } else {
            y_pred.max_scalar(EPSILON)?.log()?
        };

        Ok(log_probs.pick(&labels)?.neg()?)
    }
}

/// Converts float labels to class indices.
pub(crate) fn labels(values: &[f64], classes: usize) -> Result<Vec<usize>> {
    values
        .iter()
        .map(|&label| {
            if label < 0.0 || label.fract() != 0.0 || label as usize >= classes {
                return Err(MlErr::InvalidLabel { label, classes });
            }

            Ok(label as usize)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use autodiff::{DType, Tape, Tensor};

    use super::*;

    #[test]
    fn probabilities_and_logits_agree() {
        let logits = Tensor::from_vec(&[2, 3], vec![2.0, 1.0, 0.1, 0.5, 2.5, 0.3])
            .unwrap()
            .cast(DType::F64);
        let probs = {
            let rows: Vec<f64> = logits
                .data()
                .rows()
                .into_iter()
                .flat_map(|row| {
                    let total: f64 = row.iter().map(|v| v.exp()).sum();
                    row.iter().map(|v| v.exp() / total).collect::<Vec<_>>()
                })
                .collect();
            Tensor::new(ndarray::ArrayD::from_shape_vec(vec![2, 3], rows).unwrap(), DType::F64)
        };
        let labels = Tensor::from_vec(&[2, 1], vec![0.0, 1.0]).unwrap().cast(DType::F64);

        let tape = Tape::inference();
        let y_true = tape.constant(labels).unwrap();
        let from_logits = SparseCategoricalCrossentropy::new(true)
            .per_instance(&y_true, &tape.constant(logits).unwrap())
            .unwrap();
        let from_probs = SparseCategoricalCrossentropy::new(false)
            .per_instance(&y_true, &tape.constant(probs).unwrap())
            .unwrap();

        assert_eq!(from_logits.shape(), vec![2]);
        assert!(from_logits.value().allclose(&from_probs.value(), 1e-9));
    }

    #[test]
    fn labels_must_be_class_indices() {
        assert_eq!(labels(&[0.0, 2.0], 3).unwrap(), vec![0, 2]);
        assert!(matches!(labels(&[3.0], 3), Err(MlErr::InvalidLabel { .. })));
        assert!(matches!(labels(&[0.5], 3), Err(MlErr::InvalidLabel { .. })));
        assert!(matches!(labels(&[-1.0], 3), Err(MlErr::InvalidLabel { .. })));
    }
}
