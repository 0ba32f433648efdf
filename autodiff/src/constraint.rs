use crate::tensor::Tensor;

/// A projection applied to a parameter's value after every update.
pub trait Constraint {
    /// Projects `value` into the feasible set. Must keep its shape and type.
    fn project(&self, value: &Tensor) -> Tensor;
}

impl<F> Constraint for F
where
    F: Fn(&Tensor) -> Tensor,
{
    fn project(&self, value: &Tensor) -> Tensor {
        self(value)
    }
}

/// Clamps every value to be non-negative.
#[derive(Debug, Default, Clone, Copy)]
pub struct NonNeg;

impl Constraint for NonNeg {
    fn project(&self, value: &Tensor) -> Tensor {
        value.map(|x| x.max(0.0))
    }
}

/// Clamps every value to `[min, max]`.
#[derive(Debug, Clone, Copy)]
pub struct Clip {
    pub min: f64,
    pub max: f64,
}

impl Clip {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

impl Constraint for Clip {
    fn project(&self, value: &Tensor) -> Tensor {
        value.clamp(self.min, self.max)
    }
}

/// Rescales the whole tensor whenever its euclidean norm exceeds `max`.
#[derive(Debug, Clone, Copy)]
pub struct MaxNorm {
    pub max: f64,
}

impl MaxNorm {
    pub fn new(max: f64) -> Self {
        Self { max }
    }
}

impl Constraint for MaxNorm {
    fn project(&self, value: &Tensor) -> Tensor {
        let norm = value.norm();

        if norm <= self.max {
            return value.clone();
        }

        let factor = self.max / norm;
        value.map(|x| x * factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_neg_is_idempotent() {
        let t = Tensor::from_vec(&[4], vec![-3.0, -0.5, 0.0, 1.5]).unwrap();
        let once = NonNeg.project(&t);
        let twice = NonNeg.project(&once);

        assert_eq!(once.to_vec(), vec![0.0, 0.0, 0.0, 1.5]);
        assert_eq!(once, twice);
    }

    #[test]
    fn closures_are_constraints() {
        let t = Tensor::from_vec(&[2], vec![-1.0, 5.0]).unwrap();
        let halve = |v: &Tensor| v.map(|x| x / 2.0);

        assert_eq!(halve.project(&t).to_vec(), vec![-0.5, 2.5]);
    }

    #[test]
    fn max_norm_rescales_long_tensors_only() {
        let t = Tensor::from_vec(&[2], vec![3.0, 4.0]).unwrap();

        assert_eq!(MaxNorm::new(10.0).project(&t), t);
        assert!(MaxNorm::new(1.0).project(&t).allclose(
            &Tensor::from_vec(&[2], vec![0.6, 0.8]).unwrap(),
            1e-6
        ));
    }

    #[test]
    fn clip_bounds_values() {
        let t = Tensor::from_vec(&[3], vec![-2.0, 0.5, 2.0]).unwrap();
        assert_eq!(Clip::new(-1.0, 1.0).project(&t).to_vec(), vec![-1.0, 0.5, 1.0]);
    }

    #[test]
    fn inverted_clip_bounds_do_not_panic() {
        let t = Tensor::from_vec(&[3], vec![-2.0, 0.5, 2.0]).unwrap();
        assert_eq!(Clip::new(1.0, 0.0).project(&t).to_vec(), vec![0.0, 0.0, 0.0]);
    }
}
