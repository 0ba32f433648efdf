use autodiff::{DType, Tensor};
use ndarray::{ArrayD, Dimension, IxDyn};
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::{Normal, Uniform};

use crate::error::Result;

/// A `ParamGen` generates the initial value of a model's parameter.
///
/// The scaled variants compute their range from the fan-in and fan-out of the parameter, a
/// 2-D kernel of shape `(inputs, outputs)` has a fan-in of `inputs` and a fan-out of `outputs`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamGen {
    Zeros,
    Const { value: f64 },
    Uniform { low: f64, high: f64 },
    Normal { mean: f64, std_dev: f64 },
    XavierUniform,
    HeNormal,
    LecunNormal,
}

impl Default for ParamGen {
    fn default() -> Self {
        Self::XavierUniform
    }
}

impl ParamGen {
    /// Samples a new tensor.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    /// * `shape` - The shape of the parameter.
    /// * `dtype` - The type of the parameter.
    ///
    /// # Returns
    /// The initial value or an error if the distribution is invalid (e.g. `low >= high`).
    pub fn generate<R>(&self, rng: &mut R, shape: &[usize], dtype: DType) -> Result<Tensor>
    where
        R: Rng + ?Sized,
    {
        let shape = IxDyn(shape);
        let (fan_in, fan_out) = fans(shape.slice());

        let data = match *self {
            ParamGen::Zeros => ArrayD::zeros(shape),
            ParamGen::Const { value } => ArrayD::from_elem(shape, value),
            ParamGen::Uniform { low, high } => {
                ArrayD::random_using(shape, Uniform::new(low, high)?, rng)
            }
            ParamGen::Normal { mean, std_dev } => {
                ArrayD::random_using(shape, Normal::new(mean, std_dev)?, rng)
            }
            ParamGen::XavierUniform => {
                let range = (6. / (fan_in + fan_out) as f64).sqrt();
                ArrayD::random_using(shape, Uniform::new(-range, range)?, rng)
            }
            ParamGen::HeNormal => {
                let std_dev = (2. / fan_in as f64).sqrt();
                ArrayD::random_using(shape, Normal::new(0., std_dev)?, rng)
            }
            ParamGen::LecunNormal => {
                let std_dev = (1. / fan_in as f64).sqrt();
                ArrayD::random_using(shape, Normal::new(0., std_dev)?, rng)
            }
        };

        Ok(Tensor::new(data, dtype))
    }
}

/// Returns the fan-in and fan-out of a parameter, neither of them is ever zero.
fn fans(shape: &[usize]) -> (usize, usize) {
    let (fan_in, fan_out) = match shape {
        [] => (1, 1),
        [n] => (*n, *n),
        [rest @ .., inputs, outputs] => {
            let receptive: usize = rest.iter().product();
            (inputs * receptive, outputs * receptive)
        }
    };

    (fan_in.max(1), fan_out.max(1))
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn seeded_rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn constant_generators() {
        let mut rng = seeded_rng();

        let zeros = ParamGen::Zeros.generate(&mut rng, &[2, 3], DType::F32).unwrap();
        assert_eq!(zeros, Tensor::zeros(&[2, 3], DType::F32));

        let halves = ParamGen::Const { value: 0.5 }
            .generate(&mut rng, &[4], DType::F64)
            .unwrap();
        assert_eq!(halves.to_vec(), vec![0.5; 4]);
    }

    #[test]
    fn xavier_uniform_stays_within_its_range() {
        let mut rng = seeded_rng();
        let t = ParamGen::XavierUniform
            .generate(&mut rng, &[4, 2], DType::F32)
            .unwrap();

        let range = 1.0f64;
        assert_eq!(t.shape(), &[4, 2]);
        assert!(t.to_vec().iter().all(|x| x.abs() <= range));
    }

    #[test]
    fn same_seed_same_values() {
        let a = ParamGen::HeNormal
            .generate(&mut seeded_rng(), &[3, 3], DType::F32)
            .unwrap();
        let b = ParamGen::HeNormal
            .generate(&mut seeded_rng(), &[3, 3], DType::F32)
            .unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn invalid_distributions_fail() {
        let mut rng = seeded_rng();

        assert!(
            ParamGen::Uniform { low: 1., high: 0. }
                .generate(&mut rng, &[2], DType::F32)
                .is_err()
        );
        assert!(
            ParamGen::Normal {
                mean: 0.,
                std_dev: f64::NAN
            }
            .generate(&mut rng, &[2], DType::F32)
            .is_err()
        );
    }

    #[test]
    fn fans_of_common_shapes() {
        assert_eq!(fans(&[]), (1, 1));
        assert_eq!(fans(&[5]), (5, 5));
        assert_eq!(fans(&[3, 7]), (3, 7));
        assert_eq!(fans(&[0, 7]), (1, 7));
    }
}
