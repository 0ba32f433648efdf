use ndarray::{Array1, Array2, Axis, s};
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::{Normal, Uniform};

use crate::error::{MlErr, Result};

/// A collection of examples, one row of `x` and one row of `y` per example.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    x: Array2<f64>,
    y: Array2<f64>,
}

impl Dataset {
    /// Creates a new `Dataset`.
    ///
    /// # Arguments
    /// * `x` - The inputs, one row per example.
    /// * `y` - The expected outputs, one row per example.
    ///
    /// # Returns
    /// A new `Dataset` or an error if the amount of rows differ or there are none.
    pub fn new(x: Array2<f64>, y: Array2<f64>) -> Result<Self> {
        if x.nrows() != y.nrows() {
            return Err(MlErr::SizeMismatch {
                a: "x rows",
                b: "y rows",
                got: y.nrows(),
                expected: x.nrows(),
            });
        }

        if x.nrows() == 0 {
            return Err(MlErr::EmptyDataset);
        }

        Ok(Self { x, y })
    }

    /// Creates a new `Dataset` from interleaved rows.
    ///
    /// # Arguments
    /// * `data` - The examples, each one being `x_size` inputs followed by `y_size` outputs.
    /// * `x_size` - The size of an input.
    /// * `y_size` - The size of an output.
    ///
    /// # Returns
    /// The dataset or an error if `data` doesn't hold a whole amount of rows.
    pub fn from_flat(data: Vec<f64>, x_size: usize, y_size: usize) -> Result<Self> {
        let row = x_size + y_size;

        if x_size == 0 || y_size == 0 || data.len() % row != 0 {
            return Err(MlErr::SizeMismatch {
                a: "data",
                b: "row",
                got: data.len(),
                expected: data.len().next_multiple_of(row.max(1)),
            });
        }

        let rows = data.len() / row;
        let full = Array2::from_shape_vec((rows, row), data).map_err(|_| MlErr::SizeMismatch {
            a: "data",
            b: "row",
            got: rows,
            expected: row,
        })?;

        let x = full.slice(s![.., ..x_size]).to_owned();
        let y = full.slice(s![.., x_size..]).to_owned();
        Self::new(x, y)
    }

    /// Generates a noisy linear regression problem, `y = x·w + b + noise`.
    ///
    /// # Arguments
    /// * `samples` - The amount of examples.
    /// * `features` - The size of an input.
    /// * `noise` - The standard deviation of the gaussian noise added to every output.
    /// * `rng` - A random number generator.
    pub fn synthetic_regression<R>(
        samples: usize,
        features: usize,
        noise: f64,
        rng: &mut R,
    ) -> Result<Self>
    where
        R: Rng + ?Sized,
    {
        if samples == 0 || features == 0 {
            return Err(MlErr::EmptyDataset);
        }

        let x = Array2::random_using((samples, features), Uniform::new(-1., 1.)?, rng);
        let w = Array1::random_using(features, Uniform::new(0.5, 2.)?, rng);
        let noise = Array1::random_using(samples, Normal::new(0., noise)?, rng);

        let y = (x.dot(&w) + noise + 0.5).insert_axis(Axis(1));
        Self::new(x, y)
    }

    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn x_size(&self) -> usize {
        self.x.ncols()
    }

    pub fn y_size(&self) -> usize {
        self.y.ncols()
    }

    pub fn x(&self) -> &Array2<f64> {
        &self.x
    }

    pub fn y(&self) -> &Array2<f64> {
        &self.y
    }

    /// Samples `batch_size` examples uniformly, with replacement.
    ///
    /// # Arguments
    /// * `batch_size` - The amount of examples to sample.
    /// * `rng` - A random number generator.
    ///
    /// # Returns
    /// The sampled inputs and outputs or an error if `batch_size` is zero.
    pub fn random_batch<R>(&self, batch_size: usize, rng: &mut R) -> Result<(Array2<f64>, Array2<f64>)>
    where
        R: Rng + ?Sized,
    {
        if batch_size == 0 {
            return Err(MlErr::InvalidBatchSize);
        }

        let len = self.len();
        let indices: Vec<_> = (0..batch_size).map(|_| rng.random_range(0..len)).collect();

        let x = self.x.select(Axis(0), &indices);
        let y = self.y.select(Axis(0), &indices);
        Ok((x, y))
    }

    /// Splits off the last `fraction` of the examples.
    ///
    /// # Arguments
    /// * `fraction` - The fraction of examples that goes to the second dataset, in `(0, 1)`.
    ///
    /// # Returns
    /// The remaining and the split off datasets, or an error if either of them would be empty.
    pub fn split(&self, fraction: f64) -> Result<(Dataset, Dataset)> {
        let len = self.len();
        let held_out = (len as f64 * fraction).round() as usize;

        if fraction <= 0. || fraction >= 1. || held_out == 0 || held_out >= len {
            return Err(MlErr::InvalidSplit { fraction });
        }

        let at = len - held_out;
        let first = Self {
            x: self.x.slice(s![..at, ..]).to_owned(),
            y: self.y.slice(s![..at, ..]).to_owned(),
        };
        let second = Self {
            x: self.x.slice(s![at.., ..]).to_owned(),
            y: self.y.slice(s![at.., ..]).to_owned(),
        };

        Ok((first, second))
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn dataset() -> Dataset {
        let data = vec![1., 2., 10., 3., 4., 20., 5., 6., 30., 7., 8., 40.];
        Dataset::from_flat(data, 2, 1).unwrap()
    }

    #[test]
    fn from_flat_splits_rows() {
        let dataset = dataset();

        assert_eq!(dataset.len(), 4);
        assert_eq!(dataset.x().row(1), array![3., 4.]);
        assert_eq!(dataset.y().column(0), array![10., 20., 30., 40.]);
    }

    #[test]
    fn mismatched_rows_are_rejected() {
        let x = Array2::zeros((3, 2));
        let y = Array2::zeros((2, 1));

        assert!(matches!(Dataset::new(x, y), Err(MlErr::SizeMismatch { .. })));
        assert!(Dataset::from_flat(vec![1.; 7], 2, 1).is_err());
        assert!(matches!(
            Dataset::new(Array2::zeros((0, 2)), Array2::zeros((0, 1))),
            Err(MlErr::EmptyDataset)
        ));
    }

    #[test]
    fn random_batches_keep_rows_together() {
        let dataset = dataset();
        let mut rng = StdRng::seed_from_u64(42);

        let (x, y) = dataset.random_batch(16, &mut rng).unwrap();

        assert_eq!(x.dim(), (16, 2));
        assert_eq!(y.dim(), (16, 1));
        for (x, y) in x.rows().into_iter().zip(y.column(0)) {
            // Every row of the dataset satisfies y = 5 * x1.
            assert_eq!(*y, 5. * x[1]);
        }

        assert!(matches!(
            dataset.random_batch(0, &mut rng),
            Err(MlErr::InvalidBatchSize)
        ));
    }

    #[test]
    fn split_holds_out_the_tail() {
        let (train, valid) = dataset().split(0.25).unwrap();

        assert_eq!(train.len(), 3);
        assert_eq!(valid.len(), 1);
        assert_eq!(valid.y()[[0, 0]], 40.);

        assert!(dataset().split(0.).is_err());
        assert!(dataset().split(0.05).is_err());
        assert!(dataset().split(1.).is_err());
    }

    #[test]
    fn synthetic_regression_is_seeded() {
        let a = Dataset::synthetic_regression(32, 3, 0.1, &mut StdRng::seed_from_u64(7)).unwrap();
        let b = Dataset::synthetic_regression(32, 3, 0.1, &mut StdRng::seed_from_u64(7)).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.x_size(), 3);
        assert_eq!(a.y_size(), 1);
        assert!(a.x().iter().all(|x| x.abs() <= 1.));
    }
}
