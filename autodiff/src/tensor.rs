use std::fmt::{self, Display};

use ndarray::{ArrayD, Axis, IxDyn, Zip};

use crate::error::{AutodiffErr, Result};

/// The fixed-width float types a `Tensor` can hold.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    #[default]
    F32,
    F64,
}

impl DType {
    /// Rounds `x` to the precision of this type.
    #[inline]
    pub fn round(self, x: f64) -> f64 {
        match self {
            DType::F32 => x as f32 as f64,
            DType::F64 => x,
        }
    }
}

impl Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::F32 => f.write_str("float32"),
            DType::F64 => f.write_str("float64"),
        }
    }
}

/// A multi-dimensional array of floats.
///
/// Values are always stored as `f64`. An `F32` tensor rounds its values through `f32` every time
/// it's built, so overflow and precision behave as in a real single precision computation.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    data: ArrayD<f64>,
    dtype: DType,
}

impl Tensor {
    /// Creates a new `Tensor`.
    ///
    /// # Arguments
    /// * `data` - The values of the tensor.
    /// * `dtype` - The type the values should be rounded to.
    ///
    /// # Returns
    /// A new `Tensor` instance.
    pub fn new(mut data: ArrayD<f64>, dtype: DType) -> Self {
        if dtype == DType::F32 {
            data.mapv_inplace(|x| dtype.round(x));
        }

        Self { data, dtype }
    }

    /// Creates a new `F32` tensor from an array.
    pub fn from_array(data: ArrayD<f64>) -> Self {
        Self::new(data, DType::F32)
    }

    /// Creates a new rank 0 `F32` tensor.
    pub fn scalar(value: f64) -> Self {
        Self::scalar_of(value, DType::F32)
    }

    /// Creates a new rank 0 tensor of the given type.
    pub fn scalar_of(value: f64, dtype: DType) -> Self {
        Self::new(ArrayD::from_elem(IxDyn(&[]), value), dtype)
    }

    /// Creates a new `F32` tensor from values laid out in row-major order.
    ///
    /// # Arguments
    /// * `shape` - The shape of the tensor.
    /// * `values` - The values, its length must be the product of `shape`.
    ///
    /// # Returns
    /// The tensor or an error if the amount of values doesn't fit the shape.
    pub fn from_vec(shape: &[usize], values: Vec<f64>) -> Result<Self> {
        let len = values.len();
        let data = ArrayD::from_shape_vec(IxDyn(shape), values).map_err(|_| {
            AutodiffErr::InvalidShape {
                shape: shape.to_vec(),
                len,
            }
        })?;

        Ok(Self::from_array(data))
    }

    pub fn zeros(shape: &[usize], dtype: DType) -> Self {
        Self::full(shape, 0.0, dtype)
    }

    pub fn ones(shape: &[usize], dtype: DType) -> Self {
        Self::full(shape, 1.0, dtype)
    }

    pub fn full(shape: &[usize], value: f64, dtype: DType) -> Self {
        Self::new(ArrayD::from_elem(IxDyn(shape), value), dtype)
    }

    pub fn zeros_like(&self) -> Self {
        Self::zeros(self.shape(), self.dtype)
    }

    pub fn ones_like(&self) -> Self {
        Self::ones(self.shape(), self.dtype)
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn data(&self) -> &ArrayD<f64> {
        &self.data
    }

    pub fn into_data(self) -> ArrayD<f64> {
        self.data
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.data.iter().copied().collect()
    }

    /// Returns the only value of this tensor.
    ///
    /// # Returns
    /// The value or an error if the tensor doesn't hold exactly one value.
    pub fn to_scalar(&self) -> Result<f64> {
        match self.data.iter().next() {
            Some(&x) if self.len() == 1 => Ok(x),
            _ => Err(AutodiffErr::NonScalar {
                shape: self.shape().to_vec(),
            }),
        }
    }

    /// Converts this tensor to another type, this is the only way values change their type.
    pub fn cast(&self, dtype: DType) -> Self {
        Self::new(self.data.clone(), dtype)
    }

    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(f64) -> f64,
    {
        Self::new(self.data.mapv(f), self.dtype)
    }

    /// Bounds every value to `[min, max]`. If `min > max` every value ends up at `max`.
    pub fn clamp(&self, min: f64, max: f64) -> Self {
        self.map(|x| x.max(min).min(max))
    }

    pub fn sum(&self) -> f64 {
        self.data.sum()
    }

    pub fn mean(&self) -> f64 {
        self.sum() / self.len() as f64
    }

    /// Returns the euclidean norm of all the values.
    pub fn norm(&self) -> f64 {
        self.data.iter().map(|x| x * x).sum::<f64>().sqrt()
    }

    /// Whether both tensors have the same shape and every pair of values is within `tol`.
    pub fn allclose(&self, other: &Tensor, tol: f64) -> bool {
        self.shape() == other.shape()
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(a, b)| (a - b).abs() <= tol)
    }

    /// Combines two tensors element-wise, broadcasting them to a common shape.
    ///
    /// # Arguments
    /// * `other` - The right hand side operand.
    /// * `op` - The name of the operation, for error reporting.
    /// * `f` - The element-wise operation.
    ///
    /// # Returns
    /// The combined tensor or an error if the shapes or types are incompatible.
    pub fn zip_with<F>(&self, other: &Tensor, op: &'static str, f: F) -> Result<Tensor>
    where
        F: Fn(f64, f64) -> f64,
    {
        self.check_dtype(other, op)?;

        let mismatch = || AutodiffErr::ShapeMismatch {
            op,
            lhs: self.shape().to_vec(),
            rhs: other.shape().to_vec(),
        };

        let shape = broadcast_shape(self.shape(), other.shape()).ok_or_else(mismatch)?;
        let lhs = self.data.broadcast(IxDyn(&shape)).ok_or_else(mismatch)?;
        let rhs = other.data.broadcast(IxDyn(&shape)).ok_or_else(mismatch)?;
        let data = Zip::from(lhs).and(rhs).map_collect(|&a, &b| f(a, b));

        Ok(Tensor::new(data, self.dtype))
    }

    pub fn add(&self, other: &Tensor) -> Result<Tensor> {
        self.zip_with(other, "add", |a, b| a + b)
    }

    pub fn sub(&self, other: &Tensor) -> Result<Tensor> {
        self.zip_with(other, "sub", |a, b| a - b)
    }

    pub fn mul(&self, other: &Tensor) -> Result<Tensor> {
        self.zip_with(other, "mul", |a, b| a * b)
    }

    pub fn div(&self, other: &Tensor) -> Result<Tensor> {
        self.zip_with(other, "div", |a, b| a / b)
    }

    /// Sums a broadcast gradient back down to `shape`.
    pub(crate) fn sum_to_shape(&self, shape: &[usize]) -> Tensor {
        let mut data = self.data.clone();

        while data.ndim() > shape.len() {
            data = data.sum_axis(Axis(0));
        }

        for (axis, &len) in shape.iter().enumerate() {
            if len == 1 && data.shape()[axis] != 1 {
                data = data.sum_axis(Axis(axis)).insert_axis(Axis(axis));
            }
        }

        Tensor::new(data, self.dtype)
    }

    pub(crate) fn check_dtype(&self, other: &Tensor, op: &'static str) -> Result<()> {
        if self.dtype != other.dtype {
            return Err(AutodiffErr::DTypeMismatch {
                op,
                lhs: self.dtype,
                rhs: other.dtype,
            });
        }

        Ok(())
    }
}

impl From<f64> for Tensor {
    fn from(value: f64) -> Self {
        Self::scalar(value)
    }
}

/// Computes the shape two operands broadcast to, following NumPy's rules.
///
/// # Returns
/// The broadcast shape or `None` if the shapes are incompatible.
pub(crate) fn broadcast_shape(a: &[usize], b: &[usize]) -> Option<Vec<usize>> {
    let ndim = a.len().max(b.len());
    let mut shape = vec![0; ndim];

    for i in 0..ndim {
        let da = if i < ndim - a.len() { 1 } else { a[i - (ndim - a.len())] };
        let db = if i < ndim - b.len() { 1 } else { b[i - (ndim - b.len())] };

        shape[i] = match (da, db) {
            (x, y) if x == y => x,
            (1, y) => y,
            (x, 1) => x,
            _ => return None,
        };
    }

    Some(shape)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcasting_follows_numpy_rules() {
        assert_eq!(broadcast_shape(&[3, 1], &[4]), Some(vec![3, 4]));
        assert_eq!(broadcast_shape(&[], &[2, 2]), Some(vec![2, 2]));
        assert_eq!(broadcast_shape(&[2, 3], &[3, 2]), None);
    }

    #[test]
    fn f32_tensors_round_their_values() {
        let t = Tensor::scalar(0.1);
        assert_eq!(t.to_scalar().unwrap(), 0.1f32 as f64);

        let t = Tensor::scalar_of(0.1, DType::F64);
        assert_eq!(t.to_scalar().unwrap(), 0.1);
    }

    #[test]
    fn mixing_types_is_not_allowed() {
        let a = Tensor::scalar_of(1.0, DType::F32);
        let b = Tensor::scalar_of(1.0, DType::F64);

        assert!(matches!(a.add(&b), Err(AutodiffErr::DTypeMismatch { .. })));
        assert_eq!(a.cast(DType::F64).add(&b).unwrap().to_scalar().unwrap(), 2.0);
    }

    #[test]
    fn incompatible_shapes_fail() {
        let a = Tensor::zeros(&[2, 3], DType::F32);
        let b = Tensor::zeros(&[3, 2], DType::F32);

        assert!(matches!(a.mul(&b), Err(AutodiffErr::ShapeMismatch { op: "mul", .. })));
    }

    #[test]
    fn broadcast_gradients_are_summed_back() {
        let g = Tensor::ones(&[4, 3], DType::F32);

        assert_eq!(g.sum_to_shape(&[3]).to_vec(), vec![4.0; 3]);
        assert_eq!(g.sum_to_shape(&[4, 1]).to_vec(), vec![3.0; 4]);
        assert_eq!(g.sum_to_shape(&[]).to_vec(), vec![12.0]);
    }

    #[test]
    fn building_from_a_wrong_amount_of_values_fails() {
        let res = Tensor::from_vec(&[2, 2], vec![1.0, 2.0, 3.0]);
        assert_eq!(
            res,
            Err(AutodiffErr::InvalidShape {
                shape: vec![2, 2],
                len: 3
            })
        );
    }
}
