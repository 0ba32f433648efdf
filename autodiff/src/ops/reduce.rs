use ndarray::{ArrayD, Axis, IxDyn};

use crate::{
    error::{AutodiffErr, Result},
    tensor::Tensor,
};

pub(super) fn sum(x: &Tensor) -> Tensor {
    Tensor::new(ArrayD::from_elem(IxDyn(&[]), x.sum()), x.dtype())
}

pub(super) fn mean(x: &Tensor) -> Tensor {
    Tensor::new(ArrayD::from_elem(IxDyn(&[]), x.mean()), x.dtype())
}

pub(super) fn sum_axis(x: &Tensor, axis: usize, op: &'static str) -> Result<Tensor> {
    check_axis(x, axis, op)?;
    Ok(Tensor::new(x.data().sum_axis(Axis(axis)), x.dtype()))
}

pub(super) fn mean_axis(x: &Tensor, axis: usize) -> Result<Tensor> {
    let n = x.shape().get(axis).copied().unwrap_or(1).max(1) as f64;
    let summed = sum_axis(x, axis, "mean_axis")?;
    Ok(summed.map(|v| v / n))
}

/// Spreads a rank 0 adjoint over every element of `shape`, scaled by `factor`.
pub(super) fn expand(g: &Tensor, shape: &[usize], factor: f64) -> Result<Tensor> {
    let value = g.to_scalar()?;
    Ok(Tensor::full(shape, value * factor, g.dtype()))
}

/// Repeats the adjoint of an axis reduction along the reduced axis, scaled by `factor`.
pub(super) fn expand_axis(g: &Tensor, shape: &[usize], axis: usize, factor: f64) -> Result<Tensor> {
    let restored = g.data().clone().insert_axis(Axis(axis));
    let expanded = restored
        .broadcast(IxDyn(shape))
        .ok_or_else(|| AutodiffErr::ShapeMismatch {
            op: "backward",
            lhs: g.shape().to_vec(),
            rhs: shape.to_vec(),
        })?
        .mapv(|v| v * factor);

    Ok(Tensor::new(expanded, g.dtype()))
}

fn check_axis(x: &Tensor, axis: usize, op: &'static str) -> Result<()> {
    if axis >= x.ndim() {
        return Err(AutodiffErr::InvalidAxis {
            op,
            axis,
            ndim: x.ndim(),
        });
    }

    Ok(())
}
