use ndarray::{IxDyn, Zip};

use crate::{
    error::{AutodiffErr, Result},
    tensor::Tensor,
};

pub(super) fn unary<F>(x: &Tensor, f: F) -> Tensor
where
    F: Fn(f64) -> f64,
{
    x.map(f)
}

#[inline]
pub(super) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[inline]
pub(super) fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Computes the adjoint of a unary operation from the upstream adjoint and one saved value,
/// either the input or the output depending on the rule.
pub(super) fn local<F>(upstream: &Tensor, saved: &Tensor, f: F) -> Result<Tensor>
where
    F: Fn(f64, f64) -> f64,
{
    upstream.zip_with(saved, "backward", f)
}

/// Computes the adjoints of a broadcasting binary operation.
///
/// Each rule receives the upstream adjoint and both operands, the results are summed back to
/// the shape of the operand they belong to.
pub(super) fn binary_grads<Fa, Fb>(
    upstream: &Tensor,
    inputs: &[&Tensor],
    da: Fa,
    db: Fb,
) -> Result<Vec<Option<Tensor>>>
where
    Fa: Fn(f64, f64, f64) -> f64,
    Fb: Fn(f64, f64, f64) -> f64,
{
    let (a, b) = (inputs[0], inputs[1]);
    let shape = IxDyn(upstream.shape());
    let mismatch = || AutodiffErr::ShapeMismatch {
        op: "backward",
        lhs: a.shape().to_vec(),
        rhs: b.shape().to_vec(),
    };

    let g = upstream.data().view();
    let a_full = a.data().broadcast(shape.clone()).ok_or_else(mismatch)?;
    let b_full = b.data().broadcast(shape).ok_or_else(mismatch)?;

    let ga = Zip::from(g.clone())
        .and(a_full.clone())
        .and(b_full.clone())
        .map_collect(|&g, &a, &b| da(g, a, b));

    let gb = Zip::from(g)
        .and(a_full)
        .and(b_full)
        .map_collect(|&g, &a, &b| db(g, a, b));

    let dtype = upstream.dtype();

    Ok(vec![
        Some(Tensor::new(ga, dtype).sum_to_shape(a.shape())),
        Some(Tensor::new(gb, dtype).sum_to_shape(b.shape())),
    ])
}
