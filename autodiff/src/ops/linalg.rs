use ndarray::{ArrayD, ArrayView2, Ix2, IxDyn};

use crate::{
    error::{AutodiffErr, Result},
    tensor::Tensor,
};

pub(super) fn reshape(x: &Tensor, shape: &[usize]) -> Result<Tensor> {
    let data = ArrayD::from_shape_vec(IxDyn(shape), x.to_vec()).map_err(|_| {
        AutodiffErr::InvalidShape {
            shape: shape.to_vec(),
            len: x.len(),
        }
    })?;

    Ok(Tensor::new(data, x.dtype()))
}

pub(super) fn transpose(x: &Tensor) -> Tensor {
    Tensor::new(x.data().t().to_owned(), x.dtype())
}

pub(super) fn matmul(a: &Tensor, b: &Tensor) -> Result<Tensor> {
    a.check_dtype(b, "matmul")?;
    let (a2, b2) = (as_matrix(a, b)?, as_matrix(b, a)?);

    if a2.ncols() != b2.nrows() {
        return Err(mismatch(a, b));
    }

    Ok(Tensor::new(a2.dot(&b2).into_dyn(), a.dtype()))
}

/// The adjoints of `a · b` are `g · bᵀ` and `aᵀ · g`.
pub(super) fn matmul_grads(g: &Tensor, a: &Tensor, b: &Tensor) -> Result<(Tensor, Tensor)> {
    let g2 = as_matrix(g, a)?;
    let (a2, b2) = (as_matrix(a, b)?, as_matrix(b, a)?);

    let da = g2.dot(&b2.t()).into_dyn();
    let db = a2.t().dot(&g2).into_dyn();

    Ok((Tensor::new(da, g.dtype()), Tensor::new(db, g.dtype())))
}

fn as_matrix<'a>(x: &'a Tensor, other: &Tensor) -> Result<ArrayView2<'a, f64>> {
    x.data()
        .view()
        .into_dimensionality::<Ix2>()
        .map_err(|_| mismatch(x, other))
}

fn mismatch(a: &Tensor, b: &Tensor) -> AutodiffErr {
    AutodiffErr::ShapeMismatch {
        op: "matmul",
        lhs: a.shape().to_vec(),
        rhs: b.shape().to_vec(),
    }
}
