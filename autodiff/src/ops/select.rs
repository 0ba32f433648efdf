use ndarray::{Array1, Array2, ArrayD, ArrayView2, Ix2, Zip};

use crate::{
    error::{AutodiffErr, Result},
    tensor::Tensor,
};

pub(super) fn select(mask: &ArrayD<bool>, a: &Tensor, b: &Tensor) -> Result<Tensor> {
    a.check_dtype(b, "select")?;
    check_mask(mask, a)?;
    check_mask(mask, b)?;

    let data = Zip::from(mask.view())
        .and(a.data().view())
        .and(b.data().view())
        .map_collect(|&m, &a, &b| if m { a } else { b });

    Ok(Tensor::new(data, a.dtype()))
}

pub(super) fn select_grads(
    mask: &ArrayD<bool>,
    g: &Tensor,
    a: &Tensor,
    b: &Tensor,
) -> Result<(Tensor, Tensor)> {
    check_mask(mask, g)?;

    let route = |take: bool| {
        let data = Zip::from(mask.view())
            .and(g.data().view())
            .map_collect(|&m, &g| if m == take { g } else { 0.0 });

        Tensor::new(data, g.dtype())
    };

    let (da, db) = (route(true), route(false));
    debug_assert_eq!(da.shape(), a.shape());
    debug_assert_eq!(db.shape(), b.shape());

    Ok((da, db))
}

/// Row-wise `x - logsumexp(x)`, shifting by the row maximum so large logits don't overflow.
pub(super) fn log_softmax(x: &Tensor) -> Result<Tensor> {
    let x2 = as_rows(x, "log_softmax")?;
    let mut out = Array2::zeros(x2.raw_dim());

    for (i, row) in x2.rows().into_iter().enumerate() {
        let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
        let lse = max + row.mapv(|v| (v - max).exp()).sum().ln();
        out.row_mut(i).assign(&row.mapv(|v| v - lse));
    }

    Ok(Tensor::new(out.into_dyn(), x.dtype()))
}

/// The adjoint of a log-softmax row is `g - softmax · Σg`.
pub(super) fn log_softmax_grad(g: &Tensor, output: &Tensor) -> Result<Tensor> {
    let g2 = as_rows(g, "log_softmax")?;
    let y2 = as_rows(output, "log_softmax")?;
    let mut dx = Array2::zeros(g2.raw_dim());

    for (i, (g_row, y_row)) in g2.rows().into_iter().zip(y2.rows()).enumerate() {
        let total = g_row.sum();
        let softmax = y_row.mapv(f64::exp);
        dx.row_mut(i).assign(&(&g_row - &(softmax * total)));
    }

    Ok(Tensor::new(dx.into_dyn(), g.dtype()))
}

/// Picks `x[i, indices[i]]` for every row `i`.
pub(super) fn pick(x: &Tensor, indices: &[usize]) -> Result<Tensor> {
    let x2 = as_rows(x, "pick")?;
    check_indices(&x2, indices)?;

    let picked = indices
        .iter()
        .enumerate()
        .map(|(i, &j)| x2[[i, j]])
        .collect::<Array1<_>>();

    Ok(Tensor::new(picked.into_dyn(), x.dtype()))
}

pub(super) fn pick_grad(g: &Tensor, x: &Tensor, indices: &[usize]) -> Result<Tensor> {
    let x2 = as_rows(x, "pick")?;
    let mut dx = Array2::zeros(x2.raw_dim());

    for (i, (&j, &gi)) in indices.iter().zip(g.data().iter()).enumerate() {
        dx[[i, j]] = gi;
    }

    Ok(Tensor::new(dx.into_dyn(), g.dtype()))
}

fn as_rows<'a>(x: &'a Tensor, op: &'static str) -> Result<ArrayView2<'a, f64>> {
    x.data()
        .view()
        .into_dimensionality::<Ix2>()
        .map_err(|_| AutodiffErr::InvalidAxis {
            op,
            axis: 1,
            ndim: x.ndim(),
        })
}

fn check_indices(x2: &ArrayView2<f64>, indices: &[usize]) -> Result<()> {
    if indices.len() != x2.nrows() {
        return Err(AutodiffErr::ShapeMismatch {
            op: "pick",
            lhs: x2.shape().to_vec(),
            rhs: vec![indices.len()],
        });
    }

    match indices.iter().find(|&&j| j >= x2.ncols()) {
        Some(&index) => Err(AutodiffErr::IndexOutOfBounds {
            op: "pick",
            index,
            len: x2.ncols(),
        }),
        None => Ok(()),
    }
}

fn check_mask(mask: &ArrayD<bool>, x: &Tensor) -> Result<()> {
    if mask.shape() != x.shape() {
        return Err(AutodiffErr::ShapeMismatch {
            op: "select",
            lhs: mask.shape().to_vec(),
            rhs: x.shape().to_vec(),
        });
    }

    Ok(())
}
