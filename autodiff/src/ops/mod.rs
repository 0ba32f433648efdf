//! The closed set of primitive operations a tape can record.
//!
//! Every `Op` tag knows how to compute its output from its inputs and how to turn the adjoint of
//! its output into the adjoints of its inputs.

mod elementwise;
mod linalg;
mod reduce;
mod select;

use std::{fmt, rc::Rc};

use ndarray::ArrayD;

use crate::{
    custom::CustomOp,
    error::{AutodiffErr, Result},
    param::ParamId,
    tensor::{DType, Tensor},
};

/// A primitive operation.
#[derive(Clone)]
pub enum Op {
    /// A leaf that never receives gradients.
    Constant,
    /// A leaf gradients flow into, bound to a parameter when there's one.
    Watched(Option<ParamId>),

    Neg,
    Exp,
    Log,
    Sqrt,
    Abs,
    Square,
    Powi(i32),
    Relu,
    Sigmoid,
    Tanh,
    Scale(f64),
    Shift(f64),
    MaxScalar(f64),
    Cast(DType),
    StopGradient,
    Reshape(Vec<usize>),
    Transpose,

    Sum,
    Mean,
    SumAxis(usize),
    MeanAxis(usize),

    Add,
    Sub,
    Mul,
    Div,
    Maximum,
    Minimum,
    MatMul,

    /// Takes the first input where the mask is set and the second one elsewhere.
    Select(Rc<ArrayD<bool>>),
    /// Row-wise log of the softmax of a 2-D input.
    LogSoftmax,
    /// Picks one column per row of a 2-D input.
    Pick(Rc<[usize]>),

    Custom(Rc<dyn CustomOp>),
}

impl Op {
    pub fn name(&self) -> &str {
        match self {
            Op::Constant => "constant",
            Op::Watched(_) => "watched",
            Op::Neg => "neg",
            Op::Exp => "exp",
            Op::Log => "log",
            Op::Sqrt => "sqrt",
            Op::Abs => "abs",
            Op::Square => "square",
            Op::Powi(_) => "powi",
            Op::Relu => "relu",
            Op::Sigmoid => "sigmoid",
            Op::Tanh => "tanh",
            Op::Scale(_) => "scale",
            Op::Shift(_) => "shift",
            Op::MaxScalar(_) => "max_scalar",
            Op::Cast(_) => "cast",
            Op::StopGradient => "stop_gradient",
            Op::Reshape(_) => "reshape",
            Op::Transpose => "transpose",
            Op::Sum => "sum",
            Op::Mean => "mean",
            Op::SumAxis(_) => "sum_axis",
            Op::MeanAxis(_) => "mean_axis",
            Op::Add => "add",
            Op::Sub => "sub",
            Op::Mul => "mul",
            Op::Div => "div",
            Op::Maximum => "maximum",
            Op::Minimum => "minimum",
            Op::MatMul => "matmul",
            Op::Select(_) => "select",
            Op::LogSoftmax => "log_softmax",
            Op::Pick(_) => "pick",
            Op::Custom(op) => op.name(),
        }
    }

    /// Whether gradients flowing into this operation stop here.
    pub fn stops_gradient(&self) -> bool {
        matches!(self, Op::Constant | Op::StopGradient)
    }

    /// Computes the output of this operation.
    ///
    /// # Arguments
    /// * `inputs` - The values of the operation's inputs, leaves take their value directly.
    ///
    /// # Returns
    /// The output or an error if the inputs are incompatible.
    pub(crate) fn forward(&self, inputs: &[&Tensor]) -> Result<Tensor> {
        use elementwise::unary;

        match self {
            Op::Constant | Op::Watched(_) | Op::StopGradient => Ok(inputs[0].clone()),
            Op::Neg => Ok(unary(inputs[0], |x| -x)),
            Op::Exp => Ok(unary(inputs[0], f64::exp)),
            Op::Log => Ok(unary(inputs[0], f64::ln)),
            Op::Sqrt => Ok(unary(inputs[0], f64::sqrt)),
            Op::Abs => Ok(unary(inputs[0], f64::abs)),
            Op::Square => Ok(unary(inputs[0], |x| x * x)),
            Op::Powi(n) => Ok(unary(inputs[0], |x| x.powi(*n))),
            Op::Relu => Ok(unary(inputs[0], |x| x.max(0.0))),
            Op::Sigmoid => Ok(unary(inputs[0], elementwise::sigmoid)),
            Op::Tanh => Ok(unary(inputs[0], f64::tanh)),
            Op::Scale(c) => Ok(unary(inputs[0], |x| x * c)),
            Op::Shift(c) => Ok(unary(inputs[0], |x| x + c)),
            Op::MaxScalar(c) => Ok(unary(inputs[0], |x| x.max(*c))),
            Op::Cast(dtype) => Ok(inputs[0].cast(*dtype)),
            Op::Reshape(shape) => linalg::reshape(inputs[0], shape),
            Op::Transpose => Ok(linalg::transpose(inputs[0])),
            Op::Sum => Ok(reduce::sum(inputs[0])),
            Op::Mean => Ok(reduce::mean(inputs[0])),
            Op::SumAxis(axis) => reduce::sum_axis(inputs[0], *axis, "sum_axis"),
            Op::MeanAxis(axis) => reduce::mean_axis(inputs[0], *axis),
            Op::Add => inputs[0].add(inputs[1]),
            Op::Sub => inputs[0].sub(inputs[1]),
            Op::Mul => inputs[0].mul(inputs[1]),
            Op::Div => inputs[0].div(inputs[1]),
            Op::Maximum => inputs[0].zip_with(inputs[1], "maximum", f64::max),
            Op::Minimum => inputs[0].zip_with(inputs[1], "minimum", f64::min),
            Op::MatMul => linalg::matmul(inputs[0], inputs[1]),
            Op::Select(mask) => select::select(mask, inputs[0], inputs[1]),
            Op::LogSoftmax => select::log_softmax(inputs[0]),
            Op::Pick(indices) => select::pick(inputs[0], indices),
            Op::Custom(op) => op.forward(inputs),
        }
    }

    /// Applies the chain rule locally.
    ///
    /// # Arguments
    /// * `inputs` - The values of the operation's inputs.
    /// * `output` - The value this operation produced.
    /// * `upstream` - The adjoint of `output`.
    ///
    /// # Returns
    /// One adjoint per input, `None` for inputs gradients don't flow into.
    pub(crate) fn backward(
        &self,
        inputs: &[&Tensor],
        output: &Tensor,
        upstream: &Tensor,
    ) -> Result<Vec<Option<Tensor>>> {
        use elementwise::{binary_grads, local};

        let g = upstream;
        let grads = match self {
            Op::Constant | Op::Watched(_) | Op::StopGradient => vec![None],
            Op::Neg => vec![Some(g.map(|x| -x))],
            Op::Exp => vec![Some(g.mul(output)?)],
            Op::Log => vec![Some(g.div(inputs[0])?)],
            Op::Sqrt => vec![Some(local(g, output, |g, y| g / (2.0 * y))?)],
            Op::Abs => vec![Some(local(g, inputs[0], |g, x| g * elementwise::sign(x))?)],
            Op::Square => vec![Some(local(g, inputs[0], |g, x| 2.0 * x * g)?)],
            Op::Powi(n) => {
                let n = *n;
                vec![Some(local(g, inputs[0], |g, x| {
                    n as f64 * x.powi(n - 1) * g
                })?)]
            }
            Op::Relu => vec![Some(local(g, inputs[0], |g, x| if x > 0.0 { g } else { 0.0 })?)],
            Op::Sigmoid => vec![Some(local(g, output, |g, y| g * y * (1.0 - y))?)],
            Op::Tanh => vec![Some(local(g, output, |g, y| g * (1.0 - y * y))?)],
            Op::Scale(c) => vec![Some(g.map(|x| x * c))],
            Op::Shift(_) => vec![Some(g.clone())],
            Op::MaxScalar(c) => {
                let c = *c;
                vec![Some(local(g, inputs[0], |g, x| if x > c { g } else { 0.0 })?)]
            }
            Op::Cast(_) => vec![Some(g.cast(inputs[0].dtype()))],
            Op::Reshape(_) => vec![Some(linalg::reshape(g, inputs[0].shape())?)],
            Op::Transpose => vec![Some(linalg::transpose(g))],
            Op::Sum => vec![Some(reduce::expand(g, inputs[0].shape(), 1.0)?)],
            Op::Mean => {
                let n = inputs[0].len().max(1) as f64;
                vec![Some(reduce::expand(g, inputs[0].shape(), 1.0 / n)?)]
            }
            Op::SumAxis(axis) => vec![Some(reduce::expand_axis(g, inputs[0].shape(), *axis, 1.0)?)],
            Op::MeanAxis(axis) => {
                let n = inputs[0].shape()[*axis].max(1) as f64;
                vec![Some(reduce::expand_axis(g, inputs[0].shape(), *axis, 1.0 / n)?)]
            }
            Op::Add => binary_grads(g, inputs, |g, _, _| g, |g, _, _| g)?,
            Op::Sub => binary_grads(g, inputs, |g, _, _| g, |g, _, _| -g)?,
            Op::Mul => binary_grads(g, inputs, |g, _, b| g * b, |g, a, _| g * a)?,
            Op::Div => binary_grads(g, inputs, |g, _, b| g / b, |g, a, b| -g * a / (b * b))?,
            Op::Maximum => binary_grads(
                g,
                inputs,
                |g, a, b| if a >= b { g } else { 0.0 },
                |g, a, b| if a >= b { 0.0 } else { g },
            )?,
            Op::Minimum => binary_grads(
                g,
                inputs,
                |g, a, b| if a <= b { g } else { 0.0 },
                |g, a, b| if a <= b { 0.0 } else { g },
            )?,
            Op::MatMul => {
                let (da, db) = linalg::matmul_grads(g, inputs[0], inputs[1])?;
                vec![Some(da), Some(db)]
            }
            Op::Select(mask) => {
                let (da, db) = select::select_grads(mask, g, inputs[0], inputs[1])?;
                vec![Some(da), Some(db)]
            }
            Op::LogSoftmax => vec![Some(select::log_softmax_grad(g, output)?)],
            Op::Pick(indices) => vec![Some(select::pick_grad(g, inputs[0], indices)?)],
            Op::Custom(op) => {
                let grads = op.backward(inputs, output, upstream)?;

                if grads.len() != inputs.len() {
                    return Err(AutodiffErr::CustomArity {
                        op: op.name().to_string(),
                        got: grads.len(),
                        expected: inputs.len(),
                    });
                }

                grads
                    .into_iter()
                    .zip(inputs)
                    .map(|(grad, input)| Some(grad.sum_to_shape(input.shape())))
                    .collect()
            }
        };

        Ok(grads)
    }
}

impl fmt::Debug for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Watched(Some(id)) => write!(f, "watched({id})"),
            Op::Powi(n) => write!(f, "powi({n})"),
            Op::Scale(c) => write!(f, "scale({c})"),
            Op::Shift(c) => write!(f, "shift({c})"),
            Op::MaxScalar(c) => write!(f, "max_scalar({c})"),
            Op::Cast(dtype) => write!(f, "cast({dtype})"),
            Op::Reshape(shape) => write!(f, "reshape({shape:?})"),
            Op::SumAxis(axis) => write!(f, "sum_axis({axis})"),
            Op::MeanAxis(axis) => write!(f, "mean_axis({axis})"),
            op => f.write_str(op.name()),
        }
    }
}
