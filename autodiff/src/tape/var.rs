use std::{cell::RefCell, fmt, rc::Rc};

use ndarray::ArrayD;

use super::{NodeId, TapeState};
use crate::{
    custom::{CustomOp, StableSoftplus},
    error::{AutodiffErr, Result},
    ops::Op,
    tensor::{DType, Tensor},
};

/// A value recorded on a tape.
///
/// Operations on a `Var` evaluate eagerly and append themselves to the same tape. They fail
/// when the operands are incompatible or belong to different tapes.
#[derive(Clone)]
pub struct Var {
    state: Rc<RefCell<TapeState>>,
    id: NodeId,
}

impl Var {
    pub(super) fn new(state: Rc<RefCell<TapeState>>, id: NodeId) -> Self {
        Self { state, id }
    }

    pub(super) fn id(&self) -> NodeId {
        self.id
    }

    pub(super) fn belongs_to(&self, state: &Rc<RefCell<TapeState>>) -> bool {
        Rc::ptr_eq(&self.state, state)
    }

    pub fn value(&self) -> Tensor {
        self.state.borrow().value(self.id).clone()
    }

    pub fn shape(&self) -> Vec<usize> {
        self.state.borrow().value(self.id).shape().to_vec()
    }

    pub fn dtype(&self) -> DType {
        self.state.borrow().value(self.id).dtype()
    }

    /// Whether gradients can flow through this value.
    pub fn is_tracked(&self) -> bool {
        self.state.borrow().is_tracked(self.id)
    }

    /// Reads the value as a single number.
    pub fn to_scalar(&self) -> Result<f64> {
        self.state.borrow().value(self.id).to_scalar()
    }

    fn apply(&self, op: Op, others: &[&Var]) -> Result<Var> {
        if others.iter().any(|o| !o.belongs_to(&self.state)) {
            return Err(AutodiffErr::ForeignVar);
        }

        let inputs: Vec<NodeId> = std::iter::once(self.id)
            .chain(others.iter().map(|o| o.id))
            .collect();

        let id = self.state.borrow_mut().record(op, &inputs)?;
        Ok(Var::new(Rc::clone(&self.state), id))
    }

    pub fn neg(&self) -> Result<Var> {
        self.apply(Op::Neg, &[])
    }

    pub fn exp(&self) -> Result<Var> {
        self.apply(Op::Exp, &[])
    }

    pub fn log(&self) -> Result<Var> {
        self.apply(Op::Log, &[])
    }

    pub fn sqrt(&self) -> Result<Var> {
        self.apply(Op::Sqrt, &[])
    }

    pub fn abs(&self) -> Result<Var> {
        self.apply(Op::Abs, &[])
    }

    pub fn square(&self) -> Result<Var> {
        self.apply(Op::Square, &[])
    }

    pub fn powi(&self, n: i32) -> Result<Var> {
        self.apply(Op::Powi(n), &[])
    }

    pub fn relu(&self) -> Result<Var> {
        self.apply(Op::Relu, &[])
    }

    pub fn sigmoid(&self) -> Result<Var> {
        self.apply(Op::Sigmoid, &[])
    }

    pub fn tanh(&self) -> Result<Var> {
        self.apply(Op::Tanh, &[])
    }

    /// Numerically stable softplus, see [`StableSoftplus`].
    pub fn softplus(&self) -> Result<Var> {
        self.custom(Rc::new(StableSoftplus), &[])
    }

    /// Multiplies every value by `c`.
    pub fn scale(&self, c: f64) -> Result<Var> {
        self.apply(Op::Scale(c), &[])
    }

    /// Adds `c` to every value.
    pub fn shift(&self, c: f64) -> Result<Var> {
        self.apply(Op::Shift(c), &[])
    }

    /// Element-wise `max(x, c)`.
    pub fn max_scalar(&self, c: f64) -> Result<Var> {
        self.apply(Op::MaxScalar(c), &[])
    }

    pub fn cast(&self, dtype: DType) -> Result<Var> {
        self.apply(Op::Cast(dtype), &[])
    }

    /// Keeps the value but blocks every gradient flowing through it.
    pub fn stop_gradient(&self) -> Result<Var> {
        self.apply(Op::StopGradient, &[])
    }

    pub fn reshape(&self, shape: &[usize]) -> Result<Var> {
        self.apply(Op::Reshape(shape.to_vec()), &[])
    }

    pub fn transpose(&self) -> Result<Var> {
        self.apply(Op::Transpose, &[])
    }

    /// Sums every value into a rank 0 tensor.
    pub fn sum(&self) -> Result<Var> {
        self.apply(Op::Sum, &[])
    }

    /// Averages every value into a rank 0 tensor.
    pub fn mean(&self) -> Result<Var> {
        self.apply(Op::Mean, &[])
    }

    pub fn sum_axis(&self, axis: usize) -> Result<Var> {
        self.apply(Op::SumAxis(axis), &[])
    }

    pub fn mean_axis(&self, axis: usize) -> Result<Var> {
        self.apply(Op::MeanAxis(axis), &[])
    }

    pub fn add(&self, other: &Var) -> Result<Var> {
        self.apply(Op::Add, &[other])
    }

    pub fn sub(&self, other: &Var) -> Result<Var> {
        self.apply(Op::Sub, &[other])
    }

    pub fn mul(&self, other: &Var) -> Result<Var> {
        self.apply(Op::Mul, &[other])
    }

    pub fn div(&self, other: &Var) -> Result<Var> {
        self.apply(Op::Div, &[other])
    }

    pub fn maximum(&self, other: &Var) -> Result<Var> {
        self.apply(Op::Maximum, &[other])
    }

    pub fn minimum(&self, other: &Var) -> Result<Var> {
        self.apply(Op::Minimum, &[other])
    }

    pub fn matmul(&self, other: &Var) -> Result<Var> {
        self.apply(Op::MatMul, &[other])
    }

    /// Takes this value where `mask` is set and `other` elsewhere.
    pub fn select(&self, mask: ArrayD<bool>, other: &Var) -> Result<Var> {
        self.apply(Op::Select(Rc::new(mask)), &[other])
    }

    /// Row-wise log-softmax of a 2-D value.
    pub fn log_softmax(&self) -> Result<Var> {
        self.apply(Op::LogSoftmax, &[])
    }

    /// Picks column `indices[i]` of every row `i` of a 2-D value.
    pub fn pick(&self, indices: &[usize]) -> Result<Var> {
        self.apply(Op::Pick(Rc::from(indices)), &[])
    }

    /// Applies an operation with its own backward rule, this value being its first input.
    pub fn custom(&self, op: Rc<dyn CustomOp>, others: &[&Var]) -> Result<Var> {
        self.apply(Op::Custom(op), others)
    }

    /// Sums values of the same tape.
    pub fn add_n(vars: &[Var]) -> Result<Option<Var>> {
        let Some((first, rest)) = vars.split_first() else {
            return Ok(None);
        };

        rest.iter()
            .try_fold(first.clone(), |acc, v| acc.add(v))
            .map(Some)
    }
}

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Var")
            .field("node", &self.id)
            .field("value", state.value(self.id))
            .field("tracked", &state.is_tracked(self.id))
            .finish()
    }
}
