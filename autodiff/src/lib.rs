//! Reverse-mode automatic differentiation over `ndarray` tensors.
//!
//! Values are computed eagerly. Every operation on a watched value is
//! appended to a [`Tape`], which can later replay the chain rule backward
//! from a target to any watched source.

pub mod constraint;
pub mod custom;
pub mod error;
pub mod ops;
pub mod param;
pub mod tape;
pub mod tensor;

pub use constraint::{Clip, Constraint, MaxNorm, NonNeg};
pub use custom::{CustomOp, StableSoftplus};
pub use error::{AutodiffErr, Result};
pub use ops::Op;
pub use param::{ParamId, Parameter};
pub use tape::{Tape, Var, evaluate_and_differentiate};
pub use tensor::{DType, Tensor};
