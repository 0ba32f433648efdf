use std::{
    error::Error,
    fmt::{self, Display},
};

use crate::tensor::DType;

/// The result type used in the entire autodiff crate.
pub type Result<T> = std::result::Result<T, AutodiffErr>;

/// The autodiff crate's error type.
#[derive(Debug, Clone, PartialEq)]
pub enum AutodiffErr {
    ShapeMismatch {
        op: &'static str,
        lhs: Vec<usize>,
        rhs: Vec<usize>,
    },
    DTypeMismatch {
        op: &'static str,
        lhs: DType,
        rhs: DType,
    },
    InvalidShape {
        shape: Vec<usize>,
        len: usize,
    },
    InvalidAxis {
        op: &'static str,
        axis: usize,
        ndim: usize,
    },
    IndexOutOfBounds {
        op: &'static str,
        index: usize,
        len: usize,
    },
    NonScalar {
        shape: Vec<usize>,
    },
    NotWatched {
        name: String,
    },
    ForeignVar,
    TapeConsumed,
    TapeDisposed,
    NotRecording,
    CustomArity {
        op: String,
        got: usize,
        expected: usize,
    },
}

impl Display for AutodiffErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AutodiffErr::ShapeMismatch { op, lhs, rhs } => {
                format!("Incompatible shapes for {op}: {lhs:?} and {rhs:?}")
            }
            AutodiffErr::DTypeMismatch { op, lhs, rhs } => format!(
                "Cannot compute {op} between {lhs} and {rhs}, cast one of the operands explicitly"
            ),
            AutodiffErr::InvalidShape { shape, len } => {
                format!("Cannot build a tensor of shape {shape:?} from {len} values")
            }
            AutodiffErr::InvalidAxis { op, axis, ndim } => {
                format!("Axis {axis} is out of range for {op} over a tensor of rank {ndim}")
            }
            AutodiffErr::IndexOutOfBounds { op, index, len } => {
                format!("Index {index} is out of bounds for {op} over {len} elements")
            }
            AutodiffErr::NonScalar { shape } => {
                format!("Expected a single value, got a tensor of shape {shape:?}")
            }
            AutodiffErr::NotWatched { name } => {
                format!("{name} was not watched by this tape, there's no gradient to compute")
            }
            AutodiffErr::ForeignVar => "The given value was recorded by another tape".to_string(),
            AutodiffErr::TapeConsumed => {
                "A non-persistent tape can only be used once to compute gradients".to_string()
            }
            AutodiffErr::TapeDisposed => "The tape was already disposed".to_string(),
            AutodiffErr::NotRecording => {
                "This tape does not record operations, gradients are unavailable".to_string()
            }
            AutodiffErr::CustomArity { op, got, expected } => format!(
                "The backward rule of {op} returned {got} gradients, expected {expected}"
            ),
        };

        write!(f, "{s}")
    }
}

impl Error for AutodiffErr {}
