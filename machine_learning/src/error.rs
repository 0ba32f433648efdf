use std::{
    error::Error,
    fmt::{self, Display},
};

use autodiff::AutodiffErr;
use rand_distr::{NormalError, uniform::Error as UniformError};

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    Autodiff(AutodiffErr),
    SizeMismatch {
        a: &'static str,
        b: &'static str,
        got: usize,
        expected: usize,
    },
    EmptyModel,
    ZeroSizedLayer {
        layer: usize,
    },
    EmptyDataset,
    InvalidSplit {
        fraction: f64,
    },
    InvalidBatchSize,
    InvalidLabel {
        label: f64,
        classes: usize,
    },
    NoOptimizers,
    OverlappingParamGroups {
        param: String,
        first: usize,
        second: usize,
    },
    UnknownParamGroup {
        name: String,
    },
    InvalidGroupRange {
        name: String,
        start: usize,
        end: usize,
        layers: usize,
    },
    Initialization(String),
    Spec(String),
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MlErr::Autodiff(e) => e.to_string(),
            MlErr::SizeMismatch {
                a,
                b,
                got,
                expected,
            } => {
                format!(
                    "There's a size mismatch between {a} and {b}, got {got} and expected {expected}"
                )
            }
            MlErr::EmptyModel => "The model has no layers".to_string(),
            MlErr::ZeroSizedLayer { layer } => {
                format!("Layer {layer} has zero units, every layer needs at least one")
            }
            MlErr::EmptyDataset => "The dataset has no samples".to_string(),
            MlErr::InvalidSplit { fraction } => {
                format!("Cannot split a dataset at {fraction}, both parts must be non-empty")
            }
            MlErr::InvalidBatchSize => "The batch size must be greater than zero".to_string(),
            MlErr::InvalidLabel { label, classes } => {
                format!("The label {label} is not a class index in 0..{classes}")
            }
            MlErr::NoOptimizers => "At least one optimizer must be configured".to_string(),
            MlErr::OverlappingParamGroups {
                param,
                first,
                second,
            } => format!(
                "The parameter {param} is claimed by both optimizer {first} and optimizer {second}"
            ),
            MlErr::UnknownParamGroup { name } => {
                format!("The model doesn't declare a parameter group named {name}")
            }
            MlErr::InvalidGroupRange {
                name,
                start,
                end,
                layers,
            } => format!(
                "The group {name} spans layers {start}..{end} but the model has {layers} layers"
            ),
            MlErr::Initialization(e) => format!("Failed to initialize the parameters: {e}"),
            MlErr::Spec(e) => format!("Invalid trainer specification: {e}"),
        };

        write!(f, "{s}")
    }
}

impl Error for MlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MlErr::Autodiff(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AutodiffErr> for MlErr {
    fn from(value: AutodiffErr) -> Self {
        Self::Autodiff(value)
    }
}

impl From<NormalError> for MlErr {
    fn from(value: NormalError) -> Self {
        Self::Initialization(value.to_string())
    }
}

impl From<UniformError> for MlErr {
    fn from(value: UniformError) -> Self {
        Self::Initialization(value.to_string())
    }
}

impl From<serde_json::Error> for MlErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Spec(value.to_string())
    }
}
