use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::{arch::ParamGroup, error::Result};

/// The specification for the `DType` of a model's parameters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DTypeSpec {
    #[default]
    F32,
    F64,
}

/// The specification for the `ActFn` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActFnSpec {
    Relu,
    Sigmoid,
    Tanh,
    Softplus,
}

/// The specification for the `Regularizer` enum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegularizerSpec {
    L1 { factor: f64 },
    L2 { factor: f64 },
    L1L2 { l1: f64, l2: f64 },
}

/// The specification for a parameter's `Constraint`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintSpec {
    NonNeg,
    Clip { min: f64, max: f64 },
    MaxNorm { max: f64 },
}

/// The specification for the `ParamGen` enum.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamGenSpec {
    Zeros,
    Const {
        value: f64,
    },
    Uniform {
        low: f64,
        high: f64,
    },
    Normal {
        mean: f64,
        std_dev: f64,
    },
    #[default]
    XavierUniform,
    HeNormal,
    LecunNormal,
}

/// The specification for the `Layer` enum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerSpec {
    Dense {
        dim: (usize, usize),
        act_fn: Option<ActFnSpec>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        init: ParamGenSpec,
        #[serde(default)]
        regularizer: Option<RegularizerSpec>,
        #[serde(default)]
        constraint: Option<ConstraintSpec>,
    },
    Activation {
        act_fn: ActFnSpec,
    },
}

/// A named range of layers, optimized together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSpec {
    pub name: String,
    pub layers: (usize, usize),
}

/// The specification for the `Model` trait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSpec {
    Sequential {
        layers: Vec<LayerSpec>,
        #[serde(default)]
        groups: Vec<GroupSpec>,
        #[serde(default)]
        dtype: DTypeSpec,
    },
}

/// The specification for the `LearningRate` enum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningRateSpec {
    Constant(f64),
    ExponentialDecay {
        initial: f64,
        decay_steps: u64,
        decay_rate: f64,
    },
}

/// The specification for the `Optimizer` trait.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerSpec {
    Adam {
        learning_rate: LearningRateSpec,
        beta1: f64,
        beta2: f64,
        epsilon: f64,
    },
    Nadam {
        learning_rate: LearningRateSpec,
        beta1: f64,
        beta2: f64,
        epsilon: f64,
    },
    GradientDescent {
        learning_rate: LearningRateSpec,
    },
    GradientDescentWithMomentum {
        learning_rate: LearningRateSpec,
        momentum: f64,
    },
}

/// An optimizer together with the parameter groups it updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerAssignmentSpec {
    #[serde(default = "all_groups")]
    pub groups: Vec<String>,
    pub optimizer: OptimizerSpec,
}

fn all_groups() -> Vec<String> {
    vec![ParamGroup::ALL.to_string()]
}

/// The specification for the `LossFn` trait.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossFnSpec {
    Mse,
    Mae,
    Huber { threshold: f64 },
    SparseCategoricalCrossentropy { from_logits: bool },
}

/// The specification for the `Metric` trait.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricSpec {
    MeanAbsoluteError,
    Huber { threshold: f64 },
    SparseCategoricalAccuracy,
}

/// The specification for the `Dataset`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetSpec {
    Inline {
        data: Vec<f64>,
        x_size: usize,
        y_size: usize,
    },
    Synthetic {
        samples: usize,
        features: usize,
        noise: f64,
    },
}

/// The specification for the `Trainer` struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerSpec {
    pub model: ModelSpec,
    pub optimizers: Vec<OptimizerAssignmentSpec>,
    pub loss: LossFnSpec,
    #[serde(default)]
    pub metrics: Vec<MetricSpec>,
    pub dataset: DatasetSpec,
    pub epochs: usize,
    pub batch_size: usize,
    #[serde(default)]
    pub steps_per_epoch: Option<usize>,
    #[serde(default)]
    pub validation_split: Option<f64>,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl TrainerSpec {
    /// Parses a `TrainerSpec` from a json string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parses a `TrainerSpec` from a json reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }
}
