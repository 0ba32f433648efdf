//! Model training on top of `autodiff`: layers, losses, optimizers, streaming metrics and the
//! training loop driving them.

pub mod arch;
pub mod dataset;
pub mod error;
pub mod initialization;
pub mod metrics;
pub mod optimization;
pub mod specs;
pub mod training;

pub use error::{MlErr, Result};
