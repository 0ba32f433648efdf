pub mod activations;
pub mod layers;
pub mod loss;
mod model;
pub mod regularizers;
mod sequential;

pub use model::{Model, ParamGroup};
pub use sequential::Sequential;
