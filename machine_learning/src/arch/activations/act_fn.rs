use autodiff::Var;

use crate::error::Result;

/// An element-wise activation function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActFn {
    Relu,
    Sigmoid,
    Tanh,
    /// Computed with a custom backward rule, see `autodiff::StableSoftplus`.
    Softplus,
}
use ActFn::*;

impl ActFn {
    /// Applies this activation function to every value of `z`.
    pub fn apply(&self, z: &Var) -> Result<Var> {
        let a = match self {
            Relu => z.relu()?,
            Sigmoid => z.sigmoid()?,
            Tanh => z.tanh()?,
            Softplus => z.softplus()?,
        };

        Ok(a)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Relu => "relu",
            Sigmoid => "sigmoid",
            Tanh => "tanh",
            Softplus => "softplus",
        }
    }
}
