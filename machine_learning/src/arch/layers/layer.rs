use autodiff::{Parameter, Tape, Var};

use super::Dense;
use crate::{arch::activations::ActFn, error::Result};

#[derive(Debug)]
pub enum Layer {
    Dense(Dense),
    Activation(ActFn),
}

impl Layer {
    pub fn forward(&self, tape: &Tape, x: &Var) -> Result<Var> {
        match self {
            Layer::Dense(l) => l.forward(tape, x),
            Layer::Activation(act_fn) => act_fn.apply(x),
        }
    }

    pub fn loss(&self, tape: &Tape) -> Result<Option<Var>> {
        match self {
            Layer::Dense(l) => l.loss(tape),
            Layer::Activation(_) => Ok(None),
        }
    }

    pub fn params(&self) -> Vec<&Parameter> {
        match self {
            Layer::Dense(l) => l.params().to_vec(),
            Layer::Activation(_) => Vec::new(),
        }
    }

    pub fn params_mut(&mut self) -> Vec<&mut Parameter> {
        match self {
            Layer::Dense(l) => l.params_mut().into_iter().collect(),
            Layer::Activation(_) => Vec::new(),
        }
    }

    pub fn size(&self) -> usize {
        match self {
            Layer::Dense(l) => l.size(),
            Layer::Activation(_) => 0,
        }
    }
}

impl From<Dense> for Layer {
    fn from(value: Dense) -> Self {
        Self::Dense(value)
    }
}

impl From<ActFn> for Layer {
    fn from(value: ActFn) -> Self {
        Self::Activation(value)
    }
}
