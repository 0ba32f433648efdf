use autodiff::{ParamId, Parameter, Tape, Var};

use crate::error::Result;

/// A named subset of a model's parameters, optimizers are assigned to groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamGroup {
    pub name: String,
    pub ids: Vec<ParamId>,
}

impl ParamGroup {
    /// The name of the group every model declares, holding all of its parameters.
    pub const ALL: &'static str = "all";

    pub fn new(name: impl Into<String>, ids: Vec<ParamId>) -> Self {
        Self {
            name: name.into(),
            ids,
        }
    }
}

/// The model collaborator of the training loop.
///
/// A model owns its parameters. The trainer borrows them to watch them on a tape and to
/// update them after every step.
pub trait Model {
    /// Makes a forward pass, watching every parameter it reads on `tape`.
    ///
    /// # Arguments
    /// * `tape` - The tape recording the pass.
    /// * `x` - A batch of inputs, one row per example.
    ///
    /// # Returns
    /// The predictions, one row per example.
    fn forward(&self, tape: &Tape, x: &Var) -> Result<Var>;

    fn params(&self) -> Vec<&Parameter>;

    fn params_mut(&mut self) -> Vec<&mut Parameter>;

    /// Returns the auxiliary losses of the model, such as regularization penalties.
    ///
    /// # Arguments
    /// * `tape` - The tape the forward pass was recorded on.
    ///
    /// # Returns
    /// One rank 0 value per auxiliary loss, summed into the loss by the trainer.
    fn losses(&self, _tape: &Tape) -> Result<Vec<Var>> {
        Ok(Vec::new())
    }

    /// Returns the named parameter subsets of the model, including the `all` group.
    fn param_groups(&self) -> Vec<ParamGroup> {
        let ids = self.params().iter().map(|p| p.id()).collect();
        vec![ParamGroup::new(ParamGroup::ALL, ids)]
    }

    /// Returns the amount of scalar parameters in the model.
    fn size(&self) -> usize {
        self.params().iter().map(|p| p.len()).sum()
    }
}
