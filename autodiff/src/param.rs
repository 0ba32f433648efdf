use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::{
    constraint::Constraint,
    error::{AutodiffErr, Result},
    tensor::Tensor,
};

static NEXT_PARAM_ID: AtomicU64 = AtomicU64::new(0);

/// The identity of a `Parameter`, unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamId(u64);

impl ParamId {
    fn next() -> Self {
        Self(NEXT_PARAM_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A named, mutable tensor owned by a model.
///
/// An optional constraint projects the value back into its feasible set after every update.
pub struct Parameter {
    id: ParamId,
    name: String,
    value: Tensor,
    constraint: Option<Box<dyn Constraint>>,
    trainable: bool,
}

impl Parameter {
    /// Creates a new trainable `Parameter` without a constraint.
    ///
    /// # Arguments
    /// * `name` - A human readable name, used in logs and errors.
    /// * `value` - The initial value.
    ///
    /// # Returns
    /// A new `Parameter` instance with a fresh identity.
    pub fn new(name: impl Into<String>, value: Tensor) -> Self {
        Self {
            id: ParamId::next(),
            name: name.into(),
            value,
            constraint: None,
            trainable: true,
        }
    }

    pub fn with_constraint<C>(mut self, constraint: C) -> Self
    where
        C: Constraint + 'static,
    {
        self.constraint = Some(Box::new(constraint));
        self
    }

    pub fn frozen(mut self) -> Self {
        self.trainable = false;
        self
    }

    /// Freezes or unfreezes this parameter, frozen parameters are read as constants by a tape.
    pub fn set_trainable(&mut self, trainable: bool) {
        self.trainable = trainable;
    }

    pub fn id(&self) -> ParamId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Tensor {
        &self.value
    }

    pub fn shape(&self) -> &[usize] {
        self.value.shape()
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn is_trainable(&self) -> bool {
        self.trainable
    }

    pub fn has_constraint(&self) -> bool {
        self.constraint.is_some()
    }

    /// Replaces the value of this parameter.
    ///
    /// # Arguments
    /// * `value` - The new value, it must keep the shape and type of the current one.
    ///
    /// # Returns
    /// An error if the shape or type differ.
    pub fn assign(&mut self, value: Tensor) -> Result<()> {
        if value.shape() != self.value.shape() {
            return Err(AutodiffErr::ShapeMismatch {
                op: "assign",
                lhs: self.value.shape().to_vec(),
                rhs: value.shape().to_vec(),
            });
        }

        self.value.check_dtype(&value, "assign")?;
        self.value = value;
        Ok(())
    }

    /// Adds `delta` to the current value.
    pub fn assign_add(&mut self, delta: &Tensor) -> Result<()> {
        let value = self.value.add(delta)?;
        self.assign(value)
    }

    /// Subtracts `delta` from the current value.
    pub fn assign_sub(&mut self, delta: &Tensor) -> Result<()> {
        let value = self.value.sub(delta)?;
        self.assign(value)
    }

    /// Replaces the value with its projection through the constraint, if there's one.
    ///
    /// # Returns
    /// An error if the constraint changed the shape or type of the value.
    pub fn apply_constraint(&mut self) -> Result<()> {
        let Some(constraint) = &self.constraint else {
            return Ok(());
        };

        let projected = constraint.project(&self.value);
        self.assign(projected)
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("shape", &self.value.shape())
            .field("dtype", &self.value.dtype())
            .field("constrained", &self.constraint.is_some())
            .field("trainable", &self.trainable)
            .finish()
    }
}
