//! The gradient tape.
//!
//! A `Tape` is a Wengert list: every operation on a tracked value is appended in execution order,
//! so walking the list backward visits each node after all of its consumers.

mod var;

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use log::trace;

use crate::{
    error::{AutodiffErr, Result},
    ops::Op,
    param::{ParamId, Parameter},
    tensor::Tensor,
};

pub use var::Var;

pub(crate) type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Recording { persistent: bool },
    Inference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Open,
    Consumed,
    Disposed,
}

pub(crate) struct Node {
    op: Op,
    inputs: Vec<NodeId>,
    value: Tensor,
    tracked: bool,
}

pub(crate) struct TapeState {
    mode: Mode,
    status: Status,
    nodes: Vec<Node>,
    watched: HashMap<ParamId, NodeId>,
}

impl TapeState {
    fn new(mode: Mode) -> Self {
        Self {
            mode,
            status: Status::Open,
            nodes: Vec::new(),
            watched: HashMap::new(),
        }
    }

    fn is_recording(&self) -> bool {
        matches!(self.mode, Mode::Recording { .. })
    }

    fn check_open(&self) -> Result<()> {
        match self.status {
            Status::Open => Ok(()),
            Status::Consumed => Err(AutodiffErr::TapeConsumed),
            Status::Disposed => Err(AutodiffErr::TapeDisposed),
        }
    }

    fn push_leaf(&mut self, op: Op, value: Tensor) -> Result<NodeId> {
        self.check_open()?;

        let tracked = self.is_recording() && !op.stops_gradient();
        let id = self.nodes.len();
        self.nodes.push(Node {
            op,
            inputs: Vec::new(),
            value,
            tracked,
        });

        Ok(id)
    }

    /// Evaluates `op` over the given nodes and appends the result.
    pub(crate) fn record(&mut self, op: Op, inputs: &[NodeId]) -> Result<NodeId> {
        self.check_open()?;

        let values: Vec<&Tensor> = inputs.iter().map(|&i| &self.nodes[i].value).collect();
        let value = op.forward(&values)?;
        let tracked = self.is_recording()
            && !op.stops_gradient()
            && inputs.iter().any(|&i| self.nodes[i].tracked);

        let id = self.nodes.len();
        self.nodes.push(Node {
            op,
            inputs: inputs.to_vec(),
            value,
            tracked,
        });

        Ok(id)
    }

    pub(crate) fn value(&self, id: NodeId) -> &Tensor {
        &self.nodes[id].value
    }

    pub(crate) fn is_tracked(&self, id: NodeId) -> bool {
        self.nodes[id].tracked
    }

    /// Marks the start of a gradient query, consuming a non-persistent tape.
    fn begin_query(&mut self) -> Result<()> {
        let Mode::Recording { persistent } = self.mode else {
            return Err(AutodiffErr::NotRecording);
        };

        self.check_open()?;

        if !persistent {
            self.status = Status::Consumed;
        }

        Ok(())
    }

    /// Propagates adjoints from `target` back to every tracked node recorded before it.
    ///
    /// The adjoint of a non-scalar target starts as all ones, which yields the gradient of its sum.
    fn backprop(&self, target: NodeId) -> Result<Vec<Option<Tensor>>> {
        let mut adjoints: Vec<Option<Tensor>> = vec![None; target + 1];
        adjoints[target] = Some(self.nodes[target].value.ones_like());

        for id in (0..=target).rev() {
            let node = &self.nodes[id];

            if !node.tracked || node.inputs.is_empty() {
                continue;
            }

            let Some(upstream) = adjoints[id].clone() else {
                continue;
            };

            let inputs: Vec<&Tensor> = node.inputs.iter().map(|&i| &self.nodes[i].value).collect();
            let grads = node.op.backward(&inputs, &node.value, &upstream)?;

            for (&input, grad) in node.inputs.iter().zip(grads) {
                let Some(grad) = grad else {
                    continue;
                };

                if !self.nodes[input].tracked {
                    continue;
                }

                adjoints[input] = match adjoints[input].take() {
                    Some(acc) => Some(acc.add(&grad)?),
                    None => Some(grad),
                };
            }
        }

        Ok(adjoints)
    }
}

/// Records operations for reverse-mode differentiation.
///
/// A regular tape answers a single gradient query and is consumed afterward. A persistent tape
/// answers any number of queries until it's disposed. An inference tape only evaluates values.
pub struct Tape {
    state: Rc<RefCell<TapeState>>,
}

impl Tape {
    /// Creates a tape that can be queried once.
    pub fn new() -> Self {
        Self::with_mode(Mode::Recording { persistent: false })
    }

    /// Creates a tape that can be queried until it's disposed.
    pub fn persistent() -> Self {
        Self::with_mode(Mode::Recording { persistent: true })
    }

    /// Creates a tape that evaluates values without tracking anything.
    pub fn inference() -> Self {
        Self::with_mode(Mode::Inference)
    }

    fn with_mode(mode: Mode) -> Self {
        Self {
            state: Rc::new(RefCell::new(TapeState::new(mode))),
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.state.borrow().mode == Mode::Recording { persistent: true }
    }

    pub fn is_recording(&self) -> bool {
        self.state.borrow().is_recording()
    }

    /// Returns the amount of recorded nodes.
    pub fn len(&self) -> usize {
        self.state.borrow().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Starts tracking a parameter, reading its current value.
    ///
    /// Watching the same parameter again returns the node recorded the first time. Frozen
    /// parameters and parameters read by an inference tape are recorded as constants.
    ///
    /// # Arguments
    /// * `param` - The parameter to watch.
    ///
    /// # Returns
    /// The value of the parameter on this tape.
    pub fn watch(&self, param: &Parameter) -> Result<Var> {
        let mut state = self.state.borrow_mut();

        if let Some(&id) = state.watched.get(&param.id()) {
            return Ok(self.var(id));
        }

        if !param.is_trainable() || !state.is_recording() {
            let id = state.push_leaf(Op::Constant, param.value().clone())?;
            return Ok(self.var(id));
        }

        let id = state.push_leaf(Op::Watched(Some(param.id())), param.value().clone())?;
        state.watched.insert(param.id(), id);
        trace!(param = param.name(), node = id; "watching parameter");

        Ok(self.var(id))
    }

    /// Watches an arbitrary value that isn't bound to any parameter.
    pub fn variable(&self, value: Tensor) -> Result<Var> {
        let id = self.state.borrow_mut().push_leaf(Op::Watched(None), value)?;
        Ok(self.var(id))
    }

    /// Records a value gradients never flow into.
    pub fn constant(&self, value: Tensor) -> Result<Var> {
        let id = self.state.borrow_mut().push_leaf(Op::Constant, value)?;
        Ok(self.var(id))
    }

    pub fn scalar(&self, value: f64) -> Result<Var> {
        self.constant(Tensor::scalar(value))
    }

    pub fn is_watched(&self, param: &Parameter) -> bool {
        self.state.borrow().watched.contains_key(&param.id())
    }

    /// Computes the gradient of `target` with respect to each source.
    ///
    /// A tracked source with no path to `target` gets a gradient of zeros.
    ///
    /// # Arguments
    /// * `target` - The value to differentiate, non-scalar targets are summed.
    /// * `sources` - Values recorded by this tape.
    ///
    /// # Returns
    /// One gradient per source, with the source's shape.
    ///
    /// # Errors
    /// `TapeConsumed` if a non-persistent tape was already queried, `NotWatched` if a source is
    /// untracked, `ForeignVar` if a value comes from another tape.
    pub fn gradient(&self, target: &Var, sources: &[&Var]) -> Result<Vec<Tensor>> {
        self.check_owns(target)?;

        let mut state = self.state.borrow_mut();

        for source in sources {
            self.check_owns(source)?;

            if !state.is_tracked(source.id()) && state.is_recording() {
                return Err(AutodiffErr::NotWatched {
                    name: format!("node #{}", source.id()),
                });
            }
        }

        state.begin_query()?;
        let ids: Vec<NodeId> = sources.iter().map(|s| s.id()).collect();
        Self::collect(&state, target.id(), &ids)
    }

    /// Computes the gradient of `target` with respect to each parameter.
    ///
    /// # Errors
    /// `NotWatched` if a parameter was never watched by this tape, besides the errors of
    /// `gradient`.
    pub fn gradient_for(&self, target: &Var, params: &[&Parameter]) -> Result<Vec<Tensor>> {
        self.check_owns(target)?;

        let mut state = self.state.borrow_mut();
        let ids = params
            .iter()
            .map(|p| {
                state
                    .watched
                    .get(&p.id())
                    .copied()
                    .ok_or_else(|| AutodiffErr::NotWatched {
                        name: p.name().to_string(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        state.begin_query()?;
        Self::collect(&state, target.id(), &ids)
    }

    fn collect(state: &TapeState, target: NodeId, sources: &[NodeId]) -> Result<Vec<Tensor>> {
        trace!(nodes = state.nodes.len(), sources = sources.len(); "computing gradients");

        let adjoints = state.backprop(target)?;

        let grads = sources
            .iter()
            .map(|&id| {
                adjoints
                    .get(id)
                    .cloned()
                    .flatten()
                    .unwrap_or_else(|| state.value(id).zeros_like())
            })
            .collect();

        Ok(grads)
    }

    /// Releases the tape, values computed on it remain readable.
    pub fn dispose(self) {
        self.state.borrow_mut().status = Status::Disposed;
    }

    fn check_owns(&self, var: &Var) -> Result<()> {
        if !var.belongs_to(&self.state) {
            return Err(AutodiffErr::ForeignVar);
        }

        Ok(())
    }

    fn var(&self, id: NodeId) -> Var {
        Var::new(Rc::clone(&self.state), id)
    }
}

impl Default for Tape {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs `forward` once on a fresh tape that watches `watched` beforehand.
///
/// # Arguments
/// * `watched` - The parameters to track, their values are handed to `forward` in order.
/// * `persistent` - Whether the returned tape answers more than one gradient query.
/// * `forward` - The function to evaluate.
///
/// # Returns
/// The outputs of `forward` and the tape that recorded them.
pub fn evaluate_and_differentiate<F, O>(
    watched: &[&Parameter],
    persistent: bool,
    forward: F,
) -> Result<(O, Tape)>
where
    F: FnOnce(&Tape, &[Var]) -> Result<O>,
{
    let tape = if persistent {
        Tape::persistent()
    } else {
        Tape::new()
    };

    let vars = watched
        .iter()
        .map(|p| tape.watch(p))
        .collect::<Result<Vec<_>>>()?;

    let outputs = forward(&tape, &vars)?;
    Ok((outputs, tape))
}
