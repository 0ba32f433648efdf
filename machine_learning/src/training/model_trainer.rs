use std::collections::HashMap;

use autodiff::{DType, ParamId, Parameter, Tape, Tensor, Var};
use log::{debug, info, warn};
use ndarray::{Array2, Axis};
use rand::Rng;

use super::{EpochReport, EvalReport, History, Reporter, StepStatus, Trainer};
use crate::{
    arch::{Model, loss::LossFn},
    dataset::Dataset,
    error::{MlErr, Result},
    metrics::{Mean, Metric},
    optimization::{Optimizer, ParamPartition},
};

/// How long a training run lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub steps_per_epoch: usize,
}

/// A model `Trainer`. Contains the relevant components needed for training a model,
/// including the model itself.
pub struct ModelTrainer<M, L, R>
where
    M: Model,
    L: LossFn,
    R: Rng,
{
    model: M,
    loss_fn: L,
    optimizers: Vec<Box<dyn Optimizer>>,
    partition: ParamPartition,

    mean_loss: Mean,
    metrics: Vec<Box<dyn Metric>>,

    train: Dataset,
    validation: Option<Dataset>,
    dtype: DType,

    config: TrainingConfig,
    rng: R,
    history: History,
}

impl<M, L, R> ModelTrainer<M, L, R>
where
    M: Model,
    L: LossFn,
    R: Rng,
{
    /// Returns a new `ModelTrainer`.
    ///
    /// Trainable parameters no optimizer claims are frozen.
    ///
    /// # Arguments
    /// * `model` - The model that will be trained.
    /// * `loss_fn` - The loss function used to measure the difference between a model's output and the expected one.
    /// * `optimizers` - The optimizers, each with the names of the parameter groups it updates.
    /// * `train` - The dataset the model will be trained with.
    /// * `config` - The amount of epochs, steps and the batch size.
    /// * `rng` - A random number generator.
    ///
    /// # Returns
    /// The trainer or an error if the optimizers don't partition the parameters or the config is
    /// invalid.
    pub fn new<S>(
        mut model: M,
        loss_fn: L,
        optimizers: Vec<(Vec<S>, Box<dyn Optimizer>)>,
        train: Dataset,
        config: TrainingConfig,
        rng: R,
    ) -> Result<Self>
    where
        S: AsRef<str>,
    {
        if config.batch_size == 0 {
            return Err(MlErr::InvalidBatchSize);
        }

        if config.steps_per_epoch == 0 {
            return Err(MlErr::Spec("steps_per_epoch must be greater than zero".to_string()));
        }

        let (assignments, optimizers): (Vec<_>, Vec<_>) = optimizers.into_iter().unzip();

        let params = model.params();
        let dtype = params
            .first()
            .map_or(DType::F32, |p| p.value().dtype());
        let partition = ParamPartition::new(&params, &model.param_groups(), &assignments)?;

        for param in model.params_mut() {
            if partition.unclaimed().contains(&param.id()) {
                warn!(param = param.name(); "no optimizer updates this parameter, freezing it");
                param.set_trainable(false);
            }
        }

        for (optimizer, subset) in optimizers.iter().zip(partition.subsets()) {
            debug!(optimizer = optimizer.name(), params = subset.len(); "optimizer assigned");
        }

        Ok(Self {
            model,
            loss_fn,
            optimizers,
            partition,
            mean_loss: Mean::new(),
            metrics: Vec::new(),
            train,
            validation: None,
            dtype,
            config,
            rng,
            history: History::new(),
        })
    }

    /// Sets the held-out dataset evaluated at the end of every epoch.
    pub fn with_validation(mut self, validation: Dataset) -> Self {
        self.validation = Some(validation);
        self
    }

    /// Adds a streaming metric, tracked on training and validation.
    pub fn with_metric(mut self, metric: Box<dyn Metric>) -> Self {
        self.metrics.push(metric);
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn config(&self) -> TrainingConfig {
        self.config
    }

    /// Runs a single training step on a random batch.
    ///
    /// # Returns
    /// The loss of the batch, auxiliary losses included.
    pub fn step(&mut self) -> Result<f64> {
        let (x, y) = self.train.random_batch(self.config.batch_size, &mut self.rng)?;
        let (x, y) = (self.tensor(x), self.tensor(y));

        let tape = if self.partition.len() > 1 {
            Tape::persistent()
        } else {
            Tape::new()
        };

        let (loss, y_pred) = self.batch_loss(&tape, x, y.clone())?;
        let loss_value = loss.to_scalar()?;

        let grads = {
            let params: HashMap<ParamId, &Parameter> =
                self.model.params().into_iter().map(|p| (p.id(), p)).collect();

            let mut grads = Vec::with_capacity(self.partition.len());
            for subset in self.partition.subsets() {
                let sources: Vec<&Parameter> =
                    subset.iter().filter_map(|id| params.get(id).copied()).collect();

                grads.push(tape.gradient_for(&loss, &sources)?);
            }

            grads
        };

        if tape.is_persistent() {
            tape.dispose();
        }

        let mut params: HashMap<ParamId, &mut Parameter> = self
            .model
            .params_mut()
            .into_iter()
            .map(|p| (p.id(), p))
            .collect();

        let groups = self.optimizers.iter_mut().zip(self.partition.subsets());
        for ((optimizer, subset), grads) in groups.zip(grads) {
            for (id, grad) in subset.iter().zip(&grads) {
                if let Some(param) = params.get_mut(id) {
                    optimizer.apply(param, grad)?;
                }
            }

            optimizer.step_done();
        }

        for param in params.values_mut() {
            param.apply_constraint()?;
        }

        self.mean_loss.update(loss_value);
        for metric in &mut self.metrics {
            metric.update(&y, &y_pred)?;
        }

        Ok(loss_value)
    }

    /// Records the forward pass of a batch on `tape`.
    ///
    /// # Returns
    /// The mean loss plus every auxiliary loss of the model, and the predictions.
    fn batch_loss(&self, tape: &Tape, x: Tensor, y: Tensor) -> Result<(Var, Tensor)> {
        let x = tape.constant(x)?;
        let y_true = tape.constant(y)?;

        let y_pred = self.model.forward(tape, &x)?;
        let per_instance = self.loss_fn.per_instance(&y_true, &y_pred)?;

        let mut loss = per_instance.mean()?;
        for aux in self.model.losses(tape)? {
            loss = loss.add(&aux)?;
        }

        Ok((loss, y_pred.value()))
    }

    fn tensor(&self, data: Array2<f64>) -> Tensor {
        Tensor::new(data.into_dyn(), self.dtype)
    }

    fn results(&self) -> EvalReport {
        EvalReport {
            loss: self.mean_loss.result(),
            metrics: self
                .metrics
                .iter()
                .map(|m| (m.name().to_string(), m.result()))
                .collect(),
        }
    }

    fn reset_metrics(&mut self) {
        self.mean_loss.reset();
        for metric in &mut self.metrics {
            metric.reset();
        }
    }

    /// Evaluates `dataset` in batches on an inference tape, nothing is updated but the
    /// aggregators.
    fn validate(&mut self, dataset: &Dataset) -> Result<EvalReport> {
        self.reset_metrics();

        let batch_size = self.config.batch_size;
        let batches = dataset
            .x()
            .axis_chunks_iter(Axis(0), batch_size)
            .zip(dataset.y().axis_chunks_iter(Axis(0), batch_size));

        for (x, y) in batches {
            let tape = Tape::inference();
            let x = tape.constant(self.tensor(x.to_owned()))?;
            let y = self.tensor(y.to_owned());
            let y_true = tape.constant(y.clone())?;

            let y_pred = self.model.forward(&tape, &x)?;
            let per_instance = self.loss_fn.per_instance(&y_true, &y_pred)?;

            let mut aux = 0.;
            for loss in self.model.losses(&tape)? {
                aux += loss.to_scalar()?;
            }

            let losses = per_instance.value().to_vec();
            self.mean_loss.update_many(losses.into_iter().map(|l| l + aux));

            let y_pred = y_pred.value();
            for metric in &mut self.metrics {
                metric.update(&y, &y_pred)?;
            }
        }

        let report = self.results();
        self.reset_metrics();
        Ok(report)
    }
}

impl<M, L, R> Trainer for ModelTrainer<M, L, R>
where
    M: Model,
    L: LossFn,
    R: Rng,
{
    fn fit(&mut self, reporter: &mut dyn Reporter) -> Result<History> {
        let TrainingConfig {
            epochs,
            steps_per_epoch,
            batch_size,
        } = self.config;

        info!(
            epochs = epochs,
            steps = steps_per_epoch,
            batch_size = batch_size,
            params = self.model.size();
            "training {} with {} optimizer(s)", self.loss_fn.name(), self.optimizers.len()
        );

        let first = self.history.len() + 1;
        for epoch in first..first + epochs {
            self.reset_metrics();

            for step in 1..=steps_per_epoch {
                self.step()?;

                let results = self.results();
                reporter.on_step(&StepStatus {
                    epoch,
                    step,
                    steps_per_epoch,
                    loss: results.loss,
                    metrics: results.metrics,
                });
            }

            let train = self.results();
            let validation = match self.validation.take() {
                Some(dataset) => {
                    let report = self.validate(&dataset);
                    self.validation = Some(dataset);
                    Some(report?)
                }
                None => None,
            };

            self.reset_metrics();

            let report = EpochReport {
                epoch,
                train,
                validation,
            };

            reporter.on_epoch(&report);
            self.history.push(report);
        }

        Ok(self.history.clone())
    }

    fn evaluate(&mut self, dataset: &Dataset) -> Result<EvalReport> {
        self.validate(dataset)
    }

    fn history(&self) -> &History {
        &self.history
    }
}
