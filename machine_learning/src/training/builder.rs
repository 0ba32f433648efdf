use autodiff::{Clip, DType, MaxNorm, NonNeg};
use log::info;
use rand::{SeedableRng, rngs::StdRng};

use super::{ModelTrainer, Trainer, TrainingConfig};
use crate::{
    arch::{
        Model, Sequential,
        activations::ActFn,
        layers::{Dense, Layer},
        loss::{Huber, LossFn, Mae, Mse, SparseCategoricalCrossentropy},
        regularizers::Regularizer,
    },
    dataset::Dataset,
    error::{MlErr, Result},
    initialization::ParamGen,
    metrics::{HuberMetric, MeanAbsoluteError, Metric, SparseCategoricalAccuracy},
    optimization::{
        Adam, GradientDescent, GradientDescentWithMomentum, LearningRate, Nadam, Optimizer,
    },
    specs::{
        ActFnSpec, ConstraintSpec, DTypeSpec, DatasetSpec, LayerSpec, LearningRateSpec,
        LossFnSpec, MetricSpec, ModelSpec, OptimizerSpec, ParamGenSpec, RegularizerSpec,
        TrainerSpec,
    },
};

/// Builds `Trainer`s given a specification.
#[derive(Default)]
pub struct TrainerBuilder;

impl TrainerBuilder {
    /// Creates a new `TrainerBuilder`.
    pub fn new() -> Self {
        Self
    }

    /// Builds a new `Trainer` following a spec.
    ///
    /// # Arguments
    /// * `spec` - The specification for the trainer.
    ///
    /// # Returns
    /// The trainer or the first configuration error found, nothing is trained before every
    /// part of the spec is valid.
    pub fn build(&self, spec: &TrainerSpec) -> Result<Box<dyn Trainer>> {
        let mut rng = self.generate_rng(spec.seed);
        let dataset = self.resolve_dataset(&spec.dataset, &mut rng)?;
        self.resolve_model(spec, dataset, rng)
    }

    fn resolve_dataset(&self, spec: &DatasetSpec, rng: &mut StdRng) -> Result<Dataset> {
        match *spec {
            DatasetSpec::Inline {
                ref data,
                x_size,
                y_size,
            } => Dataset::from_flat(data.clone(), x_size, y_size),
            DatasetSpec::Synthetic {
                samples,
                features,
                noise,
            } => Dataset::synthetic_regression(samples, features, noise, rng),
        }
    }

    fn resolve_model(
        &self,
        spec: &TrainerSpec,
        dataset: Dataset,
        mut rng: StdRng,
    ) -> Result<Box<dyn Trainer>> {
        match &spec.model {
            ModelSpec::Sequential {
                layers: layer_specs,
                groups,
                dtype,
            } => {
                let y_size = match spec.loss {
                    LossFnSpec::SparseCategoricalCrossentropy { .. } => None,
                    _ => Some(dataset.y_size()),
                };
                self.check_dims(layer_specs, dataset.x_size(), y_size)?;

                let dtype = match dtype {
                    DTypeSpec::F32 => DType::F32,
                    DTypeSpec::F64 => DType::F64,
                };

                let layers = layer_specs
                    .iter()
                    .enumerate()
                    .map(|(i, ls)| self.resolve_layer(i, ls, dtype, &mut rng))
                    .collect::<Result<Vec<_>>>()?;

                let mut model = Sequential::new(layers)?;
                for group in groups {
                    let (start, end) = group.layers;
                    model = model.with_group(group.name.clone(), start..end)?;
                }

                self.resolve_loss(spec, model, dataset, rng)
            }
        }
    }

    /// Checks that every dense layer takes as many inputs as the previous one outputs, and that
    /// the model outputs `y_size` values when given.
    fn check_dims(&self, specs: &[LayerSpec], x_size: usize, y_size: Option<usize>) -> Result<()> {
        let mut inputs = x_size;

        for (layer, spec) in specs.iter().enumerate() {
            let LayerSpec::Dense { dim, .. } = spec else {
                continue;
            };

            if dim.0 == 0 || dim.1 == 0 {
                return Err(MlErr::ZeroSizedLayer { layer });
            }

            if dim.0 != inputs {
                return Err(MlErr::SizeMismatch {
                    a: "layer inputs",
                    b: "previous outputs",
                    got: dim.0,
                    expected: inputs,
                });
            }

            inputs = dim.1;
        }

        match y_size {
            Some(expected) if inputs != expected => Err(MlErr::SizeMismatch {
                a: "model outputs",
                b: "targets",
                got: inputs,
                expected,
            }),
            _ => Ok(()),
        }
    }

    fn resolve_layer(
        &self,
        index: usize,
        spec: &LayerSpec,
        dtype: DType,
        rng: &mut StdRng,
    ) -> Result<Layer> {
        match spec {
            LayerSpec::Dense {
                dim,
                act_fn,
                name,
                init,
                regularizer,
                constraint,
            } => {
                let name = name.clone().unwrap_or_else(|| format!("dense_{index}"));
                let act_fn = act_fn.map(|spec| self.resolve_act_fn(spec));
                let init = self.resolve_param_gen(*init);

                let mut dense = Dense::init(&name, *dim, act_fn, init, dtype, rng)?;

                if let Some(spec) = regularizer {
                    dense = dense.with_regularizer(self.resolve_regularizer(*spec));
                }

                if let Some(spec) = constraint {
                    dense = match *spec {
                        ConstraintSpec::NonNeg => dense.with_kernel_constraint(NonNeg),
                        ConstraintSpec::Clip { min, max } => {
                            if min.is_nan() || max.is_nan() || min > max {
                                return Err(MlErr::Spec(format!(
                                    "layer {name} clips to [{min}, {max}], min must not exceed max"
                                )));
                            }
                            dense.with_kernel_constraint(Clip::new(min, max))
                        }
                        ConstraintSpec::MaxNorm { max } => {
                            if max.is_nan() || max < 0. {
                                return Err(MlErr::Spec(format!(
                                    "layer {name} has a max norm of {max}, it must be non-negative"
                                )));
                            }
                            dense.with_kernel_constraint(MaxNorm::new(max))
                        }
                    };
                }

                Ok(dense.into())
            }
            LayerSpec::Activation { act_fn } => Ok(self.resolve_act_fn(*act_fn).into()),
        }
    }

    fn resolve_act_fn(&self, spec: ActFnSpec) -> ActFn {
        match spec {
            ActFnSpec::Relu => ActFn::Relu,
            ActFnSpec::Sigmoid => ActFn::Sigmoid,
            ActFnSpec::Tanh => ActFn::Tanh,
            ActFnSpec::Softplus => ActFn::Softplus,
        }
    }

    fn resolve_regularizer(&self, spec: RegularizerSpec) -> Regularizer {
        match spec {
            RegularizerSpec::L1 { factor } => Regularizer::L1(factor),
            RegularizerSpec::L2 { factor } => Regularizer::L2(factor),
            RegularizerSpec::L1L2 { l1, l2 } => Regularizer::L1L2 { l1, l2 },
        }
    }

    fn resolve_param_gen(&self, spec: ParamGenSpec) -> ParamGen {
        match spec {
            ParamGenSpec::Zeros => ParamGen::Zeros,
            ParamGenSpec::Const { value } => ParamGen::Const { value },
            ParamGenSpec::Uniform { low, high } => ParamGen::Uniform { low, high },
            ParamGenSpec::Normal { mean, std_dev } => ParamGen::Normal { mean, std_dev },
            ParamGenSpec::XavierUniform => ParamGen::XavierUniform,
            ParamGenSpec::HeNormal => ParamGen::HeNormal,
            ParamGenSpec::LecunNormal => ParamGen::LecunNormal,
        }
    }

    fn resolve_loss<M>(
        &self,
        spec: &TrainerSpec,
        model: M,
        dataset: Dataset,
        rng: StdRng,
    ) -> Result<Box<dyn Trainer>>
    where
        M: Model + 'static,
    {
        match spec.loss {
            LossFnSpec::Mse => self.terminate_build(spec, model, Mse::new(), dataset, rng),
            LossFnSpec::Mae => self.terminate_build(spec, model, Mae::new(), dataset, rng),
            LossFnSpec::Huber { threshold } => {
                self.terminate_build(spec, model, Huber::new(threshold), dataset, rng)
            }
            LossFnSpec::SparseCategoricalCrossentropy { from_logits } => {
                let loss = SparseCategoricalCrossentropy::new(from_logits);
                self.terminate_build(spec, model, loss, dataset, rng)
            }
        }
    }

    fn resolve_optimizer(&self, spec: OptimizerSpec) -> Box<dyn Optimizer> {
        match spec {
            OptimizerSpec::Adam {
                learning_rate,
                beta1,
                beta2,
                epsilon,
            } => {
                let learning_rate = self.resolve_learning_rate(learning_rate);
                Box::new(Adam::new(learning_rate, beta1, beta2, epsilon))
            }
            OptimizerSpec::Nadam {
                learning_rate,
                beta1,
                beta2,
                epsilon,
            } => {
                let learning_rate = self.resolve_learning_rate(learning_rate);
                Box::new(Nadam::new(learning_rate, beta1, beta2, epsilon))
            }
            OptimizerSpec::GradientDescent { learning_rate } => {
                Box::new(GradientDescent::new(self.resolve_learning_rate(learning_rate)))
            }
            OptimizerSpec::GradientDescentWithMomentum {
                learning_rate,
                momentum,
            } => {
                let learning_rate = self.resolve_learning_rate(learning_rate);
                Box::new(GradientDescentWithMomentum::new(learning_rate, momentum))
            }
        }
    }

    fn resolve_learning_rate(&self, spec: LearningRateSpec) -> LearningRate {
        match spec {
            LearningRateSpec::Constant(lr) => LearningRate::Constant(lr),
            LearningRateSpec::ExponentialDecay {
                initial,
                decay_steps,
                decay_rate,
            } => LearningRate::ExponentialDecay {
                initial,
                decay_steps,
                decay_rate,
            },
        }
    }

    fn resolve_metric(&self, spec: MetricSpec) -> Box<dyn Metric> {
        match spec {
            MetricSpec::MeanAbsoluteError => Box::new(MeanAbsoluteError::new()),
            MetricSpec::Huber { threshold } => Box::new(HuberMetric::new(threshold)),
            MetricSpec::SparseCategoricalAccuracy => Box::new(SparseCategoricalAccuracy::new()),
        }
    }

    fn terminate_build<M, L>(
        &self,
        spec: &TrainerSpec,
        model: M,
        loss: L,
        dataset: Dataset,
        rng: StdRng,
    ) -> Result<Box<dyn Trainer>>
    where
        M: Model + 'static,
        L: LossFn + 'static,
    {
        let (train, validation) = match spec.validation_split {
            Some(fraction) => {
                let (train, validation) = dataset.split(fraction)?;
                (train, Some(validation))
            }
            None => (dataset, None),
        };

        if spec.batch_size == 0 {
            return Err(MlErr::InvalidBatchSize);
        }

        let steps_per_epoch = spec
            .steps_per_epoch
            .unwrap_or_else(|| train.len().div_ceil(spec.batch_size));

        let config = TrainingConfig {
            epochs: spec.epochs,
            batch_size: spec.batch_size,
            steps_per_epoch,
        };

        let optimizers = spec
            .optimizers
            .iter()
            .map(|a| (a.groups.clone(), self.resolve_optimizer(a.optimizer)))
            .collect();

        info!(
            samples = train.len(),
            params = model.size();
            "built a trainer with {} loss", loss.name()
        );

        let mut trainer = ModelTrainer::new(model, loss, optimizers, train, config, rng)?;

        if let Some(validation) = validation {
            trainer = trainer.with_validation(validation);
        }

        for metric in &spec.metrics {
            trainer = trainer.with_metric(self.resolve_metric(*metric));
        }

        Ok(Box::new(trainer))
    }

    fn generate_rng(&self, seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}
