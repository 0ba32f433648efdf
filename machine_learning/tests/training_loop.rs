use autodiff::{DType, NonNeg, Parameter, Tensor};
use machine_learning::{
    MlErr,
    arch::{
        Model, Sequential,
        activations::ActFn,
        layers::Dense,
        loss::Huber,
    },
    dataset::Dataset,
    initialization::ParamGen,
    metrics::{HuberMetric, Mean, Metric},
    optimization::{GradientDescent, Nadam, Optimizer},
    specs::TrainerSpec,
    training::{ModelTrainer, NullReporter, TrainerBuilder, TrainingConfig},
};
use rand::{SeedableRng, rngs::StdRng};

fn model(seed: u64) -> Sequential {
    let mut rng = StdRng::seed_from_u64(seed);
    let init = ParamGen::XavierUniform;

    let lower = Dense::init("lower", (3, 4), Some(ActFn::Tanh), init, DType::F64, &mut rng).unwrap();
    let upper = Dense::init("upper", (4, 1), None, init, DType::F64, &mut rng).unwrap();

    Sequential::new([lower.into(), upper.into()])
        .unwrap()
        .with_group("lower", 0..1)
        .unwrap()
        .with_group("upper", 1..2)
        .unwrap()
}

fn values(model: &Sequential) -> Vec<Vec<f64>> {
    model.params().iter().map(|p| p.value().to_vec()).collect()
}

fn dataset() -> Dataset {
    Dataset::synthetic_regression(64, 3, 0.1, &mut StdRng::seed_from_u64(3)).unwrap()
}

fn config() -> TrainingConfig {
    TrainingConfig {
        epochs: 1,
        batch_size: 8,
        steps_per_epoch: 1,
    }
}

#[test]
fn partitioned_optimizers_do_not_interfere() {
    let initial = values(&model(1));

    let both: Vec<(Vec<&str>, Box<dyn Optimizer>)> = vec![
        (vec!["lower"], Box::new(GradientDescent::new(0.1))),
        (vec!["upper"], Box::new(Nadam::new(0.01, 0.9, 0.999, 1e-7))),
    ];
    let mut with_both = ModelTrainer::new(
        model(1),
        Huber::default(),
        both,
        dataset(),
        config(),
        StdRng::seed_from_u64(9),
    )
    .unwrap();

    let lower_only: Vec<(Vec<&str>, Box<dyn Optimizer>)> =
        vec![(vec!["lower"], Box::new(GradientDescent::new(0.1)))];
    let mut with_lower_only = ModelTrainer::new(
        model(1),
        Huber::default(),
        lower_only,
        dataset(),
        config(),
        StdRng::seed_from_u64(9),
    )
    .unwrap();

    with_both.step().unwrap();
    with_lower_only.step().unwrap();

    let both = values(with_both.model());
    let lower_only = values(with_lower_only.model());

    // The lower layer (kernel, bias) got the same update in both runs.
    assert_eq!(both[..2], lower_only[..2]);
    assert_ne!(both[..2], initial[..2]);

    // The upper layer is only touched by its own optimizer.
    assert_eq!(lower_only[2..], initial[2..]);
    assert_ne!(both[2..], initial[2..]);
}

#[test]
fn unclaimed_parameters_are_frozen() {
    let lower_only: Vec<(Vec<&str>, Box<dyn Optimizer>)> =
        vec![(vec!["lower"], Box::new(GradientDescent::new(0.1)))];
    let trainer = ModelTrainer::new(
        model(1),
        Huber::default(),
        lower_only,
        dataset(),
        config(),
        StdRng::seed_from_u64(9),
    )
    .unwrap();

    let trainable: Vec<_> = trainer
        .model()
        .params()
        .iter()
        .map(|p| p.is_trainable())
        .collect();
    assert_eq!(trainable, [true, true, false, false]);
}

#[test]
fn non_negativity_is_idempotent_after_training() {
    let mut rng = StdRng::seed_from_u64(5);
    let dense = Dense::init(
        "dense",
        (3, 1),
        None,
        ParamGen::Normal {
            mean: 0.,
            std_dev: 1.,
        },
        DType::F64,
        &mut rng,
    )
    .unwrap()
    .with_kernel_constraint(NonNeg);
    let model = Sequential::new([dense.into()]).unwrap();

    let optimizers: Vec<(Vec<&str>, Box<dyn Optimizer>)> =
        vec![(vec!["all"], Box::new(GradientDescent::new(0.05)))];
    let config = TrainingConfig {
        epochs: 2,
        batch_size: 8,
        steps_per_epoch: 20,
    };

    let mut trainer =
        ModelTrainer::new(model, Huber::default(), optimizers, dataset(), config, rng).unwrap();
    for _ in 0..40 {
        trainer.step().unwrap();
    }

    let kernel = trainer.model_mut().params_mut().remove(0);
    let before = kernel.value().clone();
    assert!(before.to_vec().iter().all(|&w| w >= 0.));

    kernel.apply_constraint().unwrap();
    assert_eq!(kernel.value(), &before);

    let mut param = Parameter::new("p", Tensor::from_vec(&[3], vec![0., 1.5, 3.]).unwrap())
        .with_constraint(NonNeg);
    param.apply_constraint().unwrap();
    param.apply_constraint().unwrap();
    assert_eq!(param.value().to_vec(), vec![0., 1.5, 3.]);
}

#[test]
fn streaming_aggregators_report_running_means() {
    let mut mean = Mean::new();
    mean.update(14.);
    assert_eq!(mean.result(), 14.);
    mean.update_many([0.5, 6.5]);
    assert_eq!((mean.total(), mean.count()), (21., 3));
    assert_eq!(mean.result(), 7.);

    mean.reset();
    assert_eq!(mean.result(), 0.);

    let mut huber = HuberMetric::new(2.);
    let y_true = Tensor::from_vec(&[1, 1], vec![2.]).unwrap();
    let y_pred = Tensor::from_vec(&[1, 1], vec![10.]).unwrap();
    huber.update(&y_true, &y_pred).unwrap();
    assert_eq!(huber.result(), 14.);
}

const SPEC: &str = r#"{
    "model": {
        "sequential": {
            "layers": [
                { "dense": { "dim": [3, 8], "act_fn": "tanh", "init": "lecun_normal" } },
                { "dense": { "dim": [8, 1], "act_fn": null, "constraint": "non_neg",
                             "regularizer": { "l2": { "factor": 0.0001 } } } }
            ],
            "groups": [
                { "name": "lower", "layers": [0, 1] },
                { "name": "upper", "layers": [1, 2] }
            ],
            "dtype": "f64"
        }
    },
    "optimizers": [
        { "groups": ["lower"], "optimizer": { "gradient_descent": { "learning_rate": { "constant": 0.05 } } } },
        { "groups": ["upper"], "optimizer": { "nadam": { "learning_rate": { "constant": 0.01 }, "beta1": 0.9, "beta2": 0.999, "epsilon": 1e-7 } } }
    ],
    "loss": { "huber": { "threshold": 1.0 } },
    "metrics": ["mean_absolute_error", { "huber": { "threshold": 1.0 } }],
    "dataset": { "synthetic": { "samples": 256, "features": 3, "noise": 0.05 } },
    "epochs": 5,
    "batch_size": 32,
    "validation_split": 0.25,
    "seed": 42
}"#;

#[test]
fn built_trainer_reduces_the_loss() {
    let spec = TrainerSpec::from_json(SPEC).unwrap();
    let mut trainer = TrainerBuilder::new().build(&spec).unwrap();

    let history = trainer.fit(&mut NullReporter).unwrap();

    assert_eq!(history.len(), 5);
    let losses = history.train_losses();
    assert!(losses[4] < losses[0], "{losses:?}");

    let last = history.last().unwrap();
    let validation = last.validation.as_ref().unwrap();
    assert!(validation.metric("mae").is_some());
    assert!(validation.metric("huber").is_some());
    assert_eq!(trainer.history(), &history);
}

#[test]
fn overlapping_groups_fail_before_training() {
    let spec = SPEC.replace(r#""groups": ["upper"]"#, r#""groups": ["all"]"#);
    let spec = TrainerSpec::from_json(&spec).unwrap();

    let res = TrainerBuilder::new().build(&spec);
    assert!(matches!(
        res,
        Err(MlErr::OverlappingParamGroups {
            first: 0,
            second: 1,
            ..
        })
    ));
}

#[test]
fn unknown_groups_fail_before_training() {
    let spec = SPEC.replace(r#""groups": ["upper"]"#, r#""groups": ["middle"]"#);
    let spec = TrainerSpec::from_json(&spec).unwrap();

    assert!(matches!(
        TrainerBuilder::new().build(&spec),
        Err(MlErr::UnknownParamGroup { .. })
    ));
}

#[test]
fn mismatched_layers_fail_before_training() {
    let spec = SPEC.replace(r#""dim": [8, 1]"#, r#""dim": [6, 1]"#);
    let spec = TrainerSpec::from_json(&spec).unwrap();

    assert!(matches!(
        TrainerBuilder::new().build(&spec),
        Err(MlErr::SizeMismatch { .. })
    ));

    let spec = SPEC.replace(r#""validation_split": 0.25"#, r#""validation_split": 1.5"#);
    let spec = TrainerSpec::from_json(&spec).unwrap();

    assert!(matches!(
        TrainerBuilder::new().build(&spec),
        Err(MlErr::InvalidSplit { .. })
    ));
}

#[test]
fn invalid_constraints_fail_before_training() {
    let clip = r#""constraint": { "clip": { "min": 1.0, "max": 0.0 } }"#;
    let spec = SPEC.replace(r#""constraint": "non_neg""#, clip);
    let spec = TrainerSpec::from_json(&spec).unwrap();

    assert!(matches!(
        TrainerBuilder::new().build(&spec),
        Err(MlErr::Spec(_))
    ));

    let max_norm = r#""constraint": { "max_norm": { "max": -1.0 } }"#;
    let spec = SPEC.replace(r#""constraint": "non_neg""#, max_norm);
    let spec = TrainerSpec::from_json(&spec).unwrap();

    assert!(matches!(
        TrainerBuilder::new().build(&spec),
        Err(MlErr::Spec(_))
    ));
}

#[test]
fn outputs_must_match_the_targets() {
    let spec = SPEC.replace(r#""dim": [8, 1]"#, r#""dim": [8, 3]"#);
    let spec = TrainerSpec::from_json(&spec).unwrap();

    assert!(matches!(
        TrainerBuilder::new().build(&spec),
        Err(MlErr::SizeMismatch {
            got: 3,
            expected: 1,
            ..
        })
    ));
}
