mod builder;
mod history;
mod model_trainer;
mod reporter;
mod trainer;

pub use builder::TrainerBuilder;
pub use history::{EpochReport, EvalReport, History};
pub use model_trainer::{ModelTrainer, TrainingConfig};
pub use reporter::{LogReporter, NullReporter, Reporter, StepStatus};
pub use trainer::Trainer;
