mod crossentropy;
mod huber;
mod loss_fn;
mod mae;
mod mse;

pub use crossentropy::SparseCategoricalCrossentropy;
pub(crate) use crossentropy::labels;
pub use huber::Huber;
pub use loss_fn::LossFn;
pub use mae::Mae;
pub use mse::Mse;
