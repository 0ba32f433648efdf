//! Streaming aggregators for losses and metrics.

mod accuracy;
mod huber_metric;
mod mean;
mod mean_absolute_error;
mod metric;

pub use accuracy::SparseCategoricalAccuracy;
pub use huber_metric::HuberMetric;
pub use mean::Mean;
pub use mean_absolute_error::MeanAbsoluteError;
pub use metric::Metric;
