use log::{debug, info};

use super::EpochReport;

/// The running state of an epoch after a training step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepStatus {
    pub epoch: usize,
    pub step: usize,
    pub steps_per_epoch: usize,
    pub loss: f64,
    pub metrics: Vec<(String, f64)>,
}

/// Receives the progress of a training run, it has no say in it.
pub trait Reporter {
    fn on_step(&mut self, status: &StepStatus);

    fn on_epoch(&mut self, report: &EpochReport);
}

/// Writes the progress through the `log` facade.
#[derive(Debug, Clone, Copy)]
pub struct LogReporter {
    every: usize,
}

impl LogReporter {
    /// Creates a new `LogReporter`.
    ///
    /// # Arguments
    /// * `every` - Steps are logged every `every` steps and at the end of each epoch.
    pub fn new(every: usize) -> Self {
        Self {
            every: every.max(1),
        }
    }
}

impl Default for LogReporter {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Reporter for LogReporter {
    fn on_step(&mut self, status: &StepStatus) {
        if status.step % self.every != 0 && status.step != status.steps_per_epoch {
            return;
        }

        let metrics = format_metrics(&status.metrics);
        debug!(
            epoch = status.epoch, step = status.step, steps = status.steps_per_epoch;
            "mean loss: {:.6}{metrics}", status.loss
        );
    }

    fn on_epoch(&mut self, report: &EpochReport) {
        let metrics = format_metrics(&report.train.metrics);
        info!(epoch = report.epoch; "train loss: {:.6}{metrics}", report.train.loss);

        if let Some(validation) = &report.validation {
            let metrics = format_metrics(&validation.metrics);
            info!(epoch = report.epoch; "validation loss: {:.6}{metrics}", validation.loss);
        }
    }
}

fn format_metrics(metrics: &[(String, f64)]) -> String {
    metrics
        .iter()
        .map(|(name, value)| format!(", {name}: {value:.6}"))
        .collect()
}

/// Discards every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn on_step(&mut self, _status: &StepStatus) {}

    fn on_epoch(&mut self, _report: &EpochReport) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_are_appended_to_the_loss() {
        let metrics = vec![("mae".to_string(), 0.5), ("huber".to_string(), 0.25)];
        assert_eq!(format_metrics(&metrics), ", mae: 0.500000, huber: 0.250000");
        assert_eq!(format_metrics(&[]), "");
    }
}
