use serde::Serialize;

/// The aggregated loss and metrics over a pass on a dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvalReport {
    pub loss: f64,
    pub metrics: Vec<(String, f64)>,
}

impl EvalReport {
    /// Returns the result of the metric named `name`, if it was tracked.
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics
            .iter()
            .find(|(n, _)| n == name)
            .map(|&(_, value)| value)
    }
}

/// What happened during a single epoch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpochReport {
    pub epoch: usize,
    pub train: EvalReport,
    pub validation: Option<EvalReport>,
}

/// Every epoch report of a trainer, in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct History {
    epochs: Vec<EpochReport>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, report: EpochReport) {
        self.epochs.push(report);
    }

    pub fn epochs(&self) -> &[EpochReport] {
        &self.epochs
    }

    pub fn last(&self) -> Option<&EpochReport> {
        self.epochs.last()
    }

    /// Returns the training loss of every epoch.
    pub fn train_losses(&self) -> Vec<f64> {
        self.epochs.iter().map(|e| e.train.loss).collect()
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }
}
