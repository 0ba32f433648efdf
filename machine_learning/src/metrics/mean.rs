/// A running mean of a scalar quantity, kept as a `(total, count)` pair.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Mean {
    total: f64,
    count: u64,
}

impl Mean {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observes a single value.
    pub fn update(&mut self, value: f64) {
        self.total += value;
        self.count += 1;
    }

    /// Observes every value of `values`.
    pub fn update_many<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = f64>,
    {
        for value in values {
            self.update(value);
        }
    }

    /// Returns the mean of every observed value, `0` before the first one.
    pub fn result(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }

        self.total / self.count as f64
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty() {
        assert_eq!(Mean::new().result(), 0.0);
    }

    #[test]
    fn running_result() {
        let mut mean = Mean::new();

        mean.update(14.0);
        assert_eq!(mean.result(), 14.0);

        mean.update_many([0.5, 6.5]);
        assert_eq!(mean.total(), 21.0);
        assert_eq!(mean.count(), 3);
        assert_eq!(mean.result(), 7.0);
    }

    #[test]
    fn reset_forgets_everything() {
        let mut mean = Mean::new();
        mean.update_many([1.0, 2.0, 3.0]);
        mean.reset();

        assert_eq!(mean, Mean::new());
        mean.update(4.0);
        assert_eq!(mean.result(), 4.0);
    }
}
