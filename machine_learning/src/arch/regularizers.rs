use autodiff::Var;

use crate::error::Result;

/// A penalty over a parameter, added to the loss as an auxiliary term.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Regularizer {
    /// `factor * Σ|w|`
    L1(f64),
    /// `factor * Σw²`
    L2(f64),
    L1L2 { l1: f64, l2: f64 },
}

impl Regularizer {
    /// Computes the penalty of `w` as a rank 0 value recorded on `w`'s tape.
    pub fn penalty(&self, w: &Var) -> Result<Var> {
        let penalty = match *self {
            Regularizer::L1(factor) => w.abs()?.sum()?.scale(factor)?,
            Regularizer::L2(factor) => w.square()?.sum()?.scale(factor)?,
            Regularizer::L1L2 { l1, l2 } => {
                let l1 = w.abs()?.sum()?.scale(l1)?;
                let l2 = w.square()?.sum()?.scale(l2)?;
                l1.add(&l2)?
            }
        };

        Ok(penalty)
    }
}
