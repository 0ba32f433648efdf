use autodiff::{Constraint, DType, Parameter, Tape, Tensor, Var};
use rand::Rng;

use crate::{
    arch::{activations::ActFn, regularizers::Regularizer},
    error::{MlErr, Result},
    initialization::ParamGen,
};

/// A fully connected layer computing `act_fn(x · kernel + bias)`.
#[derive(Debug)]
pub struct Dense {
    dim: (usize, usize),
    kernel: Parameter,
    bias: Parameter,
    act_fn: Option<ActFn>,
    kernel_regularizer: Option<Regularizer>,
}

impl Dense {
    /// Creates a new `Dense` layer from already built parameters.
    ///
    /// # Arguments
    /// * `dim` - The amount of inputs and outputs of the layer.
    /// * `kernel` - The weights, of shape `dim`.
    /// * `bias` - The biases, one per output.
    /// * `act_fn` - An optional activation function.
    ///
    /// # Returns
    /// A new `Dense` instance or an error if the parameters don't fit `dim`.
    pub fn new(
        dim: (usize, usize),
        kernel: Parameter,
        bias: Parameter,
        act_fn: Option<ActFn>,
    ) -> Result<Self> {
        if dim.0 == 0 || dim.1 == 0 {
            return Err(MlErr::ZeroSizedLayer { layer: 0 });
        }

        if kernel.shape() != [dim.0, dim.1] {
            return Err(MlErr::SizeMismatch {
                a: "kernel",
                b: "layer dimensions",
                got: kernel.len(),
                expected: dim.0 * dim.1,
            });
        }

        if bias.shape() != [dim.1] {
            return Err(MlErr::SizeMismatch {
                a: "bias",
                b: "layer outputs",
                got: bias.len(),
                expected: dim.1,
            });
        }

        Ok(Self {
            dim,
            kernel,
            bias,
            act_fn,
            kernel_regularizer: None,
        })
    }

    /// Creates a new `Dense` layer sampling its kernel from `init`, its biases start at zero.
    ///
    /// # Arguments
    /// * `name` - The prefix of the names of its parameters.
    /// * `dim` - The amount of inputs and outputs of the layer.
    /// * `act_fn` - An optional activation function.
    /// * `init` - The kernel initializer.
    /// * `dtype` - The type of the parameters.
    /// * `rng` - A random number generator.
    ///
    /// # Returns
    /// A new `Dense` instance or an error if the initializer is invalid.
    pub fn init<R>(
        name: &str,
        dim: (usize, usize),
        act_fn: Option<ActFn>,
        init: ParamGen,
        dtype: DType,
        rng: &mut R,
    ) -> Result<Self>
    where
        R: Rng + ?Sized,
    {
        let kernel = init.generate(rng, &[dim.0, dim.1], dtype)?;
        let kernel = Parameter::new(format!("{name}/kernel"), kernel);
        let bias = Parameter::new(format!("{name}/bias"), Tensor::zeros(&[dim.1], dtype));

        Self::new(dim, kernel, bias, act_fn)
    }

    pub fn with_regularizer(mut self, regularizer: Regularizer) -> Self {
        self.kernel_regularizer = Some(regularizer);
        self
    }

    pub fn with_kernel_constraint<C>(self, constraint: C) -> Self
    where
        C: Constraint + 'static,
    {
        Self {
            kernel: self.kernel.with_constraint(constraint),
            ..self
        }
    }

    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    pub fn kernel(&self) -> &Parameter {
        &self.kernel
    }

    pub fn bias(&self) -> &Parameter {
        &self.bias
    }

    /// Returns the size of this layer.
    ///
    /// # Returns
    /// The amount of parameters this layer has.
    pub fn size(&self) -> usize {
        (self.dim.0 + 1) * self.dim.1
    }

    pub fn forward(&self, tape: &Tape, x: &Var) -> Result<Var> {
        let w = tape.watch(&self.kernel)?;
        let b = tape.watch(&self.bias)?;
        let z = x.matmul(&w)?.add(&b)?;

        match &self.act_fn {
            Some(act_fn) => act_fn.apply(&z),
            None => Ok(z),
        }
    }

    /// Computes the regularization penalty of the kernel, if there's a regularizer.
    pub fn loss(&self, tape: &Tape) -> Result<Option<Var>> {
        let Some(regularizer) = &self.kernel_regularizer else {
            return Ok(None);
        };

        let w = tape.watch(&self.kernel)?;
        regularizer.penalty(&w).map(Some)
    }

    pub fn params(&self) -> [&Parameter; 2] {
        [&self.kernel, &self.bias]
    }

    pub fn params_mut(&mut self) -> [&mut Parameter; 2] {
        [&mut self.kernel, &mut self.bias]
    }
}

#[cfg(test)]
mod tests {
    use autodiff::NonNeg;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn layer(act_fn: Option<ActFn>) -> Dense {
        let kernel = Tensor::from_vec(&[2, 2], vec![1.0, -1.0, 2.0, 0.5]).unwrap();
        let bias = Tensor::from_vec(&[2], vec![0.5, -4.0]).unwrap();

        Dense::new(
            (2, 2),
            Parameter::new("kernel", kernel),
            Parameter::new("bias", bias),
            act_fn,
        )
        .unwrap()
    }

    #[test]
    fn forward_pass() {
        let tape = Tape::inference();
        let x = tape
            .constant(Tensor::from_vec(&[1, 2], vec![1.0, 1.0]).unwrap())
            .unwrap();

        let linear = layer(None).forward(&tape, &x).unwrap();
        assert_eq!(linear.value().to_vec(), vec![3.5, -4.5]);

        let relu = layer(Some(ActFn::Relu)).forward(&tape, &x).unwrap();
        assert_eq!(relu.value().to_vec(), vec![3.5, 0.0]);
    }

    #[test]
    fn bias_gradient_sums_over_the_batch() {
        let dense = layer(None);
        let tape = Tape::new();
        let x = tape.constant(Tensor::ones(&[3, 2], DType::F32)).unwrap();
        let y = dense.forward(&tape, &x).unwrap();

        let grads = tape.gradient_for(&y, &dense.params()).unwrap();
        assert_eq!(grads[0].to_vec(), vec![3.0; 4]);
        assert_eq!(grads[1].to_vec(), vec![3.0; 2]);
    }

    #[test]
    fn mismatched_parameters_are_rejected() {
        let kernel = Parameter::new("kernel", Tensor::zeros(&[3, 2], DType::F32));
        let bias = Parameter::new("bias", Tensor::zeros(&[2], DType::F32));

        assert!(matches!(
            Dense::new((2, 2), kernel, bias, None),
            Err(MlErr::SizeMismatch { a: "kernel", .. })
        ));
    }

    #[test]
    fn initialized_layer() {
        let mut rng = StdRng::seed_from_u64(7);
        let dense = Dense::init("d", (4, 3), None, ParamGen::HeNormal, DType::F32, &mut rng)
            .unwrap()
            .with_kernel_constraint(NonNeg)
            .with_regularizer(Regularizer::L2(0.01));

        assert_eq!(dense.size(), 15);
        assert_eq!(dense.kernel().name(), "d/kernel");
        assert!(dense.kernel().has_constraint());
        assert_eq!(dense.bias().value(), &Tensor::zeros(&[3], DType::F32));

        let tape = Tape::new();
        assert!(dense.loss(&tape).unwrap().is_some());
    }
}
