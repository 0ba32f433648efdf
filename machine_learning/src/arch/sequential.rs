use std::ops::Range;

use autodiff::{ParamId, Parameter, Tape, Var};

use super::{Model, ParamGroup, layers::Layer};
use crate::error::{MlErr, Result};

/// A sequential model: information flows forward through its layers in order.
///
/// Layers can be grouped by index ranges so that each group gets its own optimizer, e.g. a
/// `lower` group for `0..2` and an `upper` group for `2..4`.
#[derive(Debug)]
pub struct Sequential {
    layers: Vec<Layer>,
    groups: Vec<(String, Range<usize>)>,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    ///
    /// # Returns
    /// A new `Sequential` instance or an error if there are no layers.
    pub fn new<I>(layers: I) -> Result<Self>
    where
        I: IntoIterator<Item = Layer>,
    {
        let layers: Vec<_> = layers.into_iter().collect();

        if layers.is_empty() {
            return Err(MlErr::EmptyModel);
        }

        Ok(Self {
            layers,
            groups: Vec::new(),
        })
    }

    /// Declares a named group of layers.
    ///
    /// # Arguments
    /// * `name` - The name of the group, `all` is reserved.
    /// * `layers` - The indices of the layers in the group.
    ///
    /// # Returns
    /// The model or an error if the range is out of bounds.
    pub fn with_group(mut self, name: impl Into<String>, layers: Range<usize>) -> Result<Self> {
        let name = name.into();

        if layers.start >= layers.end || layers.end > self.layers.len() {
            return Err(MlErr::InvalidGroupRange {
                name,
                start: layers.start,
                end: layers.end,
                layers: self.layers.len(),
            });
        }

        if name == ParamGroup::ALL || self.groups.iter().any(|(n, _)| *n == name) {
            return Err(MlErr::Spec(format!("The group name {name} is already in use")));
        }

        self.groups.push((name, layers));
        Ok(self)
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }
}

impl Model for Sequential {
    fn forward(&self, tape: &Tape, x: &Var) -> Result<Var> {
        let mut layers = self.layers.iter();
        let Some(first) = layers.next() else {
            return Err(MlErr::EmptyModel);
        };

        let mut a = first.forward(tape, x)?;
        for layer in layers {
            a = layer.forward(tape, &a)?;
        }

        Ok(a)
    }

    fn params(&self) -> Vec<&Parameter> {
        self.layers.iter().flat_map(|layer| layer.params()).collect()
    }

    fn params_mut(&mut self) -> Vec<&mut Parameter> {
        self.layers
            .iter_mut()
            .flat_map(|layer| layer.params_mut())
            .collect()
    }

    fn losses(&self, tape: &Tape) -> Result<Vec<Var>> {
        let mut losses = Vec::new();

        for layer in &self.layers {
            if let Some(loss) = layer.loss(tape)? {
                losses.push(loss);
            }
        }

        Ok(losses)
    }

    fn param_groups(&self) -> Vec<ParamGroup> {
        let ids_of = |range: Range<usize>| -> Vec<ParamId> {
            self.layers[range]
                .iter()
                .flat_map(|layer| layer.params())
                .map(|p| p.id())
                .collect()
        };

        let mut groups = vec![ParamGroup::new(ParamGroup::ALL, ids_of(0..self.layers.len()))];
        groups.extend(
            self.groups
                .iter()
                .map(|(name, range)| ParamGroup::new(name.clone(), ids_of(range.clone()))),
        );

        groups
    }

    fn size(&self) -> usize {
        self.layers.iter().map(|layer| layer.size()).sum()
    }
}

#[cfg(test)]
mod tests {
    use autodiff::{DType, Tensor};
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        arch::{activations::ActFn, layers::Dense, regularizers::Regularizer},
        initialization::ParamGen,
    };

    fn model() -> Sequential {
        let mut rng = StdRng::seed_from_u64(0);
        let init = ParamGen::Const { value: 0.5 };

        let hidden = Dense::init("hidden", (3, 4), Some(ActFn::Relu), init, DType::F32, &mut rng)
            .unwrap()
            .with_regularizer(Regularizer::L2(0.1));
        let output = Dense::init("output", (4, 1), None, init, DType::F32, &mut rng).unwrap();

        Sequential::new([hidden.into(), output.into()]).unwrap()
    }

    #[test]
    fn forward_goes_through_every_layer() {
        let model = model();
        let tape = Tape::inference();
        let x = tape.constant(Tensor::ones(&[2, 3], DType::F32)).unwrap();

        let y = model.forward(&tape, &x).unwrap();

        // hidden: 3 * 0.5 = 1.5 per unit, output: 4 * 1.5 * 0.5 = 3
        assert_eq!(y.shape(), vec![2, 1]);
        assert_eq!(y.value().to_vec(), vec![3.0, 3.0]);
    }

    #[test]
    fn size_counts_scalars() {
        let model = model();

        assert_eq!(model.size(), 4 * 4 + 5);
        assert_eq!(model.size(), model.params().iter().map(|p| p.len()).sum::<usize>());
        assert_eq!(model.params().len(), 4);
    }

    #[test]
    fn regularized_layers_contribute_losses() {
        let model = model();
        let tape = Tape::new();
        let losses = model.losses(&tape).unwrap();

        assert_eq!(losses.len(), 1);
        // 0.1 * 12 * 0.25
        assert!((losses[0].to_scalar().unwrap() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn groups_are_made_of_layer_ranges() {
        let model = model()
            .with_group("lower", 0..1)
            .unwrap()
            .with_group("upper", 1..2)
            .unwrap();

        let groups = model.param_groups();
        let names: Vec<_> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["all", "lower", "upper"]);

        let params = model.params();
        assert_eq!(groups[0].ids.len(), 4);
        assert_eq!(groups[1].ids, [params[0].id(), params[1].id()]);
        assert_eq!(groups[2].ids, [params[2].id(), params[3].id()]);
    }

    #[test]
    fn invalid_groups_are_rejected() {
        assert!(matches!(
            model().with_group("lower", 0..3),
            Err(MlErr::InvalidGroupRange { .. })
        ));
        assert!(model().with_group("all", 0..1).is_err());
        assert!(matches!(Sequential::new([]), Err(MlErr::EmptyModel)));
    }
}
