use std::collections::HashMap;

use autodiff::{ParamId, Parameter};

use crate::{
    arch::ParamGroup,
    error::{MlErr, Result},
};

/// Assigns the trainable parameters of a model to optimizers, each parameter to at most one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamPartition {
    subsets: Vec<Vec<ParamId>>,
    unclaimed: Vec<ParamId>,
}

impl ParamPartition {
    /// Creates a new `ParamPartition`.
    ///
    /// # Arguments
    /// * `params` - The parameters of the model, in the model's order.
    /// * `groups` - The groups the model declares.
    /// * `assignments` - The names of the groups each optimizer updates, one entry per optimizer.
    ///
    /// # Returns
    /// The partition or an error if a group is unknown, or if a parameter is claimed by two
    /// optimizers.
    pub fn new<S>(params: &[&Parameter], groups: &[ParamGroup], assignments: &[Vec<S>]) -> Result<Self>
    where
        S: AsRef<str>,
    {
        if assignments.is_empty() {
            return Err(MlErr::NoOptimizers);
        }

        let mut owners: HashMap<ParamId, usize> = HashMap::new();

        for (optimizer, names) in assignments.iter().enumerate() {
            for name in names {
                let name = name.as_ref();
                let group = groups.iter().find(|g| g.name == name).ok_or_else(|| {
                    MlErr::UnknownParamGroup {
                        name: name.to_string(),
                    }
                })?;

                for &id in &group.ids {
                    match owners.insert(id, optimizer) {
                        Some(first) if first != optimizer => {
                            return Err(MlErr::OverlappingParamGroups {
                                param: param_name(params, id),
                                first,
                                second: optimizer,
                            });
                        }
                        _ => {}
                    }
                }
            }
        }

        let trainable = params.iter().filter(|p| p.is_trainable()).map(|p| p.id());
        let mut subsets = vec![Vec::new(); assignments.len()];
        let mut unclaimed = Vec::new();

        for id in trainable {
            match owners.get(&id) {
                Some(&optimizer) => subsets[optimizer].push(id),
                None => unclaimed.push(id),
            }
        }

        Ok(Self { subsets, unclaimed })
    }

    /// Returns the parameters the `optimizer`-th optimizer updates, in the model's order.
    pub fn subset(&self, optimizer: usize) -> &[ParamId] {
        self.subsets.get(optimizer).map_or(&[], Vec::as_slice)
    }

    pub fn subsets(&self) -> &[Vec<ParamId>] {
        &self.subsets
    }

    /// Returns the trainable parameters no optimizer updates.
    pub fn unclaimed(&self) -> &[ParamId] {
        &self.unclaimed
    }

    /// Returns the amount of optimizers.
    pub fn len(&self) -> usize {
        self.subsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subsets.is_empty()
    }
}

fn param_name(params: &[&Parameter], id: ParamId) -> String {
    params
        .iter()
        .find(|p| p.id() == id)
        .map_or_else(|| id.to_string(), |p| p.name().to_string())
}

#[cfg(test)]
mod tests {
    use autodiff::Tensor;

    use super::*;

    fn params() -> Vec<Parameter> {
        (0..4)
            .map(|i| Parameter::new(format!("p{i}"), Tensor::scalar(0.0)))
            .collect()
    }

    fn groups(params: &[Parameter]) -> Vec<ParamGroup> {
        let ids: Vec<_> = params.iter().map(|p| p.id()).collect();
        vec![
            ParamGroup::new("all", ids.clone()),
            ParamGroup::new("lower", ids[..2].to_vec()),
            ParamGroup::new("upper", ids[2..].to_vec()),
        ]
    }

    #[test]
    fn disjoint_groups() {
        let params = params();
        let refs: Vec<_> = params.iter().collect();

        let partition =
            ParamPartition::new(&refs, &groups(&params), &[vec!["lower"], vec!["upper"]]).unwrap();

        assert_eq!(partition.len(), 2);
        assert_eq!(partition.subset(0), [params[0].id(), params[1].id()]);
        assert_eq!(partition.subset(1), [params[2].id(), params[3].id()]);
        assert!(partition.unclaimed().is_empty());
    }

    #[test]
    fn overlapping_groups_fail() {
        let params = params();
        let refs: Vec<_> = params.iter().collect();

        let res = ParamPartition::new(&refs, &groups(&params), &[vec!["all"], vec!["upper"]]);
        assert!(matches!(
            res,
            Err(MlErr::OverlappingParamGroups { first: 0, second: 1, ref param }) if param == "p2"
        ));
    }

    #[test]
    fn unknown_groups_fail() {
        let params = params();
        let refs: Vec<_> = params.iter().collect();

        let res = ParamPartition::new(&refs, &groups(&params), &[vec!["middle"]]);
        assert!(matches!(res, Err(MlErr::UnknownParamGroup { ref name }) if name == "middle"));
    }

    #[test]
    fn unclaimed_and_frozen_parameters() {
        let mut params = params();
        params[1].set_trainable(false);
        let refs: Vec<_> = params.iter().collect();

        let partition = ParamPartition::new(&refs, &groups(&params), &[vec!["lower"]]).unwrap();

        assert_eq!(partition.subset(0), [params[0].id()]);
        assert_eq!(partition.unclaimed(), [params[2].id(), params[3].id()]);
    }

    #[test]
    fn no_optimizers() {
        let params = params();
        let refs: Vec<_> = params.iter().collect();
        let assignments: [Vec<&str>; 0] = [];

        assert!(matches!(
            ParamPartition::new(&refs, &groups(&params), &assignments),
            Err(MlErr::NoOptimizers)
        ));
    }
}
