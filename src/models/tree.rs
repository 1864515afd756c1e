// src/models/tree.rs
use crate::core::{ClassLabel, Decision, DomainTable, FeatureDomain, FeatureSubset, FfaError, Instance, Result};
use crate::models::check_assignment;
use crate::traits::{Classifier, ConstraintBackend};

/// A node of a binary threshold tree. `x[feature] <= threshold` goes left.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        class: ClassLabel,
    },
}

/// Decision tree stored as a flat node array rooted at index 0.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
    num_features: usize,
}

impl DecisionTree {
    /// Children must point strictly forward in `nodes`, which keeps the tree acyclic.
    pub fn new(nodes: Vec<TreeNode>, num_features: usize) -> Result<Self> {
        if nodes.is_empty() {
            return Err(FfaError::InvalidInput("Decision tree has no nodes.".to_string()));
        }
        for (idx, node) in nodes.iter().enumerate() {
            if let TreeNode::Split { feature, threshold, left, right } = node {
                if *feature >= num_features {
                    return Err(FfaError::InvalidInput(format!(
                        "Node {} splits on feature {}, but the tree has {} features.",
                        idx, feature, num_features
                    )));
                }
                if !threshold.is_finite() {
                    return Err(FfaError::InvalidInput(format!(
                        "Node {} has a non-finite threshold.",
                        idx
                    )));
                }
                for &child in [left, right] {
                    if child <= idx || child >= nodes.len() {
                        return Err(FfaError::InvalidInput(format!(
                            "Node {} has invalid child index {}.",
                            idx, child
                        )));
                    }
                }
            }
        }
        Ok(DecisionTree { nodes, num_features })
    }

    /// Single split: `left_class` if `x[feature] <= threshold`, else `right_class`.
    pub fn stump(
        num_features: usize,
        feature: usize,
        threshold: f64,
        left_class: ClassLabel,
        right_class: ClassLabel,
    ) -> Result<Self> {
        DecisionTree::new(
            vec![
                TreeNode::Split { feature, threshold, left: 1, right: 2 },
                TreeNode::Leaf { class: left_class },
                TreeNode::Leaf { class: right_class },
            ],
            num_features,
        )
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Depth-first search for a leaf with a class other than `target`,
    /// keeping for every free feature the interval its path admits.
    fn search(
        &self,
        node: usize,
        instance: &Instance,
        free: &FeatureSubset,
        target: ClassLabel,
        domains: &DomainTable,
        bounds: &mut [PathBound],
    ) -> Option<Instance> {
        match &self.nodes[node] {
            TreeNode::Leaf { class } => {
                if *class == target {
                    return None;
                }
                let mut witness = instance.clone();
                for feature in free.iter() {
                    witness[feature] = bounds[feature].pick(&domains[feature])?;
                }
                Some(witness)
            }
            TreeNode::Split { feature, threshold, left, right } => {
                let (feature, threshold) = (*feature, *threshold);
                if !free.contains(feature) {
                    let next = if instance[feature] <= threshold { *left } else { *right };
                    return self.search(next, instance, free, target, domains, bounds);
                }

                let saved = bounds[feature];
                for (next, branch) in [(*left, saved.at_most(threshold)), (*right, saved.above(threshold))] {
                    if branch.pick(&domains[feature]).is_none() {
                        continue;
                    }
                    bounds[feature] = branch;
                    let found = self.search(next, instance, free, target, domains, bounds);
                    bounds[feature] = saved;
                    if found.is_some() {
                        return found;
                    }
                }
                None
            }
        }
    }
}

/// Path constraint on one feature: `lo < x` (or `lo <= x`) and `x <= hi`.
#[derive(Debug, Clone, Copy)]
struct PathBound {
    lo: f64,
    lo_strict: bool,
    hi: f64,
}

impl PathBound {
    fn unbounded() -> Self {
        PathBound { lo: f64::NEG_INFINITY, lo_strict: false, hi: f64::INFINITY }
    }

    fn at_most(self, threshold: f64) -> Self {
        PathBound { hi: self.hi.min(threshold), ..self }
    }

    fn above(self, threshold: f64) -> Self {
        if threshold >= self.lo {
            PathBound { lo: threshold, lo_strict: true, ..self }
        } else {
            self
        }
    }

    fn admits(&self, value: f64) -> bool {
        let above_lo = if self.lo_strict { value > self.lo } else { value >= self.lo };
        above_lo && value <= self.hi
    }

    /// An admissible value of `domain` satisfying the bound, if any.
    fn pick(&self, domain: &FeatureDomain) -> Option<f64> {
        match domain {
            FeatureDomain::Interval { low, high } => {
                let strict = self.lo_strict && self.lo >= *low;
                let lower = self.lo.max(*low);
                let upper = self.hi.min(*high);
                if strict {
                    (upper > lower).then_some(upper)
                } else {
                    (upper >= lower).then_some(lower)
                }
            }
            FeatureDomain::Categorical(values) => values
                .iter()
                .copied()
                .filter(|v| self.admits(*v))
                .min_by(f64::total_cmp),
        }
    }
}

impl Classifier for DecisionTree {
    fn num_features(&self) -> usize {
        self.num_features
    }

    fn predict(&self, instance: &Instance) -> Result<ClassLabel> {
        check_assignment(instance, self.num_features)?;
        let mut node = 0;
        loop {
            match &self.nodes[node] {
                TreeNode::Leaf { class } => return Ok(*class),
                TreeNode::Split { feature, threshold, left, right } => {
                    node = if instance[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

impl ConstraintBackend for DecisionTree {
    fn find_counterexample(
        &self,
        instance: &Instance,
        free: &FeatureSubset,
        target: ClassLabel,
        domains: &DomainTable,
    ) -> Result<Decision> {
        check_assignment(instance, self.num_features)?;
        if domains.len() != self.num_features {
            return Err(FfaError::IncompatibleDimensions(format!(
                "Domain table has {} features, but the tree expects {}.",
                domains.len(),
                self.num_features
            )));
        }
        let mut bounds = vec![PathBound::unbounded(); self.num_features];
        Ok(match self.search(0, instance, free, target, domains, &mut bounds) {
            Some(witness) => Decision::exact(true).with_witness(witness),
            None => Decision::exact(false),
        })
    }
}
