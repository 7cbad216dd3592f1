//! Binary decision trees over `f64` feature rows.
//!
//! Trees are built by hand or by an external trainer; this module only
//! evaluates them. A row goes left when `row[feature] <= threshold`.

use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::learner::Predictor;
use crate::tensor::Tensor;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Leaf {
        value: f64,
        /// Class distribution at the leaf, present for classification trees.
        probabilities: Option<Vec<f64>>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    pub fn leaf(value: f64) -> Node {
        Node::Leaf {
            value,
            probabilities: None,
        }
    }

    pub fn class_leaf(value: f64, probabilities: Vec<f64>) -> Node {
        Node::Leaf {
            value,
            probabilities: Some(probabilities),
        }
    }

    pub fn split(feature: usize, threshold: f64, left: Node, right: Node) -> Node {
        Node::Split {
            feature,
            threshold,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn depth(&self) -> usize {
        match self {
            Node::Leaf { .. } => 0,
            Node::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryTree {
    root: Node,
}

impl BinaryTree {
    pub fn new(root: Node) -> Self {
        BinaryTree { root }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    /// Walks to the leaf for `row`, returning its value and distribution.
    fn find_leaf(&self, row: &[f64]) -> Result<(f64, Option<&[f64]>)> {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf {
                    value,
                    probabilities,
                } => return Ok((*value, probabilities.as_deref())),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = row
                        .get(*feature)
                        .ok_or_else(|| Error::shape_mismatch(&[feature + 1], &[row.len()]))?;
                    node = match value.partial_cmp(threshold) {
                        Some(Ordering::Less | Ordering::Equal) => left,
                        Some(Ordering::Greater) => right,
                        None => {
                            return Err(Error::Degenerate(format!(
                                "cannot split on feature {feature}: {value} vs threshold {threshold}"
                            )))
                        }
                    };
                }
            }
        }
    }

    pub fn predict_row(&self, row: &[f64]) -> Result<f64> {
        self.find_leaf(row).map(|(value, _)| value)
    }

    pub fn predict_probability(&self, row: &[f64]) -> Result<&[f64]> {
        match self.find_leaf(row)? {
            (_, Some(probabilities)) => Ok(probabilities),
            (_, None) => Err(Error::Unsupported(
                "tree leaves carry no class probabilities".to_owned(),
            )),
        }
    }
}

impl Predictor<f64> for BinaryTree {
    /// One prediction per row, shaped `[rows, 1]`.
    fn predict(&mut self, observations: &Tensor<f64>) -> Result<Tensor<f64>> {
        let rows = observations.batch_size();
        let values = (0..rows)
            .map(|index| self.predict_row(observations.row(index)?))
            .collect::<Result<Vec<_>>>()?;
        Tensor::new(values, vec![rows, 1])
    }
}
