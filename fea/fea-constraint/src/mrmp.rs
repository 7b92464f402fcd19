//! Multi-row-multi-point constraints.

use fea_types::{ConstraintKind, ConstraintTag, FeaError, NodeId, Result};
use nalgebra::DMatrix;

use crate::{Constraint, NodalState};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One retained node's contribution to a multi-row-multi-point relation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RetainedBlock {
    /// The retained node.
    pub node: NodeId,
    /// The retained DOF indices this block contributes.
    pub dofs: Vec<usize>,
}

impl RetainedBlock {
    /// Create a retained block.
    #[must_use]
    pub fn new(node: NodeId, dofs: Vec<usize>) -> Self {
        Self { node, dofs }
    }
}

/// A multi-point constraint generalized to several retained nodes.
///
/// The coefficient matrix has one row per constrained DOF and one
/// column per retained DOF, with the columns laid out block by block in
/// the order of the retained list.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MrmpConstraint {
    /// Tag within the multi-row-multi-point store.
    tag: ConstraintTag,
    /// The constrained (driven) node.
    constrained: NodeId,
    /// Constrained DOF indices, one per matrix row.
    constrained_dofs: Vec<usize>,
    /// Retained nodes with their DOF blocks, in column order.
    retained: Vec<RetainedBlock>,
    /// Coefficient matrix.
    matrix: DMatrix<f64>,
    /// Whether the constraint is attached to a domain.
    #[cfg_attr(feature = "serde", serde(skip))]
    attached: bool,
}

impl MrmpConstraint {
    /// Create a multi-row-multi-point constraint.
    ///
    /// # Errors
    ///
    /// Returns [`FeaError::MatrixShape`] unless the matrix row count
    /// equals the constrained DOF count and the column count equals the
    /// summed retained DOF count.
    pub fn new(
        tag: ConstraintTag,
        constrained: NodeId,
        constrained_dofs: Vec<usize>,
        retained: Vec<RetainedBlock>,
        matrix: DMatrix<f64>,
    ) -> Result<Self> {
        let retained_dof_count: usize = retained.iter().map(|block| block.dofs.len()).sum();
        if matrix.nrows() != constrained_dofs.len() || matrix.ncols() != retained_dof_count {
            return Err(FeaError::MatrixShape {
                rows: matrix.nrows(),
                cols: matrix.ncols(),
                expected_rows: constrained_dofs.len(),
                expected_cols: retained_dof_count,
            });
        }
        Ok(Self {
            tag,
            constrained,
            constrained_dofs,
            retained,
            matrix,
            attached: false,
        })
    }

    /// The constrained (driven) node.
    #[must_use]
    pub fn constrained_node(&self) -> NodeId {
        self.constrained
    }

    /// Constrained DOF indices, one per matrix row.
    #[must_use]
    pub fn constrained_dofs(&self) -> &[usize] {
        &self.constrained_dofs
    }

    /// Retained nodes with their DOF blocks, in column order.
    #[must_use]
    pub fn retained(&self) -> &[RetainedBlock] {
        &self.retained
    }

    /// The coefficient matrix.
    #[must_use]
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Verify the referenced nodes and mark attached.
    ///
    /// Each missing node is logged and left unresolved; the constraint
    /// still enters the attached state.
    pub fn attach<S: NodalState>(&mut self, nodes: &S) {
        for node in self.referenced_nodes() {
            if !nodes.contains_node(node) {
                tracing::error!("multi-row-multi-point {} names missing {}", self.tag, node);
            }
        }
        self.attached = true;
    }

    /// Clear the attached state.
    pub fn detach(&mut self) {
        self.attached = false;
    }

    /// Per-step update hook. The matrix is constant; the hook keeps the
    /// store's update fan-out uniform across kinds.
    pub fn update<S: NodalState>(&mut self, _nodes: &S, _time: f64) {}
}

impl Constraint for MrmpConstraint {
    fn tag(&self) -> ConstraintTag {
        self.tag
    }

    fn kind(&self) -> ConstraintKind {
        ConstraintKind::MultiRowMultiPoint
    }

    fn referenced_nodes(&self) -> Vec<NodeId> {
        let mut nodes = Vec::with_capacity(1 + self.retained.len());
        nodes.push(self.constrained);
        nodes.extend(self.retained.iter().map(|block| block.node));
        nodes
    }

    fn is_attached(&self) -> bool {
        self.attached
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_column_count_spans_blocks() {
        let mrmp = MrmpConstraint::new(
            ConstraintTag::new(1),
            NodeId::new(9),
            vec![0, 1],
            vec![
                RetainedBlock::new(NodeId::new(1), vec![0, 1]),
                RetainedBlock::new(NodeId::new(2), vec![0]),
            ],
            DMatrix::zeros(2, 3),
        )
        .unwrap();
        assert_eq!(mrmp.matrix().ncols(), 3);
        assert_eq!(
            mrmp.referenced_nodes(),
            vec![NodeId::new(9), NodeId::new(1), NodeId::new(2)]
        );
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let bad = MrmpConstraint::new(
            ConstraintTag::new(1),
            NodeId::new(9),
            vec![0, 1],
            vec![RetainedBlock::new(NodeId::new(1), vec![0, 1])],
            DMatrix::zeros(2, 3),
        );
        assert!(matches!(bad, Err(FeaError::MatrixShape { .. })));
    }
}
