//! Multi-point constraints and the store-level tagged variant.

use fea_types::{ConstraintKind, ConstraintTag, FeaError, NodeId, Result};
use nalgebra::DMatrix;

use crate::{Constraint, NodalState, RigidJoint2d, RigidJoint3d};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A multi-point constraint with a constant coefficient matrix.
///
/// Drives the constrained node's DOF subset from the retained node's:
/// `u_c = G * u_r`, with `G` fixed at construction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MpConstraint {
    /// Tag within the multi-point store.
    tag: ConstraintTag,
    /// The constrained (driven) node.
    constrained: NodeId,
    /// The retained (driving) node.
    retained: NodeId,
    /// Constrained DOF indices, one per matrix row.
    constrained_dofs: Vec<usize>,
    /// Retained DOF indices, one per matrix column.
    retained_dofs: Vec<usize>,
    /// Coefficient matrix.
    matrix: DMatrix<f64>,
    /// Whether the constraint is attached to a domain.
    #[cfg_attr(feature = "serde", serde(skip))]
    attached: bool,
}

impl MpConstraint {
    /// Create a multi-point constraint.
    ///
    /// # Errors
    ///
    /// Returns [`FeaError::MatrixShape`] unless the matrix is
    /// `constrained_dofs.len() x retained_dofs.len()`.
    pub fn new(
        tag: ConstraintTag,
        constrained: NodeId,
        retained: NodeId,
        constrained_dofs: Vec<usize>,
        retained_dofs: Vec<usize>,
        matrix: DMatrix<f64>,
    ) -> Result<Self> {
        if matrix.nrows() != constrained_dofs.len() || matrix.ncols() != retained_dofs.len() {
            return Err(FeaError::MatrixShape {
                rows: matrix.nrows(),
                cols: matrix.ncols(),
                expected_rows: constrained_dofs.len(),
                expected_cols: retained_dofs.len(),
            });
        }
        Ok(Self {
            tag,
            constrained,
            retained,
            constrained_dofs,
            retained_dofs,
            matrix,
            attached: false,
        })
    }

    /// The constrained (driven) node.
    #[must_use]
    pub fn constrained_node(&self) -> NodeId {
        self.constrained
    }

    /// The retained (driving) node.
    #[must_use]
    pub fn retained_node(&self) -> NodeId {
        self.retained
    }

    /// Constrained DOF indices, one per matrix row.
    #[must_use]
    pub fn constrained_dofs(&self) -> &[usize] {
        &self.constrained_dofs
    }

    /// Retained DOF indices, one per matrix column.
    #[must_use]
    pub fn retained_dofs(&self) -> &[usize] {
        &self.retained_dofs
    }

    /// The coefficient matrix.
    #[must_use]
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Verify the referenced nodes and mark attached.
    ///
    /// Missing nodes are logged and left unresolved; the constraint
    /// still enters the attached state.
    pub fn attach<S: NodalState>(&mut self, nodes: &S) {
        for node in [self.constrained, self.retained] {
            if !nodes.contains_node(node) {
                tracing::error!("multi-point {} names missing {}", self.tag, node);
            }
        }
        self.attached = true;
    }

    /// Clear the attached state.
    pub fn detach(&mut self) {
        self.attached = false;
    }
}

impl Constraint for MpConstraint {
    fn tag(&self) -> ConstraintTag {
        self.tag
    }

    fn kind(&self) -> ConstraintKind {
        ConstraintKind::MultiPoint
    }

    fn referenced_nodes(&self) -> Vec<NodeId> {
        vec![self.constrained, self.retained]
    }

    fn is_attached(&self) -> bool {
        self.attached
    }
}

/// The multi-point store's tagged variant.
///
/// The store is strongly typed: only these three shapes can enter it,
/// so no downcasting is ever needed to recover the concrete behavior.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MultiPoint {
    /// Constant-matrix multi-point constraint.
    Linear(MpConstraint),
    /// Planar rigid joint with a geometry-dependent matrix.
    Joint2d(RigidJoint2d),
    /// Spatial rigid joint with a geometry-dependent matrix.
    Joint3d(RigidJoint3d),
}

impl MultiPoint {
    /// The constrained (driven) node.
    #[must_use]
    pub fn constrained_node(&self) -> NodeId {
        match self {
            Self::Linear(mp) => mp.constrained_node(),
            Self::Joint2d(j) => j.constrained_node(),
            Self::Joint3d(j) => j.constrained_node(),
        }
    }

    /// The retained (driving) node.
    #[must_use]
    pub fn retained_node(&self) -> NodeId {
        match self {
            Self::Linear(mp) => mp.retained_node(),
            Self::Joint2d(j) => j.retained_node(),
            Self::Joint3d(j) => j.retained_node(),
        }
    }

    /// Constrained DOF indices, one per matrix row.
    #[must_use]
    pub fn constrained_dofs(&self) -> Vec<usize> {
        match self {
            Self::Linear(mp) => mp.constrained_dofs().to_vec(),
            Self::Joint2d(_) => vec![0, 1, 2],
            Self::Joint3d(_) => (0..6).collect(),
        }
    }

    /// Retained DOF columns as `(node, dof)` pairs in column order.
    #[must_use]
    pub fn retained_dof_columns(&self) -> Vec<(NodeId, usize)> {
        match self {
            Self::Linear(mp) => mp
                .retained_dofs()
                .iter()
                .map(|&dof| (mp.retained_node(), dof))
                .collect(),
            Self::Joint2d(j) => (0..3).map(|dof| (j.retained_node(), dof)).collect(),
            Self::Joint3d(j) => (0..6).map(|dof| (j.retained_node(), dof)).collect(),
        }
    }

    /// Whether the matrix is a function of current geometry.
    #[must_use]
    pub fn is_time_varying(&self) -> bool {
        match self {
            Self::Linear(_) => false,
            Self::Joint2d(j) => j.is_time_varying(),
            Self::Joint3d(j) => j.is_time_varying(),
        }
    }

    /// The current coefficient matrix without any correction.
    #[must_use]
    pub fn matrix(&self) -> &DMatrix<f64> {
        match self {
            Self::Linear(mp) => mp.matrix(),
            Self::Joint2d(j) => j.matrix(),
            Self::Joint3d(j) => j.matrix(),
        }
    }

    /// Retrieve the coefficient matrix, letting correcting joints
    /// re-project their trial geometry first.
    pub fn coefficient_matrix<S: NodalState>(&mut self, nodes: &mut S) -> &DMatrix<f64> {
        match self {
            Self::Linear(mp) => mp.matrix(),
            Self::Joint2d(j) => j.coefficient_matrix(nodes),
            Self::Joint3d(j) => j.coefficient_matrix(nodes),
        }
    }

    /// Resolve node references and build any initial matrix.
    pub fn attach<S: NodalState>(&mut self, nodes: &S) {
        match self {
            Self::Linear(mp) => mp.attach(nodes),
            Self::Joint2d(j) => j.attach(nodes),
            Self::Joint3d(j) => j.attach(nodes),
        }
    }

    /// Clear the attached state.
    pub fn detach(&mut self) {
        match self {
            Self::Linear(mp) => mp.detach(),
            Self::Joint2d(j) => j.detach(),
            Self::Joint3d(j) => j.detach(),
        }
    }

    /// Per-step matrix recomputation for time-varying variants.
    pub fn update<S: NodalState>(&mut self, nodes: &S, time: f64) {
        match self {
            Self::Linear(_) => {}
            Self::Joint2d(j) => j.update(nodes, time),
            Self::Joint3d(j) => j.update(nodes, time),
        }
    }

    /// Short variant label used in diagnostics.
    #[must_use]
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Linear(_) => "linear",
            Self::Joint2d(_) => "joint-2d",
            Self::Joint3d(_) => "joint-3d",
        }
    }
}

impl Constraint for MultiPoint {
    fn tag(&self) -> ConstraintTag {
        match self {
            Self::Linear(mp) => mp.tag(),
            Self::Joint2d(j) => j.tag(),
            Self::Joint3d(j) => j.tag(),
        }
    }

    fn kind(&self) -> ConstraintKind {
        ConstraintKind::MultiPoint
    }

    fn referenced_nodes(&self) -> Vec<NodeId> {
        match self {
            Self::Linear(mp) => mp.referenced_nodes(),
            Self::Joint2d(j) => j.referenced_nodes(),
            Self::Joint3d(j) => j.referenced_nodes(),
        }
    }

    fn is_attached(&self) -> bool {
        match self {
            Self::Linear(mp) => mp.is_attached(),
            Self::Joint2d(j) => j.is_attached(),
            Self::Joint3d(j) => j.is_attached(),
        }
    }
}

impl From<MpConstraint> for MultiPoint {
    fn from(mp: MpConstraint) -> Self {
        Self::Linear(mp)
    }
}

impl From<RigidJoint2d> for MultiPoint {
    fn from(joint: RigidJoint2d) -> Self {
        Self::Joint2d(joint)
    }
}

impl From<RigidJoint3d> for MultiPoint {
    fn from(joint: RigidJoint3d) -> Self {
        Self::Joint3d(joint)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::LargeDispMode;

    fn equal_dof_mp() -> MpConstraint {
        MpConstraint::new(
            ConstraintTag::new(1),
            NodeId::new(2),
            NodeId::new(1),
            vec![0, 1],
            vec![0, 1],
            DMatrix::identity(2, 2),
        )
        .unwrap()
    }

    #[test]
    fn test_matrix_shape_validated() {
        let bad = MpConstraint::new(
            ConstraintTag::new(1),
            NodeId::new(2),
            NodeId::new(1),
            vec![0, 1],
            vec![0, 1, 2],
            DMatrix::identity(2, 2),
        );
        assert!(matches!(bad, Err(FeaError::MatrixShape { .. })));
    }

    #[test]
    fn test_linear_is_constant() {
        let mp = MultiPoint::from(equal_dof_mp());
        assert!(!mp.is_time_varying());
        assert_eq!(mp.variant_name(), "linear");
        assert_eq!(mp.constrained_node(), NodeId::new(2));
        assert_eq!(mp.retained_node(), NodeId::new(1));
    }

    #[test]
    fn test_variant_delegation() {
        let joint = RigidJoint2d::new(
            ConstraintTag::new(7),
            NodeId::new(1),
            NodeId::new(2),
            LargeDispMode::TimeVarying,
        );
        let mp = MultiPoint::from(joint);
        assert_eq!(mp.tag(), ConstraintTag::new(7));
        assert!(mp.is_time_varying());
        assert_eq!(mp.variant_name(), "joint-2d");
        assert_eq!(
            mp.referenced_nodes(),
            vec![NodeId::new(2), NodeId::new(1)]
        );
    }
}
