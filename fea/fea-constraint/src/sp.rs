//! Single-point constraints.

use fea_types::{ConstraintKind, ConstraintTag, NodeId, Result};

use crate::{Constraint, NodalState};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single-point constraint: one DOF of one node held at a prescribed
/// value.
///
/// Used for fixed supports (value zero, homogeneous) and prescribed
/// displacements (nonzero value, scaled by the applying case's factor).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpConstraint {
    /// Tag within the single-point store.
    tag: ConstraintTag,
    /// The constrained node.
    node: NodeId,
    /// The constrained DOF index.
    dof: usize,
    /// Prescribed displacement value.
    value: f64,
    /// Whether the prescribed value is identically zero.
    homogeneous: bool,
    /// Whether the constraint is attached to a domain.
    #[cfg_attr(feature = "serde", serde(skip))]
    attached: bool,
}

impl SpConstraint {
    /// Create a single-point constraint prescribing `value` at the
    /// node's `dof`.
    #[must_use]
    pub fn new(tag: ConstraintTag, node: NodeId, dof: usize, value: f64) -> Self {
        Self {
            tag,
            node,
            dof,
            value,
            homogeneous: value == 0.0,
            attached: false,
        }
    }

    /// Create a fixed support (prescribed value zero).
    #[must_use]
    pub fn fixed(tag: ConstraintTag, node: NodeId, dof: usize) -> Self {
        Self::new(tag, node, dof, 0.0)
    }

    /// The constrained node.
    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The constrained DOF index.
    #[must_use]
    pub fn dof(&self) -> usize {
        self.dof
    }

    /// The prescribed value before scaling.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Whether the prescribed value is identically zero.
    #[must_use]
    pub fn is_homogeneous(&self) -> bool {
        self.homogeneous
    }

    /// Verify the referenced node against a domain and mark attached.
    ///
    /// A missing node is logged and its reference left unresolved; the
    /// constraint still enters the attached state.
    pub fn attach<S: NodalState>(&mut self, nodes: &S) {
        if !nodes.contains_node(self.node) {
            tracing::error!("single-point {} names missing {}", self.tag, self.node);
        }
        self.attached = true;
    }

    /// Clear the attached state.
    pub fn detach(&mut self) {
        self.attached = false;
    }

    /// Prescribe the trial displacement `value * factor`.
    ///
    /// Homogeneous constraints always prescribe zero regardless of the
    /// factor.
    ///
    /// # Errors
    ///
    /// Propagates the node registry's unknown-node or DOF-range failure.
    pub fn apply<S: NodalState>(&self, nodes: &mut S, factor: f64) -> Result<()> {
        let value = if self.homogeneous {
            0.0
        } else {
            self.value * factor
        };
        nodes.set_trial_displacement(self.node, self.dof, value)
    }
}

impl Constraint for SpConstraint {
    fn tag(&self) -> ConstraintTag {
        self.tag
    }

    fn kind(&self) -> ConstraintKind {
        ConstraintKind::SinglePoint
    }

    fn referenced_nodes(&self) -> Vec<NodeId> {
        vec![self.node]
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
    fn test_fixed_support_is_homogeneous() {
        let sp = SpConstraint::fixed(ConstraintTag::new(1), NodeId::new(5), 2);
        assert!(sp.is_homogeneous());
        assert_eq!(sp.node(), NodeId::new(5));
        assert_eq!(sp.dof(), 2);
        assert_eq!(sp.value(), 0.0);
    }

    #[test]
    fn test_prescribed_value() {
        let sp = SpConstraint::new(ConstraintTag::new(2), NodeId::new(1), 0, 0.01);
        assert!(!sp.is_homogeneous());
        assert_eq!(sp.kind(), ConstraintKind::SinglePoint);
        assert_eq!(sp.referenced_nodes(), vec![NodeId::new(1)]);
    }

    #[test]
    fn test_detached_on_creation() {
        let sp = SpConstraint::fixed(ConstraintTag::new(1), NodeId::new(5), 0);
        assert!(!sp.is_attached());
    }
}
