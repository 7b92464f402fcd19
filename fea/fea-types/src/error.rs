//! Error types for constraint-subsystem operations.

use thiserror::Error;

use crate::{CaseTag, ConstraintKind, ConstraintTag, ElementId, NodeId};

/// Errors that can occur in the constraint subsystem.
///
/// Every failure here is local and recoverable: the specific operation
/// is refused or skipped and no other state changes.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FeaError {
    /// An object with this tag already exists in the named store.
    #[error("duplicate tag {tag} in {store} store")]
    DuplicateTag {
        /// The store that refused the add.
        store: &'static str,
        /// The offending tag value.
        tag: u64,
    },

    /// A referenced node does not exist.
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    /// A referenced mesh element does not exist.
    #[error("unknown element: {0}")]
    UnknownElement(ElementId),

    /// A referenced load or locking case is not mounted or catalogued.
    #[error("unknown case: {0}")]
    UnknownCase(CaseTag),

    /// No constraint with this tag exists in the named kind's store.
    #[error("no {kind} constraint with {tag}")]
    UnknownConstraint {
        /// The store that was searched.
        kind: ConstraintKind,
        /// The missing tag.
        tag: ConstraintTag,
    },

    /// A DOF index exceeds the node's DOF count.
    #[error("dof {dof} out of range for {node} ({ndof} dofs)")]
    DofOutOfRange {
        /// The node being addressed.
        node: NodeId,
        /// The out-of-range DOF index.
        dof: usize,
        /// The node's DOF count.
        ndof: usize,
    },

    /// A coefficient matrix does not match its DOF lists.
    #[error("coefficient matrix is {rows}x{cols}, expected {expected_rows}x{expected_cols}")]
    MatrixShape {
        /// Actual row count.
        rows: usize,
        /// Actual column count.
        cols: usize,
        /// Constrained-DOF count the matrix must have as rows.
        expected_rows: usize,
        /// Retained-DOF count the matrix must have as columns.
        expected_cols: usize,
    },

    /// Geometry too degenerate to proceed.
    #[error("degenerate geometry: {reason}")]
    DegenerateGeometry {
        /// Description of the degenerate quantity.
        reason: String,
    },

    /// An operation this subsystem does not carry yet.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}

impl FeaError {
    /// Create a duplicate-tag error for the named store.
    #[must_use]
    pub fn duplicate(store: &'static str, tag: u64) -> Self {
        Self::DuplicateTag { store, tag }
    }

    /// Create a degenerate-geometry error.
    #[must_use]
    pub fn degenerate(reason: impl Into<String>) -> Self {
        Self::DegenerateGeometry {
            reason: reason.into(),
        }
    }

    /// Check if this is a duplicate-tag refusal.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateTag { .. })
    }

    /// Check if this is an unresolved-reference failure.
    #[must_use]
    pub fn is_unresolved(&self) -> bool {
        matches!(
            self,
            Self::UnknownNode(_) | Self::UnknownElement(_) | Self::UnknownCase(_)
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FeaError::duplicate("single-point", 7);
        assert!(err.to_string().contains("7"));
        assert!(err.to_string().contains("single-point"));

        let err = FeaError::UnknownNode(NodeId::new(3));
        assert!(err.to_string().contains("Node(3)"));

        let err = FeaError::DofOutOfRange {
            node: NodeId::new(1),
            dof: 5,
            ndof: 3,
        };
        assert!(err.to_string().contains("dof 5"));
    }

    #[test]
    fn test_error_predicates() {
        assert!(FeaError::duplicate("multi-point", 1).is_duplicate());
        assert!(!FeaError::duplicate("multi-point", 1).is_unresolved());

        assert!(FeaError::UnknownCase(CaseTag::new(9)).is_unresolved());
        assert!(FeaError::UnknownElement(ElementId::new(2)).is_unresolved());
    }
}
