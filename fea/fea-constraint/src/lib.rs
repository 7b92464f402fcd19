//! Kinematic constraint types for structural analysis.
//!
//! This crate provides the constraint family that relates degrees of
//! freedom of a discretized structural model:
//!
//! - [`SpConstraint`]: Single-point - fixes one DOF of one node
//! - [`MpConstraint`]: Multi-point - couples a constrained node to one
//!   retained node through a coefficient matrix
//! - [`MrmpConstraint`]: Multi-row-multi-point - couples a constrained
//!   node to several retained nodes
//! - [`RigidJoint2d`] / [`RigidJoint3d`]: Rigid-link specializations
//!   whose coefficient matrix depends on current geometry
//!
//! # Constraint Formulation
//!
//! Multi-point constraints enforce a linear relation between DOF sets:
//!
//! ```text
//! u_c = G * u_r       (constrained DOFs driven by retained DOFs)
//! ```
//!
//! where `G` is the coefficient matrix with one row per constrained DOF
//! and one column per retained DOF. Single-point constraints are the
//! degenerate case with a prescribed right-hand side and no matrix.
//!
//! # Lifecycle
//!
//! A constraint is created *detached*: it stores node identifiers but no
//! resolved references. Attaching verifies the identifiers against a
//! [`NodalState`] and (for joints) computes the initial coefficient
//! matrix; a missing node is logged and left unresolved rather than
//! aborting the attachment. Detaching clears the resolved state before
//! removal.
//!
//! # Large Displacements
//!
//! Rigid joints select one of three [`LargeDispMode`]s at construction:
//! a constant matrix, a matrix recomputed from committed displacements
//! every step, or a matrix recomputed from trial displacements with the
//! link re-projected to its initial length on every retrieval.
//!
//! # Example
//!
//! ```
//! use fea_constraint::{LargeDispMode, RigidJoint2d, SpConstraint};
//! use fea_types::{ConstraintTag, NodeId};
//!
//! // Fix DOF 1 of node 4 to zero
//! let support = SpConstraint::fixed(ConstraintTag::new(1), NodeId::new(4), 1);
//! assert!(support.is_homogeneous());
//!
//! // Rigid planar link from retained node 1 to constrained node 2,
//! // recomputed from committed displacements each step
//! let link = RigidJoint2d::new(
//!     ConstraintTag::new(1),
//!     NodeId::new(1),
//!     NodeId::new(2),
//!     LargeDispMode::TimeVarying,
//! );
//! assert_eq!(link.retained_node(), NodeId::new(1));
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]

mod joint;
mod mp;
mod mrmp;
mod nodal;
mod sp;

pub use joint::{LargeDispMode, RigidJoint2d, RigidJoint3d, MIN_REFERENCE_LENGTH};
pub use mp::{MpConstraint, MultiPoint};
pub use mrmp::{MrmpConstraint, RetainedBlock};
pub use nodal::NodalState;
pub use sp::SpConstraint;

use fea_types::{ConstraintKind, ConstraintTag, NodeId};

/// Capability surface shared by every constraint kind.
///
/// Behavior (attach, update, matrix retrieval) stays on the concrete
/// types and the [`MultiPoint`] variant; this trait carries the
/// bookkeeping accessors the container needs from any kind.
pub trait Constraint {
    /// The constraint's tag within its kind's store.
    fn tag(&self) -> ConstraintTag;

    /// The store this constraint belongs to.
    fn kind(&self) -> ConstraintKind;

    /// Every node the constraint names, constrained first.
    fn referenced_nodes(&self) -> Vec<NodeId>;

    /// Whether the constraint is currently attached to a domain.
    fn is_attached(&self) -> bool;
}
