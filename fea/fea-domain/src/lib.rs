//! Constraint container and active-case bookkeeping for structural
//! analysis.
//!
//! This crate provides the data-management layer between a discretized
//! structural model and whatever algorithm enforces its kinematic
//! constraints:
//!
//! - [`ConstraintDomain`]: The container owning the three constraint
//!   stores and the two active-case registries, driving the fixed
//!   per-step update order
//! - [`NodeRegistry`] / [`Node`]: The slice of nodal state constraints
//!   read and prescribe, plus the node-to-constraint back-reference
//!   index
//! - [`LoadCase`] / [`LockCase`]: Named, independently mountable
//!   bundles of constraints and loads
//! - [`ActiveCases`]: The ordered tag-to-case registries
//!
//! # Update Order
//!
//! [`ConstraintDomain::apply_load`] fans out in a fixed order every
//! step: locking cases, load cases, multi-point constraints,
//! multi-row-multi-point constraints, then domain-level single-point
//! constraints. Locking and loading establish the prescribed and trial
//! nodal state that geometrically nonlinear constraints must read when
//! rebuilding their matrices.
//!
//! # Failure Model
//!
//! Every failure is local and recoverable: duplicate-tag adds are
//! refused, operations naming a missing node, element, or case are
//! skipped with a logged error, and nothing aborts the container.
//!
//! # Example
//!
//! ```
//! use fea_constraint::SpConstraint;
//! use fea_domain::{ConstraintDomain, Node};
//! use fea_types::{ConstraintTag, NodeId};
//!
//! let mut domain = ConstraintDomain::new();
//! domain.add_node(Node::planar(NodeId::new(5), 0.0, 0.0))?;
//!
//! domain.add_sp(SpConstraint::fixed(ConstraintTag::new(1), NodeId::new(5), 2))?;
//! domain.attach_sp(ConstraintTag::new(1))?;
//!
//! assert_eq!(domain.num_sps(), 1);
//! assert_eq!(domain.tags_for_node(NodeId::new(5)).len(), 1);
//! # Ok::<(), fea_types::FeaError>(())
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]

mod case;
mod domain;
mod load;
mod node;
mod registry;

pub use case::{LoadCase, LoadScale, LockCase};
pub use domain::ConstraintDomain;
pub use load::{ElementalLoad, NodalLoad};
pub use node::{Node, NodeRegistry};
pub use registry::{ActiveCases, MountedCase};

// Re-export the seam types the container resolves against
pub use fea_constraint::{Constraint, MultiPoint, NodalState};
pub use fea_types::Result;
