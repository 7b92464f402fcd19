//! The trait seam between constraints and the node registry.

use fea_types::{NodeId, Result};
use nalgebra::{DVector, Point3};

/// Read and prescribe nodal state without owning nodes.
///
/// Constraints hold [`NodeId`]s only; every operation that needs nodal
/// data crosses this seam. The constraint container's node registry is
/// the canonical implementor.
///
/// Displacement vectors are indexed by DOF: planar nodes carry
/// `(ux, uy, rz)`, spatial nodes `(ux, uy, uz, rx, ry, rz)`.
pub trait NodalState {
    /// Whether a node with this id exists.
    fn contains_node(&self, node: NodeId) -> bool;

    /// The node's DOF count, if it exists.
    fn ndof(&self, node: NodeId) -> Option<usize>;

    /// The node's reference (undeformed) position.
    ///
    /// Planar models leave the z component at zero.
    fn reference_position(&self, node: NodeId) -> Option<Point3<f64>>;

    /// The node's committed displacement from the last converged step.
    fn committed_displacement(&self, node: NodeId) -> Option<&DVector<f64>>;

    /// The node's trial displacement for the current iteration.
    fn trial_displacement(&self, node: NodeId) -> Option<&DVector<f64>>;

    /// Prescribe one component of the node's trial displacement.
    ///
    /// # Errors
    ///
    /// Returns [`fea_types::FeaError::UnknownNode`] if the node does not
    /// exist and [`fea_types::FeaError::DofOutOfRange`] if the DOF index
    /// exceeds the node's DOF count.
    fn set_trial_displacement(&mut self, node: NodeId, dof: usize, value: f64) -> Result<()>;
}
