//! Rigid-joint constraints with displacement-dependent matrices.
//!
//! A rigid joint links a constrained node to a retained node through a
//! fixed-length connector. Its coefficient matrix couples the
//! constrained translations to the retained rotation(s) through the
//! current offset between the two nodes, so under large displacements
//! the matrix must be rebuilt as the geometry moves.

use fea_types::{ConstraintKind, ConstraintTag, NodeId};
use nalgebra::{DMatrix, Vector2, Vector3};

use crate::{Constraint, NodalState};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Offsets shorter than this are treated as degenerate geometry.
pub const MIN_REFERENCE_LENGTH: f64 = 1.0e-12;

/// How a rigid joint's coefficient matrix tracks large displacements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LargeDispMode {
    /// Matrix computed once at attach, never recomputed.
    Constant,
    /// Matrix rebuilt from committed displacements on every step.
    TimeVarying,
    /// Matrix rebuilt from trial displacements on every retrieval, with
    /// the constrained node re-projected onto the fixed-length circle
    /// (sphere) about the retained node.
    TimeVaryingCorrected,
}

impl LargeDispMode {
    /// Whether this mode ever rebuilds the matrix after attach.
    #[must_use]
    pub fn is_time_varying(self) -> bool {
        !matches!(self, Self::Constant)
    }
}

// ============================================================================
// Planar rigid joint
// ============================================================================

/// A planar rigid joint between two nodes with `(ux, uy, rz)` DOFs.
///
/// The constrained node's DOFs are driven by the retained node's:
///
/// ```text
/// | ux_c |   | 1  0  -dy | | ux_r |
/// | uy_c | = | 0  1   dx | | uy_r |
/// | rz_c |   | 0  0    1 | | rz_r |
/// ```
///
/// where `(dx, dy)` is the offset from retained to constrained node.
/// The rotation-coupling column `(-dy, dx)` is what makes the matrix
/// geometry-dependent.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RigidJoint2d {
    /// Tag within the multi-point store.
    tag: ConstraintTag,
    /// The retained (driving) node.
    retained: NodeId,
    /// The constrained (driven) node.
    constrained: NodeId,
    /// Large-displacement mode selected at construction.
    mode: LargeDispMode,
    /// Link length at attach; the correction target for
    /// [`LargeDispMode::TimeVaryingCorrected`].
    reference_length: f64,
    /// Current offset from retained to constrained node.
    offset: Vector2<f64>,
    /// Current coefficient matrix (3x3).
    matrix: DMatrix<f64>,
    /// Whether the constraint is attached to a domain.
    #[cfg_attr(feature = "serde", serde(skip))]
    attached: bool,
}

impl RigidJoint2d {
    /// Create a detached planar rigid joint.
    ///
    /// Geometry is resolved at attach; until then the matrix is the
    /// identity and the reference length is zero.
    #[must_use]
    pub fn new(
        tag: ConstraintTag,
        retained: NodeId,
        constrained: NodeId,
        mode: LargeDispMode,
    ) -> Self {
        Self {
            tag,
            retained,
            constrained,
            mode,
            reference_length: 0.0,
            offset: Vector2::zeros(),
            matrix: DMatrix::identity(3, 3),
            attached: false,
        }
    }

    /// The retained (driving) node.
    #[must_use]
    pub fn retained_node(&self) -> NodeId {
        self.retained
    }

    /// The constrained (driven) node.
    #[must_use]
    pub fn constrained_node(&self) -> NodeId {
        self.constrained
    }

    /// The large-displacement mode.
    #[must_use]
    pub fn mode(&self) -> LargeDispMode {
        self.mode
    }

    /// The link length captured at attach.
    #[must_use]
    pub fn reference_length(&self) -> f64 {
        self.reference_length
    }

    /// The current offset from retained to constrained node.
    #[must_use]
    pub fn offset(&self) -> &Vector2<f64> {
        &self.offset
    }

    /// The DOF indices constrained on the driven node.
    #[must_use]
    pub fn constrained_dofs(&self) -> [usize; 3] {
        [0, 1, 2]
    }

    /// Whether the matrix is rebuilt after attach.
    #[must_use]
    pub fn is_time_varying(&self) -> bool {
        self.mode.is_time_varying()
    }

    /// The current coefficient matrix without any correction.
    #[must_use]
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Resolve node geometry and build the initial matrix.
    ///
    /// Each missing node is logged and its reference left unresolved;
    /// the joint still enters the attached state.
    pub fn attach<S: NodalState>(&mut self, nodes: &S) {
        let (Some(pr), Some(pc)) = (
            nodes.reference_position(self.retained),
            nodes.reference_position(self.constrained),
        ) else {
            for node in [self.retained, self.constrained] {
                if !nodes.contains_node(node) {
                    tracing::error!("rigid joint {} names missing {}", self.tag, node);
                }
            }
            self.attached = true;
            return;
        };

        self.offset = Vector2::new(pc.x - pr.x, pc.y - pr.y);
        self.reference_length = self.offset.norm();
        if self.reference_length < MIN_REFERENCE_LENGTH {
            tracing::warn!(
                "rigid joint {} has near-zero reference length {:.3e}",
                self.tag,
                self.reference_length
            );
        }
        self.matrix = planar_link_matrix(&self.offset);
        self.attached = true;
    }

    /// Clear the attached state.
    pub fn detach(&mut self) {
        self.attached = false;
    }

    /// Per-step update.
    ///
    /// [`LargeDispMode::TimeVarying`] rebuilds the matrix from the
    /// committed displacements; the other modes leave it untouched
    /// (constant by definition, or corrected at retrieval instead).
    pub fn update<S: NodalState>(&mut self, nodes: &S, _time: f64) {
        if self.mode != LargeDispMode::TimeVarying {
            return;
        }
        let Some(offset) = self.displaced_offset(nodes, DisplacementField::Committed) else {
            tracing::error!("rigid joint {} update with unresolved nodes", self.tag);
            return;
        };
        self.offset = offset;
        self.matrix = planar_link_matrix(&self.offset);
    }

    /// Retrieve the coefficient matrix, applying the length correction
    /// in [`LargeDispMode::TimeVaryingCorrected`].
    ///
    /// The correction recomputes the offset from trial displacements,
    /// rescales it to the reference length, and writes the corrected
    /// trial displacement back onto the constrained node, so every
    /// iteration sees a link of the original length.
    pub fn coefficient_matrix<S: NodalState>(&mut self, nodes: &mut S) -> &DMatrix<f64> {
        if self.mode == LargeDispMode::TimeVaryingCorrected {
            self.correct_length(nodes);
        }
        &self.matrix
    }

    fn correct_length<S: NodalState>(&mut self, nodes: &mut S) {
        let Some(trial_offset) = self.displaced_offset(nodes, DisplacementField::Trial) else {
            tracing::error!("rigid joint {} correction with unresolved nodes", self.tag);
            return;
        };
        let length = trial_offset.norm();
        if length < MIN_REFERENCE_LENGTH || self.reference_length < MIN_REFERENCE_LENGTH {
            tracing::warn!(
                "rigid joint {} skipping length correction, length {:.3e}",
                self.tag,
                length
            );
            return;
        }

        let corrected = trial_offset * (self.reference_length / length);
        let (Some(pr), Some(pc)) = (
            nodes.reference_position(self.retained),
            nodes.reference_position(self.constrained),
        ) else {
            return;
        };
        let ref_offset = Vector2::new(pc.x - pr.x, pc.y - pr.y);
        let trial_r = match nodes.trial_displacement(self.retained) {
            Some(d) => Vector2::new(d[0], d[1]),
            None => return,
        };
        // (pos_c + trial_c') - (pos_r + trial_r) = corrected
        let trial_c = trial_r + corrected - ref_offset;
        for (dof, value) in [(0, trial_c.x), (1, trial_c.y)] {
            if let Err(err) = nodes.set_trial_displacement(self.constrained, dof, value) {
                tracing::error!("rigid joint {} correction write failed: {err}", self.tag);
                return;
            }
        }
        self.offset = corrected;
        self.matrix = planar_link_matrix(&self.offset);
    }

    fn displaced_offset<S: NodalState>(
        &self,
        nodes: &S,
        field: DisplacementField,
    ) -> Option<Vector2<f64>> {
        let pr = nodes.reference_position(self.retained)?;
        let pc = nodes.reference_position(self.constrained)?;
        let (dr, dc) = match field {
            DisplacementField::Committed => (
                nodes.committed_displacement(self.retained)?,
                nodes.committed_displacement(self.constrained)?,
            ),
            DisplacementField::Trial => (
                nodes.trial_displacement(self.retained)?,
                nodes.trial_displacement(self.constrained)?,
            ),
        };
        Some(Vector2::new(
            (pc.x + dc[0]) - (pr.x + dr[0]),
            (pc.y + dc[1]) - (pr.y + dr[1]),
        ))
    }
}

impl Constraint for RigidJoint2d {
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

/// Which displacement field an offset recomputation reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DisplacementField {
    Committed,
    Trial,
}

/// Build the planar rigid-link matrix from an offset.
fn planar_link_matrix(offset: &Vector2<f64>) -> DMatrix<f64> {
    #[rustfmt::skip]
    let entries = [
        1.0, 0.0, -offset.y,
        0.0, 1.0,  offset.x,
        0.0, 0.0,  1.0,
    ];
    DMatrix::from_row_slice(3, 3, &entries)
}

// ============================================================================
// Spatial rigid joint
// ============================================================================

/// A spatial rigid joint between two nodes with six DOFs each.
///
/// The constrained translations follow the retained node's rigid-body
/// motion, `u_c = u_r + theta_r x d`, and the rotations transfer
/// directly, giving the block matrix `[I | S; 0 | I]` where `S` is the
/// cross-product matrix of the offset `d`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RigidJoint3d {
    /// Tag within the multi-point store.
    tag: ConstraintTag,
    /// The retained (driving) node.
    retained: NodeId,
    /// The constrained (driven) node.
    constrained: NodeId,
    /// Large-displacement mode selected at construction.
    mode: LargeDispMode,
    /// Link length at attach.
    reference_length: f64,
    /// Current offset from retained to constrained node.
    offset: Vector3<f64>,
    /// Current coefficient matrix (6x6).
    matrix: DMatrix<f64>,
    /// Whether the constraint is attached to a domain.
    #[cfg_attr(feature = "serde", serde(skip))]
    attached: bool,
}

impl RigidJoint3d {
    /// Create a detached spatial rigid joint.
    #[must_use]
    pub fn new(
        tag: ConstraintTag,
        retained: NodeId,
        constrained: NodeId,
        mode: LargeDispMode,
    ) -> Self {
        Self {
            tag,
            retained,
            constrained,
            mode,
            reference_length: 0.0,
            offset: Vector3::zeros(),
            matrix: DMatrix::identity(6, 6),
            attached: false,
        }
    }

    /// The retained (driving) node.
    #[must_use]
    pub fn retained_node(&self) -> NodeId {
        self.retained
    }

    /// The constrained (driven) node.
    #[must_use]
    pub fn constrained_node(&self) -> NodeId {
        self.constrained
    }

    /// The large-displacement mode.
    #[must_use]
    pub fn mode(&self) -> LargeDispMode {
        self.mode
    }

    /// The link length captured at attach.
    #[must_use]
    pub fn reference_length(&self) -> f64 {
        self.reference_length
    }

    /// The current offset from retained to constrained node.
    #[must_use]
    pub fn offset(&self) -> &Vector3<f64> {
        &self.offset
    }

    /// Whether the matrix is rebuilt after attach.
    #[must_use]
    pub fn is_time_varying(&self) -> bool {
        self.mode.is_time_varying()
    }

    /// The current coefficient matrix without any correction.
    #[must_use]
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Resolve node geometry and build the initial matrix.
    ///
    /// Logs a warning for a near-zero reference length and for each
    /// rotation axis whose displacement coupling vanishes (offset
    /// parallel to that axis); construction proceeds with the
    /// degenerate values either way.
    pub fn attach<S: NodalState>(&mut self, nodes: &S) {
        let (Some(pr), Some(pc)) = (
            nodes.reference_position(self.retained),
            nodes.reference_position(self.constrained),
        ) else {
            for node in [self.retained, self.constrained] {
                if !nodes.contains_node(node) {
                    tracing::error!("rigid joint {} names missing {}", self.tag, node);
                }
            }
            self.attached = true;
            return;
        };

        self.offset = pc - pr;
        self.reference_length = self.offset.norm();
        if self.reference_length < MIN_REFERENCE_LENGTH {
            tracing::warn!(
                "rigid joint {} has near-zero reference length {:.3e}",
                self.tag,
                self.reference_length
            );
        } else {
            for (axis, name) in [
                (Vector3::x(), "x"),
                (Vector3::y(), "y"),
                (Vector3::z(), "z"),
            ] {
                if self.offset.cross(&axis).norm() < MIN_REFERENCE_LENGTH {
                    tracing::warn!(
                        "rigid joint {} rotation coupling about {name} vanishes",
                        self.tag
                    );
                }
            }
        }
        self.matrix = spatial_link_matrix(&self.offset);
        self.attached = true;
    }

    /// Clear the attached state.
    pub fn detach(&mut self) {
        self.attached = false;
    }

    /// Per-step update; see [`RigidJoint2d::update`].
    pub fn update<S: NodalState>(&mut self, nodes: &S, _time: f64) {
        if self.mode != LargeDispMode::TimeVarying {
            return;
        }
        let Some(offset) = self.displaced_offset(nodes, DisplacementField::Committed) else {
            tracing::error!("rigid joint {} update with unresolved nodes", self.tag);
            return;
        };
        self.offset = offset;
        self.matrix = spatial_link_matrix(&self.offset);
    }

    /// Retrieve the coefficient matrix, applying the length correction
    /// in [`LargeDispMode::TimeVaryingCorrected`]; see
    /// [`RigidJoint2d::coefficient_matrix`].
    pub fn coefficient_matrix<S: NodalState>(&mut self, nodes: &mut S) -> &DMatrix<f64> {
        if self.mode == LargeDispMode::TimeVaryingCorrected {
            self.correct_length(nodes);
        }
        &self.matrix
    }

    fn correct_length<S: NodalState>(&mut self, nodes: &mut S) {
        let Some(trial_offset) = self.displaced_offset(nodes, DisplacementField::Trial) else {
            tracing::error!("rigid joint {} correction with unresolved nodes", self.tag);
            return;
        };
        let length = trial_offset.norm();
        if length < MIN_REFERENCE_LENGTH || self.reference_length < MIN_REFERENCE_LENGTH {
            tracing::warn!(
                "rigid joint {} skipping length correction, length {:.3e}",
                self.tag,
                length
            );
            return;
        }

        let corrected = trial_offset * (self.reference_length / length);
        let (Some(pr), Some(pc)) = (
            nodes.reference_position(self.retained),
            nodes.reference_position(self.constrained),
        ) else {
            return;
        };
        let ref_offset = pc - pr;
        let trial_r = match nodes.trial_displacement(self.retained) {
            Some(d) => Vector3::new(d[0], d[1], d[2]),
            None => return,
        };
        let trial_c = trial_r + corrected - ref_offset;
        for (dof, value) in [(0, trial_c.x), (1, trial_c.y), (2, trial_c.z)] {
            if let Err(err) = nodes.set_trial_displacement(self.constrained, dof, value) {
                tracing::error!("rigid joint {} correction write failed: {err}", self.tag);
                return;
            }
        }
        self.offset = corrected;
        self.matrix = spatial_link_matrix(&self.offset);
    }

    fn displaced_offset<S: NodalState>(
        &self,
        nodes: &S,
        field: DisplacementField,
    ) -> Option<Vector3<f64>> {
        let pr = nodes.reference_position(self.retained)?;
        let pc = nodes.reference_position(self.constrained)?;
        let (dr, dc) = match field {
            DisplacementField::Committed => (
                nodes.committed_displacement(self.retained)?,
                nodes.committed_displacement(self.constrained)?,
            ),
            DisplacementField::Trial => (
                nodes.trial_displacement(self.retained)?,
                nodes.trial_displacement(self.constrained)?,
            ),
        };
        Some(Vector3::new(
            (pc.x + dc[0]) - (pr.x + dr[0]),
            (pc.y + dc[1]) - (pr.y + dr[1]),
            (pc.z + dc[2]) - (pr.z + dr[2]),
        ))
    }
}

impl Constraint for RigidJoint3d {
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

/// Build the spatial rigid-link matrix from an offset.
fn spatial_link_matrix(offset: &Vector3<f64>) -> DMatrix<f64> {
    let mut m = DMatrix::identity(6, 6);
    // u_c = u_r + theta_r x d
    m[(0, 4)] = offset.z;
    m[(0, 5)] = -offset.y;
    m[(1, 3)] = -offset.z;
    m[(1, 5)] = offset.x;
    m[(2, 3)] = offset.y;
    m[(2, 4)] = -offset.x;
    m
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_planar_matrix_entries() {
        let m = planar_link_matrix(&Vector2::new(3.0, 4.0));
        assert_relative_eq!(m[(0, 2)], -4.0, epsilon = 1e-12);
        assert_relative_eq!(m[(1, 2)], 3.0, epsilon = 1e-12);
        assert_relative_eq!(m[(0, 0)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(m[(2, 2)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(m[(2, 0)], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_spatial_matrix_entries() {
        let m = spatial_link_matrix(&Vector3::new(1.0, 2.0, 3.0));
        // Rotation about x couples into uy and uz
        assert_relative_eq!(m[(1, 3)], -3.0, epsilon = 1e-12);
        assert_relative_eq!(m[(2, 3)], 2.0, epsilon = 1e-12);
        // Rotation about z couples into ux and uy
        assert_relative_eq!(m[(0, 5)], -2.0, epsilon = 1e-12);
        assert_relative_eq!(m[(1, 5)], 1.0, epsilon = 1e-12);
        // Rotations transfer directly
        assert_relative_eq!(m[(3, 3)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(m[(4, 4)], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_detached_joint_defaults() {
        let joint = RigidJoint2d::new(
            ConstraintTag::new(1),
            NodeId::new(1),
            NodeId::new(2),
            LargeDispMode::Constant,
        );
        assert!(!joint.is_attached());
        assert!(!joint.is_time_varying());
        assert_eq!(joint.reference_length(), 0.0);
        assert_eq!(joint.matrix(), &DMatrix::identity(3, 3));
    }

    #[test]
    fn test_mode_flags() {
        assert!(!LargeDispMode::Constant.is_time_varying());
        assert!(LargeDispMode::TimeVarying.is_time_varying());
        assert!(LargeDispMode::TimeVaryingCorrected.is_time_varying());
    }
}
