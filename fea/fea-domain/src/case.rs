//! Load cases and locking cases.
//!
//! A load case bundles single-point constraints and loads that mount
//! and unmount together; a locking case bundles single-point
//! constraints only, used to freeze DOFs for one analysis stage.

use std::collections::BTreeMap;

use fea_constraint::SpConstraint;
use fea_types::{CaseTag, ConstraintTag, FeaError, LoadTag, Result};

use crate::{ElementalLoad, NodalLoad, NodeRegistry};

/// How a load case scales with pseudo-time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadScale {
    /// Loads scale with the step's pseudo-time.
    Proportional,
    /// Loads keep a frozen factor regardless of pseudo-time.
    Constant {
        /// The frozen scale factor.
        factor: f64,
    },
}

impl LoadScale {
    /// Resolve the scale factor at a pseudo-time.
    #[must_use]
    pub fn factor_at(self, time: f64) -> f64 {
        match self {
            Self::Proportional => time,
            Self::Constant { factor } => factor,
        }
    }
}

/// A named, independently mountable bundle of constraints and loads.
#[derive(Debug, Clone)]
pub struct LoadCase {
    /// Tag within the load-case registry.
    tag: CaseTag,
    /// Optional name for diagnostics.
    name: Option<String>,
    /// Time-scaling behavior.
    scale: LoadScale,
    /// Owned single-point constraints.
    sps: BTreeMap<ConstraintTag, SpConstraint>,
    /// Owned nodal loads.
    nodal_loads: BTreeMap<LoadTag, NodalLoad>,
    /// Owned elemental loads.
    elemental_loads: BTreeMap<LoadTag, ElementalLoad>,
}

impl LoadCase {
    /// Create an empty proportional load case.
    #[must_use]
    pub fn new(tag: CaseTag) -> Self {
        Self {
            tag,
            name: None,
            scale: LoadScale::Proportional,
            sps: BTreeMap::new(),
            nodal_loads: BTreeMap::new(),
            elemental_loads: BTreeMap::new(),
        }
    }

    /// Create an empty constant load case with a frozen factor.
    #[must_use]
    pub fn constant(tag: CaseTag, factor: f64) -> Self {
        Self::new(tag).with_scale(LoadScale::Constant { factor })
    }

    /// Set the case name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the time-scaling behavior.
    #[must_use]
    pub fn with_scale(mut self, scale: LoadScale) -> Self {
        self.scale = scale;
        self
    }

    /// The case's tag.
    #[must_use]
    pub fn tag(&self) -> CaseTag {
        self.tag
    }

    /// The case's name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The time-scaling behavior.
    #[must_use]
    pub fn scale(&self) -> LoadScale {
        self.scale
    }

    /// Add an owned single-point constraint.
    ///
    /// # Errors
    ///
    /// Returns [`FeaError::DuplicateTag`] if the tag is taken within
    /// this case.
    pub fn add_sp(&mut self, sp: SpConstraint) -> Result<()> {
        use fea_constraint::Constraint;
        let tag = sp.tag();
        if self.sps.contains_key(&tag) {
            return Err(FeaError::duplicate("load-case single-point", tag.raw()));
        }
        self.sps.insert(tag, sp);
        Ok(())
    }

    /// Remove an owned single-point constraint.
    pub fn remove_sp(&mut self, tag: ConstraintTag) -> Option<SpConstraint> {
        self.sps.remove(&tag)
    }

    /// Add an owned nodal load.
    ///
    /// # Errors
    ///
    /// Returns [`FeaError::DuplicateTag`] if the tag is taken within
    /// this case.
    pub fn add_nodal_load(&mut self, load: NodalLoad) -> Result<()> {
        let tag = load.tag();
        if self.nodal_loads.contains_key(&tag) {
            return Err(FeaError::duplicate("nodal-load", tag.raw()));
        }
        self.nodal_loads.insert(tag, load);
        Ok(())
    }

    /// Remove an owned nodal load.
    pub fn remove_nodal_load(&mut self, tag: LoadTag) -> Option<NodalLoad> {
        self.nodal_loads.remove(&tag)
    }

    /// Add an owned elemental load.
    ///
    /// # Errors
    ///
    /// Returns [`FeaError::DuplicateTag`] if the tag is taken within
    /// this case.
    pub fn add_elemental_load(&mut self, load: ElementalLoad) -> Result<()> {
        let tag = load.tag();
        if self.elemental_loads.contains_key(&tag) {
            return Err(FeaError::duplicate("elemental-load", tag.raw()));
        }
        self.elemental_loads.insert(tag, load);
        Ok(())
    }

    /// Remove an owned elemental load.
    pub fn remove_elemental_load(&mut self, tag: LoadTag) -> Option<ElementalLoad> {
        self.elemental_loads.remove(&tag)
    }

    /// The number of owned single-point constraints.
    #[must_use]
    pub fn sp_count(&self) -> usize {
        self.sps.len()
    }

    /// Iterate over owned single-point constraints in tag order.
    pub fn sps(&self) -> impl Iterator<Item = &SpConstraint> {
        self.sps.values()
    }

    /// Iterate over owned nodal loads in tag order.
    pub fn nodal_loads(&self) -> impl Iterator<Item = &NodalLoad> {
        self.nodal_loads.values()
    }

    /// Iterate over owned elemental loads in tag order.
    pub fn elemental_loads(&self) -> impl Iterator<Item = &ElementalLoad> {
        self.elemental_loads.values()
    }

    /// Apply the case at a pseudo-time: loads first, then the owned
    /// single-point constraints, all with the resolved factor.
    ///
    /// Failures are local: a load naming a vanished node or element is
    /// logged and skipped, the rest of the case still applies.
    pub fn apply_load(&self, nodes: &mut NodeRegistry, time: f64) {
        let factor = self.scale.factor_at(time);
        for load in self.nodal_loads.values() {
            if let Err(err) = load.apply(nodes, factor) {
                tracing::error!("load case {} skipping nodal load: {err}", self.tag);
            }
        }
        for load in self.elemental_loads.values() {
            if let Err(err) = load.apply(nodes, factor) {
                tracing::error!("load case {} skipping elemental load: {err}", self.tag);
            }
        }
        for sp in self.sps.values() {
            if let Err(err) = sp.apply(nodes, factor) {
                tracing::error!("load case {} skipping constraint: {err}", self.tag);
            }
        }
    }
}

/// A named bundle of single-point constraints that freeze DOFs for one
/// analysis stage.
#[derive(Debug, Clone)]
pub struct LockCase {
    /// Tag within the locking-case registry.
    tag: CaseTag,
    /// Optional name for diagnostics.
    name: Option<String>,
    /// Owned single-point constraints.
    sps: BTreeMap<ConstraintTag, SpConstraint>,
}

impl LockCase {
    /// Create an empty locking case.
    #[must_use]
    pub fn new(tag: CaseTag) -> Self {
        Self {
            tag,
            name: None,
            sps: BTreeMap::new(),
        }
    }

    /// Set the case name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The case's tag.
    #[must_use]
    pub fn tag(&self) -> CaseTag {
        self.tag
    }

    /// The case's name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Add an owned single-point constraint.
    ///
    /// # Errors
    ///
    /// Returns [`FeaError::DuplicateTag`] if the tag is taken within
    /// this case.
    pub fn add_sp(&mut self, sp: SpConstraint) -> Result<()> {
        use fea_constraint::Constraint;
        let tag = sp.tag();
        if self.sps.contains_key(&tag) {
            return Err(FeaError::duplicate("locking-case single-point", tag.raw()));
        }
        self.sps.insert(tag, sp);
        Ok(())
    }

    /// Remove an owned single-point constraint.
    pub fn remove_sp(&mut self, tag: ConstraintTag) -> Option<SpConstraint> {
        self.sps.remove(&tag)
    }

    /// The number of owned single-point constraints.
    #[must_use]
    pub fn sp_count(&self) -> usize {
        self.sps.len()
    }

    /// Iterate over owned single-point constraints in tag order.
    pub fn sps(&self) -> impl Iterator<Item = &SpConstraint> {
        self.sps.values()
    }

    /// Enforce every owned constraint with unit factor.
    ///
    /// Failures are local and logged, matching [`LoadCase::apply_load`].
    pub fn apply(&self, nodes: &mut NodeRegistry) {
        for sp in self.sps.values() {
            if let Err(err) = sp.apply(nodes, 1.0) {
                tracing::error!("locking case {} skipping constraint: {err}", self.tag);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use fea_constraint::NodalState;
    use fea_types::NodeId;
    use nalgebra::DVector;

    use crate::Node;

    #[test]
    fn test_load_scale() {
        assert_eq!(LoadScale::Proportional.factor_at(2.5), 2.5);
        assert_eq!(LoadScale::Constant { factor: 1.0 }.factor_at(2.5), 1.0);
    }

    #[test]
    fn test_case_duplicate_sp_rejected() {
        let mut case = LoadCase::new(CaseTag::new(1));
        case.add_sp(SpConstraint::fixed(ConstraintTag::new(1), NodeId::new(1), 0))
            .unwrap();
        let err = case
            .add_sp(SpConstraint::fixed(ConstraintTag::new(1), NodeId::new(2), 1))
            .unwrap_err();
        assert!(err.is_duplicate());
        assert_eq!(case.sp_count(), 1);
    }

    #[test]
    fn test_constant_case_ignores_time() {
        let mut nodes = NodeRegistry::new();
        nodes.add_node(Node::planar(NodeId::new(1), 0.0, 0.0)).unwrap();

        let mut case = LoadCase::constant(CaseTag::new(1), 1.0);
        case.add_nodal_load(NodalLoad::new(
            LoadTag::new(1),
            NodeId::new(1),
            DVector::from_vec(vec![4.0, 0.0, 0.0]),
        ))
        .unwrap();

        case.apply_load(&mut nodes, 10.0);
        assert_eq!(nodes.node(NodeId::new(1)).unwrap().applied()[0], 4.0);
    }

    #[test]
    fn test_proportional_case_scales() {
        let mut nodes = NodeRegistry::new();
        nodes.add_node(Node::planar(NodeId::new(1), 0.0, 0.0)).unwrap();

        let mut case = LoadCase::new(CaseTag::new(1)).with_name("gravity");
        case.add_nodal_load(NodalLoad::new(
            LoadTag::new(1),
            NodeId::new(1),
            DVector::from_vec(vec![0.0, -9.81, 0.0]),
        ))
        .unwrap();

        case.apply_load(&mut nodes, 2.0);
        assert_eq!(nodes.node(NodeId::new(1)).unwrap().applied()[1], -19.62);
        assert_eq!(case.name(), Some("gravity"));
    }

    #[test]
    fn test_lock_case_prescribes_zero() {
        let mut nodes = NodeRegistry::new();
        nodes.add_node(Node::planar(NodeId::new(1), 0.0, 0.0)).unwrap();
        nodes.set_trial_displacement(NodeId::new(1), 2, 0.7).unwrap();

        let mut lock = LockCase::new(CaseTag::new(1));
        lock.add_sp(SpConstraint::fixed(ConstraintTag::new(1), NodeId::new(1), 2))
            .unwrap();
        lock.apply(&mut nodes);

        assert_eq!(nodes.node(NodeId::new(1)).unwrap().trial()[2], 0.0);
    }
}
