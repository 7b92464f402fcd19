//! The constraint container.
//!
//! [`ConstraintDomain`] owns the three constraint stores, the two
//! active-case registries, and the node registry they all resolve
//! against. It drives the fixed per-step update order and keeps the
//! node back-reference index consistent with every add, attach,
//! remove, and purge.

use std::collections::BTreeMap;
use std::fmt;

use fea_constraint::{Constraint, MrmpConstraint, MultiPoint, NodalState, SpConstraint};
use fea_types::{
    CaseTag, ConstraintKind, ConstraintRef, ConstraintTag, FeaError, NodeId, RegistryConfig,
    Result,
};
use nalgebra::{DMatrix, DVector};

use crate::{
    ActiveCases, ElementalLoad, LoadCase, LockCase, NodalLoad, Node, NodeRegistry,
};

/// The constraint container: stores, case registries, and the node
/// registry, with the per-step apply order.
#[derive(Debug, Clone, Default)]
pub struct ConstraintDomain {
    /// Container hints.
    config: RegistryConfig,
    /// Nodes, element existence, and the back-reference index.
    nodes: NodeRegistry,
    /// Single-point constraints in tag order.
    sps: BTreeMap<ConstraintTag, SpConstraint>,
    /// Multi-point constraints (including rigid joints) in tag order.
    mps: BTreeMap<ConstraintTag, MultiPoint>,
    /// Multi-row-multi-point constraints in tag order.
    mrmps: BTreeMap<ConstraintTag, MrmpConstraint>,
    /// Mounted load cases.
    load_cases: ActiveCases<LoadCase>,
    /// Mounted locking cases.
    lock_cases: ActiveCases<LockCase>,
    /// Running total of single-point constraints owned by mounted cases.
    mounted_sp_count: usize,
}

impl ConstraintDomain {
    /// Create an empty container with default hints.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create an empty container with explicit hints.
    #[must_use]
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            config,
            nodes: NodeRegistry::with_config(&config),
            sps: BTreeMap::new(),
            mps: BTreeMap::new(),
            mrmps: BTreeMap::new(),
            load_cases: ActiveCases::new(config.log_duplicates),
            lock_cases: ActiveCases::new(config.log_duplicates),
            mounted_sp_count: 0,
        }
    }

    /// The container hints.
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// The node registry.
    #[must_use]
    pub fn nodes(&self) -> &NodeRegistry {
        &self.nodes
    }

    /// The node registry, mutably.
    #[must_use]
    pub fn nodes_mut(&mut self) -> &mut NodeRegistry {
        &mut self.nodes
    }

    /// Add a node to the registry.
    ///
    /// # Errors
    ///
    /// Returns [`FeaError::DuplicateTag`] if the id is taken.
    pub fn add_node(&mut self, node: Node) -> Result<()> {
        self.nodes.add_node(node)
    }

    // =========================================================================
    // Single-point store
    // =========================================================================

    /// Add a single-point constraint. Establishes no back-references;
    /// those happen at attach.
    ///
    /// # Errors
    ///
    /// Returns [`FeaError::DuplicateTag`] if the tag is taken; the
    /// store and the object are unchanged.
    pub fn add_sp(&mut self, sp: SpConstraint) -> Result<()> {
        let tag = sp.tag();
        if self.sps.contains_key(&tag) {
            if self.config.log_duplicates {
                tracing::warn!("single-point {tag} already stored, add refused");
            }
            return Err(FeaError::duplicate("single-point", tag.raw()));
        }
        self.sps.insert(tag, sp);
        Ok(())
    }

    /// Attach a stored single-point constraint: verify its node and
    /// register the back-reference. A missing node is logged and the
    /// back-reference skipped.
    ///
    /// # Errors
    ///
    /// Returns [`FeaError::UnknownConstraint`] if the tag is not
    /// stored.
    pub fn attach_sp(&mut self, tag: ConstraintTag) -> Result<()> {
        let sp = self.sps.get_mut(&tag).ok_or(FeaError::UnknownConstraint {
            kind: ConstraintKind::SinglePoint,
            tag,
        })?;
        sp.attach(&self.nodes);
        let node = sp.node();
        self.nodes
            .register_ref(node, ConstraintRef::new(ConstraintKind::SinglePoint, tag));
        Ok(())
    }

    /// Remove a single-point constraint, detaching it and dropping its
    /// back-reference first.
    pub fn remove_sp(&mut self, tag: ConstraintTag) -> Option<SpConstraint> {
        let mut sp = self.sps.remove(&tag)?;
        self.nodes
            .unregister_ref(sp.node(), ConstraintRef::new(ConstraintKind::SinglePoint, tag));
        sp.detach();
        Some(sp)
    }

    /// Get a single-point constraint by tag.
    #[must_use]
    pub fn sp(&self, tag: ConstraintTag) -> Option<&SpConstraint> {
        self.sps.get(&tag)
    }

    /// Iterate over single-point constraints in tag order. Each call
    /// produces a fresh, independently restartable traversal.
    pub fn sps(&self) -> impl Iterator<Item = &SpConstraint> {
        self.sps.values()
    }

    // =========================================================================
    // Multi-point store
    // =========================================================================

    /// Add a multi-point constraint or rigid joint.
    ///
    /// # Errors
    ///
    /// Returns [`FeaError::DuplicateTag`] if the tag is taken.
    pub fn add_mp(&mut self, mp: impl Into<MultiPoint>) -> Result<()> {
        let mp = mp.into();
        let tag = mp.tag();
        if self.mps.contains_key(&tag) {
            if self.config.log_duplicates {
                tracing::warn!("multi-point {tag} already stored, add refused");
            }
            return Err(FeaError::duplicate("multi-point", tag.raw()));
        }
        self.mps.insert(tag, mp);
        Ok(())
    }

    /// Attach a stored multi-point constraint: resolve its nodes,
    /// build any initial joint matrix, and register back-references on
    /// every node that exists.
    ///
    /// # Errors
    ///
    /// Returns [`FeaError::UnknownConstraint`] if the tag is not
    /// stored.
    pub fn attach_mp(&mut self, tag: ConstraintTag) -> Result<()> {
        let mp = self.mps.get_mut(&tag).ok_or(FeaError::UnknownConstraint {
            kind: ConstraintKind::MultiPoint,
            tag,
        })?;
        mp.attach(&self.nodes);
        let referenced = mp.referenced_nodes();
        for node in referenced {
            self.nodes
                .register_ref(node, ConstraintRef::new(ConstraintKind::MultiPoint, tag));
        }
        Ok(())
    }

    /// Remove a multi-point constraint, detaching it and dropping its
    /// back-references first.
    pub fn remove_mp(&mut self, tag: ConstraintTag) -> Option<MultiPoint> {
        let mut mp = self.mps.remove(&tag)?;
        for node in mp.referenced_nodes() {
            self.nodes
                .unregister_ref(node, ConstraintRef::new(ConstraintKind::MultiPoint, tag));
        }
        mp.detach();
        Some(mp)
    }

    /// Get a multi-point constraint by tag.
    #[must_use]
    pub fn mp(&self, tag: ConstraintTag) -> Option<&MultiPoint> {
        self.mps.get(&tag)
    }

    /// Get a multi-point constraint by tag, mutably (for corrected
    /// matrix retrieval).
    #[must_use]
    pub fn mp_mut(&mut self, tag: ConstraintTag) -> Option<&mut MultiPoint> {
        self.mps.get_mut(&tag)
    }

    /// Retrieve a multi-point coefficient matrix, letting correcting
    /// joints re-project their trial geometry first.
    pub fn mp_coefficient_matrix(&mut self, tag: ConstraintTag) -> Option<&DMatrix<f64>> {
        let mp = self.mps.get_mut(&tag)?;
        Some(mp.coefficient_matrix(&mut self.nodes))
    }

    /// Iterate over multi-point constraints in tag order.
    pub fn mps(&self) -> impl Iterator<Item = &MultiPoint> {
        self.mps.values()
    }

    // =========================================================================
    // Multi-row-multi-point store
    // =========================================================================

    /// Add a multi-row-multi-point constraint.
    ///
    /// # Errors
    ///
    /// Returns [`FeaError::DuplicateTag`] if the tag is taken.
    pub fn add_mrmp(&mut self, mrmp: MrmpConstraint) -> Result<()> {
        let tag = mrmp.tag();
        if self.mrmps.contains_key(&tag) {
            if self.config.log_duplicates {
                tracing::warn!("multi-row-multi-point {tag} already stored, add refused");
            }
            return Err(FeaError::duplicate("multi-row-multi-point", tag.raw()));
        }
        self.mrmps.insert(tag, mrmp);
        Ok(())
    }

    /// Attach a stored multi-row-multi-point constraint.
    ///
    /// # Errors
    ///
    /// Returns [`FeaError::UnknownConstraint`] if the tag is not
    /// stored.
    pub fn attach_mrmp(&mut self, tag: ConstraintTag) -> Result<()> {
        let mrmp = self.mrmps.get_mut(&tag).ok_or(FeaError::UnknownConstraint {
            kind: ConstraintKind::MultiRowMultiPoint,
            tag,
        })?;
        mrmp.attach(&self.nodes);
        let referenced = mrmp.referenced_nodes();
        for node in referenced {
            self.nodes.register_ref(
                node,
                ConstraintRef::new(ConstraintKind::MultiRowMultiPoint, tag),
            );
        }
        Ok(())
    }

    /// Remove a multi-row-multi-point constraint.
    pub fn remove_mrmp(&mut self, tag: ConstraintTag) -> Option<MrmpConstraint> {
        let mut mrmp = self.mrmps.remove(&tag)?;
        for node in mrmp.referenced_nodes() {
            self.nodes.unregister_ref(
                node,
                ConstraintRef::new(ConstraintKind::MultiRowMultiPoint, tag),
            );
        }
        mrmp.detach();
        Some(mrmp)
    }

    /// Get a multi-row-multi-point constraint by tag.
    #[must_use]
    pub fn mrmp(&self, tag: ConstraintTag) -> Option<&MrmpConstraint> {
        self.mrmps.get(&tag)
    }

    /// Iterate over multi-row-multi-point constraints in tag order.
    pub fn mrmps(&self) -> impl Iterator<Item = &MrmpConstraint> {
        self.mrmps.values()
    }

    // =========================================================================
    // Case registries
    // =========================================================================

    /// Mount a load case.
    ///
    /// # Errors
    ///
    /// Returns [`FeaError::DuplicateTag`] if the tag is mounted.
    pub fn add_load_case(&mut self, case: LoadCase) -> Result<()> {
        let count = case.sp_count();
        self.load_cases.add(case)?;
        self.mounted_sp_count += count;
        Ok(())
    }

    /// Unmount a load case, returning its owned single-point count.
    pub fn remove_load_case(&mut self, tag: CaseTag) -> Option<usize> {
        let (_, count) = self.load_cases.remove(tag)?;
        self.mounted_sp_count -= count;
        Some(count)
    }

    /// Unmount every load case, returning the summed single-point
    /// count across them.
    pub fn remove_all_load_cases(&mut self) -> usize {
        let count = self.load_cases.remove_all();
        self.mounted_sp_count -= count;
        count
    }

    /// Mount a locking case.
    ///
    /// # Errors
    ///
    /// Returns [`FeaError::DuplicateTag`] if the tag is mounted.
    pub fn add_lock_case(&mut self, case: LockCase) -> Result<()> {
        let count = case.sp_count();
        self.lock_cases.add(case)?;
        self.mounted_sp_count += count;
        Ok(())
    }

    /// Unmount a locking case, returning its owned single-point count.
    pub fn remove_lock_case(&mut self, tag: CaseTag) -> Option<usize> {
        let (_, count) = self.lock_cases.remove(tag)?;
        self.mounted_sp_count -= count;
        Some(count)
    }

    /// Unmount every locking case, returning the summed single-point
    /// count across them.
    pub fn remove_all_lock_cases(&mut self) -> usize {
        let count = self.lock_cases.remove_all();
        self.mounted_sp_count -= count;
        count
    }

    /// Get a mounted load case by tag.
    #[must_use]
    pub fn load_case(&self, tag: CaseTag) -> Option<&LoadCase> {
        self.load_cases.get(tag)
    }

    /// Get a mounted locking case by tag.
    #[must_use]
    pub fn lock_case(&self, tag: CaseTag) -> Option<&LockCase> {
        self.lock_cases.get(tag)
    }

    /// Iterate over mounted load cases in tag order.
    pub fn load_cases(&self) -> impl Iterator<Item = &LoadCase> {
        self.load_cases.iter()
    }

    /// Iterate over mounted locking cases in tag order.
    pub fn lock_cases(&self) -> impl Iterator<Item = &LockCase> {
        self.lock_cases.iter()
    }

    /// Add a single-point constraint to a mounted load case.
    ///
    /// # Errors
    ///
    /// Returns [`FeaError::UnknownCase`] for an unmounted tag and the
    /// case's duplicate-tag refusal unchanged.
    pub fn add_case_sp(&mut self, case: CaseTag, sp: SpConstraint) -> Result<()> {
        let target = self
            .load_cases
            .get_mut(case)
            .ok_or(FeaError::UnknownCase(case))?;
        target.add_sp(sp)?;
        self.mounted_sp_count += 1;
        Ok(())
    }

    /// Add a single-point constraint to a mounted locking case.
    ///
    /// # Errors
    ///
    /// Returns [`FeaError::UnknownCase`] for an unmounted tag and the
    /// case's duplicate-tag refusal unchanged.
    pub fn add_lock_case_sp(&mut self, case: CaseTag, sp: SpConstraint) -> Result<()> {
        let target = self
            .lock_cases
            .get_mut(case)
            .ok_or(FeaError::UnknownCase(case))?;
        target.add_sp(sp)?;
        self.mounted_sp_count += 1;
        Ok(())
    }

    /// Route a nodal load into a mounted load case, verifying the node
    /// exists first.
    ///
    /// # Errors
    ///
    /// Returns [`FeaError::UnknownCase`] for an unmounted tag and
    /// [`FeaError::UnknownNode`] (logged) for a missing node; the case
    /// is unchanged in both.
    pub fn add_nodal_load(&mut self, case: CaseTag, load: NodalLoad) -> Result<()> {
        if !self.nodes.contains_node(load.node()) {
            tracing::error!("nodal load {} names missing {}", load.tag(), load.node());
            return Err(FeaError::UnknownNode(load.node()));
        }
        let target = self
            .load_cases
            .get_mut(case)
            .ok_or(FeaError::UnknownCase(case))?;
        target.add_nodal_load(load)
    }

    /// Route an elemental load into a mounted load case, verifying the
    /// element exists first.
    ///
    /// # Errors
    ///
    /// Returns [`FeaError::UnknownCase`] for an unmounted tag and
    /// [`FeaError::UnknownElement`] (logged) for a missing element.
    pub fn add_elemental_load(&mut self, case: CaseTag, load: ElementalLoad) -> Result<()> {
        if !self.nodes.has_element(load.element()) {
            tracing::error!(
                "elemental load {} names missing {}",
                load.tag(),
                load.element()
            );
            return Err(FeaError::UnknownElement(load.element()));
        }
        let target = self
            .load_cases
            .get_mut(case)
            .ok_or(FeaError::UnknownCase(case))?;
        target.add_elemental_load(load)
    }

    // =========================================================================
    // Composite views and queries
    // =========================================================================

    /// Every single-point constraint owned by the domain, then every
    /// one owned by a mounted load case, in that order, without
    /// materializing a merged collection.
    pub fn domain_and_case_sps(&self) -> impl Iterator<Item = &SpConstraint> {
        self.sps
            .values()
            .chain(self.load_cases.iter().flat_map(LoadCase::sps))
    }

    /// The number of stored single-point constraints.
    #[must_use]
    pub fn num_sps(&self) -> usize {
        self.sps.len()
    }

    /// The number of stored multi-point constraints.
    #[must_use]
    pub fn num_mps(&self) -> usize {
        self.mps.len()
    }

    /// The number of stored multi-row-multi-point constraints.
    #[must_use]
    pub fn num_mrmps(&self) -> usize {
        self.mrmps.len()
    }

    /// The number of mounted load cases.
    #[must_use]
    pub fn num_load_cases(&self) -> usize {
        self.load_cases.len()
    }

    /// The number of mounted locking cases.
    #[must_use]
    pub fn num_lock_cases(&self) -> usize {
        self.lock_cases.len()
    }

    /// The running total of single-point constraints owned by mounted
    /// cases of both registries.
    #[must_use]
    pub fn num_mounted_case_sps(&self) -> usize {
        self.mounted_sp_count
    }

    /// The constraints recorded against a node, in store order.
    #[must_use]
    pub fn tags_for_node(&self, node: NodeId) -> Vec<ConstraintRef> {
        self.nodes.refs_for(node).collect()
    }

    /// Whether any stored single-point constraint names the node.
    /// Stops at the first match.
    #[must_use]
    pub fn is_node_constrained_by_sps(&self, node: NodeId) -> bool {
        self.sps.values().any(|sp| sp.node() == node)
    }

    /// Whether any stored multi-point constraint names the node.
    /// Stops at the first match.
    #[must_use]
    pub fn is_node_constrained_by_mps(&self, node: NodeId) -> bool {
        self.mps
            .values()
            .any(|mp| mp.constrained_node() == node || mp.retained_node() == node)
    }

    /// Whether any stored multi-row-multi-point constraint names the
    /// node. Stops at the first match.
    #[must_use]
    pub fn is_node_constrained_by_mrmps(&self, node: NodeId) -> bool {
        self.mrmps.values().any(|mrmp| {
            mrmp.constrained_node() == node
                || mrmp.retained().iter().any(|block| block.node == node)
        })
    }

    // =========================================================================
    // Per-step update
    // =========================================================================

    /// Apply all mounted cases and constraints for one step.
    ///
    /// Fixed order: locking cases first, then load cases, then
    /// multi-point, multi-row-multi-point, and domain single-point
    /// constraints. Locking and loading establish the nodal state the
    /// geometrically nonlinear constraints read when rebuilding their
    /// matrices.
    pub fn apply_load(&mut self, time: f64) {
        for case in self.lock_cases.iter() {
            case.apply(&mut self.nodes);
        }
        for case in self.load_cases.iter() {
            case.apply_load(&mut self.nodes, time);
        }
        for mp in self.mps.values_mut() {
            mp.update(&self.nodes, time);
        }
        for mrmp in self.mrmps.values_mut() {
            mrmp.update(&self.nodes, time);
        }
        for sp in self.sps.values() {
            if let Err(err) = sp.apply(&mut self.nodes, time) {
                tracing::error!("skipping single-point {}: {err}", sp.tag());
            }
        }
    }

    /// Accumulate multi-point resisting forces into nodal reactions.
    ///
    /// Each relation transfers the applied force at its constrained
    /// DOFs through the transposed coefficient matrix onto the
    /// retained DOFs' reactions, and subtracts it from the constrained
    /// node's. Components smaller than `tol` are chopped to zero
    /// afterwards. `include_inertia` is accepted for the owning
    /// domain's contract; the mesh owns all mass, so it has no effect
    /// here.
    ///
    /// # Errors
    ///
    /// Never fails today; the `Result` keeps the surface uniform with
    /// the other fallible container operations.
    pub fn calculate_nodal_reactions(&mut self, include_inertia: bool, tol: f64) -> Result<()> {
        let _ = include_inertia;
        for mp in self.mps.values() {
            accumulate_reaction(
                &mut self.nodes,
                mp.constrained_node(),
                &mp.constrained_dofs(),
                &mp.retained_dof_columns(),
                mp.matrix(),
            );
        }
        for mrmp in self.mrmps.values() {
            let columns: Vec<(NodeId, usize)> = mrmp
                .retained()
                .iter()
                .flat_map(|block| block.dofs.iter().map(move |&dof| (block.node, dof)))
                .collect();
            accumulate_reaction(
                &mut self.nodes,
                mrmp.constrained_node(),
                mrmp.constrained_dofs(),
                &columns,
                mrmp.matrix(),
            );
        }
        if tol > 0.0 {
            for id in self.nodes.node_ids().collect::<Vec<_>>() {
                if let Some(node) = self.nodes.node_mut(id) {
                    node.chop_reaction(tol);
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Node-destruction cleanup
    // =========================================================================

    /// Remove a node and every constraint that names it, clearing all
    /// back-references. Returns the removed node.
    pub fn purge_node(&mut self, id: NodeId) -> Option<Node> {
        let (node, refs) = self.nodes.remove_node(id)?;
        for cref in refs {
            match cref.kind {
                ConstraintKind::SinglePoint => {
                    self.remove_sp(cref.tag);
                }
                ConstraintKind::MultiPoint => {
                    self.remove_mp(cref.tag);
                }
                ConstraintKind::MultiRowMultiPoint => {
                    self.remove_mrmp(cref.tag);
                }
            }
        }
        Some(node)
    }

    /// The diagnostic dump, identical to the [`fmt::Display`] output.
    #[must_use]
    pub fn dump(&self) -> String {
        self.to_string()
    }
}

/// Transfer one relation's constrained-DOF applied force onto the
/// retained DOFs' reactions through the transposed matrix.
fn accumulate_reaction(
    nodes: &mut NodeRegistry,
    constrained: NodeId,
    cdofs: &[usize],
    columns: &[(NodeId, usize)],
    matrix: &DMatrix<f64>,
) {
    let Some(node) = nodes.node(constrained) else {
        tracing::error!("reaction pass skipping vanished {constrained}");
        return;
    };
    let mut force = DVector::zeros(cdofs.len());
    for (row, &dof) in cdofs.iter().enumerate() {
        if dof < node.ndof() {
            force[row] = node.applied()[dof];
        }
    }

    let transfer = matrix.transpose() * &force;
    for (col, &(retained, dof)) in columns.iter().enumerate() {
        let Some(target) = nodes.node_mut(retained) else {
            tracing::error!("reaction pass skipping vanished {retained}");
            continue;
        };
        if let Err(err) = target.add_reaction(dof, transfer[col]) {
            tracing::error!("reaction pass skipping {retained}: {err}");
        }
    }
    if let Some(driven) = nodes.node_mut(constrained) {
        for (row, &dof) in cdofs.iter().enumerate() {
            if dof < driven.ndof() {
                if let Err(err) = driven.add_reaction(dof, -force[row]) {
                    tracing::error!("reaction pass skipping {constrained}: {err}");
                }
            }
        }
    }
}

impl fmt::Display for ConstraintDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "constraint domain: {} nodes, {} single-point, {} multi-point, \
             {} multi-row-multi-point, {} load cases, {} locking cases",
            self.nodes.len(),
            self.sps.len(),
            self.mps.len(),
            self.mrmps.len(),
            self.load_cases.len(),
            self.lock_cases.len(),
        )?;
        for sp in self.sps.values() {
            writeln!(
                f,
                "  single-point {}: {} dof {} value {}",
                sp.tag(),
                sp.node(),
                sp.dof(),
                sp.value()
            )?;
        }
        for mp in self.mps.values() {
            writeln!(
                f,
                "  multi-point {} ({}): {} driven by {}",
                mp.tag(),
                mp.variant_name(),
                mp.constrained_node(),
                mp.retained_node()
            )?;
        }
        for mrmp in self.mrmps.values() {
            writeln!(
                f,
                "  multi-row-multi-point {}: {} driven by {} nodes",
                mrmp.tag(),
                mrmp.constrained_node(),
                mrmp.retained().len()
            )?;
        }
        for case in self.load_cases.iter() {
            writeln!(
                f,
                "  load case {}{}: {} constraints, {} nodal loads, {} elemental loads",
                case.tag(),
                case.name().map(|n| format!(" ({n})")).unwrap_or_default(),
                case.sp_count(),
                case.nodal_loads().count(),
                case.elemental_loads().count()
            )?;
        }
        for case in self.lock_cases.iter() {
            writeln!(
                f,
                "  locking case {}{}: {} constraints",
                case.tag(),
                case.name().map(|n| format!(" ({n})")).unwrap_or_default(),
                case.sp_count()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use fea_constraint::{LargeDispMode, RigidJoint2d};
    use fea_types::LoadTag;

    fn planar_pair() -> ConstraintDomain {
        let mut domain = ConstraintDomain::new();
        domain.add_node(Node::planar(NodeId::new(1), 0.0, 0.0)).unwrap();
        domain.add_node(Node::planar(NodeId::new(2), 3.0, 4.0)).unwrap();
        domain
    }

    #[test]
    fn test_duplicate_sp_add_refused() {
        let mut domain = planar_pair();
        domain
            .add_sp(SpConstraint::fixed(ConstraintTag::new(1), NodeId::new(1), 2))
            .unwrap();
        let err = domain
            .add_sp(SpConstraint::fixed(ConstraintTag::new(1), NodeId::new(2), 0))
            .unwrap_err();
        assert!(err.is_duplicate());
        assert_eq!(domain.num_sps(), 1);
        // The stored object kept its original node
        assert_eq!(domain.sp(ConstraintTag::new(1)).unwrap().node(), NodeId::new(1));
    }

    #[test]
    fn test_attach_registers_back_reference() {
        let mut domain = planar_pair();
        domain
            .add_sp(SpConstraint::fixed(ConstraintTag::new(1), NodeId::new(1), 0))
            .unwrap();
        assert!(domain.tags_for_node(NodeId::new(1)).is_empty());

        domain.attach_sp(ConstraintTag::new(1)).unwrap();
        let refs = domain.tags_for_node(NodeId::new(1));
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].kind, ConstraintKind::SinglePoint);

        domain.remove_sp(ConstraintTag::new(1)).unwrap();
        assert!(domain.tags_for_node(NodeId::new(1)).is_empty());
    }

    #[test]
    fn test_attach_unknown_tag() {
        let mut domain = planar_pair();
        let err = domain.attach_sp(ConstraintTag::new(9)).unwrap_err();
        assert!(matches!(err, FeaError::UnknownConstraint { .. }));
    }

    #[test]
    fn test_joint_attach_builds_matrix() {
        let mut domain = planar_pair();
        domain
            .add_mp(RigidJoint2d::new(
                ConstraintTag::new(1),
                NodeId::new(1),
                NodeId::new(2),
                LargeDispMode::Constant,
            ))
            .unwrap();
        domain.attach_mp(ConstraintTag::new(1)).unwrap();

        let mp = domain.mp(ConstraintTag::new(1)).unwrap();
        // Offset (3, 4): rotation coupling entries are (-dy, dx)
        assert_eq!(mp.matrix()[(0, 2)], -4.0);
        assert_eq!(mp.matrix()[(1, 2)], 3.0);
        // Both nodes carry the back-reference
        assert_eq!(domain.tags_for_node(NodeId::new(1)).len(), 1);
        assert_eq!(domain.tags_for_node(NodeId::new(2)).len(), 1);
    }

    #[test]
    fn test_constant_matrix_idempotent_update() {
        let mut domain = planar_pair();
        domain
            .add_mp(RigidJoint2d::new(
                ConstraintTag::new(1),
                NodeId::new(1),
                NodeId::new(2),
                LargeDispMode::Constant,
            ))
            .unwrap();
        domain.attach_mp(ConstraintTag::new(1)).unwrap();

        let before = domain.mp(ConstraintTag::new(1)).unwrap().matrix().clone();
        domain.apply_load(1.0);
        domain.apply_load(1.0);
        let after = domain.mp(ConstraintTag::new(1)).unwrap().matrix();
        assert_eq!(&before, after);
    }

    #[test]
    fn test_composite_sp_view_order_and_restart() {
        let mut domain = planar_pair();
        domain
            .add_sp(SpConstraint::fixed(ConstraintTag::new(1), NodeId::new(1), 0))
            .unwrap();
        domain
            .add_sp(SpConstraint::fixed(ConstraintTag::new(2), NodeId::new(1), 1))
            .unwrap();

        let mut case = LoadCase::new(CaseTag::new(1));
        for (tag, dof) in [(1, 0), (2, 1), (3, 2)] {
            case.add_sp(SpConstraint::fixed(ConstraintTag::new(tag), NodeId::new(2), dof))
                .unwrap();
        }
        domain.add_load_case(case).unwrap();

        // Domain's own constraints first, then the mounted case's
        let first: Vec<NodeId> = domain.domain_and_case_sps().map(SpConstraint::node).collect();
        assert_eq!(first.len(), 5);
        assert_eq!(&first[..2], &[NodeId::new(1), NodeId::new(1)]);
        assert_eq!(&first[2..], &[NodeId::new(2), NodeId::new(2), NodeId::new(2)]);

        // Independent restart yields the same traversal
        let second: Vec<NodeId> = domain.domain_and_case_sps().map(SpConstraint::node).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_case_removal_reports_count() {
        let mut domain = planar_pair();
        let mut case = LockCase::new(CaseTag::new(4));
        case.add_sp(SpConstraint::fixed(ConstraintTag::new(1), NodeId::new(1), 0))
            .unwrap();
        case.add_sp(SpConstraint::fixed(ConstraintTag::new(2), NodeId::new(1), 1))
            .unwrap();
        domain.add_lock_case(case).unwrap();
        assert_eq!(domain.num_mounted_case_sps(), 2);

        assert_eq!(domain.remove_lock_case(CaseTag::new(4)), Some(2));
        assert_eq!(domain.num_lock_cases(), 0);
        assert_eq!(domain.num_mounted_case_sps(), 0);
        assert_eq!(domain.remove_lock_case(CaseTag::new(4)), None);
    }

    #[test]
    fn test_nodal_load_routing_validates() {
        let mut domain = planar_pair();
        domain.add_load_case(LoadCase::new(CaseTag::new(1))).unwrap();

        let missing_node = domain.add_nodal_load(
            CaseTag::new(1),
            NodalLoad::new(LoadTag::new(1), NodeId::new(99), DVector::zeros(3)),
        );
        assert!(matches!(missing_node, Err(FeaError::UnknownNode(_))));

        let missing_case = domain.add_nodal_load(
            CaseTag::new(9),
            NodalLoad::new(LoadTag::new(1), NodeId::new(1), DVector::zeros(3)),
        );
        assert!(matches!(missing_case, Err(FeaError::UnknownCase(_))));

        domain
            .add_nodal_load(
                CaseTag::new(1),
                NodalLoad::new(LoadTag::new(1), NodeId::new(1), DVector::zeros(3)),
            )
            .unwrap();
    }

    #[test]
    fn test_purge_node_drops_constraints() {
        let mut domain = planar_pair();
        domain
            .add_sp(SpConstraint::fixed(ConstraintTag::new(1), NodeId::new(1), 0))
            .unwrap();
        domain.attach_sp(ConstraintTag::new(1)).unwrap();
        domain
            .add_mp(RigidJoint2d::new(
                ConstraintTag::new(1),
                NodeId::new(1),
                NodeId::new(2),
                LargeDispMode::Constant,
            ))
            .unwrap();
        domain.attach_mp(ConstraintTag::new(1)).unwrap();

        domain.purge_node(NodeId::new(1)).unwrap();
        assert_eq!(domain.num_sps(), 0);
        assert_eq!(domain.num_mps(), 0);
        // The surviving node reports no dangling back-reference
        assert!(domain.tags_for_node(NodeId::new(2)).is_empty());
    }

    #[test]
    fn test_node_affected_queries() {
        let mut domain = planar_pair();
        domain
            .add_sp(SpConstraint::fixed(ConstraintTag::new(1), NodeId::new(1), 0))
            .unwrap();
        domain
            .add_mp(RigidJoint2d::new(
                ConstraintTag::new(1),
                NodeId::new(1),
                NodeId::new(2),
                LargeDispMode::Constant,
            ))
            .unwrap();

        assert!(domain.is_node_constrained_by_sps(NodeId::new(1)));
        assert!(!domain.is_node_constrained_by_sps(NodeId::new(2)));
        assert!(domain.is_node_constrained_by_mps(NodeId::new(1)));
        assert!(domain.is_node_constrained_by_mps(NodeId::new(2)));
        assert!(!domain.is_node_constrained_by_mrmps(NodeId::new(1)));
    }

    #[test]
    fn test_dump_lists_population() {
        let mut domain = planar_pair();
        domain
            .add_sp(SpConstraint::fixed(ConstraintTag::new(1), NodeId::new(1), 2))
            .unwrap();
        domain
            .add_lock_case(LockCase::new(CaseTag::new(7)).with_name("stage-1"))
            .unwrap();

        let dump = domain.dump();
        assert!(dump.contains("1 single-point"));
        assert!(dump.contains("Tag(1)"));
        assert!(dump.contains("stage-1"));
    }
}
