//! Nodes, the node registry, and the back-reference index.
//!
//! The registry models exactly what the constraint subsystem consumes
//! from the owning analysis domain: node lookup, reference positions,
//! committed/trial displacement state, load and reaction accumulators,
//! element existence for load routing, and the bidirectional
//! node-to-constraint back-reference index. Nodes never own
//! constraints and constraints never own nodes; the index is the only
//! link between them.

use std::collections::BTreeSet;

use fea_constraint::NodalState;
use fea_types::{ConstraintRef, ElementId, FeaError, NodeId, RegistryConfig, Result};
use hashbrown::HashMap;
use nalgebra::{DVector, Point3};

/// A mesh node's state slice visible to the constraint subsystem.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Unique identifier.
    id: NodeId,
    /// Reference (undeformed) position; planar models leave z at zero.
    position: Point3<f64>,
    /// DOF count: 3 for planar nodes, 6 for spatial nodes.
    ndof: usize,
    /// Displacement from the last converged step.
    committed: DVector<f64>,
    /// Displacement for the current iteration.
    trial: DVector<f64>,
    /// Accumulated applied load (cleared by the caller per step).
    applied: DVector<f64>,
    /// Accumulated reaction force.
    reaction: DVector<f64>,
}

impl Node {
    /// Create a node with an explicit DOF count.
    #[must_use]
    pub fn new(id: NodeId, position: Point3<f64>, ndof: usize) -> Self {
        Self {
            id,
            position,
            ndof,
            committed: DVector::zeros(ndof),
            trial: DVector::zeros(ndof),
            applied: DVector::zeros(ndof),
            reaction: DVector::zeros(ndof),
        }
    }

    /// Create a planar node with `(ux, uy, rz)` DOFs.
    #[must_use]
    pub fn planar(id: NodeId, x: f64, y: f64) -> Self {
        Self::new(id, Point3::new(x, y, 0.0), 3)
    }

    /// Create a spatial node with six DOFs.
    #[must_use]
    pub fn spatial(id: NodeId, x: f64, y: f64, z: f64) -> Self {
        Self::new(id, Point3::new(x, y, z), 6)
    }

    /// The node's identifier.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The reference position.
    #[must_use]
    pub fn position(&self) -> Point3<f64> {
        self.position
    }

    /// The DOF count.
    #[must_use]
    pub fn ndof(&self) -> usize {
        self.ndof
    }

    /// The committed displacement vector.
    #[must_use]
    pub fn committed(&self) -> &DVector<f64> {
        &self.committed
    }

    /// The trial displacement vector.
    #[must_use]
    pub fn trial(&self) -> &DVector<f64> {
        &self.trial
    }

    /// The applied-load accumulator.
    #[must_use]
    pub fn applied(&self) -> &DVector<f64> {
        &self.applied
    }

    /// The reaction accumulator.
    #[must_use]
    pub fn reaction(&self) -> &DVector<f64> {
        &self.reaction
    }

    /// Prescribe one trial displacement component.
    ///
    /// # Errors
    ///
    /// Returns [`FeaError::DofOutOfRange`] for a bad DOF index.
    pub fn set_trial(&mut self, dof: usize, value: f64) -> Result<()> {
        if dof >= self.ndof {
            return Err(FeaError::DofOutOfRange {
                node: self.id,
                dof,
                ndof: self.ndof,
            });
        }
        self.trial[dof] = value;
        Ok(())
    }

    /// Add to the applied-load accumulator at one DOF.
    ///
    /// # Errors
    ///
    /// Returns [`FeaError::DofOutOfRange`] for a bad DOF index.
    pub fn add_applied(&mut self, dof: usize, value: f64) -> Result<()> {
        if dof >= self.ndof {
            return Err(FeaError::DofOutOfRange {
                node: self.id,
                dof,
                ndof: self.ndof,
            });
        }
        self.applied[dof] += value;
        Ok(())
    }

    /// Add to the reaction accumulator at one DOF.
    ///
    /// # Errors
    ///
    /// Returns [`FeaError::DofOutOfRange`] for a bad DOF index.
    pub fn add_reaction(&mut self, dof: usize, value: f64) -> Result<()> {
        if dof >= self.ndof {
            return Err(FeaError::DofOutOfRange {
                node: self.id,
                dof,
                ndof: self.ndof,
            });
        }
        self.reaction[dof] += value;
        Ok(())
    }

    /// Accept the trial displacement as converged.
    pub fn commit(&mut self) {
        self.committed.copy_from(&self.trial);
    }

    /// Discard the trial displacement.
    pub fn revert_to_committed(&mut self) {
        self.trial.copy_from(&self.committed);
    }

    /// Zero the applied-load accumulator.
    pub fn clear_applied(&mut self) {
        self.applied.fill(0.0);
    }

    /// Zero the reaction accumulator.
    pub fn clear_reaction(&mut self) {
        self.reaction.fill(0.0);
    }

    /// Zero reaction components smaller in magnitude than `tol`.
    pub fn chop_reaction(&mut self, tol: f64) {
        for value in self.reaction.iter_mut() {
            if value.abs() < tol {
                *value = 0.0;
            }
        }
    }
}

/// The node registry: nodes, element existence, and the back-reference
/// index.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    /// All nodes, indexed by id.
    nodes: HashMap<NodeId, Node>,
    /// Back-reference index: node -> constraints that name it.
    refs: HashMap<NodeId, BTreeSet<ConstraintRef>>,
    /// Elemental-load accumulators for registered elements.
    element_loads: HashMap<ElementId, DVector<f64>>,
}

impl NodeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-sized from container hints.
    #[must_use]
    pub fn with_config(config: &RegistryConfig) -> Self {
        Self {
            nodes: HashMap::with_capacity(config.node_capacity),
            refs: HashMap::with_capacity(config.node_capacity),
            element_loads: HashMap::with_capacity(config.element_capacity),
        }
    }

    /// Add a node.
    ///
    /// # Errors
    ///
    /// Returns [`FeaError::DuplicateTag`] if the id is taken.
    pub fn add_node(&mut self, node: Node) -> Result<()> {
        let id = node.id();
        if self.nodes.contains_key(&id) {
            return Err(FeaError::duplicate("node", id.raw()));
        }
        self.nodes.insert(id, node);
        Ok(())
    }

    /// Get a node by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Get a mutable reference to a node by id.
    #[must_use]
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Remove a node, returning it together with its back-reference
    /// set so the caller can detach the constraints that named it.
    pub fn remove_node(&mut self, id: NodeId) -> Option<(Node, BTreeSet<ConstraintRef>)> {
        let node = self.nodes.remove(&id)?;
        let refs = self.refs.remove(&id).unwrap_or_default();
        Some((node, refs))
    }

    /// The number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the registry holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over all node ids.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Accept every node's trial displacement as converged.
    pub fn commit_all(&mut self) {
        for node in self.nodes.values_mut() {
            node.commit();
        }
    }

    /// Zero every node's applied-load accumulator.
    pub fn clear_applied_all(&mut self) {
        for node in self.nodes.values_mut() {
            node.clear_applied();
        }
    }

    /// Zero every node's reaction accumulator.
    pub fn clear_reactions(&mut self) {
        for node in self.nodes.values_mut() {
            node.clear_reaction();
        }
    }

    // =========================================================================
    // Back-reference index
    // =========================================================================

    /// Record that a constraint names this node.
    ///
    /// Returns false (and records nothing) if the node does not exist.
    pub fn register_ref(&mut self, node: NodeId, cref: ConstraintRef) -> bool {
        if !self.nodes.contains_key(&node) {
            return false;
        }
        self.refs.entry(node).or_default().insert(cref);
        true
    }

    /// Drop a recorded back-reference. Missing entries are ignored.
    pub fn unregister_ref(&mut self, node: NodeId, cref: ConstraintRef) {
        if let Some(set) = self.refs.get_mut(&node) {
            set.remove(&cref);
            if set.is_empty() {
                self.refs.remove(&node);
            }
        }
    }

    /// The constraints recorded against a node, in store order.
    pub fn refs_for(&self, node: NodeId) -> impl Iterator<Item = ConstraintRef> + '_ {
        self.refs.get(&node).into_iter().flatten().copied()
    }

    // =========================================================================
    // Elements (existence + load routing only)
    // =========================================================================

    /// Register a mesh element id for load routing. Idempotent.
    pub fn register_element(&mut self, id: ElementId) {
        self.element_loads.entry(id).or_insert_with(|| DVector::zeros(0));
    }

    /// Whether an element id is registered.
    #[must_use]
    pub fn has_element(&self, id: ElementId) -> bool {
        self.element_loads.contains_key(&id)
    }

    /// Accumulate `factor * values` onto an element's load accumulator,
    /// growing it as needed.
    ///
    /// # Errors
    ///
    /// Returns [`FeaError::UnknownElement`] for an unregistered id.
    pub fn add_element_load(
        &mut self,
        id: ElementId,
        values: &DVector<f64>,
        factor: f64,
    ) -> Result<()> {
        let Some(acc) = self.element_loads.get_mut(&id) else {
            return Err(FeaError::UnknownElement(id));
        };
        if acc.len() < values.len() {
            let mut grown = DVector::zeros(values.len());
            grown.rows_mut(0, acc.len()).copy_from(acc);
            *acc = grown;
        }
        for (i, value) in values.iter().enumerate() {
            acc[i] += factor * value;
        }
        Ok(())
    }

    /// The accumulated load routed to an element.
    #[must_use]
    pub fn element_load(&self, id: ElementId) -> Option<&DVector<f64>> {
        self.element_loads.get(&id)
    }
}

impl NodalState for NodeRegistry {
    fn contains_node(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    fn ndof(&self, node: NodeId) -> Option<usize> {
        self.nodes.get(&node).map(Node::ndof)
    }

    fn reference_position(&self, node: NodeId) -> Option<Point3<f64>> {
        self.nodes.get(&node).map(Node::position)
    }

    fn committed_displacement(&self, node: NodeId) -> Option<&DVector<f64>> {
        self.nodes.get(&node).map(Node::committed)
    }

    fn trial_displacement(&self, node: NodeId) -> Option<&DVector<f64>> {
        self.nodes.get(&node).map(Node::trial)
    }

    fn set_trial_displacement(&mut self, node: NodeId, dof: usize, value: f64) -> Result<()> {
        self.nodes
            .get_mut(&node)
            .ok_or(FeaError::UnknownNode(node))?
            .set_trial(dof, value)
    }
}
