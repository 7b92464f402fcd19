//! Nodal and elemental loads owned by load cases.

use fea_types::{ElementId, LoadTag, NodeId, Result};
use nalgebra::DVector;

use crate::NodeRegistry;

/// A concentrated load on a node, one component per DOF.
#[derive(Debug, Clone, PartialEq)]
pub struct NodalLoad {
    /// Tag within the owning case's load store.
    tag: LoadTag,
    /// The loaded node.
    node: NodeId,
    /// Load components, indexed by DOF.
    values: DVector<f64>,
}

impl NodalLoad {
    /// Create a nodal load.
    #[must_use]
    pub fn new(tag: LoadTag, node: NodeId, values: DVector<f64>) -> Self {
        Self { tag, node, values }
    }

    /// The load's tag.
    #[must_use]
    pub fn tag(&self) -> LoadTag {
        self.tag
    }

    /// The loaded node.
    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The unscaled load components.
    #[must_use]
    pub fn values(&self) -> &DVector<f64> {
        &self.values
    }

    /// Accumulate `factor * values` onto the node's applied load.
    ///
    /// # Errors
    ///
    /// Returns [`fea_types::FeaError::UnknownNode`] if the node is gone.
    pub fn apply(&self, nodes: &mut NodeRegistry, factor: f64) -> Result<()> {
        let node = nodes
            .node_mut(self.node)
            .ok_or(fea_types::FeaError::UnknownNode(self.node))?;
        let count = self.values.len().min(node.ndof());
        for dof in 0..count {
            node.add_applied(dof, factor * self.values[dof])?;
        }
        Ok(())
    }
}

/// A distributed load routed to a mesh element by tag.
///
/// Elements live outside this subsystem; the registry only tracks their
/// existence and accumulates what was routed to each.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementalLoad {
    /// Tag within the owning case's load store.
    tag: LoadTag,
    /// The loaded element.
    element: ElementId,
    /// Load components, meaning defined by the element type.
    values: DVector<f64>,
}

impl ElementalLoad {
    /// Create an elemental load.
    #[must_use]
    pub fn new(tag: LoadTag, element: ElementId, values: DVector<f64>) -> Self {
        Self {
            tag,
            element,
            values,
        }
    }

    /// The load's tag.
    #[must_use]
    pub fn tag(&self) -> LoadTag {
        self.tag
    }

    /// The loaded element.
    #[must_use]
    pub fn element(&self) -> ElementId {
        self.element
    }

    /// The unscaled load components.
    #[must_use]
    pub fn values(&self) -> &DVector<f64> {
        &self.values
    }

    /// Route `factor * values` to the element's accumulator.
    ///
    /// # Errors
    ///
    /// Returns [`fea_types::FeaError::UnknownElement`] for an
    /// unregistered element.
    pub fn apply(&self, nodes: &mut NodeRegistry, factor: f64) -> Result<()> {
        nodes.add_element_load(self.element, &self.values, factor)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::Node;

    #[test]
    fn test_nodal_load_scaled() {
        let mut nodes = NodeRegistry::new();
        nodes.add_node(Node::planar(NodeId::new(1), 0.0, 0.0)).unwrap();

        let load = NodalLoad::new(
            LoadTag::new(1),
            NodeId::new(1),
            DVector::from_vec(vec![10.0, 0.0, 5.0]),
        );
        load.apply(&mut nodes, 0.5).unwrap();
        load.apply(&mut nodes, 0.5).unwrap();

        let applied = nodes.node(NodeId::new(1)).unwrap().applied();
        assert_eq!(applied[0], 10.0);
        assert_eq!(applied[2], 5.0);
    }

    #[test]
    fn test_nodal_load_missing_node() {
        let mut nodes = NodeRegistry::new();
        let load = NodalLoad::new(LoadTag::new(1), NodeId::new(7), DVector::zeros(3));
        assert!(load.apply(&mut nodes, 1.0).is_err());
    }
}
