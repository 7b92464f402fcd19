//! Identifier newtypes for mesh entities, constraints, and cases.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Unique identifier for a node in the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeId(pub u64);

impl NodeId {
    /// Create a new node ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

/// Unique identifier for a mesh element.
///
/// Elements are owned by the mesh, outside this subsystem; the id is
/// only used to route elemental loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ElementId(pub u64);

impl ElementId {
    /// Create a new element ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for ElementId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Element({})", self.0)
    }
}

/// Tag of a constraint, unique within one constraint kind's store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConstraintTag(pub u64);

impl ConstraintTag {
    /// Create a new constraint tag.
    #[must_use]
    pub const fn new(tag: u64) -> Self {
        Self(tag)
    }

    /// Get the raw tag value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for ConstraintTag {
    fn from(tag: u64) -> Self {
        Self(tag)
    }
}

impl std::fmt::Display for ConstraintTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tag({})", self.0)
    }
}

/// Tag of a load case or locking case, unique within one case registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CaseTag(pub u64);

impl CaseTag {
    /// Create a new case tag.
    #[must_use]
    pub const fn new(tag: u64) -> Self {
        Self(tag)
    }

    /// Get the raw tag value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for CaseTag {
    fn from(tag: u64) -> Self {
        Self(tag)
    }
}

impl std::fmt::Display for CaseTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Case({})", self.0)
    }
}

/// Tag of a nodal or elemental load within one case's load store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LoadTag(pub u64);

impl LoadTag {
    /// Create a new load tag.
    #[must_use]
    pub const fn new(tag: u64) -> Self {
        Self(tag)
    }

    /// Get the raw tag value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for LoadTag {
    fn from(tag: u64) -> Self {
        Self(tag)
    }
}

impl std::fmt::Display for LoadTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Load({})", self.0)
    }
}

/// The kind of a constraint, used to scope tags and back-references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConstraintKind {
    /// Fixes one DOF of one node to a prescribed value.
    SinglePoint,
    /// Relates DOFs of a constrained node to one retained node.
    MultiPoint,
    /// Relates DOFs of a constrained node to several retained nodes.
    MultiRowMultiPoint,
}

impl ConstraintKind {
    /// Short store label used in diagnostics.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::SinglePoint => "single-point",
            Self::MultiPoint => "multi-point",
            Self::MultiRowMultiPoint => "multi-row-multi-point",
        }
    }
}

impl std::fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A kind-scoped constraint reference, as recorded on nodes.
///
/// Nodes never hold constraint objects; the back-reference index maps a
/// node to the set of `ConstraintRef`s that name it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConstraintRef {
    /// The store the constraint lives in.
    pub kind: ConstraintKind,
    /// The constraint's tag within that store.
    pub tag: ConstraintTag,
}

impl ConstraintRef {
    /// Create a new constraint reference.
    #[must_use]
    pub const fn new(kind: ConstraintKind, tag: ConstraintTag) -> Self {
        Self { kind, tag }
    }
}

impl std::fmt::Display for ConstraintRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.tag)
    }
}
