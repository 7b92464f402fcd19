//! The portable container snapshot and catalog-based re-mount.

use std::collections::BTreeMap;

use fea_constraint::{Constraint, MrmpConstraint, MultiPoint, SpConstraint};
use fea_domain::{ConstraintDomain, LoadCase, LockCase};
use fea_types::{CaseTag, FeaError};
use serde::{Deserialize, Serialize};

/// The upstream case catalog the receiving partition resolves tag
/// lists against.
///
/// The authoritative case objects live here; a container only mounts
/// clones of them, so a tag list is all a snapshot needs to carry.
#[derive(Debug, Clone, Default)]
pub struct CaseCatalog {
    /// Catalogued load cases in tag order.
    load_cases: BTreeMap<CaseTag, LoadCase>,
    /// Catalogued locking cases in tag order.
    lock_cases: BTreeMap<CaseTag, LockCase>,
}

impl CaseCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalogue a load case.
    ///
    /// # Errors
    ///
    /// Returns [`FeaError::DuplicateTag`] if the tag is catalogued.
    pub fn add_load_case(&mut self, case: LoadCase) -> Result<(), FeaError> {
        let tag = case.tag();
        if self.load_cases.contains_key(&tag) {
            return Err(FeaError::duplicate("catalog load-case", tag.raw()));
        }
        self.load_cases.insert(tag, case);
        Ok(())
    }

    /// Catalogue a locking case.
    ///
    /// # Errors
    ///
    /// Returns [`FeaError::DuplicateTag`] if the tag is catalogued.
    pub fn add_lock_case(&mut self, case: LockCase) -> Result<(), FeaError> {
        let tag = case.tag();
        if self.lock_cases.contains_key(&tag) {
            return Err(FeaError::duplicate("catalog locking-case", tag.raw()));
        }
        self.lock_cases.insert(tag, case);
        Ok(())
    }

    /// Resolve a load-case tag.
    #[must_use]
    pub fn load_case(&self, tag: CaseTag) -> Option<&LoadCase> {
        self.load_cases.get(&tag)
    }

    /// Resolve a locking-case tag.
    #[must_use]
    pub fn lock_case(&self, tag: CaseTag) -> Option<&LockCase> {
        self.lock_cases.get(&tag)
    }

    /// The number of catalogued load cases.
    #[must_use]
    pub fn num_load_cases(&self) -> usize {
        self.load_cases.len()
    }

    /// The number of catalogued locking cases.
    #[must_use]
    pub fn num_lock_cases(&self) -> usize {
        self.lock_cases.len()
    }
}

/// A portable snapshot of one container's constraint state.
///
/// Constraint stores are carried by value; case registries are carried
/// as present/absent tag lists (`None` when the sending registry was
/// empty).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireState {
    /// Single-point constraints by value.
    pub sps: Vec<SpConstraint>,
    /// Multi-point constraints by value.
    pub mps: Vec<MultiPoint>,
    /// Multi-row-multi-point constraints by value.
    pub mrmps: Vec<MrmpConstraint>,
    /// Mounted load-case tags, in registry order.
    pub load_case_tags: Option<Vec<CaseTag>>,
    /// Mounted locking-case tags, in registry order.
    pub lock_case_tags: Option<Vec<CaseTag>>,
}

/// Capture a container's constraint state for transmission.
///
/// Spatial rigid joints are not yet carried over the wire; each one is
/// logged and skipped, leaving the rest of the snapshot intact.
#[must_use]
pub fn snapshot(domain: &ConstraintDomain) -> WireState {
    let mps: Vec<MultiPoint> = domain
        .mps()
        .filter(|mp| {
            if matches!(mp, MultiPoint::Joint3d(_)) {
                tracing::warn!("spatial rigid joint {} not sent: unimplemented", mp.tag());
                false
            } else {
                true
            }
        })
        .cloned()
        .collect();

    let load_case_tags: Vec<CaseTag> = domain.load_cases().map(LoadCase::tag).collect();
    let lock_case_tags: Vec<CaseTag> = domain.lock_cases().map(LockCase::tag).collect();

    WireState {
        sps: domain.sps().cloned().collect(),
        mps,
        mrmps: domain.mrmps().cloned().collect(),
        load_case_tags: (!load_case_tags.is_empty()).then_some(load_case_tags),
        lock_case_tags: (!lock_case_tags.is_empty()).then_some(lock_case_tags),
    }
}

/// Replay a received snapshot into a container.
///
/// Constraints are inserted by value and attached against the
/// receiver's nodes. Case tags are resolved through the receiver's
/// catalog; a tag the catalog cannot resolve is logged and skipped,
/// and the rest of the re-mount proceeds. Duplicate tags already
/// present in the receiver are likewise logged and skipped.
pub fn apply_state(domain: &mut ConstraintDomain, catalog: &CaseCatalog, state: WireState) {
    for sp in state.sps {
        let tag = sp.tag();
        match domain.add_sp(sp) {
            Ok(()) => {
                if let Err(err) = domain.attach_sp(tag) {
                    tracing::error!("received single-point {tag} not attached: {err}");
                }
            }
            Err(err) => tracing::error!("received single-point {tag} skipped: {err}"),
        }
    }
    for mp in state.mps {
        let tag = mp.tag();
        match domain.add_mp(mp) {
            Ok(()) => {
                if let Err(err) = domain.attach_mp(tag) {
                    tracing::error!("received multi-point {tag} not attached: {err}");
                }
            }
            Err(err) => tracing::error!("received multi-point {tag} skipped: {err}"),
        }
    }
    for mrmp in state.mrmps {
        let tag = mrmp.tag();
        match domain.add_mrmp(mrmp) {
            Ok(()) => {
                if let Err(err) = domain.attach_mrmp(tag) {
                    tracing::error!("received multi-row-multi-point {tag} not attached: {err}");
                }
            }
            Err(err) => tracing::error!("received multi-row-multi-point {tag} skipped: {err}"),
        }
    }

    for tag in state.load_case_tags.unwrap_or_default() {
        match catalog.load_case(tag) {
            Some(case) => {
                if let Err(err) = domain.add_load_case(case.clone()) {
                    tracing::error!("received load case {tag} not mounted: {err}");
                }
            }
            None => tracing::error!("load case {tag} missing from catalog, skipped"),
        }
    }
    for tag in state.lock_case_tags.unwrap_or_default() {
        match catalog.lock_case(tag) {
            Some(case) => {
                if let Err(err) = domain.add_lock_case(case.clone()) {
                    tracing::error!("received locking case {tag} not mounted: {err}");
                }
            }
            None => tracing::error!("locking case {tag} missing from catalog, skipped"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use fea_constraint::{LargeDispMode, RigidJoint3d};
    use fea_domain::Node;
    use fea_types::{ConstraintTag, NodeId};

    #[test]
    fn test_empty_registries_absent() {
        let domain = ConstraintDomain::new();
        let state = snapshot(&domain);
        assert!(state.load_case_tags.is_none());
        assert!(state.lock_case_tags.is_none());
    }

    #[test]
    fn test_spatial_joint_not_sent() {
        let mut domain = ConstraintDomain::new();
        domain
            .add_node(Node::spatial(NodeId::new(1), 0.0, 0.0, 0.0))
            .unwrap();
        domain
            .add_node(Node::spatial(NodeId::new(2), 1.0, 0.0, 0.0))
            .unwrap();
        domain
            .add_mp(RigidJoint3d::new(
                ConstraintTag::new(1),
                NodeId::new(1),
                NodeId::new(2),
                LargeDispMode::Constant,
            ))
            .unwrap();

        let state = snapshot(&domain);
        assert!(state.mps.is_empty());
        // The sender's own store is untouched
        assert_eq!(domain.num_mps(), 1);
    }

    #[test]
    fn test_unresolvable_case_tag_skipped() {
        let mut catalog = CaseCatalog::new();
        catalog.add_load_case(LoadCase::new(CaseTag::new(1))).unwrap();

        let state = WireState {
            sps: Vec::new(),
            mps: Vec::new(),
            mrmps: Vec::new(),
            load_case_tags: Some(vec![CaseTag::new(1), CaseTag::new(2)]),
            lock_case_tags: None,
        };

        let mut domain = ConstraintDomain::new();
        apply_state(&mut domain, &catalog, state);
        assert_eq!(domain.num_load_cases(), 1);
        assert!(domain.load_case(CaseTag::new(1)).is_some());
    }
}
