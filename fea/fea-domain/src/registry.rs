//! The active-case registries.

use std::collections::BTreeMap;

use fea_types::{CaseTag, FeaError, Result};

use crate::{LoadCase, LockCase};

/// A case type that can be mounted in an active-case registry.
pub trait MountedCase {
    /// Store label used in duplicate-tag diagnostics.
    const LABEL: &'static str;

    /// The case's registry tag.
    fn tag(&self) -> CaseTag;

    /// The number of single-point constraints the case owns.
    fn sp_count(&self) -> usize;
}

impl MountedCase for LoadCase {
    const LABEL: &'static str = "load-case";

    fn tag(&self) -> CaseTag {
        LoadCase::tag(self)
    }

    fn sp_count(&self) -> usize {
        LoadCase::sp_count(self)
    }
}

impl MountedCase for LockCase {
    const LABEL: &'static str = "locking-case";

    fn tag(&self) -> CaseTag {
        LockCase::tag(self)
    }

    fn sp_count(&self) -> usize {
        LockCase::sp_count(self)
    }
}

/// An ordered mapping from tag to mounted case.
///
/// A case can exist in an upstream catalog without being mounted; only
/// mounted cases participate in the per-step apply. Removal reports the
/// removed case's owned single-point count so the container can keep an
/// aggregate total without re-scanning.
#[derive(Debug, Clone)]
pub struct ActiveCases<C> {
    /// Mounted cases in tag order.
    cases: BTreeMap<CaseTag, C>,
    /// Whether duplicate adds are logged.
    log_duplicates: bool,
}

impl<C: MountedCase> ActiveCases<C> {
    /// Create an empty registry.
    #[must_use]
    pub fn new(log_duplicates: bool) -> Self {
        Self {
            cases: BTreeMap::new(),
            log_duplicates,
        }
    }

    /// Mount a case.
    ///
    /// # Errors
    ///
    /// Returns [`FeaError::DuplicateTag`] if the tag is already
    /// mounted; the registry is unchanged.
    pub fn add(&mut self, case: C) -> Result<()> {
        let tag = case.tag();
        if self.cases.contains_key(&tag) {
            if self.log_duplicates {
                tracing::debug!("{} {tag} already mounted, add refused", C::LABEL);
            }
            return Err(FeaError::duplicate(C::LABEL, tag.raw()));
        }
        self.cases.insert(tag, case);
        Ok(())
    }

    /// Unmount a case, returning it with its owned single-point count.
    pub fn remove(&mut self, tag: CaseTag) -> Option<(C, usize)> {
        let case = self.cases.remove(&tag)?;
        let count = case.sp_count();
        Some((case, count))
    }

    /// Unmount every case, returning the summed single-point count.
    pub fn remove_all(&mut self) -> usize {
        let total = self.cases.values().map(MountedCase::sp_count).sum();
        self.cases.clear();
        total
    }

    /// Get a mounted case by tag.
    #[must_use]
    pub fn get(&self, tag: CaseTag) -> Option<&C> {
        self.cases.get(&tag)
    }

    /// Get a mutable reference to a mounted case by tag.
    #[must_use]
    pub fn get_mut(&mut self, tag: CaseTag) -> Option<&mut C> {
        self.cases.get_mut(&tag)
    }

    /// Whether a tag is mounted.
    #[must_use]
    pub fn contains(&self, tag: CaseTag) -> bool {
        self.cases.contains_key(&tag)
    }

    /// Iterate over mounted cases in tag order.
    pub fn iter(&self) -> impl Iterator<Item = &C> {
        self.cases.values()
    }

    /// Iterate over mounted tags in order.
    pub fn tags(&self) -> impl Iterator<Item = CaseTag> + '_ {
        self.cases.keys().copied()
    }

    /// The number of mounted cases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Whether no case is mounted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

impl<C: MountedCase> Default for ActiveCases<C> {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use fea_constraint::SpConstraint;
    use fea_types::{ConstraintTag, NodeId};

    fn lock_with_sps(tag: u64, count: u64) -> LockCase {
        let mut case = LockCase::new(CaseTag::new(tag));
        for i in 0..count {
            case.add_sp(SpConstraint::fixed(
                ConstraintTag::new(i + 1),
                NodeId::new(i + 1),
                0,
            ))
            .unwrap();
        }
        case
    }

    #[test]
    fn test_duplicate_mount_refused() {
        let mut registry = ActiveCases::default();
        registry.add(lock_with_sps(1, 0)).unwrap();
        assert!(registry.add(lock_with_sps(1, 2)).unwrap_err().is_duplicate());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_reports_sp_count() {
        let mut registry = ActiveCases::default();
        registry.add(lock_with_sps(1, 3)).unwrap();

        let (case, count) = registry.remove(CaseTag::new(1)).unwrap();
        assert_eq!(case.tag(), CaseTag::new(1));
        assert_eq!(count, 3);
        assert!(!registry.contains(CaseTag::new(1)));
        assert!(registry.remove(CaseTag::new(1)).is_none());
    }

    #[test]
    fn test_remove_all_sums_counts() {
        let mut registry = ActiveCases::default();
        registry.add(lock_with_sps(1, 2)).unwrap();
        registry.add(lock_with_sps(2, 3)).unwrap();

        assert_eq!(registry.remove_all(), 5);
        assert!(registry.is_empty());
        assert_eq!(registry.remove_all(), 0);
    }

    #[test]
    fn test_tag_ordering() {
        let mut registry = ActiveCases::default();
        registry.add(lock_with_sps(3, 0)).unwrap();
        registry.add(lock_with_sps(1, 0)).unwrap();
        registry.add(lock_with_sps(2, 0)).unwrap();

        let tags: Vec<_> = registry.tags().map(CaseTag::raw).collect();
        assert_eq!(tags, vec![1, 2, 3]);
    }
}
