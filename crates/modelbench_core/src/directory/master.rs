//! Master resolution and flag delegation.
//!
//! # Responsibility
//! - Resolve the master record of a containment tree through an injectable
//!   policy.
//! - Delegate every modified/modifiable read and write to that master.
//!
//! # Invariants
//! - Resolution is recomputed on demand; attach/detach can rearrange a tree
//!   at any time, so the result is never cached.
//! - Reading or writing the flags on a non-master record is legal and
//!   forwards to the master.

use crate::directory::{Directory, DirectoryError, DirectoryResult};
use crate::model::record::RecordId;
use crate::model::view::ViewId;
use std::collections::HashSet;

/// Strategy deciding which record owns a tree's modified/modifiable state.
///
/// The rule for when a record counts as having an independent top-level
/// origin is configuration-dependent, so the strategy is injected rather
/// than hard-coded.
pub trait MasterPolicy {
    /// Resolves the master record of the tree containing `record`.
    ///
    /// `record` must be registered; the policy returns `record` itself when
    /// no further resolution applies.
    fn master_of(&self, directory: &Directory, record: RecordId) -> RecordId;
}

/// Walks structural parent links up to the containment root.
#[derive(Debug, Default)]
pub struct StructuralMasterPolicy;

impl MasterPolicy for StructuralMasterPolicy {
    fn master_of(&self, directory: &Directory, record: RecordId) -> RecordId {
        let mut visited = HashSet::new();
        let mut current = record;
        while visited.insert(current) {
            match directory.record(current).and_then(|entry| entry.parent()) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        current
    }
}

/// Prefers a content-declared top-level origin over the structural parent.
///
/// When a record's content names an origin identity that is registered and
/// distinct from the record itself, resolution continues from that origin;
/// otherwise it falls back to the structural walk.
#[derive(Debug, Default)]
pub struct OriginMasterPolicy;

impl MasterPolicy for OriginMasterPolicy {
    fn master_of(&self, directory: &Directory, record: RecordId) -> RecordId {
        let mut visited = HashSet::new();
        let mut current = record;
        while visited.insert(current) {
            let origin = directory
                .record(current)
                .and_then(|entry| entry.content().origin_identity())
                .and_then(|identity| directory.lookup(&identity))
                .filter(|origin| *origin != current && !visited.contains(origin));
            if let Some(origin) = origin {
                current = origin;
                continue;
            }
            match directory.record(current).and_then(|entry| entry.parent()) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        current
    }
}

impl Directory {
    /// Resolves the master record of the tree containing `record`.
    pub fn master_of(&self, record: RecordId) -> DirectoryResult<RecordId> {
        if self.record(record).is_none() {
            return Err(DirectoryError::RecordNotFound(record));
        }
        let policy = self.master_policy();
        Ok(policy.master_of(self, record))
    }

    /// Reads the modified flag through the tree master.
    pub fn is_modified(&self, record: RecordId) -> DirectoryResult<bool> {
        let master = self.master_of(record)?;
        self.record(master)
            .map(|entry| entry.raw_modified())
            .ok_or(DirectoryError::RecordNotFound(master))
    }

    /// Writes the modified flag through the tree master. Idempotent.
    pub fn set_modified(&mut self, record: RecordId, modified: bool) -> DirectoryResult<()> {
        let master = self.master_of(record)?;
        self.record_mut(master)
            .map(|entry| entry.set_raw_modified(modified))
            .ok_or(DirectoryError::RecordNotFound(master))
    }

    /// Reads the modifiable flag through the tree master.
    pub fn is_modifiable(&self, record: RecordId) -> DirectoryResult<bool> {
        let master = self.master_of(record)?;
        self.record(master)
            .map(|entry| entry.raw_modifiable())
            .ok_or(DirectoryError::RecordNotFound(master))
    }

    /// Writes the modifiable flag through the tree master.
    pub fn set_modifiable(&mut self, record: RecordId, modifiable: bool) -> DirectoryResult<()> {
        let master = self.master_of(record)?;
        self.record_mut(master)
            .map(|entry| entry.set_raw_modifiable(modifiable))
            .ok_or(DirectoryError::RecordNotFound(master))
    }

    /// All views of the tree containing `record`, in identity order of their
    /// owning records.
    pub fn tree_views(&self, record: RecordId) -> DirectoryResult<Vec<ViewId>> {
        let master = self.master_of(record)?;
        let policy = self.master_policy();
        let mut views = Vec::new();
        for entry in self.records_matching(|_| true) {
            if policy.master_of(self, entry.id()) == master {
                views.extend_from_slice(entry.views());
            }
        }
        Ok(views)
    }

    /// The master view of the tree containing `record`, when one exists.
    pub fn tree_master_view(&self, record: RecordId) -> DirectoryResult<Option<ViewId>> {
        Ok(self
            .tree_views(record)?
            .into_iter()
            .find(|view_id| self.view(*view_id).is_some_and(|view| view.is_master())))
    }

    /// Whether the tree containing `record` already has a master view.
    pub fn tree_has_master_view(&self, record: RecordId) -> DirectoryResult<bool> {
        Ok(self.tree_master_view(record)?.is_some())
    }
}
