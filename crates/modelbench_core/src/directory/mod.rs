//! Document/view directory.
//!
//! # Responsibility
//! - Own every in-memory document record and view in one arena.
//! - Index records by identity and enforce at most one record per identity.
//! - Report when the index empties, the trigger for process shutdown.
//!
//! # Invariants
//! - The identity index covers every registered record, top-level or nested.
//! - All graph mutation goes through `&mut Directory`; the borrow checker
//!   enforces the serialized-access model the original design assumed.
//! - A removal that empties the index is reported exactly once, in the
//!   teardown report of the operation that caused it.

use crate::directory::master::{MasterPolicy, StructuralMasterPolicy};
use crate::model::identity::ResourceIdentity;
use crate::model::record::{DocumentRecord, RecordId};
use crate::model::view::{ViewHandle, ViewId};
use log::info;
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub mod containment;
pub mod master;

/// Result type used by directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Errors from directory operations.
#[derive(Debug)]
pub enum DirectoryError {
    /// A record with the same identity is already registered. Programmer
    /// error: the lookup discipline was not followed.
    DuplicateIdentity(ResourceIdentity),
    /// Target record is not in the arena.
    RecordNotFound(RecordId),
    /// Proposed container cannot hold the record. Programmer error.
    ContainerRejected {
        record: RecordId,
        details: String,
    },
}

impl Display for DirectoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateIdentity(identity) => {
                write!(f, "identity already registered: {identity}")
            }
            Self::RecordNotFound(id) => write!(f, "document record not found: {id}"),
            Self::ContainerRejected { record, details } => {
                write!(f, "container rejected for record {record}: {details}")
            }
        }
    }
}

impl Error for DirectoryError {}

/// Accumulated effects of one teardown-capable directory operation.
///
/// View surfaces of `removed_views` have already been disposed; the caller
/// forwards `forgotten_origins` to the parser collaborator and reacts to
/// `directory_emptied`.
#[derive(Debug, Default)]
pub struct TeardownReport {
    pub removed_records: Vec<RecordId>,
    pub removed_views: Vec<ViewId>,
    pub forgotten_origins: Vec<String>,
    pub directory_emptied: bool,
}

impl TeardownReport {
    pub(crate) fn absorb(&mut self, other: TeardownReport) {
        self.removed_records.extend(other.removed_records);
        self.removed_views.extend(other.removed_views);
        self.forgotten_origins.extend(other.forgotten_origins);
        self.directory_emptied |= other.directory_emptied;
    }
}

/// Per-record statistics read model.
#[derive(Debug, Clone, Serialize)]
pub struct RecordSummary {
    pub identity: String,
    pub kind: String,
    pub open_views: usize,
    pub children: usize,
    pub modified: bool,
    pub modifiable: bool,
    pub system: bool,
}

/// Directory-wide statistics snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryStatistics {
    pub records: Vec<RecordSummary>,
}

/// Root registry mapping identity to document record.
pub struct Directory {
    records: BTreeMap<RecordId, DocumentRecord>,
    views: BTreeMap<ViewId, ViewHandle>,
    index: BTreeMap<ResourceIdentity, RecordId>,
    master_policy: Arc<dyn MasterPolicy>,
}

impl Directory {
    /// Creates an empty directory with the structural master policy.
    pub fn new() -> Self {
        Self::with_master_policy(Arc::new(StructuralMasterPolicy))
    }

    /// Creates an empty directory with an injected master policy.
    pub fn with_master_policy(master_policy: Arc<dyn MasterPolicy>) -> Self {
        Self {
            records: BTreeMap::new(),
            views: BTreeMap::new(),
            index: BTreeMap::new(),
            master_policy,
        }
    }

    /// Keyed identity lookup. No side effects.
    pub fn lookup(&self, identity: &ResourceIdentity) -> Option<RecordId> {
        self.index.get(identity).copied()
    }

    pub fn record(&self, id: RecordId) -> Option<&DocumentRecord> {
        self.records.get(&id)
    }

    pub(crate) fn record_mut(&mut self, id: RecordId) -> Option<&mut DocumentRecord> {
        self.records.get_mut(&id)
    }

    pub fn view(&self, id: ViewId) -> Option<&ViewHandle> {
        self.views.get(&id)
    }

    pub(crate) fn view_mut(&mut self, id: ViewId) -> Option<&mut ViewHandle> {
        self.views.get_mut(&id)
    }

    /// Number of registered records, nested records included.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of live views across all records.
    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    /// Lazy, finite, restartable sequence of records matching `predicate`.
    ///
    /// Iteration order follows identity order, so repeated runs are
    /// deterministic.
    pub fn records_matching<'a, P>(
        &'a self,
        predicate: P,
    ) -> impl Iterator<Item = &'a DocumentRecord> + 'a
    where
        P: Fn(&DocumentRecord) -> bool + 'a,
    {
        self.index
            .values()
            .filter_map(move |id| self.records.get(id))
            .filter(move |record| predicate(record))
    }

    /// Record ids of the directory's top-level records, in identity order.
    pub fn top_level_records(&self) -> Vec<RecordId> {
        self.records_matching(|record| record.parent().is_none())
            .map(|record| record.id())
            .collect()
    }

    /// Removes the record registered under `identity`, tearing down its
    /// subtree. Returns `None` when the identity is unknown.
    pub fn remove(&mut self, identity: &ResourceIdentity) -> Option<TeardownReport> {
        let id = self.lookup(identity)?;
        info!("event=directory_remove module=directory status=start identity={identity}");
        self.set_container(id, None).ok()
    }

    /// Builds a statistics snapshot over all registered records.
    pub fn statistics(&self) -> DirectoryStatistics {
        let records = self
            .index
            .iter()
            .filter_map(|(identity, id)| {
                let record = self.records.get(id)?;
                Some(RecordSummary {
                    identity: identity.to_string(),
                    kind: record.content().kind().to_string(),
                    open_views: self.number_of_open_views(*id),
                    children: record.children().len(),
                    modified: self.is_modified(*id).unwrap_or(false),
                    modifiable: self.is_modifiable(*id).unwrap_or(false),
                    system: record.is_system(),
                })
            })
            .collect();
        DirectoryStatistics { records }
    }

    pub(crate) fn master_policy(&self) -> Arc<dyn MasterPolicy> {
        self.master_policy.clone()
    }
}

impl Default for Directory {
    fn default() -> Self {
        Self::new()
    }
}
