//! Document record model.
//!
//! # Responsibility
//! - Hold per-document metadata: identity, writable origin, lifecycle flags,
//!   and the containment edges to views and child records.
//!
//! # Invariants
//! - `identity` is assigned exactly once at creation and never mutated.
//! - A record with `is_system == false`, zero views and zero children must
//!   not persist in the directory; the directory's collect pass removes it.
//! - `modified` and `modifiable` are only meaningful on the master record of
//!   a containment tree; reads and writes are delegated there.

use crate::collab::DocumentContent;
use crate::model::identity::ResourceIdentity;
use crate::model::view::ViewId;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Stable in-memory id of one document record.
pub type RecordId = Uuid;

/// Container holding one document record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// The directory's top level.
    Directory,
    /// A parent document record.
    Record(RecordId),
}

/// In-memory metadata for one loaded unit of content.
pub struct DocumentRecord {
    id: RecordId,
    identity: ResourceIdentity,
    content: Arc<dyn DocumentContent>,
    writable_origin: Option<PathBuf>,
    modified: bool,
    modifiable: bool,
    is_system: bool,
    container: Option<Container>,
    children: Vec<RecordId>,
    views: Vec<ViewId>,
}

impl DocumentRecord {
    /// Creates an unregistered record for `identity`.
    pub fn new(identity: ResourceIdentity, content: Arc<dyn DocumentContent>) -> Self {
        Self {
            id: Uuid::new_v4(),
            identity,
            content,
            writable_origin: None,
            modified: false,
            modifiable: true,
            is_system: false,
            container: None,
            children: Vec::new(),
            views: Vec::new(),
        }
    }

    /// Associates the writable origin this record was loaded from.
    pub fn with_writable_origin(mut self, origin: Option<PathBuf>) -> Self {
        self.writable_origin = origin;
        self
    }

    /// Marks this record as a system record, exempt from zero-view removal.
    pub fn as_system(mut self) -> Self {
        self.is_system = true;
        self
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn identity(&self) -> &ResourceIdentity {
        &self.identity
    }

    pub fn content(&self) -> &Arc<dyn DocumentContent> {
        &self.content
    }

    pub fn writable_origin(&self) -> Option<&PathBuf> {
        self.writable_origin.as_ref()
    }

    pub fn is_system(&self) -> bool {
        self.is_system
    }

    pub fn container(&self) -> Option<Container> {
        self.container
    }

    /// Parent record, when contained in one.
    pub fn parent(&self) -> Option<RecordId> {
        match self.container {
            Some(Container::Record(parent)) => Some(parent),
            _ => None,
        }
    }

    /// Child records in attachment order.
    pub fn children(&self) -> &[RecordId] {
        &self.children
    }

    /// Attached views in attachment order.
    pub fn views(&self) -> &[ViewId] {
        &self.views
    }

    /// Whether the directory's collect pass may remove this record.
    pub fn is_abandoned(&self) -> bool {
        !self.is_system && self.views.is_empty() && self.children.is_empty()
    }

    pub(crate) fn set_container(&mut self, container: Option<Container>) {
        self.container = container;
    }

    pub(crate) fn push_child(&mut self, child: RecordId) {
        self.children.push(child);
    }

    pub(crate) fn remove_child(&mut self, child: RecordId) {
        self.children.retain(|id| *id != child);
    }

    pub(crate) fn push_view(&mut self, view: ViewId) {
        self.views.push(view);
    }

    pub(crate) fn remove_view(&mut self, view: ViewId) {
        self.views.retain(|id| *id != view);
    }

    // Raw flag access, reserved for the directory's master delegation.
    pub(crate) fn raw_modified(&self) -> bool {
        self.modified
    }

    pub(crate) fn set_raw_modified(&mut self, modified: bool) {
        self.modified = modified;
    }

    pub(crate) fn raw_modifiable(&self) -> bool {
        self.modifiable
    }

    pub(crate) fn set_raw_modifiable(&mut self, modifiable: bool) {
        self.modifiable = modifiable;
    }
}

impl std::fmt::Debug for DocumentRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentRecord")
            .field("id", &self.id)
            .field("identity", &self.identity)
            .field("kind", &self.content.kind())
            .field("modified", &self.modified)
            .field("modifiable", &self.modifiable)
            .field("is_system", &self.is_system)
            .field("children", &self.children.len())
            .field("views", &self.views.len())
            .finish()
    }
}
