//! View handle model.

use crate::collab::ViewSurface;
use crate::model::record::RecordId;
use std::sync::Arc;
use uuid::Uuid;

/// Stable in-memory id of one view.
pub type ViewId = Uuid;

/// One visible presentation bound to a document record.
///
/// At most one view per containment tree carries the master flag; it is the
/// view created for the tree's first presentation, and closing it cascades
/// to the tree's sibling views.
pub struct ViewHandle {
    id: ViewId,
    owner: RecordId,
    is_master: bool,
    is_editable: bool,
    surface: Arc<dyn ViewSurface>,
}

impl ViewHandle {
    /// Creates a non-master, editable view over `surface`.
    pub fn new(owner: RecordId, surface: Arc<dyn ViewSurface>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            is_master: false,
            is_editable: true,
            surface,
        }
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn owner(&self) -> RecordId {
        self.owner
    }

    pub fn is_master(&self) -> bool {
        self.is_master
    }

    pub fn is_editable(&self) -> bool {
        self.is_editable
    }

    pub fn surface(&self) -> &Arc<dyn ViewSurface> {
        &self.surface
    }

    /// Brings the presentation to the foreground. Idempotent.
    pub fn show(&self) {
        self.surface.show();
    }

    pub fn set_master(&mut self, master: bool) {
        self.is_master = master;
    }

    /// Sets the editable flag and propagates it to the rendering surface.
    pub fn set_editable(&mut self, editable: bool) {
        self.is_editable = editable;
        self.surface.set_editable(editable);
    }

    /// Releases the presentation resources behind this view.
    pub fn dispose(&self) {
        self.surface.dispose();
    }
}

impl std::fmt::Debug for ViewHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewHandle")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("is_master", &self.is_master)
            .field("is_editable", &self.is_editable)
            .finish()
    }
}
