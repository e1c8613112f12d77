//! Containment edges and cascading teardown.
//!
//! # Responsibility
//! - Attach and detach views, adopt records into containers, and reparent.
//! - Run the centralized collect pass after every detach/remove so that an
//!   abandoned record chain collapses in one place.
//!
//! # Invariants
//! - Teardown order is views before their record, deepest subtree first.
//! - A record with `is_system == true` survives the collect pass with zero
//!   views and zero children.
//! - Detaching a view that is not attached is a no-op.

use crate::directory::{Directory, DirectoryError, DirectoryResult, TeardownReport};
use crate::model::record::{Container, DocumentRecord, RecordId};
use crate::model::view::{ViewHandle, ViewId};
use log::{debug, info};

impl Directory {
    /// Registers `record` at the directory's top level.
    pub fn register(&mut self, record: DocumentRecord) -> DirectoryResult<RecordId> {
        self.adopt(record, Container::Directory)
    }

    /// Adopts an unregistered `record` into `container`.
    pub fn adopt(&mut self, record: DocumentRecord, container: Container) -> DirectoryResult<RecordId> {
        if let Some(existing) = self.lookup(record.identity()) {
            debug!(
                "event=adopt module=directory status=duplicate identity={} existing={existing}",
                record.identity()
            );
            return Err(DirectoryError::DuplicateIdentity(record.identity().clone()));
        }
        self.validate_container(record.id(), container)?;

        let id = record.id();
        let identity = record.identity().clone();
        let mut record = record;
        record.set_container(Some(container));
        if let Container::Record(parent) = container {
            if let Some(parent_record) = self.record_mut(parent) {
                parent_record.push_child(id);
            }
        }
        self.index.insert(identity.clone(), id);
        self.records.insert(id, record);
        info!("event=adopt module=directory status=ok identity={identity} record={id}");
        Ok(id)
    }

    /// Attaches `view` to its owner record.
    ///
    /// The first view attached to a parentless record whose tree has no
    /// master view yet becomes the tree's master view.
    pub fn attach_view(&mut self, view: ViewHandle) -> DirectoryResult<ViewId> {
        let owner = view.owner();
        let record = self
            .record(owner)
            .ok_or(DirectoryError::RecordNotFound(owner))?;
        let elect_master = record.parent().is_none() && !self.tree_has_master_view(owner)?;

        let id = view.id();
        let mut view = view;
        if elect_master {
            view.set_master(true);
        }
        self.views.insert(id, view);
        if let Some(record) = self.record_mut(owner) {
            record.push_view(id);
        }
        debug!(
            "event=attach_view module=directory status=ok record={owner} view={id} master={elect_master}"
        );
        Ok(id)
    }

    /// Detaches and disposes `view_id`, then runs the collect pass on the
    /// owner chain. Unknown views are a no-op.
    pub fn detach_view(&mut self, view_id: ViewId) -> TeardownReport {
        let mut report = TeardownReport::default();
        let Some(view) = self.views.remove(&view_id) else {
            return report;
        };
        view.dispose();
        report.removed_views.push(view_id);

        let owner = view.owner();
        if let Some(record) = self.record_mut(owner) {
            record.remove_view(view_id);
        }
        debug!("event=detach_view module=directory status=ok record={owner} view={view_id}");
        self.collect_upwards(Some(owner), &mut report);
        self.finish(report)
    }

    /// Moves `record_id` to `target`, or tears its subtree down on `None`.
    pub fn set_container(
        &mut self,
        record_id: RecordId,
        target: Option<Container>,
    ) -> DirectoryResult<TeardownReport> {
        let record = self
            .record(record_id)
            .ok_or(DirectoryError::RecordNotFound(record_id))?;
        let old_parent = record.parent();

        let Some(target) = target else {
            let mut report = TeardownReport::default();
            self.teardown_subtree(record_id, &mut report);
            self.collect_upwards(old_parent, &mut report);
            return Ok(self.finish(report));
        };

        self.validate_container(record_id, target)?;
        if let Some(parent) = old_parent {
            if let Some(parent_record) = self.record_mut(parent) {
                parent_record.remove_child(record_id);
            }
        }
        if let Some(record) = self.record_mut(record_id) {
            record.set_container(Some(target));
        }
        if let Container::Record(parent) = target {
            if let Some(parent_record) = self.record_mut(parent) {
                parent_record.push_child(record_id);
            }
        }

        let mut report = TeardownReport::default();
        self.collect_upwards(old_parent, &mut report);
        Ok(self.finish(report))
    }

    /// Own views plus the recursive sum over child records.
    pub fn number_of_open_views(&self, record_id: RecordId) -> usize {
        let Some(record) = self.record(record_id) else {
            return 0;
        };
        record.views().len()
            + record
                .children()
                .iter()
                .map(|child| self.number_of_open_views(*child))
                .sum::<usize>()
    }

    fn validate_container(&self, record_id: RecordId, container: Container) -> DirectoryResult<()> {
        let Container::Record(parent) = container else {
            return Ok(());
        };
        if parent == record_id {
            return Err(DirectoryError::ContainerRejected {
                record: record_id,
                details: "record cannot contain itself".to_string(),
            });
        }
        let Some(parent_record) = self.record(parent) else {
            return Err(DirectoryError::ContainerRejected {
                record: record_id,
                details: format!("container record {parent} is not registered"),
            });
        };
        if !parent_record.content().accepts_children() {
            return Err(DirectoryError::ContainerRejected {
                record: record_id,
                details: format!(
                    "container record {parent} holds `{}` content without child capability",
                    parent_record.content().kind()
                ),
            });
        }
        if self.is_ancestor(record_id, parent) {
            return Err(DirectoryError::ContainerRejected {
                record: record_id,
                details: format!("record {record_id} is an ancestor of container {parent}"),
            });
        }
        Ok(())
    }

    fn is_ancestor(&self, candidate: RecordId, descendant: RecordId) -> bool {
        let mut cursor = self.record(descendant).and_then(DocumentRecord::parent);
        while let Some(current) = cursor {
            if current == candidate {
                return true;
            }
            cursor = self.record(current).and_then(DocumentRecord::parent);
        }
        false
    }

    fn teardown_subtree(&mut self, record_id: RecordId, report: &mut TeardownReport) {
        let children = match self.record(record_id) {
            Some(record) => record.children().to_vec(),
            None => return,
        };
        for child in children {
            self.teardown_subtree(child, report);
        }

        let views = self
            .record(record_id)
            .map(|record| record.views().to_vec())
            .unwrap_or_default();
        for view_id in views {
            if let Some(view) = self.views.remove(&view_id) {
                view.dispose();
                report.removed_views.push(view_id);
            }
        }

        self.unlink_record(record_id, report);
    }

    fn collect_upwards(&mut self, start: Option<RecordId>, report: &mut TeardownReport) {
        let mut cursor = start;
        while let Some(record_id) = cursor {
            let Some(record) = self.record(record_id) else {
                break;
            };
            if !record.is_abandoned() {
                break;
            }
            cursor = record.parent();
            self.unlink_record(record_id, report);
        }
    }

    fn unlink_record(&mut self, record_id: RecordId, report: &mut TeardownReport) {
        let Some(record) = self.records.remove(&record_id) else {
            return;
        };
        self.index.remove(record.identity());
        if let Some(parent) = record.parent() {
            if let Some(parent_record) = self.record_mut(parent) {
                parent_record.remove_child(record_id);
            }
        }
        if record.writable_origin().is_some() {
            report.forgotten_origins.push(record.identity().to_string());
        }
        info!(
            "event=record_removed module=directory status=ok identity={} record={record_id}",
            record.identity()
        );
        report.removed_records.push(record_id);
    }

    fn finish(&mut self, mut report: TeardownReport) -> TeardownReport {
        if !report.removed_records.is_empty() && self.index.is_empty() {
            report.directory_emptied = true;
            info!("event=directory_emptied module=directory status=ok");
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use crate::collab::text::TextDocumentContent;
    use crate::collab::{DocumentContent, ViewSurface};
    use crate::directory::{Directory, DirectoryError};
    use crate::model::identity::ResourceIdentity;
    use crate::model::record::{Container, DocumentRecord, RecordId};
    use crate::model::view::ViewHandle;
    use std::sync::Arc;

    struct CompositeContent;

    impl DocumentContent for CompositeContent {
        fn kind(&self) -> &'static str {
            "composite"
        }

        fn accepts_children(&self) -> bool {
            true
        }
    }

    struct NullSurface;

    impl ViewSurface for NullSurface {
        fn show(&self) {}
        fn set_editable(&self, _editable: bool) {}
        fn set_title(&self, _identifier: &str) {}
        fn dispose(&self) {}
    }

    fn composite(identity: &str) -> DocumentRecord {
        DocumentRecord::new(ResourceIdentity::new(identity), Arc::new(CompositeContent))
    }

    fn attach_null_view(directory: &mut Directory, owner: RecordId) -> crate::model::view::ViewId {
        directory
            .attach_view(ViewHandle::new(owner, Arc::new(NullSurface)))
            .expect("view attach")
    }

    #[test]
    fn closing_last_view_collapses_empty_ancestor_chain() {
        let mut directory = Directory::new();
        let parent = directory.register(composite("file://p.mdl")).expect("parent");
        let child = directory
            .adopt(composite("file://p.mdl#c"), Container::Record(parent))
            .expect("child");
        let view = attach_null_view(&mut directory, child);

        let report = directory.detach_view(view);
        assert_eq!(report.removed_records.len(), 2);
        assert!(report.directory_emptied);
        assert!(directory.is_empty());
    }

    #[test]
    fn system_record_survives_collect_pass() {
        let mut directory = Directory::new();
        let parent = directory
            .register(composite("file://p.mdl").as_system())
            .expect("parent");
        let child = directory
            .adopt(composite("file://p.mdl#c"), Container::Record(parent))
            .expect("child");
        let view = attach_null_view(&mut directory, child);

        let report = directory.detach_view(view);
        assert_eq!(report.removed_records, vec![child]);
        assert!(!report.directory_emptied);
        assert!(directory.record(parent).is_some());
        assert_eq!(directory.number_of_open_views(parent), 0);
    }

    #[test]
    fn detach_of_unattached_view_is_a_no_op() {
        let mut directory = Directory::new();
        directory
            .register(composite("file://p.mdl").as_system())
            .expect("parent");
        let before = directory.len();

        let report = directory.detach_view(uuid::Uuid::new_v4());
        assert!(report.removed_views.is_empty());
        assert!(report.removed_records.is_empty());
        assert_eq!(directory.len(), before);
    }

    #[test]
    fn content_without_child_capability_rejects_containment() {
        let mut directory = Directory::new();
        let text = directory
            .register(
                DocumentRecord::new(
                    ResourceIdentity::new("file://notes.txt"),
                    Arc::new(TextDocumentContent::new("")),
                )
                .as_system(),
            )
            .expect("text record");

        let err = directory
            .adopt(composite("file://notes.txt#c"), Container::Record(text))
            .expect_err("text content must reject children");
        assert!(matches!(err, DirectoryError::ContainerRejected { .. }));
    }

    #[test]
    fn reparenting_under_own_descendant_is_rejected() {
        let mut directory = Directory::new();
        let root = directory.register(composite("file://r.mdl")).expect("root");
        let child = directory
            .adopt(composite("file://r.mdl#c"), Container::Record(root))
            .expect("child");
        attach_null_view(&mut directory, child);

        let err = directory
            .set_container(root, Some(Container::Record(child)))
            .expect_err("cycle must be rejected");
        assert!(matches!(err, DirectoryError::ContainerRejected { .. }));
    }

    #[test]
    fn teardown_removes_views_and_records_of_whole_subtree() {
        let mut directory = Directory::new();
        let root = directory.register(composite("file://r.mdl")).expect("root");
        let child = directory
            .adopt(composite("file://r.mdl#c"), Container::Record(root))
            .expect("child");
        attach_null_view(&mut directory, root);
        attach_null_view(&mut directory, child);

        let report = directory.set_container(root, None).expect("teardown");
        assert_eq!(report.removed_records.len(), 2);
        assert_eq!(report.removed_views.len(), 2);
        assert!(report.directory_emptied);
        assert_eq!(directory.view_count(), 0);
    }

    #[test]
    fn teardown_reports_writable_origins_for_parser_forget() {
        let mut directory = Directory::new();
        let record = DocumentRecord::new(
            ResourceIdentity::new("file:///tmp/r.mdl"),
            Arc::new(CompositeContent),
        )
        .with_writable_origin(Some(std::path::PathBuf::from("/tmp/r.mdl")));
        let id = directory.register(record).expect("register");
        attach_null_view(&mut directory, id);

        let report = directory.set_container(id, None).expect("teardown");
        assert_eq!(report.forgotten_origins, vec!["file:///tmp/r.mdl".to_string()]);
    }

    #[test]
    fn number_of_open_views_sums_recursively() {
        let mut directory = Directory::new();
        let root = directory.register(composite("file://r.mdl")).expect("root");
        let child = directory
            .adopt(composite("file://r.mdl#c"), Container::Record(root))
            .expect("child");
        attach_null_view(&mut directory, root);
        attach_null_view(&mut directory, child);
        attach_null_view(&mut directory, child);

        assert_eq!(directory.number_of_open_views(root), 3);
        assert_eq!(directory.number_of_open_views(child), 2);
    }
}
