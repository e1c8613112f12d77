use modelbench_core::{
    CloseOutcome, Coordinator, CoordinatorConfig, CreationFailure, DocumentContent, RecordFactory,
    RecordSeed, SourceLocator, ViewFactory, ViewSurface,
};
use std::sync::Arc;

struct ModelContent;

impl DocumentContent for ModelContent {
    fn kind(&self) -> &'static str {
        "model"
    }

    fn accepts_children(&self) -> bool {
        true
    }
}

struct ModelRecordFactory;

impl RecordFactory for ModelRecordFactory {
    fn name(&self) -> &str {
        "model"
    }

    fn try_create(&self, _locator: &SourceLocator) -> Result<Option<RecordSeed>, CreationFailure> {
        Ok(Some(RecordSeed::new(Arc::new(ModelContent))))
    }
}

struct NullSurface;

impl ViewSurface for NullSurface {
    fn show(&self) {}
    fn set_editable(&self, _editable: bool) {}
    fn set_title(&self, _identifier: &str) {}
    fn dispose(&self) {}
}

struct NullViewFactory;

impl ViewFactory for NullViewFactory {
    fn name(&self) -> &str {
        "null"
    }

    fn try_create(
        &self,
        _record: &modelbench_core::DocumentRecord,
    ) -> Result<Option<Arc<dyn ViewSurface>>, CreationFailure> {
        Ok(Some(Arc::new(NullSurface)))
    }
}

fn build_coordinator() -> Coordinator {
    let mut coordinator = Coordinator::new(CoordinatorConfig::headless());
    coordinator
        .register_record_factory(Arc::new(ModelRecordFactory))
        .expect("record factory registration");
    coordinator
        .register_view_factory(Arc::new(NullViewFactory))
        .expect("view factory registration");
    coordinator
}

fn owner_of(coordinator: &Coordinator, view: modelbench_core::ViewId) -> modelbench_core::RecordId {
    coordinator
        .directory()
        .view(view)
        .expect("view handle")
        .owner()
}

#[test]
fn nested_identities_follow_the_separator_rule() {
    let mut coordinator = build_coordinator();
    let root_view = coordinator.open("mem://plant.mdl").expect("open root");
    let root = owner_of(&coordinator, root_view);

    let controller = coordinator
        .open_nested(Some(root), "controller", None, Arc::new(ModelContent))
        .expect("open controller");
    assert_eq!(
        coordinator
            .directory()
            .record(controller)
            .expect("controller record")
            .identity()
            .as_str(),
        "mem://plant.mdl#controller"
    );

    let gain = coordinator
        .open_nested(Some(controller), "gain", None, Arc::new(ModelContent))
        .expect("open gain");
    assert_eq!(
        coordinator
            .directory()
            .record(gain)
            .expect("gain record")
            .identity()
            .as_str(),
        "mem://plant.mdl#controller.gain"
    );
}

#[test]
fn nested_open_reuses_an_existing_record() {
    let mut coordinator = build_coordinator();
    let root_view = coordinator.open("mem://plant.mdl").expect("open root");
    let root = owner_of(&coordinator, root_view);

    let first = coordinator
        .open_nested(Some(root), "controller", None, Arc::new(ModelContent))
        .expect("first nested open");
    let second = coordinator
        .open_nested(Some(root), "controller", None, Arc::new(ModelContent))
        .expect("second nested open");
    assert_eq!(first, second);
    assert_eq!(coordinator.directory().len(), 2);
}

#[test]
fn nested_open_without_host_lands_at_top_level() {
    let mut coordinator = build_coordinator();
    let record = coordinator
        .open_nested(None, "mem://scratch.mdl", None, Arc::new(ModelContent))
        .expect("top-level nested open");
    assert!(coordinator
        .directory()
        .record(record)
        .expect("record")
        .parent()
        .is_none());
}

#[test]
fn closing_last_view_of_leaf_collapses_empty_ancestors() {
    let mut coordinator = build_coordinator();
    let root_view = coordinator.open("mem://plant.mdl").expect("open root");
    let root = owner_of(&coordinator, root_view);
    let child = coordinator
        .open_nested(Some(root), "controller", None, Arc::new(ModelContent))
        .expect("open child");
    let child_view = coordinator.open_view(child).expect("child view");
    assert!(!coordinator
        .directory()
        .view(child_view)
        .expect("child view handle")
        .is_master());
    assert_eq!(coordinator.directory().number_of_open_views(root), 2);

    // Closing the child's only view removes the child; the root keeps its
    // view and survives.
    assert_eq!(coordinator.close_view(child_view), CloseOutcome::Closed);
    assert!(coordinator.directory().record(child).is_none());
    assert!(coordinator.directory().record(root).is_some());
    assert_eq!(coordinator.directory().len(), 1);

    // Closing the root's view finishes the collapse.
    assert_eq!(coordinator.close_view(root_view), CloseOutcome::Closed);
    assert!(coordinator.directory().is_empty());
}

#[test]
fn system_record_persists_with_zero_views() {
    let mut coordinator = build_coordinator();
    let library = coordinator
        .install_system_record("mem://library.mdl", Arc::new(ModelContent))
        .expect("install library");

    let view = coordinator.open_view(library).expect("library view");
    assert_eq!(coordinator.close_view(view), CloseOutcome::Closed);

    assert!(coordinator.directory().record(library).is_some());
    assert_eq!(coordinator.directory().len(), 1);
    assert_eq!(coordinator.directory().number_of_open_views(library), 0);
    assert!(!coordinator.shutdown_signaled());
}

#[test]
fn modified_state_is_shared_through_the_tree_master() {
    let mut coordinator = build_coordinator();
    let root_view = coordinator.open("mem://plant.mdl").expect("open root");
    let root = owner_of(&coordinator, root_view);
    let child = coordinator
        .open_nested(Some(root), "controller", None, Arc::new(ModelContent))
        .expect("open child");

    coordinator.set_modified(child, true).expect("set through child");
    assert!(coordinator.is_modified(root).expect("root sees master state"));
    assert!(coordinator.is_modified(child).expect("child sees master state"));

    coordinator.set_modified(child, true).expect("idempotent set");
    assert!(coordinator.is_modified(root).expect("still modified"));
}

#[test]
fn closing_an_already_closed_view_changes_nothing() {
    let mut coordinator = build_coordinator();
    let view = coordinator.open("mem://plant.mdl").expect("open");
    assert_eq!(coordinator.close_view(view), CloseOutcome::Closed);
    let len_after_close = coordinator.directory().len();

    assert_eq!(coordinator.close_view(view), CloseOutcome::Closed);
    assert_eq!(coordinator.directory().len(), len_after_close);
}

#[test]
fn explicit_container_overrides_the_host_record() {
    let mut coordinator = build_coordinator();
    let host_view = coordinator.open("mem://plant.mdl").expect("open host");
    let host = owner_of(&coordinator, host_view);
    let shelf_view = coordinator.open("mem://shelf.mdl").expect("open shelf");
    let shelf = owner_of(&coordinator, shelf_view);

    let nested = coordinator
        .open_nested(Some(host), "detail", Some(shelf), Arc::new(ModelContent))
        .expect("nested open");
    let record = coordinator
        .directory()
        .record(nested)
        .expect("nested record");
    // Identity comes from the host; containment from the explicit container.
    assert_eq!(record.identity().as_str(), "mem://plant.mdl#detail");
    assert_eq!(record.parent(), Some(shelf));
}
