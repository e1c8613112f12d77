//! Open/close coordination façade.
//!
//! # Responsibility
//! - Resolve "open this thing" against the directory, reusing existing
//!   records and views before creating anything.
//! - Drive the factory chain on a miss, including the plain-text fallback.
//! - Orchestrate ordered teardown and surface the shutdown signal when the
//!   directory empties.
//!
//! # Invariants
//! - A failed view creation never leaves an orphan record behind.
//! - The shutdown signal fires at most once per coordinator.
//! - Close declines abort the remainder of a close-all without rolling back
//!   what already closed.

use crate::collab::{
    AutoConfirmGate, ConfirmationGate, ContentError, DeferredShutdownHook, DocumentContent,
    FsWritabilityProbe, ShutdownHook, SourceParser, ViewSurface, WritabilityProbe,
};
use crate::collab::text::TextSourceParser;
use crate::directory::master::{MasterPolicy, StructuralMasterPolicy};
use crate::directory::{Directory, DirectoryError, DirectoryStatistics, TeardownReport};
use crate::factory::text::{ParserRecordFactory, PlainViewFactory, TextRecordFactory};
use crate::factory::{CreationFailure, FactoryChain, FactoryChainError, RecordFactory, ViewFactory};
use crate::model::identity::ResourceIdentity;
use crate::model::locator::{LocatorError, LocatorMarker, SourceLocator};
use crate::model::record::{Container, DocumentRecord, RecordId};
use crate::model::view::{ViewHandle, ViewId};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::Arc;

/// Errors from coordinator open paths.
#[derive(Debug)]
pub enum OpenError {
    /// Locator text could not be parsed.
    Locator(LocatorError),
    /// Record or view creation exhausted every factory and fallback.
    Creation(CreationFailure),
    /// Directory-level failure.
    Directory(DirectoryError),
}

impl Display for OpenError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Locator(err) => write!(f, "{err}"),
            Self::Creation(err) => write!(f, "{err}"),
            Self::Directory(err) => write!(f, "{err}"),
        }
    }
}

impl Error for OpenError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Locator(err) => Some(err),
            Self::Creation(err) => Some(err),
            Self::Directory(err) => Some(err),
        }
    }
}

impl From<LocatorError> for OpenError {
    fn from(value: LocatorError) -> Self {
        Self::Locator(value)
    }
}

impl From<CreationFailure> for OpenError {
    fn from(value: CreationFailure) -> Self {
        Self::Creation(value)
    }
}

impl From<DirectoryError> for OpenError {
    fn from(value: DirectoryError) -> Self {
        Self::Directory(value)
    }
}

/// Errors from the write-out delegation path.
#[derive(Debug)]
pub enum WriteError {
    Directory(DirectoryError),
    Content(ContentError),
}

impl Display for WriteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Directory(err) => write!(f, "{err}"),
            Self::Content(err) => write!(f, "{err}"),
        }
    }
}

impl Error for WriteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Directory(err) => Some(err),
            Self::Content(err) => Some(err),
        }
    }
}

impl From<DirectoryError> for WriteError {
    fn from(value: DirectoryError) -> Self {
        Self::Directory(value)
    }
}

impl From<ContentError> for WriteError {
    fn from(value: ContentError) -> Self {
        Self::Content(value)
    }
}

/// Result of one close request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The view (or every requested view) closed.
    Closed,
    /// A confirmation prompt was declined; the operation aborted.
    Declined,
}

/// Result of one write-out request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Written,
    /// The overwrite prompt was declined. Not an error.
    Declined,
}

/// Collaborator wiring for one coordinator.
pub struct CoordinatorConfig {
    pub parser: Arc<dyn SourceParser>,
    pub confirmations: Arc<dyn ConfirmationGate>,
    pub writability: Arc<dyn WritabilityProbe>,
    pub shutdown: Arc<dyn ShutdownHook>,
    pub master_policy: Arc<dyn MasterPolicy>,
    /// Operator flag: signal shutdown when the directory empties.
    pub exit_on_empty: bool,
}

impl CoordinatorConfig {
    /// Headless defaults: text parsing, auto-confirmation, filesystem
    /// writability probing, and a deferred shutdown flag.
    pub fn headless() -> Self {
        Self {
            parser: Arc::new(TextSourceParser::new()),
            confirmations: Arc::new(AutoConfirmGate),
            writability: Arc::new(FsWritabilityProbe),
            shutdown: Arc::new(DeferredShutdownHook::new()),
            master_policy: Arc::new(StructuralMasterPolicy),
            exit_on_empty: true,
        }
    }
}

/// Façade tying directory, factory chain and collaborators together.
pub struct Coordinator {
    directory: Directory,
    chain: FactoryChain,
    parser: Arc<dyn SourceParser>,
    confirmations: Arc<dyn ConfirmationGate>,
    writability: Arc<dyn WritabilityProbe>,
    shutdown: Arc<dyn ShutdownHook>,
    exit_on_empty: bool,
    shutdown_signaled: bool,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            directory: Directory::with_master_policy(config.master_policy),
            chain: FactoryChain::new(),
            parser: config.parser,
            confirmations: config.confirmations,
            writability: config.writability,
            shutdown: config.shutdown,
            exit_on_empty: config.exit_on_empty,
            shutdown_signaled: false,
        }
    }

    /// Read access to the directory.
    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Registers the built-in parser, text and plain-view factories.
    pub fn install_default_factories(&mut self) -> Result<(), FactoryChainError> {
        self.chain
            .register_record_factory(Arc::new(ParserRecordFactory::new(self.parser.clone())))?;
        self.chain
            .register_record_factory(Arc::new(TextRecordFactory))?;
        self.chain.register_view_factory(Arc::new(PlainViewFactory))
    }

    pub fn register_record_factory(
        &mut self,
        factory: Arc<dyn RecordFactory>,
    ) -> Result<(), FactoryChainError> {
        self.chain.register_record_factory(factory)
    }

    pub fn register_view_factory(
        &mut self,
        factory: Arc<dyn ViewFactory>,
    ) -> Result<(), FactoryChainError> {
        self.chain.register_view_factory(factory)
    }

    /// Opens the document named by `spec`.
    ///
    /// An identity hit raises every existing view of the record and returns
    /// the first one; a miss runs the factory chain, falling back to the
    /// plain-text shape when view creation fails.
    pub fn open(&mut self, spec: &str) -> Result<ViewId, OpenError> {
        let locator = SourceLocator::parse(spec)?;
        let identity = locator.identity();

        if let Some(record_id) = self.directory.lookup(&identity) {
            let views = self
                .directory
                .record(record_id)
                .map(|record| record.views().to_vec())
                .unwrap_or_default();
            for view_id in &views {
                if let Some(view) = self.directory.view(*view_id) {
                    view.show();
                }
            }
            if let Some(first) = views.first() {
                debug!("event=open module=coordinator status=reused identity={identity}");
                return Ok(*first);
            }
            // Registered but viewless, e.g. a resident library: give it a view.
            return self.open_view(record_id);
        }

        self.open_new(&locator, identity, true)
    }

    /// Creates an additional view on an already-open record.
    pub fn open_view(&mut self, record_id: RecordId) -> Result<ViewId, OpenError> {
        let record = self
            .directory
            .record(record_id)
            .ok_or(DirectoryError::RecordNotFound(record_id))?;
        let identity = record.identity().clone();
        let surface = self.chain.create_view(record)?;
        self.finish_view(record_id, &identity, surface)
    }

    /// Opens a document nested inside an already-open one.
    ///
    /// The identity is synthesized from `host`'s identity. On a miss, the
    /// new record attaches to `explicit_container`, else to `host`, else to
    /// the directory as a new top-level record.
    pub fn open_nested(
        &mut self,
        host: Option<RecordId>,
        local_name: &str,
        explicit_container: Option<RecordId>,
        content: Arc<dyn DocumentContent>,
    ) -> Result<RecordId, OpenError> {
        let identity = match host {
            Some(host_id) => self
                .directory
                .record(host_id)
                .ok_or(DirectoryError::RecordNotFound(host_id))?
                .identity()
                .nested(local_name),
            None => ResourceIdentity::new(local_name),
        };

        if let Some(existing) = self.directory.lookup(&identity) {
            debug!("event=open_nested module=coordinator status=reused identity={identity}");
            return Ok(existing);
        }

        let container = explicit_container
            .or(host)
            .map(Container::Record)
            .unwrap_or(Container::Directory);
        let record = DocumentRecord::new(identity.clone(), content);
        let record_id = self.directory.adopt(record, container)?;
        info!("event=open_nested module=coordinator status=ok identity={identity}");
        Ok(record_id)
    }

    /// Registers a resident system record, exempt from zero-view removal.
    pub fn install_system_record(
        &mut self,
        name: &str,
        content: Arc<dyn DocumentContent>,
    ) -> Result<RecordId, OpenError> {
        let identity = ResourceIdentity::new(name);
        let record = DocumentRecord::new(identity.clone(), content).as_system();
        let record_id = self.directory.register(record)?;
        info!("event=install_system module=coordinator status=ok identity={identity}");
        Ok(record_id)
    }

    /// Closes one view.
    ///
    /// Prompts for discard confirmation when the close would drop unsaved
    /// state; closing the tree's master view closes its sibling views first.
    /// Closing an unknown view is a no-op.
    pub fn close_view(&mut self, view_id: ViewId) -> CloseOutcome {
        let Some(view) = self.directory.view(view_id) else {
            return CloseOutcome::Closed;
        };
        let owner = view.owner();
        let is_master = view.is_master();
        let identity = match self.directory.record(owner) {
            Some(record) => record.identity().clone(),
            None => return CloseOutcome::Closed,
        };

        let tree_views = self.directory.tree_views(owner).unwrap_or_default();
        let tree_modified = self.directory.is_modified(owner).unwrap_or(false);
        let closes_tree = is_master || tree_views.len() == 1;
        if tree_modified && closes_tree && !self.confirmations.confirm_discard(&identity) {
            info!("event=close module=coordinator status=declined identity={identity}");
            return CloseOutcome::Declined;
        }

        let mut report = TeardownReport::default();
        if is_master {
            for sibling in tree_views {
                if sibling != view_id {
                    report.absorb(self.directory.detach_view(sibling));
                }
            }
        }
        report.absorb(self.directory.detach_view(view_id));
        info!("event=close module=coordinator status=ok identity={identity}");
        self.process_report(report);
        CloseOutcome::Closed
    }

    /// Closes every view of every record, children before parents.
    ///
    /// The first declined confirmation aborts the remainder; documents
    /// closed so far stay closed.
    pub fn close_all(&mut self) -> CloseOutcome {
        let top_level = self.directory.top_level_records();
        for record_id in top_level {
            if self.directory.record(record_id).is_none() {
                continue;
            }
            if self.close_record_views(record_id) == CloseOutcome::Declined {
                warn!("event=close_all module=coordinator status=aborted");
                return CloseOutcome::Declined;
            }
        }
        CloseOutcome::Closed
    }

    /// Writes a record's content through the content's own writer.
    ///
    /// An existing target asks the overwrite prompt first; a successful
    /// write clears the tree's modified flag.
    pub fn write_record(
        &mut self,
        record_id: RecordId,
        target: &Path,
    ) -> Result<SaveOutcome, WriteError> {
        let record = self
            .directory
            .record(record_id)
            .ok_or(DirectoryError::RecordNotFound(record_id))?;
        let identity = record.identity().clone();
        if target.exists() && !self.confirmations.confirm_overwrite(target) {
            info!("event=write module=coordinator status=declined identity={identity}");
            return Ok(SaveOutcome::Declined);
        }

        record.content().write_to(target)?;
        self.directory.set_modified(record_id, false)?;
        info!(
            "event=write module=coordinator status=ok identity={identity} target={}",
            target.display()
        );
        Ok(SaveOutcome::Written)
    }

    /// Reads the modified flag of a record's tree.
    pub fn is_modified(&self, record_id: RecordId) -> Result<bool, DirectoryError> {
        self.directory.is_modified(record_id)
    }

    /// Writes the modified flag of a record's tree.
    pub fn set_modified(&mut self, record_id: RecordId, modified: bool) -> Result<(), DirectoryError> {
        self.directory.set_modified(record_id, modified)
    }

    /// Applies one parameter override to every open document whose content
    /// recognizes it. Returns the number of acceptances.
    pub fn apply_parameter(&self, name: &str, value: &str) -> usize {
        let mut applied = 0;
        for record in self.directory.records_matching(|_| true) {
            if record.content().set_parameter(name, value) {
                applied += 1;
            }
        }
        if applied == 0 {
            warn!("event=apply_parameter module=coordinator status=unmatched name={name}");
        }
        applied
    }

    /// Executes every open document that supports execution, synchronously.
    /// Returns the number of documents executed.
    pub fn execute_open_documents(&self) -> usize {
        let mut executed = 0;
        for record in self.directory.records_matching(|_| true) {
            match record.content().execute() {
                Ok(()) => executed += 1,
                Err(ContentError::Unsupported(_)) => {
                    debug!(
                        "event=execute module=coordinator status=skipped identity={}",
                        record.identity()
                    );
                }
                Err(err) => {
                    error!(
                        "event=execute module=coordinator status=error identity={} error={err}",
                        record.identity()
                    );
                }
            }
        }
        executed
    }

    /// Statistics snapshot over the directory.
    pub fn statistics(&self) -> DirectoryStatistics {
        self.directory.statistics()
    }

    /// Whether the shutdown signal has been surfaced.
    pub fn shutdown_signaled(&self) -> bool {
        self.shutdown_signaled
    }

    fn close_record_views(&mut self, record_id: RecordId) -> CloseOutcome {
        let children = match self.directory.record(record_id) {
            Some(record) => record.children().to_vec(),
            None => return CloseOutcome::Closed,
        };
        for child in children {
            if self.directory.record(child).is_none() {
                continue;
            }
            if self.close_record_views(child) == CloseOutcome::Declined {
                return CloseOutcome::Declined;
            }
        }

        let views = match self.directory.record(record_id) {
            Some(record) => record.views().to_vec(),
            None => return CloseOutcome::Closed,
        };
        for view_id in views {
            if self.close_view(view_id) == CloseOutcome::Declined {
                return CloseOutcome::Declined;
            }
        }
        CloseOutcome::Closed
    }

    fn open_new(
        &mut self,
        locator: &SourceLocator,
        identity: ResourceIdentity,
        allow_fallback: bool,
    ) -> Result<ViewId, OpenError> {
        let seed = self.chain.create_record(locator)?;
        let mut record =
            DocumentRecord::new(identity.clone(), seed.content).with_writable_origin(seed.writable_origin);
        if seed.is_system {
            record = record.as_system();
        }
        let record_id = self.directory.register(record)?;

        // DetermineWritability: a non-writable origin pins the new tree
        // read-only through its master.
        let origin = self
            .directory
            .record(record_id)
            .and_then(|record| record.writable_origin().cloned());
        if let Some(origin) = origin {
            if !self.writability.can_write(&origin) {
                self.directory.set_modifiable(record_id, false)?;
            }
        }
        if self.parser.content_modified_by_filter() {
            self.directory.set_modified(record_id, true)?;
        }

        let record = self
            .directory
            .record(record_id)
            .ok_or(DirectoryError::RecordNotFound(record_id))?;
        match self.chain.create_view(record) {
            Ok(surface) => {
                let view_id = self.finish_view(record_id, &identity, surface)?;
                info!("event=open module=coordinator status=ok identity={identity}");
                Ok(view_id)
            }
            Err(err) => {
                warn!(
                    "event=open module=coordinator status=view_failed identity={identity} error={err}"
                );
                let report = self.directory.set_container(record_id, None)?;
                self.process_report(report);

                if allow_fallback && locator.marker() != Some(LocatorMarker::AsText) {
                    info!(
                        "event=open module=coordinator status=text_fallback identity={identity}"
                    );
                    let fallback = locator.with_marker(LocatorMarker::AsText);
                    return self.open_new(&fallback, identity, false);
                }
                Err(OpenError::Creation(err))
            }
        }
    }

    fn finish_view(
        &mut self,
        record_id: RecordId,
        identity: &ResourceIdentity,
        surface: Arc<dyn ViewSurface>,
    ) -> Result<ViewId, OpenError> {
        surface.set_title(identity.as_str());
        let view = ViewHandle::new(record_id, surface);
        let view_id = self.directory.attach_view(view)?;
        if !self.directory.is_modifiable(record_id)? {
            if let Some(view) = self.directory.view_mut(view_id) {
                view.set_editable(false);
            }
        }
        if let Some(view) = self.directory.view(view_id) {
            view.show();
        }
        Ok(view_id)
    }

    fn process_report(&mut self, report: TeardownReport) {
        for origin in &report.forgotten_origins {
            self.parser.forget(origin);
        }
        if report.directory_emptied && self.exit_on_empty && !self.shutdown_signaled {
            self.shutdown_signaled = true;
            info!("event=shutdown_signal module=coordinator status=ok");
            self.shutdown.request_shutdown();
        }
    }
}
