//! Document/view lifecycle core for the modelbench application.
//! This crate is the single source of truth for open-document identity,
//! containment, ownership and teardown invariants.

pub mod collab;
pub mod coordinator;
pub mod directory;
pub mod factory;
pub mod logging;
pub mod model;

pub use collab::{
    AutoConfirmGate, ConfirmationGate, ContentError, DeferredShutdownHook, DocumentContent,
    FsWritabilityProbe, ParseFailure, ShutdownHook, SourceParser, ViewSurface, WritabilityProbe,
};
pub use coordinator::{
    CloseOutcome, Coordinator, CoordinatorConfig, OpenError, SaveOutcome, WriteError,
};
pub use directory::master::{MasterPolicy, OriginMasterPolicy, StructuralMasterPolicy};
pub use directory::{
    Directory, DirectoryError, DirectoryStatistics, RecordSummary, TeardownReport,
};
pub use factory::{
    CreationFailure, FactoryChain, FactoryChainError, RecordFactory, RecordSeed, ViewFactory,
};
pub use logging::{default_log_level, init_logging, logging_status, LogSettings};
pub use model::identity::ResourceIdentity;
pub use model::locator::{LocatorError, LocatorMarker, SourceLocator};
pub use model::record::{Container, DocumentRecord, RecordId};
pub use model::view::{ViewHandle, ViewId};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
