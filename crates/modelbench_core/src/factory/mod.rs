//! Ordered creation strategies for records and views.
//!
//! # Responsibility
//! - Hold the registered record factories and view factories in trial order.
//! - Resolve view factories preferentially from content-declared hints,
//!   falling back to the default registration order.
//!
//! # Invariants
//! - The first factory returning a result wins; later factories are not
//!   consulted.
//! - A factory failure is recovered by trying the next factory; only
//!   exhaustion of the whole chain surfaces as a creation failure.

use crate::collab::{DocumentContent, ParseFailure, ViewSurface};
use crate::model::locator::SourceLocator;
use crate::model::record::DocumentRecord;
use log::{debug, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;

pub mod text;

/// Record metadata produced by a record factory on acceptance.
#[derive(Debug)]
pub struct RecordSeed {
    /// Loaded content handle.
    pub content: Arc<dyn DocumentContent>,
    /// Writable origin of the source, when file-backed.
    pub writable_origin: Option<PathBuf>,
    /// Whether the record is exempt from zero-view removal.
    pub is_system: bool,
}

impl RecordSeed {
    /// Creates a plain, non-system seed.
    pub fn new(content: Arc<dyn DocumentContent>) -> Self {
        Self {
            content,
            writable_origin: None,
            is_system: false,
        }
    }

    pub fn with_writable_origin(mut self, origin: Option<PathBuf>) -> Self {
        self.writable_origin = origin;
        self
    }
}

/// Capability for creating a document record from a source locator.
///
/// Implementations may consult locator markers to pick a record shape, or
/// decline by returning `Ok(None)`.
pub trait RecordFactory {
    /// Stable factory name used in registration and logs.
    fn name(&self) -> &str;

    /// Attempts to create record metadata for `locator`.
    fn try_create(&self, locator: &SourceLocator) -> Result<Option<RecordSeed>, CreationFailure>;
}

/// Capability for creating a view surface over a document record.
pub trait ViewFactory {
    /// Stable factory name, matchable against content view hints.
    fn name(&self) -> &str;

    /// Attempts to create a presentation surface for `record`.
    fn try_create(
        &self,
        record: &DocumentRecord,
    ) -> Result<Option<Arc<dyn ViewSurface>>, CreationFailure>;
}

/// Creation failures surfaced after chain exhaustion.
#[derive(Debug)]
pub enum CreationFailure {
    /// No registered record factory accepted the locator.
    NoRecordFactoryAccepted { locator: String },
    /// No view factory, hinted or default, produced a surface.
    NoViewFactoryAccepted { identity: String },
    /// One factory accepted but failed while creating.
    Factory { factory: String, message: String },
    /// The source parser collaborator failed.
    Parse(ParseFailure),
}

impl Display for CreationFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoRecordFactoryAccepted { locator } => {
                write!(f, "no record factory accepted locator `{locator}`")
            }
            Self::NoViewFactoryAccepted { identity } => {
                write!(f, "no view factory accepted record `{identity}`")
            }
            Self::Factory { factory, message } => {
                write!(f, "factory `{factory}` failed: {message}")
            }
            Self::Parse(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CreationFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ParseFailure> for CreationFailure {
    fn from(value: ParseFailure) -> Self {
        Self::Parse(value)
    }
}

/// Factory registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactoryChainError {
    InvalidFactoryName(String),
    DuplicateFactoryName(String),
}

impl Display for FactoryChainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFactoryName(value) => write!(f, "factory name is invalid: {value}"),
            Self::DuplicateFactoryName(value) => {
                write!(f, "factory name already registered: {value}")
            }
        }
    }
}

impl Error for FactoryChainError {}

/// Ordered registries of record and view factories.
#[derive(Default)]
pub struct FactoryChain {
    record_factories: Vec<Arc<dyn RecordFactory>>,
    view_factories: Vec<Arc<dyn ViewFactory>>,
}

impl FactoryChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one record factory to the trial order.
    pub fn register_record_factory(
        &mut self,
        factory: Arc<dyn RecordFactory>,
    ) -> Result<(), FactoryChainError> {
        let name = factory.name().trim().to_string();
        if !is_valid_factory_name(&name) {
            return Err(FactoryChainError::InvalidFactoryName(name));
        }
        if self.record_factories.iter().any(|f| f.name() == name) {
            return Err(FactoryChainError::DuplicateFactoryName(name));
        }
        self.record_factories.push(factory);
        Ok(())
    }

    /// Appends one view factory to the default trial order.
    pub fn register_view_factory(
        &mut self,
        factory: Arc<dyn ViewFactory>,
    ) -> Result<(), FactoryChainError> {
        let name = factory.name().trim().to_string();
        if !is_valid_factory_name(&name) {
            return Err(FactoryChainError::InvalidFactoryName(name));
        }
        if self.view_factories.iter().any(|f| f.name() == name) {
            return Err(FactoryChainError::DuplicateFactoryName(name));
        }
        self.view_factories.push(factory);
        Ok(())
    }

    pub fn record_factory_names(&self) -> Vec<String> {
        self.record_factories
            .iter()
            .map(|factory| factory.name().to_string())
            .collect()
    }

    pub fn view_factory_names(&self) -> Vec<String> {
        self.view_factories
            .iter()
            .map(|factory| factory.name().to_string())
            .collect()
    }

    /// Runs the record factories in order; the first acceptance wins.
    pub fn create_record(&self, locator: &SourceLocator) -> Result<RecordSeed, CreationFailure> {
        for factory in &self.record_factories {
            match factory.try_create(locator) {
                Ok(Some(seed)) => {
                    debug!(
                        "event=record_factory module=factory status=accepted factory={} locator={locator}",
                        factory.name()
                    );
                    return Ok(seed);
                }
                Ok(None) => continue,
                Err(err) => {
                    warn!(
                        "event=record_factory module=factory status=error factory={} locator={locator} error={err}",
                        factory.name()
                    );
                }
            }
        }
        Err(CreationFailure::NoRecordFactoryAccepted {
            locator: locator.canonical(),
        })
    }

    /// Resolves a view surface for `record`.
    ///
    /// Content-declared factory names are tried first, in hint order, then
    /// the default registration order; duplicates are consulted once.
    pub fn create_view(
        &self,
        record: &DocumentRecord,
    ) -> Result<Arc<dyn ViewSurface>, CreationFailure> {
        let hints = record.content().view_factory_hints();
        let hinted = hints
            .iter()
            .filter_map(|name| self.view_factories.iter().find(|f| f.name() == *name));
        let defaults = self
            .view_factories
            .iter()
            .filter(|f| !hints.iter().any(|name| name == f.name()));

        for factory in hinted.chain(defaults) {
            match factory.try_create(record) {
                Ok(Some(surface)) => {
                    debug!(
                        "event=view_factory module=factory status=accepted factory={} identity={}",
                        factory.name(),
                        record.identity()
                    );
                    return Ok(surface);
                }
                Ok(None) => continue,
                Err(err) => {
                    warn!(
                        "event=view_factory module=factory status=error factory={} identity={} error={err}",
                        factory.name(),
                        record.identity()
                    );
                }
            }
        }
        Err(CreationFailure::NoViewFactoryAccepted {
            identity: record.identity().to_string(),
        })
    }
}

fn is_valid_factory_name(value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::{CreationFailure, FactoryChain, FactoryChainError, RecordFactory, RecordSeed};
    use crate::collab::text::TextDocumentContent;
    use crate::model::locator::{LocatorMarker, SourceLocator};
    use std::sync::Arc;

    struct AcceptingFactory {
        name: &'static str,
    }

    impl RecordFactory for AcceptingFactory {
        fn name(&self) -> &str {
            self.name
        }

        fn try_create(
            &self,
            _locator: &SourceLocator,
        ) -> Result<Option<RecordSeed>, CreationFailure> {
            Ok(Some(RecordSeed::new(Arc::new(TextDocumentContent::new("")))))
        }
    }

    struct DecliningFactory;

    impl RecordFactory for DecliningFactory {
        fn name(&self) -> &str {
            "declining"
        }

        fn try_create(
            &self,
            _locator: &SourceLocator,
        ) -> Result<Option<RecordSeed>, CreationFailure> {
            Ok(None)
        }
    }

    struct FailingFactory;

    impl RecordFactory for FailingFactory {
        fn name(&self) -> &str {
            "failing"
        }

        fn try_create(
            &self,
            _locator: &SourceLocator,
        ) -> Result<Option<RecordSeed>, CreationFailure> {
            Err(CreationFailure::Factory {
                factory: "failing".to_string(),
                message: "synthetic failure".to_string(),
            })
        }
    }

    /// Demonstrates marker-based dispatch: the factory only accepts
    /// locators carrying the external-viewer marker.
    struct ExternalViewerFactory;

    impl RecordFactory for ExternalViewerFactory {
        fn name(&self) -> &str {
            "external_viewer"
        }

        fn try_create(
            &self,
            locator: &SourceLocator,
        ) -> Result<Option<RecordSeed>, CreationFailure> {
            if locator.marker() != Some(LocatorMarker::InExternalViewer) {
                return Ok(None);
            }
            Ok(Some(RecordSeed::new(Arc::new(TextDocumentContent::new("")))))
        }
    }

    #[test]
    fn first_accepting_factory_wins() {
        let mut chain = FactoryChain::new();
        chain
            .register_record_factory(Arc::new(DecliningFactory))
            .expect("declining registration");
        chain
            .register_record_factory(Arc::new(AcceptingFactory { name: "accepting" }))
            .expect("accepting registration");

        let locator = SourceLocator::parse("models/a.mdl").expect("locator parse");
        chain.create_record(&locator).expect("creation");
        assert_eq!(chain.record_factory_names(), vec!["declining", "accepting"]);
    }

    #[test]
    fn factory_failure_recovers_with_next_factory() {
        let mut chain = FactoryChain::new();
        chain
            .register_record_factory(Arc::new(FailingFactory))
            .expect("failing registration");
        chain
            .register_record_factory(Arc::new(AcceptingFactory { name: "accepting" }))
            .expect("accepting registration");

        let locator = SourceLocator::parse("models/a.mdl").expect("locator parse");
        chain.create_record(&locator).expect("second factory wins");
    }

    #[test]
    fn exhausted_chain_surfaces_creation_failure() {
        let mut chain = FactoryChain::new();
        chain
            .register_record_factory(Arc::new(DecliningFactory))
            .expect("declining registration");

        let locator = SourceLocator::parse("models/a.unknown").expect("locator parse");
        let err = chain.create_record(&locator).expect_err("must exhaust");
        assert!(matches!(
            err,
            CreationFailure::NoRecordFactoryAccepted { .. }
        ));
    }

    #[test]
    fn marker_selects_record_shape() {
        let mut chain = FactoryChain::new();
        chain
            .register_record_factory(Arc::new(ExternalViewerFactory))
            .expect("external registration");

        let plain = SourceLocator::parse("models/a.mdl").expect("locator parse");
        assert!(chain.create_record(&plain).is_err());

        let marked = plain.with_marker(LocatorMarker::InExternalViewer);
        chain.create_record(&marked).expect("marker acceptance");
    }

    #[test]
    fn rejects_invalid_and_duplicate_factory_names() {
        let mut chain = FactoryChain::new();
        let invalid = chain.register_record_factory(Arc::new(AcceptingFactory { name: "Bad Name" }));
        assert!(matches!(
            invalid,
            Err(FactoryChainError::InvalidFactoryName(_))
        ));

        chain
            .register_record_factory(Arc::new(AcceptingFactory { name: "accepting" }))
            .expect("first registration");
        let duplicate =
            chain.register_record_factory(Arc::new(AcceptingFactory { name: "accepting" }));
        assert!(matches!(
            duplicate,
            Err(FactoryChainError::DuplicateFactoryName(_))
        ));
    }
}
