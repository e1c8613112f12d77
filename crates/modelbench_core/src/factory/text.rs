//! Built-in parser-backed and plain-text factories.
//!
//! The parser factory is the normal front of the record chain; the text
//! factory sits last and doubles as the coordinator's fallback shape for
//! sources nothing else accepts.

use crate::collab::text::TextDocumentContent;
use crate::collab::{SourceParser, ViewSurface};
use crate::factory::{CreationFailure, RecordFactory, RecordSeed, ViewFactory};
use crate::model::locator::{LocatorMarker, SourceLocator};
use crate::model::record::DocumentRecord;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Record factory that delegates source reading to the parser collaborator.
///
/// Declines locators carrying the plain-text marker so the text factory can
/// take them.
pub struct ParserRecordFactory {
    parser: Arc<dyn SourceParser>,
}

impl ParserRecordFactory {
    pub fn new(parser: Arc<dyn SourceParser>) -> Self {
        Self { parser }
    }
}

impl RecordFactory for ParserRecordFactory {
    fn name(&self) -> &str {
        "parser"
    }

    fn try_create(&self, locator: &SourceLocator) -> Result<Option<RecordSeed>, CreationFailure> {
        if locator.marker() == Some(LocatorMarker::AsText) {
            return Ok(None);
        }
        let content = self.parser.parse(locator)?;
        Ok(Some(
            RecordSeed::new(content).with_writable_origin(locator.path()),
        ))
    }
}

/// Record factory producing the plain-text record shape.
///
/// Accepts any file-backed locator regardless of marker.
#[derive(Debug, Default)]
pub struct TextRecordFactory;

impl RecordFactory for TextRecordFactory {
    fn name(&self) -> &str {
        "text"
    }

    fn try_create(&self, locator: &SourceLocator) -> Result<Option<RecordSeed>, CreationFailure> {
        let Some(path) = locator.path() else {
            return Ok(None);
        };
        let text = std::fs::read_to_string(&path).map_err(|err| CreationFailure::Factory {
            factory: "text".to_string(),
            message: format!("failed to read `{}`: {err}", path.display()),
        })?;
        Ok(Some(
            RecordSeed::new(Arc::new(TextDocumentContent::new(text)))
                .with_writable_origin(Some(path)),
        ))
    }
}

/// Presentation-free view surface.
///
/// Stands in for a rendering collaborator in headless embeddings; the
/// recorded state is observable for diagnostics and tests.
#[derive(Debug, Default)]
pub struct PlainViewSurface {
    show_count: AtomicUsize,
    editable: AtomicBool,
    disposed: AtomicBool,
    title: Mutex<String>,
}

impl PlainViewSurface {
    pub fn new() -> Self {
        Self {
            show_count: AtomicUsize::new(0),
            editable: AtomicBool::new(true),
            disposed: AtomicBool::new(false),
            title: Mutex::new(String::new()),
        }
    }

    /// Number of times the surface was brought to the foreground.
    pub fn show_count(&self) -> usize {
        self.show_count.load(Ordering::SeqCst)
    }

    pub fn is_editable(&self) -> bool {
        self.editable.load(Ordering::SeqCst)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub fn title(&self) -> String {
        self.title.lock().map(|t| t.clone()).unwrap_or_default()
    }
}

impl ViewSurface for PlainViewSurface {
    fn show(&self) {
        self.show_count.fetch_add(1, Ordering::SeqCst);
    }

    fn set_editable(&self, editable: bool) {
        self.editable.store(editable, Ordering::SeqCst);
    }

    fn set_title(&self, identifier: &str) {
        if let Ok(mut title) = self.title.lock() {
            *title = identifier.to_string();
        }
    }

    fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }
}

/// View factory producing presentation-free surfaces for any record.
#[derive(Debug, Default)]
pub struct PlainViewFactory;

impl ViewFactory for PlainViewFactory {
    fn name(&self) -> &str {
        "plain"
    }

    fn try_create(
        &self,
        _record: &DocumentRecord,
    ) -> Result<Option<Arc<dyn ViewSurface>>, CreationFailure> {
        Ok(Some(Arc::new(PlainViewSurface::new())))
    }
}
