//! External collaborator contracts.
//!
//! # Responsibility
//! - Define the interfaces the lifecycle core calls out through: source
//!   parsing, confirmation prompts, rendering surfaces, writability probing,
//!   and process shutdown.
//! - Keep the core free of rendering and file-format knowledge.
//!
//! # Invariants
//! - Collaborator calls are synchronous and fallible; the core never blocks
//!   on anything it cannot observe as a return value.

use crate::model::identity::ResourceIdentity;
use crate::model::locator::SourceLocator;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub mod text;

/// Failure reported by the source parser collaborator.
#[derive(Debug)]
pub struct ParseFailure {
    /// Locator the parser was asked to read.
    pub locator: String,
    /// Parser-side failure description.
    pub message: String,
}

impl Display for ParseFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to parse `{}`: {}", self.locator, self.message)
    }
}

impl Error for ParseFailure {}

/// Failure reported by content-level operations.
#[derive(Debug)]
pub enum ContentError {
    /// Content does not support the requested operation.
    Unsupported(&'static str),
    /// Underlying I/O failure while writing or executing.
    Io(std::io::Error),
}

impl Display for ContentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unsupported(operation) => {
                write!(f, "content does not support operation `{operation}`")
            }
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ContentError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Unsupported(_) => None,
        }
    }
}

impl From<std::io::Error> for ContentError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Handle to the loaded body of one document.
///
/// The core never inspects content structure; it only consults the
/// capabilities below and delegates persistence back to the content's own
/// writer.
pub trait DocumentContent {
    /// Short content-kind tag used in logs and statistics.
    fn kind(&self) -> &'static str;

    /// View factory names declared by the content itself, in preference
    /// order. An empty list defers to the coordinator's default factories.
    fn view_factory_hints(&self) -> Vec<String> {
        Vec::new()
    }

    /// Whether records holding this content may contain child records.
    fn accepts_children(&self) -> bool {
        false
    }

    /// Identity of an independent top-level origin of this content, when it
    /// has one distinct from its structural parent.
    fn origin_identity(&self) -> Option<ResourceIdentity> {
        None
    }

    /// Applies one named parameter override. Returns whether the content
    /// recognized the parameter.
    fn set_parameter(&self, _name: &str, _value: &str) -> bool {
        false
    }

    /// Runs the content to completion on the calling thread.
    fn execute(&self) -> Result<(), ContentError> {
        Err(ContentError::Unsupported("execute"))
    }

    /// Persists the content through its own writer.
    fn write_to(&self, _target: &Path) -> Result<(), ContentError> {
        Err(ContentError::Unsupported("write_to"))
    }
}

impl std::fmt::Debug for dyn DocumentContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentContent")
            .field("kind", &self.kind())
            .finish()
    }
}

/// Source parser collaborator.
pub trait SourceParser {
    /// Reads and parses the source named by `locator`.
    fn parse(&self, locator: &SourceLocator) -> Result<Arc<dyn DocumentContent>, ParseFailure>;

    /// Drops any cached parse state for `locator` so a later re-open
    /// re-reads from source.
    fn forget(&self, locator: &str);

    /// Whether a parser-side filter mutated the content during the most
    /// recent load.
    fn content_modified_by_filter(&self) -> bool {
        false
    }
}

/// Confirmation collaborator for discard/overwrite prompts.
pub trait ConfirmationGate {
    /// Asks whether unsaved changes of `identity` may be discarded.
    fn confirm_discard(&self, identity: &ResourceIdentity) -> bool;

    /// Asks whether `target` may be overwritten.
    fn confirm_overwrite(&self, target: &Path) -> bool;
}

/// Confirmation gate that always answers yes. Used by headless runs.
#[derive(Debug, Default)]
pub struct AutoConfirmGate;

impl ConfirmationGate for AutoConfirmGate {
    fn confirm_discard(&self, _identity: &ResourceIdentity) -> bool {
        true
    }

    fn confirm_overwrite(&self, _target: &Path) -> bool {
        true
    }
}

/// Rendering collaborator behind one view.
pub trait ViewSurface {
    /// Brings the presentation to the foreground. Idempotent.
    fn show(&self);

    /// Propagates the editable flag into user-input surfaces.
    fn set_editable(&self, editable: bool);

    /// Updates the user-visible title.
    fn set_title(&self, identifier: &str);

    /// Releases presentation resources. Called exactly once per view.
    fn dispose(&self);
}

/// Probe for write access to a document origin.
pub trait WritabilityProbe {
    /// Returns whether `origin` accepts writes.
    fn can_write(&self, origin: &Path) -> bool;
}

/// Filesystem-backed writability probe.
#[derive(Debug, Default)]
pub struct FsWritabilityProbe;

impl WritabilityProbe for FsWritabilityProbe {
    fn can_write(&self, origin: &Path) -> bool {
        match std::fs::metadata(origin) {
            Ok(metadata) => !metadata.permissions().readonly(),
            // A missing origin is writable: saving will create it.
            Err(_) => true,
        }
    }
}

/// Shutdown collaborator signalled when the directory empties.
pub trait ShutdownHook {
    /// Requests orderly process shutdown.
    fn request_shutdown(&self);
}

/// Shutdown hook that records the request instead of exiting.
///
/// Embedding hosts and tests read the flag; a process entry point may poll
/// it and exit on its own terms.
#[derive(Debug, Default)]
pub struct DeferredShutdownHook {
    requested: AtomicBool,
}

impl DeferredShutdownHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether shutdown has been requested.
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

impl ShutdownHook for DeferredShutdownHook {
    fn request_shutdown(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }
}
