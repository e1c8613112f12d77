//! Source locator parsing and canonicalization.
//!
//! # Responsibility
//! - Normalize user-supplied locator text into a canonical, comparable form.
//! - Split off the well-known marker fragments factories may consult.
//!
//! # Invariants
//! - The canonical form of a locator is the identity of the top-level
//!   document it names.
//! - Marker fragments never leak into the canonical form.

use crate::model::identity::ResourceIdentity;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

static URI_SCHEME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").expect("valid scheme regex"));

/// Marker fragment recognized at the end of a locator.
///
/// Markers steer factory selection without changing document identity,
/// e.g. `plant.mdl#as_text` forces the plain-text record shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorMarker {
    /// Open a textual representation of the source.
    AsText,
    /// Hand the source to an external viewer instead of an editor view.
    InExternalViewer,
}

impl LocatorMarker {
    /// Stable fragment text used in locator input.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AsText => LOCATOR_MARKER_AS_TEXT,
            Self::InExternalViewer => LOCATOR_MARKER_IN_EXTERNAL_VIEWER,
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            LOCATOR_MARKER_AS_TEXT => Some(Self::AsText),
            LOCATOR_MARKER_IN_EXTERNAL_VIEWER => Some(Self::InExternalViewer),
            _ => None,
        }
    }
}

/// Fragment text for the plain-text marker.
pub const LOCATOR_MARKER_AS_TEXT: &str = "as_text";
/// Fragment text for the external-viewer marker.
pub const LOCATOR_MARKER_IN_EXTERNAL_VIEWER: &str = "in_external_viewer";

/// Locator parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatorError {
    /// Locator text is blank after trim.
    EmptySpec,
}

impl Display for LocatorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptySpec => write!(f, "source locator must not be blank"),
        }
    }
}

impl Error for LocatorError {}

/// One parsed source locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocator {
    spec: String,
    marker: Option<LocatorMarker>,
}

impl SourceLocator {
    /// Parses raw locator text, splitting off a trailing known marker.
    ///
    /// Unknown `#fragment` text stays part of the spec so that sources whose
    /// names legitimately contain `#` keep their identity.
    pub fn parse(raw: &str) -> Result<Self, LocatorError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(LocatorError::EmptySpec);
        }

        if let Some((head, fragment)) = trimmed.rsplit_once('#') {
            if !head.is_empty() {
                if let Some(marker) = LocatorMarker::parse(fragment) {
                    return Ok(Self {
                        spec: head.to_string(),
                        marker: Some(marker),
                    });
                }
            }
        }

        Ok(Self {
            spec: trimmed.to_string(),
            marker: None,
        })
    }

    /// Returns a copy of this locator carrying the given marker.
    pub fn with_marker(&self, marker: LocatorMarker) -> Self {
        Self {
            spec: self.spec.clone(),
            marker: Some(marker),
        }
    }

    /// Returns the marker fragment, if any.
    pub fn marker(&self) -> Option<LocatorMarker> {
        self.marker
    }

    /// Returns the locator spec without marker fragment.
    pub fn spec(&self) -> &str {
        &self.spec
    }

    /// Returns the canonical locator form used as document identity.
    ///
    /// Specs that already carry a URI scheme pass through unchanged; bare
    /// paths are rendered in a `file://` form with forward slashes.
    pub fn canonical(&self) -> String {
        if URI_SCHEME_RE.is_match(&self.spec) {
            return self.spec.clone();
        }
        format!("file://{}", self.spec.replace('\\', "/"))
    }

    /// Returns the identity of the document this locator names.
    pub fn identity(&self) -> ResourceIdentity {
        ResourceIdentity::new(self.canonical())
    }

    /// Returns the local filesystem path for file-backed locators.
    pub fn path(&self) -> Option<PathBuf> {
        if let Some(stripped) = self.spec.strip_prefix("file://") {
            return Some(PathBuf::from(stripped));
        }
        if URI_SCHEME_RE.is_match(&self.spec) {
            return None;
        }
        Some(PathBuf::from(&self.spec))
    }
}

impl Display for SourceLocator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.marker {
            Some(marker) => write!(f, "{}#{}", self.spec, marker.as_str()),
            None => write!(f, "{}", self.spec),
        }
    }
}
