//! Stable document identity.
//!
//! # Responsibility
//! - Wrap the opaque, comparable identity string of one loadable document.
//! - Synthesize identities for documents nested inside another document.
//!
//! # Invariants
//! - Identity equality, not object identity, decides document sameness.
//! - Nested synthesis uses `#` below an identity without `#`, and `.` below
//!   an identity that already contains `#`, so a fragment separator is never
//!   reused at the next nesting level.

use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Opaque comparable identity of one loadable document.
///
/// For a top-level document this is the canonical form of its source
/// locator. For a nested document it is synthesized from the parent
/// identity via [`ResourceIdentity::nested`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ResourceIdentity(String);

impl ResourceIdentity {
    /// Creates an identity from already-canonical text.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_string())
    }

    /// Returns the identity text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Synthesizes the identity of a document nested under this one.
    ///
    /// The first nesting level under a plain identity uses `#`; any level
    /// below an identity that already carries `#` switches to `.`.
    pub fn nested(&self, local_name: &str) -> ResourceIdentity {
        let separator = if self.0.contains('#') { '.' } else { '#' };
        ResourceIdentity(format!("{}{}{}", self.0, separator, local_name.trim()))
    }

    /// Returns whether this identity was synthesized from a parent.
    pub fn is_nested(&self) -> bool {
        self.0.contains('#')
    }
}

impl Display for ResourceIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::ResourceIdentity;

    #[test]
    fn first_nesting_level_uses_hash_separator() {
        let parent = ResourceIdentity::new("file:///models/plant.mdl");
        let child = parent.nested("controller");
        assert_eq!(child.as_str(), "file:///models/plant.mdl#controller");
    }

    #[test]
    fn deeper_nesting_switches_to_dot_separator() {
        let parent = ResourceIdentity::new("file:///models/plant.mdl");
        let child = parent.nested("controller");
        let grandchild = child.nested("gain");
        assert_eq!(
            grandchild.as_str(),
            "file:///models/plant.mdl#controller.gain"
        );
    }

    #[test]
    fn locator_with_literal_hash_is_not_reused_as_separator() {
        let parent = ResourceIdentity::new("file:///models/a.mdl#in_external_viewer");
        let child = parent.nested("sub");
        assert_eq!(
            child.as_str(),
            "file:///models/a.mdl#in_external_viewer.sub"
        );
    }

    #[test]
    fn identity_equality_is_textual() {
        let a = ResourceIdentity::new("file:///m.mdl");
        let b = ResourceIdentity::new("  file:///m.mdl ");
        assert_eq!(a, b);
        assert!(!a.is_nested());
    }
}
