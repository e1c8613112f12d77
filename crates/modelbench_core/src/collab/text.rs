//! Plain-text collaborators.
//!
//! The textual record shape is the coordinator's last-resort fallback: any
//! file-backed source can at least be presented as text. The parser here
//! also serves headless embeddings such as the command-line surface.

use crate::collab::{ContentError, DocumentContent, ParseFailure, SourceParser};
use crate::model::locator::SourceLocator;
use log::debug;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Document content holding the raw text of a source.
#[derive(Debug)]
pub struct TextDocumentContent {
    text: String,
}

impl TextDocumentContent {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Returns the held text.
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl DocumentContent for TextDocumentContent {
    fn kind(&self) -> &'static str {
        "text"
    }

    fn write_to(&self, target: &Path) -> Result<(), ContentError> {
        std::fs::write(target, &self.text)?;
        Ok(())
    }
}

/// File-reading source parser with a per-locator cache.
///
/// `parse` serves repeated opens of one locator from cache; `forget` drops
/// the cached entry so the next open re-reads from source.
#[derive(Debug, Default)]
pub struct TextSourceParser {
    cache: Mutex<BTreeMap<String, Arc<TextDocumentContent>>>,
}

impl TextSourceParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether a cached parse exists for `locator`.
    pub fn is_cached(&self, locator: &str) -> bool {
        self.cache
            .lock()
            .map(|cache| cache.contains_key(locator))
            .unwrap_or(false)
    }
}

impl SourceParser for TextSourceParser {
    fn parse(&self, locator: &SourceLocator) -> Result<Arc<dyn DocumentContent>, ParseFailure> {
        let key = locator.canonical();
        if let Ok(cache) = self.cache.lock() {
            if let Some(content) = cache.get(&key) {
                debug!("event=parse module=collab status=cache_hit locator={key}");
                return Ok(content.clone());
            }
        }

        let path = locator.path().ok_or_else(|| ParseFailure {
            locator: key.clone(),
            message: "locator is not file-backed".to_string(),
        })?;
        let text = std::fs::read_to_string(&path).map_err(|err| ParseFailure {
            locator: key.clone(),
            message: err.to_string(),
        })?;

        let content = Arc::new(TextDocumentContent::new(text));
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key.clone(), content.clone());
        }
        debug!("event=parse module=collab status=ok locator={key}");
        Ok(content)
    }

    fn forget(&self, locator: &str) {
        if let Ok(mut cache) = self.cache.lock() {
            if cache.remove(locator).is_some() {
                debug!("event=parse_forget module=collab status=ok locator={locator}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{TextDocumentContent, TextSourceParser};
    use crate::collab::{DocumentContent, SourceParser};
    use crate::model::locator::SourceLocator;
    use std::io::Write;

    fn temp_source(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp source file");
        file.write_all(content.as_bytes()).expect("write source");
        file
    }

    #[test]
    fn parses_file_backed_locator_and_caches() {
        let source = temp_source("gain = 2\n");
        let locator = SourceLocator::parse(source.path().to_str().expect("utf-8 path"))
            .expect("locator parse");

        let parser = TextSourceParser::new();
        assert!(!parser.is_cached(&locator.canonical()));
        parser.parse(&locator).expect("first parse");
        assert!(parser.is_cached(&locator.canonical()));
    }

    #[test]
    fn forget_drops_cached_parse_state() {
        let source = temp_source("x\n");
        let locator = SourceLocator::parse(source.path().to_str().expect("utf-8 path"))
            .expect("locator parse");

        let parser = TextSourceParser::new();
        parser.parse(&locator).expect("parse");
        parser.forget(&locator.canonical());
        assert!(!parser.is_cached(&locator.canonical()));
    }

    #[test]
    fn rejects_non_file_locator() {
        let parser = TextSourceParser::new();
        let locator = SourceLocator::parse("https://example.org/a.mdl").expect("locator parse");
        let err = parser.parse(&locator).expect_err("non-file parse must fail");
        assert!(err.message.contains("not file-backed"));
    }

    #[test]
    fn text_content_writes_itself_out() {
        let content = TextDocumentContent::new("body\n");
        let dir = tempfile::tempdir().expect("temp dir");
        let target = dir.path().join("out.txt");
        content.write_to(&target).expect("write out");
        let written = std::fs::read_to_string(&target).expect("read back");
        assert_eq!(written, "body\n");
    }
}
