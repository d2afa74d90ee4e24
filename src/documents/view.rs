use tracing::warn;

use crate::documents::model::Document;
use crate::render;

/// View-model behind the document detail screen.
///
/// Holds the last document shown and only produces new output when the
/// rendering actually changes, so repeated pending polls stay quiet.
#[derive(Debug)]
pub struct DocumentView {
    base_url: String,
    current: Option<Document>,
    rendered: Option<String>,
}

impl DocumentView {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            current: None,
            rendered: None,
        }
    }

    pub fn current(&self) -> Option<&Document> {
        self.current.as_ref()
    }

    /// Takes a freshly fetched document; returns text to print, if any.
    pub fn apply(&mut self, doc: Document) -> Option<String> {
        if let Some(prev) = &self.current {
            if prev.status.is_terminal() && !doc.status.is_terminal() {
                warn!(
                    id = ?doc.id,
                    kept = ?prev.status,
                    received = ?doc.status,
                    "ignoring status regression"
                );
                return None;
            }
        }
        let text = render::document_detail(&doc, &self.base_url);
        self.current = Some(doc);
        if self.rendered.as_deref() == Some(text.as_str()) {
            return None;
        }
        self.rendered = Some(text.clone());
        Some(text)
    }
}
