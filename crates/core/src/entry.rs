//! Page entry model
//!
//! One entry per page drawn from a source document. Entries carry a stable
//! identity, their origin within the source, their current 1-based display
//! position, and the asynchronously populated thumbnail.

use crate::source::SourceId;
use pdf_binder_render::{PageSource, Thumbnail};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Unique identifier for a page entry.
///
/// Assigned once when the entry is created, stable across reorders and
/// never reused.
pub type PageId = Uuid;

/// One page of one source document inside the collection.
#[derive(Clone)]
pub struct PageEntry {
    /// Entry identity (stable, never reused)
    pub id: PageId,

    /// Identity of the owning source document
    pub source_id: SourceId,

    /// Display name of the source (immutable, derived from its origin)
    pub source_label: String,

    /// Index of this page within its original source document (0-based)
    pub origin_index: u16,

    /// 1-based position in the current collection order; recomputed whenever
    /// the order changes
    pub display_index: usize,

    /// Rendered thumbnail; `None` until the pipeline publishes one
    pub thumbnail: Option<Thumbnail>,

    /// Handle to the underlying page content, used for rendering and final
    /// assembly only; the collection does not own the document lifetime
    source: Arc<dyn PageSource>,
}

impl PageEntry {
    /// Create a fresh entry with a new identity and no thumbnail.
    ///
    /// `display_index` starts at 0 and is assigned by the collection's
    /// renumbering pass before the entry becomes observable.
    pub(crate) fn new(
        source_id: SourceId,
        source_label: String,
        origin_index: u16,
        source: Arc<dyn PageSource>,
    ) -> Self {
        Self {
            id: PageId::new_v4(),
            source_id,
            source_label,
            origin_index,
            display_index: 0,
            thumbnail: None,
            source,
        }
    }

    /// Get the page content handle.
    pub fn source(&self) -> &Arc<dyn PageSource> {
        &self.source
    }

    /// Check whether a thumbnail has been published for this entry.
    pub fn has_thumbnail(&self) -> bool {
        self.thumbnail.is_some()
    }

    /// Build the serializable snapshot the UI layer renders.
    pub fn summary(&self) -> PageSummary {
        PageSummary {
            id: self.id,
            source_id: self.source_id,
            source_label: self.source_label.clone(),
            origin_index: self.origin_index,
            display_index: self.display_index,
            has_thumbnail: self.has_thumbnail(),
        }
    }
}

impl fmt::Debug for PageEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageEntry")
            .field("id", &self.id)
            .field("source_id", &self.source_id)
            .field("source_label", &self.source_label)
            .field("origin_index", &self.origin_index)
            .field("display_index", &self.display_index)
            .field("has_thumbnail", &self.has_thumbnail())
            .finish()
    }
}

/// Read-only snapshot of a page entry for the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PageSummary {
    pub id: PageId,
    pub source_id: SourceId,
    pub source_label: String,
    pub origin_index: u16,
    pub display_index: usize,
    pub has_thumbnail: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSource;

    #[test]
    fn test_entry_ids_are_unique() {
        let source: Arc<dyn PageSource> = Arc::new(FakeSource::new(2));

        let a = PageEntry::new(1, "doc".to_string(), 0, Arc::clone(&source));
        let b = PageEntry::new(1, "doc".to_string(), 1, source);

        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_new_entry_has_no_thumbnail() {
        let source: Arc<dyn PageSource> = Arc::new(FakeSource::new(1));
        let entry = PageEntry::new(1, "doc".to_string(), 0, source);

        assert!(!entry.has_thumbnail());
        assert_eq!(entry.display_index, 0);
    }

    #[test]
    fn test_summary_reflects_entry() {
        let source: Arc<dyn PageSource> = Arc::new(FakeSource::new(3));
        let mut entry = PageEntry::new(4, "report".to_string(), 2, source);
        entry.display_index = 7;

        let summary = entry.summary();
        assert_eq!(summary.id, entry.id);
        assert_eq!(summary.source_id, 4);
        assert_eq!(summary.source_label, "report");
        assert_eq!(summary.origin_index, 2);
        assert_eq!(summary.display_index, 7);
        assert!(!summary.has_thumbnail);
    }

    #[test]
    fn test_summary_serialization() {
        let source: Arc<dyn PageSource> = Arc::new(FakeSource::new(1));
        let entry = PageEntry::new(1, "scan".to_string(), 0, source);

        let json = serde_json::to_string(&entry.summary()).unwrap();
        let parsed: PageSummary = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, entry.summary());
    }
}
