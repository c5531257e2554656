//! Document import
//!
//! Opens candidate source files and feeds them into the page collection.
//! A file that fails to open as a document is skipped and recorded while
//! the rest of the batch still imports.

use crate::collection::{OperationStatus, PageCollection};
use pdf_binder_render::{source_label_for_path, PageSource, PdfDocument, PdfResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Opens a file path as a page source.
///
/// The production opener goes through PDFium; tests substitute fakes so the
/// suite never needs the native library.
pub trait SourceOpener: Send + Sync {
    fn open(&self, path: &Path) -> PdfResult<Arc<dyn PageSource>>;
}

/// PDFium-backed opener used by default.
struct PdfiumOpener;

impl SourceOpener for PdfiumOpener {
    fn open(&self, path: &Path) -> PdfResult<Arc<dyn PageSource>> {
        let document = PdfDocument::open(path)?;
        Ok(Arc::new(document))
    }
}

/// Outcome of one import batch.
///
/// Per-file failures are collected here rather than aborting the batch.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ImportReport {
    /// Number of sources opened and added
    pub sources_added: usize,

    /// Number of page entries appended across all added sources
    pub pages_added: usize,

    /// Files that could not be opened, with the reason
    pub failures: Vec<(PathBuf, String)>,
}

impl ImportReport {
    /// Check whether every candidate file was imported.
    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Imports source files into a page collection.
///
/// Holds a collection clone; opening runs on the caller's thread (expected
/// to be off the UI), thumbnail rendering is scheduled by the collection.
pub struct DocumentImporter {
    collection: PageCollection,
    opener: Arc<dyn SourceOpener>,
}

impl DocumentImporter {
    /// Create an importer that opens files through PDFium.
    pub fn new(collection: PageCollection) -> Self {
        Self::with_opener(collection, Arc::new(PdfiumOpener))
    }

    /// Create an importer with an explicit opener.
    pub fn with_opener(collection: PageCollection, opener: Arc<dyn SourceOpener>) -> Self {
        Self { collection, opener }
    }

    /// Import a batch of candidate files, in order.
    ///
    /// Each file that opens contributes its pages at the collection's tail;
    /// a file that fails to open is skipped and recorded in the report.
    /// The collection is marked busy for the duration and its status is set
    /// to the batch outcome.
    pub fn import_files<P: AsRef<Path>>(&self, paths: &[P]) -> ImportReport {
        let mut report = ImportReport::default();

        self.collection.set_importing(true);
        for path in paths {
            let path = path.as_ref();
            match self.opener.open(path) {
                Ok(handle) => {
                    let label = source_label_for_path(path);
                    let ids = self.collection.add_source(handle, &label);
                    report.sources_added += 1;
                    report.pages_added += ids.len();
                }
                Err(err) => {
                    log::warn!("skipping source {}: {}", path.display(), err);
                    report.failures.push((path.to_path_buf(), err.to_string()));
                }
            }
        }
        self.collection.set_importing(false);

        self.collection.set_status(status_for(&report));
        self.collection.notify();
        report
    }

    /// Get the collection this importer feeds.
    pub fn collection(&self) -> &PageCollection {
        &self.collection
    }
}

fn status_for(report: &ImportReport) -> OperationStatus {
    if report.failures.is_empty() {
        OperationStatus::ok(format!(
            "Added {} pages from {} documents",
            report.pages_added, report.sources_added
        ))
    } else if report.sources_added > 0 {
        OperationStatus::ok(format!(
            "Added {} pages from {} documents, skipped {} files",
            report.pages_added,
            report.sources_added,
            report.failures.len()
        ))
    } else {
        OperationStatus::failed(format!("Could not open {} files", report.failures.len()))
    }
}
