//! Export surface
//!
//! Hands the collection's ordered page handles to a caller-supplied sink
//! that assembles the single output document. Assembly itself (and any
//! retry) is the sink implementor's concern; a sink failure is surfaced
//! verbatim.

use crate::collection::{CollectionError, OperationStatus, PageCollection};
use crate::source::SourceId;
use pdf_binder_render::PageSource;
use std::sync::Arc;

/// One page in assembly order, as handed to the export sink.
pub struct ExportPage {
    /// Owning source document
    pub source_id: SourceId,

    /// Page index within the source (0-based)
    pub origin_index: u16,

    source: Arc<dyn PageSource>,
}

impl ExportPage {
    /// Get the page content handle.
    pub fn source(&self) -> &Arc<dyn PageSource> {
        &self.source
    }
}

/// Assembles the final output document from ordered pages.
///
/// Implemented by the host application over its PDF writing library; the
/// core never retries a failed assembly.
pub trait ExportSink {
    fn assemble(&self, pages: &[ExportPage]) -> Result<(), String>;
}

impl PageCollection {
    /// Ordered page handles for final assembly.
    pub fn export_pages(&self) -> Vec<ExportPage> {
        self.entries()
            .into_iter()
            .map(|entry| ExportPage {
                source_id: entry.source_id,
                origin_index: entry.origin_index,
                source: Arc::clone(entry.source()),
            })
            .collect()
    }

    /// Run an export sink over the current page order.
    ///
    /// An empty collection is rejected before the sink is invoked. Returns
    /// the number of pages handed to the sink; the outcome is also recorded
    /// in the collection status.
    pub fn export_with(&self, sink: &dyn ExportSink) -> Result<usize, CollectionError> {
        let pages = self.export_pages();
        if pages.is_empty() {
            let err = CollectionError::NothingToExport;
            self.set_status(OperationStatus::failed(err.to_string()));
            return Err(err);
        }

        match sink.assemble(&pages) {
            Ok(()) => {
                self.set_status(OperationStatus::ok(format!("Exported {} pages", pages.len())));
                Ok(pages.len())
            }
            Err(message) => {
                log::warn!("export sink failed: {}", message);
                let err = CollectionError::ExportFailed(message);
                self.set_status(OperationStatus::failed(err.to_string()));
                Err(err)
            }
        }
    }
}
