//! PDF Binder Core Library
//!
//! Page collection engine: the ordered list of pages drawn from multiple
//! source documents, the selection set, reorder/delete/reverse operations,
//! and the batched, cancellable thumbnail pipeline behind them.

pub mod collection;
pub mod entry;
pub mod export;
pub mod import;
pub mod pipeline;
pub mod source;

#[cfg(test)]
pub(crate) mod testing;

pub use collection::{
    CollectionConfig, CollectionError, OperationStatus, PageCollection,
};
pub use entry::{PageEntry, PageId, PageSummary};
pub use export::{ExportPage, ExportSink};
pub use import::{DocumentImporter, ImportReport, SourceOpener};
pub use pipeline::{PublishFn, RenderKey, RenderRequest, ThumbnailPipeline};
pub use source::{SourceId, SourceRegistry};
