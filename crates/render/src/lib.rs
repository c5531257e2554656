//! PDF Binder Render Library
//!
//! PDFium-backed document opening and fixed-box thumbnail rendering.

pub mod pdf;
pub mod thumbnail;

pub use pdf::{source_label_for_path, PdfDocument, PdfError, PdfResult};
pub use thumbnail::{fit_within, PageSource, Thumbnail, ThumbnailTarget};
