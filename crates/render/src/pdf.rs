//! PDF document abstraction layer
//!
//! Provides a high-level interface to PDF source documents using PDFium.

use pdfium_render::prelude::*;
use std::path::Path;

/// Errors that can occur during PDF operations
#[derive(Debug)]
pub enum PdfError {
    /// Failed to initialize PDFium library
    InitializationError(String),

    /// Failed to open a file as a PDF document
    LoadError(String),

    /// Invalid page index
    InvalidPageIndex(u16),

    /// Rendering error
    RenderError(String),
}

impl std::fmt::Display for PdfError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PdfError::InitializationError(msg) => write!(f, "PDFium initialization error: {}", msg),
            PdfError::LoadError(msg) => write!(f, "PDF load error: {}", msg),
            PdfError::InvalidPageIndex(idx) => write!(f, "Invalid page index: {}", idx),
            PdfError::RenderError(msg) => write!(f, "PDF render error: {}", msg),
        }
    }
}

impl std::error::Error for PdfError {}

/// Result type for PDF operations
pub type PdfResult<T> = Result<T, PdfError>;

/// An opened PDF source document
///
/// Wraps a PDFium document and exposes the narrow surface the page
/// collection needs: a page count, page geometry, and per-page rendering.
pub struct PdfDocument {
    /// The loaded PDF document (owns the Pdfium instance internally)
    document: pdfium_render::prelude::PdfDocument<'static>,
}

impl PdfDocument {
    /// Initialize PDFium library (helper function)
    ///
    /// Search order:
    /// 1. Executable's directory (for app bundles)
    /// 2. Current working directory
    /// 3. System library paths
    fn init_pdfium() -> PdfResult<Pdfium> {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()));

        if let Some(ref dir) = exe_dir {
            if let Ok(bindings) =
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
            {
                return Ok(Pdfium::new(bindings));
            }
        }

        Ok(Pdfium::new(
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library())
                .map_err(|e| PdfError::InitializationError(e.to_string()))?,
        ))
    }

    /// Open a PDF document from a file path
    ///
    /// Fails with [`PdfError::LoadError`] if the file is not a valid PDF.
    pub fn open<P: AsRef<Path>>(path: P) -> PdfResult<Self> {
        let pdfium = Box::leak(Box::new(Self::init_pdfium()?));

        let document = pdfium
            .load_pdf_from_file(path.as_ref(), None)
            .map_err(|e| PdfError::LoadError(e.to_string()))?;

        Ok(Self { document })
    }

    /// Open a PDF document from owned byte data
    ///
    /// Used when the host hands over file contents it already read (e.g.
    /// from a file-picker security scope).
    pub fn from_bytes(data: Vec<u8>) -> PdfResult<Self> {
        let pdfium = Box::leak(Box::new(Self::init_pdfium()?));

        // Leak the data to get a 'static reference for the binding
        let data_static: &'static [u8] = Box::leak(data.into_boxed_slice());

        let document = pdfium
            .load_pdf_from_byte_slice(data_static, None)
            .map_err(|e| PdfError::LoadError(e.to_string()))?;

        Ok(Self { document })
    }

    /// Get the number of pages in the document
    pub fn page_count(&self) -> u16 {
        self.document.pages().len()
    }

    /// Get a page's bounding box size in points (1/72 inch)
    ///
    /// # Arguments
    /// * `index` - Zero-based page index
    pub fn page_size(&self, index: u16) -> PdfResult<(f32, f32)> {
        let page = self
            .document
            .pages()
            .get(index)
            .map_err(|_| PdfError::InvalidPageIndex(index))?;
        Ok((page.width().value, page.height().value))
    }

    /// Render a page to RGBA pixel data at the given pixel size
    ///
    /// # Arguments
    /// * `index` - Zero-based page index
    /// * `width` - Target width in pixels
    /// * `height` - Target height in pixels
    ///
    /// # Returns
    /// RGBA pixel data (4 bytes per pixel) or an error
    pub fn render_page_rgba(&self, index: u16, width: u32, height: u32) -> PdfResult<Vec<u8>> {
        let page = self
            .document
            .pages()
            .get(index)
            .map_err(|_| PdfError::InvalidPageIndex(index))?;

        let config = PdfRenderConfig::new()
            .set_target_width(width as i32)
            .set_target_height(height as i32);

        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| PdfError::RenderError(e.to_string()))?;

        Ok(bitmap.as_rgba_bytes())
    }
}

/// Derive a display label for a source from its file path
///
/// Uses the file stem ("report" for `/tmp/report.pdf`); falls back to the
/// whole file name, then to a fixed placeholder for pathless sources.
pub fn source_label_for_path<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();
    path.file_stem()
        .or_else(|| path.file_name())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Untitled".to_string())
}
