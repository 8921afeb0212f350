//! Document access: the [`PageSource`] seam and its pdfium implementation.
//!
//! Extraction policies only ever ask three questions of a document: how many
//! pages, what text is on page *i*, and what page *i* looks like. Putting
//! those behind a trait keeps the policies pure and lets tests feed synthetic
//! documents without a pdfium library on the machine.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which uses thread-local
//! state and is not safe to call from async contexts. [`open_and_extract`]
//! runs the whole open → extract → close sequence on the blocking pool, and
//! the `PdfDocument` is dropped inside that closure, so the file handle is
//! released before the orchestrator moves on to inference.

use crate::error::{ClassifyError, DocumentFault};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming an existing libpdfium to bind to.
pub const PDFIUM_LIB_ENV: &str = "PDFIUM_LIB_PATH";

/// Read access to the pages of one open document.
pub trait PageSource {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Text layer of page `index` (0-based). Empty for image-only pages.
    fn page_text(&self, index: usize) -> Result<String, DocumentFault>;

    /// Rasterise page `index` at `dpi`, capping the longest edge at `max_pixels`.
    fn render_page(
        &self,
        index: usize,
        dpi: u32,
        max_pixels: u32,
    ) -> Result<DynamicImage, DocumentFault>;
}

/// A loaded pdfium document.
pub struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl<'a> PdfiumDocument<'a> {
    pub fn new(document: PdfDocument<'a>) -> Self {
        Self { document }
    }

    fn page(&self, index: usize) -> Result<PdfPage<'a>, DocumentFault> {
        self.document
            .pages()
            .get(index as u16)
            .map_err(|e| DocumentFault::corrupt(format!("page {}: {:?}", index + 1, e)))
    }
}

impl PageSource for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page_text(&self, index: usize) -> Result<String, DocumentFault> {
        let page = self.page(index)?;
        let text = page.text().map_err(|e| {
            DocumentFault::corrupt(format!("text layer of page {}: {:?}", index + 1, e))
        })?;
        Ok(text.all())
    }

    fn render_page(
        &self,
        index: usize,
        dpi: u32,
        max_pixels: u32,
    ) -> Result<DynamicImage, DocumentFault> {
        let page = self.page(index)?;
        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(dpi as f32 / 72.0)
            .set_maximum_width(max_pixels as i32)
            .set_maximum_height(max_pixels as i32);

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            DocumentFault::corrupt(format!("rasterising page {}: {:?}", index + 1, e))
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px at {} DPI",
            index + 1,
            image.width(),
            image.height(),
            dpi
        );
        Ok(image)
    }
}

/// Bind to a pdfium library.
///
/// Resolution order: `PDFIUM_LIB_PATH`, a library next to the working
/// directory, then the system library search path.
pub fn bind_pdfium() -> Result<Pdfium, ClassifyError> {
    let bindings = match std::env::var(PDFIUM_LIB_ENV) {
        Ok(path) if !path.trim().is_empty() => Pdfium::bind_to_library(path),
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| ClassifyError::PdfiumBindingFailed(format!("{e:?}")))?;

    Ok(Pdfium::new(bindings))
}

/// Check that pdfium can be bound, without opening any document.
///
/// Run once before a pass so a missing library fails fast instead of turning
/// every document into `ARCHIVO_CORRUPTO`.
pub async fn check_pdfium() -> Result<(), ClassifyError> {
    tokio::task::spawn_blocking(|| bind_pdfium().map(|_| ()))
        .await
        .map_err(|e| ClassifyError::Internal(format!("pdfium check panicked: {e}")))?
}

/// How far into the file the `%PDF` header may start.
pub const PDF_HEADER_WINDOW: u64 = 1024;

/// Verify the `%PDF` magic appears within the first [`PDF_HEADER_WINDOW`] bytes.
pub fn check_pdf_magic(path: &Path) -> Result<(), DocumentFault> {
    let file = std::fs::File::open(path)
        .map_err(|e| DocumentFault::corrupt(format!("cannot open file: {e}")))?;
    let mut head = Vec::with_capacity(PDF_HEADER_WINDOW as usize);
    file.take(PDF_HEADER_WINDOW)
        .read_to_end(&mut head)
        .map_err(|e| DocumentFault::corrupt(format!("cannot read file: {e}")))?;

    if head.len() < 4 {
        return Err(DocumentFault::corrupt("file is too short to be a PDF"));
    }
    if !head.windows(4).any(|w| w == b"%PDF") {
        return Err(DocumentFault::corrupt(format!(
            "not a PDF file (no %PDF header in the first {} bytes)",
            head.len()
        )));
    }
    Ok(())
}

/// Open `path` with pdfium on the blocking pool and run `extract` against it.
///
/// The document is closed before this function returns, on every path.
/// Open failures (corrupt file, wrong or missing password) become
/// [`DocumentFault::Corrupt`].
pub async fn open_and_extract<T, F>(
    path: &Path,
    password: Option<&str>,
    extract: F,
) -> Result<T, DocumentFault>
where
    T: Send + 'static,
    F: FnOnce(&dyn PageSource) -> T + Send + 'static,
{
    let path: PathBuf = path.to_path_buf();
    let password = password.map(str::to_string);

    tokio::task::spawn_blocking(move || {
        check_pdf_magic(&path)?;
        let pdfium = bind_pdfium().map_err(|e| DocumentFault::corrupt(e.to_string()))?;
        let document = pdfium
            .load_pdf_from_file(&path, password.as_deref())
            .map_err(|e| {
                DocumentFault::corrupt(describe_load_error(&format!("{e:?}"), password.is_some()))
            })?;
        let source = PdfiumDocument::new(document);
        debug!("Opened {} ({} pages)", path.display(), source.page_count());
        Ok(extract(&source))
    })
    .await
    .map_err(|e| DocumentFault::PipelineFault(format!("extraction task panicked: {e}")))?
}

fn describe_load_error(detail: &str, had_password: bool) -> String {
    if detail.contains("Password") || detail.contains("password") {
        if had_password {
            "wrong password for encrypted PDF".to_string()
        } else {
            "PDF is encrypted and requires a password".to_string()
        }
    } else {
        format!("cannot parse PDF: {detail}")
    }
}
