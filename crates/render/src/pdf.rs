//! PDFium-backed rendering service
//!
//! Loads documents with PDFium and rasterizes pages on the blocking pool.
//! PDFium is not re-entrant, so every document is guarded by a mutex and
//! all calls into it happen off the async executor.

use async_trait::async_trait;
use image::RgbaImage;
use kiosk_scheduler::CancellationToken;
use parking_lot::Mutex;
use pdfium_render::prelude::*;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::canvas::Canvas;
use crate::error::{RenderError, RenderResult};
use crate::service::{DocumentHandle, PageHandle, RenderService, RenderTask};
use crate::viewport::PageViewport;

/// Where a document URL points to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// Remote document fetched over HTTP(S)
    Http(String),
    /// Local file
    Path(PathBuf),
}

impl DocumentSource {
    /// Resolve `url` against `base_dir`. Absolute paths and HTTP(S) URLs are kept.
    pub fn resolve(url: &str, base_dir: &Path) -> Self {
        if url.starts_with("http://") || url.starts_with("https://") {
            DocumentSource::Http(url.to_string())
        } else {
            DocumentSource::Path(base_dir.join(url))
        }
    }
}

/// Rendering service backed by the PDFium library
pub struct PdfiumService {
    pdfium: &'static Pdfium,
    base_dir: PathBuf,
}

impl PdfiumService {
    /// Bind the PDFium library.
    ///
    /// Search order:
    /// 1. Executable's directory
    /// 2. Current working directory
    /// 3. System library paths
    pub fn bind() -> RenderResult<Self> {
        let pdfium = Self::init_pdfium()?;
        Ok(Self {
            // One binding for the whole process; documents borrow it for 'static.
            pdfium: Box::leak(Box::new(pdfium)),
            base_dir: PathBuf::from("."),
        })
    }

    /// Resolve relative document URLs against `dir`.
    pub fn with_base_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.base_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn init_pdfium() -> RenderResult<Pdfium> {
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
                .map_err(|e| RenderError::Backend(format!("failed to bind pdfium: {e}")))?,
        ))
    }
}

#[async_trait]
impl RenderService for PdfiumService {
    async fn load_document(&self, url: &str) -> RenderResult<Arc<dyn DocumentHandle>> {
        let pdfium = self.pdfium;
        let source = DocumentSource::resolve(url, &self.base_dir);
        let url = url.to_string();

        tokio::task::spawn_blocking(move || {
            let load_error = |reason: String| RenderError::Load {
                url: url.clone(),
                reason,
            };

            let document = match &source {
                DocumentSource::Path(path) => pdfium
                    .load_pdf_from_file(path, None)
                    .map_err(|e| load_error(e.to_string()))?,
                DocumentSource::Http(remote) => {
                    let bytes = fetch_bytes(remote).map_err(load_error)?;
                    pdfium
                        .load_pdf_from_byte_vec(bytes, None)
                        .map_err(|e| load_error(e.to_string()))?
                }
            };

            let page_count = u32::from(document.pages().len());
            tracing::debug!(%url, page_count, "document loaded");

            Ok(Arc::new(PdfiumDocument {
                inner: Arc::new(DocumentInner {
                    url,
                    page_count,
                    document: Mutex::new(document),
                }),
            }) as Arc<dyn DocumentHandle>)
        })
        .await
        .map_err(|e| RenderError::Backend(e.to_string()))?
    }
}

fn fetch_bytes(url: &str) -> Result<Vec<u8>, String> {
    let response = ureq::get(url)
        .set("User-Agent", "pdf-kiosk")
        .call()
        .map_err(|e| e.to_string())?;

    let mut bytes = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut bytes)
        .map_err(|e| e.to_string())?;
    Ok(bytes)
}

struct DocumentInner {
    url: String,
    page_count: u32,
    document: Mutex<PdfDocument<'static>>,
}

/// A document loaded through [`PdfiumService`]
pub struct PdfiumDocument {
    inner: Arc<DocumentInner>,
}

impl PdfiumDocument {
    pub fn url(&self) -> &str {
        &self.inner.url
    }
}

#[async_trait]
impl DocumentHandle for PdfiumDocument {
    fn num_pages(&self) -> u32 {
        self.inner.page_count
    }

    async fn get_page(&self, page_number: u32) -> RenderResult<Arc<dyn PageHandle>> {
        let index = page_index(page_number, self.inner.page_count)?;
        let inner = self.inner.clone();

        tokio::task::spawn_blocking(move || {
            let document = inner.document.lock();
            let page = document.pages().get(index).map_err(|e| RenderError::Page {
                page: page_number,
                reason: e.to_string(),
            })?;
            let width_pt = page.width().value;
            let height_pt = page.height().value;
            drop(page);
            drop(document);

            Ok(Arc::new(PdfiumPage {
                document: inner,
                index,
                page_number,
                width_pt,
                height_pt,
            }) as Arc<dyn PageHandle>)
        })
        .await
        .map_err(|e| RenderError::Backend(e.to_string()))?
    }
}

/// Zero-based PDFium page index for a 1-based page number.
fn page_index(page_number: u32, page_count: u32) -> RenderResult<u16> {
    if page_number == 0 || page_number > page_count {
        return Err(RenderError::PageOutOfRange {
            page: page_number,
            page_count,
        });
    }
    u16::try_from(page_number - 1).map_err(|_| RenderError::PageOutOfRange {
        page: page_number,
        page_count,
    })
}

/// A page of a [`PdfiumDocument`]
pub struct PdfiumPage {
    document: Arc<DocumentInner>,
    index: u16,
    page_number: u32,
    width_pt: f32,
    height_pt: f32,
}

impl PageHandle for PdfiumPage {
    fn page_number(&self) -> u32 {
        self.page_number
    }

    fn viewport(&self, scale: f32) -> PageViewport {
        PageViewport::from_points(self.width_pt, self.height_pt, scale)
    }

    fn render(&self, canvas: Arc<dyn Canvas>, viewport: PageViewport) -> RenderTask {
        let token = CancellationToken::new();
        let (task, completer) = RenderTask::new(Arc::new(token.clone()));

        let document = self.document.clone();
        let index = self.index;
        let width = viewport.pixel_width();
        let height = viewport.pixel_height();

        tokio::task::spawn_blocking(move || {
            let result = rasterize(&document, index, width, height, &token)
                .and_then(|frame| {
                    // Checked again: a newer render may have taken the canvas meanwhile.
                    if token.is_cancelled() {
                        return Err(RenderError::Cancelled);
                    }
                    canvas.present(frame)
                });
            completer.complete(result);
        });

        task
    }
}

fn rasterize(
    document: &DocumentInner,
    index: u16,
    width: u32,
    height: u32,
    token: &CancellationToken,
) -> RenderResult<RgbaImage> {
    if token.is_cancelled() {
        return Err(RenderError::Cancelled);
    }

    let rgba = {
        let document = document.document.lock();
        let page = document
            .pages()
            .get(index)
            .map_err(|e| RenderError::Render(e.to_string()))?;

        let config = PdfRenderConfig::new()
            .set_target_width(width as i32)
            .set_target_height(height as i32);

        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| RenderError::Render(e.to_string()))?;

        bitmap.as_rgba_bytes().to_vec()
    };

    RgbaImage::from_raw(width, height, rgba).ok_or_else(|| {
        RenderError::Render(format!("bitmap does not match {width}x{height}"))
    })
}
