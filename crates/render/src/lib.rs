//! Kiosk Render Library
//!
//! Interface to the document rendering service, drawing surfaces, and the
//! PDFium implementation of the service.

pub mod canvas;
pub mod error;
#[cfg(any(test, feature = "test-support"))]
pub mod mock;
pub mod pdf;
pub mod service;
pub mod viewport;

pub use canvas::{Canvas, PixelCanvas};
pub use error::{RenderError, RenderResult};
pub use pdf::{DocumentSource, PdfiumDocument, PdfiumPage, PdfiumService};
pub use service::{
    CancelRender, DocumentHandle, PageHandle, RenderCompleter, RenderCompletion, RenderService,
    RenderTask,
};
pub use viewport::{PageViewport, Size};
