//! Errors reported by the document rendering service.

/// Errors that can occur while loading, paging or drawing a document
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    /// The document could not be fetched or parsed
    #[error("failed to load document {url}: {reason}")]
    Load { url: String, reason: String },

    /// Requested page does not exist in the document
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },

    /// The page exists but could not be prepared
    #[error("failed to fetch page {page}: {reason}")]
    Page { page: u32, reason: String },

    /// Drawing the page failed
    #[error("render failed: {0}")]
    Render(String),

    /// The render was cancelled before it presented a frame
    #[error("render cancelled")]
    Cancelled,

    /// The render was dropped by the service without reporting an outcome
    #[error("render aborted before completion")]
    Aborted,

    /// Library binding or runtime failure
    #[error("backend error: {0}")]
    Backend(String),
}

impl RenderError {
    /// Whether this error only reports that the render was superseded.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RenderError::Cancelled)
    }
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
