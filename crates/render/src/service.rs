//! Document rendering service interface
//!
//! The kiosk treats the PDF engine as an opaque asynchronous service:
//!
//! 1. [`RenderService::load_document`] turns a URL into a [`DocumentHandle`]
//! 2. [`DocumentHandle::get_page`] resolves a 1-based page number to a [`PageHandle`]
//! 3. [`PageHandle::viewport`] gives the page geometry at a scale
//! 4. [`PageHandle::render`] starts drawing onto a canvas and returns a
//!    cancelable [`RenderTask`]

use async_trait::async_trait;
use kiosk_scheduler::CancellationToken;
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::canvas::Canvas;
use crate::error::{RenderError, RenderResult};
use crate::viewport::PageViewport;

/// Loads documents by URL
#[async_trait]
pub trait RenderService: Send + Sync + 'static {
    async fn load_document(&self, url: &str) -> RenderResult<Arc<dyn DocumentHandle>>;
}

/// A loaded document
#[async_trait]
pub trait DocumentHandle: Send + Sync {
    /// Number of pages (page numbers run from 1 to this value).
    fn num_pages(&self) -> u32;

    /// Fetch a page by 1-based number.
    async fn get_page(&self, page_number: u32) -> RenderResult<Arc<dyn PageHandle>>;
}

/// A single page of a loaded document
pub trait PageHandle: Send + Sync {
    fn page_number(&self) -> u32;

    /// Geometry of the page at `scale`.
    fn viewport(&self, scale: f32) -> PageViewport;

    /// Start drawing the page onto `canvas` at `viewport`.
    ///
    /// Must be called from within a tokio runtime.
    fn render(&self, canvas: Arc<dyn Canvas>, viewport: PageViewport) -> RenderTask;
}

/// Handle used to stop an in-flight render
pub trait CancelRender: Send + Sync {
    /// Signal the render to stop. Does not wait for it to do so.
    fn cancel(&self);
}

impl CancelRender for CancellationToken {
    fn cancel(&self) {
        CancellationToken::cancel(self)
    }
}

/// An in-flight render: a cancel handle plus its eventual outcome
pub struct RenderTask {
    canceller: Arc<dyn CancelRender>,
    completion: RenderCompletion,
}

impl RenderTask {
    /// Create a task whose outcome is reported through the returned [`RenderCompleter`].
    pub fn new(canceller: Arc<dyn CancelRender>) -> (Self, RenderCompleter) {
        let (tx, rx) = oneshot::channel();
        let task = Self {
            canceller,
            completion: RenderCompletion { rx },
        };
        (task, RenderCompleter { tx })
    }

    /// A task that has already finished with `result`.
    pub fn finished(result: RenderResult<()>) -> Self {
        let (task, completer) = Self::new(Arc::new(CancellationToken::new()));
        completer.complete(result);
        task
    }

    pub fn cancel(&self) {
        self.canceller.cancel();
    }

    /// Split into the cancel handle and the completion future.
    pub fn into_parts(self) -> (Arc<dyn CancelRender>, RenderCompletion) {
        (self.canceller, self.completion)
    }

    /// Wait for the render to finish.
    pub async fn wait(self) -> RenderResult<()> {
        self.completion.wait().await
    }
}

/// Outcome of a render, resolved once the service reports it
pub struct RenderCompletion {
    rx: oneshot::Receiver<RenderResult<()>>,
}

impl RenderCompletion {
    /// Resolves to [`RenderError::Aborted`] if the service drops the task
    /// without reporting.
    pub async fn wait(self) -> RenderResult<()> {
        self.rx.await.unwrap_or(Err(RenderError::Aborted))
    }
}

/// Service-side end of a [`RenderTask`]
pub struct RenderCompleter {
    tx: oneshot::Sender<RenderResult<()>>,
}

impl RenderCompleter {
    pub fn complete(self, result: RenderResult<()>) {
        // The waiting side may have gone away; nothing to report to then.
        let _ = self.tx.send(result);
    }
}
