//! Per-document carousel state
//!
//! A [`Slot`] holds everything the carousel knows about one configured
//! document: the loaded handle, the page on display, and the single render
//! that may be in flight for it. The slot is the only owner of its pending
//! render and the only place that cancels it.

use kiosk_render::{CancelRender, Canvas, DocumentHandle};
use parking_lot::Mutex;
use std::sync::Arc;

/// Slot shared between the carousel, its timers and render completions
pub type SharedSlot = Arc<Mutex<Slot>>;

/// The render currently in flight for a slot
pub struct PendingRender {
    generation: u64,
    page: u32,
    canceller: Arc<dyn CancelRender>,
}

impl PendingRender {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn page(&self) -> u32 {
        self.page
    }
}

/// One document position in the carousel
pub struct Slot {
    index: usize,
    url: String,
    canvas: Arc<dyn Canvas>,
    document: Option<Arc<dyn DocumentHandle>>,
    current_page: u32,
    pending: Option<PendingRender>,
    generation: u64,
    closed: bool,
}

impl Slot {
    /// Create an unloaded slot showing page 1.
    pub fn new(index: usize, url: impl Into<String>, canvas: Arc<dyn Canvas>) -> Self {
        Self {
            index,
            url: url.into(),
            canvas,
            document: None,
            current_page: 1,
            pending: None,
            generation: 0,
            closed: false,
        }
    }

    pub fn into_shared(self) -> SharedSlot {
        Arc::new(Mutex::new(self))
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn canvas(&self) -> Arc<dyn Canvas> {
        self.canvas.clone()
    }

    pub fn document(&self) -> Option<Arc<dyn DocumentHandle>> {
        self.document.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.document.is_some()
    }

    /// Page count of the loaded document.
    pub fn page_count(&self) -> Option<u32> {
        self.document.as_ref().map(|d| d.num_pages())
    }

    /// 1-based page on display.
    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn pending_render(&self) -> Option<&PendingRender> {
        self.pending.as_ref()
    }

    pub fn has_pending_render(&self) -> bool {
        self.pending.is_some()
    }

    /// Number of render requests made for this slot so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Install a freshly loaded document and return the page to show.
    ///
    /// The page on display is kept, unless the new document is too short for
    /// it, in which case the slot starts over at page 1. Any render in
    /// flight is left alone; the next render request replaces it.
    pub fn replace_document(&mut self, document: Arc<dyn DocumentHandle>) -> u32 {
        if self.current_page > document.num_pages() {
            self.current_page = 1;
        }
        self.document = Some(document);
        self.current_page
    }

    /// Move to the next page, wrapping after the last one.
    ///
    /// Returns the new page, or `None` when no document (or an empty one) is
    /// loaded, in which case nothing changes.
    pub fn advance(&mut self) -> Option<u32> {
        let page_count = self.page_count().filter(|&count| count > 0)?;
        self.current_page = if self.current_page < page_count {
            self.current_page + 1
        } else {
            1
        };
        Some(self.current_page)
    }

    /// Start a render request: cancel whatever is in flight and hand out the
    /// request's generation.
    pub(crate) fn begin_render(&mut self) -> u64 {
        self.cancel_pending();
        self.generation += 1;
        self.generation
    }

    /// Whether `generation` is still the latest render request.
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    pub(crate) fn set_pending(
        &mut self,
        generation: u64,
        page: u32,
        canceller: Arc<dyn CancelRender>,
    ) {
        debug_assert!(self.pending.is_none());
        self.pending = Some(PendingRender {
            generation,
            page,
            canceller,
        });
    }

    /// Clear the pending render if it belongs to `generation`.
    ///
    /// Returns `false` for completions of superseded renders, which must not
    /// clear a newer pending render.
    pub(crate) fn finish_render(&mut self, generation: u64) -> bool {
        match &self.pending {
            Some(pending) if pending.generation == generation => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Refuse further renders and invalidate any request still in flight.
    ///
    /// Returns `true` if a pending render was cancelled.
    pub fn close(&mut self) -> bool {
        self.closed = true;
        self.generation += 1;
        self.cancel_pending()
    }

    /// Accept renders again after [`close`](Self::close).
    pub fn reopen(&mut self) {
        self.closed = false;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Cancel and forget the pending render, if any.
    pub fn cancel_pending(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                pending.canceller.cancel();
                tracing::debug!(
                    slot = self.index,
                    page = pending.page,
                    generation = pending.generation,
                    "cancelled pending render"
                );
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use kiosk_render::{PageHandle, PixelCanvas, RenderError, RenderResult, Size};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubDocument(u32);

    #[async_trait]
    impl DocumentHandle for StubDocument {
        fn num_pages(&self) -> u32 {
            self.0
        }

        async fn get_page(&self, page_number: u32) -> RenderResult<Arc<dyn PageHandle>> {
            Err(RenderError::PageOutOfRange {
                page: page_number,
                page_count: self.0,
            })
        }
    }

    struct Counter(Arc<AtomicUsize>);

    impl CancelRender for Counter {
        fn cancel(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn slot() -> Slot {
        Slot::new(0, "pdfs/1.pdf", Arc::new(PixelCanvas::new(Size::new(800.0, 600.0))))
    }

    #[test]
    fn test_new_slot_is_unloaded_on_page_one() {
        let slot = slot();
        assert!(!slot.is_loaded());
        assert_eq!(slot.current_page(), 1);
        assert_eq!(slot.page_count(), None);
        assert!(!slot.has_pending_render());
    }

    #[test]
    fn test_advance_without_document_is_noop() {
        let mut slot = slot();
        assert_eq!(slot.advance(), None);
        assert_eq!(slot.current_page(), 1);
    }

    #[test]
    fn test_advance_wraps_after_last_page() {
        let mut slot = slot();
        slot.replace_document(Arc::new(StubDocument(3)));

        assert_eq!(slot.advance(), Some(2));
        assert_eq!(slot.advance(), Some(3));
        assert_eq!(slot.advance(), Some(1));
    }

    #[test]
    fn test_advance_on_empty_document_is_noop() {
        let mut slot = slot();
        slot.replace_document(Arc::new(StubDocument(0)));
        assert_eq!(slot.advance(), None);
    }

    #[test]
    fn test_replace_document_keeps_page_when_in_range() {
        let mut slot = slot();
        slot.replace_document(Arc::new(StubDocument(5)));
        slot.advance();
        slot.advance();

        assert_eq!(slot.replace_document(Arc::new(StubDocument(5))), 3);
    }

    #[test]
    fn test_replace_document_restarts_when_shorter() {
        let mut slot = slot();
        slot.replace_document(Arc::new(StubDocument(5)));
        for _ in 0..3 {
            slot.advance();
        }
        assert_eq!(slot.current_page(), 4);

        assert_eq!(slot.replace_document(Arc::new(StubDocument(2))), 1);
    }

    #[test]
    fn test_replace_document_leaves_pending_render() {
        let mut slot = slot();
        let cancels = Arc::new(AtomicUsize::new(0));
        let generation = slot.begin_render();
        slot.set_pending(generation, 1, Arc::new(Counter(cancels.clone())));

        slot.replace_document(Arc::new(StubDocument(2)));

        assert!(slot.has_pending_render());
        assert_eq!(cancels.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_begin_render_cancels_previous() {
        let mut slot = slot();
        let cancels = Arc::new(AtomicUsize::new(0));

        let first = slot.begin_render();
        slot.set_pending(first, 1, Arc::new(Counter(cancels.clone())));

        let second = slot.begin_render();
        assert!(second > first);
        assert!(!slot.has_pending_render());
        assert_eq!(cancels.load(Ordering::SeqCst), 1);
        assert!(slot.is_current(second));
        assert!(!slot.is_current(first));
    }

    #[test]
    fn test_close_cancels_pending_and_invalidates_requests() {
        let mut slot = slot();
        let cancels = Arc::new(AtomicUsize::new(0));

        let pending = slot.begin_render();
        slot.set_pending(pending, 1, Arc::new(Counter(cancels.clone())));
        assert!(slot.close());
        assert!(slot.is_closed());
        assert!(!slot.has_pending_render());
        assert_eq!(cancels.load(Ordering::SeqCst), 1);
        assert!(!slot.is_current(pending));

        slot.reopen();
        assert!(!slot.is_closed());
        assert!(!slot.close());
    }

    #[test]
    fn test_stale_completion_keeps_newer_pending() {
        let mut slot = slot();
        let cancels = Arc::new(AtomicUsize::new(0));

        let first = slot.begin_render();
        slot.set_pending(first, 1, Arc::new(Counter(cancels.clone())));
        let second = slot.begin_render();
        slot.set_pending(second, 2, Arc::new(Counter(cancels.clone())));

        assert!(!slot.finish_render(first));
        assert_eq!(slot.pending_render().map(|p| p.page()), Some(2));

        assert!(slot.finish_render(second));
        assert!(!slot.has_pending_render());
    }
}
