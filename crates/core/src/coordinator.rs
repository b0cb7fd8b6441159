//! Render coordinator
//!
//! Draws one page of a slot's document into the slot's canvas:
//!
//! 1. Cancel the slot's pending render (without waiting for it)
//! 2. Fetch the page from the document
//! 3. Fit the page to the canvas container
//! 4. Resize the canvas to the fitted viewport
//! 5. Start the render and keep its cancel handle as the slot's pending render
//! 6. Clear the pending render when it finishes, whatever the outcome
//!
//! Every request carries the slot's next generation. A request that has been
//! overtaken while its page was being fetched gives up before touching the
//! canvas, and a finishing render only clears the pending render it created.
//! A closed slot accepts no new renders, including ones already past step 1.

use kiosk_render::RenderError;

use crate::fit::fit_scale;
use crate::slot::SharedSlot;

/// Scale of the baseline viewport the fit is computed against
pub const REFERENCE_SCALE: f32 = 1.5;

/// What a render request ended up doing
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    /// The render was started and is now the slot's pending render
    Issued { generation: u64 },
    /// The slot has no document yet
    NotLoaded,
    /// The slot was closed (carousel stopped) before the render could start
    Closed,
    /// A newer request for the same slot arrived first
    Superseded,
    /// The page could not be fetched
    PageUnavailable(RenderError),
    /// The container or page has no usable size
    Unfittable,
}

/// Renders slot pages onto their canvases
#[derive(Debug, Clone)]
pub struct RenderCoordinator {
    reference_scale: f32,
}

impl Default for RenderCoordinator {
    fn default() -> Self {
        Self::new(REFERENCE_SCALE)
    }
}

impl RenderCoordinator {
    pub fn new(reference_scale: f32) -> Self {
        Self { reference_scale }
    }

    pub fn reference_scale(&self) -> f32 {
        self.reference_scale
    }

    /// Render `page_number` of the slot's document into the slot's canvas.
    ///
    /// Returns once the render has been started (or abandoned); the render
    /// itself finishes in the background. Must be called from within a tokio
    /// runtime.
    pub async fn render(&self, slot: &SharedSlot, page_number: u32) -> RenderOutcome {
        let (index, generation, document, canvas) = {
            let mut guard = slot.lock();
            if guard.is_closed() {
                tracing::debug!(slot = guard.index(), page = page_number, "slot closed, not rendering");
                return RenderOutcome::Closed;
            }
            let generation = guard.begin_render();
            let Some(document) = guard.document() else {
                tracing::debug!(slot = guard.index(), page = page_number, "no document to render");
                return RenderOutcome::NotLoaded;
            };
            (guard.index(), generation, document, guard.canvas())
        };

        let page = match document.get_page(page_number).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(slot = index, page = page_number, error = %e, "failed to fetch page");
                return RenderOutcome::PageUnavailable(e);
            }
        };

        let baseline = page.viewport(self.reference_scale);
        let container = canvas.container_size();
        let Some(scale) = fit_scale(&baseline, container) else {
            tracing::warn!(
                slot = index,
                page = page_number,
                ?container,
                "container or page has no drawable size"
            );
            return RenderOutcome::Unfittable;
        };
        let viewport = page.viewport(scale);

        let completion = {
            let mut guard = slot.lock();
            if guard.is_closed() {
                tracing::debug!(slot = index, page = page_number, generation, "slot closed during page fetch");
                return RenderOutcome::Closed;
            }
            if !guard.is_current(generation) {
                tracing::debug!(slot = index, page = page_number, generation, "render superseded");
                return RenderOutcome::Superseded;
            }

            canvas.resize(viewport.pixel_width(), viewport.pixel_height());
            let (canceller, completion) = page.render(canvas, viewport).into_parts();
            guard.set_pending(generation, page_number, canceller);
            completion
        };

        tracing::debug!(
            slot = index,
            page = page_number,
            generation,
            width = viewport.pixel_width(),
            height = viewport.pixel_height(),
            "render started"
        );

        let slot = slot.clone();
        tokio::spawn(async move {
            let result = completion.wait().await;
            let cleared = slot.lock().finish_render(generation);

            match result {
                Ok(()) => {
                    tracing::debug!(slot = index, page = page_number, generation, cleared, "render finished")
                }
                Err(e) if e.is_cancelled() => {
                    tracing::debug!(slot = index, page = page_number, generation, "render cancelled")
                }
                Err(e) => {
                    tracing::warn!(slot = index, page = page_number, generation, error = %e, "render failed")
                }
            }
        });

        RenderOutcome::Issued { generation }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::Slot;
    use kiosk_render::mock::{MockRenderService, RenderMode};
    use kiosk_render::{Canvas, PixelCanvas, RenderService, Size};
    use std::sync::Arc;
    use std::time::Duration;

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    async fn loaded_slot(
        service: &MockRenderService,
        url: &str,
        container: Size,
    ) -> (SharedSlot, Arc<PixelCanvas>) {
        let canvas = Arc::new(PixelCanvas::new(container));
        let slot = Slot::new(0, url, canvas.clone()).into_shared();
        let document = service.load_document(url).await.unwrap();
        slot.lock().replace_document(document);
        (slot, canvas)
    }

    #[tokio::test(start_paused = true)]
    async fn test_renders_fitted_page_and_clears_pending() {
        let service = MockRenderService::new().with_document("a.pdf", 2);
        let (slot, canvas) = loaded_slot(&service, "a.pdf", Size::new(800.0, 600.0)).await;
        let coordinator = RenderCoordinator::new(1.0);

        let outcome = coordinator.render(&slot, 1).await;
        assert_eq!(outcome, RenderOutcome::Issued { generation: 1 });

        settle().await;
        // Letter page fitted into 800x600 is height limited.
        let (width, height) = canvas.size();
        assert!((462..=463).contains(&width), "width {width}");
        assert!((599..=600).contains(&height), "height {height}");
        assert_eq!(canvas.presented_frames(), 1);
        assert!(!slot.lock().has_pending_render());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reference_scale_leaves_margin_in_container() {
        let service = MockRenderService::new().with_document("a.pdf", 1);
        let (slot, canvas) = loaded_slot(&service, "a.pdf", Size::new(900.0, 600.0)).await;

        RenderCoordinator::default().render(&slot, 1).await;

        // The fitted scale is applied to the natural page size, so the page
        // fills 1 / REFERENCE_SCALE of the limiting axis.
        let height = canvas.size().1;
        assert!((399..=400).contains(&height), "height {height}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unloaded_slot_renders_nothing() {
        let canvas = Arc::new(PixelCanvas::new(Size::new(800.0, 600.0)));
        let slot = Slot::new(0, "a.pdf", canvas.clone()).into_shared();

        let outcome = RenderCoordinator::default().render(&slot, 1).await;
        assert_eq!(outcome, RenderOutcome::NotLoaded);
        assert_eq!(canvas.presented_frames(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_render_cancels_first_exactly_once() {
        let service = MockRenderService::new()
            .with_document("a.pdf", 3)
            .with_render_mode(RenderMode::Hold);
        let (slot, _canvas) = loaded_slot(&service, "a.pdf", Size::new(800.0, 600.0)).await;
        let coordinator = RenderCoordinator::default();

        coordinator.render(&slot, 1).await;
        assert_eq!(slot.lock().pending_render().map(|p| p.generation()), Some(1));

        coordinator.render(&slot, 2).await;

        let renders = service.renders();
        assert_eq!(renders.len(), 2);
        assert_eq!(renders[0].cancel_calls(), 1);
        assert_eq!(renders[1].cancel_calls(), 0);
        let guard = slot.lock();
        let pending = guard.pending_render().unwrap();
        assert_eq!((pending.generation(), pending.page()), (2, 2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_completion_of_cancelled_render_keeps_newer_pending() {
        let service = MockRenderService::new()
            .with_document("a.pdf", 3)
            .with_render_mode(RenderMode::Hold);
        let (slot, _canvas) = loaded_slot(&service, "a.pdf", Size::new(800.0, 600.0)).await;
        let coordinator = RenderCoordinator::default();

        coordinator.render(&slot, 1).await;
        coordinator.render(&slot, 2).await;

        // The superseded render still resolves afterwards.
        service.complete_render(0, Ok(()));
        settle().await;
        assert_eq!(slot.lock().pending_render().map(|p| p.page()), Some(2));

        service.complete_render(1, Ok(()));
        settle().await;
        assert!(!slot.lock().has_pending_render());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_render_clears_pending() {
        let service = MockRenderService::new()
            .with_document("a.pdf", 1)
            .with_render_mode(RenderMode::Hold);
        let (slot, _canvas) = loaded_slot(&service, "a.pdf", Size::new(800.0, 600.0)).await;

        RenderCoordinator::default().render(&slot, 1).await;
        assert!(slot.lock().has_pending_render());

        service.complete_render(0, Err(RenderError::Render("corrupt stream".into())));
        settle().await;
        assert!(!slot.lock().has_pending_render());
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_fetch_failure_aborts_only_that_render() {
        let service = MockRenderService::new().with_document("a.pdf", 3);
        service.fail_page("a.pdf", 2);
        let (slot, canvas) = loaded_slot(&service, "a.pdf", Size::new(800.0, 600.0)).await;
        let coordinator = RenderCoordinator::default();

        let outcome = coordinator.render(&slot, 2).await;
        assert!(matches!(outcome, RenderOutcome::PageUnavailable(RenderError::Page { page: 2, .. })));
        assert!(!slot.lock().has_pending_render());
        assert!(service.renders().is_empty());

        coordinator.render(&slot, 3).await;
        settle().await;
        assert_eq!(canvas.presented_frames(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_range_page_is_reported() {
        let service = MockRenderService::new().with_document("a.pdf", 2);
        let (slot, _canvas) = loaded_slot(&service, "a.pdf", Size::new(800.0, 600.0)).await;

        let outcome = RenderCoordinator::default().render(&slot, 5).await;
        assert_eq!(
            outcome,
            RenderOutcome::PageUnavailable(RenderError::PageOutOfRange {
                page: 5,
                page_count: 2
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_collapsed_container_is_not_rendered() {
        let service = MockRenderService::new().with_document("a.pdf", 1);
        let (slot, canvas) = loaded_slot(&service, "a.pdf", Size::new(0.0, 600.0)).await;

        let outcome = RenderCoordinator::default().render(&slot, 1).await;
        assert_eq!(outcome, RenderOutcome::Unfittable);
        assert!(service.renders().is_empty());
        assert_eq!(canvas.size(), (0, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_halved_container_halves_canvas() {
        let service = MockRenderService::new().with_document("a.pdf", 1);
        let (slot, canvas) = loaded_slot(&service, "a.pdf", Size::new(800.0, 600.0)).await;
        let coordinator = RenderCoordinator::new(1.0);

        coordinator.render(&slot, 1).await;
        let (w1, h1) = canvas.size();

        canvas.set_container_size(Size::new(400.0, 300.0));
        coordinator.render(&slot, 1).await;
        let (w2, h2) = canvas.size();

        // Pixel sizes are truncated, so an odd or fractional width cannot halve exactly.
        assert!((599..=600).contains(&h1), "{h1}");
        assert!((299..=300).contains(&h2), "{h2}");
        assert!(w2.abs_diff(w1 / 2) <= 1, "{w1} -> {w2}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_container_sized_page_halves_exactly() {
        let service = MockRenderService::new();
        service.set_document("wide.pdf", 1, Size::new(800.0, 600.0));
        let (slot, canvas) = loaded_slot(&service, "wide.pdf", Size::new(800.0, 600.0)).await;
        let coordinator = RenderCoordinator::new(1.0);

        coordinator.render(&slot, 1).await;
        assert_eq!(canvas.size(), (800, 600));

        canvas.set_container_size(Size::new(400.0, 300.0));
        coordinator.render(&slot, 1).await;
        assert_eq!(canvas.size(), (400, 300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_slot_accepts_no_render() {
        let service = MockRenderService::new().with_document("a.pdf", 2);
        let (slot, canvas) = loaded_slot(&service, "a.pdf", Size::new(800.0, 600.0)).await;
        slot.lock().close();

        let outcome = RenderCoordinator::default().render(&slot, 1).await;
        assert_eq!(outcome, RenderOutcome::Closed);
        assert!(service.renders().is_empty());
        assert!(!slot.lock().has_pending_render());
        assert_eq!(canvas.presented_frames(), 0);

        slot.lock().reopen();
        let outcome = RenderCoordinator::default().render(&slot, 1).await;
        assert!(matches!(outcome, RenderOutcome::Issued { .. }));
    }
}
