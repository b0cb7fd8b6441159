//! Carousel controller
//!
//! Owns one [`Slot`] per configured document and drives them with two kinds
//! of timers: a per-slot advance timer that flips to the next page, and a
//! single reload timer that fetches every document again. Loads, page flips
//! and resize re-renders all run as independent tasks, so a slow or failing
//! document never holds up the others.

use kiosk_render::{Canvas, RenderService};
use kiosk_scheduler::TimerSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::config::CarouselConfig;
use crate::coordinator::RenderCoordinator;
use crate::slot::{SharedSlot, Slot};

/// Errors building a [`Carousel`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CarouselError {
    #[error("no documents configured")]
    NoDocuments,

    #[error("{documents} documents configured but {canvases} canvases given")]
    CanvasCountMismatch { documents: usize, canvases: usize },
}

struct CarouselInner {
    service: Arc<dyn RenderService>,
    coordinator: RenderCoordinator,
    slots: Vec<SharedSlot>,
    config: CarouselConfig,
}

impl CarouselInner {
    fn slot(&self, index: usize) -> Option<&SharedSlot> {
        self.slots.get(index)
    }

    fn load_all(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        tracing::debug!(documents = self.slots.len(), "loading all documents");
        self.slots
            .iter()
            .map(|slot| self.load_slot(slot.clone()))
            .collect()
    }

    fn load_slot(self: &Arc<Self>, slot: SharedSlot) -> JoinHandle<()> {
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let (index, url) = {
                let guard = slot.lock();
                (guard.index(), guard.url().to_string())
            };

            match inner.service.load_document(&url).await {
                Ok(document) => {
                    let page_count = document.num_pages();
                    let page = {
                        let mut guard = slot.lock();
                        if guard.is_closed() {
                            tracing::debug!(slot = index, url = %url, "carousel stopped, discarding load");
                            return;
                        }
                        guard.replace_document(document)
                    };
                    tracing::info!(slot = index, url = %url, page_count, page, "document loaded");
                    inner.coordinator.render(&slot, page).await;
                }
                Err(e) => {
                    tracing::error!(slot = index, url = %url, error = %e, "failed to load document");
                }
            }
        })
    }

    fn advance(self: &Arc<Self>, index: usize) -> Option<JoinHandle<()>> {
        let Some(slot) = self.slot(index) else {
            tracing::warn!(slot = index, slots = self.slots.len(), "advance on unknown slot");
            return None;
        };

        let page = {
            let mut guard = slot.lock();
            if guard.is_closed() {
                tracing::trace!(slot = index, "carousel stopped, skipping advance");
                return None;
            }
            guard.advance()
        };
        let Some(page) = page else {
            tracing::trace!(slot = index, "slot not loaded, skipping advance");
            return None;
        };

        tracing::debug!(slot = index, page, "advancing");
        Some(self.spawn_render(slot.clone(), page))
    }

    fn on_resize(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        self.slots
            .iter()
            .filter_map(|slot| {
                let page = {
                    let guard = slot.lock();
                    guard.is_loaded().then(|| guard.current_page())
                }?;
                Some(self.spawn_render(slot.clone(), page))
            })
            .collect()
    }

    fn spawn_render(self: &Arc<Self>, slot: SharedSlot, page: u32) -> JoinHandle<()> {
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            inner.coordinator.render(&slot, page).await;
        })
    }
}

/// Rotating display of several documents
pub struct Carousel {
    inner: Arc<CarouselInner>,
    timers: TimerSet,
}

impl Carousel {
    /// Create a carousel showing `config.slots[i]` on `canvases[i]`.
    ///
    /// Nothing is loaded until [`load_all`](Self::load_all) or
    /// [`start`](Self::start) is called.
    pub fn new(
        service: Arc<dyn RenderService>,
        config: CarouselConfig,
        canvases: Vec<Arc<dyn Canvas>>,
    ) -> Result<Self, CarouselError> {
        if config.slots.is_empty() {
            return Err(CarouselError::NoDocuments);
        }
        if config.slots.len() != canvases.len() {
            return Err(CarouselError::CanvasCountMismatch {
                documents: config.slots.len(),
                canvases: canvases.len(),
            });
        }

        let slots = config
            .slots
            .iter()
            .zip(canvases)
            .enumerate()
            .map(|(index, (slot, canvas))| Slot::new(index, slot.url.clone(), canvas).into_shared())
            .collect();

        Ok(Self {
            inner: Arc::new(CarouselInner {
                service,
                coordinator: RenderCoordinator::new(config.reference_scale),
                slots,
                config,
            }),
            timers: TimerSet::new(),
        })
    }

    /// Request every document again. Each success re-renders its slot's
    /// current page; each failure is logged and leaves the slot as it was.
    pub fn load_all(&self) -> Vec<JoinHandle<()>> {
        self.inner.load_all()
    }

    /// Flip slot `index` to its next page, wrapping after the last.
    ///
    /// Does nothing for an unloaded slot or an unknown index.
    pub fn advance(&self, index: usize) -> Option<JoinHandle<()>> {
        self.inner.advance(index)
    }

    /// Re-render every loaded slot's current page to fit its container.
    pub fn on_resize(&self) -> Vec<JoinHandle<()>> {
        tracing::debug!("container resized, re-rendering");
        self.inner.on_resize()
    }

    /// Load every document and arm the advance and reload timers.
    ///
    /// Returns the initial load tasks. Calling `start` on a running carousel
    /// does nothing.
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        if !self.timers.is_empty() {
            tracing::warn!("carousel already started");
            return Vec::new();
        }

        for slot in &self.inner.slots {
            slot.lock().reopen();
        }
        let loads = self.inner.load_all();

        for (index, slot) in self.inner.config.slots.iter().enumerate() {
            let inner = Arc::clone(&self.inner);
            self.timers
                .every(format!("advance-{index}"), slot.advance_interval, move || {
                    inner.advance(index);
                });
        }

        let inner = Arc::clone(&self.inner);
        self.timers
            .every("reload", self.inner.config.reload_interval, move || {
                inner.load_all();
            });

        tracing::info!(
            documents = self.inner.slots.len(),
            reload_interval = ?self.inner.config.reload_interval,
            "carousel started"
        );
        loads
    }

    /// Stop every timer and cancel every pending render.
    ///
    /// Slots are closed, so loads and renders requested before the stop that
    /// have not started drawing yet are dropped as well.
    pub fn stop(&self) {
        let timers = self.timers.stop_all();
        let cancelled = self
            .inner
            .slots
            .iter()
            .filter(|slot| slot.lock().close())
            .count();
        tracing::info!(timers, cancelled, "carousel stopped");
    }

    pub fn is_running(&self) -> bool {
        !self.timers.is_empty()
    }

    pub fn slot_count(&self) -> usize {
        self.inner.slots.len()
    }

    pub fn slot(&self, index: usize) -> Option<SharedSlot> {
        self.inner.slot(index).cloned()
    }

    pub fn config(&self) -> &CarouselConfig {
        &self.inner.config
    }

    /// Page on display in slot `index`.
    pub fn current_page(&self, index: usize) -> Option<u32> {
        self.inner.slot(index).map(|slot| slot.lock().current_page())
    }

    /// Page count of slot `index`, `None` until its document is loaded.
    pub fn page_count(&self, index: usize) -> Option<u32> {
        self.inner.slot(index).and_then(|slot| slot.lock().page_count())
    }

    pub fn has_pending_render(&self, index: usize) -> bool {
        self.inner
            .slot(index)
            .is_some_and(|slot| slot.lock().has_pending_render())
    }
}
