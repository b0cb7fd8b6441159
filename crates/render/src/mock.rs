//! In-memory rendering service for tests
//!
//! [`MockRenderService`] serves documents registered by URL, records every
//! load, page fetch, render and cancel, and either finishes renders right
//! away or holds them until the test completes them by hand.

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::canvas::Canvas;
use crate::error::{RenderError, RenderResult};
use crate::service::{
    CancelRender, DocumentHandle, PageHandle, RenderCompleter, RenderService, RenderTask,
};
use crate::viewport::{PageViewport, Size};

/// US Letter in points
pub const LETTER: Size = Size::new(612.0, 792.0);

/// How issued renders finish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Present a blank frame and succeed immediately
    Immediate,
    /// Stay pending until [`MockRenderService::complete_render`]
    Hold,
}

/// One render issued through the mock
#[derive(Clone)]
pub struct RenderRecord {
    pub url: String,
    pub page: u32,
    pub viewport: PageViewport,
    cancels: Arc<AtomicUsize>,
}

impl RenderRecord {
    /// How many times `cancel()` was called on this render.
    pub fn cancel_calls(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

struct CountingCanceller(Arc<AtomicUsize>);

impl CancelRender for CountingCanceller {
    fn cancel(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct MockState {
    documents: HashMap<String, (u32, Size)>,
    failing_loads: HashSet<String>,
    failing_pages: HashSet<(String, u32)>,
    loads: Vec<String>,
    renders: Vec<RenderRecord>,
    held: HashMap<usize, (RenderCompleter, Arc<dyn Canvas>)>,
    mode: Option<RenderMode>,
}

/// Scriptable [`RenderService`]
#[derive(Clone, Default)]
pub struct MockRenderService {
    state: Arc<Mutex<MockState>>,
}

impl MockRenderService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve a Letter-sized document with `pages` pages at `url`.
    pub fn with_document(self, url: &str, pages: u32) -> Self {
        self.set_document(url, pages, LETTER);
        self
    }

    /// Make every load of `url` fail.
    pub fn with_failing_load(self, url: &str) -> Self {
        self.fail_loads(url);
        self
    }

    pub fn with_render_mode(self, mode: RenderMode) -> Self {
        self.set_render_mode(mode);
        self
    }

    /// Serve (or replace) the document at `url`; takes effect on the next load.
    pub fn set_document(&self, url: &str, pages: u32, page_size: Size) {
        let mut state = self.state.lock();
        state.failing_loads.remove(url);
        state.documents.insert(url.to_string(), (pages, page_size));
    }

    /// Make every later load of `url` fail until it is served again.
    pub fn fail_loads(&self, url: &str) {
        self.state.lock().failing_loads.insert(url.to_string());
    }

    pub fn fail_page(&self, url: &str, page: u32) {
        self.state
            .lock()
            .failing_pages
            .insert((url.to_string(), page));
    }

    pub fn set_render_mode(&self, mode: RenderMode) {
        self.state.lock().mode = Some(mode);
    }

    /// URLs of every load requested so far, in order.
    pub fn loads(&self) -> Vec<String> {
        self.state.lock().loads.clone()
    }

    /// Every render issued so far, in order.
    pub fn renders(&self) -> Vec<RenderRecord> {
        self.state.lock().renders.clone()
    }

    /// Renders issued for one document.
    pub fn renders_for(&self, url: &str) -> Vec<RenderRecord> {
        self.renders().into_iter().filter(|r| r.url == url).collect()
    }

    /// Finish a held render. A successful finish presents a blank frame of
    /// the render's size. Returns `false` if the render was not held.
    pub fn complete_render(&self, index: usize, result: RenderResult<()>) -> bool {
        let held = self.state.lock().held.remove(&index);
        let Some((completer, canvas)) = held else {
            return false;
        };
        let viewport = self.state.lock().renders[index].viewport;
        let result = result.and_then(|()| present_blank(canvas.as_ref(), &viewport));
        completer.complete(result);
        true
    }

    /// Number of renders still held.
    pub fn held_renders(&self) -> usize {
        self.state.lock().held.len()
    }
}

fn present_blank(canvas: &dyn Canvas, viewport: &PageViewport) -> RenderResult<()> {
    canvas.present(RgbaImage::from_pixel(
        viewport.pixel_width(),
        viewport.pixel_height(),
        Rgba([255, 255, 255, 255]),
    ))
}

#[async_trait]
impl RenderService for MockRenderService {
    async fn load_document(&self, url: &str) -> RenderResult<Arc<dyn DocumentHandle>> {
        let mut state = self.state.lock();
        state.loads.push(url.to_string());

        if state.failing_loads.contains(url) {
            return Err(RenderError::Load {
                url: url.to_string(),
                reason: "scripted failure".to_string(),
            });
        }

        let (pages, page_size) = *state.documents.get(url).ok_or_else(|| RenderError::Load {
            url: url.to_string(),
            reason: "not found".to_string(),
        })?;

        Ok(Arc::new(MockDocument {
            url: url.to_string(),
            pages,
            page_size,
            service: self.clone(),
        }))
    }
}

struct MockDocument {
    url: String,
    pages: u32,
    page_size: Size,
    service: MockRenderService,
}

#[async_trait]
impl DocumentHandle for MockDocument {
    fn num_pages(&self) -> u32 {
        self.pages
    }

    async fn get_page(&self, page_number: u32) -> RenderResult<Arc<dyn PageHandle>> {
        if page_number == 0 || page_number > self.pages {
            return Err(RenderError::PageOutOfRange {
                page: page_number,
                page_count: self.pages,
            });
        }

        let failing = self
            .service
            .state
            .lock()
            .failing_pages
            .contains(&(self.url.clone(), page_number));
        if failing {
            return Err(RenderError::Page {
                page: page_number,
                reason: "scripted failure".to_string(),
            });
        }

        Ok(Arc::new(MockPage {
            url: self.url.clone(),
            page_number,
            page_size: self.page_size,
            service: self.service.clone(),
        }))
    }
}

struct MockPage {
    url: String,
    page_number: u32,
    page_size: Size,
    service: MockRenderService,
}

impl PageHandle for MockPage {
    fn page_number(&self) -> u32 {
        self.page_number
    }

    fn viewport(&self, scale: f32) -> PageViewport {
        PageViewport::from_points(self.page_size.width, self.page_size.height, scale)
    }

    fn render(&self, canvas: Arc<dyn Canvas>, viewport: PageViewport) -> RenderTask {
        let cancels = Arc::new(AtomicUsize::new(0));
        let (task, completer) = RenderTask::new(Arc::new(CountingCanceller(cancels.clone())));

        let mut state = self.service.state.lock();
        let index = state.renders.len();
        state.renders.push(RenderRecord {
            url: self.url.clone(),
            page: self.page_number,
            viewport,
            cancels,
        });

        match state.mode.unwrap_or(RenderMode::Immediate) {
            RenderMode::Immediate => {
                drop(state);
                completer.complete(present_blank(canvas.as_ref(), &viewport));
            }
            RenderMode::Hold => {
                state.held.insert(index, (completer, canvas));
            }
        }

        task
    }
}
