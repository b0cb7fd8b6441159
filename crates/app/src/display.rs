//! Canvases shown on screen

use kiosk_render::{Canvas, PixelCanvas, Size};
use std::sync::Arc;

use crate::config::KioskConfig;

/// One canvas per document, all inside containers of the same size
pub struct Display {
    canvases: Vec<Arc<PixelCanvas>>,
}

impl Display {
    pub fn new(config: &KioskConfig) -> Self {
        let container = config.container_size();
        let canvases = (0..config.documents.len())
            .map(|index| {
                let canvas = PixelCanvas::new(container);
                Arc::new(match config.snapshot_path(index) {
                    Some(path) => canvas.with_snapshot_path(path),
                    None => canvas,
                })
            })
            .collect();
        Self { canvases }
    }

    /// The canvases as the carousel draws on them.
    pub fn surfaces(&self) -> Vec<Arc<dyn Canvas>> {
        self.canvases
            .iter()
            .map(|canvas| canvas.clone() as Arc<dyn Canvas>)
            .collect()
    }

    pub fn container_size(&self) -> Option<Size> {
        self.canvases.first().map(|canvas| canvas.container_size())
    }

    /// Move every canvas into a container of `size`. Returns whether the
    /// size changed, i.e. whether the pages need re-rendering.
    pub fn set_container_size(&self, size: Size) -> bool {
        if self.container_size() == Some(size) {
            return false;
        }
        for canvas in &self.canvases {
            canvas.set_container_size(size);
        }
        true
    }
}
