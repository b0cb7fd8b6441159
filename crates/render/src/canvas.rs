//! Drawing surfaces
//!
//! A [`Canvas`] is the surface a slot renders into. Its container decides how
//! much room the page may take; its backing pixel size is set by the renderer
//! right before drawing.

use image::RgbaImage;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

use crate::error::{RenderError, RenderResult};
use crate::viewport::Size;

/// Surface a page is drawn onto
pub trait Canvas: Send + Sync {
    /// Current size of the element containing the canvas.
    fn container_size(&self) -> Size;

    /// Set the backing pixel size. Clears any previous content.
    fn resize(&self, width: u32, height: u32);

    /// Current backing pixel size.
    fn size(&self) -> (u32, u32);

    /// Replace the canvas content with a rendered frame of exactly `size()`.
    fn present(&self, frame: RgbaImage) -> RenderResult<()>;
}

/// In-memory RGBA canvas
///
/// The host sets the container size (e.g. from its window layout) and may
/// ask for every presented frame to be written out as a PNG so another
/// process can put it on screen.
pub struct PixelCanvas {
    state: Mutex<CanvasState>,
    snapshot_path: Option<PathBuf>,
}

struct CanvasState {
    container: Size,
    frame: RgbaImage,
    presented: u64,
}

impl PixelCanvas {
    /// Create a canvas inside a container of the given size.
    pub fn new(container: Size) -> Self {
        Self {
            state: Mutex::new(CanvasState {
                container,
                frame: RgbaImage::new(0, 0),
                presented: 0,
            }),
            snapshot_path: None,
        }
    }

    /// Write every presented frame to `path` as a PNG.
    pub fn with_snapshot_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.snapshot_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Change the container size. Takes effect on the next render.
    pub fn set_container_size(&self, container: Size) {
        self.state.lock().container = container;
    }

    /// Copy of the current content.
    pub fn frame(&self) -> RgbaImage {
        self.state.lock().frame.clone()
    }

    /// Number of frames presented since creation.
    pub fn presented_frames(&self) -> u64 {
        self.state.lock().presented
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }
}

impl Canvas for PixelCanvas {
    fn container_size(&self) -> Size {
        self.state.lock().container
    }

    fn resize(&self, width: u32, height: u32) {
        self.state.lock().frame = RgbaImage::new(width, height);
    }

    fn size(&self) -> (u32, u32) {
        self.state.lock().frame.dimensions()
    }

    fn present(&self, frame: RgbaImage) -> RenderResult<()> {
        {
            let mut state = self.state.lock();
            if frame.dimensions() != state.frame.dimensions() {
                return Err(RenderError::Render(format!(
                    "frame is {:?} but canvas is {:?}",
                    frame.dimensions(),
                    state.frame.dimensions()
                )));
            }
            state.frame = frame;
            state.presented += 1;
        }

        if let Some(path) = &self.snapshot_path {
            let frame = self.frame();
            if let Err(e) = frame.save(path) {
                tracing::warn!(path = %path.display(), error = %e, "failed to write canvas snapshot");
            }
        }

        Ok(())
    }
}
