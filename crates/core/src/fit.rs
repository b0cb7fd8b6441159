//! Fit-to-container scaling

use kiosk_render::{PageViewport, Size};

/// Uniform scale that makes `baseline` fit inside `container`.
///
/// The result is relative to the baseline's own scale. It is the same factor
/// in both axes, so the page keeps its aspect ratio. Returns `None` when
/// either size has a zero, negative or non-finite dimension.
pub fn fit_scale(baseline: &PageViewport, container: Size) -> Option<f32> {
    if !container.is_drawable() || !baseline.size().is_drawable() {
        return None;
    }
    Some((container.width / baseline.width).min(container.height / baseline.height))
}
