//! Page geometry
//!
//! A [`PageViewport`] is a page's size at a given scale, in canvas pixels.
//! Pixel dimensions are truncated the way a canvas truncates a fractional
//! width or height assignment.

/// Width and height of a surface or container, in CSS-style pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Both dimensions are finite and strictly positive.
    pub fn is_drawable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Page dimensions at a given scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageViewport {
    /// Scale relative to the page's natural size (1.0 = one pixel per point)
    pub scale: f32,
    /// Scaled width
    pub width: f32,
    /// Scaled height
    pub height: f32,
}

impl PageViewport {
    /// Viewport of a page whose natural size is `width_pt` x `height_pt` points.
    pub fn from_points(width_pt: f32, height_pt: f32, scale: f32) -> Self {
        Self {
            scale,
            width: width_pt * scale,
            height: height_pt * scale,
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Canvas width in whole pixels (at least 1).
    pub fn pixel_width(&self) -> u32 {
        to_pixels(self.width)
    }

    /// Canvas height in whole pixels (at least 1).
    pub fn pixel_height(&self) -> u32 {
        to_pixels(self.height)
    }
}

fn to_pixels(value: f32) -> u32 {
    if value.is_finite() && value >= 1.0 {
        value as u32
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_scales_both_axes() {
        let viewport = PageViewport::from_points(612.0, 792.0, 1.5);
        assert_eq!(viewport.width, 918.0);
        assert_eq!(viewport.height, 1188.0);
        assert_eq!(viewport.scale, 1.5);
    }

    #[test]
    fn test_pixel_dimensions_truncate() {
        let viewport = PageViewport {
            scale: 1.0,
            width: 399.9,
            height: 300.2,
        };
        assert_eq!(viewport.pixel_width(), 399);
        assert_eq!(viewport.pixel_height(), 300);
    }

    #[test]
    fn test_pixel_dimensions_never_zero() {
        let viewport = PageViewport {
            scale: 0.0,
            width: 0.0,
            height: f32::NAN,
        };
        assert_eq!(viewport.pixel_width(), 1);
        assert_eq!(viewport.pixel_height(), 1);
    }

    #[test]
    fn test_size_is_drawable() {
        assert!(Size::new(800.0, 600.0).is_drawable());
        assert!(!Size::new(0.0, 600.0).is_drawable());
        assert!(!Size::new(800.0, -1.0).is_drawable());
        assert!(!Size::new(f32::INFINITY, 600.0).is_drawable());
    }
}
