//! Display-space / image-pixel-space coordinate mapping.
//!
//! Every conversion between the source image's native pixel grid and the
//! zoomed display surface goes through this module, so drawing, hit-testing
//! and export all share one definition of "display space".

use crate::geometry::Point;

/// The view transform: a base fit scale computed once per image load, plus
/// the user-controlled zoom level.
///
/// A display coordinate is `pixel * base_scale * zoom`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub base_scale: f32,
    pub zoom: f32,
}

impl ViewTransform {
    /// Create a transform with the given base scale at zoom 1.
    pub fn new(base_scale: f32) -> Self {
        Self {
            base_scale,
            zoom: 1.0,
        }
    }

    /// Create an identity transform (scale 1, zoom 1).
    pub fn identity() -> Self {
        Self::new(1.0)
    }

    /// Compute the base scale that fits an image into a container without
    /// ever upscaling past 100%.
    pub fn fit(container_w: f32, container_h: f32, image_w: f32, image_h: f32) -> Self {
        if image_w <= 0.0 || image_h <= 0.0 {
            return Self::identity();
        }
        let scale = (container_w / image_w)
            .min(container_h / image_h)
            .min(1.0);
        Self::new(scale)
    }

    /// Return the same transform at a different zoom level.
    pub fn with_zoom(&self, zoom: f32) -> Self {
        Self {
            base_scale: self.base_scale,
            zoom,
        }
    }

    /// The combined display scale factor.
    pub fn scale(&self) -> f32 {
        self.base_scale * self.zoom
    }

    /// Map an image-pixel point into display space.
    pub fn to_display(&self, p: Point) -> Point {
        let s = self.scale();
        Point::new(p.x * s, p.y * s)
    }

    /// Map a display-space point back into image pixels.
    ///
    /// A zero combined scale would divide by zero; the point is returned
    /// unchanged in that case.
    pub fn to_image_pixel(&self, p: Point) -> Point {
        let s = self.scale();
        if s == 0.0 {
            return p;
        }
        Point::new(p.x / s, p.y / s)
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::identity()
    }
}
