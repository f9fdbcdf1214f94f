//! Cover-fit geometry for drawing frames into a canvas.

/// Destination rectangle for a draw call, in canvas pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DrawRect {
    /// Returns `true` when this rectangle covers a `width` x `height` canvas
    /// anchored at the origin, within `epsilon`.
    pub fn covers(&self, width: f64, height: f64, epsilon: f64) -> bool {
        self.x <= epsilon
            && self.y <= epsilon
            && self.x + self.width >= width - epsilon
            && self.y + self.height >= height - epsilon
    }
}

/// Compute a cover-fit rectangle for an image inside a canvas.
///
/// The image is scaled uniformly so it fully covers the canvas; the
/// overflowing axis is cropped evenly on both sides and the other axis has
/// a zero offset. Returns `None` when any dimension is zero, negative or
/// non-finite.
///
/// ```rust
/// use scrollframe_core_view::cover_fit;
///
/// // 16:9 image in a square canvas: full height, cropped left and right
/// let rect = cover_fit(1920.0, 1080.0, 500.0, 500.0).unwrap();
/// assert_eq!(rect.y, 0.0);
/// assert_eq!(rect.height, 500.0);
/// assert!(rect.x < 0.0);
/// ```
pub fn cover_fit(
    image_width: f64,
    image_height: f64,
    canvas_width: f64,
    canvas_height: f64,
) -> Option<DrawRect> {
    let valid = |v: f64| v.is_finite() && v > 0.0;
    if !(valid(image_width) && valid(image_height) && valid(canvas_width) && valid(canvas_height))
    {
        return None;
    }

    let image_ratio = image_width / image_height;
    let canvas_ratio = canvas_width / canvas_height;

    let rect = if canvas_ratio > image_ratio {
        // Canvas is wider: match width, crop top and bottom
        let height = canvas_width / image_ratio;
        DrawRect {
            x: 0.0,
            y: (canvas_height - height) / 2.0,
            width: canvas_width,
            height,
        }
    } else {
        // Canvas is taller (or same shape): match height, crop the sides
        let width = canvas_height * image_ratio;
        DrawRect {
            x: (canvas_width - width) / 2.0,
            y: 0.0,
            width,
            height: canvas_height,
        }
    };
    Some(rect)
}

/// Canvas backing-store size for a container box.
///
/// Fractional sizes are truncated the way layout offsets are. Returns
/// `None` when the container has no drawable area.
pub fn canvas_size(container_width: f64, container_height: f64) -> Option<(u32, u32)> {
    if !(container_width.is_finite() && container_height.is_finite()) {
        return None;
    }
    let width = container_width.max(0.0).min(u32::MAX as f64) as u32;
    let height = container_height.max(0.0).min(u32::MAX as f64) as u32;
    if width == 0 || height == 0 {
        None
    } else {
        Some((width, height))
    }
}
