//! Scroll position to frame index mapping.

/// A document-scroll pixel range over which the frame index varies.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScrollBounds {
    /// Scroll offset at which frame 0 is shown
    pub start: f64,
    /// Scroll offset at which the last frame is shown
    pub end: f64,
}

impl ScrollBounds {
    /// Create new bounds.
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Width of the range. Zero or negative means degenerate.
    #[inline]
    pub fn len(&self) -> f64 {
        self.end - self.start
    }

    /// Returns `true` when the range has no positive width.
    #[inline]
    pub fn is_empty(&self) -> bool {
        !(self.end > self.start)
    }

    /// Progress of `scroll_y` through the range, clamped to `0.0..=1.0`.
    ///
    /// Degenerate ranges and non-finite inputs yield `0.0`.
    pub fn progress(&self, scroll_y: f64) -> f64 {
        if self.is_empty() || !self.len().is_finite() || !scroll_y.is_finite() {
            return 0.0;
        }
        ((scroll_y - self.start) / self.len()).clamp(0.0, 1.0)
    }

    /// Frame index for `scroll_y` in a sequence of `total_frames`.
    #[inline]
    pub fn frame_index(&self, scroll_y: f64, total_frames: usize) -> usize {
        frame_index(scroll_y, *self, total_frames)
    }
}

/// Map a scroll offset to a frame index in `[0, total_frames - 1]`.
///
/// This is a pure function: callers recompute it on every scroll event
/// instead of tracking incremental state.
///
/// ```rust
/// use scrollframe_core_view::{frame_index, ScrollBounds};
///
/// let bounds = ScrollBounds::new(0.0, 1000.0);
/// assert_eq!(frame_index(0.0, bounds, 191), 0);
/// assert_eq!(frame_index(500.0, bounds, 191), 95);
/// assert_eq!(frame_index(1000.0, bounds, 191), 190);
/// assert_eq!(frame_index(1500.0, bounds, 191), 190);
/// ```
pub fn frame_index(scroll_y: f64, bounds: ScrollBounds, total_frames: usize) -> usize {
    if total_frames == 0 {
        return 0;
    }
    let last = total_frames - 1;
    let progress = bounds.progress(scroll_y);
    ((progress * last as f64).floor() as usize).min(last)
}

/// Layout box of a host element, relative to the viewport.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ElementBox {
    /// Distance from the viewport top to the element's top edge
    pub top: f64,
    /// Distance from the viewport top to the element's bottom edge
    pub bottom: f64,
}

/// Layout measurements needed to resolve scroll bounds.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Layout {
    /// Current document scroll offset
    pub scroll_y: f64,
    /// Viewport height in pixels
    pub viewport_height: f64,
    /// Host element box, if one is being tracked
    pub element: Option<ElementBox>,
}

/// How a sequence derives its scroll bounds from the page layout.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum BoundsSpec {
    /// Fixed document offsets in pixels
    Pixels { start: f64, end: f64 },
    /// Offsets expressed in multiples of the viewport height
    Viewport { start: f64, end: f64 },
    /// A tall section with a sticky viewport-sized child: playback spans
    /// from the section's top reaching the viewport top until its bottom
    /// reaches the viewport bottom
    StickySection,
}

impl Default for BoundsSpec {
    fn default() -> Self {
        Self::Viewport { start: 0.0, end: 1.0 }
    }
}

impl BoundsSpec {
    /// Resolve concrete bounds for the given layout.
    pub fn resolve(&self, layout: &Layout) -> ScrollBounds {
        match *self {
            BoundsSpec::Pixels { start, end } => ScrollBounds::new(start, end),
            BoundsSpec::Viewport { start, end } => ScrollBounds::new(
                start * layout.viewport_height,
                end * layout.viewport_height,
            ),
            BoundsSpec::StickySection => match layout.element {
                Some(rect) => ScrollBounds::new(
                    layout.scroll_y + rect.top,
                    layout.scroll_y + rect.bottom - layout.viewport_height,
                ),
                None => ScrollBounds::default(),
            },
        }
    }

    /// Returns `true` when resolution depends on the tracked element box.
    #[inline]
    pub fn needs_element(&self) -> bool {
        matches!(self, BoundsSpec::StickySection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_scenario() {
        let bounds = ScrollBounds::new(0.0, 1000.0);
        assert_eq!(frame_index(0.0, bounds, 191), 0);
        assert_eq!(frame_index(500.0, bounds, 191), 95);
        assert_eq!(frame_index(1000.0, bounds, 191), 190);
        assert_eq!(frame_index(1500.0, bounds, 191), 190);
    }

    #[test]
    fn test_clamped_before_and_after() {
        let bounds = ScrollBounds::new(200.0, 800.0);
        for y in [-1000.0, 0.0, 199.9, 200.0] {
            assert_eq!(frame_index(y, bounds, 50), 0);
        }
        for y in [800.0, 800.1, 5000.0] {
            assert_eq!(frame_index(y, bounds, 50), 49);
        }
    }

    #[test]
    fn test_monotonic_and_idempotent() {
        let bounds = ScrollBounds::new(100.0, 3100.0);
        let mut prev = 0;
        let mut y = 100.0;
        while y <= 3100.0 {
            let idx = frame_index(y, bounds, 191);
            assert!(idx >= prev, "index went backwards at y={y}");
            assert_eq!(idx, frame_index(y, bounds, 191));
            prev = idx;
            y += 7.3;
        }
    }

    #[test]
    fn test_degenerate_bounds() {
        let zero = ScrollBounds::new(500.0, 500.0);
        let inverted = ScrollBounds::new(900.0, 100.0);
        assert!(zero.is_empty());
        assert!(inverted.is_empty());
        assert_eq!(zero.progress(10_000.0), 0.0);
        assert_eq!(frame_index(10_000.0, inverted, 191), 0);
    }

    #[test]
    fn test_non_finite_input() {
        let bounds = ScrollBounds::new(0.0, 100.0);
        assert_eq!(bounds.progress(f64::NAN), 0.0);
        assert_eq!(frame_index(f64::INFINITY, bounds, 10), 0);
    }

    #[test]
    fn test_single_and_empty_sequence() {
        let bounds = ScrollBounds::new(0.0, 100.0);
        assert_eq!(frame_index(50.0, bounds, 1), 0);
        assert_eq!(frame_index(50.0, bounds, 0), 0);
    }

    #[test]
    fn test_resolve_viewport() {
        let layout = Layout {
            scroll_y: 300.0,
            viewport_height: 900.0,
            element: None,
        };
        let bounds = BoundsSpec::Viewport { start: 0.0, end: 1.0 }.resolve(&layout);
        assert_eq!(bounds, ScrollBounds::new(0.0, 900.0));
    }

    #[test]
    fn test_resolve_sticky_section() {
        // A 300vh section whose top is 400px below the viewport top
        let layout = Layout {
            scroll_y: 1000.0,
            viewport_height: 800.0,
            element: Some(ElementBox {
                top: 400.0,
                bottom: 400.0 + 2400.0,
            }),
        };
        let bounds = BoundsSpec::StickySection.resolve(&layout);
        assert_eq!(bounds.start, 1400.0);
        assert_eq!(bounds.end, 1000.0 + 2800.0 - 800.0);
        assert!(BoundsSpec::StickySection.needs_element());
    }

    #[test]
    fn test_resolve_sticky_without_element() {
        let bounds = BoundsSpec::StickySection.resolve(&Layout::default());
        assert!(bounds.is_empty());
    }
}
