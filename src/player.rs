//! Scroll-driven playback state for one frame sequence.

use std::ops::Range;

use crate::loader::{CancelToken, FramePreloader};
use crate::mapper::{frame_index, BoundsSpec, Layout, ScrollBounds};
use crate::render::{draw_frame, resize_surface, DrawOutcome, RenderSurface};
use crate::{FrameSet, Result, SequenceConfig};

/// What the host should do after feeding an event to the player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Update {
    /// Schedule an animation-frame callback that calls
    /// [`SequencePlayer::render`]. Only set when no redraw is pending yet.
    pub schedule_redraw: bool,
    /// The loading flag changed (it only ever drops from true to false).
    pub loading_changed: bool,
}

impl Update {
    /// Combine two updates.
    pub fn merge(self, other: Update) -> Update {
        Update {
            schedule_redraw: self.schedule_redraw || other.schedule_redraw,
            loading_changed: self.loading_changed || other.loading_changed,
        }
    }
}

/// Platform-agnostic controller for a scroll-driven frame sequence.
///
/// The host feeds it scroll, resize and image-load events and calls
/// [`render`](Self::render) from an animation-frame callback whenever an
/// [`Update`] asks for one. Multiple events before the next frame coalesce
/// into a single draw.
///
/// ## Example
///
/// ```rust
/// use scrollframe_core_view::{BoundsSpec, SequenceConfig, SequencePlayer};
///
/// let config = SequenceConfig::new("/impact/frame_000.webp", 191)
///     .with_bounds(BoundsSpec::Pixels { start: 0.0, end: 1000.0 });
/// let mut player: SequencePlayer<()> = SequencePlayer::new(&config).unwrap();
///
/// let update = player.on_scroll(500.0);
/// assert_eq!(player.current_frame(), 95);
/// assert!(update.schedule_redraw);
///
/// // Already pending: the next frame change does not schedule again
/// assert!(!player.on_scroll(1000.0).schedule_redraw);
/// assert_eq!(player.current_frame(), 190);
/// ```
#[derive(Debug)]
pub struct SequencePlayer<I> {
    frames: FrameSet,
    bounds_spec: BoundsSpec,
    bounds: ScrollBounds,
    scroll_y: f64,
    current_frame: usize,
    container: (f64, f64),
    preloader: FramePreloader<I>,
    lazy_delay_ms: u32,
    cancel: CancelToken,
    redraw_pending: bool,
    resize_pending: bool,
}

impl<I> SequencePlayer<I> {
    /// Create a player from a validated configuration.
    pub fn new(config: &SequenceConfig) -> Result<Self> {
        let frames = config.frame_set()?;
        let preloader = FramePreloader::new(frames.total_frames(), config.eager_frames);
        let bounds = config.bounds.resolve(&Layout::default());
        Ok(Self {
            frames,
            bounds_spec: config.bounds,
            bounds,
            scroll_y: 0.0,
            current_frame: 0,
            container: (0.0, 0.0),
            preloader,
            lazy_delay_ms: config.lazy_delay_ms,
            cancel: CancelToken::new(),
            redraw_pending: false,
            resize_pending: false,
        })
    }

    /// The frame set being played.
    #[inline]
    pub fn frames(&self) -> &FrameSet {
        &self.frames
    }

    /// Currently resolved scroll bounds.
    #[inline]
    pub fn bounds(&self) -> ScrollBounds {
        self.bounds
    }

    /// Frame selected by the last scroll position.
    #[inline]
    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    /// `true` until the eager batch has settled.
    #[inline]
    pub fn is_loading(&self) -> bool {
        self.preloader.is_loading()
    }

    /// Image cache and load bookkeeping.
    #[inline]
    pub fn preloader(&self) -> &FramePreloader<I> {
        &self.preloader
    }

    /// Delay before the lazy batch should be requested.
    #[inline]
    pub fn lazy_delay_ms(&self) -> u32 {
        self.lazy_delay_ms
    }

    /// Token cancelled by [`teardown`](Self::teardown).
    #[inline]
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Returns `true` while an animation-frame callback is outstanding.
    #[inline]
    pub fn redraw_pending(&self) -> bool {
        self.redraw_pending
    }

    fn request_redraw(&mut self) -> Update {
        let schedule = !self.redraw_pending;
        self.redraw_pending = true;
        Update {
            schedule_redraw: schedule,
            loading_changed: false,
        }
    }

    fn select(&mut self, scroll_y: f64) -> Update {
        self.scroll_y = scroll_y;
        let index = frame_index(scroll_y, self.bounds, self.frames.total_frames());
        if index == self.current_frame {
            return Update::default();
        }
        tracing::trace!(from = self.current_frame, to = index, "frame changed");
        self.current_frame = index;
        self.request_redraw()
    }

    /// Handle a scroll event.
    pub fn on_scroll(&mut self, scroll_y: f64) -> Update {
        self.select(scroll_y)
    }

    /// Handle a layout change: re-resolve bounds, re-select the frame and
    /// resize the canvas to `container` (width, height) on the next render.
    pub fn on_resize(&mut self, layout: Layout, container: (f64, f64)) -> Update {
        self.bounds = self.bounds_spec.resolve(&layout);
        self.container = container;
        self.resize_pending = true;
        let selected = self.select(layout.scroll_y);
        selected.merge(self.request_redraw())
    }

    /// Mark the eager batch in flight and return the indices to request.
    pub fn start_preload(&mut self) -> Range<usize> {
        self.preloader.start()
    }

    /// Mark the lazy batch in flight and return the indices to request.
    ///
    /// Returns an empty range after [`teardown`](Self::teardown).
    pub fn begin_lazy_preload(&mut self) -> Range<usize> {
        if self.cancel.is_cancelled() {
            return 0..0;
        }
        self.preloader.begin_lazy()
    }

    /// Record a decoded frame image.
    pub fn on_frame_loaded(&mut self, index: usize, image: I) -> Update {
        let loading_changed = self.preloader.mark_loaded(index, image);
        self.after_settled(index, loading_changed)
    }

    /// Record a failed frame load.
    pub fn on_frame_failed(&mut self, index: usize) -> Update {
        tracing::debug!(index, "frame failed to load");
        let loading_changed = self.preloader.mark_failed(index);
        self.after_settled(index, loading_changed)
    }

    fn after_settled(&mut self, index: usize, loading_changed: bool) -> Update {
        let redraw = if index == self.current_frame {
            self.request_redraw()
        } else {
            Update::default()
        };
        redraw.merge(Update {
            schedule_redraw: false,
            loading_changed,
        })
    }

    /// Draw the current frame. Call from the animation-frame callback.
    ///
    /// Applies a pending resize first (which clears the surface), then
    /// draws the current frame with cover-fit.
    pub fn render<S>(&mut self, surface: &mut S) -> DrawOutcome
    where
        S: RenderSurface<Image = I>,
        I: crate::render::FrameImage,
    {
        self.redraw_pending = false;
        if self.resize_pending {
            self.resize_pending = false;
            let (width, height) = self.container;
            resize_surface(surface, width, height);
        }
        draw_frame(surface, self.preloader.image(self.current_frame))
    }

    /// Cancel the delayed lazy preload. Loads already in flight are not
    /// affected.
    pub fn teardown(&self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::ElementBox;
    use crate::render::tests::{Op, RecordingSurface, TestImage};
    use crate::render::SkipReason;

    fn player(total: usize, start: f64, end: f64) -> SequencePlayer<TestImage> {
        let config = SequenceConfig::new("/seq/frame_000.webp", total)
            .with_bounds(BoundsSpec::Pixels { start, end });
        SequencePlayer::new(&config).unwrap()
    }

    #[test]
    fn test_scroll_selects_frames() {
        let mut p = player(191, 0.0, 1000.0);
        assert_eq!(p.current_frame(), 0);
        p.on_scroll(500.0);
        assert_eq!(p.current_frame(), 95);
        p.on_scroll(1500.0);
        assert_eq!(p.current_frame(), 190);
        p.on_scroll(-20.0);
        assert_eq!(p.current_frame(), 0);
    }

    #[test]
    fn test_redraws_coalesce_until_rendered() {
        let mut p = player(10, 0.0, 100.0);
        let mut surface = RecordingSurface::default();

        assert!(p.on_scroll(50.0).schedule_redraw);
        assert!(!p.on_scroll(80.0).schedule_redraw);
        assert!(p.redraw_pending());

        p.render(&mut surface);
        assert!(!p.redraw_pending());
        assert!(p.on_scroll(10.0).schedule_redraw);
    }

    #[test]
    fn test_same_frame_does_not_redraw() {
        let mut p = player(10, 0.0, 1000.0);
        assert_eq!(p.on_scroll(5.0), Update::default());
        assert_eq!(p.on_scroll(5.0), Update::default());
    }

    #[test]
    fn test_resize_rebinds_sticky_bounds() {
        let config = SequenceConfig::new("/cooling/frame_000.webp", 191).with_bounds(BoundsSpec::StickySection);
        let mut p: SequencePlayer<TestImage> = SequencePlayer::new(&config).unwrap();
        assert!(p.bounds().is_empty());

        let layout = Layout {
            scroll_y: 0.0,
            viewport_height: 1000.0,
            element: Some(ElementBox {
                top: 2000.0,
                bottom: 5000.0,
            }),
        };
        let update = p.on_resize(layout, (1280.0, 1000.0));
        assert!(update.schedule_redraw);
        assert_eq!(p.bounds(), ScrollBounds::new(2000.0, 4000.0));

        p.on_scroll(3000.0);
        assert_eq!(p.current_frame(), 95);
    }

    #[test]
    fn test_resize_applies_on_render() {
        let mut p = player(3, 0.0, 100.0);
        let mut surface = RecordingSurface::default();
        p.start_preload();
        p.on_frame_loaded(0, TestImage::decoded(1920, 1080));
        p.on_resize(Layout::default(), (800.0, 600.0));

        let outcome = p.render(&mut surface);
        assert!(matches!(outcome, DrawOutcome::Drawn(_)));
        assert_eq!(surface.ops[0], Op::Resize(800, 600));
        assert_eq!(surface.draws(), 1);

        // No second resize without a new layout event
        p.on_scroll(100.0);
        p.render(&mut surface);
        assert_eq!(surface.ops.iter().filter(|op| matches!(op, Op::Resize(..))).count(), 1);
    }

    #[test]
    fn test_loading_flag_drops_once() {
        let mut p = player(12, 0.0, 100.0);
        assert!(p.is_loading());
        assert_eq!(p.start_preload(), 0..10);

        let mut changes = 0;
        for i in 0..10 {
            let update = if i % 3 == 0 {
                p.on_frame_failed(i)
            } else {
                p.on_frame_loaded(i, TestImage::decoded(4, 3))
            };
            if update.loading_changed {
                changes += 1;
                assert_eq!(i, 9);
            }
        }
        assert_eq!(p.begin_lazy_preload(), 10..12);
        changes += [10, 11]
            .into_iter()
            .filter(|&i| p.on_frame_loaded(i, TestImage::decoded(4, 3)).loading_changed)
            .count();

        assert_eq!(changes, 1);
        assert!(!p.is_loading());
    }

    #[test]
    fn test_current_frame_load_requests_redraw() {
        let mut p = player(20, 0.0, 100.0);
        p.start_preload();
        assert!(!p.on_frame_loaded(4, TestImage::decoded(4, 3)).schedule_redraw);
        assert!(p.on_frame_loaded(0, TestImage::decoded(4, 3)).schedule_redraw);
    }

    #[test]
    fn test_failed_current_frame_keeps_canvas() {
        let mut p = player(10, 0.0, 90.0);
        let mut surface = RecordingSurface::default();
        p.start_preload();
        p.on_resize(Layout::default(), (400.0, 300.0));
        p.on_frame_loaded(0, TestImage::decoded(400, 300));
        p.on_frame_failed(1);
        p.render(&mut surface);
        let drawn = surface.ops.clone();

        p.on_scroll(15.0);
        assert_eq!(p.current_frame(), 1);
        assert_eq!(p.render(&mut surface), DrawOutcome::Skipped(SkipReason::Missing));
        assert_eq!(surface.ops, drawn);
    }

    #[test]
    fn test_teardown_cancels_lazy_start() {
        let mut p = player(30, 0.0, 100.0);
        p.start_preload();
        p.teardown();
        assert!(p.cancel_token().is_cancelled());
        assert_eq!(p.begin_lazy_preload(), 0..0);
    }
}
