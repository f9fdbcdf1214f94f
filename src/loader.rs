//! Frame preloading utilities and state management.
//!
//! Frames load in two phases:
//! 1. Eager batch (first few frames) - gates the "ready" signal
//! 2. Lazy remainder - started after a short settling delay
//!
//! Every load is independent. Success and failure both settle a slot and
//! both count toward readiness; failed slots are never retried.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::ops::Range;
use std::rc::Rc;

use futures::future;

use crate::FrameSet;

/// Number of frames loaded before anything else.
pub const DEFAULT_EAGER_FRAMES: usize = 10;

/// Delay before the lazy batch starts, in milliseconds.
pub const DEFAULT_LAZY_DELAY_MS: u32 = 500;

/// Per-frame load state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadState {
    /// Not requested yet
    #[default]
    Unloaded,
    /// Request in flight
    Loading,
    /// Fully decoded with non-zero dimensions
    Loaded,
    /// Decode error; never drawn, never retried
    Failed,
}

impl LoadState {
    /// Returns `true` once the slot has a final outcome.
    #[inline]
    pub fn is_settled(self) -> bool {
        matches!(self, LoadState::Loaded | LoadState::Failed)
    }
}

/// Loading phase indicator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadingPhase {
    /// Not loading anything
    Idle,
    /// Eager batch in flight, lazy batch not started
    Eager,
    /// Eager batch settled, waiting for the lazy batch to start
    Waiting,
    /// Lazy batch requested, some frames still in flight
    Lazy,
    /// Every frame settled
    Complete,
}

/// Progress information for frame preloading
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadingProgress {
    /// Frames decoded successfully
    pub loaded: usize,
    /// Frames that failed to decode
    pub failed: usize,
    /// Total number of frames
    pub total: usize,
}

impl LoadingProgress {
    /// Create a new progress tracker
    pub fn new(total: usize) -> Self {
        Self {
            loaded: 0,
            failed: 0,
            total,
        }
    }

    /// Frames with a final outcome.
    #[inline]
    pub fn settled(&self) -> usize {
        self.loaded + self.failed
    }

    /// Settled percentage (0-100)
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            0
        } else {
            ((self.settled() as f32 / self.total as f32) * 100.0) as u8
        }
    }

    /// Check if every frame has settled
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.settled() >= self.total
    }

    /// Format a loading message
    pub fn message(&self) -> String {
        if self.total == 0 {
            return "Loading frames...".to_string();
        }
        let mut msg = format!(
            "Loading frames... {} / {} ({}%)",
            self.settled(),
            self.total,
            self.percent()
        );
        if self.failed > 0 {
            msg.push_str(&format!(", {} failed", self.failed));
        }
        msg
    }
}

#[derive(Clone, Debug)]
struct Slot<I> {
    state: LoadState,
    image: Option<I>,
}

impl<I> Default for Slot<I> {
    fn default() -> Self {
        Self {
            state: LoadState::Unloaded,
            image: None,
        }
    }
}

/// Image cache plus bookkeeping for the eager/lazy preload split.
///
/// The preloader does no I/O itself: callers ask it which indices to
/// request ([`start`](Self::start), [`begin_lazy`](Self::begin_lazy)) and
/// report each outcome back. It is generic over the image handle so the
/// same logic serves the web binding and tests.
///
/// ```rust
/// use scrollframe_core_view::FramePreloader;
///
/// let mut preloader: FramePreloader<&str> = FramePreloader::new(3, 2);
/// assert!(preloader.is_loading());
///
/// assert_eq!(preloader.start(), 0..2);
/// assert!(!preloader.mark_loaded(0, "frame 0"));
/// // Failures count toward readiness too
/// assert!(preloader.mark_failed(1));
/// assert!(!preloader.is_loading());
///
/// assert_eq!(preloader.begin_lazy(), 2..3);
/// ```
#[derive(Clone, Debug)]
pub struct FramePreloader<I> {
    slots: Vec<Slot<I>>,
    eager: usize,
    started: bool,
    lazy_started: bool,
    ready: bool,
    progress: LoadingProgress,
}

impl<I> FramePreloader<I> {
    /// Create a preloader for `total_frames` frames with an eager batch of
    /// `eager_frames` (clamped to `1..=total_frames`).
    pub fn new(total_frames: usize, eager_frames: usize) -> Self {
        let mut slots = Vec::with_capacity(total_frames);
        slots.resize_with(total_frames, Slot::default);
        Self {
            slots,
            eager: eager_frames.max(1).min(total_frames),
            started: false,
            lazy_started: false,
            ready: total_frames == 0,
            progress: LoadingProgress::new(total_frames),
        }
    }

    /// Create a preloader sized for a frame set with the default eager batch.
    pub fn for_frames(frames: &FrameSet) -> Self {
        Self::new(frames.total_frames(), DEFAULT_EAGER_FRAMES)
    }

    /// Mark the eager batch as in flight and return its indices.
    ///
    /// Calling this again returns an empty range.
    pub fn start(&mut self) -> Range<usize> {
        if self.started {
            return 0..0;
        }
        self.started = true;
        self.request(0..self.eager)
    }

    /// Mark the lazy batch as in flight and return its indices.
    ///
    /// Calling this again returns an empty range.
    pub fn begin_lazy(&mut self) -> Range<usize> {
        if self.lazy_started {
            return 0..0;
        }
        self.lazy_started = true;
        self.request(self.eager..self.slots.len())
    }

    fn request(&mut self, range: Range<usize>) -> Range<usize> {
        for slot in &mut self.slots[range.clone()] {
            if slot.state == LoadState::Unloaded {
                slot.state = LoadState::Loading;
            }
        }
        range
    }

    /// Record a successful load.
    ///
    /// Returns `true` exactly once: when this outcome completes the eager
    /// batch and the loading flag drops.
    pub fn mark_loaded(&mut self, index: usize, image: I) -> bool {
        let Some(slot) = self.slots.get_mut(index) else {
            return false;
        };
        if slot.state != LoadState::Loading {
            return false;
        }
        slot.state = LoadState::Loaded;
        slot.image = Some(image);
        self.progress.loaded += 1;
        self.settle()
    }

    /// Record a failed load. Same return contract as [`mark_loaded`](Self::mark_loaded).
    pub fn mark_failed(&mut self, index: usize) -> bool {
        let Some(slot) = self.slots.get_mut(index) else {
            return false;
        };
        if slot.state != LoadState::Loading {
            return false;
        }
        slot.state = LoadState::Failed;
        self.progress.failed += 1;
        self.settle()
    }

    fn settle(&mut self) -> bool {
        if self.ready {
            return false;
        }
        let eager_settled = self.slots[..self.eager]
            .iter()
            .all(|slot| slot.state.is_settled());
        if eager_settled {
            self.ready = true;
        }
        self.ready
    }

    /// `true` until every eager frame has settled.
    #[inline]
    pub fn is_loading(&self) -> bool {
        !self.ready
    }

    /// Current phase, derived from the slot states.
    pub fn phase(&self) -> LoadingPhase {
        if !self.started {
            LoadingPhase::Idle
        } else if self.progress.is_complete() {
            LoadingPhase::Complete
        } else if self.lazy_started {
            LoadingPhase::Lazy
        } else if self.ready {
            LoadingPhase::Waiting
        } else {
            LoadingPhase::Eager
        }
    }

    /// Loading progress counters.
    #[inline]
    pub fn progress(&self) -> &LoadingProgress {
        &self.progress
    }

    /// Load state of the frame at `index` (`Unloaded` when out of range).
    pub fn state(&self, index: usize) -> LoadState {
        self.slots
            .get(index)
            .map(|slot| slot.state)
            .unwrap_or_default()
    }

    /// The decoded image for `index`, if it loaded successfully.
    pub fn image(&self, index: usize) -> Option<&I> {
        self.slots.get(index).and_then(|slot| slot.image.as_ref())
    }

    /// Number of frame slots.
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.slots.len()
    }

    /// Size of the eager batch.
    #[inline]
    pub fn eager_count(&self) -> usize {
        self.eager
    }
}

/// Result type for frame loading operations
pub type LoadResult<T> = Result<T, crate::Error>;

/// Shared cancellation flag for the delayed lazy start.
///
/// Cloning shares the flag. Only the delayed start observes it: loads that
/// are already in flight run to completion.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Rc<Cell<bool>>);

impl CancelToken {
    /// Create an uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the pending work.
    pub fn cancel(&self) {
        self.0.set(true);
    }

    /// Returns `true` after [`cancel`](Self::cancel).
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

/// Trait for async frame image providers.
///
/// Implement this trait to load frame images with your specific I/O
/// mechanism (browser image elements, HTTP client, filesystem, etc.)
///
/// No `Send` bounds — works in both native and WASM (single-threaded) contexts.
pub trait FrameSource {
    /// Decoded image handle
    type Image;

    /// Load and decode the frame at `index` from `url`.
    fn load_frame(&self, index: usize, url: &str) -> impl Future<Output = LoadResult<Self::Image>>;
}

/// How a [`preload_frames`] run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreloadOutcome {
    /// Both batches were requested and every load settled
    Completed,
    /// The token fired during the delay; the lazy batch was never requested
    LazyCancelled,
}

/// Drive a [`FramePreloader`] through both phases using `source`.
///
/// The whole eager batch is requested at once. `lazy_delay()` starts at
/// the same time, so a stalled eager frame never holds back the lazy
/// batch. Once the delay resolves the lazy batch is requested at once,
/// unless `cancel` fired in the meantime. `on_settled(index, ready)` is
/// called after each outcome is recorded; `ready` is `true` for the one
/// outcome that completed the eager batch.
///
/// The preloader is only borrowed between awaits.
#[tracing::instrument(skip_all, fields(total = frames.total_frames()))]
pub async fn preload_frames<S, F, D, DFut>(
    source: &S,
    frames: &FrameSet,
    preloader: &RefCell<FramePreloader<S::Image>>,
    cancel: &CancelToken,
    lazy_delay: D,
    on_settled: F,
) -> PreloadOutcome
where
    S: FrameSource,
    F: FnMut(usize, bool),
    D: FnOnce() -> DFut,
    DFut: Future<Output = ()>,
{
    let on_settled = RefCell::new(on_settled);
    let eager = preloader.borrow_mut().start();
    let eager_loads = load_batch(source, frames, preloader, eager, &on_settled);

    let lazy_loads = async {
        lazy_delay().await;
        if cancel.is_cancelled() {
            tracing::debug!("lazy preload cancelled");
            return PreloadOutcome::LazyCancelled;
        }
        let lazy = preloader.borrow_mut().begin_lazy();
        load_batch(source, frames, preloader, lazy, &on_settled).await;
        PreloadOutcome::Completed
    };

    let ((), outcome) = futures::join!(eager_loads, lazy_loads);

    let progress = preloader.borrow().progress().clone();
    tracing::debug!(loaded = progress.loaded, failed = progress.failed, ?outcome, "preload finished");
    outcome
}

async fn load_batch<S, F>(
    source: &S,
    frames: &FrameSet,
    preloader: &RefCell<FramePreloader<S::Image>>,
    range: Range<usize>,
    on_settled: &RefCell<F>,
) where
    S: FrameSource,
    F: FnMut(usize, bool),
{
    let loads = range
        .filter_map(|index| frames.frame_url(index).map(|url| (index, url)))
        .map(|(index, url)| async move {
            let ready = match source.load_frame(index, &url).await {
                Ok(image) => preloader.borrow_mut().mark_loaded(index, image),
                Err(err) => {
                    tracing::debug!(index, %url, error = %err, "frame failed to load");
                    preloader.borrow_mut().mark_failed(index)
                }
            };
            (*on_settled.borrow_mut())(index, ready);
        });
    future::join_all(loads).await;
}

/// Resolve after `ms` milliseconds on the browser event loop.
///
/// Suitable as the `lazy_delay` of [`preload_frames`] in WASM:
/// `preload_frames(&src, &frames, &cell, &token, || sleep_ms(500), |_, _| {})`.
#[cfg(feature = "web")]
pub async fn sleep_ms(ms: u32) {
    let promise = js_sys::Promise::new(&mut |resolve, _| {
        if let Some(window) = web_sys::window() {
            let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms as i32);
        } else {
            let _ = resolve.call0(&wasm_bindgen::JsValue::NULL);
        }
    });
    let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
}
