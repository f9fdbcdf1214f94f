//! Eased automatic scroll for the intro sequence.
//!
//! A downward wheel or swipe near the top of the page plays the hero
//! sequence by scrolling the document to a target offset over a fixed
//! duration. The controller does not own a clock: callers pass
//! timestamps in milliseconds (e.g. from `requestAnimationFrame`).

/// Default tween duration in milliseconds.
pub const DEFAULT_DURATION_MS: f64 = 3000.0;

/// Runs shorter than this distance are not started.
pub const MIN_DISTANCE: f64 = 50.0;

/// Triggers only fire while the page is scrolled less than this.
pub const TRIGGER_ZONE: f64 = 100.0;

/// Minimum swipe distance for a touch trigger.
pub const MIN_SWIPE: f64 = 30.0;

/// Time after a run finishes before another may start.
pub const REARM_DELAY_MS: f64 = 500.0;

/// Ease-in-out cubic on `t` in `0.0..=1.0`.
///
/// ```rust
/// use scrollframe_core_view::ease_in_out_cubic;
///
/// assert_eq!(ease_in_out_cubic(0.0), 0.0);
/// assert_eq!(ease_in_out_cubic(0.5), 0.5);
/// assert_eq!(ease_in_out_cubic(1.0), 1.0);
/// ```
pub fn ease_in_out_cubic(t: f64) -> f64 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Current state of the auto-scroll.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AutoScrollState {
    /// Ready to be triggered
    Idle,
    /// Tween in progress
    Running { from: f64, to: f64, started_ms: f64 },
    /// Finished; triggers are ignored until `rearm_at_ms`
    Cooldown { rearm_at_ms: f64 },
}

/// Platform-agnostic auto-scroll controller.
///
/// ## Example
///
/// ```rust
/// use scrollframe_core_view::AutoScroll;
///
/// let mut auto = AutoScroll::new(1000.0);
/// assert!(auto.start(0.0, 0.0));
/// assert_eq!(auto.sample(1500.0), Some(500.0));
/// assert_eq!(auto.sample(3000.0), Some(1000.0));
/// assert!(!auto.is_running());
/// ```
#[derive(Clone, Debug)]
pub struct AutoScroll {
    target: f64,
    duration_ms: f64,
    enabled: bool,
    state: AutoScrollState,
}

impl AutoScroll {
    /// Create a controller scrolling to `target` over the default duration.
    pub fn new(target: f64) -> Self {
        Self {
            target,
            duration_ms: DEFAULT_DURATION_MS,
            enabled: true,
            state: AutoScrollState::Idle,
        }
    }

    /// Set the tween duration (at least 1 ms).
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = duration_ms.max(1.0);
        self
    }

    /// Enable or disable triggering. Disabling cancels a running tween.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.cancel();
        }
    }

    /// Change the target offset, e.g. after a resize.
    pub fn set_target(&mut self, target: f64) {
        self.target = target;
    }

    /// Target offset.
    #[inline]
    pub fn target(&self) -> f64 {
        self.target
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> AutoScrollState {
        self.state
    }

    /// Returns `true` while a tween is in progress.
    #[inline]
    pub fn is_running(&self) -> bool {
        matches!(self.state, AutoScrollState::Running { .. })
    }

    fn is_armed(&mut self, now_ms: f64) -> bool {
        match self.state {
            AutoScrollState::Idle => true,
            AutoScrollState::Running { .. } => false,
            AutoScrollState::Cooldown { rearm_at_ms } => {
                if now_ms >= rearm_at_ms {
                    self.state = AutoScrollState::Idle;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Start a run from `current_y`. Returns `false` when disabled, not
    /// armed, or the target is less than [`MIN_DISTANCE`] ahead.
    pub fn start(&mut self, now_ms: f64, current_y: f64) -> bool {
        if !self.enabled || !self.is_armed(now_ms) {
            return false;
        }
        if self.target - current_y <= MIN_DISTANCE {
            return false;
        }
        tracing::debug!(from = current_y, to = self.target, "auto-scroll started");
        self.state = AutoScrollState::Running {
            from: current_y,
            to: self.target,
            started_ms: now_ms,
        };
        true
    }

    /// Whether a wheel event should start a run (and have its default
    /// scrolling prevented).
    pub fn should_trigger_wheel(&mut self, now_ms: f64, delta_y: f64, scroll_y: f64) -> bool {
        self.enabled && delta_y > 0.0 && scroll_y < TRIGGER_ZONE && self.is_armed(now_ms)
    }

    /// Whether a touch move should start a run. `swipe` is the touch start
    /// y minus the current touch y (positive when swiping up the page).
    pub fn should_trigger_swipe(&mut self, now_ms: f64, swipe: f64, scroll_y: f64) -> bool {
        self.enabled && swipe > MIN_SWIPE && scroll_y < TRIGGER_ZONE && self.is_armed(now_ms)
    }

    /// Scroll offset for `now_ms`, or `None` when not running.
    ///
    /// The sample that reaches the end of the tween returns the target and
    /// moves the controller into cooldown.
    pub fn sample(&mut self, now_ms: f64) -> Option<f64> {
        let AutoScrollState::Running { from, to, started_ms } = self.state else {
            return None;
        };
        let progress = ((now_ms - started_ms) / self.duration_ms).clamp(0.0, 1.0);
        let y = from + (to - from) * ease_in_out_cubic(progress);
        if progress >= 1.0 {
            tracing::debug!("auto-scroll finished");
            self.state = AutoScrollState::Cooldown {
                rearm_at_ms: now_ms + REARM_DELAY_MS,
            };
        }
        Some(y)
    }

    /// Stop a running tween without scheduling a re-arm.
    pub fn cancel(&mut self) {
        if self.is_running() {
            self.state = AutoScrollState::Idle;
        }
    }
}

/// Web binding: wheel and touch triggers driving `window.scrollTo`.
#[cfg(feature = "web")]
pub mod web {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::{Rc, Weak};

    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;
    use web_sys::{AddEventListenerOptions, TouchEvent, WheelEvent, Window};

    use crate::error::RenderError;

    struct Shared {
        window: Window,
        auto: RefCell<AutoScroll>,
        touch_start_y: Cell<f64>,
        raf_id: Cell<Option<i32>>,
        raf_cb: RefCell<Option<Closure<dyn FnMut(f64)>>>,
    }

    fn now_ms(window: &Window) -> f64 {
        window.performance().map(|p| p.now()).unwrap_or(0.0)
    }

    fn request_frame(shared: &Rc<Shared>) {
        let raf_cb = shared.raf_cb.borrow();
        let Some(cb) = raf_cb.as_ref() else {
            return;
        };
        match shared.window.request_animation_frame(cb.as_ref().unchecked_ref()) {
            Ok(id) => shared.raf_id.set(Some(id)),
            Err(err) => tracing::debug!(?err, "requestAnimationFrame failed"),
        }
    }

    fn try_start(shared: &Rc<Shared>) {
        let scroll_y = shared.window.scroll_y().unwrap_or(0.0);
        let started = shared.auto.borrow_mut().start(now_ms(&shared.window), scroll_y);
        if started {
            request_frame(shared);
        }
    }

    /// Auto-scroll listeners attached to the window; removed on drop.
    pub struct MountedAutoScroll {
        shared: Rc<Shared>,
        wheel_cb: Closure<dyn FnMut(WheelEvent)>,
        touch_start_cb: Closure<dyn FnMut(TouchEvent)>,
        touch_move_cb: Closure<dyn FnMut(TouchEvent)>,
    }

    impl MountedAutoScroll {
        /// Attach wheel and touch triggers for `auto`.
        pub fn mount(auto: AutoScroll) -> crate::Result<Self> {
            let window = web_sys::window().ok_or_else(|| RenderError::Environment("no window available".into()))?;
            let shared = Rc::new(Shared {
                window: window.clone(),
                auto: RefCell::new(auto),
                touch_start_y: Cell::new(0.0),
                raf_id: Cell::new(None),
                raf_cb: RefCell::new(None),
            });

            let weak: Weak<Shared> = Rc::downgrade(&shared);
            let raf_cb = Closure::<dyn FnMut(f64)>::new(move |ts: f64| {
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                shared.raf_id.set(None);
                let (y, running) = {
                    let mut auto = shared.auto.borrow_mut();
                    (auto.sample(ts), auto.is_running())
                };
                if let Some(y) = y {
                    shared.window.scroll_to_with_x_and_y(0.0, y);
                }
                if running {
                    request_frame(&shared);
                }
            });
            *shared.raf_cb.borrow_mut() = Some(raf_cb);

            let wheel_cb = {
                let weak = Rc::downgrade(&shared);
                Closure::<dyn FnMut(WheelEvent)>::new(move |e: WheelEvent| {
                    let Some(shared) = weak.upgrade() else {
                        return;
                    };
                    let scroll_y = shared.window.scroll_y().unwrap_or(0.0);
                    let now = now_ms(&shared.window);
                    if shared.auto.borrow_mut().should_trigger_wheel(now, e.delta_y(), scroll_y) {
                        e.prevent_default();
                        try_start(&shared);
                    }
                })
            };
            let touch_start_cb = {
                let weak = Rc::downgrade(&shared);
                Closure::<dyn FnMut(TouchEvent)>::new(move |e: TouchEvent| {
                    let Some(shared) = weak.upgrade() else {
                        return;
                    };
                    if let Some(touch) = e.touches().get(0) {
                        shared.touch_start_y.set(touch.client_y() as f64);
                    }
                })
            };
            let touch_move_cb = {
                let weak = Rc::downgrade(&shared);
                Closure::<dyn FnMut(TouchEvent)>::new(move |e: TouchEvent| {
                    let Some(shared) = weak.upgrade() else {
                        return;
                    };
                    let Some(touch) = e.touches().get(0) else {
                        return;
                    };
                    let swipe = shared.touch_start_y.get() - touch.client_y() as f64;
                    let scroll_y = shared.window.scroll_y().unwrap_or(0.0);
                    let now = now_ms(&shared.window);
                    if shared.auto.borrow_mut().should_trigger_swipe(now, swipe, scroll_y) {
                        e.prevent_default();
                        try_start(&shared);
                    }
                })
            };

            // Dropping on a failed attach removes whatever was added
            let mounted = Self {
                shared,
                wheel_cb,
                touch_start_cb,
                touch_move_cb,
            };
            mounted.attach(&window)?;
            Ok(mounted)
        }

        fn attach(&self, window: &Window) -> Result<(), RenderError> {
            // Wheel and touchmove must be able to prevent default scrolling
            let active = AddEventListenerOptions::new();
            active.set_passive(false);
            let passive = AddEventListenerOptions::new();
            passive.set_passive(true);

            let add = |kind: &str, f: &js_sys::Function, opts: &AddEventListenerOptions| {
                window
                    .add_event_listener_with_callback_and_add_event_listener_options(kind, f, opts)
                    .map_err(|err| RenderError::Environment(format!("add {kind} listener: {err:?}")))
            };
            add("wheel", self.wheel_cb.as_ref().unchecked_ref(), &active)?;
            add("touchstart", self.touch_start_cb.as_ref().unchecked_ref(), &passive)?;
            add("touchmove", self.touch_move_cb.as_ref().unchecked_ref(), &active)
        }

        /// Returns `true` while the document is being scrolled.
        pub fn is_running(&self) -> bool {
            self.shared.auto.borrow().is_running()
        }
    }

    impl Drop for MountedAutoScroll {
        fn drop(&mut self) {
            let window = &self.shared.window;
            let _ = window.remove_event_listener_with_callback("wheel", self.wheel_cb.as_ref().unchecked_ref());
            let _ = window.remove_event_listener_with_callback("touchstart", self.touch_start_cb.as_ref().unchecked_ref());
            let _ = window.remove_event_listener_with_callback("touchmove", self.touch_move_cb.as_ref().unchecked_ref());
            if let Some(id) = self.shared.raf_id.take() {
                let _ = window.cancel_animation_frame(id);
            }
            if let Ok(mut auto) = self.shared.auto.try_borrow_mut() {
                auto.cancel();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_easing_shape() {
        assert_eq!(ease_in_out_cubic(0.25), 0.0625);
        assert_eq!(ease_in_out_cubic(0.75), 0.9375);
        let mut prev = 0.0;
        for i in 0..=100 {
            let v = ease_in_out_cubic(i as f64 / 100.0);
            assert!(v >= prev);
            prev = v;
        }
    }

    #[test]
    fn test_full_run() {
        let mut auto = AutoScroll::new(2000.0).with_duration_ms(1000.0);
        assert!(auto.start(100.0, 0.0));
        assert!(auto.is_running());
        assert_eq!(auto.sample(100.0), Some(0.0));
        assert_eq!(auto.sample(350.0), Some(125.0));
        assert_eq!(auto.sample(600.0), Some(1000.0));
        assert_eq!(auto.sample(1100.0), Some(2000.0));
        assert_eq!(auto.state(), AutoScrollState::Cooldown { rearm_at_ms: 1600.0 });
        assert_eq!(auto.sample(1200.0), None);
    }

    #[test]
    fn test_refuses_short_or_repeated_runs() {
        let mut auto = AutoScroll::new(1000.0);
        assert!(!auto.start(0.0, 950.0));
        assert!(!auto.start(0.0, 1200.0));
        assert!(auto.start(0.0, 900.0));
        assert!(!auto.start(10.0, 0.0));
    }

    #[test]
    fn test_rearm_after_cooldown() {
        let mut auto = AutoScroll::new(1000.0).with_duration_ms(100.0);
        assert!(auto.start(0.0, 0.0));
        auto.sample(100.0);
        assert!(!auto.should_trigger_wheel(400.0, 10.0, 0.0));
        assert!(!auto.start(599.0, 0.0));
        assert!(auto.should_trigger_wheel(600.0, 10.0, 0.0));
        assert!(auto.start(600.0, 0.0));
    }

    #[test]
    fn test_trigger_gating() {
        let mut auto = AutoScroll::new(1000.0);
        assert!(auto.should_trigger_wheel(0.0, 3.0, 0.0));
        assert!(!auto.should_trigger_wheel(0.0, -3.0, 0.0));
        assert!(!auto.should_trigger_wheel(0.0, 3.0, 150.0));
        assert!(auto.should_trigger_swipe(0.0, 31.0, 99.0));
        assert!(!auto.should_trigger_swipe(0.0, 30.0, 0.0));

        auto.set_enabled(false);
        assert!(!auto.should_trigger_wheel(0.0, 3.0, 0.0));
        assert!(!auto.start(0.0, 0.0));
    }

    #[test]
    fn test_cancel() {
        let mut auto = AutoScroll::new(1000.0);
        auto.start(0.0, 0.0);
        auto.cancel();
        assert_eq!(auto.state(), AutoScrollState::Idle);
        assert_eq!(auto.sample(10.0), None);
    }
}
