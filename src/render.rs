//! Drawing frames onto a render surface.

use crate::error::RenderError;
use crate::fit::{canvas_size, cover_fit, DrawRect};

/// A decoded (or decoding) frame image.
pub trait FrameImage {
    /// Intrinsic pixel size; `(0, 0)` for broken images.
    fn natural_size(&self) -> (u32, u32);

    /// Returns `true` once the image has finished decoding.
    fn is_complete(&self) -> bool;

    /// Returns `true` when the image can be drawn: decoded and non-empty.
    fn is_drawable(&self) -> bool {
        let (w, h) = self.natural_size();
        self.is_complete() && w > 0 && h > 0
    }
}

/// Something frames can be drawn on, such as an HTML canvas.
pub trait RenderSurface {
    /// Image type this surface can draw
    type Image: FrameImage;

    /// Backing-store size in pixels.
    fn size(&self) -> (u32, u32);

    /// Reset the backing-store size. Implementations clear the content.
    fn set_size(&mut self, width: u32, height: u32);

    /// Clear the whole surface.
    fn clear(&mut self) -> Result<(), RenderError>;

    /// Draw `image` scaled into `rect`.
    fn draw_image(&mut self, image: &Self::Image, rect: DrawRect) -> Result<(), RenderError>;
}

/// Why a draw was skipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// No image for the frame (not loaded or failed)
    Missing,
    /// Image not decoded or reports zero natural size
    NotDecoded,
    /// Surface has no drawable area
    EmptySurface,
}

/// Outcome of a draw attempt. Never an error: failures are swallowed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DrawOutcome {
    /// Frame drawn into the given rectangle
    Drawn(DrawRect),
    /// Nothing touched; previous content is intact
    Skipped(SkipReason),
    /// The backend rejected the draw; the surface may be blank
    Failed,
}

/// Resize a surface to a container box.
///
/// Returns `false` without touching the surface when the container has no
/// drawable area.
pub fn resize_surface<S: RenderSurface>(surface: &mut S, container_width: f64, container_height: f64) -> bool {
    match canvas_size(container_width, container_height) {
        Some((width, height)) => {
            surface.set_size(width, height);
            true
        }
        None => false,
    }
}

/// Draw a frame image onto a surface with cover-fit scaling.
///
/// Missing, undecoded or zero-sized images are skipped before anything is
/// cleared, so the surface keeps whatever it showed last. Backend errors
/// are logged and swallowed.
pub fn draw_frame<S: RenderSurface>(surface: &mut S, image: Option<&S::Image>) -> DrawOutcome {
    let Some(image) = image else {
        return DrawOutcome::Skipped(SkipReason::Missing);
    };
    if !image.is_drawable() {
        return DrawOutcome::Skipped(SkipReason::NotDecoded);
    }

    let (canvas_w, canvas_h) = surface.size();
    let (image_w, image_h) = image.natural_size();
    let Some(rect) = cover_fit(image_w as f64, image_h as f64, canvas_w as f64, canvas_h as f64) else {
        return DrawOutcome::Skipped(SkipReason::EmptySurface);
    };

    let result = surface
        .clear()
        .and_then(|_| surface.draw_image(image, rect));
    match result {
        Ok(()) => DrawOutcome::Drawn(rect),
        Err(err) => {
            tracing::debug!(error = %err, "frame draw failed, skipping");
            DrawOutcome::Failed
        }
    }
}

/// Web-specific rendering implementation.
#[cfg(feature = "web")]
pub mod web {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::ops::Range;
    use std::rc::{Rc, Weak};

    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;
    use web_sys::{AddEventListenerOptions, CanvasRenderingContext2d, Element, Event, HtmlCanvasElement, HtmlElement, HtmlImageElement, Window};

    use crate::mapper::{ElementBox, Layout};
    use crate::player::{SequencePlayer, Update};
    use crate::SequenceConfig;

    fn js_error(context: &'static str) -> impl Fn(JsValue) -> RenderError {
        move |err| RenderError::Environment(format!("{context}: {err:?}"))
    }

    impl FrameImage for HtmlImageElement {
        fn natural_size(&self) -> (u32, u32) {
            (self.natural_width(), self.natural_height())
        }

        fn is_complete(&self) -> bool {
            self.complete()
        }
    }

    /// An HTML canvas with its 2d context.
    #[derive(Clone, Debug)]
    pub struct CanvasSurface {
        canvas: HtmlCanvasElement,
        ctx: CanvasRenderingContext2d,
    }

    impl CanvasSurface {
        /// Wrap a canvas element, acquiring its 2d context.
        pub fn new(canvas: HtmlCanvasElement) -> Result<Self, RenderError> {
            let ctx = canvas
                .get_context("2d")
                .map_err(|_| RenderError::NoContext)?
                .ok_or(RenderError::NoContext)?
                .dyn_into::<CanvasRenderingContext2d>()
                .map_err(|_| RenderError::NoContext)?;
            Ok(Self { canvas, ctx })
        }

        /// The underlying canvas element.
        pub fn canvas(&self) -> &HtmlCanvasElement {
            &self.canvas
        }
    }

    impl RenderSurface for CanvasSurface {
        type Image = HtmlImageElement;

        fn size(&self) -> (u32, u32) {
            (self.canvas.width(), self.canvas.height())
        }

        fn set_size(&mut self, width: u32, height: u32) {
            self.canvas.set_width(width);
            self.canvas.set_height(height);
        }

        fn clear(&mut self) -> Result<(), RenderError> {
            let (w, h) = self.size();
            self.ctx.clear_rect(0.0, 0.0, w as f64, h as f64);
            Ok(())
        }

        fn draw_image(&mut self, image: &HtmlImageElement, rect: DrawRect) -> Result<(), RenderError> {
            self.ctx
                .draw_image_with_html_image_element_and_dw_and_dh(image, rect.x, rect.y, rect.width, rect.height)
                .map_err(|err| RenderError::Draw(format!("{err:?}")))
        }
    }

    struct PendingImage {
        image: HtmlImageElement,
        _onload: Closure<dyn FnMut()>,
        _onerror: Closure<dyn FnMut()>,
    }

    struct Shared {
        window: Window,
        section: Element,
        container: HtmlElement,
        player: RefCell<SequencePlayer<HtmlImageElement>>,
        surface: RefCell<CanvasSurface>,
        raf_id: Cell<Option<i32>>,
        raf_cb: RefCell<Option<Closure<dyn FnMut(f64)>>>,
        images: RefCell<Vec<PendingImage>>,
        on_loading_change: Option<Box<dyn Fn(bool)>>,
    }

    impl Shared {
        fn layout(&self) -> Layout {
            let scroll_y = self.window.scroll_y().unwrap_or(0.0);
            let viewport_height = self
                .window
                .inner_height()
                .ok()
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0);
            let rect = self.section.get_bounding_client_rect();
            Layout {
                scroll_y,
                viewport_height,
                element: Some(ElementBox {
                    top: rect.top(),
                    bottom: rect.bottom(),
                }),
            }
        }

        fn container_size(&self) -> (f64, f64) {
            (self.container.offset_width() as f64, self.container.offset_height() as f64)
        }

        fn set_canvas_visible(&self, visible: bool) {
            let style = self.surface.borrow().canvas().style();
            let _ = style.set_property("opacity", if visible { "1" } else { "0" });
            let _ = style.set_property("transition", "opacity 0.5s ease");
        }
    }

    fn apply(shared: &Rc<Shared>, update: Update) {
        if update.loading_changed {
            let loading = shared.player.borrow().is_loading();
            shared.set_canvas_visible(!loading);
            if let Some(cb) = &shared.on_loading_change {
                cb(loading);
            }
        }
        if update.schedule_redraw {
            schedule_redraw(shared);
        }
    }

    /// Request one animation frame; further requests coalesce into it.
    fn schedule_redraw(shared: &Rc<Shared>) {
        if shared.raf_id.get().is_some() {
            return;
        }
        if shared.raf_cb.borrow().is_none() {
            let weak: Weak<Shared> = Rc::downgrade(shared);
            let cb = Closure::<dyn FnMut(f64)>::new(move |_ts: f64| {
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                shared.raf_id.set(None);
                let (Ok(mut player), Ok(mut surface)) = (shared.player.try_borrow_mut(), shared.surface.try_borrow_mut()) else {
                    return;
                };
                player.render(&mut *surface);
            });
            *shared.raf_cb.borrow_mut() = Some(cb);
        }
        let raf_cb = shared.raf_cb.borrow();
        let Some(cb) = raf_cb.as_ref() else {
            return;
        };
        match shared.window.request_animation_frame(cb.as_ref().unchecked_ref()) {
            Ok(id) => shared.raf_id.set(Some(id)),
            Err(err) => tracing::debug!(?err, "requestAnimationFrame failed"),
        }
    }

    fn request_frames(shared: &Rc<Shared>, range: Range<usize>) {
        for index in range {
            let Some(url) = shared.player.borrow().frames().frame_url(index) else {
                continue;
            };
            let image = match HtmlImageElement::new() {
                Ok(image) => image,
                Err(err) => {
                    tracing::debug!(index, ?err, "could not create image element");
                    let update = shared.player.borrow_mut().on_frame_failed(index);
                    apply(shared, update);
                    continue;
                }
            };
            image.set_cross_origin(Some("anonymous"));

            let onload = {
                let weak = Rc::downgrade(shared);
                let image = image.clone();
                Closure::<dyn FnMut()>::new(move || {
                    let Some(shared) = weak.upgrade() else {
                        return;
                    };
                    let Ok(mut player) = shared.player.try_borrow_mut() else {
                        return;
                    };
                    // A decoded but empty image counts as a failure
                    let update = if image.is_drawable() {
                        player.on_frame_loaded(index, image.clone())
                    } else {
                        player.on_frame_failed(index)
                    };
                    drop(player);
                    apply(&shared, update);
                })
            };
            let onerror = {
                let weak = Rc::downgrade(shared);
                Closure::<dyn FnMut()>::new(move || {
                    let Some(shared) = weak.upgrade() else {
                        return;
                    };
                    let Ok(mut player) = shared.player.try_borrow_mut() else {
                        return;
                    };
                    let update = player.on_frame_failed(index);
                    drop(player);
                    apply(&shared, update);
                })
            };
            image.set_onload(Some(onload.as_ref().unchecked_ref()));
            image.set_onerror(Some(onerror.as_ref().unchecked_ref()));
            image.set_src(&url);

            shared.images.borrow_mut().push(PendingImage {
                image,
                _onload: onload,
                _onerror: onerror,
            });
        }
    }

    /// A frame sequence mounted on a page.
    ///
    /// Owns every window listener, the delayed lazy-preload timer and the
    /// pending animation-frame callback. Dropping it removes all of them;
    /// image loads already in flight finish but their handlers are
    /// detached.
    pub struct MountedSequence {
        shared: Rc<Shared>,
        scroll_cb: Closure<dyn FnMut(Event)>,
        resize_cb: Closure<dyn FnMut(Event)>,
        lazy_timer: Option<i32>,
        _lazy_cb: Closure<dyn FnMut()>,
    }

    impl MountedSequence {
        /// Mount a sequence whose bounds are measured on `container` itself.
        pub fn mount(container: HtmlElement, canvas: HtmlCanvasElement, config: &SequenceConfig) -> crate::Result<Self> {
            let section: Element = container.clone().into();
            Self::mount_in_section(section, container, canvas, config, None)
        }

        /// Mount a sequence inside a tall `section`, drawing into `canvas`
        /// sized to `container` (usually the section's sticky child).
        ///
        /// `on_loading_change` is called with the new loading flag when the
        /// eager batch settles.
        pub fn mount_in_section(section: Element, container: HtmlElement, canvas: HtmlCanvasElement, config: &SequenceConfig, on_loading_change: Option<Box<dyn Fn(bool)>>) -> crate::Result<Self> {
            let player = SequencePlayer::new(config)?;
            let window = web_sys::window().ok_or_else(|| RenderError::Environment("no window available".into()))?;
            let surface = CanvasSurface::new(canvas)?;

            if let Some(class) = config.class_name.as_deref() {
                let existing = container.class_name();
                if existing.is_empty() {
                    container.set_class_name(class);
                } else {
                    container.set_class_name(&format!("{existing} {class}"));
                }
            }

            let shared = Rc::new(Shared {
                window: window.clone(),
                section,
                container,
                player: RefCell::new(player),
                surface: RefCell::new(surface),
                raf_id: Cell::new(None),
                raf_cb: RefCell::new(None),
                images: RefCell::new(Vec::new()),
                on_loading_change,
            });
            shared.set_canvas_visible(false);

            let scroll_cb = {
                let weak = Rc::downgrade(&shared);
                Closure::<dyn FnMut(Event)>::new(move |_e: Event| {
                    let Some(shared) = weak.upgrade() else {
                        return;
                    };
                    let scroll_y = shared.window.scroll_y().unwrap_or(0.0);
                    let Ok(mut player) = shared.player.try_borrow_mut() else {
                        return;
                    };
                    let update = player.on_scroll(scroll_y);
                    drop(player);
                    apply(&shared, update);
                })
            };
            let resize_cb = {
                let weak = Rc::downgrade(&shared);
                Closure::<dyn FnMut(Event)>::new(move |_e: Event| {
                    let Some(shared) = weak.upgrade() else {
                        return;
                    };
                    let layout = shared.layout();
                    let container = shared.container_size();
                    let Ok(mut player) = shared.player.try_borrow_mut() else {
                        return;
                    };
                    let update = player.on_resize(layout, container);
                    drop(player);
                    apply(&shared, update);
                })
            };

            let options = AddEventListenerOptions::new();
            options.set_passive(true);
            window
                .add_event_listener_with_callback_and_add_event_listener_options("scroll", scroll_cb.as_ref().unchecked_ref(), &options)
                .map_err(js_error("add scroll listener"))?;
            if let Err(err) = window.add_event_listener_with_callback("resize", resize_cb.as_ref().unchecked_ref()) {
                let _ = window.remove_event_listener_with_callback("scroll", scroll_cb.as_ref().unchecked_ref());
                return Err(js_error("add resize listener")(err).into());
            }

            // Initial measurement and draw
            let layout = shared.layout();
            let container_size = shared.container_size();
            let update = {
                let mut player = shared.player.borrow_mut();
                let resized = player.on_resize(layout, container_size);
                let scrolled = player.on_scroll(layout.scroll_y);
                resized.merge(scrolled)
            };
            apply(&shared, update);

            let eager = shared.player.borrow_mut().start_preload();
            request_frames(&shared, eager);

            let lazy_cb = {
                let weak = Rc::downgrade(&shared);
                Closure::<dyn FnMut()>::new(move || {
                    let Some(shared) = weak.upgrade() else {
                        return;
                    };
                    let lazy = {
                        let Ok(mut player) = shared.player.try_borrow_mut() else {
                            return;
                        };
                        if player.cancel_token().is_cancelled() {
                            return;
                        }
                        player.begin_lazy_preload()
                    };
                    request_frames(&shared, lazy);
                })
            };
            let delay = shared.player.borrow().lazy_delay_ms();
            let lazy_timer = window
                .set_timeout_with_callback_and_timeout_and_arguments_0(lazy_cb.as_ref().unchecked_ref(), delay as i32)
                .map_err(|err| tracing::debug!(?err, "could not schedule lazy preload"))
                .ok();

            Ok(Self {
                shared,
                scroll_cb,
                resize_cb,
                lazy_timer,
                _lazy_cb: lazy_cb,
            })
        }

        /// `true` until the eager batch has settled.
        pub fn is_loading(&self) -> bool {
            self.shared.player.borrow().is_loading()
        }

        /// Frame index currently selected by the scroll position.
        pub fn current_frame(&self) -> usize {
            self.shared.player.borrow().current_frame()
        }
    }

    impl Drop for MountedSequence {
        fn drop(&mut self) {
            let window = &self.shared.window;
            let _ = window.remove_event_listener_with_callback("scroll", self.scroll_cb.as_ref().unchecked_ref());
            let _ = window.remove_event_listener_with_callback("resize", self.resize_cb.as_ref().unchecked_ref());
            if let Some(id) = self.lazy_timer.take() {
                window.clear_timeout_with_handle(id);
            }
            if let Some(id) = self.shared.raf_id.take() {
                let _ = window.cancel_animation_frame(id);
            }
            if let Ok(player) = self.shared.player.try_borrow() {
                player.teardown();
            }
            for pending in self.shared.images.borrow_mut().drain(..) {
                pending.image.set_onload(None);
                pending.image.set_onerror(None);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Image double with fixed dimensions.
    #[derive(Clone, Debug, PartialEq)]
    pub(crate) struct TestImage {
        pub width: u32,
        pub height: u32,
        pub complete: bool,
    }

    impl TestImage {
        pub(crate) fn decoded(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                complete: true,
            }
        }
    }

    impl FrameImage for TestImage {
        fn natural_size(&self) -> (u32, u32) {
            (self.width, self.height)
        }

        fn is_complete(&self) -> bool {
            self.complete
        }
    }

    #[derive(Clone, Debug, PartialEq)]
    pub(crate) enum Op {
        Resize(u32, u32),
        Clear,
        Draw(DrawRect),
    }

    /// Surface that records every call.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingSurface {
        pub width: u32,
        pub height: u32,
        pub ops: Vec<Op>,
        pub fail_draws: bool,
    }

    impl RecordingSurface {
        pub(crate) fn draws(&self) -> usize {
            self.ops.iter().filter(|op| matches!(op, Op::Draw(_))).count()
        }
    }

    impl RenderSurface for RecordingSurface {
        type Image = TestImage;

        fn size(&self) -> (u32, u32) {
            (self.width, self.height)
        }

        fn set_size(&mut self, width: u32, height: u32) {
            self.width = width;
            self.height = height;
            self.ops.push(Op::Resize(width, height));
        }

        fn clear(&mut self) -> Result<(), RenderError> {
            self.ops.push(Op::Clear);
            Ok(())
        }

        fn draw_image(&mut self, _image: &TestImage, rect: DrawRect) -> Result<(), RenderError> {
            if self.fail_draws {
                return Err(RenderError::Draw("corrupt decode".into()));
            }
            self.ops.push(Op::Draw(rect));
            Ok(())
        }
    }

    #[test]
    fn test_draw_cover_fit() {
        let mut surface = RecordingSurface::default();
        assert!(resize_surface(&mut surface, 1600.0, 900.0));
        let image = TestImage::decoded(800, 600);

        let outcome = draw_frame(&mut surface, Some(&image));
        let DrawOutcome::Drawn(rect) = outcome else {
            panic!("expected a draw, got {outcome:?}");
        };
        assert!(rect.covers(1600.0, 900.0, 1e-9));
        assert_eq!(surface.ops, vec![Op::Resize(1600, 900), Op::Clear, Op::Draw(rect)]);
    }

    #[test]
    fn test_broken_image_keeps_previous_content() {
        let mut surface = RecordingSurface::default();
        resize_surface(&mut surface, 640.0, 480.0);
        draw_frame(&mut surface, Some(&TestImage::decoded(640, 480)));
        let before = surface.ops.clone();

        let broken = TestImage::decoded(0, 0);
        assert_eq!(draw_frame(&mut surface, Some(&broken)), DrawOutcome::Skipped(SkipReason::NotDecoded));

        let partial = TestImage {
            width: 640,
            height: 480,
            complete: false,
        };
        assert_eq!(draw_frame(&mut surface, Some(&partial)), DrawOutcome::Skipped(SkipReason::NotDecoded));
        assert_eq!(draw_frame(&mut surface, None), DrawOutcome::Skipped(SkipReason::Missing));

        // No clear, no draw
        assert_eq!(surface.ops, before);
    }

    #[test]
    fn test_draw_failure_is_swallowed() {
        let mut surface = RecordingSurface {
            fail_draws: true,
            ..Default::default()
        };
        resize_surface(&mut surface, 100.0, 100.0);
        assert_eq!(draw_frame(&mut surface, Some(&TestImage::decoded(10, 10))), DrawOutcome::Failed);
    }

    #[test]
    fn test_zero_sized_container() {
        let mut surface = RecordingSurface::default();
        assert!(!resize_surface(&mut surface, 0.0, 300.0));
        assert!(surface.ops.is_empty());
        assert_eq!(
            draw_frame(&mut surface, Some(&TestImage::decoded(10, 10))),
            DrawOutcome::Skipped(SkipReason::EmptySurface)
        );
    }
}
