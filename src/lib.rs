//! # scrollframe-core-view
//!
//! Scroll-driven image sequence playback ("scroll video") for canvas
//! rendering.
//!
//! This crate provides platform-agnostic data structures and logic for:
//! - Addressing frame images through a zero-padded URL template
//! - Mapping scroll position to a frame index
//! - Preloading frames in an eager batch and a delayed lazy batch
//! - Drawing frames with cover-fit scaling (with optional web support)
//! - An eased intro auto-scroll and deterministic particle placement
//!
//! ## Features
//!
//! - `serde` - Enable serialization/deserialization for configuration
//! - `toml` - Load [`SequenceConfig`] from TOML
//! - `web` - Enable web/WASM canvas rendering support
//!
//! ## Example
//!
//! ```rust
//! use scrollframe_core_view::{SequenceConfig, SequencePlayer};
//!
//! let config = SequenceConfig::new("/impact/frame_000_delay-0.04s.webp", 191)
//!     .with_scroll_range(0.0, 1000.0);
//! let mut player: SequencePlayer<()> = SequencePlayer::new(&config)?;
//!
//! // Request the eager batch from your image loader
//! let eager = player.start_preload();
//! assert_eq!(eager, 0..10);
//!
//! // Feed scroll events; redraw from an animation frame when asked
//! let update = player.on_scroll(500.0);
//! assert!(update.schedule_redraw);
//! assert_eq!(player.current_frame(), 95);
//! # Ok::<(), scrollframe_core_view::Error>(())
//! ```

mod autoscroll;
mod config;
mod error;
mod fit;
mod frames;
pub mod loader;
mod mapper;
mod particles;
pub mod player;
pub mod render;

pub use autoscroll::{ease_in_out_cubic, AutoScroll, AutoScrollState};
pub use config::SequenceConfig;
pub use error::{Error, RenderError, Result};
pub use fit::{canvas_size, cover_fit, DrawRect};
pub use frames::FrameSet;
pub use loader::{
    CancelToken, FramePreloader, FrameSource, LoadState, LoadingPhase, LoadingProgress, PreloadOutcome,
};
pub use mapper::{frame_index, BoundsSpec, ElementBox, Layout, ScrollBounds};
pub use particles::{particle_layout, particle_position, particle_seed};
pub use player::{SequencePlayer, Update};
pub use render::{DrawOutcome, FrameImage, RenderSurface, SkipReason};

#[cfg(feature = "web")]
pub use autoscroll::web::MountedAutoScroll;
#[cfg(feature = "web")]
pub use render::web::{CanvasSurface, MountedSequence};
