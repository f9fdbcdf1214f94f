//! Per-sequence configuration.

use crate::loader::{DEFAULT_EAGER_FRAMES, DEFAULT_LAZY_DELAY_MS};
use crate::mapper::BoundsSpec;
use crate::{Error, FrameSet, Result};

/// Configuration for one scroll-driven frame sequence.
///
/// With the `toml` feature it can be read from a file such as:
///
/// ```toml
/// base_url = "https://cdn.example/impact/frame_000_delay-0.04s.webp"
/// total_frames = 191
/// class_name = "absolute inset-0"
///
/// [bounds]
/// kind = "viewport"
/// start = 0.0
/// end = 1.0
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SequenceConfig {
    /// URL of frame 0, containing the `frame_<digits>` placeholder
    pub base_url: String,
    /// Number of frames in the sequence
    pub total_frames: usize,
    /// How scroll bounds are derived from the layout
    #[cfg_attr(feature = "serde", serde(default))]
    pub bounds: BoundsSpec,
    /// Extra CSS class for the host container
    #[cfg_attr(feature = "serde", serde(default))]
    pub class_name: Option<String>,
    /// Size of the eager preload batch
    #[cfg_attr(feature = "serde", serde(default = "default_eager_frames"))]
    pub eager_frames: usize,
    /// Delay before the lazy batch starts
    #[cfg_attr(feature = "serde", serde(default = "default_lazy_delay_ms"))]
    pub lazy_delay_ms: u32,
}

#[cfg(feature = "serde")]
fn default_eager_frames() -> usize {
    DEFAULT_EAGER_FRAMES
}

#[cfg(feature = "serde")]
fn default_lazy_delay_ms() -> u32 {
    DEFAULT_LAZY_DELAY_MS
}

impl SequenceConfig {
    /// Create a config with default bounds (one viewport height) and
    /// default preload settings.
    pub fn new(base_url: impl Into<String>, total_frames: usize) -> Self {
        Self {
            base_url: base_url.into(),
            total_frames,
            bounds: BoundsSpec::default(),
            class_name: None,
            eager_frames: DEFAULT_EAGER_FRAMES,
            lazy_delay_ms: DEFAULT_LAZY_DELAY_MS,
        }
    }

    /// Set the bounds strategy.
    pub fn with_bounds(mut self, bounds: BoundsSpec) -> Self {
        self.bounds = bounds;
        self
    }

    /// Use fixed pixel bounds, as `scroll_start`/`scroll_end`.
    pub fn with_scroll_range(self, scroll_start: f64, scroll_end: f64) -> Self {
        self.with_bounds(BoundsSpec::Pixels {
            start: scroll_start,
            end: scroll_end,
        })
    }

    /// Set the host container class.
    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    /// Check the configuration and build its frame set.
    pub fn frame_set(&self) -> Result<FrameSet> {
        self.validate()?;
        FrameSet::new(self.base_url.clone(), self.total_frames)
    }

    /// Validate fields that [`FrameSet`] does not cover.
    pub fn validate(&self) -> Result<()> {
        if self.eager_frames == 0 {
            return Err(Error::config("eager_frames must be positive"));
        }
        let finite = match self.bounds {
            BoundsSpec::Pixels { start, end } | BoundsSpec::Viewport { start, end } => {
                start.is_finite() && end.is_finite()
            }
            BoundsSpec::StickySection => true,
        };
        if !finite {
            return Err(Error::config("scroll bounds must be finite"));
        }
        Ok(())
    }

    /// Parse a TOML string and validate it.
    #[cfg(feature = "toml")]
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|err| Error::serde(err.to_string()))?;
        config.frame_set()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SequenceConfig::new("/impact/frame_000.webp", 191);
        assert_eq!(config.eager_frames, 10);
        assert_eq!(config.lazy_delay_ms, 500);
        assert_eq!(config.bounds, BoundsSpec::Viewport { start: 0.0, end: 1.0 });
        assert_eq!(config.frame_set().unwrap().total_frames(), 191);
    }

    #[test]
    fn test_builder() {
        let config = SequenceConfig::new("/impact/frame_000.webp", 191)
            .with_scroll_range(0.0, 1000.0)
            .with_class_name("absolute inset-0");
        assert_eq!(config.bounds, BoundsSpec::Pixels { start: 0.0, end: 1000.0 });
        assert_eq!(config.class_name.as_deref(), Some("absolute inset-0"));
    }

    #[test]
    fn test_invalid_configs() {
        assert!(SequenceConfig::new("/impact/frame_000.webp", 0).frame_set().is_err());
        assert!(SequenceConfig::new("/impact/still.webp", 10).frame_set().is_err());

        let mut config = SequenceConfig::new("/impact/frame_000.webp", 10);
        config.eager_frames = 0;
        assert!(config.validate().is_err());

        let config = SequenceConfig::new("/impact/frame_000.webp", 10).with_scroll_range(0.0, f64::NAN);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_from_toml() {
        let config = SequenceConfig::from_toml_str(
            r#"
            base_url = "https://cdn.example/cooling/frame_000_delay-0.04s.webp"
            total_frames = 191
            lazy_delay_ms = 250

            [bounds]
            kind = "sticky_section"
            "#,
        )
        .unwrap();
        assert_eq!(config.total_frames, 191);
        assert_eq!(config.bounds, BoundsSpec::StickySection);
        assert_eq!(config.eager_frames, 10);
        assert_eq!(config.lazy_delay_ms, 250);
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_from_toml_pixels_and_errors() {
        let config = SequenceConfig::from_toml_str(
            r#"
            base_url = "/impact/frame_000.webp"
            total_frames = 191
            bounds = { kind = "pixels", start = 0.0, end = 1000.0 }
            "#,
        )
        .unwrap();
        assert_eq!(config.bounds, BoundsSpec::Pixels { start: 0.0, end: 1000.0 });

        assert!(matches!(SequenceConfig::from_toml_str("total_frames = 3"), Err(Error::Serde(_))));
        assert!(matches!(
            SequenceConfig::from_toml_str("base_url = \"/still.webp\"\ntotal_frames = 3"),
            Err(Error::Config(_))
        ));
    }
}
