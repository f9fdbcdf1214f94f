//! Error types shared across the crate.

/// Convenience result type used by fallible constructors.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error taxonomy.
///
/// Nothing in the playback path is fatal: load and draw failures are
/// recorded or swallowed where they happen. These errors surface only from
/// configuration and from the web binding's setup code.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Invalid sequence configuration (bad template, zero frames, ...).
    #[error("configuration error: {0}")]
    Config(String),

    /// Failure while setting up or drawing to a render surface.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Failure while loading a frame image.
    #[error("load error: {0}")]
    Load(String),

    /// Errors when deserializing configuration.
    #[error("serialization error: {0}")]
    Serde(String),
}

impl Error {
    /// Build an [`Error::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build an [`Error::Load`] value.
    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load(msg.into())
    }

    /// Build an [`Error::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

/// Errors raised by a [`RenderSurface`](crate::render::RenderSurface).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The 2d drawing context could not be obtained.
    #[error("no 2d context available")]
    NoContext,

    /// The backend rejected the draw call (e.g. a corrupt decode).
    #[error("draw failed: {0}")]
    Draw(String),

    /// The host environment is missing something (window, document).
    #[error("environment unavailable: {0}")]
    Environment(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_message() {
        let err = Error::config("total_frames must be positive");
        assert_eq!(
            err.to_string(),
            "configuration error: total_frames must be positive"
        );
    }

    #[test]
    fn test_render_error_is_transparent() {
        let err: Error = RenderError::Draw("broken image".into()).into();
        assert_eq!(err.to_string(), "draw failed: broken image");
        assert!(matches!(err, Error::Render(RenderError::Draw(_))));
    }
}
