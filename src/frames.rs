//! Frame set addressing: which image belongs to which frame index.

use crate::{Error, Result};

const PLACEHOLDER_PREFIX: &str = "frame_";

/// An ordered, immutable set of frame images addressed by a URL template.
///
/// The template is the URL of frame 0. Its first `frame_` followed by a run
/// of digits is the placeholder, and the length of that digit run is the
/// zero-padding width used for every other frame.
///
/// ```rust
/// use scrollframe_core_view::FrameSet;
///
/// let frames = FrameSet::new("https://cdn.example/impact/frame_000_delay-0.04s.webp", 191).unwrap();
/// assert_eq!(frames.frame_url(7).as_deref(), Some("https://cdn.example/impact/frame_007_delay-0.04s.webp"));
/// assert_eq!(frames.frame_url(190).as_deref(), Some("https://cdn.example/impact/frame_190_delay-0.04s.webp"));
/// assert_eq!(frames.frame_url(191), None);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameSet {
    base_url: String,
    total_frames: usize,
    /// Byte range of the digit run inside `base_url`
    digits: (usize, usize),
}

impl FrameSet {
    /// Create a frame set from a frame-0 URL and a frame count.
    pub fn new(base_url: impl Into<String>, total_frames: usize) -> Result<Self> {
        let base_url = base_url.into();
        if total_frames == 0 {
            return Err(Error::config("total_frames must be positive"));
        }
        let digits = Self::find_placeholder(&base_url).ok_or_else(|| {
            Error::config(format!(
                "base url has no `{PLACEHOLDER_PREFIX}<digits>` placeholder: {base_url}"
            ))
        })?;
        Ok(Self {
            base_url,
            total_frames,
            digits,
        })
    }

    /// Locate the digit run following the first `frame_` that has one.
    fn find_placeholder(url: &str) -> Option<(usize, usize)> {
        let mut search_from = 0;
        while let Some(offset) = url[search_from..].find(PLACEHOLDER_PREFIX) {
            let start = search_from + offset + PLACEHOLDER_PREFIX.len();
            let run = url[start..]
                .bytes()
                .take_while(|b| b.is_ascii_digit())
                .count();
            if run > 0 {
                return Some((start, start + run));
            }
            search_from = start;
        }
        None
    }

    /// Total number of frames.
    #[inline]
    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    /// The frame-0 URL this set was built from.
    #[inline]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Zero-padding width of the frame number.
    #[inline]
    pub fn pad_width(&self) -> usize {
        self.digits.1 - self.digits.0
    }

    /// Index of the last frame.
    #[inline]
    pub fn last_index(&self) -> usize {
        self.total_frames - 1
    }

    /// URL of the frame at `index`, or `None` when out of range.
    pub fn frame_url(&self, index: usize) -> Option<String> {
        if index >= self.total_frames {
            return None;
        }
        let (start, end) = self.digits;
        Some(format!(
            "{}{:0width$}{}",
            &self.base_url[..start],
            index,
            &self.base_url[end..],
            width = self.pad_width()
        ))
    }

    /// Iterate over `(index, url)` for every frame in order.
    pub fn urls(&self) -> impl Iterator<Item = (usize, String)> + '_ {
        (0..self.total_frames).filter_map(move |i| self.frame_url(i).map(|url| (i, url)))
    }
}
