//! Visible-window calculator for uniform-height rows.
//!
//! A pure function from scroll state to render instructions: no internal
//! state, no I/O, identical output for identical input. The caller feeds
//! it raw scroll-container geometry and gets back which contiguous slice
//! of the collection to draw plus the scroll-space geometry that keeps
//! native scrollbar behavior correct.

use std::fmt;

/// Extra rows rendered beyond the strict viewport bounds to mask
/// scroll-induced rendering latency.
pub const OVERSCAN: usize = 2;

/// Scroll-container state, recomputed on every scroll/resize event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Scroll position, in pixels from the top of the scroll space.
    pub scroll_offset: u32,
    /// Height of the visible area, in pixels.
    pub viewport_height: u32,
    /// Uniform row height, in pixels.
    pub item_height: u32,
    /// Total number of items in the collection.
    pub item_count: usize,
}

/// Render instructions derived from a [`Viewport`].
///
/// The `first..end` range is always contiguous and in bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Index of the first row to draw.
    pub first: usize,
    /// One past the last row to draw.
    pub end: usize,
    /// Height of the full scroll space (`item_count * item_height`).
    pub total_height: u64,
    /// Vertical translation of the rendered slice within the scroll space.
    pub offset_y: u64,
}

impl Window {
    pub fn len(&self) -> usize {
        self.end - self.first
    }

    pub fn is_empty(&self) -> bool {
        self.first == self.end
    }

    /// The visible subslice of `items`, clamped to what actually exists.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let end = self.end.min(items.len());
        let first = self.first.min(end);
        &items[first..end]
    }
}

/// Rejected scroll geometry: a zero row or viewport height would make the
/// visible range meaningless. Fatal to this computation only; the caller
/// should render nothing this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidWindowInput {
    pub viewport_height: u32,
    pub item_height: u32,
}

impl fmt::Display for InvalidWindowInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid window input: viewport_height={}, item_height={} (both must be positive)",
            self.viewport_height, self.item_height
        )
    }
}

impl std::error::Error for InvalidWindowInput {}

/// Computes the visible window for the given scroll state.
///
/// - `first` is `scroll_offset / item_height`, clamped into
///   `[0, item_count)`.
/// - The row budget is `ceil(viewport_height / item_height)` plus
///   [`OVERSCAN`].
/// - An overscrolled offset clamps to the last valid row; an empty
///   collection yields an empty range and zero total height.
///
/// # Errors
/// [`InvalidWindowInput`] when `item_height` or `viewport_height` is zero.
pub fn visible_window(viewport: Viewport) -> Result<Window, InvalidWindowInput> {
    let Viewport {
        scroll_offset,
        viewport_height,
        item_height,
        item_count,
    } = viewport;

    if item_height == 0 || viewport_height == 0 {
        return Err(InvalidWindowInput {
            viewport_height,
            item_height,
        });
    }

    let first = ((scroll_offset / item_height) as usize).min(item_count.saturating_sub(1));
    let visible_count = viewport_height.div_ceil(item_height) as usize + OVERSCAN;
    let end = item_count.min(first + visible_count);

    Ok(Window {
        first,
        end,
        total_height: item_count as u64 * u64::from(item_height),
        offset_y: first as u64 * u64::from(item_height),
    })
}
