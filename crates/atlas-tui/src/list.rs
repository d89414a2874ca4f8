//! Windowed list widget with a stable-thumb scrollbar.
//!
//! Renders only the rows the [`visible_window`](crate::window::visible_window)
//! calculator says are worth drawing; everything outside the window costs
//! nothing. The scrollbar thumb has a fixed length (naive per-endpoint
//! rounding makes it fluctuate while scrolling) and reaches the bottom
//! exactly at max scroll.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::widgets::Widget;

use crate::window::{Viewport, visible_window};

/// Symbol for the thumb (scrollable indicator).
const THUMB_SYMBOL: &str = "█";
/// Symbol for the track (background).
const TRACK_SYMBOL: &str = "│";

/// A scrollable list of uniform-height row cards.
///
/// Each item occupies `item_height` terminal rows; the label is drawn on
/// the card's first row. Implements [`Widget`] for use with
/// `frame.render_widget()`.
#[derive(Debug, Clone)]
pub struct WindowedList<'a> {
    /// Card labels, one per item.
    items: &'a [String],
    /// Rows per card.
    item_height: u16,
    /// Current scroll position in rows (0 = top).
    scroll_offset: u16,
}

impl<'a> WindowedList<'a> {
    pub fn new(items: &'a [String], item_height: u16, scroll_offset: u16) -> Self {
        Self {
            items,
            item_height,
            scroll_offset,
        }
    }
}

impl Widget for WindowedList<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.is_empty() {
            return;
        }

        let viewport = Viewport {
            scroll_offset: u32::from(self.scroll_offset),
            viewport_height: u32::from(area.height),
            item_height: u32::from(self.item_height),
            item_count: self.items.len(),
        };
        // Degenerate geometry: render nothing this frame.
        let Ok(window) = visible_window(viewport) else {
            return;
        };

        for (idx, label) in self.items[window.first..window.end].iter().enumerate() {
            let row = (window.first + idx) as i64 * i64::from(self.item_height)
                - i64::from(self.scroll_offset);
            // Cards in the overscan margin, or label rows scrolled out of
            // the card's own top, are skipped.
            if row < 0 || row >= i64::from(area.height) {
                continue;
            }
            buf.set_stringn(
                area.x,
                area.y + row as u16,
                label,
                area.width as usize,
                Style::default(),
            );
        }

        let total_rows = window.total_height as usize;
        let track_len = area.height as usize;
        if let Some((thumb_start, thumb_len)) =
            thumb_geometry(track_len, total_rows, usize::from(self.scroll_offset))
        {
            let x = area.x + area.width.saturating_sub(1);
            for (idx, y) in (area.y..area.y + area.height).enumerate() {
                let symbol = if idx >= thumb_start && idx < thumb_start + thumb_len {
                    THUMB_SYMBOL
                } else {
                    TRACK_SYMBOL
                };
                buf.set_string(x, y, symbol, Style::default());
            }
        }
    }
}

/// Computes `(thumb_start, thumb_len)` for a scrollbar track, or `None`
/// when the content fits and no scrollbar should be drawn.
///
/// The thumb length is computed once from the total/viewport ratio, and
/// the start position is scaled so the thumb touches the track bottom
/// exactly at max scroll.
fn thumb_geometry(track_len: usize, total_rows: usize, scroll_offset: usize) -> Option<(usize, usize)> {
    if total_rows <= track_len || track_len == 0 {
        return None;
    }

    let max_scroll = total_rows - track_len;
    let denom = total_rows - 1 + track_len;
    let numerator = (track_len * track_len) as u64;
    let thumb_len = (((numerator + denom as u64 / 2) / denom as u64) as usize).clamp(1, track_len);

    let available = track_len - thumb_len;
    let offset = scroll_offset.min(max_scroll);
    let thumb_start = ((offset as u64 * available as u64) / max_scroll as u64) as usize;

    Some((thumb_start, thumb_len))
}
