//! Windowed-rendering primitives for the atlas client UI.
//!
//! Large result sets are never materialized whole: the calculator in
//! [`window`] maps scroll state to the slice of rows worth drawing, and
//! [`list`] renders that slice with a stable-thumb scrollbar.

pub mod list;
pub mod window;

pub use list::WindowedList;
pub use window::{InvalidWindowInput, OVERSCAN, Viewport, Window, visible_window};
