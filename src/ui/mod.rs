//! Terminal UI components.
//!
//! - [`render`]: lays out the tab bar, toolbar, document body and status rows
//! - [`style`]: theming and colors

pub mod style;

mod overlays;
mod render;
mod status;

pub use overlays::centered_popup_rect;
pub use render::{Areas, body_area, gutter_width, layout, line_number_width, render, tab_at_column};
