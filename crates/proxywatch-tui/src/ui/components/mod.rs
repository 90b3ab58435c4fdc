mod help_overlay;
mod status_bar;

pub use help_overlay::HelpOverlay;
pub use status_bar::{filter_hints, viewer_hints, StatusBar};
