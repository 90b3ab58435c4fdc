//! TUI components for proxywatch
//!
//! This crate provides the terminal console for proxywatch, including
//! view state, settings, keybindings, event handling, and UI components.

pub mod app;
pub mod config;
pub mod tui;
pub mod ui;

pub use app::{Action, AppState, SeverityPreset, UiState};
pub use config::{KeyBinding, KeyBindings, KeyContext, Settings, SettingsError};
pub use tui::{Event, EventHandler, Tui};
pub use ui::components::{HelpOverlay, StatusBar};
pub use ui::screens::LogViewerScreen;
pub use ui::{Layout, Theme};
