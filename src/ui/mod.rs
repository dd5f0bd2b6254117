//! UI Components

pub mod log_panel;
pub mod theme;

pub use log_panel::{LogLevel, LogPanel};
pub use theme::{detect_system_theme, effective_theme, Theme};
