//! AudioSift Library
//!
//! A small desktop front end that extracts audio tracks from video files by
//! running FFmpeg in the background.

pub mod app;
pub mod extractor;
mod process;
pub mod settings;
pub mod ui;

// Re-export commonly used types
pub use app::AudioSiftApp;
pub use extractor::{
    AudioFormat, Bitrate, ExtractionForm, ExtractionRequest, ExtractionStatus, Extractor,
    FfmpegBinary, FfmpegError,
};
pub use settings::Preferences;
pub use ui::Theme;
