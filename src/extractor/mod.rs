//! Audio Extraction Module
//!
//! Extracts the audio track of a video file using the FFmpeg CLI.

pub mod ffmpeg;
pub mod form;
pub mod formats;
pub mod job;
pub mod progress;
pub mod worker;

pub use ffmpeg::{FfmpegBinary, FfmpegError};
pub use form::ExtractionForm;
pub use formats::{AudioFormat, Bitrate};
pub use job::{ExtractionRequest, ExtractionStatus, RequestError};
pub use progress::{ProgressParser, ProgressUpdate};
pub use worker::{Extractor, StartError, WorkerEvent};
