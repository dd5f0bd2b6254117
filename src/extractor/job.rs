//! Extraction request definition and status.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use thiserror::Error;

use super::formats::{AudioFormat, Bitrate};

/// Reasons a request is rejected before FFmpeg is started.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Please select an input video file first")]
    EmptyInput,
    #[error("Input file does not exist: {0}")]
    InputNotFound(PathBuf),
    #[error("Input is not a file: {0}")]
    InputNotAFile(PathBuf),
    #[error("Input file is not readable: {path}: {source}")]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Output file would overwrite the input: {0}")]
    OutputIsInput(PathBuf),
    #[error("Cannot create output folder {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A single audio extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    /// Source video
    pub input: PathBuf,
    /// Destination audio file
    pub output: PathBuf,
    /// Target format
    pub format: AudioFormat,
    /// Bitrate, used only by formats that take one
    pub bitrate: Bitrate,
}

impl ExtractionRequest {
    pub fn new(input: PathBuf, output: PathBuf, format: AudioFormat, bitrate: Bitrate) -> Self {
        Self {
            input,
            output,
            format,
            bitrate,
        }
    }

    /// Check the input is a readable file and prepare the output folder.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.input.as_os_str().is_empty() {
            return Err(RequestError::EmptyInput);
        }

        let metadata = std::fs::metadata(&self.input)
            .map_err(|_| RequestError::InputNotFound(self.input.clone()))?;
        if !metadata.is_file() {
            return Err(RequestError::InputNotAFile(self.input.clone()));
        }
        File::open(&self.input).map_err(|source| RequestError::InputUnreadable {
            path: self.input.clone(),
            source,
        })?;

        if same_file(&self.input, &self.output) {
            return Err(RequestError::OutputIsInput(self.output.clone()));
        }

        if let Some(parent) = self.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| RequestError::OutputDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        Ok(())
    }

    /// Output file name for display.
    pub fn output_filename(&self) -> String {
        self.output
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

/// Compare paths, resolving them when both exist on disk.
fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Output path beside the input: same stem, the format's extension.
pub fn default_output_path(input: &Path, format: AudioFormat) -> PathBuf {
    input.with_extension(format.extension())
}

/// Force `path` to carry the format's extension.
///
/// A matching extension is kept as typed (any case); anything else is
/// replaced.
pub fn coerce_extension(path: &Path, format: AudioFormat) -> PathBuf {
    let matches = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(format.extension()))
        .unwrap_or(false);

    if matches {
        path.to_path_buf()
    } else {
        path.with_extension(format.extension())
    }
}

/// State of the current (or last) extraction.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ExtractionStatus {
    /// Nothing has run yet
    #[default]
    Idle,
    /// FFmpeg is running
    Running {
        /// Progress percentage (0-100)
        percent: f32,
        /// Processing speed (e.g., "12.3x")
        speed: Option<String>,
        /// When extraction started
        started_at: Instant,
    },
    /// Extraction completed successfully
    Complete {
        output: PathBuf,
        elapsed: Duration,
        output_size: u64,
    },
    /// Extraction failed with an error
    Failed { error: String },
    /// Stopped by the user
    Cancelled,
}

impl ExtractionStatus {
    /// Fresh running state.
    pub fn running() -> Self {
        ExtractionStatus::Running {
            percent: 0.0,
            speed: None,
            started_at: Instant::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, ExtractionStatus::Running { .. })
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            ExtractionStatus::Complete { .. }
                | ExtractionStatus::Failed { .. }
                | ExtractionStatus::Cancelled
        )
    }

    /// Update progress while running; ignored in any other state.
    pub fn set_progress(&mut self, new_percent: f32, new_speed: Option<String>) {
        if let ExtractionStatus::Running { percent, speed, .. } = self {
            *percent = new_percent.clamp(0.0, 100.0);
            if new_speed.is_some() {
                *speed = new_speed;
            }
        }
    }

    /// Move to `Complete`, measuring elapsed time from the start.
    pub fn complete(&mut self, output: PathBuf, output_size: u64) {
        let elapsed = match self {
            ExtractionStatus::Running { started_at, .. } => started_at.elapsed(),
            _ => Duration::ZERO,
        };
        *self = ExtractionStatus::Complete {
            output,
            elapsed,
            output_size,
        };
    }

    /// Progress bar fill (0.0 - 1.0).
    pub fn fraction(&self) -> f32 {
        match self {
            ExtractionStatus::Running { percent, .. } => percent / 100.0,
            ExtractionStatus::Complete { .. } => 1.0,
            _ => 0.0,
        }
    }

    /// Short label shown above the progress bar.
    pub fn label(&self) -> String {
        match self {
            ExtractionStatus::Idle => "Ready".to_string(),
            ExtractionStatus::Running { percent, speed, .. } => match speed {
                Some(speed) => format!("Extracting... {:.0}% ({})", percent, speed),
                None if *percent <= 0.0 => "Preparing...".to_string(),
                None => format!("Extracting... {:.0}%", percent),
            },
            ExtractionStatus::Complete { elapsed, .. } => {
                format!("✅ Done ({:.1}s)", elapsed.as_secs_f64())
            }
            ExtractionStatus::Failed { .. } => "❌ Failed".to_string(),
            ExtractionStatus::Cancelled => "Cancelled".to_string(),
        }
    }
}

/// Human-readable byte count (e.g. "3.2 MB").
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/videos/holiday.mp4"), AudioFormat::Mp3),
            PathBuf::from("/videos/holiday.mp3")
        );
        assert_eq!(
            default_output_path(Path::new("/videos/concert.live.mkv"), AudioFormat::Flac),
            PathBuf::from("/videos/concert.live.flac")
        );
        assert_eq!(
            default_output_path(Path::new("/videos/raw"), AudioFormat::Wav),
            PathBuf::from("/videos/raw.wav")
        );
    }

    #[test]
    fn test_coerce_extension() {
        assert_eq!(
            coerce_extension(Path::new("/out/song"), AudioFormat::Ogg),
            PathBuf::from("/out/song.ogg")
        );
        assert_eq!(
            coerce_extension(Path::new("/out/song.wav"), AudioFormat::M4a),
            PathBuf::from("/out/song.m4a")
        );
        assert_eq!(
            coerce_extension(Path::new("/out/song.MP3"), AudioFormat::Mp3),
            PathBuf::from("/out/song.MP3")
        );
    }

    #[test]
    fn test_validate_rejects_missing_and_directory_input() {
        let dir = tempfile::tempdir().unwrap();

        let empty = ExtractionRequest::new(
            PathBuf::new(),
            dir.path().join("a.mp3"),
            AudioFormat::Mp3,
            Bitrate::default(),
        );
        assert!(matches!(empty.validate(), Err(RequestError::EmptyInput)));

        let missing = ExtractionRequest::new(
            dir.path().join("missing.mp4"),
            dir.path().join("missing.mp3"),
            AudioFormat::Mp3,
            Bitrate::default(),
        );
        assert!(matches!(missing.validate(), Err(RequestError::InputNotFound(_))));

        let folder = ExtractionRequest::new(
            dir.path().to_path_buf(),
            dir.path().join("folder.mp3"),
            AudioFormat::Mp3,
            Bitrate::default(),
        );
        assert!(matches!(folder.validate(), Err(RequestError::InputNotAFile(_))));
    }

    #[test]
    fn test_validate_rejects_output_equal_to_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("track.wav");
        std::fs::write(&input, b"RIFF").unwrap();

        let request = ExtractionRequest::new(
            input.clone(),
            default_output_path(&input, AudioFormat::Wav),
            AudioFormat::Wav,
            Bitrate::default(),
        );
        assert!(matches!(request.validate(), Err(RequestError::OutputIsInput(_))));
    }

    #[test]
    fn test_validate_creates_output_folder() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.mp4");
        std::fs::write(&input, b"not really a video").unwrap();
        let output = dir.path().join("nested/audio/clip.mp3");

        let request =
            ExtractionRequest::new(input, output.clone(), AudioFormat::Mp3, Bitrate::default());
        request.validate().unwrap();
        assert!(output.parent().unwrap().is_dir());
    }

    #[test]
    fn test_status_transitions() {
        let mut status = ExtractionStatus::default();
        assert_eq!(status.label(), "Ready");
        status.set_progress(50.0, None);
        assert_eq!(status, ExtractionStatus::Idle);

        status = ExtractionStatus::running();
        assert!(status.is_active());
        assert_eq!(status.label(), "Preparing...");

        status.set_progress(42.4, Some("3.0x".to_string()));
        assert_eq!(status.label(), "Extracting... 42% (3.0x)");
        status.set_progress(150.0, None);
        assert_eq!(status.fraction(), 1.0);

        status.complete(PathBuf::from("/tmp/a.mp3"), 10);
        assert!(status.is_finished());
        assert!(!status.is_active());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024 + 512 * 1024), "5.5 MB");
    }
}
