//! Editable extraction settings behind the main window.

use std::path::{Path, PathBuf};

use super::formats::{AudioFormat, Bitrate};
use super::job::{coerce_extension, default_output_path, ExtractionRequest, RequestError};

/// The values the user edits before starting an extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionForm {
    /// Input path as typed or picked
    pub input: String,
    /// Output path as typed, picked or derived
    pub output: String,
    format: AudioFormat,
    /// Bitrate for formats that take one
    pub bitrate: Bitrate,
}

impl ExtractionForm {
    pub fn new(format: AudioFormat, bitrate: Bitrate) -> Self {
        Self {
            format,
            bitrate,
            ..Default::default()
        }
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Set the input path and derive the output beside it.
    pub fn set_input(&mut self, path: &Path) {
        self.input = path.display().to_string();
        self.refresh_output();
    }

    /// Re-derive the output after the input text was edited.
    pub fn refresh_output(&mut self) {
        let input = self.input.trim();
        if input.is_empty() {
            return;
        }
        self.output = default_output_path(Path::new(input), self.format)
            .display()
            .to_string();
    }

    /// Switch format, keeping the output path but swapping its extension.
    pub fn set_format(&mut self, format: AudioFormat) {
        if self.format == format {
            return;
        }
        self.format = format;

        let output = self.output.trim();
        if !output.is_empty() {
            self.output = Path::new(output)
                .with_extension(format.extension())
                .display()
                .to_string();
        }
    }

    /// Accept a path from the save dialog.
    pub fn set_output_from_dialog(&mut self, path: &Path) {
        self.output = coerce_extension(path, self.format).display().to_string();
    }

    /// Suggested file for the save dialog, when the input exists.
    pub fn suggested_output(&self) -> Option<PathBuf> {
        let input = Path::new(self.input.trim());
        if self.input.trim().is_empty() || !input.exists() {
            return None;
        }
        Some(default_output_path(input, self.format))
    }

    /// Folder the input lives in, for opening dialogs there.
    pub fn input_dir(&self) -> Option<PathBuf> {
        Path::new(self.input.trim())
            .parent()
            .filter(|p| p.is_dir())
            .map(Path::to_path_buf)
    }

    /// Whether the bitrate selector applies to the current format.
    pub fn bitrate_enabled(&self) -> bool {
        self.format.uses_bitrate()
    }

    /// Whether the start button should be enabled.
    pub fn can_start(&self, ffmpeg_available: bool, running: bool) -> bool {
        ffmpeg_available && !running && !self.input.trim().is_empty()
    }

    /// Build and validate a request. An empty output is filled with the
    /// default path and written back to the form.
    pub fn build_request(&mut self) -> Result<ExtractionRequest, RequestError> {
        let input = self.input.trim();
        if input.is_empty() {
            return Err(RequestError::EmptyInput);
        }
        let input = PathBuf::from(input);

        if self.output.trim().is_empty() {
            self.output = default_output_path(&input, self.format)
                .display()
                .to_string();
        }
        let output = PathBuf::from(self.output.trim());

        let request = ExtractionRequest::new(input, output, self.format, self.bitrate);
        request.validate()?;
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_derives_output() {
        let mut form = ExtractionForm::default();
        form.set_input(Path::new("/media/talk.mkv"));
        assert_eq!(form.output, "/media/talk.mp3");

        form.input = "/media/other.mov".to_string();
        form.refresh_output();
        assert_eq!(form.output, "/media/other.mp3");

        form.input = "   ".to_string();
        form.refresh_output();
        assert_eq!(form.output, "/media/other.mp3");
    }

    #[test]
    fn test_format_change_swaps_extension() {
        let mut form = ExtractionForm::default();
        form.set_format(AudioFormat::Flac);
        assert!(form.output.is_empty());

        form.set_input(Path::new("/media/talk.mkv"));
        assert_eq!(form.output, "/media/talk.flac");

        form.output = "/exports/custom name.flac".to_string();
        form.set_format(AudioFormat::Wav);
        assert_eq!(form.output, "/exports/custom name.wav");
    }

    #[test]
    fn test_dialog_output_gets_format_extension() {
        let mut form = ExtractionForm::new(AudioFormat::Ogg, Bitrate::default());
        form.set_output_from_dialog(Path::new("/exports/song"));
        assert_eq!(form.output, "/exports/song.ogg");
        form.set_output_from_dialog(Path::new("/exports/song.mp3"));
        assert_eq!(form.output, "/exports/song.ogg");
    }

    #[test]
    fn test_bitrate_disabled_for_lossless() {
        let mut form = ExtractionForm::default();
        assert!(form.bitrate_enabled());
        for format in [AudioFormat::Wav, AudioFormat::Flac, AudioFormat::Aiff] {
            form.set_format(format);
            assert!(!form.bitrate_enabled());
        }
        form.set_format(AudioFormat::M4a);
        assert!(form.bitrate_enabled());
    }

    #[test]
    fn test_start_button_state() {
        let mut form = ExtractionForm::default();
        assert!(!form.can_start(true, false));

        form.set_input(Path::new("/media/talk.mkv"));
        assert!(form.can_start(true, false));
        assert!(!form.can_start(false, false));
        assert!(!form.can_start(true, true));
    }

    #[test]
    fn test_build_request_fills_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("lecture.webm");
        std::fs::write(&input, b"webm").unwrap();

        let mut form = ExtractionForm::new(AudioFormat::M4a, Bitrate::Kbps320);
        form.input = format!("  {}  ", input.display());

        let request = form.build_request().unwrap();
        assert_eq!(request.input, input);
        assert_eq!(request.output, dir.path().join("lecture.m4a"));
        assert_eq!(request.bitrate, Bitrate::Kbps320);
        assert_eq!(form.output, dir.path().join("lecture.m4a").display().to_string());
    }

    #[test]
    fn test_build_request_rejects_missing_input() {
        let mut form = ExtractionForm::default();
        assert!(matches!(form.build_request(), Err(RequestError::EmptyInput)));

        form.set_input(Path::new("/definitely/not/here.mp4"));
        assert!(matches!(form.build_request(), Err(RequestError::InputNotFound(_))));
    }

    #[test]
    fn test_suggested_output_needs_existing_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.avi");

        let mut form = ExtractionForm::default();
        form.set_input(&input);
        assert_eq!(form.suggested_output(), None);

        std::fs::write(&input, b"avi").unwrap();
        assert_eq!(form.suggested_output(), Some(dir.path().join("a.mp3")));
        assert_eq!(form.input_dir(), Some(dir.path().to_path_buf()));
    }
}
