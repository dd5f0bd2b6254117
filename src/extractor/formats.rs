//! Output audio formats and bitrate presets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Audio container/codec the extracted track is written as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// MP3 via LAME, widest compatibility
    #[default]
    Mp3,
    /// 16-bit little-endian PCM
    Wav,
    /// Ogg Vorbis, fixed VBR quality
    Ogg,
    /// AAC in an MPEG-4 container
    M4a,
    /// Lossless FLAC
    Flac,
    /// 16-bit big-endian PCM
    Aiff,
}

impl AudioFormat {
    /// Lowercase identifier, also used as the file extension.
    pub fn id(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::Ogg => "ogg",
            AudioFormat::M4a => "m4a",
            AudioFormat::Flac => "flac",
            AudioFormat::Aiff => "aiff",
        }
    }

    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        self.id()
    }

    /// Returns a human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "MP3",
            AudioFormat::Wav => "WAV",
            AudioFormat::Ogg => "OGG",
            AudioFormat::M4a => "M4A",
            AudioFormat::Flac => "FLAC",
            AudioFormat::Aiff => "AIFF",
        }
    }

    /// Returns a description of the format.
    pub fn description(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "Best compatibility",
            AudioFormat::Wav => "Uncompressed, lossless",
            AudioFormat::Ogg => "Open format",
            AudioFormat::M4a => "Apple / AAC",
            AudioFormat::Flac => "Lossless compression",
            AudioFormat::Aiff => "Professional audio",
        }
    }

    /// FFmpeg codec arguments for this format (without bitrate).
    pub fn codec_args(&self) -> &'static [&'static str] {
        match self {
            AudioFormat::Mp3 => &["-c:a", "libmp3lame"],
            AudioFormat::Wav => &["-c:a", "pcm_s16le"],
            AudioFormat::Ogg => &["-c:a", "libvorbis", "-q:a", "6"],
            AudioFormat::M4a => &["-c:a", "aac"],
            AudioFormat::Flac => &["-c:a", "flac"],
            AudioFormat::Aiff => &["-c:a", "pcm_s16be"],
        }
    }

    /// Whether the encoder takes a `-b:a` bitrate.
    pub fn uses_bitrate(&self) -> bool {
        matches!(self, AudioFormat::Mp3 | AudioFormat::M4a)
    }

    /// Whether the format keeps every sample of the source.
    pub fn is_lossless(&self) -> bool {
        matches!(self, AudioFormat::Wav | AudioFormat::Flac | AudioFormat::Aiff)
    }

    /// All available formats, in menu order.
    pub fn all() -> &'static [AudioFormat] {
        &[
            AudioFormat::Mp3,
            AudioFormat::Wav,
            AudioFormat::Ogg,
            AudioFormat::M4a,
            AudioFormat::Flac,
            AudioFormat::Aiff,
        ]
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Error returned when parsing an unknown format or bitrate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported {kind}: {value}")]
pub struct ParseOptionError {
    kind: &'static str,
    value: String,
}

impl FromStr for AudioFormat {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_start_matches('.');
        AudioFormat::all()
            .iter()
            .copied()
            .find(|f| f.id().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParseOptionError {
                kind: "format",
                value: s.to_string(),
            })
    }
}

/// Target bitrate for lossy encoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Bitrate {
    #[serde(rename = "128k")]
    Kbps128,
    #[default]
    #[serde(rename = "192k")]
    Kbps192,
    #[serde(rename = "256k")]
    Kbps256,
    #[serde(rename = "320k")]
    Kbps320,
}

impl Bitrate {
    /// Value passed to `-b:a`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Bitrate::Kbps128 => "128k",
            Bitrate::Kbps192 => "192k",
            Bitrate::Kbps256 => "256k",
            Bitrate::Kbps320 => "320k",
        }
    }

    /// Returns a human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Bitrate::Kbps128 => "128k (standard)",
            Bitrate::Kbps192 => "192k (high)",
            Bitrate::Kbps256 => "256k (very high)",
            Bitrate::Kbps320 => "320k (maximum)",
        }
    }

    /// All available bitrates.
    pub fn all() -> &'static [Bitrate] {
        &[
            Bitrate::Kbps128,
            Bitrate::Kbps192,
            Bitrate::Kbps256,
            Bitrate::Kbps320,
        ]
    }
}

impl fmt::Display for Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Bitrate {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Bitrate::all()
            .iter()
            .copied()
            .find(|b| b.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParseOptionError {
                kind: "bitrate",
                value: s.to_string(),
            })
    }
}

/// Supported input file extensions.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &[
        "mp4", "avi", "mkv", "mov", "wmv", "flv", "webm", "mpg", "mpeg", "m4v",
    ]
}

/// Check if a file extension is a video we offer in the picker.
pub fn is_supported_extension(ext: &str) -> bool {
    supported_input_extensions()
        .iter()
        .any(|e| e.eq_ignore_ascii_case(ext))
}
