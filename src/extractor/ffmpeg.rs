//! FFmpeg wrapper for audio extraction.

use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use thiserror::Error;

use super::job::ExtractionRequest;
use crate::process::run_with_timeout;

/// Environment variable that points at a specific FFmpeg binary.
pub const FFMPEG_ENV_VAR: &str = "AUDIOSIFT_FFMPEG";

/// How long `ffmpeg -version` may take before a candidate is skipped.
const VERSION_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that can occur during FFmpeg operations.
#[derive(Error, Debug)]
pub enum FfmpegError {
    #[error("FFmpeg not found. {}", install_hint())]
    NotFound,
    #[error("Failed to start FFmpeg: {0}")]
    SpawnFailed(#[source] std::io::Error),
    #[error("FFmpeg at {} is not usable: {reason}", .path.display())]
    Unusable { path: PathBuf, reason: String },
    #[error("FFmpeg exited with code {}{}", code_display(.code), detail_display(.detail))]
    ExtractionFailed { code: Option<i32>, detail: Option<String> },
    #[error("Extraction was cancelled")]
    Cancelled,
    #[error("I/O error while running FFmpeg: {0}")]
    Io(#[from] std::io::Error),
}

fn code_display(code: &Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "unknown (terminated by signal)".to_string())
}

fn detail_display(detail: &Option<String>) -> String {
    detail
        .as_ref()
        .map(|d| format!(": {}", d))
        .unwrap_or_default()
}

/// How to install FFmpeg on the current platform.
pub fn install_hint() -> &'static str {
    if cfg!(target_os = "windows") {
        "Download ffmpeg.exe and place it next to the application, or add it to PATH."
    } else if cfg!(target_os = "macos") {
        "Install it with: brew install ffmpeg"
    } else {
        "Install it with your package manager, e.g.: sudo apt install ffmpeg"
    }
}

/// Which pipe a line of FFmpeg output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSource {
    /// `-progress pipe:1` key=value stream
    Progress,
    /// Diagnostics and the input summary
    Log,
}

/// One line of FFmpeg output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub source: OutputSource,
    pub text: String,
}

/// A verified FFmpeg executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegBinary {
    path: PathBuf,
}

impl FfmpegBinary {
    /// Find FFmpeg, trying `override_path` first, then the environment
    /// override, bundled copies, `PATH` and common install locations.
    pub fn locate(override_path: Option<&Path>) -> Result<Self, FfmpegError> {
        let env_path = std::env::var_os(FFMPEG_ENV_VAR).map(PathBuf::from);

        let candidates = override_path
            .map(Path::to_path_buf)
            .into_iter()
            .chain(env_path)
            .chain(Self::candidate_paths());

        Self::first_usable(candidates, VERSION_TIMEOUT)
    }

    /// First candidate that exists and passes the `-version` check.
    fn first_usable(
        candidates: impl IntoIterator<Item = PathBuf>,
        timeout: Duration,
    ) -> Result<Self, FfmpegError> {
        for candidate in candidates {
            if !candidate.is_file() {
                continue;
            }
            match Self::verify(&candidate, timeout) {
                Ok(binary) => {
                    log::info!("Using FFmpeg at {:?}", binary.path);
                    return Ok(binary);
                }
                Err(e) => log::debug!("Skipping FFmpeg candidate {:?}: {}", candidate, e),
            }
        }

        Err(FfmpegError::NotFound)
    }

    /// Accept `path` if `ffmpeg -version` runs successfully.
    pub fn from_path(path: &Path) -> Result<Self, FfmpegError> {
        Self::verify(path, VERSION_TIMEOUT)
    }

    fn verify(path: &Path, timeout: Duration) -> Result<Self, FfmpegError> {
        let unusable = |reason: String| FfmpegError::Unusable {
            path: path.to_path_buf(),
            reason,
        };

        let output = run_with_timeout(Command::new(path).arg("-version"), timeout)
            .map_err(FfmpegError::SpawnFailed)?
            .ok_or_else(|| unusable(format!("`-version` did not finish within {:?}", timeout)))?;

        if output.status.success() {
            Ok(Self {
                path: path.to_path_buf(),
            })
        } else {
            Err(unusable(format!(
                "`-version` exited with code {}",
                code_display(&output.status.code())
            )))
        }
    }

    /// Locations checked after the explicit overrides.
    fn candidate_paths() -> Vec<PathBuf> {
        let exe_name = if cfg!(target_os = "windows") {
            "ffmpeg.exe"
        } else {
            "ffmpeg"
        };

        let mut paths = Vec::new();

        // 1. Bundled next to the executable
        if let Some(dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            paths.push(dir.join(exe_name));
        }
        paths.push(PathBuf::from("assets/ffmpeg").join(exe_name));

        // 2. System PATH
        if let Ok(path) = which::which("ffmpeg") {
            paths.push(path);
        }

        // 3. Common install locations
        let common_paths: &[&str] = if cfg!(target_os = "macos") {
            &[
                "/opt/homebrew/bin/ffmpeg",
                "/usr/local/bin/ffmpeg",
                "/usr/bin/ffmpeg",
            ]
        } else if cfg!(target_os = "windows") {
            &[
                "C:\\ffmpeg\\bin\\ffmpeg.exe",
                "C:\\Program Files\\ffmpeg\\bin\\ffmpeg.exe",
                "C:\\Program Files (x86)\\ffmpeg\\bin\\ffmpeg.exe",
            ]
        } else {
            &["/usr/bin/ffmpeg", "/usr/local/bin/ffmpeg", "/opt/ffmpeg/ffmpeg"]
        };
        paths.extend(common_paths.iter().map(PathBuf::from));

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join("ffmpeg").join(exe_name));
        }

        paths
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// First line of `ffmpeg -version`, e.g. "ffmpeg version 6.1.1".
    pub fn version(&self) -> Option<String> {
        let output = run_with_timeout(Command::new(&self.path).arg("-version"), VERSION_TIMEOUT)
            .ok()??;
        if !output.status.success() {
            return None;
        }
        output
            .stdout
            .lines()
            .next()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
    }

    /// Start extracting audio for `request`.
    pub fn spawn_extraction(
        &self,
        request: &ExtractionRequest,
    ) -> Result<ExtractionProcess, FfmpegError> {
        let mut child = Command::new(&self.path)
            .args(build_extraction_args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(FfmpegError::SpawnFailed)?;

        let (line_tx, line_rx) = unbounded();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_line_reader(stdout, OutputSource::Progress, line_tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_line_reader(stderr, OutputSource::Log, line_tx));
        }

        Ok(ExtractionProcess {
            child,
            lines: line_rx,
            readers,
        })
    }
}

/// Build the FFmpeg argument list for an extraction.
pub fn build_extraction_args(request: &ExtractionRequest) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-y",            // Overwrite output
        "-hide_banner",
        "-nostats",      // Progress comes from -progress instead
        "-progress",
        "pipe:1",
        "-i",
    ]
    .iter()
    .map(OsString::from)
    .collect();

    args.push(request.input.clone().into_os_string());
    args.push("-vn".into()); // Drop video streams
    args.extend(request.format.codec_args().iter().map(OsString::from));

    if request.format.uses_bitrate() {
        args.push("-b:a".into());
        args.push(request.bitrate.as_str().into());
    }

    args.push(request.output.clone().into_os_string());
    args
}

/// Render a command line for the log. Not meant to be pasted into a shell
/// verbatim; arguments with spaces are quoted for readability only.
pub fn display_command(program: &Path, args: &[OsString]) -> String {
    std::iter::once(program.as_os_str())
        .chain(args.iter().map(OsString::as_os_str))
        .map(|arg| {
            let arg = arg.to_string_lossy();
            if arg.contains(char::is_whitespace) {
                format!("\"{}\"", arg)
            } else {
                arg.into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Forward lines from a pipe to the shared channel until EOF.
fn spawn_line_reader<R>(pipe: R, source: OutputSource, tx: Sender<OutputLine>) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    // Stats lines may use carriage returns
                    let text = String::from_utf8_lossy(&buf);
                    for part in text.split('\r') {
                        let part = part.trim_end();
                        if part.is_empty() {
                            continue;
                        }
                        let line = OutputLine {
                            source,
                            text: part.to_string(),
                        };
                        if tx.send(line).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => {
                    log::debug!("Stopped reading FFmpeg {:?} output: {}", source, e);
                    break;
                }
            }
        }
    })
}

/// Handle for a running extraction process.
pub struct ExtractionProcess {
    child: Child,
    lines: Receiver<OutputLine>,
    readers: Vec<JoinHandle<()>>,
}

impl ExtractionProcess {
    /// Wait up to `timeout` for the next output line.
    ///
    /// `Disconnected` means both pipes have closed.
    pub fn recv_line(&self, timeout: Duration) -> Result<OutputLine, RecvTimeoutError> {
        self.lines.recv_timeout(timeout)
    }

    /// Terminate FFmpeg and reap it.
    pub fn kill(&mut self) {
        if let Err(e) = self.child.kill() {
            log::debug!("Failed to kill FFmpeg: {}", e);
        }
        let _ = self.child.wait();
    }

    /// Wait for FFmpeg to exit.
    pub fn wait(mut self) -> Result<ExitStatus, FfmpegError> {
        let status = self.child.wait()?;
        for reader in self.readers.drain(..) {
            let _ = reader.join();
        }
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::formats::{AudioFormat, Bitrate};

    fn request(format: AudioFormat, bitrate: Bitrate) -> ExtractionRequest {
        ExtractionRequest::new(
            PathBuf::from("/videos/My Clip.mp4"),
            PathBuf::from(format!("/videos/My Clip.{}", format.extension())),
            format,
            bitrate,
        )
    }

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_mp3_args() {
        let args = strings(&build_extraction_args(&request(AudioFormat::Mp3, Bitrate::Kbps256)));
        assert_eq!(
            args,
            vec![
                "-y", "-hide_banner", "-nostats", "-progress", "pipe:1", "-i",
                "/videos/My Clip.mp4", "-vn", "-c:a", "libmp3lame", "-b:a", "256k",
                "/videos/My Clip.mp3",
            ]
        );
    }

    #[test]
    fn test_m4a_bitrate_emitted_once() {
        let args = strings(&build_extraction_args(&request(AudioFormat::M4a, Bitrate::Kbps128)));
        assert_eq!(args.iter().filter(|a| *a == "-b:a").count(), 1);
        assert!(args.windows(2).any(|w| w == ["-c:a", "aac"]));
        assert!(args.windows(2).any(|w| w == ["-b:a", "128k"]));
    }

    #[test]
    fn test_formats_without_bitrate() {
        for format in [AudioFormat::Wav, AudioFormat::Ogg, AudioFormat::Flac, AudioFormat::Aiff] {
            let args = strings(&build_extraction_args(&request(format, Bitrate::Kbps320)));
            assert!(!args.contains(&"-b:a".to_string()), "{:?} got a bitrate", format);
            assert_eq!(args.last().unwrap(), &format!("/videos/My Clip.{}", format.extension()));
        }

        let ogg = strings(&build_extraction_args(&request(AudioFormat::Ogg, Bitrate::Kbps320)));
        assert!(ogg.windows(2).any(|w| w == ["-q:a", "6"]));
    }

    #[test]
    fn test_display_command_quotes_spaces() {
        let args = build_extraction_args(&request(AudioFormat::Flac, Bitrate::default()));
        let shown = display_command(Path::new("/usr/bin/ffmpeg"), &args);
        assert!(shown.starts_with("/usr/bin/ffmpeg -y "));
        assert!(shown.contains("\"/videos/My Clip.mp4\""));
        assert!(shown.ends_with("\"/videos/My Clip.flac\""));
    }

    #[test]
    fn test_error_messages() {
        let failed = FfmpegError::ExtractionFailed {
            code: Some(1),
            detail: Some("Error opening input".to_string()),
        };
        assert_eq!(failed.to_string(), "FFmpeg exited with code 1: Error opening input");

        let failed = FfmpegError::ExtractionFailed { code: Some(69), detail: None };
        assert_eq!(failed.to_string(), "FFmpeg exited with code 69");

        assert!(FfmpegError::NotFound.to_string().contains(install_hint()));
    }

    #[test]
    fn test_locate_skips_missing_override() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("no-ffmpeg-here");
        let result = FfmpegBinary::first_usable(vec![bogus], Duration::from_secs(1));
        assert!(matches!(result, Err(FfmpegError::NotFound)));
    }

    #[cfg(unix)]
    mod stand_ins {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use std::time::Instant;

        fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
            let path = dir.join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        fn working(dir: &Path, name: &str) -> PathBuf {
            script(dir, name, "echo 'ffmpeg version 6.1-test'")
        }

        #[test]
        fn test_override_comes_first() {
            let dir = tempfile::tempdir().unwrap();
            let chosen = working(dir.path(), "override-ffmpeg");

            let binary = FfmpegBinary::locate(Some(&chosen)).unwrap();
            assert_eq!(binary.path(), chosen.as_path());
            assert_eq!(binary.version().as_deref(), Some("ffmpeg version 6.1-test"));
        }

        #[test]
        fn test_env_var_used_after_override() {
            let dir = tempfile::tempdir().unwrap();
            let broken = script(dir.path(), "broken-ffmpeg", "exit 1");
            let from_env = working(dir.path(), "env-ffmpeg");

            std::env::set_var(FFMPEG_ENV_VAR, &from_env);
            let without_override = FfmpegBinary::locate(None);
            let after_broken_override = FfmpegBinary::locate(Some(&broken));
            std::env::remove_var(FFMPEG_ENV_VAR);

            assert_eq!(without_override.unwrap().path(), from_env.as_path());
            assert_eq!(after_broken_override.unwrap().path(), from_env.as_path());
        }

        #[test]
        fn test_failing_version_check_is_skipped() {
            let dir = tempfile::tempdir().unwrap();
            let broken = script(dir.path(), "broken-ffmpeg", "exit 2");
            let good = working(dir.path(), "good-ffmpeg");

            match FfmpegBinary::from_path(&broken) {
                Err(FfmpegError::Unusable { path, reason }) => {
                    assert_eq!(path, broken);
                    assert!(reason.contains("code 2"), "{}", reason);
                }
                other => panic!("expected Unusable, got {:?}", other),
            }

            let binary =
                FfmpegBinary::first_usable(vec![broken, good.clone()], Duration::from_secs(5)).unwrap();
            assert_eq!(binary.path(), good.as_path());
        }

        #[test]
        fn test_hanging_candidate_times_out() {
            let dir = tempfile::tempdir().unwrap();
            let hanging = script(dir.path(), "hanging-ffmpeg", "exec sleep 30");
            let good = working(dir.path(), "good-ffmpeg");

            let started = Instant::now();
            let binary = FfmpegBinary::first_usable(
                vec![hanging.clone(), good.clone()],
                Duration::from_millis(500),
            )
            .unwrap();
            assert_eq!(binary.path(), good.as_path());
            assert!(started.elapsed() < Duration::from_secs(10));

            assert!(matches!(
                FfmpegBinary::verify(&hanging, Duration::from_millis(200)),
                Err(FfmpegError::Unusable { .. })
            ));
        }
    }
}
