//! Background extraction worker.
//!
//! Only one extraction runs at a time. The UI thread starts it, then drains
//! [`WorkerEvent`]s once per frame without blocking.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use thiserror::Error;

use super::ffmpeg::{build_extraction_args, display_command, FfmpegBinary, FfmpegError, OutputSource};
use super::job::ExtractionRequest;
use super::progress::{ProgressParser, ProgressUpdate};

/// How often the worker checks the cancel flag while FFmpeg is quiet.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Events from the worker thread.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    /// Line for the processing log
    Log(String),
    /// Progress update
    Progress(ProgressUpdate),
    /// Extraction finished; carries output path and size on success
    Finished(Result<(PathBuf, u64), String>),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum StartError {
    #[error("An extraction is already running")]
    Busy,
}

/// Runs extractions on a background thread.
pub struct Extractor {
    event_tx: Sender<WorkerEvent>,
    event_rx: Receiver<WorkerEvent>,
    cancel_flag: Arc<AtomicBool>,
    worker_handle: Option<JoinHandle<()>>,
    is_running: bool,
}

impl Extractor {
    pub fn new() -> Self {
        let (event_tx, event_rx) = unbounded();
        Self {
            event_tx,
            event_rx,
            cancel_flag: Arc::new(AtomicBool::new(false)),
            worker_handle: None,
            is_running: false,
        }
    }

    /// Whether an extraction is in flight.
    pub fn is_running(&self) -> bool {
        self.is_running
    }

    /// Start extracting on a new worker thread.
    pub fn start(&mut self, ffmpeg: FfmpegBinary, request: ExtractionRequest) -> Result<(), StartError> {
        if self.is_running {
            return Err(StartError::Busy);
        }

        // Reap the previous worker, which has already reported Finished
        if let Some(handle) = self.worker_handle.take() {
            let _ = handle.join();
        }

        self.cancel_flag.store(false, Ordering::Relaxed);
        self.is_running = true;

        let cancel_flag = Arc::clone(&self.cancel_flag);
        let event_tx = self.event_tx.clone();

        log::info!(
            "Starting extraction {:?} -> {:?} ({}, {})",
            request.input,
            request.output,
            request.format.id(),
            request.bitrate
        );

        self.worker_handle = Some(thread::spawn(move || {
            let result = Self::run(&ffmpeg, &request, &cancel_flag, &event_tx);
            let finished = match result {
                Ok(size) => {
                    log::info!("Extraction finished: {:?} ({} bytes)", request.output, size);
                    Ok((request.output.clone(), size))
                }
                Err(e) => {
                    log::warn!("Extraction failed: {}", e);
                    Err(e.to_string())
                }
            };
            let _ = event_tx.send(WorkerEvent::Finished(finished));
        }));

        Ok(())
    }

    /// Ask the worker to stop; FFmpeg is killed on the next poll.
    pub fn cancel(&self) {
        if self.is_running {
            log::info!("Cancelling extraction");
            self.cancel_flag.store(true, Ordering::Relaxed);
        }
    }

    /// Poll for worker events (non-blocking).
    pub fn poll_events(&mut self) -> Vec<WorkerEvent> {
        let events: Vec<_> = self.event_rx.try_iter().collect();
        if events
            .iter()
            .any(|e| matches!(e, WorkerEvent::Finished(_)))
        {
            self.is_running = false;
        }
        events
    }

    /// Worker body: run FFmpeg to completion, forwarding progress.
    fn run(
        ffmpeg: &FfmpegBinary,
        request: &ExtractionRequest,
        cancel_flag: &AtomicBool,
        event_tx: &Sender<WorkerEvent>,
    ) -> Result<u64, FfmpegError> {
        let args = build_extraction_args(request);
        log::debug!("{}", display_command(ffmpeg.path(), &args));

        let output_existed = request.output.exists();
        let mut process = ffmpeg.spawn_extraction(request)?;
        let mut parser = ProgressParser::new();

        loop {
            if cancel_flag.load(Ordering::Relaxed) {
                process.kill();
                discard_partial_output(request, output_existed);
                return Err(FfmpegError::Cancelled);
            }

            let line = match process.recv_line(POLL_INTERVAL) {
                Ok(line) => line,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            };

            if line.source == OutputSource::Log {
                log::debug!("ffmpeg: {}", line.text);
            }

            let had_error = parser.last_error().map(str::to_owned);
            if let Some(update) = parser.feed(&line.text) {
                let _ = event_tx.send(WorkerEvent::Progress(update));
            }
            if let Some(error) = parser.last_error() {
                if had_error.as_deref() != Some(error) {
                    let _ = event_tx.send(WorkerEvent::Log(format!("FFmpeg: {}", error)));
                }
            }
        }

        let status = process.wait()?;
        if cancel_flag.load(Ordering::Relaxed) {
            discard_partial_output(request, output_existed);
            return Err(FfmpegError::Cancelled);
        }
        if !status.success() {
            return Err(FfmpegError::ExtractionFailed {
                code: status.code(),
                detail: parser.last_error().map(str::to_owned),
            });
        }

        let size = std::fs::metadata(&request.output)
            .map(|m| m.len())
            .unwrap_or(0);
        Ok(size)
    }
}

/// Remove the truncated file a cancelled run leaves behind. A file that was
/// there before the run has already been overwritten, so it is left alone.
fn discard_partial_output(request: &ExtractionRequest, existed_before: bool) {
    if existed_before || !request.output.exists() {
        return;
    }
    match std::fs::remove_file(&request.output) {
        Ok(()) => log::info!("Removed partial output {:?}", request.output),
        Err(e) => log::warn!("Failed to remove partial output {:?}: {}", request.output, e),
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Extractor {
    fn drop(&mut self) {
        self.cancel_flag.store(true, Ordering::Relaxed);
        if let Some(handle) = self.worker_handle.take() {
            let _ = handle.join();
        }
    }
}
