//! Progress parsing for FFmpeg output.
//!
//! FFmpeg is run with `-progress pipe:1`, which writes `key=value` blocks to
//! stdout. The stream duration only appears in the stderr input summary
//! (`Duration: 00:01:02.50, start: ...`), so both streams are fed through the
//! same parser.

/// Progress information during extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// Current output time in seconds
    pub time_seconds: f64,
    /// Total input duration in seconds (if known)
    pub duration_seconds: Option<f64>,
    /// Estimated percentage complete (0.0 - 100.0)
    pub percent: f32,
    /// Processing speed (e.g., "12.3x")
    pub speed: Option<String>,
    /// Whether FFmpeg reported the end of the stream
    pub finished: bool,
}

/// Incremental parser over FFmpeg's stdout/stderr lines.
#[derive(Debug, Default)]
pub struct ProgressParser {
    duration: Option<f64>,
    time: f64,
    speed: Option<String>,
    last_error: Option<String>,
}

impl ProgressParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total duration, once the input summary has been seen.
    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    /// Last line FFmpeg printed that looked like an error.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Feed one line. Returns an update whenever the position advances or the
    /// stream ends.
    pub fn feed(&mut self, raw: &str) -> Option<ProgressUpdate> {
        let line = raw.trim();
        if line.is_empty() {
            return None;
        }

        if self.duration.is_none() {
            if let Some(duration) = parse_duration_line(line) {
                self.duration = Some(duration);
                return None;
            }
        }

        if is_error_line(raw) {
            self.last_error = Some(line.to_string());
            return None;
        }

        // Legacy stats line: "size= 1024kB time=00:00:05.12 bitrate=..."
        if !line.starts_with("out_time") && line.contains("time=") {
            if let Some(time) = stats_field(line, "time=").and_then(parse_timestamp) {
                self.time = time;
                if let Some(speed) = stats_field(line, "speed=") {
                    self.speed = Some(speed.to_string());
                }
                return Some(self.update(false));
            }
        }

        let (key, value) = line.split_once('=')?;
        match key.trim() {
            "out_time_us" | "out_time_ms" => {
                // Both keys carry microseconds
                let us = value.trim().parse::<i64>().ok()?;
                if us < 0 {
                    return None;
                }
                self.time = us as f64 / 1_000_000.0;
                Some(self.update(false))
            }
            "out_time" => {
                self.time = parse_timestamp(value.trim())?;
                Some(self.update(false))
            }
            "speed" => {
                let speed = value.trim();
                if speed != "N/A" {
                    self.speed = Some(speed.to_string());
                }
                None
            }
            "progress" if value.trim() == "end" => Some(self.update(true)),
            _ => None,
        }
    }

    fn update(&self, finished: bool) -> ProgressUpdate {
        let percent = if finished {
            100.0
        } else {
            compute_percent(self.time, self.duration)
        };

        ProgressUpdate {
            time_seconds: self.time,
            duration_seconds: self.duration,
            percent,
            speed: self.speed.clone(),
            finished,
        }
    }
}

/// Percent complete, clamped to 100. Unknown or zero duration yields 0.
pub fn compute_percent(time_seconds: f64, duration_seconds: Option<f64>) -> f32 {
    match duration_seconds {
        Some(duration) if duration > 0.0 => {
            ((time_seconds / duration) * 100.0).clamp(0.0, 100.0) as f32
        }
        _ => 0.0,
    }
}

/// Parse `HH:MM:SS(.fraction)` into seconds.
pub fn parse_timestamp(value: &str) -> Option<f64> {
    let mut parts = value.trim().split(':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || minutes >= 60 || !(0.0..60.0).contains(&seconds) {
        return None;
    }
    Some(hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds)
}

/// Extract the duration from an input summary line.
fn parse_duration_line(line: &str) -> Option<f64> {
    let rest = line.strip_prefix("Duration:")?;
    let value = rest.split(',').next()?.trim();
    parse_timestamp(value)
}

/// Phrases FFmpeg uses when something went wrong.
const ERROR_MARKERS: &[&str] = &[
    "Error ",
    "error while",
    "Invalid ",
    "No such file or directory",
    "Permission denied",
];

/// Whether a stderr line reports a problem rather than describing the input.
fn is_error_line(raw: &str) -> bool {
    // Stream and metadata summaries are indented
    if raw.starts_with(char::is_whitespace) {
        return false;
    }
    let line = strip_component_prefix(raw.trim());
    if line.starts_with("Input #") || line.starts_with("Output #") || is_metadata_line(line) {
        return false;
    }
    line.starts_with("Error")
        || line.starts_with("error")
        || ERROR_MARKERS.iter().any(|m| line.contains(m))
}

/// Drop a leading `[component @ 0x...]` tag.
fn strip_component_prefix(line: &str) -> &str {
    if line.starts_with('[') {
        if let Some(end) = line.find("] ") {
            return line[end + 2..].trim_start();
        }
    }
    line
}

/// `title           : Some Name`
fn is_metadata_line(line: &str) -> bool {
    line.split_once(" : ")
        .map(|(key, _)| {
            let key = key.trim();
            !key.is_empty() && !key.contains(char::is_whitespace) && !key.starts_with("Error")
        })
        .unwrap_or(false)
}

/// Value following `key` in a space-separated stats line.
fn stats_field<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let start = line.find(key)? + key.len();
    let rest = line[start..].trim_start();
    rest.split_whitespace().next()
}
