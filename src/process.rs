//! Short-lived helper commands that must not block the UI.

use std::io::{self, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::bounded;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Result of a helper command that exited in time.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
}

/// Run `command`, capturing stdout. Returns `Ok(None)` if it was still
/// running at `timeout`, in which case it is killed.
pub fn run_with_timeout(command: &mut Command, timeout: Duration) -> io::Result<Option<CommandOutput>> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;
    let deadline = Instant::now() + timeout;

    // Read on a thread so a chatty child can't fill the pipe and stall
    let (tx, rx) = bounded(1);
    if let Some(mut stdout) = child.stdout.take() {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stdout.read_to_end(&mut buf);
            let _ = tx.send(buf);
        });
    }

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            log::debug!("{:?} did not exit within {:?}, killing it", command.get_program(), timeout);
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    };

    // A grandchild may still hold the pipe open
    let grace = deadline
        .saturating_duration_since(Instant::now())
        .max(Duration::from_millis(100));
    let stdout = rx.recv_timeout(grace).unwrap_or_default();

    Ok(Some(CommandOutput {
        status,
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
    }))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_captures_stdout() {
        let output = run_with_timeout(
            Command::new("sh").args(["-c", "echo hello; exit 3"]),
            Duration::from_secs(5),
        )
        .unwrap()
        .unwrap();
        assert_eq!(output.stdout, "hello\n");
        assert_eq!(output.status.code(), Some(3));
    }

    #[test]
    fn test_hung_command_is_killed() {
        let started = Instant::now();
        let output = run_with_timeout(
            Command::new("sh").args(["-c", "exec sleep 30"]),
            Duration::from_millis(300),
        )
        .unwrap();
        assert!(output.is_none());
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
