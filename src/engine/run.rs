//! Subprocess execution with a hard timeout
//!
//! Engine calls are blocking subprocess invocations bounded by the per-trial
//! timeout. On expiry the child is killed and the call reports
//! [`EngineError::Timeout`], so a stuck engine never blocks the rest of the
//! search.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::engine::EngineError;

/// Polling period while waiting for the child to exit
const POLL_PERIOD: Duration = Duration::from_millis(20);

/// Run a command to completion, returning its combined output
///
/// Both streams are captured; engines report statistics on stdout and
/// diagnostics on stderr, and the report parser tolerates either.
/// A non-zero exit status is an error carrying the tail of the output.
pub fn run_command(mut cmd: Command, timeout: Duration) -> Result<String, EngineError> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    // Drain the pipes on separate threads so a chatty child cannot deadlock
    let stdout = reader_thread(child.stdout.take());
    let stderr = reader_thread(child.stderr.take());

    let status = match wait_with_deadline(&mut child, timeout)? {
        Some(status) => status,
        None => {
            child.kill().ok();
            child.wait().ok();
            return Err(EngineError::Timeout(timeout));
        }
    };

    let mut output = stdout.join().unwrap_or_default();
    let err_text = stderr.join().unwrap_or_default();
    if !err_text.is_empty() {
        output.push('\n');
        output.push_str(&err_text);
    }

    if status.success() {
        Ok(output)
    } else {
        Err(EngineError::Failed(format!(
            "exit status {}: {}",
            status.code().map_or("killed".to_string(), |c| c.to_string()),
            tail(&output, 4)
        )))
    }
}

fn reader_thread(stream: Option<impl Read + Send + 'static>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut text = String::new();
        if let Some(mut stream) = stream {
            let mut buf = Vec::new();
            if stream.read_to_end(&mut buf).is_ok() {
                text = String::from_utf8_lossy(&buf).into_owned();
            }
        }
        text
    })
}

fn wait_with_deadline(
    child: &mut Child,
    timeout: Duration,
) -> Result<Option<std::process::ExitStatus>, EngineError> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_PERIOD);
    }
}

/// Last lines of a command output, for error messages
fn tail(text: &str, nb_lines: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(nb_lines);
    lines[start..].join(" | ")
}
