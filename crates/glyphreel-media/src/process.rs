//! Running `ffmpeg` as a child process that streams raw data on stdout.

use std::ffi::OsString;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use glyphreel_core::{Error, Result};
use tracing::{debug, warn};

/// Outcome of filling a buffer from the process output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The buffer was filled completely.
    Full,
    /// Output ended after this many bytes; 0 means a clean end.
    Eof(usize),
}

/// A running ffmpeg child. Killed on drop if still running.
pub struct FfmpegProcess {
    child: Child,
    stdout: ChildStdout,
    label: &'static str,
}

impl FfmpegProcess {
    /// Spawn `ffmpeg` with `args`, piping stdout and forwarding stderr to the log.
    pub fn spawn(ffmpeg: &Path, args: Vec<OsString>, label: &'static str) -> Result<Self> {
        debug!("Spawning {} for {label}: {:?}", ffmpeg.display(), args);

        let mut child = Command::new(ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(label, format!("Failed to spawn ffmpeg: {e}")))?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            return Err(spawn_error(label, "ffmpeg stdout not captured".into()));
        };

        // ffmpeg blocks once its stderr pipe fills, so drain it on a side thread
        if let Some(stderr) = child.stderr.take() {
            let spawned = std::thread::Builder::new()
                .name(format!("ffmpeg-{label}-log"))
                .spawn(move || {
                    for line in BufReader::new(stderr).lines().map_while(std::io::Result::ok) {
                        debug!("ffmpeg {label}: {}", line.trim());
                    }
                });
            if let Err(e) = spawned {
                warn!("Could not forward ffmpeg {label} log: {e}");
            }
        }

        Ok(Self {
            child,
            stdout,
            label,
        })
    }

    /// Fill `buf` from stdout, stopping early only at end of output.
    pub fn read_full(&mut self, buf: &mut [u8]) -> Result<ReadOutcome> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.stdout.read(&mut buf[filled..]) {
                Ok(0) => return Ok(ReadOutcome::Eof(filled)),
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    return Err(spawn_error(
                        self.label,
                        format!("Failed to read ffmpeg output: {e}"),
                    ))
                }
            }
        }
        Ok(ReadOutcome::Full)
    }

    /// Wait for the process to exit after its output ended.
    pub fn finish(&mut self) -> Result<()> {
        let status = self
            .child
            .wait()
            .map_err(|e| spawn_error(self.label, format!("Failed to wait for ffmpeg: {e}")))?;

        if status.success() {
            debug!("ffmpeg {} exited cleanly", self.label);
            Ok(())
        } else {
            Err(spawn_error(
                self.label,
                format!("ffmpeg decoding failed ({status})"),
            ))
        }
    }
}

impl Drop for FfmpegProcess {
    fn drop(&mut self) {
        // Stop decoding early when the pipeline is torn down mid-stream
        if matches!(self.child.try_wait(), Ok(None)) {
            debug!("Killing ffmpeg {}", self.label);
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

fn spawn_error(label: &str, message: String) -> Error {
    if label == "audio" {
        Error::AudioDecode(message)
    } else {
        Error::VideoDecode(message)
    }
}
