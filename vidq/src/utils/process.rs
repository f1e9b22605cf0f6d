//! Helpers for running the external tools (yt-dlp, ffmpeg).

use std::ffi::OsStr;
use std::process::{ExitStatus, Stdio};
use std::time::Instant;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::{Error, Result};

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Create a `tokio::process::Command` for an external tool.
///
/// On Windows the tool never opens a console window. On unix it runs in its
/// own process group, so a terminal Ctrl-C reaches only vidq and the tool in
/// flight finishes.
pub fn tokio_command(program: impl AsRef<OsStr>) -> Command {
    let mut cmd = Command::new(program);
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        cmd.as_std_mut().creation_flags(CREATE_NO_WINDOW);
    }
    #[cfg(unix)]
    cmd.process_group(0);
    cmd.kill_on_drop(true);
    cmd
}

/// Output of a finished command.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub duration: f64,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Exit code, or -1 when the process was terminated by a signal.
    pub fn code(&self) -> i32 {
        self.status.code().unwrap_or(-1)
    }

    /// The most useful stderr line for an error message.
    ///
    /// Prefers the last line mentioning "error", then the last non-empty line.
    pub fn error_detail(&self) -> String {
        self.stderr
            .iter()
            .rfind(|line| line.to_lowercase().contains("error"))
            .or_else(|| self.stderr.iter().rfind(|line| !line.trim().is_empty()))
            .map(|line| line.trim().to_string())
            .unwrap_or_else(|| "no error output".to_string())
    }
}

/// Run a command to completion, collecting stdout and stderr line by line.
pub async fn run_command_with_output(command: &mut Command) -> Result<CommandOutput> {
    let start = Instant::now();

    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    let program = command.as_std().get_program().to_string_lossy().to_string();
    let mut child = command
        .spawn()
        .map_err(|e| Error::Other(format!("Failed to spawn {}: {}", program, e)))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let (stdout, stderr) = tokio::join!(
        collect_lines(stdout, StreamKind::Stdout),
        collect_lines(stderr, StreamKind::Stderr)
    );

    let status = child
        .wait()
        .await
        .map_err(|e| Error::Other(format!("Failed to wait for {}: {}", program, e)))?;

    Ok(CommandOutput {
        status,
        duration: start.elapsed().as_secs_f64(),
        stdout,
        stderr,
    })
}

#[derive(Debug, Clone, Copy)]
enum StreamKind {
    Stdout,
    Stderr,
}

async fn collect_lines<R>(reader: Option<R>, kind: StreamKind) -> Vec<String>
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return Vec::new();
    };

    // Read raw bytes until EOF. Tools echo metadata that is not always UTF-8,
    // and closing the pipe early would kill the child with SIGPIPE.
    let mut reader = BufReader::new(reader);
    let mut collected = Vec::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("Failed to read {:?}: {}", kind, e);
                break;
            }
        }

        let line = String::from_utf8_lossy(&buf)
            .trim_end_matches(['\r', '\n'])
            .to_string();
        match kind {
            StreamKind::Stdout => debug!("stdout: {}", line),
            // Tools print progress to stderr too, only surface what looks like a failure.
            StreamKind::Stderr if line.to_lowercase().contains("error") => {
                warn!("stderr: {}", line)
            }
            StreamKind::Stderr => debug!("stderr: {}", line),
        }
        collected.push(line);
    }
    collected
}
