//! Bounded execution of ffmpeg/ffprobe processes.

use std::ffi::OsStr;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::Command;

/// Captured result of a finished process.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Last non-empty stderr line, which is where ffmpeg puts the actual error.
    pub fn last_error_line(&self) -> &str {
        self.stderr
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("")
    }
}

/// One external process invocation with a wall-clock limit.
///
/// Stdin is closed, output is captured and the child is killed if the
/// invocation is dropped or exceeds its limit.
///
/// ```no_run
/// use fv_av::ToolCommand;
/// use std::time::Duration;
///
/// # async fn example() -> fv_core::Result<()> {
/// let out = ToolCommand::new("ffprobe")
///     .args(["-v", "error", "-show_streams", "movie.mkv"])
///     .timeout(Duration::from_secs(30))
///     .execute()
///     .await?;
/// println!("{}", out.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ToolCommand {
    label: String,
    inner: Command,
    limit: Option<Duration>,
}

impl ToolCommand {
    pub fn new(program: impl AsRef<Path>) -> Self {
        let program = program.as_ref();
        let label = program
            .file_stem()
            .unwrap_or(program.as_os_str())
            .to_string_lossy()
            .into_owned();

        let mut inner = Command::new(program);
        inner
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        Self {
            label,
            inner,
            limit: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.inner.arg(arg);
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.inner.args(args);
        self
    }

    /// Kill the process after `limit`. A zero duration means no limit.
    pub fn timeout(mut self, limit: Duration) -> Self {
        self.limit = (!limit.is_zero()).then_some(limit);
        self
    }

    /// Run to completion and require a zero exit status.
    pub async fn execute(self) -> fv_core::Result<ToolOutput> {
        let label = self.label.clone();
        let out = self.run().await?;
        if out.status.success() {
            return Ok(out);
        }
        Err(fv_core::Error::tool(
            label,
            format!("{}: {}", out.status, out.last_error_line()),
        ))
    }

    /// Run to completion, leaving the exit status to the caller.
    pub async fn run(mut self) -> fv_core::Result<ToolOutput> {
        let child = self
            .inner
            .spawn()
            .map_err(|e| fv_core::Error::tool(&self.label, format!("could not start: {e}")))?;

        let waited = match self.limit {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| {
                    fv_core::Error::tool(&self.label, format!("timed out after {limit:?}"))
                })?,
            None => child.wait_with_output().await,
        };

        let raw = waited.map_err(|e| fv_core::Error::tool(&self.label, e.to_string()))?;
        Ok(ToolOutput {
            status: raw.status,
            stdout: String::from_utf8_lossy(&raw.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&raw.stderr).into_owned(),
        })
    }
}
