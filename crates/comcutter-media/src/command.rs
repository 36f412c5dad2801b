//! Command builder and runner for the external cutter.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use metrics::histogram;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Histogram of tool wall-clock time, labelled by executable name.
pub const TOOL_DURATION_SECONDS: &str = "comcutter_tool_duration_seconds";

/// How long to keep draining stderr after the process itself has exited.
const STDERR_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Builder for tool invocations.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    /// Executable to run (absolute path or a name looked up in PATH)
    program: PathBuf,
    /// Leading arguments
    args: Vec<String>,
    /// File to operate on, always passed last
    target: Option<PathBuf>,
}

impl ToolCommand {
    /// Create a new command for `program`.
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            target: None,
        }
    }

    /// Add an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Point the wrapper at the detector binary.
    pub fn comskip(self, comskip_cmd: impl AsRef<Path>) -> Self {
        let flag = format!("--comskip={}", comskip_cmd.as_ref().display());
        self.arg(flag)
    }

    /// Override the detector ini file. `None` leaves the flag off.
    pub fn comskip_ini(self, ini: Option<&Path>) -> Self {
        match ini {
            Some(ini) => {
                let flag = format!("--comskip-ini={}", ini.display());
                self.arg(flag)
            }
            None => self,
        }
    }

    /// Keep the EDL sidecar instead of deleting it.
    pub fn keep_edl(self, keep: bool) -> Self {
        if keep {
            self.arg("--keep-edl")
        } else {
            self
        }
    }

    /// Set the file the tool operates on.
    pub fn target(mut self, path: impl AsRef<Path>) -> Self {
        self.target = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Build the argument list, target last.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = self.args.clone();
        if let Some(ref target) = self.target {
            args.push(target.to_string_lossy().to_string());
        }
        args
    }

    /// Command line for logging.
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.build_args());
        parts.join(" ")
    }
}

/// Result of a tool run that exited on its own.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Exit code, `None` when killed by a signal
    pub exit_code: Option<i32>,
    /// Everything the tool wrote to stderr
    pub stderr: String,
    /// Wall-clock duration
    pub duration: Duration,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Trimmed stderr, or `None` if the tool wrote nothing.
    pub fn stderr_message(&self) -> Option<&str> {
        let trimmed = self.stderr.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

/// Runner for tool commands with timeout enforcement.
///
/// Stdout is discarded and stderr is captured. A non-zero exit is reported
/// through [`ToolOutput`], not as an error.
#[derive(Debug, Clone, Default)]
pub struct ToolRunner {
    /// Timeout, `None` to wait indefinitely
    timeout: Option<Duration>,
}

impl ToolRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self { timeout: None }
    }

    /// Set timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run a command to completion.
    ///
    /// # Errors
    ///
    /// - [`MediaError::ToolNotFound`] if the executable cannot be resolved
    /// - [`MediaError::Timeout`] if the timeout expired; the process group
    ///   has been killed by the time this returns
    /// - [`MediaError::Io`] if the process could not be spawned or waited on
    pub async fn run(&self, cmd: &ToolCommand) -> MediaResult<ToolOutput> {
        let program = which::which(cmd.program())
            .map_err(|_| MediaError::ToolNotFound(cmd.program().to_path_buf()))?;

        let args = cmd.build_args();
        debug!("Running tool: {} {}", program.display(), args.join(" "));

        let mut command = Command::new(&program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group so helpers forked by a wrapper script die with it.
        #[cfg(unix)]
        command.process_group(0);

        let started = Instant::now();
        let mut child = command.spawn()?;

        let stderr = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_end(&mut buf).await;
            }
            String::from_utf8_lossy(&buf).into_owned()
        });

        let tool_name = program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let status = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    warn!(
                        "{} timed out after {:?}, killing process group",
                        tool_name, timeout
                    );
                    terminate(&mut child).await;
                    stderr_task.abort();
                    record_duration(tool_name, started.elapsed());
                    return Err(MediaError::Timeout(timeout));
                }
            },
            None => child.wait().await?,
        };

        let stderr = match tokio::time::timeout(STDERR_DRAIN_TIMEOUT, stderr_task).await {
            Ok(Ok(stderr)) => stderr,
            Ok(Err(e)) => {
                warn!("stderr reader failed: {}", e);
                String::new()
            }
            Err(_) => {
                warn!("stderr still open after {} exited, ignoring it", tool_name);
                String::new()
            }
        };

        let duration = started.elapsed();
        record_duration(tool_name, duration);

        Ok(ToolOutput {
            exit_code: status.code(),
            stderr,
            duration,
        })
    }
}

/// Kill the child's process group, then the child itself, and reap it.
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            debug!("killpg({}) failed: {}", pid, e);
        }
    }

    if let Err(e) = child.kill().await {
        debug!("kill failed: {}", e);
    }
}

fn record_duration(tool: String, duration: Duration) {
    histogram!(TOOL_DURATION_SECONDS, "tool" => tool).record(duration.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_command_builder() {
        let cmd = ToolCommand::new("/usr/local/bin/comcut")
            .comskip("/usr/local/bin/comskip")
            .comskip_ini(Some(Path::new("/config/comskip.ini")))
            .keep_edl(true)
            .target("/library/shows/ep1.mkv");

        assert_eq!(
            cmd.build_args(),
            vec![
                "--comskip=/usr/local/bin/comskip",
                "--comskip-ini=/config/comskip.ini",
                "--keep-edl",
                "/library/shows/ep1.mkv",
            ]
        );
    }

    #[test]
    fn test_optional_flags_omitted() {
        let cmd = ToolCommand::new("comcut")
            .target("/library/ep1.ts")
            .comskip("comskip")
            .comskip_ini(None)
            .keep_edl(false);

        assert_eq!(cmd.build_args(), vec!["--comskip=comskip", "/library/ep1.ts"]);
        assert_eq!(cmd.display(), "comcut --comskip=comskip /library/ep1.ts");
    }

    #[tokio::test]
    async fn test_run_captures_exit_and_stderr() {
        let dir = TempDir::new().unwrap();
        let tool = script(&dir, "fail.sh", "echo out\necho 'bad input' >&2\nexit 3");

        let output = ToolRunner::new().run(&ToolCommand::new(&tool)).await.unwrap();
        assert_eq!(output.exit_code, Some(3));
        assert!(!output.success());
        assert_eq!(output.stderr_message(), Some("bad input"));
    }

    #[tokio::test]
    async fn test_run_success_without_stderr() {
        let dir = TempDir::new().unwrap();
        let tool = script(&dir, "ok.sh", "exit 0");

        let output = ToolRunner::new()
            .with_timeout(Duration::from_secs(10))
            .run(&ToolCommand::new(&tool).arg("x"))
            .await
            .unwrap();
        assert!(output.success());
        assert_eq!(output.stderr_message(), None);
    }

    #[tokio::test]
    async fn test_timeout_kills_process_group() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("survived");
        let tool = script(
            &dir,
            "slow.sh",
            &format!("(sleep 2; touch {}) &\nsleep 30", marker.display()),
        );

        let started = Instant::now();
        let err = ToolRunner::new()
            .with_timeout(Duration::from_millis(300))
            .run(&ToolCommand::new(&tool))
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(10));

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!marker.exists(), "background helper should have been killed");
    }

    #[tokio::test]
    async fn test_missing_executable() {
        let dir = TempDir::new().unwrap();
        let err = ToolRunner::new()
            .run(&ToolCommand::new(dir.path().join("nope")))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::ToolNotFound(_)));
    }
}
