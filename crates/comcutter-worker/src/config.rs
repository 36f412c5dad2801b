//! Worker configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use comcutter_media::ToolCommand;

pub const DEFAULT_WORKERS: usize = 5;
pub const DEFAULT_TIMEOUT_SECS: u64 = 5400;
pub const DEFAULT_SIZE_THRESHOLD: f64 = 0.90;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of workers in the pool
    pub workers: usize,
    /// Wrapper executable to invoke
    pub cmd: PathBuf,
    /// Detector binary handed to the wrapper
    pub comskip_cmd: PathBuf,
    /// Optional detector ini override
    pub comskip_ini: Option<PathBuf>,
    /// Keep the EDL sidecar
    pub keep_edl: bool,
    /// Per-job tool timeout
    pub timeout: Duration,
    /// Minimum accepted ratio of new size to original size (exclusive)
    pub size_threshold: f64,
    /// Optional executable run on the committed file
    pub postprocess_cmd: Option<PathBuf>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            cmd: PathBuf::from("comcut"),
            comskip_cmd: PathBuf::from("comskip"),
            comskip_ini: None,
            keep_edl: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            size_threshold: DEFAULT_SIZE_THRESHOLD,
            postprocess_cmd: None,
        }
    }
}

impl WorkerConfig {
    /// Build the cutter invocation for `path`:
    /// `<cmd> --comskip=<comskip_cmd> [--comskip-ini=<ini>] [--keep-edl] <path>`.
    pub fn tool_command(&self, path: &Path) -> ToolCommand {
        ToolCommand::new(&self.cmd)
            .comskip(&self.comskip_cmd)
            .comskip_ini(self.comskip_ini.as_deref())
            .keep_edl(self.keep_edl)
            .target(path)
    }

    /// Whether a result of `new_size` bytes is plausible for an original of
    /// `original_size` bytes.
    pub fn accepts_size(&self, original_size: u64, new_size: u64) -> bool {
        new_size as f64 > original_size as f64 * self.size_threshold
    }
}
