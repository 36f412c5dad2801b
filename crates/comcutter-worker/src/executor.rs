//! Job executor.
//!
//! One job runs through `Idle -> Backed-Up -> ToolRunning -> Verifying` and
//! ends either committed (tool exited 0 and the size check passed) or rolled
//! back (the backup moved over the original). There is no partial state.

use std::path::Path;

use tracing::Instrument;

use comcutter_media::{file_size, is_file, BackupFile, MediaError, ToolRunner};

use crate::config::WorkerConfig;
use crate::error::{size_percent, JobError, JobResult};
use crate::logging::JobLogger;
use crate::postprocess::{PostProcess, PostProcessor};

/// A job whose result was accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct Committed {
    pub original_size: u64,
    pub new_size: u64,
    pub postprocess: PostProcess,
}

/// Executes the cutter against one file at a time.
#[derive(Debug, Clone)]
pub struct JobExecutor {
    config: WorkerConfig,
    runner: ToolRunner,
    postprocessor: PostProcessor,
}

impl JobExecutor {
    /// Create a new job executor.
    pub fn new(config: WorkerConfig) -> Self {
        let runner = ToolRunner::new().with_timeout(config.timeout);
        let postprocessor = PostProcessor::new(config.postprocess_cmd.clone());

        Self {
            config,
            runner,
            postprocessor,
        }
    }

    /// Run the full protocol for `path`.
    ///
    /// Every error is terminal for the job and has already been logged.
    /// Tool-level errors (see [`JobError::is_rolled_back`]) are returned
    /// after the original has been restored.
    pub async fn execute(&self, path: &Path) -> JobResult<Committed> {
        let logger = JobLogger::new(path, "comskip");
        let span = logger.create_span();

        async {
            let result = self.execute_inner(path, &logger).await;
            if let Err(ref e) = result {
                logger.log_error(&e.to_string());
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn execute_inner(&self, path: &Path, logger: &JobLogger) -> JobResult<Committed> {
        if !is_file(path).await {
            return Err(JobError::FileNotFound(path.to_path_buf()));
        }

        logger.log_start(&format!("processing file: {}", path.display()));

        let original_size = file_size(path).await.map_err(|e| match e {
            MediaError::FileNotFound(p) => JobError::FileNotFound(p),
            source => JobError::BackupFailed {
                path: path.to_path_buf(),
                source,
            },
        })?;

        let backup = BackupFile::for_path(path);
        backup.create().await.map_err(|source| JobError::BackupFailed {
            path: path.to_path_buf(),
            source,
        })?;

        match self.run_and_verify(path, original_size, logger).await {
            Ok(new_size) => {
                if let Err(e) = backup.discard().await {
                    logger.log_error(&format!(
                        "could not remove backup {}: {}; remove it by hand or later jobs on this file will be refused",
                        backup.path().display(),
                        e
                    ));
                }

                let postprocess = match self.postprocessor.run(path).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        logger.log_error(&e.to_string());
                        PostProcess::Failed(e.to_string())
                    }
                };

                logger.log_completion(&format!(
                    "successfully processed: {} ({} -> {} bytes)",
                    logger.file_name(),
                    original_size,
                    new_size
                ));

                Ok(Committed {
                    original_size,
                    new_size,
                    postprocess,
                })
            }
            Err(e) => {
                if e.is_rolled_back() {
                    self.roll_back(&backup, logger).await;
                }
                Err(e)
            }
        }
    }

    /// Run the tool and apply the size check. Returns the accepted size.
    async fn run_and_verify(
        &self,
        path: &Path,
        original_size: u64,
        logger: &JobLogger,
    ) -> JobResult<u64> {
        let cmd = self.config.tool_command(path);
        logger.log_debug(&format!(
            "running cmd [timeout {}s]: {}",
            self.config.timeout.as_secs(),
            cmd.display()
        ));

        let output = match self.runner.run(&cmd).await {
            Ok(output) => output,
            Err(MediaError::Timeout(timeout)) => return Err(JobError::ToolTimeout(timeout)),
            Err(e) => return Err(JobError::tool_invocation(e.to_string())),
        };

        logger.log_progress(&format!("done processing file: {}", logger.file_name()));

        if !is_file(path).await {
            return Err(JobError::tool_invocation(
                "file missing after commercial skip operation",
            ));
        }

        if !output.success() {
            return Err(JobError::ToolNonZeroExit {
                exit_code: output.exit_code,
                stderr: output.stderr_message().map(str::to_string),
            });
        }

        let new_size = file_size(path)
            .await
            .map_err(|e| JobError::tool_invocation(e.to_string()))?;

        if !self.config.accepts_size(original_size, new_size) {
            return Err(JobError::SizeCheckFailed {
                original_size,
                new_size,
                threshold: self.config.size_threshold,
            });
        }

        logger.log_debug(&format!(
            "size check passed: {:.0}% of original",
            size_percent(original_size, new_size)
        ));
        Ok(new_size)
    }

    /// Move the backup back over the original. A failure leaves the `.bak`
    /// in place for manual recovery.
    async fn roll_back(&self, backup: &BackupFile, logger: &JobLogger) {
        if let Err(e) = backup.restore().await {
            logger.log_error(&format!(
                "could not restore backup {}: {}",
                backup.path().display(),
                e
            ));
        }
    }
}
