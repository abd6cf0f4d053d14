//! Launching training jobs.
//!
//! [`ProcessJobRunner`] starts the `glimpse` binary with the `train` subcommand as a
//! detached child. A reaper thread waits on it so it never lingers as a zombie; the exit
//! status is only logged.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info, warn};

use super::error::{TrainingError, TrainingResult};

/// Subcommand the training child is started with.
pub const TRAIN_SUBCOMMAND: &str = "train";

/// Binary name used when no training program is configured.
pub const TRAIN_PROGRAM: &str = "glimpse";

#[derive(Debug, Clone, PartialEq, Eq)]
/// A one-way training request.
pub struct TrainingJob {
    /// Store root holding the labeled attempts.
    pub store_root: PathBuf,
    /// Labels accumulated since the previous launch.
    pub labels_since_training: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Identifies a launched job.
pub struct JobHandle {
    /// Process id, when the job runs in a child process.
    pub pid: Option<u32>,
}

/// Starts training jobs without waiting for them.
pub trait TrainingJobRunner: Send + Sync {
    /// Submits `job`; returns once the job is started, not finished.
    fn submit(&self, job: &TrainingJob) -> TrainingResult<JobHandle>;
}

/// Runs training as a detached child process.
#[derive(Debug, Clone)]
pub struct ProcessJobRunner {
    program: PathBuf,
    extra_args: Vec<OsString>,
}

impl ProcessJobRunner {
    /// Runner that executes `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
        }
    }

    /// Runner for `explicit` if given, else the `glimpse` binary next to the running one,
    /// else `glimpse` looked up on `PATH`.
    pub fn resolve(explicit: Option<&Path>) -> Self {
        let exe = std::env::current_exe().ok();
        Self::resolve_near(explicit, exe.as_deref())
    }

    /// [`resolve`](Self::resolve) with the running binary's path supplied.
    pub fn resolve_near(explicit: Option<&Path>, current_exe: Option<&Path>) -> Self {
        if let Some(program) = explicit {
            return Self::new(program);
        }

        let file_name = format!("{TRAIN_PROGRAM}{}", std::env::consts::EXE_SUFFIX);
        let sibling = current_exe
            .and_then(Path::parent)
            .map(|dir| dir.join(&file_name))
            .filter(|path| path.is_file());

        match sibling {
            Some(path) => Self::new(path),
            None => {
                debug!(program = %file_name, "No training binary beside the executable; using PATH");
                Self::new(file_name)
            }
        }
    }

    /// Adds arguments placed before the store and subcommand arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Returns the program that will be executed.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments passed to the child for `job`.
    pub fn args_for(&self, job: &TrainingJob) -> Vec<OsString> {
        let mut args = self.extra_args.clone();
        args.push(OsString::from("--store"));
        args.push(job.store_root.clone().into_os_string());
        args.push(OsString::from(TRAIN_SUBCOMMAND));
        args
    }

    fn command(&self, job: &TrainingJob) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args_for(job))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        cmd
    }
}

impl TrainingJobRunner for ProcessJobRunner {
    fn submit(&self, job: &TrainingJob) -> TrainingResult<JobHandle> {
        let mut child = self
            .command(job)
            .spawn()
            .map_err(|e| TrainingError::SpawnFailed {
                reason: format!("{}: {e}", self.program.display()),
            })?;
        let pid = child.id();

        let reaper = std::thread::Builder::new()
            .name(format!("train-reaper-{pid}"))
            .spawn(move || match child.wait() {
                Ok(status) if status.success() => info!(pid, "Training job finished"),
                Ok(status) => warn!(pid, %status, "Training job exited unsuccessfully"),
                Err(e) => warn!(pid, error = %e, "Failed to wait for training job"),
            });
        if let Err(e) = reaper {
            warn!(pid, error = %e, "Failed to start reaper thread; training job left unattended");
        }

        debug!(pid, program = %self.program.display(), "Training job spawned");
        Ok(JobHandle { pid: Some(pid) })
    }
}

#[cfg(any(test, feature = "mock"))]
pub use mock::RecordingJobRunner;

#[cfg(any(test, feature = "mock"))]
mod mock {
    use parking_lot::Mutex;

    use super::{JobHandle, TrainingError, TrainingJob, TrainingJobRunner, TrainingResult};

    /// Records submitted jobs instead of running them.
    #[derive(Debug, Default)]
    pub struct RecordingJobRunner {
        jobs: Mutex<Vec<TrainingJob>>,
        fail: bool,
    }

    impl RecordingJobRunner {
        /// Runner that accepts every job.
        pub fn new() -> Self {
            Self::default()
        }

        /// Runner whose every submission fails to spawn.
        pub fn failing() -> Self {
            Self {
                jobs: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        /// Jobs submitted so far (failed submissions are not recorded).
        pub fn jobs(&self) -> Vec<TrainingJob> {
            self.jobs.lock().clone()
        }
    }

    impl TrainingJobRunner for RecordingJobRunner {
        fn submit(&self, job: &TrainingJob) -> TrainingResult<JobHandle> {
            if self.fail {
                return Err(TrainingError::SpawnFailed {
                    reason: "recording runner configured to fail".to_string(),
                });
            }
            self.jobs.lock().push(job.clone());
            Ok(JobHandle { pid: None })
        }
    }
}
