use crate::error::SessionError;
use crate::report::{shutdown_filename, write_report};
use crate::retention::{remove_old_files_in, MAX_RETAINED_REPORTS};
use crate::session::CrashSession;
use crate::types::{BacktraceEvent, TaskOutcome};
use futures_util::StreamExt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Directory name under the platform cache dir.
pub const CACHE_DIR_NAME: &str = "postmortem";

#[derive(Debug, Clone, Default)]
pub struct ShutdownOptions {
    /// Overrides the platform cache directory.
    pub cache_dir: Option<PathBuf>,
}

impl ShutdownOptions {
    pub fn resolve_cache_dir(&self) -> Option<PathBuf> {
        self.cache_dir.clone().or_else(default_cache_dir)
    }
}

pub fn default_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join(CACHE_DIR_NAME))
}

/// What happened to the backtrace during shutdown. Never an error: the host
/// quits either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { path: PathBuf, task: TaskOutcome },
    NoCacheDir,
    WriteFailed(PathBuf),
}

/// Accumulates debugger output until the task reaches a terminal state.
#[derive(Debug, Default)]
struct ShutdownSaver {
    output: String,
}

impl ShutdownSaver {
    fn append_line(&mut self, line: &str) {
        self.output.push_str(line);
    }

    /// Persist the output. Consumes the saver, so it runs at most once.
    fn finish(self, dir: Option<&Path>, filename: &str, task: TaskOutcome) -> SaveOutcome {
        let Some(dir) = dir else {
            warn!("No cache directory available, not saving backtrace");
            return SaveOutcome::NoCacheDir;
        };

        // Shutdown must not wait on a directory we cannot create
        if let Err(e) = fs::create_dir_all(dir) {
            warn!("Could not create cache directory {:?}: {}", dir, e);
            return SaveOutcome::NoCacheDir;
        }

        if let Err(e) = remove_old_files_in(dir, MAX_RETAINED_REPORTS - 1) {
            warn!("Could not prune old reports in {:?}: {}", dir, e);
        }

        let path = dir.join(filename);
        let written = File::create(&path).and_then(|mut file| write_report(&mut file, &self.output));
        match written {
            Ok(()) => {
                info!("Saved backtrace to {:?} ({} bytes)", path, self.output.len());
                SaveOutcome::Saved { path, task }
            }
            Err(e) => {
                warn!("Could not write backtrace to {:?}: {}", path, e);
                SaveOutcome::WriteFailed(path)
            }
        }
    }
}

/// Generate a backtrace and store it in the cache directory before the host exits.
///
/// Waits for the task to reach a terminal state; there is no cancellation.
/// Fails only when the session was never initialized.
pub async fn shutdown_save_report(
    session: &CrashSession,
    options: &ShutdownOptions,
) -> Result<SaveOutcome, SessionError> {
    let task = session.backtrace_task()?;
    let app = session
        .crashed_application()
        .ok_or(SessionError::NotInitialized)?;
    let filename = shutdown_filename(session.pid(), app);

    info!("Generating backtrace for pid {} before shutdown", session.pid());
    let mut run = task.start();
    let mut saver = ShutdownSaver::default();
    let mut outcome = TaskOutcome::Abandoned;
    while let Some(event) = run.next().await {
        match event {
            BacktraceEvent::Line(line) => saver.append_line(&line),
            BacktraceEvent::Finished(finished) => {
                outcome = finished;
                break;
            }
        }
    }

    if !outcome.is_success() {
        warn!("Backtrace generation did not complete: {:?}", outcome);
    }

    let dir = options.resolve_cache_dir();
    Ok(saver.finish(dir.as_deref(), &filename, outcome))
}
