use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Crash metadata handed to the handler by the crashing process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrashMetadata {
    pub signal: i32,
    pub pid: i32,
    pub app_name: String,
    pub app_path: String,
    pub app_version: String,
    pub bug_address: String,
    pub program_name: String,
    pub kdeinit: bool,
    pub safer: bool,
    pub restarted: bool,
    pub keep_running: bool,
    pub thread: i32,
}

/// Descriptor of the crashed process, built by the debugger backend on init.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrashedApplication {
    pub name: String,
    pub fake_executable_base_name: String,
    pub executable: PathBuf,
    pub version: String,
    pub bug_report_address: String,
    pub pid: i32,
    pub signal: i32,
    pub thread: i32,
    pub datetime: DateTime<Local>,
    pub restarted: bool,
}

impl CrashedApplication {
    pub fn from_metadata(metadata: &CrashMetadata, datetime: DateTime<Local>) -> Self {
        let executable = PathBuf::from(&metadata.app_path);

        // Processes forked from the init helper all share its executable, so
        // the advertised app name is the only useful identity.
        let fake_executable_base_name = if metadata.kdeinit {
            metadata.app_name.clone()
        } else {
            base_name(&executable).unwrap_or_else(|| metadata.app_name.clone())
        };

        Self {
            name: if metadata.program_name.is_empty() {
                metadata.app_name.clone()
            } else {
                metadata.program_name.clone()
            },
            fake_executable_base_name,
            executable,
            version: metadata.app_version.clone(),
            bug_report_address: metadata.bug_address.clone(),
            pid: metadata.pid,
            signal: metadata.signal,
            thread: metadata.thread,
            datetime,
            restarted: metadata.restarted,
        }
    }

    pub fn signal_name(&self) -> &'static str {
        signal_name(self.signal)
    }
}

/// File name up to the first dot, e.g. `/usr/bin/kate.bin` -> `kate`.
fn base_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    let base = file_name.split('.').next().unwrap_or(file_name);
    if base.is_empty() {
        None
    } else {
        Some(base.to_string())
    }
}

pub fn signal_name(signal: i32) -> &'static str {
    match signal {
        4 => "SIGILL",
        5 => "SIGTRAP",
        6 => "SIGABRT",
        7 => "SIGBUS",
        8 => "SIGFPE",
        9 => "SIGKILL",
        11 => "SIGSEGV",
        13 => "SIGPIPE",
        15 => "SIGTERM",
        _ => "Unknown",
    }
}

/// Event reported by a running backtrace generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BacktraceEvent {
    /// One chunk of debugger output, newline included when the debugger wrote one.
    Line(String),
    Finished(TaskOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TaskOutcome {
    Done,
    Error(String),
    FailedToStart(String),
    /// The generator went away without reporting a result.
    Abandoned,
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Done)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TaskState {
    Idle,
    Running,
    Done,
    Failed,
    AbandonedAtShutdown,
}

impl From<&TaskOutcome> for TaskState {
    fn from(outcome: &TaskOutcome) -> Self {
        match outcome {
            TaskOutcome::Done => TaskState::Done,
            TaskOutcome::Error(_) | TaskOutcome::FailedToStart(_) => TaskState::Failed,
            TaskOutcome::Abandoned => TaskState::AbandonedAtShutdown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> CrashMetadata {
        CrashMetadata {
            signal: 11,
            pid: 4242,
            app_name: "kwrite".to_string(),
            app_path: "/usr/bin/kwrite".to_string(),
            app_version: "23.08.1".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_base_name_from_executable_path() {
        let app = CrashedApplication::from_metadata(&metadata(), Local::now());
        assert_eq!(app.fake_executable_base_name, "kwrite");
        assert_eq!(app.name, "kwrite");
        assert_eq!(app.signal_name(), "SIGSEGV");
    }

    #[test]
    fn test_base_name_strips_extensions() {
        let mut meta = metadata();
        meta.app_path = "/opt/app/kate.bin".to_string();
        let app = CrashedApplication::from_metadata(&meta, Local::now());
        assert_eq!(app.fake_executable_base_name, "kate");
    }

    #[test]
    fn test_kdeinit_uses_app_name() {
        let mut meta = metadata();
        meta.kdeinit = true;
        meta.app_name = "dolphin".to_string();
        meta.app_path = "/usr/bin/kdeinit5".to_string();
        let app = CrashedApplication::from_metadata(&meta, Local::now());
        assert_eq!(app.fake_executable_base_name, "dolphin");
    }

    #[test]
    fn test_empty_path_falls_back_to_app_name() {
        let mut meta = metadata();
        meta.app_path.clear();
        let app = CrashedApplication::from_metadata(&meta, Local::now());
        assert_eq!(app.fake_executable_base_name, "kwrite");
    }

    #[test]
    fn test_outcome_to_state() {
        assert_eq!(TaskState::from(&TaskOutcome::Done), TaskState::Done);
        assert_eq!(
            TaskState::from(&TaskOutcome::FailedToStart("gdb".into())),
            TaskState::Failed
        );
        assert_eq!(
            TaskState::from(&TaskOutcome::Abandoned),
            TaskState::AbandonedAtShutdown
        );
    }
}
