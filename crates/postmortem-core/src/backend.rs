use crate::error::BackendError;
use crate::types::{BacktraceEvent, CrashMetadata, CrashedApplication, TaskOutcome};
use chrono::Local;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Debugger invocation used when the host does not configure one.
pub const DEFAULT_DEBUGGER: &[&str] = &[
    "gdb",
    "-nw",
    "-n",
    "-batch",
    "-p",
    "%pid",
    "-ex",
    "thread apply all bt",
];

/// Access to the crashed process and the debugger that inspects it.
pub trait DebuggerBackend: Send {
    fn init(&mut self, metadata: &CrashMetadata) -> Result<CrashedApplication, BackendError>;

    fn backtrace_generator(&self, app: &CrashedApplication) -> Box<dyn BacktraceGenerator>;
}

/// One backtrace generation attempt.
///
/// `spawn` must return promptly and report through `events`: any number of
/// `Line`s followed by at most one `Finished`. Dropping the sender without a
/// `Finished` is treated as an abandoned run.
pub trait BacktraceGenerator: Send {
    fn spawn(self: Box<Self>, events: mpsc::UnboundedSender<BacktraceEvent>);
}

/// Backend that attaches an external debugger process to the crashed pid.
#[derive(Debug, Clone)]
pub struct ProcessBackend {
    command: Vec<String>,
}

impl ProcessBackend {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    pub fn gdb() -> Self {
        Self::new(DEFAULT_DEBUGGER.iter().map(|s| s.to_string()).collect())
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }
}

impl Default for ProcessBackend {
    fn default() -> Self {
        Self::gdb()
    }
}

impl DebuggerBackend for ProcessBackend {
    fn init(&mut self, metadata: &CrashMetadata) -> Result<CrashedApplication, BackendError> {
        if metadata.pid <= 0 {
            return Err(BackendError::InvalidPid(metadata.pid));
        }

        if cfg!(target_os = "linux") && !Path::new("/proc").join(metadata.pid.to_string()).exists()
        {
            return Err(BackendError::ProcessGone(metadata.pid));
        }

        let app = CrashedApplication::from_metadata(metadata, Local::now());
        info!(
            "Crashed application {} (pid {}) received {}",
            app.fake_executable_base_name,
            app.pid,
            app.signal_name()
        );
        Ok(app)
    }

    fn backtrace_generator(&self, app: &CrashedApplication) -> Box<dyn BacktraceGenerator> {
        Box::new(CommandGenerator::new(expand_arguments(&self.command, app)))
    }
}

/// Substitute `%pid`, `%execpath` and `%thread` in a debugger command template.
pub fn expand_arguments(template: &[String], app: &CrashedApplication) -> Vec<String> {
    let pid = app.pid.to_string();
    let thread = app.thread.to_string();
    let exec_path = app.executable.display().to_string();

    template
        .iter()
        .map(|arg| {
            arg.replace("%pid", &pid)
                .replace("%execpath", &exec_path)
                .replace("%thread", &thread)
        })
        .collect()
}

/// Runs a command and forwards each stdout line as a backtrace event.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    argv: Vec<String>,
}

impl CommandGenerator {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }

    async fn run(&self, events: &mpsc::UnboundedSender<BacktraceEvent>) -> TaskOutcome {
        let Some((program, args)) = self.argv.split_first() else {
            return TaskOutcome::FailedToStart("empty debugger command".to_string());
        };

        debug!("Starting debugger: {:?}", self.argv);
        let mut child = match Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                warn!("Failed to start debugger {}: {}", program, e);
                return TaskOutcome::FailedToStart(format!("{}: {}", program, e));
            }
        };

        let Some(stdout) = child.stdout.take() else {
            return TaskOutcome::FailedToStart("debugger stdout unavailable".to_string());
        };

        let mut reader = BufReader::new(stdout);
        let mut line = Vec::new();
        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line).await {
                Ok(0) => break,
                Ok(_) => {
                    // Frames may carry paths or symbols in a legacy 8-bit encoding.
                    let text = String::from_utf8_lossy(&line).into_owned();
                    // Receiver gone means nobody is listening anymore; keep
                    // draining so the debugger is not blocked on a full pipe.
                    let _ = events.send(BacktraceEvent::Line(text));
                }
                Err(e) => {
                    warn!("Error reading debugger output: {}", e);
                    return TaskOutcome::Error(e.to_string());
                }
            }
        }

        match child.wait().await {
            Ok(status) if status.success() => TaskOutcome::Done,
            Ok(status) => TaskOutcome::Error(format!("debugger exited with {}", status)),
            Err(e) => TaskOutcome::Error(e.to_string()),
        }
    }
}

impl BacktraceGenerator for CommandGenerator {
    fn spawn(self: Box<Self>, events: mpsc::UnboundedSender<BacktraceEvent>) {
        tokio::spawn(async move {
            let outcome = self.run(&events).await;
            let _ = events.send(BacktraceEvent::Finished(outcome));
        });
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Backend that replays a fixed event script instead of running a debugger.
    pub struct ScriptedBackend {
        pub events: Vec<BacktraceEvent>,
        pub fail_init: bool,
    }

    impl ScriptedBackend {
        pub fn new(events: Vec<BacktraceEvent>) -> Self {
            Self {
                events,
                fail_init: false,
            }
        }

        pub fn failing() -> Self {
            Self {
                events: Vec::new(),
                fail_init: true,
            }
        }
    }

    impl DebuggerBackend for ScriptedBackend {
        fn init(&mut self, metadata: &CrashMetadata) -> Result<CrashedApplication, BackendError> {
            if self.fail_init {
                return Err(BackendError::ProcessGone(metadata.pid));
            }
            Ok(CrashedApplication::from_metadata(metadata, Local::now()))
        }

        fn backtrace_generator(&self, _app: &CrashedApplication) -> Box<dyn BacktraceGenerator> {
            Box::new(ScriptedGenerator(self.events.clone()))
        }
    }

    pub struct ScriptedGenerator(pub Vec<BacktraceEvent>);

    impl BacktraceGenerator for ScriptedGenerator {
        fn spawn(self: Box<Self>, events: mpsc::UnboundedSender<BacktraceEvent>) {
            for event in self.0 {
                let _ = events.send(event);
            }
        }
    }
}
