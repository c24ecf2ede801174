use crate::backend::DebuggerBackend;
use crate::backtrace::BacktraceTask;
use crate::error::SessionError;
use crate::intercept::{self, CrashInterceptor, InterceptionMode};
use crate::sysinfo::SystemInformation;
use crate::types::{CrashMetadata, CrashedApplication};
use std::sync::Arc;
use tracing::{error, info};

/// Everything known about the crash being handled.
///
/// Built once at process entry and passed by reference to whatever needs
/// crash metadata. Metadata is written while the handler parses its input and
/// only read after [`CrashSession::init`].
pub struct CrashSession {
    metadata: CrashMetadata,
    backend: Box<dyn DebuggerBackend>,
    system_information: SystemInformation,
    crashed_application: Option<CrashedApplication>,
}

impl CrashSession {
    pub fn new(backend: Box<dyn DebuggerBackend>) -> Self {
        Self::with_metadata(backend, CrashMetadata::default())
    }

    pub fn with_metadata(backend: Box<dyn DebuggerBackend>, metadata: CrashMetadata) -> Self {
        Self {
            metadata,
            backend,
            system_information: SystemInformation::collect(),
            crashed_application: None,
        }
    }

    /// Initialize the debugger backend and arm interception of our own crashes.
    ///
    /// On error the host must not continue handling the crash.
    pub fn init(
        &mut self,
        interceptor: Arc<dyn CrashInterceptor>,
    ) -> Result<InterceptionMode, SessionError> {
        let app = self.backend.init(&self.metadata).map_err(|e| {
            error!("Debugger backend failed to initialize: {}", e);
            SessionError::BackendInit(e)
        })?;

        let mode = intercept::interception_mode(&app.fake_executable_base_name);
        intercept::arm(interceptor, mode);

        info!(
            "Handling crash of {} {} (pid {})",
            app.name, app.version, app.pid
        );
        self.crashed_application = Some(app);
        Ok(mode)
    }

    pub fn is_initialized(&self) -> bool {
        self.crashed_application.is_some()
    }

    pub fn crashed_application(&self) -> Option<&CrashedApplication> {
        self.crashed_application.as_ref()
    }

    pub fn system_information(&self) -> &SystemInformation {
        &self.system_information
    }

    /// A fresh, unstarted backtrace task for the crashed process.
    pub fn backtrace_task(&self) -> Result<BacktraceTask, SessionError> {
        let app = self
            .crashed_application
            .as_ref()
            .ok_or(SessionError::NotInitialized)?;
        Ok(BacktraceTask::new(self.backend.backtrace_generator(app)))
    }

    pub fn metadata(&self) -> &CrashMetadata {
        &self.metadata
    }

    pub fn set_signal(&mut self, signal: i32) {
        self.metadata.signal = signal;
    }

    pub fn signal(&self) -> i32 {
        self.metadata.signal
    }

    pub fn set_pid(&mut self, pid: i32) {
        self.metadata.pid = pid;
    }

    pub fn pid(&self) -> i32 {
        self.metadata.pid
    }

    pub fn set_app_name(&mut self, app_name: impl Into<String>) {
        self.metadata.app_name = app_name.into();
    }

    pub fn app_name(&self) -> &str {
        &self.metadata.app_name
    }

    pub fn set_app_path(&mut self, app_path: impl Into<String>) {
        self.metadata.app_path = app_path.into();
    }

    pub fn app_path(&self) -> &str {
        &self.metadata.app_path
    }

    pub fn set_app_version(&mut self, app_version: impl Into<String>) {
        self.metadata.app_version = app_version.into();
    }

    pub fn app_version(&self) -> &str {
        &self.metadata.app_version
    }

    pub fn set_bug_address(&mut self, bug_address: impl Into<String>) {
        self.metadata.bug_address = bug_address.into();
    }

    pub fn bug_address(&self) -> &str {
        &self.metadata.bug_address
    }

    pub fn set_program_name(&mut self, program_name: impl Into<String>) {
        self.metadata.program_name = program_name.into();
    }

    pub fn program_name(&self) -> &str {
        &self.metadata.program_name
    }

    pub fn set_kdeinit(&mut self, kdeinit: bool) {
        self.metadata.kdeinit = kdeinit;
    }

    pub fn is_kdeinit(&self) -> bool {
        self.metadata.kdeinit
    }

    pub fn set_safer(&mut self, safer: bool) {
        self.metadata.safer = safer;
    }

    pub fn is_safer(&self) -> bool {
        self.metadata.safer
    }

    pub fn set_restarted(&mut self, restarted: bool) {
        self.metadata.restarted = restarted;
    }

    pub fn is_restarted(&self) -> bool {
        self.metadata.restarted
    }

    pub fn set_keep_running(&mut self, keep_running: bool) {
        self.metadata.keep_running = keep_running;
    }

    pub fn is_keep_running(&self) -> bool {
        self.metadata.keep_running
    }

    pub fn set_thread(&mut self, thread: i32) {
        self.metadata.thread = thread;
    }

    pub fn thread(&self) -> i32 {
        self.metadata.thread
    }
}
