use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Executable base name of the crash handler itself.
pub const HANDLER_NAME: &str = "postmortem";

/// Grace window before catching crashes of a handler that is handling its own crash.
pub const CRASH_CATCHING_DELAY: Duration = Duration::from_secs(10);

/// Switch for catching crashes of the handler process itself.
pub trait CrashInterceptor: Send + Sync {
    fn set_enabled(&self, enabled: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptionMode {
    Immediate,
    Deferred(Duration),
}

/// When the handler is reporting on a crash of itself, a crash during its own
/// startup must not recurse into another report.
pub fn interception_mode(crashed_base_name: &str) -> InterceptionMode {
    if crashed_base_name == HANDLER_NAME {
        InterceptionMode::Deferred(CRASH_CATCHING_DELAY)
    } else {
        InterceptionMode::Immediate
    }
}

pub fn arm(interceptor: Arc<dyn CrashInterceptor>, mode: InterceptionMode) {
    match mode {
        InterceptionMode::Immediate => {
            debug!("Enabling crash catching");
            interceptor.set_enabled(true);
        }
        InterceptionMode::Deferred(delay) => {
            debug!("Deferring crash catching by {:?}", delay);
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(async move {
                        tokio::time::sleep(delay).await;
                        debug!("Enabling crash catching");
                        interceptor.set_enabled(true);
                    });
                }
                Err(_) => {
                    std::thread::spawn(move || {
                        std::thread::sleep(delay);
                        debug!("Enabling crash catching");
                        interceptor.set_enabled(true);
                    });
                }
            }
        }
    }
}

/// Panic hook that reports panics of the handler once enabled.
#[derive(Clone)]
pub struct PanicInterceptor {
    enabled: Arc<AtomicBool>,
}

impl PanicInterceptor {
    /// Chains onto the current panic hook; install once at startup.
    pub fn install() -> Arc<Self> {
        let enabled = Arc::new(AtomicBool::new(false));
        let flag = enabled.clone();
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if flag.load(Ordering::SeqCst) {
                error!(
                    "Crash handler crashed: {}\n{}",
                    info,
                    std::backtrace::Backtrace::force_capture()
                );
            }
            previous(info);
        }));
        Arc::new(Self { enabled })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

impl CrashInterceptor for PanicInterceptor {
    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }
}
