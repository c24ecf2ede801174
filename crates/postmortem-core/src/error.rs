use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("invalid pid {0}")]
    InvalidPid(i32),
    #[error("process {0} is not running")]
    ProcessGone(i32),
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("debugger backend failed to initialize: {0}")]
    BackendInit(#[source] BackendError),
    #[error("crash session has not been initialized")]
    NotInitialized,
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("no destination selected for the report")]
    NoDestination,
    #[error("could not create a file in which to save the report: {0}")]
    Create(#[source] io::Error),
    #[error("cannot write report to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
