use crate::error::ReportError;
use crate::session::CrashSession;
use crate::types::CrashedApplication;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Default file name for a saved report, e.g. `kwrite-20231005-143012.kcrash.txt`.
pub fn suggested_filename(app: &CrashedApplication) -> String {
    let name = format!(
        "{}-{}.kcrash.txt",
        app.fake_executable_base_name,
        app.datetime.format("%Y%m%d-%H%M%S")
    );
    name.replace('/', "_")
}

/// File name used for reports saved during shutdown.
pub fn shutdown_filename(pid: i32, app: &CrashedApplication) -> String {
    format!("pid-{}-{}", pid, suggested_filename(app))
}

/// Save a report on behalf of the user.
///
/// In restricted I/O mode the destination is ignored and the report goes to a
/// new `XXXXXX.kcrash` file in the working directory. Otherwise the report
/// replaces `destination` through a temporary file in the same directory.
pub fn save_report(
    session: &CrashSession,
    report: &str,
    destination: Option<&Path>,
) -> Result<PathBuf, ReportError> {
    save_report_in(session, report, destination, Path::new("."))
}

fn save_report_in(
    session: &CrashSession,
    report: &str,
    destination: Option<&Path>,
    safer_dir: &Path,
) -> Result<PathBuf, ReportError> {
    if session.is_safer() {
        return save_report_safer(safer_dir, report);
    }

    let destination = destination.ok_or(ReportError::NoDestination)?;
    let parent = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(ReportError::Create)?;
    write_report(temp.as_file_mut(), report).map_err(|source| ReportError::Write {
        path: temp.path().to_path_buf(),
        source,
    })?;
    temp.persist(destination)
        .map_err(|e| ReportError::Write {
            path: destination.to_path_buf(),
            source: e.error,
        })?;

    info!("Report saved to {:?}", destination);
    Ok(destination.to_path_buf())
}

fn save_report_safer(dir: &Path, report: &str) -> Result<PathBuf, ReportError> {
    let temp = tempfile::Builder::new()
        .prefix("")
        .suffix(".kcrash")
        .rand_bytes(6)
        .tempfile_in(dir)
        .map_err(ReportError::Create)?;

    let (mut file, path) = temp.keep().map_err(|e| ReportError::Create(e.error))?;
    write_report(&mut file, report).map_err(|source| ReportError::Write {
        path: path.clone(),
        source,
    })?;

    info!("Report saved to {:?}", path);
    Ok(path)
}

pub(crate) fn write_report(file: &mut File, report: &str) -> std::io::Result<()> {
    let mut writer = BufWriter::new(file);
    writer.write_all(report.as_bytes())?;
    writer.flush()
}
