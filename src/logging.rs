// src/logging.rs
//
// Every message goes to stderr prefixed with local wall-clock time. When a log
// directory is configured the same lines are appended to a file named after
// the server start time, and `esp-at.log` points at the newest one.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// `eprintln!` with a timestamp, copied to the mirror file when one is open.
#[macro_export]
macro_rules! tlog {
    ($($arg:tt)*) => {{
        use std::io::Write as _;
        let line = format!("{} {}", $crate::logging::timestamp(), format_args!($($arg)*));
        eprintln!("{}", line);
        if let Ok(mut slot) = $crate::logging::LOG_FILE.lock() {
            if let Some(file) = slot.as_mut() {
                let _ = writeln!(file, "{}", line);
            }
        }
    }};
}

/// Name of the link to the most recent log file
const LATEST_LINK: &str = "esp-at.log";

/// Open mirror file, `None` while file logging is off.
pub static LOG_FILE: Mutex<Option<File>> = Mutex::new(None);

/// `HH:MM:SS.mmm` in local time
pub fn timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S%.3f").to_string()
}

fn mirror_path(log_dir: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    log_dir.join(format!("{}-{}", stamp, LATEST_LINK))
}

#[cfg(unix)]
fn point_latest_link(log_dir: &Path, target: &Path) {
    let link = log_dir.join(LATEST_LINK);
    let _ = std::fs::remove_file(&link);
    let Some(name) = target.file_name() else {
        return;
    };
    if let Err(e) = std::os::unix::fs::symlink(name, &link) {
        eprintln!("{} [logging] Could not link {}: {}", timestamp(), LATEST_LINK, e);
    }
}

#[cfg(not(unix))]
fn point_latest_link(_log_dir: &Path, _target: &Path) {}

/// Start mirroring log lines into a new file under `log_dir`.
pub fn init_file_logging(log_dir: &Path) -> Result<PathBuf, String> {
    std::fs::create_dir_all(log_dir)
        .map_err(|e| format!("Cannot create log directory {}: {}", log_dir.display(), e))?;

    let path = mirror_path(log_dir);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| format!("Cannot open log file {}: {}", path.display(), e))?;
    point_latest_link(log_dir, &path);

    if let Ok(mut slot) = LOG_FILE.lock() {
        *slot = Some(file);
    }
    tlog!("[logging] Mirroring to {}", path.display());
    Ok(path)
}

pub fn stop_file_logging() {
    let closed = match LOG_FILE.lock() {
        Ok(mut slot) => slot.take().is_some(),
        Err(_) => false,
    };
    if closed {
        tlog!("[logging] Mirror closed");
    }
}
