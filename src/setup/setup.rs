use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;

use slog::{info, o, Drain, Logger};

use super::log_format::PkvFormat;

/// init_logger builds the root logger of a process.
///
/// Records go to `log_path` when given, appending to it, or to stderr otherwise.
/// Writing happens on a slog_async worker thread.
pub fn init_logger<P: AsRef<Path>>(log_path: Option<P>) -> io::Result<Logger> {
    let logger = match log_path {
        Some(p) => {
            let file = open_log_file(p.as_ref())?;
            let drain = PkvFormat::new(slog_term::PlainDecorator::new(file)).fuse();
            let drain = slog_async::Async::new(drain).build().fuse();
            Logger::root(drain, o!())
        }
        None => {
            let drain = PkvFormat::new(slog_term::TermDecorator::new().stderr().build()).fuse();
            let drain = slog_async::Async::new(drain).build().fuse();
            Logger::root(drain, o!())
        }
    };

    info!(logger, "logger ready");
    Ok(logger)
}

/// Opens log file with append mode. Creates the file and its parent dirs if absent.
fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().append(true).create(true).open(path)
}
