use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use chrono::Local;

/// ctime(3) layout, e.g. `Thu Oct 16 13:27:05 2026`.
const CTIME_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// Operator-facing event log.
///
/// Every message is appended to the log file as `[<timestamp>] <message>` and
/// echoed to stdout without the prefix. Opened once at startup and handed to
/// whatever needs to report events; the file is flushed when it is dropped.
pub struct Logger {
    file: Box<dyn Write + Send>,
    echo: bool,
}

impl Logger {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file: File = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Box::new(file),
            echo: true,
        })
    }

    /// Logger over an arbitrary writer, without the stdout echo.
    pub fn from_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            file: Box::new(writer),
            echo: false,
        }
    }

    pub fn log(&mut self, message: impl AsRef<str>) {
        let message = message.as_ref();
        let timestamp = Local::now().format(CTIME_FORMAT);
        let written =
            writeln!(self.file, "[{timestamp}] {message}").and_then(|_| self.file.flush());
        if let Err(err) = written {
            tracing::warn!(error = %err, "failed to append to log file");
        }
        if self.echo {
            println!("{message}");
        }
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        let _ = self.file.flush();
    }
}
