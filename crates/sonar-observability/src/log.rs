//! Local append-only event log
//!
//! JSON Lines, one [`StructuredEvent`] per line. Writers share one file
//! handle behind a mutex and emit each line with a single `write_all`, so
//! concurrent runs never interleave partial lines. Readers tolerate garbage
//! lines, including a trailing line cut short by a crash.

use crate::error::{TelemetryError, TelemetryResult};
use crate::event::StructuredEvent;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Append-only writer for the local event log.
#[derive(Debug)]
pub struct EventLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl EventLog {
    /// Open (or create) the log for appending.
    ///
    /// Missing parent directories are created.
    pub fn open(path: impl Into<PathBuf>) -> TelemetryResult<Self> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| TelemetryError::persistence(&path, e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| TelemetryError::persistence(&path, e))?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event as a single line and flush it.
    pub fn append(&self, event: &StructuredEvent) -> TelemetryResult<()> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let mut file = self.file.lock().map_err(|_| TelemetryError::Lock)?;
        file.write_all(line.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| TelemetryError::persistence(&self.path, e))
    }
}

/// Events read back from a log file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogRead {
    pub events: Vec<StructuredEvent>,
    /// Non-empty lines that did not parse as an event.
    pub skipped_lines: usize,
}

/// Read every well-formed event from a log file.
///
/// A missing file reads as empty. Blank lines are ignored; malformed lines
/// are counted in `skipped_lines`.
pub fn read_events(path: impl AsRef<Path>) -> TelemetryResult<LogRead> {
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(LogRead::default()),
        Err(e) => return Err(TelemetryError::persistence(path, e)),
    };

    let mut read = LogRead::default();
    for (index, line) in BufReader::new(file).split(b'\n').enumerate() {
        let line = line.map_err(|e| TelemetryError::persistence(path, e))?;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        match serde_json::from_slice::<StructuredEvent>(&line) {
            Ok(event) => read.events.push(event),
            Err(error) => {
                tracing::debug!(
                    path = %path.display(),
                    line = index + 1,
                    error = %error,
                    "Skipping malformed log line"
                );
                read.skipped_lines += 1;
            }
        }
    }

    Ok(read)
}
