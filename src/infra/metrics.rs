// ============================================================
// Layer 6 — Loss Log
// ============================================================
// Semicolon-delimited training log, opened once in append mode
// and kept open for the whole run.
//
// Layout (training and validation rows share one file):
//   Iteration;Training loss;Iteration;Validation loss
//   10;3.871
//   20;3.402
//   ;;100;3.125
//
// A log that cannot be opened is not an error: logging is just
// disabled for the run.

use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

pub const LOG_HEADER: &str = "Iteration;Training loss;Iteration;Validation loss";

/// Append-mode loss log. Every method is a no-op when disabled.
#[derive(Debug, Default)]
pub struct LossLog {
    file: Option<File>,
    path: Option<PathBuf>,
}

impl LossLog {
    /// A log that writes nothing.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Open `path` for appending and write the header row.
    /// `None`, or a file that cannot be opened, yields a disabled log.
    pub fn open(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::disabled();
        };

        let opened = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut f| writeln!(f, "{LOG_HEADER}").map(|_| f));

        match opened {
            Ok(file) => {
                tracing::debug!("Loss log opened: '{}'", path.display());
                Self { file: Some(file), path: Some(path.to_path_buf()) }
            }
            Err(e) => {
                tracing::warn!("Cannot open log file '{}' ({e}); logging disabled", path.display());
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.file.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// `<iter>;<loss>`
    pub fn log_training(&mut self, iter: usize, loss: f32) {
        self.write_row(format_args!("{iter};{loss}"));
    }

    /// `;;<iter>;<loss>`
    pub fn log_validation(&mut self, iter: usize, loss: f32) {
        self.write_row(format_args!(";;{iter};{loss}"));
    }

    fn write_row(&mut self, row: std::fmt::Arguments<'_>) {
        if let Some(file) = self.file.as_mut() {
            if let Err(e) = writeln!(file, "{row}") {
                tracing::warn!("Cannot write to log file ({e}); logging disabled");
                self.file = None;
            }
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_rows_are_semicolon_delimited() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loss.csv");

        let mut log = LossLog::open(Some(&path));
        assert!(log.is_enabled());
        log.log_training(10, 2.5);
        log.log_validation(100, 1.25);
        drop(log);

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, [LOG_HEADER, "10;2.5", ";;100;1.25"]);
    }

    #[test]
    fn test_reopening_appends_with_a_new_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loss.csv");

        LossLog::open(Some(&path)).log_training(1, 1.0);
        LossLog::open(Some(&path)).log_training(2, 0.5);

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 4);
        assert_eq!(text.lines().filter(|l| *l == LOG_HEADER).count(), 2);
    }

    #[test]
    fn test_unopenable_path_disables_logging() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = LossLog::open(Some(&dir.path().join("missing").join("loss.csv")));
        assert!(!log.is_enabled());
        log.log_training(1, 1.0);
    }

    #[test]
    fn test_no_path_is_disabled() {
        assert!(!LossLog::open(None).is_enabled());
    }
}
