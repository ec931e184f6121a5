use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Hard errors – I/O and parse failures on files that do exist
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LinefinderError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}, line {line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("malformed log file {path}: {source}")]
    Log {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

pub type Result<T> = std::result::Result<T, LinefinderError>;

// ---------------------------------------------------------------------------
// Warnings – recoverable conditions reported to the user
// ---------------------------------------------------------------------------

/// Non-fatal conditions. The operation that raised one has already completed
/// with a safe default; the warning only needs to reach the user.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Warning {
    #[error("{kind} file not found: {path}")]
    MissingFile { kind: &'static str, path: PathBuf },

    #[error("redshift '{0}' is not a 5-decimal value")]
    MalformedRedshift(String),

    #[error("{ion} {short_id} is not in the line list")]
    UnknownLine { ion: String, short_id: String },

    #[error("ion '{0}' is not in the line list")]
    UnknownIon(String),

    #[error("invalid redshift input '{0}'")]
    InvalidRedshift(String),

    #[error("invalid velocity bound '{0}'")]
    InvalidVelocity(String),

    #[error("log line {line}: {message}")]
    BadLogField { line: usize, message: String },

    #[error("no velocity coverage of {ion} {short_id} within [{vmin}, {vmax}] km/s")]
    WindowNotCovered {
        ion: String,
        short_id: String,
        vmin: f64,
        vmax: f64,
    },

    #[error("no log file provided, did not save")]
    NoSaveDestination,
}

impl Warning {
    /// Emit the warning through the `log` facade and hand it back.
    pub fn logged(self) -> Self {
        log::warn!("{self}");
        self
    }
}
