use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use thiserror::Error;

/// Failures raised while driving the portal or handling downloaded files.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("{selector} not loaded after waiting for {} seconds", timeout.as_secs())]
    ElementTimeout { selector: String, timeout: Duration },

    #[error("timeout while downloading into {} after {} seconds", folder.display(), timeout.as_secs())]
    DownloadTimeout { folder: PathBuf, timeout: Duration },

    #[error("malformed payslip file name '{name}': {reason}")]
    MalformedFileName { name: String, reason: String },

    #[error("unknown placeholder '{name}' in destination template")]
    UnknownPlaceholder { name: String },

    #[error("invalid date format '{format}' in destination template")]
    InvalidDateFormat { format: String },

    #[error("no downloaded file found in {}", .0.display())]
    NoDownloadedFile(PathBuf),

    #[error("interrupted")]
    Interrupted,

    #[error("browser error: {0}")]
    Browser(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RunError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// Timeouts are the failures the workflow detects itself; everything else
    /// is an unexpected fault.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ElementTimeout { .. } | Self::DownloadTimeout { .. })
    }

    /// Process status for a run that ended with this error.
    pub fn exit_status(&self) -> u8 {
        match self {
            Self::Interrupted => 130,
            _ => 1,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }
}

impl From<thirtyfour::error::WebDriverError> for RunError {
    fn from(e: thirtyfour::error::WebDriverError) -> Self {
        Self::Browser(e.to_string())
    }
}

pub type RunResult<T> = Result<T, RunError>;
