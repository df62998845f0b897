//! Error types shared across the client

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias for library results.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong talking to the service or the local disk.
#[derive(Debug, Error)]
pub enum Error {
    /// No API key and no username/password pair could be resolved.
    #[error(
        "no credentials: pass --key or --username/--password, or set \
         NEOCITIES_API_KEY or NEOCITIES_USERNAME/NEOCITIES_PASSWORD"
    )]
    Credentials,

    /// The API answered with a non-success status, an error envelope, or a
    /// body that could not be decoded.
    #[error("api error (HTTP {status}): {message}")]
    Api {
        status: u16,
        /// The service's `error_type` discriminator, when present.
        kind: Option<String>,
        message: String,
    },

    /// A local filesystem operation failed.
    #[error("{}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Some items of a batch operation failed.
    #[error("{0}")]
    PartialBatch(BatchReport),

    /// The caller passed something unusable.
    #[error("{0}")]
    Argument(String),

    /// Transport-level failure before any HTTP status was received.
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Outcome of a sequential batch operation.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Items that completed.
    pub succeeded: u32,
    /// Items skipped before any request was made (disallowed extensions).
    pub skipped: u32,
    /// Per-item failures, in processing order.
    pub failures: Vec<BatchFailure>,
    /// True when the failure budget stopped the batch before the end.
    pub stopped_early: bool,
}

/// One failed item of a batch.
#[derive(Debug)]
pub struct BatchFailure {
    /// Remote path of the item that failed.
    pub path: String,
    pub reason: String,
}

impl BatchReport {
    /// Turn the report into a result; reports with failures become
    /// [`Error::PartialBatch`].
    pub fn into_result(self) -> Result<Self> {
        if self.failures.is_empty() {
            Ok(self)
        } else {
            Err(Error::PartialBatch(self))
        }
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let attempted = self.succeeded as usize + self.failures.len();
        write!(f, "{} of {attempted} items failed", self.failures.len())?;
        if self.stopped_early {
            write!(f, " (stopped early)")?;
        }
        for failure in &self.failures {
            write!(f, "\n  {}: {}", failure.path, failure.reason)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_report_into_result() {
        let report = BatchReport {
            succeeded: 3,
            ..BatchReport::default()
        };
        assert_eq!(report.into_result().unwrap().succeeded, 3);
    }

    #[test]
    fn test_failed_report_into_result() {
        let report = BatchReport {
            succeeded: 1,
            failures: vec![BatchFailure {
                path: "a.html".to_string(),
                reason: "boom".to_string(),
            }],
            ..BatchReport::default()
        };
        let err = report.into_result().unwrap_err();
        match err {
            Error::PartialBatch(report) => {
                assert_eq!(report.failures.len(), 1);
                assert_eq!(report.failures[0].path, "a.html");
            }
            other => panic!("expected PartialBatch, got {other:?}"),
        }
    }

    #[test]
    fn test_report_display_lists_failures() {
        let report = BatchReport {
            succeeded: 1,
            failures: vec![
                BatchFailure {
                    path: "a.html".to_string(),
                    reason: "missing".to_string(),
                },
                BatchFailure {
                    path: "b.html".to_string(),
                    reason: "denied".to_string(),
                },
            ],
            ..BatchReport::default()
        };
        let text = report.to_string();
        assert!(text.contains("2 of 3 items failed"), "{text}");
        assert!(text.contains("a.html: missing"), "{text}");
        assert!(text.contains("b.html: denied"), "{text}");
    }
}
