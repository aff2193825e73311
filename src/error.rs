//! Error taxonomy shared by every stage of the camera parameter pipeline.
//!
//! All errors are fatal for a run: a missing or malformed input would shift the
//! image index of every later record, so nothing is skipped or retried.

use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum CamParamsError {
    /// Invalid combination of options, or inputs that disagree with each other.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// A matrix or calibration file is missing, unparsable or has the wrong shape.
    #[error("Invalid input {}: {reason}", path.display())]
    Input { path: PathBuf, reason: String },
    /// An output file or directory could not be created, read or written.
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CamParamsError {
    pub fn input(path: &Path, reason: impl Into<String>) -> Self {
        CamParamsError::Input {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn io(path: &Path, source: std::io::Error) -> Self {
        CamParamsError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
