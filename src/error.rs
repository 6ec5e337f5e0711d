//! Failure taxonomy of a capture run.
//!
//! Functions in this crate return [`anyhow::Result`]; when a
//! failure belongs to one of the categories below, the root
//! cause is a [`CaptureError`] and can be recovered with
//! `err.downcast_ref::<CaptureError>()`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    /// The camera device or replay file could not be opened.
    #[error("could not initialize camera: {0}")]
    Initialization(String),

    /// A `read()` on the camera did not produce a usable frame.
    #[error("could not read frame from camera: {0}")]
    ReadFailure(String),

    /// Statistics were requested over zero samples.
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// An artifact with the same name is already present.
    #[error("refusing to overwrite existing file `{}`", .0.display())]
    OutputExists(PathBuf),
}

impl CaptureError {
    pub fn initialization<S: Into<String>>(msg: S) -> Self {
        CaptureError::Initialization(msg.into())
    }

    pub fn read_failure<S: Into<String>>(msg: S) -> Self {
        CaptureError::ReadFailure(msg.into())
    }

    /// Whether `err` (or anything in its chain) is a
    /// [`CaptureError::ReadFailure`].
    pub fn is_read_failure(err: &anyhow::Error) -> bool {
        err.chain().any(|e| {
            matches!(
                e.downcast_ref::<CaptureError>(),
                Some(CaptureError::ReadFailure(_))
            )
        })
    }
}
