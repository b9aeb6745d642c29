//! Per-document configuration and the soft-error channel.

use log::warn;
use thiserror::Error;

use crate::format::DEFAULT_FILE_CREATOR;

/// Non-fatal conditions. Execution continues and the caller gets an empty
/// result or the overwritten record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SoftError {
    #[error("overwritten \"{path}\"")]
    DuplicateKeyOverwrite { path: String },
    #[error("there is no data object with the key \"{path}\"")]
    MissingKey { path: String },
}

/// Receives soft errors from a [`Document`](crate::Document).
pub trait SoftErrorSink: Send {
    fn report(&mut self, error: &SoftError);
}

impl<F> SoftErrorSink for F
where
    F: FnMut(&SoftError) + Send,
{
    fn report(&mut self, error: &SoftError) {
        self(error)
    }
}

/// Default sink: forwards to `log::warn!` under target `psf::soft`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl SoftErrorSink for LogSink {
    fn report(&mut self, error: &SoftError) {
        warn!(target: "psf::soft", "{error}");
    }
}

/// Construction-time settings for a [`Document`](crate::Document).
pub struct Options {
    /// Report [`SoftError::MissingKey`]. Overwrites are always reported.
    pub show_soft_errors: bool,
    /// Written into the `File Creator:` line of newly created documents.
    pub file_creator: String,
    pub(crate) sink: Box<dyn SoftErrorSink>,
}

impl Options {
    pub fn with_sink(mut self, sink: impl SoftErrorSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn show_soft_errors(mut self, show: bool) -> Self {
        self.show_soft_errors = show;
        self
    }

    pub fn file_creator(mut self, creator: impl Into<String>) -> Self {
        self.file_creator = creator.into();
        self
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            show_soft_errors: true,
            file_creator: DEFAULT_FILE_CREATOR.to_string(),
            sink: Box::new(LogSink),
        }
    }
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("show_soft_errors", &self.show_soft_errors)
            .field("file_creator", &self.file_creator)
            .finish_non_exhaustive()
    }
}
