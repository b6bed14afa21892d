//! Shared stream context: user log/error callbacks, cancellation, and the
//! first-fatal-error slot consulted when the stream completes.

use std::sync::{Arc, Mutex};

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::error::{ErrorKind, StreamError};

/// User-supplied log callback. Absent by default; a missing callback is a
/// no-op.
pub type LogFn = Arc<dyn Fn(&str) + Send + Sync>;

/// User-supplied error callback invoked for every reported [`StreamError`].
pub type ErrorFn = Arc<dyn Fn(&StreamError) + Send + Sync>;

/// Context attached to every stage of a stream. Cloning is cheap; all
/// clones share the same cancellation token and fatal-error slot.
#[derive(Clone, Default)]
pub struct StreamContext {
    logf: Option<LogFn>,
    errf: Option<ErrorFn>,
    cancel: CancellationToken,
    fatal: Arc<Mutex<Option<StreamError>>>,
}

impl StreamContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log_fn(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.logf = Some(Arc::new(f));
        self
    }

    pub fn with_error_fn(mut self, f: impl Fn(&StreamError) + Send + Sync + 'static) -> Self {
        self.errf = Some(Arc::new(f));
        self
    }

    /// Use a caller-owned token, e.g. one cancelled by an external deadline.
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Invoke the user log callback, if one is set.
    pub fn log(&self, msg: &str) {
        if let Some(f) = &self.logf {
            f(msg);
        }
    }

    /// Report an error to the user error callback. Without one, the error
    /// falls back to the log callback and is otherwise dropped.
    pub fn report(&self, err: &StreamError) {
        match &self.errf {
            Some(f) => f(err),
            None => self.log(&err.to_string()),
        }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Record the stream's fatal error; the first write wins.
    pub fn set_fatal(&self, err: StreamError) {
        let mut slot = self.fatal.lock().expect("fatal slot poisoned");
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    pub fn take_fatal(&self) -> Option<StreamError> {
        self.fatal.lock().expect("fatal slot poisoned").take()
    }

    /// Apply the stream error policy to a raised error. Returns `false`
    /// when the raising stage must terminate.
    pub fn raise(&self, err: StreamError) -> bool {
        self.report(&err);
        match err.kind() {
            ErrorKind::General => true,
            ErrorKind::Cancel => {
                tracing::debug!(error = %err, "stream cancelled by stage error");
                self.set_fatal(err);
                self.cancel.cancel();
                true
            }
            ErrorKind::Panic => {
                tracing::debug!(error = %err, "stage terminating on panic error");
                self.set_fatal(err);
                false
            }
        }
    }
}
