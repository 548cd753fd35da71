use std::{any::Any, fmt};

pub trait ExpectWithTracing<T> {
    fn expectx<S: AsRef<str>>(self, msg: S) -> T;
}

impl<T, E: fmt::Debug> ExpectWithTracing<T> for Result<T, E> {
    fn expectx<S: AsRef<str>>(self, msg: S) -> T {
        match self {
            Ok(o) => {
                log::trace!("{}", msg.as_ref());
                o
            }
            Err(e) => {
                let msg = format!("{} failed with: {:?}", msg.as_ref(), e);
                log::error!("{}", msg);
                panic!("{}", msg)
            }
        }
    }
}

/// Reading the clipboard failed (locked by another process, no display, ...).
///
/// Never fatal: the poller logs it and tries again after one interval.
#[derive(Debug)]
pub struct AcquisitionError(pub anyhow::Error);

impl fmt::Display for AcquisitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "clipboard acquisition failed: {:#}", self.0)
    }
}

impl std::error::Error for AcquisitionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

/// Why the polling worker ended without being asked to.
#[derive(Debug)]
pub enum WorkerError {
    /// The loop body returned an error.
    Failed(anyhow::Error),
    /// The loop body panicked.
    Panicked(String),
}

impl WorkerError {
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let msg = if let Some(s) = payload.downcast_ref::<&'static str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        WorkerError::Panicked(msg)
    }
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerError::Failed(e) => write!(f, "worker failed: {:#}", e),
            WorkerError::Panicked(msg) => write!(f, "worker panicked: {}", msg),
        }
    }
}

impl std::error::Error for WorkerError {}
