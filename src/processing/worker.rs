use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::error::{HistoError, Result};

/// Rows a pipeline processes between cancellation checks.
pub const ROW_BATCH: usize = 1024;

/// Handed to a running computation: a cancel flag to poll between row
/// batches and a channel for status text.
#[derive(Debug, Clone)]
pub struct JobContext {
    cancel: Arc<AtomicBool>,
    progress: Option<Sender<String>>,
}

impl JobContext {
    /// A context nobody listens to and nobody cancels, for running a
    /// pipeline inline.
    pub fn detached() -> Self {
        Self {
            cancel: Arc::new(AtomicBool::new(false)),
            progress: None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Ask the computation holding this context to stop at its next check.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// `Err(Cancelled)` once cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(HistoError::Cancelled);
        }
        Ok(())
    }

    pub fn report(&self, message: impl Into<String>) {
        if let Some(tx) = &self.progress {
            // The receiver may already be gone; progress is best effort.
            let _ = tx.send(message.into());
        }
    }
}

/// A computation running on its own thread.
///
/// The result lands in a shared slot that the owner polls, so the caller
/// never blocks unless it asks to via [`Job::wait`].
pub struct Job<T> {
    label: String,
    result: Arc<Mutex<Option<Result<T>>>>,
    cancel: Arc<AtomicBool>,
    progress: Receiver<String>,
    handle: Option<JoinHandle<()>>,
}

pub fn spawn_job<T, F>(label: &str, f: F) -> Job<T>
where
    T: Send + 'static,
    F: FnOnce(&JobContext) -> Result<T> + Send + 'static,
{
    let cancel = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel();
    let result: Arc<Mutex<Option<Result<T>>>> = Arc::new(Mutex::new(None));

    let ctx = JobContext {
        cancel: Arc::clone(&cancel),
        progress: Some(tx),
    };
    let result_clone = Arc::clone(&result);
    let job_label = label.to_string();
    let handle = std::thread::spawn(move || {
        let outcome = f(&ctx);
        match &outcome {
            Ok(_) => tracing::debug!("Job '{job_label}' finished"),
            Err(HistoError::Cancelled) => tracing::info!("Job '{job_label}' cancelled"),
            Err(e) => tracing::error!("Job '{job_label}' failed: {e}"),
        }
        *result_clone.lock().unwrap_or_else(|p| p.into_inner()) = Some(outcome);
    });

    Job {
        label: label.to_string(),
        result,
        cancel,
        progress: rx,
        handle: Some(handle),
    }
}

impl<T> Job<T> {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Take the result if the job has finished.
    pub fn poll(&self) -> Option<Result<T>> {
        self.result.lock().unwrap_or_else(|p| p.into_inner()).take()
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Drain status messages sent since the last call.
    pub fn progress(&self) -> Vec<String> {
        self.progress.try_iter().collect()
    }

    /// Block until the job ends and return its result.
    pub fn wait(mut self) -> Result<T> {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                return Err(HistoError::JobFailed(self.label.clone()));
            }
        }
        self.poll()
            .unwrap_or_else(|| Err(HistoError::JobFailed(self.label.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn result_is_delivered_once() {
        let job = spawn_job("sum", |ctx| {
            ctx.report("adding");
            Ok(2 + 2)
        });
        let value = {
            let mut out = None;
            for _ in 0..500 {
                if let Some(r) = job.poll() {
                    out = Some(r.unwrap());
                    break;
                }
                std::thread::sleep(Duration::from_millis(2));
            }
            out
        };
        assert_eq!(value, Some(4));
        assert!(job.poll().is_none());
        assert_eq!(job.progress(), vec!["adding".to_string()]);
    }

    #[test]
    fn cancellation_is_observed() {
        let job = spawn_job("spin", |ctx| -> Result<()> {
            loop {
                ctx.check()?;
                std::thread::sleep(Duration::from_millis(1));
            }
        });
        job.cancel();
        assert!(matches!(job.wait(), Err(HistoError::Cancelled)));
    }

    #[test]
    fn detached_context_never_cancels() {
        let ctx = JobContext::detached();
        ctx.report("ignored");
        assert!(ctx.check().is_ok());
    }
}
