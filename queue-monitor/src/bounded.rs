use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::warn;

use crate::error::{Error, Result};

/// Runs a blocking call on a helper thread and waits for it at most
/// `timeout`.
///
/// Screen grabs and OCR go through external engines that can hang. When that
/// happens the call is abandoned and its thread is left detached. Until that
/// thread finishes, further calls fail immediately, so a wedged engine costs
/// one thread rather than one per tick.
pub struct BoundedWorker {
    name: String,
    timeout: Duration,
    busy: Arc<AtomicBool>,
}

impl BoundedWorker {
    pub fn new(name: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            timeout,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True while an abandoned call is still running.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn run<T, F>(&self, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(format!("previous {} call is still running", self.name).into());
        }

        let (tx, rx) = sync_channel::<Result<T>>(1);
        let busy = self.busy.clone();
        let spawned = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || {
                let guard = ClearOnDrop(busy);
                let result = job();
                drop(guard);
                // The receiver is gone if the caller already gave up.
                let _ = tx.send(result);
            });
        if let Err(e) = spawned {
            self.busy.store(false, Ordering::Release);
            return Err(Error::from(e).context(format!("spawning {} thread", self.name)));
        }

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "[{}] abandoning call after {}ms",
                    self.name,
                    self.timeout.as_millis()
                );
                Err(format!("{} timed out after {}ms", self.name, self.timeout.as_millis()).into())
            }
            Err(RecvTimeoutError::Disconnected) => {
                // The job panicked. The guard may not have run before the
                // channel closed, so clear the flag here too.
                self.busy.store(false, Ordering::Release);
                Err(format!("{} thread panicked", self.name).into())
            }
        }
    }
}

/// Clears the busy flag even when the job unwinds.
struct ClearOnDrop(Arc<AtomicBool>);

impl Drop for ClearOnDrop {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
