use std::future::Future;

use tokio::task::AbortHandle;

/// Owned set of pending timed tasks that can be cancelled together.
///
/// Dropping the set cancels everything still pending.
#[derive(Debug, Default)]
pub struct TimerSet {
    handles: Vec<AbortHandle>,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task` on the current runtime and track it.
    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handles.retain(|h| !h.is_finished());
        let handle = tokio::spawn(task);
        self.handles.push(handle.abort_handle());
    }

    /// Abort every tracked task. Calling this twice is harmless.
    pub fn cancel_all(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }

    /// Number of tracked tasks that have not finished yet.
    pub fn pending(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.pending() == 0
    }
}

impl Drop for TimerSet {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
