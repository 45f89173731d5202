//! Handles for in-flight fetches

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinHandle;
use tracing::trace;

/// Epoch of one fetch. Every delivery carries the token of the fetch that
/// produced it; the controller drops deliveries whose token is not the
/// active one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskToken(u64);

impl TaskToken {
    pub(crate) fn new(epoch: u64) -> Self {
        Self(epoch)
    }

    pub fn epoch(&self) -> u64 {
        self.0
    }
}

/// Shared between a task handle and the deliveries it produced
#[derive(Debug, Clone, Default)]
pub(crate) struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Returns `true` only for the call that actually flipped the flag
    fn raise(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct CancellableTask {
    token: TaskToken,
    flag: CancelFlag,
    handle: JoinHandle<()>,
}

impl CancellableTask {
    pub(crate) fn new(token: TaskToken, flag: CancelFlag, handle: JoinHandle<()>) -> Self {
        Self { token, flag, handle }
    }

    pub fn token(&self) -> TaskToken {
        self.token
    }

    /// Idempotent. Deliveries of this task that were not received yet are
    /// discarded, and the worker is aborted if it is still running.
    pub fn cancel(&self) {
        if self.flag.raise() {
            trace!(epoch = self.token.epoch(), "cancelling fetch");
            self.handle.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.is_raised()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Holds the single active task of a controller.
#[derive(Debug, Default)]
pub(crate) struct TaskSlot {
    active: Option<CancellableTask>,
}

impl TaskSlot {
    /// Install `task` as the active one, cancelling whatever was there
    pub(crate) fn replace(&mut self, task: CancellableTask) {
        if let Some(previous) = self.active.replace(task) {
            previous.cancel();
        }
    }

    /// Returns whether there was a task to cancel
    pub(crate) fn cancel(&mut self) -> bool {
        match self.active.take() {
            Some(task) => {
                task.cancel();
                true
            }
            None => false,
        }
    }

    pub(crate) fn is_current(&self, token: TaskToken) -> bool {
        self.active
            .as_ref()
            .is_some_and(|task| task.token() == token && !task.is_cancelled())
    }

    /// The task delivered its final result; forget it without cancelling
    pub(crate) fn finish(&mut self, token: TaskToken) {
        if self.is_current(token) {
            self.active = None;
        }
    }

    pub(crate) fn token(&self) -> Option<TaskToken> {
        self.active.as_ref().map(CancellableTask::token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    fn pending_task(epoch: u64) -> (CancellableTask, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            // Keeps `tx` alive until the task is aborted
            std::future::pending::<()>().await;
            drop(tx);
        });
        (CancellableTask::new(TaskToken::new(epoch), CancelFlag::default(), handle), rx)
    }

    #[tokio::test]
    async fn test_cancel_aborts_worker() {
        let (task, rx) = pending_task(1);

        task.cancel();

        // Aborting drops the future, and with it the sender
        assert!(rx.await.is_err());
        assert!(task.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let (task, _rx) = pending_task(1);

        task.cancel();
        task.cancel();
        task.cancel();

        assert!(task.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_after_completion_is_noop() {
        let handle = tokio::spawn(async {});
        let task = CancellableTask::new(TaskToken::new(3), CancelFlag::default(), handle);
        while !task.is_finished() {
            tokio::task::yield_now().await;
        }

        task.cancel();

        assert!(task.is_finished());
    }

    #[tokio::test]
    async fn test_slot_replace_cancels_previous() {
        let mut slot = TaskSlot::default();
        let (first, first_rx) = pending_task(1);
        let (second, _second_rx) = pending_task(2);

        slot.replace(first);
        assert!(slot.is_current(TaskToken::new(1)));

        slot.replace(second);
        assert!(first_rx.await.is_err());
        assert!(!slot.is_current(TaskToken::new(1)));
        assert!(slot.is_current(TaskToken::new(2)));
    }

    #[tokio::test]
    async fn test_slot_finish_keeps_worker_alone() {
        let mut slot = TaskSlot::default();
        let (task, _rx) = pending_task(5);
        slot.replace(task);

        slot.finish(TaskToken::new(4));
        assert_eq!(slot.token(), Some(TaskToken::new(5)));

        slot.finish(TaskToken::new(5));
        assert_eq!(slot.token(), None);
        assert!(!slot.cancel());
    }
}
