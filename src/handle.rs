use super::errors::PoolError;
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::sync::oneshot;

/// Creates a single-use completion signal.
///
/// The Collector holds the sender and fires it once the result queue is
/// closed and drained; the pool controller waits on the receiving half.
pub(crate) fn completion() -> (CompletionSender, Completion) {
    let (sender, receiver) = oneshot::channel();
    (CompletionSender { sender }, Completion { receiver })
}

pub(crate) struct CompletionSender {
    sender: oneshot::Sender<usize>,
}

impl CompletionSender {
    /// Signals that `delivered` outcomes were handed to the result handler.
    pub(crate) fn fire(self, delivered: usize) {
        // The controller only goes away while unwinding.
        let _ = self.sender.send(delivered);
    }
}

/// The waiting half of the completion signal.
///
/// Resolves to the number of delivered outcomes, or to
/// [`PoolError::Abandoned`] if the sender was dropped without firing.
pub(crate) struct Completion {
    receiver: oneshot::Receiver<usize>,
}

impl Completion {
    /// Blocks the current OS thread until the signal fires.
    ///
    /// Panics if called from within an async execution context.
    pub(crate) fn wait_blocking(self) -> Result<usize, PoolError> {
        self.receiver.blocking_recv().map_err(|_| PoolError::Abandoned)
    }
}

impl Future for Completion {
    type Output = Result<usize, PoolError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Ready(res) => Poll::Ready(res.map_err(|_| PoolError::Abandoned)),
            Poll::Pending => Poll::Pending,
        }
    }
}
