//! Bounded single-producer/single-consumer queues between pipeline stages.
//!
//! A full queue blocks its producer and an empty one blocks its consumer;
//! that is the only backpressure in the pipeline. Every blocking wait also
//! watches the session's [`Cancellation`] and gives up as soon as it is set.

use crossbeam_channel::{select, Receiver, Sender};

use crate::sync::Cancellation;

/// Depth of the decoded audio, converted frame and paced frame queues.
pub const STRICT_DEPTH: usize = 1;

/// The session was cancelled while waiting on a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// Result of waiting on an [`Inlet`].
#[derive(Debug, PartialEq, Eq)]
pub enum Recv<T> {
    Item(T),
    /// The producer finished and the queue is drained.
    Closed,
    Cancelled,
}

/// Producing end of a queue. Dropping it closes the queue.
#[derive(Debug)]
pub struct Outlet<T> {
    sender: Sender<T>,
    cancel: Cancellation,
}

/// Consuming end of a queue.
#[derive(Debug)]
pub struct Inlet<T> {
    receiver: Receiver<T>,
    cancel: Cancellation,
}

/// Create a queue holding at most `depth` items.
pub fn bounded<T>(depth: usize, cancel: &Cancellation) -> (Outlet<T>, Inlet<T>) {
    let (sender, receiver) = crossbeam_channel::bounded(depth);
    (
        Outlet {
            sender,
            cancel: cancel.clone(),
        },
        Inlet {
            receiver,
            cancel: cancel.clone(),
        },
    )
}

impl<T> Outlet<T> {
    /// Push `item`, blocking while the queue is full.
    ///
    /// Returns `Err(Cancelled)` if the session is cancelled first, or if the
    /// consumer is gone (which only happens when it stopped early).
    pub fn send(&self, item: T) -> Result<(), Cancelled> {
        if self.cancel.is_cancelled() {
            return Err(Cancelled);
        }
        select! {
            send(self.sender, item) -> sent => sent.map_err(|_| Cancelled),
            recv(self.cancel.receiver()) -> _ => Err(Cancelled),
        }
    }

    /// Close the queue so the consumer sees [`Recv::Closed`] once drained.
    pub fn close(self) {}
}

impl<T> Inlet<T> {
    /// Pop the next item, blocking while the queue is empty.
    pub fn recv(&self) -> Recv<T> {
        if self.cancel.is_cancelled() {
            return Recv::Cancelled;
        }
        select! {
            recv(self.receiver) -> item => match item {
                Ok(item) => Recv::Item(item),
                // A producer that failed records its cause before dropping
                // its outlet, so a close seen under cancellation is not an end
                // of stream
                Err(_) if self.cancel.is_cancelled() => Recv::Cancelled,
                Err(_) => Recv::Closed,
            },
            recv(self.cancel.receiver()) -> _ => Recv::Cancelled,
        }
    }
}
