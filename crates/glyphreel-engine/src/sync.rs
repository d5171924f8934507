//! Session-wide stop and completion signals.
//!
//! [`Cancellation`] is the error-driven stop: set once, by whichever stage
//! fails first (or by the interrupt watcher), observed by every blocking wait.
//! [`Completion`] is the graceful end: it fires only after both the audio and
//! the video path reached end of stream, and never once cancellation is set.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender};
use glyphreel_core::Error;
use parking_lot::Mutex;
use tracing::{debug, error, info};

/// A one-shot broadcast signal.
///
/// Waiters hold a receiver of a channel nobody ever sends on; firing drops
/// the only sender, which wakes every `recv` and `select!` on it at once.
#[derive(Debug, Clone)]
pub struct Latch {
    sender: Arc<Mutex<Option<Sender<()>>>>,
    receiver: Receiver<()>,
}

impl Latch {
    pub fn new() -> Self {
        let (sender, receiver) = bounded(0);
        Self {
            sender: Arc::new(Mutex::new(Some(sender))),
            receiver,
        }
    }

    /// Fire the latch. Returns false if it had already fired.
    pub fn fire(&self) -> bool {
        self.sender.lock().take().is_some()
    }

    pub fn is_fired(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Receiver that becomes ready (disconnected) once the latch fires.
    pub const fn receiver(&self) -> &Receiver<()> {
        &self.receiver
    }

    /// Block until the latch fires.
    pub fn wait(&self) {
        let _ = self.receiver.recv();
    }
}

impl Default for Latch {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct CancelInner {
    cancelled: AtomicBool,
    cause: Mutex<Option<Error>>,
    latch: Latch,
}

/// First-cause-wins stop signal shared by every stage of one session.
#[derive(Debug, Clone)]
pub struct Cancellation {
    inner: Arc<CancelInner>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CancelInner {
                cancelled: AtomicBool::new(false),
                cause: Mutex::new(None),
                latch: Latch::new(),
            }),
        }
    }

    /// Cancel the session with `cause`.
    ///
    /// Only the first call wins and returns true; later causes are logged and
    /// dropped.
    pub fn cancel(&self, cause: Error) -> bool {
        if self
            .inner
            .cancelled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Already cancelled, ignoring: {cause}");
            return false;
        }

        if cause.is_interrupt() {
            info!("Playback interrupted");
        } else {
            error!("Stopping playback: {cause}");
        }
        *self.inner.cause.lock() = Some(cause);
        self.inner.latch.fire();
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Receiver that becomes ready once the session is cancelled, for use in
    /// `select!`.
    pub fn receiver(&self) -> &Receiver<()> {
        self.inner.latch.receiver()
    }

    /// Take the recorded cause. Meant for the controller once every stage
    /// has exited.
    pub fn take_cause(&self) -> Option<Error> {
        self.inner.cause.lock().take()
    }

    /// Guard that turns a panic of the current thread into a cancellation.
    ///
    /// Create it before anything owning a queue endpoint so that it drops
    /// last and the cause is recorded before downstream stages see the queue
    /// close.
    pub fn guard(&self, stage: &'static str) -> StageGuard {
        StageGuard {
            cancel: self.clone(),
            stage,
        }
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

/// See [`Cancellation::guard`].
#[derive(Debug)]
pub struct StageGuard {
    cancel: Cancellation,
    stage: &'static str,
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.cancel.cancel(Error::StagePanicked(self.stage));
        }
    }
}

#[derive(Debug, Default)]
struct Finished {
    audio: bool,
    video: bool,
}

/// Tracks normal end of stream of the audio and video paths.
#[derive(Debug, Clone)]
pub struct Completion {
    finished: Arc<Mutex<Finished>>,
    done: Latch,
    cancel: Cancellation,
}

impl Completion {
    pub fn new(cancel: Cancellation) -> Self {
        Self {
            finished: Arc::new(Mutex::new(Finished::default())),
            done: Latch::new(),
            cancel,
        }
    }

    /// The audio path played its stream to the end.
    pub fn audio_finished(&self) {
        debug!("Audio finished");
        self.mark(|f| f.audio = true);
    }

    /// The video path presented its last frame.
    pub fn video_finished(&self) {
        debug!("Video finished");
        self.mark(|f| f.video = true);
    }

    fn mark(&self, set: impl FnOnce(&mut Finished)) {
        let mut finished = self.finished.lock();
        set(&mut finished);
        if finished.audio && finished.video && !self.cancel.is_cancelled() && self.done.fire() {
            info!("Playback finished normally");
        }
    }

    /// True once both paths finished without cancellation.
    pub fn is_done(&self) -> bool {
        self.done.is_fired()
    }

    /// Receiver that becomes ready once playback finished normally.
    pub const fn receiver(&self) -> &Receiver<()> {
        self.done.receiver()
    }

    /// Block until playback finished normally.
    pub fn wait(&self) {
        self.done.wait();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_latch_wakes_all_waiters() {
        let latch = Latch::new();
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let latch = latch.clone();
                thread::spawn(move || latch.wait())
            })
            .collect();

        assert!(latch.fire());
        assert!(!latch.fire());
        for waiter in waiters {
            waiter.join().unwrap();
        }
        assert!(latch.is_fired());
    }

    #[test]
    fn test_first_cause_wins() {
        let cancel = Cancellation::new();
        assert!(!cancel.is_cancelled());

        assert!(cancel.cancel(Error::AudioOutput("no device".into())));
        assert!(!cancel.cancel(Error::Interrupted));
        assert!(cancel.is_cancelled());
        assert!(cancel.receiver().recv().is_err());

        assert!(matches!(cancel.take_cause(), Some(Error::AudioOutput(_))));
    }

    #[test]
    fn test_concurrent_cancel_keeps_one_cause() {
        let cancel = Cancellation::new();
        let winners: usize = (0..8)
            .map(|i| {
                let cancel = cancel.clone();
                thread::spawn(move || cancel.cancel(Error::Internal(format!("stage {i}"))))
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| usize::from(h.join().unwrap()))
            .sum();

        assert_eq!(winners, 1);
        assert!(cancel.take_cause().is_some());
        assert!(cancel.take_cause().is_none());
    }

    #[test]
    fn test_guard_records_panic() {
        let cancel = Cancellation::new();
        let stage_cancel = cancel.clone();
        let result = thread::spawn(move || {
            let _guard = stage_cancel.guard("converter");
            panic!("boom");
        })
        .join();

        assert!(result.is_err());
        assert!(matches!(
            cancel.take_cause(),
            Some(Error::StagePanicked("converter"))
        ));
    }

    #[test]
    fn test_guard_is_silent_without_panic() {
        let cancel = Cancellation::new();
        drop(cancel.guard("pacer"));
        assert!(!cancel.is_cancelled());
    }

    #[test]
    fn test_completion_needs_both_paths() {
        let completion = Completion::new(Cancellation::new());

        completion.video_finished();
        assert!(!completion.is_done());
        completion.video_finished();
        assert!(!completion.is_done());

        completion.audio_finished();
        assert!(completion.is_done());
        assert_eq!(
            completion.receiver().recv_timeout(Duration::from_millis(10)),
            Err(crossbeam_channel::RecvTimeoutError::Disconnected)
        );
    }

    #[test]
    fn test_completion_never_fires_after_cancel() {
        let cancel = Cancellation::new();
        let completion = Completion::new(cancel.clone());

        completion.audio_finished();
        cancel.cancel(Error::Interrupted);
        completion.video_finished();

        assert!(!completion.is_done());
    }
}
