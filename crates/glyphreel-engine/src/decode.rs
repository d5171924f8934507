//! Decoder stages: move decoded items from a media source into the pipeline.

use glyphreel_core::{AudioBlock, AudioSource, RawVideoFrame, Result, VideoSource};
use tracing::{debug, warn};

use crate::queue::Outlet;
use crate::sync::Cancellation;

/// Forward video frames until the source is exhausted.
pub fn pump_video(mut source: Box<dyn VideoSource>, output: Outlet<RawVideoFrame>, cancel: Cancellation) {
    let _guard = cancel.guard("video decoder");
    let count = pump(|| source.next_frame(), &output, &cancel);
    if let Some(count) = count {
        debug!("Video decoder finished after {count} frames");
    }
}

/// Forward audio blocks until the source is exhausted.
pub fn pump_audio(mut source: Box<dyn AudioSource>, output: Outlet<AudioBlock>, cancel: Cancellation) {
    let _guard = cancel.guard("audio decoder");
    let count = pump(|| source.next_block(), &output, &cancel);
    if let Some(count) = count {
        debug!("Audio decoder finished after {count} blocks");
    }
}

/// Returns the number of items forwarded, or `None` if the session was
/// cancelled. The caller closes `output` by dropping it.
fn pump<T>(
    mut next: impl FnMut() -> Result<Option<T>>,
    output: &Outlet<T>,
    cancel: &Cancellation,
) -> Option<u64> {
    let mut count = 0;
    loop {
        if cancel.is_cancelled() {
            return None;
        }
        match next() {
            Ok(Some(item)) => {
                if output.send(item).is_err() {
                    return None;
                }
                count += 1;
            }
            Ok(None) => return Some(count),
            Err(e) if e.is_recoverable() => warn!("Skipping item: {e}"),
            Err(e) => {
                cancel.cancel(e);
                return None;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::queue::{bounded, Recv};
    use glyphreel_core::Error;
    use std::collections::VecDeque;

    struct Scripted(VecDeque<Result<Option<AudioBlock>>>);

    impl AudioSource for Scripted {
        fn next_block(&mut self) -> Result<Option<AudioBlock>> {
            self.0.pop_front().unwrap_or(Ok(None))
        }
    }

    fn block(len: usize) -> Result<Option<AudioBlock>> {
        Ok(Some(AudioBlock::silence(len)))
    }

    #[test]
    fn test_corrupt_items_are_skipped() {
        let cancel = Cancellation::new();
        let (outlet, inlet) = bounded(8, &cancel);
        let source = Scripted(VecDeque::from([
            block(1),
            Err(Error::CorruptFrame("bad packet".into())),
            block(2),
        ]));

        pump_audio(Box::new(source), outlet, cancel.clone());

        assert_eq!(inlet.recv(), Recv::Item(AudioBlock::silence(1)));
        assert_eq!(inlet.recv(), Recv::Item(AudioBlock::silence(2)));
        assert_eq!(inlet.recv(), Recv::Closed);
        assert!(!cancel.is_cancelled());
    }

    #[test]
    fn test_fatal_error_cancels() {
        let cancel = Cancellation::new();
        let (outlet, inlet) = bounded(8, &cancel);
        let source = Scripted(VecDeque::from([
            block(1),
            Err(Error::AudioDecode("ffmpeg exited".into())),
            block(2),
        ]));

        pump_audio(Box::new(source), outlet, cancel.clone());

        assert_eq!(inlet.recv(), Recv::Cancelled);
        assert!(matches!(cancel.take_cause(), Some(Error::AudioDecode(_))));
    }

    #[test]
    fn test_stops_when_cancelled() {
        let cancel = Cancellation::new();
        let (outlet, _inlet) = bounded(1, &cancel);
        cancel.cancel(Error::Interrupted);

        let source = Scripted(VecDeque::from([block(1), block(1), block(1)]));
        pump_audio(Box::new(source), outlet, cancel.clone());
        assert!(matches!(cancel.take_cause(), Some(Error::Interrupted)));
    }
}
