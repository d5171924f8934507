//! The converter stage: raw frames in, display frames out.

use std::time::Instant;

use glyphreel_core::{DisplayFrame, FrameRenderer, RawVideoFrame};
use tracing::{debug, trace, warn};

use crate::queue::{Inlet, Outlet, Recv};
use crate::sync::Cancellation;

pub struct Converter {
    input: Inlet<RawVideoFrame>,
    output: Outlet<DisplayFrame>,
    renderer: Box<dyn FrameRenderer>,
    cancel: Cancellation,
}

impl Converter {
    pub fn new(
        input: Inlet<RawVideoFrame>,
        output: Outlet<DisplayFrame>,
        renderer: Box<dyn FrameRenderer>,
        cancel: Cancellation,
    ) -> Self {
        Self {
            input,
            output,
            renderer,
            cancel,
        }
    }

    /// Convert frames in order until the input closes, then close the output.
    pub fn run(mut self) {
        let _guard = self.cancel.guard("converter");

        loop {
            let frame = match self.input.recv() {
                Recv::Item(frame) => frame,
                Recv::Closed => {
                    debug!("Converter input closed");
                    return;
                }
                Recv::Cancelled => return,
            };

            let started = Instant::now();
            let converted = match self.renderer.render(frame) {
                Ok(converted) => converted,
                Err(e) if e.is_recoverable() => {
                    warn!("Skipping frame: {e}");
                    continue;
                }
                Err(e) => {
                    self.cancel.cancel(e);
                    return;
                }
            };
            trace!("Converted frame in {:?}", started.elapsed());

            if self.output.send(converted).is_err() {
                return;
            }
        }
    }
}
