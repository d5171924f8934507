//! The presenter stage: writes paced frames to the terminal.

use std::io::{self, Write};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::terminal::{Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};
use glyphreel_core::{DisplayFrame, Error, Result};
use tracing::{debug, warn};

use crate::queue::{Inlet, Recv};
use crate::sync::{Cancellation, Completion};

fn display_error(e: io::Error) -> Error {
    Error::Display(e.to_string())
}

pub struct Presenter {
    input: Inlet<DisplayFrame>,
    output: Box<dyn Write + Send>,
    alternate_screen: bool,
    entered: bool,
    cancel: Cancellation,
    completion: Completion,
}

impl Presenter {
    pub fn new(
        input: Inlet<DisplayFrame>,
        output: Box<dyn Write + Send>,
        alternate_screen: bool,
        cancel: Cancellation,
        completion: Completion,
    ) -> Self {
        Self {
            input,
            output,
            alternate_screen,
            entered: false,
            cancel,
            completion,
        }
    }

    pub fn run(mut self) {
        let _guard = self.cancel.guard("presenter");

        match self.present_all() {
            Ok(true) => {
                self.leave();
                self.completion.video_finished();
            }
            Ok(false) => {}
            Err(e) => {
                self.cancel.cancel(e);
            }
        }
    }

    /// Returns true at end of stream, false if cancelled.
    fn present_all(&mut self) -> Result<bool> {
        self.enter()?;
        let mut frames = 0u64;
        loop {
            match self.input.recv() {
                Recv::Item(frame) => {
                    self.present(&frame)?;
                    frames += 1;
                }
                Recv::Closed => {
                    debug!("Presented {frames} frames");
                    return Ok(true);
                }
                Recv::Cancelled => return Ok(false),
            }
        }
    }

    fn present(&mut self, frame: &DisplayFrame) -> Result<()> {
        if frame.needs_clear() {
            queue!(self.output, Clear(ClearType::All)).map_err(display_error)?;
        }
        queue!(self.output, MoveTo(0, 0)).map_err(display_error)?;
        self.output.write_all(frame.payload()).map_err(display_error)?;
        self.output.flush().map_err(display_error)
    }

    fn enter(&mut self) -> Result<()> {
        if self.alternate_screen && !self.entered {
            execute!(self.output, EnterAlternateScreen, Hide)
                .map_err(|e| Error::Terminal(e.to_string()))?;
            self.entered = true;
        }
        Ok(())
    }

    fn leave(&mut self) {
        if self.entered {
            self.entered = false;
            if let Err(e) = execute!(self.output, Show, LeaveAlternateScreen) {
                warn!("Failed to restore terminal: {e}");
            }
        }
    }
}

impl Drop for Presenter {
    fn drop(&mut self) {
        self.leave();
    }
}
