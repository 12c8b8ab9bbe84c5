use log::{debug, error, info};
use rand::Rng;

use crate::config::constants;
use crate::error::CaptureError;
use crate::gallery::Photo;

/// External shutter collaborator fired at the end of a countdown.
///
/// Returns a locator for the freshly captured image.
pub trait ShutterTrigger: Send + Sync {
    fn capture(&self, flash_enabled: bool) -> Result<String, CaptureError>;
}

/// Stand-in shutter used when no camera is attached.
///
/// Every capture yields a random placeholder image URL.
#[derive(Debug, Default)]
pub struct SimulatedShutter;

impl ShutterTrigger for SimulatedShutter {
    fn capture(&self, flash_enabled: bool) -> Result<String, CaptureError> {
        let seed: u32 = rand::rng().random_range(1000..100_000);
        debug!("Simulated shutter fired (flash: {})", flash_enabled);
        Ok(format!("https://picsum.photos/400/600?random={}", seed))
    }
}

/// State of the remote capture countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    /// Counting down; the value is the number currently displayed.
    Arming(u8),
    /// Countdown elapsed, shutter is firing.
    Completing,
}

/// Result of advancing the sequencer by one tick.
#[derive(Debug)]
pub enum TickOutcome {
    /// Nothing was armed.
    Idle,
    /// Countdown moved to the given value.
    Countdown(u8),
    /// The shutter fired and produced a photo.
    Captured(Photo),
    /// The shutter failed; the sequencer is idle again.
    Failed(CaptureError),
}

/// Countdown state machine behind the remote shutter button.
///
/// The sequencer does not own a timer. Whoever drives it calls [`tick`]
/// once per countdown interval, and every tick performs exactly one
/// transition.
///
/// [`tick`]: CaptureSequencer::tick
pub struct CaptureSequencer {
    state: CaptureState,
    flash_enabled: bool,
    generation: u64,
}

impl Default for CaptureSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSequencer {
    /// Create an idle sequencer with the flash turned on.
    pub fn new() -> Self {
        Self {
            state: CaptureState::Idle,
            flash_enabled: true,
            generation: 0,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Value currently shown on the countdown overlay, if armed.
    pub fn remaining(&self) -> Option<u8> {
        match self.state {
            CaptureState::Arming(n) => Some(n),
            _ => None,
        }
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, CaptureState::Arming(_))
    }

    pub fn flash_enabled(&self) -> bool {
        self.flash_enabled
    }

    /// Identifier of the most recently started sequence.
    ///
    /// Tick drivers use it to ignore ticks scheduled for a sequence that was
    /// cancelled in the meantime.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Arm the countdown.
    ///
    /// Returns the new sequence's generation, or `None` if a sequence is
    /// already running, in which case nothing changes.
    pub fn trigger(&mut self) -> Option<u64> {
        if self.state != CaptureState::Idle {
            debug!("Capture trigger ignored: sequencer is {:?}", self.state);
            return None;
        }
        self.generation += 1;
        self.state = CaptureState::Arming(constants::COUNTDOWN_START);
        info!("Capture armed, countdown {}", constants::COUNTDOWN_START);
        Some(self.generation)
    }

    /// Abort a running countdown. Returns `false` if nothing was armed.
    pub fn cancel(&mut self) -> bool {
        if !self.is_armed() {
            return false;
        }
        self.state = CaptureState::Idle;
        info!("Capture cancelled");
        true
    }

    /// Flip the flash setting and return the new value.
    pub fn toggle_flash(&mut self) -> bool {
        self.flash_enabled = !self.flash_enabled;
        self.flash_enabled
    }

    /// Advance the countdown by one step.
    ///
    /// From `Arming(1)` the sequencer passes through `Completing`, fires the
    /// shutter and lands back in `Idle` within the same tick.
    pub fn tick(&mut self, shutter: &dyn ShutterTrigger) -> TickOutcome {
        match self.state {
            CaptureState::Idle => TickOutcome::Idle,
            CaptureState::Arming(n) if n > 1 => {
                self.state = CaptureState::Arming(n - 1);
                debug!("Countdown {}", n - 1);
                TickOutcome::Countdown(n - 1)
            }
            CaptureState::Arming(_) | CaptureState::Completing => {
                self.state = CaptureState::Completing;
                let outcome = match shutter.capture(self.flash_enabled) {
                    Ok(url) => {
                        let photo = Photo::new(url);
                        info!("Captured photo {}", photo.id);
                        TickOutcome::Captured(photo)
                    }
                    Err(e) => {
                        error!("Capture failed: {}", e);
                        TickOutcome::Failed(e)
                    }
                };
                self.state = CaptureState::Idle;
                outcome
            }
        }
    }
}
