//! The booth session: one facade over telemetry, capture and the gallery.
//!
//! A [`BoothSession`] is the single owner of everything the console shows.
//! With [`SessionClock::Timed`] it runs its own telemetry and countdown
//! tickers, which stop when the session is shut down or dropped. With
//! [`SessionClock::Manual`] nothing is scheduled and the embedder advances
//! time through [`BoothSession::tick_telemetry`] and
//! [`BoothSession::tick_countdown`].

use std::ops::ControlFlow;
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{error, info, warn};

use crate::captioning::{AnalysisResult, Captioner, CaptioningGateway};
use crate::capture::{CaptureSequencer, CaptureState, ShutterTrigger, SimulatedShutter, TickOutcome};
use crate::config::Config;
use crate::events::{BoothEvent, EventBus};
use crate::gallery::{AnalysisRequest, AnalysisState, Photo, PhotoCollection, demo_photos};
use crate::telemetry::{BoothStatus, TelemetrySimulator, TelemetrySource};
use crate::ticker::Ticker;

/// How a session advances time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionClock {
    /// Nothing is scheduled; call the `tick_*` methods explicitly.
    Manual,
    /// Background tickers drive telemetry and the capture countdown.
    Timed {
        telemetry_interval: Duration,
        countdown_interval: Duration,
    },
}

struct TelemetryState {
    source: Box<dyn TelemetrySource>,
    paper_low_notified: bool,
}

/// State shared between the session and its ticker threads.
struct SessionCore {
    telemetry: Mutex<TelemetryState>,
    sequencer: Mutex<CaptureSequencer>,
    gallery: PhotoCollection,
    shutter: Arc<dyn ShutterTrigger>,
    events: EventBus,
    low_paper_threshold: u8,
}

impl SessionCore {
    fn telemetry(&self) -> MutexGuard<'_, TelemetryState> {
        self.telemetry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sequencer(&self) -> MutexGuard<'_, CaptureSequencer> {
        self.sequencer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn advance_telemetry(&self) {
        let (before, after, crossed_low) = {
            let mut telemetry = self.telemetry();
            let before = telemetry.source.current_status();
            telemetry.source.tick();
            let after = telemetry.source.current_status();
            let crossed_low = self.update_paper_latch(&mut telemetry, &after);
            (before, after, crossed_low)
        };

        if before != after {
            self.events.publish(BoothEvent::StatusChanged(after.clone()));
        }
        if crossed_low {
            warn!("Paper level low: {}%", after.paper_level);
            self.events.publish(BoothEvent::PaperLow(after.paper_level));
        }
    }

    /// Returns `true` the first time the paper level is seen below the
    /// threshold; re-arms once it is back above.
    fn update_paper_latch(&self, telemetry: &mut TelemetryState, status: &BoothStatus) -> bool {
        let low = status.is_paper_low(self.low_paper_threshold);
        let crossed = low && !telemetry.paper_low_notified;
        telemetry.paper_low_notified = low;
        crossed
    }

    /// One countdown step. `expected` pins the step to a sequence generation;
    /// `None` is returned when that sequence no longer exists.
    fn advance_countdown(&self, expected: Option<u64>) -> Option<TickOutcome> {
        let (outcome, status) = {
            let mut sequencer = self.sequencer();
            if expected.is_some_and(|generation| generation != sequencer.generation()) {
                return None;
            }
            let outcome = sequencer.tick(self.shutter.as_ref());
            let status = match &outcome {
                TickOutcome::Captured(photo) => {
                    self.gallery.insert(photo.clone());
                    let mut telemetry = self.telemetry();
                    telemetry.source.record_session();
                    Some(telemetry.source.current_status())
                }
                _ => None,
            };
            (outcome, status)
        };

        match &outcome {
            TickOutcome::Idle => {}
            TickOutcome::Countdown(n) => self.events.publish(BoothEvent::Countdown(*n)),
            TickOutcome::Captured(photo) => {
                self.events.publish(BoothEvent::CaptureCompleted(photo.clone()));
            }
            TickOutcome::Failed(e) => self.events.publish(BoothEvent::CaptureFailed(e.to_string())),
        }
        if let Some(status) = status {
            self.events.publish(BoothEvent::StatusChanged(status));
        }
        Some(outcome)
    }
}

/// Builder for [`BoothSession`].
pub struct BoothSessionBuilder {
    telemetry: Option<Box<dyn TelemetrySource>>,
    shutter: Option<Arc<dyn ShutterTrigger>>,
    captioner: Option<Arc<dyn Captioner>>,
    photos: Vec<Photo>,
    low_paper_threshold: u8,
    clock: SessionClock,
}

impl Default for BoothSessionBuilder {
    fn default() -> Self {
        let defaults = Config::default();
        Self {
            telemetry: None,
            shutter: None,
            captioner: None,
            photos: Vec::new(),
            low_paper_threshold: defaults.low_paper_threshold,
            clock: SessionClock::Manual,
        }
    }
}

impl BoothSessionBuilder {
    pub fn telemetry(mut self, source: Box<dyn TelemetrySource>) -> Self {
        self.telemetry = Some(source);
        self
    }

    pub fn shutter(mut self, shutter: Arc<dyn ShutterTrigger>) -> Self {
        self.shutter = Some(shutter);
        self
    }

    pub fn captioner(mut self, captioner: Arc<dyn Captioner>) -> Self {
        self.captioner = Some(captioner);
        self
    }

    /// Initial gallery contents, newest first.
    pub fn photos(mut self, photos: Vec<Photo>) -> Self {
        self.photos = photos;
        self
    }

    pub fn low_paper_threshold(mut self, threshold: u8) -> Self {
        self.low_paper_threshold = threshold;
        self
    }

    pub fn clock(mut self, clock: SessionClock) -> Self {
        self.clock = clock;
        self
    }

    /// Assemble the session and, for a timed clock, start the telemetry ticker.
    ///
    /// Missing collaborators default to the simulated ones: a telemetry
    /// simulator with the stock probabilities, the simulated shutter, and a
    /// captioning gateway configured from defaults.
    pub fn build(self) -> BoothSession {
        let defaults = Config::default();
        let telemetry = self.telemetry.unwrap_or_else(|| {
            Box::new(TelemetrySimulator::new(
                BoothStatus::default(),
                defaults.paper_drop_probability,
                defaults.session_bump_probability,
            ))
        });
        let shutter = self.shutter.unwrap_or_else(|| Arc::new(SimulatedShutter));
        let captioner = self
            .captioner
            .unwrap_or_else(|| Arc::new(CaptioningGateway::from_config(&defaults)));

        let events = EventBus::new();
        let listener_events = events.clone();
        let gallery = PhotoCollection::with_photos(captioner, self.photos).on_analysis_finished(
            Arc::new(move |photo_id: &str, state: AnalysisState| {
                listener_events.publish(BoothEvent::AnalysisFinished {
                    photo_id: photo_id.to_string(),
                    state,
                });
            }),
        );

        let core = Arc::new(SessionCore {
            telemetry: Mutex::new(TelemetryState {
                source: telemetry,
                paper_low_notified: false,
            }),
            sequencer: Mutex::new(CaptureSequencer::new()),
            gallery,
            shutter,
            events,
            low_paper_threshold: self.low_paper_threshold,
        });

        let telemetry_ticker = match self.clock {
            SessionClock::Timed {
                telemetry_interval, ..
            } => {
                let core = Arc::clone(&core);
                Ticker::spawn("booth-telemetry", telemetry_interval, move || {
                    core.advance_telemetry();
                    ControlFlow::Continue(())
                })
            }
            SessionClock::Manual => None,
        };

        info!("Booth session started ({:?})", self.clock);
        BoothSession {
            core,
            clock: self.clock,
            telemetry_ticker,
            countdown_ticker: Mutex::new(None),
        }
    }
}

/// Facade consumed by the presentation layer.
pub struct BoothSession {
    core: Arc<SessionCore>,
    clock: SessionClock,
    telemetry_ticker: Option<Ticker>,
    /// Always locked before the sequencer.
    countdown_ticker: Mutex<Option<Ticker>>,
}

impl BoothSession {
    pub fn builder() -> BoothSessionBuilder {
        BoothSessionBuilder::default()
    }

    /// Timed session wired to the simulated booth and the configured
    /// captioning provider.
    pub fn from_config(config: &Config) -> Self {
        let photos = if config.seed_demo_photos {
            demo_photos()
        } else {
            Vec::new()
        };

        Self::builder()
            .telemetry(Box::new(TelemetrySimulator::new(
                BoothStatus::default(),
                config.paper_drop_probability,
                config.session_bump_probability,
            )))
            .captioner(Arc::new(CaptioningGateway::from_config(config)))
            .photos(photos)
            .low_paper_threshold(config.low_paper_threshold)
            .clock(SessionClock::Timed {
                telemetry_interval: config.telemetry_interval,
                countdown_interval: config.countdown_interval,
            })
            .build()
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> Receiver<BoothEvent> {
        self.core.events.subscribe()
    }

    pub fn status(&self) -> BoothStatus {
        self.core.telemetry().source.current_status()
    }

    /// Copy of the gallery, newest first.
    pub fn photos(&self) -> Vec<Photo> {
        self.core.gallery.snapshot()
    }

    pub fn photo(&self, id: &str) -> Option<Photo> {
        self.core.gallery.get(id)
    }

    pub fn capture_state(&self) -> CaptureState {
        self.core.sequencer().state()
    }

    /// Value on the countdown overlay while a capture is armed.
    pub fn remaining_countdown(&self) -> Option<u8> {
        self.core.sequencer().remaining()
    }

    pub fn flash_enabled(&self) -> bool {
        self.core.sequencer().flash_enabled()
    }

    /// Start the remote-capture countdown.
    ///
    /// Returns `false` and changes nothing if a countdown is already running.
    pub fn trigger_capture(&self) -> bool {
        // Held until the new ticker is installed so a concurrent cancel cannot
        // stop a ticker that belongs to a later sequence.
        let mut slot = self.countdown_slot();
        let (generation, remaining) = {
            let mut sequencer = self.core.sequencer();
            match sequencer.trigger() {
                Some(generation) => (generation, sequencer.remaining()),
                None => return false,
            }
        };
        if let Some(n) = remaining {
            self.core.events.publish(BoothEvent::Countdown(n));
        }

        if let SessionClock::Timed {
            countdown_interval, ..
        } = self.clock
        {
            let core = Arc::clone(&self.core);
            let ticker = Ticker::spawn("capture-countdown", countdown_interval, move || {
                match core.advance_countdown(Some(generation)) {
                    Some(TickOutcome::Countdown(_)) => ControlFlow::Continue(()),
                    _ => ControlFlow::Break(()),
                }
            });

            let Some(ticker) = ticker else {
                self.core.sequencer().cancel();
                error!("Capture aborted: countdown timer could not be started");
                self.core.events.publish(BoothEvent::CaptureFailed(
                    "countdown timer could not be started".to_string(),
                ));
                return false;
            };

            let previous = slot.replace(ticker);
            drop(previous);
        }
        true
    }

    /// Abort a running countdown. Returns `false` if nothing was armed.
    pub fn cancel_capture(&self) -> bool {
        let mut slot = self.countdown_slot();
        if !self.core.sequencer().cancel() {
            return false;
        }
        if let Some(ticker) = slot.take() {
            ticker.stop();
        }
        drop(slot);
        self.core.events.publish(BoothEvent::CaptureCancelled);
        true
    }

    /// Flip the flash setting and return the new value.
    pub fn toggle_flash(&self) -> bool {
        let enabled = self.core.sequencer().toggle_flash();
        info!("Flash {}", if enabled { "enabled" } else { "disabled" });
        self.core.events.publish(BoothEvent::FlashToggled(enabled));
        enabled
    }

    /// Remove a photo from the gallery. Unknown ids are ignored.
    pub fn delete_photo(&self, id: &str) -> bool {
        let removed = self.core.gallery.delete(id);
        if removed {
            self.core.events.publish(BoothEvent::PhotoDeleted(id.to_string()));
        }
        removed
    }

    /// Ask for an AI caption of a photo.
    pub fn request_analysis(&self, id: &str) -> AnalysisRequest {
        self.core.gallery.request_analysis(id)
    }

    /// Open a photo in the detail view.
    pub fn select_photo(&self, id: &str) -> Option<Photo> {
        self.core.gallery.select(id)
    }

    pub fn clear_selection(&self) {
        self.core.gallery.clear_selection();
    }

    pub fn selected_photo(&self) -> Option<Photo> {
        self.core.gallery.selected()
    }

    /// Caption shown in the detail view, if the selected photo has one.
    pub fn displayed_analysis(&self) -> Option<AnalysisResult> {
        self.core.gallery.displayed_analysis()
    }

    /// Record a paper refill.
    pub fn refill_paper(&self, level: u8) {
        let status = {
            let mut telemetry = self.core.telemetry();
            telemetry.source.reset_paper(level);
            let status = telemetry.source.current_status();
            self.core.update_paper_latch(&mut telemetry, &status);
            status
        };
        info!("Paper refilled to {}%", status.paper_level);
        self.core.events.publish(BoothEvent::StatusChanged(status));
    }

    /// Advance telemetry by one period.
    pub fn tick_telemetry(&self) {
        self.core.advance_telemetry();
    }

    /// Advance the capture countdown by one step.
    pub fn tick_countdown(&self) -> TickOutcome {
        self.core.advance_countdown(None).unwrap_or(TickOutcome::Idle)
    }

    /// Stop every background ticker. Idempotent.
    pub fn shutdown(&mut self) {
        let countdown = self.countdown_slot().take();
        if let Some(ticker) = countdown {
            ticker.stop();
        }
        if let Some(ticker) = self.telemetry_ticker.take() {
            ticker.stop();
            info!("Booth session stopped");
        }
    }

    fn countdown_slot(&self) -> MutexGuard<'_, Option<Ticker>> {
        self.countdown_ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for BoothSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}
