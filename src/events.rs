use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};

use crate::gallery::{AnalysisState, Photo};
use crate::telemetry::BoothStatus;

/// Notification pushed to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum BoothEvent {
    /// Countdown overlay should show this value.
    Countdown(u8),
    /// The shutter fired; the photo is already in the gallery.
    CaptureCompleted(Photo),
    /// The shutter failed. Non-fatal; the operator may try again.
    CaptureFailed(String),
    CaptureCancelled,
    FlashToggled(bool),
    StatusChanged(BoothStatus),
    /// Paper dropped below the low-paper threshold.
    PaperLow(u8),
    PhotoDeleted(String),
    AnalysisFinished { photo_id: String, state: AnalysisState },
}

/// Fan-out of [`BoothEvent`]s to any number of subscribers.
///
/// Subscribers that dropped their receiver are forgotten on the next publish.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<Sender<BoothEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<BoothEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    pub fn publish(&self, event: BoothEvent) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
