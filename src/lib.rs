//! PixelBooth - session and capture orchestration for an unattended photo booth.
//!
//! This library is the core behind the booth's management console: it keeps
//! device telemetry ticking, runs the remote-capture countdown, and owns the
//! photo gallery together with its AI-generated captions.
//!
//! # Core Components
//!
//! * [`config`] - Configuration from environment variables, plus constants
//! * [`telemetry`] - Booth status snapshot and the telemetry simulator
//! * [`capture`] - Countdown state machine and shutter collaborator
//! * [`captioning`] - Captioning gateway that never fails to its caller
//! * [`image_fetcher`] - Photo downloads for the captioning gateway
//! * [`gallery`] - Photo collection with single-flight analysis
//! * [`session`] - The facade the presentation layer talks to
//! * [`events`] - Event subscription for the presentation layer
//! * [`ticker`] - Stoppable periodic background jobs
//! * [`error`] - Error types
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pixelbooth::*;
//!
//! let config = Config::load()?;
//! let session = BoothSession::from_config(&config);
//!
//! session.trigger_capture();
//! for event in session.subscribe() {
//!     println!("{:?}", event);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod captioning;
pub mod capture;
pub mod config;
pub mod error;
pub mod events;
pub mod gallery;
pub mod image_fetcher;
pub mod session;
pub mod telemetry;
pub mod ticker;

// Re-export commonly used types for convenience
pub use captioning::{AnalysisResult, CaptionProvider, Captioner, CaptioningGateway, GeminiProvider};
pub use capture::{CaptureSequencer, CaptureState, ShutterTrigger, SimulatedShutter, TickOutcome};
pub use config::Config;
pub use error::BoothError;
pub use events::{BoothEvent, EventBus};
pub use gallery::{AnalysisRequest, AnalysisState, Photo, PhotoCollection};
pub use image_fetcher::{HttpPhotoLoader, PhotoLoader};
pub use session::{BoothSession, SessionClock};
pub use telemetry::{BoothStatus, PrinterStatus, TelemetrySimulator, TelemetrySource};
