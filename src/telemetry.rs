use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::constants;

/// Printer state reported by the booth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrinterStatus {
    Ready,
    Printing,
    Error,
    Offline,
}

/// Snapshot of the booth hardware as shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoothStatus {
    pub is_online: bool,
    /// Remaining paper in percent, always within `0..=100`.
    pub paper_level: u8,
    pub printer_status: PrinterStatus,
    pub session_count: u64,
    pub revenue: f64,
}

impl Default for BoothStatus {
    fn default() -> Self {
        Self {
            is_online: true,
            paper_level: constants::INITIAL_PAPER_LEVEL,
            printer_status: PrinterStatus::Ready,
            session_count: constants::INITIAL_SESSION_COUNT,
            revenue: constants::INITIAL_REVENUE,
        }
    }
}

impl BoothStatus {
    /// Whether the paper level is strictly below `threshold` percent.
    pub fn is_paper_low(&self, threshold: u8) -> bool {
        self.paper_level < threshold
    }
}

/// Source of booth telemetry.
///
/// The session ticks its source on a fixed period and reads snapshots from it.
/// The bundled [`TelemetrySimulator`] is synthetic; a hardware-status feed can
/// be dropped in by implementing this trait.
pub trait TelemetrySource: Send {
    /// Current status snapshot.
    fn current_status(&self) -> BoothStatus;

    /// Advance the source by one period. Must never fail.
    fn tick(&mut self);

    /// Record one completed capture session.
    fn record_session(&mut self);

    /// Set the paper level after an operator refill, clamped to 100.
    fn reset_paper(&mut self, level: u8);
}

/// Synthetic telemetry feed that randomly consumes paper and logs sessions.
pub struct TelemetrySimulator {
    status: BoothStatus,
    paper_drop_probability: f64,
    session_bump_probability: f64,
    rng: StdRng,
}

impl TelemetrySimulator {
    /// Create a simulator seeded from the operating system.
    ///
    /// # Arguments
    ///
    /// * `status` - Initial snapshot
    /// * `paper_drop_probability` - Chance per tick of consuming 1% of paper
    /// * `session_bump_probability` - Chance per tick of an extra session
    ///
    /// Probabilities are clamped into `0.0..=1.0`; NaN is treated as `0.0`.
    pub fn new(status: BoothStatus, paper_drop_probability: f64, session_bump_probability: f64) -> Self {
        Self::with_rng(
            status,
            paper_drop_probability,
            session_bump_probability,
            StdRng::from_os_rng(),
        )
    }

    /// Create a simulator with a fixed seed, for reproducible runs.
    pub fn with_seed(
        status: BoothStatus,
        paper_drop_probability: f64,
        session_bump_probability: f64,
        seed: u64,
    ) -> Self {
        Self::with_rng(
            status,
            paper_drop_probability,
            session_bump_probability,
            StdRng::seed_from_u64(seed),
        )
    }

    fn with_rng(
        mut status: BoothStatus,
        paper_drop_probability: f64,
        session_bump_probability: f64,
        rng: StdRng,
    ) -> Self {
        status.paper_level = status.paper_level.min(100);
        Self {
            status,
            paper_drop_probability: unit_probability(paper_drop_probability),
            session_bump_probability: unit_probability(session_bump_probability),
            rng,
        }
    }
}

/// NaN counts as "never".
fn unit_probability(p: f64) -> f64 {
    if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) }
}

impl TelemetrySource for TelemetrySimulator {
    fn current_status(&self) -> BoothStatus {
        self.status.clone()
    }

    fn tick(&mut self) {
        if self.rng.random_bool(self.paper_drop_probability) {
            self.status.paper_level = self.status.paper_level.saturating_sub(1);
        }
        if self.rng.random_bool(self.session_bump_probability) {
            self.status.session_count += 1;
        }
        debug!(
            "Telemetry tick: paper {}%, {} sessions",
            self.status.paper_level, self.status.session_count
        );
    }

    fn record_session(&mut self) {
        self.status.session_count += 1;
    }

    fn reset_paper(&mut self, level: u8) {
        self.status.paper_level = level.min(100);
    }
}
