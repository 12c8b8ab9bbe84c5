use std::time::Duration;

use crate::error::ConfigError;

/// Configuration for the PixelBooth console loaded from environment variables.
///
/// Every value has a sensible default except the captioning API key, which is
/// optional: without it the captioning gateway still answers, but always with
/// the fallback caption.
#[derive(Debug, Clone)]
pub struct Config {
    /// Period between telemetry simulator ticks.
    /// Environment variable: `TELEMETRY_INTERVAL_MS`
    pub telemetry_interval: Duration,

    /// Period between two countdown steps of a remote capture.
    /// Environment variable: `COUNTDOWN_INTERVAL_MS`
    pub countdown_interval: Duration,

    /// Probability that a telemetry tick consumes one percent of paper.
    /// Environment variable: `PAPER_DROP_PROBABILITY`
    pub paper_drop_probability: f64,

    /// Probability that a telemetry tick records an unattended session.
    /// Environment variable: `SESSION_BUMP_PROBABILITY`
    pub session_bump_probability: f64,

    /// Paper level (percent) below which a low-paper notice is raised.
    /// Environment variable: `LOW_PAPER_THRESHOLD`
    pub low_paper_threshold: u8,

    /// API key for the generative captioning provider.
    /// Environment variable: `GEMINI_API_KEY` (falls back to `API_KEY`)
    pub gemini_api_key: Option<String>,

    /// Model used for caption generation.
    /// Environment variable: `GEMINI_MODEL`
    pub gemini_model: String,

    /// Base URL of the generative language REST API.
    /// Environment variable: `GEMINI_API_URL`
    pub gemini_api_url: String,

    /// Timeout applied to the photo download and to the provider call.
    /// Environment variable: `CAPTION_TIMEOUT_SECONDS`
    pub caption_timeout_seconds: u64,

    /// Whether the gallery starts with the demo photo set.
    /// Environment variable: `SEED_DEMO_PHOTOS`
    pub seed_demo_photos: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            telemetry_interval: Duration::from_millis(3000),
            countdown_interval: Duration::from_millis(1000),
            paper_drop_probability: 0.10,
            session_bump_probability: 0.05,
            low_paper_threshold: 20,
            gemini_api_key: None,
            gemini_model: "gemini-2.5-flash".to_string(),
            gemini_api_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            caption_timeout_seconds: 30,
            seed_demo_photos: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a variable is set but cannot be
    /// parsed, or if a probability lies outside `0.0..=1.0`:
    /// - `TELEMETRY_INTERVAL_MS` (default: "3000")
    /// - `COUNTDOWN_INTERVAL_MS` (default: "1000")
    /// - `PAPER_DROP_PROBABILITY` (default: "0.10")
    /// - `SESSION_BUMP_PROBABILITY` (default: "0.05")
    /// - `LOW_PAPER_THRESHOLD` (default: "20")
    /// - `GEMINI_API_KEY` / `API_KEY` (optional)
    /// - `GEMINI_MODEL` (default: "gemini-2.5-flash")
    /// - `GEMINI_API_URL` (default: the public v1beta endpoint)
    /// - `CAPTION_TIMEOUT_SECONDS` (default: "30")
    /// - `SEED_DEMO_PHOTOS` (default: "true")
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let telemetry_interval =
            Duration::from_millis(parse_var("TELEMETRY_INTERVAL_MS", "3000")?);
        let countdown_interval =
            Duration::from_millis(parse_var("COUNTDOWN_INTERVAL_MS", "1000")?);

        let paper_drop_probability =
            probability(parse_var("PAPER_DROP_PROBABILITY", "0.10")?, "PAPER_DROP_PROBABILITY")?;
        let session_bump_probability = probability(
            parse_var("SESSION_BUMP_PROBABILITY", "0.05")?,
            "SESSION_BUMP_PROBABILITY",
        )?;

        let low_paper_threshold = parse_var::<u8>("LOW_PAPER_THRESHOLD", "20")?;
        if low_paper_threshold > 100 {
            return Err(ConfigError::InvalidValue {
                field: "LOW_PAPER_THRESHOLD".to_string(),
                value: low_paper_threshold.to_string(),
                reason: "must be a percentage between 0 and 100".to_string(),
            });
        }

        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("API_KEY"))
            .ok()
            .filter(|key| !key.trim().is_empty());

        let gemini_model = std::env::var("GEMINI_MODEL").unwrap_or(defaults.gemini_model);
        let gemini_api_url = std::env::var("GEMINI_API_URL")
            .unwrap_or(defaults.gemini_api_url)
            .trim_end_matches('/')
            .to_string();

        let caption_timeout_seconds = parse_var("CAPTION_TIMEOUT_SECONDS", "30")?;
        let seed_demo_photos = parse_var("SEED_DEMO_PHOTOS", "true")?;

        Ok(Config {
            telemetry_interval,
            countdown_interval,
            paper_drop_probability,
            session_bump_probability,
            low_paper_threshold,
            gemini_api_key,
            gemini_model,
            gemini_api_url,
            caption_timeout_seconds,
            seed_demo_photos,
        })
    }
}

fn parse_var<T>(name: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(name).unwrap_or_else(|_| default.to_string());
    raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
        field: name.to_string(),
        value: raw.clone(),
        reason: e.to_string(),
    })
}

fn probability(value: f64, field: &str) -> Result<f64, ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: "probability must lie between 0.0 and 1.0".to_string(),
        })
    }
}

/// Application constants used throughout the system.
pub mod constants {
    /// First value shown by the remote-capture countdown.
    pub const COUNTDOWN_START: u8 = 3;

    /// Caption returned whenever the captioning provider cannot deliver one.
    pub const FALLBACK_CAPTION: &str = "Looks like a great time!";

    /// Hashtags returned alongside [`FALLBACK_CAPTION`].
    pub const FALLBACK_TAGS: [&str; 3] = ["#photobooth", "#fun", "#memories"];

    /// Instruction sent to the captioning provider with every photo.
    pub const CAPTION_PROMPT: &str = "Generate a fun, short, social media caption for this photo booth picture. Also provide 3 hashtags.";

    /// Number of photos the demo gallery starts with.
    pub const DEMO_PHOTO_COUNT: usize = 8;

    /// Minutes between two consecutive demo photos.
    pub const DEMO_PHOTO_SPACING_MINUTES: i64 = 15;

    /// Paper level of a freshly started booth.
    pub const INITIAL_PAPER_LEVEL: u8 = 45;

    /// Session counter of a freshly started booth.
    pub const INITIAL_SESSION_COUNT: u64 = 142;

    /// Revenue of a freshly started booth.
    pub const INITIAL_REVENUE: f64 = 850.00;
}
