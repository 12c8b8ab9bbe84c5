use std::fmt;

/// Custom error types for the PixelBooth console core.
///
/// None of these are fatal to the process. Captioning errors never leave the
/// captioning gateway, capture errors send the sequencer back to idle, and
/// configuration errors only surface at startup.

/// Main error type for PixelBooth operations.
#[derive(Debug)]
pub enum BoothError {
    /// Errors raised while firing the remote shutter.
    CaptureError(CaptureError),

    /// Errors raised while producing an AI caption.
    CaptionError(CaptionError),

    /// Configuration and setup errors.
    ConfigError(ConfigError),

    /// Network and connectivity errors.
    NetworkError(NetworkError),
}

/// Errors specific to the remote capture sequence.
#[derive(Debug)]
pub enum CaptureError {
    /// The shutter collaborator reported a failure.
    ShutterFailed { reason: String },
}

/// Errors specific to the captioning workflow.
#[derive(Debug)]
pub enum CaptionError {
    /// The photo bytes could not be fetched.
    FetchFailed { url: String, reason: String },

    /// The provider rejected the request or returned an error status.
    ProviderFailed { status: Option<u16>, message: String },

    /// The provider answered without any text body.
    EmptyResponse,

    /// The provider's text did not match the caption schema.
    SchemaViolation { reason: String },

    /// No captioning backend could be reached at all.
    Unavailable { reason: String },
}

/// Errors related to configuration and application setup.
#[derive(Debug)]
pub enum ConfigError {
    /// Invalid configuration values provided.
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Errors related to network connectivity and communication.
#[derive(Debug)]
pub enum NetworkError {
    /// Generic network request failed.
    RequestFailed { url: String, reason: String },

    /// Network timeout occurred.
    Timeout { url: String, timeout_seconds: u64 },
}

impl fmt::Display for BoothError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoothError::CaptureError(e) => write!(f, "Capture error: {}", e),
            BoothError::CaptionError(e) => write!(f, "Caption error: {}", e),
            BoothError::ConfigError(e) => write!(f, "Configuration error: {}", e),
            BoothError::NetworkError(e) => write!(f, "Network error: {}", e),
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::ShutterFailed { reason } => {
                write!(f, "Shutter failed to fire: {}", reason)
            }
        }
    }
}

impl fmt::Display for CaptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptionError::FetchFailed { url, reason } => {
                write!(f, "Failed to fetch photo from '{}': {}", url, reason)
            }
            CaptionError::ProviderFailed { status, message } => match status {
                Some(code) => write!(f, "Caption provider error (HTTP {}): {}", code, message),
                None => write!(f, "Caption provider error: {}", message),
            },
            CaptionError::EmptyResponse => write!(f, "Caption provider returned no text"),
            CaptionError::SchemaViolation { reason } => {
                write!(f, "Caption response does not match schema: {}", reason)
            }
            CaptionError::Unavailable { reason } => {
                write!(f, "Captioning is unavailable: {}", reason)
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue {
                field,
                value,
                reason,
            } => {
                write!(
                    f,
                    "Invalid value '{}' for field '{}': {}",
                    value, field, reason
                )
            }
        }
    }
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::RequestFailed { url, reason } => {
                write!(f, "Network request to '{}' failed: {}", url, reason)
            }
            NetworkError::Timeout {
                url,
                timeout_seconds,
            } => {
                write!(
                    f,
                    "Request to '{}' timed out after {} seconds",
                    url, timeout_seconds
                )
            }
        }
    }
}

impl std::error::Error for BoothError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BoothError::CaptureError(e) => Some(e),
            BoothError::CaptionError(e) => Some(e),
            BoothError::ConfigError(e) => Some(e),
            BoothError::NetworkError(e) => Some(e),
        }
    }
}

impl std::error::Error for CaptureError {}
impl std::error::Error for CaptionError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for NetworkError {}

impl From<CaptureError> for BoothError {
    fn from(err: CaptureError) -> Self {
        BoothError::CaptureError(err)
    }
}

impl From<CaptionError> for BoothError {
    fn from(err: CaptionError) -> Self {
        BoothError::CaptionError(err)
    }
}

impl From<ConfigError> for BoothError {
    fn from(err: ConfigError) -> Self {
        BoothError::ConfigError(err)
    }
}

impl From<NetworkError> for BoothError {
    fn from(err: NetworkError) -> Self {
        BoothError::NetworkError(err)
    }
}

/// A fetch that never reached a usable response is reported to the
/// captioning layer as a failed fetch of the same URL.
impl From<NetworkError> for CaptionError {
    fn from(err: NetworkError) -> Self {
        match err {
            NetworkError::RequestFailed { url, reason } => CaptionError::FetchFailed { url, reason },
            NetworkError::Timeout {
                url,
                timeout_seconds,
            } => CaptionError::FetchFailed {
                url,
                reason: format!("timed out after {} seconds", timeout_seconds),
            },
        }
    }
}
