//! Gateway error types

/// Gateway error types
///
/// Payloads are plain strings so the error is `Clone`: a single-flight cache
/// computation hands the same failure to every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    // Upstream/network errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("upstream error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The upstream rejected a session token. Handled inside the retry loop
    /// by forcing a re-login; only surfaces if the attempt budget runs out.
    #[error("upstream rejected the session token")]
    Unauthorized,

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("failed to decode upstream response: {0}")]
    Decode(String),

    // Caller errors
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("rate limited")]
    RateLimited,

    #[error("could not resolve client identity")]
    ClientIdentity,

    // Pipeline errors
    #[error("no '{extension}' subtitle found in archive")]
    SubtitleNotFound { extension: String },

    #[error("archive error: {0}")]
    Archive(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("subtitle conversion failed: {0}")]
    Conversion(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl GatewayError {
    /// Whether the bounded retry loop should try again after this error.
    ///
    /// Every non-success upstream status is retryable, including a stale
    /// token (which triggers a forced re-login before the next attempt).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GatewayError::Http(_) | GatewayError::Api { .. } | GatewayError::Unauthorized
        )
    }

    /// Whether the failure originates in the subtitle pipeline, i.e. the
    /// upstream payload had an unexpected shape.
    pub fn is_pipeline(&self) -> bool {
        matches!(
            self,
            GatewayError::SubtitleNotFound { .. }
                | GatewayError::Archive(_)
                | GatewayError::Encoding(_)
                | GatewayError::Conversion(_)
        )
    }

    /// Whether the failure is tied to the requesting caller's own input or
    /// credentials, so it must not be handed to another caller.
    pub fn is_caller_scoped(&self) -> bool {
        matches!(
            self,
            GatewayError::AuthenticationFailed(_) | GatewayError::InvalidInput(_)
        )
    }

    /// HTTP status code a caller should see for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::InvalidInput(_) => 400,
            GatewayError::AuthenticationFailed(_) => 401,
            GatewayError::RateLimited => 429,
            GatewayError::Http(_)
            | GatewayError::Api { .. }
            | GatewayError::Unauthorized
            | GatewayError::Decode(_) => 502,
            GatewayError::SubtitleNotFound { .. }
            | GatewayError::Archive(_)
            | GatewayError::Encoding(_)
            | GatewayError::Conversion(_)
            | GatewayError::ClientIdentity
            | GatewayError::Configuration(_) => 500,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else {
            GatewayError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Decode(err.to_string())
    }
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;
