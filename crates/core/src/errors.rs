use thiserror::Error;

/// Unified error type for the entire trading-sync-core library.
/// Every public function returns `Result<T, CoreError>`.
///
/// `Clone` so a single in-flight request result can be handed to every
/// caller that joined it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    // ── Transport ───────────────────────────────────────────────────
    #[error("Network error: {0}")]
    Network(String),

    #[error("Client is offline")]
    Offline,

    // ── Remote Store responses ──────────────────────────────────────
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("{message}")]
    Validation { status: u16, message: String },

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Unexpected response payload: {0}")]
    Decode(String),

    // ── Setup ───────────────────────────────────────────────────────
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

/// The four error kinds the UI distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Request did not complete. Last-known-good data stays on screen.
    Network,
    /// 401 from the Remote Store. The session must be terminated.
    Authentication,
    /// Rejected input (4xx other than 401). Message is shown verbatim.
    Validation,
    /// 5xx from the Remote Store. Displayed like a network failure.
    Server,
}

impl CoreError {
    /// Local validation failure that never reached the Remote Store.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        CoreError::Validation {
            status: 0,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Network(_) | CoreError::Offline => ErrorKind::Network,
            CoreError::Authentication(_) => ErrorKind::Authentication,
            CoreError::Validation { .. } | CoreError::Configuration(_) => ErrorKind::Validation,
            CoreError::Server { .. } | CoreError::Decode(_) => ErrorKind::Server,
        }
    }

    /// Whether offering the user a manual retry makes sense.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Network | ErrorKind::Server)
    }

    /// Whether the auth collaborator should clear credentials.
    pub fn ends_session(&self) -> bool {
        self.kind() == ErrorKind::Authentication
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Decode(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // Query strings can carry search terms and filters; keep them out of logs.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        if e.is_decode() {
            CoreError::Decode(sanitized)
        } else {
            CoreError::Network(sanitized)
        }
    }
}
