//! Error types for baton.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

use crate::types::Usage;

/// Primary error type for all engine operations.
///
/// Tool failures never surface here during a run: the invoker converts them
/// into error results the model can see. Everything else aborts the run.
#[derive(Error, Debug, strum::IntoStaticStr)]
pub enum BatonError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error (status {status}): {message}")]
    Api {
        status: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Model behavior error: {0}")]
    ModelBehavior(String),

    #[error("Tool execution error: {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Input guardrail '{guardrail}' triggered tripwire")]
    InputGuardrailTripwire {
        guardrail: String,
        message: Option<String>,
    },

    #[error("Output guardrail '{guardrail}' triggered tripwire")]
    OutputGuardrailTripwire {
        guardrail: String,
        message: Option<String>,
        usage: Usage,
    },

    #[error("Tool guardrail '{guardrail}' aborted the run on tool '{tool_name}'")]
    ToolGuardrailTripwire {
        guardrail: String,
        tool_name: String,
        message: Option<String>,
    },

    #[error("Max turns ({max_turns}) exceeded after {turns} turns")]
    MaxTurnsExceeded { max_turns: usize, turns: usize },

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl BatonError {
    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
            source: None,
        }
    }

    /// Create a tool execution error, the usual failure a tool body returns.
    pub fn tool(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    /// Static variant name, e.g. `"ToolExecution"`.
    pub fn kind(&self) -> &'static str {
        self.into()
    }

    /// Name of the guardrail that tripped, if this is a tripwire error.
    pub fn guardrail_name(&self) -> Option<&str> {
        match self {
            Self::InputGuardrailTripwire { guardrail, .. }
            | Self::OutputGuardrailTripwire { guardrail, .. }
            | Self::ToolGuardrailTripwire { guardrail, .. } => Some(guardrail),
            _ => None,
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Authentication(_) => ErrorCategory::Authentication,
            Self::RateLimited { .. } => ErrorCategory::RateLimit,
            Self::Network(_) => ErrorCategory::Network,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Api { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                429 => ErrorCategory::RateLimit,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Api,
            },
            Self::ToolExecution { .. } | Self::InvalidArgument(_) => ErrorCategory::ToolExecution,
            Self::InputGuardrailTripwire { .. }
            | Self::OutputGuardrailTripwire { .. }
            | Self::ToolGuardrailTripwire { .. } => ErrorCategory::Guardrail,
            Self::MaxTurnsExceeded { .. } => ErrorCategory::TurnLimit,
            Self::ModelBehavior(_) => ErrorCategory::ModelBehavior,
            Self::NotImplemented(_) => ErrorCategory::Unsupported,
            _ => ErrorCategory::Unknown,
        }
    }

    /// Whether this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::RateLimit
                | ErrorCategory::Network
                | ErrorCategory::Timeout
                | ErrorCategory::Server
        )
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self.category() {
            ErrorCategory::Authentication => RecoverySuggestion::CheckCredentials,
            ErrorCategory::RateLimit => RecoverySuggestion::RetryWithBackoff,
            ErrorCategory::Network => RecoverySuggestion::RetryWithBackoff,
            ErrorCategory::Timeout => RecoverySuggestion::IncreaseTimeout,
            ErrorCategory::Server => RecoverySuggestion::RetryWithBackoff,
            ErrorCategory::Configuration => RecoverySuggestion::CheckConfiguration,
            ErrorCategory::ToolExecution => RecoverySuggestion::CheckToolImplementation,
            ErrorCategory::Guardrail => RecoverySuggestion::ReviseInput,
            ErrorCategory::TurnLimit => RecoverySuggestion::IncreaseTurnLimit,
            _ => RecoverySuggestion::ContactSupport,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, BatonError>;
