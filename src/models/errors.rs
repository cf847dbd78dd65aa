//! Centralized Error Handling Module
//!
//! Every failure that can reach a caller of the scoring engine flows through
//! [`AppError`]. Error codes follow the pattern `CATEGORY_SPECIFIC_ERROR` so they
//! can be grepped in logs:
//! - INVALID_xxx / INCONSISTENT_xxx: input or snapshot problems (fatal)
//! - UPSTREAM_xxx: data source / chain reader failures (retryable)
//! - DECODE_xxx: bytecode or ABI could not be parsed (absorbed by the permission inspector)
//! - CONFIG_xxx: configuration errors

use serde::Serialize;
use std::fmt;

/// The analyzer pipeline an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Analyzer {
    /// Address classification + activity/EOA analysis
    Activity,
    /// Holder concentration analysis
    Holder,
    /// Contract permission inspection
    Permission,
}

impl Analyzer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Activity => "activity",
            Self::Holder => "holder",
            Self::Permission => "permission",
        }
    }
}

impl fmt::Display for Analyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application-wide error type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Analyzer pipeline that failed, when known
    pub analyzer: Option<Analyzer>,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new AppError
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            analyzer: None,
            source: None,
        }
    }

    /// Create AppError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            analyzer: None,
            source: Some(Box::new(source)),
        }
    }

    /// Tag the error with the analyzer pipeline it came from.
    /// An already-set analyzer is kept.
    pub fn in_analyzer(mut self, analyzer: Analyzer) -> Self {
        self.analyzer.get_or_insert(analyzer);
        self
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.analyzer {
            Some(analyzer) => write!(
                f,
                "[{}] {} analyzer: {}",
                self.code.as_str(),
                analyzer,
                self.message
            ),
            None => write!(f, "[{}] {}", self.code.as_str(), self.message),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // ============================================
    // Input / Snapshot Errors (1xx)
    // ============================================
    /// Malformed token address, rejected before any fetch
    InvalidAddress,
    /// Snapshot failed a consistency check (e.g. holder shares > 100%)
    InconsistentData,

    // ============================================
    // Upstream Errors (2xx)
    // ============================================
    /// Data source or chain reader unreachable after all retries
    UpstreamUnavailable,
    /// Single upstream call timed out
    UpstreamTimeout,
    /// Upstream rate limited (HTTP 429)
    UpstreamRateLimited,
    /// Upstream answered with an error envelope or malformed body
    UpstreamInvalidResponse,
    /// `eth_call` reverted on chain
    ExecutionReverted,

    // ============================================
    // Decode Errors (3xx)
    // ============================================
    /// Bytecode / ABI could not be parsed
    DecodeFailure,

    // ============================================
    // Configuration Errors (4xx)
    // ============================================
    /// Missing environment variable
    ConfigMissingEnv,
    /// Invalid configuration value
    ConfigInvalidValue,

    // ============================================
    // Generic Errors (9xx)
    // ============================================
    /// Whole request exceeded its deadline
    RequestTimeout,
    /// Unknown error
    Unknown,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidAddress => "INVALID_ADDRESS",
            Self::InconsistentData => "INCONSISTENT_DATA",

            Self::UpstreamUnavailable => "UPSTREAM_UNAVAILABLE",
            Self::UpstreamTimeout => "UPSTREAM_TIMEOUT",
            Self::UpstreamRateLimited => "UPSTREAM_RATE_LIMITED",
            Self::UpstreamInvalidResponse => "UPSTREAM_INVALID_RESPONSE",
            Self::ExecutionReverted => "EXECUTION_REVERTED",

            Self::DecodeFailure => "DECODE_FAILURE",

            Self::ConfigMissingEnv => "CONFIG_MISSING_ENV",
            Self::ConfigInvalidValue => "CONFIG_INVALID_VALUE",

            Self::RequestTimeout => "REQUEST_TIMEOUT",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Process exit code used by the CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidAddress | Self::ConfigInvalidValue | Self::ConfigMissingEnv => 2,
            Self::InconsistentData => 3,
            Self::UpstreamUnavailable
            | Self::UpstreamTimeout
            | Self::UpstreamRateLimited
            | Self::UpstreamInvalidResponse
            | Self::ExecutionReverted
            | Self::RequestTimeout => 4,
            Self::DecodeFailure | Self::Unknown => 1,
        }
    }

    /// Check if a single upstream call failing with this code may be retried
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::UpstreamTimeout | Self::UpstreamRateLimited | Self::UpstreamUnavailable
        )
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    /// Invalid token address
    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidAddress, msg)
    }

    /// Inconsistent snapshot data
    pub fn inconsistent(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InconsistentData, msg)
    }

    /// Upstream unreachable
    pub fn upstream_unavailable(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::UpstreamUnavailable, msg)
    }

    /// Upstream call timed out
    pub fn upstream_timeout(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::UpstreamTimeout, msg)
    }

    /// Upstream rate limited
    pub fn upstream_rate_limited() -> Self {
        Self::new(ErrorCode::UpstreamRateLimited, "Rate limited (HTTP 429)")
    }

    /// Upstream answered but the body is unusable
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::UpstreamInvalidResponse, msg)
    }

    /// Contract call reverted
    pub fn execution_reverted(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ExecutionReverted, msg)
    }

    /// Bytecode / ABI decode failure
    pub fn decode_failure(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::DecodeFailure, msg)
    }

    /// Whole request exceeded its deadline
    pub fn request_timeout(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RequestTimeout, msg)
    }

    /// Invalid configuration value
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigInvalidValue, msg)
    }

    /// Missing environment variable
    pub fn missing_env(key_name: &str) -> Self {
        Self::new(
            ErrorCode::ConfigMissingEnv,
            format!("Missing environment variable: {}", key_name),
        )
    }
}

// ============================================
// Result type alias
// ============================================

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        Self::new(ErrorCode::Unknown, err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ErrorCode::UpstreamTimeout, "Request timeout")
        } else if err.is_connect() {
            Self::new(ErrorCode::UpstreamUnavailable, "Connection failed")
        } else if err.is_decode() {
            Self::with_source(
                ErrorCode::UpstreamInvalidResponse,
                "Failed to decode response body",
                err,
            )
        } else {
            Self::with_source(ErrorCode::UpstreamUnavailable, "Request failed", err)
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::UpstreamInvalidResponse, "JSON parse error", err)
    }
}

impl From<tokio::time::error::Elapsed> for AppError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::new(ErrorCode::UpstreamTimeout, "Deadline elapsed")
    }
}
