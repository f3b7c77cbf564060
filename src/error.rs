//! Classified failures shared by every layer of the gateway.

use std::time::Duration;
use thiserror::Error;

/// Every failure an operation can end with.
///
/// Upstream failures are always classified into one of these variants before
/// they leave the HTTP layer, so handlers and the retry controller never
/// inspect raw status codes or transport errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// Malformed or missing request field. Never reaches upstream.
    #[error("invalid parameter `{field}`: {message}")]
    Validation { field: String, message: String },

    /// Owner, repository or resource does not resolve.
    #[error("not found: {message}")]
    NotFound { message: String },

    /// Authenticated but not allowed.
    #[error("permission denied: {message}")]
    Permission { message: String },

    /// Rate-limit budget exhausted. Transient.
    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    /// Timeout, connection reset and similar. Transient.
    #[error("transient network error: {message}")]
    TransientNetwork { message: String },

    /// Merge conflict, stale file SHA, unmergeable pull request.
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// Uncategorized upstream failure, passed through with its message.
    #[error("upstream error{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Upstream { status: Option<u16>, message: String },

    /// The local version-control collaborator failed.
    #[error("local repository error: {message}")]
    Vcs { message: String },

    /// The invocation exceeded its deadline.
    #[error("timed out: {message}")]
    Timeout { message: String },

    /// The caller cancelled the invocation.
    #[error("cancelled: {message}")]
    Cancelled { message: String },
}

impl GatewayError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            status: None,
            message: message.into(),
        }
    }

    pub fn vcs(message: impl Into<String>) -> Self {
        Self::Vcs {
            message: message.into(),
        }
    }

    /// Whether the retry controller may attempt the call again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::TransientNetwork { .. }
        )
    }

    /// Explicit delay requested by upstream, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Stable machine-readable category, used in logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::NotFound { .. } => "not_found",
            Self::Permission { .. } => "forbidden",
            Self::RateLimited { .. } => "rate_limited",
            Self::TransientNetwork { .. } => "network",
            Self::Conflict { .. } => "conflict",
            Self::Upstream { .. } => "upstream_error",
            Self::Vcs { .. } => "vcs",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::upstream(format!("malformed payload: {err}"))
    }
}
