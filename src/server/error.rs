use crate::error::{UpstreamError, WaybackError};
use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::Level;

/// JSON body of every error response
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// A [`WaybackError`] rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub WaybackError);

impl<E> From<E> for ApiError
where
    E: Into<WaybackError>,
{
    fn from(err: E) -> Self {
        ApiError(err.into())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            WaybackError::Validation(_) => StatusCode::BAD_REQUEST,
            WaybackError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            WaybackError::Upstream(UpstreamError::NotFound(_)) => StatusCode::NOT_FOUND,
            WaybackError::Upstream(_) => StatusCode::BAD_GATEWAY,
            WaybackError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Log level for the failure: client mistakes stay at debug, transient
    /// upstream or I/O failures warn, anything else is an error
    pub fn log_level(&self) -> Level {
        if self.0.is_user_error() {
            Level::DEBUG
        } else if self.0.is_retryable() {
            Level::WARN
        } else {
            Level::ERROR
        }
    }

    /// Message shown to clients; user errors drop the category prefix
    pub fn message(&self) -> String {
        match &self.0 {
            WaybackError::Validation(e) => e.to_string(),
            WaybackError::RateLimited(e) => e.to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self.log_level() {
            Level::DEBUG => tracing::debug!("Request rejected: {}", self.0),
            Level::WARN => tracing::warn!("Request failed, retryable: {}", self.0),
            _ => tracing::error!("Request failed: {}", self.0),
        }

        let body = ErrorBody {
            error: self.0.kind().to_string(),
            message: self.message(),
        };
        let mut response = (status, Json(body)).into_response();

        if let WaybackError::RateLimited(limit) = &self.0 {
            let headers = response.headers_mut();
            headers.insert(header::RETRY_AFTER, HeaderValue::from(limit.retry_after_secs));
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, RateLimitError, ValidationError};
    use chrono::Utc;

    #[test]
    fn test_status_mapping() {
        let cases: Vec<(WaybackError, StatusCode)> = vec![
            (ValidationError::InvalidOwner("-".into()).into(), StatusCode::BAD_REQUEST),
            (UpstreamError::NotFound("x".into()).into(), StatusCode::NOT_FOUND),
            (
                UpstreamError::Status {
                    url: "x".into(),
                    status: 500,
                }
                .into(),
                StatusCode::BAD_GATEWAY,
            ),
            (
                ConfigError::MissingRequired("store.path".into()).into(),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (WaybackError::other("boom"), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError(err).status(), expected);
        }
    }

    #[test]
    fn test_validation_message_has_no_prefix() {
        let err = ApiError::from(ValidationError::MissingParameter("owner and repo".into()));
        assert_eq!(err.message(), "owner and repo is required");
    }

    #[test]
    fn test_log_level_follows_error_class() {
        let rejected = ApiError::from(ValidationError::InvalidCommitSha("xyz".into()));
        assert_eq!(rejected.log_level(), Level::DEBUG);

        let throttled = ApiError::from(RateLimitError {
            limit: 20,
            reset_at: Utc::now(),
            retry_after_secs: 5,
        });
        assert_eq!(throttled.log_level(), Level::DEBUG);

        let flaky = ApiError::from(UpstreamError::Status {
            url: "x".into(),
            status: 503,
        });
        assert_eq!(flaky.log_level(), Level::WARN);

        let missing = ApiError::from(UpstreamError::NotFound("x".into()));
        assert_eq!(missing.log_level(), Level::DEBUG);

        let garbled = ApiError::from(UpstreamError::Decode {
            url: "x".into(),
            reason: "missing sha".into(),
        });
        assert_eq!(garbled.log_level(), Level::ERROR);

        assert_eq!(ApiError(WaybackError::other("boom")).log_level(), Level::ERROR);
    }

    #[test]
    fn test_rate_limit_sets_retry_after() {
        let err = ApiError::from(RateLimitError {
            limit: 20,
            reset_at: Utc::now(),
            retry_after_secs: 17,
        });
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "17");
    }
}
