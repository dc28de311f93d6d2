use thiserror::Error;

// Failures surfaced by the reports API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authorization failed (401)")]
    Unauthorized,

    #[error("request body does not match the API schema (400)")]
    BadRequest,

    #[error("a report with this id already exists (409)")]
    Conflict,

    #[error("no report with this id exists (404)")]
    NotFound,

    #[error("request limit exceeded on the remote side (429)")]
    TooManyRequests,

    #[error("unexpected response status {0}")]
    UnmappedStatus(u16),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed response body: {0}")]
    Decode(String),
}

// Errors that end a worker loop or a single request
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The poll response belongs to a different report. Never recoverable.
    #[error("report id mismatch: polled {expected}, response carried {received}")]
    IdMismatch { expected: u64, received: u64 },

    #[error("output error: {0}")]
    Io(#[from] std::io::Error),

    #[error("task panicked: {0}")]
    TaskPanicked(String),

    #[error("no report deleted, {failed} delete(s) failed")]
    NothingDeleted { failed: u64 },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid api url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("api token must not be empty")]
    EmptyToken,

    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejections_have_distinct_messages() {
        let messages = [
            ApiError::Unauthorized.to_string(),
            ApiError::BadRequest.to_string(),
            ApiError::Conflict.to_string(),
            ApiError::NotFound.to_string(),
            ApiError::TooManyRequests.to_string(),
        ];
        for (i, a) in messages.iter().enumerate() {
            for b in &messages[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert!(messages[0].contains("401"));
        assert!(messages[3].contains("404"));
    }

    #[test]
    fn test_unmapped_status_message() {
        let err = ApiError::UnmappedStatus(503);
        assert_eq!(err.to_string(), "unexpected response status 503");
    }

    #[test]
    fn test_api_error_converts_into_pipeline_error() {
        let err: PipelineError = ApiError::Conflict.into();
        assert!(matches!(err, PipelineError::Api(ApiError::Conflict)));
        assert_eq!(err.to_string(), ApiError::Conflict.to_string());
    }

    #[test]
    fn test_id_mismatch_message() {
        let err = PipelineError::IdMismatch {
            expected: 7,
            received: 5,
        };
        assert_eq!(
            err.to_string(),
            "report id mismatch: polled 7, response carried 5"
        );
    }

    #[test]
    fn test_nothing_deleted_message() {
        let err = PipelineError::NothingDeleted { failed: 3 };
        assert_eq!(err.to_string(), "no report deleted, 3 delete(s) failed");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        let err: PipelineError = io_err.into();
        assert!(matches!(err, PipelineError::Io(_)));
        assert!(err.to_string().contains("closed"));
    }
}
