//! HTTP mapping for job list errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use job_list::{ErrorKind, JobListError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    JobList(#[from] JobListError),

    #[error("{0} not found")]
    NotFound(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<ErrorKind>,
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Store => StatusCode::BAD_GATEWAY,
        ErrorKind::Conflict => StatusCode::CONFLICT,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::JobList(err) => {
                if err.kind() == ErrorKind::Store {
                    tracing::error!(error = %err, "Store request failed");
                }
                (
                    status_for(err.kind()),
                    ErrorBody {
                        error: err.user_message(),
                        kind: Some(err.kind()),
                    },
                )
            }
            ApiError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    error: self.to_string(),
                    kind: None,
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_map_to_status() {
        let status = |e: JobListError| ApiError::from(e).into_response().status();

        assert_eq!(status(JobListError::validation("bad page")), StatusCode::BAD_REQUEST);
        assert_eq!(status(JobListError::Unauthorized("x".into())), StatusCode::UNAUTHORIZED);
        assert_eq!(status(JobListError::store("down")), StatusCode::BAD_GATEWAY);
        assert_eq!(status(JobListError::Conflict("running".into())), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::NotFound("job j1".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
    }
}
