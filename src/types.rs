//! Error types for landgate

use hyper::StatusCode;
use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, LandgateError>;

/// Errors surfaced by landgate components
///
/// Every failure is mapped to exactly one of these variants at the point it
/// occurs; the route boundary turns the variant into an HTTP status. The
/// carried strings are diagnostics for the log; `NotFound` is the only
/// variant whose message is client-facing.
#[derive(Debug, Error)]
pub enum LandgateError {
    /// Missing, malformed, or expired credential
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Required field missing from the request payload
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Ownership-scoped lookup miss (record absent or not owned)
    #[error("{0}")]
    NotFound(String),

    /// MongoDB driver or constraint failure
    #[error("database error: {0}")]
    Database(String),

    /// Request body could not be read or parsed
    #[error("http error: {0}")]
    Http(String),

    /// BSON/JSON conversion failure
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl LandgateError {
    /// HTTP status this error maps to at the route boundary
    pub fn status_code(&self) -> StatusCode {
        match self {
            LandgateError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            LandgateError::BadRequest(_) => StatusCode::BAD_REQUEST,
            LandgateError::NotFound(_) => StatusCode::NOT_FOUND,
            LandgateError::Database(_) | LandgateError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            LandgateError::Http(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<std::io::Error> for LandgateError {
    fn from(e: std::io::Error) -> Self {
        LandgateError::Http(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            LandgateError::Unauthorized("no token".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            LandgateError::BadRequest("id required".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            LandgateError::NotFound("Land record not found".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            LandgateError::Database("insert failed".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_not_found_message_is_client_facing() {
        let err = LandgateError::NotFound("Land record not found".into());
        assert_eq!(err.to_string(), "Land record not found");
    }
}
