//! Shared route plumbing
//!
//! Response/body helpers, the JSON body parser, and the single point where
//! a request's bearer credential becomes an acting identity.

use bson::oid::ObjectId;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{body::Incoming, Request, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use crate::auth::extract_token_from_header;
use crate::db::schemas::{HistoryAction, HistoryEntry};
use crate::server::AppState;
use crate::store::{OwnedRecord, RecordStore};
use crate::types::LandgateError;

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Standard error body: `{"error": ..., "code": ...?}`
///
/// Never carries raw library or driver diagnostics; those go to the log.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Success body for deletes: `{"message": ...}`
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// History entry as rendered to clients
#[derive(Debug, Serialize)]
pub struct HistoryEntryResponse {
    pub action: HistoryAction,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub timestamp: String,
    pub details: serde_json::Value,
}

impl From<HistoryEntry> for HistoryEntryResponse {
    fn from(entry: HistoryEntry) -> Self {
        Self {
            action: entry.action,
            user_id: entry.user_id,
            timestamp: entry
                .timestamp
                .try_to_rfc3339_string()
                .unwrap_or_default(),
            details: entry.details.into_relaxed_extjson(),
        }
    }
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .body(full_body(json))
        .unwrap()
}

pub fn error_response(status: StatusCode, message: &str, code: Option<&str>) -> Response<BoxBody> {
    json_response(
        status,
        &ErrorResponse {
            error: message.to_string(),
            code: code.map(String::from),
        },
    )
}

pub fn cors_preflight() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .header("Access-Control-Max-Age", "86400")
        .body(empty_body())
        .unwrap()
}

pub fn method_not_allowed() -> Response<BoxBody> {
    error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed", None)
}

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

pub async fn parse_json_body<T: DeserializeOwned>(
    req: Request<Incoming>,
    max_bytes: usize,
) -> Result<T, LandgateError> {
    let body = req
        .collect()
        .await
        .map_err(|e| LandgateError::Http(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    if bytes.len() > max_bytes {
        return Err(LandgateError::Http("Request body too large".into()));
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| LandgateError::Http(format!("Invalid JSON: {}", e)))
}

pub fn get_auth_header(req: &Request<Incoming>) -> Option<&str> {
    req.headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// Resolve the request's bearer credential to an acting identity
///
/// The one place a token becomes a uid: every handler calls this before
/// touching the store, and the store only ever sees the canonical string.
/// Verification failures are logged with the library diagnostic; the
/// response body stays generic.
pub fn authenticate(
    state: &AppState,
    auth_header: Option<&str>,
) -> Result<String, Response<BoxBody>> {
    let token = match extract_token_from_header(auth_header) {
        Some(t) => t,
        None => {
            return Err(error_response(
                StatusCode::UNAUTHORIZED,
                "Unauthorized: No token provided",
                None,
            ))
        }
    };

    match state.jwt.verify_token(token) {
        Ok(claims) => Ok(claims.user_id),
        Err(e) => {
            warn!("Token verification failed: {}", e);
            Err(error_response(
                StatusCode::UNAUTHORIZED,
                "Unauthorized",
                Some("INVALID_TOKEN"),
            ))
        }
    }
}

/// Open the store for a record kind, mapping failure to a 500
pub async fn open_store<T: OwnedRecord>(
    state: &AppState,
) -> Result<RecordStore<T>, Response<BoxBody>> {
    RecordStore::open(&state.mongo).await.map_err(|e| {
        warn!("Failed to open {} store: {}", T::KIND, e);
        error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Database error",
            Some("DB_ERROR"),
        )
    })
}

/// Parse a client-supplied record id
///
/// A syntactically invalid id maps to the same not-found as a missing or
/// foreign one; a distinct status would reveal which ids are well-formed.
pub fn parse_record_id(raw: &str, kind_label: &str) -> Result<ObjectId, LandgateError> {
    ObjectId::parse_str(raw)
        .map_err(|_| LandgateError::NotFound(format!("{} record not found", kind_label)))
}

/// Map a store/parse failure to its response, logging internal detail
pub fn operation_failure(context: &str, err: &LandgateError) -> Response<BoxBody> {
    match err {
        LandgateError::NotFound(msg) => error_response(StatusCode::NOT_FOUND, msg, None),
        LandgateError::BadRequest(msg) => error_response(StatusCode::BAD_REQUEST, msg, None),
        LandgateError::Http(msg) => error_response(StatusCode::BAD_REQUEST, msg, None),
        other => {
            warn!("{}: {}", context, other);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, context, Some("DB_ERROR"))
        }
    }
}

/// Trailing single path segment after a prefix, e.g. the id in `/api/land/{id}`
pub fn path_suffix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(prefix)?.strip_prefix('/')?;
    if rest.is_empty() || rest.contains('/') {
        None
    } else {
        Some(rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_suffix() {
        assert_eq!(
            path_suffix("/api/land/64f0c2a9d3e8b45f1a2b3c4d", "/api/land"),
            Some("64f0c2a9d3e8b45f1a2b3c4d")
        );
        assert_eq!(path_suffix("/api/land", "/api/land"), None);
        assert_eq!(path_suffix("/api/land/", "/api/land"), None);
        assert_eq!(path_suffix("/api/land/a/b", "/api/land"), None);
        assert_eq!(path_suffix("/api/participator/x", "/api/land"), None);
    }

    #[test]
    fn test_parse_record_id_invalid_syntax_is_not_found() {
        // Anti-enumeration: malformed ids are indistinguishable from misses
        let err = parse_record_id("not-an-object-id", "Land").unwrap_err();
        assert!(matches!(err, LandgateError::NotFound(_)));
        assert_eq!(err.to_string(), "Land record not found");

        let id = ObjectId::new();
        assert_eq!(parse_record_id(&id.to_hex(), "Land").unwrap(), id);
    }

    #[test]
    fn test_error_response_shape() {
        let resp = error_response(StatusCode::NOT_FOUND, "Land record not found", None);
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            resp.headers().get("Content-Type").unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_operation_failure_hides_internal_detail() {
        let err = LandgateError::Database("E11000 duplicate key on lands".into());
        let resp = operation_failure("Error creating land", &err);
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        // Body carries the stable context message, not the driver text;
        // asserting on status + shape here, the body bytes are opaque
    }

    #[test]
    fn test_history_entry_response_rendering() {
        let entry = HistoryEntry::new(
            HistoryAction::Update,
            "u1",
            bson::Bson::Document(bson::doc! { "name": "Plot A" }),
        );
        let rendered = HistoryEntryResponse::from(entry);

        assert_eq!(rendered.user_id, "u1");
        assert!(!rendered.timestamp.is_empty());
        assert_eq!(rendered.details["name"], "Plot A");
    }
}
