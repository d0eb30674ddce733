//! HTTP routes for land records
//!
//! - GET    /api/land        - list the caller's land records
//! - POST   /api/land        - create a record
//! - PUT    /api/land        - update (id in body)
//! - DELETE /api/land        - delete (id in body)
//! - GET    /api/land/{id}   - fetch one record
//! - PUT    /api/land/{id}   - update by path id
//! - DELETE /api/land/{id}   - delete by path id
//!
//! Every endpoint authenticates from scratch and every store call is scoped
//! to the resolved identity.

use hyper::{body::Incoming, Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::schemas::{LandDoc, LandPayload};
use crate::routes::helpers::{
    authenticate, cors_preflight, error_response, get_auth_header, json_response,
    method_not_allowed, open_store, operation_failure, parse_json_body, parse_record_id,
    path_suffix, BoxBody, HistoryEntryResponse, MessageResponse,
};
use crate::server::AppState;
use crate::store::RecordStore;

// =============================================================================
// Request/Response Types
// =============================================================================

/// PUT body: the record id plus the replacement fields
#[derive(Debug, Deserialize)]
struct LandUpdateRequest {
    #[serde(default)]
    id: Option<String>,
    #[serde(flatten)]
    payload: LandPayload,
}

/// DELETE body
#[derive(Debug, Deserialize)]
struct LandDeleteRequest {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreatedResponse {
    id: String,
}

/// Land record as rendered to clients
#[derive(Debug, Serialize)]
pub struct LandResponse {
    pub id: String,
    pub name: Option<String>,
    pub location: Option<String>,
    pub size: Option<String>,
    pub owner: Option<String>,
    #[serde(rename = "landType")]
    pub land_type: Option<String>,
    #[serde(rename = "marketValue")]
    pub market_value: Option<String>,
    pub notes: Option<String>,
    pub polygons: Option<serde_json::Value>,
    #[serde(rename = "createdBy")]
    pub created_by: String,
    #[serde(rename = "updatedBy")]
    pub updated_by: String,
    pub history: Vec<HistoryEntryResponse>,
    #[serde(rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(rename = "updatedAt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl From<LandDoc> for LandResponse {
    fn from(doc: LandDoc) -> Self {
        Self {
            id: doc.id.map(|o| o.to_hex()).unwrap_or_default(),
            name: doc.name,
            location: doc.location,
            size: doc.size,
            owner: doc.owner,
            land_type: doc.land_type,
            market_value: doc.market_value,
            notes: doc.notes,
            polygons: doc.polygons,
            created_by: doc.created_by,
            updated_by: doc.updated_by,
            history: doc.history.into_iter().map(Into::into).collect(),
            created_at: doc
                .metadata
                .created_at
                .and_then(|d| d.try_to_rfc3339_string().ok()),
            updated_at: doc
                .metadata
                .updated_at
                .and_then(|d| d.try_to_rfc3339_string().ok()),
        }
    }
}

// =============================================================================
// Route Handlers
// =============================================================================

/// GET /api/land
async fn handle_list(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let uid = match authenticate(&state, get_auth_header(&req)) {
        Ok(u) => u,
        Err(resp) => return resp,
    };

    let store: RecordStore<LandDoc> = match open_store(&state).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match store.list(&uid).await {
        Ok(lands) if lands.is_empty() => {
            error_response(StatusCode::NOT_FOUND, "No land records found", None)
        }
        Ok(lands) => {
            let body: Vec<LandResponse> = lands.into_iter().map(Into::into).collect();
            json_response(StatusCode::OK, &body)
        }
        Err(e) => operation_failure("Error fetching land records", &e),
    }
}

/// GET /api/land/{id}
async fn handle_get(
    req: Request<Incoming>,
    state: Arc<AppState>,
    raw_id: &str,
) -> Response<BoxBody> {
    let uid = match authenticate(&state, get_auth_header(&req)) {
        Ok(u) => u,
        Err(resp) => return resp,
    };

    let id = match parse_record_id(raw_id, "Land") {
        Ok(id) => id,
        Err(e) => return operation_failure("Error fetching land record", &e),
    };

    let store: RecordStore<LandDoc> = match open_store(&state).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match store.get(&uid, &id).await {
        Ok(land) => json_response(StatusCode::OK, &LandResponse::from(land)),
        Err(e) => operation_failure("Error fetching land record", &e),
    }
}

/// POST /api/land
async fn handle_create(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let auth_header = get_auth_header(&req).map(String::from);
    let uid = match authenticate(&state, auth_header.as_deref()) {
        Ok(u) => u,
        Err(resp) => return resp,
    };

    let payload: LandPayload = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(p) => p,
        Err(e) => return operation_failure("Error creating land", &e),
    };

    let store: RecordStore<LandDoc> = match open_store(&state).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match store.create(&uid, &payload).await {
        Ok(id) => json_response(
            StatusCode::CREATED,
            &CreatedResponse { id: id.to_hex() },
        ),
        Err(e) => operation_failure("Error creating land", &e),
    }
}

/// PUT /api/land and PUT /api/land/{id}
async fn handle_update(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path_id: Option<String>,
) -> Response<BoxBody> {
    let auth_header = get_auth_header(&req).map(String::from);
    let uid = match authenticate(&state, auth_header.as_deref()) {
        Ok(u) => u,
        Err(resp) => return resp,
    };

    let body: LandUpdateRequest = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => return operation_failure("Error updating land", &e),
    };

    let raw_id = match path_id.or(body.id) {
        Some(id) => id,
        None => return error_response(StatusCode::BAD_REQUEST, "Land ID is required", None),
    };

    let id = match parse_record_id(&raw_id, "Land") {
        Ok(id) => id,
        Err(e) => return operation_failure("Error updating land", &e),
    };

    let store: RecordStore<LandDoc> = match open_store(&state).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match store.update(&uid, &id, &body.payload).await {
        Ok(updated) => json_response(StatusCode::OK, &LandResponse::from(updated)),
        Err(e) => operation_failure("Error updating land", &e),
    }
}

/// DELETE /api/land and DELETE /api/land/{id}
async fn handle_delete(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path_id: Option<String>,
) -> Response<BoxBody> {
    let auth_header = get_auth_header(&req).map(String::from);
    let uid = match authenticate(&state, auth_header.as_deref()) {
        Ok(u) => u,
        Err(resp) => return resp,
    };

    let raw_id = match path_id {
        Some(id) => id,
        None => {
            let body: LandDeleteRequest =
                match parse_json_body(req, state.args.max_body_bytes).await {
                    Ok(b) => b,
                    Err(e) => return operation_failure("Error deleting land", &e),
                };
            match body.id {
                Some(id) => id,
                None => {
                    return error_response(StatusCode::BAD_REQUEST, "Land ID is required", None)
                }
            }
        }
    };

    let id = match parse_record_id(&raw_id, "Land") {
        Ok(id) => id,
        Err(e) => return operation_failure("Error deleting land", &e),
    };

    let store: RecordStore<LandDoc> = match open_store(&state).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match store.delete(&uid, &id).await {
        Ok(()) => json_response(
            StatusCode::OK,
            &MessageResponse {
                message: "Land record deleted successfully".to_string(),
            },
        ),
        Err(e) => operation_failure("Error deleting land", &e),
    }
}

// =============================================================================
// Main Router
// =============================================================================

/// Handle land HTTP requests.
///
/// Returns Some(response) if the request was handled, None if it is not a
/// land route.
pub async fn handle_land_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req
        .uri()
        .path()
        .split('?')
        .next()
        .unwrap_or_default()
        .to_string();

    if path != "/api/land" && !path.starts_with("/api/land/") {
        return None;
    }

    let method = req.method().clone();
    if method == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let trailing = path_suffix(&path, "/api/land").map(String::from);

    let response = if path == "/api/land" {
        match method {
            Method::GET => handle_list(req, state).await,
            Method::POST => handle_create(req, state).await,
            Method::PUT => handle_update(req, state, None).await,
            Method::DELETE => handle_delete(req, state, None).await,
            _ => method_not_allowed(),
        }
    } else if let Some(raw_id) = trailing {
        match method {
            Method::GET => handle_get(req, state, &raw_id).await,
            Method::PUT => handle_update(req, state, Some(raw_id)).await,
            Method::DELETE => handle_delete(req, state, Some(raw_id)).await,
            _ => method_not_allowed(),
        }
    } else {
        error_response(StatusCode::NOT_FOUND, "Not found", None)
    };

    Some(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{HistoryAction, HistoryEntry, Metadata};
    use bson::oid::ObjectId;

    #[test]
    fn test_land_response_from_doc() {
        let id = ObjectId::new();
        let doc = LandDoc {
            id: Some(id),
            metadata: Metadata::new(),
            name: Some("Plot A".into()),
            location: Some("X".into()),
            size: Some("10".into()),
            created_by: "u1".into(),
            updated_by: "u1".into(),
            history: vec![HistoryEntry::new(
                HistoryAction::Create,
                "u1",
                bson::Bson::Null,
            )],
            ..Default::default()
        };

        let resp = LandResponse::from(doc);
        assert_eq!(resp.id, id.to_hex());
        assert_eq!(resp.name.as_deref(), Some("Plot A"));
        assert_eq!(resp.history.len(), 1);
        assert_eq!(resp.created_by, "u1");
        assert!(resp.created_at.is_some());
    }

    #[test]
    fn test_update_request_flattens_payload() {
        let body = r#"{"id":"64f0c2a9d3e8b45f1a2b3c4d","name":"Plot B","size":"12"}"#;
        let parsed: LandUpdateRequest = serde_json::from_str(body).unwrap();

        assert_eq!(parsed.id.as_deref(), Some("64f0c2a9d3e8b45f1a2b3c4d"));
        assert_eq!(parsed.payload.name.as_deref(), Some("Plot B"));
        assert_eq!(parsed.payload.size.as_deref(), Some("12"));
        assert!(parsed.payload.location.is_none());
    }

    #[test]
    fn test_update_request_without_id() {
        let parsed: LandUpdateRequest = serde_json::from_str(r#"{"name":"Plot B"}"#).unwrap();
        assert!(parsed.id.is_none());
        assert_eq!(parsed.payload.name.as_deref(), Some("Plot B"));
    }
}
