//! Route handlers for the populate service.

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::{Result, ServerError};
use super::state::AppState;
use crate::types::{EntryReference, ReferenceSet};

/// Query parameters accepted by the populate and references routes.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulateParams {
    pub lexical_field: Option<String>,
    pub populate: Option<bool>,
}

/// `GET /health`
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptimeSecs": state.uptime_secs(),
    }))
}

/// `GET /populate/:content_type/:document_id`
pub async fn populate_one(
    State(state): State<Arc<AppState>>,
    Path((content_type, document_id)): Path<(String, String)>,
    Query(params): Query<PopulateParams>,
) -> Result<Json<Value>> {
    let field = state.lexical_field(params.lexical_field.as_deref());
    let entity = state
        .populator
        .find_entity(&content_type, &document_id)
        .await?
        .ok_or_else(|| {
            ServerError::not_found(format!("{content_type} '{document_id}' not found"))
        })?;

    let (data, references) = if params.populate.unwrap_or(true) {
        let outcome = state.populator.populate(&entity, field).await;
        tracing::debug!(
            content_type = %content_type,
            document_id = %document_id,
            media_resolved = outcome.stats.media_resolved,
            entries_resolved = outcome.stats.entries_resolved,
            misses = outcome.stats.misses,
            "populated entity"
        );
        (outcome.entity, outcome.references)
    } else {
        let references = state.populator.extract(&entity, field);
        (entity, references)
    };

    Ok(Json(json!({
        "data": data,
        "meta": {
            "references": {
                "media": references.media().len(),
                "entries": references.entries().len(),
            }
        }
    })))
}

/// Body of `POST /populate-bulk/:content_type`.
#[derive(Debug)]
struct BulkRequest {
    document_ids: Vec<String>,
    lexical_field: Option<String>,
    populate: bool,
}

impl BulkRequest {
    fn parse(body: &Value) -> Result<Self> {
        let ids = body
            .get("documentIds")
            .and_then(Value::as_array)
            .ok_or_else(|| ServerError::bad_request("documentIds must be an array"))?;
        if ids.is_empty() {
            return Err(ServerError::bad_request("documentIds must not be empty"));
        }
        // Repeated ids are collapsed, keeping first-seen order.
        let mut seen = HashSet::new();
        let mut document_ids = Vec::with_capacity(ids.len());
        for id in ids {
            let id = id.as_str().filter(|s| !s.is_empty()).ok_or_else(|| {
                ServerError::bad_request("documentIds must contain non-empty strings")
            })?;
            if seen.insert(id) {
                document_ids.push(id.to_string());
            }
        }

        let lexical_field = match body.get("lexicalField") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => return Err(ServerError::bad_request("lexicalField must be a string")),
        };
        let populate = match body.get("populate") {
            None | Some(Value::Null) => true,
            Some(Value::Bool(b)) => *b,
            Some(_) => return Err(ServerError::bad_request("populate must be a boolean")),
        };

        Ok(Self {
            document_ids,
            lexical_field,
            populate,
        })
    }
}

/// `POST /populate-bulk/:content_type`
pub async fn populate_bulk(
    State(state): State<Arc<AppState>>,
    Path(content_type): Path<String>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(body) = body.map_err(|e| ServerError::bad_request(e.body_text()))?;
    let request = BulkRequest::parse(&body)?;
    let field = state.lexical_field(request.lexical_field.as_deref());

    let entities = state
        .populator
        .find_entities(&content_type, &request.document_ids)
        .await?;

    let (data, media, entries) = if request.populate {
        let outcome = state.populator.populate_many(&entities, field).await;
        (
            outcome.entities,
            outcome.references.media().len(),
            outcome.entry_reference_total,
        )
    } else {
        let mut union = ReferenceSet::new();
        let mut entry_total = 0;
        for entity in &entities {
            let references = state.populator.extract(entity, field);
            entry_total += references.entries().len();
            union.extend_from(&references);
        }
        (entities, union.media().len(), entry_total)
    };

    Ok(Json(json!({
        "meta": {
            "total": data.len(),
            "references": {
                "media": media,
                "entries": entries,
            }
        },
        "data": data,
    })))
}

/// `GET /references/:content_type/:document_id`
pub async fn references(
    State(state): State<Arc<AppState>>,
    Path((content_type, document_id)): Path<(String, String)>,
    Query(params): Query<PopulateParams>,
) -> Result<Json<Value>> {
    let field = state.lexical_field(params.lexical_field.as_deref());
    let entity = state
        .populator
        .find_entity(&content_type, &document_id)
        .await?
        .ok_or_else(|| {
            ServerError::not_found(format!("{content_type} '{document_id}' not found"))
        })?;

    let references = state.populator.extract(&entity, field);
    Ok(Json(json!({
        "meta": { "total": references.len() },
        "data": references,
    })))
}

/// Body of `POST /validate-references`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ValidateRequest {
    pub media: Vec<String>,
    pub entries: Vec<EntryReference>,
}

/// `POST /validate-references`
pub async fn validate_references(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<ValidateRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(request) = body.map_err(|e| ServerError::bad_request(e.body_text()))?;
    let report = state
        .populator
        .validate_references(&request.media, &request.entries)
        .await;

    Ok(Json(json!({
        "meta": {
            "media": {
                "valid": report.media.valid.len(),
                "invalid": report.media.invalid.len(),
            },
            "entries": {
                "valid": report.entries.valid.len(),
                "invalid": report.entries.invalid.len(),
            }
        },
        "data": report,
    })))
}
