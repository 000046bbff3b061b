//! Catalog handlers, shared by `/types` and `/areas`

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
};
use uuid::Uuid;

use crate::core::error::{DispatchResult, EntityError};
use crate::core::query::CatalogQuery;
use crate::core::validation::Validated;
use crate::entities::{CatalogEntry, CatalogKind, CatalogPatch, NewCatalogEntry};
use crate::server::router::AppState;

/// Collection and item routes of one catalog under `base`
pub fn routes(base: &str, kind: CatalogKind) -> Router<AppState> {
    Router::new()
        .route(
            base,
            get(move |state: State<AppState>, query: Query<CatalogQuery>| {
                list(kind, state, query)
            })
            .post(move |state: State<AppState>, payload: Validated<NewCatalogEntry>| {
                create(kind, state, payload)
            }),
        )
        .route(
            &format!("{}/{{id}}", base),
            put(
                move |state: State<AppState>,
                      id: Path<String>,
                      payload: Validated<CatalogPatch>| update(kind, state, id, payload),
            )
            .delete(move |state: State<AppState>, id: Path<String>| delete(kind, state, id)),
        )
}

fn entry_id(kind: CatalogKind, id: &str) -> DispatchResult<Uuid> {
    Uuid::parse_str(id.trim()).map_err(|_| {
        EntityError::NotFound {
            entity_type: kind.as_str().to_string(),
            id: id.to_string(),
        }
        .into()
    })
}

async fn list(
    kind: CatalogKind,
    State(host): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> DispatchResult<Json<Vec<CatalogEntry>>> {
    let catalog = host.engine().catalog();
    let entries = match query.active {
        Some(true) => catalog.list_active(kind).await?,
        Some(false) => {
            let mut entries = catalog.list(kind).await?;
            entries.retain(|e| !e.status.is_active());
            entries
        }
        None => catalog.list(kind).await?,
    };
    Ok(Json(entries))
}

async fn create(
    kind: CatalogKind,
    State(host): State<AppState>,
    Validated(payload): Validated<NewCatalogEntry>,
) -> DispatchResult<(StatusCode, Json<CatalogEntry>)> {
    let entry = host.engine().catalog().create(kind, payload).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn update(
    kind: CatalogKind,
    State(host): State<AppState>,
    Path(id): Path<String>,
    Validated(patch): Validated<CatalogPatch>,
) -> DispatchResult<Json<CatalogEntry>> {
    let id = entry_id(kind, &id)?;
    Ok(Json(host.engine().catalog().update(kind, &id, patch).await?))
}

async fn delete(
    kind: CatalogKind,
    State(host): State<AppState>,
    Path(id): Path<String>,
) -> DispatchResult<StatusCode> {
    let id = entry_id(kind, &id)?;
    host.engine().catalog().delete(kind, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
