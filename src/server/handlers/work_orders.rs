//! Work order handlers
//!
//! Thin adapters from HTTP to [`LifecycleEngine`](crate::dispatch::LifecycleEngine):
//! bodies go through [`Validated`], errors render as [`DispatchError`] responses.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::error::{DispatchError, DispatchResult, ValidationError};
use crate::core::query::{FilterQuery, GenerateIdQuery, SearchQuery};
use crate::core::validation::Validated;
use crate::core::validation::validators::{is_work_order_id, not_blank};
use crate::dispatch::{AssignmentOutcome, ContractorResponse};
use crate::entities::{
    AssignmentAttempt, AutomationStatus, ContractorCandidate, LifecycleEntry, MapChildren,
    NewWorkOrder, NotificationRecord, WorkOrder, WorkOrderPatch,
};
use crate::server::router::AppState;

/// Image slots a work order has
const IMAGE_KINDS: [&str; 2] = ["opening", "closing"];

#[derive(Debug, Serialize)]
pub struct GeneratedId {
    pub id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AssignRequest {
    #[validate(custom(function = "not_blank"))]
    pub contractor_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CloseRequest {
    #[serde(default)]
    pub closing_images: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadedImage {
    pub reference: String,
}

pub async fn generate_id(
    State(host): State<AppState>,
    Query(query): Query<GenerateIdQuery>,
) -> DispatchResult<Json<GeneratedId>> {
    let Some(work_order_type) = query
        .work_order_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
    else {
        return Err(ValidationError::MissingArgument {
            argument: "type".to_string(),
        }
        .into());
    };
    let id = host.engine().generate_id(work_order_type, query.child).await?;
    Ok(Json(GeneratedId { id }))
}

pub async fn create(
    State(host): State<AppState>,
    Validated(payload): Validated<NewWorkOrder>,
) -> DispatchResult<(StatusCode, Json<WorkOrder>)> {
    let work_order = host.engine().create(payload).await?;
    Ok((StatusCode::CREATED, Json(work_order)))
}

pub async fn get(
    State(host): State<AppState>,
    Path(id): Path<String>,
) -> DispatchResult<Json<WorkOrder>> {
    Ok(Json(host.engine().get(&id).await?))
}

pub async fn update(
    State(host): State<AppState>,
    Path(id): Path<String>,
    Validated(patch): Validated<WorkOrderPatch>,
) -> DispatchResult<Json<WorkOrder>> {
    Ok(Json(host.engine().update(&id, patch).await?))
}

pub async fn search(
    State(host): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> DispatchResult<Json<Vec<WorkOrder>>> {
    Ok(Json(host.engine().search().search(query.text()).await?))
}

pub async fn search_active(
    State(host): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> DispatchResult<Json<WorkOrder>> {
    Ok(Json(host.engine().search().select_active(query.text()).await?))
}

pub async fn filter(
    State(host): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> DispatchResult<Json<Vec<WorkOrder>>> {
    Ok(Json(host.engine().search().filter(&query).await?))
}

pub async fn children(
    State(host): State<AppState>,
    Path(id): Path<String>,
) -> DispatchResult<Json<Vec<WorkOrder>>> {
    Ok(Json(host.engine().list_children(&id).await?))
}

pub async fn parents(State(host): State<AppState>) -> DispatchResult<Json<Vec<WorkOrder>>> {
    Ok(Json(host.engine().list_parents().await?))
}

pub async fn eligible_children(
    State(host): State<AppState>,
    Path(id): Path<String>,
) -> DispatchResult<Json<Vec<WorkOrder>>> {
    Ok(Json(host.engine().eligible_children(&id).await?))
}

pub async fn map_children(
    State(host): State<AppState>,
    Path(id): Path<String>,
    Validated(request): Validated<MapChildren>,
) -> DispatchResult<Json<Vec<WorkOrder>>> {
    Ok(Json(host.engine().map_children(&id, request.child_ids).await?))
}

pub async fn assignment_attempts(
    State(host): State<AppState>,
    Path(id): Path<String>,
) -> DispatchResult<Json<Vec<AssignmentAttempt>>> {
    Ok(Json(host.engine().assignment_attempts(&id).await?))
}

pub async fn stop_automation(
    State(host): State<AppState>,
    Path(id): Path<String>,
) -> DispatchResult<Json<AutomationStatus>> {
    Ok(Json(host.engine().stop_automation(&id).await?))
}

pub async fn history(
    State(host): State<AppState>,
    Path(id): Path<String>,
) -> DispatchResult<Json<Vec<LifecycleEntry>>> {
    Ok(Json(host.engine().history(&id).await?))
}

pub async fn notifications(
    State(host): State<AppState>,
    Path(id): Path<String>,
) -> DispatchResult<Json<Vec<NotificationRecord>>> {
    Ok(Json(host.engine().notifications(&id).await?))
}

pub async fn candidates(
    State(host): State<AppState>,
    Path(id): Path<String>,
) -> DispatchResult<Json<Vec<ContractorCandidate>>> {
    Ok(Json(host.engine().candidates(&id).await?))
}

pub async fn assign(
    State(host): State<AppState>,
    Path(id): Path<String>,
    Validated(request): Validated<AssignRequest>,
) -> DispatchResult<Json<AssignmentOutcome>> {
    Ok(Json(
        host.engine()
            .assign_contractor(&id, &request.contractor_id)
            .await?,
    ))
}

pub async fn auto_assign(
    State(host): State<AppState>,
    Path(id): Path<String>,
) -> DispatchResult<Json<AssignmentOutcome>> {
    Ok(Json(host.engine().auto_assign(&id).await?))
}

pub async fn respond(
    State(host): State<AppState>,
    Path(id): Path<String>,
    Validated(response): Validated<ContractorResponse>,
) -> DispatchResult<Json<AssignmentOutcome>> {
    Ok(Json(host.engine().respond(&id, response).await?))
}

pub async fn reopen(
    State(host): State<AppState>,
    Path(id): Path<String>,
) -> DispatchResult<Json<WorkOrder>> {
    Ok(Json(host.engine().reopen(&id).await?))
}

pub async fn start(
    State(host): State<AppState>,
    Path(id): Path<String>,
) -> DispatchResult<Json<WorkOrder>> {
    Ok(Json(host.engine().start(&id).await?))
}

pub async fn close(
    State(host): State<AppState>,
    Path(id): Path<String>,
    Validated(request): Validated<CloseRequest>,
) -> DispatchResult<Json<WorkOrder>> {
    Ok(Json(host.engine().close(&id, request.closing_images).await?))
}

/// Store an opening or closing image and return its reference
pub async fn upload_image(
    State(host): State<AppState>,
    Path((work_order_id, kind)): Path<(String, String)>,
    body: Bytes,
) -> DispatchResult<(StatusCode, Json<UploadedImage>)> {
    let kind = kind.trim().to_ascii_lowercase();
    if !IMAGE_KINDS.contains(&kind.as_str()) {
        return Err(DispatchError::field(
            "kind",
            format!("must be one of {}", IMAGE_KINDS.join(", ")),
        ));
    }
    if body.is_empty() {
        return Err(DispatchError::field("body", "image must not be empty"));
    }
    // Opening images are uploaded under an id from generate-id, before the work order exists.
    if !is_work_order_id(work_order_id.trim()) {
        return Err(DispatchError::field(
            "work_order_id",
            "must look like DDMMYYYY, P or W and a six digit serial",
        ));
    }

    let reference = host
        .blobs
        .put(work_order_id.trim(), &kind, body.to_vec())
        .await?;
    tracing::debug!(work_order_id = %work_order_id, kind = %kind, "image stored");
    Ok((StatusCode::CREATED, Json(UploadedImage { reference })))
}
