use axum::{
    Json,
    extract::{Path, State},
};

use crate::core::error::DispatchResult;
use crate::entities::ContractorCandidate;
use crate::server::router::AppState;

/// Active contractors serving `area`, cheapest first
pub async fn find_by_area(
    State(host): State<AppState>,
    Path(area): Path<String>,
) -> DispatchResult<Json<Vec<ContractorCandidate>>> {
    Ok(Json(host.engine().matcher().find_by_area(&area).await?))
}
