//! Route table of the dispatch API

use std::sync::Arc;

use axum::{
    Json, Router,
    routing::{get, post, put},
};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{catalog, contractors, work_orders};
use super::host::DispatchHost;
use crate::entities::CatalogKind;

pub type AppState = Arc<DispatchHost>;

/// Build every dispatch route:
/// - GET/POST /types, /areas and PUT/DELETE /types/{id}, /areas/{id}
/// - /work-orders, its lifecycle sub-resources and child mapping
/// - GET /contractors/by-area/{area}
/// - POST /blobs/{work_order_id}/{kind}
/// - GET /health
pub fn build_routes(host: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
        .merge(catalog::routes("/types", CatalogKind::Type))
        .merge(catalog::routes("/areas", CatalogKind::Area))
        .merge(work_order_routes())
        .route(
            "/contractors/by-area/{area}",
            get(contractors::find_by_area),
        )
        .route(
            "/blobs/{work_order_id}/{kind}",
            post(work_orders::upload_image),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(host)
}

fn work_order_routes() -> Router<AppState> {
    Router::new()
        .route("/work-orders", post(work_orders::create))
        .route("/work-orders/generate-id", get(work_orders::generate_id))
        .route("/work-orders/search", get(work_orders::search))
        .route("/work-orders/search/active", get(work_orders::search_active))
        .route("/work-orders/filter", get(work_orders::filter))
        .route("/work-orders/parents", get(work_orders::parents))
        .route(
            "/work-orders/{id}",
            get(work_orders::get).patch(work_orders::update),
        )
        .route(
            "/work-orders/{id}/children",
            get(work_orders::children).post(work_orders::map_children),
        )
        .route(
            "/work-orders/{id}/eligible-children",
            get(work_orders::eligible_children),
        )
        .route("/work-orders/{id}/history", get(work_orders::history))
        .route(
            "/work-orders/{id}/notifications",
            get(work_orders::notifications),
        )
        .route("/work-orders/{id}/candidates", get(work_orders::candidates))
        .route("/work-orders/{id}/assign", put(work_orders::assign))
        .route("/work-orders/{id}/auto-assign", put(work_orders::auto_assign))
        .route(
            "/work-orders/{id}/assignment-attempts",
            get(work_orders::assignment_attempts),
        )
        .route(
            "/work-orders/{id}/stop-automation",
            put(work_orders::stop_automation),
        )
        .route("/work-orders/{id}/respond", post(work_orders::respond))
        .route("/work-orders/{id}/reopen", put(work_orders::reopen))
        .route("/work-orders/{id}/start", put(work_orders::start))
        .route("/work-orders/{id}/close", put(work_orders::close))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "workorder-dispatch"
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::DispatchServerBuilder;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn router() -> Router {
        DispatchServerBuilder::new().build().unwrap()
    }

    async fn call(uri: &str) -> (StatusCode, Value) {
        let response = router()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_health_routes() {
        for uri in ["/health", "/healthz"] {
            let (status, body) = call(uri).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["service"], "workorder-dispatch");
        }
    }

    #[tokio::test]
    async fn test_static_segments_win_over_id() {
        let (status, body) = call("/work-orders/search?query=").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        let (status, body) = call("/work-orders/01012024P000001").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");

        let (status, body) = call("/work-orders/parents").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let (status, _) = call("/links").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
