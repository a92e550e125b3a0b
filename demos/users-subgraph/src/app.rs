//! HTTP surface: GraphQL over GET and POST, plus a health check.
use std::sync::Arc;

use apollo_compiler::response::JsonMap;
use axum::Json;
use axum::Router;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use federated_subgraph::Federation;
use federated_subgraph::graphql::Request;
use serde::Deserialize;
use serde_json_bytes::json;

pub(crate) fn router(federation: Arc<Federation>, path: &str) -> Router {
    Router::new()
        .route(path, get(handle_get).post(handle_post))
        .route("/health", get(health_check))
        .with_state(federation)
}

/// GraphQL over GET: `variables` arrives JSON-encoded in the query string.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetRequest {
    query: String,
    operation_name: Option<String>,
    variables: Option<String>,
}

async fn handle_get(
    State(federation): State<Arc<Federation>>,
    Query(request): Query<GetRequest>,
) -> Response {
    let variables = match request.variables.as_deref().map(serde_json::from_str::<JsonMap>) {
        None => None,
        Some(Ok(variables)) => Some(variables),
        Some(Err(error)) => {
            return (
                StatusCode::BAD_REQUEST,
                format!("invalid variables: {error}"),
            )
                .into_response();
        }
    };
    let request = Request::builder()
        .query(request.query)
        .and_operation_name(request.operation_name)
        .and_variables(variables)
        .build();
    execute(federation, request).await
}

async fn handle_post(
    State(federation): State<Arc<Federation>>,
    Json(request): Json<Request>,
) -> Response {
    execute(federation, request).await
}

async fn execute(federation: Arc<Federation>, request: Request) -> Response {
    match tokio::task::spawn_blocking(move || federation.execute(&request)).await {
        Ok(response) => Json(response).into_response(),
        Err(error) => {
            tracing::error!(%error, "request execution failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "pass" }))
}
