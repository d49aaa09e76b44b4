use std::{collections::HashMap, net::SocketAddr, path::Path, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Query, Request, State},
    http::Method,
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tower::ServiceExt;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;

use crate::{
    error::TemplateError,
    pipeline::Pipeline,
    request::{OutputFormat, TemplateRequest},
};

#[derive(Clone)]
struct WebAppState {
    pipeline: Arc<Pipeline>,
    assets: ServeDir,
}

/// Build the service routes. Nothing is registered globally; the returned
/// router is the whole HTTP surface.
pub fn router(pipeline: Arc<Pipeline>, static_dir: &Path) -> Router {
    let state = WebAppState {
        pipeline,
        assets: ServeDir::new(static_dir),
    };
    Router::new()
        .route("/", any(root))
        .route("/template", any(template))
        .route("/healthz", get(healthz))
        .fallback_service(state.assets.clone())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_web_app(listen: SocketAddr, app: Router) -> anyhow::Result<()> {
    let listener = TcpListener::bind(listen).await?;
    info!(addr = %listener.local_addr()?, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}

async fn template(
    State(state): State<WebAppState>,
    method: Method,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<Response, TemplateError> {
    let request = TemplateRequest::parse(&method, &query, &body)?;
    render(&state, &request).await
}

async fn root(
    State(state): State<WebAppState>,
    Query(query): Query<HashMap<String, String>>,
    request: Request,
) -> Result<Response, TemplateError> {
    match query.get("c").filter(|c| !c.is_empty()) {
        Some(chart_url) => {
            let request = TemplateRequest::shortcut(chart_url)?;
            render(&state, &request).await
        }
        None => {
            let response = match state.assets.oneshot(request).await {
                Ok(response) => response.into_response(),
                Err(infallible) => match infallible {},
            };
            Ok(response)
        }
    }
}

async fn render(
    state: &WebAppState,
    request: &TemplateRequest,
) -> Result<Response, TemplateError> {
    let rendered = state.pipeline.run(request).await?;
    Ok(match request.format {
        OutputFormat::Json => Json(rendered).into_response(),
        OutputFormat::Raw => rendered.templates.into_response(),
    })
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
