use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use log::{error, info};
use tokio::net::TcpListener;

use crate::config::ReportConfig;
use crate::error::{PipescopeError, Result};
use crate::output::{render_html, RenderOptions};
use crate::providers::AzureDevOpsProvider;
use crate::records::ProjectRecord;

/// Shared state for the report routes.
pub struct AppState {
    pub provider: AzureDevOpsProvider,
    pub report: ReportConfig,
}

impl AppState {
    fn render_options(&self) -> RenderOptions {
        RenderOptions {
            title: self.report.title.clone(),
            threshold_days: self.report.stale_threshold_days,
            exclusion_tags: self.report.exclusion_tags.clone(),
            generated_at: Utc::now(),
        }
    }
}

/// Build the report router. Every report request runs one full aggregation.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/report/generate", get(generate_report))
        .route("/api/report/data", get(report_data))
        .with_state(state)
}

/// Binds `bind` and serves until the process is stopped.
pub async fn serve(state: Arc<AppState>, bind: &str) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .map_err(|e| PipescopeError::Server(format!("Failed to bind {bind}: {e}")))?;
    info!("Serving pipeline reports on http://{bind}/api/report/generate");

    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

async fn generate_report(
    State(state): State<Arc<AppState>>,
) -> std::result::Result<Html<String>, ApiError> {
    info!(
        "Generating HTML report for organization {}",
        state.provider.organization()
    );
    let aggregation = state.provider.fetch_all(false).await;
    let html = render_html(&aggregation.projects, &state.render_options())?;
    Ok(Html(html))
}

async fn report_data(State(state): State<Arc<AppState>>) -> Json<Vec<ProjectRecord>> {
    info!(
        "Collecting report data for organization {}",
        state.provider.organization()
    );
    Json(state.provider.fetch_all(false).await.projects)
}

/// Total failure of a report request. Details go to the log only.
#[derive(Debug)]
pub struct ApiError(PipescopeError);

impl From<PipescopeError> for ApiError {
    fn from(err: PipescopeError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("Report request failed: {}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": "Failed to generate report" })),
        )
            .into_response()
    }
}
