use axum::{
    extract::Query,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

mod download;
mod extract;
mod media;
mod models;
mod scrape;
mod ytdlp;

use download::DownloadParams;
use models::{ExtractRequest, ExtractResponse};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let app = Router::new()
        .route("/health", get(health))
        .route("/extract", post(extract_endpoint))
        .route("/download", get(download_endpoint));

    let addr = std::env::var("PINDL_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    tracing::info!("listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.unwrap();
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn extract_endpoint(Json(req): Json<ExtractRequest>) -> Response {
    match extract::extract_pin(&req.url).await {
        Ok(result) => {
            let response = ExtractResponse {
                title: result.title,
                thumbnail: result.thumbnail,
                media_type: result.media_type,
                links: result.links,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            (StatusCode::BAD_REQUEST, Json(json!({"detail": e.to_string()}))).into_response()
        }
    }
}

async fn download_endpoint(Query(params): Query<DownloadParams>) -> Response {
    match download::proxy_download(params).await {
        Ok(response) => response,
        Err(e) => {
            (StatusCode::BAD_REQUEST, Json(json!({"detail": e.to_string()}))).into_response()
        }
    }
}
