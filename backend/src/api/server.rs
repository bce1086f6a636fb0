//! HTTP server for the decode API.
//!
//! # API Endpoints
//!
//! | Method | Path           | Description                          |
//! |--------|----------------|--------------------------------------|
//! | GET    | `/health`      | Health check                         |
//! | POST   | `/api/decode`  | Upload an export file for decoding   |
//! | GET    | `/api/logs`    | SSE stream for real-time logs        |

use axum::{
    extract::{Multipart, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, LOG_BROADCASTER};
use super::types::{error_response, DecodeResponse};
use crate::config::DecodeOptions;
use crate::error::{ServerError, ServerResult};
use crate::pipeline::decode_read_concurrent;
use crate::reader::read_bytes;

type ApiError = (StatusCode, Json<Value>);

/// Build the router. Every upload is decoded with `options`.
pub fn router(options: DecodeOptions) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/decode", post(decode_upload))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(Arc::new(options))
}

/// Start the HTTP server
pub async fn start_server(port: u16, options: DecodeOptions) -> ServerResult<()> {
    let app = router(options);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    eprintln!("🚀 factcheck server running on http://localhost:{}", port);
    eprintln!("   POST /api/decode - Upload export file");
    eprintln!("   GET  /api/logs   - SSE log stream");
    eprintln!("   GET  /health     - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "factcheck",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "decode": "POST /api/decode",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn reject(err: ServerError) -> ApiError {
    let status = match err {
        ServerError::Source(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
        ServerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(error_response(&err.to_string())))
}

async fn read_upload(mut multipart: Multipart) -> ServerResult<(Option<String>, Vec<u8>)> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            file_name = field.file_name().map(|s| s.to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
            file_data = Some(bytes.to_vec());
        }
    }

    let bytes = file_data.ok_or_else(|| ServerError::BadRequest("No file provided".into()))?;
    Ok((file_name, bytes))
}

/// Decode an uploaded export.
async fn decode_upload(
    State(options): State<Arc<DecodeOptions>>,
    multipart: Multipart,
) -> Result<Json<DecodeResponse>, ApiError> {
    let (file_name, bytes) = read_upload(multipart).await.map_err(reject)?;

    log_info(format!(
        "New upload: {} ({} bytes)",
        file_name.as_deref().unwrap_or("unknown"),
        bytes.len()
    ));

    let read = read_bytes(&bytes, &options).map_err(|e| {
        log_error(format!("Source unreadable: {}", e));
        reject(e.into())
    })?;
    let output = decode_read_concurrent(read, &options).await;

    Ok(Json(DecodeResponse::from(output)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;

    #[test]
    fn test_rejection_status_codes() {
        let (status, body) = reject(ServerError::Source(SourceError::NoRows));
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.0["status"], "error");

        let (status, _) = reject(ServerError::BadRequest("No file provided".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health_reports_service() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "factcheck");
    }
}
