use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::http::{HeaderMap, HeaderValue, header};
use axum::middleware::Next;
use axum::response::Response;
use http_body_util::BodyExt;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

pub static X_TRACE_ID: &str = "x-trace-id";

/// Bodies up to this size are logged in full.
const MAX_LOGGED_BODY: usize = 1024;

pub async fn trace_middleware(req: Request, next: Next) -> Response {
    let start_time = Instant::now();

    let trace_id = req
        .headers()
        .get(X_TRACE_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);
    let trace_value = HeaderValue::from_str(&trace_id.to_string()).ok();

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    async move {
        info!("→ request started");
        let mut req = if is_json(req.headers()) {
            let (parts, body) = req.into_parts();
            let bytes = buffer_and_log("request", &parts.headers, body).await;
            Request::from_parts(parts, Body::from(bytes))
        } else {
            req
        };
        if let Some(value) = &trace_value {
            req.headers_mut().insert(X_TRACE_ID, value.clone());
        }

        let response = next.run(req).await;

        // Streaming responses pass through untouched.
        let mut response = if is_json(response.headers()) {
            let (parts, body) = response.into_parts();
            let bytes = buffer_and_log("response", &parts.headers, body).await;
            Response::from_parts(parts, Body::from(bytes))
        } else {
            response
        };
        if let Some(value) = trace_value {
            response.headers_mut().insert(X_TRACE_ID, value);
        }

        info!(
            status = response.status().as_u16(),
            latency_ms = start_time.elapsed().as_millis(),
            "← response finished"
        );
        response
    }
    .instrument(span)
    .await
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"))
}

async fn buffer_and_log(direction: &str, headers: &HeaderMap, body: Body) -> Bytes {
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(direction, error = %e, "failed to read body");
            return Bytes::new();
        }
    };

    if bytes.len() <= MAX_LOGGED_BODY {
        if let Ok(text) = std::str::from_utf8(&bytes) {
            info!(direction, body = text, "body");
        }
    } else {
        let content_type = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()).unwrap_or("");
        info!(direction, content_type, size = bytes.len(), "body skipped");
    }
    bytes
}
