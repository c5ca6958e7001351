//! HTTP surface: `POST /analyzeDeck`.

use crate::engine::DeckAnalyzer;
use crate::error::Error;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;

/// Routes served by the analysis service
pub fn router(engine: Arc<DeckAnalyzer>) -> Router {
    Router::new()
        .route("/analyzeDeck", post(analyze_deck))
        .with_state(engine)
}

/// Map an engine error to its status code and JSON body
pub fn error_response(err: &Error) -> (StatusCode, Value) {
    let status = if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, json!({ "error": err.to_string() }))
}

/// Analyze a raw request body, producing the status and JSON to send back.
///
/// Blocks on upstream lookups; call from a blocking context.
pub fn respond(engine: &DeckAnalyzer, body: &[u8]) -> (StatusCode, Value) {
    match engine.analyze_request(body) {
        Ok(analysis) => match serde_json::to_value(&analysis) {
            Ok(report) => (StatusCode::OK, json!({ "analysis": [report] })),
            Err(e) => error_response(&Error::Worker(format!("could not encode report: {}", e))),
        },
        Err(err) => {
            if !err.is_client_error() {
                log::warn!("Deck analysis failed: {}", err);
            }
            error_response(&err)
        }
    }
}

async fn analyze_deck(
    State(engine): State<Arc<DeckAnalyzer>>,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let (status, payload) = tokio::task::spawn_blocking(move || respond(&engine, &body))
        .await
        .unwrap_or_else(|e| error_response(&Error::Worker(e.to_string())));
    (status, Json(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use crate::upstream::CannedFetch;

    fn engine() -> DeckAnalyzer {
        DeckAnalyzer::with_fetch(EngineConfig::default(), Arc::new(CannedFetch::new())).unwrap()
    }

    #[test]
    fn test_respond_rejects_non_list_deck() {
        let (status, body) = respond(&engine(), br#"{"deck": "Sol Ring"}"#);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Deck must be a list of strings"}));
    }

    #[test]
    fn test_respond_unparsable_body_is_server_error() {
        let (status, body) = respond(&engine(), b"not json");
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("Malformed request body"));
    }

    #[test]
    fn test_respond_wraps_analysis_in_list() {
        let (status, body) = respond(&engine(), br#"{"deck": []}"#);
        assert_eq!(status, StatusCode::OK);
        let analysis = body["analysis"].as_array().unwrap();
        assert_eq!(analysis.len(), 1);
        assert_eq!(analysis[0].as_object().unwrap().len(), 16);
    }

    #[test]
    fn test_worker_failure_maps_to_500() {
        let (status, body) = error_response(&Error::Worker("task panicked".to_string()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Analysis worker failed: task panicked");
    }
}
