// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// Read-only JSON view of the latest scan for a dashboard front end.  All
// endpoints live under `/api/v1/`.  There is no authentication: the scanner
// is a single-user tool and binds to localhost by default.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::app_state::AppState;
use crate::signals::Signal;

// =============================================================================
// Router construction
// =============================================================================

/// Build the REST router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/scan", get(latest_scan))
        .route("/api/v1/scan/:symbol", get(symbol_scan))
        .route("/api/v1/config", get(config))
        .layer(cors)
        .with_state(state)
}

fn not_found(message: impl Into<String>) -> Response {
    let body = serde_json::json!({ "error": message.into() });
    (StatusCode::NOT_FOUND, Json(body)).into_response()
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    scans_completed: u64,
    last_scan_id: Option<String>,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        scans_completed: state.scans_completed(),
        last_scan_id: state.latest_report().map(|r| r.id.clone()),
        server_time: chrono::Utc::now().timestamp_millis(),
    };
    Json(resp)
}

// =============================================================================
// Scan results
// =============================================================================

#[derive(Serialize)]
struct SignalCount {
    signal: Signal,
    label: &'static str,
    count: usize,
}

async fn latest_scan(State(state): State<Arc<AppState>>) -> Response {
    let Some(report) = state.latest_report() else {
        return not_found("no scan has completed yet");
    };

    let summary: Vec<SignalCount> = report
        .counts()
        .into_iter()
        .map(|(signal, count)| SignalCount {
            signal,
            label: signal.label(),
            count,
        })
        .collect();

    Json(serde_json::json!({
        "summary": summary,
        "report": &*report,
    }))
    .into_response()
}

async fn symbol_scan(State(state): State<Arc<AppState>>, Path(symbol): Path<String>) -> Response {
    let Some(report) = state.latest_report() else {
        return not_found("no scan has completed yet");
    };

    let verdicts = report.for_symbol(&symbol);
    if verdicts.is_empty() {
        return not_found(format!("{symbol} is not in the latest scan"));
    }

    Json(serde_json::json!({
        "scan_id": report.id,
        "finished_at": report.finished_at,
        "symbol": symbol.to_uppercase(),
        "verdicts": verdicts,
    }))
    .into_response()
}

// =============================================================================
// Config
// =============================================================================

async fn config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.config.clone())
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::runtime_config::ScannerConfig;
    use crate::scanner::{PairVerdict, ScanReport};
    use crate::signals::TradeIdea;

    fn verdict(symbol: &str, timeframe: &str, signal: Signal) -> PairVerdict {
        PairVerdict {
            symbol: symbol.into(),
            timeframe: timeframe.into(),
            interval: timeframe.into(),
            signal,
            label: signal.label(),
            bars: 200,
            as_of: None,
            usable_rows: 151,
            change_pct: Some(-4.2),
            trade_idea: Some(TradeIdea::Buy),
            latest: None,
            error: None,
        }
    }

    fn state_with_report() -> Arc<AppState> {
        let state = AppState::new(ScannerConfig::default());
        state.publish(ScanReport {
            id: "scan-1".into(),
            source: "yahoo".into(),
            started_at: "2026-01-01T00:00:00+00:00".into(),
            finished_at: "2026-01-01T00:00:05+00:00".into(),
            verdicts: vec![
                verdict("AAPL", "1d", Signal::BullishReversal),
                verdict("AAPL", "1h", Signal::NoSetup),
                verdict("TSLA", "1d", Signal::InsufficientData),
            ],
        });
        Arc::new(state)
    }

    async fn get(state: Arc<AppState>, uri: &str) -> (StatusCode, serde_json::Value) {
        let resp = router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_reports_scan_count() {
        let (status, body) = get(state_with_report(), "/api/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["scans_completed"], 1);
        assert_eq!(body["last_scan_id"], "scan-1");
    }

    #[tokio::test]
    async fn scan_before_first_pass_is_404() {
        let state = Arc::new(AppState::new(ScannerConfig::default()));
        let (status, body) = get(state, "/api/v1/scan").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().is_some());
    }

    #[tokio::test]
    async fn latest_scan_has_summary_and_verdicts() {
        let (status, body) = get(state_with_report(), "/api/v1/scan").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["report"]["verdicts"].as_array().map(Vec::len), Some(3));
        assert_eq!(body["report"]["verdicts"][0]["signal"], "bullish_reversal");
        assert_eq!(body["report"]["verdicts"][0]["label"], "Bullish Reversal Signal");
        assert_eq!(body["report"]["verdicts"][0]["trade_idea"], "buy");
        assert_eq!(body["summary"][0]["count"], 1);
        assert_eq!(body["summary"][3]["signal"], "insufficient_data");
    }

    #[tokio::test]
    async fn symbol_lookup_is_case_insensitive() {
        let (status, body) = get(state_with_report(), "/api/v1/scan/aapl").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["symbol"], "AAPL");
        assert_eq!(body["verdicts"].as_array().map(Vec::len), Some(2));

        let (status, _) = get(state_with_report(), "/api/v1/scan/NVDA").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn config_endpoint_echoes_settings() {
        let (status, body) = get(state_with_report(), "/api/v1/config").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["symbols"][0], "TSLA");
        assert_eq!(body["indicators"]["macd_slow"], 26);
        assert_eq!(body["thresholds"]["rsi_oversold"], 40.0);
    }
}
