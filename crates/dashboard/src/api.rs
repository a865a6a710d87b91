//! JSON trader endpoints.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::filters::{FilterParams, TraderFilters};
use common::store::{QueryExecutor, StoreError};
use common::types::{Period, TraderDetail, TraderStats};
use serde::{Deserialize, Serialize};

use crate::AppState;

/// `{success, data}` or `{success, error}`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Store failure on a trader endpoint. The executor has already logged the
/// cause; the client gets a generic 500.
#[derive(Debug)]
pub struct ApiError(StoreError);

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::debug!(error = %self.0, "trader request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Envelope::<()>::err("internal server error"),
        )
            .into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PeriodParams {
    pub period: Option<String>,
}

impl PeriodParams {
    pub fn period(&self) -> Period {
        self.period.as_deref().map_or(Period::All, Period::from_token)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub period: Option<String>,
}

impl SearchParams {
    pub fn period(&self) -> Period {
        self.period.as_deref().map_or(Period::All, Period::from_token)
    }

    /// Search term with surrounding whitespace removed.
    pub fn term(&self) -> &str {
        self.q.as_deref().unwrap_or_default().trim()
    }
}

pub async fn list_traders<E: QueryExecutor>(
    State(state): State<Arc<AppState<E>>>,
    Query(params): Query<PeriodParams>,
) -> Result<Json<Vec<TraderStats>>, ApiError> {
    let traders = state.traders.list_by_period(params.period()).await?;
    Ok(Json(traders))
}

pub async fn filtered_traders<E: QueryExecutor>(
    State(state): State<Arc<AppState<E>>>,
    Query(params): Query<PeriodParams>,
    Query(filter_params): Query<FilterParams>,
) -> Result<Json<Vec<TraderStats>>, ApiError> {
    let filters = TraderFilters::from_params(&filter_params);
    let traders = state.traders.filtered(params.period(), &filters).await?;
    Ok(Json(traders))
}

pub async fn search_traders<E: QueryExecutor>(
    State(state): State<Arc<AppState<E>>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<TraderStats>>, ApiError> {
    let traders = state
        .traders
        .search(params.term(), params.period())
        .await?;
    Ok(Json(traders))
}

pub async fn trader_detail<E: QueryExecutor>(
    State(state): State<Arc<AppState<E>>>,
    Path(wallet): Path<String>,
) -> Result<Json<TraderDetail>, ApiError> {
    let detail = state.traders.detail(&wallet).await?;
    Ok(Json(detail))
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: i64,
}

pub async fn health<E: QueryExecutor>(State(state): State<Arc<AppState<E>>>) -> Json<Health> {
    let uptime = chrono::Utc::now() - state.started_at;
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: uptime.num_seconds().max(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_ok_omits_error() {
        let body = serde_json::to_value(Envelope::ok(vec![1, 2])).unwrap();
        assert_eq!(body, serde_json::json!({"success": true, "data": [1, 2]}));
    }

    #[test]
    fn test_envelope_err_omits_data() {
        let body = serde_json::to_value(Envelope::<()>::err("boom")).unwrap();
        assert_eq!(body, serde_json::json!({"success": false, "error": "boom"}));
    }

    #[test]
    fn test_period_params_default_to_all() {
        assert_eq!(PeriodParams::default().period(), Period::All);
        let params = PeriodParams {
            period: Some("30d".to_string()),
        };
        assert_eq!(params.period(), Period::ThirtyDays);
        let params = PeriodParams {
            period: Some("weekly".to_string()),
        };
        assert_eq!(params.period(), Period::All);
    }

    #[test]
    fn test_search_params_missing_term_is_blank() {
        let params = SearchParams::default();
        assert_eq!(params.term(), "");
        assert_eq!(params.period(), Period::All);
    }

    #[test]
    fn test_search_params_trim_term() {
        let params = SearchParams {
            q: Some("  abc123\t".to_string()),
            period: None,
        };
        assert_eq!(params.term(), "abc123");
    }
}
