//! Server-rendered HTML: the dashboard shell and its htmx partials.

use std::sync::Arc;

use askama::Template;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use common::store::QueryExecutor;

use crate::api::SearchParams;
use crate::models::{period_options, trader_rows, DetailView, PeriodOption, TraderRow};
use crate::AppState;

const TRADERS_ERROR: &str = "Failed to load traders. Please try again.";
const DETAIL_ERROR: &str = "Failed to load trader details. Please try again.";

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    periods: Vec<PeriodOption>,
}

#[derive(Template)]
#[template(path = "partials/traders.html")]
struct TradersTemplate {
    rows: Vec<TraderRow>,
    error: Option<&'static str>,
}

#[derive(Template)]
#[template(path = "partials/trader_detail.html")]
struct TraderDetailTemplate {
    detail: Option<DetailView>,
    error: Option<&'static str>,
}

/// Render to HTML, or a bare 500 if the template fails.
fn render(template: &impl Template) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "template render failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn index() -> Response {
    render(&DashboardTemplate {
        periods: period_options(common::types::Period::All),
    })
}

/// Traders table for the selected period, narrowed by `q` when present.
///
/// Store failures still answer 200 so htmx swaps in the empty table and the
/// error toast.
pub async fn traders_partial<E: QueryExecutor>(
    State(state): State<Arc<AppState<E>>>,
    Query(params): Query<SearchParams>,
) -> Response {
    let template = match state.traders.search(params.term(), params.period()).await {
        Ok(traders) => TradersTemplate {
            rows: trader_rows(&traders),
            error: None,
        },
        Err(err) => {
            tracing::warn!(error = %err, "traders partial failed");
            TradersTemplate {
                rows: Vec::new(),
                error: Some(TRADERS_ERROR),
            }
        }
    };
    render(&template)
}

pub async fn trader_detail_partial<E: QueryExecutor>(
    State(state): State<Arc<AppState<E>>>,
    Path(wallet): Path<String>,
) -> Response {
    let template = match state.traders.detail(&wallet).await {
        Ok(detail) => TraderDetailTemplate {
            detail: Some(DetailView::from_detail(&detail)),
            error: None,
        },
        Err(err) => {
            tracing::warn!(error = %err, wallet, "trader detail partial failed");
            TraderDetailTemplate {
                detail: None,
                error: Some(DETAIL_ERROR),
            }
        }
    };
    let mut response = render(&template);
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}
