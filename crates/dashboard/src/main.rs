mod api;
mod inspect;
mod metrics;
mod models;
mod pages;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use common::config::{Config, Inspection};
use common::store::{ClickHouseClient, QueryExecutor};
use common::traders::TraderService;
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub struct AppState<E> {
    pub traders: TraderService<E>,
    /// Same store the trader service uses; the inspection endpoints query it directly.
    pub store: Arc<E>,
    pub database: String,
    pub inspection: Inspection,
    pub started_at: DateTime<Utc>,
    pub prometheus: Option<PrometheusHandle>,
}

impl<E: QueryExecutor> AppState<E> {
    pub fn new(store: Arc<E>, database: impl Into<String>, inspection: Inspection) -> Self {
        Self {
            traders: TraderService::new(Arc::clone(&store)),
            store,
            database: database.into(),
            inspection,
            started_at: Utc::now(),
            prometheus: None,
        }
    }

    #[must_use]
    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }
}

async fn metrics_endpoint<E: QueryExecutor>(
    State(state): State<Arc<AppState<E>>>,
) -> axum::response::Response {
    match &state.prometheus {
        Some(handle) => metrics::render(handle).into_response(),
        None => axum::http::StatusCode::NOT_FOUND.into_response(),
    }
}

fn inspection_router<E: QueryExecutor + 'static>() -> Router<Arc<AppState<E>>> {
    Router::new()
        .route("/tables", get(inspect::tables::<E>))
        .route("/tables/{table}", get(inspect::table_data::<E>))
        .route("/tables/{table}/schema", get(inspect::table_schema::<E>))
        .route("/query", get(inspect::raw_query::<E>))
        .route(
            "/debug/tables/{table}/schema",
            get(inspect::debug_table_schema::<E>),
        )
        .route(
            "/debug/tables/{table}/sample",
            get(inspect::debug_table_sample::<E>),
        )
}

pub fn create_router<E: QueryExecutor + 'static>(state: Arc<AppState<E>>) -> Router {
    let mut router = Router::new()
        .route("/", get(pages::index))
        .route("/partials/traders", get(pages::traders_partial::<E>))
        .route(
            "/partials/traders/{wallet}",
            get(pages::trader_detail_partial::<E>),
        )
        .route("/traders", get(api::list_traders::<E>))
        .route("/traders/filtered", get(api::filtered_traders::<E>))
        .route("/traders/search", get(api::search_traders::<E>))
        .route("/traders/{wallet}", get(api::trader_detail::<E>))
        .route("/health", get(api::health::<E>));

    if state.prometheus.is_some() {
        router = router.route("/metrics", get(metrics_endpoint::<E>));
    }
    if state.inspection.enabled {
        router = router.nest("/api/clickhouse", inspection_router::<E>());
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(Config::default_config_path);
    let config = Config::load(&config_path)?;

    let (dispatch, _otel_guard) =
        common::observability::build_dispatch("dashboard", &config.general.log_level);
    tracing::dispatcher::set_global_default(dispatch)
        .context("failed to install tracing subscriber")?;

    let prometheus = metrics::init_global()?;
    let store = ClickHouseClient::new(&config.clickhouse)
        .context("failed to build ClickHouse client")?;
    tracing::info!(
        clickhouse = store.url(),
        database = store.database(),
        inspection = config.inspection.enabled,
        "store configured"
    );

    let state = Arc::new(
        AppState::new(
            Arc::new(store),
            config.clickhouse.database.clone(),
            config.inspection,
        )
        .with_prometheus(prometheus),
    );

    let app = create_router(state);
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;
    tracing::info!("dashboard listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
