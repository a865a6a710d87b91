//! Trader queries against the aggregated wallet stats, orders and fills.
//!
//! Builders are pure and return a [`Query`]; [`TraderService`] runs them and
//! shapes the results.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::filters::TraderFilters;
use crate::rows::{decode_rows, normalize_rows};
use crate::store::{Query, QueryExecutor, StoreError};
use crate::types::{Period, TraderDetail, TraderStats};

pub const LIST_LIMIT: u32 = 100;
pub const SEARCH_LIMIT: u32 = 50;
pub const DETAIL_ROWS_LIMIT: u32 = 50;

const STATS_TABLE: &str = "mv_wallet_stats_by_period";
const ORDERS_TABLE: &str = "mv_wallet_orders";
const FILLS_TABLE: &str = "raw_node_fill";

const STATS_COLUMNS: &str = "wallet_address AS wallet,
       total_pnl AS pnl,
       total_volume,
       cnt_unique_orders AS total_trades,
       prct_win_rate AS win_rate,
       avg_trade_usd_size AS avg_trade_size,
       cnt_trade_days,
       prct_wallet_roi,
       prct_avg_order_roi";

/// Accumulates `WHERE` conditions and their bound values.
struct Conditions {
    name: &'static str,
    clauses: Vec<&'static str>,
    params: BTreeMap<String, String>,
}

impl Conditions {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            clauses: Vec::new(),
            params: BTreeMap::new(),
        }
    }

    fn push(&mut self, clause: &'static str) {
        self.clauses.push(clause);
    }

    fn push_bound(&mut self, clause: &'static str, param: &str, value: impl ToString) {
        self.clauses.push(clause);
        self.params.insert(param.to_string(), value.to_string());
    }

    fn period(&mut self, period: Period) {
        if let Some(label) = period.store_label() {
            self.push_bound("agg_period_type = {period:String}", "period", label);
        }
    }

    fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!("\nWHERE {}", self.clauses.join("\n  AND "))
        }
    }

    fn stats_query(self, limit: u32) -> Query {
        let sql = format!(
            "SELECT {STATS_COLUMNS}\nFROM {STATS_TABLE}{}\nORDER BY total_pnl DESC\nLIMIT {limit}",
            self.where_sql()
        );
        Query {
            name: self.name,
            sql,
            params: self.params,
        }
    }
}

/// Top wallets by PnL for `period`.
pub fn list_query(period: Period) -> Query {
    let mut conditions = Conditions::new("traders_by_period");
    conditions.period(period);
    conditions.stats_query(LIST_LIMIT)
}

/// [`list_query`] narrowed by every bound present in `filters`.
pub fn filtered_query(period: Period, filters: &TraderFilters) -> Query {
    let mut conditions = Conditions::new("traders_filtered");
    conditions.period(period);

    let bounds = [
        (filters.win_rate_min, "prct_win_rate >= {win_rate_min:Float64}", "win_rate_min"),
        (filters.win_rate_max, "prct_win_rate <= {win_rate_max:Float64}", "win_rate_max"),
        (filters.total_roi_min, "prct_wallet_roi >= {total_roi_min:Float64}", "total_roi_min"),
        (filters.total_roi_max, "prct_wallet_roi <= {total_roi_max:Float64}", "total_roi_max"),
        (
            filters.avg_order_roi_min,
            "prct_avg_order_roi >= {avg_order_roi_min:Float64}",
            "avg_order_roi_min",
        ),
        (
            filters.avg_order_roi_max,
            "prct_avg_order_roi <= {avg_order_roi_max:Float64}",
            "avg_order_roi_max",
        ),
    ];
    for (bound, clause, param) in bounds {
        if let Some(value) = bound {
            conditions.push_bound(clause, param, value);
        }
    }
    if let Some(days) = filters.trading_days_min {
        conditions.push_bound(
            "cnt_trade_days >= {trading_days_min:UInt64}",
            "trading_days_min",
            days,
        );
    }
    if let Some(coins) = filters.trading_coins_min {
        debug!(trading_coins_min = coins, "no per-coin column in stats view; filter ignored");
    }

    conditions.stats_query(LIST_LIMIT)
}

/// Wallets containing `term` (case-sensitive), or `None` for a blank term.
pub fn search_query(term: &str, period: Period) -> Option<Query> {
    if term.trim().is_empty() {
        return None;
    }
    let mut conditions = Conditions::new("traders_search");
    conditions.push_bound("position(wallet_address, {search:String}) > 0", "search", term);
    conditions.period(period);
    Some(conditions.stats_query(SEARCH_LIMIT))
}

pub fn detail_stats_query(wallet: &str) -> Query {
    let mut conditions = Conditions::new("trader_stats");
    conditions.push_bound("wallet_address = {wallet:String}", "wallet", wallet);
    conditions.push("agg_period_type = 'ALL'");
    conditions.stats_query(1)
}

pub fn detail_orders_query(wallet: &str) -> Query {
    Query::new(
        "trader_orders",
        format!(
            "SELECT *\nFROM {ORDERS_TABLE}\nWHERE wallet_address = {{wallet:String}}\nORDER BY utc_order_dttm DESC\nLIMIT {DETAIL_ROWS_LIMIT}"
        ),
    )
    .bind("wallet", wallet)
}

pub fn detail_fills_query(wallet: &str) -> Query {
    Query::new(
        "trader_fills",
        format!(
            "SELECT *\nFROM {FILLS_TABLE}\nWHERE wallet_address = {{wallet:String}}\nORDER BY utc_fill_dttm DESC\nLIMIT {DETAIL_ROWS_LIMIT}"
        ),
    )
    .bind("wallet", wallet)
}

/// Decode stats rows and stamp them with the requested period token.
fn stats_rows(value: serde_json::Value, period: Period) -> Result<Vec<TraderStats>, StoreError> {
    let mut rows: Vec<TraderStats> = decode_rows(value)?;
    for row in &mut rows {
        row.period = period.as_token().to_string();
    }
    Ok(rows)
}

pub struct TraderService<E> {
    store: Arc<E>,
}

impl<E> Clone for TraderService<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<E: QueryExecutor> TraderService<E> {
    pub fn new(store: Arc<E>) -> Self {
        Self { store }
    }

    pub async fn list_by_period(&self, period: Period) -> Result<Vec<TraderStats>, StoreError> {
        let result = self.store.execute(&list_query(period)).await?;
        stats_rows(result, period)
    }

    pub async fn filtered(
        &self,
        period: Period,
        filters: &TraderFilters,
    ) -> Result<Vec<TraderStats>, StoreError> {
        let result = self.store.execute(&filtered_query(period, filters)).await?;
        stats_rows(result, period)
    }

    /// Blank terms fall back to [`Self::list_by_period`].
    pub async fn search(&self, term: &str, period: Period) -> Result<Vec<TraderStats>, StoreError> {
        let Some(query) = search_query(term, period) else {
            return self.list_by_period(period).await;
        };
        let result = self.store.execute(&query).await?;
        stats_rows(result, period)
    }

    /// Stats, orders and fills for one wallet, fetched concurrently.
    ///
    /// Any failing sub-query fails the whole call.
    pub async fn detail(&self, wallet: &str) -> Result<TraderDetail, StoreError> {
        let stats_query = detail_stats_query(wallet);
        let orders_query = detail_orders_query(wallet);
        let fills_query = detail_fills_query(wallet);

        let (stats, orders, fills) = tokio::try_join!(
            self.store.execute(&stats_query),
            self.store.execute(&orders_query),
            self.store.execute(&fills_query),
        )?;

        Ok(TraderDetail {
            wallet: wallet.to_string(),
            stats: stats_rows(stats, Period::All)?,
            orders: normalize_rows(orders),
            fills: normalize_rows(fills),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeStore;
    use serde_json::json;

    fn stats_row(wallet: &str, pnl: f64) -> serde_json::Value {
        json!({
            "wallet": wallet,
            "pnl": pnl,
            "total_volume": 1000.0,
            "total_trades": "12",
            "win_rate": 55.0,
            "avg_trade_size": 83.3,
            "cnt_trade_days": "4",
            "prct_wallet_roi": 3.2,
            "prct_avg_order_roi": 0.4
        })
    }

    fn service(store: FakeStore) -> (TraderService<FakeStore>, Arc<FakeStore>) {
        let store = Arc::new(store);
        (TraderService::new(Arc::clone(&store)), store)
    }

    #[test]
    fn test_list_query_all_has_no_period_filter() {
        let q = list_query(Period::All);
        assert!(!q.sql.contains("WHERE"));
        assert!(q.params.is_empty());
        assert!(q.sql.contains("ORDER BY total_pnl DESC"));
        assert!(q.sql.ends_with("LIMIT 100"));
    }

    #[test]
    fn test_list_query_binds_store_label() {
        let q = list_query(Period::ThirtyDays);
        assert!(q.sql.contains("WHERE agg_period_type = {period:String}"));
        assert_eq!(q.param("period"), Some("30D"));
    }

    #[test]
    fn test_filtered_query_binds_only_present_bounds() {
        let filters = TraderFilters {
            win_rate_min: Some(40.0),
            avg_order_roi_max: Some(12.5),
            trading_days_min: Some(5),
            ..TraderFilters::default()
        };
        let q = filtered_query(Period::SevenDays, &filters);
        assert_eq!(q.param("period"), Some("7D"));
        assert_eq!(q.param("win_rate_min"), Some("40"));
        assert_eq!(q.param("avg_order_roi_max"), Some("12.5"));
        assert_eq!(q.param("trading_days_min"), Some("5"));
        assert_eq!(q.params.len(), 4);
        assert!(q.sql.contains("prct_win_rate >= {win_rate_min:Float64}"));
        assert!(q.sql.contains("prct_avg_order_roi <= {avg_order_roi_max:Float64}"));
        assert!(q.sql.contains("cnt_trade_days >= {trading_days_min:UInt64}"));
        assert!(!q.sql.contains("win_rate_max"));
        assert!(q.sql.ends_with("LIMIT 100"));
    }

    #[test]
    fn test_filtered_query_ignores_trading_coins() {
        let filters = TraderFilters {
            trading_coins_min: Some(3),
            ..TraderFilters::default()
        };
        assert_eq!(
            filtered_query(Period::All, &filters).sql,
            list_query(Period::All).sql
        );
    }

    #[test]
    fn test_search_query_binds_term_verbatim() {
        let q = search_query("ab%_'c", Period::OneDay).unwrap();
        assert_eq!(q.param("search"), Some("ab%_'c"));
        assert_eq!(q.param("period"), Some("1D"));
        assert!(q.sql.contains("position(wallet_address, {search:String}) > 0"));
        assert!(!q.sql.contains("ab%_'c"));
        assert!(q.sql.ends_with("LIMIT 50"));
    }

    #[test]
    fn test_search_query_blank_term_is_none() {
        assert!(search_query("", Period::All).is_none());
        assert!(search_query("  \t", Period::All).is_none());
    }

    #[test]
    fn test_detail_queries_bind_wallet() {
        let wallet = "0xabc'; DROP TABLE raw_node_fill; --";
        for q in [
            detail_stats_query(wallet),
            detail_orders_query(wallet),
            detail_fills_query(wallet),
        ] {
            assert_eq!(q.param("wallet"), Some(wallet));
            assert!(!q.sql.contains("DROP"));
        }
        assert!(detail_stats_query(wallet).sql.contains("agg_period_type = 'ALL'"));
        assert!(detail_stats_query(wallet).sql.ends_with("LIMIT 1"));
        assert!(detail_orders_query(wallet)
            .sql
            .contains("ORDER BY utc_order_dttm DESC\nLIMIT 50"));
        assert!(detail_fills_query(wallet)
            .sql
            .contains("ORDER BY utc_fill_dttm DESC\nLIMIT 50"));
    }

    #[tokio::test]
    async fn test_list_keeps_store_order_and_stamps_period() {
        let (svc, store) = service(FakeStore::new().respond(
            "traders_by_period",
            json!({ "data": [stats_row("0xaaa", 100.0), stats_row("0xbbb", -50.0)] }),
        ));

        let rows = svc.list_by_period(Period::SevenDays).await.unwrap();
        assert_eq!(rows.iter().map(|r| r.pnl).collect::<Vec<_>>(), vec![100.0, -50.0]);
        assert!(rows.iter().all(|r| r.period == "7d"));
        assert_eq!(store.last_query().unwrap().param("period"), Some("7D"));
    }

    #[tokio::test]
    async fn test_every_period_token_is_echoed() {
        for period in Period::ALL_PERIODS {
            let (svc, _store) = service(
                FakeStore::new().respond("traders_by_period", json!([stats_row("0xaaa", 1.0)])),
            );
            let rows = svc.list_by_period(period).await.unwrap();
            assert_eq!(rows[0].period, period.as_token());
        }
    }

    #[tokio::test]
    async fn test_unknown_period_matches_all() {
        let (svc, store) = service(FakeStore::new());
        svc.list_by_period(Period::from_token("90d")).await.unwrap();
        svc.list_by_period(Period::All).await.unwrap();
        let queries = store.queries();
        assert_eq!(queries[0], queries[1]);
    }

    #[tokio::test]
    async fn test_search_blank_term_runs_list_query() {
        let (svc, store) = service(FakeStore::new());
        svc.search("   ", Period::ThirtyDays).await.unwrap();
        let q = store.last_query().unwrap();
        assert_eq!(q, list_query(Period::ThirtyDays));
    }

    #[tokio::test]
    async fn test_search_returns_rows_with_period() {
        let (svc, store) = service(
            FakeStore::new().respond("traders_search", json!([stats_row("0xabc123ff", 9.0)])),
        );
        let rows = svc.search("abc123", Period::All).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].period, "ALL");
        assert_eq!(store.last_query().unwrap().param("search"), Some("abc123"));
    }

    #[tokio::test]
    async fn test_list_store_failure_propagates() {
        let (svc, _store) = service(FakeStore::new().fail_all("connection refused"));
        let err = svc.list_by_period(Period::All).await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_detail_mixed_shapes_are_arrays() {
        let (svc, store) = service(
            FakeStore::new()
                .respond("trader_stats", json!({ "data": [stats_row("0xabc", 5.0)] }))
                .respond("trader_orders", json!([{ "order_id": 1 }, { "order_id": 2 }]))
                .respond("trader_fills", json!({ "meta": [], "rows": 0 })),
        );

        let detail = svc.detail("0xabc").await.unwrap();
        assert_eq!(detail.wallet, "0xabc");
        assert_eq!(detail.stats.len(), 1);
        assert_eq!(detail.stats[0].period, "ALL");
        assert_eq!(detail.orders.len(), 2);
        assert!(detail.fills.is_empty());
        assert_eq!(store.queries().len(), 3);
    }

    #[tokio::test]
    async fn test_detail_unknown_wallet_is_empty_not_null() {
        let (svc, _store) = service(
            FakeStore::new()
                .respond("trader_stats", json!({ "data": [] }))
                .respond("trader_orders", json!({ "data": [] })),
        );

        let detail = svc.detail("0xnobody").await.unwrap();
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["stats"], json!([]));
        assert_eq!(json["orders"], json!([]));
        assert_eq!(json["fills"], json!([]));
    }

    #[tokio::test]
    async fn test_detail_fails_when_any_subquery_fails() {
        let (svc, _store) = service(
            FakeStore::new()
                .respond("trader_stats", json!({ "data": [stats_row("0xabc", 5.0)] }))
                .fail("trader_fills", "timeout"),
        );
        assert!(svc.detail("0xabc").await.is_err());
    }

    /// Holds every query until `barrier` has as many waiters as it was built for.
    struct RendezvousStore {
        barrier: tokio::sync::Barrier,
    }

    impl QueryExecutor for RendezvousStore {
        async fn execute(&self, _query: &Query) -> Result<serde_json::Value, StoreError> {
            self.barrier.wait().await;
            Ok(serde_json::Value::Null)
        }
    }

    #[tokio::test]
    async fn test_detail_subqueries_are_in_flight_together() {
        let svc = TraderService::new(Arc::new(RendezvousStore {
            barrier: tokio::sync::Barrier::new(3),
        }));

        let detail = tokio::time::timeout(std::time::Duration::from_secs(5), svc.detail("0xabc"))
            .await
            .expect("stats, orders and fills were not awaited together")
            .unwrap();
        assert!(detail.stats.is_empty());
        assert!(detail.orders.is_empty());
        assert!(detail.fills.is_empty());
    }
}
