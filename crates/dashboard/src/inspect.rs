//! Read-only ClickHouse inspection endpoints, mounted under `/api/clickhouse`.
//!
//! Every handler answers 200 with an [`Envelope`]. Table names are checked
//! against [`is_valid_identifier`] and bound as `Identifier` parameters.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use common::store::{Query as StoreQuery, QueryExecutor};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::Envelope;
use crate::AppState;

pub const DEFAULT_TABLE_LIMIT: u32 = 100;
pub const SAMPLE_LIMIT: u32 = 3;

const RAW_SQL_DISABLED: &str = "raw SQL is disabled (inspection.allow_raw_sql = false)";

/// `[A-Za-z_][A-Za-z0-9_]*`, at most 128 bytes.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    name.len() <= 128
        && (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn invalid_table(table: &str) -> Envelope<Value> {
    Envelope::err(format!("invalid table name: {table}"))
}

fn tables_query(database: &str) -> StoreQuery {
    StoreQuery::new(
        "tables",
        "SELECT name, engine, total_rows, total_bytes\n\
         FROM system.tables\n\
         WHERE database = {database:String}\n\
         ORDER BY name",
    )
    .bind("database", database)
}

fn schema_query(database: &str, table: &str) -> StoreQuery {
    StoreQuery::new(
        "table_schema",
        "SELECT name, type, default_expression\n\
         FROM system.columns\n\
         WHERE database = {database:String} AND table = {table:String}\n\
         ORDER BY position",
    )
    .bind("database", database)
    .bind("table", table)
}

fn table_rows_query(
    name: &'static str,
    database: &str,
    table: &str,
    where_clause: Option<&str>,
    limit: u32,
) -> StoreQuery {
    let mut sql = String::from("SELECT *\nFROM {database:Identifier}.{table:Identifier}");
    if let Some(clause) = where_clause {
        sql.push_str("\nWHERE ");
        sql.push_str(clause);
    }
    sql.push_str("\nLIMIT {limit:UInt32}");

    StoreQuery::new(name, sql)
        .bind("database", database)
        .bind("table", table)
        .bind("limit", limit)
}

/// Run `query`, wrapping the raw result as `{data: <raw>}` when `nested`.
async fn run<E: QueryExecutor>(store: &E, query: &StoreQuery, nested: bool) -> Envelope<Value> {
    match store.execute(query).await {
        Ok(raw) if nested => Envelope::ok(json!({ "data": raw })),
        Ok(raw) => Envelope::ok(raw),
        Err(err) => Envelope::err(err.to_string()),
    }
}

pub async fn tables<E: QueryExecutor>(State(state): State<Arc<AppState<E>>>) -> Envelope<Value> {
    run(state.store.as_ref(), &tables_query(&state.database), true).await
}

#[derive(Debug, Default, Deserialize)]
pub struct TableDataParams {
    pub limit: Option<String>,
    #[serde(rename = "where")]
    pub where_clause: Option<String>,
}

impl TableDataParams {
    /// Missing or unparsable limits fall back to [`DEFAULT_TABLE_LIMIT`].
    pub fn limit(&self) -> u32 {
        self.limit
            .as_deref()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(DEFAULT_TABLE_LIMIT)
    }

    pub fn where_clause(&self) -> Option<&str> {
        self.where_clause
            .as_deref()
            .map(str::trim)
            .filter(|clause| !clause.is_empty())
    }
}

pub async fn table_data<E: QueryExecutor>(
    State(state): State<Arc<AppState<E>>>,
    Path(table): Path<String>,
    Query(params): Query<TableDataParams>,
) -> Envelope<Value> {
    if !is_valid_identifier(&table) {
        return invalid_table(&table);
    }
    let where_clause = params.where_clause();
    if where_clause.is_some() && !state.inspection.allow_raw_sql {
        return Envelope::err(RAW_SQL_DISABLED);
    }

    let query = table_rows_query(
        "table_data",
        &state.database,
        &table,
        where_clause,
        params.limit(),
    );
    run(state.store.as_ref(), &query, true).await
}

pub async fn table_schema<E: QueryExecutor>(
    State(state): State<Arc<AppState<E>>>,
    Path(table): Path<String>,
) -> Envelope<Value> {
    if !is_valid_identifier(&table) {
        return invalid_table(&table);
    }
    run(
        state.store.as_ref(),
        &schema_query(&state.database, &table),
        true,
    )
    .await
}

#[derive(Debug, Default, Deserialize)]
pub struct RawQueryParams {
    pub sql: Option<String>,
}

pub async fn raw_query<E: QueryExecutor>(
    State(state): State<Arc<AppState<E>>>,
    Query(params): Query<RawQueryParams>,
) -> Envelope<Value> {
    if !state.inspection.allow_raw_sql {
        return Envelope::err(RAW_SQL_DISABLED);
    }
    let Some(sql) = params.sql.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
        return Envelope::err("missing sql parameter");
    };

    tracing::info!(sql, "running raw inspection query");
    run(state.store.as_ref(), &StoreQuery::new("raw_query", sql), true).await
}

pub async fn debug_table_schema<E: QueryExecutor>(
    State(state): State<Arc<AppState<E>>>,
    Path(table): Path<String>,
) -> Envelope<Value> {
    if !is_valid_identifier(&table) {
        return invalid_table(&table);
    }
    run(
        state.store.as_ref(),
        &schema_query(&state.database, &table),
        false,
    )
    .await
}

pub async fn debug_table_sample<E: QueryExecutor>(
    State(state): State<Arc<AppState<E>>>,
    Path(table): Path<String>,
) -> Envelope<Value> {
    if !is_valid_identifier(&table) {
        return invalid_table(&table);
    }
    let query = table_rows_query("table_sample", &state.database, &table, None, SAMPLE_LIMIT);
    run(state.store.as_ref(), &query, false).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_validation() {
        assert!(is_valid_identifier("mv_wallet_orders"));
        assert!(is_valid_identifier("_tmp1"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("1table"));
        assert!(!is_valid_identifier("orders; DROP TABLE x"));
        assert!(!is_valid_identifier("db.table"));
        assert!(!is_valid_identifier("t`x"));
        assert!(!is_valid_identifier(&"a".repeat(129)));
    }

    #[test]
    fn test_table_rows_query_binds_identifiers() {
        let query = table_rows_query("table_data", "hyperliquid", "raw_node_fill", None, 25);
        assert_eq!(
            query.sql,
            "SELECT *\nFROM {database:Identifier}.{table:Identifier}\nLIMIT {limit:UInt32}"
        );
        assert_eq!(query.param("database"), Some("hyperliquid"));
        assert_eq!(query.param("table"), Some("raw_node_fill"));
        assert_eq!(query.param("limit"), Some("25"));
    }

    #[test]
    fn test_table_rows_query_with_where() {
        let query = table_rows_query("table_data", "hl", "t", Some("coin = 'BTC'"), 10);
        assert!(query.sql.contains("\nWHERE coin = 'BTC'\nLIMIT"));
    }

    #[test]
    fn test_table_data_params() {
        assert_eq!(TableDataParams::default().limit(), DEFAULT_TABLE_LIMIT);
        let params = TableDataParams {
            limit: Some("abc".to_string()),
            where_clause: Some("   ".to_string()),
        };
        assert_eq!(params.limit(), DEFAULT_TABLE_LIMIT);
        assert_eq!(params.where_clause(), None);

        let params = TableDataParams {
            limit: Some(" 7 ".to_string()),
            where_clause: Some(" coin = 'ETH' ".to_string()),
        };
        assert_eq!(params.limit(), 7);
        assert_eq!(params.where_clause(), Some("coin = 'ETH'"));
    }

    #[test]
    fn test_schema_query_binds_names() {
        let query = schema_query("hyperliquid", "mv_wallet_orders");
        assert_eq!(query.name, "table_schema");
        assert!(query.sql.contains("FROM system.columns"));
        assert_eq!(query.param("table"), Some("mv_wallet_orders"));
    }
}
