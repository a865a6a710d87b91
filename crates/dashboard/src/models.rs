//! View models for dashboard templates.
//! Display strings are computed here so templates stay logic-free.

use common::types::{Period, TraderDetail, TraderStats};
use serde_json::Value;

/// Orders table shows at most this many leading columns.
pub const ORDER_COLUMNS_SHOWN: usize = 8;

pub const FILL_COLUMNS: [&str; 7] = [
    "utc_fill_dttm",
    "coin",
    "price",
    "size",
    "fill_type",
    "closed_pnl",
    "fee",
];

const FILL_NUMERIC_COLUMNS: [&str; 4] = ["price", "size", "closed_pnl", "fee"];

/// Option in the period selector
pub struct PeriodOption {
    pub token: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

pub fn period_options(selected: Period) -> Vec<PeriodOption> {
    Period::ALL_PERIODS
        .iter()
        .map(|p| PeriodOption {
            token: p.as_token(),
            label: p.display_name(),
            selected: *p == selected,
        })
        .collect()
}

/// Row in the traders table
pub struct TraderRow {
    pub rank: usize,
    pub wallet: String,
    pub wallet_short: String,
    pub detail_url: String,
    pub pnl_display: String,
    pub pnl_class: &'static str,
    pub volume_display: String,
    pub total_trades: u64,
    pub win_rate_display: String,
    pub avg_trade_display: String,
}

impl TraderRow {
    pub fn from_stats(index: usize, stats: &TraderStats) -> Self {
        Self {
            rank: index + 1,
            wallet: stats.wallet.clone(),
            wallet_short: shorten_wallet(&stats.wallet),
            detail_url: detail_url(&stats.wallet),
            pnl_display: format_currency(stats.pnl),
            pnl_class: pnl_class(stats.pnl),
            volume_display: format_compact(stats.total_volume),
            total_trades: stats.total_trades,
            win_rate_display: format_percentage(stats.win_rate),
            avg_trade_display: format_compact(stats.avg_trade_size),
        }
    }
}

pub fn trader_rows(stats: &[TraderStats]) -> Vec<TraderRow> {
    stats
        .iter()
        .enumerate()
        .map(|(i, s)| TraderRow::from_stats(i, s))
        .collect()
}

/// Summary card at the top of the detail view
pub struct OverviewCard {
    pub label: &'static str,
    pub value: String,
    pub class: &'static str,
}

pub fn overview_cards(stats: &TraderStats) -> Vec<OverviewCard> {
    let card = |label, value| OverviewCard {
        label,
        value,
        class: "",
    };
    vec![
        OverviewCard {
            label: "Total PnL",
            value: format_currency(stats.pnl),
            class: pnl_class(stats.pnl),
        },
        card("Total Volume", format_compact(stats.total_volume)),
        card("Total Trades", stats.total_trades.to_string()),
        card("Win Rate", format_percentage(stats.win_rate)),
        card("Avg Trade Size", format_compact(stats.avg_trade_size)),
        card("Trading Days", stats.cnt_trade_days.to_string()),
        card("Wallet ROI", format_percentage(stats.prct_wallet_roi)),
        card("Avg Order ROI", format_percentage(stats.prct_avg_order_roi)),
    ]
}

pub struct Cell {
    pub display: String,
    /// Raw value for the hover tooltip
    pub title: String,
}

/// Generic table over loosely-typed store rows
pub struct DataTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    pub empty_message: &'static str,
}

impl DataTable {
    /// Columns come from the first order, in store order.
    pub fn orders(orders: &[Value]) -> Self {
        let columns: Vec<String> = orders
            .first()
            .and_then(Value::as_object)
            .map(|first| first.keys().take(ORDER_COLUMNS_SHOWN).cloned().collect())
            .unwrap_or_default();

        let rows = orders
            .iter()
            .map(|order| {
                columns
                    .iter()
                    .map(|col| order_cell(col, order.get(col).unwrap_or(&Value::Null)))
                    .collect()
            })
            .collect();

        Self {
            headers: columns.iter().map(|c| header_label(c)).collect(),
            rows,
            empty_message: "No orders found for this trader.",
        }
    }

    pub fn fills(fills: &[Value]) -> Self {
        let rows = fills
            .iter()
            .map(|fill| {
                FILL_COLUMNS
                    .iter()
                    .map(|col| fill_cell(col, fill.get(col).unwrap_or(&Value::Null)))
                    .collect()
            })
            .collect();

        Self {
            headers: FILL_COLUMNS.iter().map(|c| header_label(c)).collect(),
            rows,
            empty_message: "No fills found for this trader",
        }
    }
}

/// Detail page for one wallet
pub struct DetailView {
    pub wallet: String,
    pub wallet_short: String,
    pub cards: Vec<OverviewCard>,
    pub orders_count: usize,
    pub fills_count: usize,
    pub orders: DataTable,
    pub fills: DataTable,
}

impl DetailView {
    /// Missing stats render as zeroes, like a wallet with no activity.
    pub fn from_detail(detail: &TraderDetail) -> Self {
        let empty = TraderStats::default();
        let stats = detail.overview().unwrap_or(&empty);
        Self {
            wallet: detail.wallet.clone(),
            wallet_short: shorten_wallet(&detail.wallet),
            cards: overview_cards(stats),
            orders_count: detail.orders.len(),
            fills_count: detail.fills.len(),
            orders: DataTable::orders(&detail.orders),
            fills: DataTable::fills(&detail.fills),
        }
    }
}

fn order_cell(column: &str, value: &Value) -> Cell {
    let display = match (column, value) {
        ("wallet_address", Value::String(s)) if !s.is_empty() => shorten_wallet(s),
        (_, Value::Number(n)) => n.as_f64().map_or_else(|| n.to_string(), format_compact),
        _ => plain_display(value),
    };
    Cell {
        display,
        title: raw_title(value),
    }
}

fn fill_cell(column: &str, value: &Value) -> Cell {
    let display = match value {
        Value::Number(n) if FILL_NUMERIC_COLUMNS.contains(&column) => match n.as_f64() {
            Some(v) if v != 0.0 => format_grouped(v),
            Some(_) => "-".to_string(),
            None => n.to_string(),
        },
        _ => plain_display(value),
    };
    Cell {
        display,
        title: raw_title(value),
    }
}

/// Empty-ish values render as a dash.
fn plain_display(value: &Value) -> String {
    match value {
        Value::Null | Value::Bool(false) => "-".to_string(),
        Value::String(s) if s.is_empty() => "-".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn raw_title(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `utc_fill_dttm` -> `UTC FILL DTTM`
pub fn header_label(column: &str) -> String {
    column.replace('_', " ").to_uppercase()
}

pub fn detail_url(wallet: &str) -> String {
    format!("/partials/traders/{}", urlencoding::encode(wallet))
}

/// Shorten long wallet addresses to `first6...last6`.
pub fn shorten_wallet(addr: &str) -> String {
    if addr.is_empty() {
        return "Unknown".to_string();
    }
    let chars: Vec<char> = addr.chars().collect();
    if chars.len() <= 12 {
        return addr.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 6..].iter().collect();
    format!("{head}...{tail}")
}

/// 1234567.0 -> `1.23M`
pub fn format_compact(n: f64) -> String {
    let abs = n.abs();
    if abs >= 1e9 {
        format!("{:.2}B", n / 1e9)
    } else if abs >= 1e6 {
        format!("{:.2}M", n / 1e6)
    } else if abs >= 1e3 {
        format!("{:.2}K", n / 1e3)
    } else {
        format!("{n:.2}")
    }
}

/// Gains get a `+`; losses show the bare amount and rely on the pnl class for colour.
pub fn format_currency(n: f64) -> String {
    let sign = if n >= 0.0 { "+" } else { "" };
    format!("{sign}${:.2}", n.abs())
}

pub fn format_percentage(n: f64) -> String {
    format!("{n:.1}%")
}

pub fn pnl_class(n: f64) -> &'static str {
    if n >= 0.0 {
        "pnl-positive"
    } else {
        "pnl-negative"
    }
}

/// Thousands separators, at most three decimals: 12345.6789 -> `12,345.679`
pub fn format_grouped(n: f64) -> String {
    let fixed = format!("{:.3}", n.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut out = String::with_capacity(fixed.len() + int_part.len() / 3 + 1);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }

    if n < 0.0 && out != "0" {
        format!("-{out}")
    } else {
        out
    }
}
