//! Range and threshold filters for the trader list.

use serde::Deserialize;

/// Filter bounds exactly as they arrive on the query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterParams {
    pub win_rate_min: Option<String>,
    pub win_rate_max: Option<String>,
    pub total_roi_min: Option<String>,
    pub total_roi_max: Option<String>,
    pub avg_order_roi_min: Option<String>,
    pub avg_order_roi_max: Option<String>,
    pub trading_days_min: Option<String>,
    pub trading_coins_min: Option<String>,
}

/// Validated filter set. `None` means no constraint.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TraderFilters {
    pub win_rate_min: Option<f64>,
    pub win_rate_max: Option<f64>,
    pub total_roi_min: Option<f64>,
    pub total_roi_max: Option<f64>,
    pub avg_order_roi_min: Option<f64>,
    pub avg_order_roi_max: Option<f64>,
    pub trading_days_min: Option<u64>,
    /// Accepted and validated, but the stats view has no per-coin column, so
    /// it never becomes a predicate.
    pub trading_coins_min: Option<u64>,
}

impl TraderFilters {
    /// Parse leniently: a bound that is unparsable or out of range is dropped,
    /// never rejected and never replaced by a default.
    pub fn from_params(params: &FilterParams) -> Self {
        Self {
            win_rate_min: parse_percentage(params.win_rate_min.as_deref()),
            win_rate_max: parse_percentage(params.win_rate_max.as_deref()),
            total_roi_min: parse_percentage(params.total_roi_min.as_deref()),
            total_roi_max: parse_percentage(params.total_roi_max.as_deref()),
            avg_order_roi_min: parse_percentage(params.avg_order_roi_min.as_deref()),
            avg_order_roi_max: parse_percentage(params.avg_order_roi_max.as_deref()),
            trading_days_min: parse_count(params.trading_days_min.as_deref()),
            trading_coins_min: parse_count(params.trading_coins_min.as_deref()),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A finite percentage in [0, 100].
pub fn parse_percentage(raw: Option<&str>) -> Option<f64> {
    let value: f64 = raw?.trim().parse().ok()?;
    (value.is_finite() && (0.0..=100.0).contains(&value)).then_some(value)
}

/// A non-negative integer.
pub fn parse_count(raw: Option<&str>) -> Option<u64> {
    raw?.trim().parse().ok()
}
