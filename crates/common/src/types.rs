use serde::{Deserialize, Serialize};

/// Aggregation window requested by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Period {
    OneDay,
    SevenDays,
    ThirtyDays,
    #[default]
    All,
}

impl Period {
    pub const ALL_PERIODS: [Period; 4] = [
        Period::OneDay,
        Period::SevenDays,
        Period::ThirtyDays,
        Period::All,
    ];

    /// Parse a request token. Anything other than `1d`, `7d` or `30d` is `All`.
    pub fn from_token(token: &str) -> Self {
        match token {
            "1d" => Self::OneDay,
            "7d" => Self::SevenDays,
            "30d" => Self::ThirtyDays,
            _ => Self::All,
        }
    }

    /// Token as it appears in requests and in the `period` field of returned rows.
    pub fn as_token(&self) -> &'static str {
        match self {
            Self::OneDay => "1d",
            Self::SevenDays => "7d",
            Self::ThirtyDays => "30d",
            Self::All => "ALL",
        }
    }

    /// Value of `agg_period_type` to filter on. `None` means no period filter.
    pub fn store_label(&self) -> Option<&'static str> {
        match self {
            Self::OneDay => Some("1D"),
            Self::SevenDays => Some("7D"),
            Self::ThirtyDays => Some("30D"),
            Self::All => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::OneDay => "24 hours",
            Self::SevenDays => "7 days",
            Self::ThirtyDays => "30 days",
            Self::All => "All time",
        }
    }
}

/// One row of `mv_wallet_stats_by_period`, aliased to the dashboard's column names.
///
/// ClickHouse quotes 64-bit integers in JSON output, so every numeric field
/// accepts either a JSON number or a numeric string. Nulls read as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraderStats {
    pub wallet: String,
    #[serde(default, deserialize_with = "de_f64_lenient")]
    pub pnl: f64,
    #[serde(default, deserialize_with = "de_f64_lenient")]
    pub total_volume: f64,
    #[serde(default, deserialize_with = "de_u64_lenient")]
    pub total_trades: u64,
    #[serde(default, deserialize_with = "de_f64_lenient")]
    pub win_rate: f64,
    #[serde(default, deserialize_with = "de_f64_lenient")]
    pub avg_trade_size: f64,
    #[serde(default, deserialize_with = "de_u64_lenient")]
    pub cnt_trade_days: u64,
    #[serde(default, deserialize_with = "de_f64_lenient")]
    pub prct_wallet_roi: f64,
    #[serde(default, deserialize_with = "de_f64_lenient")]
    pub prct_avg_order_roi: f64,
    #[serde(default)]
    pub period: String,
}

/// Everything the detail view shows for one wallet.
///
/// `stats` holds at most one row (the `ALL` aggregate). Orders and fills are
/// passed through as the store returned them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraderDetail {
    pub wallet: String,
    pub stats: Vec<TraderStats>,
    pub orders: Vec<serde_json::Value>,
    pub fills: Vec<serde_json::Value>,
}

impl TraderDetail {
    pub fn overview(&self) -> Option<&TraderStats> {
        self.stats.first()
    }
}

enum Lenient {
    Float(f64),
    Unsigned(u64),
    Missing,
}

fn de_lenient<'de, D>(deserializer: D) -> Result<Lenient, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    struct NumberOrString;

    impl de::Visitor<'_> for NumberOrString {
        type Value = Lenient;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "a number, a numeric string or null")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Lenient::Unsigned(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Lenient::Float(v as f64))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            Ok(Lenient::Float(v))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            let v = v.trim();
            if v.is_empty() {
                return Ok(Lenient::Missing);
            }
            if let Ok(n) = v.parse::<u64>() {
                return Ok(Lenient::Unsigned(n));
            }
            v.parse::<f64>()
                .map(Lenient::Float)
                .map_err(|_| E::custom(format!("not a number: {v:?}")))
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Lenient::Missing)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Lenient::Missing)
        }
    }

    deserializer.deserialize_any(NumberOrString)
}

fn de_f64_lenient<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match de_lenient(deserializer)? {
        Lenient::Float(v) => v,
        Lenient::Unsigned(v) => v as f64,
        Lenient::Missing => 0.0,
    })
}

fn de_u64_lenient<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    match de_lenient(deserializer)? {
        Lenient::Unsigned(v) => Ok(v),
        Lenient::Float(v) if v.is_finite() && v >= 0.0 => Ok(v.trunc() as u64),
        Lenient::Float(v) => Err(D::Error::custom(format!("not a count: {v}"))),
        Lenient::Missing => Ok(0),
    }
}
