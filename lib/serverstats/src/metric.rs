//! The normalized unit of output data and its value formatting.

use chrono::{DateTime, Utc};
use core::fmt;
use getset::Getters;
use serde::{de, Deserialize, Deserializer, Serialize};

const BYTES_PER_KIB: f64 = 1024.0;

/// Short unit tag attached to a [`Metric`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "M")]
    Megabytes,
    #[serde(rename = "%")]
    Percent,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Megabytes => "M",
            Unit::Percent => "%",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One timestamped, named measurement.
///
/// The value is always a decimal string with two fractional digits, so that
/// megabytes, percentages and load ratios share one wire shape. On the wire
/// the timestamp is whole epoch seconds and `unit` is omitted when absent:
///
/// ```json
/// {"timestamp":1700000000,"name":"mem.total","value":"3793.25","unit":"M"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[getset(get = "pub")]
pub struct Metric {
    #[serde(with = "chrono::serde::ts_seconds")]
    timestamp: DateTime<Utc>,
    name: String,
    value: String,
    /// Absent, `null` and `""` all read as no unit.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_unit_as_none"
    )]
    unit: Option<Unit>,
}

impl Metric {
    pub fn new(
        timestamp: DateTime<Utc>,
        name: impl Into<String>,
        value: String,
        unit: Option<Unit>,
    ) -> Self {
        Self {
            timestamp,
            name: name.into(),
            value,
            unit,
        }
    }

    /// Returns a copy of this metric named `prefix.name`.
    pub fn with_prefix(&self, prefix: &str) -> Metric {
        Metric {
            name: format!("{}.{}", prefix, self.name),
            ..self.clone()
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            Some(unit) => write!(f, "{:<15} {} {}", self.name, self.value, unit),
            None => write!(f, "{:<15} {}", self.name, self.value),
        }
    }
}

fn empty_unit_as_none<'de, D>(deserializer: D) -> Result<Option<Unit>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)?.as_deref() {
        None | Some("") => Ok(None),
        Some("M") => Ok(Some(Unit::Megabytes)),
        Some("%") => Ok(Some(Unit::Percent)),
        Some(other) => Err(de::Error::unknown_variant(other, &["M", "%"])),
    }
}

/// Renders a quantity with two fractional digits.
pub fn format_value(value: f64) -> String {
    format!("{:.2}", value)
}

/// Converts a byte count to megabytes (`bytes / 1024 / 1024`).
pub fn to_megabytes(bytes: u64) -> String {
    format_value(bytes as f64 / BYTES_PER_KIB / BYTES_PER_KIB)
}

/// `part / total * 100`, or `None` when the result would not be finite.
pub fn percentage(part: u64, total: u64) -> Option<String> {
    if total == 0 {
        return None;
    }
    let ratio = part as f64 / total as f64 * 100.0;
    ratio.is_finite().then(|| format_value(ratio))
}
