use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    Overall,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Overall => "overall",
        }
    }
}

/// A computed performance value for a (tenant, optional area) pair.
/// Append-only time series; each computation produces a new entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub id: i64,
    pub tenant_id: i64,
    pub area_id: Option<i64>,
    pub score: f64,
    pub metric_type: MetricType,
    pub calculated_at: DateTime<Utc>,
}

impl ScoreEntry {
    pub fn letter_grade(&self) -> char {
        match self.score {
            s if s >= 90.0 => 'A',
            s if s >= 80.0 => 'B',
            s if s >= 70.0 => 'C',
            s if s >= 60.0 => 'D',
            _ => 'F',
        }
    }
}
