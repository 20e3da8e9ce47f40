pub mod issue_stats;
pub mod performance;
pub mod rankings;
pub mod time_series;

pub use issue_stats::{IssueStats, Trend, compute_trend, issue_stats};
pub use performance::{SlaSummary, performance_score, sla_summary};
pub use rankings::{RankingEntry, area_rankings, percentile_rank, tenant_rankings};
pub use time_series::{Aggregate, Interval, TimeBucket, bucket_series, smooth};
