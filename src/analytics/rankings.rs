//! Percentile ranks and tenant/area leaderboards.

use std::cmp::Ordering;

use serde::Serialize;

use crate::entity::MetricType;
use crate::error::EngineError;
use crate::store::Store;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    pub entity_id: i64,
    pub score: f64,
    pub rank: usize,
    pub percentile: f64,
}

/// Inclusive percentile rank: tied scores share an identical percentile.
/// Rounded to one decimal place; an empty score set pins the rank at 50.0.
pub fn percentile_rank(score: f64, all_scores: &[f64]) -> f64 {
    if all_scores.is_empty() {
        return 50.0;
    }
    let at_or_below = all_scores.iter().filter(|s| **s <= score).count();
    let percentile = (at_or_below as f64 / all_scores.len() as f64) * 100.0;
    (percentile * 10.0).round() / 10.0
}

/// Leaderboard across tenants, from the latest tenant-level score per
/// tenant for the given metric.
pub async fn tenant_rankings(
    store: &dyn Store,
    metric_type: MetricType,
) -> Result<Vec<RankingEntry>, EngineError> {
    let entries = store.latest_scores(metric_type).await?;
    let rows = entries
        .iter()
        .filter(|entry| entry.area_id.is_none())
        .map(|entry| (entry.tenant_id, entry.score))
        .collect();
    Ok(rank(rows))
}

/// Leaderboard across one tenant's areas.
pub async fn area_rankings(
    store: &dyn Store,
    tenant_id: i64,
    metric_type: MetricType,
) -> Result<Vec<RankingEntry>, EngineError> {
    store.tenant(tenant_id).await?;
    let entries = store.latest_scores(metric_type).await?;
    let rows = entries
        .iter()
        .filter(|entry| entry.tenant_id == tenant_id)
        .filter_map(|entry| entry.area_id.map(|area_id| (area_id, entry.score)))
        .collect();
    Ok(rank(rows))
}

/// Sort descending by score; ties break by ascending entity id so the
/// ordering is total and reproducible.
fn rank(mut rows: Vec<(i64, f64)>) -> Vec<RankingEntry> {
    let all_scores: Vec<f64> = rows.iter().map(|(_, score)| *score).collect();
    rows.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    rows.into_iter()
        .enumerate()
        .map(|(index, (entity_id, score))| RankingEntry {
            entity_id,
            score,
            rank: index + 1,
            percentile: percentile_rank(score, &all_scores),
        })
        .collect()
}
