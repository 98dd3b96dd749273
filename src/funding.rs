//! Aggregations over the funding-ledger budget lines. The ledger is an
//! independent dataset from the cost-share history; the two are only
//! ever compared at the aggregate level.

use crate::schema::FundingLedgerEntry;
use crate::utils::percentage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Budget position for one segment, labeled "Segment {n}".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetSegment {
    pub segment: String,
    pub allocated: f64,
    pub used: f64,
    pub available: f64,
    pub utilization_pct: f64,
}

/// Allocated/used rollup keyed by fund name or practice type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilizationRow {
    pub name: String,
    pub allocated: f64,
    pub used: f64,
    pub utilization_pct: f64,
}

/// Budget lines summed per segment, sorted by segment label. Rows with
/// no segment are skipped.
pub fn compute_budget_by_segment(rows: &[FundingLedgerEntry]) -> Vec<BudgetSegment> {
    let mut seg_map: BTreeMap<&str, (f64, f64, f64)> = BTreeMap::new();

    for r in rows {
        let Some(segment) = r.segment.as_deref().filter(|s| !s.is_empty()) else {
            continue;
        };
        let entry = seg_map.entry(segment).or_insert((0.0, 0.0, 0.0));
        entry.0 += r.amount_allocated;
        entry.1 += r.amount_used;
        entry.2 += r.amount_available;
    }

    seg_map
        .into_iter()
        .map(|(segment, (allocated, used, available))| BudgetSegment {
            segment: format!("Segment {}", segment),
            allocated,
            used,
            available,
            utilization_pct: percentage(used, allocated),
        })
        .collect()
}

fn utilization_rollup<F>(rows: &[FundingLedgerEntry], key: F) -> Vec<UtilizationRow>
where
    F: Fn(&FundingLedgerEntry) -> Option<&str>,
{
    let mut map: BTreeMap<&str, (f64, f64)> = BTreeMap::new();

    for r in rows {
        let Some(name) = key(r) else { continue };
        let entry = map.entry(name).or_insert((0.0, 0.0));
        entry.0 += r.amount_allocated;
        entry.1 += r.amount_used;
    }

    let mut result: Vec<UtilizationRow> = map
        .into_iter()
        .map(|(name, (allocated, used))| UtilizationRow {
            name: name.to_string(),
            allocated,
            used,
            utilization_pct: percentage(used, allocated),
        })
        .collect();
    result.sort_by(|a, b| b.allocated.total_cmp(&a.allocated));
    result
}

/// Allocation and utilization per fund, largest allocation first.
pub fn compute_funding_by_source(rows: &[FundingLedgerEntry]) -> Vec<UtilizationRow> {
    utilization_rollup(rows, |r| r.fund_name.as_deref())
}

/// Allocation and utilization per practice type, largest allocation first.
pub fn compute_budget_by_bmp_type(rows: &[FundingLedgerEntry]) -> Vec<UtilizationRow> {
    utilization_rollup(rows, |r| r.bmp_type.as_deref())
}
