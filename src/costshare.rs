use crate::filter::CostShareFilter;
use crate::funding::{
    compute_budget_by_bmp_type, compute_budget_by_segment, compute_funding_by_source, BudgetSegment,
    UtilizationRow,
};
use crate::insight::{Insight, InsightKind};
use crate::schema::{CostShareActivity, FundingLedgerEntry};
use crate::utils::{current_year, format_currency, format_number, percentage, YearTotals};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// South Dakota bounding box for the practice map.
const SD_LAT_RANGE: (f64, f64) = (42.5, 46.0);
const SD_LON_RANGE: (f64, f64) = (-104.5, -96.0);

/// Headline cost-share metrics. The N/P/S figures here are the combined
/// (synergistic) reductions, which the UI surfaces as headlines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostShareMetrics {
    pub total_farms: usize,
    pub total_producers: usize,
    pub total_funding: f64,
    pub contract_count: usize,
    pub total_acres: f64,
    pub nitrogen_reduction: f64,
    pub phosphorus_reduction: f64,
    pub sediment_reduction: f64,
    pub peak_funding_year: Option<i32>,
    pub yoy_growth: Option<f64>,
    pub yoy_years: Option<String>,
    pub data_year_range: String,
}

pub fn compute_cost_share_metrics(rows: &[CostShareActivity]) -> Option<CostShareMetrics> {
    compute_cost_share_metrics_at(rows, current_year())
}

pub fn compute_cost_share_metrics_at(
    rows: &[CostShareActivity],
    current_year: i32,
) -> Option<CostShareMetrics> {
    if rows.is_empty() {
        return None;
    }

    let farms: HashSet<&str> = rows.iter().filter_map(|r| r.farm_name.as_deref()).collect();
    let producers: HashSet<&str> = rows.iter().filter_map(|r| r.person_id.as_deref()).collect();
    let contracts: HashSet<&str> = rows.iter().filter_map(|r| r.contract_id.as_deref()).collect();

    let mut by_year = YearTotals::new();
    for r in rows {
        by_year.add(r.project_year, r.total_amount);
    }

    Some(CostShareMetrics {
        total_farms: farms.len(),
        total_producers: producers.len(),
        total_funding: rows.iter().map(|r| r.total_amount).sum(),
        contract_count: contracts.len(),
        total_acres: rows.iter().map(|r| r.practice_acres).sum(),
        nitrogen_reduction: rows.iter().map(|r| r.n_combined).sum(),
        phosphorus_reduction: rows.iter().map(|r| r.p_combined).sum(),
        sediment_reduction: rows.iter().map(|r| r.s_combined).sum(),
        peak_funding_year: by_year.peak_year(),
        yoy_growth: by_year.yoy_growth(current_year),
        yoy_years: by_year.yoy_span_label(current_year),
        data_year_range: by_year.year_range_label(),
    })
}

/// One year of funding split across the three sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingYear {
    pub year: i32,
    pub total_319: f64,
    pub total_other: f64,
    pub total_local: f64,
    pub total_funding: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundingByYear {
    pub data: Vec<FundingYear>,
    pub funding_sources: Vec<String>,
}

pub fn compute_funding_by_year(rows: &[CostShareActivity]) -> FundingByYear {
    let mut year_map: BTreeMap<i32, FundingYear> = BTreeMap::new();

    for r in rows {
        let Some(year) = r.project_year else { continue };
        let entry = year_map.entry(year).or_insert_with(|| FundingYear {
            year,
            total_319: 0.0,
            total_other: 0.0,
            total_local: 0.0,
            total_funding: 0.0,
        });
        entry.total_319 += r.odata319_amount;
        entry.total_other += r.other_amount;
        entry.total_local += r.local_amount;
        entry.total_funding += r.total_amount;
    }

    FundingByYear {
        data: year_map.into_values().collect(),
        funding_sources: vec![
            "total_319".to_string(),
            "total_other".to_string(),
            "total_local".to_string(),
        ],
    }
}

/// Amount-weighted share of each funding source; zero sources are dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingSourceSlice {
    pub source: String,
    pub amount: f64,
    pub percentage: f64,
}

pub fn compute_funding_source_breakdown(rows: &[CostShareActivity]) -> Vec<FundingSourceSlice> {
    let total_319: f64 = rows.iter().map(|r| r.odata319_amount).sum();
    let total_other: f64 = rows.iter().map(|r| r.other_amount).sum();
    let total_local: f64 = rows.iter().map(|r| r.local_amount).sum();
    let grand_total = total_319 + total_other + total_local;

    let mut sources: Vec<FundingSourceSlice> = [
        ("319 Funds", total_319),
        ("Other", total_other),
        ("Local", total_local),
    ]
    .into_iter()
    .filter(|(_, amount)| *amount > 0.0)
    .map(|(source, amount)| FundingSourceSlice {
        source: source.to_string(),
        amount,
        percentage: percentage(amount, grand_total),
    })
    .collect();

    sources.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    sources
}

/// Contract count, acreage, and funding per practice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BmpDistribution {
    pub bmp: String,
    pub count: u64,
    pub total_acres: f64,
    pub total_funding: f64,
}

pub fn compute_bmp_distribution(rows: &[CostShareActivity]) -> Vec<BmpDistribution> {
    let mut bmp_map: BTreeMap<&str, BmpDistribution> = BTreeMap::new();

    for r in rows {
        let Some(bmp) = r.bmp.as_deref() else { continue };
        let entry = bmp_map.entry(bmp).or_insert_with(|| BmpDistribution {
            bmp: bmp.to_string(),
            count: 0,
            total_acres: 0.0,
            total_funding: 0.0,
        });
        entry.count += 1;
        entry.total_acres += r.practice_acres;
        entry.total_funding += r.total_amount;
    }

    let mut distribution: Vec<BmpDistribution> = bmp_map.into_values().collect();
    distribution.sort_by(|a, b| b.count.cmp(&a.count));
    distribution
}

/// Raw and combined reduction totals. Both variants are carried; neither
/// is ever derived from the other.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalTotals {
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub sediment: f64,
    pub n_combined: f64,
    pub p_combined: f64,
    pub s_combined: f64,
}

/// Combined reductions attributed to one practice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BmpImpact {
    pub bmp: String,
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub sediment: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalImpact {
    pub totals: EnvironmentalTotals,
    pub by_bmp: Vec<BmpImpact>,
}

pub fn compute_environmental_impact(rows: &[CostShareActivity]) -> EnvironmentalImpact {
    let mut totals = EnvironmentalTotals::default();
    let mut bmp_map: BTreeMap<&str, BmpImpact> = BTreeMap::new();

    for r in rows {
        totals.nitrogen += r.n_reductions;
        totals.phosphorus += r.p_reductions;
        totals.sediment += r.s_reductions;
        totals.n_combined += r.n_combined;
        totals.p_combined += r.p_combined;
        totals.s_combined += r.s_combined;

        if let Some(bmp) = r.bmp.as_deref() {
            let entry = bmp_map.entry(bmp).or_insert_with(|| BmpImpact {
                bmp: bmp.to_string(),
                nitrogen: 0.0,
                phosphorus: 0.0,
                sediment: 0.0,
            });
            entry.nitrogen += r.n_combined;
            entry.phosphorus += r.p_combined;
            entry.sediment += r.s_combined;
        }
    }

    let mut by_bmp: Vec<BmpImpact> = bmp_map.into_values().collect();
    by_bmp.sort_by(|a, b| b.nitrogen.total_cmp(&a.nitrogen));
    by_bmp.truncate(8);

    EnvironmentalImpact { totals, by_bmp }
}

/// Contract activity per year, merged across the two filter tiers:
/// contract counts come from the year-only rows (insensitive to
/// BMP/segment/stream selections), acreage from the fully-filtered rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineYear {
    pub year: i32,
    pub contract_count: usize,
    pub total_acres: f64,
}

pub fn compute_contract_timeline(
    year_rows: &[CostShareActivity],
    filtered_rows: &[CostShareActivity],
) -> Vec<TimelineYear> {
    let mut contracts: BTreeMap<i32, HashSet<&str>> = BTreeMap::new();
    let mut acres: BTreeMap<i32, f64> = BTreeMap::new();
    let mut years: BTreeSet<i32> = BTreeSet::new();

    for r in year_rows {
        let Some(year) = r.project_year else { continue };
        years.insert(year);
        if let Some(id) = r.contract_id.as_deref() {
            contracts.entry(year).or_default().insert(id);
        }
    }
    for r in filtered_rows {
        let Some(year) = r.project_year else { continue };
        years.insert(year);
        *acres.entry(year).or_insert(0.0) += r.practice_acres;
    }

    years
        .into_iter()
        .map(|year| TimelineYear {
            year,
            contract_count: contracts.get(&year).map(|c| c.len()).unwrap_or(0),
            total_acres: acres.get(&year).copied().unwrap_or(0.0).round(),
        })
        .collect()
}

/// Per-acre/amount/count BMP slice inside a farm rollup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BmpSubTotal {
    pub amount: f64,
    pub count: u64,
    pub acres: f64,
}

/// Per-recipient rollup for the farm table and map popovers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmRollup {
    pub person_id: String,
    pub full_name: String,
    pub farm_name: String,
    pub total_funding: f64,
    pub contract_count: usize,
    pub total_acres: f64,
    pub last_practice_year: Option<i32>,
    pub bmp_breakdown: BTreeMap<String, BmpSubTotal>,
    pub lifetime_costshare_total: f64,
    pub record_url: Option<String>,
    pub cost_share_url: Option<String>,
    pub lat: Option<f64>,
    pub longitude: Option<f64>,
}

pub fn compute_all_farms(rows: &[CostShareActivity]) -> Vec<FarmRollup> {
    struct Accum<'a> {
        rollup: FarmRollup,
        contracts: HashSet<&'a str>,
    }

    let mut farm_map: BTreeMap<&str, Accum> = BTreeMap::new();

    for r in rows {
        let Some(id) = r.person_id.as_deref() else { continue };
        let entry = farm_map.entry(id).or_insert_with(|| Accum {
            rollup: FarmRollup {
                person_id: id.to_string(),
                full_name: r.full_name.clone().unwrap_or_else(|| "Unknown".to_string()),
                farm_name: r.farm_name.clone().unwrap_or_default(),
                total_funding: 0.0,
                contract_count: 0,
                total_acres: 0.0,
                last_practice_year: None,
                bmp_breakdown: BTreeMap::new(),
                lifetime_costshare_total: r.lifetime_costshare_total,
                record_url: r.record_url.clone(),
                cost_share_url: r.cost_share_url.clone(),
                lat: r.lat,
                longitude: r.longitude,
            },
            contracts: HashSet::new(),
        });

        let farm = &mut entry.rollup;
        farm.total_funding += r.total_amount;
        farm.total_acres += r.practice_acres;
        if let Some(contract) = r.contract_id.as_deref() {
            entry.contracts.insert(contract);
        }
        if r.project_year > farm.last_practice_year {
            farm.last_practice_year = r.project_year;
        }
        if let Some(bmp) = &r.bmp {
            let slice = farm.bmp_breakdown.entry(bmp.clone()).or_default();
            slice.amount += r.total_amount;
            slice.count += 1;
            slice.acres += r.practice_acres;
        }
        // Snapshot fields are last-write-wins for non-null values.
        if r.record_url.is_some() {
            farm.record_url = r.record_url.clone();
        }
        if r.cost_share_url.is_some() {
            farm.cost_share_url = r.cost_share_url.clone();
        }
        if r.lat.is_some() {
            farm.lat = r.lat;
        }
        if r.longitude.is_some() {
            farm.longitude = r.longitude;
        }
    }

    let mut farms: Vec<FarmRollup> = farm_map
        .into_values()
        .map(|mut accum| {
            accum.rollup.contract_count = accum.contracts.len();
            accum.rollup.total_acres = accum.rollup.total_acres.round();
            accum.rollup
        })
        .collect();
    farms.sort_by(|a, b| b.total_funding.total_cmp(&a.total_funding));
    farms
}

/// Filtered rows with coordinates inside the South Dakota bounding box.
pub fn map_rows(rows: &[CostShareActivity]) -> Vec<CostShareActivity> {
    rows.iter()
        .filter(|r| {
            matches!((r.lat, r.longitude), (Some(lat), Some(lon))
                if (SD_LAT_RANGE.0..=SD_LAT_RANGE.1).contains(&lat)
                    && (SD_LON_RANGE.0..=SD_LON_RANGE.1).contains(&lon))
        })
        .cloned()
        .collect()
}

/// Distinct value sets for the cost-share filter controls, from unfiltered
/// rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostShareFilterOptions {
    pub years: Vec<i32>,
    pub bmps: Vec<String>,
    pub segments: Vec<String>,
    pub streams: Vec<String>,
}

pub fn cost_share_filter_options(rows: &[CostShareActivity]) -> CostShareFilterOptions {
    let years: BTreeSet<i32> = rows.iter().filter_map(|r| r.project_year).collect();
    let bmps: BTreeSet<String> = rows.iter().filter_map(|r| r.bmp.clone()).collect();
    let segments: BTreeSet<String> = rows
        .iter()
        .filter_map(|r| r.project_segment.clone())
        .collect();
    let streams: BTreeSet<String> = rows.iter().filter_map(|r| r.stream.clone()).collect();

    CostShareFilterOptions {
        years: years.into_iter().collect(),
        bmps: bmps.into_iter().collect(),
        segments: segments.into_iter().collect(),
        streams: streams.into_iter().collect(),
    }
}

pub fn compute_cost_share_insights(
    metrics: &CostShareMetrics,
    funding_by_year: &[FundingYear],
    bmp_distribution: &[BmpDistribution],
    rows: &[CostShareActivity],
) -> Vec<Insight> {
    let mut insights = Vec::new();

    if let Some(peak) = metrics.peak_funding_year {
        let peak_total = funding_by_year
            .iter()
            .find(|y| y.year == peak)
            .map(|y| y.total_funding)
            .unwrap_or(0.0);
        insights.push(Insight::new(
            InsightKind::Highlight,
            format!(
                "Peak funding year was {} with {} in total cost-share payments.",
                peak,
                format_currency(peak_total)
            ),
        ));
    }

    if metrics.total_acres > 0.0 {
        insights.push(Insight::new(
            InsightKind::Info,
            format!(
                "{} acres impacted across {} farms with {} contracts.",
                format_number(metrics.total_acres),
                metrics.total_farms,
                metrics.contract_count
            ),
        ));
    }

    if metrics.nitrogen_reduction > 0.0 {
        insights.push(Insight::new(
            InsightKind::Positive,
            format!(
                "Environmental impact: {} lbs nitrogen, {} lbs phosphorus, and {} tons sediment reduced (combined).",
                format_number(metrics.nitrogen_reduction),
                format_number(metrics.phosphorus_reduction),
                format_number(metrics.sediment_reduction)
            ),
        ));
    }

    if let Some(top_bmp) = bmp_distribution.first() {
        insights.push(Insight::new(
            InsightKind::Highlight,
            format!(
                "Most common practice: {} with {} contracts covering {} acres.",
                top_bmp.bmp,
                top_bmp.count,
                format_number(top_bmp.total_acres)
            ),
        ));
    }

    let farms = compute_all_farms(rows);
    if let Some(top) = farms.first() {
        let farm_label = if top.farm_name.is_empty() {
            "unnamed farm"
        } else {
            top.farm_name.as_str()
        };
        insights.push(Insight::new(
            InsightKind::Info,
            format!(
                "Top recipient: {} ({}) with {} in cost-share funding.",
                top.full_name,
                farm_label,
                format_currency(top.total_funding)
            ),
        ));
    }

    insights
}

/// Everything the cost-share dashboard renders, including the
/// funding-ledger aggregates. The ledger is an independent dataset, so
/// those ignore the history filters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostShareDashboard {
    pub metrics: Option<CostShareMetrics>,
    pub funding_by_year: FundingByYear,
    pub funding_source_breakdown: Vec<FundingSourceSlice>,
    pub bmp_distribution: Vec<BmpDistribution>,
    pub environmental_impact: EnvironmentalImpact,
    pub timeline: Vec<TimelineYear>,
    pub all_farms: Vec<FarmRollup>,
    pub insights: Vec<Insight>,
    pub budget_by_segment: Vec<BudgetSegment>,
    pub funding_by_source: Vec<UtilizationRow>,
    pub budget_by_bmp_type: Vec<UtilizationRow>,
    pub filter_options: CostShareFilterOptions,
    pub map_rows: Vec<CostShareActivity>,
    pub filtered_row_count: usize,
    pub total_row_count: usize,
}

impl CostShareDashboard {
    pub fn compute(
        rows: &[CostShareActivity],
        funding_rows: &[FundingLedgerEntry],
        filter: &CostShareFilter,
    ) -> Self {
        Self::compute_at(rows, funding_rows, filter, current_year())
    }

    pub fn compute_at(
        rows: &[CostShareActivity],
        funding_rows: &[FundingLedgerEntry],
        filter: &CostShareFilter,
        current_year: i32,
    ) -> Self {
        let year_rows = filter.year_filtered(rows);
        let filtered = filter.apply(rows);
        debug!(
            "cost-share dashboard: {} rows, {} after year filter, {} after all filters, {} ledger rows",
            rows.len(),
            year_rows.len(),
            filtered.len(),
            funding_rows.len()
        );

        let metrics = compute_cost_share_metrics_at(&filtered, current_year);
        let funding_by_year = compute_funding_by_year(&filtered);
        let bmp_distribution = compute_bmp_distribution(&filtered);
        let insights = metrics
            .as_ref()
            .map(|m| {
                compute_cost_share_insights(m, &funding_by_year.data, &bmp_distribution, &filtered)
            })
            .unwrap_or_default();

        Self {
            metrics,
            funding_source_breakdown: compute_funding_source_breakdown(&filtered),
            environmental_impact: compute_environmental_impact(&filtered),
            timeline: compute_contract_timeline(&year_rows, &filtered),
            all_farms: compute_all_farms(&filtered),
            insights,
            budget_by_segment: compute_budget_by_segment(funding_rows),
            funding_by_source: compute_funding_by_source(funding_rows),
            budget_by_bmp_type: compute_budget_by_bmp_type(funding_rows),
            filter_options: cost_share_filter_options(rows),
            map_rows: map_rows(&filtered),
            filtered_row_count: filtered.len(),
            total_row_count: rows.len(),
            funding_by_year,
            bmp_distribution,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(
        id: Option<&str>,
        year: Option<i32>,
        bmp: Option<&str>,
        contract: Option<&str>,
        total: f64,
        acres: f64,
    ) -> CostShareActivity {
        CostShareActivity {
            person_id: id.map(str::to_string),
            full_name: id.map(|i| format!("Producer {}", i)),
            farm_name: id.map(|i| format!("{} Farm", i)),
            bmp: bmp.map(str::to_string),
            contract_id: contract.map(str::to_string),
            project_year: year,
            total_amount: total,
            practice_acres: acres,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_rows() {
        assert!(compute_cost_share_metrics_at(&[], 2024).is_none());
        assert!(compute_funding_by_year(&[]).data.is_empty());
        assert!(compute_funding_source_breakdown(&[]).is_empty());
        assert!(compute_bmp_distribution(&[]).is_empty());
        assert!(compute_all_farms(&[]).is_empty());
    }

    #[test]
    fn test_metrics_dedup_counts() {
        let rows = vec![
            row(Some("A"), Some(2020), Some("Cover Crop"), Some("C-1"), 1_000.0, 40.0),
            row(Some("A"), Some(2021), Some("No-Till"), Some("C-1"), 2_000.0, 60.0),
            row(Some("B"), Some(2021), Some("Cover Crop"), Some("C-2"), 500.0, 20.0),
        ];
        let m = compute_cost_share_metrics_at(&rows, 2024).unwrap();
        assert_eq!(m.total_producers, 2);
        assert_eq!(m.total_farms, 2);
        assert_eq!(m.contract_count, 2);
        assert_eq!(m.total_funding, 3_500.0);
        assert_eq!(m.total_acres, 120.0);
        assert_eq!(m.peak_funding_year, Some(2021));
    }

    #[test]
    fn test_combined_reductions_are_the_headline() {
        let mut a = row(Some("A"), Some(2021), Some("Cover Crop"), Some("C-1"), 100.0, 10.0);
        a.n_reductions = 50.0;
        a.n_combined = 35.0;
        a.p_reductions = 8.0;
        a.p_combined = 6.0;
        a.s_reductions = 3.0;
        a.s_combined = 2.0;
        let rows = vec![a];

        let m = compute_cost_share_metrics_at(&rows, 2024).unwrap();
        assert_eq!(m.nitrogen_reduction, 35.0);

        let impact = compute_environmental_impact(&rows);
        // Raw and combined both carried.
        assert_eq!(impact.totals.nitrogen, 50.0);
        assert_eq!(impact.totals.n_combined, 35.0);
        assert_eq!(impact.by_bmp[0].nitrogen, 35.0);
    }

    #[test]
    fn test_funding_by_year_and_source_breakdown() {
        let mut a = row(Some("A"), Some(2020), None, None, 100.0, 0.0);
        a.odata319_amount = 60.0;
        a.local_amount = 40.0;
        let mut b = row(Some("B"), Some(2021), None, None, 50.0, 0.0);
        b.odata319_amount = 50.0;
        let rows = vec![a, b];

        let by_year = compute_funding_by_year(&rows);
        assert_eq!(by_year.data.len(), 2);
        assert_eq!(by_year.data[0].total_319, 60.0);
        assert_eq!(by_year.data[0].total_local, 40.0);

        let breakdown = compute_funding_source_breakdown(&rows);
        // "Other" contributed nothing and is dropped.
        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].source, "319 Funds");
        assert!((breakdown[0].percentage - 110.0 / 150.0 * 100.0).abs() < 1e-9);
        let pct_sum: f64 = breakdown.iter().map(|s| s.percentage).sum();
        assert!((pct_sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_environmental_impact_top_8_by_nitrogen() {
        let rows: Vec<CostShareActivity> = (0..10)
            .map(|i| {
                let name = format!("BMP {}", i);
                let mut r = row(Some("A"), Some(2021), Some(name.as_str()), None, 0.0, 0.0);
                r.n_combined = i as f64;
                r
            })
            .collect();
        let impact = compute_environmental_impact(&rows);
        assert_eq!(impact.by_bmp.len(), 8);
        assert_eq!(impact.by_bmp[0].bmp, "BMP 9");
    }

    #[test]
    fn test_timeline_two_tier_asymmetry() {
        let rows = vec![
            row(Some("A"), Some(2021), Some("Cover Crop"), Some("C-1"), 100.0, 30.0),
            row(Some("B"), Some(2021), Some("No-Till"), Some("C-2"), 100.0, 50.0),
        ];
        let filter = CostShareFilter {
            bmps: vec!["Cover Crop".to_string()],
            ..Default::default()
        };
        let year_rows = filter.year_filtered(&rows);
        let filtered = filter.apply(&rows);
        let timeline = compute_contract_timeline(&year_rows, &filtered);

        assert_eq!(timeline.len(), 1);
        // Contract count ignores the BMP filter; acreage honors it.
        assert_eq!(timeline[0].contract_count, 2);
        assert_eq!(timeline[0].total_acres, 30.0);
    }

    #[test]
    fn test_timeline_dedups_contracts_within_year() {
        let rows = vec![
            row(Some("A"), Some(2021), None, Some("C-1"), 0.0, 10.4),
            row(Some("A"), Some(2021), None, Some("C-1"), 0.0, 10.4),
        ];
        let timeline = compute_contract_timeline(&rows, &rows);
        assert_eq!(timeline[0].contract_count, 1);
        assert_eq!(timeline[0].total_acres, 21.0);
    }

    #[test]
    fn test_all_farms_rollup() {
        let mut first = row(Some("A"), Some(2020), Some("Cover Crop"), Some("C-1"), 1_000.0, 40.2);
        first.lat = Some(44.0);
        first.longitude = Some(-100.0);
        let second = row(Some("A"), Some(2022), Some("Cover Crop"), Some("C-2"), 500.0, 9.9);
        let third = row(Some("B"), Some(2021), Some("No-Till"), Some("C-3"), 2_000.0, 80.0);

        let farms = compute_all_farms(&[first, second, third]);
        assert_eq!(farms.len(), 2);
        assert_eq!(farms[0].person_id, "B");
        let a = &farms[1];
        assert_eq!(a.total_funding, 1_500.0);
        assert_eq!(a.contract_count, 2);
        assert_eq!(a.total_acres, 50.0);
        assert_eq!(a.last_practice_year, Some(2022));
        let cc = &a.bmp_breakdown["Cover Crop"];
        assert_eq!(cc.count, 2);
        assert_eq!(cc.amount, 1_500.0);
        // Coordinates survive later rows that lack them.
        assert_eq!(a.lat, Some(44.0));
    }

    #[test]
    fn test_map_rows_bounding_box() {
        let mut inside = row(Some("A"), Some(2021), None, None, 0.0, 0.0);
        inside.lat = Some(44.3);
        inside.longitude = Some(-100.3);
        let mut outside = row(Some("B"), Some(2021), None, None, 0.0, 0.0);
        outside.lat = Some(40.0);
        outside.longitude = Some(-100.3);
        let missing = row(Some("C"), Some(2021), None, None, 0.0, 0.0);

        let rows = vec![inside, outside, missing];
        let mapped = map_rows(&rows);
        assert_eq!(mapped.len(), 1);
        assert_eq!(mapped[0].person_id.as_deref(), Some("A"));
    }

    #[test]
    fn test_dashboard_end_to_end() {
        let rows = vec![
            row(Some("A"), Some(2020), Some("Cover Crop"), Some("C-1"), 1_000.0, 40.0),
            row(Some("B"), Some(2021), Some("No-Till"), Some("C-2"), 3_000.0, 75.0),
        ];
        let ledger = vec![FundingLedgerEntry {
            bmp: Some("Cover Crop".to_string()),
            bmp_type: Some("Cropland".to_string()),
            fund_name: Some("319".to_string()),
            amount_allocated: 10_000.0,
            amount_used: 4_000.0,
            amount_available: 6_000.0,
            segment: Some("1".to_string()),
        }];
        let dash =
            CostShareDashboard::compute_at(&rows, &ledger, &CostShareFilter::default(), 2024);
        assert_eq!(dash.metrics.as_ref().unwrap().total_funding, 4_000.0);
        assert_eq!(dash.budget_by_segment.len(), 1);
        assert!((dash.budget_by_segment[0].utilization_pct - 40.0).abs() < 1e-9);
        assert!(!dash.insights.is_empty());
        assert_eq!(dash.filter_options.bmps, vec!["Cover Crop", "No-Till"]);
    }
}
