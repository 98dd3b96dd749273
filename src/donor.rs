use crate::filter::DonorFilter;
use crate::insight::{Insight, InsightKind};
use crate::schema::Donation;
use crate::utils::{
    breakdown_from_counts, current_year, format_count, format_currency, percentage,
    StatusBreakdown, YearMatrix, YearTotals,
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Headline donor metrics for the filtered rows. `None` means "no data",
/// not zero-valued metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonorMetrics {
    pub total_donors: usize,
    pub total_transactions: usize,
    pub lifetime_giving: f64,
    pub avg_gift_size: f64,
    pub peak_giving_year: Option<i32>,
    pub yoy_growth: Option<f64>,
    pub yoy_years: Option<String>,
    pub data_year_range: String,
}

pub fn compute_donor_metrics(rows: &[Donation]) -> Option<DonorMetrics> {
    compute_donor_metrics_at(rows, current_year())
}

pub fn compute_donor_metrics_at(rows: &[Donation], current_year: i32) -> Option<DonorMetrics> {
    if rows.is_empty() {
        return None;
    }

    let unique_donors: HashSet<&str> = rows
        .iter()
        .filter_map(|r| r.person_id.as_deref())
        .collect();
    let total_transactions = rows.len();
    let lifetime_giving: f64 = rows.iter().map(|r| r.gift_amount).sum();
    let avg_gift_size = if total_transactions > 0 {
        lifetime_giving / total_transactions as f64
    } else {
        0.0
    };

    let mut by_year = YearTotals::new();
    for r in rows {
        by_year.add(r.gift_year, r.gift_amount);
    }

    Some(DonorMetrics {
        total_donors: unique_donors.len(),
        total_transactions,
        lifetime_giving,
        avg_gift_size,
        peak_giving_year: by_year.peak_year(),
        yoy_growth: by_year.yoy_growth(current_year),
        yoy_years: by_year.yoy_span_label(current_year),
        data_year_range: by_year.year_range_label(),
    })
}

/// One year of giving activity, with the membership slice broken out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GivingYear {
    pub year: i32,
    pub total_giving: f64,
    pub membership_giving: f64,
    pub membership_count: u64,
    pub transaction_count: u64,
}

fn is_membership_gift(row: &Donation) -> bool {
    row.gift_type
        .as_deref()
        .is_some_and(|t| t.to_lowercase().contains("membership"))
}

pub fn compute_giving_by_year(rows: &[Donation]) -> Vec<GivingYear> {
    let mut year_map: BTreeMap<i32, GivingYear> = BTreeMap::new();

    for r in rows {
        let Some(year) = r.gift_year else { continue };
        let entry = year_map.entry(year).or_insert_with(|| GivingYear {
            year,
            total_giving: 0.0,
            membership_giving: 0.0,
            membership_count: 0,
            transaction_count: 0,
        });
        entry.total_giving += r.gift_amount;
        entry.transaction_count += 1;
        if is_membership_gift(r) {
            entry.membership_giving += r.gift_amount;
            entry.membership_count += 1;
        }
    }

    year_map.into_values().collect()
}

/// Membership-status breakdown over unique donors (first row per person
/// wins the status snapshot).
pub fn compute_membership_status(rows: &[Donation]) -> Vec<StatusBreakdown> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for r in rows {
        let Some(id) = r.person_id.as_deref() else { continue };
        if !seen.insert(id) {
            continue;
        }
        let status = r.membership_status.as_deref().unwrap_or("Unknown");
        *counts.entry(status.to_string()).or_insert(0) += 1;
    }

    breakdown_from_counts(counts)
}

/// Gift-type columns per year, summed by amount.
pub fn compute_gift_type_by_year(rows: &[Donation]) -> YearMatrix {
    YearMatrix::from_triples(rows.iter().filter_map(|r| {
        let year = r.gift_year?;
        let gift_type = r.gift_type.clone()?;
        Some((year, gift_type, r.gift_amount))
    }))
}

/// Gift-type columns per year, counted by transaction.
pub fn compute_transaction_volume(rows: &[Donation]) -> YearMatrix {
    YearMatrix::from_triples(rows.iter().filter_map(|r| {
        let year = r.gift_year?;
        let gift_type = r.gift_type.clone()?;
        Some((year, gift_type, 1.0))
    }))
}

/// Per-donor rollup used by the expandable donor table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonorRollup {
    pub person_id: String,
    pub full_name: String,
    pub membership_status: String,
    pub lifetime_gift_amount: f64,
    pub total_given: f64,
    pub transaction_count: u64,
    pub last_gift_year: Option<i32>,
}

pub fn compute_all_donors(rows: &[Donation]) -> Vec<DonorRollup> {
    let mut donor_map: BTreeMap<&str, DonorRollup> = BTreeMap::new();

    for r in rows {
        let Some(id) = r.person_id.as_deref() else { continue };
        let entry = donor_map.entry(id).or_insert_with(|| DonorRollup {
            person_id: id.to_string(),
            full_name: r.full_name.clone().unwrap_or_else(|| "Unknown".to_string()),
            membership_status: r
                .membership_status
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
            lifetime_gift_amount: r.lifetime_gift_amount,
            total_given: 0.0,
            transaction_count: 0,
            last_gift_year: None,
        });
        entry.total_given += r.gift_amount;
        entry.transaction_count += 1;
        if r.gift_year > entry.last_gift_year {
            entry.last_gift_year = r.gift_year;
        }
    }

    let mut donors: Vec<DonorRollup> = donor_map.into_values().collect();
    donors.sort_by(|a, b| b.total_given.total_cmp(&a.total_given));
    donors
}

/// Giving trend merged across the two filter tiers: membership counts come
/// from the year-only rows (insensitive to gift-type/status selections),
/// giving totals from the fully-filtered rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipYear {
    pub year: i32,
    pub membership_count: u64,
    pub total_giving: f64,
}

pub fn compute_membership_by_year(
    year_rows: &[Donation],
    filtered_rows: &[Donation],
) -> Vec<MembershipYear> {
    let year_tier = compute_giving_by_year(year_rows);
    let filtered_tier = compute_giving_by_year(filtered_rows);

    let mut years: BTreeSet<i32> = BTreeSet::new();
    let mut membership: BTreeMap<i32, u64> = BTreeMap::new();
    let mut giving: BTreeMap<i32, f64> = BTreeMap::new();

    for y in &year_tier {
        years.insert(y.year);
        membership.insert(y.year, y.membership_count);
    }
    for y in &filtered_tier {
        years.insert(y.year);
        giving.insert(y.year, y.total_giving);
    }

    years
        .into_iter()
        .map(|year| MembershipYear {
            year,
            membership_count: membership.get(&year).copied().unwrap_or(0),
            total_giving: giving.get(&year).copied().unwrap_or(0.0),
        })
        .collect()
}

/// Distinct value sets for the donor filter controls, always derived from
/// the unfiltered row store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DonorFilterOptions {
    pub years: Vec<i32>,
    pub gift_types: Vec<String>,
    pub membership_statuses: Vec<String>,
}

pub fn donor_filter_options(rows: &[Donation]) -> DonorFilterOptions {
    let years: BTreeSet<i32> = rows.iter().filter_map(|r| r.gift_year).collect();
    let gift_types: BTreeSet<String> = rows.iter().filter_map(|r| r.gift_type.clone()).collect();
    let membership_statuses: BTreeSet<String> = rows
        .iter()
        .filter_map(|r| r.membership_status.clone())
        .collect();

    DonorFilterOptions {
        years: years.into_iter().collect(),
        gift_types: gift_types.into_iter().collect(),
        membership_statuses: membership_statuses.into_iter().collect(),
    }
}

pub fn compute_donor_insights(
    metrics: &DonorMetrics,
    giving_by_year: &[GivingYear],
    membership_status: &[StatusBreakdown],
    rows: &[Donation],
) -> Vec<Insight> {
    let mut insights = Vec::new();

    if let Some(peak) = metrics.peak_giving_year {
        let peak_total = giving_by_year
            .iter()
            .find(|y| y.year == peak)
            .map(|y| y.total_giving)
            .unwrap_or(0.0);
        insights.push(Insight::new(
            InsightKind::Highlight,
            format!(
                "Peak giving year was {} with {} in total contributions.",
                peak,
                format_currency(peak_total)
            ),
        ));
    }

    if let Some(growth) = metrics.yoy_growth {
        let direction = if growth >= 0.0 { "increase" } else { "decrease" };
        let kind = if growth >= 0.0 {
            InsightKind::Positive
        } else {
            InsightKind::Negative
        };
        insights.push(Insight::new(
            kind,
            format!(
                "{:.1}% year-over-year {} ({}).",
                growth.abs(),
                direction,
                metrics.yoy_years.as_deref().unwrap_or("")
            ),
        ));
    }

    insights.push(Insight::new(
        InsightKind::Info,
        format!(
            "{} unique donors across {} transactions spanning {}.",
            format_count(metrics.total_donors as u64),
            format_count(metrics.total_transactions as u64),
            metrics.data_year_range
        ),
    ));

    // Former-member re-engagement, only past the majority threshold.
    if let Some(former) = membership_status
        .iter()
        .find(|s| s.status.eq_ignore_ascii_case("former"))
    {
        if former.percentage > 50.0 {
            insights.push(Insight::new(
                InsightKind::Opportunity,
                format!(
                    "{:.0}% of donors are Former members, a significant re-engagement opportunity.",
                    former.percentage
                ),
            ));
        }
    }

    // Membership dominates transactions but not dollars.
    let membership_rows: Vec<&Donation> = rows.iter().filter(|r| is_membership_gift(r)).collect();
    let membership_pct_txns = percentage(membership_rows.len() as f64, rows.len() as f64);
    let membership_dollars: f64 = membership_rows.iter().map(|r| r.gift_amount).sum();
    let membership_pct_dollars = percentage(membership_dollars, metrics.lifetime_giving);
    if membership_pct_txns > 40.0 && membership_pct_dollars < 10.0 {
        insights.push(Insight::new(
            InsightKind::Info,
            format!(
                "Membership accounts for {:.0}% of transactions but only {:.0}% of total giving dollars.",
                membership_pct_txns, membership_pct_dollars
            ),
        ));
    }

    let donors = compute_all_donors(rows);
    if let Some(top) = donors.first().filter(|d| d.total_given > 0.0) {
        insights.push(Insight::new(
            InsightKind::Highlight,
            format!(
                "Top contributor: {} with {} in total giving.",
                top.full_name,
                format_currency(top.total_given)
            ),
        ));
    }

    insights
}

/// Everything the donor dashboard renders, computed in one pass from the
/// raw rows and the current filter state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonorDashboard {
    pub metrics: Option<DonorMetrics>,
    pub giving_by_year: Vec<GivingYear>,
    pub membership_status: Vec<StatusBreakdown>,
    pub gift_type_by_year: YearMatrix,
    pub transaction_volume: YearMatrix,
    pub membership_by_year: Vec<MembershipYear>,
    pub all_donors: Vec<DonorRollup>,
    pub insights: Vec<Insight>,
    pub filter_options: DonorFilterOptions,
    pub filtered_row_count: usize,
    pub total_row_count: usize,
}

impl DonorDashboard {
    pub fn compute(rows: &[Donation], filter: &DonorFilter) -> Self {
        Self::compute_at(rows, filter, current_year())
    }

    pub fn compute_at(rows: &[Donation], filter: &DonorFilter, current_year: i32) -> Self {
        let year_rows = filter.year_filtered(rows);
        let filtered = filter.apply(rows);
        debug!(
            "donor dashboard: {} rows, {} after year filter, {} after all filters",
            rows.len(),
            year_rows.len(),
            filtered.len()
        );

        let metrics = compute_donor_metrics_at(&filtered, current_year);
        let giving_by_year = compute_giving_by_year(&filtered);
        let membership_status = compute_membership_status(&filtered);
        let insights = metrics
            .as_ref()
            .map(|m| compute_donor_insights(m, &giving_by_year, &membership_status, &filtered))
            .unwrap_or_default();

        Self {
            metrics,
            gift_type_by_year: compute_gift_type_by_year(&filtered),
            transaction_volume: compute_transaction_volume(&filtered),
            membership_by_year: compute_membership_by_year(&year_rows, &filtered),
            all_donors: compute_all_donors(&filtered),
            insights,
            filter_options: donor_filter_options(rows),
            filtered_row_count: filtered.len(),
            total_row_count: rows.len(),
            giving_by_year,
            membership_status,
        }
    }
}
