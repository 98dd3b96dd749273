use crate::classify::{Category, VendorClassifier};
use crate::filter::VendorFilter;
use crate::insight::{Insight, InsightKind};
use crate::schema::Payment;
use crate::utils::{
    breakdown_from_counts, current_year, format_currency, percentage, StatusBreakdown, SubTotal,
    YearMatrix, YearTotals,
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

fn classify_row(classifier: &VendorClassifier, row: &Payment) -> Category {
    classifier.classify(
        row.split_note.as_deref(),
        row.memo.as_deref(),
        row.full_name.as_deref(),
    )
}

/// Headline vendor-spending metrics for the filtered rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorMetrics {
    pub total_vendors: usize,
    pub total_transactions: usize,
    pub lifetime_spending: f64,
    pub avg_payment_size: f64,
    pub peak_spending_year: Option<i32>,
    pub yoy_growth: Option<f64>,
    pub yoy_years: Option<String>,
    pub data_year_range: String,
}

pub fn compute_vendor_metrics(rows: &[Payment]) -> Option<VendorMetrics> {
    compute_vendor_metrics_at(rows, current_year())
}

pub fn compute_vendor_metrics_at(rows: &[Payment], current_year: i32) -> Option<VendorMetrics> {
    if rows.is_empty() {
        return None;
    }

    let unique_vendors: HashSet<&str> = rows
        .iter()
        .filter_map(|r| r.person_id.as_deref())
        .collect();
    let total_transactions = rows.len();
    let lifetime_spending: f64 = rows.iter().map(|r| r.amount).sum();
    let avg_payment_size = if total_transactions > 0 {
        lifetime_spending / total_transactions as f64
    } else {
        0.0
    };

    let mut by_year = YearTotals::new();
    for r in rows {
        by_year.add(r.payment_year, r.amount);
    }

    Some(VendorMetrics {
        total_vendors: unique_vendors.len(),
        total_transactions,
        lifetime_spending,
        avg_payment_size,
        peak_spending_year: by_year.peak_year(),
        yoy_growth: by_year.yoy_growth(current_year),
        yoy_years: by_year.yoy_span_label(current_year),
        data_year_range: by_year.year_range_label(),
    })
}

/// One year of spending with per-payment-type columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendingYear {
    pub year: i32,
    pub total_spending: f64,
    pub transaction_count: u64,
    #[serde(flatten)]
    pub by_type: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpendingByYear {
    pub data: Vec<SpendingYear>,
    pub payment_types: Vec<String>,
}

pub fn compute_spending_by_year(rows: &[Payment]) -> SpendingByYear {
    let mut year_map: BTreeMap<i32, SpendingYear> = BTreeMap::new();
    let mut all_types: BTreeSet<String> = BTreeSet::new();

    for r in rows {
        let Some(year) = r.payment_year else { continue };
        let entry = year_map.entry(year).or_insert_with(|| SpendingYear {
            year,
            total_spending: 0.0,
            transaction_count: 0,
            by_type: BTreeMap::new(),
        });
        entry.total_spending += r.amount;
        entry.transaction_count += 1;
        if let Some(t) = &r.payment_type {
            all_types.insert(t.clone());
            *entry.by_type.entry(t.clone()).or_insert(0.0) += r.amount;
        }
    }

    SpendingByYear {
        data: year_map.into_values().collect(),
        payment_types: all_types.into_iter().collect(),
    }
}

/// Payment-type breakdown over all filtered rows (type-less rows bucket to
/// "Unknown").
pub fn compute_payment_type_breakdown(rows: &[Payment]) -> Vec<StatusBreakdown> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for r in rows {
        let t = r.payment_type.as_deref().unwrap_or("Unknown");
        *counts.entry(t.to_string()).or_insert(0) += 1;
    }
    breakdown_from_counts(counts)
}

/// Spending per classifier category per year.
pub fn compute_category_by_year(rows: &[Payment], classifier: &VendorClassifier) -> YearMatrix {
    YearMatrix::from_triples(rows.iter().filter_map(|r| {
        let year = r.payment_year?;
        Some((year, classify_row(classifier, r).to_string(), r.amount))
    }))
}

/// Transaction counts per payment type per year.
pub fn compute_transaction_volume_by_type(rows: &[Payment]) -> YearMatrix {
    YearMatrix::from_triples(rows.iter().filter_map(|r| {
        let year = r.payment_year?;
        let t = r.payment_type.clone()?;
        Some((year, t, 1.0))
    }))
}

/// Transaction counts per classifier category per year.
pub fn compute_transaction_volume_by_category(
    rows: &[Payment],
    classifier: &VendorClassifier,
) -> YearMatrix {
    YearMatrix::from_triples(rows.iter().filter_map(|r| {
        let year = r.payment_year?;
        Some((year, classify_row(classifier, r).to_string(), 1.0))
    }))
}

/// Per-vendor rollup with nested payment-type and category sub-breakdowns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorRollup {
    pub person_id: String,
    pub full_name: String,
    pub total_spent: f64,
    pub transaction_count: u64,
    pub last_payment_year: Option<i32>,
    pub payment_type_breakdown: BTreeMap<String, SubTotal>,
    pub category_breakdown: BTreeMap<String, SubTotal>,
    pub record_url: Option<String>,
    pub vendor_url: Option<String>,
    pub lifetime_vending_total: f64,
}

pub fn compute_all_vendors(rows: &[Payment], classifier: &VendorClassifier) -> Vec<VendorRollup> {
    let mut vendor_map: BTreeMap<&str, VendorRollup> = BTreeMap::new();

    for r in rows {
        let Some(id) = r.person_id.as_deref() else { continue };
        let entry = vendor_map.entry(id).or_insert_with(|| VendorRollup {
            person_id: id.to_string(),
            full_name: r.full_name.clone().unwrap_or_else(|| "Unknown".to_string()),
            total_spent: 0.0,
            transaction_count: 0,
            last_payment_year: None,
            payment_type_breakdown: BTreeMap::new(),
            category_breakdown: BTreeMap::new(),
            record_url: r.record_url.clone(),
            vendor_url: r.vendor_url.clone(),
            lifetime_vending_total: r.lifetime_vending_total,
        });
        entry.total_spent += r.amount;
        entry.transaction_count += 1;
        if r.payment_year > entry.last_payment_year {
            entry.last_payment_year = r.payment_year;
        }
        if let Some(t) = &r.payment_type {
            entry
                .payment_type_breakdown
                .entry(t.clone())
                .or_default()
                .add(r.amount);
        }
        entry
            .category_breakdown
            .entry(classify_row(classifier, r).to_string())
            .or_default()
            .add(r.amount);
        // URL snapshots are last-write-wins across the group.
        if r.record_url.is_some() {
            entry.record_url = r.record_url.clone();
        }
        if r.vendor_url.is_some() {
            entry.vendor_url = r.vendor_url.clone();
        }
    }

    let mut vendors: Vec<VendorRollup> = vendor_map.into_values().collect();
    vendors.sort_by(|a, b| b.total_spent.total_cmp(&a.total_spent));
    vendors
}

/// Distinct value sets for the vendor filter controls, from unfiltered
/// rows. Categories exclude Uncategorized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VendorFilterOptions {
    pub years: Vec<i32>,
    pub payment_types: Vec<String>,
    pub categories: Vec<String>,
}

pub fn vendor_filter_options(rows: &[Payment], classifier: &VendorClassifier) -> VendorFilterOptions {
    let years: BTreeSet<i32> = rows.iter().filter_map(|r| r.payment_year).collect();
    let payment_types: BTreeSet<String> =
        rows.iter().filter_map(|r| r.payment_type.clone()).collect();
    let categories: BTreeSet<String> = rows
        .iter()
        .map(|r| classify_row(classifier, r))
        .filter(|c| *c != Category::Uncategorized)
        .map(|c| c.to_string())
        .collect();

    VendorFilterOptions {
        years: years.into_iter().collect(),
        payment_types: payment_types.into_iter().collect(),
        categories: categories.into_iter().collect(),
    }
}

pub fn compute_vendor_insights(
    metrics: &VendorMetrics,
    spending_by_year: &[SpendingYear],
    payment_type_breakdown: &[StatusBreakdown],
    rows: &[Payment],
    classifier: &VendorClassifier,
) -> Vec<Insight> {
    let mut insights = Vec::new();

    if let Some(peak) = metrics.peak_spending_year {
        let peak_total = spending_by_year
            .iter()
            .find(|y| y.year == peak)
            .map(|y| y.total_spending)
            .unwrap_or(0.0);
        insights.push(Insight::new(
            InsightKind::Highlight,
            format!(
                "Peak spending year was {} with {} in total vendor payments.",
                peak,
                format_currency(peak_total)
            ),
        ));
    }

    let vendors = compute_all_vendors(rows, classifier);
    if let Some(top) = vendors.first().filter(|v| v.total_spent > 0.0) {
        let pct = percentage(top.total_spent, metrics.lifetime_spending);
        insights.push(Insight::new(
            InsightKind::Highlight,
            format!(
                "Top vendor: {} with {} ({:.0}% of total spending).",
                top.full_name,
                format_currency(top.total_spent),
                pct
            ),
        ));
    }

    // Spend concentration in the dominant category.
    let mut cat_totals: BTreeMap<String, f64> = BTreeMap::new();
    for r in rows {
        *cat_totals
            .entry(classify_row(classifier, r).to_string())
            .or_insert(0.0) += r.amount;
    }
    if let Some((top_cat, top_amount)) = cat_totals
        .iter()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(c, a)| (c.clone(), *a))
    {
        if top_cat != Category::Uncategorized.as_str() {
            let pct = percentage(top_amount, metrics.lifetime_spending);
            insights.push(Insight::new(
                InsightKind::Info,
                format!(
                    "\"{}\" is the top spending category at {} ({:.0}% of total).",
                    top_cat,
                    format_currency(top_amount),
                    pct
                ),
            ));
        }
    }

    if let Some(top_type) = payment_type_breakdown.first() {
        if top_type.percentage > 90.0 {
            insights.push(Insight::new(
                InsightKind::Info,
                format!(
                    "{:.0}% of transactions are \"{}\", a very concentrated payment type.",
                    top_type.percentage, top_type.status
                ),
            ));
        }
    }

    insights
}

/// Everything the vendor dashboard renders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorDashboard {
    pub metrics: Option<VendorMetrics>,
    pub spending_by_year: SpendingByYear,
    pub payment_type_breakdown: Vec<StatusBreakdown>,
    pub category_by_year: YearMatrix,
    pub transaction_volume: YearMatrix,
    pub category_volume: YearMatrix,
    pub all_vendors: Vec<VendorRollup>,
    pub insights: Vec<Insight>,
    pub filter_options: VendorFilterOptions,
    pub filtered_row_count: usize,
    pub total_row_count: usize,
}

impl VendorDashboard {
    pub fn compute(rows: &[Payment], filter: &VendorFilter, classifier: &VendorClassifier) -> Self {
        Self::compute_at(rows, filter, classifier, current_year())
    }

    pub fn compute_at(
        rows: &[Payment],
        filter: &VendorFilter,
        classifier: &VendorClassifier,
        current_year: i32,
    ) -> Self {
        let filtered = filter.apply(rows, classifier);
        debug!(
            "vendor dashboard: {} rows, {} after filters",
            rows.len(),
            filtered.len()
        );

        let metrics = compute_vendor_metrics_at(&filtered, current_year);
        let spending_by_year = compute_spending_by_year(&filtered);
        let payment_type_breakdown = compute_payment_type_breakdown(&filtered);
        let insights = metrics
            .as_ref()
            .map(|m| {
                compute_vendor_insights(
                    m,
                    &spending_by_year.data,
                    &payment_type_breakdown,
                    &filtered,
                    classifier,
                )
            })
            .unwrap_or_default();

        Self {
            metrics,
            category_by_year: compute_category_by_year(&filtered, classifier),
            transaction_volume: compute_transaction_volume_by_type(&filtered),
            category_volume: compute_transaction_volume_by_category(&filtered, classifier),
            all_vendors: compute_all_vendors(&filtered, classifier),
            insights,
            filter_options: vendor_filter_options(rows, classifier),
            filtered_row_count: filtered.len(),
            total_row_count: rows.len(),
            spending_by_year,
            payment_type_breakdown,
        }
    }
}
