use serde::{Deserialize, Serialize};

use chrono::Datelike;
use std::collections::BTreeMap;

/// Per-year total/count accumulator shared by every domain's summary
/// metrics. Years are kept in ascending order, which is what gives the
/// peak-year tie-break and YoY window their defined behavior.
#[derive(Debug, Clone, Default)]
pub struct YearTotals {
    totals: BTreeMap<i32, (f64, u64)>,
}

impl YearTotals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows with no year are skipped here but still count toward un-keyed
    /// totals, which the caller accumulates separately.
    pub fn add(&mut self, year: Option<i32>, amount: f64) {
        if let Some(y) = year {
            let entry = self.totals.entry(y).or_insert((0.0, 0));
            entry.0 += amount;
            entry.1 += 1;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    pub fn years(&self) -> Vec<i32> {
        self.totals.keys().copied().collect()
    }

    pub fn total_for(&self, year: i32) -> f64 {
        self.totals.get(&year).map(|(t, _)| *t).unwrap_or(0.0)
    }

    /// Year with the largest total. Ties resolve to the first year in
    /// ascending order (strictly-greater comparison while scanning upward).
    pub fn peak_year(&self) -> Option<i32> {
        let mut best: Option<(i32, f64)> = None;
        for (&year, &(total, _)) in &self.totals {
            match best {
                Some((_, best_total)) if total <= best_total => {}
                _ => best = Some((year, total)),
            }
        }
        best.map(|(y, _)| y)
    }

    /// The two most recent years strictly before `current_year`, oldest
    /// first. None unless two such years exist.
    pub fn complete_year_pair(&self, current_year: i32) -> Option<(i32, i32)> {
        let complete: Vec<i32> = self
            .totals
            .keys()
            .copied()
            .filter(|&y| y < current_year)
            .collect();
        if complete.len() < 2 {
            return None;
        }
        Some((complete[complete.len() - 2], complete[complete.len() - 1]))
    }

    /// Percentage change between the two most recent complete years.
    /// None when fewer than two qualify or the earlier total is zero.
    pub fn yoy_growth(&self, current_year: i32) -> Option<f64> {
        let (prev, last) = self.complete_year_pair(current_year)?;
        let prev_total = self.total_for(prev);
        if prev_total <= 0.0 {
            return None;
        }
        Some((self.total_for(last) - prev_total) / prev_total * 100.0)
    }

    /// Label like "2021→2022" for the YoY window, when one exists.
    pub fn yoy_span_label(&self, current_year: i32) -> Option<String> {
        self.complete_year_pair(current_year)
            .map(|(prev, last)| format!("{}\u{2192}{}", prev, last))
    }

    /// Label like "2019 – 2023", or empty when no year-keyed rows exist.
    pub fn year_range_label(&self) -> String {
        match (
            self.totals.keys().next(),
            self.totals.keys().next_back(),
        ) {
            (Some(first), Some(last)) => format!("{} \u{2013} {}", first, last),
            _ => String::new(),
        }
    }
}

/// One slice of a categorical breakdown: distinct value, occurrence count,
/// and share of the filtered total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusBreakdown {
    pub status: String,
    pub count: u64,
    pub percentage: f64,
}

/// Builds a breakdown from per-value counts: percentage of the summed
/// total, sorted descending by count (ties stay in label order).
pub fn breakdown_from_counts(counts: BTreeMap<String, u64>) -> Vec<StatusBreakdown> {
    let total: u64 = counts.values().sum();
    let mut slices: Vec<StatusBreakdown> = counts
        .into_iter()
        .map(|(status, count)| StatusBreakdown {
            status,
            count,
            percentage: percentage(count as f64, total as f64),
        })
        .collect();
    slices.sort_by(|a, b| b.count.cmp(&a.count));
    slices
}

/// Amount/count pair accumulated per subcategory inside an entity rollup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SubTotal {
    pub amount: f64,
    pub count: u64,
}

impl SubTotal {
    pub fn add(&mut self, amount: f64) {
        self.amount += amount;
        self.count += 1;
    }
}

/// One row of a year-by-category matrix. Columns are the sorted-unique
/// categories observed under the current filter, zero-filled per year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearMatrixRow {
    pub year: i32,
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
}

/// Grouped-by-year series with dynamic category columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YearMatrix {
    pub data: Vec<YearMatrixRow>,
    pub categories: Vec<String>,
}

impl YearMatrix {
    /// Folds (year, category, value) triples into the matrix shape: years
    /// ascending, every observed category present in every row (0 when
    /// absent from that year).
    pub fn from_triples<I>(triples: I) -> Self
    where
        I: IntoIterator<Item = (i32, String, f64)>,
    {
        let mut year_map: BTreeMap<i32, BTreeMap<String, f64>> = BTreeMap::new();
        let mut all: std::collections::BTreeSet<String> = Default::default();

        for (year, category, value) in triples {
            all.insert(category.clone());
            *year_map.entry(year).or_default().entry(category).or_insert(0.0) += value;
        }

        let categories: Vec<String> = all.iter().cloned().collect();
        let data = year_map
            .into_iter()
            .map(|(year, observed)| {
                let values = categories
                    .iter()
                    .map(|c| (c.clone(), observed.get(c).copied().unwrap_or(0.0)))
                    .collect();
                YearMatrixRow { year, values }
            })
            .collect();

        Self { data, categories }
    }
}

/// part/whole as a percentage; 0.0 on a zero or negative denominator,
/// never NaN.
pub fn percentage(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

pub fn current_year() -> i32 {
    chrono::Utc::now().date_naive().year()
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Rounded whole-dollar currency for insight text, e.g. `$12,345`.
pub fn format_currency(value: f64) -> String {
    let rounded = value.round();
    if rounded < 0.0 {
        format!("-${}", group_thousands(rounded.abs() as u64))
    } else {
        format!("${}", group_thousands(rounded as u64))
    }
}

/// Rounded grouped number for insight text, e.g. `12,345`.
pub fn format_number(value: f64) -> String {
    let rounded = value.round();
    if rounded < 0.0 {
        format!("-{}", group_thousands(rounded.abs() as u64))
    } else {
        group_thousands(rounded as u64)
    }
}

pub fn format_count(value: u64) -> String {
    group_thousands(value)
}
