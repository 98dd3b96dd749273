use crate::classify::VendorClassifier;
use crate::error::{AnalyticsError, Result};
use crate::master::matches_role;
use crate::schema::{CostShareActivity, Donation, Payment, Person};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Row passes the year window iff its year is inside the inclusive bounds.
/// With any bound active, a row with no year is excluded; with no bounds,
/// everything passes.
fn within_year_bounds(year: Option<i32>, start: Option<i32>, end: Option<i32>) -> bool {
    if start.is_none() && end.is_none() {
        return true;
    }
    match year {
        None => false,
        Some(y) => start.is_none_or(|s| y >= s) && end.is_none_or(|e| y <= e),
    }
}

/// Empty allowed-list means no restriction; otherwise the row value must be
/// present and one of the allowed values.
fn multi_select(value: Option<&str>, allowed: &[String]) -> bool {
    allowed.is_empty() || value.is_some_and(|v| allowed.iter().any(|a| a == v))
}

fn check_year_order(start: Option<i32>, end: Option<i32>) -> Result<()> {
    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            return Err(AnalyticsError::InvalidFilter(format!(
                "year_start {} is after year_end {}",
                s, e
            )));
        }
    }
    Ok(())
}

/// Filter state for the donor dashboard. All fields optional; filtering is
/// AND across fields, OR within a list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DonorFilter {
    pub year_start: Option<i32>,
    pub year_end: Option<i32>,
    #[serde(default)]
    pub gift_types: Vec<String>,
    #[serde(default)]
    pub membership_statuses: Vec<String>,
}

impl DonorFilter {
    pub fn validate(&self) -> Result<()> {
        check_year_order(self.year_start, self.year_end)
    }

    pub fn is_empty(&self) -> bool {
        self.year_start.is_none()
            && self.year_end.is_none()
            && self.gift_types.is_empty()
            && self.membership_statuses.is_empty()
    }

    fn passes_year(&self, row: &Donation) -> bool {
        within_year_bounds(row.gift_year, self.year_start, self.year_end)
    }

    pub fn passes(&self, row: &Donation) -> bool {
        self.passes_year(row)
            && multi_select(row.gift_type.as_deref(), &self.gift_types)
            && multi_select(row.membership_status.as_deref(), &self.membership_statuses)
    }

    /// Year-only tier: year bounds applied, categorical filters ignored.
    /// Feeds membership counts that must stay insensitive to type/status
    /// selections.
    pub fn year_filtered<'a>(&self, rows: &'a [Donation]) -> Cow<'a, [Donation]> {
        if self.year_start.is_none() && self.year_end.is_none() {
            return Cow::Borrowed(rows);
        }
        Cow::Owned(rows.iter().filter(|r| self.passes_year(r)).cloned().collect())
    }

    /// Fully-filtered tier. An all-empty filter returns the input borrowed,
    /// so callers can memoize on slice identity.
    pub fn apply<'a>(&self, rows: &'a [Donation]) -> Cow<'a, [Donation]> {
        if self.is_empty() {
            return Cow::Borrowed(rows);
        }
        Cow::Owned(rows.iter().filter(|r| self.passes(r)).cloned().collect())
    }
}

/// Filter state for the vendor dashboard. Category selection matches on the
/// classifier's output label for each row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VendorFilter {
    pub year_start: Option<i32>,
    pub year_end: Option<i32>,
    #[serde(default)]
    pub payment_types: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

impl VendorFilter {
    pub fn validate(&self) -> Result<()> {
        check_year_order(self.year_start, self.year_end)
    }

    pub fn is_empty(&self) -> bool {
        self.year_start.is_none()
            && self.year_end.is_none()
            && self.payment_types.is_empty()
            && self.categories.is_empty()
    }

    pub fn passes(&self, row: &Payment, classifier: &VendorClassifier) -> bool {
        if !within_year_bounds(row.payment_year, self.year_start, self.year_end) {
            return false;
        }
        if !multi_select(row.payment_type.as_deref(), &self.payment_types) {
            return false;
        }
        if self.categories.is_empty() {
            return true;
        }
        let cat = classifier.classify(
            row.split_note.as_deref(),
            row.memo.as_deref(),
            row.full_name.as_deref(),
        );
        self.categories.iter().any(|c| c == cat.as_str())
    }

    pub fn apply<'a>(
        &self,
        rows: &'a [Payment],
        classifier: &VendorClassifier,
    ) -> Cow<'a, [Payment]> {
        if self.is_empty() {
            return Cow::Borrowed(rows);
        }
        Cow::Owned(
            rows.iter()
                .filter(|r| self.passes(r, classifier))
                .cloned()
                .collect(),
        )
    }
}

/// Filter state for the cost-share dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostShareFilter {
    pub year_start: Option<i32>,
    pub year_end: Option<i32>,
    #[serde(default)]
    pub bmps: Vec<String>,
    #[serde(default)]
    pub segments: Vec<String>,
    #[serde(default)]
    pub streams: Vec<String>,
}

impl CostShareFilter {
    pub fn validate(&self) -> Result<()> {
        check_year_order(self.year_start, self.year_end)
    }

    pub fn is_empty(&self) -> bool {
        self.year_start.is_none()
            && self.year_end.is_none()
            && self.bmps.is_empty()
            && self.segments.is_empty()
            && self.streams.is_empty()
    }

    fn passes_year(&self, row: &CostShareActivity) -> bool {
        within_year_bounds(row.project_year, self.year_start, self.year_end)
    }

    pub fn passes(&self, row: &CostShareActivity) -> bool {
        self.passes_year(row)
            && multi_select(row.bmp.as_deref(), &self.bmps)
            && multi_select(row.project_segment.as_deref(), &self.segments)
            && multi_select(row.stream.as_deref(), &self.streams)
    }

    /// Year-only tier, feeding contract counts over time.
    pub fn year_filtered<'a>(&self, rows: &'a [CostShareActivity]) -> Cow<'a, [CostShareActivity]> {
        if self.year_start.is_none() && self.year_end.is_none() {
            return Cow::Borrowed(rows);
        }
        Cow::Owned(rows.iter().filter(|r| self.passes_year(r)).cloned().collect())
    }

    pub fn apply<'a>(&self, rows: &'a [CostShareActivity]) -> Cow<'a, [CostShareActivity]> {
        if self.is_empty() {
            return Cow::Borrowed(rows);
        }
        Cow::Owned(rows.iter().filter(|r| self.passes(r)).cloned().collect())
    }
}

/// Filter state for the master-database dashboard. Role selection is a
/// case-insensitive substring match against the free-text relationship.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MasterFilter {
    #[serde(default)]
    pub relationships: Vec<String>,
    #[serde(default)]
    pub membership_statuses: Vec<String>,
    #[serde(default)]
    pub states: Vec<String>,
    #[serde(default)]
    pub newsletter_statuses: Vec<String>,
}

impl MasterFilter {
    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
            && self.membership_statuses.is_empty()
            && self.states.is_empty()
            && self.newsletter_statuses.is_empty()
    }

    pub fn passes(&self, row: &Person) -> bool {
        if !self.relationships.is_empty()
            && !self
                .relationships
                .iter()
                .any(|role| matches_role(row.relationship.as_deref(), role))
        {
            return false;
        }
        multi_select(row.membership_status.as_deref(), &self.membership_statuses)
            && multi_select(row.state.as_deref(), &self.states)
            && multi_select(row.newsletter_status.as_deref(), &self.newsletter_statuses)
    }

    pub fn apply<'a>(&self, rows: &'a [Person]) -> Cow<'a, [Person]> {
        if self.is_empty() {
            return Cow::Borrowed(rows);
        }
        Cow::Owned(rows.iter().filter(|r| self.passes(r)).cloned().collect())
    }
}
