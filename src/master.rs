use crate::filter::MasterFilter;
use crate::insight::{Insight, InsightKind};
use crate::schema::Person;
use crate::utils::{breakdown_from_counts, format_currency, percentage, StatusBreakdown};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Primary roles recognized inside the free-text, comma-separated
/// relationship field. Matching is case-insensitive substring, so a
/// person can hold several roles at once.
pub const PRIMARY_ROLES: [&str; 11] = [
    "Donor",
    "Vendor",
    "Cost-share Recipient",
    "Organization Contact",
    "Newsletter Email Only",
    "Staff",
    "Board Member",
    "Board Advisor",
    "Organization or Business",
    "Segment 1 Contact",
    "Segment 2 Contact",
];

fn parse_roles(relationship: Option<&str>) -> Vec<&str> {
    relationship
        .map(|rel| {
            rel.split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Case-insensitive substring match of a role against the whole
/// relationship field.
pub fn matches_role(relationship: Option<&str>, role: &str) -> bool {
    relationship
        .map(|rel| rel.to_lowercase().contains(&role.to_lowercase()))
        .unwrap_or(false)
}

/// Headline counts and lifetime-dollar totals over the master database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterMetrics {
    pub total_people: usize,
    pub total_donors: usize,
    pub total_vendors: usize,
    pub total_cost_share: usize,
    pub active_members: usize,
    pub total_lifetime_giving: f64,
    pub total_lifetime_vending: f64,
    pub total_lifetime_costshare: f64,
}

pub fn compute_master_metrics(rows: &[Person]) -> Option<MasterMetrics> {
    if rows.is_empty() {
        return None;
    }

    let count_role = |role: &str| {
        rows.iter()
            .filter(|r| matches_role(r.relationship.as_deref(), role))
            .count()
    };

    Some(MasterMetrics {
        total_people: rows.len(),
        total_donors: count_role("Donor"),
        total_vendors: count_role("Vendor"),
        total_cost_share: count_role("Cost-share"),
        active_members: rows
            .iter()
            .filter(|r| r.membership_status.as_deref() == Some("Current"))
            .count(),
        total_lifetime_giving: rows.iter().map(|r| r.lifetime_gift_amount).sum(),
        total_lifetime_vending: rows.iter().map(|r| r.lifetime_vending_total).sum(),
        total_lifetime_costshare: rows.iter().map(|r| r.lifetime_costshare_total).sum(),
    })
}

/// Breakdown over primary roles. Each person counts once per distinct
/// primary role they hold, so counts can exceed the number of people;
/// percentages stay relative to total people. People with no
/// relationship text land in "Unknown", with unrecognized text in
/// "Other".
pub fn compute_relationship_breakdown(rows: &[Person]) -> Vec<StatusBreakdown> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();

    for r in rows {
        let roles = parse_roles(r.relationship.as_deref());
        if roles.is_empty() {
            *counts.entry("Unknown".to_string()).or_insert(0) += 1;
            continue;
        }
        let mut matched: BTreeSet<&str> = BTreeSet::new();
        for role in roles {
            let lowered = role.to_lowercase();
            if let Some(primary) = PRIMARY_ROLES
                .iter()
                .find(|pr| lowered.contains(&pr.to_lowercase()))
            {
                matched.insert(primary);
            }
        }
        if matched.is_empty() {
            *counts.entry("Other".to_string()).or_insert(0) += 1;
        } else {
            for primary in matched {
                *counts.entry(primary.to_string()).or_insert(0) += 1;
            }
        }
    }

    let total_people = rows.len() as f64;
    let mut slices: Vec<StatusBreakdown> = counts
        .into_iter()
        .map(|(status, count)| StatusBreakdown {
            status,
            count,
            percentage: percentage(count as f64, total_people),
        })
        .collect();
    slices.sort_by(|a, b| b.count.cmp(&a.count));
    slices
}

pub fn compute_membership_breakdown(rows: &[Person]) -> Vec<StatusBreakdown> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for r in rows {
        let status = r.membership_status.as_deref().unwrap_or("Unknown");
        *counts.entry(status.to_string()).or_insert(0) += 1;
    }
    breakdown_from_counts(counts)
}

/// One state's share of the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSlice {
    pub name: String,
    pub value: u64,
}

/// Top ten states by record count, with everything past the cut folded
/// into a trailing "Other" slice.
pub fn compute_state_distribution(rows: &[Person]) -> Vec<StateSlice> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for r in rows {
        let state = r.state.as_deref().unwrap_or("Unknown");
        *counts.entry(state.to_string()).or_insert(0) += 1;
    }

    let mut sorted: Vec<(String, u64)> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1));

    let other_count: u64 = sorted.iter().skip(10).map(|(_, v)| v).sum();
    let mut result: Vec<StateSlice> = sorted
        .into_iter()
        .take(10)
        .map(|(name, value)| StateSlice { name, value })
        .collect();
    if other_count > 0 {
        result.push(StateSlice {
            name: "Other".to_string(),
            value: other_count,
        });
    }
    result
}

/// One row of the role-by-membership-status matrix. Status columns are
/// always present, zero-filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementRow {
    pub role: String,
    #[serde(flatten)]
    pub counts: BTreeMap<String, u64>,
}

const ENGAGEMENT_ROLES: [&str; 3] = ["Donor", "Vendor", "Cost-share Recipient"];
const ENGAGEMENT_STATUSES: [&str; 6] =
    ["Current", "Former", "Never", "Lifetime", "Unknown", "Deceased"];

pub fn compute_engagement_matrix(rows: &[Person]) -> Vec<EngagementRow> {
    ENGAGEMENT_ROLES
        .iter()
        .map(|role| {
            let mut counts: BTreeMap<String, u64> = ENGAGEMENT_STATUSES
                .iter()
                .map(|s| (s.to_string(), 0))
                .collect();
            for r in rows {
                if !matches_role(r.relationship.as_deref(), role) {
                    continue;
                }
                let status = r.membership_status.as_deref().unwrap_or("Unknown");
                if let Some(slot) = counts.get_mut(status) {
                    *slot += 1;
                }
            }
            EngagementRow {
                role: role.to_string(),
                counts,
            }
        })
        .collect()
}

/// Lifetime giving/vending/cost-share totals attributed to a role.
/// People holding several roles contribute to each row they match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleFinancialSummary {
    pub role: String,
    pub giving: f64,
    pub vending: f64,
    pub costshare: f64,
}

pub fn compute_financial_summary_by_role(rows: &[Person]) -> Vec<RoleFinancialSummary> {
    let roles = [
        "Donor",
        "Vendor",
        "Cost-share Recipient",
        "Organization Contact",
        "Staff/Board",
    ];

    roles
        .iter()
        .map(|role| {
            let matches = |r: &&Person| {
                if *role == "Staff/Board" {
                    matches_role(r.relationship.as_deref(), "Staff")
                        || matches_role(r.relationship.as_deref(), "Board")
                } else {
                    matches_role(r.relationship.as_deref(), role)
                }
            };
            let role_rows: Vec<&Person> = rows.iter().filter(matches).collect();
            RoleFinancialSummary {
                role: role.to_string(),
                giving: role_rows.iter().map(|r| r.lifetime_gift_amount).sum(),
                vending: role_rows.iter().map(|r| r.lifetime_vending_total).sum(),
                costshare: role_rows.iter().map(|r| r.lifetime_costshare_total).sum(),
            }
        })
        .collect()
}

pub fn compute_master_insights(metrics: &MasterMetrics, rows: &[Person]) -> Vec<Insight> {
    let mut insights = Vec::new();
    let total_people = metrics.total_people as f64;

    if metrics.total_people > 0 {
        let pct = percentage(metrics.active_members as f64, total_people);
        insights.push(Insight::new(
            InsightKind::Info,
            format!(
                "{} active members ({:.1}% of database).",
                metrics.active_members, pct
            ),
        ));
    }

    let former_count = rows
        .iter()
        .filter(|r| r.membership_status.as_deref() == Some("Former"))
        .count();
    if former_count > 0 {
        let pct = percentage(former_count as f64, total_people);
        insights.push(Insight::new(
            InsightKind::Opportunity,
            format!(
                "{} former members ({:.1}%) represent a re-engagement opportunity.",
                former_count, pct
            ),
        ));
    }

    let top_by_giving = rows
        .iter()
        .max_by(|a, b| a.lifetime_gift_amount.total_cmp(&b.lifetime_gift_amount));
    if let Some(top) = top_by_giving {
        if top.lifetime_gift_amount > 0.0 {
            insights.push(Insight::new(
                InsightKind::Highlight,
                format!(
                    "Top contributor: {} with {} lifetime giving.",
                    top.full_name.as_deref().unwrap_or("Unknown"),
                    format_currency(top.lifetime_gift_amount)
                ),
            ));
        }
    }

    let sd_count = rows
        .iter()
        .filter(|r| r.state.as_deref() == Some("SD"))
        .count();
    if sd_count > 0 {
        let pct = percentage(sd_count as f64, total_people);
        insights.push(Insight::new(
            InsightKind::Info,
            format!("{:.1}% of records are based in South Dakota.", pct),
        ));
    }

    insights
}

/// Distinct value sets for the master filter controls, from unfiltered
/// rows. Relationships collapse to the recognized primary roles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MasterFilterOptions {
    pub relationships: Vec<String>,
    pub membership_statuses: Vec<String>,
    pub states: Vec<String>,
    pub newsletter_statuses: Vec<String>,
}

pub fn master_filter_options(rows: &[Person]) -> MasterFilterOptions {
    let mut relationships: BTreeSet<&str> = BTreeSet::new();
    for r in rows {
        for role in parse_roles(r.relationship.as_deref()) {
            let lowered = role.to_lowercase();
            if let Some(primary) = PRIMARY_ROLES
                .iter()
                .find(|pr| lowered.contains(&pr.to_lowercase()))
            {
                relationships.insert(primary);
            }
        }
    }

    let membership_statuses: BTreeSet<String> = rows
        .iter()
        .filter_map(|r| r.membership_status.clone())
        .collect();
    let states: BTreeSet<String> = rows.iter().filter_map(|r| r.state.clone()).collect();
    let newsletter_statuses: BTreeSet<String> = rows
        .iter()
        .filter_map(|r| r.newsletter_status.clone())
        .collect();

    MasterFilterOptions {
        relationships: relationships.into_iter().map(str::to_string).collect(),
        membership_statuses: membership_statuses.into_iter().collect(),
        states: states.into_iter().collect(),
        newsletter_statuses: newsletter_statuses.into_iter().collect(),
    }
}

/// Everything the master-database dashboard renders for one filter state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterDashboard {
    pub metrics: Option<MasterMetrics>,
    pub relationship_breakdown: Vec<StatusBreakdown>,
    pub membership_breakdown: Vec<StatusBreakdown>,
    pub state_distribution: Vec<StateSlice>,
    pub engagement_matrix: Vec<EngagementRow>,
    pub financial_summary: Vec<RoleFinancialSummary>,
    pub insights: Vec<Insight>,
    pub filter_options: MasterFilterOptions,
    pub filtered_row_count: usize,
    pub total_row_count: usize,
}

impl MasterDashboard {
    pub fn compute(rows: &[Person], filter: &MasterFilter) -> Self {
        let filtered = filter.apply(rows);
        debug!(
            "master dashboard: {} rows, {} after filters",
            rows.len(),
            filtered.len()
        );

        let metrics = compute_master_metrics(&filtered);
        let insights = metrics
            .as_ref()
            .map(|m| compute_master_insights(m, &filtered))
            .unwrap_or_default();

        Self {
            metrics,
            relationship_breakdown: compute_relationship_breakdown(&filtered),
            membership_breakdown: compute_membership_breakdown(&filtered),
            state_distribution: compute_state_distribution(&filtered),
            engagement_matrix: compute_engagement_matrix(&filtered),
            financial_summary: compute_financial_summary_by_role(&filtered),
            insights,
            filter_options: master_filter_options(rows),
            filtered_row_count: filtered.len(),
            total_row_count: rows.len(),
        }
    }
}
