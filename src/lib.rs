//! # Conservation Analytics
//!
//! A pure aggregation engine for a conservation organization's financial
//! dashboards. It turns flat history extracts (donor gifts, vendor
//! payments, cost-share practices, the master contact database, and the
//! funding ledger) into the metrics, chart series, rollups, and insight
//! text the dashboards render.
//!
//! ## Core Concepts
//!
//! - **Dataset**: the immutable snapshot loaded once per session; every
//!   aggregate is a pure function of (a subset of) its arrays
//! - **Filters**: per-dashboard predicate state; applying one never
//!   mutates the underlying rows
//! - **Two-tier filtering**: some time-axis charts deliberately ignore
//!   the categorical filters so the timeline keeps its shape while the
//!   rest of the dashboard narrows
//! - **Classifier**: vendor payments carry no category of their own;
//!   [`VendorClassifier`] derives one from the split note, memo, and
//!   vendor name
//! - **Insights**: threshold-driven narrative sentences, ordered and
//!   typed for the dashboard's callout strip
//!
//! ## Example
//!
//! ```rust,ignore
//! use conservation_analytics::*;
//!
//! let dataset = load_dataset("data/snapshot.json")?;
//! let filter = DonorFilter {
//!     year_start: Some(2019),
//!     year_end: Some(2023),
//!     ..Default::default()
//! };
//! filter.validate()?;
//!
//! let dashboard = DonorDashboard::compute(&dataset.donor_history, &filter);
//! if let Some(metrics) = &dashboard.metrics {
//!     println!("lifetime giving: {}", format_currency(metrics.lifetime_giving));
//! }
//! ```

pub mod classify;
pub mod costshare;
pub mod donor;
pub mod error;
pub mod filter;
pub mod funding;
pub mod ingestion;
pub mod insight;
pub mod master;
pub mod schema;
pub mod utils;
pub mod vendor;

pub use classify::{Category, VendorClassifier};
pub use costshare::CostShareDashboard;
pub use donor::DonorDashboard;
pub use error::{AnalyticsError, Result};
pub use filter::{CostShareFilter, DonorFilter, MasterFilter, VendorFilter};
pub use ingestion::*;
pub use insight::{Insight, InsightKind};
pub use master::MasterDashboard;
pub use schema::*;
pub use utils::{format_count, format_currency, format_number};
pub use vendor::VendorDashboard;

use serde::{Deserialize, Serialize};

/// Filter state for all four dashboards at once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSet {
    #[serde(default)]
    pub donor: DonorFilter,
    #[serde(default)]
    pub vendor: VendorFilter,
    #[serde(default)]
    pub cost_share: CostShareFilter,
    #[serde(default)]
    pub master: MasterFilter,
}

impl FilterSet {
    pub fn validate(&self) -> Result<()> {
        self.donor.validate()?;
        self.vendor.validate()?;
        self.cost_share.validate()?;
        Ok(())
    }
}

/// All four dashboards computed from one snapshot, for callers that
/// render the whole application in one pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardBundle {
    pub donor: DonorDashboard,
    pub vendor: VendorDashboard,
    pub cost_share: CostShareDashboard,
    pub master: MasterDashboard,
}

impl DashboardBundle {
    pub fn compute(dataset: &Dataset, filters: &FilterSet) -> Result<Self> {
        filters.validate()?;
        let classifier = VendorClassifier::new();
        Ok(Self {
            donor: DonorDashboard::compute(&dataset.donor_history, &filters.donor),
            vendor: VendorDashboard::compute(&dataset.vendor_history, &filters.vendor, &classifier),
            cost_share: CostShareDashboard::compute(
                &dataset.cost_share_history,
                &dataset.cost_share_funding,
                &filters.cost_share,
            ),
            master: MasterDashboard::compute(&dataset.master_database, &filters.master),
        })
    }
}
