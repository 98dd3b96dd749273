use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One gift transaction from the donor-history extract.
///
/// Numeric fields arrive already coerced by the loader (0.0 for blanks);
/// the engine never re-parses them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Donation {
    #[schemars(description = "Stable person identifier. Rows without one are excluded from identity-keyed rollups and unique-donor counts.")]
    pub person_id: Option<String>,

    #[schemars(description = "Donor display name as extracted")]
    pub full_name: Option<String>,

    #[schemars(description = "Calendar year the gift was recorded in. Rows without one are excluded from year-keyed structures only.")]
    pub gift_year: Option<i32>,

    #[schemars(description = "Gift amount in dollars, non-negative")]
    pub gift_amount: f64,

    #[schemars(description = "Free-text gift category, e.g. 'Membership' or 'General Donation'")]
    pub gift_type: Option<String>,

    #[schemars(description = "Membership status snapshot as of extraction (Current/Former/Never/Lifetime/Deceased/...)")]
    pub membership_status: Option<String>,

    #[schemars(description = "Denormalized lifetime giving total as of extraction")]
    #[serde(default)]
    pub lifetime_gift_amount: f64,
}

/// One vendor disbursement from the vendor-history extract.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Payment {
    pub person_id: Option<String>,

    #[schemars(description = "Vendor name; also drives name-based categorization")]
    pub full_name: Option<String>,

    pub payment_year: Option<i32>,

    #[schemars(description = "Payment amount in dollars")]
    pub amount: f64,

    #[schemars(description = "Payment instrument/type, e.g. 'Check' or 'ACH'")]
    pub payment_type: Option<String>,

    #[schemars(description = "Ledger split note; primary key into the category lookup table")]
    pub split_note: Option<String>,

    #[schemars(description = "Free-text memo; drives keyword categorization for split and AP rows")]
    pub memo: Option<String>,

    #[serde(default)]
    pub record_url: Option<String>,

    #[serde(default)]
    pub vendor_url: Option<String>,

    #[serde(default)]
    pub lifetime_vending_total: f64,
}

/// One funded conservation practice instance from the cost-share extract.
///
/// Carries environmental reductions in both raw and combined (synergistic)
/// variants. Both are opaque inputs; neither is ever derived from the other.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CostShareActivity {
    pub person_id: Option<String>,
    pub full_name: Option<String>,

    #[schemars(description = "Farm the practice was installed on")]
    pub farm_name: Option<String>,

    #[schemars(description = "Best Management Practice name, e.g. 'Cover Crop'")]
    pub bmp: Option<String>,

    #[schemars(description = "Acres the practice covers")]
    pub practice_acres: f64,

    pub project_year: Option<i32>,

    #[schemars(description = "Budget/geographic segment the project belongs to")]
    pub project_segment: Option<String>,

    #[schemars(description = "Receiving stream or watershed")]
    pub stream: Option<String>,

    #[schemars(description = "Contract identifier; contract counts dedup on this")]
    pub contract_id: Option<String>,

    #[schemars(description = "Funding from 319 grant dollars")]
    pub odata319_amount: f64,

    #[schemars(description = "Funding from other sources")]
    pub other_amount: f64,

    #[schemars(description = "Funding from local match dollars")]
    pub local_amount: f64,

    #[schemars(description = "Total funding for the row; conceptually the sum of the three sources")]
    pub total_amount: f64,

    #[schemars(description = "Raw nitrogen reduction, lbs")]
    pub n_reductions: f64,
    #[schemars(description = "Raw phosphorus reduction, lbs")]
    pub p_reductions: f64,
    #[schemars(description = "Raw sediment reduction, tons")]
    pub s_reductions: f64,

    #[schemars(description = "Combined/synergistic nitrogen reduction, lbs; the headline figure")]
    pub n_combined: f64,
    #[schemars(description = "Combined/synergistic phosphorus reduction, lbs")]
    pub p_combined: f64,
    #[schemars(description = "Combined/synergistic sediment reduction, tons")]
    pub s_combined: f64,

    pub lat: Option<f64>,
    pub longitude: Option<f64>,

    #[serde(default)]
    pub record_url: Option<String>,

    #[serde(default)]
    pub cost_share_url: Option<String>,

    #[serde(default)]
    pub lifetime_costshare_total: f64,
}

/// One individual or organization from the master database extract.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Person {
    pub person_id: Option<String>,
    pub full_name: Option<String>,

    #[schemars(description = "Comma-separated free-text roles, matched case-insensitively against the primary role vocabulary. A person can hold several roles at once.")]
    pub relationship: Option<String>,

    pub membership_status: Option<String>,

    #[serde(default)]
    pub newsletter_status: Option<String>,

    #[schemars(description = "Two-letter state code")]
    pub state: Option<String>,

    #[serde(default)]
    pub lifetime_gift_amount: f64,

    #[serde(default)]
    pub lifetime_vending_total: f64,

    #[serde(default)]
    pub lifetime_costshare_total: f64,

    pub lat: Option<f64>,
    pub longitude: Option<f64>,
}

/// One budget line from the funding-ledger CSV.
///
/// Independent of the cost-share history rows; never joined by key, only
/// compared at the aggregate level.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct FundingLedgerEntry {
    pub bmp: Option<String>,

    #[schemars(description = "Practice grouping used for budget reporting")]
    pub bmp_type: Option<String>,

    pub fund_name: Option<String>,

    pub amount_allocated: f64,
    pub amount_used: f64,
    pub amount_available: f64,

    #[schemars(description = "Budget segment number as text")]
    pub segment: Option<String>,
}

/// The full immutable snapshot the loader hands to the engine at session
/// start. All aggregation is a pure function of (a subset of) these arrays.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Dataset {
    #[serde(default)]
    pub donor_history: Vec<Donation>,

    #[serde(default)]
    pub vendor_history: Vec<Payment>,

    #[serde(default)]
    pub cost_share_history: Vec<CostShareActivity>,

    #[serde(default)]
    pub master_database: Vec<Person>,

    #[serde(default)]
    pub cost_share_funding: Vec<FundingLedgerEntry>,
}

impl Dataset {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(Dataset)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
