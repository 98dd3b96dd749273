use anyhow::Result;
use conservation_analytics::*;

fn donation(
    id: &str,
    name: &str,
    year: i32,
    amount: f64,
    gift_type: &str,
    status: &str,
) -> Donation {
    Donation {
        person_id: Some(id.to_string()),
        full_name: Some(name.to_string()),
        gift_year: Some(year),
        gift_amount: amount,
        gift_type: Some(gift_type.to_string()),
        membership_status: Some(status.to_string()),
        ..Default::default()
    }
}

fn payment(id: &str, name: &str, year: i32, amount: f64, payment_type: &str) -> Payment {
    Payment {
        person_id: Some(id.to_string()),
        full_name: Some(name.to_string()),
        payment_year: Some(year),
        amount,
        payment_type: Some(payment_type.to_string()),
        ..Default::default()
    }
}

fn practice(
    id: &str,
    farm: &str,
    year: i32,
    bmp: &str,
    contract: &str,
    amount_319: f64,
    local: f64,
    acres: f64,
) -> CostShareActivity {
    CostShareActivity {
        person_id: Some(id.to_string()),
        full_name: Some(format!("Producer {}", id)),
        farm_name: Some(farm.to_string()),
        bmp: Some(bmp.to_string()),
        contract_id: Some(contract.to_string()),
        project_year: Some(year),
        odata319_amount: amount_319,
        local_amount: local,
        total_amount: amount_319 + local,
        practice_acres: acres,
        ..Default::default()
    }
}

fn watershed_dataset() -> Dataset {
    Dataset {
        donor_history: vec![
            donation("D-1", "Jane Doe", 2021, 100.0, "Membership", "Current"),
            donation("D-1", "Jane Doe", 2022, 150.0, "Membership", "Current"),
            donation("D-2", "John Smith", 2021, 2_000.0, "General Donation", "Former"),
            donation("D-2", "John Smith", 2022, 2_500.0, "General Donation", "Former"),
            donation("D-3", "Austin and Baylee Carlson", 2022, 50.0, "Membership", "Current"),
        ],
        vendor_history: vec![
            {
                let mut p = payment("V-1", "Prairie Printing", 2021, 800.0, "Check");
                p.split_note = Some("Printed".to_string());
                p
            },
            {
                let mut p = payment("V-2", "KELO-TV", 2022, 1_500.0, "ACH");
                p.split_note = Some("Accounts Payable".to_string());
                p.memo = Some("spring underwriting spots".to_string());
                p
            },
            {
                let mut p = payment("V-3", "Sarah Johnson", 2022, 650.0, "Check");
                p.split_note = Some("Accounts Payable".to_string());
                p
            },
        ],
        cost_share_history: vec![
            practice("F-1", "Carlson Farm", 2021, "Cover Crop", "C-100", 6_000.0, 2_000.0, 160.0),
            practice("F-1", "Carlson Farm", 2022, "Cover Crop", "C-101", 3_000.0, 1_000.0, 80.0),
            practice("F-2", "River Bend Ranch", 2022, "Riparian Buffer", "C-102", 9_000.0, 3_000.0, 40.0),
        ],
        master_database: vec![
            Person {
                person_id: Some("D-1".to_string()),
                full_name: Some("Jane Doe".to_string()),
                relationship: Some("Donor".to_string()),
                membership_status: Some("Current".to_string()),
                state: Some("SD".to_string()),
                lifetime_gift_amount: 250.0,
                ..Default::default()
            },
            Person {
                person_id: Some("D-2".to_string()),
                full_name: Some("John Smith".to_string()),
                relationship: Some("Donor, Board Member".to_string()),
                membership_status: Some("Former".to_string()),
                state: Some("SD".to_string()),
                lifetime_gift_amount: 4_500.0,
                ..Default::default()
            },
            Person {
                person_id: Some("F-2".to_string()),
                full_name: Some("Producer F-2".to_string()),
                relationship: Some("Cost-share Recipient".to_string()),
                membership_status: None,
                state: Some("MN".to_string()),
                lifetime_costshare_total: 12_000.0,
                ..Default::default()
            },
        ],
        cost_share_funding: vec![
            FundingLedgerEntry {
                bmp: Some("Cover Crop".to_string()),
                bmp_type: Some("Cropland".to_string()),
                fund_name: Some("319".to_string()),
                amount_allocated: 20_000.0,
                amount_used: 9_000.0,
                amount_available: 11_000.0,
                segment: Some("1".to_string()),
            },
            FundingLedgerEntry {
                bmp: Some("Riparian Buffer".to_string()),
                bmp_type: Some("Riparian".to_string()),
                fund_name: Some("Local Match".to_string()),
                amount_allocated: 15_000.0,
                amount_used: 12_000.0,
                amount_available: 3_000.0,
                segment: Some("2".to_string()),
            },
        ],
    }
}

#[test]
fn test_full_bundle_cross_checks() -> Result<()> {
    let dataset = watershed_dataset();
    let bundle = DashboardBundle::compute(&dataset, &FilterSet::default())?;

    // Donor: year series reconciles with the headline total.
    let donor = &bundle.donor;
    let metrics = donor.metrics.as_ref().unwrap();
    assert_eq!(metrics.total_donors, 3);
    assert_eq!(metrics.total_transactions, 5);
    let by_year_total: f64 = donor.giving_by_year.iter().map(|y| y.total_giving).sum();
    assert!((by_year_total - metrics.lifetime_giving).abs() < 1e-9);

    // Vendor: every payment lands in exactly one category column.
    let vendor = &bundle.vendor;
    assert_eq!(vendor.metrics.as_ref().unwrap().total_vendors, 3);
    let category_total: f64 = vendor
        .category_by_year
        .data
        .iter()
        .flat_map(|row| row.values.values())
        .sum();
    assert!((category_total - 2_950.0).abs() < 1e-9);

    // Cost-share: funding sources reconcile to 100%.
    let cost_share = &bundle.cost_share;
    let pct_sum: f64 = cost_share
        .funding_source_breakdown
        .iter()
        .map(|s| s.percentage)
        .sum();
    assert!((pct_sum - 100.0).abs() < 1e-9);
    assert_eq!(cost_share.metrics.as_ref().unwrap().contract_count, 3);

    // Master: engagement matrix keeps its fixed shape regardless of data.
    assert_eq!(bundle.master.engagement_matrix.len(), 3);
    for row in &bundle.master.engagement_matrix {
        assert_eq!(row.counts.len(), 6);
    }

    Ok(())
}

#[test]
fn test_donor_two_tier_membership_timeline() {
    let dataset = watershed_dataset();
    let filter = DonorFilter {
        gift_types: vec!["General Donation".to_string()],
        ..Default::default()
    };
    let dashboard = DonorDashboard::compute(&dataset.donor_history, &filter);

    // Headline metrics honor the gift-type filter.
    assert_eq!(dashboard.metrics.as_ref().unwrap().total_donors, 1);

    // The membership timeline keeps counting membership gifts from the
    // year-only tier even though the filter excludes them.
    let y2022 = dashboard
        .membership_by_year
        .iter()
        .find(|y| y.year == 2022)
        .unwrap();
    assert_eq!(y2022.membership_count, 2);
    assert_eq!(y2022.total_giving, 2_500.0);
}

#[test]
fn test_donor_year_bounds_shrink_everything() {
    let dataset = watershed_dataset();
    let filter = DonorFilter {
        year_start: Some(2022),
        year_end: Some(2022),
        ..Default::default()
    };
    let dashboard = DonorDashboard::compute(&dataset.donor_history, &filter);

    assert_eq!(dashboard.filtered_row_count, 3);
    assert_eq!(dashboard.giving_by_year.len(), 1);
    assert_eq!(dashboard.giving_by_year[0].year, 2022);
    // Options always reflect the unfiltered rows.
    assert_eq!(dashboard.filter_options.years, vec![2021, 2022]);
}

#[test]
fn test_vendor_classification_drives_the_dashboard() {
    let dataset = watershed_dataset();
    let classifier = VendorClassifier::new();
    let dashboard =
        VendorDashboard::compute(&dataset.vendor_history, &VendorFilter::default(), &classifier);

    let categories = &dashboard.category_by_year.categories;
    // Split lookup, broadcast call letters, and the person-name heuristic
    // each contribute a column.
    assert!(categories.iter().any(|c| c == "Information & Education"));
    assert!(categories.iter().any(|c| c == "Marketing & Outreach"));
    assert!(categories.iter().any(|c| c == "Personnel"));

    let top = &dashboard.all_vendors[0];
    assert_eq!(top.full_name, "KELO-TV");
    assert!(top.category_breakdown.contains_key("Marketing & Outreach"));
}

#[test]
fn test_vendor_category_filter_narrows_rollups() {
    let dataset = watershed_dataset();
    let filter = VendorFilter {
        categories: vec!["Information & Education".to_string()],
        ..Default::default()
    };
    let classifier = VendorClassifier::new();
    let dashboard = VendorDashboard::compute(&dataset.vendor_history, &filter, &classifier);

    assert_eq!(dashboard.filtered_row_count, 1);
    assert_eq!(dashboard.all_vendors.len(), 1);
    assert_eq!(dashboard.all_vendors[0].full_name, "Prairie Printing");
    // Options still list every category observed in the full history.
    assert!(dashboard
        .filter_options
        .categories
        .iter()
        .any(|c| c == "Marketing & Outreach"));
}

#[test]
fn test_cost_share_timeline_ignores_bmp_filter_for_counts() {
    let dataset = watershed_dataset();
    let filter = CostShareFilter {
        bmps: vec!["Cover Crop".to_string()],
        ..Default::default()
    };
    let dashboard =
        CostShareDashboard::compute(&dataset.cost_share_history, &dataset.cost_share_funding, &filter);

    let y2022 = dashboard.timeline.iter().find(|y| y.year == 2022).unwrap();
    // Both 2022 contracts count; only Cover Crop acres do.
    assert_eq!(y2022.contract_count, 2);
    assert_eq!(y2022.total_acres, 80.0);

    // Ledger aggregates ignore the history filter entirely.
    assert_eq!(dashboard.budget_by_segment.len(), 2);
    assert_eq!(dashboard.funding_by_source[0].name, "319");
}

#[test]
fn test_master_roles_and_geography() {
    let dataset = watershed_dataset();
    let dashboard = MasterDashboard::compute(&dataset.master_database, &MasterFilter::default());

    let metrics = dashboard.metrics.as_ref().unwrap();
    assert_eq!(metrics.total_people, 3);
    assert_eq!(metrics.total_donors, 2);
    assert_eq!(metrics.total_cost_share, 1);
    assert_eq!(metrics.total_lifetime_giving, 4_750.0);

    // John Smith counts under both Donor and Board Member.
    let donors = dashboard
        .relationship_breakdown
        .iter()
        .find(|s| s.status == "Donor")
        .unwrap();
    assert_eq!(donors.count, 2);

    let sd_insight = dashboard
        .insights
        .iter()
        .find(|i| i.text.contains("South Dakota"))
        .unwrap();
    assert!(sd_insight.text.contains("66.7%"));
}

#[test]
fn test_funding_ledger_csv_feeds_budget_charts() -> Result<()> {
    let csv = "\
BMP,BMP Type,Fund Name,Amount Allocated,Amount Used,Amount Available,Segment
Cover Crop,Cropland,319,\"$20,000.00\",\"$9,000.00\",\"$11,000.00\",1
Riparian Buffer,Riparian,Local Match,\"$15,000.00\",\"$12,000.00\",\"$3,000.00\",2
Segment 1 Total,,,\"$20,000.00\",\"$9,000.00\",\"$11,000.00\",1
";
    let ledger = funding_ledger_from_reader(csv.as_bytes())?;
    assert_eq!(ledger.len(), 2);

    let segments = funding::compute_budget_by_segment(&ledger);
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].segment, "Segment 1");
    assert!((segments[0].utilization_pct - 45.0).abs() < 1e-9);

    let by_type = funding::compute_budget_by_bmp_type(&ledger);
    assert_eq!(by_type[0].name, "Cropland");
    Ok(())
}

#[test]
fn test_dataset_round_trips_through_json() -> Result<()> {
    let dataset = watershed_dataset();
    let json = serde_json::to_string(&dataset)?;
    let back = dataset_from_str(&json)?;

    let bundle_a = DashboardBundle::compute(&dataset, &FilterSet::default())?;
    let bundle_b = DashboardBundle::compute(&back, &FilterSet::default())?;
    assert_eq!(
        serde_json::to_string(&bundle_a)?,
        serde_json::to_string(&bundle_b)?
    );
    Ok(())
}

#[test]
fn test_empty_dataset_produces_empty_dashboards() -> Result<()> {
    let bundle = DashboardBundle::compute(&Dataset::default(), &FilterSet::default())?;
    assert!(bundle.donor.metrics.is_none());
    assert!(bundle.vendor.metrics.is_none());
    assert!(bundle.cost_share.metrics.is_none());
    assert!(bundle.master.metrics.is_none());
    assert!(bundle.donor.insights.is_empty());
    assert!(bundle.cost_share.budget_by_segment.is_empty());
    Ok(())
}
