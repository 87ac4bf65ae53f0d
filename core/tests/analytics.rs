use merchant_analytics_core::activity::{
    ActivityEvent, STATUS_FAILED, STATUS_PENDING, STATUS_SUCCESS,
};
use merchant_analytics_core::analytics::{AnalyticsService, KycFunnel};
use merchant_analytics_core::store::ActivityStore;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn make_store() -> ActivityStore {
    let store = ActivityStore::in_memory().unwrap();
    store.migrate().unwrap();
    store
}

fn event(
    merchant: &str,
    product: &str,
    event_type: &str,
    amount: &str,
    status: &str,
    timestamp: Option<&str>,
) -> ActivityEvent {
    ActivityEvent {
        event_id: Uuid::new_v4(),
        merchant_id: merchant.to_string(),
        event_timestamp: timestamp.map(|t| {
            chrono::DateTime::parse_from_rfc3339(t)
                .unwrap()
                .with_timezone(&chrono::Utc)
        }),
        product: product.to_string(),
        event_type: event_type.to_string(),
        amount: Decimal::from_str(amount).unwrap(),
        status: status.to_string(),
        channel: None,
        region: None,
        merchant_tier: None,
    }
}

fn seed(store: &ActivityStore, events: Vec<ActivityEvent>) {
    store.insert_events(&events).unwrap();
}

// ── Top merchant ─────────────────────────────────────────────────────────────

#[test]
fn top_merchant_sums_successful_volume_only() {
    let store = make_store();
    seed(
        &store,
        vec![
            event("M1", "PAYMENTS", "TRANSFER", "100", "SUCCESS", None),
            event("M2", "PAYMENTS", "TRANSFER", "150", "SUCCESS", None),
            event("M2", "PAYMENTS", "TRANSFER", "10", "FAILED", None),
        ],
    );

    let top = AnalyticsService::new(&store).top_merchant().unwrap();
    assert_eq!(top.merchant_id.as_deref(), Some("M2"));
    assert_eq!(top.total_volume, Decimal::new(15000, 2));
}

#[test]
fn top_merchant_with_no_successful_rows_is_none() {
    let store = make_store();
    seed(
        &store,
        vec![event("M1", "PAYMENTS", "TRANSFER", "100", "FAILED", None)],
    );

    let top = AnalyticsService::new(&store).top_merchant().unwrap();
    assert!(top.merchant_id.is_none());
    assert_eq!(top.total_volume, Decimal::new(0, 2));
}

#[test]
fn top_merchant_tie_breaks_by_merchant_id() {
    let store = make_store();
    seed(
        &store,
        vec![
            event("ZULU", "PAYMENTS", "TRANSFER", "50", "SUCCESS", None),
            event("ALPHA", "PAYMENTS", "TRANSFER", "50", "SUCCESS", None),
        ],
    );

    let top = AnalyticsService::new(&store).top_merchant().unwrap();
    assert_eq!(top.merchant_id.as_deref(), Some("ALPHA"));
}

// ── Monthly active merchants ─────────────────────────────────────────────────

#[test]
fn monthly_active_counts_distinct_successful_merchants_per_month() {
    let store = make_store();
    seed(
        &store,
        vec![
            event("M1", "PAYMENTS", "TRANSFER", "1", "SUCCESS", Some("2024-01-05T10:00:00Z")),
            event("M1", "PAYMENTS", "TRANSFER", "1", "SUCCESS", Some("2024-01-20T10:00:00Z")),
            event("M2", "PAYMENTS", "TRANSFER", "1", "SUCCESS", Some("2024-02-02T10:00:00Z")),
            event("M3", "PAYMENTS", "TRANSFER", "1", "FAILED", Some("2024-01-09T10:00:00Z")),
            // no timestamp: excluded even though successful
            event("M4", "PAYMENTS", "TRANSFER", "1", "SUCCESS", None),
        ],
    );

    let months = AnalyticsService::new(&store)
        .monthly_active_merchants()
        .unwrap();
    let entries: Vec<(&str, i64)> = months.iter().map(|(m, c)| (m.as_str(), *c)).collect();
    assert_eq!(entries, vec![("2024-01", 1), ("2024-02", 1)]);
}

// ── Product adoption ─────────────────────────────────────────────────────────

#[test]
fn product_adoption_orders_by_count_then_product() {
    let store = make_store();
    seed(
        &store,
        vec![
            event("M1", "PAYMENTS", "TRANSFER", "1", "SUCCESS", None),
            event("M2", "PAYMENTS", "TRANSFER", "1", "FAILED", None),
            event("M1", "KYC", "DOCUMENT_SUBMITTED", "0", "SUCCESS", None),
            event("M1", "SAVINGS", "DEPOSIT", "1", "PENDING", None),
        ],
    );

    let adoption = AnalyticsService::new(&store).product_adoption().unwrap();
    let pairs: Vec<(&str, i64)> = adoption
        .0
        .iter()
        .map(|item| (item.product.as_str(), item.merchants))
        .collect();
    // PAYMENTS has two distinct merchants regardless of status; the
    // one-merchant products tie and fall back to name order.
    assert_eq!(pairs, vec![("PAYMENTS", 2), ("KYC", 1), ("SAVINGS", 1)]);
}

#[test]
fn product_adoption_serializes_as_ordered_map() {
    let store = make_store();
    seed(
        &store,
        vec![
            event("M1", "PAYMENTS", "TRANSFER", "1", "SUCCESS", None),
            event("M2", "PAYMENTS", "TRANSFER", "1", "SUCCESS", None),
            event("M1", "KYC", "DOCUMENT_SUBMITTED", "0", "SUCCESS", None),
        ],
    );

    let adoption = AnalyticsService::new(&store).product_adoption().unwrap();
    let json = serde_json::to_string(&adoption).unwrap();
    assert_eq!(json, r#"{"PAYMENTS":2,"KYC":1}"#);
}

// ── KYC funnel ───────────────────────────────────────────────────────────────

#[test]
fn kyc_funnel_with_no_kyc_rows_is_all_zero() {
    let store = make_store();
    seed(
        &store,
        vec![event("M1", "PAYMENTS", "TRANSFER", "1", "SUCCESS", None)],
    );

    let funnel = AnalyticsService::new(&store).kyc_funnel().unwrap();
    assert_eq!(funnel, KycFunnel::default());
}

#[test]
fn kyc_funnel_counts_stages_independently() {
    let store = make_store();
    seed(
        &store,
        vec![
            event("M1", "KYC", "DOCUMENT_SUBMITTED", "0", "SUCCESS", None),
            event("M1", "KYC", "DOCUMENT_SUBMITTED", "0", "SUCCESS", None),
            event("M2", "KYC", "VERIFICATION_COMPLETED", "0", "SUCCESS", None),
            // failed events never count
            event("M3", "KYC", "TIER_UPGRADE", "0", "FAILED", None),
            // tier upgrade counted without any earlier stage on record
            event("M4", "KYC", "TIER_UPGRADE", "0", "SUCCESS", None),
        ],
    );

    let funnel = AnalyticsService::new(&store).kyc_funnel().unwrap();
    assert_eq!(funnel.documents_submitted, 1);
    assert_eq!(funnel.verifications_completed, 1);
    assert_eq!(funnel.tier_upgrades, 1);
}

// ── Failure rates ────────────────────────────────────────────────────────────

#[test]
fn failure_rates_exclude_pending_and_round_to_one_decimal() {
    let store = make_store();
    let mut events = Vec::new();
    for _ in 0..3 {
        events.push(event("M1", "PAYMENTS", "TRANSFER", "1", STATUS_SUCCESS, None));
    }
    events.push(event("M1", "PAYMENTS", "TRANSFER", "1", STATUS_FAILED, None));
    for _ in 0..2 {
        events.push(event("M1", "PAYMENTS", "TRANSFER", "1", STATUS_PENDING, None));
    }
    seed(&store, events);

    let rates = AnalyticsService::new(&store).failure_rates().unwrap();
    assert_eq!(rates.len(), 1);
    assert_eq!(rates[0].product, "PAYMENTS");
    assert_eq!(rates[0].failure_rate, 25.0);
}

#[test]
fn failure_rates_sort_descending_by_rate() {
    let store = make_store();
    seed(
        &store,
        vec![
            // SAVINGS: 1 failed / 3 resolved = 33.3
            event("M1", "SAVINGS", "DEPOSIT", "1", "FAILED", None),
            event("M1", "SAVINGS", "DEPOSIT", "1", "SUCCESS", None),
            event("M1", "SAVINGS", "DEPOSIT", "1", "SUCCESS", None),
            // PAYMENTS: 1 failed / 2 resolved = 50.0
            event("M1", "PAYMENTS", "TRANSFER", "1", "FAILED", None),
            event("M1", "PAYMENTS", "TRANSFER", "1", "SUCCESS", None),
            // KYC: all successful = 0.0
            event("M1", "KYC", "DOCUMENT_SUBMITTED", "0", "SUCCESS", None),
        ],
    );

    let rates = AnalyticsService::new(&store).failure_rates().unwrap();
    let pairs: Vec<(&str, f64)> = rates
        .iter()
        .map(|r| (r.product.as_str(), r.failure_rate))
        .collect();
    assert_eq!(
        pairs,
        vec![("PAYMENTS", 50.0), ("SAVINGS", 33.3), ("KYC", 0.0)]
    );
}

// ── Failure propagation ──────────────────────────────────────────────────────

#[test]
fn aggregation_failures_propagate_to_the_caller() {
    // no migrate: every read must error, never report an empty result
    let store = ActivityStore::in_memory().unwrap();
    let service = AnalyticsService::new(&store);
    assert!(service.top_merchant().is_err());
    assert!(service.failure_rates().is_err());
}

// ── Idempotence end to end ───────────────────────────────────────────────────

#[test]
fn reingestion_leaves_aggregates_unchanged() {
    let store = make_store();
    let events = vec![
        event("M1", "PAYMENTS", "TRANSFER", "100", "SUCCESS", Some("2024-01-05T10:00:00Z")),
        event("M2", "PAYMENTS", "TRANSFER", "150", "SUCCESS", Some("2024-01-06T10:00:00Z")),
    ];
    seed(&store, events.clone());
    let before = AnalyticsService::new(&store).top_merchant().unwrap();

    // same event_ids again: the store collapses them
    seed(&store, events);
    let after = AnalyticsService::new(&store).top_merchant().unwrap();

    assert_eq!(before, after);
    assert_eq!(store.event_count().unwrap(), 2);
}
