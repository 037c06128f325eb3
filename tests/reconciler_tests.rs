use paylink_backend::gateways::types::LinkStatus;
use paylink_backend::services::reconciler::{
    format_event_time, map_vendor_status, parse_event, terminal_timestamps,
};
use serde_json::json;
use std::collections::HashMap;

fn status_map() -> HashMap<String, String> {
    serde_json::from_value(json!({
        "PAID": "1",
        "PARTIALLY_PAID": "4",
        "EXPIRED": "2",
        "CANCELLED": "5"
    }))
    .unwrap()
}

#[test]
fn paid_webhook_scenario_produces_status_one_and_paid_timestamp() {
    // The documented end-to-end webhook scenario: a CREATED link receiving
    // a PAID event at 2025-01-01T10:00:00Z.
    let payload = json!({
        "type": "PAYMENT_LINK_EVENT",
        "event_time": "2025-01-01T10:00:00Z",
        "data": {
            "cf_link_id": "pg_1",
            "link_id": "INV-2425-000042",
            "link_status": "PAID"
        }
    });

    let event = parse_event(&payload).expect("event should parse");
    assert_eq!(event.pg_link_id, "pg_1");
    assert_eq!(event.reference_id, "INV-2425-000042");

    let status = map_vendor_status(&status_map(), &event.vendor_status).expect("PAID is mapped");
    assert_eq!(status, LinkStatus::Paid);
    assert_eq!(status.code(), 1);

    let (paid_at, expired_at, failed_at) = terminal_timestamps(status, event.event_time.unwrap());
    assert_eq!(
        paid_at.unwrap().format("%Y-%m-%d %H:%M:%S").to_string(),
        "2025-01-01 10:00:00"
    );
    assert_eq!(expired_at, None);
    assert_eq!(failed_at, None);
}

#[test]
fn redelivered_event_cannot_advance_the_status_again() {
    // Re-delivery maps to the same status; equal priority means no update,
    // so the stored status and its single timestamp stay untouched.
    let status = map_vendor_status(&status_map(), "PAID").unwrap();
    let stored = LinkStatus::Paid;
    assert!(status.priority() <= stored.priority());
}

#[test]
fn stale_expired_event_never_regresses_a_paid_link() {
    let stored = LinkStatus::Paid;
    let incoming = map_vendor_status(&status_map(), "EXPIRED").unwrap();
    assert!(incoming.priority() <= stored.priority());
}

#[test]
fn partial_payment_can_still_complete_or_expire() {
    let stored = LinkStatus::PartiallyPaid;
    assert!(LinkStatus::Paid.priority() > stored.priority());
    assert!(LinkStatus::Expired.priority() > stored.priority());
    assert!(LinkStatus::Cancelled.priority() > stored.priority());
}

#[test]
fn every_terminal_status_owns_exactly_one_timestamp_column() {
    let t = format_event_time("2025-06-30T23:59:59Z").unwrap();
    for vendor in ["PAID", "PARTIALLY_PAID", "EXPIRED", "CANCELLED"] {
        let status = map_vendor_status(&status_map(), vendor).unwrap();
        let (paid, expired, failed) = terminal_timestamps(status, t);
        let set = [paid, expired, failed].iter().filter(|v| v.is_some()).count();
        assert_eq!(set, 1, "{} should set exactly one timestamp", vendor);
    }
}

#[test]
fn unknown_vendor_status_maps_to_nothing() {
    // ACTIVE is Cashfree's pre-terminal state and is deliberately absent
    // from the dictionary; the reconciler drops such events.
    assert_eq!(map_vendor_status(&status_map(), "ACTIVE"), None);
    assert_eq!(map_vendor_status(&status_map(), ""), None);
}

#[test]
fn unrelated_payloads_are_silent_no_ops() {
    assert!(parse_event(&json!({ "type": "ORDER_EVENT", "data": {} })).is_none());
    assert!(parse_event(&json!({ "event": "payout.processed" })).is_none());
    assert!(parse_event(&json!({})).is_none());
    // Shape is right but the required identifiers are missing.
    assert!(parse_event(&json!({
        "type": "PAYMENT_LINK_EVENT",
        "data": { "link_status": "PAID" }
    }))
    .is_none());
}

#[test]
fn razorpay_events_reconcile_through_their_own_dictionary() {
    let razorpay_map: HashMap<String, String> =
        serde_json::from_value(json!({ "paid": "1", "expired": "2", "cancelled": "5" })).unwrap();

    let payload = json!({
        "event": "payment_link.expired",
        "created_at": 1735725600,
        "payload": {
            "payment_link": {
                "entity": {
                    "id": "plink_Nxyz1",
                    "reference_id": "INV-2425-000050",
                    "status": "expired"
                }
            }
        }
    });

    let event = parse_event(&payload).expect("event should parse");
    let status = map_vendor_status(&razorpay_map, &event.vendor_status).unwrap();
    assert_eq!(status, LinkStatus::Expired);

    let (paid, expired, failed) = terminal_timestamps(status, event.event_time.unwrap());
    assert!(paid.is_none());
    assert!(expired.is_some());
    assert!(failed.is_none());
}
