//! Webhook reconciliation for payment links.
//!
//! Gateways deliver asynchronous status callbacks; this service maps the
//! vendor status vocabulary onto the canonical statuses through the
//! configured dictionaries and advances the persisted link. Nothing in here
//! may fail the webhook endpoint: every outcome, including malformed or
//! unknown events, resolves to a logged no-op.

use crate::database::payment_link_repository::PaymentLinkRepository;
use crate::database::settings_repository::{keys, SettingsRepository};
use crate::error::AppError;
use crate::gateways::http::verify_hmac_sha256_base64;
use crate::gateways::types::{GatewayName, LinkStatus};
use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Canonical form of an inbound link status callback, whichever gateway
/// delivered it.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkStatusEvent {
    pub gateway: GatewayName,
    pub pg_link_id: String,
    pub reference_id: String,
    pub vendor_status: String,
    pub event_time: Option<NaiveDateTime>,
    pub amount_paid: Option<f64>,
}

/// What happened to an inbound event. Only `Updated` touched the database.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// Not a link status event; ignored without logging noise.
    IgnoredEventType,
    /// Configured secret present and the signature did not verify.
    InvalidSignature,
    /// Vendor status missing from the configured dictionary.
    UnknownStatus { vendor_status: String },
    /// No stored link matches the (pg_link_id, reference_id) pair.
    UnknownLink {
        pg_link_id: String,
        reference_id: String,
    },
    /// Event does not outrank the stored status (includes re-delivery).
    StaleStatus {
        current: LinkStatus,
        incoming: LinkStatus,
    },
    Updated {
        reference_id: String,
        status: LinkStatus,
    },
}

pub struct WebhookReconciler {
    links: Arc<PaymentLinkRepository>,
    settings: Arc<SettingsRepository>,
}

impl WebhookReconciler {
    pub fn new(links: Arc<PaymentLinkRepository>, settings: Arc<SettingsRepository>) -> Self {
        Self { links, settings }
    }

    pub async fn process(
        &self,
        raw_body: &[u8],
        signature: Option<&str>,
        payload: &JsonValue,
    ) -> Result<ReconcileOutcome, AppError> {
        if let Some(secret) = self.settings.get(keys::CASHFREE_WEBHOOK_SECRET).await? {
            let verified = signature
                .map(|s| verify_hmac_sha256_base64(raw_body, &secret, s))
                .unwrap_or(false);
            if !verified {
                warn!("webhook signature verification failed, dropping event");
                return Ok(ReconcileOutcome::InvalidSignature);
            }
        }

        let Some(event) = parse_event(payload) else {
            return Ok(ReconcileOutcome::IgnoredEventType);
        };

        let status_map = self.settings.json_map(status_map_key(event.gateway)).await?;
        let Some(status) = map_vendor_status(&status_map, &event.vendor_status) else {
            warn!(
                gateway = %event.gateway,
                vendor_status = %event.vendor_status,
                reference_id = %event.reference_id,
                "unmapped vendor status, dropping event"
            );
            return Ok(ReconcileOutcome::UnknownStatus {
                vendor_status: event.vendor_status,
            });
        };

        let Some(link) = self
            .links
            .find_for_reconciliation(&event.pg_link_id, &event.reference_id)
            .await?
        else {
            // Gateways retry on non-2xx, so an unknown link must not become
            // an error; it may belong to another environment entirely.
            warn!(
                pg_link_id = %event.pg_link_id,
                reference_id = %event.reference_id,
                "webhook references unknown link"
            );
            return Ok(ReconcileOutcome::UnknownLink {
                pg_link_id: event.pg_link_id,
                reference_id: event.reference_id,
            });
        };

        let current = LinkStatus::from_code(link.status).unwrap_or(LinkStatus::Created);
        if status.priority() <= current.priority() {
            info!(
                reference_id = %link.reference_id,
                current = %current,
                incoming = %status,
                "stale or duplicate status event, no-op"
            );
            return Ok(ReconcileOutcome::StaleStatus {
                current,
                incoming: status,
            });
        }

        let event_time = event
            .event_time
            .unwrap_or_else(|| chrono::Utc::now().naive_utc());
        let (paid_at, expired_at, failed_at) = terminal_timestamps(status, event_time);

        self.links
            .apply_terminal_status(link.id, status.code(), paid_at, expired_at, failed_at)
            .await?;

        info!(
            reference_id = %link.reference_id,
            from = %current,
            to = %status,
            amount_paid = ?event.amount_paid,
            "payment link reconciled"
        );

        Ok(ReconcileOutcome::Updated {
            reference_id: link.reference_id,
            status,
        })
    }
}

fn status_map_key(gateway: GatewayName) -> &'static str {
    match gateway {
        GatewayName::Cashfree => keys::CASHFREE_LINK_STATUS_MAP,
        GatewayName::Razorpay => keys::RAZORPAY_LINK_STATUS_MAP,
    }
}

/// Parse a raw gateway payload into a canonical event. Returns None for
/// anything that is not a recognized link status callback.
pub fn parse_event(payload: &JsonValue) -> Option<LinkStatusEvent> {
    if payload.get("type").and_then(|v| v.as_str()) == Some("PAYMENT_LINK_EVENT") {
        let data = payload.get("data")?;
        return Some(LinkStatusEvent {
            gateway: GatewayName::Cashfree,
            pg_link_id: string_or_number(data.get("cf_link_id")?)?,
            reference_id: data.get("link_id")?.as_str()?.to_string(),
            vendor_status: data.get("link_status")?.as_str()?.to_string(),
            event_time: payload
                .get("event_time")
                .and_then(|v| v.as_str())
                .and_then(format_event_time),
            amount_paid: data.get("link_amount_paid").and_then(|v| v.as_f64()),
        });
    }

    // Razorpay wraps the entity under payload.payment_link.entity and names
    // events payment_link.paid / payment_link.expired / ...
    let event_name = payload.get("event").and_then(|v| v.as_str())?;
    if event_name.starts_with("payment_link.") {
        let entity = payload
            .get("payload")?
            .get("payment_link")?
            .get("entity")?;
        return Some(LinkStatusEvent {
            gateway: GatewayName::Razorpay,
            pg_link_id: entity.get("id")?.as_str()?.to_string(),
            reference_id: entity.get("reference_id")?.as_str()?.to_string(),
            vendor_status: entity.get("status")?.as_str()?.to_string(),
            event_time: payload
                .get("created_at")
                .and_then(|v| v.as_i64())
                .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
                .map(|t| t.naive_utc()),
            amount_paid: entity
                .get("amount_paid")
                .and_then(|v| v.as_i64())
                .map(|paise| paise as f64 / 100.0),
        });
    }

    None
}

fn string_or_number(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Map a vendor status string through the configured dictionary onto a
/// canonical status. The dictionary values are numeric-text codes,
/// e.g. {"PAID":"1","EXPIRED":"2"}.
pub fn map_vendor_status(
    status_map: &HashMap<String, String>,
    vendor_status: &str,
) -> Option<LinkStatus> {
    status_map
        .get(vendor_status)
        .and_then(|code| code.parse::<i16>().ok())
        .and_then(LinkStatus::from_code)
}

/// Parse a gateway event timestamp (RFC 3339 with any offset) into the
/// stored naive UTC form.
pub fn format_event_time(raw: &str) -> Option<NaiveDateTime> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.naive_utc())
}

/// The single timestamp column a terminal status owns:
/// (paid_at, expired_at, failed_at).
pub fn terminal_timestamps(
    status: LinkStatus,
    event_time: NaiveDateTime,
) -> (
    Option<NaiveDateTime>,
    Option<NaiveDateTime>,
    Option<NaiveDateTime>,
) {
    match status {
        LinkStatus::Paid | LinkStatus::PartiallyPaid => (Some(event_time), None, None),
        LinkStatus::Expired => (None, Some(event_time), None),
        LinkStatus::Cancelled => (None, None, Some(event_time)),
        LinkStatus::Created => (None, None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cashfree_status_map() -> HashMap<String, String> {
        [
            ("PAID", "1"),
            ("PARTIALLY_PAID", "4"),
            ("EXPIRED", "2"),
            ("CANCELLED", "5"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn cashfree_event_parses_into_canonical_form() {
        let payload = serde_json::json!({
            "type": "PAYMENT_LINK_EVENT",
            "event_time": "2025-01-01T10:00:00Z",
            "data": {
                "cf_link_id": "pg_1",
                "link_id": "INV-2425-000042",
                "link_status": "PAID",
                "link_amount_paid": 500.0
            }
        });

        let event = parse_event(&payload).expect("event should parse");
        assert_eq!(event.gateway, GatewayName::Cashfree);
        assert_eq!(event.pg_link_id, "pg_1");
        assert_eq!(event.reference_id, "INV-2425-000042");
        assert_eq!(event.vendor_status, "PAID");
        assert_eq!(
            event.event_time.unwrap().format("%Y-%m-%d %H:%M:%S").to_string(),
            "2025-01-01 10:00:00"
        );
    }

    #[test]
    fn numeric_cf_link_id_is_accepted() {
        let payload = serde_json::json!({
            "type": "PAYMENT_LINK_EVENT",
            "data": {
                "cf_link_id": 12345,
                "link_id": "INV-2425-000001",
                "link_status": "EXPIRED"
            }
        });

        let event = parse_event(&payload).expect("event should parse");
        assert_eq!(event.pg_link_id, "12345");
        assert_eq!(event.event_time, None);
    }

    #[test]
    fn non_link_event_types_are_ignored() {
        let payload = serde_json::json!({
            "type": "ORDER_EVENT",
            "data": { "order_id": "o_1" }
        });
        assert_eq!(parse_event(&payload), None);

        let payload = serde_json::json!({ "event": "refund.processed" });
        assert_eq!(parse_event(&payload), None);
    }

    #[test]
    fn razorpay_event_parses_with_minor_unit_amount() {
        let payload = serde_json::json!({
            "event": "payment_link.paid",
            "created_at": 1735725600,
            "payload": {
                "payment_link": {
                    "entity": {
                        "id": "plink_Nxyz1",
                        "reference_id": "INV-2425-000042",
                        "status": "paid",
                        "amount_paid": 50000
                    }
                }
            }
        });

        let event = parse_event(&payload).expect("event should parse");
        assert_eq!(event.gateway, GatewayName::Razorpay);
        assert_eq!(event.pg_link_id, "plink_Nxyz1");
        assert_eq!(event.vendor_status, "paid");
        assert_eq!(event.amount_paid, Some(500.0));
    }

    #[test]
    fn vendor_status_maps_through_dictionary() {
        let map = cashfree_status_map();
        assert_eq!(map_vendor_status(&map, "PAID"), Some(LinkStatus::Paid));
        assert_eq!(
            map_vendor_status(&map, "PARTIALLY_PAID"),
            Some(LinkStatus::PartiallyPaid)
        );
        assert_eq!(map_vendor_status(&map, "EXPIRED"), Some(LinkStatus::Expired));
        assert_eq!(
            map_vendor_status(&map, "CANCELLED"),
            Some(LinkStatus::Cancelled)
        );
        assert_eq!(map_vendor_status(&map, "ACTIVE"), None);
    }

    #[test]
    fn exactly_one_terminal_timestamp_is_set() {
        let t = format_event_time("2025-01-01T10:00:00Z").unwrap();

        for status in [
            LinkStatus::Paid,
            LinkStatus::PartiallyPaid,
            LinkStatus::Expired,
            LinkStatus::Cancelled,
        ] {
            let (paid, expired, failed) = terminal_timestamps(status, t);
            let set = [paid, expired, failed].iter().filter(|v| v.is_some()).count();
            assert_eq!(set, 1, "status {:?} must own exactly one timestamp", status);
        }

        let (paid, expired, failed) = terminal_timestamps(LinkStatus::Paid, t);
        assert_eq!(paid, Some(t));
        assert_eq!(expired, None);
        assert_eq!(failed, None);
    }

    #[test]
    fn event_time_keeps_utc_wall_clock() {
        let t = format_event_time("2025-01-01T10:00:00Z").unwrap();
        assert_eq!(t.format("%Y-%m-%d %H:%M:%S").to_string(), "2025-01-01 10:00:00");

        // Offset timestamps are shifted to UTC before storage.
        let t = format_event_time("2025-01-01T10:00:00+05:30").unwrap();
        assert_eq!(t.format("%Y-%m-%d %H:%M:%S").to_string(), "2025-01-01 04:30:00");

        assert_eq!(format_event_time("yesterday"), None);
    }
}
