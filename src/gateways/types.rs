use crate::gateways::error::GatewayError;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GatewayName {
    Cashfree,
    Razorpay,
}

impl GatewayName {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayName::Cashfree => "cashfree",
            GatewayName::Razorpay => "razorpay",
        }
    }
}

impl std::fmt::Display for GatewayName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for GatewayName {
    type Err = GatewayError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "cashfree" => Ok(GatewayName::Cashfree),
            "razorpay" => Ok(GatewayName::Razorpay),
            _ => Err(GatewayError::Configuration {
                message: format!("unsupported payment gateway: {}", value),
            }),
        }
    }
}

/// Canonical payment link status. The numeric codes are the wire/storage
/// form; the configured status dictionaries map vendor vocabularies onto
/// these codes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    Created,
    Paid,
    Expired,
    PartiallyPaid,
    Cancelled,
}

impl LinkStatus {
    pub fn code(&self) -> i16 {
        match self {
            LinkStatus::Created => 0,
            LinkStatus::Paid => 1,
            LinkStatus::Expired => 2,
            LinkStatus::PartiallyPaid => 4,
            LinkStatus::Cancelled => 5,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(LinkStatus::Created),
            1 => Some(LinkStatus::Paid),
            2 => Some(LinkStatus::Expired),
            4 => Some(LinkStatus::PartiallyPaid),
            5 => Some(LinkStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, LinkStatus::Created)
    }

    /// Transition priority. An inbound event may only move a link to a
    /// status of strictly higher priority, so a stale EXPIRED delivered
    /// after PAID never regresses the record, and a partial payment can
    /// still progress to fully paid, expired or cancelled.
    pub fn priority(&self) -> u8 {
        match self {
            LinkStatus::Created => 0,
            LinkStatus::PartiallyPaid => 1,
            LinkStatus::Expired | LinkStatus::Cancelled => 2,
            LinkStatus::Paid => 3,
        }
    }
}

impl std::fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LinkStatus::Created => "created",
            LinkStatus::Paid => "paid",
            LinkStatus::Expired => "expired",
            LinkStatus::PartiallyPaid => "partially_paid",
            LinkStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NotifyPolicy {
    pub sms: bool,
    pub email: bool,
}

/// Gateway-agnostic payment link creation request. Amount is always in
/// major currency units; adapters own any minor-unit conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLinkRequest {
    pub reference_id: String,
    pub amount: BigDecimal,
    pub currency: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub purpose: String,
    pub notify: NotifyPolicy,
    pub partial_payments: bool,
    pub customer: CustomerDetails,
    pub notes: Option<JsonValue>,
}

impl CreateLinkRequest {
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.amount <= BigDecimal::from(0) {
            return Err(GatewayError::Validation {
                message: "amount must be greater than zero".to_string(),
                field: Some("amount".to_string()),
            });
        }
        if self.currency.trim().is_empty() {
            return Err(GatewayError::Validation {
                message: "currency is required".to_string(),
                field: Some("currency".to_string()),
            });
        }
        if self.customer.name.trim().is_empty() {
            return Err(GatewayError::Validation {
                message: "customer name is required".to_string(),
                field: Some("customer.name".to_string()),
            });
        }
        Ok(())
    }
}

/// Normalized payment link result. Every field here is populated from the
/// vendor response by the adapter; callers never see vendor field names.
/// `qr` may be an empty string for gateways that don't return one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkResult {
    pub pg_link_id: String,
    pub reference_id: String,
    pub gateway: GatewayName,
    pub url: String,
    pub qr: String,
    pub purpose: String,
    pub amount: BigDecimal,
}

/// Disbursement destination, one sub-shape per payout kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FundAccount {
    Upi {
        address: String,
    },
    Bank {
        account_holder: String,
        account_number: String,
        ifsc: String,
    },
    Card {
        number: String,
        network: String,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PayoutKind {
    Upi,
    Bank,
    Cards,
}

impl FromStr for PayoutKind {
    type Err = GatewayError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "upi" => Ok(PayoutKind::Upi),
            "bank" => Ok(PayoutKind::Bank),
            "cards" | "card" => Ok(PayoutKind::Cards),
            _ => Err(GatewayError::Validation {
                message: format!("unsupported payout type: {}", value),
                field: Some("type".to_string()),
            }),
        }
    }
}

/// Gateway-agnostic payout link request. Amount in major units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutLinkRequest {
    pub reference_id: String,
    pub amount: BigDecimal,
    pub currency: String,
    pub purpose: String,
    pub description: Option<String>,
    pub recipient_name: String,
    pub fund_account: FundAccount,
}

impl PayoutLinkRequest {
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.amount <= BigDecimal::from(0) {
            return Err(GatewayError::Validation {
                message: "amount must be greater than zero".to_string(),
                field: Some("amount".to_string()),
            });
        }
        if self.recipient_name.trim().is_empty() {
            return Err(GatewayError::Validation {
                message: "recipient name is required".to_string(),
                field: Some("recipient_name".to_string()),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_codes_round_trip() {
        for status in [
            LinkStatus::Created,
            LinkStatus::Paid,
            LinkStatus::Expired,
            LinkStatus::PartiallyPaid,
            LinkStatus::Cancelled,
        ] {
            assert_eq!(LinkStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(LinkStatus::from_code(3), None);
    }

    #[test]
    fn paid_outranks_every_other_status() {
        for status in [
            LinkStatus::Created,
            LinkStatus::Expired,
            LinkStatus::PartiallyPaid,
            LinkStatus::Cancelled,
        ] {
            assert!(LinkStatus::Paid.priority() > status.priority());
        }
    }

    #[test]
    fn partially_paid_can_still_expire() {
        assert!(LinkStatus::Expired.priority() > LinkStatus::PartiallyPaid.priority());
    }

    #[test]
    fn gateway_name_parsing_works() {
        assert!(matches!(
            GatewayName::from_str("Cashfree"),
            Ok(GatewayName::Cashfree)
        ));
        assert!(matches!(
            GatewayName::from_str("razorpay"),
            Ok(GatewayName::Razorpay)
        ));
        assert!(GatewayName::from_str("stripe").is_err());
    }

    #[test]
    fn payout_kind_accepts_card_and_cards() {
        assert_eq!(PayoutKind::from_str("cards").unwrap(), PayoutKind::Cards);
        assert_eq!(PayoutKind::from_str("card").unwrap(), PayoutKind::Cards);
        assert!(PayoutKind::from_str("wallet").is_err());
    }

    #[test]
    fn link_request_rejects_zero_amount() {
        let request = CreateLinkRequest {
            reference_id: "INV-2425-000001".to_string(),
            amount: BigDecimal::from(0),
            currency: "INR".to_string(),
            expires_at: None,
            purpose: "Invoice".to_string(),
            notify: NotifyPolicy {
                sms: true,
                email: true,
            },
            partial_payments: false,
            customer: CustomerDetails {
                name: "Asha Rao".to_string(),
                email: Some("asha@example.com".to_string()),
                phone: Some("+919800000001".to_string()),
            },
            notes: None,
        };
        assert!(request.validate().is_err());
    }
}
