use crate::database::gateway_config_repository::{GatewayConfig, GatewayConfigRepository};
use crate::gateways::error::{GatewayError, GatewayResult};
use crate::gateways::http::GatewayHttpClient;
use crate::gateways::types::{
    CreateLinkRequest, FundAccount, GatewayName, LinkResult, PayoutLinkRequest,
};
use crate::gateways::LinkGateway;
use async_trait::async_trait;
use bigdecimal::{BigDecimal, ToPrimitive};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{error, info};

const API_VERSION: &str = "2022-09-01";

/// Cashfree speaks major currency units end to end, so amounts pass through
/// without scaling in either direction.
pub struct CashfreeGateway {
    configs: Arc<GatewayConfigRepository>,
    http: GatewayHttpClient,
    sandbox: bool,
}

impl CashfreeGateway {
    pub fn new(configs: Arc<GatewayConfigRepository>, http: GatewayHttpClient, sandbox: bool) -> Self {
        Self {
            configs,
            http,
            sandbox,
        }
    }

    fn base_url(&self) -> &'static str {
        if self.sandbox {
            "https://sandbox.cashfree.com/pg"
        } else {
            "https://api.cashfree.com/pg"
        }
    }

    fn payout_base_url(&self) -> &'static str {
        if self.sandbox {
            "https://payout-gamma.cashfree.com/payout"
        } else {
            "https://payout-api.cashfree.com/payout"
        }
    }

    /// Credentials are resolved per call so a rotated key takes effect
    /// without a restart.
    async fn credentials(&self) -> GatewayResult<GatewayConfig> {
        self.configs
            .find_active(GatewayName::Cashfree.as_str(), self.sandbox)
            .await
            .map_err(|e| GatewayError::Configuration {
                message: format!("failed to load cashfree credentials: {}", e),
            })?
            .ok_or_else(|| GatewayError::Configuration {
                message: "no active cashfree gateway configuration".to_string(),
            })
    }
}

#[async_trait]
impl LinkGateway for CashfreeGateway {
    async fn create_payment_link(&self, request: CreateLinkRequest) -> GatewayResult<LinkResult> {
        request.validate()?;
        let creds = self.credentials().await?;

        let link_amount = request
            .amount
            .to_f64()
            .ok_or_else(|| GatewayError::Validation {
                message: format!("amount {} is not representable", request.amount),
                field: Some("amount".to_string()),
            })?;

        let payload = serde_json::json!({
            "link_id": request.reference_id,
            "link_amount": link_amount,
            "link_currency": request.currency,
            "link_purpose": request.purpose,
            "link_expiry_time": request.expires_at.map(|t| t.to_rfc3339()),
            "link_partial_payments": request.partial_payments,
            "link_notify": {
                "send_sms": request.notify.sms,
                "send_email": request.notify.email,
            },
            "customer_details": {
                "customer_name": request.customer.name,
                "customer_email": request.customer.email,
                "customer_phone": request.customer.phone,
            },
            "link_notes": request.notes,
        });

        let data: CashfreeLinkData = self
            .http
            .request_json(
                reqwest::Method::POST,
                &format!("{}/links", self.base_url()),
                GatewayName::Cashfree.as_str(),
                None,
                Some(&payload),
                &[
                    ("x-client-id", creds.api_key.as_str()),
                    ("x-client-secret", creds.api_secret.as_str()),
                    ("x-api-version", API_VERSION),
                    ("Content-Type", "application/json"),
                ],
            )
            .await
            .map_err(|e| {
                error!(reference_id = %request.reference_id, error = %e, "cashfree link creation failed");
                e
            })?;

        info!(
            reference_id = %data.link_id,
            pg_link_id = %data.cf_link_id,
            "cashfree payment link created"
        );

        normalize_link(data)
    }

    async fn create_payout_link(&self, request: PayoutLinkRequest) -> GatewayResult<JsonValue> {
        request.validate()?;
        let creds = self.credentials().await?;

        let settlement_account =
            creds
                .settlement_account
                .as_deref()
                .ok_or_else(|| GatewayError::Configuration {
                    message: "cashfree configuration has no settlement account".to_string(),
                })?;

        let amount = request
            .amount
            .to_f64()
            .ok_or_else(|| GatewayError::Validation {
                message: format!("amount {} is not representable", request.amount),
                field: Some("amount".to_string()),
            })?;

        let (transfer_mode, bene_details) = match &request.fund_account {
            FundAccount::Upi { address } => (
                "upi",
                serde_json::json!({
                    "name": request.recipient_name,
                    "vpa": address,
                }),
            ),
            FundAccount::Bank {
                account_holder,
                account_number,
                ifsc,
            } => (
                "banktransfer",
                serde_json::json!({
                    "name": account_holder,
                    "bankAccount": account_number,
                    "ifsc": ifsc,
                }),
            ),
            FundAccount::Card { number, network } => (
                "card",
                serde_json::json!({
                    "name": request.recipient_name,
                    "cardNo": number,
                    "cardNetwork": network,
                }),
            ),
        };

        let payload = serde_json::json!({
            "transferId": request.reference_id,
            "amount": amount,
            "transferMode": transfer_mode,
            "remarks": request.description.as_deref().unwrap_or(&request.purpose),
            "paymentInstrumentId": settlement_account,
            "queueIfLowBalance": true,
            "beneDetails": bene_details,
        });

        let response: JsonValue = self
            .http
            .request_json(
                reqwest::Method::POST,
                &format!("{}/v1/directTransfer", self.payout_base_url()),
                GatewayName::Cashfree.as_str(),
                None,
                Some(&payload),
                &[
                    ("x-client-id", creds.api_key.as_str()),
                    ("x-client-secret", creds.api_secret.as_str()),
                    ("Content-Type", "application/json"),
                ],
            )
            .await
            .map_err(|e| {
                error!(reference_id = %request.reference_id, error = %e, "cashfree payout failed");
                e
            })?;

        info!(reference_id = %request.reference_id, "cashfree payout accepted");
        Ok(response)
    }

    fn name(&self) -> GatewayName {
        GatewayName::Cashfree
    }
}

#[derive(Debug, Deserialize)]
struct CashfreeLinkData {
    cf_link_id: String,
    link_id: String,
    link_url: String,
    #[serde(default)]
    link_qr: Option<String>,
    link_purpose: String,
    link_amount: f64,
}

fn normalize_link(data: CashfreeLinkData) -> GatewayResult<LinkResult> {
    let amount = BigDecimal::try_from(data.link_amount).map_err(|_| GatewayError::Provider {
        gateway: GatewayName::Cashfree.as_str().to_string(),
        message: format!("invalid link_amount in response: {}", data.link_amount),
        code: None,
    })?;

    Ok(LinkResult {
        pg_link_id: data.cf_link_id,
        reference_id: data.link_id,
        gateway: GatewayName::Cashfree,
        url: data.link_url,
        qr: data.link_qr.unwrap_or_default(),
        purpose: data.link_purpose,
        amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_populates_all_required_fields() {
        let data = CashfreeLinkData {
            cf_link_id: "pg_1".to_string(),
            link_id: "INV-2425-000042".to_string(),
            link_url: "https://payments.cashfree.com/links/abc".to_string(),
            link_qr: Some("https://payments.cashfree.com/qr/abc".to_string()),
            link_purpose: "Invoice #1".to_string(),
            link_amount: 500.0,
        };

        let result = normalize_link(data).expect("normalization should succeed");
        assert_eq!(result.pg_link_id, "pg_1");
        assert_eq!(result.reference_id, "INV-2425-000042");
        assert_eq!(result.gateway, GatewayName::Cashfree);
        assert_eq!(result.url, "https://payments.cashfree.com/links/abc");
        // Cashfree already speaks major units; no scaling.
        assert_eq!(result.amount, BigDecimal::try_from(500.0).unwrap());
    }

    #[test]
    fn missing_qr_normalizes_to_empty_string() {
        let data = CashfreeLinkData {
            cf_link_id: "pg_2".to_string(),
            link_id: "ADV-2425-000007".to_string(),
            link_url: "https://payments.cashfree.com/links/def".to_string(),
            link_qr: None,
            link_purpose: "Advance".to_string(),
            link_amount: 1250.5,
        };

        let result = normalize_link(data).expect("normalization should succeed");
        assert_eq!(result.qr, "");
    }

    #[test]
    fn vendor_response_shape_deserializes() {
        let raw = serde_json::json!({
            "cf_link_id": "pg_9",
            "link_id": "INV-2425-000001",
            "link_url": "https://payments.cashfree.com/links/xyz",
            "link_qr": null,
            "link_purpose": "Invoice #9",
            "link_amount": 99.0,
            "link_status": "ACTIVE",
            "link_currency": "INR"
        });
        let data: CashfreeLinkData =
            serde_json::from_value(raw).expect("deserialization should succeed");
        assert_eq!(data.link_id, "INV-2425-000001");
    }
}
