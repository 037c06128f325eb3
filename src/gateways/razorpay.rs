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

const BASE_URL: &str = "https://api.razorpay.com";

/// Razorpay wants amounts in minor units (paise). The conversion lives
/// entirely inside this adapter: requests are scaled up on the way out and
/// responses scaled back down, so callers only ever see major units.
pub struct RazorpayGateway {
    configs: Arc<GatewayConfigRepository>,
    http: GatewayHttpClient,
    sandbox: bool,
}

impl RazorpayGateway {
    pub fn new(configs: Arc<GatewayConfigRepository>, http: GatewayHttpClient, sandbox: bool) -> Self {
        Self {
            configs,
            http,
            sandbox,
        }
    }

    async fn credentials(&self) -> GatewayResult<GatewayConfig> {
        self.configs
            .find_active(GatewayName::Razorpay.as_str(), self.sandbox)
            .await
            .map_err(|e| GatewayError::Configuration {
                message: format!("failed to load razorpay credentials: {}", e),
            })?
            .ok_or_else(|| GatewayError::Configuration {
                message: "no active razorpay gateway configuration".to_string(),
            })
    }
}

#[async_trait]
impl LinkGateway for RazorpayGateway {
    async fn create_payment_link(&self, request: CreateLinkRequest) -> GatewayResult<LinkResult> {
        request.validate()?;
        let creds = self.credentials().await?;

        let amount_paise = to_minor_units(&request.amount)?;

        let payload = serde_json::json!({
            "amount": amount_paise,
            "currency": request.currency,
            "reference_id": request.reference_id,
            "description": request.purpose,
            "accept_partial": request.partial_payments,
            "expire_by": request.expires_at.map(|t| t.timestamp()),
            "customer": {
                "name": request.customer.name,
                "email": request.customer.email,
                "contact": request.customer.phone,
            },
            "notify": {
                "sms": request.notify.sms,
                "email": request.notify.email,
            },
            "notes": request.notes,
        });

        let data: RazorpayLinkData = self
            .http
            .request_json(
                reqwest::Method::POST,
                &format!("{}/v1/payment_links", BASE_URL),
                GatewayName::Razorpay.as_str(),
                Some((creds.api_key.as_str(), creds.api_secret.as_str())),
                Some(&payload),
                &[("Content-Type", "application/json")],
            )
            .await
            .map_err(|e| {
                error!(reference_id = %request.reference_id, error = %e, "razorpay link creation failed");
                e
            })?;

        info!(
            reference_id = %request.reference_id,
            pg_link_id = %data.id,
            "razorpay payment link created"
        );

        normalize_link(data, &request.reference_id)
    }

    async fn create_payout_link(&self, request: PayoutLinkRequest) -> GatewayResult<JsonValue> {
        request.validate()?;
        let creds = self.credentials().await?;

        let settlement_account =
            creds
                .settlement_account
                .as_deref()
                .ok_or_else(|| GatewayError::Configuration {
                    message: "razorpay configuration has no settlement account".to_string(),
                })?;

        let amount_paise = to_minor_units(&request.amount)?;

        let (mode, fund_account) = match &request.fund_account {
            FundAccount::Upi { address } => (
                "UPI",
                serde_json::json!({
                    "account_type": "vpa",
                    "vpa": { "address": address },
                }),
            ),
            FundAccount::Bank {
                account_holder,
                account_number,
                ifsc,
            } => (
                "IMPS",
                serde_json::json!({
                    "account_type": "bank_account",
                    "bank_account": {
                        "name": account_holder,
                        "account_number": account_number,
                        "ifsc": ifsc,
                    },
                }),
            ),
            FundAccount::Card { number, network } => (
                "card",
                serde_json::json!({
                    "account_type": "card",
                    "card": { "number": number, "network": network },
                }),
            ),
        };

        let payload = serde_json::json!({
            "account_number": settlement_account,
            "amount": amount_paise,
            "currency": request.currency,
            "mode": mode,
            "purpose": request.purpose,
            "reference_id": request.reference_id,
            "narration": request.description,
            "queue_if_low_balance": true,
            "fund_account": {
                "contact": { "name": request.recipient_name },
            },
        });
        let payload = merge_fund_account(payload, fund_account);

        let response: JsonValue = self
            .http
            .request_json(
                reqwest::Method::POST,
                &format!("{}/v1/payouts", BASE_URL),
                GatewayName::Razorpay.as_str(),
                Some((creds.api_key.as_str(), creds.api_secret.as_str())),
                Some(&payload),
                &[("Content-Type", "application/json")],
            )
            .await
            .map_err(|e| {
                error!(reference_id = %request.reference_id, error = %e, "razorpay payout failed");
                e
            })?;

        info!(reference_id = %request.reference_id, "razorpay payout accepted");
        Ok(response)
    }

    fn name(&self) -> GatewayName {
        GatewayName::Razorpay
    }
}

fn merge_fund_account(mut payload: JsonValue, fund_account: JsonValue) -> JsonValue {
    if let (Some(target), Some(source)) = (
        payload
            .get_mut("fund_account")
            .and_then(|v| v.as_object_mut()),
        fund_account.as_object(),
    ) {
        for (k, v) in source {
            target.insert(k.clone(), v.clone());
        }
    }
    payload
}

/// Convert a major-unit amount to paise. Rejects amounts with sub-paise
/// precision rather than rounding money silently.
fn to_minor_units(amount: &BigDecimal) -> GatewayResult<i64> {
    let scaled = amount * BigDecimal::from(100);
    if !scaled.is_integer() {
        return Err(GatewayError::Validation {
            message: format!("amount {} has sub-paise precision", amount),
            field: Some("amount".to_string()),
        });
    }
    scaled.to_i64().ok_or_else(|| GatewayError::Validation {
        message: format!("amount {} is out of range", amount),
        field: Some("amount".to_string()),
    })
}

fn from_minor_units(amount_paise: i64) -> BigDecimal {
    BigDecimal::from(amount_paise) / BigDecimal::from(100)
}

#[derive(Debug, Deserialize)]
struct RazorpayLinkData {
    id: String,
    short_url: String,
    amount: i64,
    description: Option<String>,
}

fn normalize_link(data: RazorpayLinkData, reference_id: &str) -> GatewayResult<LinkResult> {
    Ok(LinkResult {
        pg_link_id: data.id,
        reference_id: reference_id.to_string(),
        gateway: GatewayName::Razorpay,
        url: data.short_url,
        // Razorpay payment links carry no QR payload.
        qr: String::new(),
        purpose: data.description.unwrap_or_default(),
        amount: from_minor_units(data.amount),
    })
}
