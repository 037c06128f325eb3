use crate::database::payment_link_repository::PaymentLinkRepository;
use crate::error::{AppError, AppErrorKind, DomainError, ValidationError};
use crate::gateways::types::{FundAccount, PayoutKind};
use crate::middleware::error::{app_error_response, get_request_id_from_headers, ErrorResponse};
use crate::services::orchestrator::{LinkOrchestrator, PaymentLinkConfig, PayoutConfig};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::str::FromStr;
use std::sync::Arc;

pub struct LinksState {
    pub orchestrator: Arc<LinkOrchestrator>,
    pub links: Arc<PaymentLinkRepository>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentLinkRequest {
    pub amount: BigDecimal,
    pub currency: Option<String>,
    pub link_expiry_time: Option<String>,
    pub link_purpose: String,
    pub link_notify: Option<bool>,
    pub link_partial_payments: Option<bool>,
    pub contact_id: i64,
    pub link_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankDetails {
    pub account_holder: String,
    pub account_number: String,
    pub ifsc: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDetails {
    pub number: String,
    pub network: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePayoutLinkRequest {
    pub amount: BigDecimal,
    pub currency: Option<String>,
    pub link_purpose: String,
    #[serde(rename = "type")]
    pub payout_type: String,
    pub description: Option<String>,
    pub upi_id: Option<String>,
    pub bank_details: Option<BankDetails>,
    pub card_details: Option<CardDetails>,
    pub contact_id: i64,
    pub link_type: String,
}

/// POST /api/links/payment
pub async fn create_payment_link(
    State(state): State<Arc<LinksState>>,
    headers: axum::http::HeaderMap,
    Json(payload): Json<CreatePaymentLinkRequest>,
) -> Result<Json<JsonValue>, (StatusCode, Json<ErrorResponse>)> {
    let request_id = get_request_id_from_headers(&headers);

    let expires_at = match parse_expiry(payload.link_expiry_time.as_deref()) {
        Ok(v) => v,
        Err(e) => return Err(app_error_response(e, request_id)),
    };

    let config = PaymentLinkConfig {
        amount: payload.amount,
        currency: payload.currency.unwrap_or_else(|| "INR".to_string()),
        expires_at,
        purpose: payload.link_purpose,
        notify: payload.link_notify.unwrap_or(false),
        partial_payments: payload.link_partial_payments.unwrap_or(false),
    };

    let result = state
        .orchestrator
        .create_payment_link(config, payload.contact_id, &payload.link_type)
        .await
        .map_err(|e| app_error_response(e, request_id))?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Payment link created",
        "data": result,
    })))
}

/// POST /api/links/payout
pub async fn create_payout_link(
    State(state): State<Arc<LinksState>>,
    headers: axum::http::HeaderMap,
    Json(payload): Json<CreatePayoutLinkRequest>,
) -> Result<Json<JsonValue>, (StatusCode, Json<ErrorResponse>)> {
    let request_id = get_request_id_from_headers(&headers);

    let fund_account = match build_fund_account(&payload) {
        Ok(v) => v,
        Err(e) => return Err(app_error_response(e, request_id)),
    };

    let config = PayoutConfig {
        amount: payload.amount,
        currency: payload.currency.unwrap_or_else(|| "INR".to_string()),
        purpose: payload.link_purpose,
        description: payload.description,
        fund_account,
    };

    let result = state
        .orchestrator
        .create_payout_link(config, payload.contact_id, &payload.link_type)
        .await
        .map_err(|e| app_error_response(e, request_id))?;

    Ok(Json(serde_json::json!({
        "message": "Payout link created",
        "data": result,
    })))
}

/// GET /api/links/types
pub async fn get_payment_types(
    State(state): State<Arc<LinksState>>,
    headers: axum::http::HeaderMap,
) -> Result<Json<JsonValue>, (StatusCode, Json<ErrorResponse>)> {
    let request_id = get_request_id_from_headers(&headers);

    let types = state
        .orchestrator
        .payment_types()
        .await
        .map_err(|e| app_error_response(e, request_id))?;

    Ok(Json(serde_json::json!({
        "success": true,
        "data": types,
    })))
}

/// GET /api/links/payment/{reference_id}
pub async fn get_payment_link(
    State(state): State<Arc<LinksState>>,
    Path(reference_id): Path<String>,
    headers: axum::http::HeaderMap,
) -> Result<Json<JsonValue>, (StatusCode, Json<ErrorResponse>)> {
    let request_id = get_request_id_from_headers(&headers);

    let link = state
        .links
        .find_by_reference(&reference_id)
        .await
        .map_err(|e| app_error_response(AppError::from(e), request_id.clone()))?
        .ok_or_else(|| {
            app_error_response(
                AppError::new(AppErrorKind::Domain(DomainError::LinkNotFound {
                    reference_id: reference_id.clone(),
                })),
                request_id,
            )
        })?;

    Ok(Json(serde_json::json!({
        "success": true,
        "data": link,
    })))
}

fn parse_expiry(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, AppError> {
    match raw {
        None => Ok(None),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|_| {
                AppError::new(AppErrorKind::Validation(ValidationError::InvalidField {
                    field: "linkExpiryTime".to_string(),
                    reason: "expected an RFC 3339 timestamp".to_string(),
                }))
            }),
    }
}

fn build_fund_account(payload: &CreatePayoutLinkRequest) -> Result<FundAccount, AppError> {
    let kind = PayoutKind::from_str(&payload.payout_type).map_err(AppError::from)?;

    match kind {
        PayoutKind::Upi => payload
            .upi_id
            .clone()
            .map(|address| FundAccount::Upi { address })
            .ok_or_else(|| missing_field("upiId")),
        PayoutKind::Bank => payload
            .bank_details
            .as_ref()
            .map(|bank| FundAccount::Bank {
                account_holder: bank.account_holder.clone(),
                account_number: bank.account_number.clone(),
                ifsc: bank.ifsc.clone(),
            })
            .ok_or_else(|| missing_field("bankDetails")),
        PayoutKind::Cards => payload
            .card_details
            .as_ref()
            .map(|card| FundAccount::Card {
                number: card.number.clone(),
                network: card.network.clone(),
            })
            .ok_or_else(|| missing_field("cardDetails")),
    }
}

fn missing_field(field: &str) -> AppError {
    AppError::new(AppErrorKind::Validation(ValidationError::MissingField {
        field: field.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_link_request_deserializes_from_client_shape() {
        let raw = serde_json::json!({
            "amount": 500,
            "linkExpiryTime": "2025-02-01T00:00:00Z",
            "linkPurpose": "Invoice #1",
            "linkNotify": true,
            "contactId": 7,
            "linkType": "invoice"
        });

        let parsed: CreatePaymentLinkRequest =
            serde_json::from_value(raw).expect("deserialization should succeed");
        assert_eq!(parsed.amount, BigDecimal::from(500));
        assert_eq!(parsed.contact_id, 7);
        assert_eq!(parsed.link_type, "invoice");
        assert_eq!(parsed.link_notify, Some(true));
    }

    #[test]
    fn payout_fund_account_requires_matching_details() {
        let raw = serde_json::json!({
            "amount": 250,
            "linkPurpose": "refund",
            "type": "upi",
            "contactId": 7,
            "linkType": "payout"
        });
        let parsed: CreatePayoutLinkRequest = serde_json::from_value(raw).unwrap();
        // upi requested but no upiId supplied
        assert!(build_fund_account(&parsed).is_err());

        let raw = serde_json::json!({
            "amount": 250,
            "linkPurpose": "refund",
            "type": "bank",
            "bankDetails": {
                "accountHolder": "Asha Rao",
                "accountNumber": "0123456789",
                "ifsc": "HDFC0000001"
            },
            "contactId": 7,
            "linkType": "payout"
        });
        let parsed: CreatePayoutLinkRequest = serde_json::from_value(raw).unwrap();
        let account = build_fund_account(&parsed).expect("bank details are complete");
        assert!(matches!(account, FundAccount::Bank { .. }));
    }

    #[test]
    fn invalid_expiry_is_rejected() {
        assert!(parse_expiry(Some("tomorrow")).is_err());
        assert!(parse_expiry(Some("2025-02-01T00:00:00Z")).unwrap().is_some());
        assert!(parse_expiry(None).unwrap().is_none());
    }
}
