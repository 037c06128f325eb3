//! Payment/payout link orchestration.
//!
//! Resolves the active gateway, pulls contact details, allocates the
//! reference ID, invokes the gateway adapter, persists the resulting link
//! and fires best-effort notifications.

use crate::database::contact_repository::{Contact, ContactRepository, CHANNEL_EMAIL, CHANNEL_PHONE};
use crate::database::payment_link_repository::{NewPaymentLink, PaymentLinkRepository};
use crate::database::settings_repository::{keys, SettingsRepository};
use crate::error::{AppError, AppErrorKind, DomainError, InfrastructureError};
use crate::gateways::factory::GatewayFactory;
use crate::gateways::types::{
    CreateLinkRequest, CustomerDetails, FundAccount, GatewayName, LinkResult, LinkStatus,
    NotifyPolicy, PayoutLinkRequest,
};
use crate::services::notification::NotificationService;
use crate::services::sequence::SequenceAllocator;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Business parameters for a payment link, independent of any gateway.
#[derive(Debug, Clone)]
pub struct PaymentLinkConfig {
    pub amount: BigDecimal,
    pub currency: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub purpose: String,
    pub notify: bool,
    pub partial_payments: bool,
}

/// Business parameters for a payout link.
#[derive(Debug, Clone)]
pub struct PayoutConfig {
    pub amount: BigDecimal,
    pub currency: String,
    pub purpose: String,
    pub description: Option<String>,
    pub fund_account: FundAccount,
}

pub struct LinkOrchestrator {
    sequence: SequenceAllocator,
    contacts: Arc<ContactRepository>,
    links: Arc<PaymentLinkRepository>,
    settings: Arc<SettingsRepository>,
    factory: Arc<GatewayFactory>,
    notifications: Arc<NotificationService>,
}

impl LinkOrchestrator {
    pub fn new(
        contacts: Arc<ContactRepository>,
        links: Arc<PaymentLinkRepository>,
        settings: Arc<SettingsRepository>,
        factory: Arc<GatewayFactory>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            sequence: SequenceAllocator::new(settings.clone()),
            contacts,
            links,
            settings,
            factory,
            notifications,
        }
    }

    pub async fn create_payment_link(
        &self,
        config: PaymentLinkConfig,
        contact_id: i64,
        link_type: &str,
    ) -> Result<LinkResult, AppError> {
        let contact = self.require_contact(contact_id).await?;
        let phone = self.channel_value(contact_id, CHANNEL_PHONE).await?;
        let email = self.channel_value(contact_id, CHANNEL_EMAIL).await?;

        // Precondition: when notifications were requested, both channels
        // must exist before any sequence number or gateway traffic is spent.
        if config.notify {
            if phone.is_none() {
                return Err(missing_channel(contact_id, "phone"));
            }
            if email.is_none() {
                return Err(missing_channel(contact_id, "email"));
            }
        }

        let reference_id = self.sequence.allocate(link_type).await?;

        // Re-resolved on every call so a gateway switch in settings takes
        // effect immediately.
        let gateway = self.factory.active_gateway().await?;
        let gateway_name = gateway.name();

        let request = CreateLinkRequest {
            reference_id: reference_id.clone(),
            amount: config.amount.clone(),
            currency: config.currency.clone(),
            expires_at: config.expires_at,
            purpose: config.purpose.clone(),
            notify: NotifyPolicy {
                sms: config.notify,
                email: config.notify,
            },
            partial_payments: config.partial_payments,
            customer: CustomerDetails {
                name: contact.name.clone(),
                email: email.clone(),
                phone: phone.clone(),
            },
            notes: Some(serde_json::json!({ "contact_id": contact_id, "link_type": link_type })),
        };

        // The allocated reference number is consumed either way; a failed
        // gateway call just leaves a gap in the sequence.
        let result = gateway.create_payment_link(request).await.map_err(|e| {
            error!(
                reference_id = %reference_id,
                gateway = %gateway_name,
                error = %e,
                "payment link creation failed at gateway"
            );
            AppError::from(e)
        })?;

        let stored = self
            .links
            .insert(&NewPaymentLink {
                pg_link_id: result.pg_link_id.clone(),
                reference_id: result.reference_id.clone(),
                gateway: result.gateway.as_str().to_string(),
                contact_id,
                link_url: result.url.clone(),
                link_qr: if result.qr.is_empty() {
                    None
                } else {
                    Some(result.qr.clone())
                },
                purpose: result.purpose.clone(),
                amount: result.amount.clone(),
                expires_at: config.expires_at.map(|t| t.naive_utc()),
                status: LinkStatus::Created.code(),
                notify_on_create: config.notify,
            })
            .await?;

        info!(
            reference_id = %stored.reference_id,
            pg_link_id = %stored.pg_link_id,
            gateway = %stored.gateway,
            "payment link persisted"
        );

        if config.notify {
            // Cashfree sends its own customer email when link_notify is
            // set; only the WhatsApp message is ours there.
            let send_email = gateway_name != GatewayName::Cashfree;
            self.notifications
                .payment_link_created(phone.as_deref(), email.as_deref(), &result, send_email)
                .await;
        }

        Ok(result)
    }

    pub async fn create_payout_link(
        &self,
        config: PayoutConfig,
        contact_id: i64,
        link_type: &str,
    ) -> Result<JsonValue, AppError> {
        let contact = self.require_contact(contact_id).await?;
        let reference_id = self.sequence.allocate(link_type).await?;
        let gateway = self.factory.active_gateway().await?;
        let gateway_name = gateway.name();

        let request = PayoutLinkRequest {
            reference_id: reference_id.clone(),
            amount: config.amount,
            currency: config.currency,
            purpose: config.purpose,
            description: config.description,
            recipient_name: contact.name,
            fund_account: config.fund_account,
        };

        // Payout responses are returned raw and not persisted; see
        // DESIGN.md for why the asymmetry with payment links is kept.
        let response = gateway.create_payout_link(request).await.map_err(|e| {
            error!(
                reference_id = %reference_id,
                gateway = %gateway_name,
                error = %e,
                "payout link creation failed at gateway"
            );
            AppError::from(e)
        })?;

        info!(reference_id = %reference_id, gateway = %gateway_name, "payout link created");
        Ok(response)
    }

    /// The configured `link_type -> prefix` map, for client display.
    pub async fn payment_types(&self) -> Result<HashMap<String, String>, AppError> {
        self.settings
            .json_map(keys::PAYMENT_LINK_ID_PREFIX)
            .await
            .map_err(|e| {
                AppError::new(AppErrorKind::Infrastructure(
                    InfrastructureError::Configuration {
                        message: format!("{}: {}", keys::PAYMENT_LINK_ID_PREFIX, e),
                    },
                ))
            })
    }

    async fn require_contact(&self, contact_id: i64) -> Result<Contact, AppError> {
        match self.contacts.find_by_id(contact_id).await? {
            Some(contact) => Ok(contact),
            None => {
                warn!(contact_id = contact_id, "contact not found or inactive");
                Err(AppError::new(AppErrorKind::Domain(
                    DomainError::ContactNotFound { contact_id },
                )))
            }
        }
    }

    async fn channel_value(
        &self,
        contact_id: i64,
        category: i16,
    ) -> Result<Option<String>, AppError> {
        Ok(self
            .contacts
            .find_channel(contact_id, category)
            .await?
            .map(|c| c.value))
    }
}

fn missing_channel(contact_id: i64, channel: &str) -> AppError {
    AppError::new(AppErrorKind::Domain(DomainError::MissingContactChannel {
        contact_id,
        channel: channel.to_string(),
    }))
}
