use crate::gateways::types::LinkResult;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationChannel {
    WhatsApp,
    Email,
}

impl std::fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationChannel::WhatsApp => write!(f, "whatsapp"),
            NotificationChannel::Email => write!(f, "email"),
        }
    }
}

/// Outbound message sender. The concrete send paths (WhatsApp provider,
/// SMTP) are owned by the wider system; this service only needs
/// success/failure back.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn channel(&self) -> NotificationChannel;

    async fn notify(&self, recipient: &str, template: &str, params: &JsonValue) -> bool;
}

/// Placeholder sender that records the outbound message in the logs.
pub struct LoggingSender {
    channel: NotificationChannel,
}

impl LoggingSender {
    pub fn new(channel: NotificationChannel) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl Notifier for LoggingSender {
    fn channel(&self) -> NotificationChannel {
        self.channel
    }

    async fn notify(&self, recipient: &str, template: &str, params: &JsonValue) -> bool {
        info!(
            channel = %self.channel,
            recipient = recipient,
            template = template,
            params = %params,
            "notification dispatched"
        );
        true
    }
}

/// Best-effort notification fan-out after link creation. Failures are
/// logged and never affect the created link.
pub struct NotificationService {
    whatsapp: Box<dyn Notifier>,
    email: Box<dyn Notifier>,
}

impl NotificationService {
    pub fn new(whatsapp: Box<dyn Notifier>, email: Box<dyn Notifier>) -> Self {
        Self { whatsapp, email }
    }

    pub fn with_logging_senders() -> Self {
        Self::new(
            Box::new(LoggingSender::new(NotificationChannel::WhatsApp)),
            Box::new(LoggingSender::new(NotificationChannel::Email)),
        )
    }

    pub async fn payment_link_created(
        &self,
        phone: Option<&str>,
        email: Option<&str>,
        link: &LinkResult,
        send_email: bool,
    ) {
        let params = serde_json::json!({
            "reference_id": link.reference_id,
            "url": link.url,
            "amount": link.amount.to_string(),
            "purpose": link.purpose,
        });

        if let Some(phone) = phone {
            if !self
                .whatsapp
                .notify(phone, "payment_link_created", &params)
                .await
            {
                warn!(
                    reference_id = %link.reference_id,
                    recipient = phone,
                    "whatsapp notification failed"
                );
            }
        }

        if send_email {
            if let Some(email) = email {
                if !self
                    .email
                    .notify(email, "payment_link_created", &params)
                    .await
                {
                    warn!(
                        reference_id = %link.reference_id,
                        recipient = email,
                        "email notification failed"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateways::types::GatewayName;
    use bigdecimal::BigDecimal;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSender {
        channel: NotificationChannel,
        calls: Arc<AtomicUsize>,
        succeed: bool,
    }

    #[async_trait]
    impl Notifier for CountingSender {
        fn channel(&self) -> NotificationChannel {
            self.channel
        }

        async fn notify(&self, _recipient: &str, _template: &str, _params: &JsonValue) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.succeed
        }
    }

    fn link() -> LinkResult {
        LinkResult {
            pg_link_id: "pg_1".to_string(),
            reference_id: "INV-2425-000042".to_string(),
            gateway: GatewayName::Cashfree,
            url: "https://pay.example.com/l/1".to_string(),
            qr: String::new(),
            purpose: "Invoice #1".to_string(),
            amount: BigDecimal::from(500),
        }
    }

    #[tokio::test]
    async fn email_is_skipped_when_not_requested() {
        let whatsapp_calls = Arc::new(AtomicUsize::new(0));
        let email_calls = Arc::new(AtomicUsize::new(0));
        let service = NotificationService::new(
            Box::new(CountingSender {
                channel: NotificationChannel::WhatsApp,
                calls: whatsapp_calls.clone(),
                succeed: true,
            }),
            Box::new(CountingSender {
                channel: NotificationChannel::Email,
                calls: email_calls.clone(),
                succeed: true,
            }),
        );

        service
            .payment_link_created(
                Some("+919800000001"),
                Some("asha@example.com"),
                &link(),
                false,
            )
            .await;

        assert_eq!(whatsapp_calls.load(Ordering::SeqCst), 1);
        assert_eq!(email_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn sender_failure_does_not_propagate() {
        let calls = Arc::new(AtomicUsize::new(0));
        let service = NotificationService::new(
            Box::new(CountingSender {
                channel: NotificationChannel::WhatsApp,
                calls: calls.clone(),
                succeed: false,
            }),
            Box::new(LoggingSender::new(NotificationChannel::Email)),
        );

        // A failing sender only logs; the call itself completes.
        service
            .payment_link_created(Some("+919800000001"), None, &link(), false)
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
