//! Unified error handling for the paylink backend
//!
//! Provides a single application error type with HTTP status mapping,
//! user-safe messages, and structured error codes for client handling.
//! Vendor/gateway internals never reach the HTTP client through these
//! messages; they are only logged.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine-readable error codes for programmatic handling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCode {
    // Domain errors (4xx)
    #[serde(rename = "LINK_NOT_FOUND")]
    LinkNotFound,
    #[serde(rename = "CONTACT_NOT_FOUND")]
    ContactNotFound,
    #[serde(rename = "MISSING_CONTACT_CHANNEL")]
    MissingContactChannel,
    #[serde(rename = "INVALID_LINK_TYPE")]
    InvalidLinkType,
    #[serde(rename = "INVALID_AMOUNT")]
    InvalidAmount,

    // Infrastructure errors (5xx)
    #[serde(rename = "DATABASE_ERROR")]
    DatabaseError,
    #[serde(rename = "CONFIGURATION_ERROR")]
    ConfigurationError,

    // External errors (502, 503)
    #[serde(rename = "GATEWAY_ERROR")]
    GatewayError,
    #[serde(rename = "GATEWAY_UNAVAILABLE")]
    GatewayUnavailable,

    // Generic
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError,
    #[serde(rename = "VALIDATION_ERROR")]
    ValidationError,
}

/// Domain-specific business logic errors
#[derive(Debug, Clone)]
pub enum DomainError {
    /// Payment link with the given reference doesn't exist
    LinkNotFound { reference_id: String },
    /// Contact doesn't exist or is inactive
    ContactNotFound { contact_id: i64 },
    /// Contact has no active channel of the required kind
    MissingContactChannel { contact_id: i64, channel: String },
    /// Link type has no configured reference prefix
    UnknownLinkType { link_type: String },
}

/// Infrastructure-level errors (database, configuration)
#[derive(Debug, Clone)]
pub enum InfrastructureError {
    /// Database connection or query failure
    Database { message: String, is_retryable: bool },
    /// Missing or invalid configuration
    Configuration { message: String },
}

/// External service errors (payment gateways, notification channels)
#[derive(Debug, Clone)]
pub enum ExternalError {
    /// Payment gateway (Cashfree, Razorpay) error
    Gateway {
        gateway: String,
        message: String,
        is_retryable: bool,
    },
}

/// Input validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    /// Invalid amount (format or value)
    InvalidAmount { amount: String, reason: String },
    /// Required field missing
    MissingField { field: String },
    /// Field value not acceptable
    InvalidField { field: String, reason: String },
}

/// Error kind taxonomy
#[derive(Debug, Clone)]
pub enum AppErrorKind {
    Domain(DomainError),
    Validation(ValidationError),
    Infrastructure(InfrastructureError),
    External(ExternalError),
}

/// Unified application error type
#[derive(Debug, Clone)]
pub struct AppError {
    pub kind: AppErrorKind,
    pub request_id: Option<String>,
}

impl AppError {
    pub fn new(kind: AppErrorKind) -> Self {
        Self {
            kind,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn status_code(&self) -> u16 {
        match &self.kind {
            AppErrorKind::Domain(e) => match e {
                DomainError::LinkNotFound { .. } => 404,
                DomainError::ContactNotFound { .. } => 404,
                DomainError::MissingContactChannel { .. } => 422,
                DomainError::UnknownLinkType { .. } => 400,
            },
            AppErrorKind::Validation(_) => 400,
            AppErrorKind::Infrastructure(e) => match e {
                InfrastructureError::Database { .. } => 500,
                InfrastructureError::Configuration { .. } => 500,
            },
            AppErrorKind::External(_) => 502,
        }
    }

    pub fn error_code(&self) -> ErrorCode {
        match &self.kind {
            AppErrorKind::Domain(e) => match e {
                DomainError::LinkNotFound { .. } => ErrorCode::LinkNotFound,
                DomainError::ContactNotFound { .. } => ErrorCode::ContactNotFound,
                DomainError::MissingContactChannel { .. } => ErrorCode::MissingContactChannel,
                DomainError::UnknownLinkType { .. } => ErrorCode::InvalidLinkType,
            },
            AppErrorKind::Validation(e) => match e {
                ValidationError::InvalidAmount { .. } => ErrorCode::InvalidAmount,
                _ => ErrorCode::ValidationError,
            },
            AppErrorKind::Infrastructure(e) => match e {
                InfrastructureError::Database { .. } => ErrorCode::DatabaseError,
                InfrastructureError::Configuration { .. } => ErrorCode::ConfigurationError,
            },
            AppErrorKind::External(_) => ErrorCode::GatewayError,
        }
    }

    /// User-facing message. Deliberately generic for infrastructure and
    /// gateway failures.
    pub fn user_message(&self) -> String {
        match &self.kind {
            AppErrorKind::Domain(e) => match e {
                DomainError::LinkNotFound { reference_id } => {
                    format!("Payment link {} not found", reference_id)
                }
                DomainError::ContactNotFound { contact_id } => {
                    format!("Contact {} not found", contact_id)
                }
                DomainError::MissingContactChannel {
                    contact_id,
                    channel,
                } => format!("Contact {} has no active {} on file", contact_id, channel),
                DomainError::UnknownLinkType { link_type } => {
                    format!("Unknown link type: {}", link_type)
                }
            },
            AppErrorKind::Validation(e) => match e {
                ValidationError::InvalidAmount { reason, .. } => {
                    format!("Invalid amount: {}", reason)
                }
                ValidationError::MissingField { field } => format!("{} is required", field),
                ValidationError::InvalidField { field, reason } => {
                    format!("Invalid {}: {}", field, reason)
                }
            },
            AppErrorKind::Infrastructure(_) => "Something went wrong".to_string(),
            AppErrorKind::External(_) => "Something went wrong".to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match &self.kind {
            AppErrorKind::Domain(_) | AppErrorKind::Validation(_) => false,
            AppErrorKind::Infrastructure(e) => {
                matches!(
                    e,
                    InfrastructureError::Database {
                        is_retryable: true,
                        ..
                    }
                )
            }
            AppErrorKind::External(ExternalError::Gateway { is_retryable, .. }) => *is_retryable,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            AppErrorKind::Domain(e) => write!(f, "domain error: {:?}", e),
            AppErrorKind::Validation(e) => write!(f, "validation error: {:?}", e),
            AppErrorKind::Infrastructure(e) => write!(f, "infrastructure error: {:?}", e),
            AppErrorKind::External(e) => write!(f, "external error: {:?}", e),
        }
    }
}

impl std::error::Error for AppError {}

impl From<crate::database::error::DatabaseError> for AppError {
    fn from(err: crate::database::error::DatabaseError) -> Self {
        use crate::database::error::DatabaseError;
        match err {
            DatabaseError::NotFound { entity, id } => {
                AppError::new(AppErrorKind::Infrastructure(InfrastructureError::Database {
                    message: format!("{} {} not found", entity, id),
                    is_retryable: false,
                }))
            }
            DatabaseError::Connection { message } => {
                AppError::new(AppErrorKind::Infrastructure(InfrastructureError::Database {
                    message,
                    is_retryable: true,
                }))
            }
            DatabaseError::Query { message, retryable } => {
                AppError::new(AppErrorKind::Infrastructure(InfrastructureError::Database {
                    message,
                    is_retryable: retryable,
                }))
            }
        }
    }
}

impl From<crate::gateways::error::GatewayError> for AppError {
    fn from(err: crate::gateways::error::GatewayError) -> Self {
        use crate::gateways::error::GatewayError;
        match err {
            GatewayError::Configuration { message } => AppError::new(AppErrorKind::Infrastructure(
                InfrastructureError::Configuration { message },
            )),
            GatewayError::Validation { message, field } => {
                AppError::new(AppErrorKind::Validation(ValidationError::InvalidField {
                    field: field.unwrap_or_else(|| "request".to_string()),
                    reason: message,
                }))
            }
            GatewayError::Provider {
                gateway, message, ..
            } => AppError::new(AppErrorKind::External(ExternalError::Gateway {
                gateway,
                message,
                is_retryable: false,
            })),
            GatewayError::Transport { message } => {
                AppError::new(AppErrorKind::External(ExternalError::Gateway {
                    gateway: "transport".to_string(),
                    message,
                    is_retryable: true,
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_client_status_codes() {
        let err = AppError::new(AppErrorKind::Domain(DomainError::LinkNotFound {
            reference_id: "INV-2425-000001".to_string(),
        }));
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.error_code(), ErrorCode::LinkNotFound);

        let err = AppError::new(AppErrorKind::Domain(DomainError::MissingContactChannel {
            contact_id: 7,
            channel: "phone".to_string(),
        }));
        assert_eq!(err.status_code(), 422);
    }

    #[test]
    fn gateway_errors_do_not_leak_internals() {
        let err = AppError::new(AppErrorKind::External(ExternalError::Gateway {
            gateway: "cashfree".to_string(),
            message: "x-client-secret rejected".to_string(),
            is_retryable: false,
        }));
        assert_eq!(err.status_code(), 502);
        assert_eq!(err.user_message(), "Something went wrong");
    }

    #[test]
    fn transport_failures_are_retryable() {
        let err: AppError = crate::gateways::error::GatewayError::Transport {
            message: "connect timeout".to_string(),
        }
        .into();
        assert!(err.is_retryable());
    }
}
