use thiserror::Error;

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Provider error: gateway={gateway}, message={message}")]
    Provider {
        gateway: String,
        message: String,
        code: Option<String>,
    },

    #[error("Transport error: {message}")]
    Transport { message: String },
}

impl GatewayError {
    /// Only transport failures are safe to retry; a provider rejection is a
    /// definitive answer and configuration problems need operator action.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Transport { .. })
    }

    pub fn http_status_code(&self) -> u16 {
        match self {
            GatewayError::Configuration { .. } => 500,
            GatewayError::Validation { .. } => 400,
            GatewayError::Provider { .. } => 502,
            GatewayError::Transport { .. } => 503,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            GatewayError::Configuration { .. } => "Something went wrong".to_string(),
            GatewayError::Validation { message, .. } => message.clone(),
            GatewayError::Provider { .. } => "Something went wrong".to_string(),
            GatewayError::Transport { .. } => {
                "Payment gateway is temporarily unavailable".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_flags_are_set() {
        assert!(GatewayError::Transport {
            message: "timeout".to_string()
        }
        .is_retryable());
        assert!(!GatewayError::Provider {
            gateway: "cashfree".to_string(),
            message: "link_id already exists".to_string(),
            code: Some("link_exists".to_string()),
        }
        .is_retryable());
        assert!(!GatewayError::Configuration {
            message: "no active credentials".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn provider_errors_hide_vendor_detail_from_users() {
        let err = GatewayError::Provider {
            gateway: "razorpay".to_string(),
            message: "BAD_REQUEST_ERROR: key_id invalid".to_string(),
            code: None,
        };
        assert_eq!(err.user_message(), "Something went wrong");
        assert_eq!(err.http_status_code(), 502);
    }
}
