use crate::gateways::error::{GatewayError, GatewayResult};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::warn;

/// Shared outbound HTTP client for gateway adapters.
///
/// Every request carries an explicit timeout. Transport failures, 5xx and
/// 429 responses are retried with exponential backoff up to `max_retries`;
/// definitive provider rejections (other 4xx) are returned immediately.
#[derive(Clone)]
pub struct GatewayHttpClient {
    client: Client,
    timeout: Duration,
    max_retries: u32,
}

impl GatewayHttpClient {
    pub fn new(timeout: Duration, max_retries: u32) -> GatewayResult<Self> {
        let client =
            Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| GatewayError::Transport {
                    message: format!("failed to initialize HTTP client: {}", e),
                })?;

        Ok(Self {
            client,
            timeout,
            max_retries,
        })
    }

    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        url: &str,
        gateway: &str,
        basic_auth: Option<(&str, &str)>,
        body: Option<&JsonValue>,
        additional_headers: &[(&str, &str)],
    ) -> GatewayResult<T> {
        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            let mut request = self.client.request(method.clone(), url);
            request = request.timeout(self.timeout);

            if let Some((user, pass)) = basic_auth {
                request = request.basic_auth(user, Some(pass));
            }
            for (k, v) in additional_headers {
                request = request.header(*k, *v);
            }
            if let Some(payload) = body {
                request = request.json(payload);
            }

            let response = request
                .send()
                .await
                .map_err(|e| GatewayError::Transport {
                    message: format!("{} request failed: {}", gateway, e),
                });

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    let text = resp.text().await.unwrap_or_default();
                    if status.is_success() {
                        return serde_json::from_str::<T>(&text).map_err(|e| {
                            GatewayError::Provider {
                                gateway: gateway.to_string(),
                                message: format!("invalid provider JSON response: {}", e),
                                code: None,
                            }
                        });
                    }

                    if (status.as_u16() == 429 || status.is_server_error())
                        && attempt < self.max_retries
                    {
                        warn!(
                            gateway = gateway,
                            status = %status,
                            attempt = attempt + 1,
                            "gateway returned retryable status, backing off"
                        );
                        tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
                        continue;
                    }

                    if status.is_server_error() || status.as_u16() == 429 {
                        return Err(GatewayError::Transport {
                            message: format!("{} HTTP {}: {}", gateway, status, text),
                        });
                    }

                    return Err(GatewayError::Provider {
                        gateway: gateway.to_string(),
                        message: format!("HTTP {}: {}", status, text),
                        code: Some(status.as_u16().to_string()),
                    });
                }
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.max_retries {
                        tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
                        continue;
                    }
                }
            }
        }

        Err(last_error.unwrap_or(GatewayError::Transport {
            message: format!("{} request failed", gateway),
        }))
    }
}

/// Verify a base64-encoded HMAC-SHA256 signature over the raw payload.
pub fn verify_hmac_sha256_base64(payload: &[u8], secret: &str, signature: &str) -> bool {
    use base64::Engine;
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(v) => v,
        Err(_) => return false,
    };
    mac.update(payload);
    let computed = base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());
    secure_eq(computed.as_bytes(), signature.trim().as_bytes())
}

pub fn secure_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0_u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secure_eq_behaves_correctly() {
        assert!(secure_eq(b"abc", b"abc"));
        assert!(!secure_eq(b"abc", b"abd"));
        assert!(!secure_eq(b"abc", b"ab"));
    }

    #[test]
    fn hmac_verification_detects_invalid_signature() {
        let payload = br#"{"type":"PAYMENT_LINK_EVENT"}"#;
        assert!(!verify_hmac_sha256_base64(
            payload,
            "secret",
            "not-a-valid-signature"
        ));
    }

    #[test]
    fn hmac_verification_accepts_matching_signature() {
        use base64::Engine;
        use hmac::{Hmac, Mac};
        use sha2::Sha256;

        let payload = br#"{"type":"PAYMENT_LINK_EVENT"}"#;
        let mut mac = Hmac::<Sha256>::new_from_slice(b"secret").unwrap();
        mac.update(payload);
        let signature =
            base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());

        assert!(verify_hmac_sha256_base64(payload, "secret", &signature));
    }
}
