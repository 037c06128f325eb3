use crate::database::gateway_config_repository::GatewayConfigRepository;
use crate::database::settings_repository::{keys, SettingsRepository};
use crate::gateways::cashfree::CashfreeGateway;
use crate::gateways::error::{GatewayError, GatewayResult};
use crate::gateways::http::GatewayHttpClient;
use crate::gateways::razorpay::RazorpayGateway;
use crate::gateways::types::GatewayName;
use crate::gateways::LinkGateway;
use std::str::FromStr;
use std::sync::Arc;

/// Registry of the known gateway adapters. The active one is chosen by the
/// `activePaymentGateway` setting on every resolution, so flipping the
/// setting takes effect on the next request without a restart.
pub struct GatewayFactory {
    gateway_configs: Arc<GatewayConfigRepository>,
    settings: Arc<SettingsRepository>,
    http: GatewayHttpClient,
    sandbox: bool,
}

impl GatewayFactory {
    pub fn new(
        gateway_configs: Arc<GatewayConfigRepository>,
        settings: Arc<SettingsRepository>,
        http: GatewayHttpClient,
        sandbox: bool,
    ) -> Self {
        Self {
            gateway_configs,
            settings,
            http,
            sandbox,
        }
    }

    pub fn get(&self, name: GatewayName) -> Box<dyn LinkGateway> {
        match name {
            GatewayName::Cashfree => Box::new(CashfreeGateway::new(
                self.gateway_configs.clone(),
                self.http.clone(),
                self.sandbox,
            )),
            GatewayName::Razorpay => Box::new(RazorpayGateway::new(
                self.gateway_configs.clone(),
                self.http.clone(),
                self.sandbox,
            )),
        }
    }

    pub async fn active_gateway(&self) -> GatewayResult<Box<dyn LinkGateway>> {
        let configured = self
            .settings
            .require(keys::ACTIVE_PAYMENT_GATEWAY)
            .await
            .map_err(|_| GatewayError::Configuration {
                message: format!("setting {} is not configured", keys::ACTIVE_PAYMENT_GATEWAY),
            })?;

        let name = GatewayName::from_str(&configured)?;
        Ok(self.get(name))
    }
}
