use crate::gateways::error::GatewayResult;
use crate::gateways::types::{CreateLinkRequest, GatewayName, LinkResult, PayoutLinkRequest};
use async_trait::async_trait;
use serde_json::Value as JsonValue;

/// The gateway-agnostic contract the orchestrator programs against.
///
/// Implementations translate the canonical request into their vendor's wire
/// shape and normalize the response back; no vendor field name crosses this
/// boundary. Payout responses are returned raw (see DESIGN.md).
#[async_trait]
pub trait LinkGateway: Send + Sync {
    async fn create_payment_link(&self, request: CreateLinkRequest) -> GatewayResult<LinkResult>;

    async fn create_payout_link(&self, request: PayoutLinkRequest) -> GatewayResult<JsonValue>;

    fn name(&self) -> GatewayName;
}
