pub mod links;
pub mod webhooks;
