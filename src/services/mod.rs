pub mod notification;
pub mod orchestrator;
pub mod reconciler;
pub mod sequence;
