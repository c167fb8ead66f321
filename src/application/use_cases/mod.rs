pub mod provider_registry;
pub mod reconciler;
pub mod subscription;
pub mod webhook;
