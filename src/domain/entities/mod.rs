pub mod payment;
pub mod payment_provider;
pub mod plan;
pub mod subscription;
pub mod trial;
pub mod webhook;
