pub mod email;
pub mod http;
pub mod payments;
pub mod persistence;
