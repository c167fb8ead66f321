//! Test utilities shared by unit and HTTP-level tests.
//!
//! - factories for valid fixtures
//! - in-memory repositories, provider and email doubles
//! - `TestAppStateBuilder` for router tests

mod app_state_builder;
mod factories;
mod provider_mocks;
mod repo_mocks;

pub use app_state_builder::*;
pub use factories::*;
pub use provider_mocks::*;
pub use repo_mocks::*;
