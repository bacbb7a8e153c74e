//! Common test utilities and helpers
//!
//! This module provides shared test infrastructure including:
//! - Test configuration and database setup
//! - Signing helpers and a fake platform token exchange
//! - API test client

pub mod fixtures;
pub mod test_app;

pub use fixtures::*;
pub use test_app::*;
