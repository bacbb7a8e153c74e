//! Step definitions for Cucumber scenarios

pub mod api_key_steps;
pub mod common_steps;
pub mod oauth_steps;
pub mod tenant_steps;
