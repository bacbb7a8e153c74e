//! Data models
//!
//! Users, tenants ("clients") with their API key records, merchant stores,
//! platform sessions, and the identities produced by credential verification.

pub mod identity;
pub mod session;
pub mod store;
pub mod tenant;
pub mod user;

pub use identity::*;
pub use session::*;
pub use store::*;
pub use tenant::*;
pub use user::*;
