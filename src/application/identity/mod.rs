//! Identity and settings resolution

pub mod service;

pub use service::{create_identity_service, IdentityService, SharedIdentityService};
