//! Authorization decision types

pub mod model;

pub use model::{AuthorizationInfo, AuthorizationStatus};
