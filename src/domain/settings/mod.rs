//! Publish settings and repository contract

pub mod model;
pub mod repository;

pub use model::{PublishSettings, DEFAULT_SOURCE_ID_TEMPLATE};
pub use repository::SettingsRepository;
