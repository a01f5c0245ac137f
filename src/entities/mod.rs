pub mod group;
pub mod group_service;
pub mod service;

pub use group_service::HealthStatus;
