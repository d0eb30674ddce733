//! HTTP routes for landgate

pub mod health;
pub mod helpers;
pub mod land;
pub mod participator;

pub use health::{health_check, readiness_check, version_info};
pub use land::handle_land_request;
pub use participator::handle_participator_request;
