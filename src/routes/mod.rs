//! Route tables: resource CRUD, health, and demo pages.

pub mod common;
pub mod resource;

pub use common::{common_routes, demo_routes};
pub use resource::resource_routes;
