//! CrudService: generic CRUD over the data access layer.

mod crud;
mod validation;
pub use crud::CrudService;
pub use validation::{is_truthy, RequestValidator};
