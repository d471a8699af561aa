//! HTTP handlers for resource CRUD and demo content.

pub mod demo;
pub mod resource;
