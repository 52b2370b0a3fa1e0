//! HTTP route handlers.

pub mod observability;
pub mod orders;
pub mod restaurants;
