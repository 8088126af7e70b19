//! HTTP route handlers.

pub mod customers;
pub mod orders;
pub mod scenarios;
pub mod status;
