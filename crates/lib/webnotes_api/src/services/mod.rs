//! Business logic services.

pub mod cookies;
