//! Request handlers.

pub mod accounts;
pub mod activity;
pub mod notes;
pub mod profile;
