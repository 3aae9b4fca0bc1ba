//! # webnotes_core
//!
//! Core domain logic for Webnotes: session tokens, the session protocol,
//! note reconciliation and the store it runs against.

pub mod activity;
pub mod auth;
pub mod migrate;
pub mod models;
pub mod notes;
pub mod store;
pub mod uuid;
