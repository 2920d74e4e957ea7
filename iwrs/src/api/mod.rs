//! Public API module.
//!
//! This module contains the high-level user-facing API for the `iwrs` crate.

pub mod iwd_client;
pub mod models;
