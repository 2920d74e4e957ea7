//! Type definitions and constants.
//!
//! This module contains iwd constants shared by the object graph and the
//! D-Bus layer.

pub(crate) mod constants;
