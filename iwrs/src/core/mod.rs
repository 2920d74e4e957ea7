//! Core internal logic for mirroring iwd and driving its operations.
//!
//! This module contains the object graph, the event router that keeps it
//! current, the session task that owns it, and the scan, connect and
//! credential-agent logic layered on top.

pub(crate) mod agent;
pub(crate) mod connection;
pub(crate) mod graph;
pub(crate) mod router;
pub(crate) mod scan;
pub(crate) mod session;
pub(crate) mod state_wait;
