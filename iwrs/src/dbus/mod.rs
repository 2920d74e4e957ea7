//! D-Bus proxy interfaces for iwd.
//!
//! This module contains low-level D-Bus proxy definitions for communicating
//! with iwd over the system bus, and the [`Transport`] seam built on them.

mod agent_manager;
mod network;
mod station;
pub(crate) mod transport;

pub(crate) use agent_manager::IwdAgentManagerProxy;
pub(crate) use network::IwdNetworkProxy;
pub(crate) use station::IwdStationProxy;
pub use transport::{DbusTransport, Transport};
