//! A Rust client library for iwd, the Linux wireless daemon, over D-Bus.
//!
//! This crate keeps an in-memory mirror of iwd's objects and provides a
//! high-level async API on top of it:
//!
//! - Listing adapters, devices, visible networks and known networks
//! - Scanning, with concurrent callers sharing one scan
//! - Connecting to visible networks, with credentials handed to iwd by a
//!   built-in agent
//! - Waiting for station state changes
//!
//! # Example
//!
//! ```no_run
//! use iwrs::{ClientConfig, IwdClient, NetworkConfig, StationState};
//!
//! # async fn example() -> iwrs::Result<()> {
//! let config = ClientConfig::new().with_network(NetworkConfig::psk("MyNetwork", "password123"));
//! let client = IwdClient::with_config(config).await?;
//!
//! for device in client.device_paths().await? {
//!     // Scan and wait for the network list to settle
//!     client.scan(&device, true).await?;
//!
//!     // Connect and wait for the outcome
//!     if client.connect(&device, "MyNetwork", true).await? == Some(StationState::Connected) {
//!         println!("{device} connected");
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! All operations return `Result<T, IwdError>`. Named errors from the daemon
//! are kept as [`RemoteError`]s; lookups of objects the mirror does not hold
//! fail with [`IwdError::NotFound`].
//!
//! # Signal-Based Mirroring
//!
//! iwd does not answer `Scan` or `Connect` with their outcome. The library
//! subscribes to the daemon's `InterfacesAdded`, `InterfacesRemoved` and
//! `PropertiesChanged` signals, applies them to the mirror in arrival order,
//! and completes pending operations when the matching property change comes
//! in. Nothing is polled.
//!
//! # Logging
//!
//! This crate uses the [`log`](https://docs.rs/log) facade for logging. To see
//! log output, add a logging implementation like `env_logger`. For example:
//!
//! ```no_run,ignore
//! env_logger::init();
//! // ...
//! ```

// Internal implementation modules
mod core;
mod dbus;
mod monitoring;
mod types;
mod util;

// Public API modules
pub mod api;

// Re-exported public API
pub use api::iwd_client::IwdClient;
pub use api::models::{
    Adapter, ClientConfig, Device, InterfaceMap, IwdError, KnownNetwork, ManagedObjects, Network,
    NetworkConfig, PropertyMap, RemoteError, RemoteErrorKind, StationState,
};
pub use crate::core::agent::{AgentError, CredentialResolver};
pub use crate::core::graph::StatusGraph;
pub use crate::core::router::ObjectEvent;
pub use dbus::{DbusTransport, Transport};

/// A specialized `Result` type for iwd operations.
pub type Result<T> = std::result::Result<T, IwdError>;
