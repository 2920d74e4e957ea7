//! The seam between the object graph and the bus.
//!
//! Everything the client needs from iwd beyond signals goes through
//! [`Transport`]: one enumeration call and three method calls. The D-Bus
//! implementation is [`DbusTransport`]; tests substitute an in-memory one.

use async_trait::async_trait;
use log::debug;
use std::fmt::Debug;
use zbus::Connection;
use zbus::fdo::ObjectManagerProxy;
use zvariant::ObjectPath;

use crate::api::models::{IwdError, ManagedObjects};
use crate::dbus::{IwdAgentManagerProxy, IwdNetworkProxy, IwdStationProxy};
use crate::types::constants::bus;
use crate::Result;

/// Requests the client issues to the daemon.
///
/// Failed method calls must surface as [`IwdError::Remote`] carrying the
/// D-Bus error name, so that `InProgress` and `Aborted` can be told apart.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Enumerates every object the daemon exports.
    async fn managed_objects(&self) -> Result<ManagedObjects>;

    /// Calls `Station.Scan` on the device at `device`.
    async fn scan(&self, device: &str) -> Result<()>;

    /// Calls `Network.Connect` on the network at `network`.
    async fn connect(&self, network: &str) -> Result<()>;

    /// Calls `AgentManager.RegisterAgent` for an agent exported at `agent_path`.
    async fn register_agent(&self, agent_path: &str) -> Result<()>;
}

/// [`Transport`] over a zbus connection.
#[derive(Debug, Clone)]
pub struct DbusTransport {
    conn: Connection,
    service: String,
}

impl DbusTransport {
    /// Wraps a connection, addressing the daemon at bus name `service`.
    pub fn new(conn: Connection, service: impl Into<String>) -> Self {
        Self {
            conn,
            service: service.into(),
        }
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// The daemon's bus name.
    pub fn service(&self) -> &str {
        &self.service
    }
}

fn object_path(path: &str) -> Result<ObjectPath<'_>> {
    ObjectPath::try_from(path).map_err(|e| IwdError::Dbus(e.into()))
}

#[async_trait]
impl Transport for DbusTransport {
    async fn managed_objects(&self) -> Result<ManagedObjects> {
        let manager = ObjectManagerProxy::builder(&self.conn)
            .destination(self.service.as_str())?
            .path(bus::ROOT_PATH)?
            .build()
            .await?;

        let objects = manager.get_managed_objects().await?;
        debug!("Enumerated {} objects from {}", objects.len(), self.service);

        Ok(objects
            .into_iter()
            .map(|(path, interfaces)| {
                let interfaces = interfaces
                    .into_iter()
                    .map(|(name, props)| (name.to_string(), props))
                    .collect();
                (path.to_string(), interfaces)
            })
            .collect())
    }

    async fn scan(&self, device: &str) -> Result<()> {
        let station = IwdStationProxy::builder(&self.conn)
            .destination(self.service.as_str())?
            .path(object_path(device)?)?
            .build()
            .await?;
        station.scan().await?;
        Ok(())
    }

    async fn connect(&self, network: &str) -> Result<()> {
        let net = IwdNetworkProxy::builder(&self.conn)
            .destination(self.service.as_str())?
            .path(object_path(network)?)?
            .build()
            .await?;
        net.connect().await?;
        Ok(())
    }

    async fn register_agent(&self, agent_path: &str) -> Result<()> {
        let manager = IwdAgentManagerProxy::builder(&self.conn)
            .destination(self.service.as_str())?
            .path(bus::AGENT_MANAGER_PATH)?
            .build()
            .await?;
        manager.register_agent(&object_path(agent_path)?).await?;
        debug!("Registered agent at {agent_path}");
        Ok(())
    }
}
