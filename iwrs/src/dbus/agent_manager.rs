//! iwd AgentManager proxy.

use zbus::{Result, proxy};
use zvariant::ObjectPath;

/// Proxy for registering credential agents with iwd.
#[proxy(
    interface = "net.connman.iwd.AgentManager",
    default_service = "net.connman.iwd",
    default_path = "/net/connman/iwd"
)]
pub trait IwdAgentManager {
    /// Registers the agent exported at `path`.
    fn register_agent(&self, path: &ObjectPath<'_>) -> Result<()>;
}
