//! iwd Network proxy.

use zbus::{Result, proxy};
use zvariant::OwnedObjectPath;

/// Proxy for a network visible to a station.
#[proxy(
    interface = "net.connman.iwd.Network",
    default_service = "net.connman.iwd"
)]
pub trait IwdNetwork {
    /// Connects the owning station to this network.
    ///
    /// iwd asks the registered agent for a passphrase if it needs one.
    /// Fails with `net.connman.iwd.Aborted` when a racing request preempts it.
    fn connect(&self) -> Result<()>;

    /// The SSID.
    #[zbus(property)]
    fn name(&self) -> Result<String>;

    /// Whether the station is connected to this network.
    #[zbus(property)]
    fn connected(&self) -> Result<bool>;

    /// Path of the owning device.
    #[zbus(property)]
    fn device(&self) -> Result<OwnedObjectPath>;

    /// Security type (`open`, `psk`, `8021x`).
    #[zbus(property, name = "Type")]
    fn network_type(&self) -> Result<String>;
}
