//! iwd Station proxy.

use zbus::{Result, proxy};
use zvariant::OwnedObjectPath;

/// Proxy for the iwd station interface.
///
/// Lives on the same object as the device. Scan and connect requests return
/// as soon as iwd accepts them; their outcome is only visible through the
/// `Scanning` and `State` properties.
#[proxy(
    interface = "net.connman.iwd.Station",
    default_service = "net.connman.iwd"
)]
pub trait IwdStation {
    /// Starts a scan. Fails with `net.connman.iwd.InProgress` if one is running.
    fn scan(&self) -> Result<()>;

    /// Station state (`connected`, `disconnected`, `connecting`, ...).
    #[zbus(property)]
    fn state(&self) -> Result<String>;

    /// Whether a scan is running.
    #[zbus(property)]
    fn scanning(&self) -> Result<bool>;

    /// Path of the connected network; absent when disconnected.
    #[zbus(property)]
    fn connected_network(&self) -> Result<OwnedObjectPath>;
}
