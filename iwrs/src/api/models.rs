use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt::{Display, Formatter};
use thiserror::Error;
use zvariant::OwnedValue;

use crate::core::state_wait::DeviceWaits;
use crate::types::constants::{bus, remote_error, station_state};

/// Properties of one interface, keyed by property name.
pub type PropertyMap = HashMap<String, OwnedValue>;

/// Interfaces of one object, keyed by interface name (the type tag).
pub type InterfaceMap = HashMap<String, PropertyMap>;

/// A full object enumeration, keyed by object path.
///
/// This is the shape returned by `org.freedesktop.DBus.ObjectManager.GetManagedObjects`.
pub type ManagedObjects = HashMap<String, InterfaceMap>;

/// Station state as reported by iwd's `State` property.
///
/// `Connected` and `Disconnected` are the terminal states of a connect attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum StationState {
    /// Not associated with any network.
    Disconnected,
    /// A connect attempt is in progress.
    Connecting,
    /// Associated and configured.
    Connected,
    /// Tearing down the current association.
    Disconnecting,
    /// Moving to a different access point of the same network.
    Roaming,
    /// A state string not mapped to a specific variant.
    Other(String),
}

impl StationState {
    /// Returns `true` for states that end a connect attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Connected | Self::Disconnected)
    }
}

impl From<&str> for StationState {
    fn from(state: &str) -> Self {
        match state {
            station_state::DISCONNECTED => Self::Disconnected,
            station_state::CONNECTING => Self::Connecting,
            station_state::CONNECTED => Self::Connected,
            station_state::DISCONNECTING => Self::Disconnecting,
            station_state::ROAMING => Self::Roaming,
            other => Self::Other(other.to_string()),
        }
    }
}

impl Display for StationState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "{}", station_state::DISCONNECTED),
            Self::Connecting => write!(f, "{}", station_state::CONNECTING),
            Self::Connected => write!(f, "{}", station_state::CONNECTED),
            Self::Disconnecting => write!(f, "{}", station_state::DISCONNECTING),
            Self::Roaming => write!(f, "{}", station_state::ROAMING),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

/// A wireless radio exposed by iwd.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Adapter {
    /// D-Bus object path, e.g. `/net/connman/iwd/0`.
    pub path: String,
    /// Whether the radio is powered.
    pub powered: bool,
    /// Hardware model, if reported.
    pub model: Option<String>,
    /// Hardware vendor, if reported.
    pub vendor: Option<String>,
    /// Adapter name, e.g. `phy0`.
    pub name: String,
    /// Modes the radio supports (`station`, `ap`, `ad-hoc`).
    pub supported_modes: BTreeSet<String>,
    /// Devices on this adapter, keyed by object path.
    pub devices: HashMap<String, Device>,
}

/// A network interface on an [`Adapter`], with its station state.
///
/// Besides the mirrored properties, a device holds the pending wait-handles
/// for scan, connect and state-change operations. Those are not part of its
/// identity and are ignored by equality.
#[derive(Debug, Serialize)]
pub struct Device {
    /// D-Bus object path, e.g. `/net/connman/iwd/0/3`.
    pub path: String,
    /// Interface name, e.g. `wlan0`.
    pub name: String,
    /// Hardware (MAC) address.
    pub address: String,
    /// Whether the device is powered.
    pub powered: bool,
    /// Object path of the owning adapter.
    pub adapter: String,
    /// Operating mode (`station`, `ap`, `ad-hoc`).
    pub mode: String,
    /// Networks currently visible to the device, in discovery order.
    pub networks: Vec<Network>,
    /// Station state, `None` until iwd reports one.
    pub state: Option<StationState>,
    #[serde(skip)]
    pub(crate) waits: DeviceWaits,
}

impl Device {
    /// Whether the station is connected.
    pub fn is_connected(&self) -> bool {
        self.state == Some(StationState::Connected)
    }

    /// Looks up a visible network by object path.
    pub fn network_by_path(&self, path: &str) -> Option<&Network> {
        self.networks.iter().find(|n| n.path == path)
    }

    /// Looks up a visible network by SSID.
    pub fn network_by_name(&self, name: &str) -> Option<&Network> {
        self.networks.iter().find(|n| n.name == name)
    }

    /// Whether a scan issued through this library has not finished yet.
    pub fn has_pending_scan(&self) -> bool {
        self.waits.scan_terminated.is_pending()
    }

    /// Whether a connect issued through this library has not resolved yet.
    pub fn has_pending_connect(&self) -> bool {
        self.waits.connect_outcome.is_pending()
    }
}

/// Clones the mirrored properties only; the clone has no pending waits.
impl Clone for Device {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            name: self.name.clone(),
            address: self.address.clone(),
            powered: self.powered,
            adapter: self.adapter.clone(),
            mode: self.mode.clone(),
            networks: self.networks.clone(),
            state: self.state.clone(),
            waits: DeviceWaits::default(),
        }
    }
}

impl PartialEq for Device {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
            && self.name == other.name
            && self.address == other.address
            && self.powered == other.powered
            && self.adapter == other.adapter
            && self.mode == other.mode
            && self.networks == other.networks
            && self.state == other.state
    }
}

/// An SSID currently visible to a [`Device`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Network {
    /// D-Bus object path, below the device path.
    pub path: String,
    /// SSID.
    pub name: String,
    /// Daemon-reported hint; the device's station state is authoritative.
    pub connected: bool,
    /// Object path of the device that sees this network.
    pub device: String,
    /// Security type (`open`, `psk`, `8021x`, `wep`).
    pub auth_type: String,
}

/// A network iwd has stored credentials for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KnownNetwork {
    /// D-Bus object path.
    pub path: String,
    /// SSID.
    pub name: String,
    /// Security type.
    pub auth_type: String,
    /// Whether the SSID is hidden.
    pub hidden: bool,
    /// Whether iwd connects to it automatically.
    pub auto_connect: bool,
    /// ISO 8601 timestamp of the last connection, if any.
    pub last_connected_time: Option<String>,
}

/// Pre-configured credentials for one SSID, handed to iwd by the agent.
///
/// # Example
///
/// ```rust
/// use iwrs::NetworkConfig;
///
/// let home = NetworkConfig::psk("Home", "correct horse battery staple");
/// let cafe = NetworkConfig::open("Cafe");
/// assert!(cafe.psk.is_none());
/// # let _ = home;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// SSID the credentials apply to.
    pub ssid: String,
    /// Passphrase, `None` for open networks.
    #[serde(default)]
    pub psk: Option<String>,
}

impl NetworkConfig {
    /// Credentials for an open network.
    pub fn open(ssid: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            psk: None,
        }
    }

    /// Credentials for a WPA-PSK network.
    pub fn psk(ssid: impl Into<String>, psk: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            psk: Some(psk.into()),
        }
    }
}

/// Configuration for an [`IwdClient`](crate::IwdClient).
///
/// # Example
///
/// ```rust
/// use iwrs::{ClientConfig, NetworkConfig};
///
/// let config = ClientConfig::new()
///     .with_agent_path("/com/example/agent")
///     .with_network(NetworkConfig::psk("Home", "hunter22"));
///
/// assert_eq!(config.agent_path, "/com/example/agent");
/// assert_eq!(config.networks.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Bus name of the iwd daemon.
    pub service: String,
    /// Object path the credential agent is exported at.
    pub agent_path: String,
    /// Credentials the agent hands out, matched by SSID.
    #[serde(default)]
    pub networks: Vec<NetworkConfig>,
}

impl ClientConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bus name of the daemon.
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    /// Sets the object path the agent is exported at.
    pub fn with_agent_path(mut self, path: impl Into<String>) -> Self {
        self.agent_path = path.into();
        self
    }

    /// Adds credentials for one network.
    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.networks.push(network);
        self
    }

    /// Adds credentials for several networks.
    pub fn with_networks(mut self, networks: impl IntoIterator<Item = NetworkConfig>) -> Self {
        self.networks.extend(networks);
        self
    }
}

impl Default for ClientConfig {
    /// Defaults:
    /// - `service`: `net.connman.iwd`
    /// - `agent_path`: `/net/iwrs/agent`
    /// - `networks`: empty
    fn default() -> Self {
        Self {
            service: bus::SERVICE.to_string(),
            agent_path: bus::DEFAULT_AGENT_PATH.to_string(),
            networks: Vec::new(),
        }
    }
}

/// Classification of a named remote error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// The daemon is already running the requested operation.
    InProgress,
    /// The operation was aborted by the daemon, usually by a racing request.
    Aborted,
    /// Any other remote error.
    Other,
}

/// A method call that failed with a named D-Bus error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    /// The D-Bus error name, e.g. `net.connman.iwd.Aborted`.
    pub name: String,
    /// The optional human-readable message.
    pub message: Option<String>,
}

impl RemoteError {
    /// Creates a remote error from its name and message.
    pub fn new(name: impl Into<String>, message: Option<String>) -> Self {
        Self {
            name: name.into(),
            message,
        }
    }

    /// Classifies the error by name.
    pub fn kind(&self) -> RemoteErrorKind {
        match self.name.as_str() {
            remote_error::IN_PROGRESS => RemoteErrorKind::InProgress,
            remote_error::ABORTED => RemoteErrorKind::Aborted,
            _ => RemoteErrorKind::Other,
        }
    }
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.message {
            Some(msg) => write!(f, "{}: {msg}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Errors that can occur while talking to iwd.
#[derive(Debug, Error)]
pub enum IwdError {
    /// A D-Bus communication error occurred.
    #[error("D-Bus error: {0}")]
    Dbus(zbus::Error),

    /// No live object matches the path (or network name).
    #[error("object not found: {0}")]
    NotFound(String),

    /// A remote method call failed with a named error.
    #[error("remote call failed: {0}")]
    Remote(RemoteError),

    /// `Connect` kept being aborted.
    #[error("too many connect attempts ({0})")]
    TooManyRetries(u32),

    /// A required property was missing or had an unexpected type.
    #[error("invalid property {property} on {path}")]
    InvalidProperty {
        /// Object path carrying the property.
        path: String,
        /// Property name.
        property: String,
    },

    /// A pending operation was abandoned before it resolved.
    #[error("wait cancelled before the operation resolved")]
    WaitCancelled,

    /// The task owning the object graph has stopped.
    #[error("object graph session closed")]
    SessionClosed,
}

impl IwdError {
    /// Returns the remote error kind, if this is a remote error.
    pub fn remote_kind(&self) -> Option<RemoteErrorKind> {
        match self {
            Self::Remote(e) => Some(e.kind()),
            _ => None,
        }
    }
}

impl From<zbus::Error> for IwdError {
    fn from(e: zbus::Error) -> Self {
        match e {
            zbus::Error::MethodError(name, message, _) => {
                Self::Remote(RemoteError::new(name.as_str(), message))
            }
            other => Self::Dbus(other),
        }
    }
}

impl From<zbus::fdo::Error> for IwdError {
    fn from(e: zbus::fdo::Error) -> Self {
        match e {
            zbus::fdo::Error::ZBus(inner) => inner.into(),
            other => Self::Dbus(zbus::Error::FDO(Box::new(other))),
        }
    }
}
