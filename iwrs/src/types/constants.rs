//! Constants for iwd D-Bus interface values.
//!
//! These constants correspond to the names and path layout used by iwd's
//! D-Bus API for object types, remote errors, and station states.

/// Well-known bus names and object paths.
pub mod bus {
    /// Default bus name of the iwd daemon.
    pub const SERVICE: &str = "net.connman.iwd";
    /// Path of the root object carrying the ObjectManager interface.
    pub const ROOT_PATH: &str = "/";
    /// Path of the object carrying the AgentManager interface.
    pub const AGENT_MANAGER_PATH: &str = "/net/connman/iwd";
    /// Default path under which our agent is exported.
    pub const DEFAULT_AGENT_PATH: &str = "/net/iwrs/agent";
}

/// iwd interface names, used as type tags in object enumeration.
pub mod interface {
    pub const ADAPTER: &str = "net.connman.iwd.Adapter";
    pub const DEVICE: &str = "net.connman.iwd.Device";
    pub const NETWORK: &str = "net.connman.iwd.Network";
    pub const KNOWN_NETWORK: &str = "net.connman.iwd.KnownNetwork";
    pub const STATION: &str = "net.connman.iwd.Station";
}

/// Remote error names returned by iwd method calls.
pub mod remote_error {
    pub const IN_PROGRESS: &str = "net.connman.iwd.InProgress";
    pub const ABORTED: &str = "net.connman.iwd.Aborted";
}

/// Object path layout.
///
/// Containment is recovered from the number of `/`-separated segments,
/// counting the empty segment before the leading slash.
/// `/net/connman/iwd/0` is an adapter, `/net/connman/iwd/0/3` a device.
pub mod path_depth {
    pub const ADAPTER: usize = 5;
    pub const DEVICE: usize = 6;
}

/// Retry policy for `Network.Connect`.
pub mod retry {
    /// Number of `Connect` attempts before giving up on `Aborted` errors.
    pub const CONNECT_ATTEMPTS: u32 = 5;
}

/// Station state strings reported by iwd.
pub mod station_state {
    pub const CONNECTED: &str = "connected";
    pub const DISCONNECTED: &str = "disconnected";
    pub const CONNECTING: &str = "connecting";
    pub const DISCONNECTING: &str = "disconnecting";
    pub const ROAMING: &str = "roaming";
}
