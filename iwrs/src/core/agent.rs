//! Credential agent.
//!
//! iwd calls back into a registered agent when a connect needs a secret.
//! The agent here only looks secrets up: the network path is resolved in the
//! object graph, and its SSID is matched against the pre-configured
//! [`NetworkConfig`]s. Anything it cannot answer is refused with
//! `net.connman.iwd.Agent.Error.Canceled`, which makes iwd abort the connect.

use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;
use zbus::{DBusError, interface};
use zvariant::OwnedObjectPath;

use crate::api::models::{Network, NetworkConfig};
use crate::core::graph::StatusGraph;
use crate::core::session::SessionHandle;

/// Errors returned to iwd over the agent interface.
#[derive(Debug, DBusError)]
#[zbus(prefix = "net.connman.iwd.Agent.Error")]
pub enum AgentError {
    /// Transport-level failure.
    #[zbus(error)]
    ZBus(zbus::Error),
    /// The request was refused.
    Canceled(String),
}

/// Maps SSIDs to pre-configured secrets.
///
/// Matching is on SSID alone; the security type of the network is not
/// compared. When several configs share an SSID the first one wins.
#[derive(Debug, Clone, Default)]
pub struct CredentialResolver {
    networks: Arc<HashMap<String, NetworkConfig>>,
}

impl CredentialResolver {
    /// Builds a resolver from a list of network configs.
    pub fn new(configs: impl IntoIterator<Item = NetworkConfig>) -> Self {
        let mut networks = HashMap::new();
        for config in configs {
            networks.entry(config.ssid.clone()).or_insert(config);
        }
        Self {
            networks: Arc::new(networks),
        }
    }

    /// Returns the config for `ssid`, if any.
    pub fn lookup(&self, ssid: &str) -> Option<&NetworkConfig> {
        self.networks.get(ssid)
    }

    /// Returns the config matching a network's SSID, if any.
    pub fn config_for(&self, network: &Network) -> Option<&NetworkConfig> {
        self.lookup(&network.name)
    }

    /// Resolves the passphrase for the network at `network_path`.
    pub fn passphrase_for(
        &self,
        graph: &StatusGraph,
        network_path: &str,
    ) -> Result<String, AgentError> {
        let network = graph
            .find_network_by_path(network_path)
            .map_err(|_| AgentError::Canceled("Unknown network".into()))?;
        debug!("Passphrase requested for {}", network.name);

        self.config_for(network)
            .and_then(|config| config.psk.clone())
            .ok_or_else(|| AgentError::Canceled("No passphrase for this network".into()))
    }
}

/// The object exported as `net.connman.iwd.Agent`.
pub(crate) struct IwdAgent {
    session: SessionHandle,
    resolver: CredentialResolver,
}

impl IwdAgent {
    pub(crate) fn new(session: SessionHandle, resolver: CredentialResolver) -> Self {
        Self { session, resolver }
    }
}

#[interface(name = "net.connman.iwd.Agent")]
impl IwdAgent {
    fn release(&self) {
        warn!("Agent released by iwd");
    }

    async fn request_passphrase(&self, network: OwnedObjectPath) -> Result<String, AgentError> {
        let resolver = self.resolver.clone();
        let path = network.to_string();
        self.session
            .inspect(move |graph| resolver.passphrase_for(graph, &path))
            .await
            .map_err(|e| AgentError::Canceled(e.to_string()))?
    }

    fn request_private_key_passphrase(
        &self,
        _network: OwnedObjectPath,
    ) -> Result<String, AgentError> {
        Err(AgentError::Canceled(
            "NotImplemented: RequestPrivateKeyPassphrase".into(),
        ))
    }

    fn request_user_name_and_password(
        &self,
        _network: OwnedObjectPath,
    ) -> Result<(String, String), AgentError> {
        Err(AgentError::Canceled(
            "NotImplemented: RequestUserNameAndPassword".into(),
        ))
    }

    fn request_user_password(
        &self,
        _network: OwnedObjectPath,
        _user: String,
    ) -> Result<String, AgentError> {
        Err(AgentError::Canceled(
            "NotImplemented: RequestUserPassword".into(),
        ))
    }

    fn cancel(&self, reason: String) {
        debug!("Agent request cancelled by iwd: {reason}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{InterfaceMap, ManagedObjects};
    use crate::types::constants::interface;
    use crate::util::props::prop_map;
    use zvariant::Value;

    const HOME: &str = "/net/connman/iwd/0/3/486f6d65_psk";
    const CAFE: &str = "/net/connman/iwd/0/3/43616665_open";

    fn graph() -> StatusGraph {
        let network = |name: &str, kind: &str| {
            InterfaceMap::from([(
                interface::NETWORK.to_string(),
                prop_map([
                    ("Name", Value::from(name.to_string())),
                    ("Type", Value::from(kind.to_string())),
                ]),
            )])
        };
        let objects = ManagedObjects::from([
            (
                "/net/connman/iwd/0".to_string(),
                InterfaceMap::from([(
                    interface::ADAPTER.to_string(),
                    prop_map([("Powered", Value::from(true)), ("Name", Value::from("phy0"))]),
                )]),
            ),
            (
                "/net/connman/iwd/0/3".to_string(),
                InterfaceMap::from([(
                    interface::DEVICE.to_string(),
                    prop_map([("Name", Value::from("wlan0"))]),
                )]),
            ),
            (HOME.to_string(), network("Home", "psk")),
            (CAFE.to_string(), network("Cafe", "open")),
        ]);
        let mut graph = StatusGraph::default();
        graph.bulk_replace(&objects).unwrap();
        graph
    }

    fn resolver() -> CredentialResolver {
        CredentialResolver::new([
            NetworkConfig::psk("Home", "first"),
            NetworkConfig::psk("Home", "second"),
            NetworkConfig::open("Cafe"),
        ])
    }

    #[test]
    fn first_config_for_an_ssid_wins() {
        let resolver = resolver();
        assert_eq!(resolver.lookup("Home").unwrap().psk.as_deref(), Some("first"));
        assert!(resolver.lookup("Work").is_none());
    }

    #[test]
    fn passphrase_for_configured_network() {
        assert_eq!(resolver().passphrase_for(&graph(), HOME).unwrap(), "first");
    }

    #[test]
    fn unknown_network_is_canceled() {
        let result = resolver().passphrase_for(&graph(), "/net/connman/iwd/0/3/ffff_psk");
        assert!(matches!(result, Err(AgentError::Canceled(_))));
    }

    #[test]
    fn network_without_secret_is_canceled() {
        let result = resolver().passphrase_for(&graph(), CAFE);
        assert!(matches!(result, Err(AgentError::Canceled(_))));
        let result = CredentialResolver::default().passphrase_for(&graph(), HOME);
        assert!(matches!(result, Err(AgentError::Canceled(_))));
    }
}
