use std::sync::Arc;
use zbus::Connection;

use crate::api::models::{ClientConfig, KnownNetwork, Network, NetworkConfig, StationState};
use crate::core::agent::{CredentialResolver, IwdAgent};
use crate::core::connection::{connect, wait_state_event};
use crate::core::graph::StatusGraph;
use crate::core::router::ObjectEvent;
use crate::core::scan::scan;
use crate::core::session::{SessionHandle, spawn_session};
use crate::dbus::{DbusTransport, Transport};
use crate::monitoring::events::EventListener;
use crate::Result;

/// High-level interface to iwd over D-Bus.
///
/// The client keeps an in-memory mirror of the daemon's objects (adapters,
/// devices, visible and known networks) and updates it from bus signals.
/// Reads are answered from the mirror; scans and connects are sent to the
/// daemon and, when asked to, awaited until the mirror reports their outcome.
///
/// # Creating an Instance
///
/// ```no_run
/// use iwrs::IwdClient;
///
/// # async fn example() -> iwrs::Result<()> {
/// let client = IwdClient::new().await?;
/// # Ok(())
/// # }
/// ```
///
/// # Examples
///
/// ## Scanning and Connecting
///
/// ```no_run
/// use iwrs::{ClientConfig, IwdClient, NetworkConfig};
///
/// # async fn example() -> iwrs::Result<()> {
/// let config = ClientConfig::new().with_network(NetworkConfig::psk("Home", "hunter22"));
/// let client = IwdClient::with_config(config).await?;
///
/// for device in client.device_paths().await? {
///     client.scan(&device, true).await?;
///     for net in client.networks(&device).await? {
///         println!("{} ({})", net.name, net.auth_type);
///     }
///     let state = client.connect(&device, "Home", true).await?;
///     println!("{device}: {state:?}");
/// }
/// # Ok(())
/// # }
/// ```
///
/// ## Bounding a Wait
///
/// Waits have no built-in timeout. Race them against a timer; dropping the
/// losing future leaves the pending operation in place for the next caller.
///
/// ```no_run
/// use futures::future::{self, Either};
/// use futures_timer::Delay;
/// use std::time::Duration;
///
/// # async fn example(client: iwrs::IwdClient, device: &str) -> iwrs::Result<()> {
/// let scan = Box::pin(client.scan(device, true));
/// match future::select(scan, Delay::new(Duration::from_secs(10))).await {
///     Either::Left((result, _)) => result?,
///     Either::Right(_) => println!("scan still running"),
/// }
/// # Ok(())
/// # }
/// ```
///
/// # Thread Safety
///
/// `IwdClient` is `Clone` and can be shared across async tasks. Clones share
/// the same mirror, so a scan started from one clone is joined by another.
#[derive(Debug, Clone)]
pub struct IwdClient {
    transport: Arc<dyn Transport>,
    session: SessionHandle,
    config: Arc<ClientConfig>,
    resolver: CredentialResolver,
}

impl IwdClient {
    /// Connects to iwd on the system bus with the default configuration.
    pub async fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default()).await
    }

    /// Connects to iwd on the system bus.
    ///
    /// Subscribes to the daemon's signals, builds the mirror from a full
    /// enumeration, then exports the credential agent at
    /// [`ClientConfig::agent_path`] and registers it with the daemon.
    pub async fn with_config(config: ClientConfig) -> Result<Self> {
        let conn = Connection::system().await?;
        let transport = DbusTransport::new(conn.clone(), config.service.clone());
        let session = spawn_session();

        let mut listener = EventListener::subscribe(&conn, &config.service, session.clone()).await?;
        let client = Self::assemble(Arc::new(transport), session, config);

        let devices = client.resync().await?;
        listener.watch_devices(&devices).await?;
        tokio::spawn(listener.run());

        let agent = IwdAgent::new(client.session.clone(), client.resolver.clone());
        conn.object_server()
            .at(client.config.agent_path.as_str(), agent)
            .await?;
        client
            .transport
            .register_agent(&client.config.agent_path)
            .await?;

        Ok(client)
    }

    /// Creates a client over a custom transport.
    ///
    /// The mirror starts empty; call [`resync`](Self::resync) to populate it
    /// and [`dispatch`](Self::dispatch) to feed it events. No signals are
    /// subscribed and no agent is exported.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_transport(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        Self::assemble(transport, spawn_session(), config)
    }

    fn assemble(transport: Arc<dyn Transport>, session: SessionHandle, config: ClientConfig) -> Self {
        let resolver = CredentialResolver::new(config.networks.iter().cloned());
        Self {
            transport,
            session,
            config: Arc::new(config),
            resolver,
        }
    }

    /// Rebuilds the mirror from a full enumeration of the daemon's objects.
    ///
    /// Returns the paths of all devices. Pending scans and connects on
    /// devices that are still present keep their waiters.
    pub async fn resync(&self) -> Result<Vec<String>> {
        let objects = self.transport.managed_objects().await?;
        self.session.resync(objects).await
    }

    /// Applies one bus event to the mirror.
    pub async fn dispatch(&self, event: ObjectEvent) -> Result<()> {
        self.session.dispatch(event).await
    }

    /// Scans for networks on `device`.
    ///
    /// If a scan is already pending on the device, the call joins it rather
    /// than sending another request. With `wait_result` the call returns once
    /// the scan has finished and the network list is current.
    pub async fn scan(&self, device: &str, wait_result: bool) -> Result<()> {
        scan(self.transport.as_ref(), &self.session, device, wait_result).await
    }

    /// Connects `device` to the visible network named `network`.
    ///
    /// Returns [`IwdError::NotFound`](crate::IwdError::NotFound) if no network
    /// of that name is currently visible; rescan and try again. With
    /// `wait_result` the result is the state that ended the attempt
    /// (`Connected` or `Disconnected`); otherwise the device's current state.
    pub async fn connect(
        &self,
        device: &str,
        network: &str,
        wait_result: bool,
    ) -> Result<Option<StationState>> {
        connect(
            self.transport.as_ref(),
            &self.session,
            device,
            network,
            wait_result,
        )
        .await
    }

    /// Waits until the station state of `device` next changes.
    pub async fn wait_state_event(&self, device: &str) -> Result<()> {
        wait_state_event(&self.session, device).await
    }

    /// Runs `f` against a consistent view of the mirror.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example(client: iwrs::IwdClient) -> iwrs::Result<()> {
    /// let adapters = client.inspect(|graph| graph.adapters.len()).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn inspect<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&StatusGraph) -> R + Send + 'static,
        R: Send + 'static,
    {
        self.session.inspect(f).await
    }

    /// Lists the object paths of all devices, sorted.
    pub async fn device_paths(&self) -> Result<Vec<String>> {
        self.inspect(|graph| {
            let mut paths: Vec<String> = graph.devices().map(|d| d.path.clone()).collect();
            paths.sort();
            paths
        })
        .await
    }

    /// Lists the networks currently visible to `device`.
    pub async fn networks(&self, device: &str) -> Result<Vec<Network>> {
        let device = device.to_string();
        self.inspect(move |graph| {
            graph
                .find_device_by_path(&device)
                .map(|d| d.networks.clone())
        })
        .await?
    }

    /// Returns the station state of `device`.
    pub async fn device_state(&self, device: &str) -> Result<Option<StationState>> {
        let device = device.to_string();
        self.inspect(move |graph| graph.find_device_by_path(&device).map(|d| d.state.clone()))
            .await?
    }

    /// Lists the networks the daemon has stored credentials for.
    pub async fn known_networks(&self) -> Result<Vec<KnownNetwork>> {
        self.inspect(|graph| {
            let mut known: Vec<KnownNetwork> = graph.known_networks.values().cloned().collect();
            known.sort_by(|a, b| a.name.cmp(&b.name));
            known
        })
        .await
    }

    /// Whether `network` can be connected without prompting.
    ///
    /// True when the daemon knows the SSID or the configuration carries
    /// credentials for it. Only the SSID is compared.
    pub async fn is_known_network(&self, network: &Network) -> Result<bool> {
        if self.network_config(network).is_some() {
            return Ok(true);
        }
        let name = network.name.clone();
        self.inspect(move |graph| graph.known_networks.contains_key(&name))
            .await
    }

    /// Returns the configured credentials for `network`'s SSID.
    pub fn network_config(&self, network: &Network) -> Option<&NetworkConfig> {
        self.resolver.config_for(network)
    }

    /// The configuration the client was created with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}
