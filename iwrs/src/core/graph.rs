//! In-memory mirror of iwd's object tree.
//!
//! [`StatusGraph`] holds adapters (owning devices, owning networks) and the
//! independent known-network collection. Owners are found by cutting an
//! object path down to the owner's depth, so any path below a device resolves
//! to that device.
//!
//! The graph is populated in two ways: [`StatusGraph::bulk_replace`] rebuilds
//! it from a full `GetManagedObjects` enumeration, and the event router
//! mutates it in place as objects come and go.

use log::{debug, info};
use std::collections::HashMap;
use std::mem;

use crate::api::models::{
    Adapter, Device, InterfaceMap, IwdError, KnownNetwork, ManagedObjects, Network, PropertyMap,
};
use crate::core::state_wait::DeviceWaits;
use crate::types::constants::interface;
use crate::util::paths::{adapter_path, device_path};
use crate::util::props::{bool_opt, required_bool, required_str, str_opt, string_list};
use crate::Result;

/// The root of the mirrored object graph.
#[derive(Debug, Default, PartialEq)]
pub struct StatusGraph {
    /// Adapters keyed by object path.
    pub adapters: HashMap<String, Adapter>,
    /// Known networks keyed by SSID.
    pub known_networks: HashMap<String, KnownNetwork>,
}

/// One decoded interface entry from an enumeration or add event.
#[derive(Debug)]
pub(crate) enum IwdObject<'a> {
    Adapter(Adapter),
    Device(Device),
    Network(Network),
    KnownNetwork(KnownNetwork),
    /// Station properties, applied to the device at the same path.
    Station(&'a PropertyMap),
}

impl<'a> IwdObject<'a> {
    /// Decodes the entry for interface `tag` at `path`.
    ///
    /// Returns `Ok(None)` for interfaces the graph does not mirror.
    pub(crate) fn decode(path: &str, tag: &str, props: &'a PropertyMap) -> Result<Option<Self>> {
        let object = match tag {
            interface::ADAPTER => Self::Adapter(Adapter {
                path: path.to_string(),
                powered: required_bool(path, props, "Powered")?,
                model: str_opt(props, "Model").map(str::to_owned),
                vendor: str_opt(props, "Vendor").map(str::to_owned),
                name: required_str(path, props, "Name")?,
                supported_modes: string_list(props, "SupportedModes").into_iter().collect(),
                devices: HashMap::new(),
            }),
            interface::DEVICE => Self::Device(Device {
                path: path.to_string(),
                name: required_str(path, props, "Name")?,
                address: str_opt(props, "Address").unwrap_or_default().to_owned(),
                powered: bool_opt(props, "Powered").unwrap_or(false),
                adapter: str_opt(props, "Adapter")
                    .unwrap_or_else(|| adapter_path(path))
                    .to_owned(),
                mode: str_opt(props, "Mode").unwrap_or_default().to_owned(),
                networks: Vec::new(),
                state: None,
                waits: DeviceWaits::default(),
            }),
            interface::NETWORK => Self::Network(Network {
                path: path.to_string(),
                name: required_str(path, props, "Name")?,
                connected: bool_opt(props, "Connected").unwrap_or(false),
                device: str_opt(props, "Device")
                    .unwrap_or_else(|| device_path(path))
                    .to_owned(),
                auth_type: required_str(path, props, "Type")?,
            }),
            interface::KNOWN_NETWORK => Self::KnownNetwork(KnownNetwork {
                path: path.to_string(),
                name: required_str(path, props, "Name")?,
                auth_type: required_str(path, props, "Type")?,
                hidden: bool_opt(props, "Hidden").unwrap_or(false),
                auto_connect: bool_opt(props, "AutoConnect").unwrap_or(false),
                last_connected_time: str_opt(props, "LastConnectedTime").map(str::to_owned),
            }),
            interface::STATION => Self::Station(props),
            _ => return Ok(None),
        };
        Ok(Some(object))
    }

    /// Ordering rank so owners are inserted before the objects they own.
    pub(crate) fn rank(&self) -> u8 {
        match self {
            Self::Adapter(_) => 0,
            Self::Device(_) => 1,
            Self::Network(_) | Self::KnownNetwork(_) => 2,
            Self::Station(_) => 3,
        }
    }
}

/// Decodes all recognised interfaces of one object, logging unknown tags.
pub(crate) fn decode_interfaces<'a>(
    path: &str,
    interfaces: &'a InterfaceMap,
) -> Result<Vec<IwdObject<'a>>> {
    let mut objects = Vec::new();
    for (tag, props) in interfaces {
        match IwdObject::decode(path, tag, props)? {
            Some(object) => objects.push(object),
            None => info!("Unknown object type {tag} at {path}, skipping"),
        }
    }
    Ok(objects)
}

impl StatusGraph {
    /// Adds (or replaces) an adapter.
    pub fn add_adapter(&mut self, adapter: Adapter) {
        self.adapters.insert(adapter.path.clone(), adapter);
    }

    /// Adds (or replaces) a device under the adapter owning `adapter_path`.
    pub fn add_device(&mut self, adapter_path: &str, device: Device) -> Result<()> {
        let adapter = self.find_adapter_by_path_mut(adapter_path)?;
        adapter.devices.insert(device.path.clone(), device);
        Ok(())
    }

    /// Appends a network to the device owning `device_path`.
    ///
    /// A network already listed under the same path is replaced in place.
    pub fn add_network(&mut self, device_path: &str, network: Network) -> Result<()> {
        let device = self.find_device_by_path_mut(device_path)?;
        match device.networks.iter_mut().find(|n| n.path == network.path) {
            Some(existing) => *existing = network,
            None => device.networks.push(network),
        }
        Ok(())
    }

    /// Adds (or replaces) a known network, keyed by SSID.
    pub fn add_known_network(&mut self, known: KnownNetwork) {
        self.known_networks.insert(known.name.clone(), known);
    }

    /// Finds the adapter owning `path`.
    pub fn find_adapter_by_path(&self, path: &str) -> Result<&Adapter> {
        let key = adapter_path(path);
        self.adapters
            .get(key)
            .ok_or_else(|| IwdError::NotFound(key.to_string()))
    }

    pub(crate) fn find_adapter_by_path_mut(&mut self, path: &str) -> Result<&mut Adapter> {
        let key = adapter_path(path);
        self.adapters
            .get_mut(key)
            .ok_or_else(|| IwdError::NotFound(key.to_string()))
    }

    /// Finds the device owning `path`.
    pub fn find_device_by_path(&self, path: &str) -> Result<&Device> {
        let key = device_path(path);
        self.find_adapter_by_path(path)?
            .devices
            .get(key)
            .ok_or_else(|| IwdError::NotFound(key.to_string()))
    }

    pub(crate) fn find_device_by_path_mut(&mut self, path: &str) -> Result<&mut Device> {
        let key = device_path(path);
        self.find_adapter_by_path_mut(path)?
            .devices
            .get_mut(key)
            .ok_or_else(|| IwdError::NotFound(key.to_string()))
    }

    /// Finds the network at `path`.
    pub fn find_network_by_path(&self, path: &str) -> Result<&Network> {
        self.find_device_by_path(path)?
            .network_by_path(path)
            .ok_or_else(|| IwdError::NotFound(path.to_string()))
    }

    /// Removes the network at `path` from its device.
    pub fn remove_network_by_path(&mut self, path: &str) -> Result<Network> {
        let device = self.find_device_by_path_mut(path)?;
        let idx = device
            .networks
            .iter()
            .position(|n| n.path == path)
            .ok_or_else(|| IwdError::NotFound(path.to_string()))?;
        Ok(device.networks.remove(idx))
    }

    /// Removes the device at `path` from its adapter.
    pub fn remove_device_by_path(&mut self, path: &str) -> Result<Device> {
        let key = device_path(path);
        self.find_adapter_by_path_mut(path)?
            .devices
            .remove(key)
            .ok_or_else(|| IwdError::NotFound(key.to_string()))
    }

    /// Removes the adapter at `path` together with its devices.
    pub fn remove_adapter_by_path(&mut self, path: &str) -> Result<Adapter> {
        let key = adapter_path(path);
        self.adapters
            .remove(key)
            .ok_or_else(|| IwdError::NotFound(key.to_string()))
    }

    /// Removes the known network whose object path is `path`.
    pub fn remove_known_network_by_path(&mut self, path: &str) -> Result<KnownNetwork> {
        let name = self
            .known_networks
            .values()
            .find(|k| k.path == path)
            .map(|k| k.name.clone())
            .ok_or_else(|| IwdError::NotFound(path.to_string()))?;
        self.known_networks
            .remove(&name)
            .ok_or_else(|| IwdError::NotFound(path.to_string()))
    }

    /// Iterates over every device of every adapter.
    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.adapters.values().flat_map(|a| a.devices.values())
    }

    pub(crate) fn devices_mut(&mut self) -> impl Iterator<Item = &mut Device> {
        self.adapters
            .values_mut()
            .flat_map(|a| a.devices.values_mut())
    }

    /// Inserts one decoded object at `path`.
    pub(crate) fn insert_object(&mut self, path: &str, object: IwdObject<'_>) -> Result<()> {
        match object {
            IwdObject::Adapter(adapter) => self.add_adapter(adapter),
            IwdObject::Device(device) => self.add_device(path, device)?,
            IwdObject::Network(network) => self.add_network(path, network)?,
            IwdObject::KnownNetwork(known) => self.add_known_network(known),
            IwdObject::Station(props) => self
                .find_device_by_path_mut(path)?
                .apply_station_properties(props),
        }
        Ok(())
    }

    /// Discards the current graph and rebuilds it from a full enumeration.
    ///
    /// The new graph is built aside and swapped in only when every entry
    /// decoded and attached cleanly; on error the current graph is kept.
    /// Entries are applied owners first and in path order, so the result does
    /// not depend on map iteration order. Pending waits of devices whose path
    /// survives are carried over.
    pub fn bulk_replace(&mut self, snapshot: &ManagedObjects) -> Result<()> {
        let mut entries = Vec::new();
        for (path, interfaces) in snapshot {
            for object in decode_interfaces(path, interfaces)? {
                entries.push((path.as_str(), object));
            }
        }
        entries.sort_by(|(pa, a), (pb, b)| a.rank().cmp(&b.rank()).then_with(|| pa.cmp(pb)));

        let mut fresh = StatusGraph::default();
        for (path, object) in entries {
            fresh.insert_object(path, object)?;
        }

        let mut previous = mem::replace(self, fresh);
        for device in self.devices_mut() {
            if let Ok(old) = previous.find_device_by_path_mut(&device.path) {
                device.waits = mem::take(&mut old.waits);
            }
        }
        debug!(
            "Resynced object graph: {} adapters, {} known networks",
            self.adapters.len(),
            self.known_networks.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::StationState;
    use crate::util::props::prop_map;
    use zvariant::{ObjectPath, Value};

    const ADAPTER: &str = "/net/x/iwd/phy0";
    const DEVICE: &str = "/net/x/iwd/phy0/wlan0";
    const NETWORK: &str = "/net/x/iwd/phy0/wlan0/Home_psk";

    fn adapter_props() -> PropertyMap {
        prop_map([
            ("Powered", Value::from(true)),
            ("Model", Value::from("AX200")),
            ("Vendor", Value::from("Intel")),
            ("Name", Value::from("phy0")),
            ("SupportedModes", Value::from(vec!["station", "ap"])),
        ])
    }

    fn device_props() -> PropertyMap {
        prop_map([
            ("Name", Value::from("wlan0")),
            ("Address", Value::from("00:11:22:33:44:55")),
            ("Powered", Value::from(true)),
            ("Adapter", Value::from(ObjectPath::try_from(ADAPTER).unwrap())),
            ("Mode", Value::from("station")),
        ])
    }

    fn network_props(name: &str) -> PropertyMap {
        prop_map([
            ("Name", Value::from(name.to_string())),
            ("Connected", Value::from(false)),
            ("Device", Value::from(ObjectPath::try_from(DEVICE).unwrap())),
            ("Type", Value::from("psk")),
        ])
    }

    fn snapshot() -> ManagedObjects {
        let mut objects = ManagedObjects::new();
        objects.insert(
            ADAPTER.into(),
            InterfaceMap::from([(interface::ADAPTER.to_string(), adapter_props())]),
        );
        objects.insert(
            DEVICE.into(),
            InterfaceMap::from([
                (interface::DEVICE.to_string(), device_props()),
                (
                    interface::STATION.to_string(),
                    prop_map([
                        ("State", Value::from("disconnected")),
                        ("Scanning", Value::from(false)),
                    ]),
                ),
                ("net.connman.iwd.SimpleConfiguration".to_string(), PropertyMap::new()),
            ]),
        );
        objects.insert(
            NETWORK.into(),
            InterfaceMap::from([(interface::NETWORK.to_string(), network_props("Home"))]),
        );
        objects.insert(
            "/net/x/iwd/486f6d65_psk".into(),
            InterfaceMap::from([(
                interface::KNOWN_NETWORK.to_string(),
                prop_map([
                    ("Name", Value::from("Home")),
                    ("Type", Value::from("psk")),
                    ("Hidden", Value::from(false)),
                    ("AutoConnect", Value::from(true)),
                    ("LastConnectedTime", Value::from("2026-01-01T00:00:00Z")),
                ]),
            )]),
        );
        objects
    }

    fn populated() -> StatusGraph {
        let mut graph = StatusGraph::default();
        graph.bulk_replace(&snapshot()).unwrap();
        graph
    }

    #[test]
    fn bulk_replace_builds_the_tree() {
        let graph = populated();

        let adapter = graph.find_adapter_by_path(ADAPTER).unwrap();
        assert_eq!(adapter.name, "phy0");
        assert_eq!(adapter.model.as_deref(), Some("AX200"));
        assert!(adapter.supported_modes.contains("ap"));

        let device = graph.find_device_by_path(DEVICE).unwrap();
        assert_eq!(device.name, "wlan0");
        assert_eq!(device.adapter, ADAPTER);
        assert_eq!(device.state, Some(StationState::Disconnected));
        assert_eq!(device.networks.len(), 1);

        let known = &graph.known_networks["Home"];
        assert!(known.auto_connect);
        assert_eq!(known.last_connected_time.as_deref(), Some("2026-01-01T00:00:00Z"));
    }

    #[test]
    fn bulk_replace_is_idempotent() {
        let once = populated();
        let mut twice = populated();
        twice.bulk_replace(&snapshot()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn bulk_replace_drops_objects_missing_from_snapshot() {
        let mut graph = populated();
        let mut objects = snapshot();
        objects.remove(NETWORK);
        graph.bulk_replace(&objects).unwrap();
        assert!(graph.find_device_by_path(DEVICE).unwrap().networks.is_empty());
        assert!(matches!(
            graph.find_network_by_path(NETWORK),
            Err(IwdError::NotFound(_))
        ));
    }

    #[test]
    fn bulk_replace_keeps_graph_on_invalid_entry() {
        let mut graph = populated();
        let mut objects = snapshot();
        objects.insert(
            "/net/x/iwd/phy0/wlan0/Broken_psk".into(),
            InterfaceMap::from([(interface::NETWORK.to_string(), PropertyMap::new())]),
        );
        assert!(matches!(
            graph.bulk_replace(&objects),
            Err(IwdError::InvalidProperty { .. })
        ));
        assert_eq!(graph, populated());
    }

    #[test]
    fn bulk_replace_carries_pending_waits_over() {
        let mut graph = populated();
        let _wait = graph
            .find_device_by_path_mut(DEVICE)
            .unwrap()
            .waits
            .scan_terminated
            .begin();
        graph.bulk_replace(&snapshot()).unwrap();
        assert!(graph.find_device_by_path(DEVICE).unwrap().has_pending_scan());
    }

    #[test]
    fn device_lookup_from_any_deeper_path() {
        let graph = populated();
        let direct = graph.find_device_by_path(DEVICE).unwrap();
        let via_network = graph.find_device_by_path(NETWORK).unwrap();
        let via_deeper = graph.find_device_by_path("/net/x/iwd/phy0/wlan0/a/b/c").unwrap();
        assert_eq!(direct, via_network);
        assert_eq!(direct, via_deeper);
    }

    #[test]
    fn lookup_misses_carry_the_truncated_path() {
        let graph = populated();
        match graph.find_device_by_path("/net/x/iwd/phy0/wlan9/Home_psk") {
            Err(IwdError::NotFound(path)) => assert_eq!(path, "/net/x/iwd/phy0/wlan9"),
            other => panic!("unexpected result: {other:?}"),
        }
        match graph.find_adapter_by_path("/net/x/iwd/phy1/wlan0") {
            Err(IwdError::NotFound(path)) => assert_eq!(path, "/net/x/iwd/phy1"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn remove_network_then_lookup_fails() {
        let mut graph = populated();
        let removed = graph.remove_network_by_path(NETWORK).unwrap();
        assert_eq!(removed.name, "Home");
        assert!(matches!(
            graph.find_network_by_path(NETWORK),
            Err(IwdError::NotFound(_))
        ));
        assert!(matches!(
            graph.remove_network_by_path(NETWORK),
            Err(IwdError::NotFound(_))
        ));
    }

    #[test]
    fn add_network_replaces_same_path() {
        let mut graph = populated();
        let mut network = graph.find_network_by_path(NETWORK).unwrap().clone();
        network.connected = true;
        graph.add_network(DEVICE, network).unwrap();
        let device = graph.find_device_by_path(DEVICE).unwrap();
        assert_eq!(device.networks.len(), 1);
        assert!(device.networks[0].connected);
    }

    #[test]
    fn add_device_requires_adapter() {
        let mut graph = StatusGraph::default();
        let props = device_props();
        let Some(IwdObject::Device(device)) =
            IwdObject::decode(DEVICE, interface::DEVICE, &props).unwrap()
        else {
            panic!("expected a device");
        };
        assert!(matches!(
            graph.add_device(DEVICE, device),
            Err(IwdError::NotFound(_))
        ));
    }

    #[test]
    fn remove_known_network_by_path() {
        let mut graph = populated();
        let removed = graph
            .remove_known_network_by_path("/net/x/iwd/486f6d65_psk")
            .unwrap();
        assert_eq!(removed.name, "Home");
        assert!(graph.known_networks.is_empty());
    }

    #[test]
    fn unknown_tags_decode_to_none() {
        let props = PropertyMap::new();
        assert!(
            IwdObject::decode(DEVICE, "net.connman.iwd.SimpleConfiguration", &props)
                .unwrap()
                .is_none()
        );
    }
}
