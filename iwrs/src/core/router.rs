//! Applies iwd object notifications to the [`StatusGraph`].
//!
//! Routing is pure dispatch: every event is applied once, in arrival order,
//! with no buffering or retries. A lookup miss means the graph and the daemon
//! disagree and is reported as [`IwdError::NotFound`], with two tolerated
//! races: a removal for a device that is already gone, and a property change
//! for a device removed in the meantime.

use log::debug;

use crate::api::models::{InterfaceMap, IwdError, PropertyMap};
use crate::core::graph::{IwdObject, StatusGraph, decode_interfaces};
use crate::types::constants::interface;
use crate::util::paths::device_path;
use crate::Result;

/// A raw notification from the bus.
#[derive(Debug)]
pub enum ObjectEvent {
    /// `ObjectManager.InterfacesAdded`.
    InterfacesAdded {
        /// Object path.
        path: String,
        /// New interfaces with their properties.
        interfaces: InterfaceMap,
    },
    /// `ObjectManager.InterfacesRemoved`.
    InterfacesRemoved {
        /// Object path.
        path: String,
        /// Names of the removed interfaces.
        interfaces: Vec<String>,
    },
    /// `Properties.PropertiesChanged` on an object.
    PropertiesChanged {
        /// Object path the signal was emitted on.
        path: String,
        /// Interface whose properties changed.
        interface: String,
        /// New property values.
        changed: PropertyMap,
        /// Properties whose values were invalidated without being sent.
        invalidated: Vec<String>,
    },
}

impl ObjectEvent {
    /// Object path the event applies to.
    pub fn path(&self) -> &str {
        match self {
            Self::InterfacesAdded { path, .. }
            | Self::InterfacesRemoved { path, .. }
            | Self::PropertiesChanged { path, .. } => path,
        }
    }
}

impl StatusGraph {
    /// Applies one event to the graph.
    pub fn route(&mut self, event: &ObjectEvent) -> Result<()> {
        match event {
            ObjectEvent::InterfacesAdded { path, interfaces } => {
                self.on_objects_added(path, interfaces)
            }
            ObjectEvent::InterfacesRemoved { path, interfaces } => {
                self.on_objects_removed(path, interfaces)
            }
            ObjectEvent::PropertiesChanged {
                path,
                interface,
                changed,
                ..
            } => self.on_properties_changed(path, interface, changed),
        }
    }

    /// Adds the objects announced at `path`.
    ///
    /// A network is attached to the device resolved from its path. Owners in
    /// the same payload are inserted before the objects they own.
    pub fn on_objects_added(&mut self, path: &str, interfaces: &InterfaceMap) -> Result<()> {
        let mut objects = decode_interfaces(path, interfaces)?;
        objects.sort_by_key(IwdObject::rank);
        for object in objects {
            self.insert_object(path, object)?;
        }
        Ok(())
    }

    /// Removes the objects withdrawn at `path`.
    ///
    /// Removing a network whose device is already gone is a no-op.
    pub fn on_objects_removed(&mut self, path: &str, interfaces: &[String]) -> Result<()> {
        for tag in interfaces {
            match tag.as_str() {
                interface::NETWORK => match self.find_device_by_path(path) {
                    Ok(_) => {
                        let network = self.remove_network_by_path(path)?;
                        debug!("Network {} gone from {}", network.name, device_path(path));
                    }
                    Err(IwdError::NotFound(_)) => {
                        debug!("Device for removed network {path} already gone");
                    }
                    Err(e) => return Err(e),
                },
                interface::DEVICE => {
                    if self.find_device_by_path(path).is_ok() {
                        self.remove_device_by_path(path)?;
                    }
                }
                interface::ADAPTER => {
                    if self.find_adapter_by_path(path).is_ok() {
                        self.remove_adapter_by_path(path)?;
                    }
                }
                interface::KNOWN_NETWORK => {
                    let known = self.remove_known_network_by_path(path)?;
                    debug!("Known network {} forgotten", known.name);
                }
                other => debug!("Ignoring removal of {other} at {path}"),
            }
        }
        Ok(())
    }

    /// Forwards changed properties to the device at `path`.
    ///
    /// A change for a device that no longer exists is dropped.
    pub fn on_properties_changed(
        &mut self,
        path: &str,
        iface: &str,
        changed: &PropertyMap,
    ) -> Result<()> {
        match self.find_device_by_path_mut(path) {
            Ok(device) => {
                device.apply_properties(iface, changed);
                Ok(())
            }
            Err(IwdError::NotFound(missing)) => {
                debug!("Property change for vanished device {missing}");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{ManagedObjects, StationState};
    use crate::util::props::prop_map;
    use zvariant::{ObjectPath, Value};

    const ADAPTER: &str = "/net/x/iwd/phy0";
    const DEVICE: &str = "/net/x/iwd/phy0/wlan0";
    const HOME: &str = "/net/x/iwd/phy0/wlan0/Home_psk";

    fn graph() -> StatusGraph {
        let mut objects = ManagedObjects::new();
        objects.insert(
            ADAPTER.into(),
            InterfaceMap::from([(
                interface::ADAPTER.to_string(),
                prop_map([("Powered", Value::from(true)), ("Name", Value::from("phy0"))]),
            )]),
        );
        objects.insert(
            DEVICE.into(),
            InterfaceMap::from([
                (
                    interface::DEVICE.to_string(),
                    prop_map([("Name", Value::from("wlan0")), ("Mode", Value::from("station"))]),
                ),
                (
                    interface::STATION.to_string(),
                    prop_map([("State", Value::from("disconnected"))]),
                ),
            ]),
        );
        let mut graph = StatusGraph::default();
        graph.bulk_replace(&objects).unwrap();
        graph
    }

    fn network_added(path: &str, name: &str) -> ObjectEvent {
        ObjectEvent::InterfacesAdded {
            path: path.into(),
            interfaces: InterfaceMap::from([(
                interface::NETWORK.to_string(),
                prop_map([
                    ("Name", Value::from(name.to_string())),
                    ("Connected", Value::from(false)),
                    ("Device", Value::from(ObjectPath::try_from(DEVICE).unwrap())),
                    ("Type", Value::from("psk")),
                ]),
            )]),
        }
    }

    fn removed(path: &str, tag: &str) -> ObjectEvent {
        ObjectEvent::InterfacesRemoved {
            path: path.into(),
            interfaces: vec![tag.to_string()],
        }
    }

    #[test]
    fn added_network_lands_on_its_device() {
        let mut graph = graph();
        graph.route(&network_added(HOME, "Home")).unwrap();

        let device = graph.find_device_by_path(DEVICE).unwrap();
        assert_eq!(device.networks.len(), 1);
        assert_eq!(device.networks[0].name, "Home");
        assert_eq!(device.networks[0].device, DEVICE);
    }

    #[test]
    fn added_network_without_device_is_not_found() {
        let mut graph = graph();
        let result = graph.route(&network_added("/net/x/iwd/phy0/wlan1/Home_psk", "Home"));
        assert!(matches!(result, Err(IwdError::NotFound(_))));
    }

    #[test]
    fn removed_network_is_gone() {
        let mut graph = graph();
        graph.route(&network_added(HOME, "Home")).unwrap();
        graph.route(&removed(HOME, interface::NETWORK)).unwrap();

        assert!(matches!(
            graph.find_network_by_path(HOME),
            Err(IwdError::NotFound(_))
        ));
    }

    #[test]
    fn removing_unknown_network_is_not_found() {
        let mut graph = graph();
        let result = graph.route(&removed(HOME, interface::NETWORK));
        assert!(matches!(result, Err(IwdError::NotFound(_))));
    }

    #[test]
    fn removing_network_of_vanished_device_is_tolerated() {
        let mut graph = graph();
        graph.route(&network_added(HOME, "Home")).unwrap();
        graph.route(&removed(DEVICE, interface::DEVICE)).unwrap();
        graph.route(&removed(HOME, interface::NETWORK)).unwrap();
        assert!(graph.find_device_by_path(DEVICE).is_err());
    }

    #[test]
    fn station_property_change_updates_state() {
        let mut graph = graph();
        graph
            .route(&ObjectEvent::PropertiesChanged {
                path: DEVICE.into(),
                interface: interface::STATION.into(),
                changed: prop_map([("State", Value::from("connecting"))]),
                invalidated: Vec::new(),
            })
            .unwrap();
        assert_eq!(
            graph.find_device_by_path(DEVICE).unwrap().state,
            Some(StationState::Connecting)
        );
    }

    #[test]
    fn property_change_for_vanished_device_is_tolerated() {
        let mut graph = graph();
        let event = ObjectEvent::PropertiesChanged {
            path: "/net/x/iwd/phy0/wlan7".into(),
            interface: interface::STATION.into(),
            changed: prop_map([("State", Value::from("connected"))]),
            invalidated: Vec::new(),
        };
        assert_eq!(event.path(), "/net/x/iwd/phy0/wlan7");
        graph.route(&event).unwrap();
    }

    #[test]
    fn known_networks_follow_add_and_remove() {
        let mut graph = graph();
        let path = "/net/x/iwd/486f6d65_psk";
        graph
            .route(&ObjectEvent::InterfacesAdded {
                path: path.into(),
                interfaces: InterfaceMap::from([(
                    interface::KNOWN_NETWORK.to_string(),
                    prop_map([("Name", Value::from("Home")), ("Type", Value::from("psk"))]),
                )]),
            })
            .unwrap();
        assert!(graph.known_networks.contains_key("Home"));

        graph.route(&removed(path, interface::KNOWN_NETWORK)).unwrap();
        assert!(graph.known_networks.is_empty());
    }

    #[test]
    fn device_and_station_added_together() {
        let mut graph = graph();
        let path = "/net/x/iwd/phy0/wlan1";
        graph
            .route(&ObjectEvent::InterfacesAdded {
                path: path.into(),
                interfaces: InterfaceMap::from([
                    (
                        interface::STATION.to_string(),
                        prop_map([("State", Value::from("connected"))]),
                    ),
                    (
                        interface::DEVICE.to_string(),
                        prop_map([("Name", Value::from("wlan1"))]),
                    ),
                ]),
            })
            .unwrap();
        let device = graph.find_device_by_path(path).unwrap();
        assert_eq!(device.name, "wlan1");
        assert!(device.is_connected());
    }

    #[test]
    fn unknown_interfaces_are_ignored() {
        let mut graph = graph();
        graph
            .route(&ObjectEvent::InterfacesAdded {
                path: DEVICE.into(),
                interfaces: InterfaceMap::from([(
                    "net.connman.iwd.WiFiSimpleConfiguration".to_string(),
                    PropertyMap::new(),
                )]),
            })
            .unwrap();
        graph
            .route(&removed(DEVICE, "net.connman.iwd.WiFiSimpleConfiguration"))
            .unwrap();
        assert!(graph.find_device_by_path(DEVICE).is_ok());
    }
}
