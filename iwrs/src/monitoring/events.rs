//! Bus listener feeding the object graph.
//!
//! Subscribes to `ObjectManager.InterfacesAdded`/`InterfacesRemoved` on the
//! daemon root and to `Properties.PropertiesChanged` on every device, turns
//! each signal into an [`ObjectEvent`] and queues it on the session. Devices
//! announced after startup are subscribed as their `InterfacesAdded` arrives.

use futures::future;
use futures::stream::{BoxStream, SelectAll, StreamExt};
use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use zbus::Connection;
use zbus::fdo::{
    InterfacesAdded, InterfacesRemoved, ObjectManagerProxy, PropertiesChanged, PropertiesProxy,
};
use zvariant::Value;

use crate::api::models::{InterfaceMap, IwdError, PropertyMap};
use crate::core::router::ObjectEvent;
use crate::core::session::SessionHandle;
use crate::types::constants::{bus, interface};
use crate::Result;

type EventStream = BoxStream<'static, ObjectEvent>;

/// Merged signal streams for one daemon.
pub(crate) struct EventListener {
    conn: Connection,
    service: String,
    session: SessionHandle,
    streams: SelectAll<EventStream>,
    watched: HashSet<String>,
}

fn owned_props(props: &HashMap<&str, Value<'_>>) -> Result<PropertyMap> {
    props
        .iter()
        .map(|(name, value)| {
            let value = value
                .try_to_owned()
                .map_err(|e| IwdError::Dbus(e.into()))?;
            Ok((name.to_string(), value))
        })
        .collect()
}

fn owned_interfaces<K: ToString>(
    interfaces: &HashMap<K, HashMap<&str, Value<'_>>>,
) -> Result<InterfaceMap> {
    interfaces
        .iter()
        .map(|(name, props)| Ok((name.to_string(), owned_props(props)?)))
        .collect()
}

fn interfaces_added(signal: InterfacesAdded) -> Result<ObjectEvent> {
    let args = signal.args()?;
    Ok(ObjectEvent::InterfacesAdded {
        path: args.object_path().to_string(),
        interfaces: owned_interfaces(args.interfaces_and_properties())?,
    })
}

fn interfaces_removed(signal: InterfacesRemoved) -> Result<ObjectEvent> {
    let args = signal.args()?;
    Ok(ObjectEvent::InterfacesRemoved {
        path: args.object_path().to_string(),
        interfaces: args.interfaces().iter().map(|i| i.to_string()).collect(),
    })
}

fn properties_changed(path: &str, signal: PropertiesChanged) -> Result<ObjectEvent> {
    let args = signal.args()?;
    Ok(ObjectEvent::PropertiesChanged {
        path: path.to_string(),
        interface: args.interface_name().to_string(),
        changed: owned_props(args.changed_properties())?,
        invalidated: args
            .invalidated_properties()
            .iter()
            .map(|p| p.to_string())
            .collect(),
    })
}

/// Drops signals that fail to decode, logging them.
fn decoded(kind: &'static str, result: Result<ObjectEvent>) -> future::Ready<Option<ObjectEvent>> {
    future::ready(match result {
        Ok(event) => Some(event),
        Err(e) => {
            warn!("Dropping undecodable {kind} signal: {e}");
            None
        }
    })
}

impl EventListener {
    /// Subscribes to the daemon's object-manager signals.
    ///
    /// Subscribe before enumerating so no change is lost in between; signals
    /// are buffered until [`run`](Self::run) starts consuming them.
    pub(crate) async fn subscribe(
        conn: &Connection,
        service: &str,
        session: SessionHandle,
    ) -> Result<Self> {
        let manager = ObjectManagerProxy::builder(conn)
            .destination(service.to_owned())?
            .path(bus::ROOT_PATH)?
            .build()
            .await?;

        let added = manager
            .receive_interfaces_added()
            .await?
            .filter_map(|s| decoded("InterfacesAdded", interfaces_added(s)));
        let removed = manager
            .receive_interfaces_removed()
            .await?
            .filter_map(|s| decoded("InterfacesRemoved", interfaces_removed(s)));

        let mut streams = SelectAll::new();
        streams.push(added.boxed());
        streams.push(removed.boxed());
        debug!("Subscribed to object manager signals of {service}");

        Ok(Self {
            conn: conn.clone(),
            service: service.to_owned(),
            session,
            streams,
            watched: HashSet::new(),
        })
    }

    /// Subscribes to property changes on `device`, once per path.
    pub(crate) async fn watch_device(&mut self, device: &str) -> Result<()> {
        if self.watched.contains(device) {
            return Ok(());
        }

        let props = PropertiesProxy::builder(&self.conn)
            .destination(self.service.clone())?
            .path(device.to_owned())?
            .build()
            .await?;
        let path = device.to_owned();
        let changes = props
            .receive_properties_changed()
            .await?
            .filter_map(move |s| decoded("PropertiesChanged", properties_changed(&path, s)));

        self.streams.push(changes.boxed());
        self.watched.insert(device.to_owned());
        debug!("Subscribed to property changes on {device}");
        Ok(())
    }

    /// Subscribes to every device in `devices` not yet watched.
    pub(crate) async fn watch_devices(&mut self, devices: &[String]) -> Result<()> {
        for device in devices {
            self.watch_device(device).await?;
        }
        Ok(())
    }

    /// Forwards events to the session until the streams or the session end.
    pub(crate) async fn run(mut self) {
        while let Some(event) = self.streams.next().await {
            let new_device = match &event {
                ObjectEvent::InterfacesAdded { path, interfaces }
                    if interfaces.contains_key(interface::DEVICE) =>
                {
                    Some(path.clone())
                }
                _ => None,
            };

            if self.session.notify(event).is_err() {
                debug!("Session closed, stopping listener for {}", self.service);
                return;
            }

            if let Some(path) = new_device
                && let Err(e) = self.watch_device(&path).await
            {
                warn!("Failed to subscribe to property changes on {path}: {e}");
            }
        }
        warn!("Signal streams of {} ended unexpectedly", self.service);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::props::{bool_opt, str_opt, string_list};
    use zvariant::ObjectPath;

    #[test]
    fn owned_props_keeps_values() {
        let props = HashMap::from([
            ("Name", Value::from("wlan0")),
            ("Powered", Value::from(true)),
            ("Adapter", Value::from(ObjectPath::try_from("/net/connman/iwd/0").unwrap())),
            ("SupportedModes", Value::from(vec!["station", "ap"])),
        ]);
        let owned = owned_props(&props).unwrap();

        assert_eq!(owned.len(), 4);
        assert_eq!(str_opt(&owned, "Name"), Some("wlan0"));
        assert_eq!(bool_opt(&owned, "Powered"), Some(true));
        assert_eq!(str_opt(&owned, "Adapter"), Some("/net/connman/iwd/0"));
        assert_eq!(string_list(&owned, "SupportedModes"), vec!["station", "ap"]);
    }

    #[test]
    fn owned_interfaces_keys_by_interface_name() {
        let interfaces = HashMap::from([
            (
                interface::DEVICE.to_string(),
                HashMap::from([("Name", Value::from("wlan0"))]),
            ),
            (
                interface::STATION.to_string(),
                HashMap::from([("State", Value::from("connected"))]),
            ),
        ]);
        let owned = owned_interfaces(&interfaces).unwrap();

        assert_eq!(owned.len(), 2);
        assert_eq!(str_opt(&owned[interface::DEVICE], "Name"), Some("wlan0"));
        assert_eq!(str_opt(&owned[interface::STATION], "State"), Some("connected"));
    }

    #[test]
    fn empty_maps_convert_to_empty_maps() {
        let props: HashMap<&str, Value<'_>> = HashMap::new();
        assert!(owned_props(&props).unwrap().is_empty());
        let interfaces: HashMap<String, HashMap<&str, Value<'_>>> = HashMap::new();
        assert!(owned_interfaces(&interfaces).unwrap().is_empty());
    }
}
