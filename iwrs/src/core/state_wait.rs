//! Per-device completion primitives for scan, connect and state changes.
//!
//! iwd never answers `Scan()` or `Connect()` with the outcome. Completion is
//! only visible later, as a `PropertiesChanged` signal on the station
//! (`Scanning` going false, `State` reaching `connected` or `disconnected`).
//! A [`WaitSlot`] bridges the two: a caller begins a wait before issuing the
//! request, and the property handler resolves it when the signal arrives.
//!
//! Each slot holds at most one pending handle. A second caller beginning a
//! wait on a pending slot joins the existing handle instead of creating a new
//! one, so duplicate requests are never sent. Resolving a slot with nothing
//! pending is a no-op, which absorbs unsolicited notifications.
//!
//! Handles are cloned into every waiter. Dropping a waiter (for instance when
//! the caller races it against a timer) leaves the handle in the slot for the
//! next one.

use futures::channel::oneshot;
use futures::future::{FutureExt, Shared};
use log::debug;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::api::models::{Device, IwdError, PropertyMap, StationState};
use crate::types::constants::interface;
use crate::util::props;
use crate::Result;

/// A cloneable handle that completes when its slot is resolved.
pub(crate) type WaitHandle<T> = Shared<oneshot::Receiver<T>>;

static NEXT_TICKET: AtomicU64 = AtomicU64::new(1);

/// Identifies one pending wait, so only its creator can abandon it.
///
/// Tickets are unique for the lifetime of the process, across slots and
/// devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WaitTicket(u64);

impl WaitTicket {
    fn next() -> Self {
        Self(NEXT_TICKET.fetch_add(1, Ordering::Relaxed))
    }
}

/// The result of beginning a wait on a slot.
pub(crate) enum Wait<T: Clone> {
    /// No wait was pending; the caller owns the new operation and must issue it.
    Started(WaitHandle<T>, WaitTicket),
    /// An operation is already in flight; the caller attached to it.
    Joined(WaitHandle<T>),
}

impl<T: Clone> Wait<T> {
    /// The ticket of a started wait; `None` when joined.
    pub(crate) fn ticket(&self) -> Option<WaitTicket> {
        match self {
            Self::Started(_, ticket) => Some(*ticket),
            Self::Joined(_) => None,
        }
    }

    /// Suspends until the slot is resolved and returns the resolved value.
    pub(crate) async fn wait(self) -> Result<T> {
        let handle = match self {
            Self::Started(h, _) | Self::Joined(h) => h,
        };
        handle.await.map_err(|_| IwdError::WaitCancelled)
    }
}

struct Pending<T: Clone> {
    ticket: WaitTicket,
    tx: oneshot::Sender<T>,
    handle: WaitHandle<T>,
}

/// A single-slot, resolve-once completion.
pub(crate) struct WaitSlot<T: Clone> {
    pending: Option<Pending<T>>,
}

impl<T: Clone> fmt::Debug for WaitSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitSlot")
            .field("pending", &self.pending.as_ref().map(|p| p.ticket))
            .finish()
    }
}

impl<T: Clone> Default for WaitSlot<T> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<T: Clone> WaitSlot<T> {
    /// Creates a pending handle, or joins the one already pending.
    pub(crate) fn begin(&mut self) -> Wait<T> {
        match &self.pending {
            Some(pending) => Wait::Joined(pending.handle.clone()),
            None => {
                let (tx, rx) = oneshot::channel();
                let handle = rx.shared();
                let ticket = WaitTicket::next();
                self.pending = Some(Pending {
                    ticket,
                    tx,
                    handle: handle.clone(),
                });
                Wait::Started(handle, ticket)
            }
        }
    }

    /// Completes the pending handle with `value` and clears the slot.
    ///
    /// Returns `false` when nothing was pending.
    pub(crate) fn resolve(&mut self, value: T) -> bool {
        match self.pending.take() {
            Some(pending) => {
                // Every waiter may already be gone; the slot is cleared either way.
                let _ = pending.tx.send(value);
                true
            }
            None => false,
        }
    }

    /// Drops the pending handle if it is the one `ticket` was issued for.
    ///
    /// Current waiters on that handle observe a cancellation. A handle begun
    /// after the ticketed one resolved is left alone. Returns whether
    /// anything was dropped.
    pub(crate) fn abandon(&mut self, ticket: WaitTicket) -> bool {
        match &self.pending {
            Some(pending) if pending.ticket == ticket => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Wait categories that a failed request can abandon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WaitKind {
    ScanTerminated,
    ConnectOutcome,
}

/// The wait-handles of one device, one slot per category.
#[derive(Debug, Default)]
pub(crate) struct DeviceWaits {
    pub(crate) scan_terminated: WaitSlot<()>,
    pub(crate) state_changed: WaitSlot<bool>,
    pub(crate) connect_outcome: WaitSlot<StationState>,
}

impl DeviceWaits {
    pub(crate) fn abandon(&mut self, kind: WaitKind, ticket: WaitTicket) -> bool {
        match kind {
            WaitKind::ScanTerminated => self.scan_terminated.abandon(ticket),
            WaitKind::ConnectOutcome => self.connect_outcome.abandon(ticket),
        }
    }
}

impl Device {
    /// Applies changed station properties and resolves the matching waits.
    ///
    /// `Scanning` going false resolves the scan wait. A `State` change
    /// updates the device state and resolves the generic state wait; when the
    /// new state is terminal it also resolves the connect wait, since iwd only
    /// reports connect outcomes as state transitions.
    pub(crate) fn apply_station_properties(&mut self, changed: &PropertyMap) {
        if props::bool_opt(changed, "Scanning") == Some(false)
            && self.waits.scan_terminated.resolve(())
        {
            debug!("Scan finished on {}", self.path);
        }

        if let Some(state) = props::str_opt(changed, "State") {
            let state = StationState::from(state);
            debug!("Station {} state: {state}", self.path);
            self.state = Some(state.clone());
            self.waits.state_changed.resolve(true);

            if state.is_terminal() && self.waits.connect_outcome.resolve(state.clone()) {
                debug!("Connect attempt on {} resolved: {state}", self.path);
            }
        }
    }

    /// Applies changed `net.connman.iwd.Device` properties.
    pub(crate) fn apply_device_properties(&mut self, changed: &PropertyMap) {
        if let Some(name) = props::str_opt(changed, "Name") {
            self.name = name.to_owned();
        }
        if let Some(address) = props::str_opt(changed, "Address") {
            self.address = address.to_owned();
        }
        if let Some(powered) = props::bool_opt(changed, "Powered") {
            self.powered = powered;
        }
        if let Some(mode) = props::str_opt(changed, "Mode") {
            self.mode = mode.to_owned();
        }
    }

    /// Dispatches a property change by interface name.
    pub(crate) fn apply_properties(&mut self, iface: &str, changed: &PropertyMap) {
        match iface {
            interface::STATION => self.apply_station_properties(changed),
            interface::DEVICE => self.apply_device_properties(changed),
            other => debug!("Ignoring property change on {other} for {}", self.path),
        }
    }
}
