//! Real-time mirroring of daemon changes.
//!
//! This module turns the daemon's D-Bus signals into object events for the
//! graph session.

pub(crate) mod events;
