//! Wi-Fi scanning.
//!
//! A scan is requested with `Station.Scan` and finishes when the station's
//! `Scanning` property drops back to false. Concurrent callers share one
//! request: whoever finds no scan pending issues it, the rest join.

use log::debug;

use crate::api::models::RemoteErrorKind;
use crate::core::session::SessionHandle;
use crate::core::state_wait::WaitKind;
use crate::dbus::Transport;
use crate::Result;

/// Scans on `device`, optionally waiting for the scan to finish.
///
/// An `InProgress` reply means iwd is already scanning (possibly on its own
/// initiative); the caller then waits for that scan instead. Any other
/// failure drops the pending wait and is returned.
pub(crate) async fn scan(
    transport: &dyn Transport,
    session: &SessionHandle,
    device: &str,
    wait_result: bool,
) -> Result<()> {
    let wait = session.begin_scan(device).await?;

    if let Some(ticket) = wait.ticket() {
        match transport.scan(device).await {
            Ok(()) => debug!("Scan requested on {device}"),
            Err(e) if e.remote_kind() == Some(RemoteErrorKind::InProgress) => {
                debug!("Scan already in progress on {device}, joining it");
            }
            Err(e) => {
                session.abandon(device, WaitKind::ScanTerminated, ticket);
                return Err(e);
            }
        }
    } else {
        debug!("Joining pending scan on {device}");
    }

    if wait_result {
        wait.wait().await?;
        debug!("Scan on {device} finished");
    }
    Ok(())
}
