//! Connecting a station to a visible network.
//!
//! `Network.Connect` does not report the outcome. The attempt resolves when
//! the station state reaches `connected` or `disconnected`, which the
//! property handler turns into the device's connect wait.

use log::{debug, warn};

use crate::api::models::{IwdError, RemoteErrorKind, StationState};
use crate::core::session::SessionHandle;
use crate::core::state_wait::WaitKind;
use crate::dbus::Transport;
use crate::types::constants::retry::CONNECT_ATTEMPTS;
use crate::Result;

/// Connects `device` to the visible network named `network`.
///
/// The network is looked up by SSID in the device's current network list;
/// a miss returns [`IwdError::NotFound`] and the caller should rescan. If a
/// connect is already pending on the device, the call joins it instead of
/// issuing another request.
///
/// With `wait_result` the call returns the terminal station state of the
/// attempt; otherwise the state current when the call returns.
pub(crate) async fn connect(
    transport: &dyn Transport,
    session: &SessionHandle,
    device: &str,
    network: &str,
    wait_result: bool,
) -> Result<Option<StationState>> {
    let (network_path, wait) = session.begin_connect(device, network).await?;

    if let Some(ticket) = wait.ticket() {
        if let Err(e) = connect_with_retries(transport, &network_path).await {
            session.abandon(device, WaitKind::ConnectOutcome, ticket);
            return Err(e);
        }
    } else {
        debug!("Joining pending connect on {device}");
    }

    if wait_result {
        let state = wait.wait().await?;
        debug!("Connect to {network} on {device} ended: {state}");
        return Ok(Some(state));
    }

    let device = device.to_string();
    session
        .inspect(move |graph| {
            graph
                .find_device_by_path(&device)
                .ok()
                .and_then(|d| d.state.clone())
        })
        .await
}

/// Calls `Network.Connect`, retrying only when iwd aborts the request.
async fn connect_with_retries(transport: &dyn Transport, network_path: &str) -> Result<()> {
    for attempt in 1..=CONNECT_ATTEMPTS {
        match transport.connect(network_path).await {
            Ok(()) => {
                debug!("Connect requested for {network_path} (attempt {attempt})");
                return Ok(());
            }
            Err(e) if e.remote_kind() == Some(RemoteErrorKind::Aborted) => {
                debug!("Connect to {network_path} aborted (attempt {attempt}/{CONNECT_ATTEMPTS})");
            }
            Err(e) => return Err(e),
        }
    }

    warn!("Giving up on {network_path} after {CONNECT_ATTEMPTS} aborted attempts");
    Err(IwdError::TooManyRetries(CONNECT_ATTEMPTS))
}

/// Waits for the next station state change on `device`.
pub(crate) async fn wait_state_event(session: &SessionHandle, device: &str) -> Result<()> {
    session.begin_state_wait(device).await?.wait().await?;
    Ok(())
}
