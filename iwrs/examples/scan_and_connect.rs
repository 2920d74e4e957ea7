/// Example keeping the first device connected to one of a set of networks.
///
/// When the station is disconnected it scans and tries every visible network
/// that is either known to iwd or configured here. Otherwise it waits for the
/// next state change, giving up on a wait after a minute to re-check.
use futures::future::{self, Either};
use futures_timer::Delay;
use iwrs::{ClientConfig, IwdClient, NetworkConfig, StationState};
use std::time::Duration;

#[tokio::main]
async fn main() -> iwrs::Result<()> {
    let config = ClientConfig::new().with_networks([
        NetworkConfig::psk(
            "MyBoxSSID",
            std::env::var("WIFI_PASSWORD").unwrap_or_else(|_| "MyBoxPSK".to_string()),
        ),
        NetworkConfig::psk("OtherBoxSSID", "OtherBoxPSK"),
    ]);
    let client = IwdClient::with_config(config).await?;

    let Some(device) = client.device_paths().await?.into_iter().next() else {
        println!("No wireless device found");
        return Ok(());
    };
    println!("My device: {device}");

    loop {
        match client.device_state(&device).await? {
            Some(StationState::Disconnected) | None => {
                println!("Go scanning!");
                client.scan(&device, true).await?;

                for net in client.networks(&device).await? {
                    if !client.is_known_network(&net).await? {
                        continue;
                    }
                    match client.connect(&device, &net.name, true).await {
                        Ok(state) => println!("Connect result for {}: {state:?}", net.name),
                        Err(e) => println!("Connect to {} failed: {e}", net.name),
                    }
                    if client.device_state(&device).await? == Some(StationState::Connected) {
                        break;
                    }
                }
            }
            Some(state) => {
                println!("My state is: {state}");
                let event = Box::pin(client.wait_state_event(&device));
                match future::select(event, Delay::new(Duration::from_secs(60))).await {
                    Either::Left((result, _)) => result?,
                    Either::Right(_) => println!("No state change for a minute"),
                }
            }
        }
    }
}
