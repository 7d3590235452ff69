use std::sync::Arc;

use anyhow::Context;
use esdgate_core::constants::{NANO_HANDSHAKE_TIMEOUT, REQUEST_TIMEOUT};
use esdgate_hardware::{MockPin, SensorPoller};
use esdgate_nano::NanoLink;
use esdgate_net::HttpBackend;
use esdgate_station::machine::StationEvent;
use esdgate_station::{Station, StationConfig, spawn_badge_reader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = StationConfig::from_env().context("loading configuration")?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    info!(
        version = esdgate_core::VERSION,
        station = %config.station_id,
        api = %config.api_url,
        "starting esd gate station"
    );

    let backend = Arc::new(
        HttpBackend::new(config.api_url.as_str(), REQUEST_TIMEOUT)
            .context("building HTTP backend")?,
    );

    let nano = match NanoLink::open(&config.nano_port, config.nano_baud) {
        Ok(mut link) => match link.handshake(NANO_HANDSHAKE_TIMEOUT).await {
            Ok(()) => Some(link),
            Err(error) => {
                warn!(%error, port = %config.nano_port, "test controller not responding; serial commands disabled");
                None
            }
        },
        Err(error) => {
            warn!(%error, port = %config.nano_port, "cannot open test controller port; serial commands disabled");
            None
        }
    };

    // GPIO pin drivers hook in behind the DigitalInput/DigitalOutput
    // traits; the mock pins keep the station runnable off-target. Foot
    // sensors rest high (light detected, nobody standing).
    let (motion, _motion_pin) = MockPin::new("ir-motion");
    let (left, left_pin) = MockPin::new("foot-left");
    let (right, right_pin) = MockPin::new("foot-right");
    let (gate, _gate_pin) = MockPin::new("gate-relay");
    left_pin.set_high();
    right_pin.set_high();
    let poller = SensorPoller::new(motion, left, right, gate);

    let (station, handle) = Station::new(
        config.station_id.clone(),
        poller,
        nano,
        backend,
        config.records_file.clone(),
    );

    // badge scans arrive as lines on stdin
    spawn_badge_reader(tokio::io::stdin(), handle.events.clone());

    let shutdown_events = handle.events.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown_events.send(StationEvent::ShutdownRequested).await.ok();
        }
    });

    // `handle.frames` is the camera feed; the GUI layer pushes JPEG frames
    // into it and renders the StationView snapshots.
    station.run().await;
    Ok(())
}
