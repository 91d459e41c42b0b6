//! LoRaWAN node binary.
//!
//! Runs on both ESP32 and host platforms:
//! - **Host**: `LORAWAN_ACTIVATION=abp LORAWAN_DEV_ADDR=... cargo run --bin node`
//! - **ESP32**: `cargo espflash flash --bin node --features esp32 --release`
//!
//! Keys come from the environment at build time, overridden by the runtime
//! environment on the host. The LoRaWAN stack is the simulated one until a
//! radio driver implements `RadioStack`.

use log::{error, info};
use std::time::Duration;
use ttgo_lorawan_node::lorawan::{CounterPayload, FixedPayload, PayloadSource};
use ttgo_lorawan_node::{run_node, NodeConfig, SimulatedStack, TokioAlarm};

/// Delay between startup and the triggered first uplink.
const FIRST_UPLINK_DELAY: Duration = Duration::from_secs(2);

/// Set to `counter` to send `ping:<n>` instead of the fixed message.
const ENV_PAYLOAD: &str = "LORAWAN_PAYLOAD";

// ESP32: Initialize ESP-IDF before anything else
#[cfg(feature = "esp32")]
fn platform_init() {
    esp_idf_sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
    info!("ESP-IDF initialized");
}

// Host: Just initialize env_logger
#[cfg(not(feature = "esp32"))]
fn platform_init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

fn payload_source() -> Box<dyn PayloadSource> {
    match std::env::var(ENV_PAYLOAD).as_deref() {
        Ok("counter") => Box::new(CounterPayload::default()),
        _ => Box::new(FixedPayload::default()),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    platform_init();

    info!("=== LoRaWAN node starting ===");

    #[cfg(feature = "esp32")]
    info!("Platform: ESP32");
    #[cfg(not(feature = "esp32"))]
    info!("Platform: Host");

    let config = match NodeConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let handle = match run_node(
        config,
        SimulatedStack::new(),
        TokioAlarm::new(),
        payload_source(),
    )
    .await
    {
        Ok(handle) => handle,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    tokio::time::sleep(FIRST_UPLINK_DELAY).await;
    info!("Sending trigger message");
    handle.trigger();

    // Wait for shutdown
    #[cfg(not(feature = "esp32"))]
    {
        let cancel = handle.cancel_token();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutting down...");
                cancel.cancel();
            }
        });
    }

    match handle.join().await {
        Ok(report) => {
            let stats = report.stats;
            info!(
                "Uplinks: {} sent, {} ok, {} timeouts, {} skipped",
                stats.sends(),
                stats.tx_ok,
                stats.completion_timeouts,
                stats.budget_skips
            );
        }
        Err(e) => error!("{}", e),
    }

    info!("Shutdown complete");
}
