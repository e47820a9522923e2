use std::{str::FromStr, sync::Arc};

use color_eyre::Result;
use eyre::eyre;
use hue::rest::HueClient;
use log::{debug, info, LevelFilter};
use mqtt::topics::Topics;
use protocols::http::mk_hyper_http_client;
use protocols::mqtt::mk_mqtt_client;
use sync::{
    dispatcher::{Dispatcher, BRIDGE_CONCURRENCY},
    engine::SyncEngine,
    scheduler::interval_ticks,
};

use crate::settings::{read_settings, Settings};

mod hue;
mod mqtt;
mod protocols;
mod settings;
mod sync;

fn init_logger(settings: &Settings) -> Result<()> {
    let level = LevelFilter::from_str(&settings.log_level)
        .map_err(|_| eyre!("Invalid log_level {:?}", settings.log_level))?;

    // RUST_LOG can still override individual modules
    pretty_env_logger::formatted_timed_builder()
        .filter_level(level)
        .parse_default_env()
        .try_init()?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let settings = read_settings()?;
    init_logger(&settings)?;

    info!("{} {} starting", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    debug!("loaded settings: {:?}", settings);

    let (control_tx, control_rx) = tokio::sync::mpsc::unbounded_channel();
    let mqtt_client = mk_mqtt_client(&settings, control_tx)?;
    let http_client = mk_hyper_http_client();
    let hue_client = HueClient::new(&settings, &http_client);

    let engine = SyncEngine::new(
        Arc::new(hue_client),
        Arc::new(mqtt_client.clone()),
        Topics::new(settings.mqtt.name.clone()),
        settings.mqtt.retain_status,
        Dispatcher::new(BRIDGE_CONCURRENCY),
    );
    let sync = engine.start(control_rx, interval_ticks(settings.polling_interval()));

    tokio::signal::ctrl_c().await?;

    info!("Shutting down");
    sync.shutdown();
    mqtt_client.shutdown().await;

    Ok(())
}
