//! XRS Radio Bridge
//!
//! Headless bridge between XRS radios and a home-automation front-end.
//! Radios are reached over their Bluetooth SPP serial device; entity state
//! and commands travel as JSON lines on stdout/stdin.

mod frontend;

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use xrs_hub::{
    run_hub_actor, run_serial_link, BridgeConfig, HubCommand, HubHandle, HubInput, RadioLink,
    XrsDevice, AT_QUEUE_CAPACITY, COMMAND_QUEUE_CAPACITY, INPUT_QUEUE_CAPACITY,
};
use xrs_sim::{run_virtual_radio_task, VirtualXrsConfig, VirtualXrsRadio};

use frontend::{Event, JsonSinkFactory};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// YAML configuration file
    #[arg(default_value = "xrs-bridge.yaml")]
    config: PathBuf,

    /// Talk to a virtual radio instead of the configured serial ports
    #[arg(long)]
    simulate: bool,

    /// JSON description of the virtual radio
    #[arg(long, requires = "simulate")]
    sim_config: Option<PathBuf>,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

/// Run a link against an in-process virtual radio
async fn run_simulated_link(
    name: String,
    config: VirtualXrsConfig,
    hub_tx: mpsc::Sender<HubInput>,
    mut at_rx: mpsc::Receiver<xrs_protocol::AtCommand>,
) {
    let (link_end, radio_end) = tokio::io::duplex(4096);
    let (_panel_tx, panel_rx) = mpsc::channel(8);
    let (command_tx, _) = broadcast::channel(16);

    let radio = tokio::spawn(run_virtual_radio_task(
        radio_end,
        VirtualXrsRadio::new(config),
        panel_rx,
        command_tx,
    ));

    let exit = RadioLink::new(name.clone(), link_end)
        .run(&hub_tx, &mut at_rx)
        .await;
    debug!("Simulated link {} ended: {:?}", name, exit);

    match radio.await {
        Ok(Ok(_)) => info!("Virtual radio for {} stopped", name),
        Ok(Err(e)) => warn!("Virtual radio for {} failed: {}", name, e),
        Err(e) => warn!("Virtual radio task for {} panicked: {}", name, e),
    }
}

fn load_sim_config(path: Option<&PathBuf>) -> anyhow::Result<VirtualXrsConfig> {
    let Some(path) = path else {
        return Ok(VirtualXrsConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Stdout carries the JSON front-end, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "xrs_bridge=info,xrs_hub=info,xrs_protocol=info,xrs_sim=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config = BridgeConfig::from_file(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let descriptors = config.descriptors()?;
    info!(
        "Loaded {} radio(s) and {} entities from {}",
        config.hubs.len(),
        descriptors.len(),
        args.config.display()
    );
    if args.check {
        return Ok(());
    }

    let sim_config = load_sim_config(args.sim_config.as_ref())?;

    let (event_tx, event_rx) = mpsc::unbounded_channel::<Event>();
    let writer = tokio::spawn(frontend::write_events(event_rx));
    let mut sinks = JsonSinkFactory::new(event_tx.clone());

    let mut handles = HashMap::new();
    let mut actors = Vec::new();

    for hub_config in &config.hubs {
        let id = hub_config.id.clone();
        let (command_tx, command_rx) = mpsc::channel::<HubCommand>(COMMAND_QUEUE_CAPACITY);
        let hub = config
            .build_hub(&id, Box::new(command_tx), &mut sinks)
            .with_context(|| format!("building hub {}", id))?;

        let (input_tx, input_rx) = mpsc::channel(INPUT_QUEUE_CAPACITY);
        let (at_tx, at_rx) = mpsc::channel(AT_QUEUE_CAPACITY);

        if args.simulate || hub_config.port.is_empty() {
            if !args.simulate {
                warn!("No port configured for {}, using a virtual radio", id);
            }
            tokio::spawn(run_simulated_link(
                id.clone(),
                sim_config.clone(),
                input_tx.clone(),
                at_rx,
            ));
        } else {
            info!("Radio {} on {} at {} baud", id, hub_config.port, hub_config.baud_rate);
            tokio::spawn(run_serial_link(
                hub_config.port.clone(),
                hub_config.baud_rate,
                input_tx.clone(),
                at_rx,
            ));
        }

        actors.push(tokio::spawn(run_hub_actor(
            hub,
            XrsDevice::new(),
            input_rx,
            command_rx,
            at_tx,
        )));
        handles.insert(id, HubHandle::new(input_tx));
    }
    drop(sinks);

    tokio::select! {
        result = frontend::read_requests(&handles, event_tx.clone()) => {
            result.context("reading requests")?;
            info!("Input closed, shutting down");
        }
        _ = tokio::signal::ctrl_c() => info!("Interrupted, shutting down"),
    }

    for handle in handles.values() {
        handle.shutdown().await;
    }
    for actor in actors {
        let hub = actor.await.context("hub actor panicked")?;
        info!("Hub {} final stats: {:?}", hub.mac_address(), hub.stats());
    }
    drop(handles);
    drop(event_tx);

    writer.await.context("event writer panicked")??;
    Ok(())
}
