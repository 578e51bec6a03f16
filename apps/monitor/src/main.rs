//! Denon AVR Monitor - headless poller and command tool.
//!
//! Keeps one [`AvrClient`] per configured receiver. `watch` polls in the
//! background and logs state changes; `status` and `power` are one-shot
//! commands for scripts and troubleshooting.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use denonavr_core::protocol_constants::DEFAULT_PORT;
use denonavr_core::{
    AvrClient, BroadcastEvent, BroadcastEventBridge, CommandEvent, EventEmitter,
    NoopEventEmitter, ReceiverEvent, ReceiverHealth, ReceiverMonitor, ReceiverMonitorConfig,
    ReceiverSnapshot, ReqwestTransport, ZoneNumber,
};
use futures::future::join_all;
use serde::Serialize;
use tokio::signal;
use tokio::sync::broadcast;

use crate::config::{MonitorConfig, ReceiverConfig};

/// Denon AVR Monitor - poll and control Denon/Marantz receivers.
#[derive(Parser, Debug)]
#[command(name = "denonavr-monitor")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "DENONAVR_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Receiver host; replaces the receivers from the config file.
    #[arg(long)]
    host: Option<String>,

    /// Port for --host.
    #[arg(short = 'p', long, requires = "host")]
    port: Option<u16>,

    /// Display name for --host.
    #[arg(short = 'n', long, requires = "host")]
    name: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Poll continuously and log state changes (default).
    Watch,

    /// Poll once and print every receiver's state.
    Status {
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Switch a zone, or the whole receiver, on or to standby.
    Power {
        /// Receiver name (required when several are configured).
        #[arg(short, long)]
        receiver: Option<String>,

        /// Zone number; omit to switch the whole receiver.
        #[arg(short, long)]
        zone: Option<ZoneNumber>,

        /// Requested power state.
        #[arg(value_enum)]
        state: PowerState,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum PowerState {
    On,
    Off,
}

/// A configured receiver with its client.
struct Receiver {
    config: ReceiverConfig,
    client: Arc<AvrClient>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Denon AVR Monitor v{}", env!("CARGO_PKG_VERSION"));

    let mut config =
        MonitorConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // CLI receiver replaces the configured list
    if let Some(host) = args.host {
        let port = args.port.unwrap_or(DEFAULT_PORT);
        config.receivers = vec![ReceiverConfig {
            name: args.name.unwrap_or_else(|| host.clone()),
            host,
            port,
        }];
    }

    config.validate().context("Invalid configuration")?;

    log::info!(
        "Configuration: {} receiver(s), poll_interval={}s, settle_delay={}ms",
        config.receivers.len(),
        config.poll_interval,
        config.settle_delay_ms
    );

    match args.command.unwrap_or(Command::Watch) {
        Command::Watch => watch(&config).await,
        Command::Status { json } => status(&config, json).await,
        Command::Power {
            receiver,
            zone,
            state,
        } => power(&config, receiver.as_deref(), zone, state == PowerState::On).await,
    }
}

/// Builds one client per receiver over a shared HTTP transport.
fn build_receivers(
    config: &MonitorConfig,
    receivers: &[ReceiverConfig],
    emitter: Option<Arc<dyn EventEmitter>>,
) -> Result<Vec<Receiver>> {
    let core = config.to_core_config();
    let transport = Arc::new(
        ReqwestTransport::new(core.request_timeout()).context("Failed to build HTTP client")?,
    );

    receivers
        .iter()
        .map(|receiver| -> Result<Receiver> {
            let mut client = AvrClient::with_transport(
                receiver.host.clone(),
                receiver.port,
                transport.clone(),
                &core,
            )
            .with_context(|| format!("Failed to create client for {}", receiver.name))?;
            if let Some(ref emitter) = emitter {
                client = client.with_emitter(Arc::clone(emitter));
            }
            Ok(Receiver {
                config: receiver.clone(),
                client: Arc::new(client),
            })
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// watch
// ─────────────────────────────────────────────────────────────────────────────

async fn watch(config: &MonitorConfig) -> Result<()> {
    let core = config.to_core_config();
    let bridge = BroadcastEventBridge::new(core.event_channel_capacity);
    let logger = tokio::spawn(log_events(bridge.subscribe()));

    let emitter: Arc<dyn EventEmitter> = Arc::new(bridge);
    let receivers = build_receivers(config, &config.receivers, Some(Arc::clone(&emitter)))?;

    let monitors: Vec<Arc<ReceiverMonitor>> = receivers
        .into_iter()
        .map(|receiver| {
            ReceiverMonitor::new(
                receiver.config.name,
                receiver.client,
                Arc::clone(&emitter),
                ReceiverMonitorConfig::from(&core),
            )
            .map(Arc::new)
        })
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to create monitors")?;

    // Initial poll: failures are not fatal, the loop keeps retrying and its
    // first tick comes one interval later
    let results = join_all(monitors.iter().map(|monitor| monitor.poll())).await;
    for (monitor, result) in monitors.iter().zip(results) {
        match result {
            Ok(()) => log::info!(
                "{} ({}): {} zone(s)",
                monitor.name(),
                monitor.client().base_url(),
                monitor.client().zone_count()
            ),
            Err(e) => log::warn!(
                "{} ({}) not reachable yet: {}",
                monitor.name(),
                monitor.client().base_url(),
                e
            ),
        }
    }

    for monitor in &monitors {
        monitor.start_monitoring();
    }

    log::info!("Monitoring started");

    shutdown_signal().await;

    log::info!("Shutdown signal received, stopping monitors...");

    for monitor in &monitors {
        monitor.shutdown();
    }
    logger.abort();

    log::info!("Shutdown complete");
    Ok(())
}

/// Logs events from the bridge until the channel closes.
async fn log_events(mut rx: broadcast::Receiver<BroadcastEvent>) {
    loop {
        match rx.recv().await {
            Ok(BroadcastEvent::Receiver(ReceiverEvent::StateUpdated {
                host,
                snapshot,
                changed: true,
                ..
            })) => {
                log::info!("{}: {}", host, describe(&snapshot));
            }
            Ok(BroadcastEvent::Receiver(ReceiverEvent::StateUpdated { .. })) => {}
            Ok(BroadcastEvent::Receiver(ReceiverEvent::HealthChanged {
                host,
                health,
                reason,
                ..
            })) => match health {
                ReceiverHealth::Reachable => log::info!("{} is reachable again", host),
                ReceiverHealth::Unreachable => log::warn!(
                    "{} is unreachable ({})",
                    host,
                    reason.as_deref().unwrap_or("unknown")
                ),
            },
            Ok(BroadcastEvent::Command(CommandEvent::PowerAccepted {
                host, target, on, ..
            })) => {
                log::info!("{}: power {:?} -> {}", host, target, on_off(on));
            }
            Ok(BroadcastEvent::Command(CommandEvent::PowerFailed {
                host,
                target,
                error,
                ..
            })) => {
                log::warn!("{}: power {:?} failed: {}", host, target, error);
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                log::warn!("Event log lagged, {} event(s) skipped", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// status
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusEntry {
    name: String,
    host: String,
    port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<ReceiverSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn status(config: &MonitorConfig, json: bool) -> Result<()> {
    let receivers = build_receivers(config, &config.receivers, None)?;
    let results = join_all(receivers.iter().map(|r| r.client.update())).await;

    let entries: Vec<StatusEntry> = receivers
        .iter()
        .zip(results)
        .map(|(receiver, result)| StatusEntry {
            name: receiver.config.name.clone(),
            host: receiver.config.host.clone(),
            port: receiver.config.port,
            state: result.as_ref().ok().map(|_| receiver.client.snapshot()),
            error: result.err().map(|e| e.to_string()),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for entry in &entries {
            println!("{} ({}:{})", entry.name, entry.host, entry.port);
            match (&entry.state, &entry.error) {
                (Some(snapshot), _) => print_snapshot(snapshot),
                (None, Some(error)) => println!("  unreachable: {}", error),
                (None, None) => {}
            }
        }
    }

    let failed = entries.iter().filter(|e| e.error.is_some()).count();
    if failed > 0 {
        bail!("{} of {} receiver(s) could not be polled", failed, entries.len());
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// power
// ─────────────────────────────────────────────────────────────────────────────

async fn power(
    config: &MonitorConfig,
    receiver: Option<&str>,
    zone: Option<ZoneNumber>,
    on: bool,
) -> Result<()> {
    let selected = match receiver {
        Some(name) => config
            .receiver(name)
            .with_context(|| format!("No receiver named '{}'", name))?,
        None if config.receivers.len() == 1 => &config.receivers[0],
        None => bail!("--receiver is required when several receivers are configured"),
    };

    let Some(target) = build_receivers(config, std::slice::from_ref(selected), None)?.pop() else {
        bail!("No receiver to command");
    };

    let name = target.config.name.clone();
    let monitor = power_monitor(config, target)?;

    monitor
        .poll()
        .await
        .with_context(|| format!("Failed to poll {}", name))?;

    match zone {
        Some(zone_number) => {
            let state = monitor
                .set_zone_power_confirmed(zone_number, on)
                .await
                .with_context(|| {
                    format!("Failed to switch zone {} {}", zone_number, on_off(on))
                })?;
            println!(
                "{} zone {}: {}",
                name,
                state.zone_number,
                on_off(state.power_on)
            );
            if state.power_on != on {
                log::warn!("Zone {} has not switched yet", zone_number);
            }
        }
        None => {
            let snapshot = monitor
                .set_main_power_confirmed(on)
                .await
                .with_context(|| format!("Failed to switch {} {}", name, on_off(on)))?;
            println!("{}", name);
            print_snapshot(&snapshot);
        }
    }

    Ok(())
}

/// Monitor for a one-shot command.
///
/// Command outcomes are already logged by the monitor through `log`, so no
/// event emitter is attached.
fn power_monitor(config: &MonitorConfig, target: Receiver) -> Result<ReceiverMonitor> {
    ReceiverMonitor::new(
        target.config.name,
        target.client,
        Arc::new(NoopEventEmitter),
        ReceiverMonitorConfig::from(&config.to_core_config()),
    )
    .context("Failed to create monitor")
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "standby"
    }
}

fn print_snapshot(snapshot: &ReceiverSnapshot) {
    for zone in &snapshot.zones {
        println!("  zone {}: {}", zone.zone_number, on_off(zone.power_on));
    }
    println!(
        "  all-zone stereo: {}, members {:?}",
        if snapshot.stereo_group.enabled {
            "enabled"
        } else {
            "disabled"
        },
        snapshot.stereo_group.member_zones
    );
}

/// One-line summary for the event log.
fn describe(snapshot: &ReceiverSnapshot) -> String {
    let zones: Vec<String> = snapshot
        .zones
        .iter()
        .map(|z| format!("Z{}={}", z.zone_number, if z.power_on { "on" } else { "off" }))
        .collect();
    format!(
        "{} | stereo {} {:?}",
        zones.join(" "),
        if snapshot.stereo_group.enabled { "on" } else { "off" },
        snapshot.stereo_group.member_zones
    )
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use denonavr_core::{StereoGroupState, ZoneState};

    #[test]
    fn cli_parses_power_command() {
        let args = Args::try_parse_from([
            "denonavr-monitor",
            "--host",
            "10.0.0.5",
            "power",
            "--zone",
            "2",
            "off",
        ])
        .unwrap();

        assert_eq!(args.host.as_deref(), Some("10.0.0.5"));
        match args.command {
            Some(Command::Power { zone, state, receiver }) => {
                assert_eq!(zone, Some(2));
                assert_eq!(state, PowerState::Off);
                assert!(receiver.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn cli_defaults_to_watch() {
        let args = Args::try_parse_from(["denonavr-monitor"]).unwrap();
        assert!(args.command.is_none());
        assert_eq!(args.log_level, log::LevelFilter::Info);
    }

    #[test]
    fn port_requires_host() {
        assert!(Args::try_parse_from(["denonavr-monitor", "--port", "80", "status"]).is_err());
    }

    #[test]
    fn describe_lists_zones_and_stereo() {
        let snapshot = ReceiverSnapshot {
            zones: vec![
                ZoneState {
                    zone_number: 1,
                    power_on: true,
                },
                ZoneState::new(2),
            ],
            stereo_group: StereoGroupState {
                enabled: true,
                member_zones: [2].into_iter().collect(),
            },
        };
        assert_eq!(describe(&snapshot), "Z1=on Z2=off | stereo on {2}");
    }

    #[tokio::test]
    async fn power_monitor_reports_command_failures() {
        let config = MonitorConfig {
            receivers: vec![ReceiverConfig {
                name: "den".into(),
                host: "127.0.0.1".into(),
                port: 9,
            }],
            request_timeout: 1,
            ..Default::default()
        };
        let target = build_receivers(&config, &config.receivers, None)
            .unwrap()
            .pop()
            .unwrap();

        let monitor = power_monitor(&config, target).unwrap();
        assert_eq!(monitor.name(), "den");

        // Zone 1 has never been reported, so the command fails without I/O.
        let err = monitor.set_zone_power_confirmed(1, true).await.unwrap_err();
        assert!(matches!(err, denonavr_core::AvrError::UnknownZone(1)));
    }

    #[test]
    fn status_entry_omits_missing_fields() {
        let entry = StatusEntry {
            name: "den".into(),
            host: "10.0.0.5".into(),
            port: 8080,
            state: None,
            error: Some("status poll returned HTTP 503".into()),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("state").is_none());
        assert_eq!(json["error"], "status poll returned HTTP 503");
    }
}
