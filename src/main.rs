//! PulseKit - Heart-rate monitoring CLI.
//!
//! Connects to the first heart-rate strap found, streams live bpm and zone
//! to stdout, and finalizes the session on Ctrl-C.

use anyhow::Context;
use pulsekit::engine::BiometricEngine;
use pulsekit::sensors::types::MonitorEvent;
use pulsekit::storage::config::{get_data_dir, ConfigStore};
use pulsekit::storage::store::SessionStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting PulseKit v{}", env!("CARGO_PKG_VERSION"));

    if !BiometricEngine::is_supported().await {
        anyhow::bail!("No Bluetooth adapter available on this platform");
    }

    let config_store = ConfigStore::load_default().context("failed to load configuration")?;
    let session_store = SessionStore::open(get_data_dir().join("sessions.db"))
        .context("failed to open session store")?;
    let mut engine = BiometricEngine::new(config_store, session_store);
    let events = engine.event_receiver();

    engine.initialize().await.context("BLE initialization failed")?;
    engine.connect().await.context("could not connect to a heart rate monitor")?;
    engine.start_session(None)?;

    println!("Recording. Press Ctrl-C to stop.");

    let printer = std::thread::spawn(move || {
        for event in events {
            match event {
                MonitorEvent::Sample { sample, zone } => {
                    let contact = match sample.sensor_contact {
                        Some(false) => " [no contact]",
                        _ => "",
                    };
                    println!("{:>3} bpm  {}{}", sample.bpm, zone.name, contact);
                }
                MonitorEvent::ConnectionChanged(state) => {
                    println!("-- {}", state);
                }
                MonitorEvent::Error(message) => {
                    tracing::warn!("{}", message);
                }
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    println!("\nStopping...");

    // Disconnect finalizes and persists the open session. The printer
    // thread stays parked on the channel until the engine drops with us.
    engine.disconnect().await?;
    drop(printer);

    if let Some(session) = engine.saved_sessions()?.into_iter().last() {
        println!(
            "Session {}: {:.1} min, avg {} / max {} / min {} bpm, {:.0} kcal",
            session.id,
            session.duration_minutes(),
            session.average_bpm,
            session.max_bpm,
            session.min_bpm,
            session.calories_burned,
        );
        if let Some(hrv) = &session.hrv_metrics {
            let recovery = engine.recovery_score(hrv);
            println!(
                "HRV: RMSSD {:.1} ms, SDNN {:.1} ms, pNN50 {:.1}%, mean RR {:.0} ms",
                hrv.rmssd_ms, hrv.sdnn_ms, hrv.pnn50_percent, hrv.mean_rr_ms
            );
            println!(
                "Recovery: {:.0}/100 ({}) - {}",
                recovery.score, recovery.band, recovery.recommendation
            );
        }
    }

    Ok(())
}
