//! Heart-rate monitor connection management.
//!
//! Owns the BLE adapter and peripheral handle, drives the
//! Disconnected/Connecting/Connected/Error state machine, subscribes to the
//! Heart Rate Measurement characteristic and pumps decoded samples to the
//! session manager and the live event channel.

use crate::metrics::zones;
use crate::sensors::hrs::{
    parse_heart_rate_measurement, HEART_RATE_MEASUREMENT_UUID, HEART_RATE_SERVICE_UUID,
};
use crate::sensors::types::{ConnectionState, MonitorError, MonitorEvent};
use crate::session::manager::SessionManager;
use crate::storage::config::BiometricConfig;
use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use crossbeam::channel::{Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How long discovery scans for a heart-rate strap before giving up.
const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Manages the connection to a single BLE heart-rate monitor.
pub struct HeartRateMonitor {
    config: Arc<Mutex<BiometricConfig>>,
    sessions: Arc<Mutex<SessionManager>>,
    state: Arc<Mutex<ConnectionState>>,
    adapter: Option<Adapter>,
    peripheral: Option<Peripheral>,
    event_tx: Sender<MonitorEvent>,
    event_rx: Receiver<MonitorEvent>,
    pump: Option<tokio::task::JoinHandle<()>>,
}

impl HeartRateMonitor {
    /// Create a monitor sharing the given config and session manager.
    pub fn new(
        config: Arc<Mutex<BiometricConfig>>,
        sessions: Arc<Mutex<SessionManager>>,
    ) -> Self {
        let (event_tx, event_rx) = crossbeam::channel::unbounded();
        Self {
            config,
            sessions,
            state: Arc::new(Mutex::new(ConnectionState::Disconnected)),
            adapter: None,
            peripheral: None,
            event_tx,
            event_rx,
            pump: None,
        }
    }

    /// Whether the platform exposes a usable BLE adapter.
    pub async fn is_supported() -> bool {
        match Manager::new().await {
            Ok(manager) => matches!(manager.adapters().await, Ok(adapters) if !adapters.is_empty()),
            Err(_) => false,
        }
    }

    /// Initialize the BLE adapter. Must be called before `connect()`.
    pub async fn initialize(&mut self) -> Result<(), MonitorError> {
        tracing::info!("Initializing heart rate monitor");

        let manager = Manager::new()
            .await
            .map_err(|_| MonitorError::TransportUnsupported)?;

        let adapters = manager
            .adapters()
            .await
            .map_err(|e| MonitorError::BleError(e.to_string()))?;

        let adapter = adapters
            .into_iter()
            .next()
            .ok_or(MonitorError::AdapterNotFound)?;

        tracing::info!("BLE adapter initialized");
        self.adapter = Some(adapter);

        Ok(())
    }

    /// Get an event receiver for live samples and state transitions.
    ///
    /// The channel lives as long as the monitor. Receivers share one
    /// queue, so each event is delivered to a single receiver.
    pub fn event_receiver(&self) -> Receiver<MonitorEvent> {
        self.event_rx.clone()
    }

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        *self.state.lock().expect("state lock poisoned")
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock().expect("state lock poisoned") = state;
        send_event(&self.event_tx, MonitorEvent::ConnectionChanged(state));
    }

    /// A `disconnect()` during `Connecting` resets the state; every await
    /// point in `connect()` re-checks and bails out when that happened.
    fn ensure_still_connecting(&self) -> Result<(), MonitorError> {
        if self.connection_state() == ConnectionState::Connecting {
            Ok(())
        } else {
            Err(MonitorError::ConnectionFailed(
                "connection cancelled".to_string(),
            ))
        }
    }

    /// Discover, connect and subscribe to the first heart-rate strap found.
    ///
    /// Allowed only from `Disconnected` or `Error`. On failure the state
    /// moves to `Error` and the caller may retry.
    pub async fn connect(&mut self) -> Result<(), MonitorError> {
        match self.connection_state() {
            ConnectionState::Disconnected | ConnectionState::Error => {}
            _ => return Err(MonitorError::InvalidState),
        }

        let adapter = self
            .adapter
            .as_ref()
            .ok_or(MonitorError::AdapterNotFound)?
            .clone();

        self.set_state(ConnectionState::Connecting);

        match self.connect_inner(&adapter).await {
            Ok(peripheral) => {
                self.peripheral = Some(peripheral.clone());
                self.set_state(ConnectionState::Connected);
                self.spawn_notification_pump(peripheral);
                tracing::info!("Connected to heart rate monitor");
                Ok(())
            }
            Err(e) => {
                let _ = adapter.stop_scan().await;
                // Cancellation already moved the state to Disconnected
                if self.connection_state() == ConnectionState::Connecting {
                    self.set_state(ConnectionState::Error);
                }
                tracing::error!("Connection failed: {}", e);
                Err(e)
            }
        }
    }

    async fn connect_inner(&self, adapter: &Adapter) -> Result<Peripheral, MonitorError> {
        let peripheral = self.discover_strap(adapter).await?;
        self.ensure_still_connecting()?;

        peripheral
            .connect()
            .await
            .map_err(|e| MonitorError::ConnectionFailed(e.to_string()))?;

        // The GATT link is live past this point. Tear it down again when
        // the subscription fails, otherwise the strap keeps the dangling
        // link and refuses the retry.
        if let Err(e) = self.subscribe_measurements(&peripheral).await {
            let _ = peripheral.disconnect().await;
            return Err(e);
        }

        Ok(peripheral)
    }

    async fn subscribe_measurements(&self, peripheral: &Peripheral) -> Result<(), MonitorError> {
        self.ensure_still_connecting()?;

        peripheral
            .discover_services()
            .await
            .map_err(|e| MonitorError::ConnectionFailed(e.to_string()))?;
        self.ensure_still_connecting()?;

        let characteristic = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == HEART_RATE_MEASUREMENT_UUID)
            .ok_or_else(|| {
                MonitorError::ConnectionFailed(
                    "device has no Heart Rate Measurement characteristic".to_string(),
                )
            })?;

        peripheral
            .subscribe(&characteristic)
            .await
            .map_err(|e| MonitorError::SubscriptionFailed(e.to_string()))?;

        tracing::debug!("Subscribed to heart rate measurement notifications");
        Ok(())
    }

    /// Scan for the first peripheral advertising the Heart Rate service.
    async fn discover_strap(&self, adapter: &Adapter) -> Result<Peripheral, MonitorError> {
        use futures::stream::StreamExt;

        let mut events = adapter
            .events()
            .await
            .map_err(|e| MonitorError::BleError(e.to_string()))?;

        adapter
            .start_scan(ScanFilter {
                services: vec![HEART_RATE_SERVICE_UUID],
            })
            .await
            .map_err(|e| MonitorError::ConnectionFailed(e.to_string()))?;

        tracing::info!("Scanning for heart rate monitors");

        let found = tokio::time::timeout(DISCOVERY_TIMEOUT, async {
            while let Some(event) = events.next().await {
                if self.connection_state() != ConnectionState::Connecting {
                    return None;
                }

                if let CentralEvent::DeviceDiscovered(id) = event {
                    let peripherals = match adapter.peripherals().await {
                        Ok(p) => p,
                        Err(_) => continue,
                    };

                    for peripheral in peripherals {
                        if peripheral.id() != id {
                            continue;
                        }
                        if Self::advertises_heart_rate(&peripheral).await {
                            return Some(peripheral);
                        }
                    }
                }
            }
            None
        })
        .await;

        let _ = adapter.stop_scan().await;

        match found {
            Ok(Some(peripheral)) => Ok(peripheral),
            Ok(None) => Err(MonitorError::ConnectionFailed(
                "connection cancelled".to_string(),
            )),
            Err(_) => Err(MonitorError::DeviceNotFound),
        }
    }

    async fn advertises_heart_rate(peripheral: &Peripheral) -> bool {
        match peripheral.properties().await {
            Ok(Some(props)) => props.services.contains(&HEART_RATE_SERVICE_UUID),
            _ => false,
        }
    }

    /// Pump notifications from the peripheral until the stream ends.
    fn spawn_notification_pump(&mut self, peripheral: Peripheral) {
        let config = self.config.clone();
        let sessions = self.sessions.clone();
        let state = self.state.clone();
        let event_tx = self.event_tx.clone();

        let handle = tokio::spawn(async move {
            use futures::stream::StreamExt;

            let mut notifications = match peripheral.notifications().await {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::error!("Failed to get notification stream: {}", e);
                    return;
                }
            };

            while let Some(notification) = notifications.next().await {
                if notification.uuid != HEART_RATE_MEASUREMENT_UUID {
                    continue;
                }

                let sample = match parse_heart_rate_measurement(&notification.value) {
                    Ok(sample) => sample,
                    Err(e) => {
                        // Drop the packet, keep the stream alive
                        tracing::warn!("Dropping malformed packet: {}", e);
                        send_event(&event_tx, MonitorEvent::Error(e.to_string()));
                        continue;
                    }
                };

                let max_hr = config.lock().expect("config lock poisoned").max_heart_rate;
                let zone = zones::classify(sample.bpm, max_hr);

                {
                    let mut guard = sessions.lock().expect("session lock poisoned");
                    if guard.current_session().is_some() {
                        if let Err(e) = guard.record_sample(sample.clone()) {
                            tracing::warn!("Failed to record sample: {}", e);
                        }
                    }
                }

                send_event(&event_tx, MonitorEvent::Sample { sample, zone });
            }

            // Stream ended: the transport dropped the connection. Treat it
            // like an explicit disconnect and preserve any open session.
            tracing::info!("Notification stream ended, monitor disconnected");
            finalize_open_session(&sessions);
            *state.lock().expect("state lock poisoned") = ConnectionState::Disconnected;
            send_event(
                &event_tx,
                MonitorEvent::ConnectionChanged(ConnectionState::Disconnected),
            );
        });

        self.pump = Some(handle);
    }

    /// Abort an in-flight `connect()` without touching an established
    /// connection. The pending attempt observes the state change at its
    /// next await point and unwinds.
    pub fn cancel_connect(&self) {
        let mut state = self.state.lock().expect("state lock poisoned");
        if *state == ConnectionState::Connecting {
            *state = ConnectionState::Disconnected;
            drop(state);
            send_event(
                &self.event_tx,
                MonitorEvent::ConnectionChanged(ConnectionState::Disconnected),
            );
        }
    }

    /// Tear down the connection from any state, finalizing an open session.
    pub async fn disconnect(&mut self) -> Result<(), MonitorError> {
        tracing::info!("Disconnecting heart rate monitor");

        // Moving to Disconnected first cancels an in-flight connect()
        *self.state.lock().expect("state lock poisoned") = ConnectionState::Disconnected;

        if let Some(pump) = self.pump.take() {
            pump.abort();
        }

        finalize_open_session(&self.sessions);

        if let Some(peripheral) = self.peripheral.take() {
            peripheral
                .disconnect()
                .await
                .map_err(|e| MonitorError::BleError(e.to_string()))?;
        }

        send_event(
            &self.event_tx,
            MonitorEvent::ConnectionChanged(ConnectionState::Disconnected),
        );

        Ok(())
    }
}

fn send_event(event_tx: &Sender<MonitorEvent>, event: MonitorEvent) {
    let _ = event_tx.send(event);
}

/// Finalize the open session, if any; persistence failures are logged and
/// the session stays queued in the manager for retry.
fn finalize_open_session(sessions: &Arc<Mutex<SessionManager>>) {
    let mut guard = sessions.lock().expect("session lock poisoned");
    match guard.end_session() {
        Ok(Some(session)) => {
            tracing::info!(session_id = %session.id, "Session finalized on disconnect")
        }
        Ok(None) => {}
        Err(e) => tracing::error!("Failed to persist session on disconnect: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> HeartRateMonitor {
        let config = Arc::new(Mutex::new(BiometricConfig::default()));
        let sessions = Arc::new(Mutex::new(SessionManager::new(BiometricConfig::default())));
        HeartRateMonitor::new(config, sessions)
    }

    #[test]
    fn test_initial_state_is_disconnected() {
        let monitor = monitor();
        assert_eq!(monitor.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_receiver_outlives_later_subscriptions() {
        let mut monitor = monitor();
        let first = monitor.event_receiver();
        let _second = monitor.event_receiver();

        monitor.disconnect().await.unwrap();

        // The first receiver is still attached to the monitor's channel
        // and observes the state change.
        assert!(matches!(
            first.try_recv(),
            Ok(MonitorEvent::ConnectionChanged(
                ConnectionState::Disconnected
            ))
        ));
    }
}
