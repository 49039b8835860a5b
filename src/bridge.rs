// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! High-level handle to one GaggiMate machine.
//!
//! A [`Bridge`] owns the connection supervisor, the state store, the command
//! dispatcher and the callback listener for a single machine.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::command::CommandKind;
use crate::dispatcher::{CommandDispatcher, CommandHandle, CommandOutcome};
use crate::entity::{EntityId, EntityState, EntityValue};
use crate::error::{CommandError, Error, Result, ValueError};
use crate::event::{BridgeEvent, EventBus};
use crate::protocol::duration_ms;
use crate::state::{DiagnosticState, MachineState, ProfileCatalog, StateChange, StateStore};
use crate::subscription::{CallbackRegistry, Subscribable, SubscriptionId, spawn_listener};
use crate::supervisor::{BridgeConfig, ConnectionStatus, Supervisor};
use crate::types::{MachineMode, MachineStatus, Setpoint};

/// A live bridge to a GaggiMate machine.
///
/// Created with [`Bridge::start`], which spawns the background tasks and
/// returns immediately; the connection comes up asynchronously and is
/// retried forever until [`close`](Self::close) is called or the bridge is
/// dropped.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use gaggimate_bridge::Bridge;
/// use gaggimate_bridge::supervisor::BridgeConfig;
/// use gaggimate_bridge::types::MachineMode;
///
/// # async fn example() -> gaggimate_bridge::Result<()> {
/// let bridge = Bridge::start(BridgeConfig::new("gaggimate.local"))?;
/// bridge.wait_until_available(Duration::from_secs(10)).await?;
///
/// println!("Boiler at {:?} °C", bridge.machine().current_temperature());
///
/// bridge.set_mode(MachineMode::Brew).await?;
/// bridge.set_target_temperature(93.0).await?;
/// bridge.close().await;
/// # Ok(())
/// # }
/// ```
pub struct Bridge {
    config: BridgeConfig,
    store: Arc<StateStore>,
    dispatcher: Arc<CommandDispatcher>,
    events: EventBus,
    callbacks: Arc<CallbackRegistry>,
    status: watch::Receiver<ConnectionStatus>,
    decode_errors: Arc<AtomicU64>,
    shutdown: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Bridge {
    /// Starts a bridge and begins connecting in the background.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::InvalidAddress` if the configured endpoint
    /// cannot be dialed, or `ValueError::ZeroDuration` if a heartbeat,
    /// timeout or backoff setting is zero.
    pub fn start(config: BridgeConfig) -> Result<Self> {
        config.validate()?;
        tracing::info!(endpoint = %config.endpoint, "starting bridge");

        let events = EventBus::with_capacity(config.event_capacity);
        let store = Arc::new(StateStore::new(events.clone()));
        let dispatcher = Arc::new(CommandDispatcher::new(config.command_timeout));
        let callbacks = Arc::new(CallbackRegistry::new());
        let decode_errors = Arc::new(AtomicU64::new(0));
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::disconnected());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let listener = spawn_listener(Arc::clone(&callbacks), events.subscribe());
        let supervisor = Supervisor::new(
            config.clone(),
            Arc::clone(&store),
            Arc::clone(&dispatcher),
            events.clone(),
            status_tx,
            Arc::clone(&decode_errors),
        );
        let supervisor = tokio::spawn(supervisor.run(shutdown_rx));

        Ok(Self {
            config,
            store,
            dispatcher,
            events,
            callbacks,
            status: status_rx,
            decode_errors,
            shutdown: shutdown_tx,
            tasks: Mutex::new(vec![supervisor, listener]),
        })
    }

    /// Returns the configuration this bridge was started with.
    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    // ========== Connection ==========

    /// Returns the current connection status.
    #[must_use]
    pub fn connection_status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    /// Returns a receiver that observes every connection status change.
    #[must_use]
    pub fn connection_watch(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    /// Waits until the link is up.
    ///
    /// # Errors
    ///
    /// Returns `Error::WaitTimeout` if the link is not up within `timeout`,
    /// or `Error::Closed` if the bridge stops first.
    pub async fn wait_until_connected(&self, timeout: Duration) -> Result<()> {
        let mut status = self.status.clone();
        match tokio::time::timeout(timeout, status.wait_for(ConnectionStatus::is_connected)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) => Err(Error::Closed),
            Err(_) => Err(Error::WaitTimeout(duration_ms(timeout))),
        }
    }

    /// Waits until the machine reports telemetry.
    ///
    /// # Errors
    ///
    /// Returns `Error::WaitTimeout` if no telemetry arrives within `timeout`.
    pub async fn wait_until_available(&self, timeout: Duration) -> Result<()> {
        let mut events = self.events.subscribe();
        if self.store.is_available() {
            return Ok(());
        }
        let wait = async {
            loop {
                match events.recv().await {
                    Ok(BridgeEvent::AvailabilityChanged(true)) => return Ok(()),
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        if self.store.is_available() {
                            return Ok(());
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => return Err(Error::Closed),
                }
            }
        };
        tokio::time::timeout(timeout, wait)
            .await
            .unwrap_or(Err(Error::WaitTimeout(duration_ms(timeout))))
    }

    /// Returns `true` while the machine is reporting telemetry.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.store.is_available()
    }

    /// Returns how many inbound frames failed to decode.
    #[must_use]
    pub fn decode_error_count(&self) -> u64 {
        self.decode_errors.load(Ordering::Relaxed)
    }

    // ========== State ==========

    /// Returns a snapshot of the machine state.
    #[must_use]
    pub fn machine(&self) -> MachineState {
        self.store.machine()
    }

    /// Returns a snapshot of the firmware information.
    #[must_use]
    pub fn diagnostics(&self) -> DiagnosticState {
        self.store.diagnostics()
    }

    /// Returns a snapshot of the profile catalogue.
    #[must_use]
    pub fn profiles(&self) -> ProfileCatalog {
        self.store.profiles()
    }

    /// Returns one entity.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> EntityState {
        self.store.entity(id)
    }

    /// Returns every entity.
    #[must_use]
    pub fn entities(&self) -> Vec<EntityState> {
        self.store.entities()
    }

    /// Subscribes to the raw event stream.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<BridgeEvent> {
        self.events.subscribe()
    }

    // ========== Commands ==========

    /// Issues a command and returns a handle to its outcome.
    pub async fn issue(&self, kind: CommandKind) -> CommandHandle {
        self.dispatcher.issue(kind, &self.store.machine()).await
    }

    /// Issues a command and waits for its outcome.
    ///
    /// # Errors
    ///
    /// Returns `Error::Command` if the command fails.
    pub async fn execute(&self, kind: CommandKind) -> Result<CommandOutcome> {
        Ok(self.issue(kind).await.outcome().await?)
    }

    /// Switches the operating mode.
    ///
    /// # Errors
    ///
    /// Returns `Error::Command` if the command fails.
    pub async fn set_mode(&self, mode: MachineMode) -> Result<CommandOutcome> {
        self.execute(CommandKind::SetMode(mode)).await
    }

    /// Moves the brew temperature target to `celsius`.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::Invalid` for a value outside 0–160 °C and
    /// `CommandError::Precondition` before the machine has reported its
    /// current target.
    pub async fn set_target_temperature(&self, celsius: f32) -> Result<CommandOutcome> {
        let setpoint = Setpoint::new(celsius).map_err(CommandError::from)?;
        self.execute(CommandKind::SetTargetTemperature(setpoint)).await
    }

    /// Starts the process of the current mode.
    ///
    /// # Errors
    ///
    /// Returns `Error::Command` if the command fails.
    pub async fn start_brew(&self) -> Result<CommandOutcome> {
        self.execute(CommandKind::StartBrew).await
    }

    /// Stops the running process. A no-op while idle.
    ///
    /// # Errors
    ///
    /// Returns `Error::Command` if the command fails.
    pub async fn stop_brew(&self) -> Result<CommandOutcome> {
        self.execute(CommandKind::StopBrew).await
    }

    /// Enters steam mode and starts steaming.
    ///
    /// # Errors
    ///
    /// Returns `Error::Command` if the command fails.
    pub async fn start_steam(&self) -> Result<CommandOutcome> {
        self.execute(CommandKind::StartSteam).await
    }

    /// Runs a group-head flush.
    ///
    /// # Errors
    ///
    /// Returns `Error::Command` if the command fails.
    pub async fn flush(&self) -> Result<CommandOutcome> {
        self.execute(CommandKind::Flush).await
    }

    /// Selects a brew profile by id.
    ///
    /// # Errors
    ///
    /// Returns `Error::Command` if the command fails.
    pub async fn select_profile(&self, id: impl Into<String>) -> Result<CommandOutcome> {
        self.execute(CommandKind::SelectProfile(id.into())).await
    }

    /// Selects a brew profile by its label in the catalogue.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::Invalid` if no profile has this label.
    pub async fn select_profile_by_label(&self, label: &str) -> Result<CommandOutcome> {
        let id = self
            .store
            .profiles()
            .id_for_label(label)
            .map(str::to_string)
            .map_err(CommandError::from)?;
        self.select_profile(id).await
    }

    /// Turns the machine on (brew mode).
    ///
    /// # Errors
    ///
    /// Returns `Error::Command` if the command fails.
    pub async fn turn_on(&self) -> Result<CommandOutcome> {
        self.set_mode(MachineMode::Brew).await
    }

    /// Turns the machine off (standby).
    ///
    /// # Errors
    ///
    /// Returns `Error::Command` if the command fails.
    pub async fn turn_off(&self) -> Result<CommandOutcome> {
        self.set_mode(MachineMode::Standby).await
    }

    /// Asks the machine to resend its profile list.
    ///
    /// # Errors
    ///
    /// Returns `Error::Command` if the command fails.
    pub async fn refresh_profiles(&self) -> Result<CommandOutcome> {
        self.execute(CommandKind::RequestProfiles).await
    }

    /// Asks the machine to resend its firmware information.
    ///
    /// # Errors
    ///
    /// Returns `Error::Command` if the command fails.
    pub async fn refresh_diagnostics(&self) -> Result<CommandOutcome> {
        self.execute(CommandKind::RequestDiagnostics).await
    }

    // ========== Entity Controls ==========

    /// Presses a button entity.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnsupportedControl` if `entity` is not a button.
    pub async fn press(&self, entity: EntityId) -> Result<CommandOutcome> {
        let kind = entity
            .press_command()
            .ok_or_else(|| Error::UnsupportedControl(entity.key().to_string()))?;
        self.execute(kind).await
    }

    /// Chooses an option of a select entity.
    ///
    /// The mode select takes a mode name (`"Hot Water"`, `"steam"`); the
    /// profile select takes a profile label.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::Invalid` for an unknown option, or
    /// `Error::UnsupportedControl` if `entity` is not a select.
    pub async fn select_option(&self, entity: EntityId, option: &str) -> Result<CommandOutcome> {
        match entity {
            EntityId::ModeSelect => {
                let mode: MachineMode = option.parse().map_err(CommandError::from)?;
                self.set_mode(mode).await
            }
            EntityId::ProfileSelect => self.select_profile_by_label(option).await,
            other => Err(Error::UnsupportedControl(other.key().to_string())),
        }
    }

    /// Sets a number entity.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnsupportedControl` if `entity` is not a number.
    pub async fn set_number(&self, entity: EntityId, value: f32) -> Result<CommandOutcome> {
        match entity {
            EntityId::TargetTemperatureSetpoint => self.set_target_temperature(value).await,
            other => Err(Error::UnsupportedControl(other.key().to_string())),
        }
    }

    /// Turns a switch entity on or off.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnsupportedControl` if `entity` is not a switch.
    pub async fn set_switch(&self, entity: EntityId, on: bool) -> Result<CommandOutcome> {
        match entity {
            EntityId::Power if on => self.turn_on().await,
            EntityId::Power => self.turn_off().await,
            other => Err(Error::UnsupportedControl(other.key().to_string())),
        }
    }

    // ========== Lifecycle ==========

    /// Stops the bridge.
    ///
    /// No frame is sent after this starts. In-flight commands fail with
    /// `ConnectionLost`, the link is closed and the supervisor stops.
    /// Idempotent.
    pub async fn close(&self) {
        if self.shutdown.send_replace(true) {
            return;
        }
        tracing::info!(endpoint = %self.config.endpoint, "closing bridge");
        self.dispatcher.close();

        let tasks = std::mem::take(&mut *self.tasks.lock());
        let mut tasks = tasks.into_iter();
        if let Some(supervisor) = tasks.next()
            && let Err(e) = supervisor.await
        {
            tracing::warn!(error = %e, "supervisor task failed");
        }
        // The listener drains until the bus closes; it is not awaited.
        drop(tasks);
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.shutdown.borrow()
    }
}

impl Subscribable for Bridge {
    fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        self.callbacks.on_state_changed(callback)
    }

    fn on_entity_changed<F>(&self, entity: EntityId, callback: F) -> SubscriptionId
    where
        F: Fn(Option<&EntityValue>) + Send + Sync + 'static,
    {
        self.callbacks.on_entity_changed(entity, callback)
    }

    fn on_availability_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.callbacks.on_availability_changed(callback)
    }

    fn on_connection_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ConnectionStatus) + Send + Sync + 'static,
    {
        self.callbacks.on_connection_changed(callback)
    }

    fn on_mode_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(MachineMode) + Send + Sync + 'static,
    {
        self.callbacks.on_mode_changed(callback)
    }

    fn on_status_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(MachineStatus) + Send + Sync + 'static,
    {
        self.callbacks.on_status_changed(callback)
    }

    fn on_profiles_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&[String]) + Send + Sync + 'static,
    {
        self.callbacks.on_profiles_changed(callback)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.callbacks.unsubscribe(id)
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("endpoint", &self.config.endpoint.url())
            .field("state", &self.status.borrow().state)
            .field("available", &self.store.is_available())
            .field("callbacks", &self.callbacks)
            .finish_non_exhaustive()
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.dispatcher.close();
        self.shutdown.send_replace(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProtocolError;

    fn unreachable_config() -> BridgeConfig {
        // Port 9 on localhost: nothing listens, connects fail fast.
        BridgeConfig::new("127.0.0.1")
            .with_port(9)
            .with_connect_timeout(Duration::from_millis(200))
    }

    #[tokio::test]
    async fn start_rejects_invalid_endpoint() {
        let result = Bridge::start(BridgeConfig::new(""));
        assert!(matches!(
            result,
            Err(Error::Protocol(ProtocolError::InvalidAddress(_)))
        ));
    }

    #[tokio::test]
    async fn start_rejects_zero_heartbeat_interval() {
        let result = Bridge::start(unreachable_config().with_heartbeat_interval(Duration::ZERO));
        assert!(matches!(
            result,
            Err(Error::Value(ValueError::ZeroDuration("heartbeat_interval")))
        ));
    }

    #[tokio::test]
    async fn commands_fail_while_disconnected() {
        let bridge = Bridge::start(unreachable_config()).unwrap();
        let result = bridge.flush().await;
        assert!(matches!(
            result,
            Err(Error::Command(CommandError::ConnectionLost))
        ));
        // Last-known state is not consulted while disconnected.
        assert!(matches!(
            bridge.stop_brew().await,
            Err(Error::Command(CommandError::ConnectionLost))
        ));
        assert!(matches!(
            bridge.set_target_temperature(93.0).await,
            Err(Error::Command(CommandError::ConnectionLost))
        ));
        bridge.close().await;
    }

    #[tokio::test]
    async fn invalid_setpoint_is_rejected_before_sending() {
        let bridge = Bridge::start(unreachable_config()).unwrap();
        let result = bridge.set_target_temperature(200.0).await;
        assert!(matches!(
            result,
            Err(Error::Command(CommandError::Invalid(ValueError::SetpointOutOfRange { .. })))
        ));
        bridge.close().await;
    }

    #[tokio::test]
    async fn unknown_profile_label() {
        let bridge = Bridge::start(unreachable_config()).unwrap();
        let result = bridge.select_profile_by_label("Nope").await;
        assert!(matches!(
            result,
            Err(Error::Command(CommandError::Invalid(ValueError::UnknownProfile(_))))
        ));
        bridge.close().await;
    }

    #[tokio::test]
    async fn controls_reject_wrong_entity() {
        let bridge = Bridge::start(unreachable_config()).unwrap();
        assert!(matches!(
            bridge.press(EntityId::CurrentTemperature).await,
            Err(Error::UnsupportedControl(_))
        ));
        assert!(matches!(
            bridge.select_option(EntityId::Power, "on").await,
            Err(Error::UnsupportedControl(_))
        ));
        assert!(matches!(
            bridge.set_number(EntityId::Mode, 1.0).await,
            Err(Error::UnsupportedControl(_))
        ));
        assert!(matches!(
            bridge.set_switch(EntityId::Flush, true).await,
            Err(Error::UnsupportedControl(_))
        ));
        assert!(matches!(
            bridge.select_option(EntityId::ModeSelect, "espresso").await,
            Err(Error::Command(CommandError::Invalid(ValueError::UnknownModeName(_))))
        ));
        bridge.close().await;
    }

    #[tokio::test]
    async fn close_is_idempotent_and_reports_disconnected() {
        let bridge = Bridge::start(unreachable_config()).unwrap();
        bridge.close().await;
        bridge.close().await;
        assert!(bridge.is_closed());
        assert!(!bridge.connection_status().is_connected());
        assert!(matches!(
            bridge.wait_until_connected(Duration::from_millis(50)).await,
            Err(Error::Closed | Error::WaitTimeout(_))
        ));
    }

    #[tokio::test]
    async fn wait_until_available_times_out() {
        let bridge = Bridge::start(unreachable_config()).unwrap();
        let result = bridge.wait_until_available(Duration::from_millis(50)).await;
        assert!(matches!(result, Err(Error::WaitTimeout(50))));
        bridge.close().await;
    }
}
