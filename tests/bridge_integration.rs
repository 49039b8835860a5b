// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests against an in-process mock GaggiMate machine.

mod common;

use std::time::Duration;

use common::{MockMachine, WAIT, eventually};
use gaggimate_bridge::{
    Bridge, BridgeEvent, CommandError, CommandKind, CommandOutcome, ConnectionState, EntityId,
    EntityValue, Error, MachineMode, MachineStatus, Setpoint,
};
use serde_json::json;

/// Starts a bridge against `mock` and waits for its first connection.
async fn connected(mock: &mut MockMachine) -> (Bridge, common::MockConnection) {
    let bridge = Bridge::start(mock.config()).unwrap();
    let conn = mock.accept().await;
    bridge.wait_until_connected(WAIT).await.unwrap();
    (bridge, conn)
}

// ============================================================================
// Connection and Availability
// ============================================================================

mod connection {
    use super::*;

    #[tokio::test]
    async fn first_telemetry_makes_machine_available() {
        let mut mock = MockMachine::start().await;
        let (bridge, conn) = connected(&mut mock).await;

        assert!(bridge.connection_status().is_connected());
        assert!(!bridge.is_available());
        assert!(!bridge.entity(EntityId::CurrentTemperature).available);

        conn.status(json!({"ct": 92.34, "tt": 93.0, "m": 1}));
        bridge.wait_until_available(WAIT).await.unwrap();

        let machine = bridge.machine();
        assert_eq!(machine.current_temperature(), Some(92.3));
        assert_eq!(machine.target_temperature(), Some(93.0));
        assert_eq!(machine.mode(), Some(MachineMode::Brew));

        let entity = bridge.entity(EntityId::CurrentTemperature);
        assert!(entity.available);
        assert_eq!(entity.value, Some(EntityValue::Number(92.3)));

        bridge.close().await;
    }

    #[tokio::test]
    async fn primes_diagnostics_and_profiles_on_connect() {
        let mut mock = MockMachine::start().await;
        let (bridge, mut conn) = connected(&mut mock).await;

        conn.answer_ota_settings(json!({
            "hardware": "GaggiMate Pro",
            "displayVersion": "v1.4.0",
            "controllerVersion": "v1.4.0",
            "latestVersion": "v1.5.0",
        }))
        .await;
        conn.answer_profiles(json!([
            {"id": "p-classic", "label": "Classic"},
            {"id": "p-turbo", "label": "Turbo"},
        ]))
        .await;

        assert!(eventually(|| bridge.profiles().len() == 2).await);
        assert!(eventually(|| bridge.diagnostics().hardware().is_some()).await);

        let diagnostics = bridge.diagnostics();
        assert_eq!(diagnostics.hardware(), Some("GaggiMate Pro"));
        assert_eq!(diagnostics.display_update_available(), Some(true));
        assert_eq!(bridge.profiles().labels(), vec!["Classic", "Turbo"]);

        // Diagnostics alone do not make the machine available.
        assert!(!bridge.is_available());

        bridge.close().await;
    }

    #[tokio::test]
    async fn link_drop_fails_in_flight_and_marks_unavailable() {
        let mut mock = MockMachine::start().await;
        let (bridge, mut conn) = connected(&mut mock).await;
        conn.status(json!({"ct": 92.3, "tt": 93.0, "m": 1}));
        bridge.wait_until_available(WAIT).await.unwrap();

        let mut events = bridge.events();
        let flush = bridge.issue(CommandKind::Flush).await;
        conn.expect_request("req:flush:start").await;
        conn.drop_link();

        assert_eq!(flush.outcome().await, Err(CommandError::ConnectionLost));
        let reconnecting = loop {
            let event = tokio::time::timeout(WAIT, events.recv()).await.unwrap().unwrap();
            if let BridgeEvent::ConnectionChanged(status) = event
                && status.state == ConnectionState::Reconnecting
            {
                break status;
            }
        };
        assert_eq!(reconnecting.retry_count, 1);
        assert!(reconnecting.next_retry_at.is_some());
        assert!(!bridge.is_available());

        // Values are retained while unavailable.
        let entity = bridge.entity(EntityId::CurrentTemperature);
        assert!(!entity.available);
        assert_eq!(entity.value, Some(EntityValue::Number(92.3)));

        bridge.close().await;
    }

    #[tokio::test]
    async fn reconnect_restores_availability_with_fresh_fields() {
        let mut mock = MockMachine::start().await;
        let (bridge, conn) = connected(&mut mock).await;
        conn.status(json!({"ct": 92.3, "tt": 93.0, "m": 1}));
        bridge.wait_until_available(WAIT).await.unwrap();

        conn.drop_link();
        assert!(eventually(|| !bridge.is_available()).await);

        let conn = mock.accept().await;
        bridge.wait_until_connected(WAIT).await.unwrap();
        assert!(!bridge.is_available());
        assert_eq!(bridge.connection_status().retry_count, 0);

        conn.status(json!({"ct": 94.0}));
        bridge.wait_until_available(WAIT).await.unwrap();

        let machine = bridge.machine();
        assert_eq!(machine.current_temperature(), Some(94.0));
        assert_eq!(machine.target_temperature(), Some(93.0));
        assert_eq!(machine.mode(), Some(MachineMode::Brew));

        bridge.close().await;
    }

    #[tokio::test]
    async fn silent_machine_is_dropped_and_redialed() {
        let mut mock = MockMachine::start().await;
        let config = mock
            .config()
            .with_heartbeat_interval(Duration::from_secs(60))
            .with_heartbeat_timeout(Duration::from_millis(300));
        let bridge = Bridge::start(config).unwrap();

        // No frames and no pings: the liveness window expires and the bridge redials.
        let _first = mock.accept().await;
        let _second = mock.accept().await;

        bridge.close().await;
    }

    #[tokio::test]
    async fn retries_while_machine_is_unreachable() {
        // Reserve a port, then release it so the first attempts fail.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = gaggimate_bridge::BridgeConfig::new("127.0.0.1")
            .with_port(port)
            .with_reconnection(
                gaggimate_bridge::ReconnectionPolicy::new()
                    .with_initial_delay(Duration::from_millis(20))
                    .with_max_delay(Duration::from_millis(50)),
            );
        let bridge = Bridge::start(config).unwrap();

        assert!(eventually(|| bridge.connection_status().retry_count >= 2).await);
        let status = bridge.connection_status();
        assert!(status.last_error.is_some());
        assert!(matches!(
            status.state,
            ConnectionState::Connecting | ConnectionState::Reconnecting
        ));

        bridge.close().await;
        assert_eq!(bridge.connection_status().state, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn undecodable_frames_are_counted_not_fatal() {
        let mut mock = MockMachine::start().await;
        let (bridge, conn) = connected(&mut mock).await;

        conn.send_text("not json");
        conn.send_text(r#"{"tp":"evt:status","m":9}"#);
        conn.send_binary(&[0xff, 0xfe, b'{', b'}']);
        conn.status(json!({"ct": 91.0}));

        bridge.wait_until_available(WAIT).await.unwrap();
        assert_eq!(bridge.decode_error_count(), 3);
        assert!(bridge.connection_status().is_connected());

        bridge.close().await;
    }
}

// ============================================================================
// Notifications
// ============================================================================

mod notifications {
    use super::*;

    #[tokio::test]
    async fn repeated_frames_notify_once_per_value() {
        let mut mock = MockMachine::start().await;
        let (bridge, conn) = connected(&mut mock).await;
        let mut events = bridge.events();

        for _ in 0..3 {
            conn.status(json!({"ct": 92.3}));
        }
        conn.status(json!({"ct": 93.0}));
        // Marker: the pump flow change tells us every earlier frame was applied.
        conn.status(json!({"fl": 1.5}));

        let mut temperatures = Vec::new();
        loop {
            let event = tokio::time::timeout(WAIT, events.recv()).await.unwrap().unwrap();
            let BridgeEvent::StateChanged(change) = event else {
                continue;
            };
            match change.entity {
                EntityId::CurrentTemperature => temperatures.push(change.number()),
                EntityId::PumpFlow => break,
                _ => {}
            }
        }
        assert_eq!(temperatures, vec![Some(92.3), Some(93.0)]);

        bridge.close().await;
    }

    #[tokio::test]
    async fn brew_with_phase_is_brewing() {
        let mut mock = MockMachine::start().await;
        let (bridge, conn) = connected(&mut mock).await;
        let mut events = bridge.events();

        conn.status(json!({"m": 1, "process": {"l": "infusion"}}));

        let status = loop {
            let event = tokio::time::timeout(WAIT, events.recv()).await.unwrap().unwrap();
            if let BridgeEvent::StateChanged(change) = event
                && let Some(status) = change.status()
            {
                break status;
            }
        };
        assert_eq!(status, MachineStatus::Brewing);
        assert_eq!(
            bridge.entity(EntityId::ProcessPhase).value,
            Some(EntityValue::Text("infusion".to_string()))
        );

        bridge.close().await;
    }

    #[tokio::test]
    async fn callbacks_receive_typed_changes() {
        use gaggimate_bridge::Subscribable;
        use parking_lot::Mutex;
        use std::sync::Arc;

        let mut mock = MockMachine::start().await;
        let (bridge, conn) = connected(&mut mock).await;

        let modes = Arc::new(Mutex::new(Vec::new()));
        let availability = Arc::new(Mutex::new(Vec::new()));
        let m = Arc::clone(&modes);
        let a = Arc::clone(&availability);
        bridge.on_mode_changed(move |mode| m.lock().push(mode));
        bridge.on_availability_changed(move |available| a.lock().push(available));

        conn.status(json!({"m": 2}));
        conn.status(json!({"m": 2}));
        conn.status(json!({"m": 0}));

        assert!(eventually(|| modes.lock().len() == 2).await);
        assert_eq!(*modes.lock(), vec![MachineMode::Steam, MachineMode::Standby]);
        assert_eq!(*availability.lock(), vec![true]);

        bridge.close().await;
    }
}

// ============================================================================
// Commands
// ============================================================================

mod commands {
    use super::*;

    #[tokio::test]
    async fn acknowledged_mode_change() {
        let mut mock = MockMachine::start().await;
        let (bridge, mut conn) = connected(&mut mock).await;

        let handle = bridge.issue(CommandKind::SetMode(MachineMode::Steam)).await;
        let request = conn.expect_request("req:change-mode").await;
        assert_eq!(request["mode"], 2);
        assert_eq!(
            request["rid"],
            json!(handle.request().unwrap().id.to_string())
        );

        conn.ack(&request);
        assert_eq!(handle.outcome().await, Ok(CommandOutcome::Acknowledged));

        bridge.close().await;
    }

    #[tokio::test]
    async fn rejected_command_reports_reason() {
        let mut mock = MockMachine::start().await;
        let (bridge, mut conn) = connected(&mut mock).await;

        let handle = bridge.issue(CommandKind::Flush).await;
        let request = conn.expect_request("req:flush:start").await;
        conn.nack(&request, "machine busy");

        assert_eq!(
            handle.outcome().await,
            Err(CommandError::Rejected("machine busy".to_string()))
        );

        bridge.close().await;
    }

    #[tokio::test]
    async fn unacknowledged_setpoint_times_out_and_keeps_target() {
        let mut mock = MockMachine::start().await;
        let (bridge, mut conn) = connected(&mut mock).await;
        conn.status(json!({"tt": 93.0}));
        assert!(eventually(|| bridge.machine().target_temperature() == Some(93.0)).await);

        let handle = bridge
            .issue(CommandKind::SetTargetTemperature(Setpoint::new(95.0).unwrap()))
            .await;
        let first = conn.expect_request("req:raise-temp").await;
        let second = conn.expect_request("req:raise-temp").await;
        assert!(first.get("rid").is_none());
        assert!(second.get("rid").is_some());

        assert_eq!(handle.outcome().await, Err(CommandError::Timeout(400)));
        assert_eq!(bridge.machine().target_temperature(), Some(93.0));

        bridge.close().await;
    }

    #[tokio::test]
    async fn setpoint_equal_to_target_sends_nothing() {
        let mut mock = MockMachine::start().await;
        let (bridge, conn) = connected(&mut mock).await;
        conn.status(json!({"tt": 93.0}));
        assert!(eventually(|| bridge.machine().target_temperature() == Some(93.0)).await);

        assert_eq!(bridge.set_target_temperature(93.0).await.unwrap(), CommandOutcome::NoOp);

        bridge.close().await;
    }

    #[tokio::test]
    async fn select_profile_by_label_sends_id() {
        let mut mock = MockMachine::start().await;
        let (bridge, mut conn) = connected(&mut mock).await;
        conn.answer_profiles(json!([{"id": "p-turbo", "label": "Turbo"}]))
            .await;
        assert!(eventually(|| bridge.profiles().len() == 1).await);

        let command = bridge.select_option(EntityId::ProfileSelect, "Turbo");
        let answer = async {
            let request = conn.expect_request("req:profiles:select").await;
            assert_eq!(request["id"], "p-turbo");
            conn.ack(&request);
        };
        let (outcome, ()) = tokio::join!(command, answer);
        assert_eq!(outcome.unwrap(), CommandOutcome::Acknowledged);

        bridge.close().await;
    }

    #[tokio::test]
    async fn power_switch_maps_to_mode() {
        let mut mock = MockMachine::start().await;
        let (bridge, mut conn) = connected(&mut mock).await;

        let command = bridge.set_switch(EntityId::Power, false);
        let answer = async {
            let request = conn.expect_request("req:change-mode").await;
            assert_eq!(request["mode"], 0);
            conn.ack(&request);
        };
        let (outcome, ()) = tokio::join!(command, answer);
        assert_eq!(outcome.unwrap(), CommandOutcome::Acknowledged);

        bridge.close().await;
    }

    #[tokio::test]
    async fn close_fails_in_flight_and_rejects_new_commands() {
        let mut mock = MockMachine::start().await;
        let (bridge, mut conn) = connected(&mut mock).await;

        let handle = bridge.issue(CommandKind::Flush).await;
        conn.expect_request("req:flush:start").await;
        bridge.close().await;

        assert_eq!(handle.outcome().await, Err(CommandError::ConnectionLost));
        assert!(matches!(
            bridge.flush().await,
            Err(Error::Command(CommandError::ConnectionLost))
        ));
        assert_eq!(bridge.connection_status().state, ConnectionState::Disconnected);
        assert!(conn.closed_by_bridge().await);
    }
}
