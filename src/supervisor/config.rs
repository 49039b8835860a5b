// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bridge configuration and reconnection backoff.

use std::time::Duration;

use rand::Rng;

use crate::error::{Result, ValueError};
use crate::protocol::Endpoint;

/// Default interval between WebSocket pings while connected.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// Default window without any inbound frame before the link is considered dead.
pub const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound on opening the WebSocket.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default time a command waits for its acknowledgment.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Default capacity of the notification bus.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Configuration of a bridge to one GaggiMate machine.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use gaggimate_bridge::supervisor::{BridgeConfig, ReconnectionPolicy};
///
/// // Defaults: port 80, path /ws
/// let config = BridgeConfig::new("gaggimate.local");
/// assert_eq!(config.endpoint.url(), "ws://gaggimate.local:80/ws");
///
/// // With optional settings
/// let config = BridgeConfig::new("192.168.1.60")
///     .with_port(8080)
///     .with_command_timeout(Duration::from_secs(3))
///     .with_reconnection(ReconnectionPolicy::new().with_max_delay(Duration::from_secs(10)));
/// assert_eq!(config.endpoint.port, 8080);
/// ```
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Where the machine listens.
    pub endpoint: Endpoint,
    /// Reconnection backoff.
    pub reconnection: ReconnectionPolicy,
    /// Interval between pings while connected.
    pub heartbeat_interval: Duration,
    /// Liveness window; no inbound frame for this long drops the link.
    pub heartbeat_timeout: Duration,
    /// Bound on opening the WebSocket.
    pub connect_timeout: Duration,
    /// Time a command waits for its acknowledgment.
    pub command_timeout: Duration,
    /// Capacity of the notification bus.
    pub event_capacity: usize,
}

impl BridgeConfig {
    /// Creates a configuration for the machine at `host` with defaults.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            endpoint: Endpoint::new(host),
            reconnection: ReconnectionPolicy::default(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Sets the TCP port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.endpoint.port = port;
        self
    }

    /// Sets the WebSocket path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.endpoint.path = path.into();
        self
    }

    /// Sets the reconnection policy.
    #[must_use]
    pub fn with_reconnection(mut self, policy: ReconnectionPolicy) -> Self {
        self.reconnection = policy;
        self
    }

    /// Sets the ping interval.
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Sets the liveness window.
    #[must_use]
    pub fn with_heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = timeout;
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the command acknowledgment timeout.
    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Sets the notification bus capacity.
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Checks the endpoint and that every timing is non-zero.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::InvalidAddress` for an endpoint that cannot be
    /// dialed, or `ValueError::ZeroDuration` naming the first zero timing.
    pub fn validate(&self) -> Result<()> {
        self.endpoint.validate()?;

        let timings = [
            ("heartbeat_interval", self.heartbeat_interval),
            ("heartbeat_timeout", self.heartbeat_timeout),
            ("connect_timeout", self.connect_timeout),
            ("command_timeout", self.command_timeout),
            ("initial_delay", self.reconnection.initial_delay),
            ("max_delay", self.reconnection.max_delay),
        ];
        if let Some((name, _)) = timings.iter().find(|(_, value)| value.is_zero()) {
            return Err(ValueError::ZeroDuration(*name).into());
        }
        Ok(())
    }
}

/// Exponential backoff between reconnection attempts.
///
/// The supervisor never gives up; this policy only shapes the delays.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use gaggimate_bridge::supervisor::ReconnectionPolicy;
///
/// let policy = ReconnectionPolicy::new()
///     .with_initial_delay(Duration::from_secs(1))
///     .with_max_delay(Duration::from_secs(30));
///
/// assert_eq!(policy.delay_for_attempt(0), Duration::from_secs(1));
/// assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(8));
/// assert_eq!(policy.delay_for_attempt(10), Duration::from_secs(30));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectionPolicy {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on any delay.
    pub max_delay: Duration,
    /// Growth factor between attempts.
    pub backoff_multiplier: f32,
    /// Relative jitter applied to each delay (0.1 means ±10%).
    pub jitter: f32,
}

impl ReconnectionPolicy {
    /// Creates a policy with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the delay before the first retry.
    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the upper bound on delays.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the growth factor.
    #[must_use]
    pub fn with_backoff_multiplier(mut self, multiplier: f32) -> Self {
        self.backoff_multiplier = multiplier.max(1.0);
        self
    }

    /// Sets the relative jitter, clamped to 0.0-1.0.
    #[must_use]
    pub fn with_jitter(mut self, jitter: f32) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Calculates the delay for a given retry attempt, without jitter.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return self.initial_delay.min(self.max_delay);
        }

        let multiplier = self
            .backoff_multiplier
            .powi(i32::try_from(attempt).unwrap_or(i32::MAX));

        // Delays are seconds to minutes, far from the precision limits.
        #[allow(clippy::cast_precision_loss)]
        let delay_ms = self.initial_delay.as_millis() as f32 * multiplier;

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let delay = if delay_ms.is_finite() {
            Duration::from_millis(delay_ms as u64)
        } else {
            self.max_delay
        };

        delay.min(self.max_delay)
    }
}

impl Default for ReconnectionPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: 0.1,
        }
    }
}

/// Stateful backoff sequence for one run of reconnection attempts.
///
/// Delays never decrease within a run and never exceed the policy's maximum,
/// even with jitter. [`reset`](Self::reset) starts a new run.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectionPolicy,
    attempt: u32,
    previous: Duration,
}

impl Backoff {
    /// Creates a backoff at its first attempt.
    #[must_use]
    pub fn new(policy: ReconnectionPolicy) -> Self {
        Self {
            policy,
            attempt: 0,
            previous: Duration::ZERO,
        }
    }

    /// Returns the number of delays handed out since the last reset.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Returns the next delay with random jitter.
    pub fn next_delay(&mut self) -> Duration {
        let sample = rand::thread_rng().gen_range(-1.0f32..=1.0);
        self.next_delay_with(sample)
    }

    /// Returns the next delay using `sample` (in -1.0..=1.0) as the jitter.
    pub fn next_delay_with(&mut self, sample: f32) -> Duration {
        let base = self.policy.delay_for_attempt(self.attempt);
        let factor = 1.0 + f64::from(self.policy.jitter) * f64::from(sample.clamp(-1.0, 1.0));
        let jittered = base.mul_f64(factor.max(0.0));

        let delay = jittered.max(self.previous).min(self.policy.max_delay);
        self.previous = delay;
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    /// Starts a new run at the initial delay.
    pub fn reset(&mut self) {
        self.attempt = 0;
        self.previous = Duration::ZERO;
    }
}
