//! Browser-side reload client and the reconnect policy it follows.
//!
//! The script in `assets/reload-client.js` is inlined into every served HTML
//! page. It reloads on `"refresh"`, and when the push channel drops it keeps
//! reconnecting at a fixed interval; the first successful reconnect reloads
//! the page (the server came back), and after too many failures it gives up.
//!
//! [`ReconnectState`] is the same state machine on the Rust side. The script
//! receives its constants from [`ReconnectPolicy`], so both agree.

use crate::hub::REFRESH_SIGNAL;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const RELOAD_CLIENT_TEMPLATE: &str = include_str!("../assets/reload-client.js");

/// Reconnect timing used by the reload client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    /// Pause between two reconnect attempts
    pub interval_ms: u64,
    /// How long the client keeps trying before it gives up
    pub max_disconnected_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            interval_ms: 100,
            max_disconnected_ms: 3000,
        }
    }
}

impl ReconnectPolicy {
    /// Highest attempt index that is still tried: `ceil(max / interval)`.
    pub fn max_attempts(&self) -> u64 {
        if self.interval_ms == 0 {
            return 0;
        }
        self.max_disconnected_ms.div_ceil(self.interval_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Where the client is in its connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectState {
    Connected,
    /// Reconnect attempt `attempt` (0-based) is in flight
    Reconnecting { attempt: u64 },
    /// Terminal; only a manual reload recovers
    GivenUp,
}

/// What the client does in response to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectAction {
    /// Nothing to do
    Idle,
    /// `window.location.reload()`
    Reload,
    /// Open a new connection, after `delay`
    OpenConnection { attempt: u64, delay: Duration },
    /// Log the terminal error and stop
    GiveUp,
}

impl ReconnectState {
    /// A push channel message arrived.
    pub fn on_message(self, data: &str) -> (Self, ReconnectAction) {
        match self {
            Self::Connected if data == REFRESH_SIGNAL => (self, ReconnectAction::Reload),
            _ => (self, ReconnectAction::Idle),
        }
    }

    /// The live connection closed.
    pub fn on_close(self) -> (Self, ReconnectAction) {
        match self {
            Self::Connected => (
                Self::Reconnecting { attempt: 0 },
                ReconnectAction::OpenConnection {
                    attempt: 0,
                    delay: Duration::ZERO,
                },
            ),
            other => (other, ReconnectAction::Idle),
        }
    }

    /// The in-flight reconnect attempt failed.
    pub fn on_attempt_failed(self, policy: &ReconnectPolicy) -> (Self, ReconnectAction) {
        match self {
            Self::Reconnecting { attempt } => {
                let next = attempt + 1;
                if next > policy.max_attempts() {
                    (Self::GivenUp, ReconnectAction::GiveUp)
                } else {
                    (
                        Self::Reconnecting { attempt: next },
                        ReconnectAction::OpenConnection {
                            attempt: next,
                            delay: policy.interval(),
                        },
                    )
                }
            }
            other => (other, ReconnectAction::Idle),
        }
    }

    /// The in-flight reconnect attempt opened.
    pub fn on_attempt_opened(self) -> (Self, ReconnectAction) {
        match self {
            Self::Reconnecting { .. } => (Self::Connected, ReconnectAction::Reload),
            other => (other, ReconnectAction::Idle),
        }
    }
}

/// The reload client configured for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadStub {
    pub push_port: u16,
    pub policy: ReconnectPolicy,
}

impl ReloadStub {
    pub fn new(push_port: u16, policy: ReconnectPolicy) -> Self {
        Self { push_port, policy }
    }

    /// The client script with this session's constants filled in.
    pub fn render(&self) -> String {
        RELOAD_CLIENT_TEMPLATE
            .replace("__SERVICHO_PUSH_PORT__", &self.push_port.to_string())
            .replace("__SERVICHO_INTERVAL_MS__", &self.policy.interval_ms.to_string())
            .replace(
                "__SERVICHO_MAX_ATTEMPTS__",
                &self.policy.max_attempts().to_string(),
            )
    }

    /// Inline `<script>` element ready for injection.
    pub fn script_tag(&self) -> String {
        format!("<script>\n{}</script>", self.render())
    }
}
