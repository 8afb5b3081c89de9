//local shortcuts
use crate::*;

//third-party shortcuts
use serde::{Serialize, Deserialize};
use serde_with::{serde_as, DurationMilliSeconds};

//standard shortcuts
use std::time::Duration;

//-------------------------------------------------------------------------------------------------------------------

/// Config for the [`Client`](crate::Client).
///
/// Deserializes from JSON with millisecond durations; missing fields take their defaults.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig
{
    /// Reconnect backoff and attempt budget.
    pub backoff: BackoffConfig,
    /// Keep retrying (with backoff) if the very first connection attempt fails. Defaults to `true`.
    ///
    /// If `false`, a failed initial attempt leaves the client in [`ConnectionState::Error`] until `connect()` is
    /// called again. Reconnects after a lost connection are not affected.
    pub reconnect_on_connect_fail: bool,
    /// Time between heartbeats while connected. Defaults to 10 seconds.
    #[serde(rename = "heartbeat_interval_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub heartbeat_interval: Duration,
    /// Inbound silence after which the channel is treated as lost. Defaults to `None` (disabled).
    ///
    /// Any frame from the server counts as traffic, not only heartbeat acks.
    #[serde(rename = "heartbeat_timeout_ms")]
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    pub heartbeat_timeout: Option<Duration>,
    /// Pause between consecutive offline-queue sends while draining. Defaults to 100 milliseconds.
    #[serde(rename = "flush_interval_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub flush_interval: Duration,
    /// Upper bound for a single connection attempt. Defaults to 10 seconds.
    #[serde(rename = "connect_timeout_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub connect_timeout: Duration,
}

impl ClientConfig
{
    /// Parse a config from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error>
    {
        serde_json::from_str(json)
    }
}

impl Default for ClientConfig
{
    fn default() -> ClientConfig
    {
        ClientConfig{
                backoff                   : BackoffConfig::default(),
                reconnect_on_connect_fail : true,
                heartbeat_interval        : Duration::from_secs(10),
                heartbeat_timeout         : None,
                flush_interval            : Duration::from_millis(100),
                connect_timeout           : Duration::from_secs(10),
            }
    }
}

//-------------------------------------------------------------------------------------------------------------------
