//local shortcuts

//third-party shortcuts
use serde::{Serialize, Deserialize};
use serde_with::{serde_as, DurationMilliSeconds};

//standard shortcuts
use std::time::Duration;

//-------------------------------------------------------------------------------------------------------------------

/// Configuration for reconnect backoff. Defaults to 1s doubling up to 30s, with at most 10 attempts.
#[serde_as]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig
{
    /// Delay before the first reconnect attempt. Defaults to 1 second.
    #[serde(rename = "initial_delay_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub initial_delay: Duration,
    /// Upper bound for the delay between attempts. Defaults to 30 seconds.
    #[serde(rename = "max_delay_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub max_delay: Duration,
    /// Maximum number of consecutive failed reconnect attempts before the client gives up. Defaults to 10.
    ///
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for BackoffConfig
{
    fn default() -> BackoffConfig
    {
        BackoffConfig{
            initial_delay : Duration::from_millis(1_000u64),
            max_delay     : Duration::from_millis(30_000u64),
            max_attempts  : Some(10u32),
        }
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// Tracks consecutive reconnect attempts and hands out exponentially growing delays.
/// - Delays never decrease until [`ReconnectBackoff::reset()`] and never exceed the configured maximum.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff
{
    /// backoff configuration
    config: BackoffConfig,
    /// number of attempts handed out since the last reset
    attempts: u32,
    /// delay for the next attempt
    next_delay: Duration,
}

impl ReconnectBackoff
{
    /// Make a new backoff tracker.
    pub fn new(config: BackoffConfig) -> ReconnectBackoff
    {
        ReconnectBackoff{
                config,
                attempts   : 0u32,
                next_delay : config.initial_delay.min(config.max_delay),
            }
    }

    /// Reserve the next attempt.
    /// - Returns `None` if the attempt budget is exhausted.
    pub fn next_delay(&mut self) -> Option<Duration>
    {
        if let Some(max_attempts) = self.config.max_attempts
        {
            if self.attempts >= max_attempts { return None; }
        }

        let delay = self.next_delay;
        self.attempts = self.attempts.saturating_add(1);
        self.next_delay = delay
            .checked_mul(2u32)
            .unwrap_or(self.config.max_delay)
            .min(self.config.max_delay);

        Some(delay)
    }

    /// Number of attempts reserved since the last reset.
    pub fn attempts(&self) -> u32
    {
        self.attempts
    }

    /// Delay the next attempt would get.
    pub fn peek_delay(&self) -> Duration
    {
        self.next_delay
    }

    /// Forget all previous attempts (call after a successful connection).
    pub fn reset(&mut self)
    {
        self.attempts = 0u32;
        self.next_delay = self.config.initial_delay.min(self.config.max_delay);
    }
}

//-------------------------------------------------------------------------------------------------------------------
