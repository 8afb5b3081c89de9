//local shortcuts
use crate::*;

//third-party shortcuts
use chrono::{DateTime, Utc};
use tokio::time::{Instant, Interval, MissedTickBehavior};

//standard shortcuts
use std::sync::{Arc, Mutex};
use std::time::Duration;

//-------------------------------------------------------------------------------------------------------------------

/// Emits heartbeat ticks while the channel is connected and watches for inbound silence.
#[derive(Debug)]
pub(crate) struct HeartbeatMonitor
{
    /// time between heartbeats
    period: Duration,
    /// inbound silence after which the channel counts as dead (`None` disables the check)
    timeout: Option<Duration>,
    /// active only while connected
    interval: Option<Interval>,
    /// last time anything arrived from the server
    last_inbound: Instant,
    /// server time from the latest heartbeat ack (diagnostic only)
    last_server_time: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl HeartbeatMonitor
{
    pub(crate) fn new(
        period           : Duration,
        timeout          : Option<Duration>,
        last_server_time : Arc<Mutex<Option<DateTime<Utc>>>>,
    ) -> Self
    {
        Self{
            period,
            timeout,
            interval: None,
            last_inbound: Instant::now(),
            last_server_time,
        }
    }

    /// Start ticking. The first tick arrives one period from now.
    pub(crate) fn start(&mut self)
    {
        let now = Instant::now();
        self.last_inbound = now;
        if self.period.is_zero()
        {
            tracing::warn!("heartbeat interval is zero, heartbeats disabled");
            return;
        }

        let mut interval = tokio::time::interval_at(now + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
    }

    pub(crate) fn stop(&mut self)
    {
        self.interval = None;
    }

    /// Wait for the next tick. Never resolves while stopped.
    pub(crate) async fn tick(&mut self)
    {
        match self.interval.as_mut()
        {
            Some(interval) => { interval.tick().await; }
            None           => std::future::pending::<()>().await,
        }
    }

    pub(crate) fn note_inbound(&mut self)
    {
        self.last_inbound = Instant::now();
    }

    /// True if the server has been silent for longer than the configured timeout.
    pub(crate) fn is_stale(&self) -> bool
    {
        let Some(timeout) = self.timeout else { return false; };
        self.last_inbound.elapsed() > timeout
    }

    pub(crate) fn record_ack(&mut self, ack: &HeartbeatAck)
    {
        let Some(server_time) = ack.server_time else { return; };
        log_server_clock_skew(server_time);

        let Ok(mut last_server_time) = self.last_server_time.lock() else { return; };
        *last_server_time = Some(server_time);
    }
}

//-------------------------------------------------------------------------------------------------------------------

pub(crate) fn log_server_clock_skew(server_time: DateTime<Utc>)
{
    let skew = Utc::now().signed_duration_since(server_time);
    tracing::trace!("server clock skew: {}ms", skew.num_milliseconds());
}

//-------------------------------------------------------------------------------------------------------------------
