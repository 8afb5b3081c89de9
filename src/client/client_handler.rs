//local shortcuts
use crate::*;

//third-party shortcuts
use tokio::time::Instant;

//standard shortcuts
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU8, Ordering};

//-------------------------------------------------------------------------------------------------------------------

/// An envelope on its way to the handler, already encoded and bound to the session it was created under.
#[derive(Debug)]
pub(crate) struct OutboundMessage
{
    pub(crate) envelope: Envelope,
    pub(crate) session_id: String,
    pub(crate) text: String,
}

/// Commands sent from a [`Client`] to its handler.
#[derive(Debug)]
pub(crate) enum ClientCommand
{
    Connect,
    Disconnect,
    Send(OutboundMessage, SendSignal),
    /// The shared session was reset.
    SessionReset,
}

//-------------------------------------------------------------------------------------------------------------------

async fn next_frame(channel: &mut Option<Box<dyn Channel>>) -> Option<Result<String, TransportError>>
{
    match channel.as_mut()
    {
        Some(channel) => channel.next_text().await,
        None          => std::future::pending().await,
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>)
{
    match deadline
    {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None           => std::future::pending().await,
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// Owns the connection of one stream.
///
/// All state changes happen on this task, one event at a time: commands from the client, inbound frames, the
/// reconnect timer, the flush timer, and heartbeat ticks.
pub(crate) struct ClientHandler
{
    /// config
    pub(crate) config: ClientConfig,
    /// base server url
    pub(crate) server_url: url::Url,
    /// stream name (path segment)
    pub(crate) stream: String,
    /// session shared by all streams of the call
    pub(crate) session: SessionIdentity,
    /// opens channels
    pub(crate) connector: Arc<dyn Connector>,
    /// commands from the client
    pub(crate) command_receiver: tokio::sync::mpsc::UnboundedReceiver<ClientCommand>,
    /// send client events to the client
    pub(crate) client_event_sender: crossbeam::channel::Sender<ClientEvent>,
    /// connection state, readable by the client
    pub(crate) state: Arc<AtomicU8>,
    /// durable queue of unsent envelopes
    pub(crate) offline_queue: Arc<Mutex<OfflineQueue>>,
    /// sent transcript chunks awaiting acks
    pub(crate) ack_tracker: Arc<Mutex<AckTracker>>,
    /// current channel (only while connected)
    pub(crate) channel: Option<Box<dyn Channel>>,
    /// session the current channel was opened for
    pub(crate) channel_session: Option<String>,
    /// a channel was opened since the last connect command
    pub(crate) connected_once: bool,
    /// reconnect delays
    pub(crate) backoff: ReconnectBackoff,
    /// cleared by an explicit disconnect
    pub(crate) should_reconnect: bool,
    /// pending reconnect attempt
    pub(crate) reconnect_at: Option<Instant>,
    /// next offline-queue send
    pub(crate) flush_at: Option<Instant>,
    /// heartbeat timer and liveness check
    pub(crate) heartbeat: HeartbeatMonitor,
    /// [ message id : signal ] for queued envelopes
    pub(crate) queued_signals: HashMap<String, SendSignal>,
}

impl ClientHandler
{
    pub(crate) async fn run(mut self)
    {
        loop
        {
            tokio::select!{
                command = self.command_receiver.recv() =>
                {
                    let Some(command) = command else { break; };
                    self.handle_command(command).await;
                }
                frame = next_frame(&mut self.channel) =>
                {
                    self.handle_frame(frame).await;
                }
                _ = sleep_until_deadline(self.reconnect_at) =>
                {
                    self.reconnect_at = None;
                    self.attempt_connect().await;
                }
                _ = sleep_until_deadline(self.flush_at) =>
                {
                    self.flush_at = None;
                    self.flush_next().await;
                }
                _ = self.heartbeat.tick() =>
                {
                    self.handle_heartbeat_tick().await;
                }
            }
        }

        // the client was dropped
        self.shutdown().await;
    }

    fn state(&self) -> ConnectionState
    {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: ConnectionState)
    {
        tracing::trace!(stream = %self.stream, ?state, "client state");
        self.state.store(state.to_u8(), Ordering::Release);
    }

    fn emit(&self, event: ClientEvent)
    {
        if let Err(err) = self.client_event_sender.send(event)
        {
            tracing::debug!(?err, "failed to forward client event to client");
        }
    }

    fn report(&self, report: ClientReport)
    {
        self.emit(ClientEvent::Report(report));
    }

    fn queue_len(&self) -> usize
    {
        let Ok(queue) = self.offline_queue.lock() else { return 0; };
        queue.len()
    }

    async fn handle_command(&mut self, command: ClientCommand)
    {
        match command
        {
            ClientCommand::Connect               => self.handle_connect().await,
            ClientCommand::Disconnect            => self.handle_disconnect().await,
            ClientCommand::Send(message, signal) => self.handle_send(message, signal).await,
            ClientCommand::SessionReset          => self.follow_session().await,
        }
    }

    //---------------------------------------------------------------------------------------------------------------
    // connection lifecycle

    async fn handle_connect(&mut self)
    {
        match self.state()
        {
            ConnectionState::Connected | ConnectionState::Connecting =>
            {
                tracing::debug!(stream = %self.stream, "ignoring connect, already connected");
                return;
            }
            ConnectionState::Reconnecting =>
            {
                // skip the rest of the backoff wait
                self.reconnect_at = None;
            }
            ConnectionState::Disconnected | ConnectionState::Error | ConnectionState::Failed =>
            {
                self.backoff.reset();
            }
        }

        self.should_reconnect = true;
        self.connected_once = false;
        self.attempt_connect().await;
    }

    /// Session the next channel is opened for. Queued envelopes of an earlier session go out before the current
    /// session gets a channel.
    fn target_session(&self) -> String
    {
        let queued = match self.offline_queue.lock()
        {
            Ok(queue) => queue.front().map(|entry| entry.session_id.clone()),
            Err(_)    => None,
        };
        queued.unwrap_or_else(|| self.session.id())
    }

    async fn attempt_connect(&mut self)
    {
        let session_id = self.target_session();
        let Ok(url) = make_stream_url(&self.server_url, &self.stream, &session_id)
        else
        {
            tracing::error!(server_url = %self.server_url, "server url cannot carry a path, not connecting");
            self.should_reconnect = false;
            self.set_state(ConnectionState::Error);
            self.report(ClientReport::TransportError(String::from("invalid server url")));
            return;
        };

        self.set_state(ConnectionState::Connecting);
        tracing::debug!(%url, attempt = self.backoff.attempts(), "connecting");

        let result = match tokio::time::timeout(self.config.connect_timeout, self.connector.connect(&url)).await
        {
            Ok(result) => result,
            Err(_)     => Err(TransportError::Timeout),
        };

        match result
        {
            Ok(channel) => self.on_connected(channel, session_id),
            Err(err)    => self.on_connect_failed(err),
        }
    }

    fn on_connected(&mut self, channel: Box<dyn Channel>, session_id: String)
    {
        tracing::info!(stream = %self.stream, %session_id, "connected");
        self.channel = Some(channel);
        self.channel_session = Some(session_id);
        self.connected_once = true;
        self.backoff.reset();
        self.set_state(ConnectionState::Connected);
        self.heartbeat.start();
        self.report(ClientReport::Connected);

        if self.queue_len() > 0
        {
            self.flush_at = Some(Instant::now());
        }
    }

    fn on_connect_failed(&mut self, err: TransportError)
    {
        tracing::warn!(?err, stream = %self.stream, attempt = self.backoff.attempts(), "connection attempt failed");
        self.report(ClientReport::TransportError(err.to_string()));

        let initial_attempt = !self.connected_once && self.backoff.attempts() == 0;
        if initial_attempt && !self.config.reconnect_on_connect_fail
        {
            self.set_state(ConnectionState::Error);
            return;
        }

        self.schedule_reconnect();
    }

    fn schedule_reconnect(&mut self)
    {
        match self.backoff.next_delay()
        {
            Some(delay) =>
            {
                let attempt = self.backoff.attempts();
                tracing::info!(stream = %self.stream, attempt, delay_ms = delay.as_millis() as u64, "reconnecting");
                self.reconnect_at = Some(Instant::now() + delay);
                self.set_state(ConnectionState::Reconnecting);
                self.report(ClientReport::Reconnecting{ attempt, delay });
            }
            None =>
            {
                let attempts = self.backoff.attempts();
                tracing::error!(stream = %self.stream, attempts, "reconnect attempts exhausted, giving up");
                self.should_reconnect = false;
                self.set_state(ConnectionState::Failed);
                self.report(ClientReport::Failed{ attempts });
            }
        }
    }

    fn handle_channel_lost(&mut self)
    {
        tracing::info!(stream = %self.stream, "connection lost");
        self.channel = None;
        self.channel_session = None;
        self.heartbeat.stop();
        self.flush_at = None;
        self.report(ClientReport::Disconnected);

        if self.should_reconnect
        {
            self.schedule_reconnect();
        }
        else
        {
            self.set_state(ConnectionState::Disconnected);
        }
    }

    async fn handle_disconnect(&mut self)
    {
        if self.state() == ConnectionState::Disconnected
        {
            tracing::warn!(stream = %self.stream, "tried to disconnect an already disconnected client");
            return;
        }

        tracing::info!(stream = %self.stream, "disconnecting");
        self.should_reconnect = false;
        self.reconnect_at = None;
        self.flush_at = None;
        self.heartbeat.stop();
        if let Some(mut channel) = self.channel.take()
        {
            channel.close(NORMAL_CLOSURE, "client done").await;
        }
        self.channel_session = None;
        self.backoff.reset();
        self.set_state(ConnectionState::Disconnected);
        self.report(ClientReport::ClosedBySelf);
    }

    async fn shutdown(&mut self)
    {
        tracing::info!(stream = %self.stream, "client dropped, shutting down handler");
        self.reconnect_at = None;
        self.flush_at = None;
        self.heartbeat.stop();
        if let Some(mut channel) = self.channel.take()
        {
            channel.close(NORMAL_CLOSURE, "client dropped").await;
        }
        self.channel_session = None;
        self.set_state(ConnectionState::Disconnected);
    }

    /// Move the open channel to the current session once nothing queued belongs to the channel's session.
    async fn follow_session(&mut self)
    {
        if self.state() != ConnectionState::Connected { return; }
        if self.channel_session.as_deref() == Some(self.session.id().as_str()) { return; }

        // the flush reopens the channel when it reaches envelopes of another session
        if self.queue_len() > 0 { return; }

        self.switch_session().await;
    }

    async fn switch_session(&mut self)
    {
        let session_id = self.target_session();
        tracing::info!(stream = %self.stream, %session_id, "reopening channel for session");
        self.flush_at = None;
        self.heartbeat.stop();
        if let Some(mut channel) = self.channel.take()
        {
            channel.close(NORMAL_CLOSURE, "session changed").await;
        }
        self.channel_session = None;
        self.report(ClientReport::SessionChanged{ session_id });
        self.attempt_connect().await;
    }

    //---------------------------------------------------------------------------------------------------------------
    // outbound

    fn encode(envelope: &Envelope) -> Result<String, ClientError>
    {
        envelope.encode().map_err(|err| {
                tracing::error!(?err, message_id = envelope.message_id(), "failed serializing envelope");
                ClientError::Serialization
            })
    }

    async fn write(&mut self, text: String) -> Result<(), ClientError>
    {
        let Some(channel) = self.channel.as_mut() else { return Err(ClientError::NotConnected); };
        channel.send_text(text).await?;
        Ok(())
    }

    fn track_sent(&self, envelope: &Envelope, session_id: &str)
    {
        if !envelope.expects_ack() { return; }
        let Ok(mut tracker) = self.ack_tracker.lock() else { return; };
        tracker.track(envelope, session_id);
    }

    async fn handle_send(&mut self, message: OutboundMessage, signal: SendSignal)
    {
        let OutboundMessage{ envelope, session_id, text } = message;

        // new messages go behind anything already queued, and only onto a channel of their own session
        let direct = self.state() == ConnectionState::Connected
            && self.channel.is_some()
            && self.channel_session.as_deref() == Some(session_id.as_str())
            && self.queue_len() == 0;

        if !direct
        {
            self.enqueue(envelope, session_id, signal);
            return;
        }

        match self.write(text).await
        {
            Ok(()) =>
            {
                tracing::trace!(message_id = envelope.message_id(), kind = %envelope.kind(), "sent");
                self.track_sent(&envelope, &session_id);
                signal.set(SendStatus::Sent);
            }
            Err(err) =>
            {
                tracing::warn!(?err, message_id = envelope.message_id(), "send failed, queueing message");
                self.enqueue(envelope, session_id, signal);
                self.report(ClientReport::TransportError(err.to_string()));
                self.handle_channel_lost();
            }
        }
    }

    fn enqueue(&mut self, envelope: Envelope, session_id: String, signal: SendSignal)
    {
        let message_id = String::from(envelope.message_id());
        {
            let Ok(mut queue) = self.offline_queue.lock()
            else
            {
                tracing::error!(%message_id, "offline queue lock poisoned, dropping message");
                signal.set(SendStatus::Dropped);
                return;
            };

            if let Err(err) = queue.enqueue(envelope, session_id)
            {
                tracing::error!(?err, %message_id, "failed persisting offline queue");
            }
            tracing::debug!(%message_id, queued = queue.len(), "message queued");
        }

        signal.set(SendStatus::Queued);
        self.queued_signals.insert(message_id, signal);

        if self.state() == ConnectionState::Connected && self.flush_at.is_none()
        {
            self.flush_at = Some(Instant::now());
        }
    }

    /// Send the oldest queued envelope. Schedules the next send while entries remain.
    async fn flush_next(&mut self)
    {
        if self.state() != ConnectionState::Connected { return; }

        let front = {
            let Ok(queue) = self.offline_queue.lock() else { return; };
            queue.front().cloned()
        };
        let Some(QueuedEnvelope{ envelope, session_id, .. }) = front else { return; };

        if self.channel_session.as_deref() != Some(session_id.as_str())
        {
            self.switch_session().await;
            return;
        }

        let status = match Self::encode(&envelope)
        {
            Err(_)   => SendStatus::Dropped,
            Ok(text) => match self.write(text).await
            {
                Ok(()) => SendStatus::Sent,
                Err(err) =>
                {
                    // the entry stays at the front of the queue
                    tracing::warn!(?err, message_id = envelope.message_id(), "flush interrupted");
                    self.report(ClientReport::TransportError(err.to_string()));
                    self.handle_channel_lost();
                    return;
                }
            }
        };

        let remaining = {
            let Ok(mut queue) = self.offline_queue.lock() else { return; };
            queue.pop_sent(envelope.message_id());
            queue.len()
        };

        if status == SendStatus::Sent
        {
            self.track_sent(&envelope, &session_id);
        }
        if let Some(signal) = self.queued_signals.remove(envelope.message_id())
        {
            signal.set(status);
        }
        tracing::trace!(message_id = envelope.message_id(), remaining, ?status, "flushed queued message");

        if remaining == 0
        {
            tracing::debug!(stream = %self.stream, "offline queue drained");
            self.follow_session().await;
            return;
        }
        self.flush_at = Some(Instant::now() + self.config.flush_interval);
    }

    async fn handle_heartbeat_tick(&mut self)
    {
        if self.state() != ConnectionState::Connected { return; }

        if self.heartbeat.is_stale()
        {
            tracing::warn!(stream = %self.stream, "no traffic from server within heartbeat timeout");
            self.report(ClientReport::TransportError(String::from("heartbeat timeout")));
            self.handle_channel_lost();
            return;
        }

        // heartbeats are never queued
        let Ok(text) = Self::encode(&Envelope::heartbeat()) else { return; };
        if let Err(err) = self.write(text).await
        {
            tracing::warn!(?err, stream = %self.stream, "heartbeat failed");
            self.report(ClientReport::TransportError(err.to_string()));
            self.handle_channel_lost();
        }
    }

    //---------------------------------------------------------------------------------------------------------------
    // inbound

    async fn handle_frame(&mut self, frame: Option<Result<String, TransportError>>)
    {
        match frame
        {
            Some(Ok(text)) => self.handle_text(&text),
            Some(Err(err)) =>
            {
                tracing::warn!(?err, stream = %self.stream, "channel receive error");
                self.report(ClientReport::TransportError(err.to_string()));
                self.handle_channel_lost();
            }
            None => self.handle_channel_lost(),
        }
    }

    fn handle_text(&mut self, text: &str)
    {
        self.heartbeat.note_inbound();

        let envelope = match ServerEnvelope::decode(text)
        {
            Ok(envelope) => envelope,
            Err(err) =>
            {
                tracing::warn!(?err, stream = %self.stream, "dropping malformed message from server");
                return;
            }
        };

        match envelope.msg
        {
            ServerMsg::ConnectionAck(ack) =>
            {
                tracing::info!(stream = %self.stream, person_id = ?ack.person_id, "connection acknowledged");
                self.emit(ClientEvent::ConnectionAck(ack));
            }
            ServerMsg::ChunkAck(ack) =>
            {
                // acks refer to the session of the channel they arrive on
                let session_id = self.channel_session.clone().unwrap_or_default();
                let acked = match self.ack_tracker.lock()
                {
                    Ok(mut tracker) => tracker.acknowledge(&session_id, ack.chunk_index).is_some(),
                    Err(_)          => false,
                };
                if !acked
                {
                    tracing::debug!(chunk_index = ack.chunk_index, "ack for untracked chunk");
                }
                self.emit(ClientEvent::ChunkAck(ack));
            }
            ServerMsg::ExtractedInfo(info) =>
            {
                tracing::debug!(severity = ?info.extraction.severity, "extracted info");
                self.emit(ClientEvent::ExtractedInfo(info));
            }
            ServerMsg::SummaryUpdate(update) =>
            {
                self.emit(ClientEvent::SummaryUpdate(update));
            }
            ServerMsg::HeartbeatAck(ack) =>
            {
                self.heartbeat.record_ack(&ack);
            }
            ServerMsg::Error(err) =>
            {
                tracing::warn!(code = %err.code, message = %err.message, "server error");
                self.emit(ClientEvent::ServerError(err));
            }
        }
    }
}

//-------------------------------------------------------------------------------------------------------------------
