//local shortcuts
use crate::*;

//third-party shortcuts
use chrono::{DateTime, Utc};

//standard shortcuts
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

//-------------------------------------------------------------------------------------------------------------------

/// A client for one stream of a call.
///
/// Use a [`ClientFactory`] to produce a new client. Every method returns immediately; connection work runs on a
/// handler task in the tokio runtime passed to the factory.
///
/// Sends never fail: a message that cannot be written right now goes into the durable offline queue and is sent in
/// order once the client is connected again.
///
/// Dropping the client closes its channel.
#[derive(Debug)]
pub struct Client
{
    /// stream name
    stream: String,
    /// session shared with other streams of the call
    session: SessionIdentity,
    /// commands for the client handler
    command_sender: tokio::sync::mpsc::UnboundedSender<ClientCommand>,
    /// receiver for client events
    client_event_receiver: crossbeam::channel::Receiver<ClientEvent>,
    /// connection state written by the client handler
    state: Arc<AtomicU8>,
    /// durable queue of unsent envelopes
    offline_queue: Arc<Mutex<OfflineQueue>>,
    /// sent transcript chunks awaiting acks
    ack_tracker: Arc<Mutex<AckTracker>>,
    /// server time from the latest heartbeat ack
    last_server_time: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl Client
{
    /// Start connecting. Does nothing if already connected or connecting.
    ///
    /// If a reconnect is pending, the backoff wait is skipped.
    pub fn connect(&self)
    {
        self.command(ClientCommand::Connect);
    }

    /// Close the channel and stop reconnecting. Queued messages stay queued.
    pub fn disconnect(&self)
    {
        self.command(ClientCommand::Disconnect);
    }

    /// Send a message to the server.
    ///
    /// Returns a signal for tracking whether the message was sent directly or queued.
    ///
    /// The message belongs to the current session and is only ever sent on a channel opened for that session.
    pub fn send(&self, msg: ClientMsg) -> SendSignal
    {
        self.submit(msg, self.session.id())
    }

    fn submit(&self, msg: ClientMsg, session_id: String) -> SendSignal
    {
        let envelope = Envelope::new(msg);

        // unserializable messages are dropped here so they never reach the durable queue
        let text = match envelope.encode()
        {
            Ok(text) => text,
            Err(err) =>
            {
                tracing::error!(?err, kind = %envelope.kind(), "failed serializing client message, dropping it");
                debug_assert!(false, "client message failed to serialize");
                return SendSignal::new(String::from(envelope.message_id()), SendStatus::Dropped);
            }
        };

        let signal = SendSignal::new(String::from(envelope.message_id()), SendStatus::Pending);
        tracing::trace!(message_id = envelope.message_id(), kind = %envelope.kind(), "submitting message");

        let message = OutboundMessage{ envelope, session_id, text };
        if let Err(err) = self.command_sender.send(ClientCommand::Send(message, signal.clone()))
        {
            // handler is gone, keep the message for the next process
            let ClientCommand::Send(message, signal) = err.0 else { return signal; };
            tracing::warn!(stream = %self.stream, "client handler is dead, queueing message");
            self.enqueue_directly(message, &signal);
            return signal;
        }

        signal
    }

    /// Announce the call.
    pub fn send_call_start(&self, device: Option<DeviceInfo>, initial_location: Option<LocationSample>) -> SendSignal
    {
        self.send(ClientMsg::CallStart(CallStart{ device, initial_location }))
    }

    /// Send a transcript segment. Takes the next chunk index of the session.
    pub fn send_transcript(&self, text: impl Into<String>, location: Option<LocationSample>, is_final: bool) -> SendSignal
    {
        self.send_transcript_chunk(text.into(), location, is_final, None)
    }

    /// Send a transcript segment produced inside a voice-agent conversation.
    pub fn send_agent_transcript(&self,
        text            : impl Into<String>,
        location        : Option<LocationSample>,
        is_final        : bool,
        conversation_id : impl Into<String>,
    ) -> SendSignal
    {
        let voice_agent = VoiceAgentRef{ conversation_id: conversation_id.into() };
        self.send_transcript_chunk(text.into(), location, is_final, Some(voice_agent))
    }

    fn send_transcript_chunk(&self,
        text        : String,
        location    : Option<LocationSample>,
        is_final    : bool,
        voice_agent : Option<VoiceAgentRef>,
    ) -> SendSignal
    {
        let (session_id, chunk_index) = self.session.reserve_chunk_index();
        let chunk = TranscriptChunk{
                chunk_index,
                transcript  : TranscriptText{ text, is_final },
                location,
                voice_agent,
            };
        self.submit(ClientMsg::TranscriptChunk(chunk), session_id)
    }

    /// Relay what the voice agent said.
    pub fn send_agent_response(&self, text: impl Into<String>) -> SendSignal
    {
        self.send(ClientMsg::AgentResponse(AgentResponse{ agent: AgentText{ text: text.into() } }))
    }

    /// Send a location sample.
    pub fn send_location(&self, location: LocationSample, movement: Option<Movement>) -> SendSignal
    {
        self.send(ClientMsg::LocationUpdate(LocationUpdate{ location, movement }))
    }

    /// Announce the end of the call with its duration and the number of transcript chunks issued.
    pub fn end_call(&self, duration: Duration) -> SendSignal
    {
        let call_end = CallEnd{
                duration_seconds : duration.as_secs(),
                total_chunks     : self.session.chunks_issued(),
            };
        self.send(ClientMsg::CallEnd(call_end))
    }

    /// Tries to get the next client event.
    pub fn next(&self) -> Option<ClientEvent>
    {
        self.client_event_receiver.try_recv().ok()
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState
    {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_connected(&self) -> bool
    {
        self.state() == ConnectionState::Connected
    }

    /// Number of envelopes waiting in the offline queue.
    pub fn queue_len(&self) -> usize
    {
        let Ok(queue) = self.offline_queue.lock() else { return 0; };
        queue.len()
    }

    /// Copy of the offline queue, oldest first.
    pub fn queued(&self) -> Vec<QueuedEnvelope>
    {
        let Ok(queue) = self.offline_queue.lock() else { return Vec::default(); };
        queue.iter().cloned().collect()
    }

    /// Number of sent transcript chunks the server has not acknowledged.
    pub fn unacked_len(&self) -> usize
    {
        let Ok(tracker) = self.ack_tracker.lock() else { return 0; };
        tracker.len()
    }

    /// Message ids of unacknowledged chunks sent longer than `older_than` ago, oldest first.
    ///
    /// Diagnostic only, nothing is resent.
    pub fn stale_unacked(&self, older_than: Duration) -> Vec<String>
    {
        let Ok(tracker) = self.ack_tracker.lock() else { return Vec::default(); };
        tracker
            .stale(older_than)
            .into_iter()
            .map(|entry| String::from(entry.envelope.message_id()))
            .collect()
    }

    /// Name of this client's stream.
    pub fn stream(&self) -> &str
    {
        &self.stream
    }

    /// Current session id.
    pub fn session_id(&self) -> String
    {
        self.session.id()
    }

    pub fn session(&self) -> &SessionIdentity
    {
        &self.session
    }

    /// Server time reported by the latest heartbeat ack.
    pub fn last_server_time(&self) -> Option<DateTime<Utc>>
    {
        let Ok(last_server_time) = self.last_server_time.lock() else { return None; };
        *last_server_time
    }

    /// Start a new session. Returns the new session id.
    ///
    /// Pending acks are forgotten. Messages queued before the reset still go out under the old session id. Once
    /// they are sent, an open channel is closed and reopened under the new id.
    pub fn reset_session(&self) -> String
    {
        let session_id = self.session.reset();
        self.follow_session_reset();
        session_id
    }

    /// Apply a reset of the shared session to this client.
    pub(crate) fn follow_session_reset(&self)
    {
        if let Ok(mut tracker) = self.ack_tracker.lock() { tracker.clear(); }
        self.command(ClientCommand::SessionReset);
    }

    fn command(&self, command: ClientCommand)
    {
        if self.command_sender.send(command).is_err()
        {
            tracing::error!(stream = %self.stream, "client handler is dead, ignoring command");
        }
    }

    fn enqueue_directly(&self, message: OutboundMessage, signal: &SendSignal)
    {
        let Ok(mut queue) = self.offline_queue.lock()
        else
        {
            signal.set(SendStatus::Dropped);
            return;
        };
        if let Err(err) = queue.enqueue(message.envelope, message.session_id)
        {
            tracing::error!(?err, "failed persisting offline queue");
        }
        signal.set(SendStatus::Queued);
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// Factory for producing [`Client`]s that share a config, a storage backend, and a connector.
#[derive(Debug, Clone)]
pub struct ClientFactory
{
    config    : ClientConfig,
    storage   : Arc<dyn Storage>,
    connector : Arc<dyn Connector>,
}

impl ClientFactory
{
    /// Makes a new client factory that connects over websockets.
    #[cfg(feature = "tungstenite")]
    pub fn new(config: ClientConfig, storage: Arc<dyn Storage>) -> Self
    {
        Self::new_with_connector(config, storage, Arc::new(WsConnector))
    }

    /// Makes a new client factory with a custom connector.
    pub fn new_with_connector(config: ClientConfig, storage: Arc<dyn Storage>, connector: Arc<dyn Connector>) -> Self
    {
        ClientFactory{ config, storage, connector }
    }

    pub fn config(&self) -> &ClientConfig
    {
        &self.config
    }

    pub fn storage(&self) -> Arc<dyn Storage>
    {
        self.storage.clone()
    }

    /// Resume the persisted session or start a new one.
    pub fn session(&self) -> SessionIdentity
    {
        SessionIdentity::load_or_create(self.storage.clone())
    }

    /// Makes a new client for `stream`. The client starts disconnected.
    ///
    /// The client's offline queue is restored from storage.
    pub fn new_client(&self,
        runtime_handle : &tokio::runtime::Handle,
        server_url     : url::Url,
        session        : &SessionIdentity,
        stream         : &str,
    ) -> Client
    {
        let (command_sender, command_receiver) = tokio::sync::mpsc::unbounded_channel::<ClientCommand>();
        let (client_event_sender, client_event_receiver) = crossbeam::channel::unbounded::<ClientEvent>();

        let state = Arc::new(AtomicU8::new(ConnectionState::Disconnected.to_u8()));
        let offline_queue = Arc::new(Mutex::new(OfflineQueue::load(self.storage.clone(), offline_queue_key(stream))));
        let ack_tracker = Arc::new(Mutex::new(AckTracker::default()));
        let last_server_time = Arc::new(Mutex::new(None));

        let handler = ClientHandler{
                config              : self.config.clone(),
                server_url,
                stream              : String::from(stream),
                session             : session.clone(),
                connector           : self.connector.clone(),
                command_receiver,
                client_event_sender,
                state               : state.clone(),
                offline_queue       : offline_queue.clone(),
                ack_tracker         : ack_tracker.clone(),
                channel             : None,
                channel_session     : None,
                connected_once      : false,
                backoff             : ReconnectBackoff::new(self.config.backoff),
                should_reconnect    : false,
                reconnect_at        : None,
                flush_at            : None,
                heartbeat           : HeartbeatMonitor::new(
                        self.config.heartbeat_interval,
                        self.config.heartbeat_timeout,
                        last_server_time.clone(),
                    ),
                queued_signals      : HashMap::default(),
            };
        runtime_handle.spawn(handler.run());

        tracing::info!(stream, session_id = %session.id(), "created new client");

        Client{
                stream: String::from(stream),
                session: session.clone(),
                command_sender,
                client_event_receiver,
                state,
                offline_queue,
                ack_tracker,
                last_server_time,
            }
    }
}

//-------------------------------------------------------------------------------------------------------------------
