//local shortcuts
use crate::*;

//third-party shortcuts

//standard shortcuts
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

//-------------------------------------------------------------------------------------------------------------------

/// Clients for all streams of one call, sharing one session.
///
/// Outbound messages are routed to a stream by message type. Unrouted types go to the default stream.
#[derive(Debug)]
pub struct StreamRegistry
{
    session: SessionIdentity,
    default_stream: String,
    /// [ stream name : client ]
    streams: BTreeMap<String, Client>,
    /// [ message type : stream name ]
    routes: HashMap<MessageType, String>,
}

impl StreamRegistry
{
    /// Make an empty registry. Messages without a route go to `default_stream`.
    pub fn new(session: SessionIdentity, default_stream: &str) -> Self
    {
        Self{
            session,
            default_stream : String::from(default_stream),
            streams        : BTreeMap::default(),
            routes         : HashMap::default(),
        }
    }

    /// Make a registry with a [`CALL_STREAM`] client for everything and a [`LOCATION_STREAM`] client for location
    /// updates.
    pub fn call_and_location(
        factory        : &ClientFactory,
        runtime_handle : &tokio::runtime::Handle,
        server_url     : &url::Url,
        session        : &SessionIdentity,
    ) -> Self
    {
        let mut registry = Self::new(session.clone(), CALL_STREAM);
        registry.register(factory.new_client(runtime_handle, server_url.clone(), session, CALL_STREAM));
        registry.register(factory.new_client(runtime_handle, server_url.clone(), session, LOCATION_STREAM));
        registry.route(MessageType::LocationUpdate, LOCATION_STREAM);
        registry
    }

    /// Add a client under its stream name. Replaces (and drops) any client already registered for that stream.
    pub fn register(&mut self, client: Client)
    {
        if client.session_id() != self.session.id()
        {
            tracing::warn!(stream = client.stream(), "registered client does not share the registry session");
        }
        if self.streams.insert(String::from(client.stream()), client).is_some()
        {
            tracing::debug!("replaced registered client");
        }
    }

    /// Send messages of type `kind` to `stream`.
    pub fn route(&mut self, kind: MessageType, stream: &str)
    {
        self.routes.insert(kind, String::from(stream));
    }

    pub fn client(&self, stream: &str) -> Option<&Client>
    {
        self.streams.get(stream)
    }

    /// The client that carries messages of type `kind`.
    pub fn client_for(&self, kind: MessageType) -> Option<&Client>
    {
        let stream = self.routes.get(&kind).unwrap_or(&self.default_stream);
        self.streams.get(stream)
    }

    /// Route and send a message. Returns `None` if no client carries this message type.
    pub fn send(&self, msg: ClientMsg) -> Option<SendSignal>
    {
        let kind = msg.kind();
        let Some(client) = self.client_for(kind)
        else
        {
            tracing::warn!(%kind, "no stream registered for message type, dropping message");
            return None;
        };
        Some(client.send(msg))
    }

    pub fn send_transcript(&self, text: impl Into<String>, location: Option<LocationSample>, is_final: bool)
        -> Option<SendSignal>
    {
        Some(self.client_for(MessageType::TranscriptChunk)?.send_transcript(text, location, is_final))
    }

    pub fn send_location(&self, location: LocationSample, movement: Option<Movement>) -> Option<SendSignal>
    {
        Some(self.client_for(MessageType::LocationUpdate)?.send_location(location, movement))
    }

    pub fn end_call(&self, duration: Duration) -> Option<SendSignal>
    {
        Some(self.client_for(MessageType::CallEnd)?.end_call(duration))
    }

    pub fn connect_all(&self)
    {
        for client in self.streams.values() { client.connect(); }
    }

    pub fn disconnect_all(&self)
    {
        for client in self.streams.values() { client.disconnect(); }
    }

    /// Tries to get the next event from any stream. Streams are polled in name order.
    pub fn next(&self) -> Option<(String, ClientEvent)>
    {
        self.streams
            .iter()
            .find_map(|(stream, client)| client.next().map(|event| (stream.clone(), event)))
    }

    /// Total number of queued envelopes across all streams.
    pub fn queue_len(&self) -> usize
    {
        self.streams.values().map(|client| client.queue_len()).sum()
    }

    pub fn session(&self) -> &SessionIdentity
    {
        &self.session
    }

    /// Start a new session for every stream. Returns the new session id.
    pub fn reset_session(&self) -> String
    {
        let session_id = self.session.reset();
        for client in self.streams.values() { client.follow_session_reset(); }
        session_id
    }
}

//-------------------------------------------------------------------------------------------------------------------
