//local shortcuts
use crate::*;

//third-party shortcuts
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

//standard shortcuts

//-------------------------------------------------------------------------------------------------------------------

/// The closed set of wire message types.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType
{
    // client -> server
    CallStart,
    TranscriptChunk,
    AgentResponse,
    LocationUpdate,
    CallEnd,
    Heartbeat,

    // server -> client
    ConnectionAck,
    ChunkAck,
    ExtractedInfo,
    SummaryUpdate,
    HeartbeatAck,
    Error,
}

impl MessageType
{
    pub fn as_str(&self) -> &'static str
    {
        match self
        {
            MessageType::CallStart       => "call_start",
            MessageType::TranscriptChunk => "transcript_chunk",
            MessageType::AgentResponse   => "agent_response",
            MessageType::LocationUpdate  => "location_update",
            MessageType::CallEnd         => "call_end",
            MessageType::Heartbeat       => "heartbeat",
            MessageType::ConnectionAck   => "connection_ack",
            MessageType::ChunkAck        => "chunk_ack",
            MessageType::ExtractedInfo   => "extracted_info",
            MessageType::SummaryUpdate   => "summary_update",
            MessageType::HeartbeatAck    => "heartbeat_ack",
            MessageType::Error           => "error",
        }
    }
}

impl std::fmt::Display for MessageType
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.write_str(self.as_str())
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// A message a client sends to the server. Serialized as `"type"` + `"data"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMsg
{
    CallStart(CallStart),
    TranscriptChunk(TranscriptChunk),
    AgentResponse(AgentResponse),
    LocationUpdate(LocationUpdate),
    CallEnd(CallEnd),
    Heartbeat(Heartbeat),
}

impl ClientMsg
{
    pub fn kind(&self) -> MessageType
    {
        match self
        {
            ClientMsg::CallStart(_)       => MessageType::CallStart,
            ClientMsg::TranscriptChunk(_) => MessageType::TranscriptChunk,
            ClientMsg::AgentResponse(_)   => MessageType::AgentResponse,
            ClientMsg::LocationUpdate(_)  => MessageType::LocationUpdate,
            ClientMsg::CallEnd(_)         => MessageType::CallEnd,
            ClientMsg::Heartbeat(_)       => MessageType::Heartbeat,
        }
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// A message the server sends to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMsg
{
    ConnectionAck(ConnectionAck),
    ChunkAck(ChunkAck),
    ExtractedInfo(ExtractedInfo),
    SummaryUpdate(SummaryUpdate),
    HeartbeatAck(HeartbeatAck),
    Error(ServerError),
}

impl ServerMsg
{
    pub fn kind(&self) -> MessageType
    {
        match self
        {
            ServerMsg::ConnectionAck(_) => MessageType::ConnectionAck,
            ServerMsg::ChunkAck(_)      => MessageType::ChunkAck,
            ServerMsg::ExtractedInfo(_) => MessageType::ExtractedInfo,
            ServerMsg::SummaryUpdate(_) => MessageType::SummaryUpdate,
            ServerMsg::HeartbeatAck(_)  => MessageType::HeartbeatAck,
            ServerMsg::Error(_)         => MessageType::Error,
        }
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// Unit of wire transport: `{ type, message_id, timestamp, data }`.
///
/// Envelopes are immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope
{
    message_id: String,
    timestamp: DateTime<Utc>,
    #[serde(flatten)]
    msg: ClientMsg,
}

impl Envelope
{
    /// Wrap a message with a fresh id and the current time.
    pub fn new(msg: ClientMsg) -> Self
    {
        let prefix = match msg
        {
            ClientMsg::Heartbeat(_) => HEARTBEAT_ID_PREFIX,
            _                       => MESSAGE_ID_PREFIX,
        };

        Self{
            message_id : new_message_id(prefix),
            timestamp  : Utc::now(),
            msg,
        }
    }

    pub fn heartbeat() -> Self
    {
        Self::new(ClientMsg::Heartbeat(Heartbeat{}))
    }

    pub fn message_id(&self) -> &str
    {
        &self.message_id
    }

    pub fn timestamp(&self) -> DateTime<Utc>
    {
        self.timestamp
    }

    pub fn msg(&self) -> &ClientMsg
    {
        &self.msg
    }

    pub fn kind(&self) -> MessageType
    {
        self.msg.kind()
    }

    /// The transcript chunk index, if this envelope carries a transcript chunk.
    pub fn chunk_index(&self) -> Option<u64>
    {
        match &self.msg
        {
            ClientMsg::TranscriptChunk(chunk) => Some(chunk.chunk_index),
            _                                 => None,
        }
    }

    /// Whether this envelope must be confirmed by a server `chunk_ack`.
    pub fn expects_ack(&self) -> bool
    {
        self.chunk_index().is_some()
    }

    /// Serialize to a JSON text frame.
    pub fn encode(&self) -> Result<String, serde_json::Error>
    {
        serde_json::to_string(self)
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// Inbound counterpart of [`Envelope`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerEnvelope
{
    #[serde(default)]
    pub message_id: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub msg: ServerMsg,
}

impl ServerEnvelope
{
    pub fn decode(text: &str) -> Result<Self, serde_json::Error>
    {
        serde_json::from_str(text)
    }
}

//-------------------------------------------------------------------------------------------------------------------
