//local shortcuts

//third-party shortcuts
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

//standard shortcuts

//-------------------------------------------------------------------------------------------------------------------

/// Where a [`LocationSample`] came from.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum LocationSource
{
    #[serde(rename = "gps")]
    Gps,
    #[serde(rename = "network")]
    Network,
    #[serde(rename = "ip-fallback")]
    IpFallback,
}

/// One location fix.
///
/// Optional fields serialize as `null` when the sensor did not report them, they are never omitted.
/// Longitude is written as `lng` (what the ingestion server reads); `lon` is accepted when reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSample
{
    pub lat: f64,
    #[serde(rename = "lng", alias = "lon")]
    pub lon: f64,
    pub altitude: Option<f64>,
    pub accuracy: f64,
    pub altitude_accuracy: Option<f64>,
    pub heading: Option<f64>,
    pub speed: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub source: LocationSource,
}

impl LocationSample
{
    /// Make a sample with only the required fields set.
    pub fn new(lat: f64, lon: f64, accuracy: f64, source: LocationSource) -> Self
    {
        Self{
            lat,
            lon,
            altitude          : None,
            accuracy,
            altitude_accuracy : None,
            heading           : None,
            speed             : None,
            timestamp         : Utc::now(),
            source,
        }
    }
}

//-------------------------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo
{
    pub platform: String,
    pub browser: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement
{
    /// Meters travelled since the call started.
    pub total_distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptText
{
    pub text: String,
    pub is_final: bool,
}

/// Reference to the voice-agent conversation that produced a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceAgentRef
{
    pub conversation_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentText
{
    pub text: String,
}

//-------------------------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallStart
{
    pub device: Option<DeviceInfo>,
    pub initial_location: Option<LocationSample>,
}

/// One transcript segment. `chunk_index` is the acknowledgment key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptChunk
{
    pub chunk_index: u64,
    pub transcript: TranscriptText,
    pub location: Option<LocationSample>,
    pub voice_agent: Option<VoiceAgentRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse
{
    pub agent: AgentText,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationUpdate
{
    pub location: LocationSample,
    pub movement: Option<Movement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallEnd
{
    pub duration_seconds: u64,
    pub total_chunks: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Heartbeat {}

//-------------------------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionAck
{
    pub person_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkAck
{
    pub chunk_index: u64,
    #[serde(default)]
    pub person_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Severity assessment attached to extractions and summaries.
///
/// Values the client does not recognize decode as [`Severity::Unknown`], which ranks below every known level.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity
{
    Low,
    Moderate,
    High,
    Critical,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Severity
{
    fn rank(&self) -> u8
    {
        match self
        {
            Self::Unknown  => 0,
            Self::Low      => 1,
            Self::Moderate => 2,
            Self::High     => 3,
            Self::Critical => 4,
        }
    }
}

impl Ord for Severity
{
    fn cmp(&self, other: &Self) -> std::cmp::Ordering
    {
        self.rank().cmp(&other.rank())
    }
}

impl PartialOrd for Severity
{
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering>
    {
        Some(self.cmp(other))
    }
}

/// Information the server extracted from the caller's transcript.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Extraction
{
    pub location: Option<String>,
    pub location_details: Option<String>,
    pub disaster_type: Option<String>,
    pub severity: Severity,
    pub injuries_reported: Option<u32>,
    pub people_trapped: Option<u32>,
    pub hazards: Vec<String>,
    pub resources_needed: Vec<String>,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedInfo
{
    pub person_id: Option<String>,
    pub extraction: Extraction,
}

/// Aggregate picture across all callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisasterSummary
{
    pub total_callers: u32,
    pub active_callers: u32,
    pub overall_severity: Severity,
    pub disaster_types: Vec<String>,
    pub total_injuries: u32,
    pub total_trapped: u32,
    pub affected_areas: Vec<serde_json::Value>,
    pub key_findings: Vec<String>,
    pub narrative_summary: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryUpdate
{
    pub summary: DisasterSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatAck
{
    pub server_time: Option<DateTime<Utc>>,
}

/// Application-level error reported by the server. Does not close the connection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerError
{
    pub code: String,
    pub message: String,
    pub original_message_id: Option<String>,
}

//-------------------------------------------------------------------------------------------------------------------
