//local shortcuts
use callwire::*;

//third-party shortcuts
use clap::Parser;
use tracing_subscriber::EnvFilter;

//standard shortcuts
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

//-------------------------------------------------------------------------------------------------------------------

/// Stream stdin lines to a call server as transcript chunks.
#[derive(Parser, Debug)]
struct Args
{
    /// Server base url.
    #[arg(long, default_value = "ws://localhost:8000")]
    server_url: url::Url,
    /// Directory for the session id and offline queues. Keeps state in memory if omitted.
    #[arg(long)]
    state_dir: Option<PathBuf>,
    /// Client config as JSON (see `ClientConfig`).
    #[arg(long)]
    config: Option<String>,
    /// Start a new session instead of resuming the persisted one.
    #[arg(long)]
    new_session: bool,
}

//-------------------------------------------------------------------------------------------------------------------

fn log_event(stream: &str, event: ClientEvent)
{
    match event
    {
        ClientEvent::Report(report)      => tracing::info!(stream, ?report, "connection report"),
        ClientEvent::ConnectionAck(ack)  => tracing::info!(stream, person_id = ?ack.person_id, "connected to call"),
        ClientEvent::ChunkAck(ack)       => tracing::info!(stream, chunk_index = ack.chunk_index, "chunk acknowledged"),
        ClientEvent::ExtractedInfo(info) => tracing::info!(stream, extraction = ?info.extraction, "extracted info"),
        ClientEvent::SummaryUpdate(update) =>
        {
            tracing::info!(stream, narrative = ?update.summary.narrative_summary, "summary update")
        }
        ClientEvent::ServerError(err)    => tracing::warn!(stream, code = %err.code, message = %err.message, "server error"),
    }
}

//-------------------------------------------------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>>
{
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = match &args.config
    {
        Some(json) => ClientConfig::from_json(json)?,
        None       => ClientConfig::default(),
    };
    let storage: Arc<dyn Storage> = match &args.state_dir
    {
        Some(dir) => Arc::new(FileStorage::new(dir)?),
        None      => Arc::new(MemoryStorage::new()),
    };

    let factory = ClientFactory::new(config, storage);
    let session = factory.session();
    if args.new_session { session.reset(); }

    let registry = StreamRegistry::call_and_location(
            &factory,
            &tokio::runtime::Handle::current(),
            &args.server_url,
            &session,
        );
    registry.connect_all();
    registry.send(ClientMsg::CallStart(CallStart{
            device: Some(DeviceInfo{ platform: String::from("cli"), browser: None, user_agent: None }),
            initial_location: None,
        }));

    // stdin is blocking, read it on its own thread
    let (line_sender, mut line_receiver) = tokio::sync::mpsc::unbounded_channel::<String>();
    std::thread::spawn(move ||
        {
            for line in std::io::stdin().lock().lines()
            {
                let Ok(line) = line else { break; };
                if line_sender.send(line).is_err() { break; }
            }
        });

    let call_started = Instant::now();
    let mut poll = tokio::time::interval(Duration::from_millis(50));
    loop
    {
        tokio::select!{
            line = line_receiver.recv() =>
            {
                let Some(line) = line else { break; };
                let line = line.trim();
                if line.is_empty() { continue; }
                if let Some(signal) = registry.send_transcript(line, None, true)
                {
                    tracing::debug!(message_id = signal.message_id(), status = ?signal.status(), "transcript submitted");
                }
            }
            _ = poll.tick() =>
            {
                while let Some((stream, event)) = registry.next() { log_event(&stream, event); }
            }
        }
    }

    // stdin closed: end the call and give the queue a moment to drain
    registry.end_call(call_started.elapsed());
    tokio::time::sleep(Duration::from_secs(1)).await;
    while let Some((stream, event)) = registry.next() { log_event(&stream, event); }
    if registry.queue_len() > 0
    {
        tracing::warn!(queued = registry.queue_len(), "exiting with queued messages, they will be sent next run");
    }
    registry.disconnect_all();
    tokio::time::sleep(Duration::from_millis(100)).await;

    Ok(())
}

//-------------------------------------------------------------------------------------------------------------------
