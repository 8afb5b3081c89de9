//local shortcuts
use super::*;
use callwire::*;

//third-party shortcuts

//standard shortcuts
use std::time::Duration;

//-------------------------------------------------------------------------------------------------------------------

fn fast_backoff(max_attempts: Option<u32>) -> ClientConfig
{
    ClientConfig{
        backoff: BackoffConfig{
            initial_delay : Duration::from_millis(100),
            max_delay     : Duration::from_secs(1),
            max_attempts,
        },
        ..Default::default()
    }
}

fn chunk_indices(frames: &[serde_json::Value]) -> Vec<u64>
{
    frames.iter().map(|frame| frame["data"]["chunk_index"].as_u64().unwrap()).collect()
}

//-------------------------------------------------------------------------------------------------------------------
//-------------------------------------------------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn connect_and_send()
{
    init_tracing();
    let server = MockServer::new(true);
    let client = call_client(&server, ClientConfig::default());
    assert_eq!(client.state(), ConnectionState::Disconnected);

    client.connect();
    settle().await;
    assert!(client.is_connected());
    assert_eq!(reports(&drain(&client)), vec![ClientReport::Connected]);
    assert_eq!(server.urls()[0].as_str(), format!("ws://test.local:8000/ws/call/{}", client.session_id()));

    let signal = client.send_transcript("there is smoke", None, false);
    settle().await;
    assert_eq!(signal.status(), SendStatus::Sent);

    let frames = server.received_of_type("transcript_chunk");
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["message_id"], signal.message_id());
    assert_eq!(frames[0]["data"]["transcript"]["text"], "there is smoke");
    assert_eq!(client.queue_len(), 0);
    assert_eq!(client.unacked_len(), 1);
}

//-------------------------------------------------------------------------------------------------------------------

// A direct send writes the envelope exactly as it was encoded when submitted.
#[tokio::test(start_paused = true)]
async fn direct_send_writes_submitted_encoding()
{
    let server = MockServer::new(true);
    let client = call_client(&server, ClientConfig::default());
    client.connect();
    settle().await;

    let signal = client.send_location(LocationSample::new(-33.86, 151.2, 8.0, LocationSource::Network), None);
    settle().await;
    assert_eq!(signal.status(), SendStatus::Sent);

    let texts = server.received_texts();
    assert_eq!(texts.len(), 1);
    let envelope: Envelope = serde_json::from_str(&texts[0]).unwrap();
    assert_eq!(envelope.message_id(), signal.message_id());
    assert_eq!(envelope.kind(), MessageType::LocationUpdate);
    assert_eq!(envelope.encode().unwrap(), texts[0]);
}

//-------------------------------------------------------------------------------------------------------------------

// Messages sent before connecting are queued and flushed in order once connected.
#[tokio::test(start_paused = true)]
async fn offline_sends_flush_in_order()
{
    let server = MockServer::new(true);
    let client = call_client(&server, ClientConfig::default());

    let signals: Vec<SendSignal> = (0..3)
        .map(|i| client.send_transcript(format!("line {i}"), None, true))
        .collect();
    settle().await;
    assert_eq!(client.queue_len(), 3);
    assert!(signals.iter().all(|signal| signal.status() == SendStatus::Queued));
    assert_eq!(server.received().len(), 0);

    client.connect();
    tokio::time::sleep(Duration::from_millis(500)).await;

    let frames = server.received_of_type("transcript_chunk");
    assert_eq!(chunk_indices(&frames), vec![0, 1, 2]);
    for (frame, signal) in frames.iter().zip(signals.iter())
    {
        assert_eq!(frame["message_id"], signal.message_id());
        assert_eq!(signal.status(), SendStatus::Sent);
    }
    assert_eq!(client.queue_len(), 0);
    assert_eq!(client.unacked_len(), 3);
}

//-------------------------------------------------------------------------------------------------------------------

// New sends while the queue drains go behind the queued messages.
#[tokio::test(start_paused = true)]
async fn sends_during_flush_keep_order()
{
    let server = MockServer::new(true);
    let client = call_client(&server, ClientConfig::default());

    client.send_transcript("a", None, true);
    client.send_transcript("b", None, true);
    client.connect();
    client.send_transcript("c", None, true);
    settle().await;

    // the first queued message went out right away, the rest wait for the flush interval
    assert_eq!(server.received().len(), 1);
    assert_eq!(client.queue_len(), 2);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(chunk_indices(&server.received_of_type("transcript_chunk")), vec![0, 1, 2]);
}

//-------------------------------------------------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn connect_is_idempotent()
{
    let server = MockServer::new(true);
    let client = call_client(&server, ClientConfig::default());

    client.connect();
    client.connect();
    settle().await;
    client.connect();
    settle().await;

    assert_eq!(server.connect_attempts(), 1);
    assert_eq!(reports(&drain(&client)), vec![ClientReport::Connected]);
}

//-------------------------------------------------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn reconnect_with_backoff()
{
    let server = MockServer::new(false);
    let client = call_client(&server, ClientConfig::default());

    client.connect();
    settle().await;
    assert_eq!(client.state(), ConnectionState::Reconnecting);
    let Some(ClientEvent::Report(ClientReport::TransportError(_))) = client.next() else { unreachable!() };
    let Some(ClientEvent::Report(ClientReport::Reconnecting{ attempt: 1, delay })) = client.next()
    else { unreachable!() };
    assert_eq!(delay, Duration::from_secs(1));

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(server.connect_attempts(), 2);
    let Some(ClientEvent::Report(ClientReport::TransportError(_))) = client.next() else { unreachable!() };
    let Some(ClientEvent::Report(ClientReport::Reconnecting{ attempt: 2, delay })) = client.next()
    else { unreachable!() };
    assert_eq!(delay, Duration::from_secs(2));

    // the server comes back before the next attempt
    server.set_online(true);
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(server.connect_attempts(), 3);
    assert!(client.is_connected());
    assert_eq!(reports(&drain(&client)), vec![ClientReport::Connected]);
}

//-------------------------------------------------------------------------------------------------------------------

// An explicit connect skips the remaining backoff wait.
#[tokio::test(start_paused = true)]
async fn connect_while_reconnecting()
{
    let server = MockServer::new(false);
    let client = call_client(&server, ClientConfig::default());

    client.connect();
    settle().await;
    assert_eq!(client.state(), ConnectionState::Reconnecting);

    server.set_online(true);
    client.connect();
    settle().await;
    assert_eq!(server.connect_attempts(), 2);
    assert!(client.is_connected());
}

//-------------------------------------------------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn give_up_after_max_attempts()
{
    let server = MockServer::new(false);
    let client = call_client(&server, fast_backoff(Some(3)));

    client.connect();
    tokio::time::sleep(Duration::from_secs(5)).await;

    // initial attempt plus three reconnects
    assert_eq!(server.connect_attempts(), 4);
    assert_eq!(client.state(), ConnectionState::Failed);
    assert!(client.state().is_terminal());

    let reports = reports(&drain(&client));
    let delays: Vec<Duration> = reports
        .iter()
        .filter_map(|report| match report
            {
                ClientReport::Reconnecting{ delay, .. } => Some(*delay),
                _                                       => None,
            })
        .collect();
    assert_eq!(delays, vec![Duration::from_millis(100), Duration::from_millis(200), Duration::from_millis(400)]);
    assert_eq!(reports.last(), Some(&ClientReport::Failed{ attempts: 3 }));

    // no more attempts on its own
    server.set_online(true);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(server.connect_attempts(), 4);

    // an explicit connect starts over
    client.connect();
    settle().await;
    assert!(client.is_connected());
}

//-------------------------------------------------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn initial_failure_without_retry()
{
    let server = MockServer::new(false);
    let client = call_client(&server, ClientConfig{ reconnect_on_connect_fail: false, ..Default::default() });

    client.connect();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(client.state(), ConnectionState::Error);
    assert_eq!(server.connect_attempts(), 1);
    let reports = reports(&drain(&client));
    assert_eq!(reports.len(), 1);
    let ClientReport::TransportError(_) = &reports[0] else { unreachable!() };

    // sends still queue
    client.send_agent_response("stay calm");
    settle().await;
    assert_eq!(client.queue_len(), 1);

    server.set_online(true);
    client.connect();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(client.is_connected());
    assert_eq!(server.received_of_type("agent_response").len(), 1);
}

//-------------------------------------------------------------------------------------------------------------------

// The connection drops mid-call: sends queue up, and go out after the reconnect.
#[tokio::test(start_paused = true)]
async fn recover_from_lost_connection()
{
    let server = MockServer::new(true);
    let client = call_client(&server, ClientConfig::default());

    client.connect();
    settle().await;
    client.send_transcript("before", None, true);
    settle().await;

    server.go_offline();
    settle().await;
    assert_eq!(client.state(), ConnectionState::Reconnecting);

    let during = client.send_transcript("during", None, true);
    settle().await;
    assert_eq!(during.status(), SendStatus::Queued);

    server.set_online(true);
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(client.is_connected());
    assert_eq!(during.status(), SendStatus::Sent);
    assert_eq!(client.queue_len(), 0);

    let texts: Vec<String> = server
        .received_of_type("transcript_chunk")
        .iter()
        .map(|frame| String::from(frame["data"]["transcript"]["text"].as_str().unwrap()))
        .collect();
    assert_eq!(texts, vec![String::from("before"), String::from("during")]);

    assert_eq!(
            reports(&drain(&client)),
            vec![
                ClientReport::Connected,
                ClientReport::Disconnected,
                ClientReport::Reconnecting{ attempt: 1, delay: Duration::from_secs(1) },
                ClientReport::Connected,
            ]
        );
}

//-------------------------------------------------------------------------------------------------------------------

// A failed write keeps the message and treats the channel as lost.
#[tokio::test(start_paused = true)]
async fn failed_write_requeues()
{
    let server = MockServer::new(true);
    let client = call_client(&server, ClientConfig::default());

    client.connect();
    settle().await;
    drain(&client);

    server.break_sends(true);
    let signal = client.send_transcript("lost?", None, true);
    settle().await;
    assert_eq!(signal.status(), SendStatus::Queued);
    assert_eq!(client.queue_len(), 1);
    assert_eq!(client.state(), ConnectionState::Reconnecting);

    let reports = reports(&drain(&client));
    let ClientReport::TransportError(_) = &reports[0] else { unreachable!() };
    assert_eq!(reports[1], ClientReport::Disconnected);

    server.break_sends(false);
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(signal.status(), SendStatus::Sent);
    assert_eq!(server.received_of_type("transcript_chunk").len(), 1);
}

//-------------------------------------------------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn disconnect_stops_everything()
{
    let server = MockServer::new(true);
    let client = call_client(&server, ClientConfig::default());

    client.connect();
    settle().await;
    client.disconnect();
    settle().await;

    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(server.close_codes(), vec![NORMAL_CLOSURE]);
    assert_eq!(reports(&drain(&client)), vec![ClientReport::Connected, ClientReport::ClosedBySelf]);

    // queued, not sent, and no reconnect or heartbeat
    client.send_transcript("after", None, true);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(client.queue_len(), 1);
    assert_eq!(server.connect_attempts(), 1);
    assert_eq!(server.received().len(), 0);

    // disconnecting twice is harmless
    client.disconnect();
    settle().await;
    assert!(drain(&client).is_empty());
}

//-------------------------------------------------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn disconnect_cancels_pending_reconnect()
{
    let server = MockServer::new(false);
    let client = call_client(&server, ClientConfig::default());

    client.connect();
    settle().await;
    client.disconnect();
    settle().await;
    assert_eq!(client.state(), ConnectionState::Disconnected);

    server.set_online(true);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(server.connect_attempts(), 1);
}

//-------------------------------------------------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn dropping_the_client_closes_the_channel()
{
    let server = MockServer::new(true);
    let client = call_client(&server, ClientConfig::default());

    client.connect();
    settle().await;
    drop(client);
    settle().await;

    assert_eq!(server.close_codes(), vec![NORMAL_CLOSURE]);
}

//-------------------------------------------------------------------------------------------------------------------
