//local shortcuts
use super::*;
use callwire::*;

//third-party shortcuts

//standard shortcuts
use std::time::Duration;

//-------------------------------------------------------------------------------------------------------------------

fn chunk_ack(chunk_index: u64) -> String
{
    format!(
        r#"{{"type":"chunk_ack","message_id":"srv_{chunk_index}","timestamp":"2024-05-01T12:00:00Z","data":{{"chunk_index":{chunk_index},"person_id":"p1","status":"received"}}}}"#
    )
}

async fn connected_client(server: &MockServer, config: ClientConfig) -> Client
{
    let client = call_client(server, config);
    client.connect();
    settle().await;
    let Some(ClientEvent::Report(ClientReport::Connected)) = client.next() else { unreachable!() };
    client
}

//-------------------------------------------------------------------------------------------------------------------
//-------------------------------------------------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn chunk_ack_clears_tracking()
{
    let server = MockServer::new(true);
    let client = connected_client(&server, ClientConfig::default()).await;

    client.send_transcript("one", None, false);
    client.send_transcript("two", None, true);
    client.send_location(LocationSample::new(1.0, 2.0, 5.0, LocationSource::Network), None);
    settle().await;
    assert_eq!(client.unacked_len(), 2);

    server.push(&chunk_ack(0));
    settle().await;
    assert_eq!(client.unacked_len(), 1);
    let Some(ClientEvent::ChunkAck(ack)) = client.next() else { unreachable!() };
    assert_eq!(ack.chunk_index, 0);
    assert_eq!(ack.status.as_deref(), Some("received"));

    // unknown index: nothing changes, the event still arrives
    server.push(&chunk_ack(42));
    settle().await;
    assert_eq!(client.unacked_len(), 1);
    let Some(ClientEvent::ChunkAck(ChunkAck{ chunk_index: 42, .. })) = client.next() else { unreachable!() };

    server.push(&chunk_ack(1));
    settle().await;
    assert_eq!(client.unacked_len(), 0);
}

//-------------------------------------------------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn unacked_chunks_go_stale()
{
    let server = MockServer::new(true);
    let client = connected_client(&server, ClientConfig::default()).await;

    let signal = client.send_transcript("anyone there?", None, true);
    settle().await;
    assert!(client.stale_unacked(Duration::from_secs(5)).is_empty());

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(client.stale_unacked(Duration::from_secs(5)), vec![String::from(signal.message_id())]);

    // nothing is resent
    assert_eq!(server.received_of_type("transcript_chunk").len(), 1);
}

//-------------------------------------------------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn server_messages_become_events()
{
    let server = MockServer::new(true);
    let client = connected_client(&server, ClientConfig::default()).await;

    server.push(r#"{"type":"connection_ack","message_id":"s1","timestamp":"2024-05-01T12:00:00Z","data":{"person_id":"p7"}}"#);
    server.push(r#"{"type":"extracted_info","message_id":"s2","data":{"person_id":"p7","extraction":{"disaster_type":"fire","severity":"critical","people_trapped":2,"confidence":0.8}}}"#);
    server.push(r#"{"type":"summary_update","message_id":"s3","data":{"summary":{"total_callers":4,"active_callers":2,"key_findings":["bridge out"]}}}"#);
    server.push(r#"{"type":"error","message_id":"s4","data":{"code":"invalid_message","message":"bad data"}}"#);
    settle().await;

    let Some(ClientEvent::ConnectionAck(ack)) = client.next() else { unreachable!() };
    assert_eq!(ack.person_id.as_deref(), Some("p7"));

    let Some(ClientEvent::ExtractedInfo(info)) = client.next() else { unreachable!() };
    assert_eq!(info.extraction.severity, Severity::Critical);
    assert_eq!(info.extraction.people_trapped, Some(2));

    let Some(ClientEvent::SummaryUpdate(update)) = client.next() else { unreachable!() };
    assert_eq!(update.summary.key_findings, vec![String::from("bridge out")]);

    let Some(ClientEvent::ServerError(err)) = client.next() else { unreachable!() };
    assert_eq!(err.code, "invalid_message");

    // server errors don't affect the connection
    assert!(client.is_connected());
    assert!(client.next().is_none());
}

//-------------------------------------------------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn malformed_frames_are_dropped()
{
    let server = MockServer::new(true);
    let client = connected_client(&server, ClientConfig::default()).await;

    server.push("garbage");
    server.push(r#"{"type":"weather_report","data":{}}"#);
    server.push(r#"{"type":"chunk_ack","data":{"chunk_index":"zero"}}"#);
    settle().await;
    assert!(client.next().is_none());
    assert!(client.is_connected());

    server.push(&chunk_ack(0));
    settle().await;
    let Some(ClientEvent::ChunkAck(_)) = client.next() else { unreachable!() };
}

//-------------------------------------------------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn heartbeats_while_connected()
{
    let server = MockServer::new(true);
    let client = connected_client(&server, ClientConfig::default()).await;

    tokio::time::sleep(Duration::from_secs(10)).await;
    let heartbeats = server.received_of_type("heartbeat");
    assert_eq!(heartbeats.len(), 1);
    assert!(heartbeats[0]["message_id"].as_str().unwrap().starts_with("hb_"));

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(server.received_of_type("heartbeat").len(), 3);

    // heartbeats are never queued
    server.go_offline();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(server.received_of_type("heartbeat").len(), 3);
    assert_eq!(client.queue_len(), 0);
}

//-------------------------------------------------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn heartbeat_ack_records_server_time()
{
    let server = MockServer::new(true);
    let client = connected_client(&server, ClientConfig::default()).await;
    assert_eq!(client.last_server_time(), None);

    server.push(r#"{"type":"heartbeat_ack","message_id":"s1","data":{"server_time":"2024-05-01T12:00:00Z"}}"#);
    settle().await;

    let expected: chrono::DateTime<chrono::Utc> = "2024-05-01T12:00:00Z".parse().unwrap();
    assert_eq!(client.last_server_time(), Some(expected));

    // acks are not surfaced as events
    assert!(client.next().is_none());
}

//-------------------------------------------------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn silent_server_is_dropped()
{
    let server = MockServer::new(true);
    let config = ClientConfig{
            heartbeat_interval : Duration::from_secs(1),
            heartbeat_timeout  : Some(Duration::from_millis(2500)),
            ..Default::default()
        };
    let client = connected_client(&server, config).await;

    // ticks at 1s and 2s pass, the tick at 3s finds the server silent
    tokio::time::sleep(Duration::from_millis(3500)).await;
    assert_eq!(client.state(), ConnectionState::Reconnecting);
    let reports = reports(&drain(&client));
    assert!(reports.contains(&ClientReport::Disconnected));
    assert_eq!(server.received_of_type("heartbeat").len(), 2);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(server.connect_attempts(), 2);
    assert!(client.is_connected());
}

//-------------------------------------------------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn inbound_traffic_keeps_connection_alive()
{
    let server = MockServer::new(true);
    let config = ClientConfig{
            heartbeat_interval : Duration::from_secs(1),
            heartbeat_timeout  : Some(Duration::from_millis(2500)),
            ..Default::default()
        };
    let client = connected_client(&server, config).await;

    for _ in 0..10
    {
        tokio::time::sleep(Duration::from_secs(1)).await;
        server.push(r#"{"type":"heartbeat_ack","data":{}}"#);
    }
    settle().await;

    assert!(client.is_connected());
    assert_eq!(server.connect_attempts(), 1);
}

//-------------------------------------------------------------------------------------------------------------------
