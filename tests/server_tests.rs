//! End-to-end tests against a real server on a loopback port.
//!
//! Each test binds its own server on port 0 and talks to it with the
//! crate's WebSocket client halves, the same way a browser would.

use std::net::SocketAddr;
use std::time::Duration;

use framecast::ws::{self, ClientStream, WsMessage, WsReader, WsWriter};
use framecast::{Config, FrameBatch, Orbit, Server, WatchOptions};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct TestServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl TestServer {
    async fn start(mut config: Config) -> Self {
        config.addr = "127.0.0.1:0".to_string();
        let server = Server::bind(config).await.unwrap();
        let addr = server.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(server.run(shutdown.clone()));
        Self {
            addr,
            shutdown,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("ws://{}{path}", self.addr)
    }

    async fn connect(&self, path: &str) -> (WsWriter<ClientStream>, WsReader<ClientStream>) {
        ws::connect(&self.url(path)).await.unwrap()
    }

    async fn stop(self) {
        self.shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("Server did not stop")
            .unwrap()
            .unwrap();
    }
}

/// Next text or close message, skipping control frames.
async fn next_message(reader: &mut WsReader<ClientStream>) -> Option<WsMessage> {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), reader.recv())
            .await
            .expect("Timed out waiting for server")?
            .ok()?;
        match msg {
            WsMessage::Ping(_) | WsMessage::Pong(_) => continue,
            other => return Some(other),
        }
    }
}

async fn next_text(reader: &mut WsReader<ClientStream>) -> String {
    match next_message(reader).await {
        Some(WsMessage::Text(text)) => text,
        other => panic!("Expected text, got {other:?}"),
    }
}

fn expected_batch(start: u64, count: u64) -> String {
    let orbit = Orbit::default();
    FrameBatch::new(start, orbit.frames(start..start + count))
        .to_json()
        .unwrap()
}

#[tokio::test]
async fn test_stream_serves_initial_batch_then_requests() {
    let server = TestServer::start(Config::default()).await;
    let (mut writer, mut reader) = server.connect("/tick").await;

    let first = next_text(&mut reader).await;
    assert!(first.starts_with(r#"[[{"x":300.00,"y":200.00}],"#), "{first}");
    assert_eq!(first, expected_batch(0, 60));

    writer.send_text("30").await.unwrap();
    assert_eq!(next_text(&mut reader).await, expected_batch(60, 30));

    writer.send_text("0").await.unwrap();
    assert_eq!(next_text(&mut reader).await, "[]");

    writer.send_text("2").await.unwrap();
    assert_eq!(next_text(&mut reader).await, expected_batch(90, 2));

    writer.close().await.unwrap();
    server.stop().await;
}

#[tokio::test]
async fn test_binary_request_reads_first_byte() {
    let server = TestServer::start(Config::default()).await;
    let (mut writer, mut reader) = server.connect("/tick").await;
    let _ = next_text(&mut reader).await;

    writer.send_binary(vec![5, 200, 200]).await.unwrap();
    assert_eq!(next_text(&mut reader).await, expected_batch(60, 5));

    server.stop().await;
}

#[tokio::test]
async fn test_connections_have_independent_indices() {
    let server = TestServer::start(Config::default()).await;
    let (mut writer_a, mut reader_a) = server.connect("/tick").await;
    let (_writer_b, mut reader_b) = server.connect("/tick").await;

    let _ = next_text(&mut reader_a).await;
    writer_a.send_text("10").await.unwrap();
    assert_eq!(next_text(&mut reader_a).await, expected_batch(60, 10));

    // The second client starts from frame 0 regardless
    assert_eq!(next_text(&mut reader_b).await, expected_batch(0, 60));

    server.stop().await;
}

#[tokio::test]
async fn test_malformed_request_closes_connection() {
    let server = TestServer::start(Config::default()).await;
    let (mut writer, mut reader) = server.connect("/tick").await;
    let _ = next_text(&mut reader).await;

    writer.send_text("-5").await.unwrap();
    match next_message(&mut reader).await {
        Some(WsMessage::Close { .. }) | None => {}
        other => panic!("Expected close, got {other:?}"),
    }

    server.stop().await;
}

#[tokio::test]
async fn test_oversized_request_closes_connection() {
    let mut config = Config::default();
    config.pipeline.max_request = Some(100);
    let server = TestServer::start(config).await;
    let (mut writer, mut reader) = server.connect("/tick").await;
    let _ = next_text(&mut reader).await;

    writer.send_text("101").await.unwrap();
    match next_message(&mut reader).await {
        Some(WsMessage::Close { .. }) | None => {}
        other => panic!("Expected close, got {other:?}"),
    }

    server.stop().await;
}

#[tokio::test]
async fn test_timed_route_ends_with_farewell() {
    let mut config = Config::default();
    config.timed.lifetime_ms = 300;
    config.timed.tick_hz = 20;
    let server = TestServer::start(config).await;
    let (_writer, mut reader) = server.connect("/timed").await;

    let mut texts = Vec::new();
    while let Some(msg) = next_message(&mut reader).await {
        match msg {
            WsMessage::Text(text) => texts.push(text),
            WsMessage::Close { .. } => break,
            other => panic!("Unexpected {other:?}"),
        }
    }

    assert_eq!(texts.last().map(String::as_str), Some("Done!"));
    let ticks = &texts[..texts.len() - 1];
    assert!(!ticks.is_empty());
    for tick in ticks {
        let value: serde_json::Value = serde_json::from_str(tick).unwrap();
        assert!(value["x"].is_number(), "{tick}");
    }

    server.stop().await;
}

#[tokio::test]
async fn test_unknown_path_is_rejected() {
    let server = TestServer::start(Config::default()).await;
    let err = ws::connect(&server.url("/nope")).await.unwrap_err();
    assert!(format!("{err:#}").contains("404"), "{err:#}");
    server.stop().await;
}

#[tokio::test]
async fn test_shutdown_closes_live_sessions() {
    let server = TestServer::start(Config::default()).await;
    let (_writer, mut reader) = server.connect("/tick").await;
    let _ = next_text(&mut reader).await;

    server.shutdown.cancel();
    match next_message(&mut reader).await {
        Some(WsMessage::Close { .. }) | None => {}
        other => panic!("Expected close, got {other:?}"),
    }

    tokio::time::timeout(Duration::from_secs(5), server.handle)
        .await
        .expect("Server did not stop")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_watch_client_refills_until_limit() {
    let server = TestServer::start(Config::default()).await;
    let options = WatchOptions {
        request: 10,
        batches: 3,
    };

    let mut out = Vec::new();
    let url = format!("http://{}/tick", server.addr);
    let summary = framecast::watch(&url, &options, &mut out).await.unwrap();

    assert_eq!(summary.batches, 3);
    assert_eq!(summary.frames, 80);
    let lines: Vec<_> = String::from_utf8(out).unwrap().lines().map(str::to_string).collect();
    assert_eq!(
        lines,
        vec![expected_batch(0, 60), expected_batch(60, 10), expected_batch(70, 10)]
    );

    server.stop().await;
}
