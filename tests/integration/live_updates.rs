//! Integration tests for the live channel over real WebSocket connections

use docforest::live::{run_listener, Broadcaster, LiveMessage};
use docforest::watch::{ChangeEvent, ChangeKind};
use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tungstenite::Message;

fn start_server() -> (Arc<Broadcaster>, String) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let broadcaster = Arc::new(Broadcaster::new());
    let serving = Arc::clone(&broadcaster);
    std::thread::spawn(move || run_listener(serving, listener));
    (broadcaster, format!("ws://{}", addr))
}

fn wait_for_connections(broadcaster: &Broadcaster, expected: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while broadcaster.connection_count() != expected {
        assert!(Instant::now() < deadline, "expected {} subscribers", expected);
        std::thread::sleep(Duration::from_millis(10));
    }
}

fn change(kind: ChangeKind, path: &str) -> ChangeEvent {
    ChangeEvent {
        kind,
        path: PathBuf::from(path),
    }
}

/// Every connected subscriber receives the fileChange envelope
#[test]
fn test_subscribers_receive_file_changes() {
    let (broadcaster, url) = start_server();
    let (mut first, _) = tungstenite::connect(url.as_str()).unwrap();
    let (mut second, _) = tungstenite::connect(url.as_str()).unwrap();
    wait_for_connections(&broadcaster, 2);

    let delivered = broadcaster.publish(&change(ChangeKind::Create, "/docs/new.md"));
    assert_eq!(delivered, 2);

    for client in [&mut first, &mut second] {
        let message = client.read().unwrap();
        let Message::Text(text) = message else {
            panic!("expected a text frame, got {:?}", message);
        };
        let parsed: LiveMessage = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.kind, "fileChange");
        assert_eq!(parsed.payload.event, ChangeKind::Create);
        assert_eq!(parsed.payload.path, "/docs/new.md");
    }
}

/// Client payloads are ignored, and a disconnect deregisters the subscriber
#[test]
fn test_disconnect_deregisters() {
    let (broadcaster, url) = start_server();
    let (mut client, _) = tungstenite::connect(url.as_str()).unwrap();
    wait_for_connections(&broadcaster, 1);

    client.send(Message::Text("hello?".to_string())).unwrap();
    client.close(None).unwrap();
    // Drive the close handshake until the server acknowledges.
    while client.read().is_ok() {}

    wait_for_connections(&broadcaster, 0);
    assert_eq!(broadcaster.publish(&change(ChangeKind::Remove, "/docs/a.md")), 0);
}

/// A subscriber that vanished without a close frame is dropped on publish
#[test]
fn test_abrupt_disconnect_dropped_on_publish() {
    let (broadcaster, url) = start_server();
    let (client, _) = tungstenite::connect(url.as_str()).unwrap();
    wait_for_connections(&broadcaster, 1);
    drop(client);

    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        broadcaster.publish(&change(ChangeKind::Update, "/docs/a.md"));
        if broadcaster.connection_count() == 0 {
            break;
        }
        assert!(Instant::now() < deadline, "subscriber was never dropped");
        std::thread::sleep(Duration::from_millis(20));
    }
}
