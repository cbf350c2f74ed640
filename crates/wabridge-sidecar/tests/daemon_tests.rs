// SPDX-FileCopyrightText: 2026 Wabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SidecarClient against an in-process fake daemon.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, mpsc};
use wabridge_config::model::ProtocolConfig;
use wabridge_core::types::{
    ChatAddress, ComposedMessage, DownloadableMedia, MediaKind, PairingEvent, ProtocolEvent,
};
use wabridge_core::{BridgeError, DeviceStore, ProtocolClient};
use wabridge_sidecar::SidecarClient;

/// What the fake daemon does with one request.
enum Answer {
    Result(Value),
    Error(i64, &'static str),
    Silence,
}

type Responder = dyn Fn(&str, &Value) -> Answer + Send + Sync;

/// Side-channel commands for the fake daemon.
enum Control {
    Push(Value),
    Hangup,
}

struct FakeDaemon {
    address: String,
    requests: Arc<Mutex<Vec<(String, Value)>>>,
    control: mpsc::UnboundedSender<Control>,
}

impl FakeDaemon {
    async fn start(responder: impl Fn(&str, &Value) -> Answer + Send + Sync + 'static) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let (control, control_rx) = mpsc::unbounded_channel();

        let responder: Arc<Responder> = Arc::new(responder);
        let log = requests.clone();
        tokio::spawn(async move {
            let mut control_rx = control_rx;
            while let Ok((stream, _)) = listener.accept().await {
                let (read, mut write) = stream.into_split();
                let mut lines = BufReader::new(read).lines();
                loop {
                    tokio::select! {
                        line = lines.next_line() => {
                            let Ok(Some(line)) = line else { break };
                            let request: Value = serde_json::from_str(&line).unwrap();
                            let name = request["method"].as_str().unwrap().to_string();
                            log.lock().await.push((name.clone(), request["params"].clone()));
                            let reply = match responder(&name, &request["params"]) {
                                Answer::Result(result) => {
                                    json!({"jsonrpc": "2.0", "id": request["id"], "result": result})
                                }
                                Answer::Error(code, message) => json!({
                                    "jsonrpc": "2.0",
                                    "id": request["id"],
                                    "error": {"code": code, "message": message}
                                }),
                                Answer::Silence => continue,
                            };
                            write.write_all(format!("{reply}\n").as_bytes()).await.unwrap();
                        }
                        command = control_rx.recv() => match command {
                            Some(Control::Push(frame)) => {
                                write.write_all(format!("{frame}\n").as_bytes()).await.unwrap();
                            }
                            Some(Control::Hangup) | None => break,
                        },
                    }
                }
            }
        });

        Self {
            address,
            requests,
            control,
        }
    }

    async fn ok() -> Self {
        Self::start(|_, _| Answer::Result(Value::Null)).await
    }

    fn client(&self) -> SidecarClient {
        SidecarClient::new(&ProtocolConfig {
            sidecar_address: self.address.clone(),
            request_timeout_secs: 1,
        })
    }

    fn notify(&self, name: &str, params: Value) {
        let frame = json!({"jsonrpc": "2.0", "method": name, "params": params});
        self.control.send(Control::Push(frame)).unwrap();
    }

    fn hangup(&self) {
        self.control.send(Control::Hangup).unwrap();
    }

    async fn requests(&self) -> Vec<(String, Value)> {
        self.requests.lock().await.clone()
    }
}

async fn next_event(client: &SidecarClient) -> ProtocolEvent {
    tokio::time::timeout(Duration::from_secs(2), client.receive())
        .await
        .expect("no event")
        .unwrap()
}

#[tokio::test]
async fn connect_and_disconnect_track_state() {
    let daemon = FakeDaemon::ok().await;
    let client = daemon.client();

    client.connect().await.unwrap();
    assert!(client.is_connected());
    client.disconnect().await.unwrap();
    assert!(!client.is_connected());

    let methods: Vec<String> = daemon.requests().await.into_iter().map(|(m, _)| m).collect();
    assert_eq!(methods, vec!["connect", "disconnect"]);
}

#[tokio::test]
async fn send_message_carries_address_and_body() {
    let daemon = FakeDaemon::start(|name, _| match name {
        "message.send" => Answer::Result(json!({"id": "3EB0AA"})),
        _ => Answer::Result(Value::Null),
    })
    .await;
    let client = daemon.client();

    let to = ChatAddress::parse("15550001111").unwrap();
    let id = client
        .send_message(&to, &ComposedMessage::Text { body: "hi".into() })
        .await
        .unwrap();
    assert_eq!(id.0, "3EB0AA");

    let (name, params) = daemon.requests().await.remove(0);
    assert_eq!(name, "message.send");
    assert_eq!(params["to"], "15550001111@s.whatsapp.net");
    assert_eq!(params["message"], json!({"type": "text", "body": "hi"}));
}

#[tokio::test]
async fn upload_sends_base64_and_decodes_descriptor() {
    let daemon = FakeDaemon::start(|_, _| {
        Answer::Result(json!({
            "url": "https://mmg.example/x",
            "direct_path": "/v/x",
            "media_key": "AQID",
            "file_sha256": "BAUG",
            "file_enc_sha256": "BwgJ"
        }))
    })
    .await;
    let client = daemon.client();

    let uploaded = client.upload(vec![0xff, 0xd8], MediaKind::Image).await.unwrap();
    assert_eq!(uploaded.direct_path, "/v/x");
    assert_eq!(uploaded.media_key, vec![1, 2, 3]);

    let (_, params) = daemon.requests().await.remove(0);
    assert_eq!(params["kind"], "image");
    assert_eq!(params["data"], "/9g=");
}

#[tokio::test]
async fn download_decodes_payload() {
    let daemon = FakeDaemon::start(|_, _| Answer::Result(json!({"data": "aGVsbG8="}))).await;
    let client = daemon.client();

    let media = DownloadableMedia {
        kind: MediaKind::Image,
        url: "https://mmg.example/enc".into(),
        direct_path: "/v/enc".into(),
        media_key: vec![1],
        file_sha256: vec![2],
        file_enc_sha256: vec![3],
        file_length: 5,
    };
    assert_eq!(client.download(&media).await.unwrap(), b"hello");
}

#[tokio::test]
async fn daemon_errors_become_protocol_errors() {
    let daemon = FakeDaemon::start(|_, _| Answer::Error(-32000, "not logged in")).await;
    let client = daemon.client();

    let to = ChatAddress::parse("15550001111").unwrap();
    match client.send_typing(&to).await {
        Err(BridgeError::Protocol { message, .. }) => {
            assert!(message.contains("presence.composing failed: not logged in"))
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn unanswered_request_times_out() {
    let daemon = FakeDaemon::start(|_, _| Answer::Silence).await;
    let client = daemon.client();

    match client.connect().await {
        Err(BridgeError::Protocol { message, .. }) => assert!(message.contains("timed out")),
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(!client.is_connected());
}

#[tokio::test]
async fn event_notifications_reach_receive() {
    let daemon = FakeDaemon::ok().await;
    let client = daemon.client();
    client.connect().await.unwrap();

    daemon.notify("event", json!({"type": "logged_out"}));
    assert_eq!(next_event(&client).await, ProtocolEvent::LoggedOut);
    assert!(!client.is_connected());

    daemon.notify("event", json!({"type": "connected"}));
    assert_eq!(next_event(&client).await, ProtocolEvent::Connected);
    assert!(client.is_connected());
}

#[tokio::test]
async fn pairing_events_flow_until_terminal() {
    let daemon = FakeDaemon::ok().await;
    let client = daemon.client();

    let mut pairing = client.pairing_channel().await.unwrap();
    daemon.notify("pairing", json!({"event": "code", "code": "2@abc"}));
    daemon.notify("pairing", json!({"event": "err-device-limit-exceeded"}));

    let first = tokio::time::timeout(Duration::from_secs(2), pairing.recv())
        .await
        .unwrap();
    assert_eq!(first, Some(PairingEvent::Code { code: "2@abc".into() }));
    let second = tokio::time::timeout(Duration::from_secs(2), pairing.recv())
        .await
        .unwrap();
    assert_eq!(second, Some(PairingEvent::DeviceLimitExceeded));
    let closed = tokio::time::timeout(Duration::from_secs(2), pairing.recv())
        .await
        .unwrap();
    assert_eq!(closed, None);

    assert_eq!(daemon.requests().await[0].0, "pairing.subscribe");
}

#[tokio::test]
async fn device_store_reads_and_deletes() {
    let daemon = FakeDaemon::start(|name, _| match name {
        "store.device" => Answer::Result(json!({"jid": "15550009999:7@s.whatsapp.net"})),
        _ => Answer::Result(Value::Null),
    })
    .await;
    let client = daemon.client();

    let identity = client.device_identity().await.unwrap().unwrap();
    assert_eq!(identity.user(), "15550009999");
    client.delete_identity().await.unwrap();

    let empty = FakeDaemon::ok().await;
    assert!(empty.client().device_identity().await.unwrap().is_none());
}

#[tokio::test]
async fn lost_link_reports_disconnect_once_and_reconnects() {
    let daemon = FakeDaemon::ok().await;
    let client = daemon.client();
    client.connect().await.unwrap();

    daemon.hangup();
    assert_eq!(next_event(&client).await, ProtocolEvent::Disconnected);
    assert!(!client.is_connected());

    // The daemon accepts again; the next request opens a fresh link.
    client.connect().await.unwrap();
    assert!(client.is_connected());
    assert!(
        tokio::time::timeout(Duration::from_millis(100), client.receive())
            .await
            .is_err()
    );
}
