// SPDX-FileCopyrightText: 2026 Wabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Startup reconnection, protocol event rules, manual reset, and shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use wabridge_core::types::{
    DownloadableMedia, ImagePayload, InboundMessage, InboundPayload, MediaKind, ProtocolEvent,
};
use wabridge_core::{DeviceIdentity, PairingState, ProtocolClient};
use wabridge_session::MediaStore;
use wabridge_test_utils::harness::TEST_DEVICE_JID;
use wabridge_test_utils::{ProtocolCall, TestHarness, inbound_info};

async fn wait_for_state(harness: &TestHarness, state: PairingState) {
    let mut rx = harness.controller.session().subscribe();
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| s.state == state))
        .await
        .expect("state never reached")
        .expect("session dropped");
}

#[tokio::test]
async fn startup_without_identity_stays_unpaired() {
    let harness = TestHarness::new().await.unwrap();
    assert_eq!(harness.controller.session().state(), PairingState::Unpaired);
    assert!(!harness.client.is_connected());
}

#[tokio::test]
async fn startup_reconnects_stored_identity() {
    let harness = TestHarness::builder().paired().build().await.unwrap();
    let snapshot = harness.controller.session().snapshot();
    assert_eq!(snapshot.state, PairingState::Connected);
    assert_eq!(snapshot.identity, Some(DeviceIdentity::new(TEST_DEVICE_JID)));
}

#[tokio::test]
async fn startup_connect_failure_keeps_identity() {
    let harness = TestHarness::builder()
        .paired_but_offline()
        .build()
        .await
        .unwrap();
    let snapshot = harness.controller.session().snapshot();
    assert_eq!(snapshot.state, PairingState::Disconnected);
    assert!(snapshot.identity.is_some());
    assert!(harness.store.current().await.is_some());
}

#[tokio::test]
async fn startup_store_failure_starts_unpaired() {
    let harness = TestHarness::new().await.unwrap();
    harness.store.fail_reads(true);
    assert_eq!(harness.controller.startup().await, PairingState::Unpaired);
    assert!(harness.client.calls().await.is_empty());
}

#[tokio::test]
async fn manual_disconnect_clears_everything() {
    let harness = TestHarness::builder().paired().build().await.unwrap();

    harness.controller.disconnect().await;

    assert_eq!(harness.client.calls().await, vec![ProtocolCall::Disconnect]);
    assert_eq!(harness.store.delete_count(), 1);
    assert!(harness.store.current().await.is_none());
    let snapshot = harness.controller.session().snapshot();
    assert_eq!(snapshot.state, PairingState::Unpaired);
    assert!(snapshot.identity.is_none());
}

#[tokio::test]
async fn manual_disconnect_tolerates_store_failure() {
    let harness = TestHarness::builder().paired().build().await.unwrap();
    harness.store.fail_deletes(true);

    harness.controller.disconnect().await;

    assert_eq!(harness.controller.session().state(), PairingState::Unpaired);
}

#[tokio::test]
async fn manual_disconnect_while_offline_skips_client() {
    let harness = TestHarness::builder()
        .paired_but_offline()
        .build()
        .await
        .unwrap();

    harness.controller.disconnect().await;

    assert!(harness.client.calls().await.is_empty());
    assert_eq!(harness.store.delete_count(), 1);
}

#[tokio::test]
async fn logged_out_resets_session() {
    let harness = TestHarness::builder().paired().build().await.unwrap();
    harness.controller.handle_event(ProtocolEvent::LoggedOut).await;

    let snapshot = harness.controller.session().snapshot();
    assert_eq!(snapshot.state, PairingState::Unpaired);
    assert!(snapshot.identity.is_none());
}

#[tokio::test]
async fn disconnect_and_reconnect_events_keep_identity() {
    let harness = TestHarness::builder().paired().build().await.unwrap();

    harness.controller.handle_event(ProtocolEvent::Disconnected).await;
    assert_eq!(harness.controller.session().state(), PairingState::Disconnected);
    assert!(!harness.controller.status().paired);

    harness.controller.handle_event(ProtocolEvent::Connected).await;
    let snapshot = harness.controller.session().snapshot();
    assert_eq!(snapshot.state, PairingState::Connected);
    assert!(snapshot.identity.is_some());
}

#[tokio::test]
async fn connected_event_without_identity_is_ignored() {
    let harness = TestHarness::new().await.unwrap();
    harness.controller.handle_event(ProtocolEvent::Connected).await;
    assert_eq!(harness.controller.session().state(), PairingState::Unpaired);
}

#[tokio::test]
async fn pair_success_event_records_identity() {
    let harness = TestHarness::new().await.unwrap();
    harness.client.set_connected(true);

    harness
        .controller
        .handle_event(ProtocolEvent::PairSuccess {
            identity: DeviceIdentity::new("15550002222:3@s.whatsapp.net"),
        })
        .await;

    let snapshot = harness.controller.session().snapshot();
    assert_eq!(snapshot.state, PairingState::Connected);
    assert_eq!(snapshot.identity.unwrap().user(), "15550002222");
}

#[tokio::test]
async fn stream_errors_do_not_change_state() {
    let harness = TestHarness::builder().paired().build().await.unwrap();
    harness
        .controller
        .handle_event(ProtocolEvent::StreamError { code: "515".into() })
        .await;
    harness
        .controller
        .handle_event(ProtocolEvent::ConnectFailure {
            reason: "device limit".into(),
        })
        .await;
    assert_eq!(harness.controller.session().state(), PairingState::Connected);
}

#[tokio::test]
async fn event_loop_applies_events_until_cancelled() {
    let harness = TestHarness::builder().paired().build().await.unwrap();
    let cancel = CancellationToken::new();

    let controller = Arc::clone(&harness.controller);
    let token = cancel.clone();
    let handle = tokio::spawn(async move { controller.run_events(token).await });

    harness.client.inject_event(ProtocolEvent::Disconnected).await;
    wait_for_state(&harness, PairingState::Disconnected).await;

    harness.client.inject_event(ProtocolEvent::LoggedOut).await;
    wait_for_state(&harness, PairingState::Unpaired).await;

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("event loop did not stop")
        .unwrap();
}

#[tokio::test]
async fn shutdown_disconnects_connected_client() {
    let harness = TestHarness::builder().paired().build().await.unwrap();
    harness.controller.shutdown(Duration::from_millis(100)).await;

    assert_eq!(harness.client.calls().await, vec![ProtocolCall::Disconnect]);
    assert!(!harness.client.is_connected());
}

#[tokio::test]
async fn shutdown_when_offline_makes_no_calls() {
    let harness = TestHarness::new().await.unwrap();
    harness.controller.shutdown(Duration::from_millis(100)).await;
    assert!(harness.client.calls().await.is_empty());
}

fn inbound_image(id: &str) -> ProtocolEvent {
    ProtocolEvent::Message(InboundMessage {
        info: inbound_info(id, "15550001111@s.whatsapp.net"),
        payload: InboundPayload::Image(ImagePayload {
            caption: None,
            mimetype: "image/jpeg".into(),
            file_length: 9,
            width: 10,
            height: 10,
            media: Some(DownloadableMedia {
                kind: MediaKind::Image,
                url: "https://mmg.example/enc".into(),
                direct_path: "/v/t62/enc".into(),
                media_key: vec![1; 32],
                file_sha256: vec![2; 32],
                file_enc_sha256: vec![3; 32],
                file_length: 9,
            }),
        }),
    })
}

#[tokio::test(start_paused = true)]
async fn shutdown_waits_for_download_within_grace() {
    let harness = TestHarness::builder().paired().build().await.unwrap();
    harness.client.set_download_delay(Duration::from_millis(300));
    harness.controller.handle_event(inbound_image("SLOW1")).await;

    let grace = Duration::from_secs(2);
    let started = tokio::time::Instant::now();
    harness.controller.shutdown(grace).await;
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(300), "returned after {elapsed:?}");
    assert!(elapsed < grace, "returned after {elapsed:?}");

    let saved = harness
        .controller
        .media_store()
        .root()
        .join(MediaStore::image_file_name("SLOW1"));
    assert!(saved.exists(), "download finished before disconnect");
    assert_eq!(
        harness.client.calls().await.last(),
        Some(&ProtocolCall::Disconnect)
    );
}

#[tokio::test(start_paused = true)]
async fn shutdown_abandons_download_after_grace() {
    let harness = TestHarness::builder().paired().build().await.unwrap();
    harness.client.set_download_delay(Duration::from_secs(60));
    harness.controller.handle_event(inbound_image("STUCK1")).await;

    let grace = Duration::from_secs(1);
    let started = tokio::time::Instant::now();
    harness.controller.shutdown(grace).await;
    let elapsed = started.elapsed();

    assert!(elapsed >= grace, "returned after {elapsed:?}");
    assert!(elapsed < Duration::from_secs(60), "returned after {elapsed:?}");

    let saved = harness
        .controller
        .media_store()
        .root()
        .join(MediaStore::image_file_name("STUCK1"));
    assert!(!saved.exists());
    assert_eq!(
        harness.client.calls().await.last(),
        Some(&ProtocolCall::Disconnect)
    );
    assert!(!harness.client.is_connected());
}

#[tokio::test(start_paused = true)]
async fn shutdown_does_not_wait_for_pending_pair_request() {
    let harness = TestHarness::builder()
        .with_config(|c| c.pairing.qr_timeout_secs = 60)
        .build()
        .await
        .unwrap();
    let controller = harness.controller.clone();
    let pair = tokio::spawn(async move { controller.begin_pairing().await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(
        harness.controller.session().state(),
        PairingState::PairingInProgress
    );

    let grace = Duration::from_secs(1);
    let started = tokio::time::Instant::now();
    harness.controller.shutdown(grace).await;
    let elapsed = started.elapsed();

    assert!(elapsed >= grace, "returned after {elapsed:?}");
    assert!(elapsed < Duration::from_secs(60), "returned after {elapsed:?}");
    assert_eq!(
        harness.client.calls().await.last(),
        Some(&ProtocolCall::Disconnect)
    );
    pair.abort();
}

#[tokio::test]
async fn status_reports_session_and_webhook() {
    let harness = TestHarness::builder()
        .paired()
        .with_webhook("http://127.0.0.1:9/hook")
        .build()
        .await
        .unwrap();

    let status = harness.controller.status();
    assert!(status.paired);
    assert!(status.connected);
    assert!(status.webhook_configured);
    assert_eq!(status.state, PairingState::Connected);
    assert!(!status.version.is_empty());

    let unpaired = TestHarness::new().await.unwrap().controller.status();
    assert!(!unpaired.paired);
    assert!(!unpaired.webhook_configured);
}

#[tokio::test]
async fn device_info_reports_identity() {
    let harness = TestHarness::builder().paired().build().await.unwrap();
    let info = harness.controller.device_info().await;
    assert!(info.connected);
    assert!(info.paired);
    assert_eq!(info.jid.as_deref(), Some(TEST_DEVICE_JID));
    assert_eq!(info.phone.as_deref(), Some("15550009999"));
}

#[tokio::test]
async fn device_info_falls_back_to_session_identity() {
    let harness = TestHarness::builder().paired().build().await.unwrap();
    harness.store.fail_reads(true);
    let info = harness.controller.device_info().await;
    assert_eq!(info.jid.as_deref(), Some(TEST_DEVICE_JID));
}

#[tokio::test]
async fn device_info_is_empty_when_unpaired() {
    let harness = TestHarness::new().await.unwrap();
    let info = harness.controller.device_info().await;
    assert!(!info.paired);
    assert!(info.device_id.is_none());
    assert!(info.phone.is_none());
}
