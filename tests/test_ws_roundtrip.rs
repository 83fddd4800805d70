mod common;

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use votechess::connection::ConnectionState;
use votechess::phase::Phase;
use votechess::sync::SyncSettings;
use votechess::transport::WsConnector;

use common::{MockCoordinator, core_with, next_frame, send_text, wait_for_model};

fn settings(url: String) -> SyncSettings {
    SyncSettings {
        url,
        reconnect_interval: Duration::from_millis(50),
        initial_voting_duration_seconds: 15,
    }
}

#[tokio::test]
async fn client_syncs_with_coordinator() {
    let mut coordinator = MockCoordinator::bind().await;
    let (core, handle) = core_with(
        settings(coordinator.url()),
        Arc::new(WsConnector::new()),
    );
    let cancel = CancellationToken::new();
    let task = tokio::spawn(core.run(cancel.clone()));

    let mut ws = coordinator.accept().await;
    wait_for_model(&handle, |m| m.connection_state == ConnectionState::Connected).await;

    // Keepalive pings get exactly one reply, carrying "pong".
    ws.send(Message::Ping(b"hb".to_vec().into())).await.unwrap();
    assert_eq!(next_frame(&mut ws).await, Message::Pong(b"pong".to_vec().into()));

    let record = handle.attempt_move("e2e4".parse().unwrap()).await.unwrap();
    assert_eq!(record.san, "e4");
    let Message::Text(intent) = next_frame(&mut ws).await else {
        panic!("expected the move intent right after the pong");
    };
    let intent: serde_json::Value = serde_json::from_str(intent.as_str()).unwrap();
    assert_eq!(intent["message_type"], "COMMAND");
    assert_eq!(intent["message_subtype"], "MAKE_MOVE");
    assert_eq!(intent["value"], "e4");

    send_text(&mut ws, r#"{"from":"e7","to":"e5"}"#).await;
    wait_for_model(&handle, |m| m.last_san() == Some("e5")).await;

    send_text(&mut ws, r#"{"currentPhase":"voting","timer":10}"#).await;
    let model = wait_for_model(&handle, |m| m.phase.progress_visible).await;
    assert_eq!(model.phase.label.as_deref(), Some("Voting Time: 10 seconds"));

    // The coordinator drops us mid-vote; the client comes back on its own.
    ws.close(None).await.unwrap();
    drop(ws);
    let mut ws = coordinator.accept().await;
    let model = wait_for_model(&handle, |m| {
        m.connection_state == ConnectionState::Connected && m.reconnect_attempts == 1
    })
    .await;
    assert_eq!(model.history.len(), 2);
    assert_eq!(
        model.phase.phase,
        Phase::Voting {
            remaining: 10,
            total: 10
        }
    );

    cancel.cancel();
    task.await.unwrap();

    // Stopping the core closes the socket.
    tokio::time::timeout(common::DEFAULT_TIMEOUT, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await
    .expect("socket should close when the core stops");
}

#[tokio::test]
async fn binary_frames_are_decoded() {
    let mut coordinator = MockCoordinator::bind().await;
    let (core, handle) = core_with(
        settings(coordinator.url()),
        Arc::new(WsConnector::new()),
    );
    let cancel = CancellationToken::new();
    let task = tokio::spawn(core.run(cancel.clone()));

    let mut ws = coordinator.accept().await;
    ws.send(Message::Binary(
        br#"{"currentPhase":"voting","timer":7}"#.to_vec().into(),
    ))
    .await
    .unwrap();
    let model = wait_for_model(&handle, |m| m.phase.progress_visible).await;
    assert_eq!(
        model.phase.phase,
        Phase::Voting {
            remaining: 7,
            total: 7
        }
    );

    // Anything that is neither a vote nor a move ends the round.
    send_text(&mut ws, r#"{"message":"round over"}"#).await;
    let model = wait_for_model(&handle, |m| !m.phase.progress_visible).await;
    assert_eq!(model.phase.phase, Phase::Idle);
    assert!((model.phase.percentage - 100.0).abs() < f64::EPSILON);

    cancel.cancel();
    task.await.unwrap();
}

#[tokio::test]
async fn unreachable_coordinator_keeps_retrying() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (core, handle) = core_with(
        settings(format!("ws://{addr}/ws")),
        Arc::new(WsConnector::new()),
    );
    let cancel = CancellationToken::new();
    let task = tokio::spawn(core.run(cancel.clone()));

    let model = wait_for_model(&handle, |m| m.reconnect_attempts >= 2).await;
    assert_ne!(model.connection_state, ConnectionState::Connected);
    assert!(model.history.is_empty());

    cancel.cancel();
    task.await.unwrap();
}
