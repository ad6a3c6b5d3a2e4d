// tests/websocket_test.rs
// Broadcast hub behaviour over real sockets: fan-out to every session of a
// user, single-socket-per-client replacement, and auth failures.

mod common;

use std::time::Duration;

use futures_util::StreamExt;

use aura_backend::api::ws::message::ServerMessage;

use common::*;

#[tokio::test]
async fn broadcast_reaches_every_session_of_the_user() {
    let stub = spawn_stub_llm(vec![]).await;
    let app = spawn_app(&stub.url).await;
    let (token, user_id) = register_and_login(&app).await;

    let deck = connect_ws(&app, &token, "command_deck").await;
    let laptop = connect_ws(&app, &token, "laptop").await;
    assert_eq!(app.state.hub.client_count(user_id).await, 2);

    app.state
        .hub
        .broadcast_to_user(
            &ServerMessage::SystemLog {
                content: "hello, every window".to_string(),
            },
            user_id,
        )
        .await;

    for collector in [&deck, &laptop] {
        let received = collector
            .wait_until(Duration::from_secs(5), |messages| {
                messages.iter().any(|m| {
                    m["type"] == "system_log" && m["content"] == "hello, every window"
                })
            })
            .await;
        assert!(received, "a session missed the broadcast");
    }
}

#[tokio::test]
async fn reconnecting_same_client_replaces_the_old_socket() {
    let stub = spawn_stub_llm(vec![]).await;
    let app = spawn_app(&stub.url).await;
    let (token, user_id) = register_and_login(&app).await;

    let _first = connect_ws(&app, &token, "command_deck").await;
    let second = connect_ws(&app, &token, "command_deck").await;

    // At most one socket per (user, client) tuple.
    assert_eq!(app.state.hub.client_count(user_id).await, 1);

    app.state
        .hub
        .broadcast_to_user(
            &ServerMessage::SystemLog {
                content: "after reconnect".to_string(),
            },
            user_id,
        )
        .await;
    let received = second
        .wait_until(Duration::from_secs(5), |messages| {
            messages.iter().any(|m| m["content"] == "after reconnect")
        })
        .await;
    assert!(received, "replacement socket did not receive the broadcast");
}

#[tokio::test]
async fn bad_token_closes_with_policy_violation() {
    let stub = spawn_stub_llm(vec![]).await;
    let app = spawn_app(&stub.url).await;

    let ws_url = format!(
        "{}/ws/command_deck?token=not-a-real-token",
        app.address.replace("http://", "ws://")
    );
    let (stream, _) = tokio_tungstenite::connect_async(ws_url.as_str()).await.unwrap();
    let (_write, mut read) = stream.split();

    let mut close_code = None;
    while let Ok(Some(frame)) =
        tokio::time::timeout(Duration::from_secs(5), read.next()).await
    {
        if let Ok(tokio_tungstenite::tungstenite::Message::Close(Some(frame))) = frame {
            close_code = Some(u16::from(frame.code));
            break;
        }
    }
    assert_eq!(close_code, Some(1008));
}
