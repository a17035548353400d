//! End-to-end tests: real WebSocket clients against a server on an
//! ephemeral port.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message,
};

use duo_relay::server::{AppState, build_app};

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Serve the app on an ephemeral port and return its address.
async fn spawn_server() -> SocketAddr {
    let state = Arc::new(AppState::new());
    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    addr
}

async fn connect(addr: SocketAddr) -> WsClient {
    let (ws, _response) = connect_async(format!("ws://{}/ws", addr))
        .await
        .expect("WebSocket connect");
    ws
}

async fn send_json(ws: &mut WsClient, value: Value) {
    ws.send(Message::text(value.to_string()))
        .await
        .expect("send frame");
}

/// Receive the next text frame as JSON, skipping protocol frames.
async fn recv_json(ws: &mut WsClient) -> Value {
    let deadline = Duration::from_secs(5);
    loop {
        let msg = tokio::time::timeout(deadline, ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("connection closed while waiting for frame")
            .expect("WebSocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).expect("frame is JSON");
        }
    }
}

async fn fetch_rooms(addr: SocketAddr) -> Vec<Value> {
    let body: Value = reqwest::get(format!("http://{}/api/rooms", addr))
        .await
        .expect("GET /api/rooms")
        .json()
        .await
        .expect("rooms response is JSON");
    body.as_array().expect("rooms response is an array").clone()
}

/// Poll /api/rooms until `predicate` holds or a timeout elapses.
async fn wait_for_rooms(addr: SocketAddr, predicate: impl Fn(&[Value]) -> bool) -> Vec<Value> {
    for _ in 0..50 {
        let rooms = fetch_rooms(addr).await;
        if predicate(&rooms) {
            return rooms;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("rooms endpoint never reached the expected state");
}

#[tokio::test]
async fn test_two_player_session_end_to_end() {
    // given: A joins "r1" as "p1", B joins as "p2"
    let addr = spawn_server().await;
    let mut alice = connect(addr).await;
    let mut bob = connect(addr).await;

    send_json(
        &mut alice,
        json!({"type": "join_room", "roomId": "r1", "playerId": "p1"}),
    )
    .await;
    send_json(
        &mut bob,
        json!({"type": "join_room", "roomId": "r1", "playerId": "p2"}),
    )
    .await;

    // then: both receive game_started
    assert_eq!(recv_json(&mut alice).await, json!({"type": "game_started"}));
    assert_eq!(recv_json(&mut bob).await, json!({"type": "game_started"}));

    // the room listing shows the full room
    let rooms = wait_for_rooms(addr, |rooms| rooms.len() == 1).await;
    assert_eq!(rooms[0]["id"], "r1");
    assert_eq!(rooms[0]["full"], true);
    assert_eq!(rooms[0]["players"], json!(["p1", "p2"]));

    // when: A chats
    send_json(
        &mut alice,
        json!({"type": "chat", "displayName": "Al", "message": "hi"}),
    )
    .await;

    // then: both receive the exact relayed frame, playerId from the registry
    let expected = json!({
        "type": "chat",
        "playerId": "p1",
        "displayName": "Al",
        "message": "hi",
    });
    assert_eq!(recv_json(&mut alice).await, expected);
    assert_eq!(recv_json(&mut bob).await, expected);

    // when: B's channel closes
    bob.close(None).await.expect("close bob");

    // then: A is told p2 is gone
    assert_eq!(
        recv_json(&mut alice).await,
        json!({"type": "disconnect", "playerId": "p2"})
    );

    // and once A leaves too, the room table no longer contains "r1"
    alice.close(None).await.expect("close alice");
    wait_for_rooms(addr, |rooms| rooms.is_empty()).await;
}

#[tokio::test]
async fn test_relayed_turn_and_game_over_events() {
    // given: a full room
    let addr = spawn_server().await;
    let mut alice = connect(addr).await;
    let mut bob = connect(addr).await;
    send_json(
        &mut alice,
        json!({"type": "join_room", "roomId": "duel", "playerId": "p1"}),
    )
    .await;
    send_json(
        &mut bob,
        json!({"type": "join_room", "roomId": "duel", "playerId": "p2"}),
    )
    .await;
    recv_json(&mut alice).await; // game_started
    recv_json(&mut bob).await;

    // when: B ends its turn, then declares the game over
    send_json(&mut bob, json!({"type": "action_complete"})).await;
    send_json(&mut bob, json!({"type": "game_over"})).await;

    // then: both members see both events, attributed to p2
    for client in [&mut alice, &mut bob] {
        assert_eq!(
            recv_json(client).await,
            json!({"type": "action_complete", "playerId": "p2"})
        );
        assert_eq!(
            recv_json(client).await,
            json!({"type": "game_over", "playerId": "p2"})
        );
    }
}

#[tokio::test]
async fn test_malformed_frame_does_not_close_the_connection() {
    // given:
    let addr = spawn_server().await;
    let mut alice = connect(addr).await;

    // when: alice sends garbage, then a valid join
    alice
        .send(Message::text("this is not json"))
        .await
        .expect("send garbage");
    send_json(
        &mut alice,
        json!({"type": "join_room", "roomId": "r1", "playerId": "p1"}),
    )
    .await;

    // then: the connection survived and the join took effect
    let mut bob = connect(addr).await;
    send_json(
        &mut bob,
        json!({"type": "join_room", "roomId": "r1", "playerId": "p2"}),
    )
    .await;
    assert_eq!(recv_json(&mut alice).await, json!({"type": "game_started"}));
    assert_eq!(recv_json(&mut bob).await, json!({"type": "game_started"}));
}

#[tokio::test]
async fn test_join_with_empty_room_id_creates_nothing() {
    // given:
    let addr = spawn_server().await;
    let mut alice = connect(addr).await;

    // when:
    send_json(
        &mut alice,
        json!({"type": "join_room", "roomId": "", "playerId": "p1"}),
    )
    .await;

    // then: no room appears; the connection is still usable
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(fetch_rooms(addr).await.is_empty());
    send_json(
        &mut alice,
        json!({"type": "join_room", "roomId": "r1", "playerId": "p1"}),
    )
    .await;
    wait_for_rooms(addr, |rooms| rooms.len() == 1).await;
}

#[tokio::test]
async fn test_health_endpoint() {
    // given:
    let addr = spawn_server().await;

    // when:
    let body: Value = reqwest::get(format!("http://{}/api/health", addr))
        .await
        .expect("GET /api/health")
        .json()
        .await
        .expect("health response is JSON");

    // then:
    assert_eq!(body, json!({"status": "ok"}));
}
