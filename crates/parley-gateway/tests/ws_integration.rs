//! WebSocket integration tests.
//!
//! These tests start the gateway on a loopback port and talk to it with a
//! real WebSocket client, covering the live event flow between two users.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use parley_auth::MockJwtValidator;
use parley_core::UserId;
use parley_gateway::{create_router, GatewayConfig, GatewayState};
use parley_realtime::RealtimeService;
use parley_store::{
    Account, PresenceStatus, Relationship, RelationshipStatus, RocksStore, Store,
};

/// How long to wait for an expected event.
const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// How long to wait to conclude that no event is coming.
const QUIET_PERIOD: Duration = Duration::from_millis(200);

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Service = RealtimeService<RocksStore, MockJwtValidator>;

// ============================================================================
// Harness
// ============================================================================

struct TestServer {
    addr: SocketAddr,
    realtime: Arc<Service>,
    store: Arc<RocksStore>,
    _dir: TempDir,
}

impl TestServer {
    async fn start() -> Self {
        Self::start_with(GatewayConfig::default()).await
    }

    async fn start_with(config: GatewayConfig) -> Self {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        let validator = Arc::new(MockJwtValidator);
        let realtime = Arc::new(RealtimeService::with_defaults(
            Arc::clone(&store),
            Arc::clone(&validator),
        ));
        let state = GatewayState::new(Arc::clone(&realtime), validator, config);
        let app = create_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            realtime,
            store,
            _dir: dir,
        }
    }

    fn add_user(&self, name: &str) -> UserId {
        let user_id = UserId::generate();
        self.store.put_account(&Account::new(user_id, name)).unwrap();
        user_id
    }

    fn befriend(&self, a: UserId, b: UserId) {
        let relationship = Relationship::pending(a, b);
        self.store.create_relationship(&relationship).unwrap();
        self.store
            .update_relationship_status(
                &relationship.relationship_id,
                RelationshipStatus::Pending,
                RelationshipStatus::Accepted,
            )
            .unwrap();
    }

    fn ws_url(&self, token: Option<&str>) -> String {
        match token {
            Some(token) => format!("ws://{}/v1/ws?token={token}", self.addr),
            None => format!("ws://{}/v1/ws", self.addr),
        }
    }

    async fn connect(&self, user_id: UserId) -> Client {
        let before = self.realtime.connection_count();
        let url = self.ws_url(Some(&format!("test-token:{user_id}")));
        let (client, _) = connect_async(url).await.unwrap();
        self.wait_for_connections(before + 1).await;
        client
    }

    /// Wait until the registry has taken the new connection, so presence
    /// notifications for later peers are not missed.
    async fn wait_for_connections(&self, expected: usize) {
        tokio::time::timeout(EVENT_TIMEOUT, async {
            while self.realtime.connection_count() < expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("connection was not registered");
    }
}

async fn send_event(client: &mut Client, event: &str, data: Value) {
    let frame = json!({ "event": event, "data": data }).to_string();
    client.send(Message::Text(frame)).await.unwrap();
}

async fn next_event(client: &mut Client) -> Value {
    tokio::time::timeout(EVENT_TIMEOUT, async {
        loop {
            match client.next().await {
                Some(Ok(Message::Text(text))) => return serde_json::from_str(&text).unwrap(),
                Some(Ok(_)) => {}
                other => panic!("connection ended: {other:?}"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

async fn assert_quiet(client: &mut Client) {
    let result = tokio::time::timeout(QUIET_PERIOD, client.next()).await;
    assert!(result.is_err(), "unexpected frame: {result:?}");
}

/// Read for `period`, answering pings, and return the events seen.
async fn keep_reading(client: &mut Client, period: Duration) -> Vec<Value> {
    let mut events = Vec::new();
    let _ = tokio::time::timeout(period, async {
        while let Some(frame) = client.next().await {
            match frame {
                Ok(Message::Text(text)) => events.push(serde_json::from_str(&text).unwrap()),
                Ok(_) => {}
                Err(e) => panic!("connection failed: {e}"),
            }
        }
        panic!("connection closed by server");
    })
    .await;
    events
}

fn http_status(error: WsError) -> u16 {
    match error {
        WsError::Http(response) => response.status().as_u16(),
        other => panic!("expected HTTP rejection, got {other:?}"),
    }
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn upgrade_without_token_is_rejected() {
    let server = TestServer::start().await;

    let error = connect_async(server.ws_url(None)).await.unwrap_err();

    assert_eq!(http_status(error), 401);
    assert_eq!(server.realtime.connection_count(), 0);
}

#[tokio::test]
async fn upgrade_with_bad_token_is_rejected() {
    let server = TestServer::start().await;

    let error = connect_async(server.ws_url(Some("garbage"))).await.unwrap_err();

    assert_eq!(http_status(error), 401);
    assert_eq!(server.realtime.connection_count(), 0);
}

#[tokio::test]
async fn upgrade_accepts_bearer_header() {
    let server = TestServer::start().await;
    let alice = server.add_user("alice");

    let mut request = server.ws_url(None).into_client_request().unwrap();
    request.headers_mut().insert(
        "authorization",
        HeaderValue::from_str(&format!("Bearer test-token:{alice}")).unwrap(),
    );
    let (_client, _) = connect_async(request).await.unwrap();

    server.wait_for_connections(1).await;
    assert!(server.realtime.registry().contains(&alice));
}

// ============================================================================
// Live Events
// ============================================================================

#[tokio::test]
async fn message_reaches_present_friend() {
    let server = TestServer::start().await;
    let alice = server.add_user("alice");
    let bob = server.add_user("bob");
    server.befriend(alice, bob);

    let mut bob_ws = server.connect(bob).await;
    let mut alice_ws = server.connect(alice).await;

    let online = next_event(&mut bob_ws).await;
    assert_eq!(online["event"], "user_online");
    assert_eq!(online["data"]["userId"], alice.to_string());

    send_event(
        &mut alice_ws,
        "send_message",
        json!({ "receiverId": bob.to_string(), "content": "hi" }),
    )
    .await;

    let received = next_event(&mut bob_ws).await;
    assert_eq!(received["event"], "receive_message");
    assert_eq!(received["data"]["content"], "hi");
    assert_eq!(received["data"]["status"], "delivered");
    assert_eq!(received["data"]["sender"]["displayName"], "alice");

    let sent = next_event(&mut alice_ws).await;
    assert_eq!(sent["event"], "message_sent");
    assert_eq!(sent["data"]["id"], received["data"]["id"]);
    assert_eq!(sent["data"]["status"], "delivered");

    // Bob reads it, Alice hears about it
    send_event(
        &mut bob_ws,
        "message_read",
        json!({ "messageId": received["data"]["id"] }),
    )
    .await;

    let read = next_event(&mut alice_ws).await;
    assert_eq!(read["event"], "message_read");
    assert_eq!(read["data"]["messageId"], received["data"]["id"]);
}

#[tokio::test]
async fn message_to_stranger_is_refused() {
    let server = TestServer::start().await;
    let alice = server.add_user("alice");
    let carol = server.add_user("carol");

    let mut carol_ws = server.connect(carol).await;
    let mut alice_ws = server.connect(alice).await;

    send_event(
        &mut alice_ws,
        "send_message",
        json!({ "receiverId": carol.to_string(), "content": "hello?" }),
    )
    .await;

    let error = next_event(&mut alice_ws).await;
    assert_eq!(error["event"], "error");
    assert!(error["data"]["message"].is_string());
    assert_quiet(&mut carol_ws).await;
}

#[tokio::test]
async fn typing_is_relayed() {
    let server = TestServer::start().await;
    let alice = server.add_user("alice");
    let bob = server.add_user("bob");
    server.befriend(alice, bob);

    let mut bob_ws = server.connect(bob).await;
    let mut alice_ws = server.connect(alice).await;
    assert_eq!(next_event(&mut bob_ws).await["event"], "user_online");

    send_event(&mut alice_ws, "typing", json!({ "receiverId": bob.to_string() })).await;
    send_event(&mut alice_ws, "stop_typing", json!({ "receiverId": bob.to_string() })).await;

    let typing = next_event(&mut bob_ws).await;
    assert_eq!(typing["event"], "typing");
    assert_eq!(typing["data"]["userId"], alice.to_string());

    let stop = next_event(&mut bob_ws).await;
    assert_eq!(stop["event"], "stop_typing");

    // The sender gets no acknowledgement
    assert_quiet(&mut alice_ws).await;
}

#[tokio::test]
async fn malformed_frame_keeps_connection_open() {
    let server = TestServer::start().await;
    let alice = server.add_user("alice");
    let bob = server.add_user("bob");
    server.befriend(alice, bob);

    let mut bob_ws = server.connect(bob).await;
    let mut alice_ws = server.connect(alice).await;
    assert_eq!(next_event(&mut bob_ws).await["event"], "user_online");

    alice_ws
        .send(Message::Text("not json".to_string()))
        .await
        .unwrap();

    let error = next_event(&mut alice_ws).await;
    assert_eq!(error["event"], "error");

    send_event(&mut alice_ws, "typing", json!({ "receiverId": bob.to_string() })).await;
    assert_eq!(next_event(&mut bob_ws).await["event"], "typing");
}

// ============================================================================
// Presence
// ============================================================================

#[tokio::test]
async fn disconnect_and_reconnect_notify_friends() {
    let server = TestServer::start().await;
    let alice = server.add_user("alice");
    let bob = server.add_user("bob");
    server.befriend(alice, bob);

    let mut alice_ws = server.connect(alice).await;
    let mut bob_ws = server.connect(bob).await;
    assert_eq!(next_event(&mut alice_ws).await["event"], "user_online");

    bob_ws.close(None).await.unwrap();

    let offline = next_event(&mut alice_ws).await;
    assert_eq!(offline["event"], "user_offline");
    assert_eq!(offline["data"]["userId"], bob.to_string());
    assert_quiet(&mut alice_ws).await;

    let account = server.store.get_account(&bob).unwrap().unwrap();
    assert!(account.last_seen.is_some());

    let _bob_ws = server.connect(bob).await;
    let online = next_event(&mut alice_ws).await;
    assert_eq!(online["event"], "user_online");
    assert_eq!(online["data"]["userId"], bob.to_string());
}

#[tokio::test]
async fn newer_connection_replaces_older() {
    let server = TestServer::start().await;
    let alice = server.add_user("alice");
    let bob = server.add_user("bob");
    server.befriend(alice, bob);

    let mut alice_ws = server.connect(alice).await;
    let mut first = server.connect(bob).await;
    assert_eq!(next_event(&mut alice_ws).await["event"], "user_online");

    // The replacement keeps the registry at two users
    let url = server.ws_url(Some(&format!("test-token:{bob}")));
    let (mut second, _) = connect_async(url).await.unwrap();
    assert_eq!(next_event(&mut alice_ws).await["event"], "user_online");

    send_event(
        &mut alice_ws,
        "send_message",
        json!({ "receiverId": bob.to_string(), "content": "which one?" }),
    )
    .await;
    assert_eq!(next_event(&mut second).await["event"], "receive_message");

    // Closing the stale socket does not mark Bob offline
    first.close(None).await.unwrap();
    assert_eq!(next_event(&mut alice_ws).await["event"], "message_sent");
    assert_quiet(&mut alice_ws).await;
    assert!(server.realtime.registry().contains(&bob));
}

// ============================================================================
// Keepalive
// ============================================================================

fn short_idle_timeout() -> GatewayConfig {
    GatewayConfig {
        websocket_timeout_seconds: 1,
        ..GatewayConfig::default()
    }
}

#[tokio::test]
async fn quiet_clients_kept_alive_by_pings() {
    let server = TestServer::start_with(short_idle_timeout()).await;
    let alice = server.add_user("alice");
    let bob = server.add_user("bob");
    server.befriend(alice, bob);

    let mut bob_ws = server.connect(bob).await;
    let mut alice_ws = server.connect(alice).await;

    // Neither side sends anything for well past the idle timeout
    let period = Duration::from_millis(2500);
    let (bob_events, alice_events) = tokio::join!(
        keep_reading(&mut bob_ws, period),
        keep_reading(&mut alice_ws, period)
    );

    assert_eq!(bob_events.len(), 1, "{bob_events:?}");
    assert_eq!(bob_events[0]["event"], "user_online");
    assert!(alice_events.is_empty(), "{alice_events:?}");
    assert_eq!(server.realtime.connection_count(), 2);

    send_event(
        &mut alice_ws,
        "send_message",
        json!({ "receiverId": bob.to_string(), "content": "still here" }),
    )
    .await;
    let received = next_event(&mut bob_ws).await;
    assert_eq!(received["event"], "receive_message");
    assert_eq!(received["data"]["status"], "delivered");
}

#[tokio::test]
async fn unresponsive_client_times_out() {
    let server = TestServer::start_with(short_idle_timeout()).await;
    let alice = server.add_user("alice");

    // Never polled, so pings go unanswered
    let _alice_ws = server.connect(alice).await;

    let stored_offline = || {
        server.store.get_account(&alice).unwrap().unwrap().status == PresenceStatus::Offline
    };
    tokio::time::timeout(EVENT_TIMEOUT, async {
        while server.realtime.connection_count() > 0 || !stored_offline() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("idle connection was not closed");
}
