//! Integration tests for the notification pipeline:
//! producer → bridge → transport → subscription loop → hub → registry → connection.
//!
//! Two bridges sharing one `InMemoryTransport` stand in for two server instances.

use std::{sync::Arc, time::Duration};

use serde_json::json;
use teamup_server::{
    domain::{
        Connection, ConnectionState, Notification, NotificationKind, NotificationProducer,
        OutboundReceiver, UserId, publish_or_log,
    },
    infrastructure::{
        BridgeConfig, BroadcastHub, ConnectionRegistry, PubSubBridge,
        dto::websocket::{NotificationMessage, ServerMessage},
        pubsub::InMemoryTransport,
    },
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// One server instance without the HTTP layer
struct TestInstance {
    registry: Arc<ConnectionRegistry>,
    hub: Arc<BroadcastHub>,
    bridge: Arc<PubSubBridge>,
    shutdown: CancellationToken,
    subscription: JoinHandle<()>,
}

impl TestInstance {
    async fn start(transport: &InMemoryTransport, instance_id: &str) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let hub = Arc::new(BroadcastHub::new(
            Arc::clone(&registry),
            Duration::from_millis(50),
            1024,
        ));
        let bridge = Arc::new(PubSubBridge::new(
            Arc::new(transport.clone()),
            BridgeConfig {
                channel: "notifications".to_string(),
                instance_id: instance_id.to_string(),
                publish_timeout: Duration::from_millis(500),
                backoff_min: Duration::from_millis(10),
                backoff_max: Duration::from_millis(100),
            },
        ));
        let shutdown = CancellationToken::new();
        let subscription = bridge.spawn_subscription(Arc::clone(&hub), shutdown.clone());

        let instance = Self {
            registry,
            hub,
            bridge,
            shutdown,
            subscription,
        };
        instance.wait_until_subscribed().await;
        instance
    }

    async fn wait_until_subscribed(&self) {
        for _ in 0..200 {
            if self.bridge.is_subscribed() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("subscription loop did not attach to the transport");
    }

    async fn connect(&self, user: &str) -> (Arc<Connection>, OutboundReceiver) {
        let (connection, outbound) = Connection::open(user_id(user), 16);
        self.registry
            .register(Arc::clone(&connection))
            .await
            .unwrap();
        (connection, outbound)
    }

    async fn stop(self) {
        self.shutdown.cancel();
        self.subscription.await.unwrap();
    }
}

fn user_id(id: &str) -> UserId {
    UserId::new(id.to_string()).unwrap()
}

async fn next_notification(outbound: &mut OutboundReceiver) -> NotificationMessage {
    let text = tokio::time::timeout(Duration::from_millis(500), outbound.recv())
        .await
        .expect("no message within 500ms")
        .expect("outbound channel closed");
    match ServerMessage::parse(&text).unwrap() {
        ServerMessage::Notification(message) => message,
        other => panic!("unexpected message: {:?}", other),
    }
}

async fn assert_nothing_received(outbound: &mut OutboundReceiver) {
    let received = tokio::time::timeout(Duration::from_millis(100), outbound.recv()).await;
    assert!(received.is_err(), "unexpected message: {:?}", received);
}

#[tokio::test]
async fn test_targeted_notification_is_delivered_once_within_100ms() {
    // テスト項目: U1 宛ての FriendRequestReceived が 100ms 以内に 1 回だけ届く
    // given (前提条件):
    let transport = InMemoryTransport::new();
    let instance = TestInstance::start(&transport, "api-a").await;
    let (_connection, mut outbound) = instance.connect("U1").await;

    // when (操作):
    let notification = Notification::to_user(
        user_id("U1"),
        NotificationKind::FriendRequestReceived,
        json!({"from": "U2"}),
    );
    let id = notification.id().to_string();
    instance.bridge.publish(notification).await.unwrap();

    // then (期待する結果):
    let text = tokio::time::timeout(Duration::from_millis(100), outbound.recv())
        .await
        .expect("not delivered within 100ms")
        .unwrap();
    let ServerMessage::Notification(message) = ServerMessage::parse(&text).unwrap() else {
        panic!("expected a notification");
    };
    assert_eq!(message.id, id);
    assert_eq!(message.kind, "friend_request_received");
    assert_eq!(message.payload, json!({"from": "U2"}));
    assert_nothing_received(&mut outbound).await;

    instance.stop().await;
}

#[tokio::test]
async fn test_publish_to_offline_user_succeeds_without_delivery() {
    // テスト項目: 接続していない U3 宛ての発行は成功し、誰にも届かない
    // given (前提条件):
    let transport = InMemoryTransport::new();
    let instance = TestInstance::start(&transport, "api-a").await;
    let (_connection, mut bystander) = instance.connect("U1").await;

    // when (操作):
    let result = instance
        .bridge
        .publish(Notification::to_user(
            user_id("U3"),
            NotificationKind::EventUpdated,
            json!({"event_id": 1}),
        ))
        .await;

    // then (期待する結果):
    assert!(result.is_ok());
    assert_nothing_received(&mut bystander).await;

    instance.stop().await;
}

#[tokio::test]
async fn test_notifications_arrive_in_publish_order() {
    // テスト項目: 同じ接続への N1, N2 はこの順で届く
    // given (前提条件):
    let transport = InMemoryTransport::new();
    let instance = TestInstance::start(&transport, "api-a").await;
    let (_connection, mut outbound) = instance.connect("U1").await;

    // when (操作):
    for n in 0..10 {
        instance
            .bridge
            .publish(Notification::to_user(
                user_id("U1"),
                NotificationKind::FriendMessageReceived,
                json!({"seq": n}),
            ))
            .await
            .unwrap();
    }

    // then (期待する結果):
    for n in 0..10 {
        let message = next_notification(&mut outbound).await;
        assert_eq!(message.payload, json!({"seq": n}));
    }

    instance.stop().await;
}

#[tokio::test]
async fn test_every_session_of_a_user_receives_the_notification() {
    // テスト項目: セッション A と B を持つユーザーは両方で受け取る
    // given (前提条件):
    let transport = InMemoryTransport::new();
    let instance = TestInstance::start(&transport, "api-a").await;
    let (_a, mut outbound_a) = instance.connect("U1").await;
    let (_b, mut outbound_b) = instance.connect("U1").await;

    // when (操作):
    instance
        .bridge
        .publish(Notification::to_user(
            user_id("U1"),
            NotificationKind::FriendRequestAccepted,
            json!({"by": "U2"}),
        ))
        .await
        .unwrap();

    // then (期待する結果):
    let on_a = next_notification(&mut outbound_a).await;
    let on_b = next_notification(&mut outbound_b).await;
    assert_eq!(on_a.id, on_b.id);
    assert_eq!(on_a.kind, "friend_request_accepted");

    instance.stop().await;
}

#[tokio::test]
async fn test_deregistered_session_stops_receiving_while_sibling_continues() {
    // テスト項目: 登録解除は冪等で、同じユーザーの他のセッションへの配信に影響しない
    // given (前提条件):
    let transport = InMemoryTransport::new();
    let instance = TestInstance::start(&transport, "api-a").await;
    let (gone, mut outbound_gone) = instance.connect("U1").await;
    let (_kept, mut outbound_kept) = instance.connect("U1").await;

    // when (操作):
    assert!(
        instance
            .registry
            .deregister(gone.user_id(), gone.session_id())
            .await
    );
    assert!(
        !instance
            .registry
            .deregister(gone.user_id(), gone.session_id())
            .await
    );
    instance
        .bridge
        .publish(Notification::to_user(
            user_id("U1"),
            NotificationKind::EventDeleted,
            json!({"event_id": 9}),
        ))
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(gone.state(), ConnectionState::Closed);
    assert_eq!(
        next_notification(&mut outbound_kept).await.kind,
        "event_deleted"
    );
    assert_nothing_received(&mut outbound_gone).await;

    instance.stop().await;
}

#[tokio::test]
async fn test_cross_instance_delivery() {
    // テスト項目: インスタンス A で発行した通知が、インスタンス B に接続中の U4 に届く
    // given (前提条件):
    let transport = InMemoryTransport::new();
    let instance_a = TestInstance::start(&transport, "api-a").await;
    let instance_b = TestInstance::start(&transport, "api-b").await;
    let (_connection, mut outbound) = instance_b.connect("U4").await;

    // when (操作):
    instance_a
        .bridge
        .publish(Notification::to_user(
            user_id("U4"),
            NotificationKind::FriendRequestDeclined,
            json!({"by": "U5"}),
        ))
        .await
        .unwrap();

    // then (期待する結果):
    let message = next_notification(&mut outbound).await;
    assert_eq!(message.kind, "friend_request_declined");
    assert_eq!(message.payload, json!({"by": "U5"}));
    assert_eq!(instance_a.registry.count().await, 0);

    instance_a.stop().await;
    instance_b.stop().await;
}

#[tokio::test]
async fn test_broadcast_reaches_users_on_every_instance() {
    // テスト項目: 宛先なしの通知は全インスタンスの全ユーザーに届く
    // given (前提条件):
    let transport = InMemoryTransport::new();
    let instance_a = TestInstance::start(&transport, "api-a").await;
    let instance_b = TestInstance::start(&transport, "api-b").await;
    let (_u1, mut outbound_u1) = instance_a.connect("U1").await;
    let (_u2, mut outbound_u2) = instance_b.connect("U2").await;

    // when (操作):
    instance_a
        .bridge
        .publish(Notification::broadcast(
            NotificationKind::EventCreated,
            json!({"event_id": 3}),
        ))
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(next_notification(&mut outbound_u1).await.kind, "event_created");
    assert_eq!(next_notification(&mut outbound_u2).await.kind, "event_created");

    instance_a.stop().await;
    instance_b.stop().await;
}

#[tokio::test]
async fn test_publish_fails_open_during_transport_outage() {
    // テスト項目: トランスポート障害中の発行は失敗を返すが、publish_or_log は握りつぶす
    // given (前提条件):
    let transport = InMemoryTransport::new();
    let instance = TestInstance::start(&transport, "api-a").await;
    transport.set_available(false);

    // when (操作):
    let direct = instance
        .bridge
        .publish(Notification::to_user(
            user_id("U1"),
            NotificationKind::EventUpdated,
            json!({}),
        ))
        .await;
    let logged = publish_or_log(
        instance.bridge.as_ref(),
        Notification::to_user(user_id("U1"), NotificationKind::EventUpdated, json!({})),
    )
    .await;

    // then (期待する結果):
    assert!(direct.is_err());
    assert!(!logged);

    instance.stop().await;
}

#[tokio::test]
async fn test_delivery_resumes_after_transport_recovers() {
    // テスト項目: トランスポート復旧後、購読ループが再接続して配信が再開する
    // given (前提条件):
    let transport = InMemoryTransport::new();
    let instance = TestInstance::start(&transport, "api-a").await;
    let (_connection, mut outbound) = instance.connect("U1").await;
    transport.set_available(false);
    tokio::time::sleep(Duration::from_millis(50)).await;

    // when (操作):
    transport.set_available(true);
    instance.wait_until_subscribed().await;
    instance
        .bridge
        .publish(Notification::to_user(
            user_id("U1"),
            NotificationKind::FriendMessageReceived,
            json!({"text": "back"}),
        ))
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(
        next_notification(&mut outbound).await.payload,
        json!({"text": "back"})
    );

    instance.stop().await;
}

#[tokio::test]
async fn test_shutdown_closes_every_connection_during_dispatch() {
    // テスト項目: 配信中にシャットダウンしても panic せず、各セッションが自ら登録解除して全接続が Closed になる
    // given (前提条件):
    let transport = InMemoryTransport::new();
    let instance = TestInstance::start(&transport, "api-a").await;
    let mut connections = Vec::new();
    let mut sessions = Vec::new();
    for n in 0..20 {
        let (connection, mut outbound) = instance.connect(&format!("user-{}", n)).await;
        // Writer side of a session: drain until asked to close, then leave the registry
        let registry = Arc::clone(&instance.registry);
        let session = Arc::clone(&connection);
        sessions.push(tokio::spawn(async move {
            let close_signal = session.close_signal();
            loop {
                tokio::select! {
                    biased;
                    _ = close_signal.cancelled() => break,
                    message = outbound.recv() => if message.is_none() { break },
                }
            }
            while outbound.try_recv().is_ok() {}
            registry
                .deregister(session.user_id(), session.session_id())
                .await;
        }));
        connections.push(connection);
    }
    let hub = Arc::clone(&instance.hub);
    let dispatching = tokio::spawn(async move {
        for n in 0..50 {
            hub.dispatch(&Notification::broadcast(
                NotificationKind::EventUpdated,
                json!({"seq": n}),
            ))
            .await;
        }
    });

    // when (操作):
    let requested = instance.registry.close_all().await;
    for session in sessions {
        tokio::time::timeout(Duration::from_secs(1), session)
            .await
            .expect("session did not leave the registry")
            .unwrap();
    }
    dispatching.await.unwrap();
    let registry = Arc::clone(&instance.registry);
    instance.stop().await;

    // then (期待する結果):
    assert_eq!(requested, 20);
    assert_eq!(registry.count().await, 0);
    assert!(!registry.is_accepting());
    assert!(
        connections
            .iter()
            .all(|connection| connection.state() == ConnectionState::Closed)
    );
}
