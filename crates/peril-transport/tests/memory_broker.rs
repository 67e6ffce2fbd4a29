//! Integration tests for the in-process broker.

use std::time::Duration;

use peril_transport::{
    AckType, Broker, ExchangeKind, InMemoryBroker, Publisher, QueueDurability,
    Subscription, TransportError,
};

const TOPIC: &str = "peril_topic";
const DIRECT: &str = "peril_direct";

async fn broker() -> InMemoryBroker {
    let broker = InMemoryBroker::new();
    broker.declare_exchange(TOPIC, ExchangeKind::Topic).await.unwrap();
    broker.declare_exchange(DIRECT, ExchangeKind::Direct).await.unwrap();
    broker
}

async fn next_within<S: Subscription>(sub: &mut S) -> Option<peril_transport::Delivery> {
    tokio::time::timeout(Duration::from_secs(1), sub.next())
        .await
        .expect("timed out waiting for delivery")
}

#[tokio::test]
async fn test_publish_then_consume_delivers_payload() {
    let broker = broker().await;
    let handle = broker
        .declare_and_bind(TOPIC, "army_moves.alice", "army_moves.*", QueueDurability::Transient)
        .await
        .unwrap();
    let mut sub = broker.consume(&handle).await.unwrap();

    broker
        .publish(TOPIC, "army_moves.bob", b"hello", "application/json")
        .await
        .unwrap();

    let delivery = next_within(&mut sub).await.unwrap();
    assert_eq!(delivery.body, b"hello");
    assert_eq!(delivery.routing_key, "army_moves.bob");
    assert_eq!(delivery.content_type, "application/json");
    assert_eq!(delivery.delivery_count, 1);
    assert!(!delivery.redelivered);
    sub.settle(&delivery, AckType::Ack).unwrap();
    assert_eq!(sub.unsettled(), 0);
}

#[tokio::test]
async fn test_topic_fanout_reaches_every_bound_queue() {
    let broker = broker().await;
    let a = broker
        .declare_and_bind(TOPIC, "army_moves.alice", "army_moves.*", QueueDurability::Transient)
        .await
        .unwrap();
    let b = broker
        .declare_and_bind(TOPIC, "army_moves.bob", "army_moves.*", QueueDurability::Transient)
        .await
        .unwrap();

    broker.publish(TOPIC, "army_moves.carol", b"m", "text/plain").await.unwrap();

    assert_eq!(broker.queue_len(&a.name), Some(1));
    assert_eq!(broker.queue_len(&b.name), Some(1));
}

#[tokio::test]
async fn test_direct_exchange_requires_exact_key() {
    let broker = broker().await;
    let handle = broker
        .declare_and_bind(DIRECT, "pause.alice", "pause", QueueDurability::Transient)
        .await
        .unwrap();

    broker.publish(DIRECT, "pause.alice", b"x", "text/plain").await.unwrap();
    assert_eq!(broker.queue_len(&handle.name), Some(0));

    broker.publish(DIRECT, "pause", b"x", "text/plain").await.unwrap();
    assert_eq!(broker.queue_len(&handle.name), Some(1));
}

#[tokio::test]
async fn test_publish_to_unknown_exchange_fails() {
    let broker = broker().await;
    let err = broker.publish("nope", "k", b"", "text/plain").await.unwrap_err();
    assert!(matches!(err, TransportError::ExchangeNotFound(_)));
}

#[tokio::test]
async fn test_redeclare_exchange_with_other_kind_fails() {
    let broker = broker().await;
    let err = broker
        .declare_exchange(TOPIC, ExchangeKind::Direct)
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::ExchangeKindMismatch(_)));
}

#[tokio::test]
async fn test_nack_requeue_redelivers_with_count() {
    let broker = broker().await;
    let handle = broker
        .declare_and_bind(TOPIC, "war", "war_recognitions.*", QueueDurability::Durable)
        .await
        .unwrap();
    let mut sub = broker.consume(&handle).await.unwrap();
    broker.publish(TOPIC, "war_recognitions.bob", b"w", "application/json").await.unwrap();

    let first = next_within(&mut sub).await.unwrap();
    sub.settle(&first, AckType::NackRequeue).unwrap();

    let second = next_within(&mut sub).await.unwrap();
    assert!(second.redelivered);
    assert_eq!(second.delivery_count, 2);
    assert_ne!(first.delivery_tag, second.delivery_tag);

    sub.settle(&second, AckType::NackDiscard).unwrap();
    assert_eq!(broker.queue_len("war"), Some(0));
}

#[tokio::test]
async fn test_settle_twice_is_an_error() {
    let broker = broker().await;
    let handle = broker
        .declare_and_bind(TOPIC, "war", "war_recognitions.*", QueueDurability::Durable)
        .await
        .unwrap();
    let mut sub = broker.consume(&handle).await.unwrap();
    broker.publish(TOPIC, "war_recognitions.bob", b"w", "application/json").await.unwrap();

    let delivery = next_within(&mut sub).await.unwrap();
    sub.settle(&delivery, AckType::Ack).unwrap();
    let err = sub.settle(&delivery, AckType::Ack).unwrap_err();
    assert!(matches!(err, TransportError::UnknownDeliveryTag(_)));
}

#[tokio::test]
async fn test_transient_queue_is_exclusive_and_auto_deleted() {
    let broker = broker().await;
    let handle = broker
        .declare_and_bind(DIRECT, "pause.alice", "pause", QueueDurability::Transient)
        .await
        .unwrap();
    let sub = broker.consume(&handle).await.unwrap();

    let err = broker.consume(&handle).await.unwrap_err();
    assert!(matches!(err, TransportError::QueueLocked(_)));

    drop(sub);
    assert!(!broker.has_queue("pause.alice"));
}

#[tokio::test]
async fn test_durable_queue_requeues_unsettled_on_drop() {
    let broker = broker().await;
    let handle = broker
        .declare_and_bind(TOPIC, "game_logs", "game_logs.*", QueueDurability::Durable)
        .await
        .unwrap();
    broker.publish(TOPIC, "game_logs.alice", b"1", "application/x-bincode").await.unwrap();

    let mut sub = broker.consume(&handle).await.unwrap();
    let _in_flight = next_within(&mut sub).await.unwrap();
    assert_eq!(broker.queue_len("game_logs"), Some(0));
    drop(sub);

    assert_eq!(broker.queue_len("game_logs"), Some(1));
    let mut sub = broker.consume(&handle).await.unwrap();
    let again = next_within(&mut sub).await.unwrap();
    assert!(again.redelivered);
}

#[tokio::test]
async fn test_durable_queue_round_robins_competing_consumers() {
    let broker = broker().await;
    let handle = broker
        .declare_and_bind(TOPIC, "war", "war_recognitions.*", QueueDurability::Durable)
        .await
        .unwrap();
    let mut a = broker.consume(&handle).await.unwrap();
    let mut b = broker.consume(&handle).await.unwrap();

    broker.publish(TOPIC, "war_recognitions.x", b"1", "application/json").await.unwrap();
    broker.publish(TOPIC, "war_recognitions.x", b"2", "application/json").await.unwrap();

    let first = next_within(&mut a).await.unwrap();
    let second = next_within(&mut b).await.unwrap();
    assert_ne!(first.body, second.body);
}

#[tokio::test]
async fn test_waiting_consumer_wakes_on_publish() {
    let broker = broker().await;
    let handle = broker
        .declare_and_bind(TOPIC, "game_logs", "game_logs.*", QueueDurability::Durable)
        .await
        .unwrap();
    let mut sub = broker.consume(&handle).await.unwrap();

    let waiter = tokio::spawn(async move { sub.next().await.map(|d| d.body) });
    tokio::time::sleep(Duration::from_millis(20)).await;
    broker.publish(TOPIC, "game_logs.bob", b"late", "text/plain").await.unwrap();

    let body = tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(body.as_deref(), Some(&b"late"[..]));
}

#[tokio::test]
async fn test_close_ends_subscriptions_and_rejects_publish() {
    let broker = broker().await;
    let handle = broker
        .declare_and_bind(TOPIC, "game_logs", "game_logs.*", QueueDurability::Durable)
        .await
        .unwrap();
    let mut sub = broker.consume(&handle).await.unwrap();

    broker.close();

    assert!(next_within(&mut sub).await.is_none());
    let err = broker.publish(TOPIC, "game_logs.a", b"", "text/plain").await.unwrap_err();
    assert!(matches!(err, TransportError::Closed));
}
