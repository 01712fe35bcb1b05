use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use serde_json::json;

use crate::messaging::error::MessagingError;
use crate::messaging::service::{sync_handler, MessagingService};

#[tokio::test]
async fn publish_reaches_every_subscriber_once() {
    let bus = MessagingService::new(10);
    let seen_a = Arc::new(StdMutex::new(Vec::new()));
    let seen_b = Arc::new(StdMutex::new(Vec::new()));

    let sink = seen_a.clone();
    bus.subscribe(
        "alerts",
        sync_handler(move |msg| {
            sink.lock().unwrap().push(msg.clone());
            Ok(())
        }),
    )
    .await;
    let sink = seen_b.clone();
    bus.subscribe(
        "alerts",
        sync_handler(move |msg| {
            sink.lock().unwrap().push(msg.clone());
            Ok(())
        }),
    )
    .await;

    bus.publish("alerts", json!({"x": 1})).await.unwrap();

    for seen in [&seen_a, &seen_b] {
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].topic, "alerts");
        assert_eq!(seen[0].payload, json!({"x": 1}));
        // Timestamp is stamped at publish time.
        assert!(seen[0].timestamp <= chrono::Utc::now());
    }
}

#[tokio::test]
async fn failing_subscriber_does_not_stop_delivery() {
    let bus = MessagingService::new(10);
    let delivered = Arc::new(AtomicUsize::new(0));

    bus.subscribe(
        "alerts",
        sync_handler(|msg| {
            Err(MessagingError::Handler {
                topic: msg.topic.clone(),
                message: "boom".to_string(),
            })
        }),
    )
    .await;
    let counter = delivered.clone();
    bus.subscribe(
        "alerts",
        sync_handler(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }),
    )
    .await;

    bus.publish("alerts", json!("payload")).await.unwrap();
    assert_eq!(delivered.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn slow_subscriber_does_not_block_delivery() {
    let bus = MessagingService::new(10);
    let delivered = Arc::new(AtomicUsize::new(0));

    bus.subscribe(
        "alerts",
        Arc::new(|_| {
            Box::pin(async {
                std::future::pending::<()>().await;
                Ok::<(), MessagingError>(())
            })
        }),
    )
    .await;
    let counter = delivered.clone();
    bus.subscribe(
        "alerts",
        sync_handler(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }),
    )
    .await;

    // Publish settles all handlers, so it never returns while the first
    // subscriber hangs; the second must still be served in the meantime.
    let publisher = bus.clone();
    tokio::spawn(async move {
        let _ = publisher.publish("alerts", json!("incoming")).await;
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(delivered.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn panicking_subscriber_is_isolated() {
    let bus = MessagingService::new(10);
    let delivered = Arc::new(AtomicUsize::new(0));

    bus.subscribe(
        "alerts",
        sync_handler(|msg| {
            panic!("handler refused {}", msg.topic);
        }),
    )
    .await;
    let counter = delivered.clone();
    bus.subscribe(
        "alerts",
        sync_handler(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }),
    )
    .await;

    bus.publish("alerts", json!("payload")).await.unwrap();
    assert_eq!(delivered.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn publish_without_subscribers_still_records_history() {
    let bus = MessagingService::new(10);
    bus.publish("quiet", json!(1)).await.unwrap();
    bus.publish("quiet", json!(2)).await.unwrap();

    let history = bus.history("quiet", None).await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].payload, json!(1));
    assert_eq!(history[1].payload, json!(2));
}

#[tokio::test]
async fn history_evicts_oldest_at_capacity() {
    let bus = MessagingService::new(3);
    for i in 0..5 {
        bus.publish("ring", json!(i)).await.unwrap();
    }

    let history = bus.history("ring", None).await;
    assert_eq!(history.len(), 3);
    let payloads: Vec<_> = history.iter().map(|m| m.payload.clone()).collect();
    assert_eq!(payloads, vec![json!(2), json!(3), json!(4)]);

    let tail = bus.history("ring", Some(1)).await;
    assert_eq!(tail[0].payload, json!(4));
}

#[tokio::test]
async fn unsubscribe_one_or_all_keeps_history() {
    let bus = MessagingService::new(10);
    let id = bus.subscribe("alerts", sync_handler(|_| Ok(()))).await;
    bus.subscribe("alerts", sync_handler(|_| Ok(()))).await;
    bus.publish("alerts", json!(1)).await.unwrap();

    assert!(bus.unsubscribe("alerts", Some(id)).await);
    assert_eq!(bus.subscriber_count("alerts").await, 1);

    assert!(bus.unsubscribe("alerts", None).await);
    assert_eq!(bus.subscriber_count("alerts").await, 0);
    assert_eq!(bus.history("alerts", None).await.len(), 1);
}

#[tokio::test]
async fn request_resolves_with_first_reply() {
    let bus = MessagingService::new(10);
    let responder = bus.clone();
    let responder_handle = responder.clone();
    bus.subscribe(
        "ops.status",
        Arc::new(move |message| {
            let bus = responder_handle.clone();
            let original = message.clone();
            Box::pin(async move {
                bus.reply(&original, json!({"status": "rolling"})).await?;
                Ok(())
            })
        }),
    )
    .await;

    let response = bus
        .request("ops.status", json!({"crew": 7}), Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(response, json!({"status": "rolling"}));
}

#[tokio::test]
async fn request_times_out_without_responder() {
    let bus = MessagingService::new(10);
    let started = Instant::now();
    let err = bus
        .request("nobody.home", json!(null), Duration::from_millis(50))
        .await
        .unwrap_err();

    assert!(matches!(err, MessagingError::Timeout { .. }));
    // Not earlier than the configured timeout.
    assert!(started.elapsed() >= Duration::from_millis(50));
    // The ephemeral reply subscription is cleaned up.
    assert!(bus
        .subscriptions()
        .await
        .iter()
        .all(|s| !s.topic.starts_with("reply.")));
}

#[tokio::test]
async fn late_reply_after_timeout_is_dropped() {
    let bus = MessagingService::new(10);
    let responder = bus.clone();
    bus.subscribe(
        "ops.status",
        Arc::new(move |message| {
            let bus = responder.clone();
            let original = message.clone();
            Box::pin(async move {
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    let _ = bus.reply(&original, json!({"status": "late"})).await;
                });
                Ok::<(), MessagingError>(())
            })
        }),
    )
    .await;

    let err = bus
        .request("ops.status", json!(null), Duration::from_millis(20))
        .await
        .unwrap_err();
    assert!(matches!(err, MessagingError::Timeout { .. }));

    // Let the straggler land; the reply slot is disarmed and the ephemeral
    // subscription gone, so it has nowhere to go.
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(bus
        .subscriptions()
        .await
        .iter()
        .all(|s| !s.topic.starts_with("reply.")));

    // A fresh exchange on the bus is unaffected by the stale reply.
    let responder = bus.clone();
    bus.subscribe(
        "ops.ping",
        Arc::new(move |message| {
            let bus = responder.clone();
            let original = message.clone();
            Box::pin(async move {
                bus.reply(&original, json!("pong")).await?;
                Ok(())
            })
        }),
    )
    .await;
    let response = bus
        .request("ops.ping", json!(null), Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(response, json!("pong"));
}

#[tokio::test]
async fn reply_without_reply_topic_is_a_warn_noop() {
    let bus = MessagingService::new(10);
    let original = bus.publish("plain", json!(1)).await.unwrap();
    // No reply_to on a plain publish; reply must not error.
    bus.reply(&original, json!(2)).await.unwrap();
    assert!(bus.history("plain", None).await.len() == 1);
}

#[tokio::test]
async fn pattern_subscription_sees_matching_topics_only() {
    let bus = MessagingService::new(10);
    let seen = Arc::new(StdMutex::new(Vec::new()));
    let sink = seen.clone();
    bus.subscribe_pattern(
        "plugins.*",
        sync_handler(move |msg| {
            sink.lock().unwrap().push(msg.topic.clone());
            Ok(())
        }),
    )
    .await;

    bus.publish("plugins.loaded", json!(1)).await.unwrap();
    bus.publish("plugins.unloaded", json!(2)).await.unwrap();
    bus.publish("modules.loaded", json!(3)).await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(*seen, vec!["plugins.loaded".to_string(), "plugins.unloaded".to_string()]);
}

#[tokio::test]
async fn broadcast_hits_every_known_topic() {
    let bus = MessagingService::new(10);
    bus.publish("a", json!(1)).await.unwrap();
    bus.subscribe("b", sync_handler(|_| Ok(()))).await;

    let count = bus.broadcast(json!("all-hands")).await.unwrap();
    assert_eq!(count, 2);
    assert_eq!(bus.history("a", None).await.len(), 2);
    assert_eq!(bus.history("b", None).await.len(), 1);
}

#[tokio::test]
async fn stats_and_shutdown() {
    let bus = MessagingService::new(10);
    bus.subscribe("a", sync_handler(|_| Ok(()))).await;
    bus.subscribe_pattern("b.*", sync_handler(|_| Ok(()))).await;
    bus.publish("a", json!(1)).await.unwrap();

    let stats = bus.stats().await;
    assert_eq!(stats.subscriptions, 1);
    assert_eq!(stats.pattern_subscriptions, 1);
    assert_eq!(stats.messages_published, 1);
    assert_eq!(stats.messages_delivered, 1);

    bus.clear().await;
    let stats = bus.stats().await;
    assert_eq!(stats.subscriptions, 0);
    assert_eq!(stats.history_messages, 0);
    assert!(bus.topics().await.is_empty());
}
