//! Publish lifecycle: preparation, auth, delivery outcomes, retry and close

mod common;
use common::*;

use herald_core::auth::BearerAuth;
use herald_core::{HandlerChain, MemorySink, RetryPolicy, RetryStrategy};
use herald_messaging::{
    assert_published, attach_last_publish, clear_last_publish, last_event, last_publish_result,
    publish_retry_executor, Delivery, DeliveryCheckHandler, InMemoryBroker, MemoryProducer,
    OutboundEvent, ProducerBuilder, ProducerError, TransportError,
};
use std::sync::Arc;
use std::thread;

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        strategy: RetryStrategy::FixedDelay,
        initial_delay_ms: 10,
        ..RetryPolicy::default()
    }
}

// ============================================================================
// Preparation
// ============================================================================

#[test]
fn test_default_topic_and_standard_headers_applied() {
    let mut transport = MockPublisher::new();
    transport
        .expect_send()
        .withf(|event, timeout| {
            event.topic == USER_TOPIC
                && event.headers.contains_key("timestamp")
                && event.headers.get("content-type").map(String::as_str) == Some("application/json")
                && *timeout == TEST_TIMEOUT
        })
        .times(1)
        .returning(|_, _| Ok(accepted(0)));
    transport.expect_flush().returning(|_| Ok(()));

    let producer = ProducerBuilder::new()
        .default_topic(USER_TOPIC)
        .timeout(TEST_TIMEOUT)
        .build(transport);

    let result = producer
        .publish(OutboundEvent::default().body(user_created(7)))
        .unwrap();

    assert_published(&result).succeeded().topic(USER_TOPIC);
}

#[test]
fn test_caller_headers_are_not_overwritten() {
    let mut transport = MockPublisher::new();
    transport
        .expect_send()
        .withf(|event, _| {
            event.headers.get("timestamp").map(String::as_str) == Some("1700000000000")
                && event.headers.get("content-type").map(String::as_str) == Some("text/plain")
        })
        .times(1)
        .returning(|_, _| Ok(accepted(0)));
    transport.expect_flush().returning(|_| Ok(()));

    let producer = ProducerBuilder::new().build(transport);
    producer
        .publish(
            OutboundEvent::new(USER_TOPIC)
                .header("timestamp", "1700000000000")
                .content_type("text/plain"),
        )
        .unwrap();
}

#[test]
fn test_missing_topic_fails_before_send() {
    let mut transport = MockPublisher::new();
    transport.expect_send().times(0);
    transport.expect_flush().returning(|_| Ok(()));

    let producer = ProducerBuilder::new().build(transport);
    let err = producer.publish(OutboundEvent::default()).unwrap_err();

    assert!(matches!(err, ProducerError::MissingTopic));
}

// ============================================================================
// Authentication
// ============================================================================

#[test]
fn test_auth_headers_reach_transport() {
    let mut transport = MockPublisher::new();
    transport
        .expect_send()
        .withf(|event, _| {
            event.headers.get("Authorization").map(String::as_str)
                == Some(format!("Bearer {}", BEARER_TOKEN).as_str())
        })
        .times(1)
        .returning(|_, _| Ok(accepted(0)));
    transport.expect_flush().returning(|_| Ok(()));

    let producer = ProducerBuilder::new()
        .auth(Arc::new(BearerAuth::new(BEARER_TOKEN)))
        .build(transport);

    producer.publish(OutboundEvent::new(USER_TOPIC)).unwrap();
}

#[test]
fn test_auth_failure_never_sends() {
    let mut transport = MockPublisher::new();
    transport.expect_send().times(0);
    transport.expect_flush().returning(|_| Ok(()));

    let producer = ProducerBuilder::new()
        .auth(Arc::new(FailingAuth))
        .build(transport);

    let err = producer.publish(OutboundEvent::new(USER_TOPIC)).unwrap_err();
    assert!(matches!(err, ProducerError::Auth(_)));
}

#[test]
fn test_auth_runs_once_per_publish() {
    let auth = Arc::new(CountingAuth::default());
    let broker = InMemoryBroker::new();
    let producer = ProducerBuilder::new()
        .auth(auth.clone())
        .build(MemoryProducer::new(broker.clone()));

    for _ in 0..3 {
        producer.publish(OutboundEvent::new(USER_TOPIC)).unwrap();
    }

    assert_eq!(auth.calls(), 3);
    assert_eq!(broker.message_count(USER_TOPIC), 3);
}

// ============================================================================
// Delivery outcomes
// ============================================================================

#[test]
fn test_broker_rejection_is_an_unsuccessful_result() {
    clear_last_publish();
    let mut transport = MockPublisher::new();
    transport.expect_send().times(1).returning(|_, _| {
        Ok(Delivery::Rejected {
            reason: "topic is read-only".into(),
        })
    });
    transport.expect_flush().returning(|_| Ok(()));

    let producer = ProducerBuilder::new().build(transport);
    let result = producer.publish(OutboundEvent::new(AUDIT_TOPIC)).unwrap();

    assert_published(&result).failed().topic(AUDIT_TOPIC);
    assert_eq!(result.error.as_deref(), Some("topic is read-only"));
    assert_eq!(last_publish_result(), Some(result));
}

#[test]
fn test_delivery_check_turns_rejection_into_error() {
    clear_last_publish();
    let mut transport = MockPublisher::new();
    transport.expect_send().times(1).returning(|_, _| {
        Ok(Delivery::Rejected {
            reason: "quota".into(),
        })
    });
    transport.expect_flush().returning(|_| Ok(()));

    let producer = ProducerBuilder::new()
        .chain(HandlerChain::new().with(DeliveryCheckHandler))
        .build(transport);
    let err = producer.publish(OutboundEvent::new(AUDIT_TOPIC)).unwrap_err();

    let ProducerError::Rejected(rejection) = err else {
        panic!("expected a chain rejection, got {err:?}");
    };
    assert_eq!(rejection.handler(), "delivery-check");
    assert!(last_event().is_none());
}

#[test]
fn test_send_fault_propagates_without_observation() {
    clear_last_publish();
    let mut transport = MockPublisher::new();
    transport
        .expect_send()
        .times(1)
        .returning(|_, timeout| Err(TransportError::Timeout(timeout)));
    transport.expect_flush().returning(|_| Ok(()));

    let producer = ProducerBuilder::new().build(transport);
    let err = producer.publish(OutboundEvent::new(USER_TOPIC)).unwrap_err();

    assert!(matches!(err, ProducerError::Transport(TransportError::Timeout(_))));
    assert!(last_publish_result().is_none());
}

// ============================================================================
// Retry
// ============================================================================

#[test]
fn test_retry_recovers_from_transient_send_faults() {
    let mut transport = MockPublisher::new();
    let mut calls = 0;
    transport.expect_send().times(3).returning(move |_, timeout| {
        calls += 1;
        if calls < 3 {
            Err(TransportError::Timeout(timeout))
        } else {
            Ok(accepted(9))
        }
    });
    transport.expect_flush().returning(|_| Ok(()));

    let producer = ProducerBuilder::new().build(transport);
    let executor = publish_retry_executor(fast_policy(3), "publish user-events");

    let result = producer
        .publish_with_retry(&executor, OutboundEvent::new(USER_TOPIC))
        .unwrap();

    assert_eq!(result.offset, Some(9));
}

#[test]
fn test_retry_does_not_repeat_permanent_send_failure() {
    let mut transport = MockPublisher::new();
    transport
        .expect_send()
        .times(1)
        .returning(|_, _| Err(TransportError::Send("unknown topic".into())));
    transport.expect_flush().returning(|_| Ok(()));

    let producer = ProducerBuilder::new().build(transport);
    let executor = publish_retry_executor(fast_policy(3), "publish");

    let err = producer
        .publish_with_retry(&executor, OutboundEvent::new("missing"))
        .unwrap_err();

    assert_eq!(err.attempts(), 1);
    assert!(!err.is_exhausted());
}

#[test]
fn test_retry_exhaustion_keeps_last_fault() {
    let broker = InMemoryBroker::new();
    broker.inject(herald_messaging::Fault::SendTimeout);
    broker.inject(herald_messaging::Fault::SendTimeout);
    let producer = ProducerBuilder::new().build(MemoryProducer::new(broker.clone()));
    let executor = publish_retry_executor(fast_policy(2), "publish");

    let err = producer
        .publish_with_retry(&executor, OutboundEvent::new(USER_TOPIC))
        .unwrap_err();

    assert!(err.is_exhausted());
    assert_eq!(err.attempts(), 2);
    assert!(matches!(
        err.into_source(),
        Some(ProducerError::Transport(TransportError::Timeout(_)))
    ));
    assert_eq!(broker.message_count(USER_TOPIC), 0);
}

// ============================================================================
// Close
// ============================================================================

#[test]
fn test_close_flushes_exactly_once() {
    let mut transport = MockPublisher::new();
    transport.expect_flush().times(1).returning(|_| Ok(()));

    let producer = ProducerBuilder::new().build(transport);
    producer.close().unwrap();
    producer.close().unwrap();
    assert!(producer.is_closed());
    drop(producer);
}

#[test]
fn test_drop_flushes_unclosed_producer() {
    let broker = InMemoryBroker::new();
    let transport = Arc::new(MemoryProducer::new(broker));

    drop(ProducerBuilder::new().build(transport.clone()));

    assert_eq!(transport.flushes(), 1);
}

#[test]
fn test_publish_after_close_is_refused() {
    let mut transport = MockPublisher::new();
    transport.expect_send().times(0);
    transport.expect_flush().times(1).returning(|_| Ok(()));

    let producer = ProducerBuilder::new().build(transport);
    producer.close().unwrap();

    let err = producer.publish(OutboundEvent::new(USER_TOPIC)).unwrap_err();
    assert!(matches!(err, ProducerError::Closed));
}

// ============================================================================
// Observation
// ============================================================================

#[test]
fn test_threads_observe_their_own_publish() {
    let broker = InMemoryBroker::new();
    let producer = ProducerBuilder::new().build(MemoryProducer::new(broker));

    thread::scope(|scope| {
        for n in 0..4u64 {
            let producer = &producer;
            scope.spawn(move || {
                let key = format!("user-{}", n);
                producer
                    .publish(OutboundEvent::new(USER_TOPIC).key(key.clone()).body(user_created(n)))
                    .unwrap();

                let event = last_event().unwrap();
                assert_eq!(event.key.as_deref(), Some(key.as_str()));
                assert_eq!(event.body, user_created(n));
            });
        }
    });
}

#[test]
fn test_last_publish_attached_to_report() {
    let producer = ProducerBuilder::new().build(MemoryProducer::new(InMemoryBroker::new()));
    producer
        .publish(OutboundEvent::new(USER_TOPIC).key(USER_KEY).body(user_created(7)))
        .unwrap();

    let sink = MemorySink::new();
    assert!(attach_last_publish(&sink));
    assert_eq!(sink.names(), vec!["Last Published Event".to_string()]);
    assert!(sink.attachments()[0].text().contains(USER_KEY));

    clear_last_publish();
    assert!(!attach_last_publish(&MemorySink::new()));
}
