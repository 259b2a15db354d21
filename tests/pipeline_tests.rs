//! Integration Tests for the Pipeline Adapter
//!
//! Runs the adapter against a fake Redis over real TCP.

mod common;

use std::time::Duration;

use bytes::Bytes;
use cache_proxy::{PipelineAdapter, ProxyError};
use common::{Behavior, FakeRedis};

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_correlates_many_concurrent_requests() {
    let data: Vec<(String, String)> = (0..200)
        .map(|i| (format!("key{}", i), format!("value{}", i)))
        .collect();
    let refs: Vec<(&str, &str)> = data.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    let redis = FakeRedis::start(&refs).await;
    let backend = PipelineAdapter::connect(&redis.addr, 8, TIMEOUT).await.unwrap();

    let handles: Vec<_> = (0..200)
        .map(|i| {
            let backend = backend.clone();
            tokio::spawn(async move { (i, backend.fetch(&format!("key{}", i)).await) })
        })
        .collect();

    for handle in handles {
        let (i, response) = handle.await.unwrap();
        assert_eq!(response, Ok(Bytes::from(format!("value{}", i))));
    }
    assert_eq!(redis.total_gets(), 200);
}

#[tokio::test]
async fn test_in_flight_never_exceeds_limit() {
    let behavior = Behavior {
        reply_delay: Duration::from_millis(5),
        ..Behavior::default()
    };
    let redis = FakeRedis::start_with(&[("k", "v")], behavior).await;
    let backend = PipelineAdapter::connect(&redis.addr, 3, TIMEOUT).await.unwrap();

    let handles: Vec<_> = (0..30)
        .map(|_| {
            let backend = backend.clone();
            tokio::spawn(async move { backend.fetch("k").await })
        })
        .collect();

    let observer = {
        let backend = backend.clone();
        tokio::spawn(async move {
            let mut peak = 0;
            for _ in 0..50 {
                peak = peak.max(backend.in_flight());
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
            peak
        })
    };

    for handle in handles {
        assert_eq!(handle.await.unwrap(), Ok(Bytes::from_static(b"v")));
    }
    assert!(observer.await.unwrap() <= 3);
    assert!(redis.max_outstanding() <= 3);
    assert!(redis.max_outstanding() >= 1);
    assert_eq!(backend.in_flight(), 0);
}

#[tokio::test]
async fn test_missing_key_is_not_found() {
    let redis = FakeRedis::start(&[]).await;
    let backend = PipelineAdapter::connect(&redis.addr, 2, TIMEOUT).await.unwrap();

    assert_eq!(
        backend.fetch("ghost").await,
        Err(ProxyError::NotFound("ghost".to_string()))
    );
}

#[tokio::test]
async fn test_error_reply_then_success() {
    let redis = FakeRedis::start(&[("good", "yes")]).await;
    let backend = PipelineAdapter::connect(&redis.addr, 2, TIMEOUT).await.unwrap();

    assert_eq!(
        backend.fetch("error:boom").await,
        Err(ProxyError::Backend("ERR error:boom".to_string()))
    );
    assert_eq!(backend.fetch("good").await, Ok(Bytes::from_static(b"yes")));
}

#[tokio::test]
async fn test_silent_backend_times_out() {
    let behavior = Behavior {
        silent: true,
        ..Behavior::default()
    };
    let redis = FakeRedis::start_with(&[("k", "v")], behavior).await;
    let timeout = Duration::from_millis(100);
    let backend = PipelineAdapter::connect(&redis.addr, 2, timeout).await.unwrap();

    assert_eq!(backend.fetch("k").await, Err(ProxyError::Timeout(timeout)));
    assert_eq!(redis.gets("k"), 1);
}

#[tokio::test]
async fn test_connect_refused() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let result = PipelineAdapter::connect(&addr, 2, TIMEOUT).await;
    assert!(matches!(result, Err(ProxyError::Connect { .. })));
}
