use async_trait::async_trait;
use incident_classifier::{
    ClassifierError, FeedSet, InferenceResult, InferenceSession, SessionCache, SessionProvider,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct StaticSession;

#[async_trait]
impl InferenceSession for StaticSession {
    async fn run(&self, _feeds: &FeedSet) -> Result<InferenceResult, ClassifierError> {
        Ok(InferenceResult::with_label(10))
    }
}

/// Counts constructions; fails the first `failures` of them.
struct CountingProvider {
    constructions: AtomicUsize,
    failures: usize,
    delay: Duration,
}

impl CountingProvider {
    fn new(failures: usize) -> Self {
        Self {
            constructions: AtomicUsize::new(0),
            failures,
            delay: Duration::from_millis(20),
        }
    }

    fn constructions(&self) -> usize {
        self.constructions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionProvider for CountingProvider {
    async fn create(&self, url: &str) -> Result<Arc<dyn InferenceSession>, ClassifierError> {
        let attempt = self.constructions.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if attempt < self.failures {
            return Err(ClassifierError::ModelLoad(format!("corrupt artifact at {}", url)));
        }
        Ok(Arc::new(StaticSession))
    }
}

#[tokio::test]
async fn test_concurrent_first_calls_construct_once() {
    let cache = SessionCache::new(CountingProvider::new(0));

    let (first, second) = tokio::join!(
        cache.get_session("model.onnx"),
        cache.get_session("model.onnx")
    );
    let first = first.expect("first caller should get a session");
    let second = second.expect("second caller should get a session");

    assert_eq!(cache.provider().constructions(), 1);
    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn test_concurrent_calls_across_tasks_construct_once() {
    let cache = Arc::new(SessionCache::new(CountingProvider::new(0)));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.get_session("model.onnx").await.is_ok() })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap());
    }

    assert_eq!(cache.provider().constructions(), 1);
    assert_eq!(cache.len().await, 1);
}

#[tokio::test]
async fn test_completed_session_is_reused() {
    let cache = SessionCache::new(CountingProvider::new(0));

    let first = cache.get_session("model.onnx").await.unwrap();
    assert!(cache.is_cached("model.onnx").await);
    let second = cache.get_session("model.onnx").await.unwrap();

    assert_eq!(cache.provider().constructions(), 1);
    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn test_each_url_gets_its_own_session() {
    let cache = SessionCache::new(CountingProvider::new(0));

    cache.get_session("a.onnx").await.unwrap();
    cache.get_session("b.onnx").await.unwrap();
    cache.get_session("a.onnx").await.unwrap();

    assert_eq!(cache.provider().constructions(), 2);
    assert_eq!(cache.len().await, 2);
}

#[tokio::test]
async fn test_failure_reaches_all_waiters_then_retries() {
    let cache = SessionCache::new(CountingProvider::new(1));

    let (first, second) = tokio::join!(
        cache.get_session("model.onnx"),
        cache.get_session("model.onnx")
    );
    let expected = ClassifierError::ModelLoad("corrupt artifact at model.onnx".into());
    assert_eq!(first.err(), Some(expected.clone()));
    assert_eq!(second.err(), Some(expected));
    assert_eq!(cache.provider().constructions(), 1);

    // The failed entry is not kept.
    assert!(!cache.is_cached("model.onnx").await);
    assert!(cache.is_empty().await);

    let session = cache.get_session("model.onnx").await.unwrap();
    let result = session.run(&FeedSet::from_report("t", "c")).await.unwrap();
    assert_eq!(result.label_id(), Ok(10));
    assert_eq!(cache.provider().constructions(), 2);
}

#[tokio::test]
async fn test_each_sequential_failure_starts_a_new_attempt() {
    let cache = SessionCache::new(CountingProvider::new(2));

    assert!(cache.get_session("model.onnx").await.is_err());
    assert!(cache.get_session("model.onnx").await.is_err());
    assert_eq!(cache.provider().constructions(), 2);
    assert!(cache.is_empty().await);

    assert!(cache.get_session("model.onnx").await.is_ok());
    assert!(cache.get_session("model.onnx").await.is_ok());
    assert_eq!(cache.provider().constructions(), 3);
    assert!(cache.is_cached("model.onnx").await);
}
