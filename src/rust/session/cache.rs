use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use log::{info, warn};
use tokio::sync::Mutex;

use super::{InferenceSession, SessionProvider};
use crate::classifier::ClassifierError;

type SessionFuture = Shared<BoxFuture<'static, Result<Arc<dyn InferenceSession>, ClassifierError>>>;

/// Memoizes one inference session per model URL.
///
/// The cache stores the in-flight construction rather than its result, so
/// callers that ask for the same URL while the model is still loading all
/// await the same construction. Completed sessions live for as long as the
/// cache does; there is no eviction.
///
/// A failed construction is reported to every caller that was waiting on it
/// and then forgotten: the next request for that URL starts over. A caller
/// that looks the URL up after the construction failed but before the entry
/// is dropped also receives that same error, without a new attempt.
pub struct SessionCache<P: SessionProvider> {
    provider: Arc<P>,
    sessions: Mutex<HashMap<String, SessionFuture>>,
}

impl<P: SessionProvider> SessionCache<P> {
    pub fn new(provider: P) -> Self {
        Self::with_provider(Arc::new(provider))
    }

    pub fn with_provider(provider: Arc<P>) -> Self {
        Self {
            provider,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Returns the session for `url`, constructing it on first use.
    ///
    /// # Errors
    /// - whatever the provider returned, typically `ModelLoad`
    pub async fn get_session(&self, url: &str) -> Result<Arc<dyn InferenceSession>, ClassifierError> {
        let pending = {
            let mut sessions = self.sessions.lock().await;
            match sessions.get(url) {
                Some(pending) => pending.clone(),
                None => {
                    info!("Creating inference session for {}", url);
                    let provider = Arc::clone(&self.provider);
                    let owned_url = url.to_owned();
                    let pending = async move { provider.create(&owned_url).await }
                        .boxed()
                        .shared();
                    sessions.insert(url.to_owned(), pending.clone());
                    pending
                }
            }
        };

        let result = pending.clone().await;
        if let Err(e) = &result {
            let mut sessions = self.sessions.lock().await;
            // Only drop the entry we awaited; a retry may already be in flight.
            if sessions.get(url).is_some_and(|current| current.ptr_eq(&pending)) {
                warn!("Session construction for {} failed, will retry on next use: {}", url, e);
                sessions.remove(url);
            }
        }
        result
    }

    /// Whether a session for `url` has finished loading successfully
    pub async fn is_cached(&self, url: &str) -> bool {
        self.sessions
            .lock()
            .await
            .get(url)
            .and_then(|pending| pending.peek())
            .is_some_and(|result| result.is_ok())
    }

    /// Number of URLs with a loaded or loading session
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
