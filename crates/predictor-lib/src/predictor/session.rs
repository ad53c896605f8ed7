//! Model session lifecycle
//!
//! [`ModelSessionManager`] owns the single loaded classifier for the
//! process. The model is loaded lazily on first use (or explicit warm-up),
//! at most one load runs at a time, and a failed load stays failed until
//! [`ModelSessionManager::retry`] is called.

use super::tensor::ModelInputs;
use crate::error::{FailureReason, InferenceFailure, SessionError};
use crate::observability::{PredictorMetrics, StructuredLogger};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

/// A loaded, ready-to-invoke classifier
#[async_trait]
pub trait InferenceSession: Send + Sync {
    /// Run the model and return its first output tensor as flat f32 values
    async fn run(&self, inputs: &ModelInputs) -> Result<Vec<f32>, SessionError>;

    /// Input names in the order the model declares them
    fn input_names(&self) -> Vec<String>;
}

/// Produces sessions; the only place a model artifact is read
#[async_trait]
pub trait SessionLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn InferenceSession>, SessionError>;

    /// Where the model comes from, for logs and status output
    fn source(&self) -> String;
}

/// Externally visible session state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SessionStatus {
    Unloaded,
    Loading,
    Ready,
    Failed { reason: String },
}

impl SessionStatus {
    /// Numeric code exported as the session state gauge
    pub fn code(&self) -> i64 {
        match self {
            SessionStatus::Unloaded => 0,
            SessionStatus::Loading => 1,
            SessionStatus::Ready => 2,
            SessionStatus::Failed { .. } => 3,
        }
    }
}

enum SessionState {
    Unloaded,
    Loading,
    Ready(Arc<dyn InferenceSession>),
    Failed(InferenceFailure),
}

impl SessionState {
    fn status(&self) -> SessionStatus {
        match self {
            SessionState::Unloaded => SessionStatus::Unloaded,
            SessionState::Loading => SessionStatus::Loading,
            SessionState::Ready(_) => SessionStatus::Ready,
            SessionState::Failed(failure) => SessionStatus::Failed {
                reason: failure.to_string(),
            },
        }
    }

    /// Result for callers if the state is terminal, `None` if a load is needed
    fn settled(&self) -> Option<Result<(), InferenceFailure>> {
        match self {
            SessionState::Ready(_) => Some(Ok(())),
            SessionState::Failed(failure) => Some(Err(failure.clone())),
            SessionState::Unloaded | SessionState::Loading => None,
        }
    }
}

struct Inner {
    loader: Box<dyn SessionLoader>,
    state: RwLock<SessionState>,
    load_attempts: AtomicU64,
    metrics: PredictorMetrics,
    logger: StructuredLogger,
}

impl Inner {
    async fn set_state(&self, state: SessionState) {
        let mut guard = self.state.write().await;
        self.metrics.set_session_state(state.status().code());
        *guard = state;
    }

    async fn load(&self) -> Result<(), InferenceFailure> {
        self.set_state(SessionState::Loading).await;
        let attempt = self.load_attempts.fetch_add(1, Ordering::Relaxed) + 1;
        self.metrics.inc_load_attempts();

        let source = self.loader.source();
        debug!(attempt, source = %source, "Loading model");

        let start = Instant::now();
        let result = self.loader.load().await;
        let elapsed = start.elapsed();
        self.metrics.observe_load_latency(elapsed.as_secs_f64());

        match result {
            Ok(session) => {
                self.logger
                    .log_model_loaded(&source, attempt, elapsed.as_millis(), &session.input_names());
                self.set_state(SessionState::Ready(session)).await;
                Ok(())
            }
            Err(e) => {
                let failure = InferenceFailure::model_load(&e);
                self.logger.log_model_load_failed(&source, attempt, &failure.detail);
                self.set_state(SessionState::Failed(failure.clone())).await;
                Err(failure)
            }
        }
    }
}

/// Owns the process-wide classifier session
///
/// Cheap to share behind an `Arc`; every prediction borrows the same session
/// once it is ready.
pub struct ModelSessionManager {
    inner: Arc<Inner>,
    load_lock: Arc<Mutex<()>>,
}

impl ModelSessionManager {
    pub fn new(loader: impl SessionLoader + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                loader: Box::new(loader),
                state: RwLock::new(SessionState::Unloaded),
                load_attempts: AtomicU64::new(0),
                metrics: PredictorMetrics::new(),
                logger: StructuredLogger::new("predictor"),
            }),
            load_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Use a named logger for lifecycle events
    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        // Only possible before the manager is shared
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.logger = logger;
        }
        self
    }

    /// Load the model unless it is already loaded or has failed
    ///
    /// Callers arriving while a load is in flight wait for that load and get
    /// its result. A failed load is returned as-is on every call until
    /// [`retry`](Self::retry).
    pub async fn ensure_loaded(&self) -> Result<(), InferenceFailure> {
        if let Some(result) = self.inner.state.read().await.settled() {
            return result;
        }

        let guard = Arc::clone(&self.load_lock).lock_owned().await;
        if let Some(result) = self.inner.state.read().await.settled() {
            return result;
        }

        self.spawn_load(guard).await
    }

    /// Explicitly retry after a failed load
    ///
    /// Returns immediately if the session is already ready.
    pub async fn retry(&self) -> Result<(), InferenceFailure> {
        let guard = Arc::clone(&self.load_lock).lock_owned().await;
        if matches!(*self.inner.state.read().await, SessionState::Ready(_)) {
            return Ok(());
        }

        self.spawn_load(guard).await
    }

    /// Run the load on its own task so a caller giving up cannot abort it;
    /// the load lock is held until the task finishes.
    async fn spawn_load(&self, guard: OwnedMutexGuard<()>) -> Result<(), InferenceFailure> {
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let _guard = guard;
            inner.load().await
        });

        match handle.await {
            Ok(result) => result,
            Err(e) => {
                let failure = InferenceFailure::new(
                    FailureReason::ModelLoadFailed,
                    format!("model load task aborted: {}", e),
                );
                self.inner
                    .set_state(SessionState::Failed(failure.clone()))
                    .await;
                Err(failure)
            }
        }
    }

    /// The loaded session, if ready
    pub async fn session(&self) -> Option<Arc<dyn InferenceSession>> {
        match &*self.inner.state.read().await {
            SessionState::Ready(session) => Some(Arc::clone(session)),
            _ => None,
        }
    }

    pub async fn status(&self) -> SessionStatus {
        self.inner.state.read().await.status()
    }

    /// Number of load attempts started so far
    pub fn load_attempts(&self) -> u64 {
        self.inner.load_attempts.load(Ordering::Relaxed)
    }

    pub fn source(&self) -> String {
        self.inner.loader.source()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    struct EchoSession;

    #[async_trait]
    impl InferenceSession for EchoSession {
        async fn run(&self, _inputs: &ModelInputs) -> Result<Vec<f32>, SessionError> {
            Ok(vec![1.0])
        }

        fn input_names(&self) -> Vec<String> {
            Vec::new()
        }
    }

    /// Loader that counts attempts and fails while `failing` is set
    struct CountingLoader {
        attempts: Arc<AtomicU64>,
        failing: Arc<AtomicBool>,
        delay: Duration,
    }

    impl CountingLoader {
        fn new(failing: bool, delay: Duration) -> (Self, Arc<AtomicU64>, Arc<AtomicBool>) {
            let attempts = Arc::new(AtomicU64::new(0));
            let failing = Arc::new(AtomicBool::new(failing));
            let loader = Self {
                attempts: attempts.clone(),
                failing: failing.clone(),
                delay,
            };
            (loader, attempts, failing)
        }
    }

    #[async_trait]
    impl SessionLoader for CountingLoader {
        async fn load(&self) -> Result<Arc<dyn InferenceSession>, SessionError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.failing.load(Ordering::SeqCst) {
                Err(SessionError::Malformed("truncated graph".to_string()))
            } else {
                Ok(Arc::new(EchoSession))
            }
        }

        fn source(&self) -> String {
            "memory://test".to_string()
        }
    }

    #[tokio::test]
    async fn test_starts_unloaded() {
        let (loader, attempts, _) = CountingLoader::new(false, Duration::ZERO);
        let manager = ModelSessionManager::new(loader);

        assert_eq!(manager.status().await, SessionStatus::Unloaded);
        assert!(manager.session().await.is_none());
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ensure_loaded_is_idempotent() {
        let (loader, attempts, _) = CountingLoader::new(false, Duration::ZERO);
        let manager = ModelSessionManager::new(loader);

        manager.ensure_loaded().await.unwrap();
        manager.ensure_loaded().await.unwrap();

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(manager.status().await, SessionStatus::Ready);
        assert!(manager.session().await.is_some());
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_load() {
        let (loader, attempts, _) = CountingLoader::new(false, Duration::from_millis(50));
        let manager = Arc::new(ModelSessionManager::new(loader));

        let (a, b) = tokio::join!(manager.ensure_loaded(), manager.ensure_loaded());
        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(manager.load_attempts(), 1);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.ensure_loaded().await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_status_reports_loading_while_in_flight() {
        let (loader, _, _) = CountingLoader::new(false, Duration::from_millis(100));
        let manager = Arc::new(ModelSessionManager::new(loader));

        let loading = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.ensure_loaded().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(manager.status().await, SessionStatus::Loading);

        loading.await.unwrap().unwrap();
        assert_eq!(manager.status().await, SessionStatus::Ready);
    }

    #[tokio::test]
    async fn test_failed_load_is_sticky_until_retry() {
        let (loader, attempts, failing) = CountingLoader::new(true, Duration::ZERO);
        let manager = ModelSessionManager::new(loader);

        for _ in 0..3 {
            let err = manager.ensure_loaded().await.unwrap_err();
            assert_eq!(err.reason, FailureReason::ModelLoadFailed);
            assert!(err.detail.contains("truncated graph"));
        }
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(matches!(
            manager.status().await,
            SessionStatus::Failed { .. }
        ));
        assert!(manager.session().await.is_none());

        failing.store(false, Ordering::SeqCst);
        assert!(manager.ensure_loaded().await.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);

        manager.retry().await.unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(manager.status().await, SessionStatus::Ready);
        manager.ensure_loaded().await.unwrap();
    }

    #[tokio::test]
    async fn test_retry_on_ready_session_does_not_reload() {
        let (loader, attempts, _) = CountingLoader::new(false, Duration::ZERO);
        let manager = ModelSessionManager::new(loader);

        manager.ensure_loaded().await.unwrap();
        manager.retry().await.unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_abandoned_load_still_completes() {
        let (loader, attempts, _) = CountingLoader::new(false, Duration::from_millis(50));
        let manager = ModelSessionManager::new(loader);

        let timed_out =
            tokio::time::timeout(Duration::from_millis(5), manager.ensure_loaded()).await;
        assert!(timed_out.is_err());

        manager.ensure_loaded().await.unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_value(SessionStatus::Failed {
            reason: "model_load_failed: missing".to_string(),
        })
        .unwrap();
        assert_eq!(json["state"], "failed");
        assert_eq!(json["reason"], "model_load_failed: missing");
        assert_eq!(
            serde_json::to_value(SessionStatus::Ready).unwrap()["state"],
            "ready"
        );
    }
}
