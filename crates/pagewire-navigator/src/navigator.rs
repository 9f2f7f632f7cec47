//! Click handling: navigate immediately, or race the page fetch against a deadline.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use pagewire_http::HttpError;
use pagewire_query::{QueryClient, QueryRegistry};
use serde_json::Value;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::NavigatorConfig;

/// Where a navigation attempt is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavigationPhase {
    #[default]
    Idle,
    Resolving,
    CacheHit,
    Racing,
    Navigated,
}

/// Why a navigation fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// No registered query for the path.
    NotFound,
    /// Fresh data was already cached.
    CacheHit,
    /// The fetch finished before the deadline.
    Fetched,
    /// The fetch failed before the deadline.
    FetchFailed(String),
    /// The deadline passed first; the fetch keeps running.
    DeadlineElapsed,
}

/// A completed navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub path: String,
    pub outcome: NavigationOutcome,
    /// Time from the click to the navigation.
    pub elapsed: Duration,
}

/// Performs the actual route change.
pub trait Navigate: Send + Sync {
    fn navigate(&self, path: &str);
}

/// A progress indicator shown while racing.
pub trait ProgressReporter: Send + Sync {
    fn start(&self);
    fn done(&self);
}

/// Clears the in-flight flag when the attempt ends, however it ends.
struct NavigationGuard<'a>(&'a AtomicBool);

impl<'a> NavigationGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for NavigationGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Client-side navigator that never blocks a click on data for longer than
/// the configured deadline.
///
/// Only one navigation runs at a time; clicks during an attempt are ignored.
/// Fetches that lose the race keep running and fill the page cache; they are
/// tracked so [`OptimisticNavigator::settle`] can wait for them.
pub struct OptimisticNavigator {
    pub(crate) registry: Arc<QueryRegistry>,
    pub(crate) client: Arc<QueryClient>,
    navigate: Arc<dyn Navigate>,
    progress: Option<Arc<dyn ProgressReporter>>,
    pub(crate) config: NavigatorConfig,
    navigating: AtomicBool,
    phase: Mutex<NavigationPhase>,
    pending: Mutex<JoinSet<()>>,
    pub(crate) hover_timers: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl OptimisticNavigator {
    pub fn new(
        registry: Arc<QueryRegistry>,
        client: Arc<QueryClient>,
        navigate: Arc<dyn Navigate>,
    ) -> Self {
        Self {
            registry,
            client,
            navigate,
            progress: None,
            config: NavigatorConfig::default(),
            navigating: AtomicBool::new(false),
            phase: Mutex::new(NavigationPhase::Idle),
            pending: Mutex::new(JoinSet::new()),
            hover_timers: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_config(mut self, config: NavigatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn phase(&self) -> NavigationPhase {
        *lock(&self.phase)
    }

    pub fn is_navigating(&self) -> bool {
        self.navigating.load(Ordering::Acquire)
    }

    fn set_phase(&self, phase: NavigationPhase) {
        *lock(&self.phase) = phase;
    }

    /// Handle a click on a link to `path`.
    ///
    /// Returns `None` when another navigation is already in flight.
    pub async fn click(&self, path: &str) -> Option<Navigation> {
        let Some(_guard) = NavigationGuard::acquire(&self.navigating) else {
            debug!(path, "navigation already in flight, ignoring click");
            return None;
        };

        let started = Instant::now();
        self.set_phase(NavigationPhase::Resolving);

        let outcome = match self.registry.resolve(path) {
            None => NavigationOutcome::NotFound,
            Some(resolved) if self.client.get_cached(&resolved.query).is_some() => {
                self.set_phase(NavigationPhase::CacheHit);
                NavigationOutcome::CacheHit
            }
            Some(resolved) => {
                self.set_phase(NavigationPhase::Racing);
                if let Some(progress) = &self.progress {
                    progress.start();
                }

                let client = Arc::clone(&self.client);
                let query = resolved.query;
                let mut fetch = tokio::spawn(async move { client.fetch(&query).await });

                let outcome = tokio::select! {
                    joined = &mut fetch => match joined {
                        Ok(Ok(_)) => NavigationOutcome::Fetched,
                        Ok(Err(e)) => {
                            warn!(path, error = %e, "navigation fetch failed");
                            NavigationOutcome::FetchFailed(e.to_string())
                        }
                        Err(e) => {
                            warn!(path, error = %e, "navigation fetch task failed");
                            NavigationOutcome::FetchFailed(e.to_string())
                        }
                    },
                    _ = tokio::time::sleep(self.config.deadline()) => {
                        self.track_pending(path, fetch);
                        NavigationOutcome::DeadlineElapsed
                    }
                };

                if let Some(progress) = &self.progress {
                    progress.done();
                }
                outcome
            }
        };

        self.navigate.navigate(path);
        self.set_phase(NavigationPhase::Navigated);

        let navigation = Navigation {
            path: path.to_string(),
            outcome,
            elapsed: started.elapsed(),
        };
        info!(
            path,
            outcome = ?navigation.outcome,
            duration_ms = navigation.elapsed.as_millis() as u64,
            "navigated"
        );
        Some(navigation)
    }

    /// Keep a fetch that lost the race running and observed.
    fn track_pending(
        &self,
        path: &str,
        fetch: JoinHandle<Result<Value, HttpError>>,
    ) {
        let path = path.to_string();
        let mut pending = lock(&self.pending);
        reap_finished(&mut pending);
        pending.spawn(async move {
            match fetch.await {
                Ok(Ok(_)) => debug!(path = %path, "late fetch landed in cache"),
                Ok(Err(e)) => warn!(path = %path, error = %e, "late navigation fetch failed"),
                Err(e) => warn!(path = %path, error = %e, "late navigation fetch task failed"),
            }
        });
    }

    /// Wait for every fetch that lost its race. Returns how many were awaited.
    pub async fn settle(&self) -> usize {
        let mut pending = std::mem::take(&mut *lock(&self.pending));
        let mut settled = 0;
        while pending.join_next().await.is_some() {
            settled += 1;
        }
        settled
    }

    /// Number of race losers still running.
    pub fn pending_fetches(&self) -> usize {
        let mut pending = lock(&self.pending);
        reap_finished(&mut pending);
        pending.len()
    }
}

/// Drop tasks that already completed from the set.
fn reap_finished(pending: &mut JoinSet<()>) {
    while pending.try_join_next().is_some() {}
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use pagewire_cache::CacheKey;
    use pagewire_http::{HttpClient, HttpClientConfig, MockResponse, MockTransport};
    use pagewire_query::QueryCache;
    use serde_json::json;

    #[derive(Default)]
    struct RecordingNavigate {
        visits: Mutex<Vec<(String, Instant)>>,
    }

    impl Navigate for RecordingNavigate {
        fn navigate(&self, path: &str) {
            lock(&self.visits).push((path.to_string(), Instant::now()));
        }
    }

    #[derive(Default)]
    struct CountingProgress {
        started: AtomicUsize,
        done: AtomicUsize,
    }

    impl ProgressReporter for CountingProgress {
        fn start(&self) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }

        fn done(&self) {
            self.done.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Harness {
        mock: Arc<MockTransport>,
        cache: Arc<QueryCache>,
        navigate: Arc<RecordingNavigate>,
        progress: Arc<CountingProgress>,
        navigator: Arc<OptimisticNavigator>,
    }

    fn harness(mock: MockTransport) -> Harness {
        let mock = Arc::new(mock);
        let http = HttpClient::with_transport(
            HttpClientConfig::default()
                .with_base_url("http://app.test")
                .with_retries(0),
            mock.clone(),
        );
        let cache = Arc::new(QueryCache::new());
        let client = Arc::new(QueryClient::new(Arc::new(http), cache.clone()));
        let navigate = Arc::new(RecordingNavigate::default());
        let progress = Arc::new(CountingProgress::default());
        let navigator = OptimisticNavigator::new(
            Arc::new(QueryRegistry::with_defaults()),
            client,
            navigate.clone(),
        )
        .with_progress(progress.clone());

        Harness {
            mock,
            cache,
            navigate,
            progress,
            navigator: Arc::new(navigator),
        }
    }

    fn assert_about(actual: Duration, expected: Duration) {
        let tolerance = Duration::from_millis(5);
        assert!(
            actual >= expected && actual <= expected + tolerance,
            "expected ~{:?}, got {:?}",
            expected,
            actual
        );
    }

    fn user(id: u64, delay: Duration) -> MockResponse {
        MockResponse::json(200, &json!({"$type": "UserProfilePage", "id": id, "firstName": "Ada"}))
            .with_delay(delay)
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_wins_and_late_fetch_lands() {
        let h = harness(MockTransport::new().respond_with("/api/users/7", user(7, Duration::from_millis(2000))));
        let start = Instant::now();

        let navigation = h.navigator.click("/users/7").await.unwrap();

        assert_eq!(navigation.outcome, NavigationOutcome::DeadlineElapsed);
        assert_about(navigation.elapsed, Duration::from_millis(1000));
        let visits = lock(&h.navigate.visits).clone();
        assert_eq!(visits.len(), 1);
        assert_about(visits[0].1 - start, Duration::from_millis(1000));
        assert_eq!(h.navigator.phase(), NavigationPhase::Navigated);
        assert!(!h.navigator.is_navigating());

        let key = CacheKey::new(["user", "7"]);
        assert!(h.cache.get(&key).is_none());
        assert_eq!(h.navigator.pending_fetches(), 1);

        assert_eq!(h.navigator.settle().await, 1);
        assert_about(start.elapsed(), Duration::from_millis(2000));
        assert_eq!(
            h.cache.get(&key).and_then(|v| v.get("firstName").cloned()),
            Some(json!("Ada"))
        );
        assert_eq!(h.progress.started.load(Ordering::SeqCst), 1);
        assert_eq!(h.progress.done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_landed_late_fetches_are_released() {
        let mock = MockTransport::new()
            .respond_with("/api/users/1", user(1, Duration::from_millis(2000)))
            .respond_with("/api/users/2", user(2, Duration::from_millis(2000)))
            .respond_with("/api/users/3", user(3, Duration::from_millis(2000)));
        let h = harness(mock);

        for id in 1..=3 {
            let navigation = h.navigator.click(&format!("/users/{}", id)).await.unwrap();
            assert_eq!(navigation.outcome, NavigationOutcome::DeadlineElapsed);
        }
        assert!(h.navigator.pending_fetches() > 0);

        tokio::time::sleep(Duration::from_millis(2000)).await;

        assert_eq!(h.navigator.pending_fetches(), 0);
        assert_eq!(h.navigator.settle().await, 0);
        for id in 1..=3 {
            let key = CacheKey::new(["user".to_string(), id.to_string()]);
            assert!(h.cache.get(&key).is_some());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_wins_before_deadline() {
        let h = harness(MockTransport::new().respond_with("/api/users/1", user(1, Duration::from_millis(100))));

        let navigation = h.navigator.click("/users/1").await.unwrap();

        assert_eq!(navigation.outcome, NavigationOutcome::Fetched);
        assert_about(navigation.elapsed, Duration::from_millis(100));
        assert!(h.cache.get(&CacheKey::new(["user", "1"])).is_some());
        assert_eq!(h.navigator.pending_fetches(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_still_navigates() {
        let h = harness(MockTransport::new());

        let navigation = h.navigator.click("/users/404").await.unwrap();

        assert!(matches!(navigation.outcome, NavigationOutcome::FetchFailed(_)));
        assert_eq!(lock(&h.navigate.visits)[0].0, "/users/404");
        assert_eq!(h.progress.done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_hit_navigates_without_fetch() {
        let h = harness(MockTransport::new());
        h.cache.set(
            CacheKey::new(["user", "3"]),
            json!({"$type": "UserProfilePage", "id": 3}),
            Duration::from_secs(60),
        );

        let navigation = h.navigator.click("/users/3").await.unwrap();

        assert_eq!(navigation.outcome, NavigationOutcome::CacheHit);
        assert_eq!(navigation.elapsed, Duration::ZERO);
        assert_eq!(h.mock.call_count(), 0);
        assert_eq!(h.progress.started.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_path_navigates_immediately() {
        let h = harness(MockTransport::new());

        let navigation = h.navigator.click("/about").await.unwrap();

        assert_eq!(navigation.outcome, NavigationOutcome::NotFound);
        assert_eq!(h.mock.call_count(), 0);
        assert_eq!(lock(&h.navigate.visits)[0].0, "/about");
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_during_navigation_is_ignored() {
        let h = harness(MockTransport::new().respond_with("/api/users/5", user(5, Duration::from_millis(300))));

        let (first, second) = tokio::join!(h.navigator.click("/users/5"), h.navigator.click("/users/5"));

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(lock(&h.navigate.visits).len(), 1);
        assert_eq!(h.mock.call_count(), 1);

        assert!(h.navigator.click("/users/5").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hover_prefetch_then_click_is_cache_hit() {
        let h = harness(MockTransport::new().respond_with("/api/users/8", user(8, Duration::ZERO)));

        h.navigator.pointer_enter("/users/8");
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(h.mock.call_count(), 1);
        let navigation = h.navigator.click("/users/8").await.unwrap();
        assert_eq!(navigation.outcome, NavigationOutcome::CacheHit);
        assert_eq!(h.mock.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pointer_leave_cancels_prefetch() {
        let h = harness(MockTransport::new().respond_with("/api/users/8", user(8, Duration::ZERO)));

        h.navigator.pointer_enter("/users/8");
        tokio::time::sleep(Duration::from_millis(100)).await;
        h.navigator.pointer_leave("/users/8");
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(h.mock.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reenter_restarts_debounce() {
        let h = harness(MockTransport::new().respond_with("/api/users/8", user(8, Duration::ZERO)));

        h.navigator.pointer_enter("/users/8");
        tokio::time::sleep(Duration::from_millis(150)).await;
        h.navigator.pointer_enter("/users/8");
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(h.mock.call_count(), 0);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(h.mock.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fired_hover_timers_are_released() {
        let h = harness(MockTransport::new());

        for i in 0..20 {
            h.navigator.pointer_enter(&format!("/docs/{}", i));
        }
        assert_eq!(lock(&h.navigator.hover_timers).len(), 20);

        tokio::time::sleep(Duration::from_millis(300)).await;
        h.navigator.pointer_enter("/docs/last");

        assert_eq!(lock(&h.navigator.hover_timers).len(), 1);
        assert!(lock(&h.navigator.hover_timers).contains_key("/docs/last"));
    }
}
