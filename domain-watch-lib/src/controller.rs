//! Dashboard coordination.
//!
//! [`DashboardController`] owns the tracked domain list and the status
//! pipeline, keeps the latest [`CheckState`] of every domain, and pushes
//! state and statistics changes to a [`Presenter`]. It is built once and
//! shared through an `Arc`; the periodic refresh task holds one clone.

use crate::clock::Clock;
use crate::error::DomainWatchError;
use crate::pipeline::{BatchReport, DomainStatusPipeline, NullSink, StatusSink};
use crate::storage::{StateStore, WORKFLOW_UPDATE_KEY};
use crate::store::DomainStore;
use crate::types::{CheckOutcome, CheckState, DashboardStats, DomainName, WatchConfig};
use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Receives everything the dashboard wants to show.
pub trait Presenter: Send + Sync {
    /// A domain's state changed (including `NotChecked` for new domains).
    fn render_state(&self, domain: &DomainName, state: &CheckState);

    /// Statistics were recomputed.
    fn render_stats(&self, _stats: &DashboardStats) {}
}

/// Presenter that shows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn render_state(&self, _domain: &DomainName, _state: &CheckState) {}
}

/// A user request coming from the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Add(String),
    Remove(String),
    RefreshOne(String),
    RefreshAll,
}

/// What a dispatched [`Intent`] produced.
#[derive(Debug, Clone)]
pub enum IntentOutcome {
    Added(DomainName),
    Removed { removed: bool },
    Checked(CheckOutcome),
    Refreshed(RefreshReport),
}

/// Result of a full refresh.
#[derive(Debug, Clone)]
pub struct RefreshReport {
    pub batch: BatchReport,
    pub stats: DashboardStats,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Latest state per tracked domain; also the pipeline's sink.
///
/// Updates for domains that are no longer tracked are dropped, so a domain
/// removed mid-check does not reappear.
struct StateBoard {
    states: Mutex<HashMap<DomainName, CheckState>>,
    presenter: Arc<dyn Presenter>,
}

impl StateBoard {
    fn new(domains: &[DomainName], presenter: Arc<dyn Presenter>) -> Self {
        let states = domains
            .iter()
            .map(|d| (d.clone(), CheckState::NotChecked))
            .collect();
        Self {
            states: Mutex::new(states),
            presenter,
        }
    }

    fn track(&self, domain: &DomainName) {
        lock(&self.states).insert(domain.clone(), CheckState::NotChecked);
        self.presenter.render_state(domain, &CheckState::NotChecked);
    }

    fn untrack(&self, domain: &DomainName) {
        lock(&self.states).remove(domain);
    }

    fn clear(&self) {
        lock(&self.states).clear();
    }

    fn get(&self, domain: &DomainName) -> Option<CheckState> {
        lock(&self.states).get(domain).cloned()
    }
}

impl StatusSink for StateBoard {
    fn update(&self, domain: &DomainName, state: &CheckState) {
        {
            let mut states = lock(&self.states);
            match states.get_mut(domain) {
                Some(slot) => *slot = state.clone(),
                None => {
                    debug!(%domain, "dropping update for untracked domain");
                    return;
                }
            }
        }
        self.presenter.render_state(domain, state);
    }
}

/// Holds the refresh flag for the duration of one full refresh.
///
/// The flag is released in `Drop`, so early returns and panics release it too.
struct RefreshGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RefreshGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Top-level coordinator of the dashboard.
pub struct DashboardController {
    store: Mutex<DomainStore>,
    board: Arc<StateBoard>,
    pipeline: DomainStatusPipeline,
    state: Arc<dyn StateStore>,
    presenter: Arc<dyn Presenter>,
    refreshing: AtomicBool,
    last_refreshed: Mutex<Option<DateTime<Local>>>,
    refresh_interval: Duration,
}

impl DashboardController {
    /// Load the domain list from `state` and wire `pipeline` to report into
    /// this controller.
    ///
    /// Every loaded domain starts out `NotChecked`.
    pub fn new(
        state: Arc<dyn StateStore>,
        pipeline: DomainStatusPipeline,
        presenter: Arc<dyn Presenter>,
        refresh_interval: Duration,
    ) -> Self {
        let store = DomainStore::load(state.clone());
        let board = Arc::new(StateBoard::new(store.domains(), presenter.clone()));
        let pipeline = pipeline.with_sink(board.clone());

        Self {
            store: Mutex::new(store),
            board,
            pipeline,
            state,
            presenter,
            refreshing: AtomicBool::new(false),
            last_refreshed: Mutex::new(None),
            refresh_interval,
        }
    }

    /// Production wiring from a [`WatchConfig`].
    pub fn from_config(
        config: &WatchConfig,
        state: Arc<dyn StateStore>,
        presenter: Arc<dyn Presenter>,
    ) -> Result<Self, DomainWatchError> {
        let pipeline = DomainStatusPipeline::from_config(config, Arc::new(NullSink))?;
        Ok(Self::new(state, pipeline, presenter, config.refresh_interval))
    }

    /// Snapshot of the tracked domains in display order.
    pub fn domains(&self) -> Vec<DomainName> {
        lock(&self.store).domains().to_vec()
    }

    /// Every tracked domain with its current state, in display order.
    pub fn states(&self) -> Vec<(DomainName, CheckState)> {
        self.domains()
            .into_iter()
            .map(|d| {
                let state = self.board.get(&d).unwrap_or(CheckState::NotChecked);
                (d, state)
            })
            .collect()
    }

    pub fn state_of(&self, domain: &DomainName) -> Option<CheckState> {
        self.board.get(domain)
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::Acquire)
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// Current statistics.
    pub fn stats(&self) -> DashboardStats {
        let states = self.states();
        let resolved = || states.iter().filter_map(|(_, s)| s.result());

        DashboardStats {
            total: states.len(),
            available: resolved().filter(|r| r.availability.available).count(),
            alive: resolved().filter(|r| r.reachability.alive()).count(),
            last_refreshed: *lock(&self.last_refreshed),
            last_workflow_update: self.state.get(WORKFLOW_UPDATE_KEY).ok().flatten(),
        }
    }

    fn publish_stats(&self) -> DashboardStats {
        let stats = self.stats();
        self.presenter.render_stats(&stats);
        stats
    }

    /// Validate and track a new domain.
    pub fn add_domain(&self, raw: &str) -> Result<DomainName, DomainWatchError> {
        let name = lock(&self.store).add(raw)?;
        self.board.track(&name);
        info!(domain = %name, "domain added");
        self.publish_stats();
        Ok(name)
    }

    /// Stop tracking a domain. Absent names are a no-op returning `false`.
    pub fn remove_domain(&self, name: &str) -> Result<bool, DomainWatchError> {
        let removed = lock(&self.store).remove(name)?;
        if removed {
            if let Ok(name) = DomainName::parse(name) {
                self.board.untrack(&name);
            }
            info!(domain = %name, "domain removed");
            self.publish_stats();
        }
        Ok(removed)
    }

    /// Stop tracking every domain.
    pub fn clear(&self) -> Result<(), DomainWatchError> {
        lock(&self.store).clear()?;
        self.board.clear();
        info!("domain list cleared");
        self.publish_stats();
        Ok(())
    }

    /// Re-check a single tracked domain.
    pub async fn refresh_one(&self, name: &str) -> Result<CheckOutcome, DomainWatchError> {
        let domain = DomainName::parse(name)
            .ok()
            .filter(|d| lock(&self.store).contains(d))
            .ok_or_else(|| DomainWatchError::unknown_domain(name))?;

        let outcome = self.pipeline.check_one(&domain).await;
        self.publish_stats();
        Ok(outcome)
    }

    /// Re-check every tracked domain.
    ///
    /// # Errors
    ///
    /// `RefreshInProgress` if another full refresh is still running.
    pub async fn refresh_all(&self) -> Result<RefreshReport, DomainWatchError> {
        let _guard =
            RefreshGuard::acquire(&self.refreshing).ok_or(DomainWatchError::RefreshInProgress)?;

        let domains = self.domains();
        let batch = self.pipeline.check_all(&domains).await;

        let finished = self.pipeline.clock().now().with_timezone(&Local);
        *lock(&self.last_refreshed) = Some(finished);

        let stats = self.publish_stats();
        Ok(RefreshReport { batch, stats })
    }

    /// Single entry point for presentation intents.
    pub async fn dispatch(&self, intent: Intent) -> Result<IntentOutcome, DomainWatchError> {
        debug!(?intent, "dispatching intent");
        match intent {
            Intent::Add(raw) => self.add_domain(&raw).map(IntentOutcome::Added),
            Intent::Remove(name) => self
                .remove_domain(&name)
                .map(|removed| IntentOutcome::Removed { removed }),
            Intent::RefreshOne(name) => self.refresh_one(&name).await.map(IntentOutcome::Checked),
            Intent::RefreshAll => self.refresh_all().await.map(IntentOutcome::Refreshed),
        }
    }

    /// Start the periodic full refresh.
    ///
    /// The first refresh fires one interval after the call. Ticks that find a
    /// refresh already running are skipped.
    pub fn spawn_auto_refresh(self: Arc<Self>) -> JoinHandle<()> {
        let clock: Arc<dyn Clock> = self.pipeline.clock().clone();
        tokio::spawn(async move {
            loop {
                clock.after(self.refresh_interval).await;
                match self.refresh_all().await {
                    Ok(report) => debug!(checked = report.batch.len(), "auto refresh complete"),
                    Err(DomainWatchError::RefreshInProgress) => {
                        info!("refresh still running, skipping scheduled tick")
                    }
                    Err(e) => warn!(error = %e, "auto refresh failed"),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TokioClock;
    use crate::pipeline::tests::{ScriptedEstimator, ScriptedProbe};
    use crate::storage::MemoryStore;

    /// Presenter that records what it was asked to show.
    #[derive(Default)]
    struct RecordingPresenter {
        states: Mutex<Vec<(String, CheckState)>>,
        stats: Mutex<Vec<DashboardStats>>,
    }

    impl Presenter for RecordingPresenter {
        fn render_state(&self, domain: &DomainName, state: &CheckState) {
            lock(&self.states).push((domain.to_string(), state.clone()));
        }

        fn render_stats(&self, stats: &DashboardStats) {
            lock(&self.stats).push(stats.clone());
        }
    }

    fn controller_with(
        probe: ScriptedProbe,
        estimator: ScriptedEstimator,
        presenter: Arc<RecordingPresenter>,
    ) -> DashboardController {
        let pipeline = DomainStatusPipeline::new(
            Arc::new(probe),
            Arc::new(estimator),
            Arc::new(TokioClock),
            Arc::new(NullSink),
        );
        DashboardController::new(
            Arc::new(MemoryStore::new()),
            pipeline,
            presenter,
            Duration::from_secs(60),
        )
    }

    fn controller() -> (DashboardController, Arc<RecordingPresenter>) {
        let presenter = Arc::new(RecordingPresenter::default());
        let controller = controller_with(
            ScriptedProbe::default(),
            ScriptedEstimator::default(),
            presenter.clone(),
        );
        (controller, presenter)
    }

    #[test]
    fn test_starts_with_seeds_not_checked() {
        let (controller, _) = controller();
        let states = controller.states();

        assert_eq!(states.len(), 8);
        assert!(states.iter().all(|(_, s)| *s == CheckState::NotChecked));

        let stats = controller.stats();
        assert_eq!(stats.total, 8);
        assert_eq!(stats.available, 0);
        assert_eq!(stats.alive, 0);
        assert_eq!(stats.last_refreshed, None);
    }

    #[test]
    fn test_add_and_remove_update_states() {
        let (controller, presenter) = controller();

        let added = controller.add_domain("Example.org").unwrap();
        assert_eq!(controller.state_of(&added), Some(CheckState::NotChecked));
        assert_eq!(controller.domains().last(), Some(&added));
        assert_eq!(lock(&presenter.stats).last().unwrap().total, 9);

        let err = controller.add_domain("example.org").unwrap_err();
        assert!(err.is_user_error());

        assert!(controller.remove_domain("example.org").unwrap());
        assert_eq!(controller.state_of(&added), None);
        assert!(!controller.remove_domain("example.org").unwrap());
        assert_eq!(controller.stats().total, 8);
    }

    #[tokio::test]
    async fn test_refresh_one_requires_tracked_domain() {
        let (controller, _) = controller();

        for name in ["absent.com", "not a domain"] {
            let err = controller.refresh_one(name).await.unwrap_err();
            assert!(matches!(err, DomainWatchError::UnknownDomain { .. }));
        }

        let outcome = controller.refresh_one("github.com").await.unwrap();
        assert!(outcome.is_resolved());
        let github = DomainName::parse("github.com").unwrap();
        assert!(matches!(
            controller.state_of(&github),
            Some(CheckState::Resolved(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_all_updates_stats() {
        let presenter = Arc::new(RecordingPresenter::default());
        let probe = ScriptedProbe {
            dead: vec![
                "nonexistent-domain-12345.com".to_string(),
                "test-domain-availability.org".to_string(),
            ],
            ..Default::default()
        };
        let estimator = ScriptedEstimator {
            failures: vec!["kanoe.moe".to_string()],
        };
        let controller = controller_with(probe, estimator, presenter.clone());

        let report = controller.refresh_all().await.unwrap();

        assert_eq!(report.batch.len(), 8);
        assert_eq!(report.batch.errored_count(), 1);
        assert_eq!(report.stats.total, 8);
        assert_eq!(report.stats.available, 7);
        assert_eq!(report.stats.alive, 5);
        assert!(report.stats.last_refreshed.is_some());
        assert!(!controller.is_refreshing());

        let kanoe = DomainName::parse("kanoe.moe").unwrap();
        assert!(matches!(
            controller.state_of(&kanoe),
            Some(CheckState::Errored { .. })
        ));

        // Seeded NotChecked states are not rendered; each domain showed Checking then its result.
        let rendered = lock(&presenter.states);
        assert_eq!(rendered.len(), 16);
        assert_eq!(lock(&presenter.stats).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_refresh_rejected() {
        let probe = ScriptedProbe {
            delays: [("google.com".to_string(), Duration::from_secs(5))].into(),
            ..Default::default()
        };
        let controller = controller_with(
            probe,
            ScriptedEstimator::default(),
            Arc::new(RecordingPresenter::default()),
        );

        let (first, second) = tokio::join!(controller.refresh_all(), controller.refresh_all());
        assert!(first.is_ok());
        assert!(matches!(second, Err(DomainWatchError::RefreshInProgress)));

        // The guard was released once the first refresh finished.
        assert!(!controller.is_refreshing());
        assert!(controller.refresh_all().await.is_ok());
    }

    #[test]
    fn test_guard_released_on_panic() {
        let flag = AtomicBool::new(false);

        let result = std::panic::catch_unwind(|| {
            let _guard = RefreshGuard::acquire(&flag).unwrap();
            assert!(RefreshGuard::acquire(&flag).is_none());
            panic!("refresh blew up");
        });

        assert!(result.is_err());
        assert!(!flag.load(Ordering::SeqCst));
        assert!(RefreshGuard::acquire(&flag).is_some());
    }

    #[tokio::test]
    async fn test_removed_domain_ignores_late_updates() {
        let (controller, _) = controller();
        let google = DomainName::parse("google.com").unwrap();

        controller.remove_domain("google.com").unwrap();
        controller.board.update(&google, &CheckState::Checking);

        assert_eq!(controller.state_of(&google), None);
        assert_eq!(controller.states().len(), 7);
    }

    #[tokio::test]
    async fn test_dispatch_intents() {
        let (controller, _) = controller();

        match controller
            .dispatch(Intent::Add("example.org".to_string()))
            .await
            .unwrap()
        {
            IntentOutcome::Added(name) => assert_eq!(name.as_str(), "example.org"),
            other => panic!("unexpected outcome {:?}", other),
        }

        assert!(matches!(
            controller
                .dispatch(Intent::RefreshOne("example.org".to_string()))
                .await
                .unwrap(),
            IntentOutcome::Checked(CheckOutcome::Resolved(_))
        ));

        assert!(matches!(
            controller
                .dispatch(Intent::Remove("absent.com".to_string()))
                .await
                .unwrap(),
            IntentOutcome::Removed { removed: false }
        ));

        assert!(controller
            .dispatch(Intent::Add("not a domain".to_string()))
            .await
            .is_err());

        match controller.dispatch(Intent::RefreshAll).await.unwrap() {
            IntentOutcome::Refreshed(report) => assert_eq!(report.batch.len(), 9),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_clear_and_workflow_stats() {
        let state = Arc::new(MemoryStore::new());
        state
            .set(WORKFLOW_UPDATE_KEY, "2024-03-01 12:30:00")
            .unwrap();
        let pipeline = DomainStatusPipeline::new(
            Arc::new(ScriptedProbe::default()),
            Arc::new(ScriptedEstimator::default()),
            Arc::new(TokioClock),
            Arc::new(NullSink),
        );
        let controller = DashboardController::new(
            state,
            pipeline,
            Arc::new(NullPresenter),
            Duration::from_secs(60),
        );

        controller.clear().unwrap();
        let stats = controller.stats();
        assert_eq!(stats.total, 0);
        assert_eq!(
            stats.last_workflow_update.as_deref(),
            Some("2024-03-01 12:30:00")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_refresh_fires_each_interval() {
        let presenter = Arc::new(RecordingPresenter::default());
        let controller = Arc::new(controller_with(
            ScriptedProbe::default(),
            ScriptedEstimator::default(),
            presenter.clone(),
        ));

        let handle = controller.clone().spawn_auto_refresh();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(controller.stats().last_refreshed.is_none());

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(controller.stats().last_refreshed.is_some());
        assert_eq!(lock(&presenter.stats).len(), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(lock(&presenter.stats).len(), 2);

        handle.abort();
    }
}
