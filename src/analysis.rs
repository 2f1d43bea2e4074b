//! Staged analysis run: timed progress lines racing two data fetches.
//!
//! The four progress lines are independent timers spawned at the start of a
//! run. The forecast and region fetches run concurrently with them and with
//! each other. The terminal line is appended once both fetches are back and
//! the last progress line has landed, so it is always the final entry.
//! Timers use `tokio::time`, so tests drive them with a paused clock.
//!
//! A run whose future is dropped (client disconnect, caller timeout) aborts
//! its timers and, if still current, ends as `Failed`.

use std::{collections::HashSet, sync::Arc, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::{
    error::AnalysisError,
    models::{AnalysisResult, LogEntry, RegionStat, RiskLevel},
    risk::classify,
};

// ---

pub const LOG_INITIALIZING: &str = "Initializing AI Agent...";
pub const LOG_INVENTORY: &str = "Fetching real-time inventory data...";
pub const LOG_SYMPTOMS: &str = "Aggregating community symptom reports...";
pub const LOG_COMPLETE: &str = "Analysis complete. Insights generated.";
pub const RUN_CANCELLED: &str = "Analysis run cancelled before completion.";

pub fn reasoning_line(model: &str) -> String {
    format!("Running {model} reasoning model...")
}

/// Source of the two data sets an analysis run needs.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    async fn forecast(&self) -> Result<AnalysisResult, AnalysisError>;
    async fn regional_risk(&self) -> Result<Vec<RegionStat>, AnalysisError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum AnalysisStatus {
    Idle,
    Running,
    Complete,
    Failed(String),
}

/// Output of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub result: AnalysisResult,
    pub regions: Vec<RegionStat>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSnapshot {
    pub status: AnalysisStatus,
    pub log: Vec<LogEntry>,
    pub result: Option<AnalysisResult>,
    pub regions: Vec<RegionStat>,
}

#[derive(Debug)]
struct RunState {
    generation: u64,
    status: AnalysisStatus,
    log: Vec<LogEntry>,
    result: Option<AnalysisResult>,
    regions: Vec<RegionStat>,
}

pub struct AnalysisRunner {
    // ---
    backend: Arc<dyn AnalysisBackend>,
    reasoning_model: String,
    state: Arc<Mutex<RunState>>,
}

impl AnalysisRunner {
    pub fn new(backend: Arc<dyn AnalysisBackend>, reasoning_model: impl Into<String>) -> Self {
        // ---
        Self {
            backend,
            reasoning_model: reasoning_model.into(),
            state: Arc::new(Mutex::new(RunState {
                generation: 0,
                status: AnalysisStatus::Idle,
                log: Vec::new(),
                result: None,
                regions: Vec::new(),
            })),
        }
    }

    /// Progress lines after the first, with their offsets from run start.
    fn schedule(&self) -> [(Duration, String); 3] {
        [
            (Duration::from_millis(500), LOG_INVENTORY.to_string()),
            (Duration::from_millis(900), LOG_SYMPTOMS.to_string()),
            (Duration::from_millis(1300), reasoning_line(&self.reasoning_model)),
        ]
    }

    /// Execute one run. A run started later supersedes this one: this call
    /// then publishes nothing and returns [`AnalysisError::Superseded`].
    pub async fn run(&self) -> Result<AnalysisReport, AnalysisError> {
        // ---
        let generation = {
            let mut state = self.state.lock();
            state.generation += 1;
            state.status = AnalysisStatus::Running;
            state.log.clear();
            state.log.push(LogEntry::now(LOG_INITIALIZING));
            state.result = None;
            state.regions.clear();
            state.generation
        };
        info!("Analysis run #{} started", generation);

        let timers = self
            .schedule()
            .into_iter()
            .map(|(delay, message)| {
                tokio::spawn(append_after(self.state.clone(), generation, delay, message))
            })
            .collect();
        let mut guard = RunGuard {
            state: self.state.clone(),
            generation,
            timers,
        };

        let outcome = tokio::try_join!(self.backend.forecast(), self.backend.regional_risk())
            .and_then(|(result, regions)| {
                ensure_unique_ids(&regions)?;
                Ok(AnalysisReport { result, regions })
            });

        if outcome.is_ok() {
            guard.wait_for_timers().await;
        }

        let mut state = self.state.lock();
        if state.generation != generation {
            debug!(
                "Discarding analysis run #{} (current #{})",
                generation, state.generation
            );
            return Err(AnalysisError::Superseded);
        }

        match outcome {
            Ok(report) => {
                state.result = Some(report.result.clone());
                state.regions = report.regions.clone();
                state.status = AnalysisStatus::Complete;
                state.log.push(LogEntry::now(LOG_COMPLETE));
                info!(
                    "Analysis run #{} complete: demand {}, {} risk, {} regions",
                    generation,
                    report.result.predicted_demand,
                    classify(report.result.risk_level).label,
                    report.regions.len()
                );
                Ok(report)
            }
            Err(e) => {
                error!("Analysis run #{} failed: {}", generation, e);
                state.status = AnalysisStatus::Failed(e.to_string());
                Err(e)
            }
        }
    }

    pub fn current_status(&self) -> AnalysisStatus {
        self.state.lock().status.clone()
    }

    pub fn current_log(&self) -> Vec<LogEntry> {
        self.state.lock().log.clone()
    }

    pub fn current_result(&self) -> Option<AnalysisResult> {
        self.state.lock().result.clone()
    }

    pub fn current_regions(&self) -> Vec<RegionStat> {
        self.state.lock().regions.clone()
    }

    pub fn snapshot(&self) -> AnalysisSnapshot {
        // ---
        let state = self.state.lock();
        AnalysisSnapshot {
            status: state.status.clone(),
            log: state.log.clone(),
            result: state.result.clone(),
            regions: state.regions.clone(),
        }
    }
}

/// Ties one run's timers and status to the `run()` future that owns them.
struct RunGuard {
    state: Arc<Mutex<RunState>>,
    generation: u64,
    timers: Vec<JoinHandle<()>>,
}

impl RunGuard {
    async fn wait_for_timers(&mut self) {
        // ---
        for timer in self.timers.iter_mut() {
            if let Err(e) = timer.await {
                warn!("Progress timer of run #{} failed: {}", self.generation, e);
            }
        }
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        // ---
        for timer in &self.timers {
            timer.abort();
        }

        let mut state = self.state.lock();
        if state.generation == self.generation && state.status == AnalysisStatus::Running {
            warn!("Analysis run #{} dropped before completion", self.generation);
            state.status = AnalysisStatus::Failed(RUN_CANCELLED.to_string());
        }
    }
}

async fn append_after(
    state: Arc<Mutex<RunState>>,
    generation: u64,
    delay: Duration,
    message: String,
) {
    // ---
    tokio::time::sleep(delay).await;

    let mut state = state.lock();
    if state.generation == generation && state.status == AnalysisStatus::Running {
        state.log.push(LogEntry::now(message));
    }
}

fn ensure_unique_ids(regions: &[RegionStat]) -> Result<(), AnalysisError> {
    // ---
    let mut seen = HashSet::new();
    for region in regions {
        if !seen.insert(region.id.as_str()) {
            return Err(AnalysisError::DuplicateRegion(region.id.clone()));
        }
    }
    Ok(())
}

// ---

/// Stand-in backend with fixed data and fixed latencies.
#[derive(Debug, Clone)]
pub struct SimulatedAnalysisBackend {
    forecast_delay: Duration,
    regions_delay: Duration,
}

impl Default for SimulatedAnalysisBackend {
    fn default() -> Self {
        Self {
            forecast_delay: Duration::from_millis(1500),
            regions_delay: Duration::from_millis(1200),
        }
    }
}

#[async_trait]
impl AnalysisBackend for SimulatedAnalysisBackend {
    async fn forecast(&self) -> Result<AnalysisResult, AnalysisError> {
        // ---
        tokio::time::sleep(self.forecast_delay).await;
        Ok(AnalysisResult {
            predicted_demand: 1250.0,
            risk_level: RiskLevel::High,
            recommendation: "Increase Paracetamol 650mg stock by 25% across Bengaluru Urban \
                             pharmacies before Friday."
                .to_string(),
            reasoning: "Fever-related symptom reports rose 40% week over week while humidity \
                        stayed above 70%, matching the early pattern of past dengue outbreaks."
                .to_string(),
            affected_region: "Karnataka".to_string(),
            targeted_medicine: "Paracetamol 650mg".to_string(),
        })
    }

    async fn regional_risk(&self) -> Result<Vec<RegionStat>, AnalysisError> {
        // ---
        tokio::time::sleep(self.regions_delay).await;
        let region = |id: &str, name: &str, risk, active_cases| RegionStat {
            id: id.to_string(),
            name: name.to_string(),
            risk,
            active_cases,
        };
        Ok(vec![
            region("KA", "Karnataka", RiskLevel::High, 1240),
            region("MH", "Maharashtra", RiskLevel::Medium, 860),
            region("TN", "Tamil Nadu", RiskLevel::Medium, 610),
            region("KL", "Kerala", RiskLevel::Low, 210),
        ])
    }
}

/// Analysis backend over HTTP:
/// `GET {base}/api/analysis/forecast` and `GET {base}/api/analysis/regions`.
#[derive(Debug, Clone)]
pub struct HttpAnalysisBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAnalysisBackend {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, AnalysisError> {
        // ---
        let url = format!("{}{}", self.base_url, path);
        debug!("Fetching analysis data from: {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AnalysisError::Http(status));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl AnalysisBackend for HttpAnalysisBackend {
    async fn forecast(&self) -> Result<AnalysisResult, AnalysisError> {
        self.get_json("/api/analysis/forecast").await
    }

    async fn regional_risk(&self) -> Result<Vec<RegionStat>, AnalysisError> {
        self.get_json("/api/analysis/regions").await
    }
}

#[cfg(test)]
mod tests {
    // ---
    use std::collections::VecDeque;

    use super::*;

    const MODEL: &str = "Gemini 1.5 Flash";

    fn messages(runner: &AnalysisRunner) -> Vec<String> {
        runner.current_log().into_iter().map(|e| e.message).collect()
    }

    fn expected_log() -> Vec<String> {
        vec![
            LOG_INITIALIZING.to_string(),
            LOG_INVENTORY.to_string(),
            LOG_SYMPTOMS.to_string(),
            reasoning_line(MODEL),
            LOG_COMPLETE.to_string(),
        ]
    }

    /// Per-call forecast delays and demand values; regions can be made to fail.
    struct Scripted {
        forecasts: Mutex<VecDeque<(Duration, f64)>>,
        regions_delay: Duration,
        regions: Option<Vec<RegionStat>>,
    }

    impl Scripted {
        fn new(forecasts: Vec<(Duration, f64)>, regions_delay: Duration) -> Self {
            Self {
                forecasts: Mutex::new(forecasts.into()),
                regions_delay,
                regions: Some(vec![RegionStat {
                    id: "KA".into(),
                    name: "Karnataka".into(),
                    risk: RiskLevel::High,
                    active_cases: 10,
                }]),
            }
        }
    }

    #[async_trait]
    impl AnalysisBackend for Scripted {
        async fn forecast(&self) -> Result<AnalysisResult, AnalysisError> {
            let (delay, demand) = self
                .forecasts
                .lock()
                .pop_front()
                .unwrap_or((Duration::ZERO, 0.0));
            tokio::time::sleep(delay).await;
            Ok(AnalysisResult {
                predicted_demand: demand,
                risk_level: RiskLevel::Medium,
                recommendation: "r".into(),
                reasoning: "r".into(),
                affected_region: "Karnataka".into(),
                targeted_medicine: "ORS Packets".into(),
            })
        }

        async fn regional_risk(&self) -> Result<Vec<RegionStat>, AnalysisError> {
            tokio::time::sleep(self.regions_delay).await;
            self.regions
                .clone()
                .ok_or(AnalysisError::Http(reqwest::StatusCode::BAD_GATEWAY))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_run_log_order() {
        // ---
        let runner = AnalysisRunner::new(Arc::new(SimulatedAnalysisBackend::default()), MODEL);
        assert_eq!(runner.current_status(), AnalysisStatus::Idle);

        let report = tokio_test::assert_ok!(runner.run().await);

        assert_eq!(messages(&runner), expected_log());
        assert_eq!(runner.current_status(), AnalysisStatus::Complete);
        assert_eq!(runner.current_result(), Some(report.result));
        assert_eq!(runner.current_regions().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_complete_line_waits_for_both_fetches() {
        // ---
        let backend = Scripted::new(vec![(Duration::from_millis(3000), 42.0)], Duration::from_millis(100));
        let runner = Arc::new(AnalysisRunner::new(Arc::new(backend), MODEL));

        let handle = tokio::spawn({
            let runner = runner.clone();
            async move { runner.run().await }
        });

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(messages(&runner), expected_log()[..4].to_vec());
        assert_eq!(runner.current_status(), AnalysisStatus::Running);
        assert!(runner.current_result().is_none());

        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.result.predicted_demand, 42.0);
        assert_eq!(messages(&runner), expected_log());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_fetches_still_end_with_complete_line() {
        // ---
        let backend = Scripted::new(vec![(Duration::from_millis(200), 7.0)], Duration::ZERO);
        let runner = AnalysisRunner::new(Arc::new(backend), MODEL);
        let started = tokio::time::Instant::now();

        runner.run().await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(1300));
        assert_eq!(messages(&runner), expected_log());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(messages(&runner), expected_log());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_run_fails_and_stops_its_timers() {
        // ---
        let backend = Scripted::new(vec![(Duration::from_secs(3600), 1.0)], Duration::ZERO);
        let runner = AnalysisRunner::new(Arc::new(backend), MODEL);

        let timed_out = tokio::time::timeout(Duration::from_millis(1000), runner.run()).await;
        assert!(timed_out.is_err());

        assert_eq!(
            runner.current_status(),
            AnalysisStatus::Failed(RUN_CANCELLED.to_string())
        );
        assert_eq!(messages(&runner), expected_log()[..3].to_vec());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(messages(&runner).len(), 3);
        assert!(runner.current_result().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_superseded_run_leaves_newer_run_alone() {
        // ---
        let backend = Scripted::new(
            vec![(Duration::from_secs(3600), 1.0), (Duration::ZERO, 2.0)],
            Duration::ZERO,
        );
        let runner = AnalysisRunner::new(Arc::new(backend), MODEL);

        let first = runner.run();
        tokio::pin!(first);
        assert!(tokio::time::timeout(Duration::from_millis(100), &mut first)
            .await
            .is_err());

        runner.run().await.unwrap();
        drop(first);

        assert_eq!(runner.current_status(), AnalysisStatus::Complete);
        assert_eq!(runner.current_result().unwrap().predicted_demand, 2.0);
        assert_eq!(messages(&runner), expected_log());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_run_starts_fresh_and_wins() {
        // ---
        let backend = Scripted::new(
            vec![
                (Duration::from_millis(3000), 100.0),
                (Duration::from_millis(1500), 200.0),
            ],
            Duration::from_millis(100),
        );
        let runner = Arc::new(AnalysisRunner::new(Arc::new(backend), MODEL));
        let spawn_run = |runner: Arc<AnalysisRunner>| tokio::spawn(async move { runner.run().await });

        let first = spawn_run(runner.clone());
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(messages(&runner).len(), 2);

        let second = spawn_run(runner.clone());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(messages(&runner), vec![LOG_INITIALIZING.to_string()]);

        // The first run's 900ms line would have landed by now.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(messages(&runner).len(), 1);

        let report = second.await.unwrap().unwrap();
        assert_eq!(report.result.predicted_demand, 200.0);

        let stale = first.await.unwrap();
        assert!(matches!(stale, Err(AnalysisError::Superseded)));

        assert_eq!(runner.current_result().unwrap().predicted_demand, 200.0);
        assert_eq!(messages(&runner), expected_log());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_publishes_nothing() {
        // ---
        let mut backend = Scripted::new(vec![(Duration::from_millis(10), 5.0)], Duration::from_millis(10));
        backend.regions = None;
        let runner = AnalysisRunner::new(Arc::new(backend), MODEL);

        let err = runner.run().await.unwrap_err();
        assert!(matches!(err, AnalysisError::Http(_)));
        assert!(matches!(runner.current_status(), AnalysisStatus::Failed(_)));
        assert!(runner.current_result().is_none());
        assert!(runner.current_regions().is_empty());
        assert_eq!(messages(&runner), vec![LOG_INITIALIZING.to_string()]);

        // Pending progress lines never land on a failed run.
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(messages(&runner), vec![LOG_INITIALIZING.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_region_ids_fail_the_run() {
        // ---
        let mut backend = Scripted::new(vec![], Duration::ZERO);
        let stat = backend.regions.as_ref().unwrap()[0].clone();
        backend.regions = Some(vec![stat.clone(), stat]);
        let runner = AnalysisRunner::new(Arc::new(backend), MODEL);

        let err = runner.run().await.unwrap_err();
        assert!(matches!(err, AnalysisError::DuplicateRegion(id) if id == "KA"));
        assert!(runner.current_result().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_regions_have_unique_ids() {
        // ---
        let regions = SimulatedAnalysisBackend::default().regional_risk().await.unwrap();
        assert!(ensure_unique_ids(&regions).is_ok());
    }
}
