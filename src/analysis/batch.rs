//! Batch Analyzer
//!
//! Replays the per-reading pipeline over the pre-defined scenario set, one
//! scenario at a time, in a background task. Progress and partial results are
//! readable at any point; the finished run is persisted and reloaded at
//! startup.
//!
//! States: `idle` → `processing` → `complete`. Starting while processing is
//! rejected.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::orchestrator::{Analyzer, image_quality_result, missing_sensor_result};
use super::validator::SensorValidator;
use crate::ai::{ImageAttachment, InferenceAdapter, InferenceOutcome};
use crate::config::BatchConfig;
use crate::constants::image::DEFAULT_MIME;
use crate::storage::BatchResultStore;
use crate::types::{
    AnalysisResult, MonitorError, Result, ScenarioId, SensorReading, SensorSnapshot, TokenCount,
    parse_timestamp,
};

// =============================================================================
// Scenario and Result Shapes
// =============================================================================

/// Pager notification attached to a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PagerAlert {
    pub triggered: bool,
    pub sms_recipient: Option<String>,
    pub call_recipient: Option<String>,
    pub reason: Option<String>,
    pub sent_at: Option<String>,
}

/// One pre-defined entry of the scenario file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub id: ScenarioId,
    pub timestamp: String,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub co2: Option<f64>,
    #[serde(default, alias = "soil_moisture")]
    pub soil_moisture: Option<f64>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default = "unknown_location")]
    pub location: String,
    #[serde(rename = "camera_id", alias = "cameraId", default = "unknown_camera")]
    pub camera_id: String,
    #[serde(default)]
    pub pager_alert: Option<PagerAlert>,
}

fn unknown_location() -> String {
    "Unknown Location".to_string()
}

fn unknown_camera() -> String {
    "Unknown Camera".to_string()
}

impl Scenario {
    /// Reading plus the names of values that could not be used. A bad
    /// scenario becomes an unusable reading, never a failed run.
    fn reading(&self) -> (SensorReading, Vec<&'static str>) {
        let (timestamp, bad_timestamp) = match parse_timestamp(&self.timestamp) {
            Some(ts) => (ts, false),
            None => (Utc::now().fixed_offset(), true),
        };
        let (reading, mut rejected) = SensorReading::with_rejected(
            timestamp,
            self.temperature,
            self.humidity,
            self.co2,
            self.soil_moisture,
        );
        if bad_timestamp {
            rejected.push("timestamp");
        }
        (reading, rejected)
    }

    fn snapshot(&self) -> SensorSnapshot {
        SensorSnapshot {
            temperature: self.temperature,
            humidity: self.humidity,
            co2: self.co2,
            soil_moisture: self.soil_moisture,
        }
    }
}

/// Analysis result enriched with the scenario's metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub id: ScenarioId,
    #[serde(flatten)]
    pub result: AnalysisResult,
    pub location: String,
    pub camera_id: String,
    #[serde(rename = "sensorData")]
    pub sensor_data: SensorSnapshot,
    pub image: Option<String>,
    #[serde(
        rename = "pagerAlert",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub pager_alert: Option<PagerAlert>,
}

impl BatchResult {
    fn new(scenario: &Scenario, result: AnalysisResult) -> Self {
        Self {
            id: scenario.id.clone(),
            result,
            location: scenario.location.clone(),
            camera_id: scenario.camera_id.clone(),
            sensor_data: scenario.snapshot(),
            image: scenario.image.clone(),
            pager_alert: scenario.pager_alert.clone(),
        }
    }
}

// =============================================================================
// Run State
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    Idle,
    Processing,
    Complete,
}

/// Progress snapshot returned to status queries
#[derive(Debug, Clone, Serialize)]
pub struct BatchStatus {
    pub status: RunPhase,
    pub completed: usize,
    pub total: usize,
    pub results: Vec<BatchResult>,
}

/// Acknowledgement of a started run
#[derive(Debug, Clone, Serialize)]
pub struct BatchStarted {
    pub status: &'static str,
    pub total: usize,
    #[serde(rename = "runId")]
    pub run_id: String,
}

#[derive(Debug)]
struct RunState {
    phase: RunPhase,
    total: usize,
    completed: usize,
    results: Vec<BatchResult>,
}

impl RunState {
    fn idle() -> Self {
        Self {
            phase: RunPhase::Idle,
            total: 0,
            completed: 0,
            results: Vec::new(),
        }
    }
}

// =============================================================================
// Batch Analyzer
// =============================================================================

/// Process-wide batch state, constructed once and shared with handlers
#[derive(Debug)]
pub struct BatchAnalyzer {
    analyzer: Arc<Analyzer>,
    config: BatchConfig,
    store: BatchResultStore,
    state: RwLock<RunState>,
}

impl BatchAnalyzer {
    pub fn new(analyzer: Arc<Analyzer>, config: BatchConfig, store: BatchResultStore) -> Self {
        Self {
            analyzer,
            config,
            store,
            state: RwLock::new(RunState::idle()),
        }
    }

    /// Construct and load the last persisted run, if any
    pub fn with_cached_results(
        analyzer: Arc<Analyzer>,
        config: BatchConfig,
        store: BatchResultStore,
    ) -> Self {
        let batch = Self::new(analyzer, config, store);
        batch.load_cached();
        batch
    }

    /// Replace the in-memory run with the persisted one
    pub fn load_cached(&self) -> usize {
        let results: Vec<BatchResult> = match self.store.load_all() {
            Ok(results) => results,
            Err(e) => {
                warn!("Could not load cached batch results: {}", e);
                return 0;
            }
        };

        let count = results.len();
        if count > 0 {
            let mut state = self.write_state();
            if state.phase != RunPhase::Processing {
                *state = RunState {
                    phase: RunPhase::Complete,
                    total: count,
                    completed: count,
                    results,
                };
                info!(count, "Loaded cached batch results");
            }
        }
        count
    }

    /// Start a run in the background.
    ///
    /// Fails with `BatchInProgress` while a run is active and with
    /// `MonitorError::Config` when inference is unconfigured; neither
    /// changes the current state.
    pub async fn start(self: &Arc<Self>) -> Result<BatchStarted> {
        if self.read_state().phase == RunPhase::Processing {
            return Err(MonitorError::BatchInProgress);
        }

        let adapter = self.analyzer.inference()?;
        let scenarios = load_scenarios(&self.config.scenarios_path).await?;
        let total = scenarios.len();

        {
            let mut state = self.write_state();
            if state.phase == RunPhase::Processing {
                return Err(MonitorError::BatchInProgress);
            }
            *state = RunState {
                phase: RunPhase::Processing,
                total,
                completed: 0,
                results: Vec::new(),
            };
        }

        let run_id = Uuid::new_v4().to_string();
        info!(run_id = %run_id, total, "Batch analysis started");

        let worker = Arc::clone(self);
        let worker_run_id = run_id.clone();
        tokio::spawn(async move {
            let task = tokio::spawn({
                let batch = Arc::clone(&worker);
                let run_id = worker_run_id.clone();
                async move { batch.process(&run_id, scenarios, adapter).await }
            });

            let finished = match task.await {
                Ok(Ok(())) => true,
                Ok(Err(e)) => {
                    error!(run_id = %worker_run_id, "Batch analysis aborted: {}", e);
                    false
                }
                Err(e) => {
                    error!(run_id = %worker_run_id, "Batch analysis task failed: {}", e);
                    false
                }
            };

            let mut state = worker.write_state();
            state.phase = if finished {
                RunPhase::Complete
            } else {
                RunPhase::Idle
            };
        });

        Ok(BatchStarted {
            status: "started",
            total,
            run_id,
        })
    }

    async fn process(
        &self,
        run_id: &str,
        scenarios: Vec<Scenario>,
        adapter: Arc<InferenceAdapter>,
    ) -> Result<()> {
        for scenario in &scenarios {
            let result = self.analyze_scenario(scenario, &adapter).await;

            let (completed, total) = {
                let mut state = self.write_state();
                state.results.push(BatchResult::new(scenario, result));
                state.completed += 1;
                (state.completed, state.total)
            };
            info!(
                run_id,
                scenario = %scenario.id,
                completed,
                total,
                "Scenario analyzed"
            );
        }

        let results = self.read_state().results.clone();
        self.store
            .replace_run(run_id, &results, |r| r.id.to_string())?;
        Ok(())
    }

    /// Image check, then sensor check, then inference. The limiter is not
    /// consulted, but every call that reached the model is recorded against it.
    async fn analyze_scenario(
        &self,
        scenario: &Scenario,
        adapter: &InferenceAdapter,
    ) -> AnalysisResult {
        let (reading, rejected) = scenario.reading();
        let image = self.load_image(scenario).await;

        let check = self
            .analyzer
            .image_validator()
            .validate(image.as_ref().map(|img| img.bytes.as_slice()));
        if !check.usable {
            return image_quality_result(&reading, check.issue_text());
        }

        let sensors = SensorValidator::validate_with_rejected(&reading, &rejected);
        if !sensors.usable {
            if !rejected.is_empty() {
                warn!(scenario = %scenario.id, ?rejected, "Scenario has invalid values");
            }
            return missing_sensor_result(&reading, sensors.issue_text());
        }

        let history = self.analyzer.context_for(&reading).await;
        match adapter.analyze(&reading, &history, image).await {
            InferenceOutcome::Success { result, .. } => {
                self.analyzer
                    .record_usage(TokenCount::new(result.tokens_used));
                result
            }
            InferenceOutcome::Failed {
                degraded, billed, ..
            } => {
                if billed {
                    self.analyzer.record_billed_failure();
                }
                degraded
            }
        }
    }

    /// A missing or unreadable image file means no image
    async fn load_image(&self, scenario: &Scenario) -> Option<ImageAttachment> {
        let name = scenario.image.as_deref()?;
        let path = self.config.images_dir.join(name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Some(ImageAttachment {
                bytes,
                mime: DEFAULT_MIME.to_string(),
            }),
            Err(e) => {
                warn!(scenario = %scenario.id, path = %path.display(), "Image not loaded: {}", e);
                None
            }
        }
    }

    pub fn status(&self) -> BatchStatus {
        let state = self.read_state();
        BatchStatus {
            status: state.phase,
            completed: state.completed,
            total: state.total,
            results: state.results.clone(),
        }
    }

    pub fn is_processing(&self) -> bool {
        self.read_state().phase == RunPhase::Processing
    }

    pub fn result_by_id(&self, id: &str) -> Result<BatchResult> {
        self.read_state()
            .results
            .iter()
            .find(|r| r.id.as_str() == id)
            .cloned()
            .ok_or_else(|| MonitorError::NotFound(format!("Analysis {} not found", id)))
    }

    fn read_state(&self) -> RwLockReadGuard<'_, RunState> {
        self.state.read().unwrap_or_else(|poisoned| {
            error!("Batch state RwLock poisoned on read, recovering");
            poisoned.into_inner()
        })
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, RunState> {
        self.state.write().unwrap_or_else(|poisoned| {
            error!("Batch state RwLock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

async fn load_scenarios(path: &Path) -> Result<Vec<Scenario>> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        MonitorError::Storage(format!(
            "Failed to read scenarios {}: {}",
            path.display(),
            e
        ))
    })?;
    Ok(serde_json::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::create_shared_metrics;
    use crate::ai::provider::mock::{MockProvider, MockReply};
    use crate::analysis::history::HistoryAggregator;
    use crate::analysis::validator::ImageQualityValidator;
    use crate::storage::{CostTracker, Database, RateLimiter, SharedDatabase};
    use crate::types::{AnalysisStatus, ErrorCategory, PrimaryConcern};
    use std::time::Duration;
    use tempfile::TempDir;

    const SCENARIOS: &str = r#"[
        {"id": "a1", "timestamp": "2025-06-01T08:00:00Z", "temperature": 24, "humidity": 60,
         "co2": 700, "soilMoisture": 45, "image": "missing.jpg", "location": "Bay 1",
         "camera_id": "cam-1"},
        {"id": "a2", "timestamp": "2025-06-01T09:00:00Z", "temperature": null, "humidity": 60,
         "co2": 700, "soilMoisture": 45, "image": "missing.jpg",
         "pagerAlert": {"triggered": true, "smsRecipient": "+100", "reason": "sensor offline"}},
        {"id": "a3", "timestamp": "2025-06-01T10:00:00Z", "temperature": 37, "humidity": 60,
         "co2": 700, "soilMoisture": 45, "image": "blank.jpg"},
        {"id": "a4", "timestamp": "2025-06-01T11:00:00Z", "temperature": 25, "humidity": 60,
         "co2": 700, "soilMoisture": 45}
    ]"#;

    struct Fixture {
        _dir: TempDir,
        db: SharedDatabase,
        batch: Arc<BatchAnalyzer>,
        provider: Arc<MockProvider>,
    }

    fn fixture(provider: MockProvider, configured: bool) -> Fixture {
        fixture_with(provider, configured, SCENARIOS)
    }

    fn fixture_with(provider: MockProvider, configured: bool, scenarios: &str) -> Fixture {
        let dir = TempDir::new().unwrap();
        let images = dir.path().join("images");
        std::fs::create_dir_all(&images).unwrap();
        std::fs::write(images.join("blank.jpg"), b"not really a jpeg").unwrap();
        let scenarios_path = dir.path().join("data.json");
        std::fs::write(&scenarios_path, scenarios).unwrap();

        let db = Database::open_initialized(dir.path().join("monitor.db")).unwrap();
        let provider = Arc::new(provider);
        let adapter = configured.then(|| {
            InferenceAdapter::with_provider(provider.clone(), create_shared_metrics())
        });
        let analyzer = Arc::new(Analyzer::new(
            HistoryAggregator::new(dir.path().join("readings.json"), 24),
            ImageQualityValidator::default(),
            RateLimiter::new(db.clone(), 144),
            CostTracker::new(db.clone(), Default::default()),
            adapter,
        ));
        let batch = Arc::new(BatchAnalyzer::new(
            analyzer,
            BatchConfig {
                scenarios_path,
                images_dir: images,
            },
            BatchResultStore::new(db.clone()),
        ));

        Fixture {
            _dir: dir,
            db,
            batch,
            provider,
        }
    }

    async fn wait_until_done(batch: &BatchAnalyzer) {
        for _ in 0..200 {
            if !batch.is_processing() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("batch run did not finish");
    }

    fn model_ok() -> MockProvider {
        MockProvider::text(r#"{"status":"normal","confidence":0.92,"reasoning":"Healthy"}"#, 400)
    }

    #[tokio::test]
    async fn test_run_processes_scenarios_in_order() {
        let f = fixture(model_ok(), true);
        assert_eq!(f.batch.status().status, RunPhase::Idle);

        let started = f.batch.start().await.unwrap();
        assert_eq!(started.total, 4);
        wait_until_done(&f.batch).await;

        let status = f.batch.status();
        assert_eq!(status.status, RunPhase::Complete);
        assert_eq!((status.completed, status.total), (4, 4));

        let ids: Vec<&str> = status.results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a2", "a3", "a4"]);

        // a1: image file missing, analyzed sensor-only
        assert_eq!(status.results[0].result.status, AnalysisStatus::Normal);
        assert_eq!(status.results[0].location, "Bay 1");

        // a2: missing temperature, no inference
        let missing = &status.results[1];
        assert_eq!(missing.result.confidence, 0.1);
        assert_eq!(missing.camera_id, "Unknown Camera");
        assert!(missing.pager_alert.as_ref().unwrap().triggered);

        // a3: unreadable image, no inference
        assert_eq!(status.results[2].result.confidence, 0.2);
        assert_eq!(
            status.results[2].result.primary_concern,
            Some(PrimaryConcern::Visual)
        );

        assert_eq!(f.provider.calls(), 2);
        assert_eq!(f.provider.images_seen(), vec![false, false]);

        let limiter = RateLimiter::new(f.db.clone(), 144);
        assert_eq!(limiter.check_limit().unwrap().calls_today, 2);
    }

    #[tokio::test]
    async fn test_results_persisted_and_reloaded() {
        let f = fixture(model_ok(), true);
        f.batch.start().await.unwrap();
        wait_until_done(&f.batch).await;

        let reloaded = BatchAnalyzer::new(
            f.batch.analyzer.clone(),
            f.batch.config.clone(),
            BatchResultStore::new(f.db.clone()),
        );
        assert_eq!(reloaded.load_cached(), 4);

        let status = reloaded.status();
        assert_eq!(status.status, RunPhase::Complete);
        assert_eq!(status.results, f.batch.status().results);
        assert_eq!(reloaded.result_by_id("a4").unwrap().id.as_str(), "a4");
    }

    #[tokio::test]
    async fn test_second_start_rejected_while_processing() {
        let f = fixture(model_ok(), true);
        {
            let mut state = f.batch.write_state();
            state.phase = RunPhase::Processing;
            state.total = 9;
            state.completed = 3;
        }

        let err = f.batch.start().await.unwrap_err();
        assert!(matches!(err, MonitorError::BatchInProgress));

        let status = f.batch.status();
        assert_eq!((status.completed, status.total), (3, 9));
    }

    #[tokio::test]
    async fn test_unconfigured_start_leaves_state() {
        let f = fixture(model_ok(), false);
        let err = f.batch.start().await.unwrap_err();
        assert!(matches!(err, MonitorError::Config(_)));
        assert_eq!(f.batch.status().status, RunPhase::Idle);
    }

    #[tokio::test]
    async fn test_failed_inference_recorded_as_degraded() {
        let f = fixture(
            MockProvider::new(vec![MockReply::Fail(ErrorCategory::Network)]),
            true,
        );
        f.batch.start().await.unwrap();
        wait_until_done(&f.batch).await;

        let first = f.batch.result_by_id("a1").unwrap();
        assert_eq!(first.result.confidence, 0.0);
        assert_eq!(
            first.result.reasoning,
            "AI unavailable (NETWORK); using threshold fallback."
        );

        let limiter = RateLimiter::new(f.db.clone(), 144);
        assert_eq!(limiter.check_limit().unwrap().calls_today, 0);
    }

    #[tokio::test]
    async fn test_out_of_range_scenario_does_not_abort_run() {
        let scenarios = r#"[
            {"id": "ok1", "timestamp": "2025-06-01T08:00:00Z", "temperature": 24, "humidity": 60,
             "co2": 700, "soilMoisture": 45},
            {"id": "bad", "timestamp": "2025-06-01T09:00:00Z", "temperature": 24, "humidity": 120,
             "co2": 700, "soilMoisture": 45},
            {"id": "undated", "timestamp": "not a time", "temperature": 24, "humidity": 60,
             "co2": 700, "soilMoisture": 45},
            {"id": "ok3", "timestamp": "2025-06-01T10:00:00Z", "temperature": 24, "humidity": 60,
             "co2": 700, "soilMoisture": 45}
        ]"#;
        let f = fixture_with(model_ok(), true, scenarios);
        f.batch.start().await.unwrap();
        wait_until_done(&f.batch).await;

        let status = f.batch.status();
        assert_eq!(status.status, RunPhase::Complete);
        assert_eq!((status.completed, status.total), (4, 4));

        let bad = f.batch.result_by_id("bad").unwrap();
        assert_eq!(bad.result.status, AnalysisStatus::Uncertain);
        assert_eq!(bad.result.confidence, 0.1);
        assert_eq!(
            bad.result.reasoning,
            "Missing/invalid sensor readings: humidity_invalid"
        );
        assert_eq!(bad.sensor_data.humidity, Some(120.0));

        let undated = f.batch.result_by_id("undated").unwrap();
        assert_eq!(
            undated.result.reasoning,
            "Missing/invalid sensor readings: timestamp_invalid"
        );

        assert_eq!(f.provider.calls(), 2);
        let store = BatchResultStore::new(f.db.clone());
        assert_eq!(store.load_all::<BatchResult>().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_unparseable_reply_counts_against_limit() {
        let f = fixture(MockProvider::text("Plants look fine.", 100), true);
        f.batch.start().await.unwrap();
        wait_until_done(&f.batch).await;

        let first = f.batch.result_by_id("a1").unwrap();
        assert_eq!(first.result.confidence, 0.1);

        let limiter = RateLimiter::new(f.db.clone(), 144);
        assert_eq!(limiter.check_limit().unwrap().calls_today, 2);
    }

    #[tokio::test]
    async fn test_unknown_id_not_found() {
        let f = fixture(model_ok(), true);
        assert!(matches!(
            f.batch.result_by_id("nope"),
            Err(MonitorError::NotFound(_))
        ));
    }

    #[test]
    fn test_batch_result_shape() {
        let scenario: Scenario = serde_json::from_str(
            r#"{"id": "x", "timestamp": "2025-06-01T08:00:00Z", "soilMoisture": 40}"#,
        )
        .unwrap();
        let result = AnalysisResult::local(
            AnalysisStatus::Normal,
            0.9,
            "ok",
            scenario.reading().0.timestamp(),
        );
        let json = serde_json::to_value(BatchResult::new(&scenario, result)).unwrap();

        assert_eq!(json["id"], "x");
        assert_eq!(json["status"], "normal");
        assert_eq!(json["tokensUsed"], 0);
        assert_eq!(json["location"], "Unknown Location");
        assert_eq!(json["sensorData"]["soilMoisture"], 40.0);
        assert!(json.get("pagerAlert").is_none());
    }
}
