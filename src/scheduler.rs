//! 帧调度器
//!
//! 状态机 Idle / Running / Throttled，每次显示刷新触发一个 tick：
//! 1. 窗口未聚焦且距上次受理不足检测间隔 → Throttled，跳过本次分析
//! 2. 取帧 → 姿态估计（唯一挂起点）
//! 3. 分数低于阈值 → 视为无人，清空坐姿状态，不写入平滑窗口
//! 4. 否则提取关键点 → 平滑 → 坐姿指标 + 光照 → 发布 → 绘制标记
//!
//! 同一时刻只有一个 tick 在执行；挂起期间不触碰平滑窗口和输出。

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};

use crate::camera::{FrameDimensions, FrameError, FrameSource};
use crate::config::{Config, RuntimeConfig, SchedulerConfig};
use crate::keypoints::{extract_body_parts, BodyPartMap, TRACKED_LABELS};
use crate::lighting::{LightingEstimator, LightingReport};
use crate::oracle::PoseOracle;
use crate::overlay::{draw_markers, OverlayRenderer};
use crate::posture::{PostureCalculator, PostureStatus};
use crate::sinks::StatusPublisher;
use crate::smoothing::TemporalSmoother;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    Idle,
    Running,
    Throttled,
}

impl SchedulerState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Throttled => "throttled",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("failed to start frame source: {0}")]
    Startup(#[from] FrameError),
    #[error("scheduler is already running")]
    AlreadyRunning,
    #[error("scheduler is not running")]
    NotRunning,
}

/// 单次完整分析的结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSnapshot {
    pub score: f64,
    pub body_parts: BodyPartMap,
    pub posture: PostureStatus,
    pub lighting: Option<LightingReport>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbandonReason {
    Frame(String),
    Oracle(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Throttled,
    NoPerson { score: f64 },
    Analyzed(AnalysisSnapshot),
    Abandoned(AbandonReason),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickStats {
    pub analyzed: u64,
    pub throttled: u64,
    pub no_person: u64,
    pub abandoned: u64,
}

impl TickStats {
    fn record(&mut self, outcome: &TickOutcome) {
        match outcome {
            TickOutcome::Throttled => self.throttled += 1,
            TickOutcome::NoPerson { .. } => self.no_person += 1,
            TickOutcome::Analyzed(_) => self.analyzed += 1,
            TickOutcome::Abandoned(_) => self.abandoned += 1,
        }
    }
}

pub struct FrameScheduler<S, O, R, P> {
    source: S,
    oracle: O,
    renderer: R,
    publisher: P,
    runtime: Arc<RuntimeConfig>,
    config: SchedulerConfig,
    calculator: PostureCalculator,
    lighting: LightingEstimator,
    smoother: TemporalSmoother,
    state: SchedulerState,
    last_accepted: Option<Instant>,
    stats: TickStats,
}

impl<S, O, R, P> FrameScheduler<S, O, R, P>
where
    S: FrameSource,
    O: PoseOracle,
    R: OverlayRenderer,
    P: StatusPublisher,
{
    pub fn new(
        source: S,
        oracle: O,
        renderer: R,
        publisher: P,
        runtime: Arc<RuntimeConfig>,
        config: &Config,
    ) -> Self {
        Self {
            source,
            oracle,
            renderer,
            publisher,
            runtime,
            config: config.scheduler.clone(),
            calculator: PostureCalculator::new(config.posture.clone()),
            lighting: LightingEstimator::new(config.lighting.clone()),
            smoother: TemporalSmoother::new(config.scheduler.history_capacity),
            state: SchedulerState::Idle,
            last_accepted: None,
            stats: TickStats::default(),
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn stats(&self) -> TickStats {
        self.stats
    }

    pub fn history_len(&self) -> usize {
        self.smoother.len()
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// 打开画面源并进入 Running；画面源打开失败作为启动错误返回
    pub async fn start(&mut self) -> Result<FrameDimensions, SchedulerError> {
        if self.state != SchedulerState::Idle {
            return Err(SchedulerError::AlreadyRunning);
        }
        let dims = self.source.open().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to open frame source");
            SchedulerError::Startup(e)
        })?;

        self.smoother = TemporalSmoother::new(self.config.history_capacity);
        self.last_accepted = None;
        self.stats = TickStats::default();
        self.transition(SchedulerState::Running);
        tracing::info!(
            width = dims.width,
            height = dims.height,
            refresh_hz = self.config.refresh_hz,
            "Frame scheduler started"
        );
        Ok(dims)
    }

    /// 回到 Idle，丢弃平滑窗口；已是 Idle 时无操作
    pub fn stop(&mut self) {
        if self.state == SchedulerState::Idle {
            return;
        }
        self.source.close();
        self.smoother.reset();
        self.last_accepted = None;
        self.transition(SchedulerState::Idle);
        tracing::info!(
            analyzed = self.stats.analyzed,
            throttled = self.stats.throttled,
            no_person = self.stats.no_person,
            abandoned = self.stats.abandoned,
            "Frame scheduler stopped"
        );
    }

    pub async fn tick(&mut self) -> Result<TickOutcome, SchedulerError> {
        self.tick_at(Instant::now()).await
    }

    /// 以给定时刻执行一次 tick
    pub async fn tick_at(&mut self, now: Instant) -> Result<TickOutcome, SchedulerError> {
        if self.state == SchedulerState::Idle {
            return Err(SchedulerError::NotRunning);
        }
        let outcome = self.run_tick(now).await;
        self.stats.record(&outcome);
        Ok(outcome)
    }

    async fn run_tick(&mut self, now: Instant) -> TickOutcome {
        let runtime = self.runtime.snapshot();
        if !runtime.is_focused && self.is_throttled(now, runtime.check_interval) {
            self.transition(SchedulerState::Throttled);
            tracing::trace!("Tick throttled");
            return TickOutcome::Throttled;
        }
        self.transition(SchedulerState::Running);
        self.last_accepted = Some(now);

        let frame = match self.source.acquire() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "Frame unavailable, skipping tick");
                return TickOutcome::Abandoned(AbandonReason::Frame(e.to_string()));
            }
        };

        let estimate = match self.oracle.estimate(&frame).await {
            Ok(estimate) => estimate,
            Err(e) => {
                tracing::warn!(error = %e, "Pose estimation failed, skipping tick");
                return TickOutcome::Abandoned(AbandonReason::Oracle(e.to_string()));
            }
        };

        if estimate.score < self.config.min_pose_score {
            tracing::debug!(score = estimate.score, "No person in frame");
            self.publisher.publish_posture(PostureStatus::unknown());
            return TickOutcome::NoPerson {
                score: estimate.score,
            };
        }

        self.smoother
            .push(extract_body_parts(&estimate, &TRACKED_LABELS));
        let smoothed = self.smoother.smoothed();

        let posture = self.calculator.calculate(&smoothed, frame.dimensions());
        let lighting = self.lighting.estimate(&frame, Some(&smoothed));

        self.publisher.publish_body_parts(smoothed.clone());
        self.publisher.publish_posture(posture);
        self.publisher.publish_lighting(lighting);
        draw_markers(&smoothed, &mut self.renderer);

        TickOutcome::Analyzed(AnalysisSnapshot {
            score: estimate.score,
            body_parts: smoothed,
            posture,
            lighting,
        })
    }

    /// 距上次受理的 tick 不足 `interval` 时节流；从未受理过则不节流
    fn is_throttled(&self, now: Instant, interval: Duration) -> bool {
        match self.last_accepted {
            Some(last) => now.saturating_duration_since(last) < interval,
            None => false,
        }
    }

    fn transition(&mut self, next: SchedulerState) {
        if self.state != next {
            tracing::debug!(from = self.state.as_str(), to = next.as_str(), "Scheduler state");
            self.state = next;
        }
    }

    /// 按刷新频率循环执行 tick，直到收到关闭信号
    ///
    /// 每个 tick 完整执行后才会等待下一次刷新；关闭后自动 `stop()`。
    pub async fn run(
        &mut self,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<TickStats, SchedulerError> {
        if self.state == SchedulerState::Idle {
            self.start().await?;
        }

        let mut interval = tokio::time::interval(self.config.tick_period());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        tracing::warn!(error = %e, "Tick rejected, leaving run loop");
                        break;
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Shutdown signal received by frame scheduler");
                    break;
                }
            }
        }

        let stats = self.stats;
        self.stop();
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::camera::{Frame, SyntheticFrameSource};
    use crate::keypoints::Position;
    use crate::oracle::{OracleError, PoseEstimate, RawKeypoint};
    use crate::overlay::RecordingRenderer;
    use crate::sinks::WatchSinks;

    /// 按脚本依次返回结果，脚本耗尽后重复最后一个成功结果
    #[derive(Default)]
    struct ScriptedOracle {
        script: Mutex<VecDeque<Result<PoseEstimate, String>>>,
        calls: AtomicUsize,
    }

    impl ScriptedOracle {
        fn push(&self, result: Result<PoseEstimate, String>) {
            self.script.lock().unwrap().push_back(result);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl PoseOracle for Arc<ScriptedOracle> {
        async fn estimate(&self, _frame: &Frame) -> Result<PoseEstimate, OracleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Ok(estimate)) => Ok(estimate),
                Some(Err(message)) => Err(OracleError::Inference(message)),
                None => Ok(seated(0.9)),
            }
        }
    }

    fn seated(score: f64) -> PoseEstimate {
        let kp = |part: &str, x: f64, y: f64| RawKeypoint {
            part: part.to_string(),
            position: Position::new(x, y),
        };
        PoseEstimate {
            score,
            keypoints: vec![
                kp("leftEye", 100.0, 240.0),
                kp("rightEye", 160.0, 240.0),
                kp("leftShoulder", 100.0, 200.0),
                kp("rightShoulder", 140.0, 240.0),
            ],
        }
    }

    type TestScheduler =
        FrameScheduler<SyntheticFrameSource, Arc<ScriptedOracle>, RecordingRenderer, Arc<WatchSinks>>;

    fn scheduler(runtime: Arc<RuntimeConfig>) -> (TestScheduler, Arc<ScriptedOracle>, Arc<WatchSinks>) {
        let oracle = Arc::new(ScriptedOracle::default());
        let sinks = Arc::new(WatchSinks::new());
        let scheduler = FrameScheduler::new(
            SyntheticFrameSource::new(640, 480, 100),
            oracle.clone(),
            RecordingRenderer::default(),
            sinks.clone(),
            runtime,
            &Config::default(),
        );
        (scheduler, oracle, sinks)
    }

    #[tokio::test]
    async fn tick_before_start_is_rejected() {
        let (mut s, oracle, _) = scheduler(Arc::new(RuntimeConfig::default()));
        assert!(matches!(s.tick().await, Err(SchedulerError::NotRunning)));
        assert_eq!(oracle.calls(), 0);
    }

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let (mut s, _, _) = scheduler(Arc::new(RuntimeConfig::default()));
        s.start().await.unwrap();
        assert!(matches!(s.start().await, Err(SchedulerError::AlreadyRunning)));
    }

    #[tokio::test]
    async fn startup_failure_surfaces_to_caller() {
        let oracle = Arc::new(ScriptedOracle::default());
        let mut s = FrameScheduler::new(
            SyntheticFrameSource::new(0, 0, 100),
            oracle,
            RecordingRenderer::default(),
            Arc::new(WatchSinks::new()),
            Arc::new(RuntimeConfig::default()),
            &Config::default(),
        );
        assert!(matches!(s.start().await, Err(SchedulerError::Startup(_))));
        assert_eq!(s.state(), SchedulerState::Idle);
    }

    #[tokio::test]
    async fn focused_tick_publishes_everything() {
        let (mut s, oracle, sinks) = scheduler(Arc::new(RuntimeConfig::new(true, 60_000)));
        s.start().await.unwrap();

        let outcome = s.tick().await.unwrap();
        let TickOutcome::Analyzed(snapshot) = outcome else {
            panic!("expected analyzed tick, got {outcome:?}");
        };
        assert_eq!(oracle.calls(), 1);
        assert_eq!(s.history_len(), 1);
        assert_eq!(snapshot.posture.monitor_distance, Some(64.0));
        assert_eq!(sinks.posture(), snapshot.posture);
        assert_eq!(sinks.body_parts().len(), 4);
        assert!(sinks.lighting().is_some());
        // 4 个点 + 肩线
        assert_eq!(s.renderer().calls().len(), 5);
    }

    #[tokio::test]
    async fn unfocused_ticks_are_throttled_until_interval_elapses() {
        let runtime = Arc::new(RuntimeConfig::new(false, 1_000));
        let (mut s, oracle, _) = scheduler(runtime.clone());
        s.start().await.unwrap();
        let t0 = Instant::now();

        assert!(matches!(s.tick_at(t0).await.unwrap(), TickOutcome::Analyzed(_)));
        assert_eq!(oracle.calls(), 1);

        let held = s.tick_at(t0 + Duration::from_millis(999)).await.unwrap();
        assert_eq!(held, TickOutcome::Throttled);
        assert_eq!(s.state(), SchedulerState::Throttled);
        assert_eq!(oracle.calls(), 1);

        let due = s.tick_at(t0 + Duration::from_millis(1_000)).await.unwrap();
        assert!(matches!(due, TickOutcome::Analyzed(_)));
        assert_eq!(s.state(), SchedulerState::Running);
        assert_eq!(oracle.calls(), 2);

        // 计时器已在 t0+1000 重置
        let held = s.tick_at(t0 + Duration::from_millis(1_500)).await.unwrap();
        assert_eq!(held, TickOutcome::Throttled);
        assert_eq!(oracle.calls(), 2);
    }

    #[tokio::test]
    async fn runtime_changes_apply_on_next_tick() {
        let runtime = Arc::new(RuntimeConfig::new(false, 60_000));
        let (mut s, oracle, _) = scheduler(runtime.clone());
        s.start().await.unwrap();
        let t0 = Instant::now();

        s.tick_at(t0).await.unwrap();
        assert_eq!(
            s.tick_at(t0 + Duration::from_millis(10)).await.unwrap(),
            TickOutcome::Throttled
        );

        runtime.set_focused(true);
        assert!(matches!(
            s.tick_at(t0 + Duration::from_millis(20)).await.unwrap(),
            TickOutcome::Analyzed(_)
        ));

        runtime.set_focused(false);
        runtime.set_check_interval_ms(0);
        assert!(matches!(
            s.tick_at(t0 + Duration::from_millis(20)).await.unwrap(),
            TickOutcome::Analyzed(_)
        ));
        assert_eq!(oracle.calls(), 3);
    }

    #[tokio::test]
    async fn low_score_clears_posture_and_keeps_history() {
        let (mut s, oracle, sinks) = scheduler(Arc::new(RuntimeConfig::default()));
        s.start().await.unwrap();

        s.tick().await.unwrap();
        assert!(!sinks.posture().is_unknown());
        let history_before = s.history_len();

        oracle.push(Ok(seated(0.1)));
        let outcome = s.tick().await.unwrap();
        assert_eq!(outcome, TickOutcome::NoPerson { score: 0.1 });
        assert!(sinks.posture().is_unknown());
        assert_eq!(s.history_len(), history_before);
    }

    #[tokio::test]
    async fn oracle_failure_abandons_only_that_tick() {
        let (mut s, oracle, sinks) = scheduler(Arc::new(RuntimeConfig::default()));
        s.start().await.unwrap();

        oracle.push(Err("decode failed".to_string()));
        let outcome = s.tick().await.unwrap();
        assert!(matches!(
            outcome,
            TickOutcome::Abandoned(AbandonReason::Oracle(_))
        ));
        assert_eq!(s.history_len(), 0);
        assert!(sinks.posture().is_unknown());

        assert!(matches!(s.tick().await.unwrap(), TickOutcome::Analyzed(_)));
        assert_eq!(s.stats().abandoned, 1);
        assert_eq!(s.stats().analyzed, 1);
    }

    #[tokio::test]
    async fn stop_discards_history() {
        let (mut s, _, _) = scheduler(Arc::new(RuntimeConfig::default()));
        s.start().await.unwrap();
        for _ in 0..3 {
            s.tick().await.unwrap();
        }
        assert_eq!(s.history_len(), 3);

        s.stop();
        assert_eq!(s.state(), SchedulerState::Idle);
        assert_eq!(s.history_len(), 0);
        assert!(matches!(s.tick().await, Err(SchedulerError::NotRunning)));
    }

    #[tokio::test]
    async fn run_exits_on_shutdown_signal() {
        let (mut s, _, _) = scheduler(Arc::new(RuntimeConfig::default()));
        let (tx, rx) = broadcast::channel(1);

        let handle = tokio::spawn(async move {
            let stats = s.run(rx).await;
            (s, stats)
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(()).unwrap();

        let (s, stats) = handle.await.unwrap();
        let stats = stats.unwrap();
        assert!(stats.analyzed >= 1);
        assert_eq!(s.state(), SchedulerState::Idle);
    }
}
