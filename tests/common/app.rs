use std::sync::Arc;

use posture_monitor::camera::SyntheticFrameSource;
use posture_monitor::config::{Config, RuntimeConfig};
use posture_monitor::overlay::RecordingRenderer;
use posture_monitor::scheduler::FrameScheduler;
use posture_monitor::sinks::WatchSinks;

use super::fakes::{QueuedOracle, SharedOracle};
use super::fixtures::seated_pose;

pub type TestScheduler =
    FrameScheduler<SyntheticFrameSource, SharedOracle, RecordingRenderer, Arc<WatchSinks>>;

pub struct Harness {
    pub scheduler: TestScheduler,
    pub oracle: Arc<QueuedOracle>,
    pub sinks: Arc<WatchSinks>,
    pub renderer: RecordingRenderer,
    pub runtime: Arc<RuntimeConfig>,
}

pub fn harness(intensity: u8, runtime: RuntimeConfig) -> Harness {
    let oracle = QueuedOracle::new(seated_pose());
    let sinks = Arc::new(WatchSinks::new());
    let renderer = RecordingRenderer::default();
    let runtime = Arc::new(runtime);
    let scheduler = FrameScheduler::new(
        SyntheticFrameSource::new(640, 480, intensity),
        SharedOracle(oracle.clone()),
        renderer.clone(),
        sinks.clone(),
        runtime.clone(),
        &Config::default(),
    );
    Harness {
        scheduler,
        oracle,
        sinks,
        renderer,
        runtime,
    }
}
