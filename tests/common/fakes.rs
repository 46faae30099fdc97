use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use posture_monitor::camera::{
    Frame, FrameDimensions, FrameError, FrameSource, SyntheticFrameSource,
};
use posture_monitor::oracle::{OracleError, PoseEstimate, PoseOracle};

/// 按队列返回姿态结果；队列为空时返回 `fallback`
#[derive(Debug)]
pub struct QueuedOracle {
    queue: Mutex<VecDeque<Result<PoseEstimate, String>>>,
    fallback: PoseEstimate,
    calls: AtomicUsize,
}

impl QueuedOracle {
    pub fn new(fallback: PoseEstimate) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(VecDeque::new()),
            fallback,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn enqueue(&self, estimate: PoseEstimate) {
        self.queue.lock().expect("queue lock").push_back(Ok(estimate));
    }

    pub fn enqueue_failure(&self, message: &str) {
        self.queue
            .lock()
            .expect("queue lock")
            .push_back(Err(message.to_string()));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct SharedOracle(pub Arc<QueuedOracle>);

impl PoseOracle for SharedOracle {
    async fn estimate(&self, _frame: &Frame) -> Result<PoseEstimate, OracleError> {
        self.0.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.0.queue.lock().expect("queue lock").pop_front();
        match next {
            Some(Ok(estimate)) => Ok(estimate),
            Some(Err(message)) => Err(OracleError::Decode(message)),
            None => Ok(self.0.fallback.clone()),
        }
    }
}

/// 打开即失败的画面源，模拟摄像头不可用
#[derive(Debug, Default)]
pub struct UnavailableCamera;

impl FrameSource for UnavailableCamera {
    async fn open(&mut self) -> Result<FrameDimensions, FrameError> {
        Err(FrameError::DeviceNotFound("integrated".to_string()))
    }

    fn acquire(&mut self) -> Result<Frame, FrameError> {
        Err(FrameError::NotOpen)
    }

    fn close(&mut self) {}
}

/// 能正常打开，但按需丢弃若干帧的画面源
#[derive(Debug)]
pub struct DroppingCamera {
    inner: SyntheticFrameSource,
    pending_drops: Arc<AtomicUsize>,
}

impl DroppingCamera {
    pub fn new(width: u32, height: u32, intensity: u8) -> Self {
        Self {
            inner: SyntheticFrameSource::new(width, height, intensity),
            pending_drops: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// 调度器接管画面源后，测试通过该计数安排丢帧
    pub fn drops(&self) -> Arc<AtomicUsize> {
        self.pending_drops.clone()
    }
}

impl FrameSource for DroppingCamera {
    async fn open(&mut self) -> Result<FrameDimensions, FrameError> {
        self.inner.open().await
    }

    fn acquire(&mut self) -> Result<Frame, FrameError> {
        let dropped = self
            .pending_drops
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if dropped {
            return Err(FrameError::Unavailable("device busy".to_string()));
        }
        self.inner.acquire()
    }

    fn close(&mut self) {
        self.inner.close();
    }
}
