//! 姿态估计接口
//!
//! 姿态模型（加载、推理）属于外部组件；调度器只依赖 `PoseOracle`。
//! `MockPoseOracle` 生成带抖动的坐姿关键点，用于本地演示。

use std::future::Future;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::camera::{Frame, FrameDimensions};
use crate::keypoints::{KeypointLabel, Position};

/// 姿态模型输出的单个关键点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawKeypoint {
    pub part: String,
    pub position: Position,
}

/// 单人姿态估计结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoseEstimate {
    pub score: f64,
    pub keypoints: Vec<RawKeypoint>,
}

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("failed to decode frame: {0}")]
    Decode(String),
    #[error("pose inference failed: {0}")]
    Inference(String),
}

pub trait PoseOracle: Send + Sync {
    /// 异步估计单帧姿态；失败时调度器放弃当前 tick
    fn estimate(
        &self,
        frame: &Frame,
    ) -> impl Future<Output = Result<PoseEstimate, OracleError>> + Send;
}

/// 演示用姿态源
#[derive(Debug, Clone)]
pub struct MockPoseOracle {
    /// 关键点坐标抖动幅度（像素）
    jitter_px: f64,
    /// 返回"无人"低分结果的概率
    absence_rate: f64,
}

impl Default for MockPoseOracle {
    fn default() -> Self {
        Self::new(4.0, 0.05)
    }
}

impl MockPoseOracle {
    pub fn new(jitter_px: f64, absence_rate: f64) -> Self {
        Self {
            jitter_px: jitter_px.max(0.0),
            absence_rate: if absence_rate.is_nan() {
                0.0
            } else {
                absence_rate.clamp(0.0, 1.0)
            },
        }
    }

    fn sample(&self, dims: FrameDimensions) -> PoseEstimate {
        let mut rng = rand::thread_rng();
        if rng.gen_bool(self.absence_rate) {
            return PoseEstimate {
                score: rng.gen_range(0.0..0.1),
                keypoints: Vec::new(),
            };
        }

        let w = f64::from(dims.width);
        let h = f64::from(dims.height);
        // 画面中央端坐的人，坐标按画面尺寸比例给出
        let layout = [
            (KeypointLabel::LeftEar, 0.58, 0.38),
            (KeypointLabel::RightEar, 0.42, 0.38),
            (KeypointLabel::LeftEye, 0.54, 0.35),
            (KeypointLabel::RightEye, 0.46, 0.35),
            (KeypointLabel::LeftShoulder, 0.68, 0.70),
            (KeypointLabel::RightShoulder, 0.32, 0.71),
        ];

        let keypoints = layout
            .iter()
            .map(|(label, fx, fy)| {
                let jx = if self.jitter_px > 0.0 {
                    rng.gen_range(-self.jitter_px..=self.jitter_px)
                } else {
                    0.0
                };
                let jy = if self.jitter_px > 0.0 {
                    rng.gen_range(-self.jitter_px..=self.jitter_px)
                } else {
                    0.0
                };
                RawKeypoint {
                    part: label.as_str().to_string(),
                    position: Position::new(fx * w + jx, fy * h + jy),
                }
            })
            .collect();

        PoseEstimate {
            score: rng.gen_range(0.6..0.95),
            keypoints,
        }
    }
}

impl PoseOracle for MockPoseOracle {
    async fn estimate(&self, frame: &Frame) -> Result<PoseEstimate, OracleError> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(OracleError::Decode("empty frame".to_string()));
        }
        Ok(self.sample(frame.dimensions()))
    }
}
