//! 坐姿监测核心
//!
//! 基于外部姿态模型输出的关键点，逐帧计算坐姿、观看距离/角度与环境光照。
//!
//! ## 模块
//! - `keypoints`: 关键点提取
//! - `smoothing`: 关键点时间平滑
//! - `posture`: 坐姿指标
//! - `lighting`: 光照估计
//! - `scheduler`: 帧调度（聚焦感知节流）
//! - `sinks`: 结果输出

pub mod camera;
pub mod config;
pub mod constants;
pub mod keypoints;
pub mod lighting;
pub mod logging;
pub mod oracle;
pub mod overlay;
pub mod posture;
pub mod scheduler;
pub mod settings;
pub mod sinks;
pub mod smoothing;

pub use keypoints::{BodyPartMap, KeypointLabel, Position};
pub use lighting::{LightingEstimator, LightingReport, LightingStatus};
pub use posture::{Alignment, PostureCalculator, PostureStatus};
pub use scheduler::{FrameScheduler, SchedulerState, TickOutcome};
pub use sinks::{StatusPublisher, WatchSinks};
pub use smoothing::TemporalSmoother;
