//! 坐姿指标计算模块
//!
//! 基于平滑后的关键点计算四项指标：
//! - 肩膀是否水平（左右肩 y 差）
//! - 双眼是否正对（左右眼 x 差）
//! - 与屏幕的距离（双眼间距 + 耳部偏航修正）
//! - 垂直视角（双眼中心在画面中的高度，反正弦投影）
//!
//! 每项指标独立计算，缺少所需关键点或几何退化时该项为 `None`，不影响其他项。

use serde::{Deserialize, Serialize};

use crate::camera::FrameDimensions;
use crate::config::PostureConfig;
use crate::constants::EPSILON;
use crate::keypoints::{BodyPartMap, KeypointLabel, Position};

/// 二值判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Good,
    Bad,
}

impl Alignment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Bad => "bad",
        }
    }
}

/// 单次分析得到的坐姿状态
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostureStatus {
    pub shoulders_angle: Option<Alignment>,
    pub eyes_angle: Option<Alignment>,
    pub monitor_distance: Option<f64>,
    /// 度，双眼在画面中心上方为正
    pub view_angle: Option<f64>,
}

impl PostureStatus {
    /// 四项全部未知（画面中无人时发布）
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn is_unknown(&self) -> bool {
        *self == Self::unknown()
    }
}

/// 坐姿指标计算器
#[derive(Debug, Clone, Default)]
pub struct PostureCalculator {
    config: PostureConfig,
}

impl PostureCalculator {
    pub fn new(config: PostureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PostureConfig {
        &self.config
    }

    pub fn calculate(&self, parts: &BodyPartMap, dims: FrameDimensions) -> PostureStatus {
        PostureStatus {
            shoulders_angle: self.shoulders_angle(parts),
            eyes_angle: self.eyes_angle(parts),
            monitor_distance: self.monitor_distance(parts, dims.width),
            view_angle: self.view_angle(parts, dims.height),
        }
    }

    pub fn shoulders_angle(&self, parts: &BodyPartMap) -> Option<Alignment> {
        let (left, right) = pair(parts, KeypointLabel::LeftShoulder, KeypointLabel::RightShoulder)?;
        Some(within(
            (left.y - right.y).abs(),
            self.config.shoulder_threshold_px,
        ))
    }

    pub fn eyes_angle(&self, parts: &BodyPartMap) -> Option<Alignment> {
        let (left, right) = pair(parts, KeypointLabel::LeftEye, KeypointLabel::RightEye)?;
        Some(within((left.x - right.x).abs(), self.config.eye_threshold_px))
    }

    /// `distance = K * frame_width / effective_eye_distance`
    ///
    /// 双耳都可见时，把耳中心与眼中心的 x 偏移的一半加到眼距上，补偿头部偏航造成的眼距缩短。
    pub fn monitor_distance(&self, parts: &BodyPartMap, frame_width: u32) -> Option<f64> {
        let (left_eye, right_eye) = pair(parts, KeypointLabel::LeftEye, KeypointLabel::RightEye)?;
        let mut eye_distance = left_eye.distance(&right_eye);

        if let Some((left_ear, right_ear)) =
            pair(parts, KeypointLabel::LeftEar, KeypointLabel::RightEar)
        {
            let ear_center = left_ear.midpoint(&right_ear);
            let eye_center = left_eye.midpoint(&right_eye);
            eye_distance += (ear_center.x - eye_center.x).abs() / 2.0;
        }

        if eye_distance < EPSILON {
            return None;
        }
        finite(self.config.distance_constant * f64::from(frame_width) / eye_distance)
    }

    /// 把双眼中心的纵向位置映射到 [-1, 1]，乘以半视场角正弦后取反正弦
    pub fn view_angle(&self, parts: &BodyPartMap, frame_height: u32) -> Option<f64> {
        let (left_eye, right_eye) = pair(parts, KeypointLabel::LeftEye, KeypointLabel::RightEye)?;
        if frame_height == 0 {
            return None;
        }
        let half_height = f64::from(frame_height) / 2.0;
        let eye_y = left_eye.midpoint(&right_eye).y;
        let offset = (half_height - eye_y) / half_height;

        let half_fov = (self.config.camera_fov_degrees / 2.0).to_radians();
        let arg = offset * half_fov.sin();
        if !(-1.0..=1.0).contains(&arg) {
            return None;
        }
        finite(arg.asin().to_degrees())
    }
}

fn pair(parts: &BodyPartMap, a: KeypointLabel, b: KeypointLabel) -> Option<(Position, Position)> {
    Some((*parts.get(&a)?, *parts.get(&b)?))
}

fn within(diff: f64, threshold: f64) -> Alignment {
    if diff <= threshold {
        Alignment::Good
    } else {
        Alignment::Bad
    }
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
