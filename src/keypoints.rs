//! 关键点提取模块
//!
//! 从姿态估计结果中挑出需要的关键点，构建单帧的 Body Part Map。
//! 未检测到的关键点不写入 map，下游一律按"未知"处理，不会以零坐标出现。

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::oracle::PoseEstimate;

/// 参与姿态分析的关键点
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeypointLabel {
    LeftEar,
    RightEar,
    LeftEye,
    RightEye,
    LeftShoulder,
    RightShoulder,
}

/// 默认提取的关键点集合
pub const TRACKED_LABELS: [KeypointLabel; 6] = [
    KeypointLabel::LeftEar,
    KeypointLabel::RightEar,
    KeypointLabel::LeftEye,
    KeypointLabel::RightEye,
    KeypointLabel::LeftShoulder,
    KeypointLabel::RightShoulder,
];

impl KeypointLabel {
    /// 姿态模型输出中使用的部位名称
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LeftEar => "leftEar",
            Self::RightEar => "rightEar",
            Self::LeftEye => "leftEye",
            Self::RightEye => "rightEye",
            Self::LeftShoulder => "leftShoulder",
            Self::RightShoulder => "rightShoulder",
        }
    }
}

impl fmt::Display for KeypointLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown keypoint label: {0}")]
pub struct UnknownLabel(pub String);

impl FromStr for KeypointLabel {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TRACKED_LABELS
            .iter()
            .copied()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| UnknownLabel(s.to_string()))
    }
}

/// 画面像素坐标
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn midpoint(&self, other: &Position) -> Position {
        Position::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// 单帧关键点 → 坐标映射
pub type BodyPartMap = BTreeMap<KeypointLabel, Position>;

/// 从姿态估计中提取 `wanted` 列出的关键点
///
/// 没有任何匹配时返回空 map，这是合法结果而不是错误。
/// 坐标非有限值（NaN/inf）的关键点视为缺失。
pub fn extract_body_parts(estimate: &PoseEstimate, wanted: &[KeypointLabel]) -> BodyPartMap {
    let mut map = BodyPartMap::new();
    for keypoint in &estimate.keypoints {
        let Ok(label) = keypoint.part.parse::<KeypointLabel>() else {
            continue;
        };
        if !wanted.contains(&label) || !keypoint.position.is_finite() {
            continue;
        }
        map.insert(label, keypoint.position);
    }
    map
}
