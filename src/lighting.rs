//! 环境光照估计模块
//!
//! 对原始（未镜像）画面按固定步长做网格采样，求 RGB 平均亮度并分级：
//! - < 90: bad
//! - 90 - 120: good
//! - >= 120: perfect
//!
//! 双耳可见时只采样脸部区域，否则采样整幅画面。只读取像素，不修改画面。

use serde::{Deserialize, Serialize};

use crate::camera::Frame;
use crate::config::LightingConfig;
use crate::keypoints::{BodyPartMap, KeypointLabel};

/// 光照等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightingStatus {
    Bad,
    Good,
    Perfect,
}

impl LightingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bad => "bad",
            Self::Good => "good",
            Self::Perfect => "perfect",
        }
    }
}

/// 采样区域，右/下边界不含
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRegion {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl SampleRegion {
    pub fn full(frame: &Frame) -> Self {
        Self {
            x0: 0,
            y0: 0,
            x1: frame.width(),
            y1: frame.height(),
        }
    }
}

/// 单帧光照估计结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LightingReport {
    /// 采样像素的平均亮度 (0-255)
    pub intensity: f64,
    pub status: LightingStatus,
    pub sample_count: usize,
    pub region: SampleRegion,
}

/// 光照估计器
#[derive(Debug, Clone, Default)]
pub struct LightingEstimator {
    config: LightingConfig,
}

impl LightingEstimator {
    pub fn new(config: LightingConfig) -> Self {
        Self { config }
    }

    /// 估计当前帧的光照；没有可采样像素（空画面）时返回 `None`
    pub fn estimate(&self, frame: &Frame, parts: Option<&BodyPartMap>) -> Option<LightingReport> {
        let region = parts
            .and_then(|parts| self.face_region(frame, parts))
            .unwrap_or_else(|| SampleRegion::full(frame));

        let stride = self.config.sample_stride.max(1);
        let mut total = 0.0;
        let mut count = 0_usize;
        for y in (region.y0..region.y1).step_by(stride) {
            for x in (region.x0..region.x1).step_by(stride) {
                if let Some([r, g, b, _]) = frame.pixel(x, y) {
                    total += (f64::from(r) + f64::from(g) + f64::from(b)) / 3.0;
                    count += 1;
                }
            }
        }

        if count == 0 {
            return None;
        }
        let intensity = total / count as f64;
        Some(LightingReport {
            intensity,
            status: self.classify(intensity),
            sample_count: count,
            region,
        })
    }

    pub fn classify(&self, intensity: f64) -> LightingStatus {
        if intensity < self.config.good_threshold {
            LightingStatus::Bad
        } else if intensity < self.config.perfect_threshold {
            LightingStatus::Good
        } else {
            LightingStatus::Perfect
        }
    }

    /// 以双耳为左右边界、双耳中心为纵向中心估计脸部区域
    ///
    /// 关键点来自镜像画面时先映射回原始坐标。区域退化时返回 `None`。
    fn face_region(&self, frame: &Frame, parts: &BodyPartMap) -> Option<SampleRegion> {
        let left = parts.get(&KeypointLabel::LeftEar)?;
        let right = parts.get(&KeypointLabel::RightEar)?;

        let width = f64::from(frame.width());
        let height = f64::from(frame.height());
        let raw_x = |x: f64| {
            if self.config.mirrored_keypoints {
                width - x
            } else {
                x
            }
        };

        let (lx, rx) = (raw_x(left.x), raw_x(right.x));
        let face_height = (lx - rx).abs() * self.config.face_height_ratio;
        let center_y = (left.y + right.y) / 2.0;

        let x0 = lx.min(rx).clamp(0.0, width);
        let x1 = lx.max(rx).clamp(0.0, width);
        let y0 = (center_y - face_height / 2.0).clamp(0.0, height);
        let y1 = (center_y + face_height / 2.0).clamp(0.0, height);

        if x1 - x0 < 1.0 || y1 - y0 < 1.0 {
            return None;
        }
        Some(SampleRegion {
            x0: x0 as u32,
            y0: y0 as u32,
            x1: x1.ceil() as u32,
            y1: y1.ceil() as u32,
        })
    }
}
