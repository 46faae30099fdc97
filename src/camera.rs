//! 画面来源
//!
//! 摄像头采集本身不在本 crate 内实现，这里只定义调度器依赖的 `FrameSource`
//! 接口、视频输入设备的选择规则，以及用于演示和测试的合成画面源。

use std::future::Future;

use serde::{Deserialize, Serialize};

/// 画面尺寸（像素）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameDimensions {
    pub width: u32,
    pub height: u32,
}

/// 一帧 RGBA 画面（原始方向，未镜像）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Frame {
    /// `data` 长度必须为 `width * height * 4`
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, FrameError> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(FrameError::InvalidBuffer {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn uniform(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = width as usize * height as usize;
        Self {
            width,
            height,
            data: rgba.repeat(pixels),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> FrameDimensions {
        FrameDimensions {
            width: self.width,
            height: self.height,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.data.get(idx..idx + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("video capture is not supported: {0}")]
    Unsupported(String),
    #[error("video device not found: {0}")]
    DeviceNotFound(String),
    #[error("frame source is not open")]
    NotOpen,
    #[error("frame unavailable: {0}")]
    Unavailable(String),
    #[error("invalid frame buffer: expected {expected} bytes, got {actual}")]
    InvalidBuffer { expected: usize, actual: usize },
}

/// 画面来源接口
///
/// `open` 失败是调度器唯一的致命错误；`acquire` 失败只放弃当前 tick。
pub trait FrameSource: Send {
    fn open(&mut self) -> impl Future<Output = Result<FrameDimensions, FrameError>> + Send;

    fn acquire(&mut self) -> Result<Frame, FrameError>;

    fn close(&mut self);
}

/// 媒体设备枚举结果中 `kind` 为摄像头的取值
pub const VIDEO_INPUT_KIND: &str = "videoinput";

/// 枚举到的媒体设备（摄像头、麦克风、扬声器混在一起）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInput {
    pub device_id: String,
    pub kind: String,
    pub label: String,
}

impl VideoInput {
    pub fn is_video_input(&self) -> bool {
        self.kind == VIDEO_INPUT_KIND
    }
}

/// 只保留视频输入设备
pub fn video_inputs(devices: &[VideoInput]) -> impl Iterator<Item = &VideoInput> {
    devices.iter().filter(|device| device.is_video_input())
}

/// 摄像头朝向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    User,
    Environment,
}

impl FacingMode {
    /// 标签含 "back"（不区分大小写）视为后置摄像头
    pub fn from_label(label: Option<&str>) -> Self {
        match label {
            Some(label) if label.to_lowercase().contains("back") => Self::Environment,
            _ => Self::User,
        }
    }
}

/// 在视频输入设备中按标签查找设备 id
pub fn select_device<'a>(devices: &'a [VideoInput], label: &str) -> Option<&'a str> {
    video_inputs(devices)
        .find(|input| input.label == label)
        .map(|input| input.device_id.as_str())
}

/// 输出固定亮度画面的合成画面源
#[derive(Debug, Clone)]
pub struct SyntheticFrameSource {
    dimensions: FrameDimensions,
    rgba: [u8; 4],
    is_open: bool,
}

impl SyntheticFrameSource {
    pub fn new(width: u32, height: u32, intensity: u8) -> Self {
        Self {
            dimensions: FrameDimensions { width, height },
            rgba: [intensity, intensity, intensity, 255],
            is_open: false,
        }
    }
}

impl FrameSource for SyntheticFrameSource {
    async fn open(&mut self) -> Result<FrameDimensions, FrameError> {
        if self.dimensions.width == 0 || self.dimensions.height == 0 {
            return Err(FrameError::Unsupported(
                "synthetic source needs non-zero dimensions".to_string(),
            ));
        }
        self.is_open = true;
        Ok(self.dimensions)
    }

    fn acquire(&mut self) -> Result<Frame, FrameError> {
        if !self.is_open {
            return Err(FrameError::NotOpen);
        }
        Ok(Frame::uniform(
            self.dimensions.width,
            self.dimensions.height,
            self.rgba,
        ))
    }

    fn close(&mut self) {
        self.is_open = false;
    }
}
