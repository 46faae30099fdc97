use std::env;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crate::constants::{
    CAMERA_FOV_DEGREES, DEFAULT_CHECK_INTERVAL_MS, DEFAULT_HISTORY_CAPACITY,
    DEFAULT_MIN_POSE_SCORE, DEFAULT_REFRESH_HZ, EYE_LEVEL_THRESHOLD_PX, FACE_HEIGHT_RATIO,
    LIGHTING_GOOD_THRESHOLD, LIGHTING_PERFECT_THRESHOLD, LIGHTING_SAMPLE_STRIDE,
    MONITOR_DISTANCE_CONSTANT, SHOULDER_LEVEL_THRESHOLD_PX,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub settings_path: String,
    pub scheduler: SchedulerConfig,
    pub posture: PostureConfig,
    pub lighting: LightingConfig,
    pub demo: DemoConfig,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub refresh_hz: u32,
    pub min_pose_score: f64,
    pub history_capacity: usize,
}

#[derive(Debug, Clone)]
pub struct PostureConfig {
    pub shoulder_threshold_px: f64,
    pub eye_threshold_px: f64,
    pub distance_constant: f64,
    pub camera_fov_degrees: f64,
}

#[derive(Debug, Clone)]
pub struct LightingConfig {
    pub sample_stride: usize,
    pub good_threshold: f64,
    pub perfect_threshold: f64,
    pub face_height_ratio: f64,
    /// 关键点是否来自水平镜像后的画面
    pub mirrored_keypoints: bool,
}

/// 合成画面源与 mock 姿态源参数
#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub frame_width: u32,
    pub frame_height: u32,
    pub frame_intensity: u8,
    pub mock_jitter_px: f64,
    pub mock_absence_rate: f64,
    /// 演示模式下的初始聚焦状态
    pub start_focused: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            refresh_hz: DEFAULT_REFRESH_HZ,
            min_pose_score: DEFAULT_MIN_POSE_SCORE,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl SchedulerConfig {
    /// 刷新周期，至少 1ns（`tokio::time::interval` 不接受零周期）
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.refresh_hz.max(1)))
            .max(Duration::from_nanos(1))
    }
}

impl Default for PostureConfig {
    fn default() -> Self {
        Self {
            shoulder_threshold_px: SHOULDER_LEVEL_THRESHOLD_PX,
            eye_threshold_px: EYE_LEVEL_THRESHOLD_PX,
            distance_constant: MONITOR_DISTANCE_CONSTANT,
            camera_fov_degrees: CAMERA_FOV_DEGREES,
        }
    }
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            sample_stride: LIGHTING_SAMPLE_STRIDE,
            good_threshold: LIGHTING_GOOD_THRESHOLD,
            perfect_threshold: LIGHTING_PERFECT_THRESHOLD,
            face_height_ratio: FACE_HEIGHT_RATIO,
            mirrored_keypoints: true,
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            frame_width: 640,
            frame_height: 480,
            frame_intensity: 110,
            mock_jitter_px: 4.0,
            mock_absence_rate: 0.05,
            start_focused: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            enable_file_logs: false,
            log_dir: "./logs".to_string(),
            settings_path: "./data/settings.sled".to_string(),
            scheduler: SchedulerConfig::default(),
            posture: PostureConfig::default(),
            lighting: LightingConfig::default(),
            demo: DemoConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let scheduler_defaults = SchedulerConfig::default();
        let posture_defaults = PostureConfig::default();
        let lighting_defaults = LightingConfig::default();
        let demo_defaults = DemoConfig::default();

        Self {
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            settings_path: env_or("SETTINGS_PATH", "./data/settings.sled"),
            scheduler: SchedulerConfig {
                refresh_hz: env_or_parse("REFRESH_HZ", scheduler_defaults.refresh_hz),
                min_pose_score: env_or_unit_interval(
                    "MIN_POSE_SCORE",
                    scheduler_defaults.min_pose_score,
                ),
                history_capacity: env_or_parse(
                    "HISTORY_CAPACITY",
                    scheduler_defaults.history_capacity,
                ),
            },
            posture: PostureConfig {
                shoulder_threshold_px: env_or_parse(
                    "SHOULDER_THRESHOLD_PX",
                    posture_defaults.shoulder_threshold_px,
                ),
                eye_threshold_px: env_or_parse("EYE_THRESHOLD_PX", posture_defaults.eye_threshold_px),
                distance_constant: env_or_parse(
                    "DISTANCE_CONSTANT",
                    posture_defaults.distance_constant,
                ),
                camera_fov_degrees: env_or_parse(
                    "CAMERA_FOV_DEGREES",
                    posture_defaults.camera_fov_degrees,
                ),
            },
            lighting: LightingConfig {
                sample_stride: env_or_parse("LIGHTING_SAMPLE_STRIDE", lighting_defaults.sample_stride),
                good_threshold: env_or_parse(
                    "LIGHTING_GOOD_THRESHOLD",
                    lighting_defaults.good_threshold,
                ),
                perfect_threshold: env_or_parse(
                    "LIGHTING_PERFECT_THRESHOLD",
                    lighting_defaults.perfect_threshold,
                ),
                face_height_ratio: env_or_parse(
                    "FACE_HEIGHT_RATIO",
                    lighting_defaults.face_height_ratio,
                ),
                mirrored_keypoints: env_or_bool(
                    "FLIP_HORIZONTAL",
                    lighting_defaults.mirrored_keypoints,
                ),
            },
            demo: DemoConfig {
                frame_width: env_or_parse("DEMO_FRAME_WIDTH", demo_defaults.frame_width),
                frame_height: env_or_parse("DEMO_FRAME_HEIGHT", demo_defaults.frame_height),
                frame_intensity: env_or_parse("DEMO_FRAME_INTENSITY", demo_defaults.frame_intensity),
                mock_jitter_px: env_or_parse("MOCK_JITTER_PX", demo_defaults.mock_jitter_px),
                mock_absence_rate: env_or_parse(
                    "MOCK_ABSENCE_RATE",
                    demo_defaults.mock_absence_rate,
                ),
                start_focused: env_or_bool("START_FOCUSED", demo_defaults.start_focused),
            },
        }
    }
}

/// 外部推送的运行时输入：窗口是否聚焦、非聚焦时的检测间隔
///
/// 由 `Arc` 共享，调度器每个 tick 开始时读取一次快照。
#[derive(Debug)]
pub struct RuntimeConfig {
    pub is_focused: AtomicBool,
    pub check_interval_ms: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeSnapshot {
    pub is_focused: bool,
    pub check_interval: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new(true, DEFAULT_CHECK_INTERVAL_MS)
    }
}

impl RuntimeConfig {
    pub fn new(is_focused: bool, check_interval_ms: u64) -> Self {
        Self {
            is_focused: AtomicBool::new(is_focused),
            check_interval_ms: AtomicU64::new(check_interval_ms),
        }
    }

    pub fn set_focused(&self, focused: bool) {
        self.is_focused.store(focused, Ordering::Relaxed);
    }

    pub fn set_check_interval_ms(&self, interval_ms: u64) {
        self.check_interval_ms.store(interval_ms, Ordering::Relaxed);
    }

    pub fn is_focused(&self) -> bool {
        self.is_focused.load(Ordering::Relaxed)
    }

    pub fn check_interval_ms(&self) -> u64 {
        self.check_interval_ms.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> RuntimeSnapshot {
        RuntimeSnapshot {
            is_focused: self.is_focused(),
            check_interval: Duration::from_millis(self.check_interval_ms()),
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

/// 解析 [0, 1] 内的有限浮点数，越界或 NaN 时回退默认值
pub fn env_or_unit_interval(key: &str, default: f64) -> f64 {
    let value = env_or_parse(key, default);
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        value
    } else {
        tracing::warn!(key, value, "Env var out of range [0, 1], using default");
        default
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}
