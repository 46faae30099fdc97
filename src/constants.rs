/// 姿态估计分数低于此值视为画面中无人
pub const DEFAULT_MIN_POSE_SCORE: f64 = 0.15;

/// 关键点平滑窗口（帧数）
pub const DEFAULT_HISTORY_CAPACITY: usize = 8;

/// 显示刷新频率（Hz），调度器按此节奏触发 tick
pub const DEFAULT_REFRESH_HZ: u32 = 60;

/// 左右肩 y 坐标差阈值（像素）
pub const SHOULDER_LEVEL_THRESHOLD_PX: f64 = 50.0;

/// 左右眼 x 坐标差阈值（像素）
pub const EYE_LEVEL_THRESHOLD_PX: f64 = 120.0;

/// 屏幕距离经验标定常数，单位即距离输出单位
pub const MONITOR_DISTANCE_CONSTANT: f64 = 6.0;

/// 假设的摄像头垂直视场角（度）
pub const CAMERA_FOV_DEGREES: f64 = 70.0;

/// 亮度采样步长（像素），两个方向相同
pub const LIGHTING_SAMPLE_STRIDE: usize = 10;

/// 平均亮度低于此值为 bad
pub const LIGHTING_GOOD_THRESHOLD: f64 = 90.0;

/// 平均亮度不低于此值为 perfect
pub const LIGHTING_PERFECT_THRESHOLD: f64 = 120.0;

/// 脸部高度与双耳间距之比，用于估计脸部采样区域
pub const FACE_HEIGHT_RATIO: f64 = 1.3;

/// 非聚焦状态下可选的检测间隔（毫秒）
pub const CHECK_INTERVAL_PRESETS: &[u64] = &[1_000, 30_000, 60_000, 300_000, 900_000];

/// 默认检测间隔（毫秒）
pub const DEFAULT_CHECK_INTERVAL_MS: u64 = 30_000;

/// 旧版本以秒存储检测间隔，低于此值的持久化数据按秒解释
pub const LEGACY_SECONDS_CUTOFF: u64 = 1_000;

/// 数值精度
pub const EPSILON: f64 = 1e-9;
