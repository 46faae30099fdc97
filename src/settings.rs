//! 用户设置持久化
//!
//! 基于 sled 的键值存储。每个设置项由 `Setting<T>` 描述：键名、默认值、
//! 读取转换与写入转换。读到缺失或无法解析的值时回退到默认值。

use std::sync::Arc;

use sled::Db;
use thiserror::Error;

use crate::config::RuntimeConfig;
use crate::constants::{CHECK_INTERVAL_PRESETS, DEFAULT_CHECK_INTERVAL_MS, LEGACY_SECONDS_CUTOFF};

const SETTINGS_TREE: &str = "settings";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// 单个持久化设置项
#[derive(Clone, Copy)]
pub struct Setting<T: 'static> {
    pub key: &'static str,
    pub default: fn() -> T,
    pub read: fn(&str) -> Option<T>,
    pub write: fn(&T) -> String,
}

/// 非聚焦状态下的检测间隔（毫秒）
pub const CHECK_INTERVAL: Setting<u64> = Setting {
    key: "checkInterval",
    default: || DEFAULT_CHECK_INTERVAL_MS,
    read: read_check_interval,
    write: |ms| ms.to_string(),
};

/// 旧版本按秒保存，小于 1000 的值按秒换算
fn read_check_interval(raw: &str) -> Option<u64> {
    let value = raw.trim().parse::<u64>().ok()?;
    if value == 0 {
        return None;
    }
    if value < LEGACY_SECONDS_CUTOFF {
        return value.checked_mul(1_000);
    }
    Some(value)
}

pub fn is_check_interval_preset(ms: u64) -> bool {
    CHECK_INTERVAL_PRESETS.contains(&ms)
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    db: Db,
    tree: sled::Tree,
}

impl SettingsStore {
    pub fn open(path: &str) -> Result<Self, SettingsError> {
        let db = sled::open(path)?;
        let tree = db.open_tree(SETTINGS_TREE)?;
        Ok(Self { db, tree })
    }

    pub fn get<T>(&self, setting: &Setting<T>) -> Result<T, SettingsError> {
        let Some(raw) = self.tree.get(setting.key.as_bytes())? else {
            return Ok((setting.default)());
        };
        let parsed = std::str::from_utf8(&raw).ok().and_then(setting.read);
        match parsed {
            Some(value) => Ok(value),
            None => {
                tracing::warn!(
                    key = setting.key,
                    raw = %String::from_utf8_lossy(&raw),
                    "Unreadable setting, using default"
                );
                Ok((setting.default)())
            }
        }
    }

    pub fn set<T>(&self, setting: &Setting<T>, value: &T) -> Result<(), SettingsError> {
        let encoded = (setting.write)(value);
        self.tree.insert(setting.key.as_bytes(), encoded.as_bytes())?;
        Ok(())
    }

    pub fn check_interval_ms(&self) -> Result<u64, SettingsError> {
        self.get(&CHECK_INTERVAL)
    }

    /// 保存检测间隔并推送给运行中的调度器；只接受预设值
    pub fn set_check_interval_ms(
        &self,
        ms: u64,
        runtime: &Arc<RuntimeConfig>,
    ) -> Result<(), SettingsError> {
        if !is_check_interval_preset(ms) {
            return Err(SettingsError::InvalidValue {
                key: CHECK_INTERVAL.key,
                value: ms.to_string(),
            });
        }
        self.set(&CHECK_INTERVAL, &ms)?;
        runtime.set_check_interval_ms(ms);
        tracing::info!(check_interval_ms = ms, "Check interval updated");
        Ok(())
    }

    pub fn flush(&self) -> Result<(), SettingsError> {
        self.db.flush()?;
        Ok(())
    }
}
