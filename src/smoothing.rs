//! 关键点时间平滑模块
//!
//! 保存最近 N 帧的 Body Part Map（FIFO），对每个关键点分别求位置均值。
//! 某关键点只在部分帧中出现时，只对出现的帧求平均，缺失帧不参与分母。

use std::collections::{BTreeMap, VecDeque};

use crate::constants::DEFAULT_HISTORY_CAPACITY;
use crate::keypoints::{BodyPartMap, KeypointLabel, Position};

/// 关键点平滑器
#[derive(Debug, Clone)]
pub struct TemporalSmoother {
    history: VecDeque<BodyPartMap>,
    capacity: usize,
}

impl Default for TemporalSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl TemporalSmoother {
    /// `capacity` 为 0 时按 1 处理
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// 追加一帧，超出容量时淘汰最旧的一帧
    pub fn push(&mut self, map: BodyPartMap) {
        self.history.push_back(map);
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }
    }

    /// 窗口内每个关键点的平均位置
    pub fn smoothed(&self) -> BodyPartMap {
        let mut sums: BTreeMap<KeypointLabel, (f64, f64, usize)> = BTreeMap::new();
        for map in &self.history {
            for (label, pos) in map {
                let entry = sums.entry(*label).or_insert((0.0, 0.0, 0));
                entry.0 += pos.x;
                entry.1 += pos.y;
                entry.2 += 1;
            }
        }

        sums.into_iter()
            .map(|(label, (sx, sy, n))| {
                let n = n as f64;
                (label, Position::new(sx / n, sy / n))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }
}
