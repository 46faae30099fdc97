//! 关键点叠加层绘制
//!
//! 实际绘制由外部渲染层完成，这里只负责按约定调用绘制原语：
//! 每个可见关键点一个点，双肩都可见时连一条线。

use std::sync::{Arc, Mutex};

use crate::keypoints::{BodyPartMap, KeypointLabel};

pub trait OverlayRenderer: Send {
    fn draw_point(&mut self, y: f64, x: f64);

    fn draw_line(&mut self, y1: f64, x1: f64, y2: f64, x2: f64);
}

pub fn draw_markers<R: OverlayRenderer + ?Sized>(parts: &BodyPartMap, renderer: &mut R) {
    for position in parts.values() {
        renderer.draw_point(position.y, position.x);
    }

    if let (Some(right), Some(left)) = (
        parts.get(&KeypointLabel::RightShoulder),
        parts.get(&KeypointLabel::LeftShoulder),
    ) {
        renderer.draw_line(right.y, right.x, left.y, left.x);
    }
}

/// 把绘制调用输出为 trace 日志
#[derive(Debug, Default)]
pub struct TracingRenderer;

impl OverlayRenderer for TracingRenderer {
    fn draw_point(&mut self, y: f64, x: f64) {
        tracing::trace!(x, y, "draw point");
    }

    fn draw_line(&mut self, y1: f64, x1: f64, y2: f64, x2: f64) {
        tracing::trace!(x1, y1, x2, y2, "draw line");
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawCall {
    Point { y: f64, x: f64 },
    Line { y1: f64, x1: f64, y2: f64, x2: f64 },
}

/// 记录绘制调用，供测试断言；克隆体共享同一份记录
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    calls: Arc<Mutex<Vec<DrawCall>>>,
}

impl RecordingRenderer {
    pub fn calls(&self) -> Vec<DrawCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }

    fn record(&self, call: DrawCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl OverlayRenderer for RecordingRenderer {
    fn draw_point(&mut self, y: f64, x: f64) {
        self.record(DrawCall::Point { y, x });
    }

    fn draw_line(&mut self, y1: f64, x1: f64, y2: f64, x2: f64) {
        self.record(DrawCall::Line { y1, x1, y2, x2 });
    }
}
