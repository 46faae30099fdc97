//! 分析结果输出
//!
//! 调度器通过 `StatusPublisher` 发布结果，不依赖具体的 UI 订阅机制。
//! `WatchSinks` 用三个 `watch` 通道实现：只保留最新值，无背压。

use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::keypoints::BodyPartMap;
use crate::lighting::LightingReport;
use crate::posture::PostureStatus;

pub trait StatusPublisher: Send + Sync {
    fn publish_body_parts(&self, parts: BodyPartMap);

    fn publish_posture(&self, status: PostureStatus);

    fn publish_lighting(&self, report: Option<LightingReport>);
}

#[derive(Debug)]
pub struct WatchSinks {
    body_parts: watch::Sender<BodyPartMap>,
    posture: watch::Sender<PostureStatus>,
    lighting: watch::Sender<Option<LightingReport>>,
}

impl Default for WatchSinks {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchSinks {
    pub fn new() -> Self {
        let (body_parts, _) = watch::channel(BodyPartMap::new());
        let (posture, _) = watch::channel(PostureStatus::unknown());
        let (lighting, _) = watch::channel(None);
        Self {
            body_parts,
            posture,
            lighting,
        }
    }

    pub fn subscribe_body_parts(&self) -> watch::Receiver<BodyPartMap> {
        self.body_parts.subscribe()
    }

    pub fn subscribe_posture(&self) -> watch::Receiver<PostureStatus> {
        self.posture.subscribe()
    }

    pub fn subscribe_lighting(&self) -> watch::Receiver<Option<LightingReport>> {
        self.lighting.subscribe()
    }

    pub fn posture_stream(&self) -> WatchStream<PostureStatus> {
        WatchStream::new(self.posture.subscribe())
    }

    pub fn lighting_stream(&self) -> WatchStream<Option<LightingReport>> {
        WatchStream::new(self.lighting.subscribe())
    }

    pub fn body_parts(&self) -> BodyPartMap {
        self.body_parts.borrow().clone()
    }

    pub fn posture(&self) -> PostureStatus {
        *self.posture.borrow()
    }

    pub fn lighting(&self) -> Option<LightingReport> {
        *self.lighting.borrow()
    }
}

impl StatusPublisher for WatchSinks {
    // send_replace 在没有订阅者时同样更新值
    fn publish_body_parts(&self, parts: BodyPartMap) {
        self.body_parts.send_replace(parts);
    }

    fn publish_posture(&self, status: PostureStatus) {
        self.posture.send_replace(status);
    }

    fn publish_lighting(&self, report: Option<LightingReport>) {
        self.lighting.send_replace(report);
    }
}

impl<P: StatusPublisher + ?Sized> StatusPublisher for std::sync::Arc<P> {
    fn publish_body_parts(&self, parts: BodyPartMap) {
        (**self).publish_body_parts(parts);
    }

    fn publish_posture(&self, status: PostureStatus) {
        (**self).publish_posture(status);
    }

    fn publish_lighting(&self, report: Option<LightingReport>) {
        (**self).publish_lighting(report);
    }
}

#[cfg(test)]
mod tests {
    use tokio_stream::StreamExt;

    use super::*;
    use crate::posture::Alignment;

    #[test]
    fn last_write_wins_without_subscribers() {
        let sinks = WatchSinks::new();
        sinks.publish_posture(PostureStatus {
            eyes_angle: Some(Alignment::Bad),
            ..PostureStatus::unknown()
        });
        sinks.publish_posture(PostureStatus {
            eyes_angle: Some(Alignment::Good),
            ..PostureStatus::unknown()
        });
        assert_eq!(sinks.posture().eyes_angle, Some(Alignment::Good));
    }

    #[tokio::test]
    async fn subscriber_sees_latest_value() {
        let sinks = WatchSinks::new();
        let mut rx = sinks.subscribe_posture();
        assert!(rx.borrow().is_unknown());

        sinks.publish_posture(PostureStatus {
            monitor_distance: Some(64.0),
            ..PostureStatus::unknown()
        });
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().monitor_distance, Some(64.0));
    }

    #[tokio::test]
    async fn stream_yields_initial_value() {
        let sinks = WatchSinks::new();
        let mut stream = sinks.lighting_stream();
        assert_eq!(stream.next().await, Some(None));
    }
}
