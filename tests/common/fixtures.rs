use posture_monitor::keypoints::Position;
use posture_monitor::oracle::{PoseEstimate, RawKeypoint};

pub fn pose(score: f64, parts: &[(&str, f64, f64)]) -> PoseEstimate {
    PoseEstimate {
        score,
        keypoints: parts
            .iter()
            .map(|(part, x, y)| RawKeypoint {
                part: part.to_string(),
                position: Position::new(*x, *y),
            })
            .collect(),
    }
}

pub fn seated_pose() -> PoseEstimate {
    pose(
        0.8,
        &[
            ("nose", 130.0, 260.0),
            ("leftEar", 90.0, 250.0),
            ("rightEar", 170.0, 250.0),
            ("leftEye", 100.0, 240.0),
            ("rightEye", 160.0, 240.0),
            ("leftShoulder", 60.0, 400.0),
            ("rightShoulder", 200.0, 410.0),
        ],
    )
}
