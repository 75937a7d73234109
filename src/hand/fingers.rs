use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::frame::HandCoordinateFrame;
use super::landmark::{HandLandmarks, Landmark, LandmarkIndex};
use crate::config::GestureConfig;

/// 各指の伸展状態。フレームごとに再計算し、保持しない
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerStatus {
    pub thumb: bool,
    pub index: bool,
    pub middle: bool,
    pub ring: bool,
    pub pinky: bool,
}

fn vector(from: &Landmark, to: &Landmark) -> Vector3<f32> {
    Vector3::new(to.x - from.x, to.y - from.y, to.z - from.z)
}

/// 2ベクトル間の角度（度）
/// arccosの定義域エラーを避けるため内積をクランプする
fn angle_between_deg(a: &Vector3<f32>, b: &Vector3<f32>) -> f32 {
    let mag_a = a.norm();
    let mag_b = b.norm();
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    let cos = (a.dot(b) / (mag_a * mag_b)).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// 指（人差し指〜小指）の伸展判定
/// PIP/DIP関節の曲げ角度と、手のひら中心からの径方向伸展の両方で判定
fn is_finger_extended(
    tip: &Landmark,
    dip: &Landmark,
    pip: &Landmark,
    mcp: &Landmark,
    frame: &HandCoordinateFrame,
    config: &GestureConfig,
) -> bool {
    let pip_angle = angle_between_deg(&vector(pip, mcp), &vector(pip, dip));
    let dip_angle = angle_between_deg(&vector(dip, pip), &vector(dip, tip));

    let tip_distance = frame.distance_from_palm(tip);
    let mcp_distance = frame.distance_from_palm(mcp);
    let extension = (tip_distance - mcp_distance) / frame.scale;

    pip_angle > config.finger_angle_deg
        && dip_angle > config.finger_angle_deg
        && extension > config.finger_extension
}

/// 親指の伸展判定（関節チェーンが異なる: tip, ip, mp, cmc）
/// 親指は径方向ではなく側方に伸びるため、外転フォールバックのどちらかを満たせばよい
fn is_thumb_extended(
    tip: &Landmark,
    ip: &Landmark,
    mp: &Landmark,
    cmc: &Landmark,
    frame: &HandCoordinateFrame,
    config: &GestureConfig,
) -> bool {
    let mcp_angle = angle_between_deg(&vector(mp, cmc), &vector(mp, ip));
    let ip_angle = angle_between_deg(&vector(ip, mp), &vector(ip, tip));

    let tip_distance = frame.distance_from_palm(tip);
    let mcp_distance = frame.distance_from_palm(mp);
    let extension = (tip_distance - mcp_distance) / frame.scale;

    let lateral = frame.to_frame_relative(tip).x.abs();

    mcp_angle > config.thumb_angle_deg
        && ip_angle > config.thumb_angle_deg
        && (extension > config.thumb_extension || lateral > config.thumb_lateral)
}

/// 21ランドマークから5指の伸展状態を分類する純粋関数
pub fn finger_states(landmarks: &HandLandmarks, config: &GestureConfig) -> FingerStatus {
    use LandmarkIndex::*;

    let frame = HandCoordinateFrame::build(landmarks);
    let get = |i: LandmarkIndex| landmarks.get(i);

    FingerStatus {
        thumb: is_thumb_extended(
            get(ThumbTip),
            get(ThumbIp),
            get(ThumbMcp),
            get(ThumbCmc),
            &frame,
            config,
        ),
        index: is_finger_extended(
            get(IndexTip),
            get(IndexDip),
            get(IndexPip),
            get(IndexMcp),
            &frame,
            config,
        ),
        middle: is_finger_extended(
            get(MiddleTip),
            get(MiddleDip),
            get(MiddlePip),
            get(MiddleMcp),
            &frame,
            config,
        ),
        ring: is_finger_extended(
            get(RingTip),
            get(RingDip),
            get(RingPip),
            get(RingMcp),
            &frame,
            config,
        ),
        pinky: is_finger_extended(
            get(PinkyTip),
            get(PinkyDip),
            get(PinkyPip),
            get(PinkyMcp),
            &frame,
            config,
        ),
    }
}
