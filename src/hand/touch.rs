use serde::{Deserialize, Serialize};

use super::landmark::{HandLandmarks, LandmarkIndex};
use crate::config::GestureConfig;

/// 関節レベルごとの値（tip/dip/pip/mcp）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct JointPairValues<T> {
    pub tip: T,
    pub dip: T,
    pub pip: T,
    pub mcp: T,
}

/// 人差し指・中指の接触判定結果
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TouchState {
    /// 4ペア中、閾値以下のペアが規定数以上なら接触とみなす
    pub touching: bool,
    pub touching_at: JointPairValues<bool>,
    pub distances: JointPairValues<f32>,
}

/// 人差し指・中指の対応する関節同士の3D距離を関節レベルごとの閾値と比較する
///
/// 全ペア一致ではなく多数決（4分の3以上）なので、単一関節の
/// トラッキングジッタを許容する
pub fn check_fingers_touching(landmarks: &HandLandmarks, config: &GestureConfig) -> TouchState {
    use LandmarkIndex::*;

    let distances = JointPairValues {
        tip: landmarks.get(IndexTip).distance_to(landmarks.get(MiddleTip)),
        dip: landmarks.get(IndexDip).distance_to(landmarks.get(MiddleDip)),
        pip: landmarks.get(IndexPip).distance_to(landmarks.get(MiddlePip)),
        mcp: landmarks.get(IndexMcp).distance_to(landmarks.get(MiddleMcp)),
    };

    let touching_at = JointPairValues {
        tip: distances.tip < config.touch_tip,
        dip: distances.dip < config.touch_dip,
        pip: distances.pip < config.touch_pip,
        mcp: distances.mcp < config.touch_mcp,
    };

    let touch_count = [touching_at.tip, touching_at.dip, touching_at.pip, touching_at.mcp]
        .iter()
        .filter(|&&t| t)
        .count();

    TouchState {
        touching: touch_count >= config.touch_required,
        touching_at,
        distances,
    }
}
