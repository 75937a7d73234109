use serde::{Deserialize, Serialize};

use crate::config::GestureConfig;
use crate::hand::{
    check_fingers_touching, finger_states, FingerStatus, Hand, HandLandmarks, LandmarkIndex,
    TouchState,
};

/// トラッキング側から届く1フレーム分の検出結果（最大2手）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandFrame {
    pub hands: Vec<DetectedHand>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedHand {
    pub hand: Hand,
    pub landmarks: HandLandmarks,
}

/// 片手分のジェスチャー集計結果。消費側にはクローンで渡す
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GestureSummaryEntry {
    pub hand: Hand,
    pub finger_status: FingerStatus,
    pub touch: TouchState,
    /// 人差し指+中指のみ伸展（厳密な一致、部分集合ではない）
    pub base_gesture: bool,
    /// base_gesture かつ 2指が接触 → 描画ジェスチャー
    pub is_fingers_together: bool,
}

/// 描画点の候補（人差し指・中指の指先中点、正規化座標）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCandidate {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub hand: Hand,
}

pub type SummaryCallback = Box<dyn FnMut(&[GestureSummaryEntry])>;

/// 左右の手のランドマークとジェスチャー集計を保持するトラッカー
///
/// トラッキングコールバックごとに状態をまるごと置き換える。
/// 部分更新をしないのでフレームドライバ側との任意の交互実行に耐える
pub struct GestureTracker {
    config: GestureConfig,
    landmarks: [Option<HandLandmarks>; Hand::COUNT],
    summary: Vec<GestureSummaryEntry>,
    fingers_together_active: bool,
    callback: Option<SummaryCallback>,
}

impl GestureTracker {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            landmarks: [None, None],
            summary: Vec::new(),
            fingers_together_active: false,
            callback: None,
        }
    }

    /// ジェスチャー集計が更新されるたびに呼ばれる通知フックを登録
    pub fn set_summary_callback(&mut self, callback: SummaryCallback) {
        self.callback = Some(callback);
    }

    /// トラッキング結果1フレーム分を取り込み、集計を再計算する
    /// 手が検出されなかったフレームでは全状態をクリアする（古いデータを残さない）
    pub fn on_frame(&mut self, frame: &HandFrame) {
        self.landmarks = [None, None];
        for detected in &frame.hands {
            self.landmarks[detected.hand.index()] = Some(detected.landmarks.clone());
        }

        self.summary.clear();
        let mut any_together = false;

        for hand in [Hand::Left, Hand::Right] {
            let Some(landmarks) = &self.landmarks[hand.index()] else {
                continue;
            };

            let finger_status = finger_states(landmarks, &self.config);
            let touch = check_fingers_touching(landmarks, &self.config);
            let base_gesture = !finger_status.thumb
                && finger_status.index
                && finger_status.middle
                && !finger_status.ring
                && !finger_status.pinky;
            let is_fingers_together = base_gesture && touch.touching;

            if is_fingers_together {
                any_together = true;
            }

            self.summary.push(GestureSummaryEntry {
                hand,
                finger_status,
                touch,
                base_gesture,
                is_fingers_together,
            });
        }

        self.fingers_together_active = any_together;

        if let Some(callback) = &mut self.callback {
            callback(&self.summary);
        }
    }

    /// 現在の集計のスナップショット（クローン）
    pub fn summary(&self) -> Vec<GestureSummaryEntry> {
        self.summary.clone()
    }

    /// いずれかの手が描画ジェスチャー中か
    pub fn is_fingers_together_active(&self) -> bool {
        self.fingers_together_active
    }

    pub fn landmarks(&self, hand: Hand) -> Option<&HandLandmarks> {
        self.landmarks[hand.index()].as_ref()
    }

    /// 描画ジェスチャー中の手の描画点候補を返す
    /// 複数の手が同時にジェスチャー中なら最初に見つかった手を使う
    pub fn draw_candidate(&self) -> Option<DrawCandidate> {
        for entry in &self.summary {
            if !entry.is_fingers_together {
                continue;
            }
            let Some(landmarks) = &self.landmarks[entry.hand.index()] else {
                continue;
            };
            let index_tip = landmarks.get(LandmarkIndex::IndexTip);
            let middle_tip = landmarks.get(LandmarkIndex::MiddleTip);
            return Some(DrawCandidate {
                x: (index_tip.x + middle_tip.x) / 2.0,
                y: (index_tip.y + middle_tip.y) / 2.0,
                z: (index_tip.z + middle_tip.z) / 2.0,
                hand: entry.hand,
            });
        }
        None
    }
}
