use serde::{Deserialize, Serialize};

use crate::config::StrokeConfig;
use crate::gesture::DrawCandidate;
use crate::hand::Hand;

/// 描画用に記録された1サンプル
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawingPoint {
    /// キャンバス座標（ミラーリング済み）
    pub x: f32,
    pub y: f32,
    /// 元の正規化座標 (x, y, z)
    pub normalized: [f32; 3],
    pub hand: Hand,
    /// タイムスタンプ（ミリ秒）
    pub timestamp: f64,
    /// この点の前でストロークが切れている（線を繋がない）
    pub break_before: bool,
}

/// 図形解析用の軽量サンプル（正規化2D座標のみ）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalculationPoint {
    pub x: f32,
    pub y: f32,
    pub hand: Hand,
    pub timestamp: f64,
}

/// ストローク終了の契機
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrokeEndReason {
    /// ジェスチャーが解除された
    GestureEnded,
    /// 同一手の点間ギャップが閾値を超えた
    StrokeGap,
    /// 無操作タイムアウト
    Timeout,
    /// 明示的なクリア操作
    ManualClear,
}

/// 確定したストローク（分類待ち）
#[derive(Debug, Clone)]
pub struct FinalizedStroke {
    pub points: Vec<CalculationPoint>,
    pub reason: StrokeEndReason,
}

impl FinalizedStroke {
    /// ストロークの主たる手: 多数決、同数なら最後の点の手
    pub fn dominant_hand(&self) -> Option<Hand> {
        if self.points.is_empty() {
            return None;
        }
        let left = self.points.iter().filter(|p| p.hand == Hand::Left).count();
        let right = self.points.len() - left;
        if left > right {
            Some(Hand::Left)
        } else if right > left {
            Some(Hand::Right)
        } else {
            self.points.last().map(|p| p.hand)
        }
    }
}

/// ストローク記録器
///
/// 描画点（20ms間隔）と解析点（100ms間隔）を別々のレート制限で
/// コミットし、時間ギャップ・ジェスチャー終了・タイムアウトで
/// ストロークを区切る。タイムスタンプは呼び出し側が供給する
/// （壁時計ミリ秒）のでフレームレート変動に影響されない
pub struct StrokeRecorder {
    config: StrokeConfig,
    drawing_points: Vec<DrawingPoint>,
    calculation_points: Vec<CalculationPoint>,
    current_stroke: Vec<CalculationPoint>,
    new_stroke_pending: bool,
    last_dot_at: Option<f64>,
    last_calculation_at: Option<f64>,
    /// 最後に描画点をコミットした時刻（タイムアウト判定用）
    last_commit_at: Option<f64>,
}

impl StrokeRecorder {
    pub fn new(config: StrokeConfig) -> Self {
        Self {
            config,
            drawing_points: Vec::new(),
            calculation_points: Vec::new(),
            current_stroke: Vec::new(),
            new_stroke_pending: true,
            last_dot_at: None,
            last_calculation_at: None,
            last_commit_at: None,
        }
    }

    /// 描画点のコミットを試みる。レート制限（dot_interval_ms）未満なら何もしない
    ///
    /// 同一手の直前の点とのギャップが line_break_ms を超えていた場合、
    /// 進行中のストロークを確定して返し、新しい点に break_before を立てる
    pub fn record_dot(
        &mut self,
        candidate: &DrawCandidate,
        viewport: (f32, f32),
        now: f64,
    ) -> Option<FinalizedStroke> {
        if let Some(last) = self.last_dot_at {
            if now - last < self.config.dot_interval_ms {
                return None;
            }
        }
        self.last_dot_at = Some(now);

        let (width, height) = viewport;
        // キャンバスはミラー表示（自分の手の動きと一致させる）
        let canvas_x = (1.0 - candidate.x) * width;
        let canvas_y = candidate.y * height;

        let prev = self
            .drawing_points
            .iter()
            .rev()
            .find(|p| p.hand == candidate.hand);

        let mut finalized = None;
        let connects = match prev {
            Some(prev_point) => {
                let gap = now - prev_point.timestamp;
                if gap <= self.config.line_break_ms {
                    true
                } else {
                    finalized = self.finalize_current(StrokeEndReason::StrokeGap);
                    false
                }
            }
            None => false,
        };

        self.drawing_points.push(DrawingPoint {
            x: canvas_x,
            y: canvas_y,
            normalized: [candidate.x, candidate.y, candidate.z],
            hand: candidate.hand,
            timestamp: now,
            break_before: !connects,
        });
        self.last_commit_at = Some(now);

        let max = self.config.max_draw_points;
        if self.drawing_points.len() > max {
            let excess = self.drawing_points.len() - max;
            self.drawing_points.drain(..excess);
        }

        finalized
    }

    /// 解析点のコミットを試みる（calculation_interval_ms のレート制限）
    pub fn record_calculation(&mut self, candidate: &DrawCandidate, now: f64) {
        if let Some(last) = self.last_calculation_at {
            if now - last < self.config.calculation_interval_ms {
                return;
            }
        }
        self.last_calculation_at = Some(now);

        if self.new_stroke_pending {
            self.current_stroke.clear();
            self.new_stroke_pending = false;
        }

        let point = CalculationPoint {
            x: candidate.x,
            y: candidate.y,
            hand: candidate.hand,
            timestamp: now,
        };
        self.current_stroke.push(point);
        self.calculation_points.push(point);

        let max = self.config.max_calculation_points;
        if self.calculation_points.len() > max {
            let excess = self.calculation_points.len() - max;
            self.calculation_points.drain(..excess);
        }
    }

    /// ジェスチャー解除。進行中のストロークを確定し、レート制限をリセット
    pub fn end_gesture(&mut self) -> Option<FinalizedStroke> {
        let finalized = self.finalize_current(StrokeEndReason::GestureEnded);
        self.last_dot_at = None;
        self.last_calculation_at = None;
        finalized
    }

    /// 無操作タイムアウトが成立しているか
    pub fn auto_clear_due(&self, now: f64) -> bool {
        if self.drawing_points.is_empty() {
            return false;
        }
        match self.last_commit_at {
            Some(last) => now - last >= self.config.clear_timeout_ms,
            None => false,
        }
    }

    /// 進行中のストロークを確定し、全バッファを破棄する
    /// 部分的なストロークが分類されずに消えることはない（確定結果を返す）
    pub fn clear(&mut self, reason: StrokeEndReason) -> Option<FinalizedStroke> {
        let finalized = self.finalize_current(reason);
        self.drawing_points.clear();
        self.calculation_points.clear();
        self.last_dot_at = None;
        self.last_calculation_at = None;
        self.last_commit_at = None;
        finalized
    }

    fn finalize_current(&mut self, reason: StrokeEndReason) -> Option<FinalizedStroke> {
        self.new_stroke_pending = true;
        if self.current_stroke.is_empty() {
            return None;
        }
        let points = std::mem::take(&mut self.current_stroke);
        Some(FinalizedStroke { points, reason })
    }

    pub fn drawing_points(&self) -> &[DrawingPoint] {
        &self.drawing_points
    }

    pub fn calculation_points(&self) -> &[CalculationPoint] {
        &self.calculation_points
    }

    pub fn current_stroke_len(&self) -> usize {
        self.current_stroke.len()
    }

    /// 最初と最後の描画点の時間差（ミリ秒）
    pub fn duration_ms(&self) -> f64 {
        match (self.drawing_points.first(), self.drawing_points.last()) {
            (Some(first), Some(last)) => last.timestamp - first.timestamp,
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: (f32, f32) = (640.0, 480.0);

    fn candidate(x: f32, y: f32, hand: Hand) -> DrawCandidate {
        DrawCandidate { x, y, z: 0.0, hand }
    }

    fn recorder() -> StrokeRecorder {
        StrokeRecorder::new(StrokeConfig::default())
    }

    #[test]
    fn test_dot_rate_limiting() {
        let mut rec = recorder();
        let c = candidate(0.5, 0.5, Hand::Right);

        assert!(rec.record_dot(&c, VIEWPORT, 1000.0).is_none());
        assert_eq!(rec.drawing_points().len(), 1);

        // 20ms未満はコミットされない
        rec.record_dot(&c, VIEWPORT, 1010.0);
        assert_eq!(rec.drawing_points().len(), 1);

        rec.record_dot(&c, VIEWPORT, 1020.0);
        assert_eq!(rec.drawing_points().len(), 2);
    }

    #[test]
    fn test_calculation_rate_limiting() {
        let mut rec = recorder();
        let c = candidate(0.5, 0.5, Hand::Right);

        rec.record_calculation(&c, 1000.0);
        rec.record_calculation(&c, 1050.0);
        rec.record_calculation(&c, 1099.0);
        assert_eq!(rec.calculation_points().len(), 1);

        rec.record_calculation(&c, 1100.0);
        assert_eq!(rec.calculation_points().len(), 2);
    }

    #[test]
    fn test_canvas_mapping_is_mirrored() {
        let mut rec = recorder();
        rec.record_dot(&candidate(0.25, 0.5, Hand::Left), VIEWPORT, 1000.0);
        let point = rec.drawing_points()[0];
        assert!((point.x - 0.75 * 640.0).abs() < 1e-3);
        assert!((point.y - 0.5 * 480.0).abs() < 1e-3);
        assert_eq!(point.normalized[0], 0.25);
    }

    #[test]
    fn test_first_point_has_break_before() {
        let mut rec = recorder();
        rec.record_dot(&candidate(0.5, 0.5, Hand::Right), VIEWPORT, 1000.0);
        assert!(rec.drawing_points()[0].break_before);

        rec.record_dot(&candidate(0.51, 0.5, Hand::Right), VIEWPORT, 1030.0);
        assert!(!rec.drawing_points()[1].break_before);
    }

    /// 400ms超のギャップでストロークが分割され、前のストロークが確定すること
    #[test]
    fn test_gap_forces_stroke_boundary() {
        let mut rec = recorder();
        let c = candidate(0.5, 0.5, Hand::Right);

        // ストローク1を蓄積
        for i in 0..5 {
            let t = 1000.0 + i as f64 * 100.0;
            rec.record_dot(&c, VIEWPORT, t);
            rec.record_calculation(&c, t);
        }
        assert_eq!(rec.current_stroke_len(), 5);

        // 401ms後: 分割 + 確定
        let finalized = rec.record_dot(&c, VIEWPORT, 1400.0 + 401.0);
        let stroke = finalized.expect("gap should finalize the open stroke");
        assert_eq!(stroke.reason, StrokeEndReason::StrokeGap);
        assert_eq!(stroke.points.len(), 5);
        assert!(
            rec.drawing_points().last().unwrap().break_before,
            "point after gap should start a new stroke"
        );
    }

    #[test]
    fn test_gap_exactly_at_threshold_connects() {
        let mut rec = recorder();
        let c = candidate(0.5, 0.5, Hand::Right);
        rec.record_dot(&c, VIEWPORT, 1000.0);
        let finalized = rec.record_dot(&c, VIEWPORT, 1400.0);
        assert!(finalized.is_none());
        assert!(!rec.drawing_points()[1].break_before);
    }

    /// 手ごとに独立してギャップ判定されること
    #[test]
    fn test_gap_checked_per_hand() {
        let mut rec = recorder();
        rec.record_dot(&candidate(0.5, 0.5, Hand::Left), VIEWPORT, 1000.0);
        // 右手の最初の点: 左手の点とのギャップは無関係
        let finalized = rec.record_dot(&candidate(0.3, 0.3, Hand::Right), VIEWPORT, 2000.0);
        assert!(finalized.is_none());
        assert!(rec.drawing_points()[1].break_before);
    }

    #[test]
    fn test_drawing_buffer_eviction_keeps_newest_in_order() {
        let config = StrokeConfig {
            max_draw_points: 5,
            dot_interval_ms: 0.0,
            ..StrokeConfig::default()
        };
        let mut rec = StrokeRecorder::new(config);
        for i in 0..8 {
            rec.record_dot(
                &candidate(i as f32 * 0.1, 0.5, Hand::Right),
                VIEWPORT,
                1000.0 + i as f64,
            );
        }
        let points = rec.drawing_points();
        assert_eq!(points.len(), 5);
        // 最新5点が順序を保って残ること
        for (offset, point) in points.iter().enumerate() {
            assert_eq!(point.timestamp, 1003.0 + offset as f64);
        }
    }

    #[test]
    fn test_calculation_buffer_eviction() {
        let config = StrokeConfig {
            max_calculation_points: 3,
            calculation_interval_ms: 0.0,
            ..StrokeConfig::default()
        };
        let mut rec = StrokeRecorder::new(config);
        for i in 0..6 {
            rec.record_calculation(&candidate(0.5, 0.5, Hand::Left), 1000.0 + i as f64);
        }
        let points = rec.calculation_points();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].timestamp, 1003.0);
        assert_eq!(points[2].timestamp, 1005.0);
    }

    #[test]
    fn test_end_gesture_finalizes() {
        let mut rec = recorder();
        let c = candidate(0.5, 0.5, Hand::Left);
        for i in 0..4 {
            rec.record_calculation(&c, 1000.0 + i as f64 * 100.0);
        }
        let stroke = rec.end_gesture().expect("open stroke should finalize");
        assert_eq!(stroke.reason, StrokeEndReason::GestureEnded);
        assert_eq!(stroke.points.len(), 4);
        assert_eq!(rec.current_stroke_len(), 0);

        // 空の状態での解除は何も返さない
        assert!(rec.end_gesture().is_none());
    }

    #[test]
    fn test_auto_clear_timing() {
        let mut rec = recorder();
        let c = candidate(0.5, 0.5, Hand::Right);
        rec.record_dot(&c, VIEWPORT, 1000.0);

        assert!(!rec.auto_clear_due(4999.0));
        assert!(rec.auto_clear_due(5000.0));

        rec.clear(StrokeEndReason::Timeout);
        assert!(rec.drawing_points().is_empty());
        assert!(rec.calculation_points().is_empty());
        assert!(!rec.auto_clear_due(10000.0));
    }

    #[test]
    fn test_clear_returns_open_stroke() {
        let mut rec = recorder();
        let c = candidate(0.5, 0.5, Hand::Right);
        rec.record_calculation(&c, 1000.0);
        rec.record_calculation(&c, 1100.0);

        let stroke = rec.clear(StrokeEndReason::ManualClear).expect("stroke returned");
        assert_eq!(stroke.reason, StrokeEndReason::ManualClear);
        assert_eq!(stroke.points.len(), 2);
    }

    #[test]
    fn test_dominant_hand_majority() {
        let mut points = Vec::new();
        for i in 0..5 {
            points.push(CalculationPoint {
                x: 0.5,
                y: 0.5,
                hand: if i < 3 { Hand::Left } else { Hand::Right },
                timestamp: i as f64,
            });
        }
        let stroke = FinalizedStroke {
            points,
            reason: StrokeEndReason::GestureEnded,
        };
        assert_eq!(stroke.dominant_hand(), Some(Hand::Left));
    }

    #[test]
    fn test_dominant_hand_tie_uses_last() {
        let points = vec![
            CalculationPoint { x: 0.5, y: 0.5, hand: Hand::Left, timestamp: 0.0 },
            CalculationPoint { x: 0.5, y: 0.5, hand: Hand::Right, timestamp: 1.0 },
        ];
        let stroke = FinalizedStroke {
            points,
            reason: StrokeEndReason::GestureEnded,
        };
        assert_eq!(stroke.dominant_hand(), Some(Hand::Right));
    }
}
