use serde::Serialize;

use crate::config::Config;
use crate::gesture::{GestureSummaryEntry, GestureTracker, HandFrame, SummaryCallback};
use crate::hand::Hand;
use crate::shape::{
    analyze_circle, analyze_triangle, ShapeDetection, ShapeGeometry,
};
use crate::stroke::{
    CalculationPoint, DrawingPoint, FinalizedStroke, StrokeEndReason, StrokeRecorder,
};

const DEFAULT_VIEWPORT: (f32, f32) = (640.0, 480.0);

/// セッションから消費側へ通知されるイベント
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum SessionEvent {
    /// ストロークが図形として受理された
    ShapeDetected(ShapeDetection),
    /// ストロークが棄却された（表示中のフィードバックを消す）
    FeedbackCleared { hand: Option<Hand> },
    /// 全バッファが破棄された
    Cleared { reason: StrokeEndReason },
}

/// 診断・保存用のスナップショット
#[derive(Debug, Clone, Serialize)]
pub struct DrawingExport {
    pub exported_at: f64,
    pub points: Vec<DrawingPoint>,
    pub calculation_points: Vec<CalculationPoint>,
    pub detections: Vec<ShapeDetection>,
    pub point_count: usize,
    pub calculation_point_count: usize,
    pub detection_count: usize,
    pub duration_ms: f64,
}

/// 描画セッションの駆動役
///
/// ジェスチャートラッカーとストローク記録器を束ね、フレームごとの
/// update で描画点の記録・ストローク確定・図形分類・自動クリアを行う。
/// トラッキング入力（on_hand_frame）と時間駆動（update）は別の呼び出しで、
/// 任意の順序の交互実行に耐える
pub struct DrawingSession {
    config: Config,
    tracker: GestureTracker,
    recorder: StrokeRecorder,
    detections: Vec<ShapeDetection>,
    viewport: (f32, f32),
    is_drawing: bool,
}

impl DrawingSession {
    pub fn new(config: Config) -> Self {
        let tracker = GestureTracker::new(config.gesture.clone());
        let recorder = StrokeRecorder::new(config.stroke.clone());
        Self {
            config,
            tracker,
            recorder,
            detections: Vec::new(),
            viewport: DEFAULT_VIEWPORT,
            is_drawing: false,
        }
    }

    /// キャンバス座標への変換に使う寸法
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.viewport = (width, height);
    }

    pub fn set_summary_callback(&mut self, callback: SummaryCallback) {
        self.tracker.set_summary_callback(callback);
    }

    /// トラッキング結果の取り込み（状態の全置き換え）
    pub fn on_hand_frame(&mut self, frame: &HandFrame) {
        self.tracker.on_frame(frame);
    }

    /// フレームごとの時間駆動処理
    ///
    /// ジェスチャー中なら描画点・解析点を記録し、ジェスチャーが解除された
    /// フレームでストロークを確定・分類する。最後に無操作タイムアウトを検査する
    pub fn update(&mut self, now: f64) -> Vec<SessionEvent> {
        let mut events = Vec::new();

        if self.tracker.is_fingers_together_active() {
            if let Some(candidate) = self.tracker.draw_candidate() {
                self.is_drawing = true;
                if let Some(stroke) = self.recorder.record_dot(&candidate, self.viewport, now) {
                    self.classify_stroke(stroke, now, &mut events);
                }
                self.recorder.record_calculation(&candidate, now);
            }
        } else if self.is_drawing {
            self.is_drawing = false;
            if let Some(stroke) = self.recorder.end_gesture() {
                self.classify_stroke(stroke, now, &mut events);
            }
        }

        if self.recorder.auto_clear_due(now) {
            if let Some(stroke) = self.recorder.clear(StrokeEndReason::Timeout) {
                self.classify_stroke(stroke, now, &mut events);
            }
            events.push(SessionEvent::Cleared {
                reason: StrokeEndReason::Timeout,
            });
        }

        events
    }

    /// 進行中のストロークを確定（分類を試みる）してから全バッファを破棄する
    pub fn clear(&mut self, now: f64) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        self.is_drawing = false;
        if let Some(stroke) = self.recorder.clear(StrokeEndReason::ManualClear) {
            self.classify_stroke(stroke, now, &mut events);
        }
        events.push(SessionEvent::Cleared {
            reason: StrokeEndReason::ManualClear,
        });
        events
    }

    /// 円→三角形の順に判定する。短すぎるストロークはノイズとして捨てる
    fn classify_stroke(&mut self, stroke: FinalizedStroke, now: f64, events: &mut Vec<SessionEvent>) {
        let hand = stroke.dominant_hand();

        if stroke.points.len() < self.config.circle.min_points {
            events.push(SessionEvent::FeedbackCleared { hand });
            return;
        }

        let geometry = match analyze_circle(&stroke.points, &self.config.circle) {
            Ok(circle) => ShapeGeometry::Circle(circle),
            Err(_) => match analyze_triangle(&stroke.points, &self.config.triangle) {
                Ok(triangle) => ShapeGeometry::Triangle(triangle),
                Err(_) => {
                    events.push(SessionEvent::FeedbackCleared { hand });
                    return;
                }
            },
        };

        let detection = ShapeDetection {
            geometry,
            hand,
            point_count: stroke.points.len(),
            detected_at: now,
            end_reason: stroke.reason,
        };
        self.detections.push(detection.clone());
        events.push(SessionEvent::ShapeDetected(detection));
    }

    pub fn gesture_summary(&self) -> Vec<GestureSummaryEntry> {
        self.tracker.summary()
    }

    pub fn detections(&self) -> &[ShapeDetection] {
        &self.detections
    }

    pub fn export(&self, now: f64) -> DrawingExport {
        let points = self.recorder.drawing_points().to_vec();
        let calculation_points = self.recorder.calculation_points().to_vec();
        DrawingExport {
            exported_at: now,
            point_count: points.len(),
            calculation_point_count: calculation_points.len(),
            detection_count: self.detections.len(),
            duration_ms: self.recorder.duration_ms(),
            points,
            calculation_points,
            detections: self.detections.clone(),
        }
    }
}
