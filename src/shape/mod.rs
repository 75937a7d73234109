pub mod circle;
pub mod triangle;

use serde::Serialize;

use crate::hand::Hand;
use crate::stroke::StrokeEndReason;

pub use circle::{analyze_circle, CircleGeometry, CircleRejection};
pub use triangle::{analyze_triangle, TriangleGeometry, TriangleRejection};

/// 正規化座標上の2D点
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point2) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// 確定ストロークから検出された図形
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeDetection {
    #[serde(flatten)]
    pub geometry: ShapeGeometry,
    /// ストロークの主たる手
    pub hand: Option<Hand>,
    pub point_count: usize,
    /// 検出時刻（ミリ秒）
    pub detected_at: f64,
    /// ストロークが確定した契機
    pub end_reason: StrokeEndReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ShapeGeometry {
    Circle(CircleGeometry),
    Triangle(TriangleGeometry),
}

impl ShapeGeometry {
    pub fn kind(&self) -> &'static str {
        match self {
            ShapeGeometry::Circle(_) => "circle",
            ShapeGeometry::Triangle(_) => "triangle",
        }
    }
}
