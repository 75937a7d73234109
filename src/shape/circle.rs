use serde::Serialize;

use super::Point2;
use crate::config::CircleConfig;
use crate::stroke::CalculationPoint;

/// 円として受理されたストロークの幾何情報
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircleGeometry {
    pub center: Point2,
    pub radius: f32,
    /// 対向点ペアの平均距離（正規化座標）
    pub average_diameter: f32,
    /// 直径の相対偏差（最大値）
    pub diameter_deviation: f32,
    /// 径方向相対偏差のパーセンタイル代表値
    pub radial_deviation: f32,
    pub max_radial_deviation: f32,
    /// バウンディングボックスの縦横偏差
    pub aspect_deviation: f32,
    /// 始点・終点距離の平均直径に対する比
    pub closure_ratio: f32,
}

/// 円判定の棄却結果。段階ごとに計算済みの指標だけを持つ
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum CircleRejection {
    InsufficientPoints,
    InsufficientOpposites,
    DiameterSamplingFailed,
    DiameterTooSmall {
        average_diameter: f32,
    },
    DiameterVariance {
        deviation: f32,
        average_diameter: f32,
    },
    RadialVariance {
        radial_deviation: f32,
        max_radial_deviation: f32,
        radius: f32,
    },
    AspectRatio {
        aspect_deviation: f32,
    },
    NotClosed {
        closure_ratio: f32,
    },
}

impl CircleRejection {
    /// ログ・フィードバック用の安定した理由コード
    pub fn reason(&self) -> &'static str {
        match self {
            CircleRejection::InsufficientPoints => "insufficient-points",
            CircleRejection::InsufficientOpposites => "insufficient-opposites",
            CircleRejection::DiameterSamplingFailed => "diameter-sampling-failed",
            CircleRejection::DiameterTooSmall { .. } => "diameter-too-small",
            CircleRejection::DiameterVariance { .. } => "diameter-variance",
            CircleRejection::RadialVariance { .. } => "radial-variance",
            CircleRejection::AspectRatio { .. } => "aspect-ratio",
            CircleRejection::NotClosed { .. } => "not-closed",
        }
    }
}

fn distance_2d(a: &CalculationPoint, b: &CalculationPoint) -> f32 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// ストロークの点列が円かどうかを多段階で判定する決定的な純粋関数
///
/// 対向点ペアの距離を直径としてサンプリングし、直径のばらつき、
/// 中心からの径方向偏差、バウンディングボックスの縦横比、
/// 始点・終点の閉合を順に検査する。最初に失敗した段階で棄却を返す
pub fn analyze_circle(
    points: &[CalculationPoint],
    config: &CircleConfig,
) -> Result<CircleGeometry, CircleRejection> {
    if points.len() < config.min_points {
        return Err(CircleRejection::InsufficientPoints);
    }

    let total = points.len();
    let opposite_offset = total / 2;
    if opposite_offset < 2 {
        return Err(CircleRejection::InsufficientOpposites);
    }

    // 均等に分布したインデックスペア (i, i+offset) の距離を直径とみなす
    let samples = total.min(config.diameter_samples);
    let mut diameters = Vec::with_capacity(samples);
    let mut midpoints = Vec::with_capacity(samples);

    for i in 0..samples {
        let idx1 = i * total / samples;
        let idx2 = (idx1 + opposite_offset) % total;
        if idx1 == idx2 {
            continue;
        }
        let p1 = &points[idx1];
        let p2 = &points[idx2];
        diameters.push(distance_2d(p1, p2));
        midpoints.push(Point2::new((p1.x + p2.x) / 2.0, (p1.y + p2.y) / 2.0));
    }

    if diameters.is_empty() {
        return Err(CircleRejection::DiameterSamplingFailed);
    }

    let average_diameter = diameters.iter().sum::<f32>() / diameters.len() as f32;

    if average_diameter < config.min_diameter {
        return Err(CircleRejection::DiameterTooSmall { average_diameter });
    }

    let max_deviation = diameters
        .iter()
        .map(|d| (d - average_diameter).abs())
        .fold(0.0f32, f32::max);
    let diameter_deviation = max_deviation / average_diameter;

    if diameter_deviation > config.max_diameter_deviation {
        return Err(CircleRejection::DiameterVariance {
            deviation: diameter_deviation,
            average_diameter,
        });
    }

    // 中心: 対向ペアの中点の平均
    let mut center = Point2::default();
    for mp in &midpoints {
        center.x += mp.x;
        center.y += mp.y;
    }
    center.x /= midpoints.len() as f32;
    center.y /= midpoints.len() as f32;

    let radius = average_diameter / 2.0;

    // 径方向偏差はパーセンタイル値で評価する
    // 少数の外れ点（手ブレ）を許容し、系統的な非円形だけを弾く
    let mut radial_deviations: Vec<f32> = points
        .iter()
        .map(|p| {
            let d = (p.x - center.x).hypot(p.y - center.y);
            (d - radius).abs() / radius
        })
        .collect();
    radial_deviations.sort_by(|a, b| a.total_cmp(b));

    let last = radial_deviations.len() - 1;
    let percentile_index =
        ((last as f32 * config.radial_percentile).floor() as usize).min(last);
    let radial_deviation = radial_deviations[percentile_index];
    let max_radial_deviation = radial_deviations[last];

    if radial_deviation > config.max_radial_deviation {
        return Err(CircleRejection::RadialVariance {
            radial_deviation,
            max_radial_deviation,
            radius,
        });
    }

    // 楕円・直線の排除
    let (mut min_x, mut max_x) = (f32::INFINITY, f32::NEG_INFINITY);
    let (mut min_y, mut max_y) = (f32::INFINITY, f32::NEG_INFINITY);
    for p in points {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }
    let width = max_x - min_x;
    let height = max_y - min_y;
    let aspect_deviation = (width - height).abs() / width.max(height);

    if aspect_deviation > config.max_aspect_deviation {
        return Err(CircleRejection::AspectRatio { aspect_deviation });
    }

    let closure_distance = distance_2d(&points[0], &points[total - 1]);
    let closure_ratio = closure_distance / average_diameter;

    if closure_distance > average_diameter * config.max_closure_ratio {
        return Err(CircleRejection::NotClosed { closure_ratio });
    }

    Ok(CircleGeometry {
        center,
        radius,
        average_diameter,
        diameter_deviation,
        radial_deviation,
        max_radial_deviation,
        aspect_deviation,
        closure_ratio,
    })
}
