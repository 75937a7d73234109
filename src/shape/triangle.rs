use serde::Serialize;

use super::Point2;
use crate::config::TriangleConfig;
use crate::stroke::CalculationPoint;

/// 三角形として受理されたストロークの幾何情報
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriangleGeometry {
    /// ストローク順の3コーナー
    pub corners: [Point2; 3],
    pub corner_indices: [usize; 3],
    /// 各コーナーでの転回角（ラジアン）
    pub corner_angles: [f32; 3],
    pub side_lengths: [f32; 3],
    pub average_side: f32,
    pub area: f32,
    /// 始点・終点距離の平均辺長に対する比
    pub closure_ratio: f32,
}

/// 三角形判定の棄却結果
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum TriangleRejection {
    InsufficientPoints,
    SidesTooShort {
        min_side: f32,
    },
    TriangleNotClosed {
        closure_ratio: f32,
    },
    CornerCount {
        corner_count: usize,
    },
    CornerSpacing {
        corner_count: usize,
    },
    SideLengthVariance {
        min_side: f32,
        max_side: f32,
    },
    AreaTooSmall {
        area: f32,
    },
}

impl TriangleRejection {
    /// ログ・フィードバック用の安定した理由コード
    pub fn reason(&self) -> &'static str {
        match self {
            TriangleRejection::InsufficientPoints => "insufficient-points",
            TriangleRejection::SidesTooShort { .. } => "sides-too-short",
            TriangleRejection::TriangleNotClosed { .. } => "triangle-not-closed",
            TriangleRejection::CornerCount { .. } => "corner-count",
            TriangleRejection::CornerSpacing { .. } => "corner-spacing",
            TriangleRejection::SideLengthVariance { .. } => "side-length-variance",
            TriangleRejection::AreaTooSmall { .. } => "area-too-small",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CornerCandidate {
    index: usize,
    angle: f32,
}

fn distance_2d(a: &CalculationPoint, b: &CalculationPoint) -> f32 {
    (a.x - b.x).hypot(a.y - b.y)
}

fn path_length(points: &[CalculationPoint]) -> f32 {
    points
        .windows(2)
        .map(|pair| distance_2d(&pair[0], &pair[1]))
        .sum()
}

/// 巡回インデックス距離（ストロークの始点と終点は隣接とみなす）
fn cyclic_index_distance(a: usize, b: usize, total: usize) -> usize {
    let diff = a.abs_diff(b);
    diff.min(total - diff)
}

/// 頂点3点の符号なし面積（靴ひも公式）
fn polygon_area(corners: &[Point2; 3]) -> f32 {
    let [a, b, c] = corners;
    ((a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y)) / 2.0).abs()
}

/// 転回角の大きい候補から貪欲に、巡回距離の分離制約を満たす3点を選ぶ
fn select_corners(
    candidates: &[CornerCandidate],
    total: usize,
    min_separation: usize,
) -> Vec<CornerCandidate> {
    let mut sorted: Vec<CornerCandidate> = candidates.to_vec();
    sorted.sort_by(|a, b| b.angle.total_cmp(&a.angle));

    let mut chosen: Vec<CornerCandidate> = Vec::with_capacity(3);
    for corner in sorted {
        let too_close = chosen
            .iter()
            .any(|existing| cyclic_index_distance(existing.index, corner.index, total) < min_separation);
        if too_close {
            continue;
        }
        chosen.push(corner);
        if chosen.len() == 3 {
            break;
        }
    }

    if chosen.len() < 3 {
        return Vec::new();
    }
    chosen
}

/// ストロークの点列が三角形かどうかを判定する決定的な純粋関数
///
/// 閉合を確認したあと、先読み窓での進行方向の転回角からコーナー候補を
/// 検出し、近接候補は角度最大の1点にマージ、分離制約つきで3点を選んで
/// 辺長・面積の妥当性を検査する
pub fn analyze_triangle(
    points: &[CalculationPoint],
    config: &TriangleConfig,
) -> Result<TriangleGeometry, TriangleRejection> {
    if points.len() < config.min_points {
        return Err(TriangleRejection::InsufficientPoints);
    }

    let total_length = path_length(points);
    if !total_length.is_finite() || total_length <= 0.0 {
        return Err(TriangleRejection::SidesTooShort { min_side: 0.0 });
    }

    let closure_distance = distance_2d(&points[0], &points[points.len() - 1]);
    let average_candidate_side = total_length / 3.0;
    let closure_ratio = closure_distance / average_candidate_side;

    if closure_distance > average_candidate_side * config.max_closure_ratio {
        return Err(TriangleRejection::TriangleNotClosed { closure_ratio });
    }

    let min_separation =
        2.max((points.len() as f32 * config.corner_separation_ratio) as usize);
    let look_ahead = 3.max(points.len() / 20);

    // 先読み窓の両端ベクトルの転回角でコーナー候補を拾う
    // 窓内の近接候補は転回角が最大の1点に置き換える
    let mut candidates: Vec<CornerCandidate> = Vec::new();
    for i in look_ahead..points.len() - look_ahead {
        let prev = &points[i - look_ahead];
        let curr = &points[i];
        let next = &points[i + look_ahead];

        let v1 = (curr.x - prev.x, curr.y - prev.y);
        let v2 = (next.x - curr.x, next.y - curr.y);
        let len1 = v1.0.hypot(v1.1);
        let len2 = v2.0.hypot(v2.1);
        if len1 < 1e-4 || len2 < 1e-4 {
            continue;
        }

        let cos = ((v1.0 * v2.0 + v1.1 * v2.1) / (len1 * len2)).clamp(-1.0, 1.0);
        let turn_angle = cos.acos();

        if turn_angle < config.min_corner_angle {
            continue;
        }

        match candidates.last_mut() {
            Some(last) if i - last.index < min_separation => {
                if turn_angle > last.angle {
                    last.index = i;
                    last.angle = turn_angle;
                }
            }
            _ => candidates.push(CornerCandidate { index: i, angle: turn_angle }),
        }
    }

    if candidates.len() < 3 {
        return Err(TriangleRejection::CornerCount {
            corner_count: candidates.len(),
        });
    }

    let mut selected = select_corners(&candidates, points.len(), min_separation);
    if selected.len() != 3 {
        return Err(TriangleRejection::CornerSpacing {
            corner_count: candidates.len(),
        });
    }
    selected.sort_by_key(|c| c.index);

    let corner_indices = [selected[0].index, selected[1].index, selected[2].index];
    let corner_angles = [selected[0].angle, selected[1].angle, selected[2].angle];
    let corners = [
        Point2::new(points[corner_indices[0]].x, points[corner_indices[0]].y),
        Point2::new(points[corner_indices[1]].x, points[corner_indices[1]].y),
        Point2::new(points[corner_indices[2]].x, points[corner_indices[2]].y),
    ];

    let side_lengths = [
        corners[0].distance_to(&corners[1]),
        corners[1].distance_to(&corners[2]),
        corners[2].distance_to(&corners[0]),
    ];
    let min_side = side_lengths.iter().cloned().fold(f32::INFINITY, f32::min);
    let max_side = side_lengths.iter().cloned().fold(0.0f32, f32::max);

    if !min_side.is_finite() || min_side <= 0.0 || min_side < config.min_side {
        return Err(TriangleRejection::SidesTooShort { min_side });
    }

    if max_side / min_side > config.max_side_ratio {
        return Err(TriangleRejection::SideLengthVariance { min_side, max_side });
    }

    let area = polygon_area(&corners);
    if !area.is_finite() || area < config.min_area {
        return Err(TriangleRejection::AreaTooSmall { area });
    }

    Ok(TriangleGeometry {
        corners,
        corner_indices,
        corner_angles,
        side_lengths,
        average_side: (side_lengths[0] + side_lengths[1] + side_lengths[2]) / 3.0,
        area,
        closure_ratio,
    })
}


#[cfg(test)]
mod tests {
    use super::tests_support::{closed_triangle_points, polyline_points};
    use super::*;

    const A: (f32, f32) = (0.3, 0.7);
    const B: (f32, f32) = (0.7, 0.7);
    const C: (f32, f32) = (0.5, 0.35);

    #[test]
    fn test_closed_triangle_accepted() {
        let points = closed_triangle_points(A, B, C, 6);
        let geometry =
            analyze_triangle(&points, &TriangleConfig::default()).expect("triangle accepted");

        // コーナーは頂点の近傍にあるはず
        for (corner, expected) in geometry.corners.iter().zip([B, C, A]) {
            assert!(
                (corner.x - expected.0).abs() < 0.05 && (corner.y - expected.1).abs() < 0.05,
                "corner {:?} far from vertex {:?}",
                corner,
                expected
            );
        }
        assert!(geometry.area > 0.05, "area: {}", geometry.area);
        assert!(geometry.closure_ratio < 0.1);
        assert!(geometry.corner_angles.iter().all(|&a| a > 0.4));

        // ほぼ正三角形なので3辺は互いに等しい
        for side in geometry.side_lengths {
            assert!(
                (side - geometry.average_side).abs() < 0.005,
                "side {} deviates from average {}",
                side,
                geometry.average_side
            );
        }
    }

    #[test]
    fn test_insufficient_points() {
        let points = polyline_points(&[A, B], 4);
        let rejection = analyze_triangle(&points, &TriangleConfig::default()).unwrap_err();
        assert_eq!(rejection, TriangleRejection::InsufficientPoints);
    }

    /// 頂点から描き始めると始点・終点の頂点が検出されず2コーナーになる
    #[test]
    fn test_two_corners_rejected() {
        let points = polyline_points(&[A, B, C, A], 8);
        let rejection = analyze_triangle(&points, &TriangleConfig::default()).unwrap_err();
        match rejection {
            TriangleRejection::CornerCount { corner_count } => assert_eq!(corner_count, 2),
            other => panic!("expected corner-count, got {:?}", other),
        }
    }

    #[test]
    fn test_open_path_not_closed() {
        // V字: 始点と終点が遠い
        let points = polyline_points(&[(0.2, 0.8), (0.5, 0.2), (0.8, 0.8)], 8);
        let rejection = analyze_triangle(&points, &TriangleConfig::default()).unwrap_err();
        match rejection {
            TriangleRejection::TriangleNotClosed { closure_ratio } => {
                assert!(closure_ratio > 0.8, "closure ratio: {}", closure_ratio);
            }
            other => panic!("expected triangle-not-closed, got {:?}", other),
        }
        assert_eq!(rejection.reason(), "triangle-not-closed");
    }

    /// 一辺が極端に長い三角形は辺長比で棄却される
    #[test]
    fn test_sliver_side_ratio_rejected() {
        let a = (0.1, 0.5);
        let b = (0.7, 0.5);
        let c = (0.7, 0.6);
        let points = closed_triangle_points(a, b, c, 8);
        let rejection = analyze_triangle(&points, &TriangleConfig::default()).unwrap_err();
        match rejection {
            TriangleRejection::SideLengthVariance { min_side, max_side } => {
                assert!(max_side / min_side > 4.0);
            }
            other => panic!("expected side-length-variance, got {:?}", other),
        }
    }

    /// 小さすぎる三角形は最短辺で棄却される
    #[test]
    fn test_tiny_triangle_rejected() {
        let a = (0.50, 0.50);
        let b = (0.515, 0.50);
        let c = (0.5075, 0.487);
        let points = closed_triangle_points(a, b, c, 6);
        let rejection = analyze_triangle(&points, &TriangleConfig::default()).unwrap_err();
        match rejection {
            TriangleRejection::SidesTooShort { min_side } => {
                assert!(min_side < 0.02, "min side: {}", min_side);
            }
            other => panic!("expected sides-too-short, got {:?}", other),
        }
    }

    /// つぶれた三角形は面積で棄却される（コーナー角閾値を下げて面積検査まで通す）
    #[test]
    fn test_flat_triangle_area_rejected() {
        let a = (0.45, 0.5);
        let b = (0.55, 0.5);
        let c = (0.5, 0.508);
        let points = closed_triangle_points(a, b, c, 6);
        let config = TriangleConfig {
            min_corner_angle: 0.15,
            min_side: 0.01,
            max_side_ratio: 10.0,
            ..TriangleConfig::default()
        };
        let rejection = analyze_triangle(&points, &config).unwrap_err();
        match rejection {
            TriangleRejection::AreaTooSmall { area } => {
                assert!(area < 0.0005, "area: {}", area);
            }
            other => panic!("expected area-too-small, got {:?}", other),
        }
    }

    /// 同じ点列を2回判定しても結果が変わらない（決定的な純粋関数）
    #[test]
    fn test_classification_idempotent() {
        let config = TriangleConfig::default();

        let accepted = closed_triangle_points(A, B, C, 6);
        assert_eq!(
            analyze_triangle(&accepted, &config),
            analyze_triangle(&accepted, &config)
        );

        let rejected = polyline_points(&[A, B, C, A], 8);
        assert_eq!(
            analyze_triangle(&rejected, &config),
            analyze_triangle(&rejected, &config)
        );
    }

    #[test]
    fn test_cyclic_index_distance() {
        assert_eq!(cyclic_index_distance(2, 28, 30), 4);
        assert_eq!(cyclic_index_distance(5, 10, 30), 5);
        assert_eq!(cyclic_index_distance(0, 15, 30), 15);
    }

    #[test]
    fn test_polygon_area_shoelace() {
        let corners = [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
        ];
        assert!((polygon_area(&corners) - 0.5).abs() < 1e-6);
    }
}
