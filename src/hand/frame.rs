use nalgebra::Vector3;

use super::landmark::{HandLandmarks, Landmark, LandmarkIndex};

/// 手のひら基準の座標系
///
/// 原点: 4本指MCP関節の重心（手のひら中心）
/// x軸: 人差し指MCP→小指MCP方向（lateral）
/// y軸: 手のひら中心→手首方向（クロス積で再直交化済み）
/// z軸: 手のひら法線
/// scale: 手のひら中心〜中指MCP距離（手の大きさの基準）
#[derive(Debug, Clone, Copy)]
pub struct HandCoordinateFrame {
    pub palm_center: Vector3<f32>,
    pub x_axis: Vector3<f32>,
    pub y_axis: Vector3<f32>,
    pub z_axis: Vector3<f32>,
    pub scale: f32,
}

/// scaleの下限。ゼロ除算の崩壊を防ぐ
const MIN_HAND_SCALE: f32 = 0.001;

fn to_vec(p: &Landmark) -> Vector3<f32> {
    Vector3::new(p.x, p.y, p.z)
}

fn normalize_or_zero(v: Vector3<f32>) -> Vector3<f32> {
    let len = v.norm();
    if len == 0.0 {
        Vector3::zeros()
    } else {
        v / len
    }
}

impl HandCoordinateFrame {
    /// ランドマークから座標系を構築。フレームごとに再計算し、保持しない
    pub fn build(landmarks: &HandLandmarks) -> Self {
        let wrist = to_vec(landmarks.get(LandmarkIndex::Wrist));
        let index_mcp = to_vec(landmarks.get(LandmarkIndex::IndexMcp));
        let middle_mcp = to_vec(landmarks.get(LandmarkIndex::MiddleMcp));
        let ring_mcp = to_vec(landmarks.get(LandmarkIndex::RingMcp));
        let pinky_mcp = to_vec(landmarks.get(LandmarkIndex::PinkyMcp));

        let palm_center = (index_mcp + middle_mcp + ring_mcp + pinky_mcp) / 4.0;

        let x_axis = normalize_or_zero(pinky_mcp - index_mcp);
        let y_raw = normalize_or_zero(wrist - palm_center);

        // クロス積で右手系の正規直交基底に再直交化
        let z_axis = normalize_or_zero(x_axis.cross(&y_raw));
        let y_axis = normalize_or_zero(z_axis.cross(&x_axis));

        let scale = (palm_center - middle_mcp).norm().max(MIN_HAND_SCALE);

        Self {
            palm_center,
            x_axis,
            y_axis,
            z_axis,
            scale,
        }
    }

    /// ランドマークを手のひら基準座標に変換
    pub fn to_frame_relative(&self, point: &Landmark) -> Vector3<f32> {
        let v = to_vec(point) - self.palm_center;
        Vector3::new(v.dot(&self.x_axis), v.dot(&self.y_axis), v.dot(&self.z_axis))
    }

    /// 手のひら中心からの3D距離
    pub fn distance_from_palm(&self, point: &Landmark) -> f32 {
        (to_vec(point) - self.palm_center).norm()
    }
}
