use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub gesture: GestureConfig,
    #[serde(default)]
    pub stroke: StrokeConfig,
    #[serde(default)]
    pub circle: CircleConfig,
    #[serde(default)]
    pub triangle: TriangleConfig,
}

/// 指の伸展・接触判定の閾値
/// 経験的にチューニングされた値。変更すると検出感度が変わる
#[derive(Debug, Deserialize, Clone)]
pub struct GestureConfig {
    /// 指のPIP/DIP関節角度の閾値（度）
    #[serde(default = "default_finger_angle_deg")]
    pub finger_angle_deg: f32,
    /// 指の径方向伸展の閾値（手スケール正規化）
    #[serde(default = "default_finger_extension")]
    pub finger_extension: f32,
    /// 親指の関節角度の閾値（度）
    #[serde(default = "default_thumb_angle_deg")]
    pub thumb_angle_deg: f32,
    /// 親指の径方向伸展の閾値
    #[serde(default = "default_thumb_extension")]
    pub thumb_extension: f32,
    /// 親指の側方外転フォールバック閾値（座標系相対x）
    #[serde(default = "default_thumb_lateral")]
    pub thumb_lateral: f32,
    /// 人差し指・中指の接触距離閾値（tip/dip/pip/mcp、正規化座標）
    #[serde(default = "default_touch_tip")]
    pub touch_tip: f32,
    #[serde(default = "default_touch_dip")]
    pub touch_dip: f32,
    #[serde(default = "default_touch_pip")]
    pub touch_pip: f32,
    #[serde(default = "default_touch_mcp")]
    pub touch_mcp: f32,
    /// 接触判定に必要な関節ペア数（4ペア中）
    #[serde(default = "default_touch_required")]
    pub touch_required: usize,
}

fn default_finger_angle_deg() -> f32 { 160.0 }
fn default_finger_extension() -> f32 { 0.2 }
fn default_thumb_angle_deg() -> f32 { 150.0 }
fn default_thumb_extension() -> f32 { 0.15 }
fn default_thumb_lateral() -> f32 { 0.25 }
fn default_touch_tip() -> f32 { 0.05 }
fn default_touch_dip() -> f32 { 0.04 }
fn default_touch_pip() -> f32 { 0.04 }
fn default_touch_mcp() -> f32 { 0.06 }
fn default_touch_required() -> usize { 3 }

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            finger_angle_deg: default_finger_angle_deg(),
            finger_extension: default_finger_extension(),
            thumb_angle_deg: default_thumb_angle_deg(),
            thumb_extension: default_thumb_extension(),
            thumb_lateral: default_thumb_lateral(),
            touch_tip: default_touch_tip(),
            touch_dip: default_touch_dip(),
            touch_pip: default_touch_pip(),
            touch_mcp: default_touch_mcp(),
            touch_required: default_touch_required(),
        }
    }
}

/// ストローク記録のレート制限・分割閾値
#[derive(Debug, Deserialize, Clone)]
pub struct StrokeConfig {
    /// 描画点のコミット間隔（ミリ秒）
    #[serde(default = "default_dot_interval_ms")]
    pub dot_interval_ms: f64,
    /// 解析用サンプルのコミット間隔（ミリ秒）
    #[serde(default = "default_calculation_interval_ms")]
    pub calculation_interval_ms: f64,
    /// 描画点バッファの上限（古い点から破棄）
    #[serde(default = "default_max_draw_points")]
    pub max_draw_points: usize,
    /// 解析点バッファの上限
    #[serde(default = "default_max_calculation_points")]
    pub max_calculation_points: usize,
    /// 同一手の点間ギャップがこれを超えたらストローク分割（ミリ秒）
    #[serde(default = "default_line_break_ms")]
    pub line_break_ms: f64,
    /// 最終コミットからの無操作タイムアウト（ミリ秒）
    #[serde(default = "default_clear_timeout_ms")]
    pub clear_timeout_ms: f64,
}

fn default_dot_interval_ms() -> f64 { 20.0 }
fn default_calculation_interval_ms() -> f64 { 100.0 }
fn default_max_draw_points() -> usize { 6000 }
fn default_max_calculation_points() -> usize { 1200 }
fn default_line_break_ms() -> f64 { 400.0 }
fn default_clear_timeout_ms() -> f64 { 4000.0 }

impl Default for StrokeConfig {
    fn default() -> Self {
        Self {
            dot_interval_ms: default_dot_interval_ms(),
            calculation_interval_ms: default_calculation_interval_ms(),
            max_draw_points: default_max_draw_points(),
            max_calculation_points: default_max_calculation_points(),
            line_break_ms: default_line_break_ms(),
            clear_timeout_ms: default_clear_timeout_ms(),
        }
    }
}

/// 円判定の許容値
#[derive(Debug, Deserialize, Clone)]
pub struct CircleConfig {
    /// 判定に必要な最小点数（これ未満のストロークはノイズ扱い）
    #[serde(default = "default_min_circle_points")]
    pub min_points: usize,
    /// 直径サンプルペアの最大数
    #[serde(default = "default_diameter_samples")]
    pub diameter_samples: usize,
    /// 平均直径の下限（正規化座標）
    #[serde(default = "default_min_diameter")]
    pub min_diameter: f32,
    /// 直径の相対偏差の上限
    #[serde(default = "default_max_diameter_deviation")]
    pub max_diameter_deviation: f32,
    /// 径方向相対偏差の上限（パーセンタイル値に適用）
    #[serde(default = "default_max_radial_deviation")]
    pub max_radial_deviation: f32,
    /// 径方向偏差の代表値に使うパーセンタイル
    /// 少数の外れ点（手ブレ）を許容しつつ系統的な非円形は弾く
    #[serde(default = "default_radial_percentile")]
    pub radial_percentile: f32,
    /// バウンディングボックスの縦横偏差の上限（楕円・直線の排除）
    #[serde(default = "default_max_aspect_deviation")]
    pub max_aspect_deviation: f32,
    /// 始点・終点距離の上限（平均直径に対する比）
    #[serde(default = "default_max_closure_ratio")]
    pub max_closure_ratio: f32,
}

fn default_min_circle_points() -> usize { 10 }
fn default_diameter_samples() -> usize { 36 }
fn default_min_diameter() -> f32 { 0.035 }
fn default_max_diameter_deviation() -> f32 { 0.25 }
fn default_max_radial_deviation() -> f32 { 0.4 }
fn default_radial_percentile() -> f32 { 0.9 }
fn default_max_aspect_deviation() -> f32 { 0.35 }
fn default_max_closure_ratio() -> f32 { 0.6 }

impl Default for CircleConfig {
    fn default() -> Self {
        Self {
            min_points: default_min_circle_points(),
            diameter_samples: default_diameter_samples(),
            min_diameter: default_min_diameter(),
            max_diameter_deviation: default_max_diameter_deviation(),
            max_radial_deviation: default_max_radial_deviation(),
            radial_percentile: default_radial_percentile(),
            max_aspect_deviation: default_max_aspect_deviation(),
            max_closure_ratio: default_max_closure_ratio(),
        }
    }
}

/// 三角形判定の許容値
#[derive(Debug, Deserialize, Clone)]
pub struct TriangleConfig {
    #[serde(default = "default_min_triangle_points")]
    pub min_points: usize,
    /// コーナー候補とみなす転回角の下限（ラジアン、約23°）
    #[serde(default = "default_min_corner_angle")]
    pub min_corner_angle: f32,
    /// コーナー間の最小インデックス間隔（点数に対する比）
    #[serde(default = "default_corner_separation_ratio")]
    pub corner_separation_ratio: f32,
    /// 最短辺の下限（正規化座標）
    #[serde(default = "default_min_side")]
    pub min_side: f32,
    /// 最長辺/最短辺の上限（細長い三角形の排除）
    #[serde(default = "default_max_side_ratio")]
    pub max_side_ratio: f32,
    /// 面積の下限（つぶれた三角形の排除）
    #[serde(default = "default_min_area")]
    pub min_area: f32,
    /// 始点・終点距離の上限（平均辺長に対する比）
    #[serde(default = "default_triangle_closure_ratio")]
    pub max_closure_ratio: f32,
}

fn default_min_triangle_points() -> usize { 6 }
fn default_min_corner_angle() -> f32 { 0.4 }
fn default_corner_separation_ratio() -> f32 { 0.15 }
fn default_min_side() -> f32 { 0.02 }
fn default_max_side_ratio() -> f32 { 4.0 }
fn default_min_area() -> f32 { 0.0005 }
fn default_triangle_closure_ratio() -> f32 { 0.8 }

impl Default for TriangleConfig {
    fn default() -> Self {
        Self {
            min_points: default_min_triangle_points(),
            min_corner_angle: default_min_corner_angle(),
            corner_separation_ratio: default_corner_separation_ratio(),
            min_side: default_min_side(),
            max_side_ratio: default_max_side_ratio(),
            min_area: default_min_area(),
            max_closure_ratio: default_triangle_closure_ratio(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// 設定ファイルがなければデフォルト値で起動
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load(path).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values_preserved() {
        let config = Config::default();
        assert_eq!(config.gesture.finger_angle_deg, 160.0);
        assert_eq!(config.gesture.touch_required, 3);
        assert_eq!(config.stroke.dot_interval_ms, 20.0);
        assert_eq!(config.stroke.line_break_ms, 400.0);
        assert_eq!(config.stroke.clear_timeout_ms, 4000.0);
        assert_eq!(config.circle.min_points, 10);
        assert_eq!(config.circle.radial_percentile, 0.9);
        assert_eq!(config.triangle.min_corner_angle, 0.4);
        assert_eq!(config.triangle.max_side_ratio, 4.0);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [circle]
            min_diameter = 0.05
            "#,
        )
        .unwrap();
        assert_eq!(config.circle.min_diameter, 0.05);
        assert_eq!(config.circle.max_aspect_deviation, 0.35);
        assert_eq!(config.stroke.max_draw_points, 6000);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.circle.min_points, Config::default().circle.min_points);
    }
}
