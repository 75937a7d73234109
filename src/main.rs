use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};

use kuusho::config::Config;
use kuusho::gesture::{DetectedHand, HandFrame};
use kuusho::session::{DrawingSession, SessionEvent};
use kuusho::shape::ShapeGeometry;

const CONFIG_PATH: &str = "config.toml";

/// 記録ファイルの1行（JSONL）
#[derive(Debug, Deserialize)]
struct RecordedFrame {
    /// フレーム時刻（ミリ秒）
    t: f64,
    hands: Vec<DetectedHand>,
}

fn main() -> Result<()> {
    let config = Config::load_or_default(CONFIG_PATH);

    let path = std::env::args()
        .nth(1)
        .context("使い方: kuusho <記録ファイル.jsonl>")?;

    println!("=== Kuusho - 記録リプレイ ===");
    println!("記録ファイル: {}", path);
    println!();

    let file = File::open(&path).with_context(|| format!("記録ファイルを開けません: {}", path))?;
    let reader = BufReader::new(file);

    let mut session = DrawingSession::new(config);
    let mut frame_count = 0usize;
    let mut last_t = 0.0;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let recorded: RecordedFrame = serde_json::from_str(&line)
            .with_context(|| format!("{}行目のパースに失敗", line_no + 1))?;

        let frame = HandFrame {
            hands: recorded.hands,
        };
        session.on_hand_frame(&frame);
        let events = session.update(recorded.t);
        report_events(&events, recorded.t);

        frame_count += 1;
        last_t = recorded.t;
    }

    // 記録終端でジェスチャーが続いていても確定させる
    session.on_hand_frame(&HandFrame::default());
    let events = session.update(last_t);
    report_events(&events, last_t);

    let export = session.export(last_t);
    println!();
    println!("--- リプレイ結果 ---");
    println!("フレーム数: {}", frame_count);
    println!("描画点: {}", export.point_count);
    println!("解析点: {}", export.calculation_point_count);
    println!("検出図形: {}", export.detection_count);
    for detection in &export.detections {
        match &detection.geometry {
            ShapeGeometry::Circle(circle) => {
                println!(
                    "  ⭕ 円 (直径 {:.1}% / 点数 {})",
                    circle.average_diameter * 100.0,
                    detection.point_count
                );
            }
            ShapeGeometry::Triangle(triangle) => {
                println!(
                    "  🔺 三角形 (平均辺長 {:.1}% / 点数 {})",
                    triangle.average_side * 100.0,
                    detection.point_count
                );
            }
        }
    }

    Ok(())
}

fn report_events(events: &[SessionEvent], t: f64) {
    for event in events {
        match event {
            SessionEvent::ShapeDetected(detection) => {
                let hand = detection
                    .hand
                    .map(|h| h.label())
                    .unwrap_or("unknown");
                match &detection.geometry {
                    ShapeGeometry::Circle(circle) => {
                        println!(
                            "[{:>8.0}ms] ⭕ 円を検出 ({}, 直径 ≈ {:.0}%)",
                            t,
                            hand,
                            circle.average_diameter * 100.0
                        );
                    }
                    ShapeGeometry::Triangle(triangle) => {
                        println!(
                            "[{:>8.0}ms] 🔺 三角形を検出 ({}, 辺長 ≈ {:.0}%)",
                            t,
                            hand,
                            triangle.average_side * 100.0
                        );
                    }
                }
            }
            SessionEvent::FeedbackCleared { hand } => {
                let hand = hand.map(|h| h.label()).unwrap_or("unknown");
                println!("[{:>8.0}ms] ストローク棄却 ({})", t, hand);
            }
            SessionEvent::Cleared { reason } => {
                println!("[{:>8.0}ms] バッファクリア ({:?})", t, reason);
            }
        }
    }
}
