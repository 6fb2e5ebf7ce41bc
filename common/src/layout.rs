//! レポートPDFのレイアウト計算
//!
//! A4縦・余白10mm。上から タイトル / 画像 / レポート本文 の順に配置し、
//! 画像は残りの領域に縦横比を保って中央寄せで収める。
//! 座標はPDFに合わせて左下原点、単位はmm。

use crate::types::{ResultEntry, ResultPayload};

pub const A4_WIDTH_MM: f32 = 210.0;
pub const A4_HEIGHT_MM: f32 = 297.0;
pub const MARGIN_MM: f32 = 10.0;

/// mm → pt
pub fn mm_to_pt(mm: f32) -> f32 {
    mm * 72.0 / 25.4
}

/// 矩形（左下原点、mm）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// 画像を領域内に縦横比を保って最大化し、中央に置く
pub fn fit_centered(image_width: u32, image_height: u32, area: Rect) -> Rect {
    let (cx, cy) = area.center();
    if image_width == 0 || image_height == 0 || area.width <= 0.0 || area.height <= 0.0 {
        return Rect { x: cx, y: cy, width: 0.0, height: 0.0 };
    }

    let scale = (area.width / image_width as f32).min(area.height / image_height as f32);
    let width = image_width as f32 * scale;
    let height = image_height as f32 * scale;

    Rect {
        x: cx - width / 2.0,
        y: cy - height / 2.0,
        width,
        height,
    }
}

/// レポートページの寸法
#[derive(Debug, Clone)]
pub struct ReportLayout {
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    pub margin_mm: f32,
    pub title_height_mm: f32,
    pub line_height_mm: f32,
    /// 画像と本文の間隔
    pub gap_mm: f32,
    pub map_width_mm: f32,
    pub map_height_mm: f32,
    /// 本文1行あたりの最大文字数
    pub wrap_chars: usize,
}

impl ReportLayout {
    pub fn a4() -> Self {
        Self {
            page_width_mm: A4_WIDTH_MM,
            page_height_mm: A4_HEIGHT_MM,
            margin_mm: MARGIN_MM,
            title_height_mm: 12.0,
            line_height_mm: 5.5,
            gap_mm: 4.0,
            map_width_mm: 60.0,
            map_height_mm: 40.0,
            wrap_chars: 72,
        }
    }

    /// 余白を除いた領域
    pub fn content_box(&self) -> Rect {
        Rect {
            x: self.margin_mm,
            y: self.margin_mm,
            width: self.page_width_mm - self.margin_mm * 2.0,
            height: self.page_height_mm - self.margin_mm * 2.0,
        }
    }

    /// 本文ブロックの高さ（地図があれば地図の高さ以上）
    pub fn text_block_height(&self, lines: usize, has_map: bool) -> f32 {
        let text = lines as f32 * self.line_height_mm;
        if has_map {
            text.max(self.map_height_mm)
        } else {
            text
        }
    }

    /// 画像を配置できる領域
    pub fn image_box(&self, lines: usize, has_map: bool) -> Rect {
        let content = self.content_box();
        let text_height = self.text_block_height(lines, has_map);
        let bottom = if text_height > 0.0 {
            content.y + text_height + self.gap_mm
        } else {
            content.y
        };
        let top = content.y + content.height - self.title_height_mm;
        Rect {
            x: content.x,
            y: bottom,
            width: content.width,
            height: (top - bottom).max(0.0),
        }
    }

    /// タイトルのベースライン
    pub fn title_origin(&self) -> (f32, f32) {
        let content = self.content_box();
        (content.x, content.y + content.height - self.title_height_mm + 4.0)
    }

    /// 本文 i 行目のベースライン
    pub fn line_origin(&self, index: usize, lines: usize, has_map: bool) -> (f32, f32) {
        let content = self.content_box();
        let top = content.y + self.text_block_height(lines, has_map);
        (content.x, top - (index + 1) as f32 * self.line_height_mm)
    }

    /// 地図サムネイル（本文ブロックの右下）
    pub fn map_box(&self) -> Rect {
        let content = self.content_box();
        Rect {
            x: content.x + content.width - self.map_width_mm,
            y: content.y,
            width: self.map_width_mm,
            height: self.map_height_mm,
        }
    }

    /// 地図と重ならない本文の折り返し文字数
    pub fn wrap_chars_for(&self, has_map: bool) -> usize {
        if has_map {
            let ratio = (self.content_box().width - self.map_width_mm - self.gap_mm)
                / self.content_box().width;
            ((self.wrap_chars as f32 * ratio) as usize).max(16)
        } else {
            self.wrap_chars
        }
    }
}

impl Default for ReportLayout {
    fn default() -> Self {
        Self::a4()
    }
}

/// レポート本文の1項目
#[derive(Debug, Clone, PartialEq)]
pub struct ReportField {
    pub label: &'static str,
    pub value: String,
}

/// エントリからレポート本文の項目を構築
pub fn build_report_fields(entry: &ResultEntry) -> Vec<ReportField> {
    let mut fields = Vec::new();
    let mut push = |label: &'static str, value: String| {
        fields.push(ReportField { label, value });
    };

    match &entry.payload {
        ResultPayload::Classification(record) => {
            push("Model", or_dash(&record.model));
            push("Origin", or_dash(&record.origin));
            push("Classification", record.classification.to_string());
            push("Confidence", format!("{:.0}%", record.confidence * 100.0));
            push("Asset type", or_dash(&record.asset_type));
            if let Some(level) = record.threat_level {
                push("Threat level", level.to_string());
            }
            if let Some(similar) = &record.similar_assets {
                push("Similar assets", similar.join(", "));
            }
            if let Some(capabilities) = &record.capabilities {
                push("Capabilities", capabilities.clone());
            }
            push("Details", or_dash(&record.details));
        }
        ResultPayload::Edited(edited) => {
            if let Some(caption) = &edited.caption {
                push("AI says", caption.clone());
            }
            push("Format", edited.image.mime_type.clone());
        }
    }

    push("Source", or_dash(&entry.source_image_ref));
    push("Captured", entry.timestamp.format("%Y/%m/%d %H:%M").to_string());
    push(
        "Location",
        entry
            .location
            .map(|p| p.to_string())
            .unwrap_or_else(|| "unknown".to_string()),
    );

    fields
}

/// "Label: value" を折り返した行に展開
pub fn layout_report_lines(fields: &[ReportField], wrap_chars: usize) -> Vec<String> {
    fields
        .iter()
        .flat_map(|f| wrap_text(&format!("{}: {}", f.label, f.value), wrap_chars))
        .collect()
}

/// 単語単位で折り返す（長すぎる単語は文字数で分割）
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > max_chars {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let rest = word.split_off(max_chars);
                lines.push(word.into_iter().collect());
                word = rest;
            }

            let needed = if current.is_empty() {
                word.len()
            } else {
                current.chars().count() + 1 + word.len()
            };
            if needed > max_chars && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.extend(word);
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }

    lines
}

fn or_dash(value: &str) -> String {
    if value.trim().is_empty() {
        "-".to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        ClassificationRecord, ClassificationTag, EditedImage, GeoPoint, ImageData, ThreatLevel,
    };

    fn area() -> Rect {
        Rect { x: 10.0, y: 10.0, width: 190.0, height: 277.0 }
    }

    #[test]
    fn test_mm_to_pt() {
        assert!((mm_to_pt(25.4) - 72.0).abs() < 1e-4);
        assert!((mm_to_pt(A4_WIDTH_MM) - 595.276).abs() < 0.01);
    }

    #[test]
    fn test_fit_centered_wide_image() {
        let rect = fit_centered(2000, 1000, area());
        assert!((rect.width - 190.0).abs() < 1e-3);
        assert!((rect.height - 95.0).abs() < 1e-3);
        assert!((rect.x - 10.0).abs() < 1e-3);
        let (cx, cy) = rect.center();
        let (ax, ay) = area().center();
        assert!((cx - ax).abs() < 1e-3);
        assert!((cy - ay).abs() < 1e-3);
    }

    #[test]
    fn test_fit_centered_tall_image() {
        let rect = fit_centered(100, 1000, area());
        assert!((rect.height - 277.0).abs() < 1e-3);
        assert!((rect.width - 27.7).abs() < 1e-3);
        assert!((rect.y - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_fit_centered_upscales_small_image() {
        let rect = fit_centered(19, 10, area());
        assert!((rect.width - 190.0).abs() < 1e-3);
    }

    #[test]
    fn test_fit_centered_degenerate() {
        let rect = fit_centered(0, 100, area());
        assert_eq!(rect.width, 0.0);
        assert_eq!(rect.height, 0.0);
    }

    #[test]
    fn test_image_box_without_text_uses_margin() {
        let layout = ReportLayout::a4();
        let image_box = layout.image_box(0, false);
        assert_eq!(image_box.x, MARGIN_MM);
        assert_eq!(image_box.y, MARGIN_MM);
        assert_eq!(image_box.width, A4_WIDTH_MM - 2.0 * MARGIN_MM);
        assert!((image_box.height - (A4_HEIGHT_MM - 2.0 * MARGIN_MM - layout.title_height_mm)).abs() < 1e-3);
    }

    #[test]
    fn test_image_box_leaves_room_for_text_and_map() {
        let layout = ReportLayout::a4();
        let with_text = layout.image_box(10, false);
        assert!((with_text.y - (MARGIN_MM + 55.0 + layout.gap_mm)).abs() < 1e-3);

        // 2行でも地図の高さを確保する
        let with_map = layout.image_box(2, true);
        assert!((with_map.y - (MARGIN_MM + layout.map_height_mm + layout.gap_mm)).abs() < 1e-3);
        assert!(layout.map_box().y >= MARGIN_MM);
    }

    #[test]
    fn test_line_origins_descend() {
        let layout = ReportLayout::a4();
        let (_, first) = layout.line_origin(0, 3, false);
        let (_, last) = layout.line_origin(2, 3, false);
        assert!(first > last);
        assert!((last - MARGIN_MM).abs() < 1e-3);
    }

    #[test]
    fn test_wrap_text() {
        let lines = wrap_text("the quick brown fox jumps", 10);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps"]);

        let long = wrap_text("abcdefghijkl", 5);
        assert_eq!(long, vec!["abcde", "fghij", "kl"]);

        assert!(wrap_text("", 10).is_empty());
        assert_eq!(wrap_text("a\nb", 10), vec!["a", "b"]);
    }

    #[test]
    fn test_build_report_fields_classification() {
        let entry = ResultEntry::new(
            ResultPayload::Classification(ClassificationRecord {
                model: "Leopard 2".to_string(),
                origin: "Germany".to_string(),
                classification: ClassificationTag::Friendly,
                confidence: 0.92,
                details: "Main battle tank".to_string(),
                asset_type: "MBT".to_string(),
                threat_level: Some(ThreatLevel::Medium),
                similar_assets: Some(vec!["M1 Abrams".to_string()]),
                capabilities: None,
            }),
            "tank.jpg",
            Some(GeoPoint::new(52.5, 13.4).unwrap()),
        );

        let fields = build_report_fields(&entry);
        let get = |label: &str| {
            fields
                .iter()
                .find(|f| f.label == label)
                .map(|f| f.value.clone())
        };
        assert_eq!(get("Model").as_deref(), Some("Leopard 2"));
        assert_eq!(get("Classification").as_deref(), Some("FRIENDLY"));
        assert_eq!(get("Confidence").as_deref(), Some("92%"));
        assert_eq!(get("Threat level").as_deref(), Some("MEDIUM"));
        assert_eq!(get("Similar assets").as_deref(), Some("M1 Abrams"));
        assert_eq!(get("Capabilities"), None);
        assert_eq!(get("Location").as_deref(), Some("52.500000,13.400000"));
    }

    #[test]
    fn test_build_report_fields_edited() {
        let entry = ResultEntry::new(
            ResultPayload::Edited(EditedImage {
                image: ImageData::new("image/png", vec![]),
                caption: Some("Added a hat".to_string()),
            }),
            "",
            None,
        );

        let fields = build_report_fields(&entry);
        assert_eq!(fields[0].label, "AI says");
        assert_eq!(fields[0].value, "Added a hat");
        let source = fields.iter().find(|f| f.label == "Source").unwrap();
        assert_eq!(source.value, "-");
        let location = fields.iter().find(|f| f.label == "Location").unwrap();
        assert_eq!(location.value, "unknown");
    }

    #[test]
    fn test_layout_report_lines_wraps_each_field() {
        let fields = vec![
            ReportField { label: "Model", value: "X".to_string() },
            ReportField { label: "Details", value: "one two three four".to_string() },
        ];
        let lines = layout_report_lines(&fields, 12);
        assert_eq!(lines, vec!["Model: X", "Details: one", "two three", "four"]);
    }
}
