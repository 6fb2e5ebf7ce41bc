//! 1エントリ分のPDFレポート（A4縦1ページ）
//!
//! 上からタイトル、画像（編集結果または識別対象の元画像）、本文、右下に地図。

use super::PdfQuality;
use crate::error::{LensError, Result};
use image::imageops::FilterType;
use photo_lens_common::layout::{
    build_report_fields, fit_centered, layout_report_lines, mm_to_pt, Rect, ReportLayout,
};
use photo_lens_common::{ImageData, ResultEntry, ResultPayload};
use printpdf::{
    BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, Point, Pt, RawImage, RawImageData,
    RawImageFormat, TextItem, XObjectId, XObjectTransform,
};
use std::path::Path;

const FONT: BuiltinFont = BuiltinFont::Helvetica;
const TITLE_SIZE_PT: f32 = 14.0;
const BODY_SIZE_PT: f32 = 9.0;
const MAP_MAX_WIDTH_PX: u32 = 600;

/// PDFを生成してファイルに保存
pub fn generate_pdf(
    entry: &ResultEntry,
    source_image: Option<&ImageData>,
    map_image: Option<&[u8]>,
    output_path: &Path,
    quality: PdfQuality,
) -> Result<()> {
    let bytes = render_pdf(entry, source_image, map_image, quality)?;
    std::fs::write(output_path, bytes)?;
    tracing::info!(path = %output_path.display(), %quality, "PDFを出力しました");
    Ok(())
}

/// PDFのバイト列を生成
pub fn render_pdf(
    entry: &ResultEntry,
    source_image: Option<&ImageData>,
    map_image: Option<&[u8]>,
    quality: PdfQuality,
) -> Result<Vec<u8>> {
    let layout = ReportLayout::a4();
    let title = report_title(entry);
    let mut doc = PdfDocument::new(&title);

    // 地図は補助情報なので読めなければ省略
    let map = map_image.and_then(|bytes| match decode_scaled(bytes, MAP_MAX_WIDTH_PX) {
        Ok(raw) => Some(raw),
        Err(e) => {
            tracing::debug!(error = %e, "地図画像を読み込めませんでした");
            None
        }
    });
    let has_map = map.is_some();

    let fields = build_report_fields(entry);
    let lines = layout_report_lines(&fields, layout.wrap_chars_for(has_map));

    let mut ops = Vec::new();

    let picture = match &entry.payload {
        ResultPayload::Edited(edited) => Some(&edited.image),
        ResultPayload::Classification(_) => source_image,
    };
    if let Some(picture) = picture {
        let raw = decode_scaled(&picture.bytes, quality.max_width())?;
        let area = layout.image_box(lines.len(), has_map);
        ops.push(place_image(&mut doc, &raw, area));
    }

    if let Some(raw) = &map {
        ops.push(place_image(&mut doc, raw, layout.map_box()));
    }

    ops.extend(text_ops(&title, layout.title_origin(), TITLE_SIZE_PT));
    for (index, line) in lines.iter().enumerate() {
        let origin = layout.line_origin(index, lines.len(), has_map);
        ops.extend(text_ops(line, origin, BODY_SIZE_PT));
    }

    let page = PdfPage::new(Mm(layout.page_width_mm), Mm(layout.page_height_mm), ops);
    let mut warnings = Vec::new();
    let bytes = doc
        .with_pages(vec![page])
        .save(&PdfSaveOptions::default(), &mut warnings);

    if !warnings.is_empty() {
        tracing::debug!(count = warnings.len(), "PDF生成時の警告");
    }
    if bytes.is_empty() {
        return Err(LensError::PdfGeneration("出力が空です".into()));
    }
    Ok(bytes)
}

fn report_title(entry: &ResultEntry) -> String {
    let kind = match &entry.payload {
        ResultPayload::Edited(_) => "Edited image",
        ResultPayload::Classification(_) => "Identification report",
    };
    format!("{} - {}", kind, entry.timestamp.format("%Y-%m-%d %H:%M"))
}

/// デコードして最大幅まで縮小し、RGB8で返す
fn decode_scaled(bytes: &[u8], max_width: u32) -> Result<RawImage> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| LensError::ImageDecode(format!("PDF用画像のデコード失敗: {}", e)))?;
    let decoded = if decoded.width() > max_width {
        decoded.resize(max_width, u32::MAX, FilterType::Triangle)
    } else {
        decoded
    };

    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(RawImage {
        pixels: RawImageData::U8(rgb.into_raw()),
        width: width as usize,
        height: height as usize,
        data_format: RawImageFormat::RGB8,
        tag: Vec::new(),
    })
}

/// 領域の中央にアスペクト比を保って配置
fn place_image(doc: &mut PdfDocument, raw: &RawImage, area: Rect) -> Op {
    let placed = fit_centered(raw.width as u32, raw.height as u32, area);
    let id: XObjectId = doc.add_image(raw);

    // dpi 72 で 1px = 1pt
    let scale_x = mm_to_pt(placed.width) / raw.width.max(1) as f32;
    let scale_y = mm_to_pt(placed.height) / raw.height.max(1) as f32;

    Op::UseXobject {
        id,
        transform: XObjectTransform {
            translate_x: Some(Pt(mm_to_pt(placed.x))),
            translate_y: Some(Pt(mm_to_pt(placed.y))),
            scale_x: Some(scale_x),
            scale_y: Some(scale_y),
            dpi: Some(72.0),
            ..Default::default()
        },
    }
}

fn text_ops(text: &str, (x_mm, y_mm): (f32, f32), size_pt: f32) -> Vec<Op> {
    vec![
        Op::StartTextSection,
        Op::SetTextCursor {
            pos: Point::new(Mm(x_mm), Mm(y_mm)),
        },
        Op::SetFontSizeBuiltinFont {
            size: Pt(size_pt),
            font: FONT,
        },
        Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(latin1_only(text))],
            font: FONT,
        },
        Op::EndTextSection,
    ]
}

/// 組み込みフォントで描けない文字を置き換える
fn latin1_only(text: &str) -> String {
    text.chars()
        .map(|c| if (c as u32) < 0x100 { c } else { '?' })
        .collect()
}
