//! 画像保存・JSON・PDF出力の統合テスト

use photo_lens::error::LensError;
use photo_lens::export::{self, pdf, PdfQuality};
use photo_lens_common::{
    ClassificationRecord, ClassificationTag, EditedImage, GeoPoint, ImageData, ResultEntry,
    ResultPayload, ThreatLevel,
};
use tempfile::tempdir;

fn tiny_png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(8, 6, image::Rgb([10, 120, 200]));
    let mut bytes = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("PNGエンコード失敗");
    bytes
}

fn edited_entry(mime_type: &str) -> ResultEntry {
    ResultEntry::new(
        ResultPayload::Edited(EditedImage {
            image: ImageData::new(mime_type, tiny_png()),
            caption: Some("Applied a retro filter".to_string()),
        }),
        "input.png",
        None,
    )
}

fn report_entry(source: &str) -> ResultEntry {
    ResultEntry::new(
        ResultPayload::Classification(ClassificationRecord {
            model: "Saab JAS 39 Gripen".to_string(),
            origin: "Sweden".to_string(),
            classification: ClassificationTag::Friendly,
            confidence: 0.76,
            details: "Canard delta configuration with a single engine.".to_string(),
            asset_type: "Multirole fighter".to_string(),
            similar_assets: Some(vec!["Dassault Rafale".to_string()]),
            threat_level: Some(ThreatLevel::Low),
            capabilities: Some("Short runway operations".to_string()),
        }),
        source,
        GeoPoint::new(59.33, 18.06).ok(),
    )
}

#[test]
fn test_save_image_into_directory() {
    let dir = tempdir().expect("Failed to create temp dir");

    let path = export::save_image(&edited_entry("image/png"), dir.path()).unwrap();

    assert_eq!(path, dir.path().join("edited-image.png"));
    assert_eq!(std::fs::read(&path).unwrap(), tiny_png());
}

#[test]
fn test_save_image_extension_from_mime() {
    let dir = tempdir().expect("Failed to create temp dir");

    let path = export::save_image(&edited_entry("image/webp"), dir.path()).unwrap();
    assert_eq!(path.file_name().unwrap(), "edited-image.webp");

    let path = export::save_image(&edited_entry("application"), &dir.path().join("sub")).unwrap();
    assert_eq!(path, dir.path().join("sub").join("edited-image.png"));
}

#[test]
fn test_save_image_to_explicit_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    let target = dir.path().join("result.png");

    let path = export::save_image(&edited_entry("image/png"), &target).unwrap();
    assert_eq!(path, target);
    assert!(target.exists());
}

#[test]
fn test_save_image_for_report_is_error() {
    let dir = tempdir().expect("Failed to create temp dir");

    let result = export::save_image(&report_entry("jet.jpg"), dir.path());
    assert!(matches!(result, Err(LensError::NothingToExport(_))));
}

#[test]
fn test_save_json_roundtrip() {
    let dir = tempdir().expect("Failed to create temp dir");
    let entry = report_entry("jet.jpg");

    let path = export::save_json(&entry, dir.path()).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    let restored: ResultEntry = serde_json::from_str(&content).unwrap();

    assert_eq!(restored, entry);
    assert!(content.contains("\"kind\": \"classification\""));
}

#[test]
fn test_pdf_quality_options() {
    let dir = tempdir().expect("Failed to create temp dir");
    let entry = edited_entry("image/png");

    for quality in [PdfQuality::Low, PdfQuality::Medium, PdfQuality::High] {
        let output_path = dir.path().join(format!("test_{}.pdf", quality));

        let result = pdf::generate_pdf(&entry, None, None, &output_path, quality);

        assert!(result.is_ok(), "PDF生成({})に失敗: {:?}", quality, result.err());
        let metadata = std::fs::metadata(&output_path).expect("ファイルメタデータ取得失敗");
        assert!(metadata.len() > 0, "PDFファイル({})が空", quality);
    }
}

#[tokio::test]
async fn test_export_report_reads_source_image() {
    let dir = tempdir().expect("Failed to create temp dir");
    let source = dir.path().join("jet.png");
    std::fs::write(&source, tiny_png()).unwrap();
    let entry = report_entry(&source.display().to_string());

    assert!(export::load_source_image(&entry).is_some());

    // 地図キーなし: 地図は省略される
    let path = export::export_report(&entry, None, dir.path(), PdfQuality::Low)
        .await
        .unwrap();

    assert_eq!(path, dir.path().join("report.pdf"));
    let bytes = std::fs::read(&path).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_export_report_with_missing_source() {
    let dir = tempdir().expect("Failed to create temp dir");
    let entry = report_entry("/nonexistent/jet.png");

    assert!(export::load_source_image(&entry).is_none());
    let result = export::export_report(&entry, None, &dir.path().join("out.pdf"), PdfQuality::Low).await;
    assert!(result.is_ok(), "元画像が無くてもPDFは出力される: {:?}", result.err());
}
