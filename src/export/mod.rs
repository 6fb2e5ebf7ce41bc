pub mod map;
pub mod pdf;

use crate::capture;
use crate::error::{LensError, Result};
use photo_lens_common::{ImageData, ResultEntry, ResultPayload};
use std::path::{Path, PathBuf};

/// 編集画像の既定ファイル名（拡張子なし）
pub const EDITED_IMAGE_STEM: &str = "edited-image";

/// ディレクトリ指定なら `{stem}.{extension}` を付ける
pub fn output_path_for(output: &Path, stem: &str, extension: &str) -> PathBuf {
    if output.is_dir() || output.extension().is_none() {
        output.join(format!("{}.{}", stem, extension))
    } else {
        output.to_path_buf()
    }
}

/// 編集画像を保存する
///
/// 識別結果には保存する画像が無いので `NothingToExport`
pub fn save_image(entry: &ResultEntry, output: &Path) -> Result<PathBuf> {
    let edited = entry
        .edited_image()
        .ok_or_else(|| LensError::NothingToExport(entry.payload.label().to_string()))?;

    let path = output_path_for(output, EDITED_IMAGE_STEM, edited.image.extension());
    ensure_parent(&path)?;
    std::fs::write(&path, &edited.image.bytes)?;

    tracing::info!(path = %path.display(), size = edited.image.bytes.len(), "画像を保存しました");
    Ok(path)
}

/// エントリをJSONで書き出す
pub fn save_json(entry: &ResultEntry, output: &Path) -> Result<PathBuf> {
    let path = output_path_for(output, "result", "json");
    ensure_parent(&path)?;
    let json = serde_json::to_string_pretty(entry)?;
    std::fs::write(&path, json)?;
    Ok(path)
}

/// PDFレポートを出力する
///
/// 識別結果には元画像を載せる。地図はキーがあり取得できた場合だけ。
pub async fn export_report(
    entry: &ResultEntry,
    maps_api_key: Option<&str>,
    output: &Path,
    quality: PdfQuality,
) -> Result<PathBuf> {
    let path = output_path_for(output, "report", "pdf");
    ensure_parent(&path)?;

    let source = match entry.payload {
        ResultPayload::Classification(_) => load_source_image(entry),
        ResultPayload::Edited(_) => None,
    };
    let http = reqwest::Client::new();
    let map = map::fetch_map_or_none(&http, entry.location, maps_api_key).await;

    pdf::generate_pdf(entry, source.as_ref(), map.as_deref(), &path, quality)?;
    Ok(path)
}

/// エントリの入力画像を読み直す。消えていれば None
pub fn load_source_image(entry: &ResultEntry) -> Option<ImageData> {
    match capture::load_file(Path::new(&entry.source_image_ref)) {
        Ok(selected) => Some(selected.image),
        Err(e) => {
            tracing::debug!(source = %entry.source_image_ref, error = %e, "元画像を読み込めませんでした");
            None
        }
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// PDF画像品質設定
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PdfQuality {
    /// 高品質: 1400px
    High,
    /// 中品質: 800px（デフォルト）
    #[default]
    Medium,
    /// 低品質: 500px
    Low,
}

impl PdfQuality {
    /// 最大ピクセル幅
    pub fn max_width(&self) -> u32 {
        match self {
            PdfQuality::High => 1400,
            PdfQuality::Medium => 800,
            PdfQuality::Low => 500,
        }
    }
}

impl std::str::FromStr for PdfQuality {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "high" | "h" => Ok(PdfQuality::High),
            "medium" | "med" | "m" => Ok(PdfQuality::Medium),
            "low" | "l" => Ok(PdfQuality::Low),
            _ => Err(format!("Unknown quality: {}. Use high, medium, or low", s)),
        }
    }
}

impl std::fmt::Display for PdfQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PdfQuality::High => write!(f, "high"),
            PdfQuality::Medium => write!(f, "medium"),
            PdfQuality::Low => write!(f, "low"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_for_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = output_path_for(dir.path(), EDITED_IMAGE_STEM, "webp");
        assert_eq!(path, dir.path().join("edited-image.webp"));
    }

    #[test]
    fn test_output_path_for_file() {
        let path = output_path_for(Path::new("out/report.pdf"), "report", "pdf");
        assert_eq!(path, PathBuf::from("out/report.pdf"));
    }

    #[test]
    fn test_pdf_quality_parse() {
        assert_eq!("HIGH".parse::<PdfQuality>().unwrap(), PdfQuality::High);
        assert_eq!("m".parse::<PdfQuality>().unwrap(), PdfQuality::Medium);
        assert!("ultra".parse::<PdfQuality>().is_err());
        assert_eq!(PdfQuality::Low.to_string(), "low");
        assert!(PdfQuality::High.max_width() > PdfQuality::Low.max_width());
    }
}
