//! 画像入力（ファイル選択・カメラ）
//!
//! どちらの経路も `SelectedImage`（バイト列 + MIMEタイプ + 表示用の参照）に揃える。

mod camera;

pub use camera::{next_jpeg_frame, CameraSession};

use crate::error::{LensError, Result};
use image::ImageFormat;
use photo_lens_common::{ImageData, ResultEntry};
use std::path::{Path, PathBuf};

/// 選択された入力画像
#[derive(Debug, Clone)]
pub struct SelectedImage {
    pub image: ImageData,
    /// 画像ファイルのパス（履歴にはこの参照だけを残す）
    pub path: PathBuf,
}

impl SelectedImage {
    pub fn source_ref(&self) -> String {
        self.path.display().to_string()
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// 画像ファイルを読み込む
///
/// 拡張子ではなく先頭バイトで形式を判定し、PNG/JPEG/WEBP以外は拒否する
pub fn load_file(path: &Path) -> Result<SelectedImage> {
    if !path.is_file() {
        return Err(LensError::FileNotFound(path.display().to_string()));
    }

    let bytes = std::fs::read(path)?;
    let mime_type = sniff_mime_type(&bytes)
        .ok_or_else(|| LensError::UnsupportedImage(path.display().to_string()))?;

    tracing::debug!(path = %path.display(), mime_type, size = bytes.len(), "画像を読み込みました");

    Ok(SelectedImage {
        image: ImageData::new(mime_type, bytes),
        path: path.to_path_buf(),
    })
}

/// 対応形式ならMIMEタイプを返す
pub fn sniff_mime_type(bytes: &[u8]) -> Option<&'static str> {
    match image::guess_format(bytes).ok()? {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::WebP => Some("image/webp"),
        _ => None,
    }
}

/// 破棄されたエントリの入力画像を削除する
///
/// 削除するのはキャプチャディレクトリ内のファイル（カメラ画像）だけで、
/// 残っているエントリや現在の選択が参照しているものは残す。
///
/// # Returns
/// 削除したファイル数
pub fn release(
    discarded: &[ResultEntry],
    retained: &[ResultEntry],
    selected: Option<&SelectedImage>,
    capture_dir: &Path,
) -> usize {
    let in_use = |source: &str| {
        retained.iter().any(|e| e.source_image_ref == source)
            || selected.is_some_and(|s| s.source_ref() == source)
    };

    let mut removed = 0;
    let mut seen = std::collections::HashSet::new();
    for entry in discarded {
        let source = entry.source_image_ref.as_str();
        if !seen.insert(source) || in_use(source) {
            continue;
        }
        let path = Path::new(source);
        if !path.starts_with(capture_dir) {
            continue;
        }
        match std::fs::remove_file(path) {
            Ok(()) => {
                tracing::debug!(path = source, "キャプチャ画像を削除しました");
                removed += 1;
            }
            Err(e) => tracing::debug!(path = source, error = %e, "キャプチャ画像を削除できませんでした"),
        }
    }
    removed
}
