//! 入力画像の読み込みとキャプチャ画像の解放

use photo_lens::capture::{self, SelectedImage};
use photo_lens_common::{ClassificationRecord, ImageData, ResultEntry, ResultPayload};
use std::path::Path;
use tempfile::tempdir;

const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0xFF, 0xD9];

fn entry_for(source: &Path) -> ResultEntry {
    ResultEntry::new(
        ResultPayload::Classification(ClassificationRecord::default()),
        source.display().to_string(),
        None,
    )
}

#[test]
fn test_load_file_sniffs_content_not_extension() {
    let dir = tempdir().expect("Failed to create temp dir");
    // 拡張子は .png だが中身はJPEG
    let path = dir.path().join("photo.png");
    std::fs::write(&path, JPEG_BYTES).unwrap();

    let selected = capture::load_file(&path).unwrap();
    assert_eq!(selected.image.mime_type, "image/jpeg");
    assert_eq!(selected.file_name(), "photo.png");
    assert_eq!(selected.source_ref(), path.display().to_string());
}

#[test]
fn test_release_removes_only_unused_captures() {
    let capture_dir = tempdir().expect("Failed to create temp dir");
    let other_dir = tempdir().expect("Failed to create temp dir");

    let unused = capture_dir.path().join("capture-1.jpg");
    let retained = capture_dir.path().join("capture-2.jpg");
    let selected_path = capture_dir.path().join("capture-3.jpg");
    let user_file = other_dir.path().join("user.jpg");
    for path in [&unused, &retained, &selected_path, &user_file] {
        std::fs::write(path, JPEG_BYTES).unwrap();
    }

    let discarded = vec![
        entry_for(&unused),
        entry_for(&retained),
        entry_for(&selected_path),
        entry_for(&user_file),
    ];
    let kept = vec![entry_for(&retained)];
    let selected = SelectedImage {
        image: ImageData::new("image/jpeg", JPEG_BYTES.to_vec()),
        path: selected_path.clone(),
    };

    let removed = capture::release(&discarded, &kept, Some(&selected), capture_dir.path());

    assert_eq!(removed, 1);
    assert!(!unused.exists());
    assert!(retained.exists());
    assert!(selected_path.exists());
    // キャプチャディレクトリ外のファイルには触れない
    assert!(user_file.exists());
}

#[test]
fn test_release_nothing_discarded() {
    let capture_dir = tempdir().expect("Failed to create temp dir");
    assert_eq!(capture::release(&[], &[], None, capture_dir.path()), 0);
}
