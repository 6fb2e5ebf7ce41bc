//! 位置情報の取得
//!
//! 解析と並行して実行される補助的な取得処理。
//! 失敗・タイムアウト・未許可はすべて「位置不明」として扱い、呼び出し側には伝えない。

use crate::capture::SelectedImage;
use crate::error::{LensError, Result};
use async_trait::async_trait;
use photo_lens_common::GeoPoint;
use std::io::Cursor;
use std::time::Duration;

#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn locate(&self, image: &SelectedImage) -> Result<Option<GeoPoint>>;
}

/// 位置情報を使わない
pub struct NoLocation;

#[async_trait]
impl LocationProvider for NoLocation {
    async fn locate(&self, _image: &SelectedImage) -> Result<Option<GeoPoint>> {
        Ok(None)
    }
}

/// 指定座標を使う
pub struct FixedLocation(pub GeoPoint);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn locate(&self, _image: &SelectedImage) -> Result<Option<GeoPoint>> {
        Ok(Some(self.0))
    }
}

/// 画像のEXIF GPSタグから取得
pub struct ExifLocation;

#[async_trait]
impl LocationProvider for ExifLocation {
    async fn locate(&self, image: &SelectedImage) -> Result<Option<GeoPoint>> {
        let bytes = image.image.bytes.clone();
        tokio::task::spawn_blocking(move || gps_from_exif(&bytes))
            .await
            .map_err(|e| LensError::ImageDecode(format!("EXIF読み込みタスク失敗: {}", e)))?
    }
}

/// タイムアウト付きで取得し、失敗は None に畳む
pub async fn locate_or_unknown(
    provider: &dyn LocationProvider,
    image: &SelectedImage,
    timeout: Duration,
) -> Option<GeoPoint> {
    match tokio::time::timeout(timeout, provider.locate(image)).await {
        Ok(Ok(point)) => point,
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "位置情報を取得できませんでした");
            None
        }
        Err(_) => {
            tracing::debug!(timeout_ms = timeout.as_millis() as u64, "位置情報の取得がタイムアウトしました");
            None
        }
    }
}

/// EXIFのGPS緯度経度を読む。GPSタグが無ければ None
pub fn gps_from_exif(bytes: &[u8]) -> Result<Option<GeoPoint>> {
    let exif = match exif::Reader::new().read_from_container(&mut Cursor::new(bytes)) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => return Ok(None),
        Err(e) => return Err(LensError::ImageDecode(format!("EXIF読み込みエラー: {}", e))),
    };

    let latitude = read_coordinate(&exif, exif::Tag::GPSLatitude, exif::Tag::GPSLatitudeRef, b'S');
    let longitude = read_coordinate(&exif, exif::Tag::GPSLongitude, exif::Tag::GPSLongitudeRef, b'W');

    match (latitude, longitude) {
        (Some(lat), Some(lon)) => Ok(Some(GeoPoint::new(lat, lon)?)),
        _ => Ok(None),
    }
}

/// 度・分・秒の有理数3つを十進度に変換（南緯・西経は負）
fn read_coordinate(
    exif: &exif::Exif,
    value_tag: exif::Tag,
    ref_tag: exif::Tag,
    negative_ref: u8,
) -> Option<f64> {
    let field = exif.get_field(value_tag, exif::In::PRIMARY)?;
    let exif::Value::Rational(ref parts) = field.value else {
        return None;
    };
    if parts.len() < 3 {
        return None;
    }
    let degrees = parts[0].to_f64() + parts[1].to_f64() / 60.0 + parts[2].to_f64() / 3600.0;

    let negative = exif
        .get_field(ref_tag, exif::In::PRIMARY)
        .and_then(|f| match f.value {
            exif::Value::Ascii(ref values) => values.first().and_then(|v| v.first().copied()),
            _ => None,
        })
        .is_some_and(|c| c.eq_ignore_ascii_case(&negative_ref));

    Some(if negative { -degrees } else { degrees })
}

#[cfg(test)]
mod tests {
    use super::*;
    use photo_lens_common::ImageData;
    use std::path::PathBuf;

    struct SlowLocation;

    #[async_trait]
    impl LocationProvider for SlowLocation {
        async fn locate(&self, _image: &SelectedImage) -> Result<Option<GeoPoint>> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Some(GeoPoint::new(1.0, 1.0)?))
        }
    }

    struct FailingLocation;

    #[async_trait]
    impl LocationProvider for FailingLocation {
        async fn locate(&self, _image: &SelectedImage) -> Result<Option<GeoPoint>> {
            Err(LensError::Config("permission denied".into()))
        }
    }

    fn selected(bytes: Vec<u8>) -> SelectedImage {
        SelectedImage {
            image: ImageData::new("image/jpeg", bytes),
            path: PathBuf::from("test.jpg"),
        }
    }

    #[tokio::test]
    async fn test_fixed_location() {
        let point = GeoPoint::new(35.0, 139.0).unwrap();
        let result = locate_or_unknown(&FixedLocation(point), &selected(vec![]), Duration::from_secs(1)).await;
        assert_eq!(result, Some(point));
    }

    #[tokio::test]
    async fn test_no_location() {
        let result = locate_or_unknown(&NoLocation, &selected(vec![]), Duration::from_secs(1)).await;
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_timeout_is_unknown() {
        let result = locate_or_unknown(&SlowLocation, &selected(vec![]), Duration::from_millis(20)).await;
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_failure_is_unknown() {
        let result = locate_or_unknown(&FailingLocation, &selected(vec![]), Duration::from_secs(1)).await;
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_exif_location_without_exif() {
        // EXIFの無いJPEGは位置不明
        let jpeg = vec![0xFF, 0xD8, 0xFF, 0xD9];
        let result = locate_or_unknown(&ExifLocation, &selected(jpeg), Duration::from_secs(1)).await;
        assert_eq!(result, None);
    }
}
