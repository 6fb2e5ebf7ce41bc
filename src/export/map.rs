//! 位置情報の地図サムネイル（Google Static Maps）
//!
//! キー未設定・取得失敗のどちらも地図なしとして扱う。

use crate::error::{LensError, Result};
use photo_lens_common::GeoPoint;

pub const STATIC_MAP_BASE_URL: &str = "https://maps.googleapis.com/maps/api/staticmap";

const ZOOM: u8 = 12;
const SIZE_PX: (u32, u32) = (600, 400);

/// 地図画像のURL（マーカー付き）
pub fn static_map_url(base_url: &str, point: GeoPoint, api_key: &str) -> String {
    format!(
        "{}?center={lat:.6},{lon:.6}&zoom={}&size={}x{}&maptype=roadmap&markers=color:red%7C{lat:.6},{lon:.6}&key={}",
        base_url.trim_end_matches('/'),
        ZOOM,
        SIZE_PX.0,
        SIZE_PX.1,
        api_key,
        lat = point.latitude,
        lon = point.longitude,
    )
}

/// 地図画像を取得する
pub async fn fetch_static_map(
    http: &reqwest::Client,
    base_url: &str,
    point: GeoPoint,
    api_key: &str,
) -> Result<Vec<u8>> {
    let response = http
        .get(static_map_url(base_url, point, api_key))
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(LensError::ApiCall(format!("Static Maps error: {}", status)));
    }
    Ok(response.bytes().await?.to_vec())
}

/// キーがあれば地図を取得。失敗はログだけ残して None
pub async fn fetch_map_or_none(
    http: &reqwest::Client,
    point: Option<GeoPoint>,
    api_key: Option<&str>,
) -> Option<Vec<u8>> {
    let (point, api_key) = (point?, api_key?);
    match fetch_static_map(http, STATIC_MAP_BASE_URL, point, api_key).await {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            tracing::debug!(error = %e, "地図サムネイルを取得できませんでした");
            None
        }
    }
}
