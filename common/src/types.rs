//! 履歴エントリの型定義
//!
//! CLIと対話セッションで共有される型:
//! - ImageData: MIMEタイプ付きの画像バイト列
//! - EditedImage: 画像編集の結果（画像 + 任意のキャプション）
//! - ClassificationRecord: 機体識別レポート
//! - ResultEntry: 履歴に積まれる1件の結果

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// MIMEタイプ付きの画像データ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageData {
    pub mime_type: String,
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
}

impl ImageData {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Base64文字列から復元
    pub fn from_base64(mime_type: impl Into<String>, data: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(data.trim())
            .map_err(|e| Error::Parse(format!("Base64デコードエラー: {}", e)))?;
        Ok(Self::new(mime_type, bytes))
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// 保存時の拡張子（MIMEサブタイプ、不明ならpng）
    pub fn extension(&self) -> &str {
        self.mime_type
            .split_once('/')
            .map(|(_, sub)| sub.split(';').next().unwrap_or(sub).trim())
            .filter(|sub| !sub.is_empty())
            .unwrap_or("png")
    }
}

/// 画像編集の結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditedImage {
    pub image: ImageData,
    /// モデルが画像と一緒に返したテキスト
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// 識別区分
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClassificationTag {
    Friendly,
    Hostile,
    #[default]
    Unknown,
}

impl ClassificationTag {
    pub const ALL: [ClassificationTag; 3] = [Self::Friendly, Self::Hostile, Self::Unknown];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationTag::Friendly => "FRIENDLY",
            ClassificationTag::Hostile => "HOSTILE",
            ClassificationTag::Unknown => "UNKNOWN",
        }
    }

    /// 大文字小文字を区別せずに解釈。不明な値はUNKNOWN
    pub fn parse_lenient(s: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|tag| tag.as_str().eq_ignore_ascii_case(s.trim()))
            .unwrap_or(ClassificationTag::Unknown)
    }
}

impl std::fmt::Display for ClassificationTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 脅威度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatLevel {
    None,
    Low,
    Medium,
    High,
    Extreme,
}

impl ThreatLevel {
    pub const ALL: [ThreatLevel; 5] = [
        Self::None,
        Self::Low,
        Self::Medium,
        Self::High,
        Self::Extreme,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatLevel::None => "NONE",
            ThreatLevel::Low => "LOW",
            ThreatLevel::Medium => "MEDIUM",
            ThreatLevel::High => "HIGH",
            ThreatLevel::Extreme => "EXTREME",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl std::fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 機体識別レポート
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationRecord {
    /// 識別された機種名
    pub model: String,
    /// 製造国・運用国
    pub origin: String,
    pub classification: ClassificationTag,
    /// 確信度 (0.0 - 1.0)
    pub confidence: f64,
    pub details: String,
    pub asset_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similar_assets: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threat_level: Option<ThreatLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<String>,
}

/// 結果本体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ResultPayload {
    Edited(EditedImage),
    Classification(ClassificationRecord),
}

impl ResultPayload {
    pub fn label(&self) -> &'static str {
        match self {
            ResultPayload::Edited(_) => "画像編集",
            ResultPayload::Classification(_) => "機体識別",
        }
    }
}

/// 緯度経度
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(Error::Parse(format!("緯度が範囲外: {}", latitude)));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(Error::Parse(format!("経度が範囲外: {}", longitude)));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

impl std::str::FromStr for GeoPoint {
    type Err = Error;

    /// "35.68,139.76" 形式
    fn from_str(s: &str) -> Result<Self> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| Error::Parse(format!("LAT,LON 形式で指定してください: {}", s)))?;
        let lat: f64 = lat
            .trim()
            .parse()
            .map_err(|_| Error::Parse(format!("緯度が数値ではありません: {}", lat)))?;
        let lon: f64 = lon
            .trim()
            .parse()
            .map_err(|_| Error::Parse(format!("経度が数値ではありません: {}", lon)))?;
        GeoPoint::new(lat, lon)
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}

/// 履歴に積まれる1件の結果（追加後は不変）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEntry {
    pub payload: ResultPayload,
    /// 入力画像の参照（パス）。バイト列は保持しない
    pub source_image_ref: String,
    pub timestamp: DateTime<Local>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
}

impl ResultEntry {
    /// 現在時刻で作成
    pub fn new(
        payload: ResultPayload,
        source_image_ref: impl Into<String>,
        location: Option<GeoPoint>,
    ) -> Self {
        Self {
            payload,
            source_image_ref: source_image_ref.into(),
            timestamp: Local::now(),
            location,
        }
    }

    pub fn edited_image(&self) -> Option<&EditedImage> {
        match &self.payload {
            ResultPayload::Edited(edited) => Some(edited),
            ResultPayload::Classification(_) => None,
        }
    }

    pub fn classification(&self) -> Option<&ClassificationRecord> {
        match &self.payload {
            ResultPayload::Classification(record) => Some(record),
            ResultPayload::Edited(_) => None,
        }
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom)
    }
}
