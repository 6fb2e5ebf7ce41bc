//! APIレスポンスパーサー
//!
//! Gemini のレスポンステキストからJSONを抽出し、
//! 機体識別レポート（ClassificationRecord）にパースする

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::types::{ClassificationRecord, ClassificationTag, ThreatLevel};

/// APIレスポンスからJSON部分を抽出
///
/// 抽出優先順位:
/// 1. ```json ... ``` ブロック
/// 2. 生の {...} オブジェクト
/// 3. 生の [...] 配列
/// 4. エラー
///
/// # Examples
/// ```
/// use photo_lens_common::extract_json;
///
/// let response = "Result: {\"model\": \"F-16\"} done";
/// let json = extract_json(response).unwrap();
/// assert_eq!(json, "{\"model\": \"F-16\"}");
/// ```
pub fn extract_json(response: &str) -> Result<&str> {
    // ```json ... ``` ブロックを探す
    if let Some(start_marker) = response.find("```json") {
        let start = start_marker + 7; // "```json" の長さ
        if let Some(end_offset) = response[start..].find("```") {
            let end = start + end_offset;
            return Ok(response[start..end].trim());
        }
    }

    for (open, close) in [('{', '}'), ('[', ']')] {
        if let (Some(start), Some(end)) = (response.find(open), response.rfind(close)) {
            if end >= start {
                return Ok(&response[start..=end]);
            }
        }
    }

    Err(Error::Parse("JSONが見つかりません".into()))
}

/// 機体識別レスポンスをパース
///
/// スキーマ指定で返ってくる前提だが、モデルの揺れを吸収する:
/// - 配列で返った場合は先頭要素を使う
/// - classification の未知の値は UNKNOWN
/// - threatLevel の未知の値は無視
/// - confidence は 0-1、または 0-100 のパーセント表記を受け付ける
///
/// # Returns
/// * `Ok(ClassificationRecord)` - パース成功
/// * `Err` - JSONが見つからない、必須項目の欠落、確信度が範囲外
pub fn parse_classification_response(response: &str) -> Result<ClassificationRecord> {
    let json_str = extract_json(response)?;
    let value: Value = serde_json::from_str(json_str.trim())
        .map_err(|e| Error::Parse(format!("識別結果 JSONパースエラー: {}", e)))?;

    let obj = match value {
        Value::Array(items) => items.into_iter().next().unwrap_or(Value::Null),
        other => other,
    };
    let Some(map) = obj.as_object() else {
        return Err(Error::Parse("JSONオブジェクトが見つかりません".into()));
    };

    let confidence = get_f64(map, "confidence")
        .ok_or_else(|| Error::Parse("confidence がありません".into()))?;

    Ok(ClassificationRecord {
        model: require_string(map, "model")?,
        origin: get_string(map, "origin").unwrap_or_default(),
        classification: get_string(map, "classification")
            .map(|s| ClassificationTag::parse_lenient(&s))
            .unwrap_or_default(),
        confidence: normalize_confidence(confidence)?,
        details: get_string(map, "details").unwrap_or_default(),
        asset_type: get_string(map, "assetType").unwrap_or_default(),
        similar_assets: get_string_list(map, "similarAssets"),
        threat_level: get_string(map, "threatLevel").and_then(|s| ThreatLevel::parse(&s)),
        capabilities: get_string(map, "capabilities").filter(|s| !s.trim().is_empty()),
    })
}

/// 確信度を 0.0-1.0 に正規化
///
/// 1.0 を超え 100 以下の値はパーセント表記とみなす
pub fn normalize_confidence(value: f64) -> Result<f64> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(Error::Parse(format!("confidence が範囲外: {}", value)));
    }
    if value > 1.0 {
        Ok(value / 100.0)
    } else {
        Ok(value)
    }
}

fn require_string(map: &Map<String, Value>, key: &str) -> Result<String> {
    get_string(map, key)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| Error::Parse(format!("{} がありません", key)))
}

fn get_string(map: &Map<String, Value>, key: &str) -> Option<String> {
    let value = map.get(key)?;
    if let Some(s) = value.as_str() {
        return Some(s.to_string());
    }
    if value.is_null() {
        return None;
    }
    Some(value.to_string())
}

fn get_f64(map: &Map<String, Value>, key: &str) -> Option<f64> {
    let value = map.get(key)?;
    if let Some(n) = value.as_f64() {
        return Some(n);
    }
    value
        .as_str()
        .and_then(|s| s.trim().trim_end_matches('%').trim().parse().ok())
}

fn get_string_list(map: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    let items = map.get(key)?.as_array()?;
    let names: Vec<String> = items
        .iter()
        .filter_map(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if names.is_empty() {
        None
    } else {
        Some(names)
    }
}
