//! プロンプト生成モジュール
//!
//! - IDENTIFY_SYSTEM_INSTRUCTION: 機体識別用の固定システム指示
//! - IDENTIFY_USER_PROMPT: 識別リクエストのユーザーテキスト
//! - classification_response_schema: 識別結果のレスポンススキーマ
//! - validate_instruction: 編集指示の入力チェック

use serde_json::{json, Value};

use crate::types::{ClassificationTag, ThreatLevel};

/// 機体識別用のシステム指示
pub const IDENTIFY_SYSTEM_INSTRUCTION: &str = r#"You are a military asset recognition analyst. Examine the supplied image and identify the primary vehicle, aircraft, vessel or weapon system it shows.

Rules:
- Report the most likely specific model designation in "model" and its country of origin in "origin".
- Classify it as FRIENDLY, HOSTILE or UNKNOWN. Use UNKNOWN whenever the affiliation cannot be determined from visible markings or context.
- "confidence" is your certainty in the model identification, a number between 0.0 and 1.0.
- "details" is a short factual description of what is visible and why you reached this identification.
- "assetType" is a short category label such as "Fighter Aircraft", "Main Battle Tank" or "Frigate".
- Optionally list up to five visually similar assets in "similarAssets", estimate a "threatLevel" (NONE, LOW, MEDIUM, HIGH, EXTREME) and summarise known "capabilities".
- If the image contains no identifiable asset, set "model" to "Unidentified", classification to UNKNOWN and confidence to 0.
- Do not speculate beyond what is visible. Output only the JSON object."#;

/// 識別リクエストのユーザーテキスト
pub const IDENTIFY_USER_PROMPT: &str = "Identify the asset in this image and return the analysis report.";

/// 識別結果のレスポンススキーマ（Gemini responseSchema形式）
pub fn classification_response_schema() -> Value {
    let tags: Vec<&str> = ClassificationTag::ALL.iter().map(|t| t.as_str()).collect();
    let levels: Vec<&str> = ThreatLevel::ALL.iter().map(|l| l.as_str()).collect();

    json!({
        "type": "OBJECT",
        "properties": {
            "model": { "type": "STRING", "description": "Identified model designation" },
            "origin": { "type": "STRING", "description": "Country of origin" },
            "classification": { "type": "STRING", "enum": tags },
            "confidence": { "type": "NUMBER", "description": "Certainty between 0.0 and 1.0" },
            "details": { "type": "STRING" },
            "assetType": { "type": "STRING" },
            "similarAssets": { "type": "ARRAY", "items": { "type": "STRING" } },
            "threatLevel": { "type": "STRING", "enum": levels },
            "capabilities": { "type": "STRING" }
        },
        "required": ["model", "origin", "classification", "confidence", "details", "assetType"]
    })
}

/// 編集指示のチェック（空白のみは不可）
pub fn validate_instruction(instruction: &str) -> Option<&str> {
    let trimmed = instruction.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
