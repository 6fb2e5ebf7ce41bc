//! Gemini API連携
//!
//! - 画像編集: 画像 + 指示テキストを送り、画像（+ テキスト）を受け取る
//! - 機体識別: 固定のシステム指示とレスポンススキーマでJSONを受け取る

use super::AnalysisClient;
use crate::config::Config;
use crate::error::{LensError, Result};
use async_trait::async_trait;
use photo_lens_common::{
    classification_response_schema, parse_classification_response,
    ClassificationRecord, EditedImage, ImageData, IDENTIFY_SYSTEM_INSTRUCTION, IDENTIFY_USER_PROMPT,
};
use serde::{Deserialize, Serialize};

/// エラーメッセージに含めるレスポンス本文の上限
const ERROR_BODY_PREVIEW: usize = 300;

/// Gemini APIリクエスト
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

impl Part {
    fn image(image: &ImageData) -> Self {
        Part::InlineData {
            inline_data: InlineData {
                mime_type: image.mime_type.clone(),
                data: image.to_base64(),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(alias = "mime_type")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
}

/// Gemini APIレスポンス
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default, alias = "inline_data")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// 先頭候補のパーツ。空なら理由付きでエラー
    fn first_parts(&self) -> Result<&[ResponsePart]> {
        let parts = self
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or_default();

        if parts.is_empty() {
            let reason = self
                .prompt_feedback
                .as_ref()
                .and_then(|f| f.block_reason.clone())
                .or_else(|| self.candidates.first().and_then(|c| c.finish_reason.clone()));
            return Err(LensError::ApiParse(match reason {
                Some(reason) => format!("Empty response ({})", reason),
                None => "Empty response".to_string(),
            }));
        }
        Ok(parts)
    }

    /// 編集結果を取り出す（同じ種類のパーツが複数あれば後勝ち）
    fn into_edited_image(self) -> Result<EditedImage> {
        let mut image = None;
        let mut caption = None;

        for part in self.first_parts()? {
            if let Some(text) = &part.text {
                caption = Some(text.trim().to_string()).filter(|t| !t.is_empty());
            } else if let Some(inline) = &part.inline_data {
                image = Some(ImageData::from_base64(&inline.mime_type, &inline.data)?);
            }
        }

        let image = image.ok_or(LensError::NoImageReturned)?;
        Ok(EditedImage { image, caption })
    }

    /// テキストパーツを連結
    fn text(&self) -> Result<String> {
        let text: String = self
            .first_parts()?
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            return Err(LensError::ApiParse("Empty response".into()));
        }
        Ok(text)
    }
}

fn edit_request(image: &ImageData, instruction: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user"),
            parts: vec![
                Part::image(image),
                Part::Text {
                    text: instruction.to_string(),
                },
            ],
        }],
        system_instruction: None,
        generation_config: GenerationConfig {
            response_modalities: Some(vec!["IMAGE", "TEXT"]),
            ..Default::default()
        },
    }
}

fn identify_request(image: &ImageData) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user"),
            parts: vec![
                Part::image(image),
                Part::Text {
                    text: IDENTIFY_USER_PROMPT.to_string(),
                },
            ],
        }],
        system_instruction: Some(Content {
            role: None,
            parts: vec![Part::Text {
                text: IDENTIFY_SYSTEM_INSTRUCTION.to_string(),
            }],
        }),
        generation_config: GenerationConfig {
            temperature: Some(0.2),
            response_mime_type: Some("application/json"),
            response_schema: Some(classification_response_schema()),
            ..Default::default()
        },
    }
}

/// Gemini REST クライアント
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    edit_model: String,
    identify_model: String,
}

impl GeminiClient {
    /// APIキーが無くても作成できる（呼び出し時に MissingApiKey）
    pub fn new(
        api_key: Option<String>,
        base_url: impl Into<String>,
        edit_model: impl Into<String>,
        identify_model: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: base_url.into(),
            edit_model: edit_model.into(),
            identify_model: identify_model.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.api_key(),
            config.api_base_url.clone(),
            config.edit_model.clone(),
            config.identify_model.clone(),
        )
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model
        )
    }

    async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let api_key = self.api_key.as_deref().ok_or(LensError::MissingApiKey)?;

        tracing::debug!(model, "Gemini API 呼び出し");
        let response = self
            .http
            .post(self.endpoint(model))
            .query(&[("key", api_key)])
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(model, %status, bytes = body.len(), "Gemini API 応答");

        if !status.is_success() {
            let preview: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
            return Err(LensError::ApiCall(format!("API error: {} {}", status, preview.trim())));
        }
        if body.trim().is_empty() {
            return Err(LensError::ApiParse("Empty response".into()));
        }

        serde_json::from_str(&body).map_err(|e| LensError::ApiParse(format!("JSONパースエラー: {}", e)))
    }
}

#[async_trait]
impl AnalysisClient for GeminiClient {
    async fn edit(&self, image: &ImageData, instruction: &str) -> Result<EditedImage> {
        let request = edit_request(image, instruction);
        let response = self.generate(&self.edit_model, &request).await?;
        response.into_edited_image()
    }

    async fn identify(&self, image: &ImageData) -> Result<ClassificationRecord> {
        let request = identify_request(image);
        let response = self.generate(&self.identify_model, &request).await?;
        let text = response.text()?;
        parse_classification_response(&text)
            .map_err(|e| LensError::ApiParse(format!("識別結果: {}", e)))
    }
}
