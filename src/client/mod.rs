//! 画像編集・機体識別クライアント

mod gemini;

pub use gemini::GeminiClient;

use crate::error::Result;
use async_trait::async_trait;
use photo_lens_common::{ClassificationRecord, EditedImage, ImageData, ResultPayload};

/// 外部AIサービスへの送信口
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    /// 指示に従って画像を編集する
    async fn edit(&self, image: &ImageData, instruction: &str) -> Result<EditedImage>;

    /// 画像に写っている機体を識別する
    async fn identify(&self, image: &ImageData) -> Result<ClassificationRecord>;

    /// 指示があれば編集、なければ識別
    async fn submit(&self, image: &ImageData, instruction: Option<&str>) -> Result<ResultPayload> {
        match instruction {
            Some(instruction) => Ok(ResultPayload::Edited(self.edit(image, instruction).await?)),
            None => Ok(ResultPayload::Classification(self.identify(image).await?)),
        }
    }
}
