//! 1回のユーザー操作（編集・識別）の流れ
//!
//! 入力チェック → 送信開始 → AI呼び出し（識別は位置情報と並行）→ 結果反映

use crate::capture::SelectedImage;
use crate::client::AnalysisClient;
use crate::error::LensError;
use crate::location::{locate_or_unknown, LocationProvider};
use crate::session::{Completion, Session};
use photo_lens_common::validate_instruction;
use std::time::Duration;

/// 画像編集を実行して履歴に反映する
pub async fn run_edit(
    session: &mut Session,
    client: &dyn AnalysisClient,
    image: Option<&SelectedImage>,
    instruction: &str,
) -> Completion {
    let Some(image) = image else {
        return session.reject(LensError::NoImageSelected);
    };
    let Some(instruction) = validate_instruction(instruction) else {
        return session.reject(LensError::EmptyInstruction);
    };
    let ticket = match session.begin() {
        Ok(ticket) => ticket,
        Err(e) => return Completion::Failed(e),
    };

    tracing::info!(source = %image.source_ref(), "画像編集を開始");
    let outcome = client
        .submit(&image.image, Some(instruction))
        .await
        .map(|payload| (payload, None));

    session.complete(ticket, &image.source_ref(), outcome)
}

/// 機体識別を実行して履歴に反映する
///
/// 位置情報の取得とAI解析を並行で行い、両方の完了を待ってから反映する。
/// 位置情報の失敗は無視し、解析の失敗だけを失敗として扱う。
pub async fn run_identify(
    session: &mut Session,
    client: &dyn AnalysisClient,
    locator: &dyn LocationProvider,
    image: Option<&SelectedImage>,
    location_timeout: Duration,
) -> Completion {
    let Some(image) = image else {
        return session.reject(LensError::NoImageSelected);
    };
    let ticket = match session.begin() {
        Ok(ticket) => ticket,
        Err(e) => return Completion::Failed(e),
    };

    tracing::info!(source = %image.source_ref(), "機体識別を開始");
    let (analysis, location) = tokio::join!(
        client.submit(&image.image, None),
        locate_or_unknown(locator, image, location_timeout),
    );
    let outcome = analysis.map(|payload| (payload, location));

    session.complete(ticket, &image.source_ref(), outcome)
}
