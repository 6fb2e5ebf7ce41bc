//! 共通ライブラリのエラー
//!
//! モデル応答・座標・画像データの解釈に失敗したときに返す。

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// 値の形式・範囲が不正
    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, Error>;
