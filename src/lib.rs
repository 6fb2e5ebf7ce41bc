//! photo-lens
//!
//! 画像編集・機体識別AIクライアント。
//! 結果は履歴として積まれ、前後に移動しながら保存・PDF出力できる。

pub mod capture;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod interactive;
pub mod location;
pub mod session;
pub mod workflow;
