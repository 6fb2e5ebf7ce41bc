//! 結果履歴（元に戻す／やり直し）
//!
//! 完了した結果を時系列で保持し、カーソルで「現在表示中」の1件を指す。
//! - append: カーソルより先の履歴を切り捨ててから追加し、追加した結果を現在位置にする
//! - step_back / step_forward: 範囲外の呼び出しは何もしない
//! - reset: `ResetPolicy` に従ってカーソルを未選択に戻す
//!
//! 切り捨て・クリアされたエントリは戻り値として呼び出し側に返す。
//! 入力画像ファイルなど、エントリに紐づく資源の解放は呼び出し側の責務。

use serde::{Deserialize, Serialize};

/// reset時の挙動
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetPolicy {
    /// 履歴を全て破棄する
    #[default]
    Clear,
    /// 表示だけを解除し、履歴は残す（step_forwardで再び辿れる）
    KeepTimeline,
}

impl std::str::FromStr for ResetPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "clear" => Ok(ResetPolicy::Clear),
            "keep" | "keep_timeline" | "keep-timeline" => Ok(ResetPolicy::KeepTimeline),
            _ => Err(format!("Unknown reset policy: {}. Use clear or keep", s)),
        }
    }
}

/// 線形の結果履歴
#[derive(Debug, Clone)]
pub struct History<T> {
    entries: Vec<T>,
    /// None = 未選択（-1）
    cursor: Option<usize>,
    policy: ResetPolicy,
}

impl<T> Default for History<T> {
    fn default() -> Self {
        Self::with_policy(ResetPolicy::default())
    }
}

impl<T> History<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: ResetPolicy) -> Self {
        Self {
            entries: Vec::new(),
            cursor: None,
            policy,
        }
    }

    /// 現在位置より後ろを切り捨てて追加する
    ///
    /// # Returns
    /// 切り捨てられたエントリ（古い順）
    pub fn append(&mut self, entry: T) -> Vec<T> {
        let keep = self.cursor.map_or(0, |c| c + 1);
        let discarded = self.entries.split_off(keep);
        self.entries.push(entry);
        self.cursor = Some(self.entries.len() - 1);
        discarded
    }

    /// 1件前へ。先頭または未選択なら何もしない
    pub fn step_back(&mut self) -> bool {
        match self.cursor {
            Some(c) if c > 0 => {
                self.cursor = Some(c - 1);
                true
            }
            _ => false,
        }
    }

    /// 1件先へ。末尾なら何もしない
    pub fn step_forward(&mut self) -> bool {
        let next = self.cursor.map_or(0, |c| c + 1);
        if next < self.entries.len() {
            self.cursor = Some(next);
            true
        } else {
            false
        }
    }

    pub fn current(&self) -> Option<&T> {
        self.cursor.and_then(|c| self.entries.get(c))
    }

    /// 未選択に戻す
    ///
    /// # Returns
    /// `ResetPolicy::Clear` の場合は破棄されたエントリ、それ以外は空
    pub fn reset(&mut self) -> Vec<T> {
        self.cursor = None;
        match self.policy {
            ResetPolicy::Clear => std::mem::take(&mut self.entries),
            ResetPolicy::KeepTimeline => Vec::new(),
        }
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// 符号付きのカーソル位置（未選択は -1）
    pub fn cursor_position(&self) -> isize {
        self.cursor.map_or(-1, |c| c as isize)
    }

    pub fn can_step_back(&self) -> bool {
        matches!(self.cursor, Some(c) if c > 0)
    }

    pub fn can_step_forward(&self) -> bool {
        self.cursor.map_or(0, |c| c + 1) < self.entries.len()
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn policy(&self) -> ResetPolicy {
        self.policy
    }
}
