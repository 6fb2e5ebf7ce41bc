//! セッション状態
//!
//! 結果履歴・読み込み中フラグ・直近のエラーを1つの状態オブジェクトにまとめる。
//! 送信ごとに世代番号付きのチケットを発行し、reset後に届いた古い結果は捨てる。

use crate::error::{LensError, Result};
use photo_lens_common::{GeoPoint, History, ResetPolicy, ResultEntry, ResultPayload};

/// 送信中の処理を識別するチケット
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
}

/// 送信結果の反映内容
#[derive(Debug)]
pub enum Completion {
    /// 履歴に追加した。切り捨てられたエントリも返す
    Appended {
        index: usize,
        discarded: Vec<ResultEntry>,
    },
    /// 失敗（履歴は変更なし）
    Failed(LensError),
    /// reset後に届いた結果なので捨てた
    Discarded,
}

impl Completion {
    /// 追加位置。失敗ならそのエラー、破棄なら None
    pub fn into_result(self) -> Result<Option<usize>> {
        match self {
            Completion::Appended { index, .. } => Ok(Some(index)),
            Completion::Failed(e) => Err(e),
            Completion::Discarded => Ok(None),
        }
    }
}

#[derive(Debug)]
pub struct Session {
    history: History<ResultEntry>,
    loading: bool,
    error: Option<String>,
    generation: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(ResetPolicy::default())
    }
}

impl Session {
    pub fn new(policy: ResetPolicy) -> Self {
        Self {
            history: History::with_policy(policy),
            loading: false,
            error: None,
            generation: 0,
        }
    }

    /// 送信開始。実行中なら Busy
    pub fn begin(&mut self) -> Result<Ticket> {
        if self.loading {
            return Err(LensError::Busy);
        }
        self.loading = true;
        self.error = None;
        Ok(Ticket {
            generation: self.generation,
        })
    }

    /// 送信結果を反映する
    pub fn complete(
        &mut self,
        ticket: Ticket,
        source_image_ref: &str,
        outcome: Result<(ResultPayload, Option<GeoPoint>)>,
    ) -> Completion {
        if ticket.generation != self.generation {
            tracing::debug!(
                ticket = ticket.generation,
                current = self.generation,
                "古い送信結果を破棄しました"
            );
            return Completion::Discarded;
        }
        self.loading = false;

        match outcome {
            Ok((payload, location)) => {
                let entry = ResultEntry::new(payload, source_image_ref, location);
                let discarded = self.history.append(entry);
                let index = self.history.len() - 1;
                tracing::debug!(index, discarded = discarded.len(), "履歴に追加しました");
                Completion::Appended { index, discarded }
            }
            Err(e) => {
                tracing::warn!(error = %e, "送信に失敗しました");
                self.error = Some(e.to_string());
                Completion::Failed(e)
            }
        }
    }

    /// 入力エラーを表示用に記録する（送信はしない）
    pub fn reject(&mut self, error: LensError) -> Completion {
        self.error = Some(error.to_string());
        Completion::Failed(error)
    }

    /// 未選択に戻す。実行中の送信結果は以後捨てられる
    pub fn reset(&mut self) -> Vec<ResultEntry> {
        self.generation += 1;
        self.loading = false;
        self.error = None;
        self.history.reset()
    }

    pub fn step_back(&mut self) -> bool {
        self.history.step_back()
    }

    pub fn step_forward(&mut self) -> bool {
        self.history.step_forward()
    }

    pub fn current(&self) -> Option<&ResultEntry> {
        self.history.current()
    }

    pub fn history(&self) -> &History<ResultEntry> {
        &self.history
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// "2 / 5" 形式の位置表示
    pub fn position_label(&self) -> String {
        format!("{} / {}", self.history.cursor_position() + 1, self.history.len())
    }
}
