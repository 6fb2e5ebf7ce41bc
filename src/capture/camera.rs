//! カメラキャプチャ
//!
//! 外部コマンド（既定は ffmpeg）でMJPEGストリームを標準出力に流させ、
//! そこから1フレームずつJPEGを切り出す。
//! `CameraSession` がプロセスを所有し、`close()` かドロップで必ず停止する。

use super::SelectedImage;
use crate::error::{LensError, Result};
use photo_lens_common::ImageData;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};

const READ_CHUNK: usize = 64 * 1024;
/// 1フレームとして許容する最大バイト数
const MAX_FRAME_BYTES: usize = 32 * 1024 * 1024;

/// 起動中のカメラストリーム
pub struct CameraSession {
    child: Child,
    stdout: ChildStdout,
    buffer: Vec<u8>,
    capture_dir: PathBuf,
    frames: u32,
}

impl CameraSession {
    /// キャプチャプロセスを起動する
    pub async fn open(command: &[String], capture_dir: &Path) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| LensError::Camera("キャプチャコマンドが設定されていません".into()))?;

        tokio::fs::create_dir_all(capture_dir).await?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| LensError::Camera(format!("{} の起動に失敗: {}", program, e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| LensError::Camera("標準出力を取得できません".into()))?;

        tracing::debug!(program = %program, "カメラストリームを開始しました");

        Ok(Self {
            child,
            stdout,
            buffer: Vec::new(),
            capture_dir: capture_dir.to_path_buf(),
            frames: 0,
        })
    }

    /// 次の完全なフレームを取得してファイルに保存する
    pub async fn capture_frame(&mut self) -> Result<SelectedImage> {
        // 読み残しは古いフレームなので捨てる
        self.buffer.clear();
        let mut chunk = vec![0u8; READ_CHUNK];

        let frame = loop {
            if let Some((start, end)) = next_jpeg_frame(&self.buffer) {
                break self.buffer[start..end].to_vec();
            }
            if self.buffer.len() > MAX_FRAME_BYTES {
                return Err(LensError::Camera("フレームの区切りが見つかりません".into()));
            }

            let n = self.stdout.read(&mut chunk).await?;
            if n == 0 {
                let status = self.child.try_wait()?;
                return Err(LensError::Camera(match status {
                    Some(status) => format!("キャプチャプロセスが終了しました ({})", status),
                    None => "ストリームが閉じられました".to_string(),
                }));
            }
            self.buffer.extend_from_slice(&chunk[..n]);
        };

        self.frames += 1;
        let file_name = format!(
            "capture-{}-{}.jpg",
            chrono::Local::now().format("%Y%m%d-%H%M%S"),
            self.frames
        );
        let path = self.capture_dir.join(file_name);
        tokio::fs::write(&path, &frame).await?;

        tracing::debug!(path = %path.display(), size = frame.len(), "フレームを保存しました");

        Ok(SelectedImage {
            image: ImageData::new("image/jpeg", frame),
            path,
        })
    }

    /// プロセスを停止する
    pub async fn close(mut self) -> Result<()> {
        if let Err(e) = self.child.kill().await {
            // 既に終了している場合
            tracing::debug!(error = %e, "キャプチャプロセスの停止に失敗");
        }
        tracing::debug!(frames = self.frames, "カメラストリームを停止しました");
        Ok(())
    }
}

/// バッファ中の最初の完全なJPEG（SOI FFD8 〜 EOI FFD9）の範囲
pub fn next_jpeg_frame(buffer: &[u8]) -> Option<(usize, usize)> {
    let start = find_marker(buffer, 0xD8, 0)?;
    let eoi = find_marker(buffer, 0xD9, start + 2)?;
    Some((start, eoi + 2))
}

fn find_marker(buffer: &[u8], marker: u8, from: usize) -> Option<usize> {
    buffer
        .get(from..)?
        .windows(2)
        .position(|w| w[0] == 0xFF && w[1] == marker)
        .map(|i| from + i)
}
