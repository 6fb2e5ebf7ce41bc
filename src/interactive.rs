//! 対話セッション
//!
//! 画像を1枚選び、編集・識別を繰り返しながら履歴を前後に移動する。
//! 送信中はスピナーを表示し、エラーは次のメニュー表示時に出す。

use crate::capture::{self, CameraSession, SelectedImage};
use crate::client::GeminiClient;
use crate::config::Config;
use crate::error::{LensError, Result};
use crate::export::{self, PdfQuality};
use crate::location::{ExifLocation, LocationProvider};
use crate::session::{Completion, Session};
use crate::workflow;
use dialoguer::{Input, Select};
use indicatif::ProgressBar;
use photo_lens_common::layout::build_report_fields;
use photo_lens_common::ResultEntry;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// メニュー操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    Edit,
    Identify,
    Back,
    Forward,
    Reset,
    SaveImage,
    ExportPdf,
    NewImage,
    Capture,
    Quit,
}

impl SessionAction {
    pub fn label(&self) -> &'static str {
        match self {
            SessionAction::Edit => "画像を編集",
            SessionAction::Identify => "機体を識別",
            SessionAction::Back => "← 戻る",
            SessionAction::Forward => "→ 進む",
            SessionAction::Reset => "リセット",
            SessionAction::SaveImage => "画像を保存",
            SessionAction::ExportPdf => "PDFを出力",
            SessionAction::NewImage => "別の画像を開く",
            SessionAction::Capture => "カメラで撮影",
            SessionAction::Quit => "終了",
        }
    }
}

/// 現在の状態で選べる操作
pub fn available_actions(session: &Session) -> Vec<SessionAction> {
    let history = session.history();
    let current = session.current();

    let mut actions = vec![SessionAction::Edit, SessionAction::Identify];
    if history.can_step_back() {
        actions.push(SessionAction::Back);
    }
    if history.can_step_forward() {
        actions.push(SessionAction::Forward);
    }
    if current.is_some() {
        actions.push(SessionAction::Reset);
        actions.push(SessionAction::ExportPdf);
    }
    if current.is_some_and(|e| e.edited_image().is_some()) {
        actions.push(SessionAction::SaveImage);
    }
    actions.extend([SessionAction::NewImage, SessionAction::Capture, SessionAction::Quit]);
    actions
}

/// エントリの表示行
pub fn describe_entry(entry: &ResultEntry) -> Vec<String> {
    let mut lines = vec![format!("[{}]", entry.payload.label())];
    lines.extend(
        build_report_fields(entry)
            .into_iter()
            .map(|f| format!("  {}: {}", f.label, f.value)),
    );
    lines
}

struct InteractiveState {
    config: Config,
    client: GeminiClient,
    locator: Box<dyn LocationProvider>,
    session: Session,
    selected: Option<SelectedImage>,
    camera: Option<CameraSession>,
}

/// 対話セッションを実行
pub async fn run_interactive(config: Config, image: Option<PathBuf>, use_camera: bool) -> Result<()> {
    let client = GeminiClient::from_config(&config);
    let mut state = InteractiveState {
        session: Session::new(config.reset_policy),
        client,
        locator: Box::new(ExifLocation),
        selected: None,
        camera: None,
        config,
    };

    if let Some(path) = image {
        state.selected = Some(capture::load_file(&path)?);
    } else if use_camera {
        state.capture().await?;
    }

    let result = state.run().await;

    if let Some(camera) = state.camera.take() {
        camera.close().await?;
    }
    result
}

impl InteractiveState {
    async fn run(&mut self) -> Result<()> {
        loop {
            self.print_status();

            let actions = available_actions(&self.session);
            let labels: Vec<&str> = actions.iter().map(|a| a.label()).collect();
            let choice = Select::new()
                .with_prompt("操作")
                .items(&labels)
                .default(0)
                .interact()
                .map_err(|e| LensError::Interaction(e.to_string()))?;

            let action = actions[choice];
            if action == SessionAction::Quit {
                println!("終了します");
                return Ok(());
            }

            // 操作単位の失敗はセッションを止めずに表示だけする
            if let Err(e) = self.perform(action).await {
                println!("✗ {}", e);
            }
        }
    }

    async fn perform(&mut self, action: SessionAction) -> Result<()> {
        match action {
            SessionAction::Edit => {
                let instruction: String = Input::new()
                    .with_prompt("編集内容")
                    .allow_empty(true)
                    .interact_text()
                    .map_err(|e| LensError::Interaction(e.to_string()))?;

                let spinner = spinner("画像を編集中...");
                let completion = workflow::run_edit(
                    &mut self.session,
                    &self.client,
                    self.selected.as_ref(),
                    &instruction,
                )
                .await;
                spinner.finish_and_clear();
                self.after_completion(completion);
            }
            SessionAction::Identify => {
                let spinner = spinner("機体を識別中...");
                let completion = workflow::run_identify(
                    &mut self.session,
                    &self.client,
                    self.locator.as_ref(),
                    self.selected.as_ref(),
                    self.config.location_timeout(),
                )
                .await;
                spinner.finish_and_clear();
                self.after_completion(completion);
            }
            SessionAction::Back => {
                self.session.step_back();
            }
            SessionAction::Forward => {
                self.session.step_forward();
            }
            SessionAction::Reset => {
                let discarded = self.session.reset();
                self.release(&discarded);
                println!("✔ リセットしました");
            }
            SessionAction::SaveImage => {
                let output = prompt_path("保存先", ".")?;
                if let Some(entry) = self.session.current() {
                    let path = export::save_image(entry, &output)?;
                    println!("✔ 画像を保存: {}", path.display());
                }
            }
            SessionAction::ExportPdf => {
                let output = prompt_path("PDF出力先", "report.pdf")?;
                if let Some(entry) = self.session.current() {
                    let maps_key = self.config.maps_api_key();
                    let spinner = spinner("PDFを生成中...");
                    let result =
                        export::export_report(entry, maps_key.as_deref(), &output, PdfQuality::default())
                            .await;
                    spinner.finish_and_clear();
                    println!("✔ PDF出力: {}", result?.display());
                }
            }
            SessionAction::NewImage => {
                let path = prompt_path("画像ファイル", "")?;
                self.selected = Some(capture::load_file(&path)?);
            }
            SessionAction::Capture => {
                self.capture().await?;
            }
            SessionAction::Quit => {}
        }
        Ok(())
    }

    async fn capture(&mut self) -> Result<()> {
        if self.camera.is_none() {
            let camera =
                CameraSession::open(&self.config.camera_command, &self.config.capture_dir()).await?;
            self.camera = Some(camera);
        }
        if let Some(camera) = self.camera.as_mut() {
            let spinner = spinner("撮影中...");
            let frame = camera.capture_frame().await;
            spinner.finish_and_clear();
            let frame = frame?;
            println!("✔ 撮影しました: {}", frame.path.display());
            self.selected = Some(frame);
        }
        Ok(())
    }

    fn after_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Appended { discarded, .. } => self.release(&discarded),
            // 結果とエラーは次の状態表示で出す
            Completion::Failed(_) => {}
            Completion::Discarded => {}
        }
    }

    fn release(&self, discarded: &[ResultEntry]) {
        if discarded.is_empty() {
            return;
        }
        let removed = capture::release(
            discarded,
            self.session.history().entries(),
            self.selected.as_ref(),
            &self.config.capture_dir(),
        );
        tracing::debug!(discarded = discarded.len(), removed, "破棄したエントリの画像を解放");
    }

    fn print_status(&mut self) {
        println!();
        for line in status_lines(&self.session, self.selected.as_ref()) {
            println!("{}", line);
        }
        self.session.clear_error();
    }
}

/// メニュー前の状態表示（選択中の画像、履歴位置、現在のエントリ、エラー）
pub fn status_lines(session: &Session, selected: Option<&SelectedImage>) -> Vec<String> {
    let mut lines = vec![match selected {
        Some(image) => format!("画像: {} ({})", image.file_name(), image.image.mime_type),
        None => "画像: 未選択".to_string(),
    }];
    if !session.history().is_empty() {
        lines.push(format!("履歴: {}", session.position_label()));
    }
    if let Some(entry) = session.current() {
        lines.extend(describe_entry(entry));
        if selected.is_some_and(|s| s.source_ref() != entry.source_image_ref) {
            lines.push(format!("  (別の画像の結果: {})", entry.source_image_ref));
        }
    }
    if let Some(error) = session.error() {
        lines.push(format!("✗ {}", error));
    }
    lines
}

/// 送信中の表示
pub fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn prompt_path(prompt: &str, default: &str) -> Result<PathBuf> {
    let mut input = Input::<String>::new().with_prompt(prompt);
    if !default.is_empty() {
        input = input.default(default.to_string());
    }
    let value = input
        .interact_text()
        .map_err(|e| LensError::Interaction(e.to_string()))?;
    Ok(Path::new(value.trim()).to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use photo_lens_common::{ClassificationRecord, EditedImage, ImageData, ResultPayload};

    fn push(session: &mut Session, payload: ResultPayload) {
        let ticket = session.begin().unwrap();
        session.complete(ticket, "in.jpg", Ok((payload, None)));
    }

    fn edited() -> ResultPayload {
        ResultPayload::Edited(EditedImage {
            image: ImageData::new("image/png", vec![1]),
            caption: None,
        })
    }

    fn report() -> ResultPayload {
        ResultPayload::Classification(ClassificationRecord {
            model: "MiG-29".into(),
            ..Default::default()
        })
    }

    #[test]
    fn test_actions_for_fresh_session() {
        let session = Session::default();
        let actions = available_actions(&session);
        assert_eq!(
            actions,
            vec![
                SessionAction::Edit,
                SessionAction::Identify,
                SessionAction::NewImage,
                SessionAction::Capture,
                SessionAction::Quit,
            ]
        );
    }

    #[test]
    fn test_actions_follow_history() {
        let mut session = Session::default();
        push(&mut session, report());
        push(&mut session, edited());

        let actions = available_actions(&session);
        assert!(actions.contains(&SessionAction::Back));
        assert!(!actions.contains(&SessionAction::Forward));
        assert!(actions.contains(&SessionAction::SaveImage));

        session.step_back();
        let actions = available_actions(&session);
        assert!(!actions.contains(&SessionAction::Back));
        assert!(actions.contains(&SessionAction::Forward));
        // 識別結果には保存する画像が無い
        assert!(!actions.contains(&SessionAction::SaveImage));
        assert!(actions.contains(&SessionAction::ExportPdf));
    }

    fn selected(path: &str) -> SelectedImage {
        SelectedImage {
            image: ImageData::new("image/jpeg", vec![0xFF, 0xD8]),
            path: PathBuf::from(path),
        }
    }

    #[test]
    fn test_status_shows_entry_after_step_back() {
        let mut session = Session::default();
        push(&mut session, report());
        push(&mut session, edited());
        session.step_back();

        let lines = status_lines(&session, Some(&selected("in.jpg")));
        assert!(lines.iter().any(|l| l == "履歴: 1 / 2"));
        assert!(lines.iter().any(|l| l == "[機体識別]"));
        assert!(lines.iter().any(|l| l == "  Model: MiG-29"));
        assert!(!lines.iter().any(|l| l.contains("別の画像")));

        session.step_forward();
        let lines = status_lines(&session, Some(&selected("in.jpg")));
        assert!(lines.iter().any(|l| l == "履歴: 2 / 2"));
        assert!(!lines.iter().any(|l| l.contains("MiG-29")));
    }

    #[test]
    fn test_status_marks_entry_from_other_image() {
        let mut session = Session::default();
        push(&mut session, report());

        let lines = status_lines(&session, Some(&selected("other.jpg")));
        assert!(lines.iter().any(|l| l == "  (別の画像の結果: in.jpg)"));
        assert!(lines.iter().any(|l| l == "  Model: MiG-29"));
    }

    #[test]
    fn test_status_for_fresh_session() {
        let session = Session::default();
        assert_eq!(status_lines(&session, None), vec!["画像: 未選択".to_string()]);
    }

    #[test]
    fn test_describe_entry() {
        let entry = ResultEntry::new(report(), "jet.jpg", None);
        let lines = describe_entry(&entry);
        assert_eq!(lines[0], "[機体識別]");
        assert!(lines.iter().any(|l| l == "  Model: MiG-29"));
        assert!(lines.iter().any(|l| l == "  Location: unknown"));
    }
}
