use clap::Parser;
use photo_lens::{capture, cli, client, config, error, export, interactive, location, session, workflow};
use cli::{Cli, Commands};
use config::Config;
use error::Result;
use location::{ExifLocation, FixedLocation, LocationProvider, NoLocation};
use interactive::spinner;
use std::path::PathBuf;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = Config::load()?;

    match cli.command {
        Commands::Edit { image, prompt, output } => {
            println!("🎨 photo-lens - 画像編集\n");

            let selected = capture::load_file(&image)?;
            let client = client::GeminiClient::from_config(&config);
            let mut session = session::Session::new(config.reset_policy);

            let spinner = spinner("画像を編集中...");
            let completion = workflow::run_edit(&mut session, &client, Some(&selected), &prompt).await;
            spinner.finish_and_clear();
            completion.into_result()?;

            if let Some(entry) = session.current() {
                if let Some(caption) = entry.edited_image().and_then(|e| e.caption.as_deref()) {
                    println!("AI: {}", caption);
                }
                let output = output.unwrap_or_else(|| PathBuf::from("."));
                let path = export::save_image(entry, &output)?;
                println!("✔ 画像を保存: {}", path.display());
            }
        }

        Commands::Identify { image, location, no_location, pdf, pdf_quality, json } => {
            println!("✈ photo-lens - 機体識別\n");

            let selected = capture::load_file(&image)?;
            let client = client::GeminiClient::from_config(&config);
            let locator: Box<dyn LocationProvider> = match (location, no_location) {
                (_, true) => Box::new(NoLocation),
                (Some(point), false) => Box::new(FixedLocation(point)),
                (None, false) => Box::new(ExifLocation),
            };
            let mut session = session::Session::new(config.reset_policy);

            let spinner = spinner("機体を識別中...");
            let completion = workflow::run_identify(
                &mut session,
                &client,
                locator.as_ref(),
                Some(&selected),
                config.location_timeout(),
            )
            .await;
            spinner.finish_and_clear();
            completion.into_result()?;

            if let Some(entry) = session.current() {
                for line in interactive::describe_entry(entry) {
                    println!("{}", line);
                }

                if let Some(path) = json {
                    let path = export::save_json(entry, &path)?;
                    println!("✔ JSON出力: {}", path.display());
                }

                if let Some(path) = pdf {
                    println!("- PDFを生成中... (品質: {})", pdf_quality);
                    let maps_key = config.maps_api_key();
                    let path = export::export_report(entry, maps_key.as_deref(), &path, pdf_quality).await?;
                    println!("✔ PDF出力: {}", path.display());
                }
            }
        }

        Commands::Capture { output } => {
            println!("📷 photo-lens - 撮影\n");

            let mut camera = capture::CameraSession::open(&config.camera_command, &config.capture_dir()).await?;
            let spinner = spinner("撮影中...");
            let frame = camera.capture_frame().await;
            spinner.finish_and_clear();
            camera.close().await?;
            let frame = frame?;

            let path = match output {
                Some(output) => {
                    let stem = frame
                        .path
                        .file_stem()
                        .map(|s| s.to_string_lossy().to_string())
                        .unwrap_or_else(|| "capture".to_string());
                    let path = export::output_path_for(&output, &stem, "jpg");
                    std::fs::rename(&frame.path, &path).or_else(|_| {
                        std::fs::copy(&frame.path, &path)?;
                        std::fs::remove_file(&frame.path)
                    })?;
                    path
                }
                None => frame.path.clone(),
            };
            println!("✔ 撮影画像: {}", path.display());
        }

        Commands::Session { image, camera } => {
            println!("📸 photo-lens - 対話セッション\n");
            interactive::run_interactive(config, image, camera).await?;
        }

        Commands::Config { set_api_key, set_maps_key, show } => {
            let mut config = config;

            if let Some(key) = set_api_key {
                config.set_api_key(key)?;
                println!("✔ APIキーを設定しました");
            }

            if let Some(key) = set_maps_key {
                config.set_maps_api_key(key)?;
                println!("✔ 地図用APIキーを設定しました");
            }

            if show {
                let configured = |set: bool| if set { "設定済み" } else { "未設定" };
                println!("設定:");
                println!("  APIエンドポイント: {}", config.api_base_url);
                println!("  編集モデル: {}", config.edit_model);
                println!("  識別モデル: {}", config.identify_model);
                println!("  位置情報タイムアウト: {}ms", config.location_timeout_ms);
                println!("  リセット方式: {:?}", config.reset_policy);
                println!("  カメラコマンド: {}", config.camera_command.join(" "));
                println!("  キャプチャ保存先: {}", config.capture_dir().display());
                println!("  APIキー: {}", configured(config.api_key().is_some()));
                println!("  地図用APIキー: {}", configured(config.maps_api_key().is_some()));
            }
        }
    }

    Ok(())
}

/// ログは標準エラーへ。RUST_LOG が無ければ warn（--verbose で debug）
fn init_logging(verbose: bool) {
    let default_level = if verbose { "photo_lens=debug,warn" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
}
