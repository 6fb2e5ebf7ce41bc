use clap::{Parser, Subcommand};
use crate::export::PdfQuality;
use photo_lens_common::GeoPoint;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "photo-lens")]
#[command(about = "画像編集・機体識別AIクライアント", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 指示に従って画像を編集
    Edit {
        /// 入力画像（PNG/JPEG/WEBP）
        #[arg(required = true)]
        image: PathBuf,

        /// 編集内容（例: "レトロなフィルターをかけて"）
        #[arg(short, long)]
        prompt: String,

        /// 出力ファイル/ディレクトリ（デフォルト: カレント/edited-image.{拡張子}）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 写っている機体を識別してレポートを出力
    Identify {
        /// 入力画像（PNG/JPEG/WEBP）
        #[arg(required = true)]
        image: PathBuf,

        /// 撮影位置を指定（LAT,LON）。省略時はEXIFのGPS情報
        #[arg(long, conflicts_with = "no_location")]
        location: Option<GeoPoint>,

        /// 位置情報を使わない
        #[arg(long)]
        no_location: bool,

        /// PDFレポートの出力先
        #[arg(long)]
        pdf: Option<PathBuf>,

        /// PDF画像品質 (high/medium/low)
        #[arg(long, default_value = "medium")]
        pdf_quality: PdfQuality,

        /// 結果JSONの出力先
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// カメラから1枚撮影して保存
    Capture {
        /// 出力ファイル（デフォルト: キャプチャディレクトリ）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 対話セッション（編集・識別・履歴の行き来）
    Session {
        /// 最初に読み込む画像
        image: Option<PathBuf>,

        /// カメラから撮影して始める
        #[arg(long, conflicts_with = "image")]
        camera: bool,
    },

    /// 設定を表示/編集
    Config {
        /// APIキーを設定
        #[arg(long)]
        set_api_key: Option<String>,

        /// 地図用APIキーを設定
        #[arg(long)]
        set_maps_key: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_identify() {
        let cli = Cli::parse_from([
            "photo-lens",
            "identify",
            "jet.jpg",
            "--location",
            "35.5,139.7",
            "--pdf-quality",
            "low",
            "-v",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Identify { image, location, no_location, pdf_quality, .. } => {
                assert_eq!(image, PathBuf::from("jet.jpg"));
                assert_eq!(location, GeoPoint::new(35.5, 139.7).ok());
                assert!(!no_location);
                assert_eq!(pdf_quality, PdfQuality::Low);
            }
            _ => panic!("identify expected"),
        }
    }

    #[test]
    fn test_location_conflicts_with_no_location() {
        let result = Cli::try_parse_from([
            "photo-lens",
            "identify",
            "jet.jpg",
            "--location",
            "1,2",
            "--no-location",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_edit_requires_prompt() {
        assert!(Cli::try_parse_from(["photo-lens", "edit", "in.png"]).is_err());

        let cli = Cli::parse_from(["photo-lens", "edit", "in.png", "-p", "sepia"]);
        match cli.command {
            Commands::Edit { prompt, output, .. } => {
                assert_eq!(prompt, "sepia");
                assert!(output.is_none());
            }
            _ => panic!("edit expected"),
        }
    }

    #[test]
    fn test_invalid_location_rejected() {
        let result = Cli::try_parse_from(["photo-lens", "identify", "a.jpg", "--location", "north"]);
        assert!(result.is_err());
    }
}
