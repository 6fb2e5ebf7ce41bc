use thiserror::Error;

#[derive(Error, Debug)]
pub enum LensError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("APIキーが設定されていません。環境変数 GEMINI_API_KEY を設定するか `photo-lens config --set-api-key YOUR_KEY` で設定してください")]
    MissingApiKey,

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("対応していない画像形式です（PNG/JPEG/WEBPのみ）: {0}")]
    UnsupportedImage(String),

    #[error("画像読み込みエラー: {0}")]
    ImageDecode(String),

    #[error("画像をアップロードし、編集内容を入力してください")]
    EmptyInstruction,

    #[error("画像が選択されていません")]
    NoImageSelected,

    #[error("前の処理が実行中です")]
    Busy,

    #[error("API呼び出しエラー: {0}")]
    ApiCall(String),

    #[error("APIレスポンスのパースに失敗: {0}")]
    ApiParse(String),

    #[error("モデルが画像を返しませんでした。別の指示で試してください")]
    NoImageReturned,

    #[error("通信エラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] photo_lens_common::Error),

    #[error("PDF生成エラー: {0}")]
    PdfGeneration(String),

    #[error("カメラエラー: {0}")]
    Camera(String),

    #[error("出力できる画像がありません: {0}")]
    NothingToExport(String),

    #[error("入力エラー: {0}")]
    Interaction(String),
}

pub type Result<T> = std::result::Result<T, LensError>;
