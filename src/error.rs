use thiserror::Error;

#[derive(Error, Debug)]
pub enum StampAiError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("APIキーが設定されていません。`stamp-ai config --set-api-key YOUR_KEY` で設定するか GEMINI_API_KEY を指定してください")]
    MissingApiKey,

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("画像読み込みエラー: {0}")]
    ImageLoad(String),

    #[error("対応していない画像形式: {0}（JPEG/PNG/WebPのみ）")]
    UnsupportedImage(String),

    #[error("画像サイズが上限を超えています: {size} bytes（上限 {limit} bytes）")]
    ImageTooLarge { size: u64, limit: u64 },

    #[error("API呼び出しエラー: {0}")]
    ApiCall(String),

    #[error("視覚分析に失敗: {0}")]
    VisualAnalysis(String),

    #[error("同定に失敗: {0}")]
    Identification(String),

    #[error("APIレスポンスのパースに失敗: {0}")]
    ApiParse(String),

    #[error("解析が進行中です")]
    ScanInProgress,

    #[error("状態遷移エラー: {from} から {action} はできません")]
    InvalidTransition { from: String, action: String },

    #[error("コレクションに追加できる解析結果がありません")]
    NothingToCollect,

    #[error("この解析結果は既にコレクションに追加済みです: {0}")]
    AlreadyCollected(String),

    #[error("切手が見つかりません: {0}")]
    StampNotFound(String),

    #[error("CLI実行エラー: {0}")]
    CliExecution(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StampAiError>;
