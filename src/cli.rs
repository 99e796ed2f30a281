use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stamp-ai")]
#[command(about = "切手写真AI鑑定・コレクション管理ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 切手写真を解析して結果カードを表示
    Scan {
        /// 切手画像（JPEG/PNG/WebP）
        #[arg(required = true)]
        image: PathBuf,

        /// 確認なしでコレクションに追加
        #[arg(long)]
        save: bool,

        /// 結果をJSONで出力
        #[arg(long)]
        json: bool,
    },

    /// 保存したコレクションを管理
    Collection {
        #[command(subcommand)]
        action: CollectionAction,
    },

    /// 設定を表示/編集
    Config {
        /// APIキーを設定
        #[arg(long)]
        set_api_key: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

#[derive(Subcommand)]
pub enum CollectionAction {
    /// 一覧表示（新しい順）
    List {
        /// JSONで出力
        #[arg(long)]
        json: bool,
    },

    /// 1件の詳細を表示
    Show {
        /// 切手ID
        id: String,

        /// 保存されている画像を書き出す
        #[arg(long)]
        image_out: Option<PathBuf>,
    },

    /// IDを指定して削除
    Remove {
        /// 切手ID
        id: String,
    },
}
