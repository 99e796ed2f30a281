use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use stamp_ai_rust::{cli, collection, config, error, ingest, recognizer, render, session};
use cli::{Cli, CollectionAction, Commands};
use collection::CollectionStore;
use config::Config;
use error::{Result, StampAiError};
use recognizer::GeminiClient;
use session::{AnalysisStatus, ScanSession, SCAN_FAILED_MESSAGE};
use std::io::IsTerminal;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("✖ {}", e);
            ExitCode::FAILURE
        }
    }
}

/// tracingの初期化（RUST_LOG優先、--verboseでdebug）
fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("stamp_ai_rust={level},stamp_ai_common={level},warn"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::load()?;

    // APIキー未設定は警告のみ（スキャン以外は使える）
    if !matches!(cli.command, Commands::Config { .. }) {
        if let Some(warning) = config.api_key_warning() {
            eprintln!("⚠️  {}\n", warning);
        }
    }

    match cli.command {
        Commands::Scan { image, save, json } => scan(&config, &image, save, json).await,

        Commands::Collection { action } => {
            let mut store = CollectionStore::load(config.collection_path()?);
            collection_command(&mut store, action)?;
            Ok(ExitCode::SUCCESS)
        }

        Commands::Config { set_api_key, show } => {
            let mut config = config;

            if let Some(key) = set_api_key {
                config.set_api_key(key)?;
                println!("✔ APIキーを設定しました");
            }

            if show {
                println!("設定:");
                println!("  画像分析モデル: {}", config.vision_model);
                println!("  検索モデル: {}", config.search_model);
                println!("  エンドポイント: {}", config.endpoint());
                println!("  最大画像サイズ: {} bytes", config.max_image_bytes);
                let timeout = match config.timeout_seconds {
                    0 => "なし".to_string(),
                    secs => format!("{}秒", secs),
                };
                println!("  タイムアウト: {}", timeout);
                println!("  コレクション: {}", config.collection_path()?.display());
                println!("  APIキー: {}", if config.get_api_key().is_ok() { "設定済み" } else { "未設定" });
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn scan(config: &Config, path: &Path, save: bool, json: bool) -> Result<ExitCode> {
    let client = GeminiClient::from_config(config)?;

    // 取り込みエラーはパイプライン開始前に報告
    let image = ingest::ingest_image(path, config.max_image_bytes)?;

    if !json {
        println!("📮 stamp-ai - 切手解析\n");
        match image.preview.dimensions {
            Some((w, h)) => println!("- {} ({}x{})", image.preview.file_name, w, h),
            None => println!("- {}", image.preview.file_name),
        }
    }

    let spinner = if json {
        ProgressBar::hidden()
    } else {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            spinner.set_style(style);
        }
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner
    };

    let mut session = ScanSession::new();
    let status = session
        .run(&client, image, |status| {
            if let Some((title, detail)) = render::status_message(status) {
                spinner.set_message(format!("{} {}", title, detail));
            }
        })
        .await?;
    spinner.finish_and_clear();

    let record = match (status, session.state().data.as_ref()) {
        (AnalysisStatus::Complete, Some(record)) => record,
        _ => {
            let message = session.state().error.as_deref().unwrap_or(SCAN_FAILED_MESSAGE);
            eprintln!("✖ {}", message);
            eprintln!("  Tekrar denemek için komutu yeniden çalıştırın.");
            return Ok(ExitCode::FAILURE);
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(record)?);
    } else {
        println!("{}\n", render::stamp_card(record));
    }

    let add = save || (!json && std::io::stdin().is_terminal() && confirm_add()?);
    if add {
        let mut store = CollectionStore::load(config.collection_path()?);
        let saved = session.collect(&mut store)?;
        if !json {
            println!("✔ Koleksiyona eklendi: {} ({} adet pul)", saved.id, store.len());
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn confirm_add() -> Result<bool> {
    dialoguer::Confirm::new()
        .with_prompt("Koleksiyona eklensin mi?")
        .default(true)
        .interact()
        .map_err(|e| StampAiError::CliExecution(e.to_string()))
}

fn collection_command(store: &mut CollectionStore, action: CollectionAction) -> Result<()> {
    match action {
        CollectionAction::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(store.items())?);
            } else if store.is_empty() {
                println!("Koleksiyonunuz Boş. Henüz hiç pul kaydetmediniz.");
            } else {
                println!("Koleksiyonum ({} adet pul kaydedildi)\n", store.len());
                for stamp in store.items() {
                    println!("{}", render::collection_row(stamp));
                }
            }
        }

        CollectionAction::Show { id, image_out } => {
            let stamp = store
                .get(&id)
                .ok_or_else(|| StampAiError::StampNotFound(id.clone()))?;

            println!("{}\n", render::stamp_card(&stamp.record));
            println!("   ID: {}", stamp.id);
            println!("   Eklenme: {}", render::format_date_added(stamp.date_added));

            if let Some(out) = image_out {
                let bytes = ingest::decode_image(&stamp.image_base64)?;
                std::fs::write(&out, bytes)?;
                println!("✔ Görsel kaydedildi: {} ({})", out.display(), stamp.image_mime_type);
            }
        }

        CollectionAction::Remove { id } => {
            if store.remove(&id) {
                println!("✔ Silindi: {} ({} adet pul kaldı)", id, store.len());
            } else {
                println!("Bu kimlikle pul yok, değişiklik yapılmadı: {}", id);
            }
        }
    }

    Ok(())
}
