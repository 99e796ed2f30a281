use crate::error::{StampAiError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// APIキーを探す環境変数（優先順）
const API_KEY_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub api_key: Option<String>,
    /// Stage A（画像分析）のモデル
    pub vision_model: String,
    /// Stage B（検索グラウンディング）のモデル
    pub search_model: String,
    pub endpoint: Option<String>,
    /// 0 はタイムアウトなし
    pub timeout_seconds: u64,
    pub collection_path: Option<PathBuf>,
    pub max_image_bytes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            vision_model: "gemini-3-pro-preview".into(),
            search_model: "gemini-2.5-flash".into(),
            endpoint: None,
            timeout_seconds: 0,
            collection_path: None,
            max_image_bytes: 20 * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| StampAiError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("stamp-ai"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// コレクションの保存先（未指定なら設定ディレクトリ直下）
    pub fn collection_path(&self) -> Result<PathBuf> {
        match &self.collection_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::config_dir()?.join("collection.json")),
        }
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    pub fn get_api_key(&self) -> Result<String> {
        // 環境変数を優先
        for var in API_KEY_ENV_VARS {
            if let Ok(key) = std::env::var(var) {
                if !key.trim().is_empty() {
                    return Ok(key.trim().to_string());
                }
            }
        }

        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .ok_or(StampAiError::MissingApiKey)
    }

    /// 起動時チェック: APIキーがなければ警告文を返す（致命的ではない）
    pub fn api_key_warning(&self) -> Option<&'static str> {
        match self.get_api_key() {
            Ok(_) => None,
            Err(_) => Some("UYARI: API Anahtarı Eksik. GEMINI_API_KEY ortam değişkenini ayarlayın veya `stamp-ai config --set-api-key` kullanın."),
        }
    }

    pub fn set_api_key(&mut self, key: String) -> Result<()> {
        self.api_key = Some(key);
        self.save()
    }
}
