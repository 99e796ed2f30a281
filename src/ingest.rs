//! 画像取り込み
//!
//! ユーザーが選んだ画像ファイルから、表示用プレビューと
//! 送信用ペイロード（Base64 + MIMEタイプ）を作る。

use crate::error::{StampAiError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// プロバイダが受け付ける形式
const SUPPORTED_FORMATS: &[ImageFormat] = &[ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::WebP];

/// 送信用ペイロード
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: String,
    /// Base64エンコード済みの画像バイト
    pub data: String,
}

/// ローカル表示用のプレビュー参照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePreview {
    pub path: PathBuf,
    pub file_name: String,
    pub dimensions: Option<(u32, u32)>,
}

#[derive(Debug, Clone)]
pub struct IngestedImage {
    pub preview: ImagePreview,
    pub payload: ImagePayload,
}

/// 画像ファイルを取り込む
pub fn ingest_image(path: &Path, max_bytes: u64) -> Result<IngestedImage> {
    if !path.is_file() {
        return Err(StampAiError::FileNotFound(path.display().to_string()));
    }

    // 読み込む前にサイズ上限を確認
    let size = std::fs::metadata(path)?.len();
    if size > max_bytes {
        return Err(StampAiError::ImageTooLarge { size, limit: max_bytes });
    }

    let bytes = std::fs::read(path)
        .map_err(|e| StampAiError::ImageLoad(format!("{}: {}", path.display(), e)))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let (payload, dimensions) = encode_image(&bytes, Some(path))?;

    Ok(IngestedImage {
        preview: ImagePreview {
            path: path.to_path_buf(),
            file_name,
            dimensions,
        },
        payload,
    })
}

/// バイト列をペイロードに変換（形式はマジックバイト優先、拡張子で補完）
pub fn encode_image(bytes: &[u8], path: Option<&Path>) -> Result<(ImagePayload, Option<(u32, u32)>)> {
    if bytes.is_empty() {
        return Err(StampAiError::ImageLoad("空のファイル".into()));
    }

    let format = image::guess_format(bytes)
        .ok()
        .or_else(|| path.and_then(|p| ImageFormat::from_path(p).ok()))
        .ok_or_else(|| {
            StampAiError::UnsupportedImage(
                path.map(|p| p.display().to_string())
                    .unwrap_or_else(|| "unknown".into()),
            )
        })?;

    if !SUPPORTED_FORMATS.contains(&format) {
        return Err(StampAiError::UnsupportedImage(format.to_mime_type().to_string()));
    }

    let dimensions = image::ImageReader::with_format(Cursor::new(bytes), format)
        .into_dimensions()
        .ok();

    Ok((
        ImagePayload {
            mime_type: format.to_mime_type().to_string(),
            data: STANDARD.encode(bytes),
        },
        dimensions,
    ))
}

/// 保存済みのBase64画像をバイト列に戻す
pub fn decode_image(data: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(data.trim())
        .map_err(|e| StampAiError::ImageLoad(format!("Base64デコードエラー: {}", e)))
}
