//! コレクションストア
//!
//! 保存した切手をJSONファイル1つに永続化する。新しいものが先頭。
//! 書き込み失敗はログに残すだけで、メモリ上の状態を正とする。

use crate::error::Result;
use crate::ingest::ImagePayload;
use serde::Serialize;
use stamp_ai_common::{CollectedStamp, StampRecord};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct CollectionStore {
    path: PathBuf,
    items: Vec<CollectedStamp>,
}

impl CollectionStore {
    /// 保存済みコレクションを読み込み
    ///
    /// ファイルがない・壊れている場合は空のコレクションで始める。
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let items = if path.exists() {
            match read_items(&path) {
                Ok(items) => items,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "コレクションを読み込めないため空で開始します");
                    Vec::new()
                }
            }
        } else {
            debug!(path = %path.display(), "コレクションファイルなし");
            Vec::new()
        };

        Self { path, items }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn items(&self) -> &[CollectedStamp] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&CollectedStamp> {
        self.items.iter().find(|item| item.id == id)
    }

    /// 切手を先頭に追加して保存
    pub fn add(&mut self, record: StampRecord, image: &ImagePayload) -> &CollectedStamp {
        let stamp = CollectedStamp {
            record,
            id: self.next_id(),
            date_added: chrono::Utc::now().timestamp_millis(),
            image_base64: image.data.clone(),
            image_mime_type: image.mime_type.clone(),
        };

        debug!(id = %stamp.id, title = %stamp.record.title, "コレクションに追加");
        self.items.insert(0, stamp);
        self.persist();
        &self.items[0]
    }

    /// IDが一致する切手を削除して保存（存在しなければ何もしない）
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        let removed = self.items.len() != before;

        if removed {
            debug!(id, "コレクションから削除");
            self.persist();
        }
        removed
    }

    /// 全件を書き出す（一時ファイルに書いてから置き換える）
    pub fn save(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            write_json(&mut writer, &self.items)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            warn!(path = %self.path.display(), error = %e, "コレクションの保存に失敗（メモリ上の状態は保持）");
        }
    }

    fn next_id(&self) -> String {
        loop {
            let id = Uuid::new_v4().to_string();
            if self.get(&id).is_none() {
                return id;
            }
        }
    }
}

fn read_items(path: &Path) -> Result<Vec<CollectedStamp>> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

fn write_json<W: Write, T: Serialize + ?Sized>(writer: W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}
