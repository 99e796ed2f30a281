//! 解析セッション（アプリケーション状態機械）
//!
//! 状態遷移:
//! - idle → analyzing_image: 画像選択
//! - analyzing_image → searching_catalogs: Stage A完了（表示用の下位段階）
//! - analyzing_image/searching_catalogs → complete | error: パイプライン終了
//! - complete → idle: 別の切手をスキャン
//! - error → idle: 再試行
//! - 任意 → idle: リセット
//!
//! 解析中の再開始は拒否する。リセット後に届いた古い結果は破棄する。

use crate::collection::CollectionStore;
use crate::error::{StampAiError, Result};
use crate::ingest::{ImagePayload, ImagePreview, IngestedImage};
use crate::recognizer::{recognize_stamp, Stage, StampProvider};
use stamp_ai_common::{CollectedStamp, StampRecord};
use tracing::{error, info, warn};

/// ユーザーに表示する固定エラーメッセージ（詳細はログのみ）
pub const SCAN_FAILED_MESSAGE: &str =
    "Pul tanımlanamadı veya bir hata oluştu. Lütfen daha net bir fotoğraf deneyin.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalysisStatus {
    #[default]
    Idle,
    AnalyzingImage,
    SearchingCatalogs,
    Complete,
    Error,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Idle => "idle",
            AnalysisStatus::AnalyzingImage => "analyzing_image",
            AnalysisStatus::SearchingCatalogs => "searching_catalogs",
            AnalysisStatus::Complete => "complete",
            AnalysisStatus::Error => "error",
        }
    }

    /// パイプライン実行中か
    pub fn is_busy(&self) -> bool {
        matches!(self, AnalysisStatus::AnalyzingImage | AnalysisStatus::SearchingCatalogs)
    }
}

impl std::fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 現在の解析状態（`data` は complete のときだけ Some）
#[derive(Debug, Clone, Default)]
pub struct AnalysisState {
    pub status: AnalysisStatus,
    pub data: Option<StampRecord>,
    pub error: Option<String>,
    pub preview: Option<ImagePreview>,
}

/// 1回の解析実行を識別するチケット
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTicket(u64);

#[derive(Debug, Default)]
pub struct ScanSession {
    state: AnalysisState,
    payload: Option<ImagePayload>,
    current_run: Option<u64>,
    runs_started: u64,
    /// この解析結果から追加した切手のID
    saved: Option<String>,
}

impl ScanSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &AnalysisState {
        &self.state
    }

    pub fn status(&self) -> AnalysisStatus {
        self.state.status
    }

    /// 保存用に保持している画像ペイロード
    pub fn payload(&self) -> Option<&ImagePayload> {
        self.payload.as_ref()
    }

    /// idle → analyzing_image
    pub fn begin(&mut self, image: IngestedImage) -> Result<RunTicket> {
        match self.state.status {
            AnalysisStatus::Idle => {}
            status if status.is_busy() => return Err(StampAiError::ScanInProgress),
            status => return Err(invalid_transition(status, "begin")),
        }

        self.runs_started += 1;
        let run = self.runs_started;
        self.current_run = Some(run);

        info!(run, file = %image.preview.file_name, "解析開始");
        self.state = AnalysisState {
            status: AnalysisStatus::AnalyzingImage,
            data: None,
            error: None,
            preview: Some(image.preview),
        };
        self.payload = Some(image.payload);
        self.saved = None;

        Ok(RunTicket(run))
    }

    fn is_current(&self, ticket: RunTicket) -> bool {
        self.current_run == Some(ticket.0) && self.state.status.is_busy()
    }

    /// analyzing_image → searching_catalogs
    pub fn enter_catalog_search(&mut self, ticket: RunTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.state.status = AnalysisStatus::SearchingCatalogs;
        true
    }

    /// パイプライン結果を反映（古いチケットの結果は破棄して false）
    pub fn finish(&mut self, ticket: RunTicket, outcome: Result<StampRecord>) -> bool {
        if !self.is_current(ticket) {
            warn!(run = ticket.0, "古い解析結果を破棄");
            return false;
        }
        self.current_run = None;

        match outcome {
            Ok(record) => {
                info!(run = ticket.0, title = %record.title, rarity = %record.rarity, "解析完了");
                self.state.status = AnalysisStatus::Complete;
                self.state.data = Some(record);
                self.state.error = None;
            }
            Err(e) => {
                error!(run = ticket.0, error = %e, "切手の解析に失敗");
                self.state.status = AnalysisStatus::Error;
                self.state.data = None;
                self.state.error = Some(SCAN_FAILED_MESSAGE.to_string());
            }
        }
        true
    }

    /// 任意の状態 → idle（実行中の結果は以後破棄される）
    pub fn reset(&mut self) {
        self.state = AnalysisState::default();
        self.payload = None;
        self.current_run = None;
        self.saved = None;
    }

    /// complete → idle
    pub fn scan_another(&mut self) -> Result<()> {
        if self.state.status != AnalysisStatus::Complete {
            return Err(invalid_transition(self.state.status, "scan_another"));
        }
        self.reset();
        Ok(())
    }

    /// error → idle
    pub fn retry(&mut self) -> Result<()> {
        if self.state.status != AnalysisStatus::Error {
            return Err(invalid_transition(self.state.status, "retry"));
        }
        self.reset();
        Ok(())
    }

    /// 解析結果を保存時点の画像と一緒にコレクションへ追加
    ///
    /// 1つの解析結果は1回だけ追加できる。
    pub fn collect(&mut self, store: &mut CollectionStore) -> Result<CollectedStamp> {
        if let Some(id) = &self.saved {
            return Err(StampAiError::AlreadyCollected(id.clone()));
        }

        match (&self.state.status, &self.state.data, &self.payload) {
            (AnalysisStatus::Complete, Some(record), Some(payload)) => {
                let stamp = store.add(record.clone(), payload).clone();
                self.saved = Some(stamp.id.clone());
                Ok(stamp)
            }
            _ => Err(StampAiError::NothingToCollect),
        }
    }

    /// 追加済みならそのID
    pub fn saved_id(&self) -> Option<&str> {
        self.saved.as_deref()
    }

    /// 画像選択から結果反映までを実行
    ///
    /// パイプラインの失敗は状態（error）に反映され、戻り値は最終状態。
    /// `Err` になるのは解析を開始できなかった場合だけ。
    pub async fn run<P>(
        &mut self,
        provider: &P,
        image: IngestedImage,
        on_status: impl Fn(AnalysisStatus),
    ) -> Result<AnalysisStatus>
    where
        P: StampProvider + ?Sized,
    {
        let payload = image.payload.clone();
        let ticket = self.begin(image)?;
        on_status(self.status());

        let outcome = recognize_stamp(provider, &payload, |stage| {
            if stage == Stage::CatalogSearch && self.enter_catalog_search(ticket) {
                on_status(self.status());
            }
        })
        .await;

        self.finish(ticket, outcome);
        on_status(self.status());
        Ok(self.status())
    }
}

fn invalid_transition(from: AnalysisStatus, action: &str) -> StampAiError {
    StampAiError::InvalidTransition {
        from: from.to_string(),
        action: action.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn image() -> IngestedImage {
        IngestedImage {
            preview: ImagePreview {
                path: PathBuf::from("pul.png"),
                file_name: "pul.png".to_string(),
                dimensions: Some((10, 10)),
            },
            payload: ImagePayload {
                mime_type: "image/png".to_string(),
                data: "AAAA".to_string(),
            },
        }
    }

    #[test]
    fn test_begin_from_idle() {
        let mut session = ScanSession::new();
        session.begin(image()).unwrap();

        let state = session.state();
        assert_eq!(state.status, AnalysisStatus::AnalyzingImage);
        assert!(state.data.is_none());
        assert_eq!(state.preview.as_ref().unwrap().file_name, "pul.png");
    }

    #[test]
    fn test_begin_while_busy_is_rejected() {
        let mut session = ScanSession::new();
        session.begin(image()).unwrap();
        assert!(matches!(session.begin(image()), Err(StampAiError::ScanInProgress)));
    }

    #[test]
    fn test_finish_ok_and_scan_another() {
        let mut session = ScanSession::new();
        let ticket = session.begin(image()).unwrap();
        assert!(session.enter_catalog_search(ticket));
        assert_eq!(session.status(), AnalysisStatus::SearchingCatalogs);

        assert!(session.finish(ticket, Ok(StampRecord::default())));
        assert_eq!(session.status(), AnalysisStatus::Complete);
        assert!(session.state().data.is_some());

        // complete からの begin は不可
        assert!(matches!(
            session.begin(image()),
            Err(StampAiError::InvalidTransition { .. })
        ));

        session.scan_another().unwrap();
        assert_eq!(session.status(), AnalysisStatus::Idle);
        assert!(session.state().preview.is_none());
        assert!(session.payload().is_none());
    }

    #[test]
    fn test_finish_err_uses_fixed_message_and_retry() {
        let mut session = ScanSession::new();
        let ticket = session.begin(image()).unwrap();
        session.finish(ticket, Err(StampAiError::ApiCall("500 internal".into())));

        let state = session.state();
        assert_eq!(state.status, AnalysisStatus::Error);
        assert!(state.data.is_none());
        assert_eq!(state.error.as_deref(), Some(SCAN_FAILED_MESSAGE));

        assert!(session.scan_another().is_err());
        session.retry().unwrap();
        assert_eq!(session.status(), AnalysisStatus::Idle);
        assert!(session.state().error.is_none());
    }

    #[test]
    fn test_stale_result_after_reset_is_discarded() {
        let mut session = ScanSession::new();
        let old = session.begin(image()).unwrap();
        session.reset();
        let new = session.begin(image()).unwrap();

        assert!(!session.finish(old, Ok(StampRecord::default())));
        assert_eq!(session.status(), AnalysisStatus::AnalyzingImage);
        assert!(session.finish(new, Ok(StampRecord::default())));
        assert_eq!(session.status(), AnalysisStatus::Complete);
    }

    #[test]
    fn test_collect_requires_complete() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let mut store = CollectionStore::load(dir.path().join("collection.json"));
        let mut session = ScanSession::new();

        assert!(matches!(session.collect(&mut store), Err(StampAiError::NothingToCollect)));

        let ticket = session.begin(image()).unwrap();
        session.finish(ticket, Ok(StampRecord::default()));
        let saved = session.collect(&mut store).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(saved.image_base64, "AAAA");
        assert_eq!(saved.image_mime_type, "image/png");
        assert_eq!(session.saved_id(), Some(saved.id.as_str()));
    }

    #[test]
    fn test_collect_twice_adds_once() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let mut store = CollectionStore::load(dir.path().join("collection.json"));
        let mut session = ScanSession::new();

        let ticket = session.begin(image()).unwrap();
        session.finish(ticket, Ok(StampRecord::default()));
        let first = session.collect(&mut store).unwrap();

        match session.collect(&mut store) {
            Err(StampAiError::AlreadyCollected(id)) => assert_eq!(id, first.id),
            other => panic!("想定外の結果: {:?}", other),
        }
        assert_eq!(store.len(), 1);
        assert_eq!(CollectionStore::load(store.path()).len(), 1);
    }

    #[test]
    fn test_next_scan_can_be_collected_again() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let mut store = CollectionStore::load(dir.path().join("collection.json"));
        let mut session = ScanSession::new();

        let ticket = session.begin(image()).unwrap();
        session.finish(ticket, Ok(StampRecord::default()));
        session.collect(&mut store).unwrap();

        session.scan_another().unwrap();
        assert!(session.saved_id().is_none());

        let ticket = session.begin(image()).unwrap();
        session.finish(ticket, Ok(StampRecord::default()));
        session.collect(&mut store).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_retry_from_idle_is_invalid() {
        let mut session = ScanSession::new();
        assert!(matches!(session.retry(), Err(StampAiError::InvalidTransition { .. })));
    }
}
