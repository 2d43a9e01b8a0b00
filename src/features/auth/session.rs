use crate::features::auth::secure_storage::{MemoryTokenStorage, TokenStorage};
use crate::shared::errors::{AppError, AppResult};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

/// セッションの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// トークンなし
    Anonymous,
    /// トークンあり
    Active,
    /// サーバーからトークンの失効を通知された
    Expired,
}

/// リクエスト送信時点のセッション情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// トークン（存在しない場合はNone）
    pub token: Option<String>,
    /// トークンの世代番号
    pub generation: u64,
}

struct SessionState {
    token: Option<String>,
    generation: u64,
}

/// セッションコンテキスト
///
/// ベアラートークンを1つだけ保持し、HTTPクライアントと各サービスに
/// 明示的に渡される。トークンが変わるたびに世代番号が進み、401による
/// 失効は送信時の世代が現在の世代と一致する場合にだけ反映される。
pub struct SessionContext {
    /// 永続化先
    storage: Arc<dyn TokenStorage>,
    /// メモリ上の状態（awaitをまたいで保持しない）
    state: Mutex<SessionState>,
    /// 状態変化の通知
    status: watch::Sender<SessionStatus>,
}

impl SessionContext {
    /// ストレージから既存のトークンを読み込んでセッションを作成する
    ///
    /// # 引数
    /// * `storage` - トークンの永続化先
    ///
    /// # 戻り値
    /// SessionContext、または読み込み失敗時はエラー
    pub fn new(storage: Arc<dyn TokenStorage>) -> AppResult<Self> {
        let token = storage.load_token()?;
        let initial = if token.is_some() {
            SessionStatus::Active
        } else {
            SessionStatus::Anonymous
        };
        log::debug!("セッションを初期化しました: status={initial:?}");

        Ok(Self {
            storage,
            state: Mutex::new(SessionState {
                token,
                generation: 0,
            }),
            status: watch::channel(initial).0,
        })
    }

    /// メモリ上だけのセッションを作成する
    pub fn in_memory() -> Self {
        let storage: Arc<dyn TokenStorage> = Arc::new(MemoryTokenStorage::new());
        Self {
            storage,
            state: Mutex::new(SessionState {
                token: None,
                generation: 0,
            }),
            status: watch::channel(SessionStatus::Anonymous).0,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 現在のトークンを取得する
    pub fn get_token(&self) -> Option<String> {
        self.lock_state().token.clone()
    }

    /// トークンを保存する（既存のトークンは上書き）
    ///
    /// # 引数
    /// * `token` - ベアラートークン
    ///
    /// # 戻り値
    /// 処理結果。空のトークンやヘッダーに使えない文字を含むトークンはエラー
    pub fn set_token(&self, token: &str) -> AppResult<()> {
        let token = token.trim();
        validate_token(token)?;

        let mut state = self.lock_state();
        self.storage.save_token(token)?;
        state.token = Some(token.to_string());
        state.generation += 1;
        let generation = state.generation;
        drop(state);

        self.status.send_replace(SessionStatus::Active);
        log::info!("セッショントークンを設定しました: generation={generation}");
        Ok(())
    }

    /// トークンを削除する（存在しない場合は何もしない）
    ///
    /// メモリ上のトークンは必ず削除される。永続化先からの削除に失敗した
    /// 場合のみエラーを返す。
    pub fn clear_token(&self) -> AppResult<()> {
        let mut state = self.lock_state();
        if state.token.is_none() {
            return Ok(());
        }

        state.token = None;
        state.generation += 1;
        self.status.send_replace(SessionStatus::Anonymous);
        let removed = self.storage.remove_token();
        drop(state);

        removed.map_err(|e| {
            log::error!("保存済みトークンの削除に失敗しました: {e}");
            e
        })?;
        log::info!("セッショントークンを削除しました");
        Ok(())
    }

    /// リクエスト用に現在のトークンと世代番号を取得する
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock_state();
        SessionSnapshot {
            token: state.token.clone(),
            generation: state.generation,
        }
    }

    /// サーバーから401を受けたときにセッションを失効させる
    ///
    /// メモリ上のトークンは必ず削除される。永続化先からの削除に失敗しても
    /// ログに残すだけで失効は取り消さない。
    ///
    /// # 引数
    /// * `generation` - リクエスト送信時の世代番号
    ///
    /// # 戻り値
    /// この呼び出しで失効が確定した場合はtrue。
    /// 同じ世代の失効が既に処理済み、またはその後に新しいトークンが
    /// 設定されている場合はfalse
    pub fn invalidate(&self, generation: u64) -> bool {
        let mut state = self.lock_state();
        if state.generation != generation {
            log::debug!(
                "古い世代の401を無視します: request_generation={generation}, current={}",
                state.generation
            );
            return false;
        }

        let had_token = state.token.take().is_some();
        state.generation += 1;
        self.status.send_replace(SessionStatus::Expired);

        if had_token {
            if let Err(e) = self.storage.remove_token() {
                log::error!("保存済みトークンの削除に失敗しました: {e}");
            }
        }
        drop(state);

        log::warn!("セッションが失効しました: generation={generation}");
        true
    }

    /// 現在のセッション状態
    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    /// セッション状態の変化を購読する
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }
}

/// トークンの形式を検証する
///
/// ヘッダー値として送信できる可視ASCII文字のみを許可する。
pub(crate) fn validate_token(token: &str) -> AppResult<()> {
    if token.is_empty() {
        return Err(AppError::validation("トークンが空です"));
    }
    if !token.bytes().all(|b| b.is_ascii_graphic()) {
        return Err(AppError::validation(
            "トークンに使用できない文字が含まれています",
        ));
    }
    Ok(())
}
