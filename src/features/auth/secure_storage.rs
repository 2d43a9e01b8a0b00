/// セキュアストレージモジュール
///
/// セッショントークンをクライアントの永続領域に保存・取得します。
/// 保存先はJSONファイル1つで、キーごとに値を持ちます。
use crate::shared::errors::{AppError, AppResult};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// セキュアストレージのキー定義
pub struct SecureStorageKeys;

impl SecureStorageKeys {
    /// セッショントークンのキー
    pub const SESSION_TOKEN: &'static str = "session_token";
    /// 最終ログイン日時のキー
    pub const LAST_LOGIN: &'static str = "last_login";
}

/// トークンの保存先を抽象化するトレイト
///
/// 実装は同期的で、呼び出し側のロックを保持したまま使われることがある。
pub trait TokenStorage: Send + Sync {
    /// 保存されているトークンを読み込む
    fn load_token(&self) -> AppResult<Option<String>>;

    /// トークンを保存する（既存の値は上書き）
    fn save_token(&self, token: &str) -> AppResult<()>;

    /// トークンを削除する（存在しない場合は何もしない）
    fn remove_token(&self) -> AppResult<()>;
}

/// ファイルベースのトークンストレージ
pub struct FileTokenStorage {
    /// ストアファイルのパス
    path: PathBuf,
}

impl FileTokenStorage {
    /// ストアファイル名
    pub const STORE_NAME: &'static str = "secure.json";

    /// パスを指定してストレージを作成する
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// ユーザー設定ディレクトリ配下にストレージを作成する
    ///
    /// # 戻り値
    /// FileTokenStorage、または設定ディレクトリが取得できない場合はエラー
    pub fn in_config_dir() -> AppResult<Self> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            AppError::configuration("ユーザー設定ディレクトリの取得に失敗しました")
        })?;
        Ok(Self::new(
            config_dir.join("smart-expense").join(Self::STORE_NAME),
        ))
    }

    /// ストアファイルのパス
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 最終ログイン日時を取得する
    pub fn last_login(&self) -> AppResult<Option<String>> {
        let store = self.read_store()?;
        Ok(store
            .get(SecureStorageKeys::LAST_LOGIN)
            .and_then(|v| v.as_str().map(|s| s.to_string())))
    }

    fn read_store(&self) -> AppResult<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| AppError::storage(format!("ストアの読み込みに失敗しました: {e}")))?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        // 壊れたストアは空として扱い、次回の保存・削除で上書きする
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => {
                log::warn!(
                    "ストアの形式が不正なため空として扱います: {}",
                    self.path.display()
                );
                Ok(Map::new())
            }
            Err(e) => {
                log::warn!(
                    "ストアの解析に失敗したため空として扱います: {}: {e}",
                    self.path.display()
                );
                Ok(Map::new())
            }
        }
    }

    fn write_store(&self, store: &Map<String, Value>) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    AppError::storage(format!("ストアディレクトリの作成に失敗しました: {e}"))
                })?;
            }
        }

        let content = serde_json::to_string_pretty(store)?;
        fs::write(&self.path, content)
            .map_err(|e| AppError::storage(format!("ストアの保存に失敗しました: {e}")))?;
        Ok(())
    }
}

impl TokenStorage for FileTokenStorage {
    fn load_token(&self) -> AppResult<Option<String>> {
        let store = self.read_store()?;
        Ok(store
            .get(SecureStorageKeys::SESSION_TOKEN)
            .and_then(|v| v.as_str().map(|s| s.to_string())))
    }

    fn save_token(&self, token: &str) -> AppResult<()> {
        let mut store = self.read_store()?;
        store.insert(
            SecureStorageKeys::SESSION_TOKEN.to_string(),
            Value::String(token.to_string()),
        );
        store.insert(
            SecureStorageKeys::LAST_LOGIN.to_string(),
            Value::String(chrono::Utc::now().to_rfc3339()),
        );
        self.write_store(&store)?;

        log::info!("セッショントークンを保存しました");
        Ok(())
    }

    fn remove_token(&self) -> AppResult<()> {
        let mut store = self.read_store()?;
        if store.remove(SecureStorageKeys::SESSION_TOKEN).is_none() {
            return Ok(());
        }
        self.write_store(&store)?;

        log::info!("セッショントークンを削除しました");
        Ok(())
    }
}

/// メモリ上のトークンストレージ（テストや一時セッション用）
#[derive(Default)]
pub struct MemoryTokenStorage {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 初期トークン付きで作成する
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn load_token(&self) -> AppResult<Option<String>> {
        let guard = self
            .token
            .lock()
            .map_err(|e| AppError::storage(format!("ロック取得エラー: {e}")))?;
        Ok(guard.clone())
    }

    fn save_token(&self, token: &str) -> AppResult<()> {
        let mut guard = self
            .token
            .lock()
            .map_err(|e| AppError::storage(format!("ロック取得エラー: {e}")))?;
        *guard = Some(token.to_string());
        Ok(())
    }

    fn remove_token(&self) -> AppResult<()> {
        let mut guard = self
            .token
            .lock()
            .map_err(|e| AppError::storage(format!("ロック取得エラー: {e}")))?;
        *guard = None;
        Ok(())
    }
}
