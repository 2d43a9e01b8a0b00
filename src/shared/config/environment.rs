use crate::shared::errors::{AppError, AppResult};
use chrono_tz::Tz;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// アプリケーションの実行環境を表す列挙型
#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    /// 開発環境
    Development,
    /// プロダクション環境
    Production,
}

/// 環境変数取得エラー
#[derive(Debug, Clone)]
pub struct EnvVarError {
    /// 変数名
    pub var_name: String,
    /// エラーメッセージ
    pub message: String,
}

impl std::fmt::Display for EnvVarError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "環境変数 {} が見つかりません: {}",
            self.var_name, self.message
        )
    }
}

impl std::error::Error for EnvVarError {}

/// 環境変数を取得する（優先順位: 起動時 > コンパイル時 > エラー）
///
/// # 取得順序
/// 1. 起動時の環境変数（`std::env::var`）
/// 2. コンパイル時の環境変数（`option_env!`マクロ）
/// 3. どちらも見つからない場合はエラー
#[macro_export]
macro_rules! get_env_var {
    ($var_name:expr) => {{
        if let Ok(value) = std::env::var($var_name) {
            log::debug!("環境変数 {} を起動時の環境変数から取得しました", $var_name);
            Ok(value)
        } else if let Some(value) = option_env!($var_name) {
            log::debug!("環境変数 {} をコンパイル時の環境変数から取得しました", $var_name);
            Ok(value.to_string())
        } else {
            Err($crate::shared::config::environment::EnvVarError {
                var_name: $var_name.to_string(),
                message: format!(
                    "起動時の環境変数 {} もコンパイル時の環境変数も見つかりませんでした",
                    $var_name
                ),
            })
        }
    }};
}

/// 環境変数を取得する（オプション版）
#[macro_export]
macro_rules! get_env_var_optional {
    ($var_name:expr) => {{
        $crate::get_env_var!($var_name).ok()
    }};
}

/// 環境変数を取得する（デフォルト値付き）
#[macro_export]
macro_rules! get_env_var_or_default {
    ($var_name:expr, $default_value:expr) => {{
        $crate::get_env_var!($var_name).unwrap_or_else(|_| {
            log::debug!(
                "環境変数 {} が見つからないため、デフォルト値を使用します: {}",
                $var_name,
                $default_value
            );
            $default_value.to_string()
        })
    }};
}

/// 環境設定を管理する構造体
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    /// 実行環境
    pub environment: String,
    /// ログレベル
    pub log_level: String,
}

impl EnvironmentConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Self {
        let environment = get_environment();
        let debug_mode = environment == Environment::Development;
        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| {
            if debug_mode {
                "debug".to_string()
            } else {
                "info".to_string()
            }
        });

        Self {
            environment: format!("{environment:?}").to_lowercase(),
            log_level,
        }
    }
}

/// 現在の実行環境を判定する
///
/// # 判定ロジック
/// 1. 実行時環境変数 ENVIRONMENT を確認
/// 2. デバッグビルドの場合は Development
/// 3. リリースビルドの場合は Production
pub fn get_environment() -> Environment {
    if let Ok(env_var) = std::env::var("ENVIRONMENT") {
        let env = match env_var.as_str() {
            "production" => Environment::Production,
            _ => Environment::Development,
        };
        log::debug!("環境判定: 実行時環境変数を使用 -> {env_var} -> {env:?}");
        return env;
    }

    let env = if cfg!(debug_assertions) {
        Environment::Development
    } else {
        Environment::Production
    };
    log::debug!(
        "環境判定: ビルド設定を使用 -> debug_assertions={} -> {env:?}",
        cfg!(debug_assertions)
    );
    env
}

/// 環境変数の読み込みを行う
///
/// 開発ビルドの場合のみ.envファイルを読み込む。
/// 本番では環境変数は実行時に設定されることを前提とする。
pub fn load_environment_variables() {
    if cfg!(debug_assertions) {
        match dotenv::dotenv() {
            Ok(path) => {
                eprintln!("環境ファイルを読み込みました: {}", path.display());
            }
            Err(e) => {
                eprintln!("環境ファイルの読み込みに失敗: {e}");
            }
        }
    }
}

/// ログシステムを初期化する
///
/// 二回目以降の呼び出しは無視される。
pub fn initialize_logging_system() {
    let env_config = EnvironmentConfig::from_env();

    let log_level = match env_config.log_level.to_lowercase().as_str() {
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "info" => log::LevelFilter::Info,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        _ => log::LevelFilter::Info,
    };

    let initialized = env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp_secs()
        .format_module_path(false)
        .format_target(false)
        .try_init()
        .is_ok();

    if initialized {
        log::info!(
            "ログシステムを初期化しました: level={}, environment={}",
            env_config.log_level,
            env_config.environment
        );
    }
}

/// 値をパースし、失敗した場合はデフォルト値を使う
fn parse_or_default<T>(var_name: &str, raw: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    raw.trim().parse().unwrap_or_else(|_| {
        log::warn!("{var_name}のパースに失敗しました。デフォルト値{default:?}を使用します");
        default
    })
}

/// 真偽値の環境変数を解釈する
fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// API設定を管理する構造体
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// APIサーバーのベースURL（末尾のスラッシュなし）
    pub base_url: String,
    /// APIリクエストのタイムアウト（秒、0で無効）
    pub timeout_seconds: u64,
    /// 経費一覧の取得件数
    pub list_limit: u32,
    /// 残高の通貨コード
    pub currency: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout_seconds: 30,
            list_limit: 50,
            currency: "ARS".to_string(),
        }
    }
}

impl ApiConfig {
    /// ベースURLを指定して設定を作成する
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// 環境変数からAPI設定を読み込む
    ///
    /// # エラー
    /// API_SERVER_URLが見つからない場合は設定エラー
    pub fn from_env() -> AppResult<Self> {
        let base_url = crate::get_env_var!("API_SERVER_URL").map_err(|e| {
            log::error!("API_SERVER_URLの取得に失敗しました: {e}");
            AppError::configuration(
                "API_SERVER_URLが設定されていません。.envファイルまたは環境変数を確認してください",
            )
        })?;

        let defaults = Self::default();
        let config = Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_seconds: parse_or_default(
                "API_TIMEOUT_SECONDS",
                &crate::get_env_var_or_default!("API_TIMEOUT_SECONDS", "30"),
                defaults.timeout_seconds,
            ),
            list_limit: parse_or_default(
                "LIST_LIMIT",
                &crate::get_env_var_or_default!("LIST_LIMIT", "50"),
                defaults.list_limit,
            ),
            currency: crate::get_env_var_or_default!("CURRENCY", "ARS"),
        };

        config.validate()?;
        log::info!(
            "API設定: base_url={}, timeout={}s, list_limit={}",
            config.base_url,
            config.timeout_seconds,
            config.list_limit
        );
        Ok(config)
    }

    /// 設定を検証する
    pub fn validate(&self) -> AppResult<()> {
        if self.base_url.is_empty() {
            return Err(AppError::configuration(
                "APIサーバーのベースURLが設定されていません",
            ));
        }

        url::Url::parse(&self.base_url).map_err(|e| {
            AppError::configuration(format!("APIサーバーのベースURLが不正です: {e}"))
        })?;

        if self.list_limit == 0 {
            return Err(AppError::configuration(
                "LIST_LIMITは0より大きい値である必要があります",
            ));
        }

        Ok(())
    }

    /// タイムアウトをDurationとして取得（0の場合はNone）
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_seconds > 0).then(|| Duration::from_secs(self.timeout_seconds))
    }

    /// エンドポイントの完全なURLを組み立てる
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.base_url)
    }
}

/// クライアント全体の設定
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API設定（モック使用時はNoneでも可）
    pub api: Option<ApiConfig>,
    /// モックAPIを使用するかどうか
    pub use_mock_api: bool,
    /// モックAPIの疑似遅延
    pub mock_latency: Duration,
    /// ループバックログインのポート（0で自動割当）
    pub login_port: u16,
    /// ループバックログインの待機時間
    pub login_timeout: Duration,
    /// トークン保存先（未指定の場合は設定ディレクトリ）
    pub session_store_path: Option<PathBuf>,
    /// 週次集計に使うタイムゾーン
    pub user_timezone: Tz,
    /// 通貨コード
    pub currency: String,
}

impl ClientConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> AppResult<Self> {
        let use_mock_api = parse_flag(&crate::get_env_var_or_default!("USE_MOCK_API", "false"));

        let api = if use_mock_api {
            log::info!("モックAPIを使用します");
            ApiConfig::from_env().ok()
        } else {
            Some(ApiConfig::from_env()?)
        };

        let mock_latency_ms: u64 = parse_or_default(
            "MOCK_LATENCY_MS",
            &crate::get_env_var_or_default!("MOCK_LATENCY_MS", "0"),
            0,
        );
        let login_port: u16 = parse_or_default(
            "LOGIN_PORT",
            &crate::get_env_var_or_default!("LOGIN_PORT", "0"),
            0,
        );
        let login_timeout_seconds: u64 = parse_or_default(
            "LOGIN_TIMEOUT_SECONDS",
            &crate::get_env_var_or_default!("LOGIN_TIMEOUT_SECONDS", "300"),
            300,
        );
        let user_timezone = parse_or_default(
            "USER_TIMEZONE",
            &crate::get_env_var_or_default!("USER_TIMEZONE", "America/Argentina/Buenos_Aires"),
            chrono_tz::America::Argentina::Buenos_Aires,
        );
        let currency = api
            .as_ref()
            .map(|api| api.currency.clone())
            .unwrap_or_else(|| crate::get_env_var_or_default!("CURRENCY", "ARS"));

        Ok(Self {
            api,
            use_mock_api,
            mock_latency: Duration::from_millis(mock_latency_ms),
            login_port,
            login_timeout: Duration::from_secs(login_timeout_seconds),
            session_store_path: crate::get_env_var_optional!("SESSION_STORE_PATH")
                .map(PathBuf::from),
            user_timezone,
            currency,
        })
    }
}
