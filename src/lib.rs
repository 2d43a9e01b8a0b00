// 機能モジュール構造
pub mod app;
pub mod features;
pub mod shared;

use app::{App, Route};
use log::info;
use shared::config::environment::{initialize_logging_system, load_environment_variables};
use shared::config::ClientConfig;
use shared::errors::AppResult;

/// コマンドライン引数に従ってアプリケーションを実行する
pub async fn run() -> AppResult<()> {
    // 環境に応じた.envファイルを読み込み（ログシステム初期化前に実行）
    load_environment_variables();
    initialize_logging_system();

    let route = Route::parse(std::env::args().skip(1));
    info!("アプリケーションを開始します: route={}", route.path());

    let config = ClientConfig::from_env()?;
    let app = App::from_config(config)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    app.dispatch(route, &mut out).await
}
